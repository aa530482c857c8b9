//! Grid and port geometry: cells, directions, rotations, footprints.
//!
//! Everything in this module is a pure function of its inputs. Rotation is
//! quarter-turn only; a 90/270 degree rotation swaps a footprint's width and
//! height, and port offsets are remapped within the pre-rotation dimensions.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// GridPoint
// ---------------------------------------------------------------------------

/// A cell on the square grid. Equality is value equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPoint {
    pub x: i32,
    pub y: i32,
}

impl GridPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance to another cell.
    pub fn manhattan_distance(&self, other: &GridPoint) -> u32 {
        (self.x - other.x).unsigned_abs() + (self.y - other.y).unsigned_abs()
    }

    /// Chebyshev (chessboard) distance to another cell.
    pub fn chebyshev_distance(&self, other: &GridPoint) -> u32 {
        (self.x - other.x)
            .unsigned_abs()
            .max((self.y - other.y).unsigned_abs())
    }

    /// The neighboring cell one step in `dir`.
    pub fn step(&self, dir: Direction) -> GridPoint {
        let (dx, dy) = dir.offset();
        GridPoint::new(self.x + dx, self.y + dy)
    }

    /// Returns true if `other` is 4-adjacent (Manhattan distance 1).
    pub fn is_adjacent(&self, other: &GridPoint) -> bool {
        self.manhattan_distance(other) == 1
    }

    /// The direction from this cell to a 4-adjacent cell, if it is one.
    pub fn direction_to(&self, other: &GridPoint) -> Option<Direction> {
        match (other.x - self.x, other.y - self.y) {
            (1, 0) => Some(Direction::East),
            (-1, 0) => Some(Direction::West),
            (0, 1) => Some(Direction::South),
            (0, -1) => Some(Direction::North),
            _ => None,
        }
    }

    /// Key for undirected edge comparisons: endpoints in (y, x) order.
    pub fn edge_key(a: GridPoint, b: GridPoint) -> (GridPoint, GridPoint) {
        if (a.y, a.x) <= (b.y, b.x) { (a, b) } else { (b, a) }
    }
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Cardinal directions. East is `+x`, South is `+y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// All four cardinal directions.
    pub fn all() -> [Direction; 4] {
        [
            Direction::North,
            Direction::East,
            Direction::South,
            Direction::West,
        ]
    }

    /// Unit offset for this direction.
    pub fn offset(&self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }

    /// The opposite direction.
    pub fn opposite(&self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    /// The axis this direction runs along.
    pub fn axis(&self) -> Axis {
        match self {
            Direction::East | Direction::West => Axis::Horizontal,
            Direction::North | Direction::South => Axis::Vertical,
        }
    }

    /// One quarter-turn clockwise: `+x -> +y -> -x -> -y -> +x`.
    pub fn rotate_cw(self) -> Direction {
        match self {
            Direction::East => Direction::South,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
            Direction::North => Direction::East,
        }
    }

    /// Rotate by the given rotation (quarter-turns clockwise).
    pub fn rotated(self, rotation: Rotation) -> Direction {
        let mut dir = self;
        for _ in 0..rotation.quarter_turns() {
            dir = dir.rotate_cw();
        }
        dir
    }
}

/// Horizontal or vertical, used to classify segments at a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    Horizontal,
    Vertical,
}

// ---------------------------------------------------------------------------
// Rotation
// ---------------------------------------------------------------------------

/// Rotation applied to a machine. Quarter-turns clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    /// No rotation.
    #[default]
    None,
    /// 90 degrees clockwise.
    Cw90,
    /// 180 degrees.
    Cw180,
    /// 270 degrees clockwise.
    Cw270,
}

impl Rotation {
    /// All four rotation values.
    pub fn all() -> [Rotation; 4] {
        [
            Rotation::None,
            Rotation::Cw90,
            Rotation::Cw180,
            Rotation::Cw270,
        ]
    }

    /// Number of clockwise quarter-turns.
    pub fn quarter_turns(&self) -> u8 {
        match self {
            Rotation::None => 0,
            Rotation::Cw90 => 1,
            Rotation::Cw180 => 2,
            Rotation::Cw270 => 3,
        }
    }

    /// Rotate 90 degrees clockwise.
    pub fn rotate_cw(self) -> Self {
        match self {
            Rotation::None => Rotation::Cw90,
            Rotation::Cw90 => Rotation::Cw180,
            Rotation::Cw180 => Rotation::Cw270,
            Rotation::Cw270 => Rotation::None,
        }
    }
}

// ---------------------------------------------------------------------------
// Footprint
// ---------------------------------------------------------------------------

/// The pre-rotation footprint (size) of a machine prototype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Footprint {
    pub width: u32,
    pub height: u32,
}

impl Footprint {
    /// A 1x1 machine.
    pub fn single() -> Self {
        Self {
            width: 1,
            height: 1,
        }
    }

    /// Return a new footprint rotated by the given rotation.
    /// For 90/270 degrees, width and height are swapped.
    pub fn rotated(&self, rotation: Rotation) -> Self {
        match rotation {
            Rotation::None | Rotation::Cw180 => *self,
            Rotation::Cw90 | Rotation::Cw270 => Self {
                width: self.height,
                height: self.width,
            },
        }
    }

    /// Iterate over all cells occupied by this footprint at the given origin.
    /// Origin is the top-left corner.
    pub fn tiles(self, origin: GridPoint) -> impl Iterator<Item = GridPoint> {
        let w = self.width as i32;
        let h = self.height as i32;
        let ox = origin.x;
        let oy = origin.y;
        (0..h).flat_map(move |dy| (0..w).map(move |dx| GridPoint::new(ox + dx, oy + dy)))
    }
}

// ---------------------------------------------------------------------------
// Port offset rotation
// ---------------------------------------------------------------------------

/// Remap a local port offset under a rotation.
///
/// `w` and `h` are the *pre-rotation* footprint dimensions:
/// - 90 degrees:  `(x, y) -> (h - 1 - y, x)`
/// - 180 degrees: `(x, y) -> (w - 1 - x, h - 1 - y)`
/// - 270 degrees: `(x, y) -> (y, w - 1 - x)`
pub fn rotate_offset(offset: GridPoint, footprint: Footprint, rotation: Rotation) -> GridPoint {
    let (x, y) = (offset.x, offset.y);
    let w = footprint.width as i32;
    let h = footprint.height as i32;
    match rotation {
        Rotation::None => GridPoint::new(x, y),
        Rotation::Cw90 => GridPoint::new(h - 1 - y, x),
        Rotation::Cw180 => GridPoint::new(w - 1 - x, h - 1 - y),
        Rotation::Cw270 => GridPoint::new(y, w - 1 - x),
    }
}
