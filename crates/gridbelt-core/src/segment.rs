//! The authoritative belt topology: an undirected multigraph of unit-length
//! grid edges ("segments") between 4-adjacent cells.
//!
//! Segments are stored arena-style in a slotmap, with a per-node incident
//! index and a canonical undirected key set that rejects duplicate edges.
//! The `from -> to` orientation of a segment is an authoring artifact carried
//! per segment (it drives route following), not a separate graph property.
//!
//! Derived route recomputation is gated by an explicit dirty flag, set on
//! every topology mutation and cleared by whoever rebuilds the routes.

use crate::geometry::{Axis, GridPoint};
use crate::id::SegmentId;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use std::collections::{BTreeMap, BTreeSet};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when mutating the segment graph.
#[derive(Debug, thiserror::Error)]
pub enum SegmentError {
    #[error("segment endpoints are not 4-adjacent")]
    NotAdjacent,
    #[error("segment already exists")]
    Duplicate,
}

// ---------------------------------------------------------------------------
// Segment data
// ---------------------------------------------------------------------------

/// One unit-length belt edge between two adjacent cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentData {
    pub from: GridPoint,
    pub to: GridPoint,
}

impl SegmentData {
    /// Canonical undirected key: endpoints sorted by (y, x).
    pub fn key(&self) -> (GridPoint, GridPoint) {
        GridPoint::edge_key(self.from, self.to)
    }

    /// The axis this segment runs along.
    pub fn axis(&self) -> Axis {
        if self.from.y == self.to.y {
            Axis::Horizontal
        } else {
            Axis::Vertical
        }
    }

    /// The endpoint that is not `p`. Returns `from` for a non-endpoint `p`.
    pub fn other(&self, p: GridPoint) -> GridPoint {
        if self.from == p { self.to } else { self.from }
    }

    /// Returns true if `p` is one of the endpoints.
    pub fn touches(&self, p: GridPoint) -> bool {
        self.from == p || self.to == p
    }
}

/// In/out segment counts at a node, split by axis for crossing detection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeProfile {
    pub degree: usize,
    /// Segments whose `to` endpoint is this node.
    pub incoming: usize,
    /// Segments whose `from` endpoint is this node.
    pub outgoing: usize,
    pub horizontal: usize,
    pub vertical: usize,
}

impl NodeProfile {
    /// A corner: degree 2, one horizontal and one vertical incident segment.
    pub fn is_corner(&self) -> bool {
        self.degree == 2 && self.horizontal == 1 && self.vertical == 1
    }

    /// A crossing ("bridge"): degree 4 with 2 horizontal + 2 vertical
    /// incident segments. Must never be treated as a merge or split.
    pub fn is_crossing(&self) -> bool {
        self.degree == 4 && self.horizontal == 2 && self.vertical == 2
    }
}

// ---------------------------------------------------------------------------
// SegmentGraph
// ---------------------------------------------------------------------------

/// Default for the routes-dirty flag on deserialize -- always `true` so
/// derived routes are recomputed.
fn default_dirty() -> bool {
    true
}

/// The set of all belt segments plus the derived belt-cell set.
///
/// Belt cells are the trace cells committed by the authoring state machine
/// that do not coincide with a machine port; they are the only cells transit
/// items may occupy between ports.
#[derive(Debug, Serialize, Deserialize)]
pub struct SegmentGraph {
    segments: SlotMap<SegmentId, SegmentData>,
    /// Incident segment ids per node.
    incident: BTreeMap<GridPoint, Vec<SegmentId>>,
    /// Canonical undirected keys, for duplicate rejection.
    keys: BTreeSet<(GridPoint, GridPoint)>,
    belt_cells: BTreeSet<GridPoint>,
    /// Whether derived routes need recomputation.
    /// Defaults to `true` on deserialize so routes are rebuilt.
    #[serde(skip, default = "default_dirty")]
    routes_dirty: bool,
}

impl Default for SegmentGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentGraph {
    /// Create a new, empty segment graph.
    pub fn new() -> Self {
        Self {
            segments: SlotMap::with_key(),
            incident: BTreeMap::new(),
            keys: BTreeSet::new(),
            belt_cells: BTreeSet::new(),
            routes_dirty: true,
        }
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Add a segment between two 4-adjacent cells. Rejects duplicates
    /// (undirected comparison).
    pub fn add(&mut self, from: GridPoint, to: GridPoint) -> Result<SegmentId, SegmentError> {
        if !from.is_adjacent(&to) {
            return Err(SegmentError::NotAdjacent);
        }
        let data = SegmentData { from, to };
        if !self.keys.insert(data.key()) {
            return Err(SegmentError::Duplicate);
        }

        let id = self.segments.insert(data);
        self.incident.entry(from).or_default().push(id);
        self.incident.entry(to).or_default().push(id);
        self.routes_dirty = true;
        Ok(id)
    }

    /// Remove a segment. Returns its data if it existed.
    pub fn remove(&mut self, id: SegmentId) -> Option<SegmentData> {
        let data = self.segments.remove(id)?;
        self.keys.remove(&data.key());
        for endpoint in [data.from, data.to] {
            if let Some(list) = self.incident.get_mut(&endpoint) {
                list.retain(|&s| s != id);
                if list.is_empty() {
                    self.incident.remove(&endpoint);
                }
            }
        }
        self.routes_dirty = true;
        Some(data)
    }

    /// Track a cell as belt.
    pub fn add_belt_cell(&mut self, cell: GridPoint) {
        if self.belt_cells.insert(cell) {
            self.routes_dirty = true;
        }
    }

    /// Stop tracking a cell as belt. Returns true if it was tracked.
    pub fn remove_belt_cell(&mut self, cell: GridPoint) -> bool {
        let removed = self.belt_cells.remove(&cell);
        if removed {
            self.routes_dirty = true;
        }
        removed
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn get(&self, id: SegmentId) -> Option<&SegmentData> {
        self.segments.get(id)
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SegmentId, &SegmentData)> {
        self.segments.iter()
    }

    /// Returns true if the undirected edge (a, b) exists.
    pub fn contains_edge(&self, a: GridPoint, b: GridPoint) -> bool {
        self.keys.contains(&GridPoint::edge_key(a, b))
    }

    /// Segment ids incident to a node.
    pub fn incident(&self, node: GridPoint) -> &[SegmentId] {
        self.incident
            .get(&node)
            .map(|list| list.as_slice())
            .unwrap_or(&[])
    }

    /// Count of incident segments at a node.
    pub fn degree(&self, node: GridPoint) -> usize {
        self.incident(node).len()
    }

    /// In/out/axis counts at a node.
    pub fn profile(&self, node: GridPoint) -> NodeProfile {
        let mut profile = NodeProfile::default();
        for &id in self.incident(node) {
            let Some(seg) = self.segments.get(id) else {
                continue;
            };
            profile.degree += 1;
            if seg.to == node {
                profile.incoming += 1;
            }
            if seg.from == node {
                profile.outgoing += 1;
            }
            match seg.axis() {
                Axis::Horizontal => profile.horizontal += 1,
                Axis::Vertical => profile.vertical += 1,
            }
        }
        profile
    }

    /// Segments leaving a node (`from` endpoint is the node), with targets.
    pub fn outgoing(&self, node: GridPoint) -> Vec<(SegmentId, GridPoint)> {
        self.incident(node)
            .iter()
            .filter_map(|&id| {
                let seg = self.segments.get(id)?;
                (seg.from == node).then_some((id, seg.to))
            })
            .collect()
    }

    pub fn is_belt_cell(&self, cell: GridPoint) -> bool {
        self.belt_cells.contains(&cell)
    }

    pub fn belt_cells(&self) -> impl Iterator<Item = GridPoint> + '_ {
        self.belt_cells.iter().copied()
    }

    pub fn belt_cell_count(&self) -> usize {
        self.belt_cells.len()
    }

    // -----------------------------------------------------------------------
    // Dirty flag
    // -----------------------------------------------------------------------

    /// Whether derived routes need recomputation.
    pub fn routes_dirty(&self) -> bool {
        self.routes_dirty
    }

    /// Force the dirty flag, e.g. after machine/port changes that do not
    /// touch the segment arena.
    pub fn mark_routes_dirty(&mut self) {
        self.routes_dirty = true;
    }

    /// Clear the dirty flag after routes have been rebuilt.
    pub fn clear_routes_dirty(&mut self) {
        self.routes_dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: i32, y: i32) -> GridPoint {
        GridPoint::new(x, y)
    }

    #[test]
    fn add_and_remove_segments() {
        let mut graph = SegmentGraph::new();
        let id = graph.add(p(0, 0), p(1, 0)).unwrap();
        assert_eq!(graph.segment_count(), 1);
        assert!(graph.contains_edge(p(0, 0), p(1, 0)));
        assert!(graph.contains_edge(p(1, 0), p(0, 0)));

        let data = graph.remove(id).unwrap();
        assert_eq!(data.from, p(0, 0));
        assert_eq!(graph.segment_count(), 0);
        assert!(!graph.contains_edge(p(0, 0), p(1, 0)));
        assert!(graph.incident(p(0, 0)).is_empty());

        // Second removal is a no-op.
        assert!(graph.remove(id).is_none());
    }

    #[test]
    fn rejects_non_adjacent_and_duplicate() {
        let mut graph = SegmentGraph::new();
        assert!(matches!(
            graph.add(p(0, 0), p(2, 0)),
            Err(SegmentError::NotAdjacent)
        ));
        assert!(matches!(
            graph.add(p(0, 0), p(1, 1)),
            Err(SegmentError::NotAdjacent)
        ));

        graph.add(p(0, 0), p(1, 0)).unwrap();
        // Same edge, either orientation, is a duplicate.
        assert!(matches!(
            graph.add(p(0, 0), p(1, 0)),
            Err(SegmentError::Duplicate)
        ));
        assert!(matches!(
            graph.add(p(1, 0), p(0, 0)),
            Err(SegmentError::Duplicate)
        ));
    }

    #[test]
    fn profile_counts_in_out_and_axes() {
        let mut graph = SegmentGraph::new();
        // (0,1) -> (1,1) -> (2,1), plus (1,0) -> (1,1).
        graph.add(p(0, 1), p(1, 1)).unwrap();
        graph.add(p(1, 1), p(2, 1)).unwrap();
        graph.add(p(1, 0), p(1, 1)).unwrap();

        let profile = graph.profile(p(1, 1));
        assert_eq!(profile.degree, 3);
        assert_eq!(profile.incoming, 2);
        assert_eq!(profile.outgoing, 1);
        assert_eq!(profile.horizontal, 2);
        assert_eq!(profile.vertical, 1);
    }

    #[test]
    fn corner_detection() {
        let mut graph = SegmentGraph::new();
        graph.add(p(0, 0), p(1, 0)).unwrap();
        graph.add(p(1, 0), p(1, 1)).unwrap();

        assert!(graph.profile(p(1, 0)).is_corner());
        assert!(!graph.profile(p(0, 0)).is_corner());

        // A straight-through node is not a corner.
        graph.add(p(1, 1), p(1, 2)).unwrap();
        assert!(!graph.profile(p(1, 1)).is_corner());
    }

    #[test]
    fn crossing_detection() {
        let mut graph = SegmentGraph::new();
        // Horizontal through (5,5).
        graph.add(p(4, 5), p(5, 5)).unwrap();
        graph.add(p(5, 5), p(6, 5)).unwrap();
        // Vertical through (5,5).
        graph.add(p(5, 4), p(5, 5)).unwrap();
        graph.add(p(5, 5), p(5, 6)).unwrap();

        let profile = graph.profile(p(5, 5));
        assert!(profile.is_crossing());
        assert_eq!(profile.incoming, 2);
        assert_eq!(profile.outgoing, 2);

        // Degree 3 is never a crossing.
        let mut t = SegmentGraph::new();
        t.add(p(4, 5), p(5, 5)).unwrap();
        t.add(p(5, 5), p(6, 5)).unwrap();
        t.add(p(5, 4), p(5, 5)).unwrap();
        assert!(!t.profile(p(5, 5)).is_crossing());
    }

    #[test]
    fn outgoing_respects_orientation() {
        let mut graph = SegmentGraph::new();
        graph.add(p(1, 1), p(2, 1)).unwrap();
        graph.add(p(0, 1), p(1, 1)).unwrap();

        let out = graph.outgoing(p(1, 1));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].1, p(2, 1));
        assert!(graph.outgoing(p(2, 1)).is_empty());
    }

    #[test]
    fn belt_cells_tracked() {
        let mut graph = SegmentGraph::new();
        graph.add_belt_cell(p(3, 3));
        assert!(graph.is_belt_cell(p(3, 3)));
        assert_eq!(graph.belt_cell_count(), 1);
        assert!(graph.remove_belt_cell(p(3, 3)));
        assert!(!graph.remove_belt_cell(p(3, 3)));
        assert!(!graph.is_belt_cell(p(3, 3)));
    }

    #[test]
    fn dirty_flag_lifecycle() {
        let mut graph = SegmentGraph::new();
        assert!(graph.routes_dirty());
        graph.clear_routes_dirty();
        assert!(!graph.routes_dirty());

        let id = graph.add(p(0, 0), p(1, 0)).unwrap();
        assert!(graph.routes_dirty());
        graph.clear_routes_dirty();

        graph.remove(id);
        assert!(graph.routes_dirty());
        graph.clear_routes_dirty();

        graph.add_belt_cell(p(0, 0));
        assert!(graph.routes_dirty());
    }

    // Round-trip via serialization: indexes survive, dirty flag forced true.
    #[test]
    fn deserialized_graph_is_routes_dirty() {
        let mut graph = SegmentGraph::new();
        graph.add(p(0, 0), p(1, 0)).unwrap();
        graph.add(p(1, 0), p(1, 1)).unwrap();
        graph.add_belt_cell(p(1, 0));
        graph.clear_routes_dirty();

        let bytes = bitcode::serialize(&graph).expect("serialize graph");
        let restored: SegmentGraph = bitcode::deserialize(&bytes).expect("deserialize graph");

        assert!(restored.routes_dirty(), "deserialize must force recompute");
        assert_eq!(restored.segment_count(), 2);
        assert!(restored.contains_edge(p(0, 0), p(1, 0)));
        assert!(restored.profile(p(1, 0)).is_corner());
        assert!(restored.is_belt_cell(p(1, 0)));
    }
}
