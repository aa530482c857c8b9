//! Placed machine instances and their derived geometry.
//!
//! Machines live in a slotmap arena. Placement never fails outright: a
//! machine that overlaps another or hangs over the grid boundary is kept
//! with a non-`Valid` placement state, recomputed from scratch after every
//! structural change to the machine set. Ports are derived, not stored --
//! resolved on demand from the prototype and the instance rotation.

use crate::geometry::{Direction, Footprint, GridPoint, Rotation, rotate_offset};
use crate::id::{MachineId, PortIndex, PrototypeId};
use crate::registry::{PortKind, Registry};
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Validity of a machine's current placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementState {
    /// No overlap, fully inside the grid.
    Valid,
    /// Shares at least one cell with another machine.
    Overlap,
    /// At least one footprint cell lies outside the grid.
    OutOfBounds,
}

/// A placed machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineInstance {
    pub prototype: PrototypeId,
    /// Top-left cell of the (post-rotation) footprint.
    pub origin: GridPoint,
    pub rotation: Rotation,
    pub placement: PlacementState,
}

/// A port resolved to absolute grid coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPort {
    pub machine: MachineId,
    pub port: PortIndex,
    pub cell: GridPoint,
    pub direction: Direction,
    pub kind: PortKind,
}

// ---------------------------------------------------------------------------
// MachineMap
// ---------------------------------------------------------------------------

/// The set of all placed machines.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MachineMap {
    machines: SlotMap<MachineId, MachineInstance>,
}

impl MachineMap {
    pub fn new() -> Self {
        Self::default()
    }

    // -- Lifecycle --

    /// Place a machine. Always succeeds for a known prototype; the placement
    /// state of every machine is recomputed afterwards.
    pub fn place(
        &mut self,
        registry: &Registry,
        prototype: PrototypeId,
        origin: GridPoint,
        rotation: Rotation,
        grid_size: i32,
    ) -> MachineId {
        let id = self.machines.insert(MachineInstance {
            prototype,
            origin,
            rotation,
            placement: PlacementState::Valid,
        });
        self.recompute_placement(registry, grid_size);
        id
    }

    /// Move a machine to a new origin. Unknown ids are a no-op.
    pub fn move_to(
        &mut self,
        registry: &Registry,
        id: MachineId,
        origin: GridPoint,
        grid_size: i32,
    ) {
        if let Some(machine) = self.machines.get_mut(id) {
            machine.origin = origin;
            self.recompute_placement(registry, grid_size);
        }
    }

    /// Rotate a machine in place. Unknown ids are a no-op.
    pub fn rotate(
        &mut self,
        registry: &Registry,
        id: MachineId,
        rotation: Rotation,
        grid_size: i32,
    ) {
        if let Some(machine) = self.machines.get_mut(id) {
            machine.rotation = rotation;
            self.recompute_placement(registry, grid_size);
        }
    }

    /// Remove a machine. Returns the removed instance, if any.
    pub fn remove(
        &mut self,
        registry: &Registry,
        id: MachineId,
        grid_size: i32,
    ) -> Option<MachineInstance> {
        let removed = self.machines.remove(id);
        if removed.is_some() {
            self.recompute_placement(registry, grid_size);
        }
        removed
    }

    // -- Queries --

    pub fn get(&self, id: MachineId) -> Option<&MachineInstance> {
        self.machines.get(id)
    }

    pub fn contains(&self, id: MachineId) -> bool {
        self.machines.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MachineId, &MachineInstance)> {
        self.machines.iter()
    }

    /// The post-rotation footprint of a machine.
    pub fn footprint(&self, registry: &Registry, id: MachineId) -> Option<Footprint> {
        let machine = self.machines.get(id)?;
        let proto = registry.get_prototype(machine.prototype)?;
        Some(proto.footprint.rotated(machine.rotation))
    }

    /// All cells occupied by a machine's footprint.
    pub fn occupied_cells(&self, registry: &Registry, id: MachineId) -> Vec<GridPoint> {
        let Some(machine) = self.machines.get(id) else {
            return Vec::new();
        };
        match self.footprint(registry, id) {
            Some(fp) => fp.tiles(machine.origin).collect(),
            None => Vec::new(),
        }
    }

    /// Resolve all ports of a machine to absolute cells and directions.
    pub fn ports(&self, registry: &Registry, id: MachineId) -> Vec<ResolvedPort> {
        let Some(machine) = self.machines.get(id) else {
            return Vec::new();
        };
        let Some(proto) = registry.get_prototype(machine.prototype) else {
            return Vec::new();
        };
        proto
            .ports
            .iter()
            .enumerate()
            .map(|(idx, spec)| {
                let local = rotate_offset(spec.offset, proto.footprint, machine.rotation);
                ResolvedPort {
                    machine: id,
                    port: PortIndex(idx as u8),
                    cell: GridPoint::new(machine.origin.x + local.x, machine.origin.y + local.y),
                    direction: spec.direction.rotated(machine.rotation),
                    kind: spec.kind,
                }
            })
            .collect()
    }

    /// The machine occupying a cell, if any.
    pub fn machine_at(&self, registry: &Registry, cell: GridPoint) -> Option<MachineId> {
        self.machines.iter().find_map(|(id, machine)| {
            let fp = self.footprint(registry, id)?;
            fp.tiles(machine.origin).any(|t| t == cell).then_some(id)
        })
    }

    /// The port at a cell, if any.
    pub fn port_at(&self, registry: &Registry, cell: GridPoint) -> Option<ResolvedPort> {
        self.machines
            .keys()
            .flat_map(|id| self.ports(registry, id))
            .find(|port| port.cell == cell)
    }

    /// All output ports across the machine set, in deterministic arena order.
    pub fn output_ports(&self, registry: &Registry) -> Vec<ResolvedPort> {
        self.machines
            .keys()
            .flat_map(|id| self.ports(registry, id))
            .filter(|port| port.kind == PortKind::Out)
            .collect()
    }

    /// All input ports keyed by cell, for route termination lookups.
    pub fn input_ports_by_cell(&self, registry: &Registry) -> BTreeMap<GridPoint, ResolvedPort> {
        self.machines
            .keys()
            .flat_map(|id| self.ports(registry, id))
            .filter(|port| port.kind == PortKind::In)
            .map(|port| (port.cell, port))
            .collect()
    }

    // -- Placement recompute --

    /// Recompute the placement state of every machine from scratch:
    /// pairwise footprint overlap plus grid boundary containment.
    pub fn recompute_placement(&mut self, registry: &Registry, grid_size: i32) {
        // Count claims per cell across the whole machine set.
        let mut claims: BTreeMap<GridPoint, u32> = BTreeMap::new();
        let mut tiles_of: BTreeMap<MachineId, Vec<GridPoint>> = BTreeMap::new();

        for (id, machine) in &self.machines {
            let tiles: Vec<GridPoint> = registry
                .get_prototype(machine.prototype)
                .map(|proto| {
                    proto
                        .footprint
                        .rotated(machine.rotation)
                        .tiles(machine.origin)
                        .collect()
                })
                .unwrap_or_default();
            for &tile in &tiles {
                *claims.entry(tile).or_insert(0) += 1;
            }
            tiles_of.insert(id, tiles);
        }

        for (id, machine) in &mut self.machines {
            let tiles = tiles_of.get(&id).map(Vec::as_slice).unwrap_or(&[]);
            let out_of_bounds = tiles
                .iter()
                .any(|t| t.x < 0 || t.y < 0 || t.x >= grid_size || t.y >= grid_size);
            let overlap = tiles.iter().any(|t| claims.get(t).copied().unwrap_or(0) > 1);

            machine.placement = if out_of_bounds {
                PlacementState::OutOfBounds
            } else if overlap {
                PlacementState::Overlap
            } else {
                PlacementState::Valid
            };
        }
    }
}
