//! Power coverage for machines that need it.
//!
//! A power-emitting structure covers a square of fixed Chebyshev radius
//! around its footprint. A machine needing power is covered when any of its
//! footprint cells falls inside any emitter's square. Coverage feeds the
//! per-machine runtime status; there is no supply/demand balancing.

use crate::geometry::GridPoint;
use crate::id::MachineId;
use crate::machine::MachineMap;
use crate::registry::{PrototypeRole, Registry};

/// A snapshot of all power emitters, rebuilt once per tick.
#[derive(Debug, Default)]
pub struct PowerCoverage {
    /// (emitter footprint cell, radius) pairs.
    emitters: Vec<(GridPoint, u32)>,
}

impl PowerCoverage {
    /// Collect the coverage squares of every power-emitting machine.
    pub fn build(registry: &Registry, machines: &MachineMap) -> Self {
        let mut emitters = Vec::new();
        for (id, machine) in machines.iter() {
            let Some(proto) = registry.get_prototype(machine.prototype) else {
                continue;
            };
            if let PrototypeRole::PowerPole { radius } = proto.role {
                for cell in machines.occupied_cells(registry, id) {
                    emitters.push((cell, radius));
                }
            }
        }
        Self { emitters }
    }

    /// Whether any emitter's square contains the cell.
    pub fn covers(&self, cell: GridPoint) -> bool {
        self.emitters
            .iter()
            .any(|(origin, radius)| origin.chebyshev_distance(&cell) <= *radius)
    }

    /// Whether a machine has any covered footprint cell.
    pub fn covers_machine(
        &self,
        registry: &Registry,
        machines: &MachineMap,
        id: MachineId,
    ) -> bool {
        machines
            .occupied_cells(registry, id)
            .into_iter()
            .any(|cell| self.covers(cell))
    }
}
