//! Shared test helpers for unit tests, integration tests, and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available to in-crate tests and, via the `test-utils` feature, to
//! downstream crates.

use crate::geometry::{Direction, Footprint, GridPoint, Rotation};
use crate::id::{ItemKindId, MachineId, PrototypeId};
use crate::machine::MachineMap;
use crate::registry::{
    PortKind, PortSpec, PrototypeDef, PrototypeRole, Registry, RegistryBuilder,
};
use crate::routing::{BeltRoute, rebuild_routes};
use crate::segment::SegmentGraph;

/// Grid side length used by the standard harness.
pub const TEST_GRID: i32 = 32;

// ===========================================================================
// Standard content
// ===========================================================================

/// The canonical registry used across tests: one raw item, one refined item,
/// and the four prototype roles.
pub struct StandardWorld {
    pub registry: Registry,
    pub ore: ItemKindId,
    pub plate: ItemKindId,
    /// 1x1 pickup emitting ore; out port at its cell, facing south.
    pub miner: PrototypeId,
    /// 2x2 processor ore -> plate, cycle 5, capacities 50. In port top-left
    /// entered southward; out port bottom-right leaving southward.
    pub smelter: PrototypeId,
    /// Same shape as the smelter but requires power coverage.
    pub powered_smelter: PrototypeId,
    /// 1x1 depot; in port at its cell, entered southward.
    pub depot: PrototypeId,
    /// 1x1 power pole, coverage radius 3.
    pub pole: PrototypeId,
}

pub const SMELTER_CYCLE: u32 = 5;
pub const SMELTER_CAPACITY: u32 = 50;

pub fn standard_world() -> StandardWorld {
    let mut b = RegistryBuilder::new();
    let ore = b.register_item("iron_ore");
    let plate = b.register_item("iron_plate");

    let miner = b.register_prototype(PrototypeDef {
        name: "miner".to_string(),
        footprint: Footprint::single(),
        ports: vec![PortSpec {
            offset: GridPoint::new(0, 0),
            direction: Direction::South,
            kind: PortKind::Out,
        }],
        role: PrototypeRole::Pickup { output: ore },
        needs_power: false,
    });

    let smelter_def = PrototypeDef {
        name: "smelter".to_string(),
        footprint: Footprint {
            width: 2,
            height: 2,
        },
        ports: vec![
            PortSpec {
                offset: GridPoint::new(0, 0),
                direction: Direction::South,
                kind: PortKind::In,
            },
            PortSpec {
                offset: GridPoint::new(1, 1),
                direction: Direction::South,
                kind: PortKind::Out,
            },
        ],
        role: PrototypeRole::Processor {
            input: ore,
            output: plate,
            cycle_ticks: SMELTER_CYCLE,
            input_capacity: SMELTER_CAPACITY,
            output_capacity: SMELTER_CAPACITY,
        },
        needs_power: false,
    };
    let smelter = b.register_prototype(smelter_def.clone());
    let powered_smelter = b.register_prototype(PrototypeDef {
        name: "powered_smelter".to_string(),
        needs_power: true,
        ..smelter_def
    });

    let depot = b.register_prototype(PrototypeDef {
        name: "depot".to_string(),
        footprint: Footprint::single(),
        ports: vec![PortSpec {
            offset: GridPoint::new(0, 0),
            direction: Direction::South,
            kind: PortKind::In,
        }],
        role: PrototypeRole::Depot,
        needs_power: false,
    });

    let pole = b.register_prototype(PrototypeDef {
        name: "pole".to_string(),
        footprint: Footprint::single(),
        ports: vec![],
        role: PrototypeRole::PowerPole { radius: 3 },
        needs_power: false,
    });

    let registry = b.build().expect("standard registry must build");
    StandardWorld {
        registry,
        ore,
        plate,
        miner,
        smelter,
        powered_smelter,
        depot,
        pole,
    }
}

// ===========================================================================
// Harness
// ===========================================================================

/// A bare-metal harness around the registry, machine set, and segment graph,
/// for tests that drive the simulation pieces directly (below the engine's
/// command surface).
pub struct SimHarness {
    pub world: StandardWorld,
    pub machines: MachineMap,
    pub graph: SegmentGraph,
}

impl Default for SimHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl SimHarness {
    pub fn new() -> Self {
        Self {
            world: standard_world(),
            machines: MachineMap::new(),
            graph: SegmentGraph::new(),
        }
    }

    pub fn place(&mut self, prototype: PrototypeId, at: GridPoint) -> MachineId {
        self.machines
            .place(&self.world.registry, prototype, at, Rotation::None, TEST_GRID)
    }

    /// Commit a belt run directly: segments between consecutive cells, belt
    /// cells for every cell that is not a port.
    pub fn belt(&mut self, cells: &[GridPoint]) {
        for pair in cells.windows(2) {
            let _ = self.graph.add(pair[0], pair[1]);
        }
        for &cell in cells {
            if self.machines.port_at(&self.world.registry, cell).is_none() {
                self.graph.add_belt_cell(cell);
            }
        }
    }

    pub fn routes(&self) -> Vec<BeltRoute> {
        rebuild_routes(&self.graph, &self.world.registry, &self.machines)
    }
}
