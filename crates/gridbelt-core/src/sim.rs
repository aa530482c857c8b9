//! The tick simulation engine.
//!
//! Advances the world by one discrete tick per call, in five phases:
//!
//! 1. **Cooldown decay** -- output-port emission cooldowns tick down.
//! 2. **Advance transit** -- items dwell, move one cell, or are absorbed.
//! 3. **Emit** -- eligible output ports spawn new transit items.
//! 4. **Process** -- machine statuses, cycle progress, consume/produce.
//! 5. **Bookkeeping** -- tick counter; events stay buffered for the caller.
//!
//! No phase raises a hard error. Conflicts resolve by silent deferral (a
//! blocked item stays put), silent loss (absorption into full storage), or
//! stalling (completed work held under back-pressure).

use crate::event::{Event, EventBus};
use crate::fixed::Ticks;
use crate::geometry::GridPoint;
use crate::id::{ItemKindId, MachineId, PortIndex, TransitId};
use crate::machine::{MachineMap, PlacementState};
use crate::power::PowerCoverage;
use crate::registry::{PrototypeRole, Registry};
use crate::routing::{BeltRoute, PortRef};
use crate::segment::SegmentGraph;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use std::collections::{BTreeMap, BTreeSet};

/// Ticks an item spends moving into each cell (belt speed), and the cooldown
/// an output port takes after emitting.
pub const DWELL_TICKS: u32 = 20;

// ---------------------------------------------------------------------------
// Machine storage
// ---------------------------------------------------------------------------

/// Which buffer of a machine a storage entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StorageSide {
    In,
    Out,
}

/// Composite storage key: machine identity, buffer side, item kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StorageKey {
    pub machine: MachineId,
    pub side: StorageSide,
    pub kind: ItemKindId,
}

impl StorageKey {
    pub fn new(machine: MachineId, side: StorageSide, kind: ItemKindId) -> Self {
        Self {
            machine,
            side,
            kind,
        }
    }
}

/// Machine internal storage: bounded per-kind counts, owned exclusively by
/// the tick engine and mutated only during a tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Storage {
    counts: BTreeMap<StorageKey, u32>,
}

impl Storage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: StorageKey) -> u32 {
        self.counts.get(&key).copied().unwrap_or(0)
    }

    /// Add items up to `capacity`. Returns the amount that didn't fit.
    #[must_use = "overflow count indicates items that did not fit"]
    pub fn add(&mut self, key: StorageKey, quantity: u32, capacity: u32) -> u32 {
        let current = self.get(key);
        let space = capacity.saturating_sub(current);
        let to_add = quantity.min(space);
        if to_add > 0 {
            self.counts.insert(key, current + to_add);
        }
        quantity - to_add
    }

    /// Remove items. Returns the amount actually removed.
    #[must_use = "returns the quantity actually removed, which may be less than requested"]
    pub fn remove(&mut self, key: StorageKey, quantity: u32) -> u32 {
        let current = self.get(key);
        let to_remove = quantity.min(current);
        if to_remove > 0 {
            if current == to_remove {
                self.counts.remove(&key);
            } else {
                self.counts.insert(key, current - to_remove);
            }
        }
        to_remove
    }

    /// All nonzero counts for one side of one machine.
    pub fn contents(&self, machine: MachineId, side: StorageSide) -> Vec<(ItemKindId, u32)> {
        self.counts
            .iter()
            .filter(|(key, _)| key.machine == machine && key.side == side)
            .map(|(key, &count)| (key.kind, count))
            .collect()
    }

    pub fn clear(&mut self) {
        self.counts.clear();
    }
}

// ---------------------------------------------------------------------------
// Machine status
// ---------------------------------------------------------------------------

/// Runtime status of a machine, recomputed every tick before processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MachineStatus {
    Running,
    /// No input stock to start a cycle.
    Starved,
    /// Placement overlaps another machine.
    BlockedOverlap,
    /// Placement hangs over the grid boundary.
    BlockedBoundary,
    /// Needs power and no coverage square reaches it.
    Unpowered,
}

impl MachineStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, MachineStatus::Running)
    }
}

// ---------------------------------------------------------------------------
// Transit items
// ---------------------------------------------------------------------------

/// One unit of cargo riding a route's path.
///
/// `step_index` is the path index of the cell the item currently occupies;
/// `step_tick` counts ticks spent moving into the next cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitItem {
    pub kind: ItemKindId,
    pub path: Vec<GridPoint>,
    pub step_index: usize,
    pub step_tick: u32,
}

impl TransitItem {
    /// The cell the item currently occupies.
    pub fn cell(&self) -> GridPoint {
        self.path[self.step_index]
    }
}

// ---------------------------------------------------------------------------
// Tick summary
// ---------------------------------------------------------------------------

/// Aggregated per-tick deltas, for external inventory display and the
/// statistics consumer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Units produced by processors this tick.
    pub produced: Vec<(ItemKindId, u32)>,
    /// Units consumed by processors this tick.
    pub consumed: Vec<(ItemKindId, u32)>,
    /// Units delivered to depots (credited to the external inventory).
    pub delivered: Vec<(ItemKindId, u32)>,
}

// ---------------------------------------------------------------------------
// SimState
// ---------------------------------------------------------------------------

/// All transient simulation runtime plus the machine storage it owns.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SimState {
    pub tick: Ticks,
    transit: SlotMap<TransitId, TransitItem>,
    /// Insertion order of live transit items; drives deterministic advance.
    transit_order: Vec<TransitId>,
    cooldowns: BTreeMap<(MachineId, PortIndex), u32>,
    progress: BTreeMap<MachineId, u32>,
    status: BTreeMap<MachineId, MachineStatus>,
    storage: Storage,
    external: BTreeMap<ItemKindId, u64>,
}

impl SimState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard transient runtime: transit items, cooldowns, progress, and
    /// statuses. Machine storage and the external inventory survive.
    pub fn clear_runtime(&mut self) {
        self.transit.clear();
        self.transit_order.clear();
        self.cooldowns.clear();
        self.progress.clear();
        self.status.clear();
    }

    /// Drop all in-flight transit items (topology edits invalidate them).
    pub fn clear_transit(&mut self) {
        self.transit.clear();
        self.transit_order.clear();
    }

    pub fn transit_iter(&self) -> impl Iterator<Item = (TransitId, &TransitItem)> {
        self.transit_order
            .iter()
            .filter_map(|&id| self.transit.get(id).map(|item| (id, item)))
    }

    pub fn transit_count(&self) -> usize {
        self.transit.len()
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Direct storage access, e.g. to pre-load machine buffers.
    pub fn storage_mut(&mut self) -> &mut Storage {
        &mut self.storage
    }

    pub fn external_inventory(&self) -> &BTreeMap<ItemKindId, u64> {
        &self.external
    }

    pub fn machine_status(&self, id: MachineId) -> Option<MachineStatus> {
        self.status.get(&id).copied()
    }

    pub fn machine_progress(&self, id: MachineId) -> u32 {
        self.progress.get(&id).copied().unwrap_or(0)
    }

    pub fn cooldown(&self, machine: MachineId, port: PortIndex) -> u32 {
        self.cooldowns.get(&(machine, port)).copied().unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Tick step
// ---------------------------------------------------------------------------

/// Advance the simulation by one tick.
pub fn step(
    state: &mut SimState,
    registry: &Registry,
    machines: &MachineMap,
    graph: &SegmentGraph,
    routes: &[BeltRoute],
    events: &mut EventBus,
) -> TickSummary {
    let tick = state.tick;
    let mut summary = TickSummary::default();

    // Phase 1: cooldown decay.
    for cooldown in state.cooldowns.values_mut() {
        *cooldown = cooldown.saturating_sub(1);
    }

    // Phase 2: advance in-flight items.
    let input_ports = machines.input_ports_by_cell(registry);
    let mut occupancy: BTreeSet<GridPoint> =
        state.transit.values().map(|item| item.cell()).collect();

    let order: Vec<TransitId> = state.transit_order.clone();
    for id in order {
        let Some(item) = state.transit.get(id) else {
            continue;
        };
        if item.step_index + 1 >= item.path.len() {
            // Path exhausted without absorption: abandoned.
            occupancy.remove(&item.cell());
            state.transit.remove(id);
            continue;
        }
        if item.step_tick < DWELL_TICKS {
            state.transit[id].step_tick += 1;
            continue;
        }

        let dest = item.path[item.step_index + 1];
        if let Some(port) = input_ports.get(&dest) {
            let kind = item.kind;
            let cell = item.cell();
            occupancy.remove(&cell);
            state.transit.remove(id);
            absorb(
                state,
                registry,
                machines,
                port.machine,
                kind,
                tick,
                events,
                &mut summary,
            );
            continue;
        }

        if !graph.is_belt_cell(dest) {
            // The path no longer runs over belt: abandoned.
            occupancy.remove(&item.cell());
            state.transit.remove(id);
            continue;
        }
        if occupancy.contains(&dest) {
            // Single-occupancy: stay put, dwell counter untouched.
            continue;
        }

        occupancy.remove(&item.cell());
        occupancy.insert(dest);
        let item = &mut state.transit[id];
        item.step_index += 1;
        item.step_tick = 0;
    }
    state.transit_order.retain(|&id| state.transit.contains_key(id));

    // Phase 3: emit from eligible output ports.
    for port in machines.output_ports(registry) {
        let cooldown_key = (port.machine, port.port);
        if state.cooldowns.get(&cooldown_key).copied().unwrap_or(0) > 0 {
            continue;
        }
        let Some(machine) = machines.get(port.machine) else {
            continue;
        };
        let Some(proto) = registry.get_prototype(machine.prototype) else {
            continue;
        };
        let (kind, gated_on_stock) = match proto.role {
            PrototypeRole::Pickup { output } => (output, false),
            PrototypeRole::Processor { output, .. } => (output, true),
            _ => continue,
        };

        let port_ref = PortRef {
            machine: port.machine,
            port: port.port,
        };
        let Some(route) = routes.iter().find(|r| r.from == port_ref) else {
            continue;
        };
        let Some(&first) = route.path.get(1) else {
            continue;
        };
        if !graph.is_belt_cell(first) || occupancy.contains(&first) {
            continue;
        }
        if gated_on_stock {
            let out_key = StorageKey::new(port.machine, StorageSide::Out, kind);
            if state.storage.get(out_key) == 0 {
                continue;
            }
            let _ = state.storage.remove(out_key, 1);
        }

        let id = state.transit.insert(TransitItem {
            kind,
            path: route.path.clone(),
            step_index: 1,
            step_tick: 0,
        });
        state.transit_order.push(id);
        occupancy.insert(first);
        state.cooldowns.insert(cooldown_key, DWELL_TICKS);
        events.emit(Event::ItemEmitted {
            machine: port.machine,
            kind,
            tick,
        });
    }

    // Phase 4: per-machine processing.
    let coverage = PowerCoverage::build(registry, machines);
    for (id, machine) in machines.iter() {
        let Some(proto) = registry.get_prototype(machine.prototype) else {
            continue;
        };
        let mut status = match machine.placement {
            PlacementState::Overlap => MachineStatus::BlockedOverlap,
            PlacementState::OutOfBounds => MachineStatus::BlockedBoundary,
            PlacementState::Valid => {
                if proto.needs_power && !coverage.covers_machine(registry, machines, id) {
                    MachineStatus::Unpowered
                } else {
                    MachineStatus::Running
                }
            }
        };

        if let PrototypeRole::Processor {
            input,
            output,
            cycle_ticks,
            output_capacity,
            ..
        } = proto.role
            && status.is_running()
        {
            let mut progress = state.progress.get(&id).copied().unwrap_or(0);
            if progress == 0 {
                // Consume one input unit to start a new cycle.
                let in_key = StorageKey::new(id, StorageSide::In, input);
                if state.storage.remove(in_key, 1) == 1 {
                    summary.consumed.push((input, 1));
                    events.emit(Event::ItemConsumed {
                        machine: id,
                        kind: input,
                        tick,
                    });
                    events.emit(Event::CycleStarted { machine: id, tick });
                    progress = 1;
                } else {
                    status = MachineStatus::Starved;
                }
            } else {
                progress += 1;
            }

            if status.is_running() && progress >= cycle_ticks {
                let out_key = StorageKey::new(id, StorageSide::Out, output);
                if state.storage.add(out_key, 1, output_capacity) == 0 {
                    summary.produced.push((output, 1));
                    events.emit(Event::ItemProduced {
                        machine: id,
                        kind: output,
                        tick,
                    });
                    events.emit(Event::CycleCompleted { machine: id, tick });
                    progress = 0;
                } else {
                    // Output full: hold at the last pre-completion tick.
                    progress = cycle_ticks.saturating_sub(1);
                }
            }
            state.progress.insert(id, progress);
        }

        let previous = state.status.insert(id, status);
        if previous != Some(status) {
            if !status.is_running() {
                events.emit(Event::MachineStalled {
                    machine: id,
                    status,
                    tick,
                });
            } else if previous.is_some() {
                events.emit(Event::MachineResumed { machine: id, tick });
            }
        }
    }

    // Phase 5: bookkeeping.
    state.tick += 1;
    summary
}

/// Absorb one arriving item into a machine's input side.
///
/// Depots credit the external inventory (unbounded). Processors take the
/// item into bounded input storage, silently dropping it when full. Machines
/// without an input buffer lose the item outright.
#[allow(clippy::too_many_arguments)]
fn absorb(
    state: &mut SimState,
    registry: &Registry,
    machines: &MachineMap,
    machine: MachineId,
    kind: ItemKindId,
    tick: Ticks,
    events: &mut EventBus,
    summary: &mut TickSummary,
) {
    let role = machines
        .get(machine)
        .and_then(|m| registry.get_prototype(m.prototype))
        .map(|proto| proto.role.clone());

    match role {
        Some(PrototypeRole::Depot) => {
            *state.external.entry(kind).or_insert(0) += 1;
            summary.delivered.push((kind, 1));
            events.emit(Event::ItemDelivered {
                machine,
                kind,
                tick,
            });
        }
        Some(PrototypeRole::Processor { input_capacity, .. }) => {
            let key = StorageKey::new(machine, StorageSide::In, kind);
            if state.storage.add(key, 1, input_capacity) == 0 {
                events.emit(Event::ItemAbsorbed {
                    machine,
                    kind,
                    tick,
                });
            } else {
                events.emit(Event::ItemLost {
                    machine,
                    kind,
                    tick,
                });
            }
        }
        _ => {
            events.emit(Event::ItemLost {
                machine,
                kind,
                tick,
            });
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
