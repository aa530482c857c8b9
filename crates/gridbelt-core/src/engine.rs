//! The engine orchestrator: owns the authoritative topology and simulation
//! state behind a narrow command/query surface.
//!
//! Two modes, edit and simulate. Topology edits (drawing, deletion, machine
//! lifecycle) are only permitted in edit mode; entering simulate mode takes
//! one consistent route snapshot that stays fixed until the simulation is
//! stopped and the topology re-edited. Transient UI state (drag previews,
//! selection) lives with the caller, never here.

use crate::authoring::{BeltDraft, DraftContext, DraftError, ExtendOutcome, FinishKind, FinishReport};
use crate::deletion::{self, DeleteError, DeleteMode, DeleteReport};
use crate::event::{Event, EventBus};
use crate::fixed::Ticks;
use crate::geometry::{GridPoint, Rotation};
use crate::id::{ItemKindId, MachineId, PrototypeId};
use crate::machine::MachineMap;
use crate::query::{MachineSnapshot, TransitSnapshot};
use crate::registry::Registry;
use crate::routing::{BeltRoute, rebuild_routes};
use crate::segment::SegmentGraph;
use crate::sim::{self, SimState, StorageSide, TickSummary};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors surfaced by the command surface. Every variant is a local,
/// recoverable rejection; the engine never enters an unrecoverable state.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Draft(#[from] DraftError),
    #[error(transparent)]
    Delete(#[from] DeleteError),
    #[error("simulation is active; stop it before editing")]
    SimulationActive,
    #[error("no simulation is running")]
    NotSimulating,
    #[error("unknown prototype: {0:?}")]
    UnknownPrototype(PrototypeId),
}

/// Whether the engine is accepting edits or ticking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Edit,
    Simulate,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct Engine {
    registry: Registry,
    grid_size: i32,
    machines: MachineMap,
    graph: SegmentGraph,
    draft: Option<BeltDraft>,
    routes: Vec<BeltRoute>,
    mode: Mode,
    sim: SimState,
    events: EventBus,
}

impl Engine {
    /// Create an engine over a frozen registry and a square grid of the
    /// given side length.
    pub fn new(registry: Registry, grid_size: i32) -> Self {
        Self {
            registry,
            grid_size,
            machines: MachineMap::new(),
            graph: SegmentGraph::new(),
            draft: None,
            routes: Vec::new(),
            mode: Mode::Edit,
            sim: SimState::new(),
            events: EventBus::new(),
        }
    }

    fn draft_context(&self) -> DraftContext<'_> {
        DraftContext {
            registry: &self.registry,
            machines: &self.machines,
            grid_size: self.grid_size,
        }
    }

    fn ensure_routes(&mut self) {
        if self.graph.routes_dirty() {
            self.routes = rebuild_routes(&self.graph, &self.registry, &self.machines);
            self.graph.clear_routes_dirty();
        }
    }

    fn require_edit_mode(&self) -> Result<(), EngineError> {
        if self.mode == Mode::Simulate {
            return Err(EngineError::SimulationActive);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Belt drawing commands
    // -----------------------------------------------------------------------

    /// Begin a belt drag at `point`. A drag already in progress is discarded.
    pub fn start_belt_drag(&mut self, point: GridPoint) -> Result<(), EngineError> {
        self.require_edit_mode()?;
        self.draft = Some(BeltDraft::start(&self.draft_context(), point)?);
        Ok(())
    }

    /// Extend the active drag toward `point`. Without an active drag this is
    /// a no-op.
    pub fn extend_belt_drag(&mut self, point: GridPoint) -> ExtendOutcome {
        let Some(mut draft) = self.draft.take() else {
            return ExtendOutcome::default();
        };
        let outcome = draft.extend(&self.graph, &self.draft_context(), point);
        self.draft = Some(draft);
        outcome
    }

    /// Commit the active drag. Without an active drag this reports an empty
    /// passive result.
    pub fn finish_belt_drag(&mut self) -> FinishReport {
        let Some(draft) = self.draft.take() else {
            return FinishReport {
                kind: FinishKind::Passive,
                segments_added: 0,
                cells_added: 0,
            };
        };
        let ctx = DraftContext {
            registry: &self.registry,
            machines: &self.machines,
            grid_size: self.grid_size,
        };
        draft.finish(&mut self.graph, &ctx)
    }

    /// Discard the active drag, restoring the pre-drag base graph.
    pub fn cancel_belt_draw(&mut self) {
        self.draft = None;
    }

    /// The active drag's trace, for preview rendering.
    pub fn drag_trace(&self) -> Option<&[GridPoint]> {
        self.draft.as_ref().map(|d| d.trace())
    }

    // -----------------------------------------------------------------------
    // Deletion commands
    // -----------------------------------------------------------------------

    /// Delete topology at `point`. Clears all in-flight transit items.
    pub fn delete_at_cell(
        &mut self,
        point: GridPoint,
        mode: DeleteMode,
    ) -> Result<DeleteReport, EngineError> {
        self.require_edit_mode()?;
        let report = deletion::delete_at_cell(
            &mut self.graph,
            &self.registry,
            &self.machines,
            point,
            mode,
        )?;
        self.sim.clear_transit();
        Ok(report)
    }

    // -----------------------------------------------------------------------
    // Machine lifecycle commands
    // -----------------------------------------------------------------------

    /// Place a machine. Placement validity is recomputed for the whole set.
    pub fn place_machine(
        &mut self,
        prototype: PrototypeId,
        origin: GridPoint,
        rotation: Rotation,
    ) -> Result<MachineId, EngineError> {
        self.require_edit_mode()?;
        if self.registry.get_prototype(prototype).is_none() {
            return Err(EngineError::UnknownPrototype(prototype));
        }
        let id = self
            .machines
            .place(&self.registry, prototype, origin, rotation, self.grid_size);
        self.after_machine_change();
        Ok(id)
    }

    /// Move a machine. Unknown ids are a no-op.
    pub fn move_machine(&mut self, id: MachineId, origin: GridPoint) -> Result<(), EngineError> {
        self.require_edit_mode()?;
        if !self.machines.contains(id) {
            return Ok(());
        }
        self.machines
            .move_to(&self.registry, id, origin, self.grid_size);
        self.after_machine_change();
        Ok(())
    }

    /// Rotate a machine. Unknown ids are a no-op.
    pub fn rotate_machine(&mut self, id: MachineId, rotation: Rotation) -> Result<(), EngineError> {
        self.require_edit_mode()?;
        if !self.machines.contains(id) {
            return Ok(());
        }
        self.machines
            .rotate(&self.registry, id, rotation, self.grid_size);
        self.after_machine_change();
        Ok(())
    }

    /// Remove a machine. Unknown ids are a no-op.
    pub fn remove_machine(&mut self, id: MachineId) -> Result<(), EngineError> {
        self.require_edit_mode()?;
        if self
            .machines
            .remove(&self.registry, id, self.grid_size)
            .is_some()
        {
            self.after_machine_change();
        }
        Ok(())
    }

    /// Shared tail of every machine edit: segments whose endpoints were
    /// ports of the moved/removed machine are now dangling and get pruned,
    /// transit state is invalidated, and routes are marked for rebuild.
    fn after_machine_change(&mut self) {
        deletion::prune_dangling_segments(&mut self.graph, &self.registry, &self.machines);
        self.sim.clear_transit();
        self.graph.mark_routes_dirty();
    }

    // -----------------------------------------------------------------------
    // Simulation commands
    // -----------------------------------------------------------------------

    /// Enter simulate mode, taking one consistent route snapshot.
    pub fn start_simulation(&mut self) {
        self.draft = None;
        self.mode = Mode::Simulate;
        self.ensure_routes();
    }

    /// Leave simulate mode, discarding transient runtime state (transit
    /// items, cooldowns, progress) while preserving topology.
    pub fn stop_simulation(&mut self) {
        self.mode = Mode::Edit;
        self.sim.clear_runtime();
    }

    /// Advance the simulation one tick.
    pub fn step_tick(&mut self) -> Result<TickSummary, EngineError> {
        if self.mode != Mode::Simulate {
            return Err(EngineError::NotSimulating);
        }
        self.ensure_routes();
        Ok(sim::step(
            &mut self.sim,
            &self.registry,
            &self.machines,
            &self.graph,
            &self.routes,
            &mut self.events,
        ))
    }

    // -----------------------------------------------------------------------
    // Query surface
    // -----------------------------------------------------------------------

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn tick(&self) -> Ticks {
        self.sim.tick
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn grid_size(&self) -> i32 {
        self.grid_size
    }

    pub fn graph(&self) -> &SegmentGraph {
        &self.graph
    }

    pub fn machines(&self) -> &MachineMap {
        &self.machines
    }

    /// Direct simulation state access, e.g. to pre-load machine buffers.
    pub fn sim_mut(&mut self) -> &mut SimState {
        &mut self.sim
    }

    pub fn sim(&self) -> &SimState {
        &self.sim
    }

    /// Derived routes, rebuilt lazily when the topology is dirty.
    pub fn routes(&mut self) -> &[BeltRoute] {
        self.ensure_routes();
        &self.routes
    }

    /// Drain buffered simulation events, in emission order.
    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.drain()
    }

    pub fn external_inventory(&self) -> &BTreeMap<ItemKindId, u64> {
        self.sim.external_inventory()
    }

    pub fn transit_snapshots(&self) -> Vec<TransitSnapshot> {
        self.sim
            .transit_iter()
            .map(|(id, item)| TransitSnapshot {
                id,
                kind: item.kind,
                cell: item.cell(),
                step_index: item.step_index,
                step_tick: item.step_tick,
                path_len: item.path.len(),
            })
            .collect()
    }

    pub fn snapshot_machine(&self, id: MachineId) -> Option<MachineSnapshot> {
        let machine = self.machines.get(id)?;
        Some(MachineSnapshot {
            id,
            prototype: machine.prototype,
            origin: machine.origin,
            rotation: machine.rotation,
            placement: machine.placement,
            status: self.sim.machine_status(id),
            progress_tick: self.sim.machine_progress(id),
            input_contents: self.sim.storage().contents(id, StorageSide::In),
            output_contents: self.sim.storage().contents(id, StorageSide::Out),
        })
    }

    pub fn snapshot_all_machines(&self) -> Vec<MachineSnapshot> {
        self.machines
            .iter()
            .filter_map(|(id, _)| self.snapshot_machine(id))
            .collect()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
