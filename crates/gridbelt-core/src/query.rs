//! Read-only query API for inspecting engine state.
//!
//! Provides snapshot types that aggregate engine state into convenient views
//! for rendering and UI consumers. All types are owned copies -- no
//! references into internal engine storage.

use crate::geometry::{GridPoint, Rotation};
use crate::id::{ItemKindId, MachineId, PrototypeId, TransitId};
use crate::machine::PlacementState;
use crate::sim::MachineStatus;

// ---------------------------------------------------------------------------
// Machine snapshot
// ---------------------------------------------------------------------------

/// An aggregated, read-only view of a single machine.
#[derive(Debug, Clone)]
pub struct MachineSnapshot {
    pub id: MachineId,
    pub prototype: PrototypeId,
    pub origin: GridPoint,
    pub rotation: Rotation,
    pub placement: PlacementState,
    /// Runtime status from the last tick; `None` before the first tick of a
    /// simulation run.
    pub status: Option<MachineStatus>,
    /// Process counter; 0 when idle.
    pub progress_tick: u32,
    /// Input storage contents, per item kind.
    pub input_contents: Vec<(ItemKindId, u32)>,
    /// Output storage contents, per item kind.
    pub output_contents: Vec<(ItemKindId, u32)>,
}

// ---------------------------------------------------------------------------
// Transit snapshot
// ---------------------------------------------------------------------------

/// A read-only view of one in-flight transit item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitSnapshot {
    pub id: TransitId,
    pub kind: ItemKindId,
    /// The cell the item currently occupies.
    pub cell: GridPoint,
    pub step_index: usize,
    pub step_tick: u32,
    pub path_len: usize,
}
