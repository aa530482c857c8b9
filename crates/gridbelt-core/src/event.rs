//! Typed simulation events with buffered delivery.
//!
//! Events are emitted during the tick phases and delivered in batch after
//! the tick completes: consumers drain the bus, they are never called back
//! mid-tick. The statistics crate is the primary consumer.

use crate::fixed::Ticks;
use crate::id::{ItemKindId, MachineId};
use crate::sim::MachineStatus;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A simulation event. All events carry the tick at which they occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // -- Transport --
    /// An output port spawned a transit item onto its route.
    ItemEmitted {
        machine: MachineId,
        kind: ItemKindId,
        tick: Ticks,
    },
    /// A transit item was absorbed into a machine's input storage.
    ItemAbsorbed {
        machine: MachineId,
        kind: ItemKindId,
        tick: Ticks,
    },
    /// A transit item arrived at a depot and was credited to the external
    /// inventory.
    ItemDelivered {
        machine: MachineId,
        kind: ItemKindId,
        tick: Ticks,
    },
    /// A transit item arrived at a full input storage and was dropped.
    ItemLost {
        machine: MachineId,
        kind: ItemKindId,
        tick: Ticks,
    },

    // -- Processing --
    ItemConsumed {
        machine: MachineId,
        kind: ItemKindId,
        tick: Ticks,
    },
    ItemProduced {
        machine: MachineId,
        kind: ItemKindId,
        tick: Ticks,
    },
    CycleStarted {
        machine: MachineId,
        tick: Ticks,
    },
    CycleCompleted {
        machine: MachineId,
        tick: Ticks,
    },

    // -- Machine state --
    /// Fired on the transition into a non-running status.
    MachineStalled {
        machine: MachineId,
        status: MachineStatus,
        tick: Ticks,
    },
    /// Fired on the transition back to running.
    MachineResumed {
        machine: MachineId,
        tick: Ticks,
    },
}

/// Discriminant tag for event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ItemEmitted,
    ItemAbsorbed,
    ItemDelivered,
    ItemLost,
    ItemConsumed,
    ItemProduced,
    CycleStarted,
    CycleCompleted,
    MachineStalled,
    MachineResumed,
}

impl Event {
    /// Get the discriminant kind for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::ItemEmitted { .. } => EventKind::ItemEmitted,
            Event::ItemAbsorbed { .. } => EventKind::ItemAbsorbed,
            Event::ItemDelivered { .. } => EventKind::ItemDelivered,
            Event::ItemLost { .. } => EventKind::ItemLost,
            Event::ItemConsumed { .. } => EventKind::ItemConsumed,
            Event::ItemProduced { .. } => EventKind::ItemProduced,
            Event::CycleStarted { .. } => EventKind::CycleStarted,
            Event::CycleCompleted { .. } => EventKind::CycleCompleted,
            Event::MachineStalled { .. } => EventKind::MachineStalled,
            Event::MachineResumed { .. } => EventKind::MachineResumed,
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Buffered event delivery: emitted during the tick, drained afterwards.
#[derive(Debug, Default)]
pub struct EventBus {
    buffer: Vec<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event for end-of-tick delivery.
    pub fn emit(&mut self, event: Event) {
        self.buffer.push(event);
    }

    /// Drain all buffered events in emission order.
    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.buffer)
    }

    /// Number of undelivered events.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
