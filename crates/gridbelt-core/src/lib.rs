//! Gridbelt Core -- the belt topology and tick-flow simulation engine for
//! grid-based factory sandboxes.
//!
//! Machines occupy rectangular footprints on a square grid and expose typed,
//! rotation-aware ports. Belts are authored interactively as an undirected
//! segment graph of unit edges; directed output-port -> input-port routes are
//! derived from it, and a discrete tick engine moves items along those routes
//! under capacity and single-occupancy rules.
//!
//! # Five-Phase Tick Pipeline
//!
//! Each call to [`engine::Engine::step_tick`] advances the simulation by one
//! tick through the following phases:
//!
//! 1. **Cooldown decay** -- output-port emission cooldowns tick down.
//! 2. **Transit** -- in-flight items dwell, advance one cell, or are absorbed.
//! 3. **Emit** -- eligible output ports spawn new transit items onto routes.
//! 4. **Process** -- machine statuses and cycle progress; consume/produce.
//! 5. **Bookkeeping** -- tick counter and buffered event delivery.
//!
//! # Authoring Pattern
//!
//! Belt edits are staged, never immediate: a drag accumulates a candidate
//! overlay that is committed atomically on finish or discarded on cancel:
//!
//! ```rust,ignore
//! engine.start_belt_drag(origin)?;
//! engine.extend_belt_drag(pointer);   // longest valid prefix is kept
//! let report = engine.finish_belt_drag();
//! ```
//!
//! # Key Types
//!
//! - [`engine::Engine`] -- orchestrator and command/query surface.
//! - [`segment::SegmentGraph`] -- the authoritative belt topology.
//! - [`authoring::BeltDraft`] -- the interactive drawing state machine.
//! - [`routing::BeltRoute`] -- derived directed routes with explicit paths.
//! - [`sim::SimState`] -- transit items, storage, statuses, progress.
//! - [`registry::Registry`] -- immutable item kinds and machine prototypes
//!   (frozen at startup).
//! - [`event::EventBus`] -- buffered simulation events for consumers such as
//!   the statistics crate.

pub mod authoring;
#[cfg(feature = "data-loader")]
pub mod data_loader;
pub mod deletion;
pub mod engine;
pub mod event;
pub mod fixed;
pub mod geometry;
pub mod id;
pub mod machine;
pub mod power;
pub mod query;
pub mod registry;
pub mod routing;
pub mod segment;
pub mod sim;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
