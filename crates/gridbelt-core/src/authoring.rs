//! Interactive belt path authoring.
//!
//! A drag is a copy-on-write candidate overlay on top of the base segment
//! graph: the in-progress trace stages `(from, to)` segment pairs that are
//! only materialized into the graph arena on [`BeltDraft::finish`] and
//! discarded wholesale on cancel. Legality is checked cell-by-cell against
//! the combined view (base graph + staged overlay).
//!
//! Extension is prefix-atomic: the pointer target is expanded into an
//! L-shaped orthogonal fill (X gap first, then Y gap), candidate cells are
//! applied in order, and the first violation drops the remaining suffix
//! while keeping the validated prefix.

use crate::geometry::{Direction, GridPoint};
use crate::id::MachineId;
use crate::machine::{MachineMap, ResolvedPort};
use crate::registry::{PortKind, Registry};
use crate::segment::{NodeProfile, SegmentGraph};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Why an authoring command was rejected. Rejections are local: the trace
/// keeps its validated prefix and the caller may continue dragging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    #[error("start point is outside the grid")]
    StartOutsideGrid,
    #[error("cannot start a belt on an input port")]
    StartOnInputPort,
    #[error("cannot start a belt inside a building body")]
    StartInsideBody,
    #[error("target cell is outside the grid")]
    OutsideGrid,
    #[error("cannot branch from an existing corner")]
    BranchFromCorner,
    #[error("not allowed to retrace existing belt")]
    RetraceExisting,
    #[error("head-on collision with oncoming belt")]
    HeadOnCollision,
    #[error("junction must be single-in or single-out")]
    JunctionNotSingle,
    #[error("belt must leave an output port along its direction")]
    OutputDirectionMismatch,
    #[error("input ports are terminal")]
    InputPortTerminal,
    #[error("path enters building body")]
    PathEntersBody,
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Read-only world view the state machine validates against.
pub struct DraftContext<'a> {
    pub registry: &'a Registry,
    pub machines: &'a MachineMap,
    pub grid_size: i32,
}

impl DraftContext<'_> {
    pub fn in_bounds(&self, p: GridPoint) -> bool {
        p.x >= 0 && p.y >= 0 && p.x < self.grid_size && p.y < self.grid_size
    }

    pub fn port_at(&self, p: GridPoint) -> Option<ResolvedPort> {
        self.machines.port_at(self.registry, p)
    }

    pub fn machine_at(&self, p: GridPoint) -> Option<MachineId> {
        self.machines.machine_at(self.registry, p)
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// What a single extend call did to the trace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtendOutcome {
    /// Cells appended to the trace.
    pub cells_added: usize,
    /// Cells removed by undo-by-retrace.
    pub cells_removed: usize,
    /// The check that aborted the fill, if any. The validated prefix is kept.
    pub rejected: Option<DraftError>,
}

/// Whether a finished trace carries transport capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishKind {
    /// Output port to input port: a route can be derived.
    Connected,
    /// Kept as passive topology; produces no route.
    Passive,
}

/// Result of committing a drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinishReport {
    pub kind: FinishKind,
    pub segments_added: usize,
    pub cells_added: usize,
}

enum StepApplied {
    Added,
    Backtracked,
}

// ---------------------------------------------------------------------------
// BeltDraft
// ---------------------------------------------------------------------------

/// An in-progress drag: the trace so far plus the staged segment overlay.
///
/// Invariant: `staged.len() == trace.len() - 1`; staged segment `i` connects
/// `trace[i]` to `trace[i + 1]` in drawing order.
#[derive(Debug, Clone)]
pub struct BeltDraft {
    trace: Vec<GridPoint>,
    staged: Vec<(GridPoint, GridPoint)>,
}

impl BeltDraft {
    /// Begin a drag at `origin`.
    pub fn start(ctx: &DraftContext<'_>, origin: GridPoint) -> Result<Self, DraftError> {
        if !ctx.in_bounds(origin) {
            return Err(DraftError::StartOutsideGrid);
        }
        if let Some(port) = ctx.port_at(origin) {
            if port.kind == PortKind::In {
                return Err(DraftError::StartOnInputPort);
            }
        } else if ctx.machine_at(origin).is_some() {
            return Err(DraftError::StartInsideBody);
        }
        Ok(Self {
            trace: vec![origin],
            staged: Vec::new(),
        })
    }

    /// The trace so far, in drawing order.
    pub fn trace(&self) -> &[GridPoint] {
        &self.trace
    }

    /// Extend the trace toward `target` via an L-shaped fill: close the X
    /// gap one cell at a time, then the Y gap. Applies the longest valid
    /// prefix and reports the first violation, if any.
    pub fn extend(
        &mut self,
        graph: &SegmentGraph,
        ctx: &DraftContext<'_>,
        target: GridPoint,
    ) -> ExtendOutcome {
        let mut outcome = ExtendOutcome::default();
        loop {
            let Some(&tip) = self.trace.last() else {
                break;
            };
            if tip == target {
                break;
            }
            let next = if target.x != tip.x {
                GridPoint::new(tip.x + (target.x - tip.x).signum(), tip.y)
            } else {
                GridPoint::new(tip.x, tip.y + (target.y - tip.y).signum())
            };
            match self.try_step(graph, ctx, tip, next) {
                Ok(StepApplied::Added) => outcome.cells_added += 1,
                Ok(StepApplied::Backtracked) => outcome.cells_removed += 1,
                Err(reason) => {
                    outcome.rejected = Some(reason);
                    break;
                }
            }
        }
        outcome
    }

    /// Apply the per-cell legality checks, in order, for the step tip->next.
    fn try_step(
        &mut self,
        graph: &SegmentGraph,
        ctx: &DraftContext<'_>,
        tip: GridPoint,
        next: GridPoint,
    ) -> Result<StepApplied, DraftError> {
        // 1. Immediate backtrack pops the tip instead of erroring.
        if self.trace.len() >= 2 && next == self.trace[self.trace.len() - 2] {
            self.trace.pop();
            self.staged.pop();
            return Ok(StepApplied::Backtracked);
        }

        if !ctx.in_bounds(next) {
            return Err(DraftError::OutsideGrid);
        }

        // 2. An existing corner in the base graph cannot gain a branch.
        if graph.profile(tip).is_corner() {
            return Err(DraftError::BranchFromCorner);
        }

        // 3. Re-tracing a committed or staged segment.
        if self.edge_exists(graph, tip, next) {
            return Err(DraftError::RetraceExisting);
        }

        let extra = (tip, next);

        // 4. No node may gain opposed incoming or opposed outgoing segments.
        if self.head_on(graph, tip, extra) || self.head_on(graph, next, extra) {
            return Err(DraftError::HeadOnCollision);
        }

        // 5. A node crossing into degree 4 as a turn or endpoint must be a
        //    pure split or pure merge; a straight pass-through forming a
        //    2h+2v crossing is the bridge exemption.
        for node in [tip, next] {
            let before = self.profile_with(graph, node, None);
            let after = self.profile_with(graph, node, Some(extra));
            if before.degree < 4 && after.degree >= 4 {
                let straight_through = node == tip
                    && self.trace.len() >= 2
                    && self.trace[self.trace.len() - 2].direction_to(&tip)
                        == tip.direction_to(&next);
                let exempt = straight_through && after.is_crossing();
                if !exempt && !(after.incoming == 1 || after.outgoing == 1) {
                    return Err(DraftError::JunctionNotSingle);
                }
            }
        }

        // 6. Ports constrain the step leaving them.
        if let Some(port) = ctx.port_at(tip) {
            match port.kind {
                PortKind::Out => {
                    if tip.direction_to(&next) != Some(port.direction) {
                        return Err(DraftError::OutputDirectionMismatch);
                    }
                }
                PortKind::In => return Err(DraftError::InputPortTerminal),
            }
        }

        // 7. A footprint cell is enterable only as an input port, along the
        //    port's declared direction.
        if ctx.machine_at(next).is_some() {
            let entry_ok = ctx.port_at(next).is_some_and(|port| {
                port.kind == PortKind::In && tip.direction_to(&next) == Some(port.direction)
            });
            if !entry_ok {
                return Err(DraftError::PathEntersBody);
            }
        }

        self.staged.push(extra);
        self.trace.push(next);
        Ok(StepApplied::Added)
    }

    /// Commit the overlay: materialize staged segments, derive belt cells,
    /// and classify the trace as connected or passive.
    pub fn finish(self, graph: &mut SegmentGraph, ctx: &DraftContext<'_>) -> FinishReport {
        // Canonicalize: collapse consecutive duplicate points.
        let mut trace: Vec<GridPoint> = Vec::with_capacity(self.trace.len());
        for cell in self.trace {
            if trace.last() != Some(&cell) {
                trace.push(cell);
            }
        }

        let mut segments_added = 0;
        for (from, to) in self.staged {
            if graph.add(from, to).is_ok() {
                segments_added += 1;
            }
        }

        let mut cells_added = 0;
        if trace.len() >= 2 {
            for &cell in &trace {
                if ctx.port_at(cell).is_none() && !graph.is_belt_cell(cell) {
                    graph.add_belt_cell(cell);
                    cells_added += 1;
                }
            }
        }

        let connected = trace.len() >= 2
            && ctx
                .port_at(trace[0])
                .is_some_and(|p| p.kind == PortKind::Out)
            && ctx
                .port_at(trace[trace.len() - 1])
                .is_some_and(|p| p.kind == PortKind::In);

        graph.mark_routes_dirty();

        FinishReport {
            kind: if connected {
                FinishKind::Connected
            } else {
                FinishKind::Passive
            },
            segments_added,
            cells_added,
        }
    }

    // -----------------------------------------------------------------------
    // Combined-view helpers (base graph + staged overlay)
    // -----------------------------------------------------------------------

    fn edge_exists(&self, graph: &SegmentGraph, a: GridPoint, b: GridPoint) -> bool {
        let key = GridPoint::edge_key(a, b);
        graph.contains_edge(a, b)
            || self
                .staged
                .iter()
                .any(|&(f, t)| GridPoint::edge_key(f, t) == key)
    }

    fn profile_with(
        &self,
        graph: &SegmentGraph,
        node: GridPoint,
        extra: Option<(GridPoint, GridPoint)>,
    ) -> NodeProfile {
        let mut profile = graph.profile(node);
        let mut add = |from: GridPoint, to: GridPoint| {
            if from != node && to != node {
                return;
            }
            profile.degree += 1;
            if to == node {
                profile.incoming += 1;
            }
            if from == node {
                profile.outgoing += 1;
            }
            if from.y == to.y {
                profile.horizontal += 1;
            } else {
                profile.vertical += 1;
            }
        };
        for &(f, t) in &self.staged {
            add(f, t);
        }
        if let Some((f, t)) = extra {
            add(f, t);
        }
        profile
    }

    /// True if `node` would end up with two incoming segments from opposite
    /// sides, or two outgoing segments to opposite sides.
    fn head_on(
        &self,
        graph: &SegmentGraph,
        node: GridPoint,
        extra: (GridPoint, GridPoint),
    ) -> bool {
        let mut in_dirs: Vec<Direction> = Vec::new();
        let mut out_dirs: Vec<Direction> = Vec::new();
        let mut note = |from: GridPoint, to: GridPoint| {
            if to == node
                && let Some(d) = node.direction_to(&from)
            {
                in_dirs.push(d);
            }
            if from == node
                && let Some(d) = node.direction_to(&to)
            {
                out_dirs.push(d);
            }
        };
        for &id in graph.incident(node) {
            if let Some(seg) = graph.get(id) {
                note(seg.from, seg.to);
            }
        }
        for &(f, t) in &self.staged {
            note(f, t);
        }
        note(extra.0, extra.1);

        let opposed = |dirs: &[Direction]| dirs.iter().any(|d| dirs.contains(&d.opposite()));
        opposed(&in_dirs) || opposed(&out_dirs)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
