//! Topology deletion: single-cell removal and rule-aware whole-line removal.
//!
//! Whole-line removal is a constrained traversal over the segment graph:
//! branch points (degree 3) terminate the cut, crossings pass it straight
//! through, everything else propagates it. All visited segments go in one
//! operation, so a half-deleted line is never observable.

use crate::geometry::GridPoint;
use crate::id::SegmentId;
use crate::machine::MachineMap;
use crate::registry::Registry;
use crate::segment::SegmentGraph;
use std::collections::BTreeSet;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Which removal rule to apply at a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
    /// Remove only the belt cell at the point, pruning dangling segments.
    Cell,
    /// Remove the whole connected line through the point.
    Line,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeleteError {
    #[error("nothing to delete")]
    NothingToDelete,
}

/// What a deletion removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteReport {
    pub segments_removed: usize,
    pub cells_removed: usize,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Delete topology at `point` using the given mode.
pub fn delete_at_cell(
    graph: &mut SegmentGraph,
    registry: &Registry,
    machines: &MachineMap,
    point: GridPoint,
    mode: DeleteMode,
) -> Result<DeleteReport, DeleteError> {
    match mode {
        DeleteMode::Cell => delete_cell(graph, registry, machines, point),
        DeleteMode::Line => delete_line(graph, point),
    }
}

// ---------------------------------------------------------------------------
// By-cell
// ---------------------------------------------------------------------------

/// Remove the single belt cell at `point`, then prune every segment with an
/// endpoint that is neither a port nor a still-present belt cell.
fn delete_cell(
    graph: &mut SegmentGraph,
    registry: &Registry,
    machines: &MachineMap,
    point: GridPoint,
) -> Result<DeleteReport, DeleteError> {
    if !graph.remove_belt_cell(point) {
        return Err(DeleteError::NothingToDelete);
    }

    let mut report = DeleteReport {
        cells_removed: 1,
        ..Default::default()
    };
    report.segments_removed = prune_dangling_segments(graph, registry, machines);
    Ok(report)
}

/// Remove every segment with an endpoint that is neither a port nor a belt
/// cell. Returns the number of segments removed. Shared with the machine
/// lifecycle operations, which orphan segments the same way a removed belt
/// cell does.
pub fn prune_dangling_segments(
    graph: &mut SegmentGraph,
    registry: &Registry,
    machines: &MachineMap,
) -> usize {
    let doomed: Vec<SegmentId> = graph
        .iter()
        .filter(|(_, seg)| {
            [seg.from, seg.to].iter().any(|&endpoint| {
                !graph.is_belt_cell(endpoint)
                    && machines.port_at(registry, endpoint).is_none()
            })
        })
        .map(|(id, _)| id)
        .collect();

    let count = doomed.len();
    for id in doomed {
        graph.remove(id);
    }
    count
}

// ---------------------------------------------------------------------------
// Whole-line
// ---------------------------------------------------------------------------

/// Remove the connected line through `point`.
///
/// The walk starts from all segments incident to the point. From each
/// frontier segment it continues past the far endpoint according to the
/// continuation rule:
/// - degree exactly 3: the walk stops there entirely;
/// - degree-4 crossing (2h+2v): only the segment collinear with the incoming
///   direction continues (the crossing traffic is preserved);
/// - otherwise: every other incident segment continues the walk.
///
/// Degrees are taken from the graph as it stood when the operation began;
/// all visited segments are deleted as one operation.
fn delete_line(graph: &mut SegmentGraph, point: GridPoint) -> Result<DeleteReport, DeleteError> {
    let seeds: Vec<SegmentId> = graph.incident(point).to_vec();
    if seeds.is_empty() {
        return Err(DeleteError::NothingToDelete);
    }

    let mut visited: BTreeSet<SegmentId> = BTreeSet::new();
    // (segment, endpoint we entered it from)
    let mut frontier: Vec<(SegmentId, GridPoint)> = Vec::new();
    for id in seeds {
        if visited.insert(id) {
            frontier.push((id, point));
        }
    }

    while let Some((id, near)) = frontier.pop() {
        let Some(seg) = graph.get(id).copied() else {
            continue;
        };
        let far = seg.other(near);
        let profile = graph.profile(far);

        if profile.degree == 3 {
            // Branch points terminate the cut.
            continue;
        }

        if profile.is_crossing() {
            // Straight-through only.
            if let Some(dir) = near.direction_to(&far) {
                let beyond = far.step(dir);
                for &next in graph.incident(far) {
                    if next == id {
                        continue;
                    }
                    if let Some(next_seg) = graph.get(next)
                        && next_seg.touches(beyond)
                        && visited.insert(next)
                    {
                        frontier.push((next, far));
                    }
                }
            }
            continue;
        }

        for &next in graph.incident(far) {
            if next != id && visited.insert(next) {
                frontier.push((next, far));
            }
        }
    }

    let mut report = DeleteReport::default();
    let mut touched: BTreeSet<GridPoint> = BTreeSet::new();
    for id in visited {
        if let Some(seg) = graph.remove(id) {
            report.segments_removed += 1;
            touched.insert(seg.from);
            touched.insert(seg.to);
        }
    }

    // A belt cell with no remaining segment is unreachable by any route.
    for cell in touched {
        if graph.degree(cell) == 0 && graph.remove_belt_cell(cell) {
            report.cells_removed += 1;
        }
    }

    Ok(report)
}

// ===========================================================================
// Tests
// ===========================================================================
