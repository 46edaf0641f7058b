use crate::roster::{ClassId, Conflict, Roster, StudentIdx};
use serde::Serialize;
use strum_macros::Display;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
pub enum Phase {
    Dispatch,
    Grouping,
    Separation,
    Rebalance,
    Completion,
    Parity,
    Optimize,
}

/// Structured notifications emitted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PlacementEvent {
    Placed {
        phase: Phase,
        student: String,
        class: String,
    },
    Moved {
        phase: Phase,
        student: String,
        from: String,
        to: String,
    },
    Swapped {
        phase: Phase,
        first: String,
        second: String,
    },
    ConflictDetected(Conflict),
    PhaseFinished {
        phase: Phase,
        count: usize,
    },
    RestartFinished {
        restart: usize,
        score: f32,
        swaps: usize,
        valid: bool,
    },
}

/// Receiver for engine events. Also carries the cooperative cancellation check.
pub trait EventSink: Send + Sync {
    fn on_event(&self, event: &PlacementEvent);

    /// Polled between optimizer iterations and between restarts.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Discards everything.
pub struct NullSink;

impl EventSink for NullSink {
    fn on_event(&self, _event: &PlacementEvent) {}
}

/// Forwards events to `tracing`.
pub struct TracingSink;

impl EventSink for TracingSink {
    fn on_event(&self, event: &PlacementEvent) {
        match event {
            PlacementEvent::Placed {
                phase,
                student,
                class,
            } => debug!(%phase, %student, %class, "placed"),
            PlacementEvent::Moved {
                phase,
                student,
                from,
                to,
            } => debug!(%phase, %student, %from, %to, "moved"),
            PlacementEvent::Swapped {
                phase,
                first,
                second,
            } => debug!(%phase, %first, %second, "swapped"),
            PlacementEvent::ConflictDetected(c) => warn!("{}", c),
            PlacementEvent::PhaseFinished { phase, count } => {
                info!(%phase, count, "phase finished")
            }
            PlacementEvent::RestartFinished {
                restart,
                score,
                swaps,
                valid,
            } => info!(restart, score, swaps, valid, "restart finished"),
        }
    }
}

/// Writes the new class on the student and emits `Placed` or `Moved`.
pub(crate) fn assign_student(
    roster: &mut Roster,
    si: StudentIdx,
    to: ClassId,
    phase: Phase,
    sink: &dyn EventSink,
) {
    let from = roster.students[si].assigned.replace(to);
    let student = roster.students[si].id.clone();
    let class = roster.classes[to].name.clone();
    debug!("{}: {} -> {}", phase, student, class);
    let event = match from {
        Some(f) => PlacementEvent::Moved {
            phase,
            student,
            from: roster.classes[f].name.clone(),
            to: class,
        },
        None => PlacementEvent::Placed {
            phase,
            student,
            class,
        },
    };
    sink.on_event(&event);
}

/// Logs a conflict and forwards it to the sink.
pub(crate) fn report_conflict(conflicts: &mut Vec<Conflict>, sink: &dyn EventSink, conflict: Conflict) {
    warn!("{}", conflict);
    sink.on_event(&PlacementEvent::ConflictDetected(conflict.clone()));
    conflicts.push(conflict);
}
