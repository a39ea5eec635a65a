//! Read-only timer state and the one-shot events handed to the presentation layer.

use super::durations::{CropType, PlanterType, Stage};

/// Remaining seconds at or below which the five-minute warning is raised.
pub const FIVE_MINUTES: f64 = 300.0;
/// Remaining seconds at or below which the one-minute warning is raised.
pub const ONE_MINUTE: f64 = 60.0;

/// How close the current stage is to ending. Only moves forward within a stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WarningLevel {
    #[default]
    None,
    FiveMin,
    OneMin,
}

/// Time left in the current stage.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Remaining {
    Seconds(f64),
    /// Seeding never ends; shown as ∞ and never counted down.
    Unbounded,
}

impl Remaining {
    pub fn as_secs(self) -> Option<f64> {
        match self {
            Remaining::Seconds(secs) => Some(secs),
            Remaining::Unbounded => None,
        }
    }
}

impl std::fmt::Display for Remaining {
    /// Formats as `MM:SS`, rounding partial seconds up, or `∞`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Remaining::Unbounded => write!(f, "∞"),
            Remaining::Seconds(secs) => {
                let total = secs.max(0.0).ceil() as u64;
                write!(f, "{:02}:{:02}", total / 60, total % 60)
            }
        }
    }
}

/// Immutable copy of the engine state, produced after every operation.
#[derive(Clone, Debug, PartialEq)]
pub struct TimerSnapshot {
    pub stage: Stage,
    pub remaining: Remaining,
    /// Crop after any auto-detect override.
    pub crop: CropType,
    pub planter: PlanterType,
    pub warning: WarningLevel,
    /// True while a stage is counting down.
    pub running: bool,
    /// Growth progress: derived from remaining time while Growing, 100 afterwards.
    pub progress_percent: f64,
    /// Full duration of the current stage, `None` for Seeding.
    pub stage_total: Option<f64>,
}

impl TimerSnapshot {
    /// Idle means no run has been started since construction or the last reset.
    pub fn is_idle(&self) -> bool {
        !self.running && self.stage == Stage::Growing
    }
}

/// Discrete cues that fire exactly once per occurrence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerEvent {
    /// The given stage ran out and the next one began.
    StageCompleted(Stage),
    WarningRaised(WarningLevel),
}

/// Result of every engine operation.
#[derive(Clone, Debug)]
pub struct TimerUpdate {
    pub snapshot: TimerSnapshot,
    pub events: Vec<TimerEvent>,
}
