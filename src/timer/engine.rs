//! Stage timer state machine.
//!
//! Sequences a plant through Growing → Ready → Flowering → Seeding.
//! While Growing, the on-screen percentage is the authoritative signal and
//! remaining time is derived from it; between samples (and in the fixed-length
//! Ready and Flowering stages) the remaining time counts down with the clock.
//!
//! All operations take the current monotonic time explicitly and return a
//! [`TimerUpdate`]. Invalid input is ignored rather than reported as an error.

use std::time::Instant;

use tracing::{debug, info};

use super::durations::{growing_duration, stage_duration, CropLabel, CropType, PlanterType, Stage};
use super::resolver::{CropResolver, TimerSettings};
use super::snapshot::{
    Remaining, TimerEvent, TimerSnapshot, TimerUpdate, WarningLevel, FIVE_MINUTES, ONE_MINUTE,
};

/// One OCR observation.
#[derive(Clone, Debug)]
pub struct Sample {
    /// When the screen region was captured, not when OCR finished.
    pub captured_at: Instant,
    pub percent: Option<f64>,
    pub detected_crop: CropLabel,
}

impl Sample {
    /// The percentage if present and within [0, 100].
    pub fn valid_percent(&self) -> Option<f64> {
        self.percent
            .filter(|p| p.is_finite() && (0.0..=100.0).contains(p))
    }
}

#[derive(Clone, Debug)]
struct TimerState {
    stage: Stage,
    /// Seconds left in a timed stage. Meaningless once Seeding.
    remaining: f64,
    crop: CropType,
    planter: PlanterType,
    warning: WarningLevel,
    running: bool,
}

impl TimerState {
    fn idle(settings: &TimerSettings) -> Self {
        Self {
            stage: Stage::Growing,
            remaining: 0.0,
            crop: settings.crop,
            planter: settings.planter,
            warning: WarningLevel::None,
            running: false,
        }
    }
}

/// The stage timer engine.
///
/// Holds no locks. Tick and sample ingestion must be serialized onto one thread.
pub struct StageTimer {
    settings: TimerSettings,
    resolver: CropResolver,
    state: TimerState,
    /// Start of the current run. Samples captured earlier are stale.
    run_started: Option<Instant>,
    /// Instant the remaining time was last brought up to date.
    clock_anchor: Option<Instant>,
    /// Capture time of the newest sample applied this run.
    last_sample_at: Option<Instant>,
}

impl StageTimer {
    pub fn new(settings: TimerSettings) -> Self {
        Self {
            resolver: CropResolver::new(&settings),
            state: TimerState::idle(&settings),
            settings,
            run_started: None,
            clock_anchor: None,
            last_sample_at: None,
        }
    }

    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    /// Starts a new run in the Growing stage.
    ///
    /// Ignored while a stage is counting down. Starting after the previous run
    /// reached Seeding begins a fresh run.
    pub fn start(&mut self, now: Instant) -> TimerUpdate {
        if self.state.running {
            debug!(stage = %self.state.stage, "start ignored: timer already running");
            return self.update(Vec::new());
        }

        self.resolver = CropResolver::new(&self.settings);
        let crop = self.resolver.effective();
        self.state = TimerState {
            stage: Stage::Growing,
            remaining: growing_duration(crop),
            crop,
            planter: self.settings.planter,
            warning: WarningLevel::None,
            running: true,
        };
        self.run_started = Some(now);
        self.clock_anchor = Some(now);
        self.last_sample_at = None;

        info!(
            crop = %crop,
            planter = %self.state.planter,
            remaining = self.state.remaining,
            "Timer started"
        );
        self.update(Vec::new())
    }

    /// Applies one OCR sample. Only meaningful while Growing.
    ///
    /// A valid percentage sets remaining time to
    /// `growing_duration * (1 - percent / 100)`. A missing or out-of-range
    /// percentage lets the previous value keep counting down with the clock.
    pub fn ingest_sample(&mut self, sample: &Sample) -> TimerUpdate {
        if !self.state.running || self.state.stage != Stage::Growing {
            debug!(stage = %self.state.stage, running = self.state.running, "sample ignored outside Growing");
            return self.update(Vec::new());
        }
        if self.is_stale(sample.captured_at) {
            debug!("stale sample dropped");
            return self.update(Vec::new());
        }
        self.last_sample_at = Some(sample.captured_at);

        match sample.valid_percent() {
            Some(percent) => {
                if let Some(crop) = self.resolver.observe(sample.detected_crop) {
                    info!(from = %self.state.crop, to = %crop, "Crop type detected");
                    self.state.crop = crop;
                }
                self.state.remaining = growing_duration(self.state.crop) * (1.0 - percent / 100.0);
                self.clock_anchor = Some(sample.captured_at);
                debug!(percent, remaining = self.state.remaining, "percentage sample applied");
            }
            None => {
                if let Some(percent) = sample.percent {
                    debug!(percent, "out-of-range percentage treated as missing");
                }
                self.advance_clock(sample.captured_at);
                if let Some(crop) = self.resolver.observe(sample.detected_crop) {
                    info!(from = %self.state.crop, to = %crop, "Crop type detected");
                    self.switch_growing_crop(crop);
                }
            }
        }

        let mut events = Vec::new();
        self.settle(&mut events);
        self.update(events)
    }

    /// Counts the current stage down by the wall-clock time since the last update.
    /// No-op when idle or in Seeding.
    pub fn tick(&mut self, now: Instant) -> TimerUpdate {
        if !self.state.running {
            return self.update(Vec::new());
        }
        self.advance_clock(now);
        let mut events = Vec::new();
        self.settle(&mut events);
        self.update(events)
    }

    /// Returns to idle from any state and forgets any crop detection.
    pub fn reset(&mut self) -> TimerUpdate {
        self.resolver = CropResolver::new(&self.settings);
        self.state = TimerState::idle(&self.settings);
        self.run_started = None;
        self.clock_anchor = None;
        self.last_sample_at = None;
        info!("Timer reset");
        self.update(Vec::new())
    }

    /// Replaces the configuration snapshot.
    ///
    /// Crop and planter take effect at the next start. Toggling auto-detect
    /// while Growing re-resolves the crop immediately; once Growing is over
    /// the crop stays fixed for the rest of the run.
    pub fn apply_settings(&mut self, settings: TimerSettings, now: Instant) -> TimerUpdate {
        let auto_detect_changed = settings.auto_detect != self.settings.auto_detect;
        self.settings = settings;

        if self.snapshot().is_idle() {
            self.resolver = CropResolver::new(&settings);
            self.state = TimerState::idle(&settings);
            return self.update(Vec::new());
        }

        let mut events = Vec::new();
        if self.state.running && auto_detect_changed {
            self.advance_clock(now);
            if self.resolver.set_auto_detect(settings.auto_detect) {
                let crop = self.resolver.effective();
                if self.state.stage == Stage::Growing {
                    info!(crop = %crop, auto_detect = settings.auto_detect, "Crop re-resolved after auto-detect toggle");
                    self.switch_growing_crop(crop);
                } else {
                    debug!(stage = %self.state.stage, crop = %self.state.crop, "Crop kept after Growing");
                }
            }
            self.settle(&mut events);
        } else {
            self.resolver.set_auto_detect(settings.auto_detect);
        }
        self.update(events)
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        let state = &self.state;
        let stage_total = stage_duration(state.crop, state.stage, state.planter);
        let remaining = if state.stage.is_timed() {
            Remaining::Seconds(state.remaining)
        } else {
            Remaining::Unbounded
        };
        let progress_percent = match (state.stage, state.running, stage_total) {
            (Stage::Growing, true, Some(total)) if total > 0.0 => {
                ((1.0 - state.remaining / total) * 100.0).clamp(0.0, 100.0)
            }
            (Stage::Growing, _, _) => 0.0,
            _ => 100.0,
        };

        TimerSnapshot {
            stage: state.stage,
            remaining,
            crop: state.crop,
            planter: state.planter,
            warning: state.warning,
            running: state.running,
            progress_percent,
            stage_total,
        }
    }

    fn update(&self, events: Vec<TimerEvent>) -> TimerUpdate {
        TimerUpdate {
            snapshot: self.snapshot(),
            events,
        }
    }

    fn is_stale(&self, captured_at: Instant) -> bool {
        self.run_started.is_some_and(|start| captured_at < start)
            || self.last_sample_at.is_some_and(|last| captured_at < last)
    }

    /// Decrements remaining time by the time elapsed since the clock anchor.
    fn advance_clock(&mut self, now: Instant) {
        let Some(anchor) = self.clock_anchor else {
            self.clock_anchor = Some(now);
            return;
        };
        if now <= anchor {
            return;
        }
        let elapsed = now.duration_since(anchor).as_secs_f64();
        self.state.remaining = (self.state.remaining - elapsed).max(0.0);
        self.clock_anchor = Some(now);
    }

    /// Moves Growing remaining time onto another crop's duration, keeping the
    /// fraction complete.
    fn switch_growing_crop(&mut self, crop: CropType) {
        let from = growing_duration(self.state.crop);
        let to = growing_duration(crop);
        self.state.remaining = self.state.remaining / from * to;
        self.state.crop = crop;
    }

    /// Advances the stage if it ran out, otherwise raises any due warning.
    fn settle(&mut self, events: &mut Vec<TimerEvent>) {
        if self.state.running && self.state.remaining <= 0.0 {
            self.advance_stage(events);
        }
        self.check_warnings(events);
    }

    fn advance_stage(&mut self, events: &mut Vec<TimerEvent>) {
        let finished = self.state.stage;
        let Some(next) = finished.next() else {
            return;
        };

        events.push(TimerEvent::StageCompleted(finished));
        self.state.stage = next;
        self.state.warning = WarningLevel::None;

        match stage_duration(self.state.crop, next, self.state.planter) {
            Some(secs) => self.state.remaining = secs,
            None => {
                self.state.remaining = 0.0;
                self.state.running = false;
            }
        }

        info!(
            completed = %finished,
            stage = %next,
            crop = %self.state.crop,
            "Stage completed"
        );
    }

    /// Raises the five- and one-minute warnings once each per stage.
    ///
    /// A threshold only applies to a stage longer than the threshold itself.
    fn check_warnings(&mut self, events: &mut Vec<TimerEvent>) {
        if !self.state.running {
            return;
        }
        let Some(total) = stage_duration(self.state.crop, self.state.stage, self.state.planter)
        else {
            return;
        };
        let remaining = self.state.remaining;
        let five_applies = total > FIVE_MINUTES;
        let one_applies = total > ONE_MINUTE;

        if five_applies && self.state.warning == WarningLevel::None && remaining <= FIVE_MINUTES {
            self.raise(WarningLevel::FiveMin, events);
        }
        let one_ready = self.state.warning == WarningLevel::FiveMin
            || (!five_applies && self.state.warning == WarningLevel::None);
        if one_applies && one_ready && remaining <= ONE_MINUTE {
            self.raise(WarningLevel::OneMin, events);
        }
    }

    fn raise(&mut self, level: WarningLevel, events: &mut Vec<TimerEvent>) {
        self.state.warning = level;
        events.push(TimerEvent::WarningRaised(level));
        info!(stage = %self.state.stage, level = ?level, remaining = self.state.remaining, "Warning raised");
    }
}
