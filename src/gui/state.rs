//! Overlay presentation state.
//!
//! Maps timer snapshots to text and colors and tracks the warning flash.

use std::time::{Duration, Instant};

use crate::timer::{Remaining, Stage, TimerEvent, TimerSnapshot, TimerUpdate};
use crate::timer::snapshot::{FIVE_MINUTES, ONE_MINUTE};

/// Time between flash toggles.
pub const FLASH_PERIOD: Duration = Duration::from_millis(1200);

/// RGBA, unmultiplied.
pub type Rgba = [u8; 4];

pub const GROWING_COLOR: Rgba = [200, 200, 200, 80];
pub const READY_COLOR: Rgba = [33, 150, 243, 120];
pub const FLOWERING_COLOR: Rgba = [156, 39, 176, 120];
pub const SEEDING_COLOR: Rgba = [76, 175, 80, 120];
pub const FIVE_MINUTE_COLOR: Rgba = [255, 165, 0, 120];
pub const ONE_MINUTE_COLOR: Rgba = [255, 68, 68, 120];
pub const FLASH_COLOR: Rgba = [255, 255, 255, 150];

/// Slow on/off flash started by a warning.
///
/// The first `FLASH_PERIOD` after starting shows the normal color, then the
/// flash color, alternating until stopped.
#[derive(Clone, Copy, Debug, Default)]
pub struct FlashSchedule {
    since: Option<Instant>,
}

impl FlashSchedule {
    /// Starts flashing unless already flashing.
    pub fn start(&mut self, now: Instant) {
        if self.since.is_none() {
            self.since = Some(now);
        }
    }

    pub fn stop(&mut self) {
        self.since = None;
    }

    /// Whether the flash color shows at `now`.
    pub fn is_lit(&self, now: Instant) -> bool {
        let Some(since) = self.since else {
            return false;
        };
        let periods = now.saturating_duration_since(since).as_millis() / FLASH_PERIOD.as_millis();
        periods % 2 == 1
    }

    /// Time until the next toggle, for scheduling repaints.
    pub fn until_toggle(&self, now: Instant) -> Option<Duration> {
        let since = self.since?;
        let period = FLASH_PERIOD.as_millis();
        let into = now.saturating_duration_since(since).as_millis() % period;
        Some(Duration::from_millis((period - into) as u64))
    }
}

/// Everything the overlay needs to draw one frame.
#[derive(Clone, Debug)]
pub struct OverlayState {
    pub snapshot: TimerSnapshot,
    pub flash: FlashSchedule,
}

impl OverlayState {
    pub fn new(snapshot: TimerSnapshot) -> Self {
        Self {
            snapshot,
            flash: FlashSchedule::default(),
        }
    }

    /// Takes in the result of an engine operation.
    pub fn apply(&mut self, update: TimerUpdate, now: Instant) {
        for event in &update.events {
            match event {
                TimerEvent::WarningRaised(_) => self.flash.start(now),
                TimerEvent::StageCompleted(_) => self.flash.stop(),
            }
        }
        self.snapshot = update.snapshot;
        if self.snapshot.is_idle() || self.snapshot.stage == Stage::Seeding {
            self.flash.stop();
        }
    }

    /// `"{Crop}: {MM:SS|∞} | {pct} % | {Stage}"`
    ///
    /// While idle the full Growing duration is shown instead of zero.
    pub fn text(&self) -> String {
        let s = &self.snapshot;
        let remaining = match (s.is_idle(), s.stage_total) {
            (true, Some(total)) => Remaining::Seconds(total),
            _ => s.remaining,
        };
        format!(
            "{}: {} | {:.2} % | {}",
            s.crop, remaining, s.progress_percent, s.stage
        )
    }

    pub fn background(&self, now: Instant) -> Rgba {
        if self.flash.is_lit(now) {
            FLASH_COLOR
        } else {
            base_color(&self.snapshot)
        }
    }
}

/// Stage color, overridden by warning colors near the end of a countdown.
pub fn base_color(snapshot: &TimerSnapshot) -> Rgba {
    let stage_color = match snapshot.stage {
        Stage::Seeding => return SEEDING_COLOR,
        Stage::Growing => GROWING_COLOR,
        Stage::Ready => READY_COLOR,
        Stage::Flowering => FLOWERING_COLOR,
    };
    if !snapshot.running {
        return stage_color;
    }
    match snapshot.remaining.as_secs() {
        Some(secs) if secs <= ONE_MINUTE => ONE_MINUTE_COLOR,
        Some(secs) if secs <= FIVE_MINUTES => FIVE_MINUTE_COLOR,
        _ => stage_color,
    }
}
