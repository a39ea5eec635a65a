//! Always-on-top timer overlay.
//!
//! The overlay owns the `StageTimer`. Every frame it drains trigger actions,
//! feeds the newest sample, ticks the engine and redraws, so all engine calls
//! happen on the UI thread.

pub mod render;
pub mod state;

use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

use eframe::egui::{self, Pos2, Vec2};
use tracing::{info, warn};

use crate::config::{ConfigWatcher, OverlayPosition, TimerConfig};
use crate::sampler::{SampleSlot, SamplerHandle};
use crate::timer::{StageTimer, TimerUpdate};
use crate::triggers::TriggerAction;

use state::OverlayState;

/// How often the config file is checked for edits.
const CONFIG_POLL: Duration = Duration::from_secs(2);

/// Main overlay application struct.
pub struct OverlayApp {
    timer: StageTimer,
    overlay: OverlayState,
    slot: SampleSlot,
    actions: Receiver<TriggerAction>,
    /// Kept alive for the lifetime of the window; dropping it stops sampling.
    sampler: Option<SamplerHandle>,
    position: OverlayPosition,
    tick_interval: Duration,
    /// Size and monitor the window was last placed for
    placed: Option<(Vec2, Vec2)>,
    watcher: ConfigWatcher,
    triggers: (String, String),
    next_config_check: Instant,
}

impl OverlayApp {
    pub fn new(
        config: &TimerConfig,
        watcher: ConfigWatcher,
        slot: SampleSlot,
        actions: Receiver<TriggerAction>,
        sampler: Option<SamplerHandle>,
    ) -> Self {
        let timer = StageTimer::new(config.engine_settings());
        let overlay = OverlayState::new(timer.snapshot());
        Self {
            timer,
            overlay,
            slot,
            actions,
            sampler,
            position: config.position_mode,
            tick_interval: Duration::from_millis(config.tick_interval_ms),
            placed: None,
            watcher,
            triggers: (config.trigger_start.clone(), config.trigger_reset.clone()),
            next_config_check: Instant::now() + CONFIG_POLL,
        }
    }

    /// Applies edits made to the config file while running.
    fn reload_config(&mut self, now: Instant) {
        if now < self.next_config_check {
            return;
        }
        self.next_config_check = now + CONFIG_POLL;
        let Some(config) = self.watcher.poll() else {
            return;
        };

        let settings = config.engine_settings();
        if settings != *self.timer.settings() {
            let update = self.timer.apply_settings(settings, now);
            self.apply(update, now);
        }

        if config.position_mode != self.position {
            self.position = config.position_mode;
            self.placed = None;
        }
        self.tick_interval = Duration::from_millis(config.tick_interval_ms);

        let triggers = (config.trigger_start, config.trigger_reset);
        if triggers != self.triggers {
            warn!("Trigger word changes take effect after a restart");
        }
    }

    fn handle_action(&mut self, action: TriggerAction, now: Instant) {
        match action {
            TriggerAction::Start => {
                if self.sampler.is_none() {
                    warn!("No screen area selected; set selected_area in the config to start the timer");
                    return;
                }
                let update = self.timer.start(now);
                self.apply(update, now);
            }
            TriggerAction::Reset => {
                // Drop anything captured before the reset.
                let _ = self.slot.take();
                let update = self.timer.reset();
                self.apply(update, now);
            }
        }
    }

    fn apply(&mut self, update: TimerUpdate, now: Instant) {
        self.overlay.apply(update, now);
    }

    fn drive_timer(&mut self, now: Instant) {
        self.reload_config(now);

        while let Ok(action) = self.actions.try_recv() {
            self.handle_action(action, now);
        }

        if let Some(sample) = self.slot.take() {
            let update = self.timer.ingest_sample(&sample);
            self.apply(update, now);
        }

        let update = self.timer.tick(now);
        self.apply(update, now);

        if let Some(sampler) = &self.sampler
            && !sampler.is_running()
        {
            warn!("Sampler stopped unexpectedly");
            self.sampler = None;
        }
    }

    /// Resizes to fit the text and anchors the window per the config.
    fn place_window(&mut self, ctx: &egui::Context, size: Vec2) {
        let Some(monitor) = ctx.input(|i| i.viewport().monitor_size) else {
            return;
        };
        if self.placed == Some((size, monitor)) {
            return;
        }
        let (x, y) = self.position.origin((monitor.x, monitor.y), (size.x, size.y));
        ctx.send_viewport_cmd(egui::ViewportCommand::InnerSize(size));
        ctx.send_viewport_cmd(egui::ViewportCommand::OuterPosition(Pos2::new(x, y)));
        self.placed = Some((size, monitor));
    }
}

impl eframe::App for OverlayApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        self.drive_timer(now);

        let text = self.overlay.text();
        let size = render::fitted_size(ctx, &text);
        self.place_window(ctx, size);
        render::render_overlay(ctx, &text, self.overlay.background(now));

        let next = match self.overlay.flash.until_toggle(now) {
            Some(toggle) => toggle.min(self.tick_interval),
            None => self.tick_interval,
        };
        ctx.request_repaint_after(next);
    }

    fn clear_color(&self, _visuals: &egui::Visuals) -> [f32; 4] {
        [0.0; 4]
    }
}

/// Run the overlay.
/// This function blocks until the window is closed.
pub fn run_overlay(
    config: &TimerConfig,
    watcher: ConfigWatcher,
    slot: SampleSlot,
    actions: Receiver<TriggerAction>,
    sampler: Option<SamplerHandle>,
) -> eframe::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(Vec2::new(200.0, 40.0))
            .with_title("COCA Smart Timer")
            .with_decorations(false)
            .with_transparent(true)
            .with_always_on_top()
            .with_resizable(false)
            .with_mouse_passthrough(true)
            .with_taskbar(false)
            .with_drag_and_drop(false),
        ..Default::default()
    };

    let app = OverlayApp::new(config, watcher, slot, actions, sampler);
    info!("Starting overlay");

    eframe::run_native("COCA Smart Timer", options, Box::new(|_cc| Ok(Box::new(app))))
}
