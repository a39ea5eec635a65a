//! Multi-stage crop timer.
//!
//! This module provides:
//! - The crop/planter/stage duration table
//! - Effective crop resolution with sticky auto-detection
//! - The stage state machine driven by OCR samples and clock ticks
//! - Snapshots and one-shot events for the overlay

pub mod durations;
pub mod engine;
pub mod resolver;
pub mod snapshot;

pub use durations::{CropLabel, CropType, PlanterType, Stage};
pub use engine::{Sample, StageTimer};
pub use resolver::TimerSettings;
pub use snapshot::{Remaining, TimerEvent, TimerSnapshot, TimerUpdate, WarningLevel};
