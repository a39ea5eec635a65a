//! Trigger words typed anywhere on the desktop start or reset the timer.

pub mod listener;
pub mod matcher;

pub use listener::spawn_listener;
pub use matcher::TriggerAction;
