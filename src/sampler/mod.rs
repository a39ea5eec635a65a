//! Capture + OCR sampling off the UI thread.

pub mod slot;
pub mod worker;

pub use slot::SampleSlot;
pub use worker::{spawn_sampler, SamplerHandle, SamplerOptions};
