//! Single-slot handoff between the sampler thread and the overlay.
//!
//! Unlike a queue, the slot holds at most one sample. A newer capture replaces
//! whatever the consumer has not picked up yet, so the engine never works
//! through a backlog of outdated percentages.

use std::sync::{Arc, Mutex};

use crate::timer::Sample;

#[derive(Clone, Debug, Default)]
pub struct SampleSlot {
    inner: Arc<Mutex<Option<Sample>>>,
}

impl SampleSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `sample` unless the slot already holds a newer capture.
    pub fn publish(&self, sample: Sample) {
        let Ok(mut held) = self.inner.lock() else {
            return;
        };
        match held.as_ref() {
            Some(current) if current.captured_at > sample.captured_at => {}
            _ => *held = Some(sample),
        }
    }

    /// Removes and returns the held sample.
    pub fn take(&self) -> Option<Sample> {
        self.inner.lock().ok().and_then(|mut held| held.take())
    }
}
