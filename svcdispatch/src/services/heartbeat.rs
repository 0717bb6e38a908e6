// SPDX-License-Identifier: MIT

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use log::{debug, info};
use svcdispatch::{RunContext, Service};

/// Logs a line every `interval` until interrupted.
#[derive(Debug)]
pub struct Heartbeat {
    name: String,
    interval: Duration,
    beats: AtomicU64,
}

impl Heartbeat {
    pub fn new(name: impl Into<String>, interval: Duration) -> Self {
        Self {
            name: name.into(),
            interval,
            beats: AtomicU64::new(0),
        }
    }

    pub fn beats(&self) -> u64 {
        self.beats.load(Ordering::Relaxed)
    }
}

impl Service for Heartbeat {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self, ctx: &RunContext<'_>) {
        while !ctx.interrupted() {
            let beat = self.beats.fetch_add(1, Ordering::Relaxed) + 1;
            info!("{}: heartbeat #{}", self.name, beat);
            ctx.pause_for(self.interval);
        }
    }

    fn stop(&self) {
        debug!("{}: stopping after {} beats", self.name, self.beats());
    }
}
