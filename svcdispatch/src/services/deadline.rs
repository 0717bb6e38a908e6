// SPDX-License-Identifier: MIT

use std::time::Duration;

use log::{info, warn};
use nix::sys::signal::{kill, Signal};
use nix::unistd::getpid;
use svcdispatch::{RunContext, Service};

/// Ends the daemon after `after` by sending SIGTERM to the own process,
/// unless interrupted first.
#[derive(Debug)]
pub struct Deadline {
    after: Duration,
}

impl Deadline {
    pub fn new(after: Duration) -> Self {
        Self { after }
    }
}

impl Service for Deadline {
    fn name(&self) -> &str {
        "deadline"
    }

    fn start(&self, ctx: &RunContext<'_>) {
        ctx.pause_for(self.after);
        if ctx.interrupted() {
            return;
        }

        info!("run time of {:?} reached, requesting shutdown", self.after);
        // process-directed, so it is picked up by the sigwait in main
        if let Err(e) = kill(getpid(), Signal::SIGTERM) {
            warn!("failed to signal shutdown: {e}");
        }
    }
}
