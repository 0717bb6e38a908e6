// SPDX-License-Identifier: MIT

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// An interruptible sleep.
///
/// One thread sleeps in [`pause`](Self::pause), any other thread may end the
/// sleep early with [`cancel`](Self::cancel). Cancellation is single-shot: once
/// cancelled, every later `pause` returns immediately.
#[derive(Debug, Default)]
pub struct InterruptionPoint {
    stopped: Mutex<bool>,
    condition: Condvar,
}

impl InterruptionPoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep until `duration` has elapsed or the point is cancelled.
    pub fn pause(&self, duration: Duration) {
        // None: duration exceeds Instant's range, wait until cancelled.
        let deadline = Instant::now().checked_add(duration);
        let mut stopped = self.lock();
        while !*stopped {
            let remaining = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        break;
                    }
                    deadline - now
                }
                None => duration,
            };
            // The remaining time is recomputed on every wake so spurious
            // wakeups never extend the total wait.
            let (guard, _timeout) = self
                .condition
                .wait_timeout(stopped, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            stopped = guard;
        }
    }

    /// End the current pause (if any) and every future one.
    pub fn cancel(&self) {
        let mut stopped = self.lock();
        *stopped = true;
        self.condition.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.lock()
    }

    // The guarded state is a single bool, a panicking holder cannot leave
    // it half-written.
    fn lock(&self) -> MutexGuard<'_, bool> {
        self.stopped.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
