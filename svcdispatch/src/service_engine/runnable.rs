// SPDX-License-Identifier: MIT

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, warn};

use crate::service_engine::interruption_point::InterruptionPoint;

/// Pause length used by [`Runnable::pause`] and [`RunContext::pause`].
pub const DEFAULT_PAUSE: Duration = Duration::from_millis(100);

/// The implementer side of a background service.
///
/// `start` is the service body. It runs on the service's own worker thread
/// and should return promptly once [`RunContext::interrupted`] is true,
/// calling [`RunContext::pause`] or [`RunContext::pause_for`] between units of
/// work. A body that neither pauses nor checks for interruption cannot be
/// stopped by the dispatcher.
///
/// `stop` releases the service's resources. It is called at most once by the
/// core, possibly from another thread while `start` is still running, and
/// possibly without `start` ever having run. Implementations must also
/// tolerate being called again from their own cleanup paths.
pub trait Service: Send + Sync + 'static {
    /// Free-form name, used for the worker thread and in logs.
    fn name(&self) -> &str;

    fn start(&self, ctx: &RunContext<'_>);

    fn stop(&self) {}
}

/// Lets a caller keep a handle on its service after handing it over.
impl<S: Service> Service for Arc<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn start(&self, ctx: &RunContext<'_>) {
        (**self).start(ctx)
    }

    fn stop(&self) {
        (**self).stop()
    }
}

impl std::fmt::Debug for dyn Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("name", &self.name())
            .finish()
    }
}

/// A [`Service`] wrapped with the core's interruption machinery.
///
/// Interruption is implemented here once, in terms of the service's `stop`
/// and the owned [`InterruptionPoint`], so no implementation can weaken it.
#[derive(Debug)]
pub struct Runnable {
    service: Box<dyn Service>,
    has_run: AtomicBool,
    interrupted: AtomicBool,
    /// Set once `start` has returned or unwound. Written under `stopping`.
    finished: AtomicBool,
    /// Serialises `interrupt` and the end of `run`, so `stop` is reached
    /// once and never after the body is done.
    stopping: Mutex<()>,
    point: InterruptionPoint,
}

impl Runnable {
    pub fn new(service: impl Service) -> Self {
        Self {
            service: Box::new(service),
            has_run: AtomicBool::new(false),
            interrupted: AtomicBool::new(false),
            finished: AtomicBool::new(false),
            stopping: Mutex::new(()),
            point: InterruptionPoint::new(),
        }
    }

    /// Same as [`Runnable::new`], ready to hand to the dispatcher.
    pub fn shared(service: impl Service) -> Arc<Self> {
        Arc::new(Self::new(service))
    }

    pub fn name(&self) -> &str {
        self.service.name()
    }

    /// Worker thread entrypoint.
    ///
    /// Marks the runnable as started, then runs the service body. A panic in
    /// the body is not caught, but still leaves the runnable finished.
    /// Calling `run` a second time does nothing.
    pub fn run(&self) {
        if self.has_run.swap(true, Ordering::AcqRel) {
            warn!("service {:?} was asked to run twice, ignoring", self.name());
            return;
        }

        debug!("service {:?} starting", self.name());
        let _finished = FinishOnDrop(self);
        self.service.start(&RunContext { runnable: self });
        debug!("service {:?} returned from start", self.name());
    }

    /// Whether [`run`](Self::run) has been entered.
    pub fn has_run(&self) -> bool {
        self.has_run.load(Ordering::Acquire)
    }

    pub fn interrupted(&self) -> bool {
        self.interrupted.load(Ordering::Acquire)
    }

    /// Whether the service body has returned (or panicked).
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Ask the service to stop.
    ///
    /// Marks the runnable interrupted, wakes any pause in progress and calls
    /// the service's `stop`. Safe to call from any thread, concurrently with
    /// the body, any number of times; `stop` is only reached by the first call.
    /// Once the body has finished, interrupting is a no-op.
    pub fn interrupt(&self) {
        let _stopping = self.lock_stopping();
        if self.interrupted.load(Ordering::Acquire) || self.finished.load(Ordering::Acquire) {
            return;
        }

        self.interrupted.store(true, Ordering::Release);
        self.point.cancel();
        debug!("service {:?} interrupted, stopping", self.name());
        self.service.stop();
    }

    /// Interruptible sleep of [`DEFAULT_PAUSE`].
    pub fn pause(&self) {
        self.pause_for(DEFAULT_PAUSE);
    }

    /// Interruptible sleep of up to `duration`.
    pub fn pause_for(&self, duration: Duration) {
        self.point.pause(duration);
    }

    fn lock_stopping(&self) -> MutexGuard<'_, ()> {
        self.stopping.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Marks the runnable finished when the body returns or unwinds.
struct FinishOnDrop<'a>(&'a Runnable);

impl Drop for FinishOnDrop<'_> {
    fn drop(&mut self) {
        let _stopping = self.0.lock_stopping();
        self.0.finished.store(true, Ordering::Release);
    }
}

/// What a service body sees of its [`Runnable`].
#[derive(Debug, Clone, Copy)]
pub struct RunContext<'a> {
    runnable: &'a Runnable,
}

impl RunContext<'_> {
    pub fn name(&self) -> &str {
        self.runnable.name()
    }

    pub fn interrupted(&self) -> bool {
        self.runnable.interrupted()
    }

    pub fn pause(&self) {
        self.runnable.pause();
    }

    pub fn pause_for(&self, duration: Duration) {
        self.runnable.pause_for(duration);
    }
}
