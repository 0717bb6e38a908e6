// SPDX-License-Identifier: MIT

use crate::service_engine::runnable::{RunContext, Service};

type StartFn = Box<dyn Fn(&RunContext<'_>) + Send + Sync + 'static>;
type StopFn = Box<dyn Fn() + Send + Sync + 'static>;

/// A [`Service`] assembled from closures.
pub struct ClosureService {
    name: String,
    start: StartFn,
    stop: Option<StopFn>,
}

impl ClosureService {
    pub fn new(
        name: impl Into<String>,
        start: impl Fn(&RunContext<'_>) + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            start: Box::new(start),
            stop: None,
        }
    }

    /// Teardown hook. Subject to the same rules as [`Service::stop`].
    pub fn with_stop(mut self, stop: impl Fn() + Send + Sync + 'static) -> Self {
        self.stop = Some(Box::new(stop));
        self
    }
}

impl std::fmt::Debug for ClosureService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClosureService")
            .field("name", &self.name)
            .field("has_stop", &self.stop.is_some())
            .finish()
    }
}

impl Service for ClosureService {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self, ctx: &RunContext<'_>) {
        (self.start)(ctx);
    }

    fn stop(&self) {
        if let Some(stop) = &self.stop {
            stop();
        }
    }
}

/// Example usage
#[test]
pub fn example() {
    use crate::service_engine::dispatcher::Dispatcher;
    use crate::service_engine::runnable::Runnable;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    let dispatcher = Dispatcher::new();
    let ticks = Arc::new(AtomicUsize::new(0));

    let counter = ticks.clone();
    dispatcher
        .add_service(Runnable::shared(ClosureService::new(
            "ticker",
            move |ctx: &RunContext<'_>| {
                while !ctx.interrupted() {
                    counter.fetch_add(1, Ordering::SeqCst);
                    ctx.pause_for(std::time::Duration::from_millis(10));
                }
            },
        )))
        .unwrap();

    std::thread::sleep(std::time::Duration::from_millis(50));
    dispatcher.stop_services();
    dispatcher.join_services();

    assert!(ticks.load(Ordering::SeqCst) > 0);
    assert_eq!(dispatcher.service_count(), 0);
}
