// SPDX-License-Identifier: MIT

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread::{self, JoinHandle};

use log::{debug, error, info};

use crate::error::DispatchError;
use crate::service_engine::runnable::Runnable;

/// A registered service and its worker. `worker` is taken once a join
/// of that thread is under way.
#[derive(Debug)]
struct Entry {
    runnable: Arc<Runnable>,
    worker: Option<JoinHandle<()>>,
}

#[derive(Debug, Default)]
struct Registry {
    entries: Vec<Entry>,
    /// Set by `stop_services`, never cleared.
    stopping: bool,
}

/// Registry and lifecycle coordinator for background services.
///
/// Each registered [`Runnable`] gets one dedicated worker thread. The
/// dispatcher itself runs no loop: it only starts workers, interrupts them
/// and joins them.
#[derive(Debug, Default)]
pub struct Dispatcher {
    registry: Mutex<Registry>,
    /// Serialises joins, kept apart from `registry` so that registration and
    /// `service_count` are not blocked while a join is waiting on workers.
    join_mutex: Mutex<()>,
}

static DISPATCHER: OnceLock<Dispatcher> = OnceLock::new();

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide dispatcher, created on first use.
    pub fn instance() -> &'static Dispatcher {
        DISPATCHER.get_or_init(Dispatcher::new)
    }

    /// Start `runnable` on a new worker thread and register it.
    ///
    /// Fails with [`DispatchError::AlreadyStopping`] once
    /// [`stop_services`](Self::stop_services) has been called; nothing is
    /// registered or started in that case. A runnable that is already
    /// registered, or has already run, is rejected with
    /// [`DispatchError::AlreadyRegistered`].
    pub fn add_service(&self, runnable: Arc<Runnable>) -> Result<(), DispatchError> {
        let mut registry = self.registry();
        if registry.stopping {
            debug!(
                "rejecting service {:?}, dispatcher is stopping",
                runnable.name()
            );
            return Err(DispatchError::AlreadyStopping);
        }

        let name = runnable.name().to_string();
        if runnable.has_run()
            || registry
                .entries
                .iter()
                .any(|entry| Arc::ptr_eq(&entry.runnable, &runnable))
        {
            return Err(DispatchError::AlreadyRegistered { name });
        }

        // std panics on thread names with interior NULs
        let thread_name: String = name.chars().filter(|c| *c != '\0').collect();
        let for_worker = runnable.clone();
        let worker = thread::Builder::new()
            .name(thread_name)
            .spawn(move || for_worker.run())
            .map_err(|source| DispatchError::Spawn {
                name: name.clone(),
                source,
            })?;

        registry.entries.push(Entry {
            runnable,
            worker: Some(worker),
        });
        info!("Started service {:?}", name);
        Ok(())
    }

    /// Interrupt every registered service and refuse new ones from now on.
    pub fn stop_services(&self) {
        let runnables: Vec<Arc<Runnable>> = {
            let mut registry = self.registry();
            registry.stopping = true;
            registry
                .entries
                .iter()
                .map(|entry| entry.runnable.clone())
                .collect()
        };

        debug!("Interrupting {} services", runnables.len());
        // interrupt only touches the runnable's own state
        for runnable in runnables {
            // a panicking stop hook is logged, the sweep goes on
            if panic::catch_unwind(AssertUnwindSafe(|| runnable.interrupt())).is_err() {
                error!("stop hook of service {:?} panicked", runnable.name());
            }
        }
    }

    /// Block until every registered worker has exited, then clear the registry.
    ///
    /// Services are not interrupted here; without a prior
    /// [`stop_services`](Self::stop_services) this waits for them to return on
    /// their own. A worker that panicked is logged and does not keep the others
    /// from being joined.
    pub fn join_services(&self) {
        let _join = self
            .join_mutex
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        debug!("Joining services");

        loop {
            let pending: Vec<(String, JoinHandle<()>)> = {
                let mut registry = self.registry();
                let pending: Vec<_> = registry
                    .entries
                    .iter_mut()
                    .filter_map(|entry| {
                        let name = entry.runnable.name().to_string();
                        entry.worker.take().map(|worker| (name, worker))
                    })
                    .collect();
                if pending.is_empty() {
                    registry.entries.clear();
                    break;
                }
                pending
            };

            for (name, worker) in pending {
                match worker.join() {
                    Ok(()) => debug!("service {:?} has joined", name),
                    Err(_) => error!("service {:?} terminated with a panic", name),
                }
            }
        }

        info!("Services and threads have been cleared");
    }

    /// Number of registered services at this instant.
    pub fn service_count(&self) -> usize {
        self.registry().entries.len()
    }

    pub fn is_stopping(&self) -> bool {
        self.registry().stopping
    }

    /// Names of the registered services, in registration order.
    pub fn service_names(&self) -> Vec<String> {
        self.registry()
            .entries
            .iter()
            .map(|entry| entry.runnable.name().to_string())
            .collect()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        // Registry is only mutated with push/clear/take, all of which leave
        // it consistent even if a holder panics.
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
