// SPDX-License-Identifier: MIT
//! svcdispatch: run named background services on dedicated threads, pause
//! inside them for a bounded time, and stop them from any other thread.

pub mod error;
pub mod service_engine;

pub use error::DispatchError;
pub use service_engine::closure_service::ClosureService;
pub use service_engine::dispatcher::Dispatcher;
pub use service_engine::interruption_point::InterruptionPoint;
pub use service_engine::runnable::{RunContext, Runnable, Service, DEFAULT_PAUSE};
