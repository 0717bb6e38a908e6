// SPDX-License-Identifier: MIT
//! # Design: Cooperative Service Dispatcher (OS threads)
//!
//! ## Overview
//! - Every service runs on its own dedicated worker thread.
//! - A service body pauses through an `InterruptionPoint`, so a pause can be
//!   ended from any other thread without waiting for its timeout.
//! - `interrupt` is provided by the core, not by services: it marks the
//!   runnable, wakes its pause and calls the service's `stop` exactly once.
//! - The dispatcher rejects registrations as soon as shutdown begins, so no
//!   service can slip in after the final interrupt sweep.
//! - Cancellation is cooperative. A body that never pauses and never checks
//!   `interrupted()` is not stopped, only waited for.
//!
//! ```text
//!         +--------------------------------------------+
//!         |                 Dispatcher                 |
//!         |  registry mutex: entries + stopping flag   |
//!         |  join mutex:     serialises join_services  |
//!         +------+----------------+----------------+---+
//!                |                |                |
//!         +------v-----+   +------v-----+   +------v-----+
//!         | Runnable A |   | Runnable B |   | Runnable C |
//!         |  thread A  |   |  thread B  |   |  thread C  |
//!         |  point A   |   |  point B   |   |  point C   |
//!         +------------+   +------------+   +------------+
//! ```
//!
//! ## Lifecycle of a runnable
//! `Created --run()--> Running --interrupt()--> Interrupted --start returns--> Stopped`
//! (`Running` goes straight to `Stopped` when the body returns on its own;
//! `interrupt()` on a `Stopped` runnable does nothing.)

pub mod closure_service;
pub mod dispatcher;
pub mod interruption_point;
pub mod runnable;
