// SPDX-License-Identifier: MIT

use std::sync::Arc;
use std::time::Duration;

use svcdispatch::Runnable;

use crate::global_config::{self, ServiceDecl};

pub mod deadline;
pub mod heartbeat;
pub mod status_file;

/// Turn a declaration into a runnable, filling gaps from the global config.
pub fn build_runnable(decl: &ServiceDecl) -> Arc<Runnable> {
    let interval = |interval_ms: &Option<u64>| {
        interval_ms
            .map(Duration::from_millis)
            .unwrap_or_else(global_config::get_interval)
    };

    match decl {
        ServiceDecl::Heartbeat { name, interval_ms } => Runnable::shared(heartbeat::Heartbeat::new(
            name.clone().unwrap_or_else(|| "heartbeat".into()),
            interval(interval_ms),
        )),
        ServiceDecl::StatusFile {
            name,
            path,
            interval_ms,
        } => Runnable::shared(status_file::StatusFile::new(
            name.clone().unwrap_or_else(|| "status-file".into()),
            path.clone().unwrap_or_else(global_config::get_status_file),
            interval(interval_ms),
        )),
    }
}
