// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Errors returned by the [`Dispatcher`](crate::Dispatcher) to its callers.
///
/// Faults inside a service body are not represented here: they end the
/// service's worker thread and are reported when the worker is joined.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum DispatchError {
    /// `stop_services` has already been called; no new service is accepted.
    #[error("dispatcher is shutting down, cannot accept new services")]
    AlreadyStopping,

    /// The same runnable is already registered, or has already run.
    #[error("service {name:?} is already registered or has already run")]
    AlreadyRegistered { name: String },

    /// The OS refused to create the worker thread for a service.
    #[error("failed to spawn worker thread for service {name:?}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

impl DispatchError {
    /// Short stable label (snake_case) for log lines.
    pub fn as_label(&self) -> &'static str {
        match self {
            DispatchError::AlreadyStopping => "dispatch_already_stopping",
            DispatchError::AlreadyRegistered { .. } => "dispatch_already_registered",
            DispatchError::Spawn { .. } => "dispatch_spawn_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        assert_eq!(
            DispatchError::AlreadyStopping.as_label(),
            "dispatch_already_stopping"
        );
        let spawn = DispatchError::Spawn {
            name: "heartbeat".into(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "no threads left"),
        };
        assert_eq!(spawn.as_label(), "dispatch_spawn_failed");
        let twice = DispatchError::AlreadyRegistered {
            name: "heartbeat".into(),
        };
        assert_eq!(twice.as_label(), "dispatch_already_registered");
        assert!(spawn.to_string().contains("\"heartbeat\""));
    }
}
