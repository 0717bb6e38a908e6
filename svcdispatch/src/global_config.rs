// SPDX-License-Identifier: MIT

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug)]
pub struct GlobalConfig {
    pub interval: Duration,
    pub status_file: PathBuf,
}

// The actual static variable. It starts empty and is set once in main().
pub static CONFIG: OnceLock<GlobalConfig> = OnceLock::new();

pub const DEFAULT_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_STATUS_FILE: &str = "/run/svcdispatchd/status";

/// Built-in services selectable on the command line.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "kebab-case")]
pub enum ServiceKind {
    /// Log a heartbeat line every interval
    Heartbeat,
    /// Keep a status file up to date, remove it on shutdown
    StatusFile,
}

/// A service declaration from a `--config` file.
///
/// Fields left out fall back to the [`GlobalConfig`] defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "service", deny_unknown_fields)]
pub enum ServiceDecl {
    #[serde(rename = "heartbeat")]
    Heartbeat {
        name: Option<String>,
        interval_ms: Option<u64>,
    },

    #[serde(rename = "status-file")]
    StatusFile {
        name: Option<String>,
        path: Option<PathBuf>,
        interval_ms: Option<u64>,
    },
}

impl From<ServiceKind> for ServiceDecl {
    fn from(kind: ServiceKind) -> Self {
        match kind {
            ServiceKind::Heartbeat => ServiceDecl::Heartbeat {
                name: None,
                interval_ms: None,
            },
            ServiceKind::StatusFile => ServiceDecl::StatusFile {
                name: None,
                path: None,
                interval_ms: None,
            },
        }
    }
}

pub fn parse_service_decls(json: &str) -> anyhow::Result<Vec<ServiceDecl>> {
    serde_json::from_str(json).context("invalid service declarations")
}

pub fn load_service_decls(path: &Path) -> anyhow::Result<Vec<ServiceDecl>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    parse_service_decls(&json).with_context(|| format!("in config file {}", path.display()))
}

pub fn initialize_global_config(interval: Duration, status_file: PathBuf) -> anyhow::Result<()> {
    CONFIG
        .set(GlobalConfig {
            interval,
            status_file,
        })
        .map_err(|_| anyhow!("global config was already initialized"))
}

pub fn get_interval() -> Duration {
    CONFIG
        .get()
        .map(|config| config.interval)
        .unwrap_or(Duration::from_millis(DEFAULT_INTERVAL_MS))
}

pub fn get_status_file() -> PathBuf {
    CONFIG
        .get()
        .map(|config| config.status_file.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATUS_FILE))
}
