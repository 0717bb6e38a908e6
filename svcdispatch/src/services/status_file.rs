// SPDX-License-Identifier: MIT

use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{debug, warn};
use svcdispatch::{RunContext, Service};

/// Rewrites a small status file every `interval` and removes it on stop.
///
/// The file holds `pid=<pid>`, `updates=<n>` and `updated=<unix seconds>`
/// lines. Writes and the removal in `stop` share one lock, so a write racing
/// with `stop` cannot recreate the file afterwards.
#[derive(Debug)]
pub struct StatusFile {
    name: String,
    path: PathBuf,
    interval: Duration,
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    updates: u64,
    stopped: bool,
}

impl StatusFile {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, interval: Duration) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            interval,
            state: Mutex::new(State::default()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `<file name>.tmp` next to the status file.
    fn tmp_path(&self) -> PathBuf {
        let mut tmp = OsString::from(self.path.as_os_str());
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }

    fn update(&self) -> io::Result<()> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.stopped {
            return Ok(());
        }
        state.updates += 1;

        let updated = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let contents = format!(
            "pid={}\nupdates={}\nupdated={}\n",
            std::process::id(),
            state.updates,
            updated
        );

        // write-then-rename, readers never see a partial file
        let tmp = self.tmp_path();
        let result = std::fs::File::create(&tmp).and_then(|mut file| {
            file.write_all(contents.as_bytes())?;
            file.sync_all()?;
            std::fs::rename(&tmp, &self.path)
        });
        if result.is_err() {
            let _ = std::fs::remove_file(&tmp);
        }
        result
    }
}

impl Service for StatusFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self, ctx: &RunContext<'_>) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!("{}: cannot create {}: {e}", self.name, parent.display());
            }
        }

        while !ctx.interrupted() {
            if let Err(e) = self.update() {
                warn!("{}: failed to write {}: {e}", self.name, self.path.display());
            }
            ctx.pause_for(self.interval);
        }
    }

    fn stop(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.stopped = true;

        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("{}: removed {}", self.name, self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("{}: failed to remove {}: {e}", self.name, self.path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_without_start_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let service = StatusFile::new("status", dir.path().join("never"), Duration::from_secs(1));
        service.stop();
        service.stop();
        assert!(!service.path().exists());
    }

    #[test]
    fn no_write_after_stop() {
        let dir = tempfile::tempdir().unwrap();
        let service = StatusFile::new("status", dir.path().join("s"), Duration::from_secs(1));

        service.update().unwrap();
        let contents = std::fs::read_to_string(service.path()).unwrap();
        assert!(contents.contains(&format!("pid={}", std::process::id())));
        assert!(contents.contains("updates=1"));

        service.stop();
        assert!(!service.path().exists());

        service.update().unwrap();
        assert!(!service.path().exists());
    }

    #[test]
    fn tmp_file_keeps_the_full_name() {
        let dir = tempfile::tempdir().unwrap();
        let service = StatusFile::new("status", dir.path().join("x.status"), Duration::from_secs(1));
        // a sibling that a plain extension swap would clobber
        let sibling = dir.path().join("x.tmp");
        std::fs::write(&sibling, "keep").unwrap();

        assert_eq!(service.tmp_path(), dir.path().join("x.status.tmp"));
        service.update().unwrap();
        assert_eq!(std::fs::read_to_string(&sibling).unwrap(), "keep");
        assert!(!service.tmp_path().exists());
    }

    #[test]
    fn failed_update_leaves_no_tmp_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("busy");
        // rename onto a non-empty directory fails
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("inner"), "x").unwrap();
        let service = StatusFile::new("status", &target, Duration::from_secs(1));

        assert!(service.update().is_err());
        assert!(!service.tmp_path().exists());
        assert!(target.is_dir());
    }
}
