use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Advisory file lock held by the process that owns the collector
///
/// Only one collector may write to a given ping store, so `run` and `collect` take this
/// lock before starting the poll loop. The lock is released (and the file removed) on drop.
pub struct InstanceLock {
    lock_file: File,
    lock_path: PathBuf,
}

impl InstanceLock {
    /// Acquire `<runtime dir>/<name>.lock`
    pub fn new(name: &str) -> Result<Self> {
        Self::at(Self::lock_path_for(name))
    }

    /// Acquire a lock at an explicit path
    pub fn at(lock_path: PathBuf) -> Result<Self> {
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create lock directory")?;
        }

        // Not truncated here: the holder's PID must survive a failed attempt
        let mut lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file {}", lock_path.display()))?;

        try_lock(&lock_file, &lock_path)?;

        let pid = std::process::id();
        lock_file.set_len(0).context("Failed to truncate lock file")?;
        writeln!(lock_file, "{}", pid).context("Failed to write PID to lock file")?;

        info!("Acquired collector lock at {}", lock_path.display());
        debug!("Process ID: {}", pid);

        Ok(Self {
            lock_file,
            lock_path,
        })
    }

    /// Lock file location, preferring `XDG_RUNTIME_DIR` over the temp directory
    pub fn lock_path_for(name: &str) -> PathBuf {
        let runtime_dir = std::env::var_os("XDG_RUNTIME_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);
        runtime_dir.join(format!("{}.lock", name))
    }

    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}

#[cfg(unix)]
fn try_lock(file: &File, path: &Path) -> Result<()> {
    use std::os::unix::io::AsRawFd;

    let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if result != 0 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::WouldBlock {
            anyhow::bail!(
                "Another collector is already running. Lock file: {}",
                path.display()
            );
        }
        return Err(err).context("Failed to acquire lock");
    }
    Ok(())
}

#[cfg(not(unix))]
fn try_lock(_file: &File, path: &Path) -> Result<()> {
    debug!("Advisory locking unavailable, not locking {}", path.display());
    Ok(())
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            unsafe {
                libc::flock(self.lock_file.as_raw_fd(), libc::LOCK_UN);
            }
        }

        match std::fs::remove_file(&self.lock_path) {
            Ok(()) => debug!("Released collector lock at {}", self.lock_path.display()),
            Err(e) => debug!("Failed to remove lock file: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_writes_pid_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("collector.lock");

        let lock = InstanceLock::at(path.clone()).unwrap();
        assert_eq!(lock.path(), path.as_path());
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.trim(), std::process::id().to_string());

        drop(lock);
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_second_lock_on_same_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("collector.lock");

        let _held = InstanceLock::at(path.clone()).unwrap();
        assert!(InstanceLock::at(path.clone()).is_err());
    }

    #[test]
    fn test_lock_can_be_reacquired_after_release() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("collector.lock");

        drop(InstanceLock::at(path.clone()).unwrap());
        assert!(InstanceLock::at(path).is_ok());
    }
}
