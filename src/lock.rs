//! Cross-process advisory locking of serial devices.
//!
//! Each device path maps to a `LCK..<name>` file in a shared directory,
//! holding the owner's PID in the UUCP/HDB layout (ten right-aligned ASCII
//! digits and a newline). The file is written aside and hard-linked into
//! place, so two processes racing on the same device cannot both succeed.
//! A lock whose owner is no longer running is stale and is treated as
//! absent.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

const LOCK_PREFIX: &str = "LCK..";

static SCRATCH_SEQ: AtomicU64 = AtomicU64::new(0);

/// Lock file manager for one lock directory and one owner.
#[derive(Debug, Clone)]
pub struct DeviceLock {
    dir: PathBuf,
    owner: u32,
}

impl Default for DeviceLock {
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

impl DeviceLock {
    /// Locks in `dir`, owned by the current process.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_owner(dir, std::process::id())
    }

    /// Locks in `dir`, owned by an explicit PID.
    pub fn with_owner(dir: impl Into<PathBuf>, owner: u32) -> Self {
        Self {
            dir: dir.into(),
            owner,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn owner(&self) -> u32 {
        self.owner
    }

    /// Lock artifact path for `device`. Equal device paths always map to
    /// the same file.
    pub fn lock_path(&self, device: &str) -> PathBuf {
        let name = device.strip_prefix("/dev/").unwrap_or(device);
        let sanitized: String = name
            .trim_start_matches(['/', '\\'])
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' => '_',
                c => c,
            })
            .collect();
        self.dir.join(format!("{}{}", LOCK_PREFIX, sanitized))
    }

    /// True if a lock file exists for `device` and its owner is alive.
    pub fn is_locked(&self, device: &str) -> bool {
        matches!(self.holder(device), Some(pid) if process_alive(pid))
    }

    /// Try to take the lock. Returns false on contention or any I/O failure.
    ///
    /// The lock file is written under a private name and hard-linked into
    /// place, so it never exists without its PID. Of any number of
    /// concurrent callers at most one returns true.
    pub fn set_lock(&self, device: &str) -> bool {
        let path = self.lock_path(device);
        let staged = match self.stage(&path) {
            Ok(staged) => staged,
            Err(e) => {
                warn!("Unable to create lock file {}: {}", path.display(), e);
                return false;
            }
        };

        let locked = self.claim(device, &path, &staged);
        if let Err(e) = fs::remove_file(&staged) {
            debug!("Unable to remove {}: {}", staged.display(), e);
        }
        locked
    }

    fn claim(&self, device: &str, path: &Path, staged: &Path) -> bool {
        match fs::hard_link(staged, path) {
            Ok(()) => {
                debug!("Locked {} ({})", device, path.display());
                return true;
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
            Err(e) => {
                warn!("Unable to create lock file {}: {}", path.display(), e);
                return false;
            }
        }

        match read_pid(path) {
            Some(pid) if process_alive(pid) => {
                debug!("{} is locked by process {}", device, pid);
                return false;
            }
            stale => info!("Removing stale lock {} (owner {:?})", path.display(), stale),
        }

        if !self.discard_stale(path) {
            return false;
        }

        // Someone else may have won the race since the stale file went away
        match fs::hard_link(staged, path) {
            Ok(()) => {
                debug!("Locked {} ({})", device, path.display());
                true
            }
            Err(e) => {
                debug!("Lost lock race for {}: {}", device, e);
                false
            }
        }
    }

    /// Move a stale lock out of the way. The file is renamed first and only
    /// deleted if the renamed copy still belongs to a dead owner; a live
    /// lock that replaced it in the meantime is put back.
    fn discard_stale(&self, path: &Path) -> bool {
        let aside = self.scratch_path(path, "stale");
        match fs::rename(path, &aside) {
            Ok(()) => {}
            // Another caller already moved it
            Err(e) if e.kind() == ErrorKind::NotFound => return true,
            Err(e) => {
                warn!("Unable to remove stale lock {}: {}", path.display(), e);
                return false;
            }
        }

        match read_pid(&aside) {
            Some(pid) if process_alive(pid) => {
                debug!("Lock {} was retaken by process {}", path.display(), pid);
                if let Err(e) = fs::hard_link(&aside, path) {
                    warn!("Unable to restore lock {}: {}", path.display(), e);
                }
                let _ = fs::remove_file(&aside);
                false
            }
            _ => {
                if let Err(e) = fs::remove_file(&aside) {
                    debug!("Unable to remove {}: {}", aside.display(), e);
                }
                true
            }
        }
    }

    /// Remove the lock if this owner holds it.
    pub fn remove_lock(&self, device: &str) -> bool {
        let path = self.lock_path(device);

        match read_pid(&path) {
            Some(pid) if pid == self.owner => match fs::remove_file(&path) {
                Ok(()) => {
                    debug!("Unlocked {}", device);
                    true
                }
                Err(e) => {
                    warn!("Unable to remove lock {}: {}", path.display(), e);
                    false
                }
            },
            Some(pid) => {
                debug!(
                    "Not removing lock on {}: held by {}, not {}",
                    device, pid, self.owner
                );
                false
            }
            None => false,
        }
    }

    /// Remove the lock file whoever holds it. Meant for manual recovery.
    pub fn force_unlock(&self, device: &str) -> bool {
        let path = self.lock_path(device);
        match fs::remove_file(&path) {
            Ok(()) => {
                warn!("Forcibly removed lock {}", path.display());
                true
            }
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    warn!("Unable to remove lock {}: {}", path.display(), e);
                }
                false
            }
        }
    }

    /// PID recorded in the lock file, alive or not.
    pub fn holder(&self, device: &str) -> Option<u32> {
        read_pid(&self.lock_path(device))
    }

    /// Take the lock and tie its release to the returned guard.
    pub fn acquire(&self, device: &str) -> Option<LockGuard> {
        if self.set_lock(device) {
            Some(LockGuard {
                lock: self.clone(),
                device: device.to_string(),
                released: false,
            })
        } else {
            None
        }
    }

    /// Write this owner's PID to a fresh private file next to `path`.
    fn stage(&self, path: &Path) -> std::io::Result<PathBuf> {
        let staged = self.scratch_path(path, "tmp");
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&staged)?;
        let written = writeln!(file, "{:>10}", self.owner).and_then(|_| file.sync_all());
        if let Err(e) = written {
            let _ = fs::remove_file(&staged);
            return Err(e);
        }
        Ok(staged)
    }

    /// Unique sibling of `path`, distinct per process, owner and call.
    fn scratch_path(&self, path: &Path, kind: &str) -> PathBuf {
        let seq = SCRATCH_SEQ.fetch_add(1, Ordering::Relaxed);
        let mut name = path.file_name().unwrap_or_default().to_os_string();
        name.push(format!(
            ".{}.{}.{}.{}",
            kind,
            std::process::id(),
            self.owner,
            seq
        ));
        path.with_file_name(name)
    }
}

/// Ownership of one device lock. Dropping it releases the lock.
#[derive(Debug)]
pub struct LockGuard {
    lock: DeviceLock,
    device: String,
    released: bool,
}

impl LockGuard {
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Release now. A lock file that is already gone counts as released.
    pub fn release(mut self) -> bool {
        self.release_inner()
    }

    fn release_inner(&mut self) -> bool {
        if self.released {
            return true;
        }
        self.released = true;

        if self.lock.remove_lock(&self.device) {
            true
        } else if self.lock.holder(&self.device).is_none() {
            debug!("Lock for {} already gone", self.device);
            true
        } else {
            warn!("Lock for {} is held by another owner", self.device);
            false
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.release_inner();
    }
}

fn read_pid(path: &Path) -> Option<u32> {
    let content = fs::read_to_string(path).ok()?;
    content.trim().parse().ok().filter(|&pid| pid > 0)
}

#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    if pid <= 0 {
        return false;
    }
    // SAFETY: signal 0 performs only the existence and permission check.
    let ret = unsafe { libc::kill(pid, 0) };
    ret == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
fn process_alive(_pid: u32) -> bool {
    true
}
