//! Advisory locking of channel files.
//!
//! Each channel has one writer (the engine whose output it is) and one reader
//! (the peer engine). Writers take an exclusive lock, readers a shared one, so a
//! reader never pairs one write's length prefix with another write's payload.
//!
//! On Unix the lock is a POSIX record lock over the length prefix, which network
//! filesystem clients forward to the server. Elsewhere `fs2` locks the whole file.
//!
//! Acquisition spins on contention with no backoff and no timeout. Under heavy
//! contention this burns CPU; backoff would change propagation latency, so it is
//! left as is.

use std::fs::File;
use std::io;
use tracing::{debug, trace};

/// Bytes covered by the lock, starting at offset 0 (the length prefix)
pub const LOCK_RANGE: u64 = 4;

/// Spin count between trace messages while waiting on a contended lock
const SPIN_TRACE_INTERVAL: u64 = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Readers
    Shared,
    /// Writers
    Exclusive,
}

/// Held lock on a channel file. Released on drop.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct ChannelLock<'a> {
    file: &'a File,
    held: bool,
}

impl ChannelLock<'_> {
    /// Whether the filesystem actually granted the lock.
    pub fn is_held(&self) -> bool {
        self.held
    }

    pub fn release(mut self) -> io::Result<()> {
        self.unlock()
    }

    fn unlock(&mut self) -> io::Result<()> {
        if !self.held {
            return Ok(());
        }
        self.held = false;
        loop {
            match sys::unlock(self.file) {
                Ok(()) => return Ok(()),
                Err(e) if is_contended(&e) => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

impl Drop for ChannelLock<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.unlock() {
            debug!("Failed to release channel lock: {}", e);
        }
    }
}

/// Lock `file`, retrying for as long as the lock is contended.
///
/// Errors other than contention mean the filesystem does not support locking.
/// Those are returned to the caller, which decides whether to continue unlocked.
pub fn acquire(file: &File, mode: LockMode) -> io::Result<ChannelLock<'_>> {
    let mut spins: u64 = 0;
    loop {
        match sys::try_lock(file, mode) {
            Ok(()) => {
                if spins > 0 {
                    trace!("{:?} lock acquired after {} retries", mode, spins);
                }
                return Ok(ChannelLock { file, held: true });
            }
            Err(e) if is_contended(&e) => {
                spins += 1;
                if spins % SPIN_TRACE_INTERVAL == 0 {
                    trace!("Still waiting for {:?} lock ({} retries)", mode, spins);
                }
                std::hint::spin_loop();
            }
            Err(e) => return Err(e),
        }
    }
}

/// Acquire, or fall back to an unheld guard if the filesystem refuses locking.
///
/// `warned` is flipped on the first fallback so the caller logs it once.
pub fn acquire_or_proceed<'a>(
    file: &'a File,
    mode: LockMode,
    warned: &mut bool,
) -> ChannelLock<'a> {
    match acquire(file, mode) {
        Ok(lock) => lock,
        Err(e) => {
            if !*warned {
                tracing::warn!("Channel locking unsupported ({}), continuing unlocked", e);
                *warned = true;
            }
            ChannelLock { file, held: false }
        }
    }
}

fn is_contended(e: &io::Error) -> bool {
    if e.kind() == io::ErrorKind::WouldBlock {
        return true;
    }
    sys::is_contended_os_error(e)
}

#[cfg(unix)]
mod sys {
    use super::{LockMode, LOCK_RANGE};
    use std::fs::File;
    use std::io;
    use std::os::unix::io::AsRawFd;

    fn set_lock(file: &File, lock_type: libc::c_int) -> io::Result<()> {
        // SAFETY: flock is plain data; zeroed is a valid starting value and every
        // field the kernel reads is set below.
        let mut fl: libc::flock = unsafe { std::mem::zeroed() };
        fl.l_type = lock_type as _;
        fl.l_whence = libc::SEEK_SET as _;
        fl.l_start = 0;
        fl.l_len = LOCK_RANGE as libc::off_t;

        // SAFETY: the fd is owned by `file` and outlives the call.
        let rc = unsafe {
            libc::fcntl(
                file.as_raw_fd(),
                libc::F_SETLK,
                &mut fl as *mut libc::flock,
            )
        };
        if rc == -1 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    pub fn try_lock(file: &File, mode: LockMode) -> io::Result<()> {
        let lock_type = match mode {
            LockMode::Shared => libc::F_RDLCK,
            LockMode::Exclusive => libc::F_WRLCK,
        };
        set_lock(file, lock_type as libc::c_int)
    }

    pub fn unlock(file: &File) -> io::Result<()> {
        set_lock(file, libc::F_UNLCK as libc::c_int)
    }

    pub fn is_contended_os_error(e: &io::Error) -> bool {
        matches!(
            e.raw_os_error(),
            Some(libc::EACCES) | Some(libc::EAGAIN) | Some(libc::EPERM) | Some(libc::EINTR)
        )
    }
}

#[cfg(not(unix))]
mod sys {
    use super::LockMode;
    use fs2::FileExt;
    use std::fs::File;
    use std::io;

    pub fn try_lock(file: &File, mode: LockMode) -> io::Result<()> {
        match mode {
            LockMode::Shared => file.try_lock_shared(),
            LockMode::Exclusive => file.try_lock_exclusive(),
        }
    }

    pub fn unlock(file: &File) -> io::Result<()> {
        FileExt::unlock(file)
    }

    pub fn is_contended_os_error(e: &io::Error) -> bool {
        e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
    }
}
