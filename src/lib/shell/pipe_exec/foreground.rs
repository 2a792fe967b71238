//! The foreground process slot.
//!
//! At most one process id is tracked at a time. The slot is shared between
//! the ordinary control flow and the job-control signal handlers, so every
//! access is a single atomic operation on a pointer-sized integer.

use nix::unistd::Pid;
use std::sync::atomic::{AtomicI32, Ordering};

const NONE: i32 = 0;

static FOREGROUND: AtomicI32 = AtomicI32::new(NONE);

fn to_pid(raw: i32) -> Option<Pid> {
    if raw > 0 {
        Some(Pid::from_raw(raw))
    } else {
        None
    }
}

/// The tracked process, if any.
pub fn current() -> Option<Pid> { to_pid(FOREGROUND.load(Ordering::SeqCst)) }

/// Tracks `pid` unless another process is already tracked.
/// Returns whether `pid` is now the tracked process.
pub fn track_if_empty(pid: Pid) -> bool {
    match FOREGROUND.compare_exchange(NONE, pid.as_raw(), Ordering::SeqCst, Ordering::SeqCst) {
        Ok(_) => true,
        Err(existing) => existing == pid.as_raw(),
    }
}

/// Tracks `pid`, dropping whatever was tracked before.
pub fn replace(pid: Pid) -> Option<Pid> { to_pid(FOREGROUND.swap(pid.as_raw(), Ordering::SeqCst)) }

/// Empties the slot and returns what it held.
pub fn take() -> Option<Pid> { to_pid(FOREGROUND.swap(NONE, Ordering::SeqCst)) }

/// Empties the slot only if it still holds `pid`.
pub fn release(pid: Pid) -> bool {
    FOREGROUND
        .compare_exchange(pid.as_raw(), NONE, Ordering::SeqCst, Ordering::SeqCst)
        .is_ok()
}

/// Called in every freshly forked child of the shell: the parent's tracked
/// process is not the child's to signal.
pub(crate) fn reset() { FOREGROUND.store(NONE, Ordering::SeqCst); }
