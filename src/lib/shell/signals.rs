//! Job-control signal handling.
//!
//! The handlers only touch the foreground slot, forward the signal with
//! `kill(2)` and raise a pending flag. Everything else, such as telling the
//! user what happened, is done by the shell once its blocking wait returns.

use super::pipe_exec::foreground;
use nix::{
    errno::Errno,
    libc::c_int,
    sys::signal::{kill, sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal},
    unistd::Pid,
};
use smallvec::SmallVec;
use std::{
    fmt,
    sync::atomic::{AtomicI32, AtomicU8, Ordering},
};

pub static PENDING: AtomicU8 = AtomicU8::new(0);
pub const INTERRUPTED: u8 = 1;
pub const STOPPED: u8 = 2;
pub const FORWARD_FAILED: u8 = 4;

static STOPPED_PID: AtomicI32 = AtomicI32::new(0);
static FORWARD_ERRNO: AtomicI32 = AtomicI32::new(0);

/// Something a handler did that the user should hear about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notice {
    /// The tracked process was sent an interrupt and is no longer tracked.
    Interrupted,
    /// The tracked process was asked to stop.
    Stopped(Pid),
    /// `kill(2)` failed, usually because the process was already gone.
    ForwardFailed(Errno),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Notice::Interrupted => write!(f, "KeyboardInterrupt"),
            Notice::Stopped(pid) => write!(f, "Stop: {}", pid),
            Notice::ForwardFailed(why) => write!(f, "could not forward signal: {}", why),
        }
    }
}

impl Notice {
    /// Job status lines go to standard output; failures are diagnostics.
    pub fn is_status_line(&self) -> bool { !matches!(self, Notice::ForwardFailed(_)) }
}

fn forward(pid: Pid, signal: Signal) -> bool {
    match kill(pid, signal) {
        Ok(()) => true,
        Err(errno) => {
            FORWARD_ERRNO.store(errno as i32, Ordering::SeqCst);
            PENDING.fetch_or(FORWARD_FAILED, Ordering::SeqCst);
            false
        }
    }
}

pub(crate) extern "C" fn interrupt_handler(_signal: c_int) {
    if let Some(pid) = foreground::take() {
        if forward(pid, Signal::SIGINT) {
            PENDING.fetch_or(INTERRUPTED, Ordering::SeqCst);
        }
    }
}

pub(crate) extern "C" fn suspend_handler(_signal: c_int) {
    // The process is stopped, not gone: it stays tracked for `fg` and `bg`.
    if let Some(pid) = foreground::current() {
        if forward(pid, Signal::SIGTSTP) {
            STOPPED_PID.store(pid.as_raw(), Ordering::SeqCst);
            PENDING.fetch_or(STOPPED, Ordering::SeqCst);
        }
    }
}

/// Drains the flags raised by the handlers since the last call.
pub fn take_notices() -> SmallVec<[Notice; 3]> {
    let pending = PENDING.swap(0, Ordering::SeqCst);
    let mut notices = SmallVec::new();
    if pending & INTERRUPTED != 0 {
        notices.push(Notice::Interrupted);
    }
    if pending & STOPPED != 0 {
        notices.push(Notice::Stopped(Pid::from_raw(STOPPED_PID.load(Ordering::SeqCst))));
    }
    if pending & FORWARD_FAILED != 0 {
        notices.push(Notice::ForwardFailed(Errno::from_raw(FORWARD_ERRNO.load(Ordering::SeqCst))));
    }
    notices
}

fn install(signal: Signal, handler: SigHandler) -> nix::Result<SigAction> {
    let action = SigAction::new(handler, SaFlags::SA_RESTART, SigSet::empty());
    unsafe { sigaction(signal, &action) }
}

pub fn install_interrupt_handler() -> nix::Result<()> {
    install(Signal::SIGINT, SigHandler::Handler(interrupt_handler)).map(|_| ())
}

pub fn install_suspend_handler() -> nix::Result<()> {
    install(Signal::SIGTSTP, SigHandler::Handler(suspend_handler)).map(|_| ())
}

/// A closed pipe reader must surface as `EPIPE` on write rather than kill the shell.
pub fn ignore_broken_pipes() -> nix::Result<()> {
    install(Signal::SIGPIPE, SigHandler::SigIgn).map(|_| ())
}

/// Run in a child right before `exec`: ignored dispositions survive `exec`,
/// and programs expect the defaults.
pub(crate) fn restore_defaults() {
    for &signal in &[Signal::SIGINT, Signal::SIGTSTP, Signal::SIGPIPE] {
        let _ = install(signal, SigHandler::SigDfl);
    }
}

/// Ignores the suspend signal while alive, and reinstates the previous
/// disposition once dropped.
#[derive(Debug)]
pub(crate) struct SuspendIgnored {
    previous: Option<SigAction>,
}

impl SuspendIgnored {
    pub(crate) fn new() -> SuspendIgnored {
        SuspendIgnored { previous: install(Signal::SIGTSTP, SigHandler::SigIgn).ok() }
    }
}

impl Drop for SuspendIgnored {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            let _ = unsafe { sigaction(Signal::SIGTSTP, &previous) };
        }
    }
}
