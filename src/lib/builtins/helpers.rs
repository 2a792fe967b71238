use nix::sys::wait::WaitStatus;
use std::fmt;

/// The translated result of executing a node.
///
/// A non-negative value is an exit code. A negative value is the negated
/// number of the signal that terminated (or stopped) the process.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Status(i32);

impl Status {
    pub const FAILURE: Self = Status(1);
    pub const SUCCESS: Self = Status(0);

    pub fn from_signal(signal: i32) -> Self { Status(-signal) }

    pub fn from_exit_code(code: i32) -> Self { Status(code) }

    /// Translates a wait result. `None` for statuses that carry no outcome
    /// (`StillAlive`, `Continued`, ptrace events).
    pub fn from_wait(status: WaitStatus) -> Option<Self> {
        match status {
            WaitStatus::Exited(_, code) => Some(Status::from_exit_code(code)),
            WaitStatus::Signaled(_, signal, _) => Some(Status::from_signal(signal as i32)),
            WaitStatus::Stopped(_, signal) => Some(Status::from_signal(signal as i32)),
            _ => None,
        }
    }

    pub fn error<T: AsRef<str>>(err: T) -> Self {
        let err = err.as_ref();
        if !err.is_empty() {
            eprintln!("vush: {}", err);
        }
        Status::FAILURE
    }

    pub fn is_success(self) -> bool { self.0 == 0 }

    pub fn is_failure(self) -> bool { self.0 != 0 }

    pub fn is_signaled(self) -> bool { self.0 < 0 }

    /// The code handed to `exit(2)` by a forked child that reports this status.
    pub fn as_os_code(self) -> i32 {
        if self.0 < 0 {
            128 - self.0
        } else {
            self.0
        }
    }

    pub fn code(self) -> i32 { self.0 }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 < 0 {
            write!(f, "signal {}", -self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}
