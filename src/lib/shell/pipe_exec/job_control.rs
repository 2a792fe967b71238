use super::{
    super::{ExecError, Shell},
    foreground,
};
use crate::builtins::Status;
use nix::{
    errno::Errno,
    sys::wait::{waitpid, WaitPidFlag, WaitStatus},
    unistd::Pid,
};
use std::fmt;

#[derive(Clone, Copy, Hash, Debug, PartialEq, Eq)]
/// Defines whether the background process is running, stopped or finished.
pub enum ProcessState {
    Running,
    Stopped,
    Done(Status),
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ProcessState::Running => write!(f, "Running"),
            ProcessState::Stopped => write!(f, "Stopped"),
            ProcessState::Done(status) => write!(f, "Done ({})", status),
        }
    }
}

#[derive(Clone, Debug, Hash)]
/// A detached process. The shell does not wait for it, but remembers it so
/// that it can be reaped once it finishes.
pub struct BackgroundProcess {
    pid:   Pid,
    state: ProcessState,
    name:  String,
}

impl BackgroundProcess {
    pub(crate) fn new(pid: Pid, name: String) -> Self {
        BackgroundProcess { pid, state: ProcessState::Running, name }
    }

    pub fn pid(&self) -> Pid { self.pid }

    pub fn state(&self) -> ProcessState { self.state }

    pub fn name(&self) -> &str { &self.name }

    pub fn is_done(&self) -> bool { matches!(self.state, ProcessState::Done(_)) }

    /// Polls the process without blocking and updates its state.
    fn poll(&mut self) -> Result<(), ExecError> {
        let flags = WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED | WaitPidFlag::WCONTINUED;
        loop {
            match waitpid(self.pid, Some(flags)) {
                Ok(WaitStatus::StillAlive) => return Ok(()),
                Ok(WaitStatus::Continued(_)) => self.state = ProcessState::Running,
                Ok(WaitStatus::Stopped(..)) => self.state = ProcessState::Stopped,
                Ok(status) => {
                    if let Some(status) = Status::from_wait(status) {
                        self.state = ProcessState::Done(status);
                        return Ok(());
                    }
                }
                // Someone else reaped it, e.g. `fg` on a detached job.
                Err(Errno::ECHILD) => {
                    self.state = ProcessState::Done(Status::SUCCESS);
                    return Ok(());
                }
                Err(Errno::EINTR) => (),
                Err(why) => return Err(ExecError::Wait(self.pid, why)),
            }
        }
    }
}

impl fmt::Display for BackgroundProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}\t{}", self.pid, self.state, self.name)
    }
}

/// Blocks until `pid` exits. Used for the shell's own intermediate children.
pub(crate) fn wait_for_exit(pid: Pid) -> Result<Status, ExecError> {
    loop {
        match waitpid(pid, None) {
            Ok(status) => {
                if let Some(status) = Status::from_wait(status) {
                    return Ok(status);
                }
            }
            Err(Errno::EINTR) => (),
            Err(why) => return Err(ExecError::Wait(pid, why)),
        }
    }
}

/// Blocks until `pid` exits or stops, releasing the foreground slot when
/// the process is gone.
pub(crate) fn wait_for_child(pid: Pid) -> Result<Status, ExecError> {
    loop {
        match waitpid(pid, Some(WaitPidFlag::WUNTRACED)) {
            Ok(status @ WaitStatus::Stopped(..)) => {
                log::debug!("process {} stopped", pid);
                return Status::from_wait(status).ok_or(ExecError::Wait(pid, Errno::EINVAL));
            }
            Ok(status) => {
                if let Some(translated) = Status::from_wait(status) {
                    foreground::release(pid);
                    log::debug!("process {} finished with {}", pid, translated);
                    return Ok(translated);
                }
            }
            Err(Errno::EINTR) => (),
            Err(why) => {
                foreground::release(pid);
                return Err(ExecError::Wait(pid, why));
            }
        }
    }
}

impl Shell {
    /// Remembers a detached process until it is reaped.
    pub(crate) fn send_to_background(&mut self, process: BackgroundProcess) {
        log::debug!("background [{}] {}", self.background.len(), process);
        self.background.push(process);
    }

    /// Reaps every finished detached process without blocking, and returns
    /// how many were reaped.
    pub fn reap_background(&mut self) -> usize {
        for process in self.background.iter_mut() {
            if let Err(why) = process.poll() {
                eprintln!("vush: {}", why);
                process.state = ProcessState::Done(Status::FAILURE);
            }
        }

        let before = self.background.len();
        self.background.retain(|process| {
            if process.is_done() {
                foreground::release(process.pid);
                log::debug!("reaped background process {}", process);
                false
            } else {
                true
            }
        });
        before - self.background.len()
    }

    /// Detached processes that have not been reaped yet.
    pub fn background_jobs(&self) -> &[BackgroundProcess] { &self.background }
}
