//! The purpose of the pipeline execution module is to turn nodes of the
//! command tree into processes. That includes forking and executing external
//! programs, wiring anonymous pipes between pipeline stages, rewiring
//! standard streams for redirections, spawning subshells and detached jobs,
//! and tracking the foreground process for job control.

pub mod foreground;
pub(crate) mod fork;
pub(crate) mod job_control;
mod pipes;
mod streams;

use self::job_control::wait_for_child;
use super::{fork_exit, signals, ExecError, Shell};
use crate::{builtins::Status, tree::Command};
use nix::unistd::{self, execvp, setpgid, ForkResult, Pid};
use std::{
    ffi::CString,
    io::{self, Write},
};

/// Forks the shell. Pending output is flushed first so that it is not
/// written twice, and the child starts without a tracked foreground process.
pub(crate) fn fork_shell() -> Result<ForkResult, ExecError> {
    let _ = io::stdout().flush();
    let _ = io::stderr().flush();
    match unsafe { unistd::fork() } {
        Ok(ForkResult::Child) => {
            foreground::reset();
            Ok(ForkResult::Child)
        }
        Ok(parent) => Ok(parent),
        Err(why) => Err(ExecError::Fork(why)),
    }
}

fn to_cstring(arg: &str) -> Result<CString, ExecError> {
    CString::new(arg).map_err(|_| ExecError::NulByte(arg.to_owned()))
}

impl Shell {
    /// Forks and executes an external program, then blocks until it exits
    /// or stops.
    ///
    /// The first process launched while nothing is tracked becomes the
    /// foreground process; later launches leave the slot alone until that
    /// process is gone.
    pub(crate) fn exec_external(&mut self, command: &Command) -> Result<Status, ExecError> {
        let program = to_cstring(&command.program)?;
        let argv = command.argv.iter().map(|arg| to_cstring(arg)).collect::<Result<Vec<_>, _>>()?;

        match fork_shell()? {
            ForkResult::Child => {
                let _ = setpgid(Pid::from_raw(0), Pid::from_raw(0));
                signals::restore_defaults();
                let Err(why) = execvp(&program, &argv);
                eprintln!("vush: {}: {}", command.program, why);
                fork_exit(Status::FAILURE)
            }
            ForkResult::Parent { child } => {
                log::debug!("launched '{}' as {}", command, child);
                // Both sides set the group, whichever runs first wins the race.
                let _ = setpgid(child, child);
                foreground::track_if_empty(child);
                if let Err(why) = signals::install_suspend_handler() {
                    eprintln!("vush: could not install the suspend handler: {}", why);
                }
                wait_for_child(child)
            }
        }
    }
}
