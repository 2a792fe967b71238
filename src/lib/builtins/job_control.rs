//! Contains the `fg` and `bg` commands, which act on the tracked foreground process.

use super::{BuiltinError, Status};
use crate::shell::{foreground, signals, wait_for_child, ExecError};
use nix::{
    sys::signal::{kill, Signal},
    unistd::Pid,
};

fn resume(pid: Pid) -> Result<(), ExecError> {
    kill(pid, Signal::SIGCONT).map_err(|why| ExecError::Signal(pid, "SIGCONT", why))
}

/// Resumes the tracked process and hands it the terminal again, blocking
/// until it stops or exits.
pub fn fg() -> Result<Status, BuiltinError> {
    let pid = foreground::current().ok_or(BuiltinError::NoTrackedJob("resume"))?;
    resume(pid)?;
    if let Err(why) = signals::install_suspend_handler() {
        eprintln!("vush: could not install the suspend handler: {}", why);
    }
    Ok(wait_for_child(pid)?)
}

/// Resumes the tracked process, leaving it to run on its own.
pub fn bg() -> Result<Status, BuiltinError> {
    let pid = foreground::current().ok_or(BuiltinError::NoTrackedJob("resume"))?;
    resume(pid)?;
    Ok(Status::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{shell::Shell, tree::Node};
    use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
    use serial_test::serial;
    use std::process::Command;

    /// Starts `sleep` and stops it, making it the tracked process.
    fn stopped_sleep(seconds: &str) -> Pid {
        let child = Command::new("sleep").arg(seconds).spawn().expect("failed to spawn sleep");
        let pid = Pid::from_raw(child.id() as i32);
        kill(pid, Signal::SIGSTOP).unwrap();
        match waitpid(pid, Some(WaitPidFlag::WUNTRACED)).unwrap() {
            WaitStatus::Stopped(..) => (),
            other => panic!("sleep did not stop: {:?}", other),
        }
        foreground::replace(pid);
        pid
    }

    #[test]
    #[serial]
    fn fg_waits_until_the_process_exits() {
        let mut shell = Shell::new();
        let pid = stopped_sleep("0.2");

        let status = shell.execute(&Node::command("fg", Vec::<String>::new()));
        assert_eq!(status, Status::SUCCESS);
        assert_eq!(foreground::current(), None);
        assert!(waitpid(pid, Some(WaitPidFlag::WNOHANG)).is_err());
    }

    #[test]
    #[serial]
    fn bg_resumes_without_waiting() {
        let mut shell = Shell::new();
        let pid = stopped_sleep("5");

        let status = shell.execute(&Node::command("bg", Vec::<String>::new()));
        assert_eq!(status, Status::SUCCESS);
        assert_eq!(foreground::current(), Some(pid));
        match waitpid(pid, Some(WaitPidFlag::WCONTINUED)).unwrap() {
            WaitStatus::Continued(_) => (),
            other => panic!("sleep was not continued: {:?}", other),
        }

        kill(pid, Signal::SIGKILL).unwrap();
        let _ = waitpid(pid, None);
        foreground::reset();
    }

    #[test]
    #[serial]
    fn nothing_to_resume() {
        foreground::reset();
        assert!(matches!(fg(), Err(BuiltinError::NoTrackedJob(_))));
        assert!(matches!(bg(), Err(BuiltinError::NoTrackedJob(_))));

        let mut shell = Shell::new();
        assert_eq!(shell.execute(&Node::command("fg", Vec::<String>::new())), Status::FAILURE);
    }
}
