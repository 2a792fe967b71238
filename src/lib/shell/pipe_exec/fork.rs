use super::{
    super::{fork_exit, signals::SuspendIgnored, ExecError, Shell},
    foreground, fork_shell,
    job_control::wait_for_exit,
    streams::redir,
};
use crate::{builtins::Status, tree::Node};
use nix::{
    fcntl::OFlag,
    libc::STDIN_FILENO,
    unistd::{pipe2, ForkResult, Pid},
};
use std::{
    fs::File,
    io::{self, Write},
    os::unix::io::{AsRawFd, IntoRawFd},
};

/// A forked copy of the shell running a subtree, whose standard input is
/// fed by the parent.
///
/// While it is alive the parent ignores the suspend signal, so that a stop
/// request only reaches the child.
#[derive(Debug)]
pub struct Subprocess {
    pid:      Pid,
    input:    File,
    _suspend: SuspendIgnored,
}

impl Subprocess {
    pub fn pid(&self) -> Pid { self.pid }

    /// The write end of the child's standard input.
    pub fn input(&mut self) -> &mut File { &mut self.input }

    /// Writes `bytes` to the child's standard input. A child that exits
    /// without reading everything is not an error.
    pub fn write_input(&mut self, bytes: &[u8]) -> Result<(), ExecError> {
        match self.input.write_all(bytes) {
            Err(ref why) if why.kind() == io::ErrorKind::BrokenPipe => {
                log::debug!("process {} closed its input early", self.pid);
                Ok(())
            }
            result => result.map_err(|why| ExecError::Write(self.pid, why)),
        }
    }

    /// Closes the child's input and blocks until it exits.
    pub fn wait(self) -> Result<Status, ExecError> {
        let Subprocess { pid, input, _suspend } = self;
        drop(input);
        let status = wait_for_exit(pid);
        foreground::release(pid);
        status
    }

    /// Closes the child's input and lets it run on its own. Reaping it
    /// becomes the caller's business. It stays tracked, so `fg` and `bg`
    /// still reach it.
    pub fn detach(self) -> Pid { self.pid }
}

impl Shell {
    /// Forks the shell and runs `node` in the child, connected to the parent
    /// by a pipe on its standard input. The child always exits after the
    /// node, even if it only ran a builtin.
    ///
    /// The child becomes the tracked foreground process, replacing whatever
    /// was tracked before.
    pub(crate) fn spawn(&mut self, node: &Node) -> Result<Subprocess, ExecError> {
        let (reader, writer) = pipe2(OFlag::O_CLOEXEC).map_err(ExecError::Pipe)?;

        match fork_shell()? {
            ForkResult::Child => {
                drop(writer);
                let status = match redir(reader.as_raw_fd(), STDIN_FILENO) {
                    Ok(()) => {
                        if reader.as_raw_fd() == STDIN_FILENO {
                            let _ = reader.into_raw_fd();
                        } else {
                            drop(reader);
                        }
                        self.run(node)
                    }
                    Err(why) => Status::error(why.to_string()),
                };
                fork_exit(status)
            }
            ForkResult::Parent { child } => {
                log::debug!("spawned '{}' as {}", node, child);
                foreground::replace(child);
                let suspend = SuspendIgnored::new();
                drop(reader);
                Ok(Subprocess { pid: child, input: File::from(writer), _suspend: suspend })
            }
        }
    }
}
