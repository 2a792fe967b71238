use super::{
    super::{fork_exit, ExecError, Shell},
    fork_shell,
    job_control::wait_for_exit,
};
use crate::{
    builtins::Status,
    tree::{Node, RedirectKind, Redirection},
};
use nix::{
    fcntl::{open, OFlag},
    libc::{mode_t, STDERR_FILENO, STDOUT_FILENO},
    sys::stat::Mode,
    unistd::{dup2, ForkResult},
};
use std::{
    fs::{File, OpenOptions},
    io::Read,
    os::unix::{
        fs::OpenOptionsExt,
        io::{AsRawFd, FromRawFd, IntoRawFd, RawFd},
    },
    path::Path,
};

/// Use dup2 to replace `new` with `old` using `new`s file descriptor ID
pub(crate) fn redir(old: RawFd, new: RawFd) -> Result<(), ExecError> {
    if old == new {
        return Ok(());
    }
    dup2(old, new).map(|_| ()).map_err(|why| ExecError::Dup(old, new, why))
}

/// Moves `file` onto `fd`, and onto standard error as well if asked to.
fn point_at(file: File, fd: RawFd, also_stderr: bool) -> Result<(), ExecError> {
    let raw = file.as_raw_fd();
    redir(raw, fd)?;
    if also_stderr {
        redir(raw, STDERR_FILENO)?;
    }
    if raw == fd || (also_stderr && raw == STDERR_FILENO) {
        // The descriptor is in use under its own number; dropping would close it.
        let _ = file.into_raw_fd();
    }
    Ok(())
}

fn open_output(path: &Path, append: bool, mode: u32) -> Result<File, ExecError> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).mode(mode);
    if append {
        options.append(true);
    } else {
        options.truncate(true);
    }
    options.open(path).map_err(|why| ExecError::Open(path.to_owned(), why))
}

/// Reads at most `limit` bytes of `path`, creating the file if it is missing.
/// Anything past the limit is silently left out.
fn read_input(path: &Path, limit: usize, mode: u32) -> Result<Vec<u8>, ExecError> {
    let flags = OFlag::O_RDONLY | OFlag::O_CREAT | OFlag::O_CLOEXEC;
    let fd = open(path, flags, Mode::from_bits_truncate(mode as mode_t))
        .map_err(|why| ExecError::Open(path.to_owned(), why.into()))?;
    let file = unsafe { File::from_raw_fd(fd) };

    let mut contents = Vec::with_capacity(limit.min(8192));
    file.take(limit as u64)
        .read_to_end(&mut contents)
        .map_err(|why| ExecError::Read(path.to_owned(), why))?;
    Ok(contents)
}

impl Shell {
    /// Executes `child` with one of its streams redirected.
    pub(crate) fn redirect(
        &mut self,
        redirection: &Redirection,
        child: &Node,
    ) -> Result<Status, ExecError> {
        let mode = self.opts.create_mode;
        let fd = redirection.fd;
        // A composite child may write through nested commands on either
        // stream, so both are captured.
        let composite = child.is_composite();

        match redirection.kind {
            RedirectKind::Input(ref path) => self.redirect_input(path, child),
            RedirectKind::Output(ref path) => self.fork_rewired(child, || {
                point_at(open_output(path, false, mode)?, fd, composite)
            }),
            RedirectKind::Append(ref path) => self.fork_rewired(child, || {
                point_at(open_output(path, true, mode)?, fd, composite)
            }),
            RedirectKind::MergeStderr => {
                self.fork_rewired(child, || redir(STDOUT_FILENO, STDERR_FILENO))
            }
        }
    }

    /// Forks, rewires the child's descriptors with `rewire`, and runs `node`
    /// in the child. If rewiring fails the node is not run at all.
    fn fork_rewired<F>(&mut self, node: &Node, rewire: F) -> Result<Status, ExecError>
    where
        F: FnOnce() -> Result<(), ExecError>,
    {
        match fork_shell()? {
            ForkResult::Child => {
                let status = match rewire() {
                    Ok(()) => self.run(node),
                    Err(why) => Status::error(why.to_string()),
                };
                fork_exit(status)
            }
            ForkResult::Parent { child } => {
                log::debug!("redirected '{}' runs as {}", node, child);
                wait_for_exit(child)
            }
        }
    }

    /// Feeds the contents of `path` to the standard input of `child`.
    fn redirect_input(&mut self, path: &Path, child: &Node) -> Result<Status, ExecError> {
        let contents = read_input(path, self.opts.input_limit, self.opts.create_mode)?;
        let mut subprocess = self.spawn(child)?;
        let written = subprocess.write_input(&contents);
        let status = subprocess.wait();
        written.and(status)
    }
}
