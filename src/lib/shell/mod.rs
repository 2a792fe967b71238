mod pipe_exec;
pub mod prompt;
pub mod signals;

pub use self::{
    pipe_exec::{
        foreground,
        fork::Subprocess,
        job_control::{BackgroundProcess, ProcessState},
    },
    prompt::{Prompt, PromptContext},
};
pub(crate) use self::pipe_exec::job_control::wait_for_child;
use crate::{
    builtins::{BuiltinMap, Status},
    tree::Node,
};
use nix::{errno::Errno, unistd::Pid};
use std::{
    env,
    io::{self, Write},
    os::unix::io::RawFd,
    path::PathBuf,
};
use thiserror::Error;

/// Errors from execution
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("fork failed: {0}")]
    Fork(#[source] Errno),
    #[error("failed to create pipe: {0}")]
    Pipe(#[source] Errno),
    #[error("could not duplicate {0} to {1}: {2}")]
    Dup(RawFd, RawFd, #[source] Errno),
    #[error("failed to open '{}': {}", .0.display(), .1)]
    Open(PathBuf, #[source] io::Error),
    #[error("failed to read '{}': {}", .0.display(), .1)]
    Read(PathBuf, #[source] io::Error),
    #[error("failed to write to process {0}: {1}")]
    Write(Pid, #[source] io::Error),
    #[error("waiting for process {0} failed: {1}")]
    Wait(Pid, #[source] Errno),
    #[error("could not send {1} to process {0}: {2}")]
    Signal(Pid, &'static str, #[source] Errno),
    #[error("argument contains a nul byte: {0:?}")]
    NulByte(String),
}

/// Options for the shell
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct Options {
    /// The environment variable holding the prompt template.
    pub prompt_var: String,
    /// The prompt used when the template variable is unset.
    pub default_prompt: String,
    /// How many bytes of a file an input redirection delivers at most.
    pub input_limit: usize,
    /// Permission bits for files created by output redirections.
    pub create_mode: u32,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            prompt_var:     "PS1".into(),
            default_prompt: prompt::DEFAULT_PROMPT.into(),
            input_limit:    131_072,
            create_mode:    0o644,
        }
    }
}

/// The shell owns everything that outlives a single statement: the builtin
/// table, the options, the current prompt, the status of the last statement
/// and the detached processes that still have to be reaped.
pub struct Shell {
    builtins:        BuiltinMap,
    opts:            Options,
    prompt:          String,
    previous_status: Status,
    background:      Vec<BackgroundProcess>,
}

impl Default for Shell {
    fn default() -> Self { Self::new() }
}

impl Shell {
    /// Install signal handlers necessary for the shell to work
    fn install_signal_handlers() {
        if let Err(why) = signals::install_interrupt_handler() {
            eprintln!("vush: could not install the interrupt handler: {}", why);
        }
        if let Err(why) = signals::install_suspend_handler() {
            eprintln!("vush: could not install the suspend handler: {}", why);
        }
        if let Err(why) = signals::ignore_broken_pipes() {
            eprintln!("vush: could not ignore SIGPIPE: {}", why);
        }
    }

    /// Create a new shell with default settings
    pub fn new() -> Self { Self::with_options(Options::default()) }

    pub fn with_options(opts: Options) -> Self {
        Self::install_signal_handlers();

        let mut shell = Shell {
            builtins: BuiltinMap::default(),
            prompt: opts.default_prompt.clone(),
            opts,
            previous_status: Status::SUCCESS,
            background: Vec::new(),
        };
        shell.refresh_prompt();
        shell
    }

    /// Executes one statement: reaps finished background jobs, runs the
    /// tree, and tells the user about any signal that was forwarded meanwhile.
    pub fn execute(&mut self, node: &Node) -> Status {
        self.reap_background();
        let status = self.run(node);
        self.report_signals();
        self.previous_status = status;
        status
    }

    /// Runs a node of the tree. This is the single entry point that every
    /// handler recurses through for child subtrees.
    pub(crate) fn run(&mut self, node: &Node) -> Status {
        self.refresh_prompt();

        let result = match *node {
            Node::Command(ref command) => match self.exec_builtin(command) {
                Some(status) => Ok(status),
                None => self.exec_external(command),
            },
            Node::Pipe(ref stages) => self.exec_pipeline(stages),
            Node::Redirect(ref redirection, ref child) => self.redirect(redirection, child),
            Node::Subshell(ref child) => self.spawn(child).and_then(Subprocess::wait),
            Node::Detach(ref child) => self.detach(child),
            Node::Sequence(ref first, ref second) => {
                self.run(first);
                Ok(self.run(second))
            }
        };

        let status = result.unwrap_or_else(|why| Status::error(why.to_string()));
        self.refresh_prompt();
        status
    }

    fn detach(&mut self, child: &Node) -> Result<Status, ExecError> {
        let pid = self.spawn(child)?.detach();
        self.send_to_background(BackgroundProcess::new(pid, child.to_string()));
        Ok(Status::SUCCESS)
    }

    fn report_signals(&self) {
        for notice in signals::take_notices() {
            if notice.is_status_line() {
                println!("\n{}", notice);
            } else {
                eprintln!("vush: {}", notice);
            }
        }
    }

    /// Re-renders the prompt from the template variable.
    pub fn refresh_prompt(&mut self) {
        let template = env::var(&self.opts.prompt_var).ok();
        self.prompt = match template {
            Some(template) => Prompt::render(&template, &PromptContext::current()),
            None => self.opts.default_prompt.clone(),
        };
    }

    /// The prompt as of the last executed node.
    pub fn prompt(&self) -> &str { &self.prompt }

    /// Get the status of the last executed statement
    pub const fn previous_status(&self) -> Status { self.previous_status }

    /// Get access to the builtins
    pub const fn builtins(&self) -> &BuiltinMap { &self.builtins }

    /// Access to the shell options
    pub const fn opts(&self) -> &Options { &self.opts }

    /// Mutable access to the shell options
    pub fn opts_mut(&mut self) -> &mut Options { &mut self.opts }
}

/// Leaves a forked child of the shell. Buffered output is flushed, but none
/// of the parent's exit handlers run.
pub(crate) fn fork_exit(status: Status) -> ! {
    let _ = io::stdout().flush();
    let _ = io::stderr().flush();
    unsafe { nix::libc::_exit(status.as_os_code()) }
}
