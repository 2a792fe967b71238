//! The execution core of vush.
//!
//! A front end parses a line of input into a [`Node`] tree and hands it to
//! [`Shell::execute`], which runs builtins in-process, forks and executes
//! external programs, connects pipelines, applies redirections, and keeps
//! track of the foreground process for job-control signals.

pub mod builtins;
pub mod shell;
pub mod tree;

pub use crate::{
    builtins::{BuiltinError, Status},
    shell::{
        signals, BackgroundProcess, ExecError, Options, ProcessState, Prompt, PromptContext,
        Shell, Subprocess,
    },
    tree::{Command, Node, RedirectKind, Redirection},
};
