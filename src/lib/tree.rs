//! The command tree handed to the executor by the parser.
//!
//! A tree describes exactly one statement. It is never mutated by the
//! executor; every handler borrows the node it executes.

use std::{fmt, os::unix::io::RawFd, path::PathBuf};

/// A single external or builtin invocation.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Command {
    pub program: String,
    /// The full argument vector. The first element is always `program`.
    pub argv: Vec<String>,
}

impl Command {
    /// Builds a command whose argument vector starts with the program name.
    pub fn new<S: Into<String>, I, A>(program: S, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        let program = program.into();
        let mut argv = vec![program.clone()];
        argv.extend(args.into_iter().map(Into::into));
        Command { program, argv }
    }

    /// The arguments following the program name.
    pub fn args(&self) -> &[String] { self.argv.get(1..).unwrap_or(&[]) }
}

/// Where a redirected stream is sent, or taken from.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum RedirectKind {
    /// `< file`
    Input(PathBuf),
    /// `> file`
    Output(PathBuf),
    /// `>> file`
    Append(PathBuf),
    /// `2>&1`
    MergeStderr,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Redirection {
    /// The descriptor that is rewired in the child. Only meaningful for
    /// `Output` and `Append`; input always feeds standard input.
    pub fd:   RawFd,
    pub kind: RedirectKind,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Node {
    Command(Command),
    Pipe(Vec<Node>),
    Redirect(Redirection, Box<Node>),
    Subshell(Box<Node>),
    Detach(Box<Node>),
    Sequence(Box<Node>, Box<Node>),
}

impl Node {
    pub fn command<S: Into<String>, I, A>(program: S, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Node::Command(Command::new(program, args))
    }

    pub fn pipe<I: IntoIterator<Item = Node>>(stages: I) -> Self {
        Node::Pipe(stages.into_iter().collect())
    }

    /// Redirects `fd` of `child` according to `kind`.
    pub fn redirect(fd: RawFd, kind: RedirectKind, child: Node) -> Self {
        Node::Redirect(Redirection { fd, kind }, Box::new(child))
    }

    /// `child < path`
    pub fn input<P: Into<PathBuf>>(path: P, child: Node) -> Self {
        Node::redirect(0, RedirectKind::Input(path.into()), child)
    }

    /// `child > path`
    pub fn output<P: Into<PathBuf>>(path: P, child: Node) -> Self {
        Node::redirect(1, RedirectKind::Output(path.into()), child)
    }

    /// `child >> path`
    pub fn append<P: Into<PathBuf>>(path: P, child: Node) -> Self {
        Node::redirect(1, RedirectKind::Append(path.into()), child)
    }

    /// `child 2>&1`
    pub fn merge_stderr(child: Node) -> Self { Node::redirect(2, RedirectKind::MergeStderr, child) }

    pub fn subshell(child: Node) -> Self { Node::Subshell(Box::new(child)) }

    pub fn detach(child: Node) -> Self { Node::Detach(Box::new(child)) }

    pub fn sequence(first: Node, second: Node) -> Self {
        Node::Sequence(Box::new(first), Box::new(second))
    }

    /// Folds a list of statements into right-nested sequences.
    /// Returns `None` if the list is empty.
    pub fn sequence_of<I: IntoIterator<Item = Node>>(nodes: I) -> Option<Self> {
        let mut nodes: Vec<Node> = nodes.into_iter().collect();
        let mut acc = nodes.pop()?;
        while let Some(node) = nodes.pop() {
            acc = Node::sequence(node, acc);
        }
        Some(acc)
    }

    /// Anything that is not a plain command.
    pub fn is_composite(&self) -> bool { !matches!(self, Node::Command(_)) }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.argv.join(" ")) }
}

impl fmt::Display for Redirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            RedirectKind::Input(ref path) => write!(f, "< {}", path.display()),
            RedirectKind::Output(ref path) if self.fd == 1 => write!(f, "> {}", path.display()),
            RedirectKind::Output(ref path) => write!(f, "{}> {}", self.fd, path.display()),
            RedirectKind::Append(ref path) if self.fd == 1 => write!(f, ">> {}", path.display()),
            RedirectKind::Append(ref path) => write!(f, "{}>> {}", self.fd, path.display()),
            RedirectKind::MergeStderr => write!(f, "2>&1"),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Node::Command(ref command) => write!(f, "{}", command),
            Node::Pipe(ref stages) => {
                let stages: Vec<String> = stages.iter().map(ToString::to_string).collect();
                write!(f, "{}", stages.join(" | "))
            }
            Node::Redirect(ref redirection, ref child) => write!(f, "{} {}", child, redirection),
            Node::Subshell(ref child) => write!(f, "({})", child),
            Node::Detach(ref child) => write!(f, "{} &", child),
            Node::Sequence(ref first, ref second) => write!(f, "{}; {}", first, second),
        }
    }
}
