/// Helpers shared by the builtins and the rest of the shell
pub mod helpers;

mod job_control;

pub use self::helpers::Status;
use self::job_control::{bg, fg};
use crate::{
    shell::{ExecError, Shell},
    tree::Command,
};
use std::{
    env,
    io::{self, Write},
    path::PathBuf,
};
use thiserror::Error;

/// Why a builtin refused or failed to do its job.
#[derive(Debug, Error)]
pub enum BuiltinError {
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),
    #[error("expected NAME=VALUE, found '{0}'")]
    InvalidAssignment(String),
    #[error("invalid variable name '{0}'")]
    InvalidName(String),
    #[error("invalid variable value for '{0}'")]
    InvalidValue(String),
    #[error("'{0}' is not a valid exit code")]
    InvalidExitCode(String),
    #[error("no job to {0}")]
    NoTrackedJob(&'static str),
    #[error("{}: {}", .path.display(), .source)]
    Chdir {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// The type for builtin functions. Builtins have direct access to the shell.
///
/// `args[0]` is the name the builtin was invoked with.
pub type BuiltinFunction = fn(&[String], &mut Shell) -> Result<Status, BuiltinError>;

macro_rules! map {
    ($($name:expr => $func:ident: $help:expr),+) => {{
        BuiltinMap {
            name: &[$($name),+],
            help: &[$($help),+],
            functions: &[$($func),+],
        }
    }
}}

/// Builtins are in A-Z order.
const BUILTINS: BuiltinMap = map!(
    "bg" => builtin_bg : "Resumes the stopped foreground process without waiting for it",
    "cd" => builtin_cd : "Change the current directory\n    cd <path>",
    "exit" => builtin_exit : "Exits the current session\n    exit [code]",
    "fg" => builtin_fg : "Resumes the stopped foreground process and waits for it",
    "set" => builtin_set : "Set an environment variable\n    set <NAME=VALUE>",
    "unset" => builtin_unset : "Remove an environment variable\n    unset <NAME>"
);

/// A builtin looked up by name.
#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub help: &'static str,
    pub main: BuiltinFunction,
}

/// The table of builtins, sorted by name.
pub struct BuiltinMap {
    name:      &'static [&'static str],
    help:      &'static [&'static str],
    functions: &'static [BuiltinFunction],
}

impl Default for BuiltinMap {
    fn default() -> Self { BUILTINS }
}

impl BuiltinMap {
    pub fn get(&self, func: &str) -> Option<Builtin> {
        self.name.binary_search(&func).ok().map(|pos| Builtin {
            name: self.name[pos],
            help: self.help[pos],
            main: self.functions[pos],
        })
    }
}

impl Shell {
    /// Runs `command` in the shell process if it names a builtin. `None`
    /// means it does not, and the command has to be launched externally.
    pub(crate) fn exec_builtin(&mut self, command: &Command) -> Option<Status> {
        let builtin = self.builtins().get(&command.program)?;
        log::debug!("running builtin '{}'", command);
        if check_help(command.args()) {
            println!("{}", builtin.help);
            return Some(Status::SUCCESS);
        }
        Some((builtin.main)(&command.argv, self).unwrap_or_else(|why| {
            eprintln!("vush: {}: {}", builtin.name, why);
            Status::FAILURE
        }))
    }
}

fn check_help(args: &[String]) -> bool {
    args.iter().any(|arg| arg == "-h" || arg == "--help")
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(|c: char| c == '=' || c == '\0')
}

fn builtin_cd(args: &[String], _: &mut Shell) -> Result<Status, BuiltinError> {
    let path = args.get(1).ok_or(BuiltinError::MissingArgument("path"))?;
    env::set_current_dir(path)
        .map_err(|source| BuiltinError::Chdir { path: path.into(), source })?;
    Ok(Status::SUCCESS)
}

fn builtin_set(args: &[String], _: &mut Shell) -> Result<Status, BuiltinError> {
    let assignment = args.get(1).ok_or(BuiltinError::MissingArgument("NAME=VALUE"))?;
    let (name, value) = assignment
        .split_once('=')
        .ok_or_else(|| BuiltinError::InvalidAssignment(assignment.clone()))?;
    if !is_valid_name(name) {
        return Err(BuiltinError::InvalidName(name.into()));
    }
    if value.contains('\0') {
        return Err(BuiltinError::InvalidValue(name.into()));
    }
    env::set_var(name, value);
    Ok(Status::SUCCESS)
}

fn builtin_unset(args: &[String], _: &mut Shell) -> Result<Status, BuiltinError> {
    let name = args.get(1).ok_or(BuiltinError::MissingArgument("NAME"))?;
    if !is_valid_name(name) {
        return Err(BuiltinError::InvalidName(name.clone()));
    }
    env::remove_var(name);
    Ok(Status::SUCCESS)
}

/// Outstanding children are left alone.
fn builtin_exit(args: &[String], shell: &mut Shell) -> Result<Status, BuiltinError> {
    let code = match args.get(1) {
        Some(code) => {
            code.parse::<i32>().map_err(|_| BuiltinError::InvalidExitCode(code.clone()))?
        }
        None => shell.previous_status().as_os_code(),
    };
    let _ = io::stdout().flush();
    let _ = io::stderr().flush();
    std::process::exit(code)
}

fn builtin_fg(_: &[String], _: &mut Shell) -> Result<Status, BuiltinError> { fg() }

fn builtin_bg(_: &[String], _: &mut Shell) -> Result<Status, BuiltinError> { bg() }

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn args(args: &[&str]) -> Vec<String> { args.iter().map(|&arg| arg.to_owned()).collect() }

    #[test]
    fn table_is_sorted() {
        let map = BuiltinMap::default();
        let mut names = map.name.to_vec();
        names.sort_unstable();
        assert_eq!(names, map.name);
        for &name in map.name {
            assert_eq!(map.get(name).map(|builtin| builtin.name), Some(name));
        }
        assert!(map.get("ls").is_none());
    }

    #[test]
    #[serial]
    fn help_flag_skips_the_builtin() {
        let before = env::current_dir().unwrap();
        let mut shell = Shell::new();
        let node = crate::tree::Node::command("cd", vec!["--help"]);
        assert_eq!(shell.execute(&node), Status::SUCCESS);
        assert_eq!(env::current_dir().unwrap(), before);

        let node = crate::tree::Node::command("exit", vec!["-h"]);
        assert_eq!(shell.execute(&node), Status::SUCCESS);
    }

    #[test]
    #[serial]
    fn cd_changes_directory() {
        let original = env::current_dir().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let mut shell = Shell::new();

        let status = builtin_cd(&args(&["cd", dir.path().to_str().unwrap()]), &mut shell);
        assert_eq!(status.unwrap(), Status::SUCCESS);
        assert_eq!(
            env::current_dir().unwrap().canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );

        env::set_current_dir(original).unwrap();
    }

    #[test]
    #[serial]
    fn cd_to_missing_directory_fails_and_stays() {
        let before = env::current_dir().unwrap();
        let mut shell = Shell::new();
        let result = builtin_cd(&args(&["cd", "/no/such/directory/anywhere"]), &mut shell);
        assert!(matches!(result, Err(BuiltinError::Chdir { .. })));
        assert_eq!(env::current_dir().unwrap(), before);

        let status = shell.execute(&crate::tree::Node::command("cd", vec!["/no/such/dir"]));
        assert_eq!(status, Status::FAILURE);
    }

    #[test]
    #[serial]
    fn set_and_unset_variables() {
        let mut shell = Shell::new();
        builtin_set(&args(&["set", "VUSH_TEST_VAR=a=b"]), &mut shell).unwrap();
        assert_eq!(env::var("VUSH_TEST_VAR").unwrap(), "a=b");

        builtin_set(&args(&["set", "VUSH_TEST_VAR="]), &mut shell).unwrap();
        assert_eq!(env::var("VUSH_TEST_VAR").unwrap(), "");

        builtin_unset(&args(&["unset", "VUSH_TEST_VAR"]), &mut shell).unwrap();
        assert!(env::var("VUSH_TEST_VAR").is_err());
    }

    #[test]
    #[serial]
    fn missing_arguments_are_errors() {
        let mut shell = Shell::new();
        assert!(matches!(
            builtin_cd(&args(&["cd"]), &mut shell),
            Err(BuiltinError::MissingArgument(_))
        ));
        assert!(matches!(
            builtin_set(&args(&["set"]), &mut shell),
            Err(BuiltinError::MissingArgument(_))
        ));
        assert!(matches!(
            builtin_unset(&args(&["unset"]), &mut shell),
            Err(BuiltinError::MissingArgument(_))
        ));
    }

    #[test]
    #[serial]
    fn malformed_assignments_are_rejected() {
        let mut shell = Shell::new();
        assert!(matches!(
            builtin_set(&args(&["set", "NOEQUALS"]), &mut shell),
            Err(BuiltinError::InvalidAssignment(_))
        ));
        assert!(matches!(
            builtin_set(&args(&["set", "=value"]), &mut shell),
            Err(BuiltinError::InvalidName(_))
        ));
        assert!(matches!(
            builtin_set(&args(&["set", "NAME=a\0b"]), &mut shell),
            Err(BuiltinError::InvalidValue(_))
        ));
        assert!(matches!(
            builtin_unset(&args(&["unset", "A=B"]), &mut shell),
            Err(BuiltinError::InvalidName(_))
        ));
    }

    #[test]
    #[serial]
    fn non_numeric_exit_code_does_not_exit() {
        let mut shell = Shell::new();
        assert!(matches!(
            builtin_exit(&args(&["exit", "soon"]), &mut shell),
            Err(BuiltinError::InvalidExitCode(_))
        ));
    }
}
