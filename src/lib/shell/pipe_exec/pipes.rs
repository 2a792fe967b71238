use super::{
    super::{fork_exit, ExecError, Shell},
    fork_shell,
    job_control::wait_for_exit,
    streams::redir,
};
use crate::{builtins::Status, tree::Node};
use nix::unistd::{pipe, ForkResult, Pid};
use smallvec::SmallVec;
use std::os::unix::io::{AsRawFd, OwnedFd};

type Pipes = SmallVec<[(OwnedFd, OwnedFd); 16]>;

impl Shell {
    /// Executes a piped job `job1 | job2 | job3`.
    ///
    /// All `N - 1` pipes are created up front, then one process is forked per
    /// stage. Stage `i` reads from pipe `i - 1` and writes to pipe `i`. Every
    /// process closes every pipe end it does not use, so each reader sees
    /// end-of-file once its writer exits. The status is that of the last stage.
    pub(crate) fn exec_pipeline(&mut self, stages: &[Node]) -> Result<Status, ExecError> {
        match stages.len() {
            0 => return Ok(Status::SUCCESS),
            1 => return Ok(self.run(&stages[0])),
            _ => (),
        }

        let mut pipes = Pipes::new();
        for _ in 1..stages.len() {
            pipes.push(pipe().map_err(ExecError::Pipe)?);
        }

        let mut children: SmallVec<[Pid; 16]> = SmallVec::new();
        let mut spawn_error = None;
        for (index, stage) in stages.iter().enumerate() {
            match fork_shell() {
                Ok(ForkResult::Child) => {
                    let status = match connect_stage(&pipes, index, stages.len()) {
                        Ok(()) => {
                            // The stage holds its copies through stdin and stdout now.
                            pipes.clear();
                            self.run(stage)
                        }
                        Err(why) => Status::error(why.to_string()),
                    };
                    fork_exit(status);
                }
                Ok(ForkResult::Parent { child }) => {
                    log::debug!("pipeline stage {} '{}' is {}", index, stage, child);
                    children.push(child);
                }
                Err(why) => {
                    spawn_error = Some(why);
                    break;
                }
            }
        }

        // The shell uses none of the pipe ends.
        drop(pipes);

        let mut status = Status::SUCCESS;
        let mut wait_error = None;
        for &child in &children {
            match wait_for_exit(child) {
                Ok(stage_status) => status = stage_status,
                Err(why) => wait_error = wait_error.or(Some(why)),
            }
        }

        match spawn_error.or(wait_error) {
            Some(why) => Err(why),
            None => Ok(status),
        }
    }
}

/// Points the standard streams of stage `index` at its neighbouring pipes.
fn connect_stage(pipes: &Pipes, index: usize, stages: usize) -> Result<(), ExecError> {
    if index > 0 {
        redir(pipes[index - 1].0.as_raw_fd(), 0)?;
    }
    if index + 1 < stages {
        redir(pipes[index].1.as_raw_fd(), 1)?;
    }
    Ok(())
}
