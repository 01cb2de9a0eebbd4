// SPDX-License-Identifier: GPL-3.0-only

//! Process execution seam
//!
//! Every external tool lvmd touches is spawned through [`CommandRunner`].
//! Arguments always travel as a vector straight to `execve`, never through
//! a shell, so names, paths and tags cannot smuggle in extra commands.

use std::io;

/// Outcome of one external tool run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Exit code, `None` when the process was killed by a signal
    pub status: Option<i32>,

    /// Combined standard output and standard error
    pub output: String,
}

impl Invocation {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Spawns external tools and captures what they print
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` to completion.
    ///
    /// A non-zero exit is not an `Err`; only failing to start the process is.
    fn run(&self, program: &str, args: &[String]) -> io::Result<Invocation>;
}

/// Runs tools on the host
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> io::Result<Invocation> {
        tracing::debug!("Running {program} {args:?}");

        let output = duct::cmd(program, args)
            .stderr_to_stdout()
            .stdout_capture()
            .unchecked()
            .run()?;

        let invocation = Invocation {
            status: output.status.code(),
            output: String::from_utf8_lossy(&output.stdout).to_string(),
        };

        tracing::debug!("{program} exited with {:?}", invocation.status);
        Ok(invocation)
    }
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, program: &str, args: &[String]) -> io::Result<Invocation> {
        (**self).run(program, args)
    }
}

impl<R: CommandRunner + ?Sized> CommandRunner for std::sync::Arc<R> {
    fn run(&self, program: &str, args: &[String]) -> io::Result<Invocation> {
        (**self).run(program, args)
    }
}
