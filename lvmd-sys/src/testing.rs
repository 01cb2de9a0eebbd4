// SPDX-License-Identifier: GPL-3.0-only

//! Scripted [`CommandRunner`] for exercising lvmd without touching disks
//!
//! Responses are queued per program and consumed in order. A program with
//! nothing queued succeeds with empty output. Every call is recorded so
//! tests can assert on exact argument vectors, or on a tool never running.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::{Mutex, PoisonError};

use crate::runner::{CommandRunner, Invocation};

/// One recorded tool run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub program: String,
    pub args: Vec<String>,
}

impl RecordedCall {
    /// `program arg1 arg2 ...`, handy in assertions
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

enum Scripted {
    Exit(Invocation),
    Missing,
}

#[derive(Default)]
pub struct ScriptedRunner {
    responses: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, program: &str, scripted: Scripted) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(program.to_string())
            .or_default()
            .push_back(scripted);
    }

    /// Queue a successful run of `program` printing `output`
    pub fn succeed(&self, program: &str, output: &str) -> &Self {
        self.exit(program, 0, output)
    }

    /// Queue a run of `program` exiting with `status`
    pub fn exit(&self, program: &str, status: i32, output: &str) -> &Self {
        self.push(
            program,
            Scripted::Exit(Invocation {
                status: Some(status),
                output: output.to_string(),
            }),
        );
        self
    }

    /// Queue a spawn failure, as if `program` were not installed
    pub fn missing(&self, program: &str) -> &Self {
        self.push(program, Scripted::Missing);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether `program` was run at least once
    pub fn ran(&self, program: &str) -> bool {
        self.calls().iter().any(|call| call.program == program)
    }

    /// Command lines of every recorded call, in order
    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(RecordedCall::command_line).collect()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[String]) -> io::Result<Invocation> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                program: program.to_string(),
                args: args.to_vec(),
            });

        let next = self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(program)
            .and_then(VecDeque::pop_front);

        match next {
            Some(Scripted::Exit(invocation)) => Ok(invocation),
            Some(Scripted::Missing) => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{program}: command not found"),
            )),
            None => Ok(Invocation {
                status: Some(0),
                output: String::new(),
            }),
        }
    }
}
