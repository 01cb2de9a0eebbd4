// SPDX-License-Identifier: GPL-3.0-only

use thiserror::Error;

use crate::lvm::resize::{ResizeStep, StepOutput};

/// Error types for LVM orchestration
#[derive(Error, Debug)]
pub enum LvmError {
    /// The tool ran and exited unsuccessfully. `output` is everything it printed.
    #[error("{program} failed ({}): {output}", describe_status(.status))]
    ToolInvocationFailed {
        program: String,
        status: Option<i32>,
        output: String,
    },

    /// The tool could not be started at all.
    #[error("Failed to run {program}: {source}")]
    ToolUnavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed record ({reason}): {line:?}")]
    MalformedRecord { reason: String, line: String },

    #[error("{}", describe_ambiguous(.target, .found))]
    AmbiguousTarget { target: String, found: usize },

    #[error("{target} is protected")]
    ProtectedResource { target: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unexpected output from {program}: {output:?}")]
    UnexpectedOutputShape { program: String, output: String },

    #[error("Could not determine whether {device} is safe to claim: {source}")]
    ValidationIndeterminate {
        device: String,
        #[source]
        source: Box<LvmError>,
    },

    #[error("Resize step {step} failed{}: {source}", describe_completed(.completed))]
    ResizeStepFailed {
        step: ResizeStep,
        /// Steps that already committed before `step` failed
        completed: Vec<StepOutput>,
        #[source]
        source: Box<LvmError>,
    },
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit status {code}"),
        None => "terminated by signal".to_string(),
    }
}

fn describe_ambiguous(target: &str, found: &usize) -> String {
    if *found == 0 {
        format!("could not find resource to delete: {target}")
    } else {
        format!("expected exactly one match for {target}, found {found}")
    }
}

fn describe_completed(completed: &[StepOutput]) -> String {
    if completed.is_empty() {
        return String::new();
    }
    let steps: Vec<String> = completed.iter().map(|done| done.step.to_string()).collect();
    format!(" after {} already committed", steps.join(", "))
}

impl LvmError {
    /// Raw tool output carried by the error, if any.
    ///
    /// For wrapped errors this is the output of the innermost failing tool.
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::ToolInvocationFailed { output, .. }
            | Self::UnexpectedOutputShape { output, .. } => Some(output),
            Self::ValidationIndeterminate { source, .. } | Self::ResizeStepFailed { source, .. } => {
                source.output()
            }
            _ => None,
        }
    }

    /// Whether the error was raised by a guard before anything destructive ran
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::AmbiguousTarget { .. } | Self::ProtectedResource { .. } | Self::InvalidArgument(_)
        )
    }
}

/// Result type alias for LVM operations
pub type Result<T> = std::result::Result<T, LvmError>;
