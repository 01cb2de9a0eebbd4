// SPDX-License-Identifier: GPL-3.0-only

use lvmd_sys::LvmError;
use thiserror::Error;
use zbus::fdo;

/// Warning noise LVM prints about its metadata cache
const CACHE_NOISE: &str = "/etc/lvm/cache/.cache";

/// Service-specific errors
#[derive(Debug, Error)]
pub enum ServiceError {
    /// An orchestration failure, tagged with what the caller was trying to do
    #[error("failed to {action}: {source}")]
    Lvm {
        action: &'static str,
        #[source]
        source: LvmError,
    },

    #[error("Authorization failed: {0}")]
    AuthorizationFailed(String),

    #[error("D-Bus error: {0}")]
    DBus(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The blocking worker running an operation panicked or was cancelled
    #[error("Worker failed: {0}")]
    WorkerFailed(String),
}

impl ServiceError {
    pub fn lvm(action: &'static str) -> impl FnOnce(LvmError) -> Self {
        move |source| ServiceError::Lvm { action, source }
    }
}

impl From<ServiceError> for fdo::Error {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Lvm { action, source } => lvm_to_fdo(action, &source),
            ServiceError::AuthorizationFailed(msg) => fdo::Error::AccessDenied(msg),
            ServiceError::NotSupported(msg) => fdo::Error::NotSupported(msg),
            _ => fdo::Error::Failed(err.to_string()),
        }
    }
}

impl From<zbus::Error> for ServiceError {
    fn from(err: zbus::Error) -> Self {
        ServiceError::DBus(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::SerializationError(err.to_string())
    }
}

fn lvm_to_fdo(action: &str, source: &LvmError) -> fdo::Error {
    match source {
        LvmError::InvalidArgument(msg) => {
            fdo::Error::InvalidArgs(format!("failed to {action}: {msg}"))
        }
        LvmError::ProtectedResource { .. } => {
            fdo::Error::AccessDenied(format!("failed to {action}: {source}"))
        }
        _ => fdo::Error::Failed(failure_message(action, source)),
    }
}

/// `failed to ACTION: SUMMARY` plus the filtered tool output when there is any
fn failure_message(action: &str, source: &LvmError) -> String {
    let mut message = format!("failed to {action}: {}", summary(source));
    if let LvmError::ResizeStepFailed { completed, .. } = source {
        for done in completed {
            message.push_str(&format!("\n{} output: {}", done.step, streamline(&done.output)));
        }
    }
    if let Some(output) = source.output() {
        message.push_str("\nCommandOutput: ");
        message.push_str(&streamline(output));
    }
    message
}

/// One-line description of an error, leaving its tool output out
fn summary(error: &LvmError) -> String {
    match error {
        LvmError::ToolInvocationFailed {
            program, status, ..
        } => match status {
            Some(code) => format!("{program} exited with status {code}"),
            None => format!("{program} was terminated by a signal"),
        },
        LvmError::UnexpectedOutputShape { program, .. } => {
            format!("unexpected output from {program}")
        }
        LvmError::ValidationIndeterminate { device, source } => {
            format!("could not determine whether {device} is in use: {}", summary(source))
        }
        LvmError::ResizeStepFailed { step, source, .. } => {
            format!("resize stopped at {step}: {}", summary(source))
        }
        other => other.to_string(),
    }
}

/// Drop blank lines and LVM cache noise from tool output
pub fn streamline(output: &str) -> String {
    output
        .lines()
        .filter(|line| !line.is_empty() && !line.contains(CACHE_NOISE))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use lvmd_sys::{ResizeStep, StepOutput};

    use super::*;

    fn failed(program: &str, output: &str) -> LvmError {
        LvmError::ToolInvocationFailed {
            program: program.to_string(),
            status: Some(5),
            output: output.to_string(),
        }
    }

    #[test]
    fn streamline_drops_cache_noise_and_blank_lines() {
        let output = "  WARNING: /etc/lvm/cache/.cache is stale\n\n  Volume group \"vg0\" not found\n";
        assert_eq!(streamline(output), "Volume group \"vg0\" not found");
    }

    #[test]
    fn tool_failure_carries_command_output() {
        let error = ServiceError::Lvm {
            action: "create lv",
            source: failed("lvcreate", "  Insufficient free space\n/etc/lvm/cache/.cache\n"),
        };

        match fdo::Error::from(error) {
            fdo::Error::Failed(message) => assert_eq!(
                message,
                "failed to create lv: lvcreate exited with status 5\nCommandOutput: Insufficient free space"
            ),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn guard_failures_map_to_specific_errors() {
        let protected = ServiceError::Lvm {
            action: "remove vg",
            source: LvmError::ProtectedResource {
                target: "vg0".to_string(),
            },
        };
        assert!(matches!(fdo::Error::from(protected), fdo::Error::AccessDenied(_)));

        let invalid = ServiceError::Lvm {
            action: "create lv",
            source: LvmError::InvalidArgument("size must be greater than 0".to_string()),
        };
        assert!(matches!(fdo::Error::from(invalid), fdo::Error::InvalidArgs(_)));

        let missing = ServiceError::Lvm {
            action: "remove vg",
            source: LvmError::AmbiguousTarget {
                target: "vg9".to_string(),
                found: 0,
            },
        };
        match fdo::Error::from(missing) {
            fdo::Error::Failed(message) => {
                assert_eq!(message, "failed to remove vg: could not find resource to delete: vg9")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn resize_failure_lists_committed_outputs() {
        let error = ServiceError::Lvm {
            action: "resize lv",
            source: LvmError::ResizeStepFailed {
                step: ResizeStep::GrowFilesystem,
                completed: vec![
                    StepOutput {
                        step: ResizeStep::GrowVolume,
                        output: "s1\n".to_string(),
                    },
                    StepOutput {
                        step: ResizeStep::CheckFilesystem,
                        output: "s2".to_string(),
                    },
                ],
                source: Box::new(failed("resize2fs", "bad superblock")),
            },
        };

        let fdo::Error::Failed(message) = fdo::Error::from(error) else {
            panic!("expected a generic failure");
        };
        assert_eq!(
            message,
            "failed to resize lv: resize stopped at resize2fs: resize2fs exited with status 5\n\
             lvresize output: s1\n\
             e2fsck output: s2\n\
             CommandOutput: bad superblock"
        );
    }
}
