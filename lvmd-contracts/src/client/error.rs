// SPDX-License-Identifier: GPL-3.0-only

use thiserror::Error;

/// Errors that can occur when calling lvmd via D-Bus
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("D-Bus connection error: {0}")]
    Connection(String),

    #[error("D-Bus method call error: {0}")]
    MethodCall(String),

    #[error("Service not available (is lvmd running?)")]
    ServiceNotAvailable,

    /// Polkit denied the call, or the target carries the `protected` tag
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The service rejected the arguments before running any tool
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    /// A tool failed; the message carries its filtered output
    #[error("Operation failed: {0}")]
    OperationFailed(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl ClientError {
    /// Classify a D-Bus error reply by its error name
    fn from_error_name(name: &str, message: String) -> Self {
        match name.rsplit('.').next().unwrap_or(name) {
            "AccessDenied" | "AuthFailed" => ClientError::PermissionDenied(message),
            "ServiceUnknown" | "NameHasNoOwner" => ClientError::ServiceNotAvailable,
            "InvalidArgs" => ClientError::InvalidArgument(message),
            "NotSupported" => ClientError::NotSupported(message),
            "Failed" => ClientError::OperationFailed(message),
            _ => ClientError::MethodCall(message),
        }
    }
}

impl From<zbus::Error> for ClientError {
    fn from(err: zbus::Error) -> Self {
        match err {
            zbus::Error::MethodError(name, description, _) => {
                let message = description.unwrap_or_else(|| name.to_string());
                ClientError::from_error_name(name.as_str(), message)
            }
            zbus::Error::FDO(fdo_err) => {
                let message = fdo_err.to_string();
                let name = match *fdo_err {
                    zbus::fdo::Error::AccessDenied(_) => "AccessDenied",
                    zbus::fdo::Error::ServiceUnknown(_) => "ServiceUnknown",
                    zbus::fdo::Error::InvalidArgs(_) => "InvalidArgs",
                    zbus::fdo::Error::NotSupported(_) => "NotSupported",
                    zbus::fdo::Error::Failed(_) => "Failed",
                    _ => "",
                };
                ClientError::from_error_name(name, message)
            }
            other => ClientError::Connection(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::ParseError(err.to_string())
    }
}
