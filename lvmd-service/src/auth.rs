// SPDX-License-Identifier: GPL-3.0-only

use std::collections::HashMap;

use zbus::Connection;
use zbus::message::Header as MessageHeader;
use zbus_polkit::policykit1::{AuthorityProxy, CheckAuthorizationFlags, Subject};

use crate::error::ServiceError;

/// Polkit action for inventory queries and device probing
pub const READ_ACTION: &str = "org.lvmd.read";

/// Polkit action for anything that changes LVM metadata or device contents
pub const MODIFY_ACTION: &str = "org.lvmd.modify";

/// Per-call Polkit check, or a no-op when authorization is disabled
#[derive(Debug, Clone, Copy)]
pub struct Authorizer {
    enabled: bool,
}

impl Authorizer {
    pub fn new(enabled: bool) -> Self {
        if !enabled {
            tracing::warn!("Polkit authorization disabled, every caller is trusted");
        }
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Fail unless the sender of `header` is authorized for `action_id`
    pub async fn require(
        &self,
        connection: &Connection,
        header: &MessageHeader<'_>,
        action_id: &str,
    ) -> Result<(), ServiceError> {
        if !self.enabled {
            return Ok(());
        }

        let sender = header
            .sender()
            .ok_or_else(|| ServiceError::AuthorizationFailed("No sender in message header".to_string()))?
            .to_string();

        check_polkit_auth(connection, &sender, action_id).await
    }
}

/// Check Polkit authorization for the caller identified by `sender`
///
/// Whether the caller is prompted is decided by the Polkit policy for the
/// action, not here.
async fn check_polkit_auth(
    connection: &Connection,
    sender: &str,
    action_id: &str,
) -> Result<(), ServiceError> {
    tracing::debug!(
        "Checking authorization for sender={} action={}",
        sender,
        action_id
    );

    let authority = AuthorityProxy::new(connection)
        .await
        .map_err(|e| ServiceError::DBus(format!("Failed to connect to Polkit: {e}")))?;

    let dbus_proxy = zbus::fdo::DBusProxy::new(connection)
        .await
        .map_err(|e| ServiceError::DBus(format!("Failed to connect to D-Bus: {e}")))?;

    let bus_name: zbus::names::BusName = sender
        .try_into()
        .map_err(|e| ServiceError::DBus(format!("Invalid bus name: {e}")))?;

    let pid = dbus_proxy
        .get_connection_unix_process_id(bus_name)
        .await
        .map_err(|e| ServiceError::DBus(format!("Failed to get caller PID: {e}")))?;

    tracing::debug!("Sender {} has PID {}", sender, pid);

    let subject = Subject::new_for_owner(pid, None, None)
        .map_err(|e| ServiceError::AuthorizationFailed(format!("Failed to create subject: {e}")))?;

    let result = authority
        .check_authorization(
            &subject,
            action_id,
            &HashMap::new(),
            CheckAuthorizationFlags::AllowUserInteraction.into(),
            "",
        )
        .await
        .map_err(|e| ServiceError::DBus(format!("Authorization check failed: {e}")))?;

    tracing::debug!(
        "Authorization result for {}: authorized={}, challenged={}",
        action_id,
        result.is_authorized,
        result.is_challenge
    );

    if !result.is_authorized {
        tracing::warn!("Authorization denied for {sender}: {action_id}");
        return Err(ServiceError::AuthorizationFailed(format!(
            "Not authorized for action: {}",
            action_id
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorizer_reports_whether_enabled() {
        let authorizer = Authorizer::new(false);
        assert!(!authorizer.is_enabled());
        assert!(Authorizer::new(true).is_enabled());
    }

    #[test]
    fn actions_are_namespaced() {
        assert!(READ_ACTION.starts_with("org.lvmd."));
        assert!(MODIFY_ACTION.starts_with("org.lvmd."));
        assert_ne!(READ_ACTION, MODIFY_ACTION);
    }
}
