// SPDX-License-Identifier: GPL-3.0-only

//! Bus selection and shared connections
//!
//! lvmd normally owns a name on the system bus; a development instance can
//! run on the session bus under its own name. One connection per bus is
//! established lazily and reused by every client.

use std::sync::OnceLock;

use zbus::Connection;
use zbus::names::BusName;

use super::error::ClientError;

static SYSTEM_CONNECTION: OnceLock<Connection> = OnceLock::new();
static SESSION_CONNECTION: OnceLock<Connection> = OnceLock::new();

/// Message bus the service was started on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Bus {
    #[default]
    System,
    Session,
}

impl Bus {
    fn slot(self) -> &'static OnceLock<Connection> {
        match self {
            Bus::System => &SYSTEM_CONNECTION,
            Bus::Session => &SESSION_CONNECTION,
        }
    }

    async fn open(self) -> zbus::Result<Connection> {
        match self {
            Bus::System => Connection::system().await,
            Bus::Session => Connection::session().await,
        }
    }
}

impl std::fmt::Display for Bus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bus::System => write!(f, "system"),
            Bus::Session => write!(f, "session"),
        }
    }
}

/// Get or create the shared connection to `bus`
pub async fn shared_connection(bus: Bus) -> Result<&'static Connection, ClientError> {
    let slot = bus.slot();
    if let Some(conn) = slot.get() {
        return Ok(conn);
    }

    let conn = bus
        .open()
        .await
        .map_err(|e| ClientError::Connection(format!("Failed to connect to {bus} bus: {e}")))?;

    // A concurrent first use may have won; either connection is fine
    let _ = slot.set(conn);

    slot.get().ok_or_else(|| {
        ClientError::Connection(format!("Failed to initialize shared {bus} bus connection"))
    })
}

/// Validate the bus name the service is expected to own
pub fn service_name(name: &str) -> Result<BusName<'static>, ClientError> {
    BusName::try_from(name.to_string())
        .map_err(|e| ClientError::InvalidArgument(format!("Invalid service name {name:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_bus_is_the_default() {
        assert_eq!(Bus::default(), Bus::System);
        assert_eq!(Bus::Session.to_string(), "session");
    }

    #[test]
    fn each_bus_keeps_its_own_connection() {
        assert!(std::ptr::eq(Bus::System.slot(), &SYSTEM_CONNECTION));
        assert!(std::ptr::eq(Bus::Session.slot(), &SESSION_CONNECTION));
    }

    #[test]
    fn service_names_are_validated_before_connecting() {
        assert_eq!(service_name("org.lvmd.Dev").unwrap().as_str(), "org.lvmd.Dev");
        assert!(matches!(
            service_name("not a bus name"),
            Err(ClientError::InvalidArgument(_))
        ));
    }
}
