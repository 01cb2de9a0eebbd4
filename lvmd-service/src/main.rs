// SPDX-License-Identifier: GPL-3.0-only

//! lvmd - D-Bus service for LVM volume management
//!
//! Exposes physical volume, volume group and logical volume operations on
//! the bus, with Polkit-based authorization.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use lvmd_sys::{CommandRunner, Lvm, SystemRunner, lvm_tools_available};
use tracing_subscriber::{EnvFilter, fmt};
use zbus::connection::Builder as ConnectionBuilder;

mod auth;
mod config;
mod error;
mod lvm;
mod service;

use auth::Authorizer;
use config::{Args, ServiceConfig};
use lvm::{LVM_OBJECT_PATH, LvmHandler};
use service::{LvmdService, SERVICE_OBJECT_PATH};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("lvmd_service=info,lvmd_sys=info,warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting lvmd v{}", env!("CARGO_PKG_VERSION"));

    let config = ServiceConfig::resolve(&args)?;
    tracing::debug!("Effective configuration: {config:?}");

    // Only the session bus may be used unprivileged, for development
    if !config.session_bus && unsafe { libc::geteuid() } != 0 {
        tracing::error!("lvmd must run as root on the system bus");
        anyhow::bail!("Service must run with root privileges");
    }

    let lvm_available = lvm_tools_available();
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
    let authorizer = Authorizer::new(config.require_authorization);

    let builder = if config.session_bus {
        ConnectionBuilder::session()?
    } else {
        ConnectionBuilder::system()?
    };

    let _connection = builder
        .name(config.bus_name.as_str())?
        .serve_at(
            SERVICE_OBJECT_PATH,
            LvmdService::new(authorizer.is_enabled(), lvm_available),
        )?
        .serve_at(
            LVM_OBJECT_PATH,
            LvmHandler::new(Lvm::new(runner), authorizer, lvm_available),
        )?
        .build()
        .await?;

    tracing::info!(
        "Service registered on D-Bus {} bus as {}",
        if config.session_bus { "session" } else { "system" },
        config.bus_name
    );
    tracing::info!("  - org.lvmd.Service at {SERVICE_OBJECT_PATH}");
    tracing::info!("  - org.lvmd.LVM1 at {LVM_OBJECT_PATH}");

    tracing::info!("Service ready, waiting for requests...");
    tokio::signal::ctrl_c().await?;
    tracing::info!("Received shutdown signal");

    tracing::info!("lvmd shutting down");
    Ok(())
}
