// SPDX-License-Identifier: GPL-3.0-only

//! Daemon configuration
//!
//! Settings come from an optional TOML file and are then overridden by
//! command-line flags.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_BUS_NAME: &str = "org.lvmd";

#[derive(Debug, Parser)]
#[command(name = "lvmd")]
#[command(about = "D-Bus service managing LVM physical volumes, volume groups and logical volumes")]
#[command(version)]
pub struct Args {
    /// TOML configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Serve on the session bus instead of the system bus
    #[arg(long)]
    pub session: bool,

    /// Well-known bus name to request
    #[arg(long)]
    pub bus_name: Option<String>,

    /// Skip Polkit authorization checks
    #[arg(long)]
    pub no_auth: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    pub bus_name: String,
    pub session_bus: bool,
    pub require_authorization: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bus_name: DEFAULT_BUS_NAME.to_string(),
            session_bus: false,
            require_authorization: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ServiceConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// File settings (or defaults) with command-line flags applied on top
    pub fn resolve(args: &Args) -> Result<Self, ConfigError> {
        let mut config = match &args.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };

        if args.session {
            config.session_bus = true;
        }
        if let Some(bus_name) = &args.bus_name {
            config.bus_name = bus_name.clone();
        }
        if args.no_auth {
            config.require_authorization = false;
        }

        Ok(config)
    }
}
