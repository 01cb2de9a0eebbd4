// SPDX-License-Identifier: GPL-3.0-only

//! Client-side contract of the lvmd D-Bus service

pub mod client;

pub use client::{Bus, ClientError, LvmClient};

/// Well-known bus name the service requests by default
pub const SERVICE_NAME: &str = "org.lvmd";

/// Object path of the LVM interface
pub const LVM_PATH: &str = "/org/lvmd/LVM";
