// SPDX-License-Identifier: GPL-3.0-only

//! D-Bus client wrappers for lvmd operations

pub mod connection;
pub mod error;
pub mod lvm;

pub use connection::Bus;
pub use error::ClientError;
pub use lvm::{LvmClient, LvmInterfaceProxy};
