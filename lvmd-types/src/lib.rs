// SPDX-License-Identifier: GPL-3.0-only

//! Inventory models for lvmd
//!
//! These records describe state owned by LVM itself. They are produced by
//! `lvmd-sys` from tool output, serialized as JSON by `lvmd-service` and
//! decoded again by `lvmd-contracts` on the client side.

pub mod common;
pub mod lvm;
pub mod request;

pub use common::bytes_to_pretty;
pub use lvm::{
    LogicalVolume, PROTECTED_TAG, PhysicalVolume, QualifiedName, Tagged, VolumeGroup,
};
pub use request::{CreateLvRequest, CreateThinLvRequest};
