// SPDX-License-Identifier: GPL-3.0-only

//! Typed inputs for logical volume creation

use serde::{Deserialize, Serialize};

use crate::lvm::QualifiedName;

/// Request to create a regular (fully allocated) logical volume
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateLvRequest {
    /// Volume group to allocate from
    pub vg: String,

    /// Name of the new logical volume
    pub name: String,

    /// Size in bytes, must be greater than zero
    pub size: u64,

    /// Number of additional mirror copies (0 disables mirroring)
    #[serde(default)]
    pub mirrors: u32,

    /// Tags applied at creation, in order
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CreateLvRequest {
    pub fn qualified_name(&self) -> QualifiedName {
        QualifiedName::new(&self.vg, &self.name)
    }
}

/// Request to create a thin volume inside an existing thin pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateThinLvRequest {
    pub vg: String,

    /// Thin pool inside `vg` that backs the volume
    pub pool: String,

    pub name: String,

    /// Virtual size in bytes, must be greater than zero
    pub size: u64,

    #[serde(default)]
    pub mirrors: u32,

    #[serde(default)]
    pub tags: Vec<String>,
}

impl CreateThinLvRequest {
    pub fn qualified_name(&self) -> QualifiedName {
        QualifiedName::new(&self.vg, &self.name)
    }

    /// `vg/pool` target handed to `lvcreate --thin`
    pub fn pool_path(&self) -> String {
        format!("{}/{}", self.vg, self.pool)
    }
}
