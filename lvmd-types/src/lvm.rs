// SPDX-License-Identifier: GPL-3.0-only

//! LVM (Logical Volume Manager) inventory records
//!
//! Types for volume groups, logical volumes and physical volumes as
//! reported by `vgs`, `lvs` and `pvs`.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Tag that blocks removal of the logical volume or volume group carrying it.
pub const PROTECTED_TAG: &str = "protected";

/// Something that carries an LVM tag set.
///
/// Logical volumes and volume groups share the protected-tag rule, so the
/// removal guard is written once against this trait.
pub trait Tagged {
    /// Name of the record as LVM reports it
    ///
    /// Logical volume records do not carry their group, so this is the bare
    /// volume name. Messages about a removal target use the qualified
    /// `group/volume` the caller looked up.
    fn display_name(&self) -> &str;

    /// Tags attached to the resource
    fn tags(&self) -> &BTreeSet<String>;

    /// Whether the resource carries [`PROTECTED_TAG`]
    fn is_protected(&self) -> bool {
        self.tags().contains(PROTECTED_TAG)
    }
}

/// A logical volume addressed as `group/volume`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    pub group: String,
    pub volume: String,
}

impl QualifiedName {
    pub fn new(group: impl Into<String>, volume: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            volume: volume.into(),
        }
    }

    /// Device node created by LVM for the volume, e.g. `/dev/vg0/lv0`
    pub fn device_path(&self) -> String {
        format!("/dev/{}/{}", self.group, self.volume)
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group, self.volume)
    }
}

/// Logical volume information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalVolume {
    /// Logical volume name, unique within its volume group
    pub name: String,

    /// Size in bytes
    pub size: u64,

    /// Logical volume UUID
    pub uuid: String,

    /// Attribute string (`lv_attr`), e.g. `-wi-a-----`
    pub attr: String,

    /// Mirror/RAID synchronization progress, if the volume reports one
    pub copy_percent: Option<f64>,

    /// Kernel device major number (None while inactive)
    pub kernel_major: Option<u32>,

    /// Kernel device minor number (None while inactive)
    pub kernel_minor: Option<u32>,

    pub tags: BTreeSet<String>,
}

impl LogicalVolume {
    fn attr_char(&self, index: usize) -> Option<char> {
        self.attr.chars().nth(index)
    }

    /// Whether the volume is active (fifth attribute character is `a`)
    pub fn is_active(&self) -> bool {
        self.attr_char(4) == Some('a')
    }

    /// Whether the volume is a thin volume backed by a pool
    pub fn is_thin_volume(&self) -> bool {
        self.attr_char(0) == Some('V')
    }

    /// Whether the volume is itself a thin pool
    pub fn is_thin_pool(&self) -> bool {
        self.attr_char(0) == Some('t')
    }

    /// Kernel `major:minor` pair, when the volume has one
    pub fn device_number(&self) -> Option<(u32, u32)> {
        Some((self.kernel_major?, self.kernel_minor?))
    }
}

impl Tagged for LogicalVolume {
    fn display_name(&self) -> &str {
        &self.name
    }

    fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }
}

/// Volume group information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeGroup {
    /// Volume group name
    pub name: String,

    /// Total size in bytes
    pub size: u64,

    /// Free space in bytes
    pub free: u64,

    /// Volume group UUID
    pub uuid: String,

    pub tags: BTreeSet<String>,
}

impl VolumeGroup {
    /// Get used space in bytes
    pub fn used(&self) -> u64 {
        self.size.saturating_sub(self.free)
    }

    /// Get usage percentage (0-100)
    pub fn usage_percent(&self) -> u32 {
        if self.size == 0 {
            0
        } else {
            ((self.used() as f64 / self.size as f64) * 100.0) as u32
        }
    }
}

impl Tagged for VolumeGroup {
    fn display_name(&self) -> &str {
        &self.name
    }

    fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }
}

/// Physical volume information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalVolume {
    /// Device path (e.g., "/dev/sda1")
    pub name: String,

    /// Total size in bytes
    pub size: u64,

    /// Allocated space in bytes
    pub used: u64,

    /// Free space in bytes
    pub free: u64,

    /// Metadata format, normally `lvm2`
    pub format: String,

    /// Physical volume UUID
    pub uuid: String,
}
