// SPDX-License-Identifier: GPL-3.0-only

//! Raw block device probing and cleanup

use super::{Lvm, args, require_name};
use crate::error::{LvmError, Result};
use crate::locks::ResourceKey;
use crate::parser::second_field;
use crate::runner::CommandRunner;

/// udev properties present once a device holds a partition table or filesystem
const UDEV_SIGNATURE_KEYS: [&str; 2] = ["ID_PART_TABLE", "ID_FS_TYPE"];

/// blkid exits with 2 when it found nothing to report
const BLKID_NOTHING_FOUND: i32 = 2;

impl<R: CommandRunner> Lvm<R> {
    /// Whether `block` is free of partition tables and filesystem signatures
    ///
    /// `Ok(false)` means a signature was found. A probe that could not
    /// complete is an error, never a "not safe" answer.
    pub fn validate(&self, block: &str) -> Result<bool> {
        require_name("block device", block)?;

        self.probe_signatures(block)
            .map_err(|source| LvmError::ValidationIndeterminate {
                device: block.to_string(),
                source: Box::new(source),
            })
    }

    fn probe_signatures(&self, block: &str) -> Result<bool> {
        let properties = self.invoke("udevadm", args(["info", "--query=property", block]))?;
        if has_udev_signature(&properties) {
            tracing::info!("{block} is in use according to udev");
            return Ok(false);
        }

        let blkid = self.spawn("blkid", &[])?;
        let listing = match blkid.status {
            Some(0) => blkid.output,
            Some(BLKID_NOTHING_FOUND) if blkid.output.trim().is_empty() => String::new(),
            status => {
                return Err(LvmError::ToolInvocationFailed {
                    program: "blkid".to_string(),
                    status,
                    output: blkid.output,
                });
            }
        };
        if blkid_lists_signature(&listing, block) {
            tracing::info!("{block} carries a signature according to blkid");
            return Ok(false);
        }

        Ok(true)
    }

    /// Erase every signature on `block`
    pub fn wipe(&self, block: &str) -> Result<String> {
        require_name("block device", block)?;

        let _guard = self.lock(ResourceKey::Device(block.to_string()));
        tracing::warn!("Wiping all signatures from {block}");
        self.invoke("wipefs", args(["-af", block]))
    }

    /// Volume group owning the physical volume on `block`
    pub fn match_device(&self, block: &str) -> Result<String> {
        require_name("block device", block)?;

        let output = self.invoke(
            "pvs",
            args(["--noheadings", "--separator=#", "--nosuffix", block]),
        )?;
        second_field("pvs", &output)
    }

    /// Number of physical volumes in `vg`
    pub fn pv_count(&self, vg: &str) -> Result<u32> {
        require_name("volume group", vg)?;

        let output = self.invoke(
            "vgs",
            args(["--noheadings", "--separator=#", "--nosuffix", vg]),
        )?;
        let count = second_field("vgs", &output)?;
        count.parse().map_err(|_| LvmError::UnexpectedOutputShape {
            program: "vgs".to_string(),
            output,
        })
    }
}

fn has_udev_signature(properties: &str) -> bool {
    properties.lines().any(|line| {
        let key = line.split_once('=').map_or(line, |(key, _)| key).trim();
        UDEV_SIGNATURE_KEYS
            .iter()
            .any(|signature| key.starts_with(signature))
    })
}

/// Whether a blkid line for `block`, or one of its partitions, carries a type
fn blkid_lists_signature(listing: &str, block: &str) -> bool {
    listing.lines().any(|line| {
        let Some((device, attributes)) = line.split_once(':') else {
            return false;
        };
        names_device(device.trim(), block) && attributes.contains("TYPE=")
    })
}

/// `device` is `block` itself or a partition of it (`sdb1`, `nvme0n1p2`)
///
/// When `block` ends in a digit only the `p<N>` form names a partition, so
/// `/dev/loop10` is never read as a partition of `/dev/loop1`.
fn names_device(device: &str, block: &str) -> bool {
    let Some(suffix) = device.strip_prefix(block) else {
        return false;
    };
    if suffix.is_empty() {
        return true;
    }
    let digits = if block.ends_with(|c: char| c.is_ascii_digit()) {
        match suffix.strip_prefix('p') {
            Some(digits) => digits,
            None => return false,
        }
    } else {
        suffix.strip_prefix('p').unwrap_or(suffix)
    };
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;

    #[test]
    fn clean_device_is_safe() {
        let runner = ScriptedRunner::new();
        runner.succeed("udevadm", "DEVNAME=/dev/sdb\nDEVTYPE=disk\n");
        runner.succeed("blkid", "/dev/sda1: UUID=\"1234\" TYPE=\"ext4\"\n");
        let lvm = Lvm::new(&runner);

        assert!(lvm.validate("/dev/sdb").unwrap());
        assert_eq!(
            runner.command_lines(),
            vec!["udevadm info --query=property /dev/sdb", "blkid"]
        );
    }

    #[test]
    fn udev_partition_table_is_unsafe() {
        let runner = ScriptedRunner::new();
        runner.succeed("udevadm", "DEVNAME=/dev/sdb\nID_PART_TABLE_TYPE=gpt\n");
        let lvm = Lvm::new(&runner);

        assert!(!lvm.validate("/dev/sdb").unwrap());
        assert!(!runner.ran("blkid"));
    }

    #[test]
    fn blkid_signature_on_partition_is_unsafe() {
        let runner = ScriptedRunner::new();
        runner.succeed("udevadm", "DEVNAME=/dev/sdb\n");
        runner.succeed("blkid", "/dev/sdb1: PARTUUID=\"ab\" TYPE=\"xfs\"\n");
        let lvm = Lvm::new(&runner);

        assert!(!lvm.validate("/dev/sdb").unwrap());
    }

    #[test]
    fn blkid_nothing_found_is_safe() {
        let runner = ScriptedRunner::new();
        runner.succeed("udevadm", "DEVNAME=/dev/sdb\n");
        runner.exit("blkid", 2, "");
        let lvm = Lvm::new(&runner);

        assert!(lvm.validate("/dev/sdb").unwrap());
    }

    #[test]
    fn probe_failure_is_indeterminate() {
        let runner = ScriptedRunner::new();
        runner.exit("udevadm", 4, "Unknown device \"/dev/sdz\"");
        let lvm = Lvm::new(&runner);

        let error = lvm.validate("/dev/sdz").unwrap_err();

        assert!(matches!(error, LvmError::ValidationIndeterminate { .. }));
        assert_eq!(error.output(), Some("Unknown device \"/dev/sdz\""));
    }

    #[test]
    fn partition_names_are_matched_strictly() {
        assert!(names_device("/dev/sdb", "/dev/sdb"));
        assert!(names_device("/dev/sdb2", "/dev/sdb"));
        assert!(names_device("/dev/nvme0n1p2", "/dev/nvme0n1"));
        assert!(!names_device("/dev/sdbb", "/dev/sdb"));
        assert!(!names_device("/dev/sda", "/dev/sdb"));
        assert!(!names_device("/dev/sdbp", "/dev/sdb"));
        assert!(!names_device("/dev/loop10", "/dev/loop1"));
        assert!(names_device("/dev/loop1p1", "/dev/loop1"));
        assert!(!names_device("/dev/md12", "/dev/md1"));
        assert!(!names_device("/dev/nvme0n10", "/dev/nvme0n1"));
    }

    #[test]
    fn match_and_pv_count_read_second_field() {
        let runner = ScriptedRunner::new();
        runner.succeed("pvs", "  /dev/sdb#vg0#lvm2#a--#1000#600\n");
        runner.succeed("vgs", "  vg0#3#2#0#wz--n-#3000#1000\n");
        let lvm = Lvm::new(&runner);

        assert_eq!(lvm.match_device("/dev/sdb").unwrap(), "vg0");
        assert_eq!(lvm.pv_count("vg0").unwrap(), 3);
        assert_eq!(
            runner.command_lines(),
            vec![
                "pvs --noheadings --separator=# --nosuffix /dev/sdb",
                "vgs --noheadings --separator=# --nosuffix vg0",
            ]
        );
    }

    #[test]
    fn pv_count_rejects_non_numeric_field() {
        let runner = ScriptedRunner::new();
        runner.succeed("vgs", "vg0#many\n");
        let lvm = Lvm::new(&runner);

        let error = lvm.pv_count("vg0").unwrap_err();
        assert!(matches!(error, LvmError::UnexpectedOutputShape { .. }));
    }

    #[test]
    fn wipe_arguments() {
        let runner = ScriptedRunner::new();
        let lvm = Lvm::new(&runner);

        lvm.wipe("/dev/sdb").unwrap();
        assert_eq!(runner.command_lines(), vec!["wipefs -af /dev/sdb"]);
    }
}
