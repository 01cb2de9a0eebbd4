// SPDX-License-Identifier: GPL-3.0-only

//! Physical volume operations

use lvmd_types::PhysicalVolume;

use super::{Lvm, args, require_name};
use crate::error::{LvmError, Result};
use crate::locks::ResourceKey;
use crate::runner::CommandRunner;

impl<R: CommandRunner> Lvm<R> {
    /// List every physical volume on the host
    pub fn list_pvs(&self) -> Result<Vec<PhysicalVolume>> {
        self.report(None)
    }

    /// Initialize `block` as a physical volume without probing it first
    pub fn create_pv(&self, block: &str) -> Result<String> {
        require_name("block device", block)?;

        let _guard = self.lock(ResourceKey::Device(block.to_string()));
        self.pvcreate(block)
    }

    /// Validate `block` and initialize it as a physical volume if it is unused
    pub fn claim_pv(&self, block: &str) -> Result<String> {
        require_name("block device", block)?;

        let _guard = self.lock(ResourceKey::Device(block.to_string()));
        if !self.validate(block)? {
            return Err(LvmError::InvalidArgument(format!(
                "{block} carries a partition table or filesystem signature"
            )));
        }
        self.pvcreate(block)
    }

    pub fn remove_pv(&self, block: &str) -> Result<String> {
        require_name("block device", block)?;

        let _guard = self.lock(ResourceKey::Device(block.to_string()));
        tracing::info!("Removing physical volume {block}");
        self.invoke("pvremove", args([block, "-y", "-v"]))
    }

    fn pvcreate(&self, block: &str) -> Result<String> {
        tracing::info!("Creating physical volume on {block}");
        let output = self.invoke("pvcreate", args([block, "-y", "-v"]))?;
        tracing::info!("Physical volume {block} created");
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;

    #[test]
    fn create_and_remove_arguments() {
        let runner = ScriptedRunner::new();
        let lvm = Lvm::new(&runner);

        lvm.create_pv("/dev/sdb").unwrap();
        lvm.remove_pv("/dev/sdb").unwrap();

        assert_eq!(
            runner.command_lines(),
            vec!["pvcreate /dev/sdb -y -v", "pvremove /dev/sdb -y -v"]
        );
    }

    #[test]
    fn claim_refuses_formatted_device() {
        let runner = ScriptedRunner::new();
        runner.succeed("udevadm", "DEVNAME=/dev/sdb\nID_FS_TYPE=ext4\n");
        let lvm = Lvm::new(&runner);

        let error = lvm.claim_pv("/dev/sdb").unwrap_err();

        assert!(matches!(error, LvmError::InvalidArgument(_)));
        assert!(!runner.ran("pvcreate"));
    }

    #[test]
    fn claim_creates_on_clean_device() {
        let runner = ScriptedRunner::new();
        runner.succeed("udevadm", "DEVNAME=/dev/sdb\nDEVTYPE=disk\n");
        runner.succeed("blkid", "/dev/sda1: UUID=\"1234\" TYPE=\"ext4\"\n");
        let lvm = Lvm::new(&runner);

        lvm.claim_pv("/dev/sdb").unwrap();

        assert_eq!(runner.command_lines().last().unwrap(), "pvcreate /dev/sdb -y -v");
        assert!(!lvm.locks().is_held(&ResourceKey::Device("/dev/sdb".to_string())));
    }
}
