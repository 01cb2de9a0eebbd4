// SPDX-License-Identifier: GPL-3.0-only

//! Volume group operations

use lvmd_types::VolumeGroup;

use super::{Lvm, args, push_tags, require_name, require_tags};
use crate::error::Result;
use crate::guard;
use crate::locks::ResourceKey;
use crate::runner::CommandRunner;

impl<R: CommandRunner> Lvm<R> {
    /// List every volume group on the host
    pub fn list_vgs(&self) -> Result<Vec<VolumeGroup>> {
        self.report(None)
    }

    /// Create a volume group on a single physical volume
    pub fn create_vg(&self, name: &str, pv: &str, tags: &[String]) -> Result<String> {
        require_name("volume group", name)?;
        require_name("physical volume", pv)?;
        require_tags(tags)?;

        let _guard = self.lock(ResourceKey::VolumeGroup(name.to_string()));

        tracing::info!("Creating volume group {name} on {pv}");
        let mut create = args([name, pv, "-v"]);
        push_tags(&mut create, "--add-tag", tags);

        let output = self.invoke("vgcreate", create)?;
        tracing::info!("Volume group {name} created");
        Ok(output)
    }

    pub fn extend_vg(&self, name: &str, pv: &str) -> Result<String> {
        require_name("volume group", name)?;
        require_name("physical volume", pv)?;

        let _guard = self.lock(ResourceKey::VolumeGroup(name.to_string()));
        tracing::info!("Extending volume group {name} with {pv}");
        self.invoke("vgextend", args([name, pv]))
    }

    pub fn reduce_vg(&self, name: &str, pv: &str) -> Result<String> {
        require_name("volume group", name)?;
        require_name("physical volume", pv)?;

        let _guard = self.lock(ResourceKey::VolumeGroup(name.to_string()));
        tracing::info!("Removing {pv} from volume group {name}");
        self.invoke("vgreduce", args([name, pv]))
    }

    /// Remove a volume group unless it is missing, ambiguous or protected
    ///
    /// The lookup goes through the full listing rather than a `vgs` selector,
    /// so a missing group is reported as such instead of as a tool failure.
    pub fn remove_vg(&self, name: &str) -> Result<String> {
        require_name("volume group", name)?;

        let _guard = self.lock(ResourceKey::VolumeGroup(name.to_string()));

        let matches: Vec<VolumeGroup> = self
            .list_vgs()?
            .into_iter()
            .filter(|vg| vg.name == name)
            .collect();
        guard::ensure_removable(name, matches)?;

        tracing::info!("Removing volume group {name}");
        let output = self.invoke("vgremove", args(["-v", "-f", name]))?;
        tracing::info!("Volume group {name} removed");
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LvmError;
    use crate::testing::ScriptedRunner;

    fn vg_line(name: &str, tags: &str) -> String {
        format!(
            "  LVM2_VG_NAME='{name}'<:SEP:>LVM2_VG_SIZE='1000'<:SEP:>LVM2_VG_FREE='500'<:SEP:>LVM2_VG_UUID='{name}-id'<:SEP:>LVM2_VG_TAGS='{tags}'"
        )
    }

    #[test]
    fn create_places_tags_after_verbose_flag() {
        let runner = ScriptedRunner::new();
        let lvm = Lvm::new(&runner);

        lvm.create_vg("vg0", "/dev/sdb", &["k8s".to_string()]).unwrap();
        lvm.extend_vg("vg0", "/dev/sdc").unwrap();
        lvm.reduce_vg("vg0", "/dev/sdc").unwrap();

        assert_eq!(
            runner.command_lines(),
            vec![
                "vgcreate vg0 /dev/sdb -v --add-tag k8s",
                "vgextend vg0 /dev/sdc",
                "vgreduce vg0 /dev/sdc",
            ]
        );
    }

    #[test]
    fn removes_matching_group() {
        let runner = ScriptedRunner::new();
        runner.succeed("vgs", &format!("{}\n{}", vg_line("vg0", ""), vg_line("vg1", "")));
        let lvm = Lvm::new(&runner);

        lvm.remove_vg("vg1").unwrap();

        let lines = runner.command_lines();
        assert!(lines[0].ends_with("--nameprefixes -a"));
        assert_eq!(lines[1], "vgremove -v -f vg1");
    }

    #[test]
    fn missing_group_is_not_removed() {
        let runner = ScriptedRunner::new();
        runner.succeed("vgs", &vg_line("vg0", ""));
        let lvm = Lvm::new(&runner);

        let error = lvm.remove_vg("vg9").unwrap_err();

        assert!(error.to_string().contains("could not find resource to delete"));
        assert!(!runner.ran("vgremove"));
    }

    #[test]
    fn protected_group_is_not_removed() {
        let runner = ScriptedRunner::new();
        runner.succeed("vgs", &vg_line("vg0", "protected"));
        let lvm = Lvm::new(&runner);

        let error = lvm.remove_vg("vg0").unwrap_err();

        assert!(matches!(error, LvmError::ProtectedResource { .. }));
        assert!(!runner.ran("vgremove"));
    }
}
