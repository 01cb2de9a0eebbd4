// SPDX-License-Identifier: GPL-3.0-only

//! Logical volume operations

use lvmd_types::{
    CreateLvRequest, CreateThinLvRequest, LogicalVolume, QualifiedName, bytes_to_pretty,
};

use super::{Lvm, args, push_tags, require_name, require_size, require_tags, size_arg};
use crate::error::{LvmError, Result};
use crate::guard;
use crate::locks::ResourceKey;
use crate::runner::CommandRunner;

impl<R: CommandRunner> Lvm<R> {
    /// List logical volumes matching `listspec` (a VG name, `vg/lv`, or empty for all)
    pub fn list_lvs(&self, listspec: &str) -> Result<Vec<LogicalVolume>> {
        tracing::debug!("Listing logical volumes for {listspec:?}");
        self.report(Some(listspec))
    }

    /// Create a fully allocated logical volume
    pub fn create_lv(&self, request: &CreateLvRequest) -> Result<String> {
        require_name("volume group", &request.vg)?;
        require_name("logical volume", &request.name)?;
        require_size(request.size)?;
        require_tags(&request.tags)?;

        let target = request.qualified_name();
        let _guard = self.lock(ResourceKey::LogicalVolume(target.clone()));

        tracing::info!(
            "Creating logical volume {target} of {}",
            bytes_to_pretty(request.size, true)
        );

        let mut create = args(["-v", "-n", request.name.as_str(), "-L"]);
        create.push(size_arg(request.size));
        push_mirrors(&mut create, request.mirrors);
        push_tags(&mut create, "--add-tag", &request.tags);
        create.push(request.vg.clone());

        let output = self.invoke("lvcreate", create)?;
        tracing::info!("Logical volume {target} created");
        Ok(output)
    }

    /// Create a thin volume inside an existing thin pool
    pub fn create_thin_lv(&self, request: &CreateThinLvRequest) -> Result<String> {
        require_name("volume group", &request.vg)?;
        require_name("thin pool", &request.pool)?;
        require_name("logical volume", &request.name)?;
        require_size(request.size)?;
        require_tags(&request.tags)?;

        let target = request.qualified_name();
        let _guard = self.lock(ResourceKey::LogicalVolume(target.clone()));

        tracing::info!(
            "Creating thin volume {target} in pool {} with virtual size {}",
            request.pool_path(),
            bytes_to_pretty(request.size, true)
        );

        let mut create = args(["--thin", "-v", "-n", request.name.as_str(), "-V"]);
        create.push(size_arg(request.size));
        push_mirrors(&mut create, request.mirrors);
        push_tags(&mut create, "--add-tag", &request.tags);
        create.push(request.pool_path());

        let output = self.invoke("lvcreate", create)?;
        tracing::info!("Thin volume {target} created");
        Ok(output)
    }

    /// Create a thin pool taking all free space of `vg`
    pub fn create_thin_pool(&self, vg: &str, pool: &str) -> Result<String> {
        require_name("volume group", vg)?;
        require_name("thin pool", pool)?;

        let target = QualifiedName::new(vg, pool);
        let _guard = self.lock(ResourceKey::LogicalVolume(target.clone()));

        tracing::info!("Creating thin pool {target} from all free space");
        let output = self.invoke(
            "lvcreate",
            args(["-v", "-l", "100%FREE", "--thinpool", pool, vg, "-y"]),
        )?;
        tracing::info!("Thin pool {target} created");
        Ok(output)
    }

    /// Remove a logical volume unless it is protected
    pub fn remove_lv(&self, vg: &str, name: &str) -> Result<String> {
        require_name("volume group", vg)?;
        require_name("logical volume", name)?;

        let target = QualifiedName::new(vg, name);
        let _guard = self.lock(ResourceKey::LogicalVolume(target.clone()));

        let matches = self.list_lvs(&target.to_string())?;
        guard::ensure_removable(&target.to_string(), matches)?;

        tracing::info!("Removing logical volume {target}");
        let output = self.invoke(
            "lvremove",
            args(["-v".to_string(), "-f".to_string(), target.to_string()]),
        )?;
        tracing::info!("Logical volume {target} removed");
        Ok(output)
    }

    /// Attach tags to a logical volume
    pub fn add_lv_tags(&self, vg: &str, name: &str, tags: &[String]) -> Result<String> {
        self.change_lv_tags(vg, name, "--addtag", tags)
    }

    /// Detach tags from a logical volume
    pub fn remove_lv_tags(&self, vg: &str, name: &str, tags: &[String]) -> Result<String> {
        self.change_lv_tags(vg, name, "--deltag", tags)
    }

    fn change_lv_tags(&self, vg: &str, name: &str, flag: &str, tags: &[String]) -> Result<String> {
        require_name("volume group", vg)?;
        require_name("logical volume", name)?;
        if tags.is_empty() {
            return Err(LvmError::InvalidArgument(
                "at least one tag is required".to_string(),
            ));
        }
        require_tags(tags)?;

        let target = QualifiedName::new(vg, name);
        let _guard = self.lock(ResourceKey::LogicalVolume(target.clone()));
        self.require_single_lv(&target)?;

        tracing::info!("Changing tags of {target}: {flag} {tags:?}");
        let mut change = Vec::with_capacity(tags.len() * 2 + 1);
        push_tags(&mut change, flag, tags);
        change.push(target.to_string());
        self.invoke("lvchange", change)
    }

    /// Activate or deactivate a logical volume
    pub fn change_lv_activation(&self, vg: &str, name: &str, active: bool) -> Result<String> {
        require_name("volume group", vg)?;
        require_name("logical volume", name)?;

        let target = QualifiedName::new(vg, name);
        let _guard = self.lock(ResourceKey::LogicalVolume(target.clone()));

        let state = if active { "y" } else { "n" };
        tracing::info!("Setting activation of {target} to {state}");
        self.invoke(
            "lvchange",
            args(["-a".to_string(), state.to_string(), target.to_string()]),
        )
    }

    /// Copy the raw bytes of `source` onto `dest`
    pub fn clone_lv(&self, source: &str, dest: &str) -> Result<String> {
        require_name("clone source", source)?;
        require_name("clone destination", dest)?;
        if source == dest {
            return Err(LvmError::InvalidArgument(format!(
                "clone source and destination are the same: {source}"
            )));
        }

        let _guard = self.lock(ResourceKey::Device(dest.to_string()));

        tracing::info!("Cloning {source} to {dest}");
        let output = self.invoke(
            "dd",
            args([format!("if={source}"), format!("of={dest}"), "bs=4M".to_string()]),
        )?;
        tracing::info!("Cloned {source} to {dest}");
        Ok(output)
    }

    fn require_single_lv(&self, target: &QualifiedName) -> Result<LogicalVolume> {
        let mut matches = self.list_lvs(&target.to_string())?;
        if matches.len() != 1 {
            return Err(LvmError::AmbiguousTarget {
                target: target.to_string(),
                found: matches.len(),
            });
        }
        Ok(matches.remove(0))
    }
}

fn push_mirrors(args: &mut Vec<String>, mirrors: u32) {
    if mirrors > 0 {
        args.push("-m".to_string());
        args.push(mirrors.to_string());
        // The new mirror starts out of sync instead of blocking on a full copy
        args.push("--nosync".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::FIELD_SEPARATOR;
    use crate::testing::ScriptedRunner;

    fn lv_report(name: &str, tags: &str) -> String {
        [
            format!("LVM2_LV_NAME='{name}'"),
            "LVM2_LV_SIZE='1073741824'".to_string(),
            "LVM2_LV_UUID='abc-123'".to_string(),
            "LVM2_LV_ATTR='-wi-a-----'".to_string(),
            "LVM2_COPY_PERCENT=''".to_string(),
            "LVM2_LV_KERNEL_MAJOR='253'".to_string(),
            "LVM2_LV_KERNEL_MINOR='0'".to_string(),
            format!("LVM2_LV_TAGS='{tags}'"),
        ]
        .join(FIELD_SEPARATOR)
    }

    fn request(size: u64, mirrors: u32, tags: &[&str]) -> CreateLvRequest {
        CreateLvRequest {
            vg: "vg0".to_string(),
            name: "data".to_string(),
            size,
            mirrors,
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
        }
    }

    #[test]
    fn create_builds_exact_arguments() {
        let runner = ScriptedRunner::new();
        let lvm = Lvm::new(&runner);

        lvm.create_lv(&request(1024, 0, &["b", "a"])).unwrap();

        assert_eq!(
            runner.command_lines(),
            vec!["lvcreate -v -n data -L 1024b --add-tag b --add-tag a vg0"]
        );
    }

    #[test]
    fn create_with_mirrors_skips_initial_sync() {
        let runner = ScriptedRunner::new();
        let lvm = Lvm::new(&runner);

        lvm.create_lv(&request(4096, 2, &[])).unwrap();

        assert_eq!(
            runner.command_lines(),
            vec!["lvcreate -v -n data -L 4096b -m 2 --nosync vg0"]
        );
    }

    #[test]
    fn zero_size_is_rejected_before_running_anything() {
        let runner = ScriptedRunner::new();
        let lvm = Lvm::new(&runner);

        let error = lvm.create_lv(&request(0, 0, &[])).unwrap_err();
        assert!(matches!(error, LvmError::InvalidArgument(_)));

        let thin = CreateThinLvRequest {
            vg: "vg0".to_string(),
            pool: "pool0".to_string(),
            name: "thin".to_string(),
            size: 0,
            mirrors: 0,
            tags: vec![],
        };
        assert!(matches!(
            lvm.create_thin_lv(&thin).unwrap_err(),
            LvmError::InvalidArgument(_)
        ));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn thin_volume_targets_pool() {
        let runner = ScriptedRunner::new();
        let lvm = Lvm::new(&runner);

        lvm.create_thin_lv(&CreateThinLvRequest {
            vg: "vg0".to_string(),
            pool: "pool0".to_string(),
            name: "thin".to_string(),
            size: 2048,
            mirrors: 0,
            tags: vec!["k8s".to_string()],
        })
        .unwrap();
        lvm.create_thin_pool("vg0", "pool0").unwrap();

        assert_eq!(
            runner.command_lines(),
            vec![
                "lvcreate --thin -v -n thin -V 2048b --add-tag k8s vg0/pool0",
                "lvcreate -v -l 100%FREE --thinpool pool0 vg0 -y",
            ]
        );
    }

    #[test]
    fn removes_unprotected_volume() {
        let runner = ScriptedRunner::new();
        runner.succeed("lvs", &lv_report("data", "a,b"));
        runner.succeed("lvremove", "Logical volume \"data\" successfully removed");
        let lvm = Lvm::new(&runner);

        let output = lvm.remove_lv("vg0", "data").unwrap();

        assert_eq!(output, "Logical volume \"data\" successfully removed");
        let lines = runner.command_lines();
        assert!(lines[0].starts_with("lvs --units=b"));
        assert!(lines[0].ends_with(" vg0/data"));
        assert_eq!(lines[1], "lvremove -v -f vg0/data");
    }

    #[test]
    fn protected_volume_is_never_removed() {
        let runner = ScriptedRunner::new();
        runner.succeed("lvs", &lv_report("data", "protected"));
        let lvm = Lvm::new(&runner);

        let error = lvm.remove_lv("vg0", "data").unwrap_err();

        assert!(matches!(error, LvmError::ProtectedResource { .. }));
        assert!(!runner.ran("lvremove"));
    }

    #[test]
    fn ambiguous_lookup_blocks_removal() {
        let runner = ScriptedRunner::new();
        let report = format!("{}\n{}", lv_report("data", ""), lv_report("data", ""));
        runner.succeed("lvs", &report);
        let lvm = Lvm::new(&runner);

        let error = lvm.remove_lv("vg0", "data").unwrap_err();

        assert!(matches!(error, LvmError::AmbiguousTarget { found: 2, .. }));
        assert!(!runner.ran("lvremove"));
    }

    #[test]
    fn tag_changes_keep_caller_order() {
        let runner = ScriptedRunner::new();
        runner.succeed("lvs", &lv_report("data", ""));
        runner.succeed("lvs", &lv_report("data", "z,a"));
        let lvm = Lvm::new(&runner);

        lvm.add_lv_tags("vg0", "data", &["z".to_string(), "a".to_string()])
            .unwrap();
        lvm.remove_lv_tags("vg0", "data", &["a".to_string()]).unwrap();

        let lines = runner.command_lines();
        assert_eq!(lines[1], "lvchange --addtag z --addtag a vg0/data");
        assert_eq!(lines[3], "lvchange --deltag a vg0/data");
    }

    #[test]
    fn tag_change_requires_existing_volume() {
        let runner = ScriptedRunner::new();
        runner.succeed("lvs", "");
        let lvm = Lvm::new(&runner);

        let error = lvm
            .add_lv_tags("vg0", "ghost", &["x".to_string()])
            .unwrap_err();

        assert!(matches!(error, LvmError::AmbiguousTarget { found: 0, .. }));
        assert!(!runner.ran("lvchange"));
        assert!(lvm.add_lv_tags("vg0", "data", &[]).is_err());
    }

    #[test]
    fn activation_and_clone_arguments() {
        let runner = ScriptedRunner::new();
        let lvm = Lvm::new(&runner);

        lvm.change_lv_activation("vg0", "data", false).unwrap();
        lvm.clone_lv("/dev/vg0/data", "/dev/vg0/copy").unwrap();

        assert_eq!(
            runner.command_lines(),
            vec![
                "lvchange -a n vg0/data",
                "dd if=/dev/vg0/data of=/dev/vg0/copy bs=4M",
            ]
        );
        assert!(lvm.clone_lv("/dev/vg0/data", "/dev/vg0/data").is_err());
    }
}
