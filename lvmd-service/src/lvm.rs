// SPDX-License-Identifier: GPL-3.0-only

//! LVM D-Bus interface
//!
//! Every method authorizes the caller, then runs the orchestration on a
//! blocking worker so slow tools never stall the bus. Mutating methods
//! return the diagnostic output of the tools they ran; listings are JSON.

use std::sync::Arc;

use lvmd_sys::{CommandRunner, Lvm};
use lvmd_types::{CreateLvRequest, CreateThinLvRequest};
use serde::Serialize;
use zbus::message::Header as MessageHeader;
use zbus::object_server::SignalEmitter;
use zbus::{Connection, fdo, interface};

use crate::auth::{Authorizer, MODIFY_ACTION, READ_ACTION};
use crate::error::{Result, ServiceError};

/// Orchestrator as shared by every request
pub type SharedLvm = Lvm<Arc<dyn CommandRunner>>;

pub const LVM_OBJECT_PATH: &str = "/org/lvmd/LVM";

/// D-Bus interface for LVM management operations
pub struct LvmHandler {
    lvm: Arc<SharedLvm>,
    authorizer: Authorizer,
    lvm_available: bool,
}

impl LvmHandler {
    pub fn new(lvm: SharedLvm, authorizer: Authorizer, lvm_available: bool) -> Self {
        if !lvm_available {
            tracing::warn!("LVM tools not found - LVM operations will be disabled");
        }
        Self {
            lvm: Arc::new(lvm),
            authorizer,
            lvm_available,
        }
    }

    fn require_lvm(&self) -> Result<()> {
        if !cfg!(feature = "lvm-tools") {
            return Err(ServiceError::NotSupported(
                "LVM unavailable: compile-time feature disabled".to_string(),
            ));
        }
        if !self.lvm_available {
            return Err(ServiceError::NotSupported(
                "LVM tools not available on this system".to_string(),
            ));
        }
        Ok(())
    }

    /// Run `operation` on a blocking worker, tagging failures with `action`
    async fn run<T, F>(&self, action: &'static str, operation: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&SharedLvm) -> lvmd_sys::Result<T> + Send + 'static,
    {
        self.require_lvm()?;

        let lvm = Arc::clone(&self.lvm);
        tokio::task::spawn_blocking(move || operation(&lvm))
            .await
            .map_err(|e| ServiceError::WorkerFailed(format!("{action}: {e}")))?
            .map_err(ServiceError::lvm(action))
    }

    async fn authorize(
        &self,
        connection: &Connection,
        header: &MessageHeader<'_>,
        action_id: &str,
    ) -> Result<()> {
        self.authorizer.require(connection, header, action_id).await
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Signals are best effort; the operation already succeeded
fn log_emit(signal: &str, result: zbus::Result<()>) {
    if let Err(e) = result {
        tracing::warn!("Failed to emit {signal}: {e}");
    }
}

#[interface(name = "org.lvmd.LVM1")]
impl LvmHandler {
    /// Signal emitted when a volume group is created
    #[zbus(signal)]
    async fn volume_group_created(emitter: &SignalEmitter<'_>, vg_name: &str) -> zbus::Result<()>;

    /// Signal emitted when a volume group is removed
    #[zbus(signal)]
    async fn volume_group_removed(emitter: &SignalEmitter<'_>, vg_name: &str) -> zbus::Result<()>;

    /// Signal emitted when a logical volume is created
    #[zbus(signal)]
    async fn logical_volume_created(
        emitter: &SignalEmitter<'_>,
        vg_name: &str,
        lv_name: &str,
    ) -> zbus::Result<()>;

    /// Signal emitted when a logical volume is removed
    #[zbus(signal)]
    async fn logical_volume_removed(
        emitter: &SignalEmitter<'_>,
        vg_name: &str,
        lv_name: &str,
    ) -> zbus::Result<()>;

    /// List logical volumes
    ///
    /// `listspec` is a VG name, `vg/lv`, or empty for every volume.
    /// Returns: JSON-serialized Vec<LogicalVolume>
    #[zbus(name = "ListLV")]
    async fn list_lv(
        &self,
        #[zbus(connection)] connection: &Connection,
        #[zbus(header)] header: MessageHeader<'_>,
        listspec: String,
    ) -> fdo::Result<String> {
        self.authorize(connection, &header, READ_ACTION).await?;
        let lvs = self
            .run("list lv", move |lvm| lvm.list_lvs(&listspec))
            .await?;
        Ok(to_json(&lvs)?)
    }

    #[zbus(name = "CreateLV")]
    #[allow(clippy::too_many_arguments)]
    async fn create_lv(
        &self,
        #[zbus(connection)] connection: &Connection,
        #[zbus(header)] header: MessageHeader<'_>,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
        vg: String,
        name: String,
        size: u64,
        mirrors: u32,
        tags: Vec<String>,
    ) -> fdo::Result<String> {
        self.authorize(connection, &header, MODIFY_ACTION).await?;

        let request = CreateLvRequest {
            vg,
            name,
            size,
            mirrors,
            tags,
        };
        let target = request.qualified_name();
        let output = self
            .run("create lv", move |lvm| lvm.create_lv(&request))
            .await?;

        log_emit(
            "LogicalVolumeCreated",
            Self::logical_volume_created(&emitter, &target.group, &target.volume).await,
        );
        Ok(output)
    }

    /// Create a thin pool from all free space of `vg`
    #[zbus(name = "CreateThinPool")]
    async fn create_thin_pool(
        &self,
        #[zbus(connection)] connection: &Connection,
        #[zbus(header)] header: MessageHeader<'_>,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
        vg: String,
        pool: String,
    ) -> fdo::Result<String> {
        self.authorize(connection, &header, MODIFY_ACTION).await?;

        let (vg_name, pool_name) = (vg.clone(), pool.clone());
        let output = self
            .run("create thin pool", move |lvm| lvm.create_thin_pool(&vg, &pool))
            .await?;

        log_emit(
            "LogicalVolumeCreated",
            Self::logical_volume_created(&emitter, &vg_name, &pool_name).await,
        );
        Ok(output)
    }

    #[zbus(name = "CreateThinLV")]
    #[allow(clippy::too_many_arguments)]
    async fn create_thin_lv(
        &self,
        #[zbus(connection)] connection: &Connection,
        #[zbus(header)] header: MessageHeader<'_>,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
        vg: String,
        pool: String,
        name: String,
        size: u64,
        mirrors: u32,
        tags: Vec<String>,
    ) -> fdo::Result<String> {
        self.authorize(connection, &header, MODIFY_ACTION).await?;

        let request = CreateThinLvRequest {
            vg,
            pool,
            name,
            size,
            mirrors,
            tags,
        };
        let target = request.qualified_name();
        let output = self
            .run("create thin lv", move |lvm| lvm.create_thin_lv(&request))
            .await?;

        log_emit(
            "LogicalVolumeCreated",
            Self::logical_volume_created(&emitter, &target.group, &target.volume).await,
        );
        Ok(output)
    }

    /// Activate (`true`) or deactivate a logical volume
    #[zbus(name = "ChangeLV")]
    async fn change_lv(
        &self,
        #[zbus(connection)] connection: &Connection,
        #[zbus(header)] header: MessageHeader<'_>,
        vg: String,
        name: String,
        active: bool,
    ) -> fdo::Result<String> {
        self.authorize(connection, &header, MODIFY_ACTION).await?;
        Ok(self
            .run("change lv", move |lvm| {
                lvm.change_lv_activation(&vg, &name, active)
            })
            .await?)
    }

    /// Remove a logical volume; refused when it carries the `protected` tag
    #[zbus(name = "RemoveLV")]
    async fn remove_lv(
        &self,
        #[zbus(connection)] connection: &Connection,
        #[zbus(header)] header: MessageHeader<'_>,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
        vg: String,
        name: String,
    ) -> fdo::Result<String> {
        self.authorize(connection, &header, MODIFY_ACTION).await?;

        let (vg_name, lv_name) = (vg.clone(), name.clone());
        let output = self
            .run("remove lv", move |lvm| lvm.remove_lv(&vg, &name))
            .await?;

        log_emit(
            "LogicalVolumeRemoved",
            Self::logical_volume_removed(&emitter, &vg_name, &lv_name).await,
        );
        Ok(output)
    }

    /// Copy the contents of one device onto another with `dd`
    #[zbus(name = "CloneLV")]
    async fn clone_lv(
        &self,
        #[zbus(connection)] connection: &Connection,
        #[zbus(header)] header: MessageHeader<'_>,
        source: String,
        dest: String,
    ) -> fdo::Result<String> {
        self.authorize(connection, &header, MODIFY_ACTION).await?;
        Ok(self
            .run("clone lv", move |lvm| lvm.clone_lv(&source, &dest))
            .await?)
    }

    /// Grow a logical volume and the ext filesystem on it
    ///
    /// Returns the outputs of `lvresize`, `e2fsck` and `resize2fs` joined
    /// with `|`.
    #[zbus(name = "ResizeLV")]
    async fn resize_lv(
        &self,
        #[zbus(connection)] connection: &Connection,
        #[zbus(header)] header: MessageHeader<'_>,
        vg: String,
        name: String,
        size: u64,
    ) -> fdo::Result<String> {
        self.authorize(connection, &header, MODIFY_ACTION).await?;
        Ok(self
            .run("resize lv", move |lvm| {
                lvm.resize_lv_and_filesystem(&vg, &name, size)
            })
            .await?)
    }

    /// Returns: JSON-serialized Vec<VolumeGroup>
    #[zbus(name = "ListVG")]
    async fn list_vg(
        &self,
        #[zbus(connection)] connection: &Connection,
        #[zbus(header)] header: MessageHeader<'_>,
    ) -> fdo::Result<String> {
        self.authorize(connection, &header, READ_ACTION).await?;
        let vgs = self.run("list vg", |lvm| lvm.list_vgs()).await?;
        Ok(to_json(&vgs)?)
    }

    #[zbus(name = "CreateVG")]
    async fn create_vg(
        &self,
        #[zbus(connection)] connection: &Connection,
        #[zbus(header)] header: MessageHeader<'_>,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
        name: String,
        pv: String,
        tags: Vec<String>,
    ) -> fdo::Result<String> {
        self.authorize(connection, &header, MODIFY_ACTION).await?;

        let vg_name = name.clone();
        let output = self
            .run("create vg", move |lvm| lvm.create_vg(&name, &pv, &tags))
            .await?;

        log_emit(
            "VolumeGroupCreated",
            Self::volume_group_created(&emitter, &vg_name).await,
        );
        Ok(output)
    }

    #[zbus(name = "ExtendVG")]
    async fn extend_vg(
        &self,
        #[zbus(connection)] connection: &Connection,
        #[zbus(header)] header: MessageHeader<'_>,
        name: String,
        pv: String,
    ) -> fdo::Result<String> {
        self.authorize(connection, &header, MODIFY_ACTION).await?;
        Ok(self
            .run("extend vg", move |lvm| lvm.extend_vg(&name, &pv))
            .await?)
    }

    #[zbus(name = "ReduceVG")]
    async fn reduce_vg(
        &self,
        #[zbus(connection)] connection: &Connection,
        #[zbus(header)] header: MessageHeader<'_>,
        name: String,
        pv: String,
    ) -> fdo::Result<String> {
        self.authorize(connection, &header, MODIFY_ACTION).await?;
        Ok(self
            .run("reduce vg", move |lvm| lvm.reduce_vg(&name, &pv))
            .await?)
    }

    /// Remove a volume group; refused when missing, ambiguous or protected
    #[zbus(name = "RemoveVG")]
    async fn remove_vg(
        &self,
        #[zbus(connection)] connection: &Connection,
        #[zbus(header)] header: MessageHeader<'_>,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
        name: String,
    ) -> fdo::Result<String> {
        self.authorize(connection, &header, MODIFY_ACTION).await?;

        let vg_name = name.clone();
        let output = self
            .run("remove vg", move |lvm| lvm.remove_vg(&name))
            .await?;

        log_emit(
            "VolumeGroupRemoved",
            Self::volume_group_removed(&emitter, &vg_name).await,
        );
        Ok(output)
    }

    #[zbus(name = "AddTagLV")]
    async fn add_tag_lv(
        &self,
        #[zbus(connection)] connection: &Connection,
        #[zbus(header)] header: MessageHeader<'_>,
        vg: String,
        name: String,
        tags: Vec<String>,
    ) -> fdo::Result<String> {
        self.authorize(connection, &header, MODIFY_ACTION).await?;
        Ok(self
            .run("add tags to lv", move |lvm| lvm.add_lv_tags(&vg, &name, &tags))
            .await?)
    }

    #[zbus(name = "RemoveTagLV")]
    async fn remove_tag_lv(
        &self,
        #[zbus(connection)] connection: &Connection,
        #[zbus(header)] header: MessageHeader<'_>,
        vg: String,
        name: String,
        tags: Vec<String>,
    ) -> fdo::Result<String> {
        self.authorize(connection, &header, MODIFY_ACTION).await?;
        Ok(self
            .run("remove tags from lv", move |lvm| {
                lvm.remove_lv_tags(&vg, &name, &tags)
            })
            .await?)
    }

    /// Initialize a block device as a PV without probing it
    #[zbus(name = "CreatePV")]
    async fn create_pv(
        &self,
        #[zbus(connection)] connection: &Connection,
        #[zbus(header)] header: MessageHeader<'_>,
        block: String,
    ) -> fdo::Result<String> {
        self.authorize(connection, &header, MODIFY_ACTION).await?;
        Ok(self
            .run("create pv", move |lvm| lvm.create_pv(&block))
            .await?)
    }

    /// Validate a block device, then initialize it as a PV
    #[zbus(name = "ClaimPV")]
    async fn claim_pv(
        &self,
        #[zbus(connection)] connection: &Connection,
        #[zbus(header)] header: MessageHeader<'_>,
        block: String,
    ) -> fdo::Result<String> {
        self.authorize(connection, &header, MODIFY_ACTION).await?;
        Ok(self
            .run("claim pv", move |lvm| lvm.claim_pv(&block))
            .await?)
    }

    #[zbus(name = "RemovePV")]
    async fn remove_pv(
        &self,
        #[zbus(connection)] connection: &Connection,
        #[zbus(header)] header: MessageHeader<'_>,
        block: String,
    ) -> fdo::Result<String> {
        self.authorize(connection, &header, MODIFY_ACTION).await?;
        Ok(self
            .run("remove pv", move |lvm| lvm.remove_pv(&block))
            .await?)
    }

    /// Returns: JSON-serialized Vec<PhysicalVolume>
    #[zbus(name = "ListPV")]
    async fn list_pv(
        &self,
        #[zbus(connection)] connection: &Connection,
        #[zbus(header)] header: MessageHeader<'_>,
    ) -> fdo::Result<String> {
        self.authorize(connection, &header, READ_ACTION).await?;
        let pvs = self.run("list pv", |lvm| lvm.list_pvs()).await?;
        Ok(to_json(&pvs)?)
    }

    /// Whether a block device is free of partition tables and filesystems
    #[zbus(name = "Validate")]
    async fn validate(
        &self,
        #[zbus(connection)] connection: &Connection,
        #[zbus(header)] header: MessageHeader<'_>,
        block: String,
    ) -> fdo::Result<bool> {
        self.authorize(connection, &header, READ_ACTION).await?;
        Ok(self
            .run("validate block", move |lvm| lvm.validate(&block))
            .await?)
    }

    /// Erase every signature on a block device
    #[zbus(name = "Wipe")]
    async fn wipe(
        &self,
        #[zbus(connection)] connection: &Connection,
        #[zbus(header)] header: MessageHeader<'_>,
        block: String,
    ) -> fdo::Result<String> {
        self.authorize(connection, &header, MODIFY_ACTION).await?;
        Ok(self
            .run("wipe block", move |lvm| lvm.wipe(&block))
            .await?)
    }

    /// Volume group owning the PV on a block device
    #[zbus(name = "Match")]
    async fn match_device(
        &self,
        #[zbus(connection)] connection: &Connection,
        #[zbus(header)] header: MessageHeader<'_>,
        block: String,
    ) -> fdo::Result<String> {
        self.authorize(connection, &header, READ_ACTION).await?;
        Ok(self
            .run("match block", move |lvm| lvm.match_device(&block))
            .await?)
    }

    #[zbus(name = "GetPVNum")]
    async fn get_pv_num(
        &self,
        #[zbus(connection)] connection: &Connection,
        #[zbus(header)] header: MessageHeader<'_>,
        vg: String,
    ) -> fdo::Result<u32> {
        self.authorize(connection, &header, READ_ACTION).await?;
        Ok(self
            .run("get pv count", move |lvm| lvm.pv_count(&vg))
            .await?)
    }
}
