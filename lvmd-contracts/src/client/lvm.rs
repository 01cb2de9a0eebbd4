// SPDX-License-Identifier: GPL-3.0-only

use lvmd_types::{
    CreateLvRequest, CreateThinLvRequest, LogicalVolume, PhysicalVolume, VolumeGroup,
};
use serde::de::DeserializeOwned;
use zbus::proxy;

use crate::client::connection::{Bus, service_name, shared_connection};
use crate::client::error::ClientError;
use crate::{LVM_PATH, SERVICE_NAME};

/// D-Bus proxy interface for LVM operations
#[proxy(
    interface = "org.lvmd.LVM1",
    default_service = "org.lvmd",
    default_path = "/org/lvmd/LVM"
)]
pub trait LvmInterface {
    /// JSON-serialized Vec<LogicalVolume>
    #[zbus(name = "ListLV")]
    async fn list_lv(&self, listspec: &str) -> zbus::Result<String>;

    #[zbus(name = "CreateLV")]
    async fn create_lv(
        &self,
        vg: &str,
        name: &str,
        size: u64,
        mirrors: u32,
        tags: &[String],
    ) -> zbus::Result<String>;

    #[zbus(name = "CreateThinPool")]
    async fn create_thin_pool(&self, vg: &str, pool: &str) -> zbus::Result<String>;

    #[zbus(name = "CreateThinLV")]
    #[allow(clippy::too_many_arguments)]
    async fn create_thin_lv(
        &self,
        vg: &str,
        pool: &str,
        name: &str,
        size: u64,
        mirrors: u32,
        tags: &[String],
    ) -> zbus::Result<String>;

    #[zbus(name = "ChangeLV")]
    async fn change_lv(&self, vg: &str, name: &str, active: bool) -> zbus::Result<String>;

    #[zbus(name = "RemoveLV")]
    async fn remove_lv(&self, vg: &str, name: &str) -> zbus::Result<String>;

    #[zbus(name = "CloneLV")]
    async fn clone_lv(&self, source: &str, dest: &str) -> zbus::Result<String>;

    /// Volume and filesystem resize; outputs joined with `|`
    #[zbus(name = "ResizeLV")]
    async fn resize_lv(&self, vg: &str, name: &str, size: u64) -> zbus::Result<String>;

    /// JSON-serialized Vec<VolumeGroup>
    #[zbus(name = "ListVG")]
    async fn list_vg(&self) -> zbus::Result<String>;

    #[zbus(name = "CreateVG")]
    async fn create_vg(&self, name: &str, pv: &str, tags: &[String]) -> zbus::Result<String>;

    #[zbus(name = "ExtendVG")]
    async fn extend_vg(&self, name: &str, pv: &str) -> zbus::Result<String>;

    #[zbus(name = "ReduceVG")]
    async fn reduce_vg(&self, name: &str, pv: &str) -> zbus::Result<String>;

    #[zbus(name = "RemoveVG")]
    async fn remove_vg(&self, name: &str) -> zbus::Result<String>;

    #[zbus(name = "AddTagLV")]
    async fn add_tag_lv(&self, vg: &str, name: &str, tags: &[String]) -> zbus::Result<String>;

    #[zbus(name = "RemoveTagLV")]
    async fn remove_tag_lv(&self, vg: &str, name: &str, tags: &[String])
    -> zbus::Result<String>;

    #[zbus(name = "CreatePV")]
    async fn create_pv(&self, block: &str) -> zbus::Result<String>;

    #[zbus(name = "ClaimPV")]
    async fn claim_pv(&self, block: &str) -> zbus::Result<String>;

    #[zbus(name = "RemovePV")]
    async fn remove_pv(&self, block: &str) -> zbus::Result<String>;

    /// JSON-serialized Vec<PhysicalVolume>
    #[zbus(name = "ListPV")]
    async fn list_pv(&self) -> zbus::Result<String>;

    #[zbus(name = "Validate")]
    async fn validate(&self, block: &str) -> zbus::Result<bool>;

    #[zbus(name = "Wipe")]
    async fn wipe(&self, block: &str) -> zbus::Result<String>;

    #[zbus(name = "Match")]
    async fn match_device(&self, block: &str) -> zbus::Result<String>;

    #[zbus(name = "GetPVNum")]
    async fn get_pv_num(&self, vg: &str) -> zbus::Result<u32>;

    #[zbus(signal)]
    async fn volume_group_created(&self, vg_name: &str) -> zbus::Result<()>;

    #[zbus(signal)]
    async fn volume_group_removed(&self, vg_name: &str) -> zbus::Result<()>;

    #[zbus(signal)]
    async fn logical_volume_created(&self, vg_name: &str, lv_name: &str) -> zbus::Result<()>;

    #[zbus(signal)]
    async fn logical_volume_removed(&self, vg_name: &str, lv_name: &str) -> zbus::Result<()>;
}

/// Client for lvmd's LVM interface
///
/// Listings are decoded into `lvmd-types` records. Mutating calls return
/// the diagnostic output of the tools the service ran.
pub struct LvmClient {
    proxy: LvmInterfaceProxy<'static>,
}

impl LvmClient {
    /// Connect to lvmd under its default name on the system bus
    pub async fn new() -> Result<Self, ClientError> {
        Self::connect(Bus::System, SERVICE_NAME).await
    }

    /// Connect to an lvmd instance owning `name` on `bus`
    ///
    /// Matches a service started with `--session` or `--bus-name`.
    pub async fn connect(bus: Bus, name: &str) -> Result<Self, ClientError> {
        let destination = service_name(name)?;
        let conn = shared_connection(bus).await?;

        let proxy = LvmInterfaceProxy::builder(conn)
            .destination(destination)?
            .path(LVM_PATH)?
            .build()
            .await
            .map_err(|e| ClientError::Connection(format!("Failed to create LVM proxy: {}", e)))?;

        Ok(Self { proxy })
    }

    /// Wrap an existing proxy, e.g. one built on a session bus connection
    pub fn from_proxy(proxy: LvmInterfaceProxy<'static>) -> Self {
        Self { proxy }
    }

    /// List logical volumes matching a VG name, `vg/lv`, or everything when empty
    pub async fn list_lvs(&self, listspec: &str) -> Result<Vec<LogicalVolume>, ClientError> {
        decode(&self.proxy.list_lv(listspec).await?)
    }

    pub async fn create_lv(&self, request: &CreateLvRequest) -> Result<String, ClientError> {
        Ok(self
            .proxy
            .create_lv(
                &request.vg,
                &request.name,
                request.size,
                request.mirrors,
                &request.tags,
            )
            .await?)
    }

    pub async fn create_thin_pool(&self, vg: &str, pool: &str) -> Result<String, ClientError> {
        Ok(self.proxy.create_thin_pool(vg, pool).await?)
    }

    pub async fn create_thin_lv(
        &self,
        request: &CreateThinLvRequest,
    ) -> Result<String, ClientError> {
        Ok(self
            .proxy
            .create_thin_lv(
                &request.vg,
                &request.pool,
                &request.name,
                request.size,
                request.mirrors,
                &request.tags,
            )
            .await?)
    }

    pub async fn set_lv_active(
        &self,
        vg: &str,
        name: &str,
        active: bool,
    ) -> Result<String, ClientError> {
        Ok(self.proxy.change_lv(vg, name, active).await?)
    }

    pub async fn remove_lv(&self, vg: &str, name: &str) -> Result<String, ClientError> {
        Ok(self.proxy.remove_lv(vg, name).await?)
    }

    pub async fn clone_lv(&self, source: &str, dest: &str) -> Result<String, ClientError> {
        Ok(self.proxy.clone_lv(source, dest).await?)
    }

    /// Grow a logical volume and its ext filesystem
    pub async fn resize_lv(&self, vg: &str, name: &str, size: u64) -> Result<String, ClientError> {
        Ok(self.proxy.resize_lv(vg, name, size).await?)
    }

    pub async fn list_vgs(&self) -> Result<Vec<VolumeGroup>, ClientError> {
        decode(&self.proxy.list_vg().await?)
    }

    pub async fn create_vg(
        &self,
        name: &str,
        pv: &str,
        tags: &[String],
    ) -> Result<String, ClientError> {
        Ok(self.proxy.create_vg(name, pv, tags).await?)
    }

    pub async fn extend_vg(&self, name: &str, pv: &str) -> Result<String, ClientError> {
        Ok(self.proxy.extend_vg(name, pv).await?)
    }

    pub async fn reduce_vg(&self, name: &str, pv: &str) -> Result<String, ClientError> {
        Ok(self.proxy.reduce_vg(name, pv).await?)
    }

    pub async fn remove_vg(&self, name: &str) -> Result<String, ClientError> {
        Ok(self.proxy.remove_vg(name).await?)
    }

    pub async fn add_lv_tags(
        &self,
        vg: &str,
        name: &str,
        tags: &[String],
    ) -> Result<String, ClientError> {
        Ok(self.proxy.add_tag_lv(vg, name, tags).await?)
    }

    pub async fn remove_lv_tags(
        &self,
        vg: &str,
        name: &str,
        tags: &[String],
    ) -> Result<String, ClientError> {
        Ok(self.proxy.remove_tag_lv(vg, name, tags).await?)
    }

    pub async fn create_pv(&self, block: &str) -> Result<String, ClientError> {
        Ok(self.proxy.create_pv(block).await?)
    }

    /// Validate then initialize a block device as a PV
    pub async fn claim_pv(&self, block: &str) -> Result<String, ClientError> {
        Ok(self.proxy.claim_pv(block).await?)
    }

    pub async fn remove_pv(&self, block: &str) -> Result<String, ClientError> {
        Ok(self.proxy.remove_pv(block).await?)
    }

    pub async fn list_pvs(&self) -> Result<Vec<PhysicalVolume>, ClientError> {
        decode(&self.proxy.list_pv().await?)
    }

    pub async fn validate(&self, block: &str) -> Result<bool, ClientError> {
        Ok(self.proxy.validate(block).await?)
    }

    pub async fn wipe(&self, block: &str) -> Result<String, ClientError> {
        Ok(self.proxy.wipe(block).await?)
    }

    /// Volume group owning the PV on `block`
    pub async fn match_device(&self, block: &str) -> Result<String, ClientError> {
        Ok(self.proxy.match_device(block).await?)
    }

    pub async fn pv_count(&self, vg: &str) -> Result<u32, ClientError> {
        Ok(self.proxy.get_pv_num(vg).await?)
    }

    /// Get the underlying proxy for signal subscriptions
    pub fn proxy(&self) -> &LvmInterfaceProxy<'static> {
        &self.proxy
    }
}

fn decode<T: DeserializeOwned>(json: &str) -> Result<T, ClientError> {
    Ok(serde_json::from_str(json)?)
}
