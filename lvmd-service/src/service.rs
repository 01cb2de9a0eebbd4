// SPDX-License-Identifier: GPL-3.0-only

use zbus::interface;

pub const SERVICE_OBJECT_PATH: &str = "/org/lvmd";

/// Top-level service object describing the daemon
pub struct LvmdService {
    version: String,
    authorization: bool,
    lvm_available: bool,
}

impl LvmdService {
    pub fn new(authorization: bool, lvm_available: bool) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            authorization,
            lvm_available,
        }
    }

    fn features(&self) -> Vec<String> {
        let mut features = Vec::new();
        if self.lvm_available {
            features.extend(["lvm", "thin-provisioning", "fs-resize"].map(String::from));
        }
        if self.authorization {
            features.push("polkit".to_string());
        }
        features
    }
}

#[interface(name = "org.lvmd.Service")]
impl LvmdService {
    /// Get service version
    #[zbus(property)]
    async fn version(&self) -> &str {
        &self.version
    }

    /// Get list of supported features
    #[zbus(property)]
    async fn supported_features(&self) -> Vec<String> {
        self.features()
    }
}
