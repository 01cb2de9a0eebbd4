// SPDX-License-Identifier: GPL-3.0-only

//! Removal guard for tagged resources
//!
//! A removal target must resolve to exactly one live record, and that
//! record must not carry the `protected` tag. Both checks happen before the
//! removal tool is spawned. Callers hold the resource lock across the
//! lookup, this check and the removal itself.

use lvmd_types::Tagged;

use crate::error::{LvmError, Result};

/// Pick the single record `target` resolved to and make sure it may be removed
pub fn ensure_removable<T: Tagged>(target: &str, mut matches: Vec<T>) -> Result<T> {
    let found = matches.len();
    let record = match matches.pop() {
        Some(record) if found == 1 => record,
        _ => {
            tracing::warn!("Refusing to remove {target}: lookup returned {found} records");
            return Err(LvmError::AmbiguousTarget {
                target: target.to_string(),
                found,
            });
        }
    };

    if record.is_protected() {
        tracing::warn!("Refusing to remove {target}: it carries the protected tag");
        return Err(LvmError::ProtectedResource {
            target: target.to_string(),
        });
    }

    tracing::debug!("{target} resolved to record {}", record.display_name());
    Ok(record)
}
