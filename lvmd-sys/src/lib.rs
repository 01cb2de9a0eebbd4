// SPDX-License-Identifier: GPL-3.0-only

//! LVM orchestration for lvmd
//!
//! This crate drives the LVM2 command line tools directly:
//! - builds argument vectors for every management operation
//! - parses `lvs`/`vgs`/`pvs` name-prefixed reports into typed records
//! - refuses destructive operations on protected or ambiguous targets
//! - validates raw block devices before they are claimed as PVs
//! - sequences the grow-volume-then-filesystem resize workflow
//!
//! Everything here is blocking. Async callers (like lvmd-service) should
//! run operations on a blocking worker thread.

pub mod error;
pub mod guard;
pub mod locks;
pub mod lvm;
pub mod parser;
pub mod runner;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{LvmError, Result};
pub use locks::{ResourceKey, ResourceLocks};
pub use lvm::resize::{RESIZE_OUTPUT_SEPARATOR, ResizeStep, StepOutput};
pub use lvm::{Lvm, lvm_tools_available};
pub use parser::{InventoryRecord, Record, RecordKind, parse_line, parse_listing, parse_record};
pub use runner::{CommandRunner, Invocation, SystemRunner};
