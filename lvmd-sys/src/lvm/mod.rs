// SPDX-License-Identifier: GPL-3.0-only

//! Command orchestration for LVM tools

pub mod device;
pub mod lv;
pub mod pv;
pub mod resize;
pub mod vg;

use crate::error::{LvmError, Result};
use crate::locks::{ResourceGuard, ResourceKey, ResourceLocks};
use crate::parser::{self, InventoryRecord};
use crate::runner::{CommandRunner, Invocation, SystemRunner};

/// Whether the LVM report tools are installed and compiled in
pub fn lvm_tools_available() -> bool {
    cfg!(feature = "lvm-tools")
        && which::which("lvs").is_ok()
        && which::which("vgs").is_ok()
        && which::which("pvs").is_ok()
}

/// Orchestrates LVM operations through a [`CommandRunner`]
///
/// `Lvm` holds no inventory state; every call asks the tools afresh. The
/// only shared state is the lock registry serializing mutations of the
/// same resource.
pub struct Lvm<R = SystemRunner> {
    runner: R,
    locks: ResourceLocks,
}

impl<R: CommandRunner> Lvm<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            locks: ResourceLocks::new(),
        }
    }

    pub fn locks(&self) -> &ResourceLocks {
        &self.locks
    }

    fn lock(&self, key: ResourceKey) -> ResourceGuard<'_> {
        self.locks.lock(key)
    }

    /// Run a tool and hand back its raw invocation, whatever the exit status
    fn spawn(&self, program: &str, args: &[String]) -> Result<Invocation> {
        self.runner
            .run(program, args)
            .map_err(|source| {
                tracing::error!("Failed to run {program}: {source}");
                LvmError::ToolUnavailable {
                    program: program.to_string(),
                    source,
                }
            })
    }

    /// Run a tool, treating a non-zero exit as [`LvmError::ToolInvocationFailed`]
    fn invoke(&self, program: &str, args: Vec<String>) -> Result<String> {
        let invocation = self.spawn(program, &args)?;
        if !invocation.success() {
            tracing::error!("{program} failed: {}", invocation.output.trim());
            return Err(LvmError::ToolInvocationFailed {
                program: program.to_string(),
                status: invocation.status,
                output: invocation.output,
            });
        }
        Ok(invocation.output)
    }

    /// Run the report tool for `T` and parse every line of its output
    fn report<T: InventoryRecord>(&self, selector: Option<&str>) -> Result<Vec<T>> {
        let mut args = parser::report_args::<T>();
        if let Some(selector) = selector.filter(|selector| !selector.is_empty()) {
            args.push(selector.to_string());
        }

        let output = self.invoke(T::KIND.tool(), args)?;
        let records = parser::parse_listing::<T>(&output)?;
        tracing::debug!("{} reported {} records", T::KIND.tool(), records.len());
        Ok(records)
    }
}

/// Reject empty names and names LVM would read as an option
pub(crate) fn require_name(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(LvmError::InvalidArgument(format!("{what} must not be empty")));
    }
    if value.starts_with('-') {
        return Err(LvmError::InvalidArgument(format!(
            "{what} must not start with '-': {value}"
        )));
    }
    Ok(())
}

pub(crate) fn require_size(size: u64) -> Result<()> {
    if size == 0 {
        return Err(LvmError::InvalidArgument(
            "size must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn require_tags(tags: &[String]) -> Result<()> {
    for tag in tags {
        require_name("tag", tag)?;
    }
    Ok(())
}

/// Size argument in bytes as understood by `-L`/`-V`
pub(crate) fn size_arg(size: u64) -> String {
    format!("{size}b")
}

/// Append one `flag tag` pair per tag, keeping the caller's order
pub(crate) fn push_tags(args: &mut Vec<String>, flag: &str, tags: &[String]) {
    for tag in tags {
        args.push(flag.to_string());
        args.push(tag.clone());
    }
}

/// Build an argument vector from string-ish pieces
pub(crate) fn args<I, S>(parts: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    parts.into_iter().map(Into::into).collect()
}
