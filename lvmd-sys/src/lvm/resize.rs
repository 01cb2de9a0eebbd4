// SPDX-License-Identifier: GPL-3.0-only

//! Logical volume resize, optionally followed by an ext filesystem grow
//!
//! The full workflow is three tool runs: `lvresize`, `e2fsck -f -y` and
//! `resize2fs`. Each step commits on its own. There is no rollback; when a
//! later step fails the error lists what already committed so the caller
//! can finish or repair by hand.

use std::fmt;

use lvmd_types::{QualifiedName, bytes_to_pretty};

use super::{Lvm, require_name, require_size, size_arg};
use crate::error::{LvmError, Result};
use crate::locks::ResourceKey;
use crate::runner::CommandRunner;

/// Joins the outputs of the workflow steps on success
pub const RESIZE_OUTPUT_SEPARATOR: &str = "|";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeStep {
    /// `lvresize` to the new size
    GrowVolume,
    /// Forced `e2fsck`, required by `resize2fs` on an unmounted filesystem
    CheckFilesystem,
    GrowFilesystem,
}

impl ResizeStep {
    pub const ALL: [ResizeStep; 3] = [
        ResizeStep::GrowVolume,
        ResizeStep::CheckFilesystem,
        ResizeStep::GrowFilesystem,
    ];

    pub fn program(self) -> &'static str {
        match self {
            ResizeStep::GrowVolume => "lvresize",
            ResizeStep::CheckFilesystem => "e2fsck",
            ResizeStep::GrowFilesystem => "resize2fs",
        }
    }

    fn args(self, target: &QualifiedName, size: u64) -> Vec<String> {
        match self {
            ResizeStep::GrowVolume => vec![
                "-L".to_string(),
                size_arg(size),
                "-v".to_string(),
                target.to_string(),
            ],
            ResizeStep::CheckFilesystem => vec![
                "-f".to_string(),
                "-y".to_string(),
                target.device_path(),
            ],
            ResizeStep::GrowFilesystem => vec![target.device_path()],
        }
    }
}

impl fmt::Display for ResizeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

/// Output of a step that completed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutput {
    pub step: ResizeStep,
    pub output: String,
}

impl<R: CommandRunner> Lvm<R> {
    /// Resize the logical volume only
    pub fn resize_lv(&self, vg: &str, name: &str, size: u64) -> Result<String> {
        let target = resize_target(vg, name, size)?;
        let _guard = self.lock(ResourceKey::LogicalVolume(target.clone()));

        tracing::info!("Resizing {target} to {}", bytes_to_pretty(size, true));
        self.invoke(
            ResizeStep::GrowVolume.program(),
            ResizeStep::GrowVolume.args(&target, size),
        )
    }

    /// Resize the logical volume, check its filesystem, then grow it
    ///
    /// On success the three outputs are joined with
    /// [`RESIZE_OUTPUT_SEPARATOR`]. On failure no later step runs and the
    /// error is [`LvmError::ResizeStepFailed`].
    pub fn resize_lv_and_filesystem(&self, vg: &str, name: &str, size: u64) -> Result<String> {
        let target = resize_target(vg, name, size)?;
        let _guard = self.lock(ResourceKey::LogicalVolume(target.clone()));

        tracing::info!(
            "Resizing {target} and its filesystem to {}",
            bytes_to_pretty(size, true)
        );

        let mut completed: Vec<StepOutput> = Vec::with_capacity(ResizeStep::ALL.len());
        for step in ResizeStep::ALL {
            match self.invoke(step.program(), step.args(&target, size)) {
                Ok(output) => {
                    tracing::debug!("{step} finished for {target}");
                    completed.push(StepOutput { step, output });
                }
                Err(source) => {
                    tracing::error!(
                        "Resize of {target} stopped at {step} with {} step(s) committed",
                        completed.len()
                    );
                    return Err(LvmError::ResizeStepFailed {
                        step,
                        completed,
                        source: Box::new(source),
                    });
                }
            }
        }

        tracing::info!("Resized {target} and its filesystem");
        Ok(completed
            .into_iter()
            .map(|done| done.output)
            .collect::<Vec<_>>()
            .join(RESIZE_OUTPUT_SEPARATOR))
    }
}

fn resize_target(vg: &str, name: &str, size: u64) -> Result<QualifiedName> {
    require_name("volume group", vg)?;
    require_name("logical volume", name)?;
    require_size(size)?;
    Ok(QualifiedName::new(vg, name))
}
