//! Local overrides for files inside a checkout.
//!
//! A patch is applied by content: the target is rewritten only when its
//! SHA-256 differs from the override's, so reapplying is a no-op and the
//! override stays in place for the next run.

use pmhc_common::{Result, SetupError};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::digest::sha256_file;
use crate::download::partial_path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    Unchanged,
    Written,
}

pub fn reconcile(source: &Path, target: &Path) -> Result<PatchOutcome> {
    if !source.is_file() {
        return Err(SetupError::Config(format!(
            "override file not found: {}",
            source.display()
        )));
    }
    let desired = sha256_file(source)?;

    if target.is_file() && sha256_file(target)? == desired {
        debug!(target = %target.display(), "Override already applied");
        return Ok(PatchOutcome::Unchanged);
    }

    match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => {
            return Err(SetupError::Config(format!(
                "cannot apply override, directory missing: {}",
                parent.display()
            )));
        }
        _ => {}
    }

    // Stage next to the target so the final rename stays on one filesystem.
    let staged = partial_path(target);
    fs::copy(source, &staged)?;
    fs::rename(&staged, target)?;
    info!(source = %source.display(), target = %target.display(), "Applied override");
    Ok(PatchOutcome::Written)
}
