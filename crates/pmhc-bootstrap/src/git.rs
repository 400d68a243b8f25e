//! git and git-lfs operations.

use pmhc_common::Result;
use pmhc_config::RepoConfig;
use std::path::Path;
use tracing::{info, warn};

use crate::context::BootstrapContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutOutcome {
    Cloned,
    AlreadyPresent,
}

pub struct Git<'a> {
    ctx: &'a BootstrapContext,
}

impl<'a> Git<'a> {
    pub fn new(ctx: &'a BootstrapContext) -> Self {
        Self { ctx }
    }

    pub async fn clone_repo(&self, url: &str, dest: &Path) -> Result<()> {
        info!(url, dest = %dest.display(), "Cloning");
        self.ctx
            .runner
            .run(&self.ctx.command("git").args(["clone", url]).arg(dest.to_string_lossy()))
            .await?;
        Ok(())
    }

    /// Clone unless the checkout directory already exists.
    pub async fn ensure_checkout(&self, repo: &RepoConfig) -> Result<CheckoutOutcome> {
        let dest = self.ctx.resolve(&repo.dir);
        if dest.exists() {
            if !dest.join(".git").exists() {
                warn!(dir = %dest.display(), "Directory exists but is not a git checkout; leaving it as is");
            }
            return Ok(CheckoutOutcome::AlreadyPresent);
        }
        self.clone_repo(&repo.url, &dest).await?;
        Ok(CheckoutOutcome::Cloned)
    }

    /// Fetch the LFS objects of the checkout at `dir`.
    pub async fn lfs_pull(&self, dir: &Path) -> Result<()> {
        info!(dir = %dir.display(), "Pulling LFS objects");
        self.ctx
            .runner
            .run(&self.ctx.command("git").args(["lfs", "pull"]).cwd(dir))
            .await?;
        Ok(())
    }
}
