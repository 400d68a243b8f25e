//! Steps 9, 11 and 12: AFfine archive, ProteinMPNN and Pep2Vec checkouts.

use async_trait::async_trait;
use pmhc_common::{Result, SetupError};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

use super::{Step, StepOutcome};
use crate::archive::extract_zip_blocking;
use crate::context::BootstrapContext;
use crate::digest::verify_sha256;
use crate::git::{CheckoutOutcome, Git};

pub struct FetchAffine;

#[async_trait]
impl Step for FetchAffine {
    fn name(&self) -> &'static str { "fetch-affine" }

    fn description(&self) -> &'static str {
        "Download and extract the AFfine archive unless its folder exists"
    }

    async fn run(&self, ctx: &mut BootstrapContext) -> Result<StepOutcome> {
        let cfg = &ctx.config.affine;
        let dir = ctx.resolve(&cfg.dir);
        if dir.exists() {
            return Ok(StepOutcome::Skipped(format!("{} already present", cfg.dir.display())));
        }

        let archive = ctx.resolve(&cfg.archive);
        let reused = archive.exists();
        if reused {
            info!(archive = %archive.display(), "Archive already downloaded");
        } else {
            ctx.downloader.fetch(&cfg.url, &archive).await?;
        }

        if let Some(expected) = &cfg.sha256 {
            if let Err(err) = verify_sha256(&archive, expected) {
                // A rejected archive never stays in place under its final name.
                std::fs::remove_file(&archive)?;
                if !reused {
                    return Err(err);
                }
                warn!(archive = %archive.display(), %err, "Existing archive failed verification, downloading again");
                ctx.downloader.fetch(&cfg.url, &archive).await?;
                if let Err(err) = verify_sha256(&archive, expected) {
                    std::fs::remove_file(&archive)?;
                    return Err(err);
                }
            }
        }

        let files = extract_zip_blocking(archive, ctx.workdir.clone()).await?;
        if !dir.exists() {
            warn!(dir = %dir.display(), "Archive did not create the expected folder; it will be fetched again next run");
        }
        Ok(StepOutcome::Done(format!("extracted {files} files into {}", cfg.dir.display())))
    }
}

pub struct CloneProteinMpnn;

#[async_trait]
impl Step for CloneProteinMpnn {
    fn name(&self) -> &'static str { "clone-proteinmpnn" }

    fn description(&self) -> &'static str {
        "Clone ProteinMPNN unless the checkout exists"
    }

    async fn run(&self, ctx: &mut BootstrapContext) -> Result<StepOutcome> {
        let repo = ctx.config.proteinmpnn.clone();
        match Git::new(ctx).ensure_checkout(&repo).await? {
            CheckoutOutcome::Cloned => Ok(StepOutcome::Done(format!("cloned into {}", repo.dir.display()))),
            CheckoutOutcome::AlreadyPresent => {
                Ok(StepOutcome::Skipped(format!("{} already present", repo.dir.display())))
            }
        }
    }
}

pub struct ClonePep2Vec;

#[async_trait]
impl Step for ClonePep2Vec {
    fn name(&self) -> &'static str { "clone-pep2vec" }

    fn description(&self) -> &'static str {
        "Clone Pep2Vec, pull its LFS payload and verify the model asset"
    }

    async fn run(&self, ctx: &mut BootstrapContext) -> Result<StepOutcome> {
        let cfg = ctx.config.pep2vec.clone();
        let git = Git::new(ctx);
        let checkout = git.ensure_checkout(&cfg.repo()).await?;

        let dir = ctx.resolve(&cfg.dir);
        git.lfs_pull(&dir).await?;

        let asset = dir.join(&cfg.required_asset);
        if !asset.is_file() || is_lfs_pointer(&asset) {
            return Err(SetupError::MissingAsset { path: asset });
        }

        let state = match checkout {
            CheckoutOutcome::Cloned => "cloned",
            CheckoutOutcome::AlreadyPresent => "existing checkout",
        };
        Ok(StepOutcome::Done(format!("{}: {state}, {} present", cfg.dir.display(), cfg.required_asset.display())))
    }
}

const LFS_POINTER_PREFIX: &[u8] = b"version https://git-lfs.github.com/spec/";

/// True when the file is still an un-smudged LFS pointer.
fn is_lfs_pointer(path: &Path) -> bool {
    let mut head = [0u8; 64];
    let Ok(mut file) = File::open(path) else {
        return false;
    };
    let n = file.read(&mut head).unwrap_or(0);
    head[..n].starts_with(LFS_POINTER_PREFIX)
}
