//! Steps 6, 8 and 10: PANDORA checkout, data, and local overrides.

use async_trait::async_trait;
use pmhc_common::Result;
use tracing::info;

use super::{Step, StepOutcome};
use crate::context::BootstrapContext;
use crate::git::{CheckoutOutcome, Git};
use crate::patch::{reconcile, PatchOutcome};

pub struct InstallPandora;

#[async_trait]
impl Step for InstallPandora {
    fn name(&self) -> &'static str { "install-pandora" }

    fn description(&self) -> &'static str {
        "Clone PANDORA if absent, then install it editable into the environment"
    }

    async fn run(&self, ctx: &mut BootstrapContext) -> Result<StepOutcome> {
        let repo = ctx.config.pandora.repo();
        let checkout = Git::new(ctx).ensure_checkout(&repo).await?;

        // The install always runs, even over an existing checkout.
        let dir = repo.dir.to_string_lossy().into_owned();
        let mut argv = vec!["python", "-m", "pip", "install"];
        if ctx.config.pandora.editable {
            argv.push("-e");
        }
        argv.push(dir.as_str());
        let install = ctx.in_environment(argv.as_slice())?;
        ctx.runner.run(&install).await?;

        let cloned = match checkout {
            CheckoutOutcome::Cloned => "cloned",
            CheckoutOutcome::AlreadyPresent => "existing checkout",
        };
        let mode = if ctx.config.pandora.editable { "editable" } else { "regular" };
        Ok(StepOutcome::Done(format!("{dir}: {cloned}, {mode} install")))
    }
}

pub struct FetchPandoraData;

#[async_trait]
impl Step for FetchPandoraData {
    fn name(&self) -> &'static str { "fetch-pandora-data" }

    fn description(&self) -> &'static str {
        "Download PANDORA's template database with its own fetch command"
    }

    async fn run(&self, ctx: &mut BootstrapContext) -> Result<StepOutcome> {
        let argv = &ctx.config.pandora.fetch_command;
        if argv.is_empty() {
            return Ok(StepOutcome::Skipped("no data-fetch command configured".to_string()));
        }
        let cmd = ctx.in_environment(argv.as_slice())?;
        ctx.runner.run(&cmd).await?;
        Ok(StepOutcome::Done(format!("ran {}", argv.join(" "))))
    }
}

pub struct PatchPandora;

#[async_trait]
impl Step for PatchPandora {
    fn name(&self) -> &'static str { "patch-pandora" }

    fn description(&self) -> &'static str {
        "Copy the local overrides over their PANDORA counterparts when contents differ"
    }

    async fn run(&self, ctx: &mut BootstrapContext) -> Result<StepOutcome> {
        let patches = &ctx.config.pandora.patches;
        if patches.is_empty() {
            return Ok(StepOutcome::Skipped("no overrides configured".to_string()));
        }

        let mut written = 0;
        for patch in patches {
            let outcome = reconcile(&ctx.resolve(&patch.source), &ctx.resolve(&patch.target))?;
            if outcome == PatchOutcome::Written {
                written += 1;
            }
        }
        info!(written, total = patches.len(), "Reconciled overrides");

        if written == 0 {
            Ok(StepOutcome::Skipped(format!("all {} overrides already applied", patches.len())))
        } else {
            Ok(StepOutcome::Done(format!("applied {written} of {} overrides", patches.len())))
        }
    }
}
