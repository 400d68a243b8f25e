//! Steps 1-3: license key, front-end choice, conda availability.

use async_trait::async_trait;
use pmhc_common::Result;
use tracing::{debug, info};

use super::{Step, StepOutcome};
use crate::context::BootstrapContext;
use crate::frontend::{select_frontend, Conda};
use crate::license::resolve_license_key;

pub struct CollectLicenseKey;

#[async_trait]
impl Step for CollectLicenseKey {
    fn name(&self) -> &'static str { "collect-license-key" }

    fn description(&self) -> &'static str {
        "Read the MODELLER license key and export it to every child process"
    }

    async fn run(&self, ctx: &mut BootstrapContext) -> Result<StepOutcome> {
        let env_var = ctx.config.license.env_var.clone();
        let secret_file = ctx.license_file.clone().or_else(|| {
            ctx.config.license.secret_file.as_ref().map(|p| ctx.resolve(p))
        });

        let (key, source) = resolve_license_key(
            &env_var,
            ctx.host_var(&env_var),
            secret_file.as_deref(),
            ctx.prompt.as_ref(),
        )?;
        ctx.license_key = Some(key);

        Ok(StepOutcome::Done(format!("key read from {source}, exported as {env_var}")))
    }
}

pub struct SelectFrontend;

#[async_trait]
impl Step for SelectFrontend {
    fn name(&self) -> &'static str { "select-frontend" }

    fn description(&self) -> &'static str {
        "Prefer mamba for environment create/update when it is on PATH"
    }

    async fn run(&self, ctx: &mut BootstrapContext) -> Result<StepOutcome> {
        let preferred = &ctx.config.environment.preferred_frontend;
        let fallback = &ctx.config.environment.fallback_frontend;
        let chosen = select_frontend(ctx.runner.as_ref(), preferred, fallback);

        let message = if &chosen == preferred {
            format!("using {chosen}")
        } else {
            format!("{preferred} not found, using {chosen}")
        };
        info!(frontend = %chosen, "Selected package-manager front-end");
        ctx.frontend = Some(chosen);
        Ok(StepOutcome::Done(message))
    }
}

pub struct ShellIntegration;

#[async_trait]
impl Step for ShellIntegration {
    fn name(&self) -> &'static str { "shell-integration" }

    fn description(&self) -> &'static str {
        "Check that conda is initialised and usable from this process"
    }

    async fn run(&self, ctx: &mut BootstrapContext) -> Result<StepOutcome> {
        if let Some(prefix) = ctx.host_var("CONDA_PREFIX").filter(|p| !p.is_empty()) {
            debug!(prefix, "CONDA_PREFIX already set");
            return Ok(StepOutcome::Skipped(format!("conda already initialised at {prefix}")));
        }

        let base = Conda::new(ctx).base_prefix().await?;
        let message = format!("conda base at {}", base.display());
        ctx.conda_base = Some(base);
        Ok(StepOutcome::Done(message))
    }
}
