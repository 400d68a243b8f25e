//! Steps 4, 5 and 7: the named package-manager environment.

use async_trait::async_trait;
use pmhc_common::{Result, SetupError};
use pmhc_config::EnvironmentFile;
use tracing::{info, warn};

use super::{Step, StepOutcome};
use crate::context::BootstrapContext;
use crate::frontend::Conda;

pub struct CreateEnvironment;

#[async_trait]
impl Step for CreateEnvironment {
    fn name(&self) -> &'static str { "create-environment" }

    fn description(&self) -> &'static str {
        "Create the environment from its spec file unless it already exists"
    }

    async fn run(&self, ctx: &mut BootstrapContext) -> Result<StepOutcome> {
        let spec_path = ctx.spec_path();
        if spec_path.is_file() {
            let spec = EnvironmentFile::load(&spec_path)?;
            info!(
                spec = %spec_path.display(),
                dependencies = spec.dependency_count(),
                "Read environment spec"
            );
            ctx.spec = Some(spec);
        }
        let name = ctx.environment_name();
        let conda = Conda::new(ctx);

        if conda.env_exists(&name).await? {
            return Ok(StepOutcome::Skipped(format!("environment {name} already exists")));
        }

        if !spec_path.is_file() {
            warn!(spec = %spec_path.display(), env = %name, "No spec file found, environment not created");
            return Ok(StepOutcome::Warned(format!(
                "no spec file at {}; environment {name} was not created",
                spec_path.display()
            )));
        }

        conda.create(&name, &spec_path).await?;
        Ok(StepOutcome::Done(format!("created environment {name}")))
    }
}

pub struct ActivateEnvironment;

#[async_trait]
impl Step for ActivateEnvironment {
    fn name(&self) -> &'static str { "activate-environment" }

    fn description(&self) -> &'static str {
        "Target every later install at the named environment"
    }

    async fn run(&self, ctx: &mut BootstrapContext) -> Result<StepOutcome> {
        let name = ctx.environment_name();
        if !Conda::new(ctx).env_exists(&name).await? {
            return Err(SetupError::EnvironmentNotFound(name));
        }
        let message = format!("installs now target {name}");
        ctx.environment = Some(name);
        Ok(StepOutcome::Done(message))
    }
}

pub struct ReconcileEnvironment;

#[async_trait]
impl Step for ReconcileEnvironment {
    fn name(&self) -> &'static str { "reconcile-environment" }

    fn description(&self) -> &'static str {
        "Re-apply the spec file to undo drift from the editable install"
    }

    async fn run(&self, ctx: &mut BootstrapContext) -> Result<StepOutcome> {
        let spec_path = ctx.spec_path();
        let name = ctx.environment_name();
        if !spec_path.is_file() {
            warn!(spec = %spec_path.display(), "No spec file found, skipping environment update");
            return Ok(StepOutcome::Warned(format!(
                "no spec file at {}; environment {name} left as is",
                spec_path.display()
            )));
        }
        Conda::new(ctx).update(&name, &spec_path).await?;
        Ok(StepOutcome::Done(format!("environment {name} matches {}", spec_path.display())))
    }
}
