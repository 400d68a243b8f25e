//! Bootstrap steps.
//!
//! Each step is a unit struct implementing [`Step`]. The standard order is
//! fixed by [`standard_steps`]; the driver in `pipeline` runs them one by one
//! and stops at the first error.

pub mod assets;
pub mod complete;
pub mod environment;
pub mod pandora;
pub mod prepare;

use async_trait::async_trait;
use pmhc_common::Result;
use std::fmt;

use crate::context::BootstrapContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step changed something.
    Done(String),
    /// The target already existed.
    Skipped(String),
    /// A precondition was missing; the run continues.
    Warned(String),
}

impl StepOutcome {
    pub fn message(&self) -> &str {
        match self {
            StepOutcome::Done(m) | StepOutcome::Skipped(m) | StepOutcome::Warned(m) => m,
        }
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::Done(m) => write!(f, "done: {m}"),
            StepOutcome::Skipped(m) => write!(f, "skipped: {m}"),
            StepOutcome::Warned(m) => write!(f, "warning: {m}"),
        }
    }
}

/// One named, guarded provisioning action.
#[async_trait]
pub trait Step: Send + Sync {
    /// Stable kebab-case identifier, shown in logs and failure reports.
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    async fn run(&self, ctx: &mut BootstrapContext) -> Result<StepOutcome>;
}

pub fn standard_steps() -> Vec<Box<dyn Step>> {
    vec![
        Box::new(prepare::CollectLicenseKey),
        Box::new(prepare::SelectFrontend),
        Box::new(prepare::ShellIntegration),
        Box::new(environment::CreateEnvironment),
        Box::new(environment::ActivateEnvironment),
        Box::new(pandora::InstallPandora),
        Box::new(environment::ReconcileEnvironment),
        Box::new(pandora::FetchPandoraData),
        Box::new(assets::FetchAffine),
        Box::new(pandora::PatchPandora),
        Box::new(assets::CloneProteinMpnn),
        Box::new(assets::ClonePep2Vec),
        Box::new(complete::Complete),
    ]
}
