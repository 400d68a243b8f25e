//! Orchestrator for the bootstrap steps.

use pmhc_common::SetupError;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::context::BootstrapContext;
use crate::steps::{standard_steps, Step, StepOutcome};

/// The first step that failed, with its error.
#[derive(Debug, Error)]
#[error("step `{step}` failed: {error}")]
pub struct StepFailure {
    pub step: &'static str,
    #[source]
    pub error: SetupError,
}

#[derive(Debug, Clone)]
pub struct StepRecord {
    pub step: &'static str,
    pub outcome: StepOutcome,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct BootstrapReport {
    pub records: Vec<StepRecord>,
}

impl BootstrapReport {
    pub fn outcome(&self, step: &str) -> Option<&StepOutcome> {
        self.records.iter().find(|r| r.step == step).map(|r| &r.outcome)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &StepRecord> {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, StepOutcome::Warned(_)))
    }
}

pub struct Bootstrap {
    steps: Vec<Box<dyn Step>>,
}

impl Bootstrap {
    pub fn new(steps: Vec<Box<dyn Step>>) -> Self {
        Self { steps }
    }

    /// The full installer sequence.
    pub fn standard() -> Self {
        Self::new(standard_steps())
    }

    /// Step names and descriptions in execution order.
    pub fn plan(&self) -> Vec<(&'static str, &'static str)> {
        self.steps.iter().map(|s| (s.name(), s.description())).collect()
    }

    /// Run every step in order, stopping at the first failure.
    /// Side effects of completed steps stay on disk either way.
    pub async fn run(&self, ctx: &mut BootstrapContext) -> Result<BootstrapReport, StepFailure> {
        let mut report = BootstrapReport::default();
        let total = self.steps.len();

        for (i, step) in self.steps.iter().enumerate() {
            let name = step.name();
            info!(step = name, "[{}/{}] {}", i + 1, total, step.description());
            let started = Instant::now();

            let outcome = match step.run(ctx).await {
                Ok(outcome) => outcome,
                Err(error) => {
                    error!(step = name, %error, "Step failed");
                    return Err(StepFailure { step: name, error });
                }
            };

            match &outcome {
                StepOutcome::Warned(msg) => warn!(step = name, "{}", msg),
                other => info!(step = name, "{}", other),
            }
            report.records.push(StepRecord {
                step: name,
                outcome,
                elapsed: started.elapsed(),
            });
        }

        Ok(report)
    }
}

impl Default for Bootstrap {
    fn default() -> Self { Self::standard() }
}
