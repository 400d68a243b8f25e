//! Step 13: usage guidance.

use async_trait::async_trait;
use pmhc_common::Result;

use super::{Step, StepOutcome};
use crate::context::BootstrapContext;
use crate::report::completion_banner;

pub struct Complete;

#[async_trait]
impl Step for Complete {
    fn name(&self) -> &'static str { "complete" }

    fn description(&self) -> &'static str { "Print usage guidance" }

    async fn run(&self, ctx: &mut BootstrapContext) -> Result<StepOutcome> {
        println!("{}", completion_banner(ctx));
        Ok(StepOutcome::Done("setup finished".to_string()))
    }
}
