//! conda / mamba environment management.

use pmhc_common::{Result, SetupError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::context::BootstrapContext;
use crate::runner::CommandRunner;

/// `preferred` when it is on PATH, else `fallback`.
pub fn select_frontend(runner: &dyn CommandRunner, preferred: &str, fallback: &str) -> String {
    match runner.locate(preferred) {
        Some(path) => {
            debug!(path = %path.display(), "Found preferred front-end");
            preferred.to_string()
        }
        None => fallback.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct EnvList {
    envs: Vec<PathBuf>,
}

/// Parse `conda env list --json` output into environment prefixes.
pub fn parse_env_list(json: &str) -> Result<Vec<PathBuf>> {
    let list: EnvList = serde_json::from_str(json)?;
    Ok(list.envs)
}

/// Named environments live under `<base>/envs/<name>`; "base" is the first prefix
/// and never matches a named environment.
pub fn env_listed(prefixes: &[PathBuf], name: &str) -> bool {
    let Some((_base, named)) = prefixes.split_first() else {
        return false;
    };
    if name == "base" {
        return true;
    }
    named
        .iter()
        .any(|p| p.file_name().map(|f| f == name).unwrap_or(false))
}

/// Package-manager operations scoped to one bootstrap run.
pub struct Conda<'a> {
    ctx: &'a BootstrapContext,
}

impl<'a> Conda<'a> {
    pub fn new(ctx: &'a BootstrapContext) -> Self {
        Self { ctx }
    }

    /// Installation prefix reported by `conda info --base`.
    pub async fn base_prefix(&self) -> Result<PathBuf> {
        let out = self
            .ctx
            .runner
            .run(&self.ctx.command(self.ctx.base_tool()).args(["info", "--base"]).capture())
            .await?;
        let base = out.stdout.trim();
        if base.is_empty() {
            return Err(SetupError::Config(format!(
                "`{} info --base` printed nothing",
                self.ctx.base_tool()
            )));
        }
        Ok(PathBuf::from(base))
    }

    pub async fn env_exists(&self, name: &str) -> Result<bool> {
        let out = self
            .ctx
            .runner
            .run(&self.ctx.command(self.ctx.base_tool()).args(["env", "list", "--json"]).capture())
            .await?;
        let prefixes = parse_env_list(&out.stdout)?;
        Ok(env_listed(&prefixes, name))
    }

    pub async fn create(&self, name: &str, spec: &Path) -> Result<()> {
        info!(env = name, spec = %spec.display(), frontend = self.ctx.frontend(), "Creating environment");
        self.ctx
            .runner
            .run(
                &self
                    .ctx
                    .command(self.ctx.frontend())
                    .args(["env", "create", "-n", name, "-f"])
                    .arg(spec.to_string_lossy()),
            )
            .await?;
        Ok(())
    }

    pub async fn update(&self, name: &str, spec: &Path) -> Result<()> {
        info!(env = name, spec = %spec.display(), frontend = self.ctx.frontend(), "Updating environment");
        self.ctx
            .runner
            .run(
                &self
                    .ctx
                    .command(self.ctx.frontend())
                    .args(["env", "update", "-n", name, "-f"])
                    .arg(spec.to_string_lossy()),
            )
            .await?;
        Ok(())
    }
}
