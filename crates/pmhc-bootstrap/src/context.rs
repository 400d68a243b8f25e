//! Shared state threaded through the bootstrap steps.

use pmhc_common::{Result, SetupError};
use pmhc_config::{EnvironmentFile, SetupConfig};
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::download::Downloader;
use crate::license::KeyPrompt;
use crate::runner::{CommandRunner, CommandSpec};

pub struct BootstrapContext {
    pub config: SetupConfig,
    /// Root every relative path resolves against.
    pub workdir: PathBuf,
    pub runner: Arc<dyn CommandRunner>,
    pub downloader: Arc<dyn Downloader>,
    pub prompt: Arc<dyn KeyPrompt>,
    /// Snapshot of the invoking process environment.
    pub host_env: HashMap<String, String>,
    /// `--license-file` from the command line; overrides the config entry.
    pub license_file: Option<PathBuf>,

    // Filled in as steps run.
    pub license_key: Option<SecretString>,
    pub frontend: Option<String>,
    pub conda_base: Option<PathBuf>,
    pub environment: Option<String>,
    pub spec: Option<EnvironmentFile>,
}

impl BootstrapContext {
    pub fn new(
        config: SetupConfig,
        workdir: impl Into<PathBuf>,
        runner: Arc<dyn CommandRunner>,
        downloader: Arc<dyn Downloader>,
        prompt: Arc<dyn KeyPrompt>,
    ) -> Self {
        Self {
            config,
            workdir: workdir.into(),
            runner,
            downloader,
            prompt,
            host_env: HashMap::new(),
            license_file: None,
            license_key: None,
            frontend: None,
            conda_base: None,
            environment: None,
            spec: None,
        }
    }

    /// Replace the host environment snapshot (`std::env::vars()` in the binary).
    pub fn with_host_env<I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.host_env = vars.into_iter().collect();
        self
    }

    pub fn with_license_file(mut self, path: Option<PathBuf>) -> Self {
        self.license_file = path;
        self
    }

    pub fn host_var(&self, key: &str) -> Option<&str> {
        self.host_env.get(key).map(String::as_str)
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.workdir.join(path)
    }

    pub fn spec_path(&self) -> PathBuf {
        self.resolve(&self.config.environment.spec_file)
    }

    /// Binary used for queries and `run`; the selected front-end is only for create/update.
    pub fn base_tool(&self) -> &str {
        &self.config.environment.fallback_frontend
    }

    pub fn frontend(&self) -> &str {
        self.frontend.as_deref().unwrap_or_else(|| self.base_tool())
    }

    pub fn environment_name(&self) -> String {
        let spec_name = self.spec.as_ref().and_then(|s| s.name.as_deref());
        self.config.environment_name(spec_name)
    }

    /// A command rooted in the working directory, carrying the license key once collected.
    pub fn command(&self, program: &str) -> CommandSpec {
        let mut cmd = CommandSpec::new(program).cwd(&self.workdir);
        if let Some(key) = &self.license_key {
            cmd = cmd.env(self.config.license.env_var.clone(), key.expose_secret().to_string());
        }
        cmd
    }

    /// `argv` wrapped to run inside the active environment.
    pub fn in_environment<S: AsRef<str>>(&self, argv: &[S]) -> Result<CommandSpec> {
        let env = self.environment.as_deref().ok_or_else(|| {
            SetupError::EnvironmentNotFound("no environment has been activated".to_string())
        })?;
        Ok(self
            .command(self.base_tool())
            .args(["run", "--no-capture-output", "-n", env])
            .args(argv.iter().map(|a| a.as_ref().to_string())))
    }
}
