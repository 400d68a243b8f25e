//! MODELLER license key resolution.
//!
//! Lookup order: the configured environment variable, a secret file, then an
//! interactive prompt when a person is at the terminal. The key is not
//! validated here; a bad key surfaces when MODELLER first runs.

use pmhc_common::{Result, SetupError};
use secrecy::SecretString;
use std::path::{Path, PathBuf};

/// Interactive fallback for the key.
pub trait KeyPrompt: Send + Sync {
    fn is_attended(&self) -> bool;
    fn read_key(&self, prompt: &str) -> Result<String>;
}

/// Hidden-input prompt on the controlling terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl KeyPrompt for TerminalPrompt {
    fn is_attended(&self) -> bool {
        console::user_attended()
    }

    fn read_key(&self, prompt: &str) -> Result<String> {
        dialoguer::Password::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
            .map_err(|e| SetupError::LicenseUnavailable(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    Environment(String),
    SecretFile(PathBuf),
    Prompt,
}

impl std::fmt::Display for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeySource::Environment(var) => write!(f, "${var}"),
            KeySource::SecretFile(path) => write!(f, "{}", path.display()),
            KeySource::Prompt => write!(f, "interactive prompt"),
        }
    }
}

pub const PROMPT: &str = "Enter your MODELLER license key";

pub fn resolve_license_key(
    env_var: &str,
    env_value: Option<&str>,
    secret_file: Option<&Path>,
    prompt: &dyn KeyPrompt,
) -> Result<(SecretString, KeySource)> {
    if let Some(value) = env_value.filter(|v| !v.is_empty()) {
        return Ok((SecretString::from(value.to_string()), KeySource::Environment(env_var.to_string())));
    }

    if let Some(path) = secret_file {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SetupError::LicenseUnavailable(format!("cannot read {}: {e}", path.display()))
        })?;
        let key = content.lines().next().unwrap_or_default().trim().to_string();
        return Ok((SecretString::from(key), KeySource::SecretFile(path.to_path_buf())));
    }

    if prompt.is_attended() {
        let key = prompt.read_key(PROMPT)?;
        return Ok((SecretString::from(key.trim().to_string()), KeySource::Prompt));
    }

    Err(SetupError::LicenseUnavailable(format!(
        "set {env_var}, pass --license-file, or run from an interactive terminal"
    )))
}
