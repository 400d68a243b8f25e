use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("`{program}` exited with {}", describe_exit(.code, .stderr))]
    CommandFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Program not found on PATH: {0}")]
    ProgramNotFound(String),

    #[error("Environment not found: {0}")]
    EnvironmentNotFound(String),

    #[error("Required asset missing: {}", .path.display())]
    MissingAsset { path: PathBuf },

    #[error("Checksum mismatch for {}: expected {expected}, got {actual}", .path.display())]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("License key unavailable: {0}")]
    LicenseUnavailable(String),

    #[error("Security error: {0}")]
    Security(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn describe_exit(code: &Option<i32>, stderr: &str) -> String {
    let status = match code {
        Some(c) => format!("status {c}"),
        None => "a signal".to_string(),
    };
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        status
    } else {
        format!("{status}: {trimmed}")
    }
}

impl SetupError {
    /// True for the post-condition failure that gets its own user-facing message.
    pub fn is_missing_asset(&self) -> bool {
        self.missing_asset_path().is_some()
    }

    pub fn missing_asset_path(&self) -> Option<&Path> {
        match self {
            SetupError::MissingAsset { path } => Some(path.as_path()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SetupError>;
