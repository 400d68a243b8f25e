//! Configuration for pmhc-setup.
//!
//! `SetupConfig` is read from `pmhc-setup.toml` (or the path in `PMHC_SETUP_CONFIG`);
//! every field has a default, so an absent file yields a working configuration.
//! `EnvironmentFile` reads the conda environment spec the installer creates
//! its environment from.

pub mod environment_file;
pub mod setup;

pub use environment_file::EnvironmentFile;
pub use setup::{
    AffineConfig, EnvironmentConfig, LicenseConfig, NetworkConfig, PandoraConfig, PatchSpec,
    Pep2VecConfig, ReportConfig, RepoConfig, SetupConfig, CONFIG_ENV_VAR, DEFAULT_CONFIG_FILE, FALLBACK_ENVIRONMENT_NAME,
};
