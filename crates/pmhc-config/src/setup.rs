//! Installer configuration.
//! Reads pmhc-setup.toml from the working directory or the path in PMHC_SETUP_CONFIG.

use pmhc_common::{Result, SetupError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming an alternative config file.
pub const CONFIG_ENV_VAR: &str = "PMHC_SETUP_CONFIG";

/// Config file looked up in the working directory when nothing else is given.
pub const DEFAULT_CONFIG_FILE: &str = "pmhc-setup.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupConfig {
    #[serde(default)]
    pub environment: EnvironmentConfig,
    #[serde(default)]
    pub license: LicenseConfig,
    #[serde(default)]
    pub pandora: PandoraConfig,
    #[serde(default)]
    pub affine: AffineConfig,
    #[serde(default = "default_proteinmpnn")]
    pub proteinmpnn: RepoConfig,
    #[serde(default)]
    pub pep2vec: Pep2VecConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            environment: EnvironmentConfig::default(),
            license: LicenseConfig::default(),
            pandora: PandoraConfig::default(),
            affine: AffineConfig::default(),
            proteinmpnn: default_proteinmpnn(),
            pep2vec: Pep2VecConfig::default(),
            network: NetworkConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

// ── Package-manager environment ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Overrides the `name:` key of the spec file.
    pub name: Option<String>,
    #[serde(default = "default_spec_file")]
    pub spec_file: PathBuf,
    #[serde(default = "default_preferred_frontend")]
    pub preferred_frontend: String,
    #[serde(default = "default_fallback_frontend")]
    pub fallback_frontend: String,
}

fn default_spec_file()          -> PathBuf { PathBuf::from("environment.yml") }
fn default_preferred_frontend() -> String  { "mamba".to_string() }
fn default_fallback_frontend()  -> String  { "conda".to_string() }

/// Used when neither the config nor the spec file names the environment.
pub const FALLBACK_ENVIRONMENT_NAME: &str = "pmhc";

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            name: None,
            spec_file: default_spec_file(),
            preferred_frontend: default_preferred_frontend(),
            fallback_frontend: default_fallback_frontend(),
        }
    }
}

// ── License key ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseConfig {
    /// Variable read at startup and exported to every child process.
    #[serde(default = "default_license_env_var")]
    pub env_var: String,
    /// File holding the key on its first line.
    pub secret_file: Option<PathBuf>,
}

fn default_license_env_var() -> String { "KEY_MODELLER".to_string() }

impl Default for LicenseConfig {
    fn default() -> Self {
        Self { env_var: default_license_env_var(), secret_file: None }
    }
}

// ── Git checkouts ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoConfig {
    pub url: String,
    pub dir: PathBuf,
}

fn default_proteinmpnn() -> RepoConfig {
    RepoConfig {
        url: "https://github.com/dauparas/ProteinMPNN.git".to_string(),
        dir: PathBuf::from("ProteinMPNN"),
    }
}

/// A local override copied over a file inside a checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchSpec {
    pub source: PathBuf,
    pub target: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PandoraConfig {
    #[serde(default = "default_pandora_url")]
    pub url: String,
    #[serde(default = "default_pandora_dir")]
    pub dir: PathBuf,
    /// `pip install -e` rather than a regular install.
    #[serde(default = "default_editable")]
    pub editable: bool,
    /// Command (inside the environment) that downloads PANDORA's template data.
    #[serde(default = "default_fetch_command")]
    pub fetch_command: Vec<String>,
    #[serde(default = "default_patches")]
    pub patches: Vec<PatchSpec>,
}

fn default_pandora_url()   -> String       { "https://github.com/X-lab-3D/PANDORA.git".to_string() }
fn default_pandora_dir()   -> PathBuf      { PathBuf::from("PANDORA") }
fn default_editable()      -> bool         { true }
fn default_fetch_command() -> Vec<String>  { vec!["pandora-fetch".to_string()] }

fn default_patches() -> Vec<PatchSpec> {
    vec![
        PatchSpec {
            source: PathBuf::from("modified_files/Modelling_functions.py"),
            target: PathBuf::from("PANDORA/PANDORA/Pandora/Modelling_functions.py"),
        },
        PatchSpec {
            source: PathBuf::from("modified_files/Database_functions.py"),
            target: PathBuf::from("PANDORA/PANDORA/Database/Database_functions.py"),
        },
    ]
}

impl Default for PandoraConfig {
    fn default() -> Self {
        Self {
            url: default_pandora_url(),
            dir: default_pandora_dir(),
            editable: default_editable(),
            fetch_command: default_fetch_command(),
            patches: default_patches(),
        }
    }
}

impl PandoraConfig {
    pub fn repo(&self) -> RepoConfig {
        RepoConfig { url: self.url.clone(), dir: self.dir.clone() }
    }
}

// ── AFfine archive ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffineConfig {
    #[serde(default = "default_affine_url")]
    pub url: String,
    #[serde(default = "default_affine_archive")]
    pub archive: PathBuf,
    /// Folder whose presence marks the archive as installed.
    #[serde(default = "default_affine_dir")]
    pub dir: PathBuf,
    /// Hex SHA-256 of the archive, checked after download when set.
    pub sha256: Option<String>,
}

fn default_affine_url()     -> String  { "https://zenodo.org/records/13318745/files/AFfine.zip".to_string() }
fn default_affine_archive() -> PathBuf { PathBuf::from("AFfine.zip") }
fn default_affine_dir()     -> PathBuf { PathBuf::from("AFfine") }

impl Default for AffineConfig {
    fn default() -> Self {
        Self {
            url: default_affine_url(),
            archive: default_affine_archive(),
            dir: default_affine_dir(),
            sha256: None,
        }
    }
}

// ── Pep2Vec ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pep2VecConfig {
    #[serde(default = "default_pep2vec_url")]
    pub url: String,
    #[serde(default = "default_pep2vec_dir")]
    pub dir: PathBuf,
    /// LFS-tracked file that must exist after the pull, relative to `dir`.
    #[serde(default = "default_pep2vec_asset")]
    pub required_asset: PathBuf,
}

fn default_pep2vec_url()   -> String  { "https://github.com/Genentech/Pep2Vec.git".to_string() }
fn default_pep2vec_dir()   -> PathBuf { PathBuf::from("Pep2Vec") }
fn default_pep2vec_asset() -> PathBuf { PathBuf::from("pep2vec.bin") }

impl Default for Pep2VecConfig {
    fn default() -> Self {
        Self {
            url: default_pep2vec_url(),
            dir: default_pep2vec_dir(),
            required_asset: default_pep2vec_asset(),
        }
    }
}

impl Pep2VecConfig {
    pub fn repo(&self) -> RepoConfig {
        RepoConfig { url: self.url.clone(), dir: self.dir.clone() }
    }
}

// ── Network / report ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub extra_allowed_hosts: Vec<String>,
}

fn default_timeout_secs() -> u64 { 3600 }

impl Default for NetworkConfig {
    fn default() -> Self {
        Self { timeout_secs: default_timeout_secs(), extra_allowed_hosts: Vec::new() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Where failure diagnostics point users.
    pub issues_url: Option<String>,
}


impl SetupConfig {
    /// Picks the config file: explicit path, then `PMHC_SETUP_CONFIG`, then
    /// `pmhc-setup.toml` under `workdir`.
    pub fn resolve_path(explicit: Option<&Path>, workdir: &Path) -> PathBuf {
        if let Some(p) = explicit {
            return p.to_path_buf();
        }
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(p) if !p.is_empty() => PathBuf::from(p),
            _ => workdir.join(DEFAULT_CONFIG_FILE),
        }
    }

    /// Parse a config file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SetupConfig = toml::from_str(&content)?;
        debug!(path = %path.display(), "Parsed setup config");
        Ok(config)
    }

    /// Load configuration, falling back to defaults when no file exists.
    /// An explicitly requested file that is missing is an error.
    pub fn load(explicit: Option<&Path>, workdir: &Path) -> Result<Self> {
        let path = Self::resolve_path(explicit, workdir);
        if path.exists() {
            return Self::load_from(&path);
        }
        if explicit.is_some() {
            return Err(SetupError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        info!(path = %path.display(), "No config file found, using built-in defaults");
        Ok(Self::default())
    }

    /// Environment name: explicit config, then the spec file's `name:`, then "pmhc".
    pub fn environment_name(&self, spec_name: Option<&str>) -> String {
        self.environment
            .name
            .as_deref()
            .or(spec_name)
            .unwrap_or(FALLBACK_ENVIRONMENT_NAME)
            .to_string()
    }
}
