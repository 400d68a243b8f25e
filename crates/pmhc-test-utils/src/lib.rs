//! Fakes for the installer's external seams and temp-workspace fixtures.
//!
//! `FakeRunner` stands in for conda, pip and git: it records every command and
//! simulates the filesystem effects the steps depend on (checkouts appearing
//! after `git clone`, environments after `env create`, LFS files after
//! `git lfs pull`). `FakeDownloader` serves an in-memory archive.

use async_trait::async_trait;
use pmhc_bootstrap::{
    BootstrapContext, CommandOutput, CommandRunner, CommandSpec, Downloader, KeyPrompt,
};
use pmhc_common::{Result, SetupError};
use pmhc_config::SetupConfig;
use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub const TEST_LICENSE_KEY: &str = "MODELIRANJE";

pub const CONDA_BASE: &str = "/opt/conda";

// ── FakeRunner ──────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeRunner {
    calls: Mutex<Vec<CommandSpec>>,
    on_path: Vec<String>,
    envs: Mutex<Vec<String>>,
    failures: Vec<String>,
    clone_files: HashMap<String, Vec<(PathBuf, String)>>,
    lfs_files: Vec<(PathBuf, String)>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `locate(program)` succeed.
    pub fn with_program(mut self, program: &str) -> Self {
        self.on_path.push(program.to_string());
        self
    }

    /// Pretend the named environment already exists.
    pub fn with_env(self, name: &str) -> Self {
        self.envs.lock().unwrap().push(name.to_string());
        self
    }

    /// Fail any command whose command line contains `needle`.
    pub fn failing_on(mut self, needle: &str) -> Self {
        self.failures.push(needle.to_string());
        self
    }

    /// Files (relative to the clone destination) created by `git clone <url>`.
    pub fn with_clone_files(mut self, url: &str, files: &[(&str, &str)]) -> Self {
        self.clone_files.insert(
            url.to_string(),
            files.iter().map(|(p, c)| (PathBuf::from(p), c.to_string())).collect(),
        );
        self
    }

    /// File (absolute) created by `git lfs pull`.
    pub fn with_lfs_file(mut self, path: impl Into<PathBuf>, content: &str) -> Self {
        self.lfs_files.push((path.into(), content.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(CommandSpec::command_line).collect()
    }

    pub fn count_matching(&self, needle: &str) -> usize {
        self.command_lines().iter().filter(|l| l.contains(needle)).count()
    }

    pub fn envs(&self) -> Vec<String> {
        self.envs.lock().unwrap().clone()
    }

    fn resolve(cmd: &CommandSpec, path: &str) -> PathBuf {
        let p = Path::new(path);
        match &cmd.cwd {
            Some(cwd) if p.is_relative() => cwd.join(p),
            _ => p.to_path_buf(),
        }
    }

    fn simulate(&self, cmd: &CommandSpec) -> Result<CommandOutput> {
        let args: Vec<&str> = cmd.args.iter().map(String::as_str).collect();
        let mut out = CommandOutput { code: Some(0), ..CommandOutput::default() };

        match (cmd.program.as_str(), args.as_slice()) {
            (_, ["info", "--base"]) => out.stdout = format!("{CONDA_BASE}\n"),
            (_, ["env", "list", "--json"]) => {
                let mut prefixes = vec![CONDA_BASE.to_string()];
                prefixes.extend(self.envs().iter().map(|e| format!("{CONDA_BASE}/envs/{e}")));
                out.stdout = serde_json::json!({ "envs": prefixes }).to_string();
            }
            (_, ["env", "create", "-n", name, ..]) => {
                self.envs.lock().unwrap().push(name.to_string());
            }
            ("git", ["clone", url, dest]) => {
                let dest = Self::resolve(cmd, dest);
                fs::create_dir_all(dest.join(".git"))?;
                for (rel, content) in self.clone_files.get(*url).into_iter().flatten() {
                    let path = dest.join(rel);
                    if let Some(parent) = path.parent() {
                        fs::create_dir_all(parent)?;
                    }
                    fs::write(path, content)?;
                }
            }
            ("git", ["lfs", "pull"]) => {
                let cwd = cmd.cwd.clone().unwrap_or_default();
                for (path, content) in &self.lfs_files {
                    if path.starts_with(&cwd) {
                        fs::write(path, content)?;
                    }
                }
            }
            _ => {}
        }
        Ok(out)
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, cmd: &CommandSpec) -> Result<CommandOutput> {
        self.calls.lock().unwrap().push(cmd.clone());

        let line = cmd.command_line();
        if self.failures.iter().any(|needle| line.contains(needle.as_str())) {
            return Err(SetupError::CommandFailed {
                program: cmd.program.clone(),
                code: Some(1),
                stderr: "simulated failure".to_string(),
            });
        }
        self.simulate(cmd)
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        self.on_path
            .iter()
            .find(|p| p.as_str() == program)
            .map(|p| PathBuf::from("/usr/local/bin").join(p))
    }
}

// ── FakeDownloader ──────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeDownloader {
    payload: Vec<u8>,
    calls: Mutex<Vec<String>>,
}

impl FakeDownloader {
    pub fn serving(payload: Vec<u8>) -> Self {
        Self { payload, calls: Mutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Downloader for FakeDownloader {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64> {
        self.calls.lock().unwrap().push(url.to_string());
        fs::write(dest, &self.payload)?;
        Ok(self.payload.len() as u64)
    }
}

/// In-memory zip holding `entries` (name, contents).
pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in entries {
        writer
            .start_file(*name, zip::write::SimpleFileOptions::default())
            .expect("start zip entry");
        writer.write_all(body.as_bytes()).expect("write zip entry");
    }
    writer.finish().expect("finish zip").into_inner()
}

// ── Prompt ──────────────────────────────────────────────────────────────────

pub struct ScriptedPrompt {
    pub attended: bool,
    pub key: String,
}

impl ScriptedPrompt {
    pub fn unattended() -> Self {
        Self { attended: false, key: String::new() }
    }

    pub fn typing(key: &str) -> Self {
        Self { attended: true, key: key.to_string() }
    }
}

impl KeyPrompt for ScriptedPrompt {
    fn is_attended(&self) -> bool {
        self.attended
    }

    fn read_key(&self, _prompt: &str) -> Result<String> {
        Ok(self.key.clone())
    }
}

// ── Workspace fixture ───────────────────────────────────────────────────────

pub const ENVIRONMENT_YML: &str = "name: pmhc\nchannels:\n  - conda-forge\ndependencies:\n  - python=3.10\n  - pip\n";

/// Temp working directory seeded with the installer's local inputs.
pub struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    /// Empty directory.
    pub fn empty() -> Self {
        Self { dir: tempfile::tempdir().expect("create temp workspace") }
    }

    /// `environment.yml` plus the two PANDORA override files.
    pub fn seeded() -> Self {
        let ws = Self::empty();
        ws.write("environment.yml", ENVIRONMENT_YML);
        for patch in SetupConfig::default().pandora.patches {
            ws.write(&patch.source.to_string_lossy(), &format!("# patched {}\n", patch.source.display()));
        }
        ws
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn write(&self, rel: &str, content: &str) {
        let path = self.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(path, content).expect("write fixture file");
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.join(rel)).expect("read workspace file")
    }

    /// Context with the license key in the environment and conda initialised.
    pub fn context(
        &self,
        runner: Arc<FakeRunner>,
        downloader: Arc<FakeDownloader>,
    ) -> BootstrapContext {
        BootstrapContext::new(
            SetupConfig::default(),
            self.path(),
            runner,
            downloader,
            Arc::new(ScriptedPrompt::unattended()),
        )
        .with_host_env([
            ("KEY_MODELLER".to_string(), TEST_LICENSE_KEY.to_string()),
            ("CONDA_PREFIX".to_string(), CONDA_BASE.to_string()),
        ])
    }
}

/// Upstream files the default overrides replace, as created by a PANDORA clone.
pub fn pandora_clone_files() -> Vec<(&'static str, &'static str)> {
    vec![
        ("PANDORA/Pandora/Modelling_functions.py", "# upstream modelling\n"),
        ("PANDORA/Database/Database_functions.py", "# upstream database\n"),
    ]
}

/// A runner that behaves like a healthy machine for a fresh install in `ws`.
pub fn healthy_runner(ws: &Workspace) -> FakeRunner {
    let config = SetupConfig::default();
    FakeRunner::new()
        .with_program("mamba")
        .with_clone_files(&config.pandora.url, &pandora_clone_files())
        .with_lfs_file(
            ws.path().join(&config.pep2vec.dir).join(&config.pep2vec.required_asset),
            "binary weights",
        )
}

pub fn affine_zip() -> Vec<u8> {
    zip_bytes(&[("AFfine/run_prediction.py", "print('affine')\n"), ("AFfine/README.md", "AFfine\n")])
}
