//! User-facing text printed at the end of a run.

use console::style;
use pmhc_config::SetupConfig;
use std::path::Path;

use crate::context::BootstrapContext;
use crate::pipeline::StepFailure;

fn issue_pointer(config: &SetupConfig) -> String {
    match &config.report.issues_url {
        Some(url) => format!("please open an issue at {url}"),
        None => "please open an issue on the project's tracker".to_string(),
    }
}

/// Generic diagnostic for any failed step.
pub fn failure_diagnostic(failure: &StepFailure, config: &SetupConfig) -> String {
    format!(
        "{}\n  step:  {}\n  error: {}\n\n\
         Most installation failures come from package versions in {} that no longer\n\
         resolve on this platform. Check the pins in that file against your conda channels.\n\
         If the problem persists, {} and include the output above.",
        style("Installation failed.").red().bold(),
        failure.step,
        failure.error,
        config.environment.spec_file.display(),
        issue_pointer(config),
    )
}

/// Targeted message for the Pep2Vec model asset missing after the LFS pull.
pub fn missing_asset_warning(path: &Path, config: &SetupConfig) -> String {
    format!(
        "{} {} was not found after `git lfs pull`.\n\
         Make sure git-lfs is installed (`git lfs install`) and that the LFS quota of the\n\
         Pep2Vec repository has not been exceeded, then rerun the installer.\n\
         If the file still does not appear, {}.",
        style("WARNING:").yellow().bold(),
        path.display(),
        issue_pointer(config),
    )
}

/// Text printed to stderr when the run stops: the targeted warning for a missing
/// model asset, the generic diagnostic for everything else.
pub fn failure_message(failure: &StepFailure, config: &SetupConfig) -> String {
    match failure.error.missing_asset_path() {
        Some(path) => missing_asset_warning(path, config),
        None => failure_diagnostic(failure, config),
    }
}

pub fn completion_banner(ctx: &BootstrapContext) -> String {
    let config = &ctx.config;
    let env = ctx.environment_name();
    format!(
        "{}\n\n\
         Installed under {}:\n  {}/  {}/  {}/  {}/\n\n\
         To start working:\n  conda activate {env}\n\n\
         The MODELLER key is only exported for this installer run; set {} in your shell\n\
         profile before running PANDORA.",
        style("Installation completed successfully.").green().bold(),
        ctx.workdir.display(),
        config.pandora.dir.display(),
        config.affine.dir.display(),
        config.proteinmpnn.dir.display(),
        config.pep2vec.dir.display(),
        config.license.env_var,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmhc_common::SetupError;
    use std::path::PathBuf;

    #[test]
    fn test_failure_diagnostic_names_step_and_tracker() {
        let mut config = SetupConfig::default();
        config.report.issues_url = Some("https://example.org/issues".to_string());
        let failure = StepFailure {
            step: "install-pandora",
            error: SetupError::ProgramNotFound("git".to_string()),
        };
        let text = console::strip_ansi_codes(&failure_diagnostic(&failure, &config)).into_owned();
        assert!(text.contains("step:  install-pandora"));
        assert!(text.contains("Program not found on PATH: git"));
        assert!(text.contains("environment.yml"));
        assert!(text.contains("https://example.org/issues"));
    }

    #[test]
    fn test_missing_asset_warning_mentions_path() {
        let text = missing_asset_warning(Path::new("Pep2Vec/pep2vec.bin"), &SetupConfig::default());
        assert!(text.contains("Pep2Vec/pep2vec.bin"));
        assert!(text.contains("git lfs"));
        assert!(!text.contains("Installation failed"));
    }

    #[test]
    fn test_missing_asset_failure_gets_targeted_message() {
        let failure = StepFailure {
            step: "clone-pep2vec",
            error: SetupError::MissingAsset { path: PathBuf::from("/w/Pep2Vec/pep2vec.bin") },
        };
        let text = console::strip_ansi_codes(&failure_message(&failure, &SetupConfig::default()))
            .into_owned();
        assert!(text.starts_with("WARNING:"));
        assert!(text.contains("/w/Pep2Vec/pep2vec.bin"));
        assert!(!text.contains("Installation failed"));
    }

    #[test]
    fn test_other_failures_get_generic_diagnostic() {
        let failure = StepFailure {
            step: "fetch-pandora-data",
            error: SetupError::CommandFailed {
                program: "conda".to_string(),
                code: Some(1),
                stderr: "boom".to_string(),
            },
        };
        let text = console::strip_ansi_codes(&failure_message(&failure, &SetupConfig::default()))
            .into_owned();
        assert!(text.starts_with("Installation failed."));
        assert!(text.contains("step:  fetch-pandora-data"));
        assert!(!text.contains("WARNING:"));
    }
}
