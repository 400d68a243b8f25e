//! End-to-end runs of the standard bootstrap against fake conda/git/downloads.

use pmhc_bootstrap::digest::sha256_file;
use pmhc_bootstrap::{Bootstrap, StepOutcome};
use pmhc_common::SetupError;
use pmhc_test_utils::{
    affine_zip, healthy_runner, FakeDownloader, FakeRunner, ScriptedPrompt, Workspace,
    TEST_LICENSE_KEY,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn downloader() -> Arc<FakeDownloader> {
    Arc::new(FakeDownloader::serving(affine_zip()))
}

#[tokio::test]
async fn test_fresh_install_populates_workdir() {
    let ws = Workspace::seeded();
    let runner = Arc::new(healthy_runner(&ws));
    let downloader = downloader();
    let mut ctx = ws.context(runner.clone(), downloader.clone());

    let report = Bootstrap::standard().run(&mut ctx).await.expect("bootstrap succeeds");

    for dir in ["PANDORA", "AFfine", "ProteinMPNN", "Pep2Vec"] {
        assert!(ws.join(dir).is_dir(), "{dir} missing");
    }
    assert!(ws.join("AFfine.zip").is_file());
    assert_eq!(
        ws.read("PANDORA/PANDORA/Pandora/Modelling_functions.py"),
        ws.read("modified_files/Modelling_functions.py")
    );
    assert_eq!(
        ws.read("PANDORA/PANDORA/Database/Database_functions.py"),
        ws.read("modified_files/Database_functions.py")
    );
    assert_eq!(runner.envs(), vec!["pmhc".to_string()]);
    assert_eq!(ctx.environment.as_deref(), Some("pmhc"));
    assert_eq!(downloader.calls().len(), 1);
    assert_eq!(report.records.len(), 13);
    assert_eq!(report.warnings().count(), 0);

    let lines = runner.command_lines();
    assert!(lines.iter().any(|l| l.starts_with("mamba env create -n pmhc -f ")));
    assert!(lines.iter().any(|l| l.starts_with("mamba env update -n pmhc -f ")));
    assert!(lines.contains(&"conda run --no-capture-output -n pmhc python -m pip install -e PANDORA".to_string()));
    assert!(lines.contains(&"conda run --no-capture-output -n pmhc pandora-fetch".to_string()));
    assert!(lines.contains(&"git lfs pull".to_string()));
}

#[tokio::test]
async fn test_license_key_reaches_child_processes() {
    let ws = Workspace::seeded();
    let runner = Arc::new(healthy_runner(&ws));
    let mut ctx = ws.context(runner.clone(), downloader());

    Bootstrap::standard().run(&mut ctx).await.unwrap();

    let calls = runner.calls();
    assert!(!calls.is_empty());
    for call in calls {
        assert_eq!(call.env_value("KEY_MODELLER"), Some(TEST_LICENSE_KEY), "{}", call.command_line());
        assert_eq!(call.cwd.as_deref().map(|p| p.starts_with(ws.path())), Some(true));
    }
}

#[tokio::test]
async fn test_rerun_skips_guarded_steps() {
    let ws = Workspace::seeded();
    let runner = Arc::new(healthy_runner(&ws));
    let downloader = downloader();

    let mut first = ws.context(runner.clone(), downloader.clone());
    Bootstrap::standard().run(&mut first).await.unwrap();
    let clones_after_first = runner.count_matching("git clone");
    assert_eq!(clones_after_first, 3);

    let mut second = ws.context(runner.clone(), downloader.clone());
    let report = Bootstrap::standard().run(&mut second).await.expect("rerun succeeds");

    assert_eq!(runner.count_matching("git clone"), clones_after_first);
    assert_eq!(runner.count_matching("env create"), 1);
    assert_eq!(downloader.calls().len(), 1);
    // the editable install is not guarded
    assert_eq!(runner.count_matching("pip install -e PANDORA"), 2);

    assert!(matches!(report.outcome("create-environment"), Some(StepOutcome::Skipped(_))));
    assert!(matches!(report.outcome("fetch-affine"), Some(StepOutcome::Skipped(_))));
    assert!(matches!(report.outcome("patch-pandora"), Some(StepOutcome::Skipped(_))));
    assert!(matches!(report.outcome("clone-proteinmpnn"), Some(StepOutcome::Skipped(_))));
    assert!(matches!(report.outcome("install-pandora"), Some(StepOutcome::Done(_))));
}

#[tokio::test]
async fn test_missing_spec_file_warns_then_activation_fails() {
    let ws = Workspace::seeded();
    std::fs::remove_file(ws.join("environment.yml")).unwrap();
    let runner = Arc::new(healthy_runner(&ws));
    let mut ctx = ws.context(runner.clone(), downloader());

    let failure = Bootstrap::standard().run(&mut ctx).await.unwrap_err();

    assert_eq!(failure.step, "activate-environment");
    assert!(matches!(failure.error, SetupError::EnvironmentNotFound(ref name) if name == "pmhc"));
    assert_eq!(runner.count_matching("env create"), 0);
}

#[tokio::test]
async fn test_missing_spec_file_with_existing_environment_continues() {
    let ws = Workspace::seeded();
    std::fs::remove_file(ws.join("environment.yml")).unwrap();
    let runner = Arc::new(healthy_runner(&ws).with_env("pmhc"));
    let mut ctx = ws.context(runner.clone(), downloader());

    let report = Bootstrap::standard().run(&mut ctx).await.expect("bootstrap succeeds");

    assert!(matches!(report.outcome("create-environment"), Some(StepOutcome::Skipped(_))));
    let warned: Vec<_> = report.warnings().map(|r| r.step).collect();
    assert_eq!(warned, vec!["reconcile-environment"]);
    assert_eq!(runner.count_matching("env update"), 0);
}

#[tokio::test]
async fn test_missing_spec_for_new_environment_is_warning() {
    let ws = Workspace::seeded();
    std::fs::remove_file(ws.join("environment.yml")).unwrap();
    let runner = Arc::new(healthy_runner(&ws));
    let mut ctx = ws.context(runner.clone(), downloader());

    let only_create = Bootstrap::new(
        pmhc_bootstrap::steps::standard_steps().into_iter().take(4).collect(),
    );
    let report = only_create.run(&mut ctx).await.expect("missing spec is not fatal");
    match report.outcome("create-environment") {
        Some(StepOutcome::Warned(msg)) => assert!(msg.contains("no spec file")),
        other => panic!("expected warning, got {other:?}"),
    }
}

#[tokio::test]
async fn test_existing_affine_folder_skips_download_and_extraction() {
    let ws = Workspace::seeded();
    ws.write("AFfine/marker.txt", "kept");
    let runner = Arc::new(healthy_runner(&ws));
    let downloader = downloader();
    let mut ctx = ws.context(runner.clone(), downloader.clone());

    let report = Bootstrap::standard().run(&mut ctx).await.unwrap();

    assert!(downloader.calls().is_empty());
    assert!(!ws.join("AFfine.zip").exists());
    assert!(!ws.join("AFfine/run_prediction.py").exists());
    assert_eq!(ws.read("AFfine/marker.txt"), "kept");
    assert!(matches!(report.outcome("fetch-affine"), Some(StepOutcome::Skipped(_))));
}

#[tokio::test]
async fn test_existing_archive_is_extracted_without_download() {
    let ws = Workspace::seeded();
    std::fs::write(ws.join("AFfine.zip"), affine_zip()).unwrap();
    let runner = Arc::new(healthy_runner(&ws));
    let downloader = downloader();
    let mut ctx = ws.context(runner.clone(), downloader.clone());

    Bootstrap::standard().run(&mut ctx).await.unwrap();

    assert!(downloader.calls().is_empty());
    assert!(ws.join("AFfine/run_prediction.py").is_file());
}

#[tokio::test]
async fn test_archive_checksum_mismatch_fails_step() {
    let ws = Workspace::seeded();
    let runner = Arc::new(healthy_runner(&ws));
    let mut ctx = ws.context(runner.clone(), downloader());
    ctx.config.affine.sha256 = Some("0".repeat(64));

    let failure = Bootstrap::standard().run(&mut ctx).await.unwrap_err();

    assert_eq!(failure.step, "fetch-affine");
    assert!(matches!(failure.error, SetupError::ChecksumMismatch { .. }));
    assert!(!ws.join("AFfine").exists());
    assert!(!ws.join("AFfine.zip").exists());
}

#[tokio::test]
async fn test_rejected_archive_is_fetched_again_on_rerun() {
    let ws = Workspace::seeded();
    let runner = Arc::new(healthy_runner(&ws));
    let downloader = downloader();

    for _ in 0..2 {
        let mut ctx = ws.context(runner.clone(), downloader.clone());
        ctx.config.affine.sha256 = Some("0".repeat(64));
        let failure = Bootstrap::standard().run(&mut ctx).await.unwrap_err();
        assert_eq!(failure.step, "fetch-affine");
        assert!(matches!(failure.error, SetupError::ChecksumMismatch { .. }));
    }

    assert_eq!(downloader.calls().len(), 2);
    assert!(!ws.join("AFfine.zip").exists());
}

#[tokio::test]
async fn test_stale_archive_is_replaced_when_checksum_fails() {
    let ws = Workspace::seeded();
    std::fs::write(ws.join("AFfine.zip"), b"truncated download").unwrap();
    let good = ws.join("good.zip");
    std::fs::write(&good, affine_zip()).unwrap();
    let expected = sha256_file(&good).unwrap();

    let runner = Arc::new(healthy_runner(&ws));
    let downloader = downloader();
    let mut ctx = ws.context(runner.clone(), downloader.clone());
    ctx.config.affine.sha256 = Some(expected);

    let report = Bootstrap::standard().run(&mut ctx).await.expect("bootstrap succeeds");

    assert_eq!(downloader.calls().len(), 1);
    assert!(ws.join("AFfine/run_prediction.py").is_file());
    assert!(matches!(report.outcome("fetch-affine"), Some(StepOutcome::Done(_))));
}

#[tokio::test]
async fn test_missing_pep2vec_asset_is_distinct_failure() {
    let ws = Workspace::seeded();
    let runner = Arc::new(
        FakeRunner::new()
            .with_program("mamba")
            .with_clone_files(
                "https://github.com/X-lab-3D/PANDORA.git",
                &pmhc_test_utils::pandora_clone_files(),
            ),
    );
    let mut ctx = ws.context(runner.clone(), downloader());

    let failure = Bootstrap::standard().run(&mut ctx).await.unwrap_err();

    assert_eq!(failure.step, "clone-pep2vec");
    assert!(failure.error.is_missing_asset());
    assert!(ws.join("Pep2Vec").is_dir());
    assert!(ws.join("ProteinMPNN").is_dir());
}

#[tokio::test]
async fn test_lfs_pointer_counts_as_missing_asset() {
    let ws = Workspace::seeded();
    let runner = Arc::new(
        FakeRunner::new()
            .with_clone_files(
                "https://github.com/X-lab-3D/PANDORA.git",
                &pmhc_test_utils::pandora_clone_files(),
            )
            .with_clone_files(
                "https://github.com/Genentech/Pep2Vec.git",
                &[("pep2vec.bin", "version https://git-lfs.github.com/spec/v1\noid sha256:00\n")],
            ),
    );
    let mut ctx = ws.context(runner.clone(), downloader());

    let failure = Bootstrap::standard().run(&mut ctx).await.unwrap_err();
    assert!(failure.error.is_missing_asset());
}

#[tokio::test]
async fn test_command_failure_stops_run_and_keeps_prior_effects() {
    let ws = Workspace::seeded();
    let runner = Arc::new(healthy_runner(&ws).failing_on("pandora-fetch"));
    let downloader = downloader();
    let mut ctx = ws.context(runner.clone(), downloader.clone());

    let failure = Bootstrap::standard().run(&mut ctx).await.unwrap_err();

    assert_eq!(failure.step, "fetch-pandora-data");
    assert!(matches!(failure.error, SetupError::CommandFailed { code: Some(1), .. }));
    assert!(ws.join("PANDORA").is_dir());
    assert_eq!(runner.envs(), vec!["pmhc".to_string()]);
    // nothing after the failing step ran
    assert!(downloader.calls().is_empty());
    assert_eq!(runner.count_matching("ProteinMPNN"), 0);
}

#[tokio::test]
async fn test_conda_used_when_mamba_absent() {
    let ws = Workspace::seeded();
    let runner = Arc::new(
        FakeRunner::new()
            .with_clone_files(
                "https://github.com/X-lab-3D/PANDORA.git",
                &pmhc_test_utils::pandora_clone_files(),
            )
            .with_lfs_file(ws.join("Pep2Vec/pep2vec.bin"), "weights"),
    );
    let mut ctx = ws.context(runner.clone(), downloader());

    let report = Bootstrap::standard().run(&mut ctx).await.unwrap();

    assert_eq!(runner.count_matching("mamba"), 0);
    assert_eq!(runner.count_matching("conda env create -n pmhc"), 1);
    match report.outcome("select-frontend") {
        Some(StepOutcome::Done(msg)) => assert_eq!(msg, "mamba not found, using conda"),
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn test_shell_integration_probes_conda_without_prefix() {
    let ws = Workspace::seeded();
    let runner = Arc::new(healthy_runner(&ws));
    let mut ctx = ws
        .context(runner.clone(), downloader())
        .with_host_env([("KEY_MODELLER".to_string(), "k".to_string())]);

    Bootstrap::standard().run(&mut ctx).await.unwrap();

    assert_eq!(runner.count_matching("conda info --base"), 1);
    assert_eq!(ctx.conda_base.as_deref(), Some(std::path::Path::new("/opt/conda")));
}

#[tokio::test]
async fn test_unattended_run_without_key_fails_first_step() {
    let ws = Workspace::seeded();
    let runner = Arc::new(healthy_runner(&ws));
    let mut ctx = ws
        .context(runner.clone(), downloader())
        .with_host_env([("CONDA_PREFIX".to_string(), "/opt/conda".to_string())]);
    ctx.prompt = Arc::new(ScriptedPrompt::unattended());

    let failure = Bootstrap::standard().run(&mut ctx).await.unwrap_err();

    assert_eq!(failure.step, "collect-license-key");
    assert!(matches!(failure.error, SetupError::LicenseUnavailable(_)));
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn test_prompted_key_is_exported() {
    let ws = Workspace::seeded();
    let runner = Arc::new(healthy_runner(&ws));
    let mut ctx = ws
        .context(runner.clone(), downloader())
        .with_host_env([("CONDA_PREFIX".to_string(), "/opt/conda".to_string())]);
    ctx.prompt = Arc::new(ScriptedPrompt::typing("TYPED-KEY"));

    Bootstrap::standard().run(&mut ctx).await.unwrap();

    let calls = runner.calls();
    assert!(calls.iter().all(|c| c.env_value("KEY_MODELLER") == Some("TYPED-KEY")));
}

#[tokio::test]
async fn test_regular_install_when_editable_disabled() {
    let ws = Workspace::seeded();
    let runner = Arc::new(healthy_runner(&ws));
    let mut ctx = ws.context(runner.clone(), downloader());
    ctx.config.pandora.editable = false;

    Bootstrap::standard().run(&mut ctx).await.unwrap();

    assert_eq!(runner.count_matching("pip install -e"), 0);
    assert_eq!(
        runner.count_matching("conda run --no-capture-output -n pmhc python -m pip install PANDORA"),
        1
    );
}

#[tokio::test]
async fn test_environment_named_like_base_prefix_is_created() {
    let ws = Workspace::seeded();
    let runner = Arc::new(healthy_runner(&ws));
    let mut ctx = ws.context(runner.clone(), downloader());
    // base prefix is /opt/conda
    ctx.config.environment.name = Some("conda".to_string());

    let report = Bootstrap::standard().run(&mut ctx).await.expect("bootstrap succeeds");

    assert_eq!(runner.count_matching("env create -n conda"), 1);
    assert!(matches!(report.outcome("create-environment"), Some(StepOutcome::Done(_))));
}
