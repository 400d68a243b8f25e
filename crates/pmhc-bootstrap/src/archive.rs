//! Zip extraction.

use pmhc_common::{Result, SetupError};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Extract every entry of `archive` under `dest_root`, returning the number of
/// files written. Entries whose names escape `dest_root` are skipped.
pub fn extract_zip(archive: &Path, dest_root: &Path) -> Result<usize> {
    let mut zip = zip::ZipArchive::new(File::open(archive)?)?;
    let mut written = 0;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            warn!(name = entry.name(), "Skipping archive entry outside the extraction root");
            continue;
        };
        let out_path = dest_root.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&out_path)?;
        io::copy(&mut entry, &mut out)?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&out_path, fs::Permissions::from_mode(mode))?;
        }
        written += 1;
    }

    debug!(archive = %archive.display(), files = written, "Extracted archive");
    Ok(written)
}

/// [`extract_zip`] on the blocking pool.
pub async fn extract_zip_blocking(archive: PathBuf, dest_root: PathBuf) -> Result<usize> {
    tokio::task::spawn_blocking(move || extract_zip(&archive, &dest_root))
        .await
        .map_err(|e| SetupError::Other(anyhow::anyhow!("extraction task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, body) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_extracts_nested_tree() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("AFfine.zip");
        write_zip(&archive, &[("AFfine/run_prediction.py", "print()"), ("AFfine/params/README", "weights")]);

        let n = extract_zip(&archive, dir.path()).unwrap();
        assert_eq!(n, 2);
        assert_eq!(
            fs::read_to_string(dir.path().join("AFfine/params/README")).unwrap(),
            "weights"
        );
    }

    #[test]
    fn test_skips_entries_escaping_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("root");
        fs::create_dir(&root).unwrap();
        let archive = dir.path().join("evil.zip");
        write_zip(&archive, &[("../escaped.txt", "x"), ("ok.txt", "y")]);

        let n = extract_zip(&archive, &root).unwrap();
        assert_eq!(n, 1);
        assert!(root.join("ok.txt").exists());
        assert!(!dir.path().join("escaped.txt").exists());
    }

    #[test]
    fn test_corrupt_archive_is_zip_error() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("broken.zip");
        fs::write(&archive, "not a zip").unwrap();
        assert!(matches!(extract_zip(&archive, dir.path()), Err(SetupError::Zip(_))));
    }
}
