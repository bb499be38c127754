//! ZIP archive creation and extraction filtered by an inclusion policy.
//!
//! Entries are keyed by forward-slash relative paths so archives round-trip
//! across platforms.

use crate::policy::BackupMode;
use craftsync_core::{Error, Result};
use std::fs::File;
use std::io;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Creates a ZIP of every file under `source_dir` admitted by `mode`.
///
/// Files are visited in a stable sorted order. On any failure the partial
/// archive is deleted before the error is returned.
pub fn create_zip(source_dir: &Path, output_path: &Path, mode: BackupMode) -> Result<usize> {
    debug!("Creating archive {} from {}", output_path.display(), source_dir.display());

    match write_entries(source_dir, output_path, mode) {
        Ok(count) => Ok(count),
        Err(e) => {
            if let Err(remove_err) = std::fs::remove_file(output_path) {
                if remove_err.kind() != io::ErrorKind::NotFound {
                    warn!(
                        "Failed to remove partial archive {}: {}",
                        output_path.display(),
                        remove_err
                    );
                }
            }
            Err(e)
        }
    }
}

fn write_entries(source_dir: &Path, output_path: &Path, mode: BackupMode) -> Result<usize> {
    let file = File::create(output_path)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    let mut count = 0;
    for entry in WalkDir::new(source_dir)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| Error::archive(format!("Failed to walk directory: {}", e)))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(source_dir)
            .map_err(|e| Error::archive(format!("Failed to compute relative path: {}", e)))?;
        let name = relative.to_string_lossy().replace('\\', "/");

        if !mode.includes(&name) {
            continue;
        }

        zip.start_file(&name, options)
            .map_err(|e| Error::archive(format!("Failed to start entry {}: {}", name, e)))?;
        let mut source = File::open(entry.path())?;
        io::copy(&mut source, &mut zip)?;
        count += 1;
    }

    zip.finish()
        .map_err(|e| Error::archive(format!("Failed to finalize archive: {}", e)))?;
    debug!("Archive complete: {} entries", count);
    Ok(count)
}

/// Extracts an archive into `dest_dir`, skipping entries the policy rejects.
///
/// The policy filter is defensive: a mode mismatch at restore time (an
/// archive carrying more than its recorded mode admits) extracts only the
/// admitted subset. Files already present are overwritten; files outside the
/// archive's entry set are left alone.
pub fn extract_zip(archive_path: &Path, dest_dir: &Path, mode: BackupMode) -> Result<usize> {
    debug!("Extracting {} into {}", archive_path.display(), dest_dir.display());

    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| Error::archive(format!("Failed to open archive: {}", e)))?;

    let mut count = 0;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| Error::archive(format!("Failed to read entry {}: {}", i, e)))?;

        let name = entry.name().replace('\\', "/");
        if !mode.includes(&name) {
            debug!("Skipping entry outside policy: {}", name);
            continue;
        }

        // Reject entries that would escape the destination
        let Some(relative) = entry.enclosed_name() else {
            warn!("Skipping unsafe entry name: {}", name);
            continue;
        };
        let out_path = dest_dir.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&out_path)?;
        io::copy(&mut entry, &mut out)?;
        count += 1;
    }

    debug!("Extraction complete: {} files", count);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_file(root: &Path, rel: &str, content: &[u8]) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn sample_server(root: &Path) {
        write_file(root, "server.properties", b"motd=hi");
        write_file(root, "config/mymod.toml", b"[general]");
        write_file(root, "mods/a.jar", &[0xCA, 0xFE, 0xBA, 0xBE]);
        write_file(root, "world/region/r.0.0.mca", &[0u8; 64]);
        write_file(root, "server.jar", &[1u8; 32]);
    }

    #[test]
    fn test_create_zip_filters_by_mode() {
        let source = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        sample_server(source.path());

        let archive = out.path().join("normal.zip");
        let count = create_zip(source.path(), &archive, BackupMode::Normal).unwrap();
        // server.properties + config/mymod.toml
        assert_eq!(count, 2);

        let archive = out.path().join("mods.zip");
        let count = create_zip(source.path(), &archive, BackupMode::NormalPlusMods).unwrap();
        assert_eq!(count, 3);

        let archive = out.path().join("full.zip");
        let count = create_zip(source.path(), &archive, BackupMode::Full).unwrap();
        assert_eq!(count, 5);
    }

    #[test]
    fn test_round_trip_preserves_content() {
        let source = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let restored = TempDir::new().unwrap();
        sample_server(source.path());

        let archive = out.path().join("snapshot.zip");
        create_zip(source.path(), &archive, BackupMode::NormalPlusMods).unwrap();
        let extracted = extract_zip(&archive, restored.path(), BackupMode::NormalPlusMods).unwrap();
        assert_eq!(extracted, 3);

        assert_eq!(
            fs::read(restored.path().join("mods/a.jar")).unwrap(),
            vec![0xCA, 0xFE, 0xBA, 0xBE]
        );
        assert_eq!(
            fs::read(restored.path().join("server.properties")).unwrap(),
            b"motd=hi"
        );
        assert!(!restored.path().join("world").exists());
        assert!(!restored.path().join("server.jar").exists());
    }

    #[test]
    fn test_extract_filters_on_mode_mismatch() {
        let source = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let restored = TempDir::new().unwrap();
        sample_server(source.path());

        // Archive captured with Full, restored under Normal: only config
        // files come out.
        let archive = out.path().join("full.zip");
        create_zip(source.path(), &archive, BackupMode::Full).unwrap();
        let extracted = extract_zip(&archive, restored.path(), BackupMode::Normal).unwrap();
        assert_eq!(extracted, 2);
        assert!(restored.path().join("server.properties").exists());
        assert!(!restored.path().join("mods").exists());
    }

    #[test]
    fn test_extract_overwrites_but_keeps_extras() {
        let source = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        sample_server(source.path());

        let archive = out.path().join("snap.zip");
        create_zip(source.path(), &archive, BackupMode::Normal).unwrap();

        // Mutate and add a file, then extract over the live tree
        write_file(source.path(), "server.properties", b"motd=changed");
        write_file(source.path(), "config/extra.toml", b"new");
        extract_zip(&archive, source.path(), BackupMode::Normal).unwrap();

        assert_eq!(
            fs::read(source.path().join("server.properties")).unwrap(),
            b"motd=hi"
        );
        // Overlay semantics: files outside the archive survive
        assert!(source.path().join("config/extra.toml").exists());
    }

    #[test]
    fn test_failed_create_removes_partial_archive() {
        let out = TempDir::new().unwrap();
        let archive = out.path().join("broken.zip");

        let err = create_zip(Path::new("/nonexistent/source"), &archive, BackupMode::Full);
        assert!(err.is_err());
        assert!(!archive.exists());
    }
}
