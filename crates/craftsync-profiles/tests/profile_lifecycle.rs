//! End-to-end profile engine scenarios: save, diff, restore, delete.

use craftsync_core::Server;
use craftsync_profiles::{BackupMode, ProfileStore};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_file(root: &Path, rel: &str, content: &[u8]) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// A server root with a config file, one mod, and world data.
fn fixture() -> (TempDir, Server, ProfileStore) {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("server");
    write_file(&root, "server.properties", &vec![b'p'; 10]);
    write_file(&root, "mods/a.jar", &vec![0xAA; 128]);
    write_file(&root, "world/region/x.mca", &vec![0u8; 1024 * 1024]);

    let server = Server::new("Lifecycle", root, "1.21.1");
    let store = ProfileStore::new(dir.path().join("profiles"));
    (dir, server, store)
}

#[test]
fn save_then_diff_is_a_noop() {
    let (_dir, server, store) = fixture();

    let profile = store
        .save(&server, "v1", None, BackupMode::NormalPlusMods)
        .unwrap();

    // World data is outside the mode
    assert_eq!(profile.contents.total_file_count, 2);
    assert!(profile.contents.has_mods);
    assert!(!profile.contents.has_world);

    let result = store.detect_changes(&server);
    assert!(!result.has_changes);
    assert_eq!(result.total_changes(), 0);
}

#[test]
fn added_mod_is_reported_until_restored() {
    let (_dir, server, store) = fixture();
    let profile = store
        .save(&server, "v1", None, BackupMode::NormalPlusMods)
        .unwrap();

    write_file(server.root(), "mods/b.jar", &vec![0xBB; 64]);

    let result = store.detect_changes(&server);
    assert_eq!(result.added_files, vec!["mods/b.jar".to_string()]);
    assert!(result.modified_files.is_empty());
    assert!(result.deleted_files.is_empty());
    assert!(store.has_unsaved_changes(&server));

    // Restore overlays the snapshot: the original mod's bytes come back but
    // the new mod is not deleted.
    store.restore(&server, profile.id).unwrap();
    assert_eq!(
        fs::read(server.root().join("mods/a.jar")).unwrap(),
        vec![0xAA; 128]
    );
    assert!(server.root().join("mods/b.jar").exists());
    assert_eq!(store.active(&server).unwrap().id, profile.id);
}

#[test]
fn archive_round_trip_preserves_bytes() {
    let (_dir, server, store) = fixture();
    let profile = store
        .save(&server, "exact", None, BackupMode::Full)
        .unwrap();

    let fresh = TempDir::new().unwrap();
    let archive = store
        .server_profile_dir(&server)
        .join(&profile.archive_filename);
    craftsync_profiles::archive::extract_zip(&archive, fresh.path(), BackupMode::Full).unwrap();

    for rel in ["server.properties", "mods/a.jar", "world/region/x.mca"] {
        assert_eq!(
            fs::read(fresh.path().join(rel)).unwrap(),
            fs::read(server.root().join(rel)).unwrap(),
            "content mismatch for {}",
            rel
        );
    }
}

#[test]
fn multiple_profiles_track_active_pointer() {
    let (_dir, server, store) = fixture();
    let first = store
        .save(&server, "first", None, BackupMode::Normal)
        .unwrap();
    let second = store
        .save(&server, "second", None, BackupMode::NormalPlusMods)
        .unwrap();

    assert_eq!(store.list(&server).len(), 2);
    assert_eq!(store.active(&server).unwrap().id, second.id);

    store.restore(&server, first.id).unwrap();
    assert_eq!(store.active(&server).unwrap().id, first.id);

    // Deleting the active profile clears the pointer
    store.delete(&server, first.id).unwrap();
    assert!(store.active(&server).is_none());
    assert_eq!(store.list(&server).len(), 1);
}

#[test]
fn index_survives_reload() {
    let (_dir, server, store) = fixture();
    let profile = store
        .save(&server, "persisted", Some("notes".to_string()), BackupMode::Normal)
        .unwrap();

    // A fresh store over the same base dir sees the same state
    let reopened = ProfileStore::new(store.base_dir());
    let listed = reopened.list(&server);
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, profile.id);
    assert_eq!(listed[0].description.as_deref(), Some("notes"));
    assert_eq!(listed[0].file_checksums, profile.file_checksums);
}
