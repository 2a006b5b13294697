use std::collections::HashMap;

use zensync::config::Settings;
use zensync::fs::{MemoryStore, META_FILE_HASH, META_ORIGINAL_MTIME};

use crate::{key, options, Fixture};

#[tokio::test]
async fn test_new_file_is_uploaded_once() {
    let fx = Fixture::new();
    fx.write_roaming("prefs.js", &[b'p'; 100], 1_700_000_000);

    let report = fx.engine().push(options(false, true, false)).await.unwrap();

    assert!(report.success());
    assert_eq!(report.summary.uploads.count, 1);
    assert_eq!(report.summary.uploads.bytes, 100);
    assert_eq!(report.summary.skips.count, 0);
    assert_eq!(fx.store.keys(), vec![key("roaming/prefs.js")]);

    let meta = fx.store.metadata(&key("roaming/prefs.js")).unwrap();
    assert_eq!(meta[META_ORIGINAL_MTIME], "1700000000");
    assert!(!meta[META_FILE_HASH].is_empty());
}

#[tokio::test]
async fn test_second_push_skips_everything() {
    let fx = Fixture::new();
    fx.write_roaming("abc.default/prefs.js", b"user_pref(1);", 1_700_000_000);
    fx.write_roaming("abc.default/extensions.json", b"{}", 1_700_000_000);
    fx.write_roaming("profiles.ini", b"[Profile0]\nName=x\n", 1_700_000_000);

    let first = fx.engine().push(options(false, true, false)).await.unwrap();
    assert_eq!(first.summary.uploads.count, 3);
    assert_eq!(fx.store.write_count(), 3);

    let second = fx.engine().push(options(false, true, false)).await.unwrap();
    assert_eq!(second.summary.uploads.count, 0);
    assert_eq!(second.summary.skips.count, 3);
    assert_eq!(fx.store.write_count(), 3);
}

#[tokio::test]
async fn test_force_full_uploads_unchanged_files() {
    let fx = Fixture::new();
    fx.write_roaming("prefs.js", b"same", 1_700_000_000);

    fx.engine().push(options(false, true, false)).await.unwrap();
    let report = fx.engine().push(options(false, false, false)).await.unwrap();

    assert_eq!(report.summary.uploads.count, 1);
    assert_eq!(fx.store.write_count(), 2);
}

#[tokio::test]
async fn test_same_size_edit_detected_by_hash() {
    let fx = Fixture::new();
    fx.write_roaming("prefs.js", b"aaaa", 1_700_000_000);
    fx.engine().push(options(false, true, false)).await.unwrap();

    fx.write_roaming("prefs.js", b"bbbb", 1_700_000_100);
    let report = fx.engine().push(options(false, true, false)).await.unwrap();

    assert_eq!(report.summary.uploads.count, 1);
    assert_eq!(fx.store.data(&key("roaming/prefs.js")).unwrap(), b"bbbb");
}

#[tokio::test]
async fn test_excluded_files_never_leave_the_machine() {
    let fx = Fixture::new();
    fx.write_roaming("abc.default/prefs.js", b"p", 1_700_000_000);
    fx.write_roaming("abc.default/parent.lock", b"l", 1_700_000_000);
    fx.write_roaming("abc.default/places.sqlite-wal", b"w", 1_700_000_000);
    fx.write_roaming("cache2/entries/ABC", b"c", 1_700_000_000);

    fx.engine().push(options(false, true, false)).await.unwrap();

    assert_eq!(fx.store.keys(), vec![key("roaming/abc.default/prefs.js")]);
}

#[tokio::test]
async fn test_cache_data_needs_cache_sync() {
    let fx = Fixture::new();
    fx.write_roaming("prefs.js", b"p", 1_700_000_000);
    fx.write_local("abc.default/data.bin", b"d", 1_700_000_000);

    fx.engine().push(options(false, true, false)).await.unwrap();
    assert_eq!(fx.store.keys(), vec![key("roaming/prefs.js")]);

    fx.engine_with(|s| s.sync.sync_cache_data = true)
        .push(options(false, true, false))
        .await
        .unwrap();
    assert!(fx.store.contains(&key("local/abc.default/data.bin")));
}

#[tokio::test]
async fn test_dry_run_changes_nothing() {
    let fx = Fixture::new();
    fx.store
        .insert(&key("roaming/orphan.js"), b"o", 1_600_000_000, HashMap::new());
    let a = fx.write_roaming("a.js", b"a", 1_700_000_000);
    let b = fx.write_roaming("b.js", b"b", 1_700_000_000);

    let report = fx.engine().push(options(true, true, true)).await.unwrap();

    assert!(report.dry_run);
    assert_eq!(report.summary.uploads.count, 2);
    assert_eq!(report.summary.deletions.count, 1);
    assert_eq!(fx.store.keys(), vec![key("roaming/orphan.js")]);
    assert_eq!(fx.store.write_count(), 0);
    assert_eq!(fx.store.delete_count(), 0);
    assert_eq!(std::fs::read(a).unwrap(), b"a");
    assert_eq!(std::fs::read(b).unwrap(), b"b");
}

#[tokio::test]
async fn test_cleanup_removes_remote_orphans() {
    let fx = Fixture::new();
    fx.write_roaming("prefs.js", b"p", 1_700_000_000);
    fx.store
        .insert(&key("roaming/old/removed.js"), b"r", 1_600_000_000, HashMap::new());

    let report = fx.engine().push(options(false, true, true)).await.unwrap();

    assert!(report.success());
    assert_eq!(report.summary.deletions.count, 1);
    assert_eq!(fx.store.keys(), vec![key("roaming/prefs.js")]);
}

#[tokio::test]
async fn test_cleanup_spares_excluded_and_unsynced_objects() {
    let fx = Fixture::new();
    fx.write_roaming("prefs.js", b"p", 1_700_000_000);
    fx.write_roaming("cache2/data.db", b"local cache", 1_700_000_000);
    fx.store
        .insert(&key("roaming/cache2/data.db"), b"remote cache", 1_600_000_000, HashMap::new());
    fx.store
        .insert(&key("local/abc.default/startupCache/s.bin"), b"s", 1_600_000_000, HashMap::new());

    let report = fx.engine().push(options(false, true, true)).await.unwrap();

    assert_eq!(report.summary.deletions.count, 0);
    assert_eq!(
        fx.store.data(&key("roaming/cache2/data.db")).unwrap(),
        b"remote cache"
    );
    assert!(fx.store.contains(&key("local/abc.default/startupCache/s.bin")));
}

#[tokio::test]
async fn test_empty_roaming_root_is_a_no_op() {
    let fx = Fixture::new();

    let report = fx.engine().push(options(false, true, true)).await.unwrap();

    assert!(report.success());
    assert_eq!(report.summary.uploads.count, 0);
    assert!(fx.store.keys().is_empty());
}

#[tokio::test]
async fn test_metadata_rejection_falls_back_and_persists() {
    let fx = Fixture::with_store(MemoryStore::rejecting_metadata());
    fx.settings().save().unwrap();
    fx.write_roaming("a.js", b"a", 1_700_000_000);
    fx.write_roaming("b.js", b"b", 1_700_000_000);

    let mut engine = fx.engine();
    let report = engine.push(options(false, true, false)).await.unwrap();

    assert!(report.success());
    assert_eq!(report.stats.succeeded, 2);
    assert_eq!(fx.store.write_count(), 2);
    assert!(fx.store.metadata(&key("roaming/a.js")).unwrap().is_empty());
    assert!(engine.context().settings.aws.disable_metadata);
    assert!(Settings::load(fx.config_path()).aws.disable_metadata);
}

#[tokio::test]
async fn test_metadata_disabled_compares_by_size() {
    let fx = Fixture::new();
    fx.write_roaming("prefs.js", b"aaaa", 1_700_000_000);
    let with_flag = |s: &mut Settings| s.aws.disable_metadata = true;

    fx.engine_with(with_flag).push(options(false, true, false)).await.unwrap();
    assert!(fx.store.metadata(&key("roaming/prefs.js")).unwrap().is_empty());

    // Same size, different bytes: invisible without hashes.
    fx.write_roaming("prefs.js", b"bbbb", 1_700_000_100);
    let report = fx.engine_with(with_flag).push(options(false, true, false)).await.unwrap();
    assert_eq!(report.summary.skips.count, 1);
    assert_eq!(report.summary.uploads.count, 0);
}
