use std::collections::HashMap;

use zensync::fs::{LocalFs, META_FILE_HASH, META_ORIGINAL_MTIME};
use zensync::sync::{hash_bytes, HashType};

use crate::{key, options, Fixture};

fn metadata_for(data: &[u8], mtime: i64) -> HashMap<String, String> {
    let mut meta = HashMap::new();
    meta.insert(META_ORIGINAL_MTIME.to_string(), mtime.to_string());
    meta.insert(META_FILE_HASH.to_string(), hash_bytes(data, HashType::Md5));
    meta
}

#[tokio::test]
async fn test_pull_restores_files_and_mtimes() {
    let fx = Fixture::new();
    let data = b"user_pref(\"a\", 1);";
    fx.store.insert(
        &key("roaming/abc.default/prefs.js"),
        data,
        1_700_000_500,
        metadata_for(data, 1_650_000_000),
    );

    let report = fx.engine().pull(options(false, true, false)).await.unwrap();

    assert!(report.success());
    assert_eq!(report.summary.downloads.count, 1);
    let path = fx.roaming.path().join("abc.default").join("prefs.js");
    assert_eq!(std::fs::read(&path).unwrap(), data);
    assert_eq!(LocalFs::mtime(&path).unwrap(), 1_650_000_000);
}

#[tokio::test]
async fn test_pull_skips_identical_files() {
    let fx = Fixture::new();
    let data = b"same content";
    fx.write_roaming("prefs.js", data, 1_700_000_000);
    fx.store
        .insert(&key("roaming/prefs.js"), data, 1_700_000_000, metadata_for(data, 1_700_000_000));

    let report = fx.engine().pull(options(false, true, false)).await.unwrap();

    assert_eq!(report.summary.downloads.count, 0);
    assert_eq!(report.summary.skips.count, 1);
}

#[tokio::test]
async fn test_force_full_pull_downloads_anyway() {
    let fx = Fixture::new();
    let data = b"same content";
    fx.write_roaming("prefs.js", data, 1_700_000_000);
    fx.store
        .insert(&key("roaming/prefs.js"), data, 1_700_000_000, metadata_for(data, 1_700_000_000));

    let report = fx.engine().pull(options(false, false, false)).await.unwrap();

    assert_eq!(report.summary.downloads.count, 1);
}

#[tokio::test]
async fn test_cache_keys_ignored_without_cache_sync() {
    let fx = Fixture::new();
    fx.store.insert(&key("roaming/prefs.js"), b"p", 1, HashMap::new());
    fx.store
        .insert(&key("local/abc.default/startupCache/s.bin"), b"s", 1, HashMap::new());

    let report = fx.engine().pull(options(false, true, false)).await.unwrap();

    assert_eq!(report.summary.downloads.count, 1);
    assert!(!fx.local.path().join("abc.default").exists());

    let report = fx
        .engine_with(|s| s.sync.sync_cache_data = true)
        .pull(options(false, true, false))
        .await
        .unwrap();
    assert_eq!(report.summary.downloads.count, 1);
    assert!(fx
        .local
        .path()
        .join("abc.default/startupCache/s.bin")
        .exists());
}

#[tokio::test]
async fn test_unsegmented_keys_land_under_roaming_root() {
    let fx = Fixture::new();
    fx.store.insert(&key("installs.ini"), b"[Install]\n", 1, HashMap::new());

    fx.engine().pull(options(false, true, false)).await.unwrap();

    assert!(fx.roaming.path().join("installs.ini").exists());
}

#[tokio::test]
async fn test_cleanup_removes_local_orphans_only() {
    let fx = Fixture::new();
    fx.store.insert(&key("roaming/abc.default/prefs.js"), b"p", 1, HashMap::new());
    let orphan = fx.write_roaming("abc.default/old/removed.js", b"gone", 1_700_000_000);
    let lock = fx.write_roaming("abc.default/parent.lock", b"", 1_700_000_000);

    let report = fx.engine().pull(options(false, true, true)).await.unwrap();

    assert!(report.success());
    assert_eq!(report.summary.deletions.count, 1);
    assert!(!orphan.exists());
    assert!(!orphan.parent().unwrap().exists());
    assert!(lock.exists());
    assert!(fx.roaming.path().join("abc.default/prefs.js").exists());
}

#[tokio::test]
async fn test_empty_remote_is_a_no_op() {
    let fx = Fixture::new();
    let kept = fx.write_roaming("prefs.js", b"p", 1_700_000_000);

    let report = fx.engine().pull(options(false, true, true)).await.unwrap();

    assert!(report.success());
    assert_eq!(report.summary.deletions.count, 0);
    assert!(kept.exists());
}

#[tokio::test]
async fn test_dry_run_pull_writes_nothing() {
    let fx = Fixture::new();
    fx.store.insert(&key("roaming/prefs.js"), b"p", 1, HashMap::new());

    let report = fx.engine().pull(options(true, true, false)).await.unwrap();

    assert_eq!(report.summary.downloads.count, 1);
    assert!(!fx.roaming.path().join("prefs.js").exists());
}

#[tokio::test]
async fn test_keys_with_parent_segments_stay_inside_the_root() {
    let fx = Fixture::new();
    let dir_name = fx.roaming.path().file_name().unwrap().to_string_lossy().into_owned();
    let escaped_name = format!("{}-escaped.txt", dir_name);
    fx.store
        .insert(&key(&format!("roaming/../{}", escaped_name)), b"x", 1, HashMap::new());
    fx.store.insert(&key("../outside.txt"), b"x", 1, HashMap::new());
    fx.store.insert(&key("roaming/prefs.js"), b"p", 1, HashMap::new());

    let report = fx.engine().pull(options(false, true, false)).await.unwrap();

    assert!(report.success());
    assert_eq!(report.summary.downloads.count, 1);
    let parent = fx.roaming.path().parent().unwrap();
    assert!(!parent.join(&escaped_name).exists());
    assert!(fx.roaming.path().join("prefs.js").exists());
}
