use std::collections::HashMap;

use zensync::fs::LocalFs;

use crate::{key, options, Fixture};

#[tokio::test]
async fn test_local_newer_uploads() {
    let fx = Fixture::new();
    fx.write_roaming("prefs.js", b"local edit", 1_700_000_200);
    fx.store
        .insert(&key("roaming/prefs.js"), b"remote", 1_700_000_100, HashMap::new());

    let report = fx.engine().sync(options(false, true, false)).await.unwrap();

    assert_eq!(report.summary.uploads.count, 1);
    assert_eq!(report.summary.downloads.count, 0);
    assert_eq!(fx.store.data(&key("roaming/prefs.js")).unwrap(), b"local edit");
}

#[tokio::test]
async fn test_remote_newer_downloads() {
    let fx = Fixture::new();
    let path = fx.write_roaming("prefs.js", b"stale", 1_700_000_100);
    fx.store
        .insert(&key("roaming/prefs.js"), b"fresh remote", 1_700_000_200, HashMap::new());

    let report = fx.engine().sync(options(false, true, false)).await.unwrap();

    assert_eq!(report.summary.downloads.count, 1);
    assert_eq!(std::fs::read(path).unwrap(), b"fresh remote");
}

#[tokio::test]
async fn test_equal_mtime_favors_remote() {
    let fx = Fixture::new();
    let path = fx.write_roaming("prefs.js", b"local", 1_700_000_000);
    fx.store
        .insert(&key("roaming/prefs.js"), b"remote!", 1_700_000_000, HashMap::new());

    let report = fx.engine().sync(options(false, true, false)).await.unwrap();

    assert_eq!(report.summary.downloads.count, 1);
    assert_eq!(report.summary.uploads.count, 0);
    assert_eq!(std::fs::read(path).unwrap(), b"remote!");
}

#[tokio::test]
async fn test_one_sided_entries_are_copied_across() {
    let fx = Fixture::new();
    fx.write_roaming("only-local.js", b"l", 1_700_000_000);
    fx.store
        .insert(&key("roaming/only-remote.js"), b"r", 1_700_000_000, HashMap::new());

    let report = fx.engine().sync(options(false, true, false)).await.unwrap();

    assert_eq!(report.summary.uploads.count, 1);
    assert_eq!(report.summary.downloads.count, 1);
    assert!(fx.store.contains(&key("roaming/only-local.js")));
    assert!(fx.roaming.path().join("only-remote.js").exists());
}

#[tokio::test]
async fn test_sync_after_push_is_quiet() {
    let fx = Fixture::new();
    fx.write_roaming("prefs.js", b"p", 1_700_000_000);
    fx.write_roaming("chrome/userChrome.css", b"css", 1_700_000_000);
    fx.engine().push(options(false, true, false)).await.unwrap();

    let report = fx.engine().sync(options(false, true, false)).await.unwrap();

    assert_eq!(report.summary.skips.count, 2);
    assert_eq!(report.summary.uploads.count, 0);
    assert_eq!(report.summary.downloads.count, 0);
}

#[tokio::test]
async fn test_cleanup_flag_deletes_nothing() {
    let fx = Fixture::new();
    let local = fx.write_roaming("local-only.js", b"l", 1_700_000_000);
    fx.store
        .insert(&key("roaming/remote-only.js"), b"r", 1_700_000_000, HashMap::new());

    let report = fx.engine().sync(options(false, true, true)).await.unwrap();

    assert_eq!(report.summary.deletions.count, 0);
    assert_eq!(fx.store.delete_count(), 0);
    assert!(local.exists());
    assert!(fx.store.contains(&key("roaming/remote-only.js")));
}

#[tokio::test]
async fn test_downloaded_conflict_keeps_original_mtime() {
    let fx = Fixture::new();
    let path = fx.write_roaming("prefs.js", b"old", 1_600_000_000);
    let mut meta = HashMap::new();
    meta.insert("original-mtime".to_string(), "1650000000".to_string());
    fx.store
        .insert(&key("roaming/prefs.js"), b"newer", 1_700_000_000, meta);

    fx.engine().sync(options(false, true, false)).await.unwrap();

    assert_eq!(LocalFs::mtime(&path).unwrap(), 1_650_000_000);
}

#[tokio::test]
async fn test_remote_mtime_is_the_upload_time() {
    let fx = Fixture::new();
    fx.write_roaming("prefs.js", b"first", 1_700_000_000);
    fx.store.set_clock(1_700_000_500);
    fx.engine().push(options(false, true, false)).await.unwrap();

    // Edited after the file's own mtime but before it was uploaded.
    let path = fx.write_roaming("prefs.js", b"older edit", 1_700_000_300);
    let report = fx.engine().sync(options(false, true, false)).await.unwrap();
    assert_eq!(report.summary.downloads.count, 1);
    assert_eq!(std::fs::read(&path).unwrap(), b"first");

    fx.write_roaming("prefs.js", b"newer edit", 1_700_000_900);
    fx.store.set_clock(1_700_001_000);
    let report = fx.engine().sync(options(false, true, false)).await.unwrap();
    assert_eq!(report.summary.uploads.count, 1);
    assert_eq!(fx.store.data(&key("roaming/prefs.js")).unwrap(), b"newer edit");
}

#[tokio::test]
async fn test_remote_only_keys_outside_the_root_are_ignored() {
    let fx = Fixture::new();
    let dir_name = fx.roaming.path().file_name().unwrap().to_string_lossy().into_owned();
    let escaped_name = format!("{}-sync-escaped.txt", dir_name);
    fx.store
        .insert(&key(&format!("roaming/../{}", escaped_name)), b"x", 1, HashMap::new());

    let report = fx.engine().sync(options(false, true, false)).await.unwrap();

    assert_eq!(report.summary.downloads.count, 0);
    assert!(!fx.roaming.path().parent().unwrap().join(&escaped_name).exists());
}
