use std::path::PathBuf;

use proptest::prelude::*;
use zensync::config::{DEFAULT_EXCLUDES, DEFAULT_INCLUDES};
use zensync::sync::{Classification, Namespace, PathRole, PatternSet};

fn segments() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[A-Za-z0-9_][A-Za-z0-9._ -]{0,11}", 1..5)
        .prop_filter("no dot-only segments", |segs| {
            segs.iter().all(|s| s.trim_matches('.').len() > 0 && s.trim() == s.as_str())
        })
}

proptest! {
    #[test]
    fn remote_key_maps_back_to_the_same_file(
        segs in segments(),
        local_role in any::<bool>(),
    ) {
        let roaming = PathBuf::from("/home/user/.zen");
        let local = PathBuf::from("/home/user/.cache/zen");
        let ns = Namespace::new("zen-profiles/", roaming.clone(), Some(local.clone()), true);

        let (root, role) = if local_role {
            (local, PathRole::Local)
        } else {
            (roaming, PathRole::Roaming)
        };
        let path = segs.iter().fold(root.clone(), |acc, s| acc.join(s));

        let key = ns.remote_key(&path, &root, role).unwrap();
        let target = ns.local_target(ns.strip_prefix(&key).unwrap()).unwrap();

        prop_assert_eq!(target.path, path);
        prop_assert_eq!(target.root, root);
        prop_assert_eq!(target.role, role);
    }

    #[test]
    fn exclude_beats_include(stem in "[a-z]{1,10}", dir in "[a-z]{1,6}") {
        let patterns = PatternSet::new(&["*.lock"][..], &["*", "*.lock"][..]).unwrap();
        let name = format!("{}.lock", stem);

        prop_assert_eq!(patterns.classify(&name), Classification::Excluded);
        prop_assert_eq!(
            patterns.classify(&format!("{}/{}", dir, name)),
            Classification::Excluded
        );
    }

    #[test]
    fn pruned_directories_hide_only_excluded_files(
        parent in prop::sample::select(vec!["", "Profiles/abc.default/", "x/y/"]),
        top in prop::sample::select(vec!["cache2", "thumbnails", "crashes", "chrome", "abc.default", "logs"]),
        rest in segments(),
    ) {
        let patterns = PatternSet::new(DEFAULT_EXCLUDES, DEFAULT_INCLUDES).unwrap();
        let dir = format!("{}{}", parent, top);
        if patterns.prune_directory(&dir) {
            let file = format!("{}/{}", dir, rest.join("/"));
            prop_assert!(!patterns.include_file(&file));
        }
    }
}
