//! Property-based tests for enumeration and naming.

#![allow(clippy::expect_used)]

use chrono::Local;
use chrono::TimeZone;
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use zipdrop_core::BuildContext;
use zipdrop_core::BundleConfig;
use zipdrop_core::enumerate;
use zipdrop_core::resolve::default_base_name;
use zipdrop_core::resolve_output_path;

fn fixed_ctx(dir: &Path) -> BuildContext {
    let at = Local
        .with_ymd_and_hms(2024, 3, 7, 9, 5, 1)
        .single()
        .expect("unambiguous local time");
    BuildContext::at(dir, BundleConfig::default(), at).expect("valid context")
}

/// Relative file paths, one to three components deep.
fn tree_strategy() -> impl Strategy<Value = BTreeSet<Vec<String>>> {
    prop::collection::btree_set(prop::collection::vec("[a-z][a-z0-9_]{0,6}", 1..4), 0..12)
}

/// Writes `files` below `root`, skipping paths that would need a file to
/// also be a directory.
fn materialize(root: &Path, files: &BTreeSet<Vec<String>>) -> usize {
    let mut written = 0;
    for parts in files {
        let path = parts.iter().fold(root.to_path_buf(), |p, c| p.join(c));
        let parent_ok = path
            .parent()
            .is_some_and(|parent| fs::create_dir_all(parent).is_ok());
        if parent_ok && !path.exists() && fs::write(&path, parts.join("/")).is_ok() {
            written += 1;
        }
    }
    written
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Enumerating the same tree twice yields the same ordered entries.
    #[test]
    fn prop_enumeration_is_deterministic(files in tree_strategy()) {
        let temp = TempDir::new().expect("temp dir");
        let root = temp.path().join("D");
        fs::create_dir(&root).expect("root dir");
        let written = materialize(&root, &files);
        let ctx = fixed_ctx(temp.path());

        let first = enumerate(&ctx, &["D"], false).expect("first walk");
        let second = enumerate(&ctx, &["D"], false).expect("second walk");

        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.len(), written);
        for entry in &first {
            prop_assert!(entry.name.starts_with("D/"));
            prop_assert!(!entry.name.contains('\\'));
        }
    }

    /// Auto-generated names never reuse a taken path.
    #[test]
    fn prop_auto_names_never_collide(taken in 0usize..6, base in "[A-Za-z][A-Za-z0-9_]{0,10}") {
        let temp = TempDir::new().expect("temp dir");
        let ctx = fixed_ctx(temp.path());
        let mut seen = BTreeSet::new();

        for _ in 0..=taken {
            let path = resolve_output_path(&ctx, Some(temp.path()), &base).expect("resolved");
            prop_assert!(!path.exists());
            prop_assert!(seen.insert(path.clone()));
            fs::write(&path, "taken").expect("claim path");
        }
    }

    /// A single directory source names the archive after itself.
    #[test]
    fn prop_single_source_base_name(name in "[A-Za-z][A-Za-z0-9_-]{0,12}") {
        let temp = TempDir::new().expect("temp dir");
        fs::create_dir(temp.path().join(&name)).expect("source dir");

        let base = default_base_name(&fixed_ctx(temp.path()), &[name.as_str()]);
        prop_assert_eq!(base, name);
    }
}
