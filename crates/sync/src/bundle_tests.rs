// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::repo::FakeVcs;
use yare::parameterized;

fn versions(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs.iter().map(|(n, v)| (n.to_string(), v.to_string())).collect()
}

#[test]
fn signature_is_order_independent_and_version_sensitive() {
    let a = signature_from_versions(&versions(&[("torch", "2.4.0"), ("torchvision", "0.19.0")]));
    let b = signature_from_versions(&versions(&[("torchvision", "0.19.0"), ("torch", "2.4.0")]));
    let c = signature_from_versions(&versions(&[("torch", "2.4.1"), ("torchvision", "0.19.0")]));

    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(a.len(), 12);
    assert!(a.chars().all(|ch| ch.is_ascii_hexdigit()));
}

#[parameterized(
    plain = { "torch", true },
    pinned_with_version = { "torchaudio==2.4.0", true },
    nvidia_prefix = { "nvidia-cudnn-cu12", true },
    case_folded = { "Triton", true },
    ordinary = { "numpy>=1.24", false },
    prefix_is_not_match = { "torchsde", false },
)]
fn pinned_runtime_detection(requirement: &str, expected: bool) {
    assert_eq!(is_pinned_runtime(requirement), expected);
}

fn plugins_with_file(root: &Path, marker: &str) -> PathBuf {
    let plugins = root.join("custom_nodes");
    std::fs::create_dir_all(plugins.join("some-plugin")).unwrap();
    std::fs::write(plugins.join("some-plugin").join(marker), marker).unwrap();
    plugins
}

#[tokio::test]
async fn resolve_returns_false_when_store_has_no_match() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = BundleCache::new(LocalBlobStore::new(tmp.path().join("store")));
    let plugins = plugins_with_file(&tmp.path().join("rig"), "keep.txt");

    let key = BundleKey::new("plugins", "abc123def456");
    let installed = cache.resolve(&key, &plugins).await.unwrap();

    assert!(!installed);
    assert!(plugins.join("some-plugin/keep.txt").exists());
}

#[tokio::test]
async fn publish_then_resolve_installs_the_bundle() {
    let tmp = tempfile::tempdir().unwrap();
    let store_dir = tmp.path().join("store");
    let key = BundleKey::new("plugins", "abc123def456");

    // Publish from one rig root.
    let source_plugins = plugins_with_file(&tmp.path().join("builder"), "built.txt");
    let manifest = BundleManifest {
        tag: "plugins".into(),
        repos: vec![],
        requirements: vec!["numpy>=1.24".into()],
    };
    let cache = BundleCache::new(LocalBlobStore::new(&store_dir));
    cache.publish(&key, &source_plugins, &manifest, 1_700_000_000).await.unwrap();

    // Archive, manifest and checksum are all in the store.
    let names = LocalBlobStore::new(&store_dir).list(&key.prefix()).await.unwrap();
    assert_eq!(names.len(), 3);
    assert!(names.iter().any(|n| n.ends_with(".tar.gz")));
    assert!(names.iter().any(|n| n.ends_with(".json")));
    assert!(names.iter().any(|n| n.ends_with(".sha256")));

    // Resolve into a different rig root.
    let target_root = tmp.path().join("consumer");
    std::fs::create_dir_all(&target_root).unwrap();
    let target_plugins = target_root.join("custom_nodes");
    let installed = cache.resolve(&key, &target_plugins).await.unwrap();

    assert!(installed);
    assert!(target_plugins.join("some-plugin/built.txt").exists());
    // No staging residue next to the target.
    let leftovers: Vec<_> = std::fs::read_dir(&target_root)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n != "custom_nodes")
        .collect();
    assert!(leftovers.is_empty(), "staging residue: {leftovers:?}");
}

#[tokio::test]
async fn resolve_prefers_the_newest_timestamp() {
    let tmp = tempfile::tempdir().unwrap();
    let store_dir = tmp.path().join("store");
    let key = BundleKey::new("plugins", "abc123def456");
    let cache = BundleCache::new(LocalBlobStore::new(&store_dir));

    let old_plugins = plugins_with_file(&tmp.path().join("old"), "old.txt");
    let manifest = BundleManifest { tag: "plugins".into(), repos: vec![], requirements: vec![] };
    cache.publish(&key, &old_plugins, &manifest, 1_700_000_000).await.unwrap();
    let new_plugins = plugins_with_file(&tmp.path().join("new"), "new.txt");
    cache.publish(&key, &new_plugins, &manifest, 1_700_000_500).await.unwrap();

    let target_root = tmp.path().join("consumer");
    std::fs::create_dir_all(&target_root).unwrap();
    let target_plugins = target_root.join("custom_nodes");
    assert!(cache.resolve(&key, &target_plugins).await.unwrap());
    assert!(target_plugins.join("some-plugin/new.txt").exists());
    assert!(!target_plugins.join("some-plugin/old.txt").exists());
}

#[tokio::test]
async fn corrupt_archive_leaves_existing_install_untouched() {
    let tmp = tempfile::tempdir().unwrap();
    let store_dir = tmp.path().join("store");
    std::fs::create_dir_all(&store_dir).unwrap();
    let key = BundleKey::new("plugins", "abc123def456");
    std::fs::write(store_dir.join(key.archive_name(1_700_000_000)), b"not a tarball").unwrap();

    let root = tmp.path().join("rig");
    let plugins = plugins_with_file(&root, "keep.txt");
    let cache = BundleCache::new(LocalBlobStore::new(&store_dir));

    let result = cache.resolve(&key, &plugins).await;

    assert!(result.is_err());
    assert!(plugins.join("some-plugin/keep.txt").exists());
    let leftovers: Vec<_> = std::fs::read_dir(&root)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n != "custom_nodes")
        .collect();
    assert!(leftovers.is_empty(), "staging residue: {leftovers:?}");
}

#[tokio::test]
async fn manifest_collects_heads_and_deduped_requirements() {
    let tmp = tempfile::tempdir().unwrap();
    let plugins = tmp.path().join("custom_nodes");
    let vcs = FakeVcs::new();

    let mut targets = Vec::new();
    for (name, reqs) in [
        ("alpha", "numpy>=1.24\ntorch\n# comment\nscipy\n"),
        ("beta", "scipy\nnvidia-cudnn-cu12\npillow\n"),
    ] {
        let dir = plugins.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("requirements.txt"), reqs).unwrap();
        vcs.seed_clone(&dir);
        targets.push(RepoTarget::from_url(&format!("https://example.com/{name}.git")));
    }

    let manifest = collect_manifest(&vcs, "plugins", &plugins, &targets).await;

    assert_eq!(manifest.tag, "plugins");
    assert_eq!(manifest.repos.len(), 2);
    assert_eq!(manifest.repos[0].name, "alpha");
    assert_eq!(manifest.repos[0].branch, "main");
    // torch and the nvidia wheel are excluded, scipy appears once.
    assert_eq!(manifest.requirements, vec!["numpy>=1.24", "scipy", "pillow"]);
}
