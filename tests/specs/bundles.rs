// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bundle cache specs: one rig publishes its converged plugin tree, a
//! second rig with the same runtime signature installs it wholesale, and
//! a rig with a different runtime falls through to a source sync.

use crate::prelude::*;
use rigup_core::BundleKey;
use rigup_sync::{collect_manifest, signature_from_versions, BundleCache, FakeVcs, LocalBlobStore};

fn versions(torch: &str) -> Vec<(String, String)> {
    vec![
        ("torch".to_string(), torch.to_string()),
        ("torchvision".to_string(), "0.19.0".to_string()),
    ]
}

fn seed_plugin_tree(plugins_dir: &Path) {
    let node = plugins_dir.join("ComfyUI-KJNodes");
    std::fs::create_dir_all(&node).unwrap();
    std::fs::write(node.join("__init__.py"), "NODE_CLASS_MAPPINGS = {}\n").unwrap();
    std::fs::write(node.join("requirements.txt"), "pillow\nnumpy>=1.24\n").unwrap();
}

/// Publish on one rig, resolve on another with the same runtime: the
/// second rig gets the full tree without touching git.
#[tokio::test]
async fn same_runtime_rig_installs_published_bundle() {
    let store_root = TempDir::new().unwrap();
    let key = BundleKey::new("custom-nodes", signature_from_versions(&versions("2.4.0")));

    let (publisher, publisher_config) = test_config();
    seed_plugin_tree(&publisher_config.plugins_dir);
    let targets = vec![RepoTarget::from_url("https://github.com/kijai/ComfyUI-KJNodes")];
    let manifest =
        collect_manifest(&FakeVcs::new(), "custom-nodes", &publisher_config.plugins_dir, &targets)
            .await;
    assert_eq!(manifest.repos.len(), 1);
    assert_eq!(manifest.requirements, ["pillow", "numpy>=1.24"]);

    let cache = BundleCache::new(LocalBlobStore::new(store_root.path()));
    cache.publish(&key, &publisher_config.plugins_dir, &manifest, 1_700_000_000).await.unwrap();
    drop(publisher);

    let (_consumer, consumer_config) = test_config();
    std::fs::create_dir_all(&consumer_config.plugins_dir).unwrap();
    let installed = cache.resolve(&key, &consumer_config.plugins_dir).await.unwrap();
    assert!(installed);
    let init = consumer_config.plugins_dir.join("ComfyUI-KJNodes/__init__.py");
    assert_eq!(std::fs::read_to_string(init).unwrap(), "NODE_CLASS_MAPPINGS = {}\n");
}

/// A different torch version produces a different signature and therefore
/// a bundle miss.
#[tokio::test]
async fn different_runtime_misses_the_cache() {
    let store_root = TempDir::new().unwrap();
    let published = BundleKey::new("custom-nodes", signature_from_versions(&versions("2.4.0")));

    let (_publisher, publisher_config) = test_config();
    seed_plugin_tree(&publisher_config.plugins_dir);
    let manifest =
        collect_manifest(&FakeVcs::new(), "custom-nodes", &publisher_config.plugins_dir, &[]).await;
    let cache = BundleCache::new(LocalBlobStore::new(store_root.path()));
    cache.publish(&published, &publisher_config.plugins_dir, &manifest, 1_700_000_000).await.unwrap();

    let upgraded = BundleKey::new("custom-nodes", signature_from_versions(&versions("2.5.1")));
    assert_ne!(published.signature, upgraded.signature);

    let (_consumer, consumer_config) = test_config();
    std::fs::create_dir_all(&consumer_config.plugins_dir).unwrap();
    let installed = cache.resolve(&upgraded, &consumer_config.plugins_dir).await.unwrap();
    assert!(!installed);
    // The miss leaves the empty tree exactly as it was.
    assert_eq!(std::fs::read_dir(&consumer_config.plugins_dir).unwrap().count(), 0);
}
