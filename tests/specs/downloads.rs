// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Manifest-to-disk download specs: a manifest's enabled sections flow
//! through the fetcher and queue and end up as bytes at the resolved
//! destinations.

use crate::prelude::*;
use rigup_manifest::Manifest;
use rigup_transfer::{DownloadQueue, FakeProbe, FakeTransferClient, Fetcher};
use std::collections::BTreeSet;

const MANIFEST: &str = r#"
[paths]
loras = "{MODELS}/loras"
vae = "{MODELS}/vae"

[sections]
loras = [
    "https://example.com/models/detail-tweaker.safetensors",
]
vae = [
    "https://example.com/models/wan-vae.safetensors",
]
"#;

fn resolved(models_dir: &Path) -> rigup_manifest::ResolvedManifest {
    let env = [("MODELS".to_string(), models_dir.display().to_string())];
    Manifest::parse(MANIFEST).unwrap().resolve(env.into_iter()).unwrap()
}

fn queue_for(
    config: &ProvisionConfig,
    client: &FakeTransferClient,
) -> DownloadQueue<FakeTransferClient, FakeProbe> {
    let fetcher = Fetcher::new(client.clone(), FakeProbe::new(), config);
    DownloadQueue::new(client.clone(), fetcher)
}

/// A manifest section enqueues, downloads, and lands on disk; disabled
/// sections never reach the backend.
#[tokio::test]
async fn enabled_sections_download_to_disk() {
    let (tmp, config) = test_config();
    let client = FakeTransferClient::new();
    client.serve("https://example.com/models/detail-tweaker.safetensors", b"0123456789");
    let queue = queue_for(&config, &client);

    let enabled: BTreeSet<String> = ["loras".to_string()].into();
    let manifest = resolved(&tmp.path().join("models"));
    let handles = queue.enqueue_manifest(&manifest, &enabled).await.unwrap();
    assert_eq!(handles.len(), 1);

    let report = queue.wait_all(&handles, FAST_POLL).await.unwrap();
    assert!(report.all_succeeded());
    assert_eq!(report.completed, vec!["detail-tweaker.safetensors".to_string()]);

    let dest = tmp.path().join("models/loras/detail-tweaker.safetensors");
    assert_eq!(std::fs::read(&dest).unwrap().len(), 10);
    // The vae section was never enabled.
    assert_eq!(client.added_urls().len(), 1);
}

/// Re-running the same manifest against a satisfied tree enqueues nothing.
#[tokio::test]
async fn second_run_is_idempotent() {
    let (tmp, config) = test_config();
    let client = FakeTransferClient::new();
    client.serve("https://example.com/models/detail-tweaker.safetensors", &[7u8; 2048]);
    let queue = queue_for(&config, &client);

    let enabled: BTreeSet<String> = ["loras".to_string()].into();
    let manifest = resolved(&tmp.path().join("models"));
    let handles = queue.enqueue_manifest(&manifest, &enabled).await.unwrap();
    queue.wait_all(&handles, FAST_POLL).await.unwrap();

    let again = queue.enqueue_manifest(&manifest, &enabled).await.unwrap();
    assert!(again.is_empty());
    assert_eq!(client.added_urls().len(), 1);
}

/// One failing transfer is reported by name and reason without blocking
/// the rest of the queue.
#[tokio::test]
async fn failures_are_isolated_and_named() {
    let (tmp, config) = test_config();
    let client = FakeTransferClient::new();
    client.serve("https://example.com/models/detail-tweaker.safetensors", b"0123456789");
    client.fail_with("https://example.com/models/wan-vae.safetensors", "403 Forbidden");
    let queue = queue_for(&config, &client);

    let enabled: BTreeSet<String> = ["loras".to_string(), "vae".to_string()].into();
    let manifest = resolved(&tmp.path().join("models"));
    let handles = queue.enqueue_manifest(&manifest, &enabled).await.unwrap();
    assert_eq!(handles.len(), 2);

    let report = queue.wait_all(&handles, FAST_POLL).await.unwrap();
    assert!(!report.all_succeeded());
    assert_eq!(report.completed, vec!["detail-tweaker.safetensors".to_string()]);
    assert_eq!(
        report.failed,
        vec![("wan-vae.safetensors".to_string(), "403 Forbidden".to_string())]
    );
}
