// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prebuilt plugin-bundle cache over a remote blob store.
//!
//! A bundle is keyed by {tag, environment signature}; the signature is a
//! digest of the installed GPU-runtime library versions, so a bundle built
//! against one toolchain is never installed into an incompatible one.
//! Archives are immutable once published; newer timestamps supersede.

use async_trait::async_trait;
use rigup_core::{BundleKey, BundleManifest, RepoManifestEntry, RepoTarget};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::proc::run_checked;
use crate::repo::Vcs;
use crate::SyncError;

const TAR_TIMEOUT: Duration = Duration::from_secs(1800);

/// Packages pinned by the base environment; a bundle's consolidated
/// dependency list must not drag them to different versions.
const PINNED_RUNTIME: [&str; 5] = ["torch", "torchvision", "torchaudio", "xformers", "triton"];

/// Remote object storage for bundle archives, manifests and checksums.
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    /// Object names starting with `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, SyncError>;
    async fn fetch(&self, name: &str, dest: &Path) -> Result<(), SyncError>;
    async fn put(&self, name: &str, src: &Path) -> Result<(), SyncError>;
}

/// Blob store over a plain HTTP object endpoint: `GET /?prefix=` lists a
/// JSON array of names, objects live at `GET|PUT /{name}`.
pub struct HttpBlobStore {
    base: String,
    client: reqwest::Client,
}

impl HttpBlobStore {
    pub fn new(base: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(600))
            .build()
            .unwrap_or_default();
        Self { base: base.into().trim_end_matches('/').to_string(), client }
    }

    fn object_url(&self, name: &str) -> String {
        format!("{}/{}", self.base, name)
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn list(&self, prefix: &str) -> Result<Vec<String>, SyncError> {
        let url = format!("{}/?prefix={}", self.base, prefix);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(SyncError::Store(format!("list {} returned {}", url, response.status())));
        }
        Ok(response.json::<Vec<String>>().await?)
    }

    async fn fetch(&self, name: &str, dest: &Path) -> Result<(), SyncError> {
        let url = self.object_url(name);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(SyncError::Store(format!("fetch {} returned {}", url, response.status())));
        }
        let bytes = response.bytes().await?;
        tokio::fs::write(dest, &bytes).await?;
        Ok(())
    }

    async fn put(&self, name: &str, src: &Path) -> Result<(), SyncError> {
        let url = self.object_url(name);
        let body = tokio::fs::read(src).await?;
        let response = self.client.put(&url).body(body).send().await?;
        if !response.status().is_success() {
            return Err(SyncError::Store(format!("put {} returned {}", url, response.status())));
        }
        Ok(())
    }
}

/// Blob store over a local directory. Used for on-disk caches and tests.
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn list(&self, prefix: &str) -> Result<Vec<String>, SyncError> {
        let mut names = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(_) => return Ok(names),
        };
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(prefix) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    async fn fetch(&self, name: &str, dest: &Path) -> Result<(), SyncError> {
        tokio::fs::copy(self.root.join(name), dest).await?;
        Ok(())
    }

    async fn put(&self, name: &str, src: &Path) -> Result<(), SyncError> {
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::copy(src, self.root.join(name)).await?;
        Ok(())
    }
}

/// Digest of installed runtime versions, stable across ordering of the
/// probe output.
pub fn signature_from_versions(versions: &[(String, String)]) -> String {
    let mut lines: Vec<String> =
        versions.iter().map(|(name, version)| format!("{name}={version}")).collect();
    lines.sort();
    let mut hasher = Sha256::new();
    for line in &lines {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    let digest = hasher.finalize();
    hex_of(digest.iter().take(6))
}

fn hex_of<'a>(bytes: impl Iterator<Item = &'a u8>) -> String {
    bytes.map(|b| format!("{:02x}", b)).collect()
}

/// Resolve-or-publish layer in front of the repo sync pool.
pub struct BundleCache<S: BlobStore> {
    store: S,
}

impl<S: BlobStore> BundleCache<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Install the newest remote bundle matching `key` into `plugins_dir`.
    ///
    /// Returns `Ok(false)` when no matching archive exists. Extraction is
    /// staged next to the target and swapped in with renames, so a failure
    /// at any point leaves the existing directory untouched and no staging
    /// residue behind.
    pub async fn resolve(&self, key: &BundleKey, plugins_dir: &Path) -> Result<bool, SyncError> {
        let names = self.store.list(&key.prefix()).await?;
        let newest = names
            .iter()
            .filter_map(|name| BundleKey::parse_archive_name(name).map(|(k, ts)| (k, ts, name)))
            .filter(|(k, _, _)| k == key)
            .max_by_key(|(_, ts, _)| *ts);
        let Some((_, timestamp, archive_name)) = newest else {
            tracing::info!(tag = %key.tag, signature = %key.signature, "no bundle in store");
            return Ok(false);
        };
        tracing::info!(archive = %archive_name, timestamp, "installing bundle from store");

        let parent = plugins_dir
            .parent()
            .ok_or_else(|| SyncError::NoStaging(plugins_dir.to_path_buf()))?;
        let staging = parent.join(format!(".{}-incoming", key.tag));
        let archive = parent.join(archive_name);

        let installed = self.install_archive(archive_name, &archive, &staging, plugins_dir).await;
        // Staging and the downloaded archive are removed on both paths.
        let _ = tokio::fs::remove_dir_all(&staging).await;
        let _ = tokio::fs::remove_file(&archive).await;
        installed?;
        Ok(true)
    }

    async fn install_archive(
        &self,
        archive_name: &str,
        archive: &Path,
        staging: &Path,
        plugins_dir: &Path,
    ) -> Result<(), SyncError> {
        self.store.fetch(archive_name, archive).await?;

        let _ = tokio::fs::remove_dir_all(staging).await;
        tokio::fs::create_dir_all(staging).await?;
        let mut cmd = tokio::process::Command::new("tar");
        cmd.arg("-xzf").arg(archive).arg("-C").arg(staging);
        run_checked(cmd, TAR_TIMEOUT, "tar extract").await?;

        let previous = staging.with_extension("old");
        let _ = tokio::fs::remove_dir_all(&previous).await;
        let had_previous = plugins_dir.exists();
        if had_previous {
            tokio::fs::rename(plugins_dir, &previous).await?;
        }
        if let Err(e) = tokio::fs::rename(staging, plugins_dir).await {
            // Put the original back before surfacing the error.
            if had_previous {
                let _ = tokio::fs::rename(&previous, plugins_dir).await;
            }
            return Err(e.into());
        }
        let _ = tokio::fs::remove_dir_all(&previous).await;
        Ok(())
    }

    /// Archive `plugins_dir`, produce the manifest and checksum, and upload
    /// all three objects under the key's deterministic names.
    pub async fn publish(
        &self,
        key: &BundleKey,
        plugins_dir: &Path,
        manifest: &BundleManifest,
        epoch_secs: u64,
    ) -> Result<(), SyncError> {
        let archive_name = key.archive_name(epoch_secs);
        let stem = archive_name.trim_end_matches(".tar.gz").to_string();
        let parent = plugins_dir
            .parent()
            .ok_or_else(|| SyncError::NoStaging(plugins_dir.to_path_buf()))?;
        let archive = parent.join(&archive_name);

        let mut cmd = tokio::process::Command::new("tar");
        cmd.arg("-czf").arg(&archive).arg("-C").arg(plugins_dir).arg(".");
        run_checked(cmd, TAR_TIMEOUT, "tar create").await?;

        let manifest_path = parent.join(format!("{stem}.json"));
        let manifest_json = serde_json::to_vec_pretty(manifest)?;
        tokio::fs::write(&manifest_path, manifest_json).await?;

        let checksum_path = parent.join(format!("{stem}.sha256"));
        let archive_bytes = tokio::fs::read(&archive).await?;
        let digest = Sha256::digest(&archive_bytes);
        let hex = hex_of(digest.iter());
        tokio::fs::write(&checksum_path, format!("{hex}  {archive_name}\n")).await?;

        let uploaded = async {
            self.store.put(&archive_name, &archive).await?;
            self.store.put(&format!("{stem}.json"), &manifest_path).await?;
            self.store.put(&format!("{stem}.sha256"), &checksum_path).await?;
            Ok::<(), SyncError>(())
        }
        .await;

        let _ = tokio::fs::remove_file(&archive).await;
        let _ = tokio::fs::remove_file(&manifest_path).await;
        let _ = tokio::fs::remove_file(&checksum_path).await;
        uploaded?;
        tracing::info!(archive = %archive_name, "bundle published");
        Ok(())
    }
}

/// Build the bundle manifest: per-repo head info plus a consolidated,
/// de-duplicated dependency list with the pinned runtime set excluded.
pub async fn collect_manifest<V: Vcs>(
    vcs: &V,
    tag: &str,
    plugins_dir: &Path,
    targets: &[RepoTarget],
) -> BundleManifest {
    let mut repos = Vec::with_capacity(targets.len());
    let mut requirements = Vec::new();
    let mut seen = std::collections::BTreeSet::new();

    for target in targets {
        let dir = plugins_dir.join(&target.dir_name);
        match vcs.head_info(&dir).await {
            Ok(head) => repos.push(RepoManifestEntry {
                name: target.dir_name.clone(),
                path: target.dir_name.clone(),
                origin: head.origin,
                branch: head.branch,
                commit: head.commit,
            }),
            Err(e) => {
                tracing::warn!(repo = %target.dir_name, error = %e, "no head info, omitting from manifest");
                continue;
            }
        }
        if let Some(req) = &target.requirements {
            if let Ok(text) = tokio::fs::read_to_string(dir.join(req)).await {
                for line in text.lines() {
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    if is_pinned_runtime(line) {
                        continue;
                    }
                    if seen.insert(line.to_string()) {
                        requirements.push(line.to_string());
                    }
                }
            }
        }
    }

    BundleManifest { tag: tag.to_string(), repos, requirements }
}

fn is_pinned_runtime(requirement: &str) -> bool {
    let name_end = requirement
        .find(|c: char| !c.is_ascii_alphanumeric() && c != '-' && c != '_' && c != '.')
        .unwrap_or(requirement.len());
    let name = requirement[..name_end].to_ascii_lowercase();
    name.starts_with("nvidia-") || PINNED_RUNTIME.contains(&name.as_str())
}

#[cfg(test)]
#[path = "bundle_tests.rs"]
mod tests;
