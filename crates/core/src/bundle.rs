// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prebuilt plugin bundle naming and manifest types.
//!
//! A bundle is keyed by `{tag, signature}`; multiple timestamped versions may
//! exist remotely and the newest by timestamp wins. Published bundles are
//! immutable.

use serde::{Deserialize, Serialize};

/// Identity of a bundle: a logical tag plus an environment signature derived
/// from the installed GPU-runtime library versions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BundleKey {
    pub tag: String,
    pub signature: String,
}

impl BundleKey {
    pub fn new(tag: impl Into<String>, signature: impl Into<String>) -> Self {
        Self { tag: tag.into(), signature: signature.into() }
    }

    /// Archive name for a bundle published at `epoch_secs`.
    pub fn archive_name(&self, epoch_secs: u64) -> String {
        format!("{}-{}-{}.tar.gz", self.tag, self.signature, epoch_secs)
    }

    /// Listing prefix matching every timestamped version of this bundle.
    pub fn prefix(&self) -> String {
        format!("{}-{}-", self.tag, self.signature)
    }

    /// Parse an archive name back into `(key, epoch_secs)`.
    ///
    /// Returns `None` for names that don't follow the
    /// `{tag}-{signature}-{timestamp}.tar.gz` convention.
    pub fn parse_archive_name(name: &str) -> Option<(BundleKey, u64)> {
        let stem = name.strip_suffix(".tar.gz")?;
        let (rest, ts) = stem.rsplit_once('-')?;
        let epoch_secs: u64 = ts.parse().ok()?;
        let (tag, signature) = rest.rsplit_once('-')?;
        if tag.is_empty() || signature.is_empty() {
            return None;
        }
        Some((BundleKey::new(tag, signature), epoch_secs))
    }
}

/// One repository recorded in a bundle manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoManifestEntry {
    pub name: String,
    pub path: String,
    pub origin: String,
    pub branch: String,
    pub commit: String,
}

/// Manifest published alongside a bundle archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleManifest {
    pub tag: String,
    pub repos: Vec<RepoManifestEntry>,
    /// Consolidated, de-duplicated dependency list across all bundled repos.
    pub requirements: Vec<String>,
}

#[cfg(test)]
#[path = "bundle_tests.rs"]
mod tests;
