// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rigup-manifest: declarative download manifests and repo target lists.

mod error;
mod manifest;
mod repos;
mod section;
mod template;

pub use error::ManifestError;
pub use manifest::{DownloadEntry, Manifest, RawEntry, ResolvedManifest, ResolvedSection};
pub use repos::{default_plugin_urls, resolve_repo_list};
pub use section::SectionKind;
pub use template::{interpolate, merge_vars};
