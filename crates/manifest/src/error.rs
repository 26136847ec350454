// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use thiserror::Error;

/// Errors from manifest parsing and resolution
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unresolved placeholder {{{name}}} in {context}")]
    UnresolvedPlaceholder { name: String, context: String },

    #[error("section '{section}' has a bare-URL entry but no path mapping")]
    NoSectionDir { section: String },

    #[error("entry in section '{section}' has no destination (need path, or dir + out)")]
    NoDestination { section: String },

    #[error("cannot derive a file name from url: {0}")]
    NoFileName(String),

    #[error("repo list file unreadable: {path}: {source}")]
    RepoListUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
