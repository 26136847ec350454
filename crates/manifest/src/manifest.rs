// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Download manifest: a TOML document mapping named sections to lists of
//! (url, destination) entries, with `{PLACEHOLDER}` path templating.
//!
//! Entry shapes:
//! - a bare URL string — destination is `paths.<section>/<url file name>`
//! - a `[url, path]` pair — explicit destination path
//! - a table `{ url, path }` or `{ url, dir, out }`

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::section::SectionKind;
use crate::template::{interpolate, merge_vars};
use crate::ManifestError;

/// One manifest entry before resolution.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawEntry {
    /// Bare URL; destination derived from the section's path mapping.
    Url(String),
    /// `[url, path]` pair.
    Pair(String, String),
    /// Full form with either `path` or `dir` + `out`.
    Full {
        url: String,
        #[serde(default)]
        path: Option<String>,
        #[serde(default)]
        dir: Option<String>,
        #[serde(default)]
        out: Option<String>,
    },
}

/// Parsed but unresolved manifest document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
    #[serde(default)]
    pub paths: BTreeMap<String, String>,
    #[serde(default)]
    pub sections: BTreeMap<String, Vec<RawEntry>>,
}

/// A fully resolved (url, destination) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadEntry {
    pub url: String,
    pub dest: PathBuf,
}

/// A resolved section with its validated kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSection {
    pub kind: SectionKind,
    pub entries: Vec<DownloadEntry>,
}

/// Manifest after placeholder resolution and section validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedManifest {
    pub sections: Vec<ResolvedSection>,
}

impl Manifest {
    pub fn parse(text: &str) -> Result<Self, ManifestError> {
        Ok(toml::from_str(text)?)
    }

    /// Resolve all placeholders and section kinds.
    ///
    /// `env` is passed explicitly (normally `std::env::vars()`) so resolution
    /// stays deterministic under test. Unknown section names are skipped with
    /// a log line; they are data for some other binary, not an error here.
    pub fn resolve(
        &self,
        env: impl Iterator<Item = (String, String)>,
    ) -> Result<ResolvedManifest, ManifestError> {
        // Paths may themselves reference vars (and each other is NOT
        // supported — paths resolve against vars + env only).
        let env_map: BTreeMap<String, String> = env.collect();
        let base = merge_vars(&self.vars, &BTreeMap::new(), env_map.clone().into_iter());
        let mut computed = BTreeMap::new();
        for (name, template) in &self.paths {
            let resolved = interpolate(template, &base, &format!("paths.{}", name))?;
            computed.insert(name.clone(), resolved);
        }
        let mut merged = base;
        for (name, value) in &computed {
            // Environment still wins over computed paths.
            if !env_map.contains_key(name) {
                merged.insert(name.clone(), value.clone());
            }
        }

        let mut sections = Vec::new();
        for (name, raw_entries) in &self.sections {
            let Some(kind) = SectionKind::from_name(name) else {
                tracing::debug!(section = %name, "skipping unknown manifest section");
                continue;
            };
            let section_dir = merged.get(name).filter(|_| self.paths.contains_key(name)).cloned();
            let mut entries = Vec::with_capacity(raw_entries.len());
            for raw in raw_entries {
                entries.push(resolve_entry(raw, name, section_dir.as_deref(), &merged)?);
            }
            sections.push(ResolvedSection { kind, entries });
        }
        Ok(ResolvedManifest { sections })
    }
}

fn resolve_entry(
    raw: &RawEntry,
    section: &str,
    section_dir: Option<&str>,
    vars: &BTreeMap<String, String>,
) -> Result<DownloadEntry, ManifestError> {
    let context = format!("section {}", section);
    match raw {
        RawEntry::Url(url) => {
            let url = interpolate(url, vars, &context)?;
            let dir = section_dir
                .ok_or_else(|| ManifestError::NoSectionDir { section: section.to_string() })?;
            let name = url_file_name(&url)?;
            Ok(DownloadEntry { dest: PathBuf::from(dir).join(name), url })
        }
        RawEntry::Pair(url, path) => Ok(DownloadEntry {
            url: interpolate(url, vars, &context)?,
            dest: PathBuf::from(interpolate(path, vars, &context)?),
        }),
        RawEntry::Full { url, path, dir, out } => {
            let url = interpolate(url, vars, &context)?;
            let dest = match (path, dir, out) {
                (Some(path), _, _) => PathBuf::from(interpolate(path, vars, &context)?),
                (None, Some(dir), Some(out)) => {
                    PathBuf::from(interpolate(dir, vars, &context)?)
                        .join(interpolate(out, vars, &context)?)
                }
                (None, Some(dir), None) => {
                    let name = url_file_name(&url)?;
                    PathBuf::from(interpolate(dir, vars, &context)?).join(name)
                }
                _ => return Err(ManifestError::NoDestination { section: section.to_string() }),
            };
            Ok(DownloadEntry { url, dest })
        }
    }
}

/// File name portion of a URL: last path segment, query stripped.
fn url_file_name(url: &str) -> Result<String, ManifestError> {
    let no_query = url.split(['?', '#']).next().unwrap_or(url);
    let after_scheme = no_query.split_once("://").map(|(_, rest)| rest).unwrap_or(no_query);
    let mut parts = after_scheme.split('/');
    let _authority = parts.next();
    match parts.last().map(str::trim) {
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        _ => Err(ManifestError::NoFileName(url.to_string())),
    }
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
