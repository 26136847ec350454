// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `{PLACEHOLDER}` interpolation for manifest paths.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::ManifestError;

/// Placeholder tokens are upper-case names in single braces: `{MODELS}`.
// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Z_][A-Z0-9_]*)\}").expect("constant regex pattern is valid")
});

/// Merge the variable layers for path resolution.
///
/// Precedence (lowest to highest): explicit manifest vars, computed paths,
/// process environment. Environment wins on conflicts so operators can
/// redirect any path without editing the manifest.
pub fn merge_vars(
    vars: &BTreeMap<String, String>,
    paths: &BTreeMap<String, String>,
    env: impl Iterator<Item = (String, String)>,
) -> BTreeMap<String, String> {
    let mut merged = vars.clone();
    for (key, value) in paths {
        merged.insert(key.clone(), value.clone());
    }
    for (key, value) in env {
        merged.insert(key, value);
    }
    merged
}

/// Replace every `{NAME}` token from the merged map.
///
/// Unlike shell expansion this is strict: a placeholder with no binding is
/// an error, not silently left in a filesystem path.
pub fn interpolate(
    template: &str,
    vars: &BTreeMap<String, String>,
    context: &str,
) -> Result<String, ManifestError> {
    let mut missing: Option<String> = None;
    let result = PLACEHOLDER
        .replace_all(template, |caps: &regex::Captures| {
            let name = &caps[1];
            match vars.get(name) {
                Some(value) => value.clone(),
                None => {
                    if missing.is_none() {
                        missing = Some(name.to_string());
                    }
                    caps[0].to_string()
                }
            }
        })
        .to_string();

    match missing {
        Some(name) => {
            Err(ManifestError::UnresolvedPlaceholder { name, context: context.to_string() })
        }
        None => Ok(result),
    }
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
