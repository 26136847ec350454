// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plugin repository list resolution.
//!
//! Precedence: an explicit override file path, else an inline override list,
//! else the built-in defaults.

use rigup_core::RepoTarget;
use std::path::Path;

use crate::ManifestError;

/// Built-in plugin set for a stock rig.
pub fn default_plugin_urls() -> Vec<&'static str> {
    vec![
        "https://github.com/ltdrdata/ComfyUI-Manager",
        "https://github.com/ltdrdata/ComfyUI-Impact-Pack",
        "https://github.com/rgthree/rgthree-comfy",
        "https://github.com/cubiq/ComfyUI_essentials",
        "https://github.com/Fannovel16/comfyui_controlnet_aux",
        "https://github.com/kijai/ComfyUI-KJNodes",
        "https://github.com/WASasquatch/was-node-suite-comfyui",
        "https://github.com/yolain/ComfyUI-Easy-Use",
        "https://github.com/jags111/efficiency-nodes-comfyui",
        "https://github.com/crystian/ComfyUI-Crystools",
    ]
}

/// Resolve the repo list from the highest-precedence source available.
///
/// Override files are newline-delimited clone URLs; blank lines and `#`
/// comments are ignored.
pub fn resolve_repo_list(
    override_file: Option<&Path>,
    inline: Option<&[String]>,
) -> Result<Vec<RepoTarget>, ManifestError> {
    if let Some(path) = override_file {
        let text = std::fs::read_to_string(path).map_err(|source| {
            ManifestError::RepoListUnreadable { path: path.to_path_buf(), source }
        })?;
        return Ok(parse_url_lines(&text));
    }
    if let Some(urls) = inline {
        return Ok(urls.iter().map(|u| RepoTarget::from_url(u)).collect());
    }
    Ok(default_plugin_urls().into_iter().map(RepoTarget::from_url).collect())
}

fn parse_url_lines(text: &str) -> Vec<RepoTarget> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(RepoTarget::from_url)
        .collect()
}

#[cfg(test)]
#[path = "repos_tests.rs"]
mod tests;
