// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Provisioning configuration.
//!
//! The shell ancestry of this system threaded dozens of mutable environment
//! variables through every function. Here the environment is read exactly
//! once, into an explicit [`ProvisionConfig`] passed by reference to every
//! component constructor.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Prefix for the boolean flags that enable optional download sections,
/// e.g. `RIGUP_FETCH_CHECKPOINTS=1`.
pub const SECTION_FLAG_PREFIX: &str = "RIGUP_FETCH_";

/// Errors from configuration loading and validation
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no home directory and RIGUP_ROOT not set")]
    NoRoot,

    #[error("invalid value for {var}: {value}")]
    InvalidValue { var: String, value: String },

    #[error("required interpreter not found: {0}")]
    InterpreterMissing(PathBuf),

    #[error("application directory missing: {0} (run `rigup sync` first)")]
    AppMissing(PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Segmented-transfer tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetTuning {
    /// Parallel byte-range segments per file.
    pub segments: u32,
    /// Connection cap toward a single host.
    pub max_conn_per_host: u32,
    /// Minimum bytes per segment, backend syntax (e.g. "16M").
    pub min_segment_size: String,
}

impl Default for NetTuning {
    fn default() -> Self {
        Self { segments: 8, max_conn_per_host: 8, min_segment_size: "16M".to_string() }
    }
}

/// Per-host tuning override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostTuning {
    /// Host suffix match (`huggingface.co` also matches `cdn.huggingface.co`).
    pub host: String,
    pub tuning: NetTuning,
}

/// Transfer backend control endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcConfig {
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

/// Chat notification credentials (bot-token + chat-id sink).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

/// How many worker instances to launch and where their ports start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceLayout {
    pub count: u32,
    pub base_port: u16,
}

/// Where the native attention extension comes from and which revisions to
/// try, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionConfig {
    pub repo_url: String,
    pub revisions: Vec<String>,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            repo_url: "https://github.com/thu-ml/SageAttention".to_string(),
            revisions: vec!["v2.1.1".to_string(), "v2.1.0".to_string(), "v2.0.1".to_string()],
        }
    }
}

/// The served application's launch command. The application itself is an
/// opaque collaborator; rigup only knows how to start it and which flags
/// carry the port and directory assignments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

/// Full configuration for one provisioning run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionConfig {
    /// Workspace root; everything rigup manages lives under here.
    pub root: PathBuf,
    /// Served application checkout.
    pub app_dir: PathBuf,
    /// Plugin repositories root.
    pub plugins_dir: PathBuf,
    /// Model weight destination root.
    pub models_dir: PathBuf,
    /// Lock files, build logs, run state.
    pub state_dir: PathBuf,
    /// Interpreter used for dependency installs and native builds.
    pub python: PathBuf,
    /// Clone URL for the served application.
    pub app_repo_url: String,
    /// Explicit plugin list file; overrides `plugin_urls` and the defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_list_file: Option<PathBuf>,
    /// Inline plugin URL override; overrides the defaults.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugin_urls: Vec<String>,
    /// Bundle blob store endpoint; bundle resolve/publish is skipped when
    /// unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_store: Option<String>,
    /// Logical tag for published bundles.
    pub bundle_tag: String,
    pub extension: ExtensionConfig,
    /// Download sections enabled for this run (lowercase names).
    pub enabled_sections: BTreeSet<String>,
    pub net: NetTuning,
    pub host_overrides: Vec<HostTuning>,
    /// Bearer token attached only to hosts that demand authentication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram: Option<TelegramConfig>,
    pub rpc: RpcConfig,
    pub instances: InstanceLayout,
}

impl ProvisionConfig {
    /// Read the full configuration surface from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let root = match std::env::var("RIGUP_ROOT") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => dirs::home_dir().ok_or(ConfigError::NoRoot)?.join("rigup"),
        };

        let python = std::env::var("RIGUP_PYTHON")
            .map(PathBuf::from)
            .unwrap_or_else(|_| root.join("venv/bin/python"));

        let net = NetTuning {
            segments: parse_var("RIGUP_SPLIT", 8)?,
            max_conn_per_host: parse_var("RIGUP_MAX_CONN", 8)?,
            min_segment_size: std::env::var("RIGUP_MIN_SPLIT_SIZE")
                .unwrap_or_else(|_| "16M".to_string()),
        };

        // The well-known model host gets its own tuning: it rate-limits
        // aggressive per-host connection counts.
        let hf = NetTuning {
            segments: parse_var("RIGUP_HF_SPLIT", 4)?,
            max_conn_per_host: parse_var("RIGUP_HF_MAX_CONN", 4)?,
            min_segment_size: std::env::var("RIGUP_HF_MIN_SPLIT_SIZE")
                .unwrap_or_else(|_| net.min_segment_size.clone()),
        };

        let telegram = match (std::env::var("RIGUP_TG_BOT_TOKEN"), std::env::var("RIGUP_TG_CHAT_ID"))
        {
            (Ok(bot_token), Ok(chat_id)) if !bot_token.is_empty() && !chat_id.is_empty() => {
                Some(TelegramConfig { bot_token, chat_id })
            }
            _ => None,
        };

        let extension = ExtensionConfig {
            repo_url: std::env::var("RIGUP_EXT_REPO")
                .unwrap_or_else(|_| ExtensionConfig::default().repo_url),
            revisions: match std::env::var("RIGUP_EXT_REVISIONS") {
                Ok(list) if !list.trim().is_empty() => {
                    list.split(',').map(|r| r.trim().to_string()).collect()
                }
                _ => ExtensionConfig::default().revisions,
            },
        };

        Ok(Self {
            app_dir: root.join("ComfyUI"),
            plugins_dir: root.join("ComfyUI/custom_nodes"),
            models_dir: root.join("ComfyUI/models"),
            state_dir: root.join("state"),
            python,
            app_repo_url: std::env::var("RIGUP_APP_REPO")
                .unwrap_or_else(|_| "https://github.com/comfyanonymous/ComfyUI".to_string()),
            plugin_list_file: std::env::var("RIGUP_PLUGIN_FILE").ok().map(PathBuf::from),
            plugin_urls: match std::env::var("RIGUP_PLUGIN_URLS") {
                Ok(list) if !list.trim().is_empty() => {
                    list.split(',').map(|u| u.trim().to_string()).collect()
                }
                _ => Vec::new(),
            },
            bundle_store: std::env::var("RIGUP_BUNDLE_STORE").ok().filter(|s| !s.is_empty()),
            bundle_tag: std::env::var("RIGUP_BUNDLE_TAG")
                .unwrap_or_else(|_| "custom-nodes".to_string()),
            extension,
            enabled_sections: sections_from_env(std::env::vars()),
            net,
            host_overrides: vec![HostTuning { host: "huggingface.co".to_string(), tuning: hf }],
            auth_token: std::env::var("RIGUP_HF_TOKEN")
                .or_else(|_| std::env::var("HF_TOKEN"))
                .ok()
                .filter(|t| !t.is_empty()),
            telegram,
            rpc: RpcConfig {
                port: parse_var("RIGUP_RPC_PORT", 6800)?,
                secret: std::env::var("RIGUP_RPC_SECRET").ok().filter(|s| !s.is_empty()),
            },
            instances: InstanceLayout {
                count: parse_var("RIGUP_INSTANCES", 1)?,
                base_port: parse_var("RIGUP_BASE_PORT", 8188)?,
            },
            root,
        })
    }

    /// Hard precondition check: nothing downstream can function without the
    /// interpreter, so this aborts the run early with a clear diagnostic.
    pub fn validate_runtime(&self) -> Result<(), ConfigError> {
        if !self.python.is_file() {
            return Err(ConfigError::InterpreterMissing(self.python.clone()));
        }
        Ok(())
    }

    /// Check that the served application is present (required before plugin
    /// sync and worker launch).
    pub fn validate_app(&self) -> Result<(), ConfigError> {
        if !self.app_dir.join("main.py").is_file() {
            return Err(ConfigError::AppMissing(self.app_dir.clone()));
        }
        Ok(())
    }

    /// Tuning for a destination host, honoring suffix-matched overrides.
    pub fn tuning_for(&self, host: &str) -> &NetTuning {
        self.host_overrides
            .iter()
            .find(|o| host == o.host || host.ends_with(&format!(".{}", o.host)))
            .map(|o| &o.tuning)
            .unwrap_or(&self.net)
    }

    /// Build the per-instance specs: one per GPU, consecutive ports, isolated
    /// output/cache/log paths. A single instance gets all devices.
    pub fn instance_specs(&self) -> Vec<crate::instance::InstanceSpec> {
        let layout = self.instances;
        (0..layout.count)
            .map(|i| {
                let gpu = if layout.count == 1 {
                    crate::instance::GpuAssignment::All
                } else {
                    crate::instance::GpuAssignment::Id(i)
                };
                let port = layout.base_port.saturating_add(i as u16);
                crate::instance::InstanceSpec::for_port(&self.root, port, gpu)
            })
            .collect()
    }

    /// The served application invocation, minus per-instance arguments.
    pub fn worker_command(&self) -> WorkerCommand {
        WorkerCommand {
            program: self.python.clone(),
            args: vec![
                self.app_dir.join("main.py").display().to_string(),
                "--listen".to_string(),
                "127.0.0.1".to_string(),
            ],
        }
    }
}

fn parse_var<T: std::str::FromStr>(var: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => {
            raw.parse().map_err(|_| ConfigError::InvalidValue { var: var.to_string(), value: raw })
        }
        Err(_) => Ok(default),
    }
}

/// Collect enabled section names from `RIGUP_FETCH_*` boolean flags.
fn sections_from_env(vars: impl Iterator<Item = (String, String)>) -> BTreeSet<String> {
    vars.filter_map(|(key, value)| {
        let name = key.strip_prefix(SECTION_FLAG_PREFIX)?;
        if flag_enabled(&value) {
            Some(name.to_ascii_lowercase())
        } else {
            None
        }
    })
    .collect()
}

fn flag_enabled(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "yes" | "on")
}

/// Host portion of a URL, if any.
pub fn url_host(url: &str) -> Option<&str> {
    let rest = url.split_once("://")?.1;
    let authority = rest.split(['/', '?']).next()?;
    let host = authority.rsplit('@').next()?;
    Some(host.split(':').next().unwrap_or(host))
}

impl ProvisionConfig {
    /// Minimal config rooted at a directory; used by tests and by commands
    /// that only need path layout.
    #[cfg(any(test, feature = "test-support"))]
    pub fn for_root(root: &Path) -> Self {
        Self {
            app_dir: root.join("ComfyUI"),
            plugins_dir: root.join("ComfyUI/custom_nodes"),
            models_dir: root.join("ComfyUI/models"),
            state_dir: root.join("state"),
            python: root.join("venv/bin/python"),
            app_repo_url: "https://github.com/comfyanonymous/ComfyUI".to_string(),
            plugin_list_file: None,
            plugin_urls: Vec::new(),
            bundle_store: None,
            bundle_tag: "custom-nodes".to_string(),
            extension: ExtensionConfig::default(),
            enabled_sections: BTreeSet::new(),
            net: NetTuning::default(),
            host_overrides: Vec::new(),
            auth_token: None,
            telegram: None,
            rpc: RpcConfig { port: 6800, secret: None },
            instances: InstanceLayout { count: 1, base_port: 8188 },
            root: root.to_path_buf(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
