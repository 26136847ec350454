// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed download section kinds.
//!
//! Section names arrive as strings in the manifest and as boolean enable
//! flags in the environment; they are validated into this enum at resolve
//! time. Unknown names are skipped, never fatal, so a newer manifest can be
//! used with an older binary.

use serde::{Deserialize, Serialize};

/// Known model groups a manifest section can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Checkpoints,
    Diffusion,
    TextEncoders,
    Clip,
    ClipVision,
    Vae,
    Loras,
    Controlnet,
    Upscale,
    Embeddings,
    Ipadapter,
    Workflows,
}

impl SectionKind {
    /// Parse a manifest section name; `None` for unknown sections.
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name.to_ascii_lowercase().as_str() {
            "checkpoints" => SectionKind::Checkpoints,
            "diffusion" | "diffusion_models" | "unet" => SectionKind::Diffusion,
            "text_encoders" => SectionKind::TextEncoders,
            "clip" => SectionKind::Clip,
            "clip_vision" => SectionKind::ClipVision,
            "vae" => SectionKind::Vae,
            "loras" => SectionKind::Loras,
            "controlnet" => SectionKind::Controlnet,
            "upscale" | "upscale_models" => SectionKind::Upscale,
            "embeddings" => SectionKind::Embeddings,
            "ipadapter" => SectionKind::Ipadapter,
            "workflows" => SectionKind::Workflows,
            _ => return None,
        };
        Some(kind)
    }

    /// Canonical lowercase name, matching the enable-flag suffix.
    pub fn name(&self) -> &'static str {
        match self {
            SectionKind::Checkpoints => "checkpoints",
            SectionKind::Diffusion => "diffusion",
            SectionKind::TextEncoders => "text_encoders",
            SectionKind::Clip => "clip",
            SectionKind::ClipVision => "clip_vision",
            SectionKind::Vae => "vae",
            SectionKind::Loras => "loras",
            SectionKind::Controlnet => "controlnet",
            SectionKind::Upscale => "upscale",
            SectionKind::Embeddings => "embeddings",
            SectionKind::Ipadapter => "ipadapter",
            SectionKind::Workflows => "workflows",
        }
    }
}

impl std::fmt::Display for SectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
#[path = "section_tests.rs"]
mod tests;
