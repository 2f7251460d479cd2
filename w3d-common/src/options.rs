//! Export options
//!
//! Identifiers follow the exporter's short codes: `M`, `S`, `A`, `HAM` for
//! the mode and `U`, `TC`, `AD` for the animation compression.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, W3dError};
use crate::scene::Scene;

/// What an export writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportMode {
    /// Meshes only
    #[default]
    #[serde(alias = "M")]
    Model,
    /// Hierarchy only
    #[serde(alias = "S")]
    Skeleton,
    /// Animations only
    #[serde(alias = "A")]
    Animation,
    /// Hierarchy, meshes, HLOD and animations
    #[serde(alias = "HAM")]
    HierarchicalAnimatedModel,
}

impl ExportMode {
    pub const ALL: [ExportMode; 4] = [
        ExportMode::Model,
        ExportMode::Skeleton,
        ExportMode::Animation,
        ExportMode::HierarchicalAnimatedModel,
    ];

    /// Short identifier
    pub fn code(self) -> &'static str {
        match self {
            ExportMode::Model => "M",
            ExportMode::Skeleton => "S",
            ExportMode::Animation => "A",
            ExportMode::HierarchicalAnimatedModel => "HAM",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ExportMode::Model => "model",
            ExportMode::Skeleton => "skeleton",
            ExportMode::Animation => "animation",
            ExportMode::HierarchicalAnimatedModel => "hierarchical-animated-model",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ExportMode::Model => "exports the meshes only",
            ExportMode::Skeleton => "exports the hierarchy only",
            ExportMode::Animation => "exports the animations only",
            ExportMode::HierarchicalAnimatedModel => {
                "exports the hierarchy, meshes, HLOD and animations"
            }
        }
    }

    /// Whether animations are part of this mode
    pub fn includes_animation(self) -> bool {
        matches!(
            self,
            ExportMode::Animation | ExportMode::HierarchicalAnimatedModel
        )
    }
}

impl fmt::Display for ExportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExportMode {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ExportMode::ALL
            .into_iter()
            .find(|mode| s.eq_ignore_ascii_case(mode.code()) || s.eq_ignore_ascii_case(mode.name()))
            .ok_or_else(|| ParseOptionError {
                kind: "export mode",
                value: s.to_string(),
                expected: "M, S, A, HAM",
            })
    }
}

/// Animation channel encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Compression {
    /// One value per frame
    #[serde(alias = "U")]
    Uncompressed,
    /// Sparse keyframes with time codes
    #[default]
    #[serde(alias = "TC")]
    TimeCoded,
    /// Lossy delta blocks
    #[serde(alias = "AD")]
    AdaptiveDelta,
}

impl Compression {
    pub const ALL: [Compression; 3] = [
        Compression::Uncompressed,
        Compression::TimeCoded,
        Compression::AdaptiveDelta,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Compression::Uncompressed => "U",
            Compression::TimeCoded => "TC",
            Compression::AdaptiveDelta => "AD",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Compression::Uncompressed => "uncompressed",
            Compression::TimeCoded => "time-coded",
            Compression::AdaptiveDelta => "adaptive-delta",
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Compression {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Compression::ALL
            .into_iter()
            .find(|c| s.eq_ignore_ascii_case(c.code()) || s.eq_ignore_ascii_case(c.name()))
            .ok_or_else(|| ParseOptionError {
                kind: "compression",
                value: s.to_string(),
                expected: "U, TC, AD",
            })
    }
}

/// Unrecognized option identifier
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}' (expected one of {expected})")]
pub struct ParseOptionError {
    kind: &'static str,
    value: String,
    expected: &'static str,
}

/// Settings for one export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    pub mode: ExportMode,
    pub compression: Compression,
}

impl ExportOptions {
    pub fn new(mode: ExportMode, compression: Compression) -> Self {
        Self { mode, compression }
    }

    /// Fail with `NothingToExport` if the mode's content is missing
    pub fn check(&self, scene: &Scene) -> Result<()> {
        let has_content = match self.mode {
            ExportMode::Model => !scene.meshes.is_empty(),
            ExportMode::Skeleton | ExportMode::HierarchicalAnimatedModel => {
                scene.hierarchy.is_some()
            }
            ExportMode::Animation => !scene.animations.is_empty(),
        };
        if has_content {
            Ok(())
        } else {
            Err(W3dError::NothingToExport(self.mode))
        }
    }
}
