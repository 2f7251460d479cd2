//! Persisted export settings (`w3d-export.toml`)
//!
//! ```toml
//! [export]
//! mode = "hierarchical-animated-model"   # or M, S, A, HAM
//! compression = "time-coded"             # or U, TC, AD
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use w3d_common::ExportOptions;

/// Settings file looked up in the working directory
pub const DEFAULT_SETTINGS_FILE: &str = "w3d-export.toml";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub export: ExportOptions,
}

impl Settings {
    /// Load settings, falling back to defaults
    ///
    /// Returns `(settings, found)`. A file that cannot be parsed is reported,
    /// removed and replaced by defaults.
    pub fn load(path: &Path) -> Result<(Self, bool)> {
        if !path.exists() {
            return Ok((Self::default(), false));
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings: {}", path.display()))?;

        match Self::parse(&content) {
            Ok(settings) => {
                tracing::debug!("Loaded settings from {}", path.display());
                Ok((settings, true))
            }
            Err(err) => {
                tracing::warn!(
                    "Loading export settings failed ({:#}). Removed corrupted settings {}",
                    err,
                    path.display()
                );
                std::fs::remove_file(path)
                    .with_context(|| format!("Failed to remove settings: {}", path.display()))?;
                Ok((Self::default(), false))
            }
        }
    }

    /// Parse settings from a TOML string
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse export settings")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write settings: {}", path.display()))?;
        tracing::info!("Saved export settings to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use w3d_common::{Compression, ExportMode};

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, found) = Settings::load(&dir.path().join(DEFAULT_SETTINGS_FILE)).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(!found);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_SETTINGS_FILE);
        let settings = Settings {
            export: ExportOptions::new(
                ExportMode::HierarchicalAnimatedModel,
                Compression::AdaptiveDelta,
            ),
        };

        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), (settings, true));
    }

    #[test]
    fn test_short_codes_and_partial_tables() {
        let settings = Settings::parse("[export]\nmode = \"HAM\"\n").unwrap();
        assert_eq!(settings.export.mode, ExportMode::HierarchicalAnimatedModel);
        assert_eq!(settings.export.compression, Compression::TimeCoded);

        let settings = Settings::parse("[export]\ncompression = \"U\"\n").unwrap();
        assert_eq!(settings.export.mode, ExportMode::Model);
        assert_eq!(settings.export.compression, Compression::Uncompressed);

        assert_eq!(Settings::parse("").unwrap(), Settings::default());
    }

    #[test]
    fn test_corrupt_file_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_SETTINGS_FILE);
        std::fs::write(&path, "[export]\nmode = \"SPLINE\"\n").unwrap();

        let (settings, found) = Settings::load(&path).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(!found);
        assert!(!path.exists());
    }
}
