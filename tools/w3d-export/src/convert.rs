//! Import → re-export pipeline

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use w3d_common::{ExportOptions, Scene};

/// Import a file and bind an external skeleton when one is given
pub fn load_scene(input: &Path, skeleton: Option<&Path>) -> Result<Scene> {
    let mut scene = w3d_common::import(input)
        .with_context(|| format!("Failed to import {}", input.display()))?;

    if let Some(skeleton_path) = skeleton {
        let skeleton = w3d_common::import(skeleton_path)
            .with_context(|| format!("Failed to import skeleton {}", skeleton_path.display()))?;
        let hierarchy = skeleton.hierarchy.with_context(|| {
            format!("{} contains no hierarchy", skeleton_path.display())
        })?;
        tracing::info!(
            "Binding hierarchy '{}' from {}",
            hierarchy.name,
            skeleton_path.display()
        );
        scene
            .attach_hierarchy(hierarchy)
            .with_context(|| format!("Skeleton {} does not fit", skeleton_path.display()))?;
    }

    Ok(scene)
}

/// `model.w3d` → `model_ham.w3d`
pub fn default_output_path(input: &Path, options: &ExportOptions) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("out");
    input.with_file_name(format!(
        "{}_{}.w3d",
        stem,
        options.mode.code().to_lowercase()
    ))
}

/// Re-export `input` to `output` with the given options
pub fn convert(
    input: &Path,
    output: &Path,
    options: &ExportOptions,
    skeleton: Option<&Path>,
) -> Result<()> {
    let scene = load_scene(input, skeleton)?;
    w3d_common::export(output, &scene, options)
        .with_context(|| format!("Failed to export {}", output.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use w3d_common::{Compression, ExportMode};

    #[test]
    fn test_default_output_path() {
        let options = ExportOptions::new(ExportMode::Skeleton, Compression::TimeCoded);
        assert_eq!(
            default_output_path(Path::new("art/tank.w3d"), &options),
            PathBuf::from("art/tank_s.w3d")
        );
    }
}
