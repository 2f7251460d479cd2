//! File-level entry points

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::chunk::read_chunks;
use crate::error::Result;
use crate::options::ExportOptions;
use crate::scene::Scene;

/// Parse a complete W3D file image
pub fn read_scene(bytes: &[u8]) -> Result<Scene> {
    Scene::from_chunks(read_chunks(bytes))
}

/// Serialize a scene to a W3D file image
pub fn write_scene(scene: &Scene, options: &ExportOptions) -> Result<Vec<u8>> {
    scene.to_bytes(options)
}

/// Read and parse a `.w3d` file
pub fn import(path: impl AsRef<Path>) -> Result<Scene> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let scene = read_scene(&bytes)?;
    info!(
        "Imported {}: {} meshes, {} animations{}",
        path.display(),
        scene.meshes.len(),
        scene.animations.len(),
        scene
            .hierarchy
            .as_ref()
            .map(|h| format!(", hierarchy '{}' ({} pivots)", h.name, h.pivot_count()))
            .unwrap_or_default()
    );
    Ok(scene)
}

/// Serialize and write a `.w3d` file
///
/// The file is only created once the whole scene has been encoded, so a
/// failed export leaves no partial output behind.
pub fn export(path: impl AsRef<Path>, scene: &Scene, options: &ExportOptions) -> Result<()> {
    let path = path.as_ref();
    let bytes = write_scene(scene, options)?;

    let mut writer = BufWriter::new(fs::File::create(path)?);
    writer.write_all(&bytes)?;
    writer.flush()?;

    info!(
        "Exported {} ({} bytes, {} mode, {} compression)",
        path.display(),
        bytes.len(),
        options.mode,
        options.compression
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::W3dError;
    use crate::options::ExportMode;

    #[test]
    fn test_empty_file_is_empty_scene() {
        assert_eq!(read_scene(&[]).unwrap(), Scene::default());
    }

    #[test]
    fn test_failed_export_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.w3d");
        let err = export(&path, &Scene::default(), &ExportOptions::default()).unwrap_err();
        assert!(matches!(err, W3dError::NothingToExport(ExportMode::Model)));
        assert!(!path.exists());
    }

    #[test]
    fn test_import_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            import(dir.path().join("missing.w3d")),
            Err(W3dError::Io(_))
        ));
    }
}
