//! Opaque material blobs
//!
//! Vertex materials, shaders, textures and material passes are not
//! interpreted. They are kept as raw chunk trees so they round-trip
//! unchanged. A few read-only helpers look inside for texture names.

use crate::chunk::{ChunkKind, RawChunk};
use crate::primitives::decode_name;

/// Mesh chunks treated as material data
pub const MATERIAL_KINDS: &[ChunkKind] = &[
    ChunkKind::MaterialInfo,
    ChunkKind::Shaders,
    ChunkKind::VertexMaterials,
    ChunkKind::Textures,
    ChunkKind::MaterialPass,
    ChunkKind::ShaderMaterials,
];

/// One material chunk of a mesh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Material {
    pub chunk: RawChunk,
}

impl Material {
    pub fn new(chunk: RawChunk) -> Self {
        Self { chunk }
    }

    /// Whether a mesh sub-chunk tag holds material data
    pub fn is_material_tag(tag: u32) -> bool {
        MATERIAL_KINDS.iter().any(|kind| kind.tag() == tag)
    }

    pub fn kind(&self) -> Option<ChunkKind> {
        self.chunk.kind()
    }

    /// Texture file names referenced by a `TEXTURES` blob
    pub fn texture_names(&self) -> Vec<String> {
        if self.kind() != Some(ChunkKind::Textures) {
            return Vec::new();
        }
        self.chunk
            .children_of(ChunkKind::Texture)
            .flat_map(|texture| texture.children_of(ChunkKind::TextureName))
            .filter_map(|name| name.bytes())
            .map(decode_name)
            .collect()
    }

    /// Number of vertex materials in a `VERTEX_MATERIALS` blob
    pub fn vertex_material_count(&self) -> usize {
        if self.kind() != Some(ChunkKind::VertexMaterials) {
            return 0;
        }
        self.chunk.children_of(ChunkKind::VertexMaterial).count()
    }

    /// Names of the vertex materials in a `VERTEX_MATERIALS` blob
    pub fn vertex_material_names(&self) -> Vec<String> {
        if self.kind() != Some(ChunkKind::VertexMaterials) {
            return Vec::new();
        }
        self.chunk
            .children_of(ChunkKind::VertexMaterial)
            .flat_map(|vm| vm.children_of(ChunkKind::VertexMaterialName))
            .filter_map(|name| name.bytes())
            .map(decode_name)
            .collect()
    }
}
