//! Known W3D chunk identifiers
//!
//! Only the chunks this codec interprets or passes through by name are
//! listed. Anything else is an unknown tag and survives as a [`RawChunk`].
//!
//! [`RawChunk`]: super::RawChunk

/// Published W3D chunk IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ChunkKind {
    // Mesh
    Mesh = 0x0000_0000,
    Vertices = 0x0000_0002,
    VertexNormals = 0x0000_0003,
    MeshUserText = 0x0000_000C,
    VertexInfluences = 0x0000_000E,
    MeshHeader3 = 0x0000_001F,
    Triangles = 0x0000_0020,
    VertexShadeIndices = 0x0000_0022,
    PrelitUnlit = 0x0000_0023,
    PrelitVertex = 0x0000_0024,
    PrelitLightmapMultiPass = 0x0000_0025,
    PrelitLightmapMultiTexture = 0x0000_0026,

    // Materials
    MaterialInfo = 0x0000_0028,
    Shaders = 0x0000_0029,
    VertexMaterials = 0x0000_002A,
    VertexMaterial = 0x0000_002B,
    VertexMaterialName = 0x0000_002C,
    VertexMaterialInfo = 0x0000_002D,
    VertexMapperArgs0 = 0x0000_002E,
    VertexMapperArgs1 = 0x0000_002F,
    Textures = 0x0000_0030,
    Texture = 0x0000_0031,
    TextureName = 0x0000_0032,
    TextureInfo = 0x0000_0033,
    MaterialPass = 0x0000_0038,
    VertexMaterialIds = 0x0000_0039,
    ShaderIds = 0x0000_003A,
    Dcg = 0x0000_003B,
    Dig = 0x0000_003C,
    Scg = 0x0000_003E,
    TextureStage = 0x0000_0048,
    TextureIds = 0x0000_0049,
    StageTexcoords = 0x0000_004A,
    PerFaceTexcoordIds = 0x0000_004B,
    ShaderMaterials = 0x0000_0050,
    ShaderMaterial = 0x0000_0051,
    ShaderMaterialHeader = 0x0000_0052,
    ShaderMaterialProperty = 0x0000_0053,
    Tangents = 0x0000_0060,
    Bitangents = 0x0000_0061,

    // Collision tree
    Aabtree = 0x0000_0090,
    AabtreeHeader = 0x0000_0091,
    AabtreePolyIndices = 0x0000_0092,
    AabtreeNodes = 0x0000_0093,

    // Hierarchy
    Hierarchy = 0x0000_0100,
    HierarchyHeader = 0x0000_0101,
    Pivots = 0x0000_0102,
    PivotFixups = 0x0000_0103,

    // Animation
    Animation = 0x0000_0200,
    AnimationHeader = 0x0000_0201,
    AnimationChannel = 0x0000_0202,
    BitChannel = 0x0000_0203,
    CompressedAnimation = 0x0000_0280,
    CompressedAnimationHeader = 0x0000_0281,
    CompressedAnimationChannel = 0x0000_0282,
    CompressedBitChannel = 0x0000_0283,

    // HLOD
    Hlod = 0x0000_0700,
    HlodHeader = 0x0000_0701,
    HlodLodArray = 0x0000_0702,
    HlodSubObjectArrayHeader = 0x0000_0703,
    HlodSubObject = 0x0000_0704,
    HlodAggregateArray = 0x0000_0705,
    HlodProxyArray = 0x0000_0706,

    Box = 0x0000_0740,
}

impl ChunkKind {
    /// Every known kind, in tag order
    pub const ALL: &'static [ChunkKind] = &[
        ChunkKind::Mesh,
        ChunkKind::Vertices,
        ChunkKind::VertexNormals,
        ChunkKind::MeshUserText,
        ChunkKind::VertexInfluences,
        ChunkKind::MeshHeader3,
        ChunkKind::Triangles,
        ChunkKind::VertexShadeIndices,
        ChunkKind::PrelitUnlit,
        ChunkKind::PrelitVertex,
        ChunkKind::PrelitLightmapMultiPass,
        ChunkKind::PrelitLightmapMultiTexture,
        ChunkKind::MaterialInfo,
        ChunkKind::Shaders,
        ChunkKind::VertexMaterials,
        ChunkKind::VertexMaterial,
        ChunkKind::VertexMaterialName,
        ChunkKind::VertexMaterialInfo,
        ChunkKind::VertexMapperArgs0,
        ChunkKind::VertexMapperArgs1,
        ChunkKind::Textures,
        ChunkKind::Texture,
        ChunkKind::TextureName,
        ChunkKind::TextureInfo,
        ChunkKind::MaterialPass,
        ChunkKind::VertexMaterialIds,
        ChunkKind::ShaderIds,
        ChunkKind::Dcg,
        ChunkKind::Dig,
        ChunkKind::Scg,
        ChunkKind::TextureStage,
        ChunkKind::TextureIds,
        ChunkKind::StageTexcoords,
        ChunkKind::PerFaceTexcoordIds,
        ChunkKind::ShaderMaterials,
        ChunkKind::ShaderMaterial,
        ChunkKind::ShaderMaterialHeader,
        ChunkKind::ShaderMaterialProperty,
        ChunkKind::Tangents,
        ChunkKind::Bitangents,
        ChunkKind::Aabtree,
        ChunkKind::AabtreeHeader,
        ChunkKind::AabtreePolyIndices,
        ChunkKind::AabtreeNodes,
        ChunkKind::Hierarchy,
        ChunkKind::HierarchyHeader,
        ChunkKind::Pivots,
        ChunkKind::PivotFixups,
        ChunkKind::Animation,
        ChunkKind::AnimationHeader,
        ChunkKind::AnimationChannel,
        ChunkKind::BitChannel,
        ChunkKind::CompressedAnimation,
        ChunkKind::CompressedAnimationHeader,
        ChunkKind::CompressedAnimationChannel,
        ChunkKind::CompressedBitChannel,
        ChunkKind::Hlod,
        ChunkKind::HlodHeader,
        ChunkKind::HlodLodArray,
        ChunkKind::HlodSubObjectArrayHeader,
        ChunkKind::HlodSubObject,
        ChunkKind::HlodAggregateArray,
        ChunkKind::HlodProxyArray,
        ChunkKind::Box,
    ];

    /// Look up a tag
    pub fn from_tag(tag: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.tag() == tag)
    }

    pub fn tag(self) -> u32 {
        self as u32
    }

    /// Whether the published layout stores sub-chunks in this chunk
    pub fn is_container(self) -> bool {
        matches!(
            self,
            ChunkKind::Mesh
                | ChunkKind::PrelitUnlit
                | ChunkKind::PrelitVertex
                | ChunkKind::PrelitLightmapMultiPass
                | ChunkKind::PrelitLightmapMultiTexture
                | ChunkKind::VertexMaterials
                | ChunkKind::VertexMaterial
                | ChunkKind::Textures
                | ChunkKind::Texture
                | ChunkKind::MaterialPass
                | ChunkKind::TextureStage
                | ChunkKind::ShaderMaterials
                | ChunkKind::ShaderMaterial
                | ChunkKind::Aabtree
                | ChunkKind::Hierarchy
                | ChunkKind::Animation
                | ChunkKind::CompressedAnimation
                | ChunkKind::Hlod
                | ChunkKind::HlodLodArray
                | ChunkKind::HlodAggregateArray
                | ChunkKind::HlodProxyArray
        )
    }

    /// Upper-case name as used in the published chunk table
    pub fn name(self) -> &'static str {
        match self {
            ChunkKind::Mesh => "MESH",
            ChunkKind::Vertices => "VERTICES",
            ChunkKind::VertexNormals => "VERTEX_NORMALS",
            ChunkKind::MeshUserText => "MESH_USER_TEXT",
            ChunkKind::VertexInfluences => "VERTEX_INFLUENCES",
            ChunkKind::MeshHeader3 => "MESH_HEADER3",
            ChunkKind::Triangles => "TRIANGLES",
            ChunkKind::VertexShadeIndices => "VERTEX_SHADE_INDICES",
            ChunkKind::PrelitUnlit => "PRELIT_UNLIT",
            ChunkKind::PrelitVertex => "PRELIT_VERTEX",
            ChunkKind::PrelitLightmapMultiPass => "PRELIT_LIGHTMAP_MULTI_PASS",
            ChunkKind::PrelitLightmapMultiTexture => "PRELIT_LIGHTMAP_MULTI_TEXTURE",
            ChunkKind::MaterialInfo => "MATERIAL_INFO",
            ChunkKind::Shaders => "SHADERS",
            ChunkKind::VertexMaterials => "VERTEX_MATERIALS",
            ChunkKind::VertexMaterial => "VERTEX_MATERIAL",
            ChunkKind::VertexMaterialName => "VERTEX_MATERIAL_NAME",
            ChunkKind::VertexMaterialInfo => "VERTEX_MATERIAL_INFO",
            ChunkKind::VertexMapperArgs0 => "VERTEX_MAPPER_ARGS0",
            ChunkKind::VertexMapperArgs1 => "VERTEX_MAPPER_ARGS1",
            ChunkKind::Textures => "TEXTURES",
            ChunkKind::Texture => "TEXTURE",
            ChunkKind::TextureName => "TEXTURE_NAME",
            ChunkKind::TextureInfo => "TEXTURE_INFO",
            ChunkKind::MaterialPass => "MATERIAL_PASS",
            ChunkKind::VertexMaterialIds => "VERTEX_MATERIAL_IDS",
            ChunkKind::ShaderIds => "SHADER_IDS",
            ChunkKind::Dcg => "DCG",
            ChunkKind::Dig => "DIG",
            ChunkKind::Scg => "SCG",
            ChunkKind::TextureStage => "TEXTURE_STAGE",
            ChunkKind::TextureIds => "TEXTURE_IDS",
            ChunkKind::StageTexcoords => "STAGE_TEXCOORDS",
            ChunkKind::PerFaceTexcoordIds => "PER_FACE_TEXCOORD_IDS",
            ChunkKind::ShaderMaterials => "SHADER_MATERIALS",
            ChunkKind::ShaderMaterial => "SHADER_MATERIAL",
            ChunkKind::ShaderMaterialHeader => "SHADER_MATERIAL_HEADER",
            ChunkKind::ShaderMaterialProperty => "SHADER_MATERIAL_PROPERTY",
            ChunkKind::Tangents => "TANGENTS",
            ChunkKind::Bitangents => "BITANGENTS",
            ChunkKind::Aabtree => "AABTREE",
            ChunkKind::AabtreeHeader => "AABTREE_HEADER",
            ChunkKind::AabtreePolyIndices => "AABTREE_POLYINDICES",
            ChunkKind::AabtreeNodes => "AABTREE_NODES",
            ChunkKind::Hierarchy => "HIERARCHY",
            ChunkKind::HierarchyHeader => "HIERARCHY_HEADER",
            ChunkKind::Pivots => "PIVOTS",
            ChunkKind::PivotFixups => "PIVOT_FIXUPS",
            ChunkKind::Animation => "ANIMATION",
            ChunkKind::AnimationHeader => "ANIMATION_HEADER",
            ChunkKind::AnimationChannel => "ANIMATION_CHANNEL",
            ChunkKind::BitChannel => "BIT_CHANNEL",
            ChunkKind::CompressedAnimation => "COMPRESSED_ANIMATION",
            ChunkKind::CompressedAnimationHeader => "COMPRESSED_ANIMATION_HEADER",
            ChunkKind::CompressedAnimationChannel => "COMPRESSED_ANIMATION_CHANNEL",
            ChunkKind::CompressedBitChannel => "COMPRESSED_BIT_CHANNEL",
            ChunkKind::Hlod => "HLOD",
            ChunkKind::HlodHeader => "HLOD_HEADER",
            ChunkKind::HlodLodArray => "HLOD_LOD_ARRAY",
            ChunkKind::HlodSubObjectArrayHeader => "HLOD_SUB_OBJECT_ARRAY_HEADER",
            ChunkKind::HlodSubObject => "HLOD_SUB_OBJECT",
            ChunkKind::HlodAggregateArray => "HLOD_AGGREGATE_ARRAY",
            ChunkKind::HlodProxyArray => "HLOD_PROXY_ARRAY",
            ChunkKind::Box => "BOX",
        }
    }
}

/// Human-readable label for any tag, used in log lines
pub fn tag_label(tag: u32) -> String {
    match ChunkKind::from_tag(tag) {
        Some(kind) => kind.name().to_string(),
        None => format!("0x{:08X}", tag),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_tag_roundtrip() {
        for &kind in ChunkKind::ALL {
            assert_eq!(ChunkKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(ChunkKind::from_tag(0xDEAD), None);
    }

    #[test]
    fn test_all_is_sorted_and_unique() {
        for pair in ChunkKind::ALL.windows(2) {
            assert!(pair[0].tag() < pair[1].tag(), "{:?}", pair);
        }
    }

    #[test]
    fn test_published_ids() {
        assert_eq!(ChunkKind::Mesh.tag(), 0x000);
        assert_eq!(ChunkKind::Hierarchy.tag(), 0x100);
        assert_eq!(ChunkKind::Animation.tag(), 0x200);
        assert_eq!(ChunkKind::CompressedAnimation.tag(), 0x280);
        assert_eq!(ChunkKind::Hlod.tag(), 0x700);
    }

    #[test]
    fn test_labels() {
        assert_eq!(tag_label(0x101), "HIERARCHY_HEADER");
        assert_eq!(tag_label(0x0000_0999), "0x00000999");
    }
}
