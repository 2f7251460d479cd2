//! Scene assembly
//!
//! A [`Scene`] owns everything read from one W3D file. Sub-structures refer
//! to each other by hierarchy name and pivot index only; [`Scene::validate`]
//! resolves those references against the bound hierarchy.
//!
//! A scene without a hierarchy (an animation-only file, or meshes whose
//! skeleton ships separately) is valid. Its references stay external until a
//! hierarchy is attached with [`Scene::attach_hierarchy`].

use tracing::{debug, warn};

use crate::animation::Animation;
use crate::chunk::{Chunk, ChunkKind, ChunkReader, ChunkWriter, RawChunk, tag_label};
use crate::error::{Result, W3dError};
use crate::hierarchy::Hierarchy;
use crate::hlod::Hlod;
use crate::mesh::Mesh;
use crate::options::{ExportMode, ExportOptions};
use crate::primitives::{LONG_NAME_LEN, decode_name};

/// In-memory W3D content
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub hierarchy: Option<Hierarchy>,
    pub meshes: Vec<Mesh>,
    pub hlod: Option<Hlod>,
    pub animations: Vec<Animation>,
    /// Top-level chunks this codec does not interpret
    pub extra_chunks: Vec<RawChunk>,
}

// ============================================================================
// Top-level dispatch
// ============================================================================

/// A decoded top-level chunk
enum Decoded {
    Hierarchy(Hierarchy),
    Mesh(Mesh),
    Hlod(Hlod),
    Animation(Animation),
}

type Decoder = for<'a, 'b> fn(&'a Chunk<'b>) -> Result<Decoded>;

fn decode_hierarchy(chunk: &Chunk<'_>) -> Result<Decoded> {
    Hierarchy::read(chunk).map(Decoded::Hierarchy)
}

fn decode_mesh(chunk: &Chunk<'_>) -> Result<Decoded> {
    Mesh::read(chunk).map(Decoded::Mesh)
}

fn decode_hlod(chunk: &Chunk<'_>) -> Result<Decoded> {
    Hlod::read(chunk).map(Decoded::Hlod)
}

fn decode_animation(chunk: &Chunk<'_>) -> Result<Decoded> {
    Animation::read(chunk).map(Decoded::Animation)
}

/// Top-level tag → decoder
const DECODERS: &[(ChunkKind, Decoder)] = &[
    (ChunkKind::Mesh, decode_mesh as Decoder),
    (ChunkKind::Hierarchy, decode_hierarchy as Decoder),
    (ChunkKind::Animation, decode_animation as Decoder),
    (ChunkKind::CompressedAnimation, decode_animation as Decoder),
    (ChunkKind::Hlod, decode_hlod as Decoder),
];

fn decoder_for(tag: u32) -> Option<Decoder> {
    DECODERS
        .iter()
        .find(|(kind, _)| kind.tag() == tag)
        .map(|&(_, decoder)| decoder)
}

/// Name of a `BOX` chunk (`CONTAINER.BOX`)
///
/// Layout: version u32, attributes u32, name [32], color, center, extent.
fn box_name(chunk: &RawChunk) -> Option<String> {
    if chunk.kind() != Some(ChunkKind::Box) {
        return None;
    }
    let bytes = chunk.bytes()?;
    bytes.get(8..8 + LONG_NAME_LEN).map(decode_name)
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the parts into a scene and check every cross-reference
    pub fn assemble(
        hierarchy: Option<Hierarchy>,
        meshes: Vec<Mesh>,
        hlod: Option<Hlod>,
        animations: Vec<Animation>,
    ) -> Result<Self> {
        let scene = Scene {
            hierarchy,
            meshes,
            hlod,
            animations,
            extra_chunks: Vec::new(),
        };
        scene.validate()?;
        Ok(scene)
    }

    /// Validate every part and every reference to the bound hierarchy
    pub fn validate(&self) -> Result<()> {
        if let Some(hierarchy) = &self.hierarchy {
            hierarchy.validate()?;
        }
        for mesh in &self.meshes {
            mesh.validate()?;
        }
        for animation in &self.animations {
            animation.validate()?;
        }
        self.check_references()
    }

    /// Bind a hierarchy to a scene read without one
    ///
    /// The previous hierarchy (if any) is restored when the new one does not
    /// satisfy the scene's references.
    pub fn attach_hierarchy(&mut self, hierarchy: Hierarchy) -> Result<()> {
        hierarchy.validate()?;
        let previous = self.hierarchy.replace(hierarchy);
        if let Err(err) = self.check_references() {
            self.hierarchy = previous;
            return Err(err);
        }
        Ok(())
    }

    fn check_references(&self) -> Result<()> {
        if let Some(hlod) = &self.hlod {
            for sub_object in hlod.sub_objects() {
                if !self.resolves(&sub_object.name) {
                    return Err(W3dError::DanglingReference(format!(
                        "HLOD '{}' sub-object '{}' names no mesh in the scene",
                        hlod.name, sub_object.name
                    )));
                }
            }
        }

        let Some(hierarchy) = &self.hierarchy else {
            return Ok(());
        };
        let pivot_count = hierarchy.pivot_count();

        for animation in &self.animations {
            if !animation
                .hierarchy_name
                .eq_ignore_ascii_case(&hierarchy.name)
            {
                return Err(W3dError::DanglingReference(format!(
                    "animation '{}' targets hierarchy '{}', scene has '{}'",
                    animation.name, animation.hierarchy_name, hierarchy.name
                )));
            }
            if let Some(channel) = animation
                .channels
                .iter()
                .find(|c| c.pivot_index as usize >= pivot_count)
            {
                return Err(W3dError::DanglingReference(format!(
                    "animation '{}' drives pivot {} of {} in '{}'",
                    animation.name, channel.pivot_index, pivot_count, hierarchy.name
                )));
            }
        }

        for mesh in &self.meshes {
            let Some(influences) = &mesh.influences else {
                continue;
            };
            if let Some(bone) = influences
                .iter()
                .flat_map(|i| i.bones())
                .find(|&b| b as usize >= pivot_count)
            {
                return Err(W3dError::DanglingReference(format!(
                    "mesh '{}' is skinned to pivot {} of {} in '{}'",
                    mesh.full_name(),
                    bone,
                    pivot_count,
                    hierarchy.name
                )));
            }
        }

        if let Some(hlod) = &self.hlod {
            if !hlod.hierarchy_name.eq_ignore_ascii_case(&hierarchy.name) {
                return Err(W3dError::DanglingReference(format!(
                    "HLOD '{}' targets hierarchy '{}', scene has '{}'",
                    hlod.name, hlod.hierarchy_name, hierarchy.name
                )));
            }
            if let Some(sub_object) = hlod
                .sub_objects()
                .find(|s| s.bone_index as usize >= pivot_count)
            {
                return Err(W3dError::DanglingReference(format!(
                    "HLOD sub-object '{}' is bound to pivot {} of {}",
                    sub_object.name, sub_object.bone_index, pivot_count
                )));
            }
        }
        Ok(())
    }

    /// Whether an HLOD sub-object name resolves to a mesh or box in this scene
    fn resolves(&self, name: &str) -> bool {
        self.find_mesh(name).is_some()
            || self
                .extra_chunks
                .iter()
                .filter_map(box_name)
                .any(|b| b.eq_ignore_ascii_case(name))
    }

    /// Mesh by `CONTAINER.MESH` (or bare) name, ignoring ASCII case
    pub fn find_mesh(&self, name: &str) -> Option<&Mesh> {
        self.meshes
            .iter()
            .find(|m| m.full_name().eq_ignore_ascii_case(name))
    }

    pub fn find_animation(&self, name: &str) -> Option<&Animation> {
        self.animations
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// Build a scene from the top-level chunks of a file
    pub fn from_chunks(chunks: ChunkReader<'_>) -> Result<Self> {
        let mut scene = Scene::new();

        for chunk in chunks {
            let chunk = chunk?;
            let Some(decoder) = decoder_for(chunk.tag) else {
                if chunk.kind().is_none() {
                    warn!(
                        "preserving unknown top-level chunk {} ({} bytes)",
                        tag_label(chunk.tag),
                        chunk.payload.len()
                    );
                } else {
                    debug!("preserving top-level chunk {}", tag_label(chunk.tag));
                }
                scene.extra_chunks.push(RawChunk::from_chunk(&chunk)?);
                continue;
            };

            match decoder(&chunk)? {
                Decoded::Hierarchy(hierarchy) => {
                    if let Some(existing) = &scene.hierarchy {
                        return Err(W3dError::invalid_hierarchy(
                            &hierarchy.name,
                            format!("file already holds hierarchy '{}'", existing.name),
                        ));
                    }
                    scene.hierarchy = Some(hierarchy);
                }
                Decoded::Mesh(mesh) => scene.meshes.push(mesh),
                Decoded::Hlod(hlod) => {
                    if scene.hlod.is_some() {
                        return Err(chunk.malformed("file holds more than one HLOD"));
                    }
                    scene.hlod = Some(hlod);
                }
                Decoded::Animation(animation) => scene.animations.push(animation),
            }
        }

        scene.check_references()?;
        Ok(scene)
    }

    /// Append the chunks selected by `options.mode`
    pub fn write_chunks(&self, writer: &mut ChunkWriter, options: &ExportOptions) -> Result<()> {
        options.check(self)?;
        self.validate()?;

        let write_meshes = |writer: &mut ChunkWriter| -> Result<()> {
            for mesh in &self.meshes {
                mesh.write(writer)?;
            }
            Ok(())
        };
        let write_animations = |writer: &mut ChunkWriter| -> Result<()> {
            for animation in &self.animations {
                animation.write(writer, options.compression)?;
            }
            Ok(())
        };

        match options.mode {
            ExportMode::Model => write_meshes(writer)?,
            ExportMode::Skeleton => {
                if let Some(hierarchy) = &self.hierarchy {
                    hierarchy.write(writer)?;
                }
            }
            ExportMode::Animation => write_animations(writer)?,
            ExportMode::HierarchicalAnimatedModel => {
                if let Some(hierarchy) = &self.hierarchy {
                    hierarchy.write(writer)?;
                }
                write_meshes(writer)?;
                if let Some(hlod) = &self.hlod {
                    hlod.write(writer)?;
                }
                write_animations(writer)?;
                for extra in &self.extra_chunks {
                    extra.write(writer)?;
                }
            }
        }
        Ok(())
    }

    /// Serialize the chunks selected by `options.mode`
    pub fn to_bytes(&self, options: &ExportOptions) -> Result<Vec<u8>> {
        let mut writer = ChunkWriter::new();
        self.write_chunks(&mut writer, options)?;
        Ok(writer.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::animation::{Channel, ChannelKind, ChannelValue, Keyframe};
    use crate::chunk::read_chunks;
    use crate::hierarchy::Pivot;
    use crate::hlod::{HlodLod, HlodSubObject, NO_MAX_SCREEN_SIZE};
    use crate::mesh::{Triangle, VertexInfluence};
    use crate::options::Compression;

    fn skeleton() -> Hierarchy {
        let mut h = Hierarchy::new("TANK");
        h.pivots.push(Pivot::new("ROOTTRANSFORM", -1, Vec3::ZERO));
        h.pivots.push(Pivot::new("TURRET", 0, Vec3::Z));
        h
    }

    fn hull() -> Mesh {
        let mut mesh = Mesh::new("HULL", "TANK");
        mesh.vertices = vec![Vec3::ZERO, Vec3::X, Vec3::Y];
        mesh.triangles = vec![Triangle::from_positions(
            [0, 1, 2],
            [Vec3::ZERO, Vec3::X, Vec3::Y],
        )];
        mesh
    }

    fn hlod(bone: u32, name: &str) -> Hlod {
        let mut hlod = Hlod::new("TANK", "TANK");
        hlod.lods.push(HlodLod::new(
            NO_MAX_SCREEN_SIZE,
            vec![HlodSubObject {
                bone_index: bone,
                name: name.into(),
            }],
        ));
        hlod
    }

    fn turn(pivot: u16) -> Animation {
        let mut anim = Animation::new("TURN", "TANK", 10, 30);
        anim.channels.push(Channel::new(
            pivot,
            ChannelKind::ZRotation,
            vec![
                Keyframe::new(0, ChannelValue::Scalar(0.0)),
                Keyframe::new(9, ChannelValue::Scalar(1.0)),
            ],
        ));
        anim
    }

    #[test]
    fn test_assemble_valid_scene() {
        let scene = Scene::assemble(
            Some(skeleton()),
            vec![hull()],
            Some(hlod(0, "TANK.HULL")),
            vec![turn(1)],
        )
        .unwrap();
        assert!(scene.find_mesh("tank.hull").is_some());
        assert!(scene.find_animation("TURN").is_some());
    }

    #[test]
    fn test_animation_pivot_out_of_range() {
        let err = Scene::assemble(Some(skeleton()), vec![], None, vec![turn(2)]).unwrap_err();
        assert!(matches!(err, W3dError::DanglingReference(_)));
    }

    #[test]
    fn test_animation_hierarchy_name_mismatch() {
        let mut anim = turn(1);
        anim.hierarchy_name = "OTHER".into();
        let err = Scene::assemble(Some(skeleton()), vec![], None, vec![anim]).unwrap_err();
        assert!(matches!(err, W3dError::DanglingReference(_)));
    }

    #[test]
    fn test_skin_bone_out_of_range() {
        let mut mesh = hull();
        mesh.set_influences(vec![VertexInfluence::rigid(5); 3]);
        let err = Scene::assemble(Some(skeleton()), vec![mesh], None, vec![]).unwrap_err();
        assert!(matches!(err, W3dError::DanglingReference(_)));
    }

    #[test]
    fn test_hlod_references() {
        let err = Scene::assemble(
            Some(skeleton()),
            vec![hull()],
            Some(hlod(0, "TANK.TRACKS")),
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, W3dError::DanglingReference(_)));

        let err = Scene::assemble(
            Some(skeleton()),
            vec![hull()],
            Some(hlod(9, "TANK.HULL")),
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, W3dError::DanglingReference(_)));
    }

    #[test]
    fn test_hlod_may_name_a_box() {
        let mut box_payload = vec![0u8; 68];
        box_payload[8..20].copy_from_slice(b"TANK.BOUNDS\0");
        let mut scene = Scene::new();
        scene.hierarchy = Some(skeleton());
        scene.meshes.push(hull());
        scene
            .extra_chunks
            .push(RawChunk::data(ChunkKind::Box.tag(), box_payload));
        scene.hlod = Some(hlod(0, "TANK.BOUNDS"));
        scene.validate().unwrap();
    }

    #[test]
    fn test_animation_only_scene_and_attach() {
        let mut scene = Scene::assemble(None, vec![], None, vec![turn(1)]).unwrap();

        // A skeleton with too few pivots is refused and nothing is bound
        let mut small = skeleton();
        small.pivots.truncate(1);
        assert!(matches!(
            scene.attach_hierarchy(small),
            Err(W3dError::DanglingReference(_))
        ));
        assert!(scene.hierarchy.is_none());

        scene.attach_hierarchy(skeleton()).unwrap();
        assert_eq!(scene.hierarchy.as_ref().map(|h| h.pivot_count()), Some(2));
    }

    #[test]
    fn test_export_mode_filtering() {
        let mut scene = Scene::assemble(
            Some(skeleton()),
            vec![hull()],
            Some(hlod(0, "TANK.HULL")),
            vec![turn(1)],
        )
        .unwrap();
        scene
            .extra_chunks
            .push(RawChunk::data(0x0000_0999, vec![7; 3]));

        let tags = |mode: ExportMode| -> Vec<u32> {
            let bytes = scene
                .to_bytes(&ExportOptions::new(mode, Compression::TimeCoded))
                .unwrap();
            read_chunks(&bytes).map(|c| c.unwrap().tag).collect()
        };

        assert_eq!(tags(ExportMode::Model), vec![ChunkKind::Mesh.tag()]);
        assert_eq!(tags(ExportMode::Skeleton), vec![ChunkKind::Hierarchy.tag()]);
        assert_eq!(
            tags(ExportMode::Animation),
            vec![ChunkKind::CompressedAnimation.tag()]
        );
        assert_eq!(
            tags(ExportMode::HierarchicalAnimatedModel),
            vec![
                ChunkKind::Hierarchy.tag(),
                ChunkKind::Mesh.tag(),
                ChunkKind::Hlod.tag(),
                ChunkKind::CompressedAnimation.tag(),
                0x0000_0999,
            ]
        );
    }

    #[test]
    fn test_duplicate_hierarchy_rejected() {
        let mut writer = ChunkWriter::new();
        skeleton().write(&mut writer).unwrap();
        skeleton().write(&mut writer).unwrap();
        let bytes = writer.into_bytes();
        assert!(matches!(
            Scene::from_chunks(read_chunks(&bytes)),
            Err(W3dError::InvalidHierarchy { .. })
        ));
    }

    #[test]
    fn test_decoder_table_covers_containers() {
        for (kind, _) in DECODERS {
            assert!(kind.is_container(), "{:?}", kind);
        }
        assert!(decoder_for(ChunkKind::Box.tag()).is_none());
    }
}
