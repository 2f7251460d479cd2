//! Scene construction from bone names
//!
//! Authoring tools know bones by name, while the file format stores pivot
//! indices. [`SceneBuilder`] collects bones, meshes and animation tracks keyed
//! by name and resolves them in one pass when [`SceneBuilder::build`] runs.
//!
//! ```text
//! let mut builder = SceneBuilder::new("TANK");
//! builder
//!     .bone("TURRET", None, Vec3::Z, Quat::IDENTITY)
//!     .bone("BARREL", Some("TURRET"), Vec3::X, Quat::IDENTITY)
//!     .mesh(hull, None)
//!     .mesh(gun, Some("BARREL"));
//! let scene = builder.build()?;
//! ```
//!
//! Pivot 0 is always an inserted `ROOTTRANSFORM`; declared bones follow in
//! declaration order. Bones without a parent hang off the root.

use glam::{Quat, Vec3};
use hashbrown::HashMap;
use tracing::{debug, warn};

use crate::animation::{Animation, Channel, ChannelKind, Keyframe};
use crate::error::{Result, W3dError};
use crate::hierarchy::{Hierarchy, Pivot};
use crate::hlod::{Hlod, HlodLod, HlodSubObject, NO_MAX_SCREEN_SIZE};
use crate::mesh::{Mesh, VertexInfluence};
use crate::scene::Scene;

/// Name of the pivot inserted at index 0
pub const ROOT_PIVOT_NAME: &str = "ROOTTRANSFORM";

/// Weight of one bone on one vertex
#[derive(Debug, Clone, PartialEq)]
pub struct BoneWeight {
    pub bone: String,
    pub weight: f32,
}

impl BoneWeight {
    pub fn new(bone: impl Into<String>, weight: f32) -> Self {
        Self {
            bone: bone.into(),
            weight,
        }
    }
}

/// Keyframes for one property of one named bone
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub bone: String,
    pub kind: ChannelKind,
    pub keyframes: Vec<Keyframe>,
}

impl Track {
    pub fn new(bone: impl Into<String>, kind: ChannelKind, keyframes: Vec<Keyframe>) -> Self {
        Self {
            bone: bone.into(),
            kind,
            keyframes,
        }
    }
}

/// Animation clip addressed by bone names
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    pub frame_count: u32,
    pub frames_per_second: u32,
    pub tracks: Vec<Track>,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>, frame_count: u32, frames_per_second: u32) -> Self {
        Self {
            name: name.into(),
            frame_count,
            frames_per_second,
            tracks: Vec::new(),
        }
    }

    pub fn track(mut self, track: Track) -> Self {
        self.tracks.push(track);
        self
    }
}

#[derive(Debug, Clone)]
struct BoneDecl {
    name: String,
    parent: Option<String>,
    translation: Vec3,
    rotation: Quat,
}

#[derive(Debug, Clone)]
enum Binding {
    /// Rigidly attached to a bone (root when `None`)
    Bone(Option<String>),
    /// Per-vertex weights
    Skin(Vec<Vec<BoneWeight>>),
}

/// Collects named parts of a model and resolves them into a [`Scene`]
#[derive(Debug, Clone)]
pub struct SceneBuilder {
    name: String,
    bones: Vec<BoneDecl>,
    meshes: Vec<(Mesh, Binding)>,
    clips: Vec<AnimationClip>,
}

impl SceneBuilder {
    /// Start a model; `name` becomes the hierarchy, HLOD and mesh container name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bones: Vec::new(),
            meshes: Vec::new(),
            clips: Vec::new(),
        }
    }

    /// Declare a bone. Parents must be declared before their children.
    pub fn bone(
        &mut self,
        name: impl Into<String>,
        parent: Option<&str>,
        translation: Vec3,
        rotation: Quat,
    ) -> &mut Self {
        self.bones.push(BoneDecl {
            name: name.into(),
            parent: parent.map(str::to_owned),
            translation,
            rotation,
        });
        self
    }

    /// Add a mesh rigidly attached to `bone` (the root when `None`)
    pub fn mesh(&mut self, mesh: Mesh, bone: Option<&str>) -> &mut Self {
        self.meshes
            .push((mesh, Binding::Bone(bone.map(str::to_owned))));
        self
    }

    /// Add a mesh skinned by per-vertex bone weights
    ///
    /// Each vertex keeps at most its two heaviest bones. A vertex without
    /// weights is bound to the root.
    pub fn skinned_mesh(&mut self, mesh: Mesh, weights: Vec<Vec<BoneWeight>>) -> &mut Self {
        self.meshes.push((mesh, Binding::Skin(weights)));
        self
    }

    pub fn animation(&mut self, clip: AnimationClip) -> &mut Self {
        self.clips.push(clip);
        self
    }

    /// Resolve every name and assemble the scene
    pub fn build(&self) -> Result<Scene> {
        let hierarchy = self.build_hierarchy()?;
        let lookup = hierarchy.pivot_lookup();
        let resolve = |bone: &str| -> Result<u16> {
            let index = lookup
                .get(bone)
                .copied()
                .ok_or_else(|| W3dError::UnknownBone(bone.to_owned()))?;
            u16::try_from(index)
                .map_err(|_| W3dError::Unencodable(format!("pivot index {} of '{}'", index, bone)))
        };

        let mut meshes = Vec::with_capacity(self.meshes.len());
        let mut sub_objects = Vec::with_capacity(self.meshes.len());
        for (mesh, binding) in &self.meshes {
            let mut mesh = mesh.clone();
            mesh.container_name = self.name.clone();

            let bone_index = match binding {
                Binding::Bone(None) => 0,
                Binding::Bone(Some(bone)) => resolve(bone)?,
                Binding::Skin(weights) => {
                    if weights.len() != mesh.vertices.len() {
                        return Err(W3dError::inconsistent_mesh(
                            &mesh.full_name(),
                            format!(
                                "{} weight lists for {} vertices",
                                weights.len(),
                                mesh.vertices.len()
                            ),
                        ));
                    }
                    let influences = weights
                        .iter()
                        .map(|w| skin_influence(&mesh.name, w, &resolve))
                        .collect::<Result<Vec<_>>>()?;
                    mesh.set_influences(influences);
                    0
                }
            };

            sub_objects.push(HlodSubObject {
                bone_index: u32::from(bone_index),
                name: mesh.full_name(),
            });
            meshes.push(mesh);
        }

        let hlod = (!sub_objects.is_empty()).then(|| {
            let mut hlod = Hlod::new(self.name.clone(), self.name.clone());
            hlod.lods.push(HlodLod::new(NO_MAX_SCREEN_SIZE, sub_objects));
            hlod
        });

        let mut animations = Vec::with_capacity(self.clips.len());
        for clip in &self.clips {
            let mut animation = Animation::new(
                clip.name.clone(),
                self.name.clone(),
                clip.frame_count,
                clip.frames_per_second,
            );
            for track in &clip.tracks {
                animation.channels.push(Channel::new(
                    resolve(&track.bone)?,
                    track.kind,
                    track.keyframes.clone(),
                ));
            }
            animations.push(animation);
        }

        debug!(
            "built '{}': {} pivots, {} meshes, {} animations",
            self.name,
            hierarchy.pivot_count(),
            meshes.len(),
            animations.len()
        );
        Scene::assemble(Some(hierarchy), meshes, hlod, animations)
    }

    fn build_hierarchy(&self) -> Result<Hierarchy> {
        let mut hierarchy = Hierarchy::new(self.name.clone());
        hierarchy
            .pivots
            .push(Pivot::new(ROOT_PIVOT_NAME, -1, Vec3::ZERO));

        let mut indices: HashMap<&str, usize> = HashMap::new();
        indices.insert(ROOT_PIVOT_NAME, 0);
        let declared: HashMap<&str, usize> = self
            .bones
            .iter()
            .enumerate()
            .map(|(i, b)| (b.name.as_str(), i + 1))
            .collect();

        for (offset, bone) in self.bones.iter().enumerate() {
            let index = offset + 1;
            if indices.insert(bone.name.as_str(), index).is_some() {
                return Err(W3dError::invalid_hierarchy(
                    &self.name,
                    format!("bone '{}' declared twice", bone.name),
                ));
            }

            let parent = match bone.parent.as_deref() {
                None => 0,
                Some(parent) => match indices.get(parent) {
                    Some(&p) => p,
                    None if declared.contains_key(parent) => {
                        return Err(W3dError::invalid_hierarchy(
                            &self.name,
                            format!("bone '{}' declared before its parent '{}'", bone.name, parent),
                        ));
                    }
                    None => return Err(W3dError::UnknownBone(parent.to_owned())),
                },
            };
            let parent = i32::try_from(parent)
                .map_err(|_| W3dError::Unencodable(format!("pivot index {}", parent)))?;

            let mut pivot = Pivot::new(bone.name.clone(), parent, bone.translation);
            pivot.rotation = bone.rotation;
            hierarchy.pivots.push(pivot);
        }

        hierarchy.validate()?;
        Ok(hierarchy)
    }
}

/// Reduce a weight list to the on-disk two-bone percentage form
fn skin_influence<F>(mesh: &str, weights: &[BoneWeight], resolve: &F) -> Result<VertexInfluence>
where
    F: Fn(&str) -> Result<u16>,
{
    let mut sorted: Vec<&BoneWeight> = weights.iter().filter(|w| w.weight > 0.0).collect();
    sorted.sort_by(|a, b| b.weight.total_cmp(&a.weight));
    if sorted.len() > 2 {
        warn!(
            "mesh '{}': vertex has {} bone weights, keeping the two heaviest",
            mesh,
            sorted.len()
        );
        sorted.truncate(2);
    }

    match sorted.as_slice() {
        [] => Ok(VertexInfluence::rigid(0)),
        [only] => Ok(VertexInfluence::rigid(resolve(&only.bone)?)),
        [primary, extra] => {
            let total = primary.weight + extra.weight;
            let bone_weight = ((primary.weight / total) * 100.0).round() as u16;
            Ok(VertexInfluence {
                bone_index: resolve(&primary.bone)?,
                extra_bone_index: resolve(&extra.bone)?,
                bone_weight,
                extra_weight: 100 - bone_weight,
            })
        }
        _ => Err(W3dError::Unencodable(format!(
            "more than two bone weights on a vertex of '{}'",
            mesh
        ))),
    }
}
