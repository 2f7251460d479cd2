//! Mesh model (`MESH` chunk)
//!
//! # Layout
//! ```text
//! MESH (container)
//!   MESH_HEADER3 (116 bytes)
//!   MESH_USER_TEXT      - null-terminated string (optional)
//!   VERTICES            - num_vertices × Vec3
//!   VERTEX_NORMALS      - num_vertices × Vec3 (optional)
//!   TRIANGLES           - num_tris × 32 bytes
//!   VERTEX_INFLUENCES   - num_vertices × 8 bytes (skinned meshes)
//!   material chunks     - kept opaque
//!   anything else       - kept opaque
//! ```

mod material;
mod records;

use glam::Vec3;
use tracing::{debug, warn};

use crate::chunk::{Chunk, ChunkKind, ChunkWriter, RawChunk, tag_label};
use crate::error::{Result, W3dError};
use crate::primitives::{BinaryRecord, WriteLe, decode_name};

pub use material::{MATERIAL_KINDS, Material};
pub use records::{
    FACE_CHANNEL_FACE, GEOMETRY_TYPE_MASK, GEOMETRY_TYPE_NORMAL, GEOMETRY_TYPE_SKIN, MESH_VERSION,
    MeshHeader, Triangle, VERTEX_CHANNEL_BONEID, VERTEX_CHANNEL_COLOR, VERTEX_CHANNEL_LOCATION,
    VERTEX_CHANNEL_NORMAL, VERTEX_CHANNEL_TEXCOORD, VertexInfluence,
};

const VEC3_SIZE: usize = 12;

/// Geometry, skin and materials of one render object
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub name: String,
    /// Owning model; sub-objects are addressed as `CONTAINER.MESH`
    pub container_name: String,
    /// Mesh attribute bits (geometry type, collision flags), written verbatim
    ///
    /// The geometry type is `GEOMETRY_TYPE_SKIN` exactly when `influences` is
    /// set; [`Mesh::validate`] rejects anything else.
    pub attributes: u32,
    pub sort_level: i32,
    pub vertices: Vec<Vec3>,
    /// Empty, or one normal per vertex
    pub normals: Vec<Vec3>,
    pub triangles: Vec<Triangle>,
    pub materials: Vec<Material>,
    /// One influence per vertex for skinned meshes
    pub influences: Option<Vec<VertexInfluence>>,
    pub user_text: Option<String>,
    /// Sub-chunks this codec does not interpret
    pub extra_chunks: Vec<RawChunk>,
}

impl Mesh {
    pub fn new(name: impl Into<String>, container_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            container_name: container_name.into(),
            attributes: GEOMETRY_TYPE_NORMAL,
            sort_level: 0,
            vertices: Vec::new(),
            normals: Vec::new(),
            triangles: Vec::new(),
            materials: Vec::new(),
            influences: None,
            user_text: None,
            extra_chunks: Vec::new(),
        }
    }

    /// `CONTAINER.MESH`, or just the mesh name without a container
    pub fn full_name(&self) -> String {
        if self.container_name.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.container_name, self.name)
        }
    }

    pub fn is_skinned(&self) -> bool {
        self.influences.is_some()
    }

    /// Bind the mesh to a skeleton and mark it as skin geometry
    pub fn set_influences(&mut self, influences: Vec<VertexInfluence>) {
        self.influences = Some(influences);
        self.attributes = (self.attributes & !GEOMETRY_TYPE_MASK) | GEOMETRY_TYPE_SKIN;
    }

    /// Drop the skin and turn the mesh back into normal geometry
    pub fn clear_influences(&mut self) {
        self.influences = None;
        if self.attributes & GEOMETRY_TYPE_MASK == GEOMETRY_TYPE_SKIN {
            self.attributes = (self.attributes & !GEOMETRY_TYPE_MASK) | GEOMETRY_TYPE_NORMAL;
        }
    }

    pub fn geometry_type(&self) -> u32 {
        self.attributes & GEOMETRY_TYPE_MASK
    }

    /// Axis-aligned bounds of the vertices
    pub fn bounds(&self) -> (Vec3, Vec3) {
        if self.vertices.is_empty() {
            return (Vec3::ZERO, Vec3::ZERO);
        }
        self.vertices.iter().fold(
            (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)),
            |(min, max), &v| (min.min(v), max.max(v)),
        )
    }

    /// Bounding sphere centered on the bounding box
    pub fn bounding_sphere(&self) -> (Vec3, f32) {
        let (min, max) = self.bounds();
        let center = (min + max) * 0.5;
        let radius = self
            .vertices
            .iter()
            .map(|v| v.distance(center))
            .fold(0.0f32, f32::max);
        (center, radius)
    }

    /// Texture names referenced by the mesh materials
    pub fn texture_names(&self) -> Vec<String> {
        self.materials.iter().flat_map(|m| m.texture_names()).collect()
    }

    /// Check array lengths, triangle indices and the skin geometry type
    pub fn validate(&self) -> Result<()> {
        let vertex_count = self.vertices.len();

        let skin_geometry = self.geometry_type() == GEOMETRY_TYPE_SKIN;
        if skin_geometry != self.is_skinned() {
            return Err(W3dError::inconsistent_mesh(
                &self.full_name(),
                format!(
                    "attributes {:#010x} {} skin geometry but the mesh {} vertex influences",
                    self.attributes,
                    if skin_geometry { "declare" } else { "do not declare" },
                    if self.is_skinned() { "has" } else { "has no" }
                ),
            ));
        }

        if !self.normals.is_empty() && self.normals.len() != vertex_count {
            return Err(W3dError::inconsistent_mesh(
                &self.full_name(),
                format!("{} normals for {} vertices", self.normals.len(), vertex_count),
            ));
        }

        if let Some(influences) = &self.influences {
            if influences.len() != vertex_count {
                return Err(W3dError::inconsistent_mesh(
                    &self.full_name(),
                    format!(
                        "{} influences for {} vertices",
                        influences.len(),
                        vertex_count
                    ),
                ));
            }
        }

        for (t, triangle) in self.triangles.iter().enumerate() {
            if let Some(&index) = triangle
                .vertex_indices
                .iter()
                .find(|&&i| i as usize >= vertex_count)
            {
                return Err(W3dError::inconsistent_mesh(
                    &self.full_name(),
                    format!(
                        "triangle {} uses vertex {} of {}",
                        t, index, vertex_count
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Header describing the current data
    pub fn header(&self) -> Result<MeshHeader> {
        let count = |what: &str, len: usize| {
            u32::try_from(len).map_err(|_| {
                W3dError::Unencodable(format!("{} {} in mesh '{}'", len, what, self.full_name()))
            })
        };

        let mut vertex_channels = 0;
        if !self.vertices.is_empty() {
            vertex_channels |= VERTEX_CHANNEL_LOCATION;
        }
        if !self.normals.is_empty() {
            vertex_channels |= VERTEX_CHANNEL_NORMAL;
        }
        if self.is_skinned() {
            vertex_channels |= VERTEX_CHANNEL_BONEID;
        }
        for material in &self.materials {
            for stage in material.chunk.children_of(ChunkKind::TextureStage) {
                if stage.children_of(ChunkKind::StageTexcoords).next().is_some() {
                    vertex_channels |= VERTEX_CHANNEL_TEXCOORD;
                }
            }
            if material.chunk.children_of(ChunkKind::Dcg).next().is_some() {
                vertex_channels |= VERTEX_CHANNEL_COLOR;
            }
        }

        let (min, max) = self.bounds();
        let (sph_center, sph_radius) = self.bounding_sphere();
        let materials: usize = self
            .materials
            .iter()
            .map(Material::vertex_material_count)
            .sum();

        Ok(MeshHeader {
            version: MESH_VERSION,
            attributes: self.attributes,
            mesh_name: self.name.clone(),
            container_name: self.container_name.clone(),
            num_tris: count("triangles", self.triangles.len())?,
            num_vertices: count("vertices", self.vertices.len())?,
            num_materials: count("materials", materials)?,
            num_damage_stages: 0,
            sort_level: self.sort_level,
            prelit_version: 0,
            future_counts: 0,
            vertex_channels,
            face_channels: if self.triangles.is_empty() {
                0
            } else {
                FACE_CHANNEL_FACE
            },
            min,
            max,
            sph_center,
            sph_radius,
        })
    }

    /// Parse and validate a `MESH` chunk
    pub fn read(chunk: &Chunk<'_>) -> Result<Self> {
        let mut header: Option<MeshHeader> = None;
        let mut vertices: Option<Vec<Vec3>> = None;
        let mut normals = Vec::new();
        let mut triangles: Option<Vec<Triangle>> = None;
        let mut influences = None;
        let mut user_text = None;
        let mut materials = Vec::new();
        let mut extra_chunks = Vec::new();

        for child in chunk.children()? {
            let child = child?;
            match child.kind() {
                Some(ChunkKind::MeshHeader3) => {
                    let mut reader = child.reader();
                    header = Some(MeshHeader::read(&mut reader)?);
                    child.expect_consumed(&reader)?;
                }
                Some(ChunkKind::MeshUserText) => {
                    user_text = Some(decode_name(child.payload));
                }
                Some(ChunkKind::Vertices) => {
                    vertices = Some(read_vectors(&child)?);
                }
                Some(ChunkKind::VertexNormals) => {
                    normals = read_vectors(&child)?;
                }
                Some(ChunkKind::Triangles) => {
                    triangles = Some(read_array::<Triangle>(&child)?);
                }
                Some(ChunkKind::VertexInfluences) => {
                    influences = Some(read_array::<VertexInfluence>(&child)?);
                }
                _ if Material::is_material_tag(child.tag) => {
                    materials.push(Material::new(RawChunk::from_chunk(&child)?));
                }
                _ => {
                    if child.kind().is_none() {
                        warn!(
                            "preserving unknown chunk {} in mesh",
                            tag_label(child.tag)
                        );
                    }
                    extra_chunks.push(RawChunk::from_chunk(&child)?);
                }
            }
        }

        let header = header.ok_or_else(|| chunk.malformed("mesh has no MESH_HEADER3"))?;
        let vertices = vertices.unwrap_or_default();
        let triangles = triangles.unwrap_or_default();

        let mesh = Mesh {
            name: header.mesh_name.clone(),
            container_name: header.container_name.clone(),
            attributes: header.attributes,
            sort_level: header.sort_level,
            vertices,
            normals,
            triangles,
            materials,
            influences,
            user_text,
            extra_chunks,
        };

        if mesh.vertices.len() != header.num_vertices as usize {
            return Err(W3dError::inconsistent_mesh(
                &mesh.full_name(),
                format!(
                    "header declares {} vertices, chunk holds {}",
                    header.num_vertices,
                    mesh.vertices.len()
                ),
            ));
        }
        if mesh.triangles.len() != header.num_tris as usize {
            return Err(W3dError::inconsistent_mesh(
                &mesh.full_name(),
                format!(
                    "header declares {} triangles, chunk holds {}",
                    header.num_tris,
                    mesh.triangles.len()
                ),
            ));
        }
        mesh.validate()?;

        debug!(
            "mesh '{}': {} vertices, {} triangles, {} materials",
            mesh.full_name(),
            mesh.vertices.len(),
            mesh.triangles.len(),
            mesh.materials.len()
        );
        Ok(mesh)
    }

    /// Serialize as a `MESH` chunk
    pub fn write(&self, writer: &mut ChunkWriter) -> Result<()> {
        self.validate()?;
        let header = self.header()?;

        writer.container(ChunkKind::Mesh.tag(), |w| {
            w.data(ChunkKind::MeshHeader3.tag(), |out| header.write(out))?;

            if let Some(text) = &self.user_text {
                w.data(ChunkKind::MeshUserText.tag(), |out| {
                    out.extend_from_slice(text.as_bytes());
                    out.push(0);
                    Ok(())
                })?;
            }

            w.data(ChunkKind::Vertices.tag(), |out| {
                write_vectors(out, &self.vertices);
                Ok(())
            })?;

            if !self.normals.is_empty() {
                w.data(ChunkKind::VertexNormals.tag(), |out| {
                    write_vectors(out, &self.normals);
                    Ok(())
                })?;
            }

            w.data(ChunkKind::Triangles.tag(), |out| {
                for triangle in &self.triangles {
                    triangle.write(out)?;
                }
                Ok(())
            })?;

            if let Some(influences) = &self.influences {
                w.data(ChunkKind::VertexInfluences.tag(), |out| {
                    for influence in influences {
                        influence.write(out)?;
                    }
                    Ok(())
                })?;
            }

            for material in &self.materials {
                material.chunk.write(w)?;
            }
            for extra in &self.extra_chunks {
                extra.write(w)?;
            }
            Ok(())
        })
    }
}

fn read_vectors(chunk: &Chunk<'_>) -> Result<Vec<Vec3>> {
    if chunk.payload.len() % VEC3_SIZE != 0 {
        return Err(chunk.malformed(format!(
            "{} bytes is not a whole number of vectors",
            chunk.payload.len()
        )));
    }
    let mut reader = chunk.reader();
    let mut vectors = Vec::with_capacity(chunk.payload.len() / VEC3_SIZE);
    while !reader.is_empty() {
        vectors.push(reader.read_vec3()?);
    }
    Ok(vectors)
}

fn write_vectors(out: &mut Vec<u8>, vectors: &[Vec3]) {
    for &v in vectors {
        out.write_vec3(v);
    }
}

fn read_array<T: BinaryRecord>(chunk: &Chunk<'_>) -> Result<Vec<T>> {
    if chunk.payload.len() % T::SIZE != 0 {
        return Err(chunk.malformed(format!(
            "{} bytes is not a whole number of {}-byte records",
            chunk.payload.len(),
            T::SIZE
        )));
    }
    chunk.reader().read_records(chunk.payload.len() / T::SIZE)
}
