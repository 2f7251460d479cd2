//! Fixed-size mesh records

use glam::Vec3;

use crate::error::Result;
use crate::primitives::{BinaryRecord, ByteReader, NAME_LEN, WriteLe};

/// Mesh chunk version written on export (4.2)
pub const MESH_VERSION: u32 = 0x0004_0002;

// Vertex channel bits
pub const VERTEX_CHANNEL_LOCATION: u32 = 0x01;
pub const VERTEX_CHANNEL_NORMAL: u32 = 0x02;
pub const VERTEX_CHANNEL_TEXCOORD: u32 = 0x04;
pub const VERTEX_CHANNEL_COLOR: u32 = 0x08;
pub const VERTEX_CHANNEL_BONEID: u32 = 0x10;

/// Face channel bit for the triangle array
pub const FACE_CHANNEL_FACE: u32 = 0x01;

/// Geometry type bits of the mesh attributes
pub const GEOMETRY_TYPE_MASK: u32 = 0x00FF_0000;
pub const GEOMETRY_TYPE_NORMAL: u32 = 0x0000_0000;
pub const GEOMETRY_TYPE_SKIN: u32 = 0x0002_0000;

/// `MESH_HEADER3` payload (116 bytes)
///
/// # Layout
/// ```text
/// 0x00: version u32
/// 0x04: attributes u32
/// 0x08: mesh_name [16]
/// 0x18: container_name [16]
/// 0x28: num_tris u32
/// 0x2C: num_vertices u32
/// 0x30: num_materials u32
/// 0x34: num_damage_stages u32
/// 0x38: sort_level i32
/// 0x3C: prelit_version u32
/// 0x40: future_counts u32
/// 0x44: vertex_channels u32
/// 0x48: face_channels u32
/// 0x4C: min Vec3
/// 0x58: max Vec3
/// 0x64: sph_center Vec3
/// 0x70: sph_radius f32
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MeshHeader {
    pub version: u32,
    pub attributes: u32,
    pub mesh_name: String,
    pub container_name: String,
    pub num_tris: u32,
    pub num_vertices: u32,
    pub num_materials: u32,
    pub num_damage_stages: u32,
    pub sort_level: i32,
    pub prelit_version: u32,
    pub future_counts: u32,
    pub vertex_channels: u32,
    pub face_channels: u32,
    pub min: Vec3,
    pub max: Vec3,
    pub sph_center: Vec3,
    pub sph_radius: f32,
}

impl BinaryRecord for MeshHeader {
    const SIZE: usize = 116;

    fn read(reader: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self {
            version: reader.read_u32()?,
            attributes: reader.read_u32()?,
            mesh_name: reader.read_name(NAME_LEN)?,
            container_name: reader.read_name(NAME_LEN)?,
            num_tris: reader.read_u32()?,
            num_vertices: reader.read_u32()?,
            num_materials: reader.read_u32()?,
            num_damage_stages: reader.read_u32()?,
            sort_level: reader.read_i32()?,
            prelit_version: reader.read_u32()?,
            future_counts: reader.read_u32()?,
            vertex_channels: reader.read_u32()?,
            face_channels: reader.read_u32()?,
            min: reader.read_vec3()?,
            max: reader.read_vec3()?,
            sph_center: reader.read_vec3()?,
            sph_radius: reader.read_f32()?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        out.write_u32(self.version);
        out.write_u32(self.attributes);
        out.write_name(&self.mesh_name, NAME_LEN)?;
        out.write_name(&self.container_name, NAME_LEN)?;
        out.write_u32(self.num_tris);
        out.write_u32(self.num_vertices);
        out.write_u32(self.num_materials);
        out.write_u32(self.num_damage_stages);
        out.write_i32(self.sort_level);
        out.write_u32(self.prelit_version);
        out.write_u32(self.future_counts);
        out.write_u32(self.vertex_channels);
        out.write_u32(self.face_channels);
        out.write_vec3(self.min);
        out.write_vec3(self.max);
        out.write_vec3(self.sph_center);
        out.write_f32(self.sph_radius);
        Ok(())
    }
}

/// Triangle with its plane equation (32 bytes)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub vertex_indices: [u32; 3],
    /// Surface type attributes
    pub attributes: u32,
    pub normal: Vec3,
    /// Plane distance from the origin
    pub distance: f32,
}

impl Triangle {
    /// Triangle with its plane computed from the given positions
    pub fn from_positions(vertex_indices: [u32; 3], positions: [Vec3; 3]) -> Self {
        let normal = (positions[1] - positions[0])
            .cross(positions[2] - positions[0])
            .normalize_or_zero();
        Self {
            vertex_indices,
            attributes: 0,
            normal,
            distance: normal.dot(positions[0]),
        }
    }
}

impl BinaryRecord for Triangle {
    const SIZE: usize = 32;

    fn read(reader: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self {
            vertex_indices: [reader.read_u32()?, reader.read_u32()?, reader.read_u32()?],
            attributes: reader.read_u32()?,
            normal: reader.read_vec3()?,
            distance: reader.read_f32()?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        for &index in &self.vertex_indices {
            out.write_u32(index);
        }
        out.write_u32(self.attributes);
        out.write_vec3(self.normal);
        out.write_f32(self.distance);
        Ok(())
    }
}

/// Skin binding of one vertex (8 bytes)
///
/// Weights are integer percentages as stored on disk. A legacy influence with
/// both weights zero means "fully bound to `bone_index`".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexInfluence {
    pub bone_index: u16,
    pub extra_bone_index: u16,
    pub bone_weight: u16,
    pub extra_weight: u16,
}

impl VertexInfluence {
    /// Vertex fully bound to one bone
    pub fn rigid(bone_index: u16) -> Self {
        Self {
            bone_index,
            extra_bone_index: 0,
            bone_weight: 100,
            extra_weight: 0,
        }
    }

    /// Normalized weights `(primary, extra)`
    pub fn weights(&self) -> (f32, f32) {
        if self.bone_weight == 0 && self.extra_weight == 0 {
            return (1.0, 0.0);
        }
        (
            self.bone_weight as f32 / 100.0,
            self.extra_weight as f32 / 100.0,
        )
    }

    /// Bone indices that carry weight
    pub fn bones(&self) -> impl Iterator<Item = u16> {
        let extra = (self.extra_weight > 0).then_some(self.extra_bone_index);
        std::iter::once(self.bone_index).chain(extra)
    }
}

impl BinaryRecord for VertexInfluence {
    const SIZE: usize = 8;

    fn read(reader: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self {
            bone_index: reader.read_u16()?,
            extra_bone_index: reader.read_u16()?,
            bone_weight: reader.read_u16()?,
            extra_weight: reader.read_u16()?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        out.write_u16(self.bone_index);
        out.write_u16(self.extra_bone_index);
        out.write_u16(self.bone_weight);
        out.write_u16(self.extra_weight);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_sizes() {
        let header = MeshHeader {
            version: MESH_VERSION,
            attributes: 0,
            mesh_name: "BOX".into(),
            container_name: "CRATE".into(),
            num_tris: 12,
            num_vertices: 8,
            num_materials: 1,
            num_damage_stages: 0,
            sort_level: 0,
            prelit_version: 0,
            future_counts: 0,
            vertex_channels: VERTEX_CHANNEL_LOCATION | VERTEX_CHANNEL_NORMAL,
            face_channels: FACE_CHANNEL_FACE,
            min: Vec3::splat(-1.0),
            max: Vec3::ONE,
            sph_center: Vec3::ZERO,
            sph_radius: 3f32.sqrt(),
        };
        let mut out = Vec::new();
        header.write(&mut out).unwrap();
        assert_eq!(out.len(), MeshHeader::SIZE);
        assert_eq!(MeshHeader::read(&mut ByteReader::new(&out)).unwrap(), header);

        let mut out = Vec::new();
        Triangle::from_positions([0, 1, 2], [Vec3::ZERO, Vec3::X, Vec3::Y])
            .write(&mut out)
            .unwrap();
        assert_eq!(out.len(), Triangle::SIZE);

        let mut out = Vec::new();
        VertexInfluence::rigid(3).write(&mut out).unwrap();
        assert_eq!(out, vec![3, 0, 0, 0, 100, 0, 0, 0]);
    }

    #[test]
    fn test_triangle_plane() {
        let tri = Triangle::from_positions(
            [0, 1, 2],
            [Vec3::new(0.0, 0.0, 2.0), Vec3::new(1.0, 0.0, 2.0), Vec3::new(0.0, 1.0, 2.0)],
        );
        assert_eq!(tri.normal, Vec3::Z);
        assert_eq!(tri.distance, 2.0);
    }

    #[test]
    fn test_influence_weights() {
        let legacy = VertexInfluence {
            bone_index: 4,
            extra_bone_index: 0,
            bone_weight: 0,
            extra_weight: 0,
        };
        assert_eq!(legacy.weights(), (1.0, 0.0));
        assert_eq!(legacy.bones().collect::<Vec<_>>(), vec![4]);

        let blended = VertexInfluence {
            bone_index: 1,
            extra_bone_index: 2,
            bone_weight: 75,
            extra_weight: 25,
        };
        assert_eq!(blended.weights(), (0.75, 0.25));
        assert_eq!(blended.bones().collect::<Vec<_>>(), vec![1, 2]);
    }
}
