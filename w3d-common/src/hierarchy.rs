//! Skeleton hierarchy (`HIERARCHY` chunk)
//!
//! # Layout
//! ```text
//! HIERARCHY (container)
//!   HIERARCHY_HEADER (36 bytes)
//!     0x00: version u32
//!     0x04: name [16]
//!     0x14: num_pivots u32
//!     0x18: center Vec3
//!   PIVOTS (num_pivots × 60 bytes)
//!     0x00: name [16]
//!     0x10: parent_index u32     - 0xFFFFFFFF for the root
//!     0x14: translation Vec3
//!     0x20: euler_angles Vec3
//!     0x2C: rotation Quat (x, y, z, w)
//!   PIVOT_FIXUPS (num_pivots × 48 bytes, optional)
//!     3×4 row-major matrix per pivot
//!   (unknown sub-chunks are kept and written last)
//! ```

use glam::{Quat, Vec3};
use hashbrown::HashMap;
use tracing::{debug, warn};

use crate::chunk::{Chunk, ChunkKind, ChunkWriter, RawChunk, tag_label};
use crate::error::{Result, W3dError};
use crate::primitives::{BinaryRecord, ByteReader, NAME_LEN, WriteLe};

/// Hierarchy chunk version written on export (4.1)
pub const HIERARCHY_VERSION: u32 = 0x0004_0001;

/// Parent index stored for the root pivot
pub const ROOT_PARENT: u32 = 0xFFFF_FFFF;

/// 3×4 fixup matrix, row-major
pub type FixupMatrix = [[f32; 4]; 3];

/// Identity fixup
pub const IDENTITY_FIXUP: FixupMatrix = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
];

/// One bone of the skeleton
#[derive(Debug, Clone, PartialEq)]
pub struct Pivot {
    pub name: String,
    /// Index of the parent pivot, -1 for the root
    pub parent_index: i32,
    pub translation: Vec3,
    pub euler_angles: Vec3,
    pub rotation: Quat,
    pub fixup: FixupMatrix,
}

impl Pivot {
    /// Pivot with identity rotation and fixup
    pub fn new(name: impl Into<String>, parent_index: i32, translation: Vec3) -> Self {
        Self {
            name: name.into(),
            parent_index,
            translation,
            euler_angles: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            fixup: IDENTITY_FIXUP,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_index < 0
    }
}

impl BinaryRecord for Pivot {
    const SIZE: usize = 60;

    fn read(reader: &mut ByteReader<'_>) -> Result<Self> {
        let name = reader.read_name(NAME_LEN)?;
        let parent = reader.read_u32()?;
        Ok(Self {
            name,
            parent_index: if parent == ROOT_PARENT {
                -1
            } else {
                parent as i32
            },
            translation: reader.read_vec3()?,
            euler_angles: reader.read_vec3()?,
            rotation: reader.read_quat()?,
            fixup: IDENTITY_FIXUP,
        })
    }

    fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        out.write_name(&self.name, NAME_LEN)?;
        out.write_u32(if self.parent_index < 0 {
            ROOT_PARENT
        } else {
            self.parent_index as u32
        });
        out.write_vec3(self.translation);
        out.write_vec3(self.euler_angles);
        out.write_quat(self.rotation);
        Ok(())
    }
}

/// `HIERARCHY_HEADER` payload
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchyHeader {
    pub version: u32,
    pub name: String,
    pub num_pivots: u32,
    pub center: Vec3,
}

impl BinaryRecord for HierarchyHeader {
    const SIZE: usize = 36;

    fn read(reader: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self {
            version: reader.read_u32()?,
            name: reader.read_name(NAME_LEN)?,
            num_pivots: reader.read_u32()?,
            center: reader.read_vec3()?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        out.write_u32(self.version);
        out.write_name(&self.name, NAME_LEN)?;
        out.write_u32(self.num_pivots);
        out.write_vec3(self.center);
        Ok(())
    }
}

const FIXUP_SIZE: usize = 48;

/// Named tree of pivots
#[derive(Debug, Clone, PartialEq)]
pub struct Hierarchy {
    pub name: String,
    pub center: Vec3,
    pub pivots: Vec<Pivot>,
    /// Unrecognized sub-chunks, written back after the fixups
    pub extra_chunks: Vec<RawChunk>,
}

impl Hierarchy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            center: Vec3::ZERO,
            pivots: Vec::new(),
            extra_chunks: Vec::new(),
        }
    }

    pub fn pivot_count(&self) -> usize {
        self.pivots.len()
    }

    /// Index of the pivot called `name`
    pub fn find_pivot(&self, name: &str) -> Result<usize> {
        self.pivots
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| W3dError::UnknownBone(name.to_string()))
    }

    /// Owned name → index map for repeated lookups
    pub fn pivot_lookup(&self) -> HashMap<String, usize> {
        self.pivots
            .iter()
            .enumerate()
            .map(|(i, p)| (p.name.clone(), i))
            .collect()
    }

    /// Indices of the direct children of `index`
    pub fn children_of(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.pivots
            .iter()
            .enumerate()
            .filter(move |(_, p)| p.parent_index == index as i32)
            .map(|(i, _)| i)
    }

    /// Check ordering, root count and name uniqueness
    pub fn validate(&self) -> Result<()> {
        let mut roots = 0;
        let mut seen: HashMap<&str, usize> = HashMap::with_capacity(self.pivots.len());

        for (index, pivot) in self.pivots.iter().enumerate() {
            if pivot.parent_index < -1 {
                return Err(W3dError::invalid_hierarchy(
                    &self.name,
                    format!("pivot '{}' has parent index {}", pivot.name, pivot.parent_index),
                ));
            }
            if pivot.is_root() {
                roots += 1;
            } else if pivot.parent_index as usize >= index {
                return Err(W3dError::invalid_hierarchy(
                    &self.name,
                    format!(
                        "pivot {} '{}' has parent {}, parents must precede children",
                        index, pivot.name, pivot.parent_index
                    ),
                ));
            }
            if let Some(previous) = seen.insert(pivot.name.as_str(), index) {
                return Err(W3dError::invalid_hierarchy(
                    &self.name,
                    format!(
                        "pivots {} and {} are both named '{}'",
                        previous, index, pivot.name
                    ),
                ));
            }
        }

        if roots != 1 {
            return Err(W3dError::invalid_hierarchy(
                &self.name,
                format!("expected exactly one root pivot, found {}", roots),
            ));
        }
        Ok(())
    }

    /// Parse and validate a `HIERARCHY` chunk
    pub fn read(chunk: &Chunk<'_>) -> Result<Self> {
        let mut header: Option<HierarchyHeader> = None;
        let mut pivots: Option<Vec<Pivot>> = None;
        let mut fixups: Option<Vec<FixupMatrix>> = None;
        let mut extra_chunks = Vec::new();

        for child in chunk.children()? {
            let child = child?;
            match child.kind() {
                Some(ChunkKind::HierarchyHeader) => {
                    let mut reader = child.reader();
                    header = Some(HierarchyHeader::read(&mut reader)?);
                    child.expect_consumed(&reader)?;
                }
                Some(ChunkKind::Pivots) => {
                    if child.payload.len() % Pivot::SIZE != 0 {
                        return Err(child.malformed(format!(
                            "{} bytes is not a whole number of pivots",
                            child.payload.len()
                        )));
                    }
                    let mut reader = child.reader();
                    pivots = Some(reader.read_records(child.payload.len() / Pivot::SIZE)?);
                }
                Some(ChunkKind::PivotFixups) => {
                    if child.payload.len() % FIXUP_SIZE != 0 {
                        return Err(child.malformed(format!(
                            "{} bytes is not a whole number of fixup matrices",
                            child.payload.len()
                        )));
                    }
                    let mut reader = child.reader();
                    let mut matrices = Vec::with_capacity(child.payload.len() / FIXUP_SIZE);
                    while !reader.is_empty() {
                        let mut matrix = IDENTITY_FIXUP;
                        for row in matrix.iter_mut() {
                            for value in row.iter_mut() {
                                *value = reader.read_f32()?;
                            }
                        }
                        matrices.push(matrix);
                    }
                    fixups = Some(matrices);
                }
                _ => {
                    warn!("keeping unknown chunk {} in hierarchy", tag_label(child.tag));
                    extra_chunks.push(RawChunk::from_chunk(&child)?);
                }
            }
        }

        let header = header.ok_or_else(|| chunk.malformed("hierarchy has no header"))?;
        let mut pivots = pivots.unwrap_or_default();

        if pivots.len() != header.num_pivots as usize {
            return Err(W3dError::invalid_hierarchy(
                &header.name,
                format!(
                    "header declares {} pivots, chunk holds {}",
                    header.num_pivots,
                    pivots.len()
                ),
            ));
        }
        if let Some(fixups) = fixups {
            if fixups.len() != pivots.len() {
                return Err(W3dError::invalid_hierarchy(
                    &header.name,
                    format!("{} fixups for {} pivots", fixups.len(), pivots.len()),
                ));
            }
            for (pivot, fixup) in pivots.iter_mut().zip(fixups) {
                pivot.fixup = fixup;
            }
        }

        let hierarchy = Hierarchy {
            name: header.name,
            center: header.center,
            pivots,
            extra_chunks,
        };
        hierarchy.validate()?;

        debug!(
            "hierarchy '{}': {} pivots",
            hierarchy.name,
            hierarchy.pivots.len()
        );
        Ok(hierarchy)
    }

    /// Serialize as a `HIERARCHY` chunk
    pub fn write(&self, writer: &mut ChunkWriter) -> Result<()> {
        let num_pivots = u32::try_from(self.pivots.len()).map_err(|_| {
            W3dError::Unencodable(format!("{} pivots in '{}'", self.pivots.len(), self.name))
        })?;

        writer.container(ChunkKind::Hierarchy.tag(), |w| {
            w.data(ChunkKind::HierarchyHeader.tag(), |out| {
                HierarchyHeader {
                    version: HIERARCHY_VERSION,
                    name: self.name.clone(),
                    num_pivots,
                    center: self.center,
                }
                .write(out)
            })?;

            w.data(ChunkKind::Pivots.tag(), |out| {
                for pivot in &self.pivots {
                    pivot.write(out)?;
                }
                Ok(())
            })?;

            w.data(ChunkKind::PivotFixups.tag(), |out| {
                for pivot in &self.pivots {
                    for row in &pivot.fixup {
                        for &value in row {
                            out.write_f32(value);
                        }
                    }
                }
                Ok(())
            })?;

            for extra in &self.extra_chunks {
                extra.write(w)?;
            }
            Ok(())
        })
    }
}
