//! Hierarchical level-of-detail model (`HLOD` chunk)
//!
//! Binds render objects to pivots. Sub-objects are addressed by their full
//! `CONTAINER.MESH` name.
//!
//! # Layout
//! ```text
//! HLOD (container)
//!   HLOD_HEADER (40 bytes)
//!     0x00: version u32
//!     0x04: lod_count u32
//!     0x08: name [16]
//!     0x18: hierarchy_name [16]
//!   HLOD_LOD_ARRAY (container, lod_count times)
//!     HLOD_SUB_OBJECT_ARRAY_HEADER (8 bytes)
//!       0x00: model_count u32
//!       0x04: max_screen_size f32
//!     HLOD_SUB_OBJECT (36 bytes, model_count times)
//!       0x00: bone_index u32
//!       0x04: name [32]
//!   HLOD_AGGREGATE_ARRAY (optional, same shape as a LOD array)
//!   HLOD_PROXY_ARRAY (optional, same shape as a LOD array)
//! ```
//!
//! Unknown sub-chunks, at either level, are kept and written back after the
//! known ones.

use tracing::{debug, warn};

use crate::chunk::{Chunk, ChunkKind, ChunkWriter, RawChunk, tag_label};
use crate::error::{Result, W3dError};
use crate::primitives::{BinaryRecord, ByteReader, LONG_NAME_LEN, NAME_LEN, WriteLe};

/// HLOD chunk version written on export (1.0)
pub const HLOD_VERSION: u32 = 0x0001_0000;

/// Screen size of a LOD that is never swapped out
pub const NO_MAX_SCREEN_SIZE: f32 = f32::MAX;

/// Render object bound to a pivot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HlodSubObject {
    pub bone_index: u32,
    /// `CONTAINER.MESH`
    pub name: String,
}

impl BinaryRecord for HlodSubObject {
    const SIZE: usize = 36;

    fn read(reader: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self {
            bone_index: reader.read_u32()?,
            name: reader.read_name(LONG_NAME_LEN)?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        out.write_u32(self.bone_index);
        out.write_name(&self.name, LONG_NAME_LEN)
    }
}

/// Sub-object array: one level of detail, the aggregates or the proxies
#[derive(Debug, Clone, PartialEq)]
pub struct HlodLod {
    pub max_screen_size: f32,
    pub sub_objects: Vec<HlodSubObject>,
    pub extra_chunks: Vec<RawChunk>,
}

impl HlodLod {
    pub fn new(max_screen_size: f32, sub_objects: Vec<HlodSubObject>) -> Self {
        Self {
            max_screen_size,
            sub_objects,
            extra_chunks: Vec::new(),
        }
    }
}

/// `HLOD` chunk
#[derive(Debug, Clone, PartialEq)]
pub struct Hlod {
    pub name: String,
    pub hierarchy_name: String,
    pub lods: Vec<HlodLod>,
    /// Objects attached regardless of the active LOD
    pub aggregates: Option<HlodLod>,
    /// Named stand-ins, typically collision objects
    pub proxies: Option<HlodLod>,
    pub extra_chunks: Vec<RawChunk>,
}

impl Hlod {
    pub fn new(name: impl Into<String>, hierarchy_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hierarchy_name: hierarchy_name.into(),
            lods: Vec::new(),
            aggregates: None,
            proxies: None,
            extra_chunks: Vec::new(),
        }
    }

    /// Attach `sub_object` to the aggregate array, creating it if needed
    pub fn add_aggregate(&mut self, sub_object: HlodSubObject) {
        self.aggregates
            .get_or_insert_with(|| HlodLod::new(0.0, Vec::new()))
            .sub_objects
            .push(sub_object);
    }

    /// Every render object across LODs and aggregates
    ///
    /// Proxies are left out; they name objects that need not be meshes.
    pub fn sub_objects(&self) -> impl Iterator<Item = &HlodSubObject> {
        self.lods
            .iter()
            .chain(self.aggregates.iter())
            .flat_map(|lod| lod.sub_objects.iter())
    }

    /// Parse an `HLOD` chunk
    pub fn read(chunk: &Chunk<'_>) -> Result<Self> {
        let mut header = None;
        let mut lods = Vec::new();
        let mut aggregates = None;
        let mut proxies = None;
        let mut extra_chunks = Vec::new();

        for child in chunk.children()? {
            let child = child?;
            match child.kind() {
                Some(ChunkKind::HlodHeader) => {
                    let mut reader = child.reader();
                    let _version = reader.read_u32()?;
                    let lod_count = reader.read_u32()?;
                    let name = reader.read_name(NAME_LEN)?;
                    let hierarchy_name = reader.read_name(NAME_LEN)?;
                    child.expect_consumed(&reader)?;
                    header = Some((lod_count, name, hierarchy_name));
                }
                Some(ChunkKind::HlodLodArray) => lods.push(read_array(&child)?),
                Some(ChunkKind::HlodAggregateArray) => {
                    if aggregates.replace(read_array(&child)?).is_some() {
                        return Err(child.malformed("second aggregate array"));
                    }
                }
                Some(ChunkKind::HlodProxyArray) => {
                    if proxies.replace(read_array(&child)?).is_some() {
                        return Err(child.malformed("second proxy array"));
                    }
                }
                _ => {
                    warn!("keeping unknown chunk {} in HLOD", tag_label(child.tag));
                    extra_chunks.push(RawChunk::from_chunk(&child)?);
                }
            }
        }

        let (lod_count, name, hierarchy_name) =
            header.ok_or_else(|| chunk.malformed("HLOD has no header"))?;
        if lods.len() != lod_count as usize {
            return Err(chunk.malformed(format!(
                "header declares {} LODs, chunk holds {}",
                lod_count,
                lods.len()
            )));
        }

        debug!("HLOD '{}': {} LODs", name, lods.len());
        Ok(Self {
            name,
            hierarchy_name,
            lods,
            aggregates,
            proxies,
            extra_chunks,
        })
    }

    /// Serialize as an `HLOD` chunk
    pub fn write(&self, writer: &mut ChunkWriter) -> Result<()> {
        let lod_count = u32::try_from(self.lods.len())
            .map_err(|_| W3dError::Unencodable(format!("{} LODs", self.lods.len())))?;

        writer.container(ChunkKind::Hlod.tag(), |w| {
            w.data(ChunkKind::HlodHeader.tag(), |out| {
                out.write_u32(HLOD_VERSION);
                out.write_u32(lod_count);
                out.write_name(&self.name, NAME_LEN)?;
                out.write_name(&self.hierarchy_name, NAME_LEN)
            })?;

            for lod in &self.lods {
                write_array(w, ChunkKind::HlodLodArray, lod)?;
            }
            if let Some(aggregates) = &self.aggregates {
                write_array(w, ChunkKind::HlodAggregateArray, aggregates)?;
            }
            if let Some(proxies) = &self.proxies {
                write_array(w, ChunkKind::HlodProxyArray, proxies)?;
            }
            for extra in &self.extra_chunks {
                extra.write(w)?;
            }
            Ok(())
        })
    }
}

fn read_array(chunk: &Chunk<'_>) -> Result<HlodLod> {
    let mut header = None;
    let mut sub_objects = Vec::new();
    let mut extra_chunks = Vec::new();

    for child in chunk.children()? {
        let child = child?;
        match child.kind() {
            Some(ChunkKind::HlodSubObjectArrayHeader) => {
                let mut reader = child.reader();
                let model_count = reader.read_u32()?;
                let max_screen_size = reader.read_f32()?;
                child.expect_consumed(&reader)?;
                header = Some((model_count, max_screen_size));
            }
            Some(ChunkKind::HlodSubObject) => {
                let mut reader = child.reader();
                sub_objects.push(HlodSubObject::read(&mut reader)?);
                child.expect_consumed(&reader)?;
            }
            _ => {
                warn!("keeping unknown chunk {} in HLOD array", tag_label(child.tag));
                extra_chunks.push(RawChunk::from_chunk(&child)?);
            }
        }
    }

    let (model_count, max_screen_size) =
        header.ok_or_else(|| chunk.malformed("sub-object array has no header"))?;
    if sub_objects.len() != model_count as usize {
        return Err(chunk.malformed(format!(
            "header declares {} sub-objects, array holds {}",
            model_count,
            sub_objects.len()
        )));
    }

    Ok(HlodLod {
        max_screen_size,
        sub_objects,
        extra_chunks,
    })
}

fn write_array(writer: &mut ChunkWriter, kind: ChunkKind, array: &HlodLod) -> Result<()> {
    let sub_objects = &array.sub_objects;
    let model_count = u32::try_from(sub_objects.len())
        .map_err(|_| W3dError::Unencodable(format!("{} sub-objects", sub_objects.len())))?;

    writer.container(kind.tag(), |w| {
        w.data(ChunkKind::HlodSubObjectArrayHeader.tag(), |out| {
            out.write_u32(model_count);
            out.write_f32(array.max_screen_size);
            Ok(())
        })?;
        for sub_object in sub_objects {
            w.data(ChunkKind::HlodSubObject.tag(), |out| sub_object.write(out))?;
        }
        for extra in &array.extra_chunks {
            extra.write(w)?;
        }
        Ok(())
    })
}
