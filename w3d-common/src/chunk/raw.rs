//! Opaque chunk trees
//!
//! Unknown chunks and material blobs are kept as raw trees and written back
//! byte-for-byte. Containers are stored as child lists so that the
//! sub-chunk flag survives the round trip.

use super::reader::Chunk;
use super::tags::ChunkKind;
use super::writer::ChunkWriter;
use crate::error::Result;

/// A chunk kept as bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChunk {
    pub tag: u32,
    pub body: RawBody,
}

/// Payload of a [`RawChunk`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawBody {
    Data(Vec<u8>),
    Children(Vec<RawChunk>),
}

impl RawChunk {
    pub fn data(tag: u32, bytes: Vec<u8>) -> Self {
        Self {
            tag,
            body: RawBody::Data(bytes),
        }
    }

    pub fn container(tag: u32, children: Vec<RawChunk>) -> Self {
        Self {
            tag,
            body: RawBody::Children(children),
        }
    }

    /// Copy a borrowed chunk (and its sub-chunks) into an owned tree
    pub fn from_chunk(chunk: &Chunk<'_>) -> Result<Self> {
        if chunk.has_subchunks {
            let children = chunk
                .children()?
                .map(|child| child.and_then(|c| RawChunk::from_chunk(&c)))
                .collect::<Result<Vec<_>>>()?;
            Ok(Self::container(chunk.tag, children))
        } else {
            Ok(Self::data(chunk.tag, chunk.payload.to_vec()))
        }
    }

    /// Write the tree back unchanged
    pub fn write(&self, writer: &mut ChunkWriter) -> Result<()> {
        match &self.body {
            RawBody::Data(bytes) => writer.bytes(self.tag, bytes),
            RawBody::Children(children) => writer.container(self.tag, |w| {
                for child in children {
                    child.write(w)?;
                }
                Ok(())
            }),
        }
    }

    pub fn kind(&self) -> Option<ChunkKind> {
        ChunkKind::from_tag(self.tag)
    }

    /// Payload bytes of a data chunk
    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.body {
            RawBody::Data(bytes) => Some(bytes),
            RawBody::Children(_) => None,
        }
    }

    /// Sub-chunks of a container; empty for data chunks
    pub fn children(&self) -> &[RawChunk] {
        match &self.body {
            RawBody::Data(_) => &[],
            RawBody::Children(children) => children,
        }
    }

    /// Direct children with the given kind
    pub fn children_of(&self, kind: ChunkKind) -> impl Iterator<Item = &RawChunk> {
        self.children()
            .iter()
            .filter(move |child| child.tag == kind.tag())
    }

    /// Serialized payload length (header excluded)
    pub fn payload_len(&self) -> usize {
        match &self.body {
            RawBody::Data(bytes) => bytes.len(),
            RawBody::Children(children) => children.iter().map(|c| 8 + c.payload_len()).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{read_chunks, write_chunk};

    #[test]
    fn test_raw_tree_roundtrip_is_bytewise() {
        let bytes = write_chunk(0x0999, true, |w| {
            w.bytes(0x0998, &[1, 2, 3, 4, 5])?;
            w.container(0x0997, |w| w.bytes(0x0996, &[]))
        })
        .unwrap();

        let chunk = read_chunks(&bytes).next().unwrap().unwrap();
        let raw = RawChunk::from_chunk(&chunk).unwrap();
        assert_eq!(raw.children().len(), 2);
        assert_eq!(raw.children()[0].bytes(), Some(&[1u8, 2, 3, 4, 5][..]));
        assert_eq!(raw.payload_len(), chunk.payload.len());

        let mut writer = ChunkWriter::new();
        raw.write(&mut writer).unwrap();
        assert_eq!(writer.into_bytes(), bytes);
    }

    #[test]
    fn test_children_of() {
        let raw = RawChunk::container(
            ChunkKind::Textures.tag(),
            vec![
                RawChunk::container(ChunkKind::Texture.tag(), vec![]),
                RawChunk::data(0x1234, vec![]),
                RawChunk::container(ChunkKind::Texture.tag(), vec![]),
            ],
        );
        assert_eq!(raw.children_of(ChunkKind::Texture).count(), 2);
        assert_eq!(raw.kind(), Some(ChunkKind::Textures));
    }
}
