//! Lazy chunk sequence reader

use tracing::debug;

use super::header::ChunkHeader;
use super::tags::{ChunkKind, tag_label};
use crate::error::{Result, W3dError};
use crate::primitives::ByteReader;

/// One chunk borrowed from the input buffer
#[derive(Debug, Clone, Copy)]
pub struct Chunk<'a> {
    /// Chunk type tag
    pub tag: u32,
    /// Payload is a chunk sequence
    pub has_subchunks: bool,
    /// Payload bytes (header excluded)
    pub payload: &'a [u8],
    /// Absolute offset of the header within the file
    pub offset: usize,
}

impl<'a> Chunk<'a> {
    /// Known kind of this chunk, if any
    pub fn kind(&self) -> Option<ChunkKind> {
        ChunkKind::from_tag(self.tag)
    }

    /// Iterate the sub-chunks of a container chunk
    pub fn children(&self) -> Result<ChunkReader<'a>> {
        if !self.has_subchunks {
            return Err(self.malformed("not a container, cannot read sub-chunks"));
        }
        Ok(ChunkReader {
            data: self.payload,
            pos: 0,
            base: self.offset + ChunkHeader::SIZE,
            parent: Some(self.tag),
            failed: false,
        })
    }

    /// Cursor over the payload of a data chunk
    pub fn reader(&self) -> ByteReader<'a> {
        ByteReader::new(self.payload)
    }

    /// Build a `MalformedChunk` error located at this chunk
    pub fn malformed(&self, reason: impl Into<String>) -> W3dError {
        W3dError::MalformedChunk {
            tag: self.tag,
            offset: self.offset,
            reason: reason.into(),
        }
    }

    /// Fail unless every payload byte was consumed
    pub fn expect_consumed(&self, reader: &ByteReader<'_>) -> Result<()> {
        if reader.is_empty() {
            Ok(())
        } else {
            Err(self.malformed(format!(
                "{} unread bytes after {} bytes of {}",
                reader.remaining(),
                reader.position(),
                tag_label(self.tag)
            )))
        }
    }
}

/// Single-pass iterator over a chunk sequence
///
/// At file level a chunk whose declared size runs past the end of the input is
/// truncated input. Inside a parent the same condition means the parent's
/// framing is wrong, so it is reported as a malformed chunk. A known data
/// chunk with the sub-chunk flag set is malformed too. The iterator yields at
/// most one error and then stops.
#[derive(Debug, Clone)]
pub struct ChunkReader<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
    parent: Option<u32>,
    failed: bool,
}

/// Iterate the top-level chunks of a W3D file
pub fn read_chunks(bytes: &[u8]) -> ChunkReader<'_> {
    ChunkReader {
        data: bytes,
        pos: 0,
        base: 0,
        parent: None,
        failed: false,
    }
}

impl<'a> ChunkReader<'a> {
    /// Tag of the enclosing chunk, `None` at file level
    pub fn parent(&self) -> Option<u32> {
        self.parent
    }

    fn read_next(&mut self) -> Result<Chunk<'a>> {
        let offset = self.base + self.pos;
        let remaining = self.data.len() - self.pos;

        let header = match ChunkHeader::from_bytes(&self.data[self.pos..]) {
            Some(header) => header,
            None => {
                return Err(match self.parent {
                    None => W3dError::TruncatedInput {
                        what: "chunk header",
                        needed: ChunkHeader::SIZE,
                        remaining,
                    },
                    Some(parent) => W3dError::MalformedChunk {
                        tag: parent,
                        offset,
                        reason: format!("{} trailing bytes cannot hold a chunk header", remaining),
                    },
                });
            }
        };

        let body_start = self.pos + ChunkHeader::SIZE;
        let available = self.data.len() - body_start;
        let size = header.size as usize;

        if size > available {
            return Err(match self.parent {
                None => W3dError::TruncatedInput {
                    what: "chunk payload",
                    needed: size,
                    remaining: available,
                },
                Some(parent) => W3dError::MalformedChunk {
                    tag: header.tag,
                    offset,
                    reason: format!(
                        "declared size {} exceeds the {} bytes left in parent {}",
                        size,
                        available,
                        tag_label(parent)
                    ),
                },
            });
        }

        if header.has_subchunks
            && ChunkKind::from_tag(header.tag).is_some_and(|kind| !kind.is_container())
        {
            return Err(W3dError::MalformedChunk {
                tag: header.tag,
                offset,
                reason: format!(
                    "{} is a data chunk but carries the sub-chunk flag",
                    tag_label(header.tag)
                ),
            });
        }

        self.pos = body_start + size;
        debug!(
            "chunk {} ({} bytes) at offset {}",
            tag_label(header.tag),
            size,
            offset
        );

        Ok(Chunk {
            tag: header.tag,
            has_subchunks: header.has_subchunks,
            payload: &self.data[body_start..body_start + size],
            offset,
        })
    }
}

impl<'a> Iterator for ChunkReader<'a> {
    type Item = Result<Chunk<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.data.len() {
            return None;
        }
        match self.read_next() {
            Ok(chunk) => Some(Ok(chunk)),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::header::SUBCHUNK_FLAG;

    fn leaf(tag: u32, payload: &[u8]) -> Vec<u8> {
        let mut bytes = ChunkHeader::new(tag, payload.len() as u32, false)
            .to_bytes()
            .to_vec();
        bytes.extend_from_slice(payload);
        bytes
    }

    #[test]
    fn test_reads_sequence() {
        let mut bytes = leaf(0x101, &[1, 2, 3, 4]);
        bytes.extend(leaf(0x102, &[]));

        let chunks: Vec<_> = read_chunks(&bytes).collect::<Result<_>>().unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].tag, 0x101);
        assert_eq!(chunks[0].payload, &[1, 2, 3, 4]);
        assert_eq!(chunks[1].offset, 12);
        assert!(chunks[1].payload.is_empty());
    }

    #[test]
    fn test_children_offsets() {
        let inner = leaf(0x101, &[9; 4]);
        let mut bytes = ChunkHeader::new(0x100, inner.len() as u32, true)
            .to_bytes()
            .to_vec();
        bytes.extend(inner);

        let parent = read_chunks(&bytes).next().unwrap().unwrap();
        let child = parent.children().unwrap().next().unwrap().unwrap();
        assert_eq!(child.offset, 8);
        assert_eq!(child.kind(), Some(ChunkKind::HierarchyHeader));
    }

    #[test]
    fn test_truncated_header_at_file_level() {
        let mut bytes = leaf(0x101, &[0; 4]);
        bytes.extend_from_slice(&[0x02, 0x01, 0]);

        let mut iter = read_chunks(&bytes);
        assert!(iter.next().unwrap().is_ok());
        assert!(matches!(
            iter.next().unwrap(),
            Err(W3dError::TruncatedInput { needed: 8, remaining: 3, .. })
        ));
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_truncated_payload_at_file_level() {
        let mut bytes = leaf(0x101, &[0; 16]);
        bytes.truncate(12);

        assert!(matches!(
            read_chunks(&bytes).next().unwrap(),
            Err(W3dError::TruncatedInput { needed: 16, remaining: 4, .. })
        ));
    }

    #[test]
    fn test_child_overrunning_parent_is_malformed() {
        // Child claims 32 bytes, parent only has 4 after the child header
        let mut inner = ChunkHeader::new(0x101, 32, false).to_bytes().to_vec();
        inner.extend_from_slice(&[0; 4]);
        let mut bytes = ChunkHeader::new(0x100, inner.len() as u32, true)
            .to_bytes()
            .to_vec();
        bytes.extend(inner);

        let parent = read_chunks(&bytes).next().unwrap().unwrap();
        let err = parent.children().unwrap().next().unwrap().unwrap_err();
        assert!(matches!(err, W3dError::MalformedChunk { tag: 0x101, offset: 8, .. }));
    }

    #[test]
    fn test_leaf_refuses_to_recurse() {
        let bytes = leaf(0x101, &[0; 4]);
        let chunk = read_chunks(&bytes).next().unwrap().unwrap();
        assert!(matches!(
            chunk.children(),
            Err(W3dError::MalformedChunk { tag: 0x101, .. })
        ));
    }

    #[test]
    fn test_known_data_chunk_with_subchunk_flag_is_malformed() {
        let mut bytes = leaf(0x101, &[0; 4]);
        let mut pivots = ChunkHeader::new(0x102, 4, true).to_bytes().to_vec();
        pivots.extend_from_slice(&[0; 4]);
        bytes.extend(pivots);

        let mut iter = read_chunks(&bytes);
        assert!(iter.next().unwrap().is_ok());
        assert!(matches!(
            iter.next().unwrap(),
            Err(W3dError::MalformedChunk { tag: 0x102, offset: 12, .. })
        ));
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_nested_mesh_header_with_subchunk_flag_is_malformed() {
        let inner = ChunkHeader::new(ChunkKind::MeshHeader3.tag(), 0, true).to_bytes();
        let mut bytes = ChunkHeader::new(ChunkKind::Mesh.tag(), inner.len() as u32, true)
            .to_bytes()
            .to_vec();
        bytes.extend_from_slice(&inner);

        let mesh = read_chunks(&bytes).next().unwrap().unwrap();
        let err = mesh.children().unwrap().next().unwrap().unwrap_err();
        assert!(matches!(err, W3dError::MalformedChunk { tag: 0x1F, offset: 8, .. }));
    }

    #[test]
    fn test_unknown_tag_may_carry_subchunk_flag() {
        let bytes = ChunkHeader::new(0x0000_0E00, 0, true).to_bytes();
        let chunk = read_chunks(&bytes).next().unwrap().unwrap();
        assert!(chunk.has_subchunks);
    }

    #[test]
    fn test_flag_not_counted_in_size() {
        let mut bytes = 0x100u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&(SUBCHUNK_FLAG).to_le_bytes());

        let chunk = read_chunks(&bytes).next().unwrap().unwrap();
        assert!(chunk.has_subchunks);
        assert_eq!(chunk.children().unwrap().count(), 0);
    }
}
