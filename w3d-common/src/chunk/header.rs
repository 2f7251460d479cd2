//! Chunk header

/// Bit 31 of the size field: the payload is a sequence of sub-chunks
pub const SUBCHUNK_FLAG: u32 = 0x8000_0000;

/// Largest payload the 31-bit size field can describe
pub const MAX_CHUNK_SIZE: usize = 0x7FFF_FFFF;

/// Chunk header (8 bytes)
///
/// # Layout
/// ```text
/// 0x00: tag u32
/// 0x04: size u32   - payload length in bytes (header excluded), bit 31 = has sub-chunks
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    /// Chunk type tag
    pub tag: u32,
    /// Payload length in bytes
    pub size: u32,
    /// Payload is itself a chunk sequence
    pub has_subchunks: bool,
}

impl ChunkHeader {
    pub const SIZE: usize = 8;

    /// Create a header; `size` must already fit in 31 bits
    pub fn new(tag: u32, size: u32, has_subchunks: bool) -> Self {
        Self {
            tag,
            size: size & !SUBCHUNK_FLAG,
            has_subchunks,
        }
    }

    /// Write header to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut size = self.size & !SUBCHUNK_FLAG;
        if self.has_subchunks {
            size |= SUBCHUNK_FLAG;
        }

        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.tag.to_le_bytes());
        bytes[4..8].copy_from_slice(&size.to_le_bytes());
        bytes
    }

    /// Read header from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        let tag = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let raw_size = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        Some(Self {
            tag,
            size: raw_size & !SUBCHUNK_FLAG,
            has_subchunks: raw_size & SUBCHUNK_FLAG != 0,
        })
    }

    /// Header plus payload length
    pub fn total_size(&self) -> usize {
        Self::SIZE + self.size as usize
    }
}
