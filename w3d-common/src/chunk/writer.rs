//! Chunk tree writer
//!
//! Headers are written as placeholders and patched once the payload has been
//! materialized, so size fields always match the bytes that follow them.

use super::header::{ChunkHeader, MAX_CHUNK_SIZE};
use super::tags::tag_label;
use crate::error::{Result, W3dError};

/// Growable buffer of chunks
#[derive(Debug, Default, Clone)]
pub struct ChunkWriter {
    buf: Vec<u8>,
}

impl ChunkWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write one chunk whose payload is produced by `body`
    ///
    /// For a container, `body` must only write sub-chunks; this is checked
    /// once the payload is complete.
    pub fn chunk<F>(&mut self, tag: u32, is_container: bool, body: F) -> Result<()>
    where
        F: FnOnce(&mut ChunkWriter) -> Result<()>,
    {
        let header_pos = self.buf.len();
        self.buf.extend_from_slice(&[0u8; ChunkHeader::SIZE]);

        body(self)?;

        let payload_start = header_pos + ChunkHeader::SIZE;
        let size = self.buf.len() - payload_start;
        if size > MAX_CHUNK_SIZE {
            return Err(W3dError::MalformedChunk {
                tag,
                offset: header_pos,
                reason: format!("payload of {} bytes exceeds the 31-bit size field", size),
            });
        }
        if is_container {
            check_sequence(tag, header_pos, &self.buf[payload_start..])?;
        }

        let header = ChunkHeader::new(tag, size as u32, is_container);
        self.buf[header_pos..payload_start].copy_from_slice(&header.to_bytes());
        Ok(())
    }

    /// Container chunk
    pub fn container<F>(&mut self, tag: u32, body: F) -> Result<()>
    where
        F: FnOnce(&mut ChunkWriter) -> Result<()>,
    {
        self.chunk(tag, true, body)
    }

    /// Data chunk whose payload is written straight into the buffer
    pub fn data<F>(&mut self, tag: u32, payload: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<u8>) -> Result<()>,
    {
        self.chunk(tag, false, |writer| payload(&mut writer.buf))
    }

    /// Data chunk from an existing byte slice
    pub fn bytes(&mut self, tag: u32, payload: &[u8]) -> Result<()> {
        self.data(tag, |out| {
            out.extend_from_slice(payload);
            Ok(())
        })
    }

    /// Bytes written so far
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Write a single chunk and return its bytes
pub fn write_chunk<F>(tag: u32, is_container: bool, payload_writer: F) -> Result<Vec<u8>>
where
    F: FnOnce(&mut ChunkWriter) -> Result<()>,
{
    let mut writer = ChunkWriter::new();
    writer.chunk(tag, is_container, payload_writer)?;
    Ok(writer.into_bytes())
}

/// Verify a container payload is an exact sequence of chunk headers
fn check_sequence(tag: u32, offset: usize, payload: &[u8]) -> Result<()> {
    let mut pos = 0;
    while pos < payload.len() {
        let header = ChunkHeader::from_bytes(&payload[pos..]).ok_or_else(|| {
            W3dError::MalformedChunk {
                tag,
                offset,
                reason: format!(
                    "container {} ends with {} bytes that are not a chunk",
                    tag_label(tag),
                    payload.len() - pos
                ),
            }
        })?;
        pos += header.total_size();
    }
    if pos != payload.len() {
        return Err(W3dError::MalformedChunk {
            tag,
            offset,
            reason: format!(
                "sub-chunks of {} overrun the payload by {} bytes",
                tag_label(tag),
                pos - payload.len()
            ),
        });
    }
    Ok(())
}
