//! W3D chunk framing
//!
//! A W3D file is a sequence of tagged chunks. Each chunk is an 8-byte header
//! followed by its payload, which is either raw data or another chunk
//! sequence.
//!
//! # Layout
//! ```text
//! 0x00: tag u32
//! 0x04: size u32        - payload bytes, bit 31 set when the payload is sub-chunks
//! 0x08: payload[size]
//! ```
//!
//! Reading is lazy and single-pass ([`read_chunks`]); writing patches sizes
//! after the payload is complete ([`ChunkWriter`]).

mod header;
mod raw;
mod reader;
mod tags;
mod writer;

pub use header::{ChunkHeader, MAX_CHUNK_SIZE, SUBCHUNK_FLAG};
pub use raw::{RawBody, RawChunk};
pub use reader::{Chunk, ChunkReader, read_chunks};
pub use tags::{ChunkKind, tag_label};
pub use writer::{ChunkWriter, write_chunk};
