//! Skeletal animation model and channel compression
//!
//! An [`Animation`] holds keyframe [`Channel`]s, each driving one property of
//! one pivot. Channels are read from either container:
//!
//! - `ANIMATION` (0x200): uncompressed, one value per frame over a frame range
//! - `COMPRESSED_ANIMATION` (0x280): time-coded keys, or adaptive-delta blocks
//!   (4-bit or 8-bit) decoded through `w3d-delta`
//!
//! On export the encoding comes from the caller's [`Compression`] choice.
//! Sparse channels are sampled densely when the target encoding needs one
//! value per frame, using the same interpolation as [`Channel::sample`].

mod compressed;
mod sampling;
mod types;
mod uncompressed;

#[cfg(test)]
mod tests;

use crate::chunk::{Chunk, ChunkKind, ChunkWriter};
use crate::error::Result;
use crate::options::Compression;

pub use compressed::{
    CompressedAnimationHeader, Flavor, MAX_TIME_CODE_FRAME, TIME_CODE_FLAG,
    read_compressed_animation, write_compressed_animation,
};
pub use sampling::interpolate;
pub use types::{Animation, Channel, ChannelKind, ChannelValue, Keyframe};
pub use uncompressed::{AnimationHeader, BIT_CHANNEL_VIS, read_animation, write_animation};

/// Animation chunk version written on export (4.1)
pub const ANIMATION_VERSION: u32 = 0x0004_0001;

impl Animation {
    /// Parse either animation container
    pub fn read(chunk: &Chunk<'_>) -> Result<Self> {
        match chunk.kind() {
            Some(ChunkKind::Animation) => read_animation(chunk),
            Some(ChunkKind::CompressedAnimation) => read_compressed_animation(chunk),
            _ => Err(chunk.malformed("not an animation chunk")),
        }
    }

    /// Serialize with the given channel encoding
    pub fn write(&self, writer: &mut ChunkWriter, compression: Compression) -> Result<()> {
        match compression {
            Compression::Uncompressed => write_animation(self, writer),
            Compression::TimeCoded | Compression::AdaptiveDelta => {
                write_compressed_animation(self, compression, writer)
            }
        }
    }

    /// Encoding of the channels as read, `None` for an animation without channels
    pub fn encoding(&self) -> Option<Compression> {
        self.channels
            .iter()
            .find(|c| !c.kind.is_visibility())
            .or(self.channels.first())
            .map(|c| c.encoding)
    }
}
