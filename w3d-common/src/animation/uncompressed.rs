//! Uncompressed animation (`ANIMATION` chunk)
//!
//! # Layout
//! ```text
//! ANIMATION (container)
//!   ANIMATION_HEADER (44 bytes)
//!     0x00: version u32
//!     0x04: name [16]
//!     0x14: hierarchy_name [16]
//!     0x24: num_frames u32
//!     0x28: frame_rate u32
//!   ANIMATION_CHANNEL (12-byte header + data)
//!     0x00: first_frame u16
//!     0x02: last_frame u16
//!     0x04: vector_len u16
//!     0x06: flags u16          - channel type
//!     0x08: pivot u16
//!     0x0A: pad u16
//!     0x0C: (last - first + 1) × vector_len × f32
//!   BIT_CHANNEL (9-byte header + data)
//!     0x00: first_frame u16
//!     0x02: last_frame u16
//!     0x04: flags u16          - 0 = visibility
//!     0x06: pivot u16
//!     0x08: default_value u8
//!     0x09: ceil((last - first + 1) / 8) bytes, LSB first
//! ```

use tracing::{debug, warn};

use super::ANIMATION_VERSION;
use super::types::{Animation, Channel, ChannelKind, ChannelValue, Keyframe};
use crate::chunk::{Chunk, ChunkKind, ChunkWriter, RawChunk, tag_label};
use crate::error::{Result, W3dError};
use crate::options::Compression;
use crate::primitives::{BinaryRecord, ByteReader, NAME_LEN, WriteLe};

/// `flags` of a visibility bit channel
pub const BIT_CHANNEL_VIS: u16 = 0;

/// `ANIMATION_HEADER` payload
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationHeader {
    pub version: u32,
    pub name: String,
    pub hierarchy_name: String,
    pub num_frames: u32,
    pub frame_rate: u32,
}

impl BinaryRecord for AnimationHeader {
    const SIZE: usize = 44;

    fn read(reader: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self {
            version: reader.read_u32()?,
            name: reader.read_name(NAME_LEN)?,
            hierarchy_name: reader.read_name(NAME_LEN)?,
            num_frames: reader.read_u32()?,
            frame_rate: reader.read_u32()?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        out.write_u32(self.version);
        out.write_name(&self.name, NAME_LEN)?;
        out.write_name(&self.hierarchy_name, NAME_LEN)?;
        out.write_u32(self.num_frames);
        out.write_u32(self.frame_rate);
        Ok(())
    }
}

/// Parse an `ANIMATION` chunk
pub fn read_animation(chunk: &Chunk<'_>) -> Result<Animation> {
    let mut animation: Option<Animation> = None;
    let mut extra_chunks = Vec::new();

    for child in chunk.children()? {
        let child = child?;
        match child.kind() {
            Some(ChunkKind::AnimationHeader) => {
                let mut reader = child.reader();
                let header = AnimationHeader::read(&mut reader)?;
                child.expect_consumed(&reader)?;
                animation = Some(Animation::new(
                    header.name,
                    header.hierarchy_name,
                    header.num_frames,
                    header.frame_rate,
                ));
            }
            Some(ChunkKind::AnimationChannel) => {
                let anim = animation
                    .as_mut()
                    .ok_or_else(|| child.malformed("channel precedes the animation header"))?;
                let channel = read_motion_channel(&child, anim)?;
                anim.channels.push(channel);
            }
            Some(ChunkKind::BitChannel) => {
                let anim = animation
                    .as_mut()
                    .ok_or_else(|| child.malformed("channel precedes the animation header"))?;
                let channel = read_bit_channel(&child, anim)?;
                anim.channels.push(channel);
            }
            _ => {
                warn!("keeping unknown chunk {} in animation", tag_label(child.tag));
                extra_chunks.push(RawChunk::from_chunk(&child)?);
            }
        }
    }

    let mut animation = animation.ok_or_else(|| chunk.malformed("animation has no header"))?;
    animation.extra_chunks = extra_chunks;
    animation.validate()?;

    debug!(
        "animation '{}': {} frames, {} channels, uncompressed",
        animation.name,
        animation.frame_count,
        animation.channels.len()
    );
    Ok(animation)
}

/// Validate the `[first, last]` range of a dense channel
fn check_range(anim: &Animation, pivot: u16, first: u16, last: u16) -> Result<usize> {
    if last < first || last as u32 >= anim.frame_count {
        return Err(W3dError::corrupt_channel(
            &anim.name,
            pivot,
            format!(
                "frame range [{}, {}] outside {} frames",
                first, last, anim.frame_count
            ),
        ));
    }
    Ok((last - first) as usize + 1)
}

fn read_motion_channel(chunk: &Chunk<'_>, anim: &Animation) -> Result<Channel> {
    let mut reader = chunk.reader();
    let first = reader.read_u16()?;
    let last = reader.read_u16()?;
    let vector_len = reader.read_u16()?;
    let flags = reader.read_u16()?;
    let pivot = reader.read_u16()?;
    let _pad = reader.read_u16()?;

    let corrupt = |reason: String| W3dError::corrupt_channel(&anim.name, pivot, reason);

    let kind = ChannelKind::from_flags(flags)
        .ok_or_else(|| corrupt(format!("unknown channel type {}", flags)))?;
    if vector_len as usize != kind.vector_len() {
        return Err(corrupt(format!(
            "vector length {} for a {} channel",
            vector_len,
            kind.label()
        )));
    }

    let count = check_range(anim, pivot, first, last)?;
    let expected = count * kind.vector_len() * 4;
    if reader.remaining() != expected {
        return Err(corrupt(format!(
            "{} data bytes for {} frames, expected {}",
            reader.remaining(),
            count,
            expected
        )));
    }

    let mut components = [0.0f32; 4];
    let mut keyframes = Vec::with_capacity(count);
    for frame in first as u32..=last as u32 {
        for slot in components.iter_mut().take(kind.vector_len()) {
            *slot = reader.read_f32()?;
        }
        keyframes.push(Keyframe::new(
            frame,
            ChannelValue::from_components(kind, &components),
        ));
    }

    Ok(Channel {
        pivot_index: pivot,
        kind,
        encoding: Compression::Uncompressed,
        keyframes,
    })
}

fn read_bit_channel(chunk: &Chunk<'_>, anim: &Animation) -> Result<Channel> {
    let mut reader = chunk.reader();
    let first = reader.read_u16()?;
    let last = reader.read_u16()?;
    let flags = reader.read_u16()?;
    let pivot = reader.read_u16()?;
    let default = reader.read_u8()? != 0;

    let corrupt = |reason: String| W3dError::corrupt_channel(&anim.name, pivot, reason);

    if flags != BIT_CHANNEL_VIS {
        return Err(corrupt(format!("unknown bit channel type {}", flags)));
    }

    let count = check_range(anim, pivot, first, last)?;
    let bits = reader.rest();
    if bits.len() != count.div_ceil(8) {
        return Err(corrupt(format!(
            "{} bit bytes for {} frames",
            bits.len(),
            count
        )));
    }

    let bit = |i: usize| bits[i / 8] & (1 << (i % 8)) != 0;

    // Frames outside [first, last] show the default value
    let mut keyframes = Vec::with_capacity(count + 2);
    if first > 0 && bit(0) != default {
        keyframes.push(Keyframe::new(0, ChannelValue::Visible(default)));
    }
    for i in 0..count {
        keyframes.push(Keyframe::new(
            first as u32 + i as u32,
            ChannelValue::Visible(bit(i)),
        ));
    }
    if (last as u32) + 1 < anim.frame_count && bit(count - 1) != default {
        keyframes.push(Keyframe::new(
            last as u32 + 1,
            ChannelValue::Visible(default),
        ));
    }

    Ok(Channel {
        pivot_index: pivot,
        kind: ChannelKind::Visibility,
        encoding: Compression::Uncompressed,
        keyframes,
    })
}

/// Serialize as an `ANIMATION` chunk
///
/// Motion channels are sampled densely between their first and last key.
/// Visibility channels cover the whole clip so the default value never
/// applies.
pub fn write_animation(animation: &Animation, writer: &mut ChunkWriter) -> Result<()> {
    animation.validate()?;

    writer.container(ChunkKind::Animation.tag(), |w| {
        w.data(ChunkKind::AnimationHeader.tag(), |out| {
            AnimationHeader {
                version: ANIMATION_VERSION,
                name: animation.name.clone(),
                hierarchy_name: animation.hierarchy_name.clone(),
                num_frames: animation.frame_count,
                frame_rate: animation.frames_per_second,
            }
            .write(out)
        })?;

        for channel in &animation.channels {
            if channel.kind.is_visibility() {
                write_bit_channel(w, animation, channel)?;
            } else {
                write_motion_channel(w, animation, channel)?;
            }
        }
        for extra in &animation.extra_chunks {
            extra.write(w)?;
        }
        Ok(())
    })
}

fn frame_u16(animation: &Animation, frame: u32) -> Result<u16> {
    u16::try_from(frame).map_err(|_| {
        W3dError::Unencodable(format!(
            "frame {} of '{}' in an uncompressed channel (limit {})",
            frame,
            animation.name,
            u16::MAX
        ))
    })
}

fn write_motion_channel(w: &mut ChunkWriter, animation: &Animation, channel: &Channel) -> Result<()> {
    // validate() guarantees at least one key
    let (Some(first), Some(last)) = (channel.first_frame(), channel.last_frame()) else {
        return Ok(());
    };
    let first_u16 = frame_u16(animation, first)?;
    let last_u16 = frame_u16(animation, last)?;

    w.data(ChunkKind::AnimationChannel.tag(), |out| {
        out.write_u16(first_u16);
        out.write_u16(last_u16);
        out.write_u16(channel.kind.vector_len() as u16);
        out.write_u16(channel.kind.flags());
        out.write_u16(channel.pivot_index);
        out.write_u16(0);

        let mut components = Vec::with_capacity(4);
        for value in channel.dense(first, last) {
            components.clear();
            value.push_components(&mut components);
            for &c in &components {
                out.write_f32(c);
            }
        }
        Ok(())
    })
}

fn write_bit_channel(w: &mut ChunkWriter, animation: &Animation, channel: &Channel) -> Result<()> {
    let last = animation.frame_count.saturating_sub(1);
    let last_u16 = frame_u16(animation, last)?;
    let values = channel.dense(0, last);
    let default = values
        .first()
        .and_then(|v| v.as_visible())
        .unwrap_or(true);

    w.data(ChunkKind::BitChannel.tag(), |out| {
        out.write_u16(0);
        out.write_u16(last_u16);
        out.write_u16(BIT_CHANNEL_VIS);
        out.write_u16(channel.pivot_index);
        out.write_u8(default as u8);

        let mut bits = vec![0u8; values.len().div_ceil(8)];
        for (i, value) in values.iter().enumerate() {
            if value.as_visible() == Some(true) {
                bits[i / 8] |= 1 << (i % 8);
            }
        }
        out.extend_from_slice(&bits);
        Ok(())
    })
}
