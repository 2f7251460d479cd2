//! Compressed animation (`COMPRESSED_ANIMATION` chunk)
//!
//! # Layout
//! ```text
//! COMPRESSED_ANIMATION (container)
//!   COMPRESSED_ANIMATION_HEADER (44 bytes)
//!     0x00: version u32
//!     0x04: name [16]
//!     0x14: hierarchy_name [16]
//!     0x24: num_frames u32
//!     0x28: frame_rate u16
//!     0x2A: flavor u16          - 0 time-coded, 1 adaptive-delta 4-bit, 2 adaptive-delta 8-bit
//!   COMPRESSED_ANIMATION_CHANNEL, time-coded flavor
//!     0x00: num_time_codes u32
//!     0x04: pivot u16
//!     0x06: vector_len u8
//!     0x07: flags u8
//!     0x08: num_time_codes × (time_code u32, vector_len × f32)
//!           time_code bit 31 = step (no interpolation to the next key)
//!   COMPRESSED_ANIMATION_CHANNEL, adaptive-delta flavors
//!     0x00: num_frames u32
//!     0x04: pivot u16
//!     0x06: vector_len u8
//!     0x07: flags u8
//!     0x08: scale f32
//!     0x0C: delta payload
//!   COMPRESSED_BIT_CHANNEL
//!     0x00: num_time_codes u32
//!     0x04: pivot u16
//!     0x06: flags u8            - 0 = visibility
//!     0x07: default_value u8
//!     0x08: num_time_codes × time_code u32, bit 31 = visible
//! ```

use tracing::{debug, warn};
use w3d_delta::{DeltaBits, decode_channel, encode_channel};

use super::ANIMATION_VERSION;
use super::types::{Animation, Channel, ChannelKind, ChannelValue, Keyframe};
use crate::chunk::{Chunk, ChunkKind, ChunkWriter, RawChunk, tag_label};
use crate::error::{Result, W3dError};
use crate::options::Compression;
use crate::primitives::{BinaryRecord, ByteReader, NAME_LEN, WriteLe};

/// Bit 31 of a time code
pub const TIME_CODE_FLAG: u32 = 0x8000_0000;

/// Largest frame a time code can hold
pub const MAX_TIME_CODE_FRAME: u32 = !TIME_CODE_FLAG;

/// Channel encoding of a compressed animation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Flavor {
    TimeCoded = 0,
    AdaptiveDelta4 = 1,
    AdaptiveDelta8 = 2,
}

impl Flavor {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0 => Some(Flavor::TimeCoded),
            1 => Some(Flavor::AdaptiveDelta4),
            2 => Some(Flavor::AdaptiveDelta8),
            _ => None,
        }
    }

    fn delta_bits(self) -> Option<DeltaBits> {
        match self {
            Flavor::TimeCoded => None,
            Flavor::AdaptiveDelta4 => Some(DeltaBits::Four),
            Flavor::AdaptiveDelta8 => Some(DeltaBits::Eight),
        }
    }

    fn compression(self) -> Compression {
        match self {
            Flavor::TimeCoded => Compression::TimeCoded,
            _ => Compression::AdaptiveDelta,
        }
    }
}

/// `COMPRESSED_ANIMATION_HEADER` payload
#[derive(Debug, Clone, PartialEq)]
pub struct CompressedAnimationHeader {
    pub version: u32,
    pub name: String,
    pub hierarchy_name: String,
    pub num_frames: u32,
    pub frame_rate: u16,
    pub flavor: u16,
}

impl BinaryRecord for CompressedAnimationHeader {
    const SIZE: usize = 44;

    fn read(reader: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self {
            version: reader.read_u32()?,
            name: reader.read_name(NAME_LEN)?,
            hierarchy_name: reader.read_name(NAME_LEN)?,
            num_frames: reader.read_u32()?,
            frame_rate: reader.read_u16()?,
            flavor: reader.read_u16()?,
        })
    }

    fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        out.write_u32(self.version);
        out.write_name(&self.name, NAME_LEN)?;
        out.write_name(&self.hierarchy_name, NAME_LEN)?;
        out.write_u32(self.num_frames);
        out.write_u16(self.frame_rate);
        out.write_u16(self.flavor);
        Ok(())
    }
}

/// Parse a `COMPRESSED_ANIMATION` chunk
pub fn read_compressed_animation(chunk: &Chunk<'_>) -> Result<Animation> {
    let mut state: Option<(Animation, Flavor)> = None;
    let mut extra_chunks = Vec::new();

    for child in chunk.children()? {
        let child = child?;
        match child.kind() {
            Some(ChunkKind::CompressedAnimationHeader) => {
                let mut reader = child.reader();
                let header = CompressedAnimationHeader::read(&mut reader)?;
                child.expect_consumed(&reader)?;

                let flavor = Flavor::from_u16(header.flavor).ok_or_else(|| {
                    child.malformed(format!("unknown animation flavor {}", header.flavor))
                })?;
                let animation = Animation::new(
                    header.name,
                    header.hierarchy_name,
                    header.num_frames,
                    header.frame_rate as u32,
                );
                state = Some((animation, flavor));
            }
            Some(ChunkKind::CompressedAnimationChannel) => {
                let (anim, flavor) = state
                    .as_mut()
                    .ok_or_else(|| child.malformed("channel precedes the animation header"))?;
                let channel = match flavor.delta_bits() {
                    None => read_time_coded_channel(&child, anim)?,
                    Some(bits) => read_adaptive_delta_channel(&child, anim, bits)?,
                };
                anim.channels.push(channel);
            }
            Some(ChunkKind::CompressedBitChannel) => {
                let (anim, _) = state
                    .as_mut()
                    .ok_or_else(|| child.malformed("channel precedes the animation header"))?;
                let channel = read_bit_channel(&child, anim)?;
                anim.channels.push(channel);
            }
            _ => {
                warn!(
                    "keeping unknown chunk {} in compressed animation",
                    tag_label(child.tag)
                );
                extra_chunks.push(RawChunk::from_chunk(&child)?);
            }
        }
    }

    let (mut animation, flavor) =
        state.ok_or_else(|| chunk.malformed("compressed animation has no header"))?;
    animation.extra_chunks = extra_chunks;
    animation.validate()?;

    debug!(
        "animation '{}': {} frames, {} channels, {:?}",
        animation.name,
        animation.frame_count,
        animation.channels.len(),
        flavor
    );
    Ok(animation)
}

/// Decode time codes, checking order and range
fn check_time_code(anim: &Animation, pivot: u16, previous: Option<u32>, frame: u32) -> Result<()> {
    if frame >= anim.frame_count {
        return Err(W3dError::corrupt_channel(
            &anim.name,
            pivot,
            format!("time code {} outside {} frames", frame, anim.frame_count),
        ));
    }
    if let Some(prev) = previous {
        if frame <= prev {
            return Err(W3dError::corrupt_channel(
                &anim.name,
                pivot,
                format!("time code {} follows {}", frame, prev),
            ));
        }
    }
    Ok(())
}

fn read_time_coded_channel(chunk: &Chunk<'_>, anim: &Animation) -> Result<Channel> {
    let mut reader = chunk.reader();
    let num_keys = reader.read_u32()? as usize;
    let pivot = reader.read_u16()?;
    let vector_len = reader.read_u8()?;
    let flags = reader.read_u8()?;

    let corrupt = |reason: String| W3dError::corrupt_channel(&anim.name, pivot, reason);

    let kind = ChannelKind::from_flags(flags as u16)
        .ok_or_else(|| corrupt(format!("unknown channel type {}", flags)))?;
    if vector_len as usize != kind.vector_len() {
        return Err(corrupt(format!(
            "vector length {} for a {} channel",
            vector_len,
            kind.label()
        )));
    }

    let key_size = 4 + kind.vector_len() * 4;
    if num_keys.checked_mul(key_size) != Some(reader.remaining()) {
        return Err(corrupt(format!(
            "{} data bytes for {} time codes of {} bytes",
            reader.remaining(),
            num_keys,
            key_size
        )));
    }

    let mut keyframes = Vec::with_capacity(num_keys);
    let mut components = [0.0f32; 4];
    for _ in 0..num_keys {
        let code = reader.read_u32()?;
        let frame = code & MAX_TIME_CODE_FRAME;
        check_time_code(anim, pivot, keyframes.last().map(|k: &Keyframe| k.frame), frame)?;

        for slot in components.iter_mut().take(kind.vector_len()) {
            *slot = reader.read_f32()?;
        }
        keyframes.push(Keyframe {
            frame,
            value: ChannelValue::from_components(kind, &components),
            step: code & TIME_CODE_FLAG != 0,
        });
    }

    Ok(Channel {
        pivot_index: pivot,
        kind,
        encoding: Compression::TimeCoded,
        keyframes,
    })
}

fn read_adaptive_delta_channel(
    chunk: &Chunk<'_>,
    anim: &Animation,
    bits: DeltaBits,
) -> Result<Channel> {
    let mut reader = chunk.reader();
    let num_frames = reader.read_u32()?;
    let pivot = reader.read_u16()?;
    let vector_len = reader.read_u8()?;
    let flags = reader.read_u8()?;
    let scale = reader.read_f32()?;

    let corrupt = |reason: String| W3dError::corrupt_channel(&anim.name, pivot, reason);

    let kind = ChannelKind::from_flags(flags as u16)
        .ok_or_else(|| corrupt(format!("unknown channel type {}", flags)))?;
    if vector_len as usize != kind.vector_len() {
        return Err(corrupt(format!(
            "vector length {} for a {} channel",
            vector_len,
            kind.label()
        )));
    }
    if num_frames != anim.frame_count {
        return Err(corrupt(format!(
            "channel holds {} frames, animation has {}",
            num_frames, anim.frame_count
        )));
    }

    let samples = decode_channel(
        reader.rest(),
        num_frames as usize,
        kind.vector_len(),
        scale,
        bits,
    )
    .map_err(|e| corrupt(e.to_string()))?;

    let keyframes = samples
        .chunks_exact(kind.vector_len())
        .enumerate()
        .map(|(frame, components)| {
            Keyframe::new(frame as u32, ChannelValue::from_components(kind, components))
        })
        .collect();

    Ok(Channel {
        pivot_index: pivot,
        kind,
        encoding: Compression::AdaptiveDelta,
        keyframes,
    })
}

fn read_bit_channel(chunk: &Chunk<'_>, anim: &Animation) -> Result<Channel> {
    let mut reader = chunk.reader();
    let num_keys = reader.read_u32()? as usize;
    let pivot = reader.read_u16()?;
    let flags = reader.read_u8()?;
    let default = reader.read_u8()? != 0;

    let corrupt = |reason: String| W3dError::corrupt_channel(&anim.name, pivot, reason);

    if flags != 0 {
        return Err(corrupt(format!("unknown bit channel type {}", flags)));
    }
    if num_keys.checked_mul(4) != Some(reader.remaining()) {
        return Err(corrupt(format!(
            "{} data bytes for {} time codes",
            reader.remaining(),
            num_keys
        )));
    }

    let mut keyframes: Vec<Keyframe> = Vec::with_capacity(num_keys + 1);
    for _ in 0..num_keys {
        let code = reader.read_u32()?;
        let frame = code & MAX_TIME_CODE_FRAME;
        check_time_code(anim, pivot, keyframes.last().map(|k| k.frame), frame)?;
        keyframes.push(Keyframe::new(
            frame,
            ChannelValue::Visible(code & TIME_CODE_FLAG != 0),
        ));
    }

    // The default value shows before the first time code
    let leading = keyframes
        .first()
        .is_some_and(|k| k.frame > 0 && k.value != ChannelValue::Visible(default));
    if leading {
        keyframes.insert(0, Keyframe::new(0, ChannelValue::Visible(default)));
    }

    Ok(Channel {
        pivot_index: pivot,
        kind: ChannelKind::Visibility,
        encoding: Compression::TimeCoded,
        keyframes,
    })
}

/// Serialize as a `COMPRESSED_ANIMATION` chunk
///
/// Motion channels use `compression` (time-coded or 4-bit adaptive delta).
/// Visibility is always written as time-coded bit channels.
pub fn write_compressed_animation(
    animation: &Animation,
    compression: Compression,
    writer: &mut ChunkWriter,
) -> Result<()> {
    animation.validate()?;

    let flavor = match compression {
        Compression::AdaptiveDelta => Flavor::AdaptiveDelta4,
        _ => Flavor::TimeCoded,
    };
    let frame_rate = u16::try_from(animation.frames_per_second).map_err(|_| {
        W3dError::Unencodable(format!(
            "{} frames per second in compressed animation '{}'",
            animation.frames_per_second, animation.name
        ))
    })?;
    if animation.frame_count > MAX_TIME_CODE_FRAME {
        return Err(W3dError::Unencodable(format!(
            "{} frames in compressed animation '{}'",
            animation.frame_count, animation.name
        )));
    }

    writer.container(ChunkKind::CompressedAnimation.tag(), |w| {
        w.data(ChunkKind::CompressedAnimationHeader.tag(), |out| {
            CompressedAnimationHeader {
                version: ANIMATION_VERSION,
                name: animation.name.clone(),
                hierarchy_name: animation.hierarchy_name.clone(),
                num_frames: animation.frame_count,
                frame_rate,
                flavor: flavor as u16,
            }
            .write(out)
        })?;

        for channel in &animation.channels {
            if channel.kind.is_visibility() {
                write_bit_channel(w, channel)?;
            } else {
                match flavor.delta_bits() {
                    None => write_time_coded_channel(w, channel)?,
                    Some(bits) => write_adaptive_delta_channel(w, animation, channel, bits)?,
                }
            }
        }
        for extra in &animation.extra_chunks {
            extra.write(w)?;
        }
        Ok(())
    })?;

    debug!(
        "wrote animation '{}' as {:?} ({})",
        animation.name,
        flavor,
        flavor.compression()
    );
    Ok(())
}

fn key_count(channel: &Channel) -> Result<u32> {
    u32::try_from(channel.keyframes.len())
        .map_err(|_| W3dError::Unencodable(format!("{} keyframes", channel.keyframes.len())))
}

fn write_time_coded_channel(w: &mut ChunkWriter, channel: &Channel) -> Result<()> {
    let num_keys = key_count(channel)?;

    w.data(ChunkKind::CompressedAnimationChannel.tag(), |out| {
        out.write_u32(num_keys);
        out.write_u16(channel.pivot_index);
        out.write_u8(channel.kind.vector_len() as u8);
        out.write_u8(channel.kind.flags() as u8);

        let mut components = Vec::with_capacity(4);
        for key in &channel.keyframes {
            let mut code = key.frame;
            if key.step {
                code |= TIME_CODE_FLAG;
            }
            out.write_u32(code);

            components.clear();
            key.value.push_components(&mut components);
            for &c in &components {
                out.write_f32(c);
            }
        }
        Ok(())
    })
}

fn write_adaptive_delta_channel(
    w: &mut ChunkWriter,
    animation: &Animation,
    channel: &Channel,
    bits: DeltaBits,
) -> Result<()> {
    let last = animation.frame_count.saturating_sub(1);
    let mut samples = Vec::with_capacity(animation.frame_count as usize * channel.kind.vector_len());
    for value in channel.dense(0, last) {
        value.push_components(&mut samples);
    }

    let encoded = encode_channel(&samples, channel.kind.vector_len(), bits).map_err(|e| {
        W3dError::Unencodable(format!(
            "pivot {} {} channel of '{}': {}",
            channel.pivot_index,
            channel.kind.label(),
            animation.name,
            e
        ))
    })?;

    w.data(ChunkKind::CompressedAnimationChannel.tag(), |out| {
        out.write_u32(animation.frame_count);
        out.write_u16(channel.pivot_index);
        out.write_u8(channel.kind.vector_len() as u8);
        out.write_u8(channel.kind.flags() as u8);
        out.write_f32(encoded.scale);
        out.extend_from_slice(&encoded.data);
        Ok(())
    })
}

fn write_bit_channel(w: &mut ChunkWriter, channel: &Channel) -> Result<()> {
    let num_keys = key_count(channel)?;
    let default = channel
        .keyframes
        .first()
        .and_then(|k| k.value.as_visible())
        .unwrap_or(true);

    w.data(ChunkKind::CompressedBitChannel.tag(), |out| {
        out.write_u32(num_keys);
        out.write_u16(channel.pivot_index);
        out.write_u8(0);
        out.write_u8(default as u8);

        for key in &channel.keyframes {
            let mut code = key.frame;
            if key.value.as_visible() == Some(true) {
                code |= TIME_CODE_FLAG;
            }
            out.write_u32(code);
        }
        Ok(())
    })
}
