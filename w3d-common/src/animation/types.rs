//! Animation model types

use glam::Quat;

use crate::chunk::RawChunk;
use crate::error::{Result, W3dError};
use crate::options::Compression;

/// What a channel drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// Translation along X
    X,
    Y,
    Z,
    /// Euler rotation about X
    XRotation,
    YRotation,
    ZRotation,
    /// Rotation quaternion (x, y, z, w)
    Quaternion,
    /// Visibility bit
    Visibility,
}

impl ChannelKind {
    /// Motion channel type stored in the channel `flags` field
    pub fn from_flags(flags: u16) -> Option<Self> {
        match flags {
            0 => Some(ChannelKind::X),
            1 => Some(ChannelKind::Y),
            2 => Some(ChannelKind::Z),
            3 => Some(ChannelKind::XRotation),
            4 => Some(ChannelKind::YRotation),
            5 => Some(ChannelKind::ZRotation),
            6 => Some(ChannelKind::Quaternion),
            _ => None,
        }
    }

    /// `flags` value on disk; visibility lives in bit channels with flag 0
    pub fn flags(self) -> u16 {
        match self {
            ChannelKind::X | ChannelKind::Visibility => 0,
            ChannelKind::Y => 1,
            ChannelKind::Z => 2,
            ChannelKind::XRotation => 3,
            ChannelKind::YRotation => 4,
            ChannelKind::ZRotation => 5,
            ChannelKind::Quaternion => 6,
        }
    }

    /// Floats per sample
    pub fn vector_len(self) -> usize {
        match self {
            ChannelKind::Quaternion => 4,
            _ => 1,
        }
    }

    pub fn is_visibility(self) -> bool {
        self == ChannelKind::Visibility
    }

    pub fn label(self) -> &'static str {
        match self {
            ChannelKind::X => "X",
            ChannelKind::Y => "Y",
            ChannelKind::Z => "Z",
            ChannelKind::XRotation => "XR",
            ChannelKind::YRotation => "YR",
            ChannelKind::ZRotation => "ZR",
            ChannelKind::Quaternion => "Q",
            ChannelKind::Visibility => "VIS",
        }
    }
}

/// One sample value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChannelValue {
    Scalar(f32),
    Rotation(Quat),
    Visible(bool),
}

impl ChannelValue {
    /// Whether this value has the shape `kind` expects
    pub fn fits(&self, kind: ChannelKind) -> bool {
        match self {
            ChannelValue::Scalar(_) => !matches!(
                kind,
                ChannelKind::Quaternion | ChannelKind::Visibility
            ),
            ChannelValue::Rotation(_) => kind == ChannelKind::Quaternion,
            ChannelValue::Visible(_) => kind == ChannelKind::Visibility,
        }
    }

    /// Build a motion value from its float components
    ///
    /// `components` must hold `kind.vector_len()` floats.
    pub fn from_components(kind: ChannelKind, components: &[f32]) -> Self {
        match kind {
            ChannelKind::Quaternion => ChannelValue::Rotation(Quat::from_xyzw(
                components[0],
                components[1],
                components[2],
                components[3],
            )),
            ChannelKind::Visibility => ChannelValue::Visible(components[0] != 0.0),
            _ => ChannelValue::Scalar(components[0]),
        }
    }

    /// Append the float components (x, y, z, w for quaternions)
    pub fn push_components(&self, out: &mut Vec<f32>) {
        match *self {
            ChannelValue::Scalar(v) => out.push(v),
            ChannelValue::Rotation(q) => out.extend_from_slice(&[q.x, q.y, q.z, q.w]),
            ChannelValue::Visible(v) => out.push(if v { 1.0 } else { 0.0 }),
        }
    }

    pub fn as_scalar(&self) -> Option<f32> {
        match *self {
            ChannelValue::Scalar(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_rotation(&self) -> Option<Quat> {
        match *self {
            ChannelValue::Rotation(q) => Some(q),
            _ => None,
        }
    }

    pub fn as_visible(&self) -> Option<bool> {
        match *self {
            ChannelValue::Visible(v) => Some(v),
            _ => None,
        }
    }
}

/// Sample at a frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe {
    pub frame: u32,
    pub value: ChannelValue,
    /// Hold this value until the next key instead of interpolating
    pub step: bool,
}

impl Keyframe {
    pub fn new(frame: u32, value: ChannelValue) -> Self {
        Self {
            frame,
            value,
            step: false,
        }
    }

    /// Key that holds its value until the next key
    pub fn stepped(frame: u32, value: ChannelValue) -> Self {
        Self {
            frame,
            value,
            step: true,
        }
    }
}

/// Keyframes driving one property of one pivot
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    pub pivot_index: u16,
    pub kind: ChannelKind,
    /// Encoding the channel was read with
    pub encoding: Compression,
    pub keyframes: Vec<Keyframe>,
}

impl Channel {
    pub fn new(pivot_index: u16, kind: ChannelKind, keyframes: Vec<Keyframe>) -> Self {
        Self {
            pivot_index,
            kind,
            encoding: Compression::TimeCoded,
            keyframes,
        }
    }

    pub fn first_frame(&self) -> Option<u32> {
        self.keyframes.first().map(|k| k.frame)
    }

    pub fn last_frame(&self) -> Option<u32> {
        self.keyframes.last().map(|k| k.frame)
    }

    /// Check key order, range and value shape
    pub fn validate(&self, animation: &str, frame_count: u32) -> Result<()> {
        let corrupt = |reason: String| W3dError::corrupt_channel(animation, self.pivot_index, reason);

        if self.keyframes.is_empty() {
            return Err(corrupt(format!("{} channel has no keyframes", self.kind.label())));
        }

        let mut previous: Option<u32> = None;
        for key in &self.keyframes {
            if key.frame >= frame_count {
                return Err(corrupt(format!(
                    "keyframe at frame {} outside {} frames",
                    key.frame, frame_count
                )));
            }
            if let Some(prev) = previous {
                if key.frame <= prev {
                    return Err(corrupt(format!(
                        "keyframe at frame {} follows frame {}",
                        key.frame, prev
                    )));
                }
            }
            if !key.value.fits(self.kind) {
                return Err(corrupt(format!(
                    "{:?} value in a {} channel",
                    key.value,
                    self.kind.label()
                )));
            }
            previous = Some(key.frame);
        }
        Ok(())
    }
}

/// Named clip for one hierarchy
#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    pub name: String,
    pub hierarchy_name: String,
    pub frame_count: u32,
    pub frames_per_second: u32,
    pub channels: Vec<Channel>,
    /// Unrecognized sub-chunks, written back after the channels
    pub extra_chunks: Vec<RawChunk>,
}

impl Animation {
    pub fn new(
        name: impl Into<String>,
        hierarchy_name: impl Into<String>,
        frame_count: u32,
        frames_per_second: u32,
    ) -> Self {
        Self {
            name: name.into(),
            hierarchy_name: hierarchy_name.into(),
            frame_count,
            frames_per_second,
            channels: Vec::new(),
            extra_chunks: Vec::new(),
        }
    }

    /// Clip length in seconds
    pub fn duration(&self) -> f32 {
        if self.frames_per_second == 0 {
            return 0.0;
        }
        self.frame_count as f32 / self.frames_per_second as f32
    }

    /// Channels driving `pivot_index`
    pub fn channels_for(&self, pivot_index: u16) -> impl Iterator<Item = &Channel> {
        self.channels
            .iter()
            .filter(move |c| c.pivot_index == pivot_index)
    }

    /// Value of one pivot property at a (fractional) frame
    pub fn sample(&self, pivot_index: u16, kind: ChannelKind, frame: f32) -> Option<ChannelValue> {
        self.channels_for(pivot_index)
            .find(|c| c.kind == kind)
            .and_then(|c| c.sample(frame))
    }

    /// Validate every channel against the frame count
    pub fn validate(&self) -> Result<()> {
        for channel in &self.channels {
            channel.validate(&self.name, self.frame_count)?;
        }
        Ok(())
    }

    /// Highest pivot index used by any channel
    pub fn max_pivot(&self) -> Option<u16> {
        self.channels.iter().map(|c| c.pivot_index).max()
    }
}
