//! Keyframe interpolation
//!
//! Scalars interpolate linearly and quaternions with slerp. Visibility and
//! stepped keys hold their value until the next key. Before the first key the
//! first value is held, after the last key the last value.

use super::types::{Channel, ChannelValue};

/// Interpolate between two values of the same kind
pub fn interpolate(a: ChannelValue, b: ChannelValue, t: f32) -> ChannelValue {
    match (a, b) {
        (ChannelValue::Scalar(a), ChannelValue::Scalar(b)) => ChannelValue::Scalar(a + (b - a) * t),
        (ChannelValue::Rotation(a), ChannelValue::Rotation(b)) => {
            ChannelValue::Rotation(a.slerp(b, t))
        }
        // Visibility and mismatched kinds hold
        _ => a,
    }
}

impl Channel {
    /// Value at a (fractional) frame, `None` for an empty channel
    pub fn sample(&self, frame: f32) -> Option<ChannelValue> {
        let keys = &self.keyframes;
        let first = keys.first()?;
        let last = keys.last()?;

        // NaN compares false against every key, so it takes the first value
        if frame.is_nan() || frame <= first.frame as f32 {
            return Some(first.value);
        }
        if frame >= last.frame as f32 {
            return Some(last.value);
        }

        let next = keys.partition_point(|k| k.frame as f32 <= frame);
        let Some(from) = next.checked_sub(1).and_then(|i| keys.get(i)) else {
            return Some(first.value);
        };
        let Some(to) = keys.get(next) else {
            return Some(last.value);
        };

        if from.step || frame == from.frame as f32 {
            return Some(from.value);
        }

        let span = (to.frame - from.frame) as f32;
        let t = (frame - from.frame as f32) / span;
        Some(interpolate(from.value, to.value, t))
    }

    /// One value per integer frame in `first..=last`
    pub fn dense(&self, first: u32, last: u32) -> Vec<ChannelValue> {
        (first..=last)
            .filter_map(|frame| self.sample(frame as f32))
            .collect()
    }
}
