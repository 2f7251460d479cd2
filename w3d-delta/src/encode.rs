//! Adaptive-delta encoder
//!
//! Encodes frame-major samples to a channel payload. Like the decoder this is
//! a pure codec; the caller writes the returned scale into the channel header.

use crate::decode::decode_block;
use crate::{
    DELTA_BLOCK_LEN, DeltaBits, DeltaError, FILTER_TABLE, FILTER_UNITY, block_count, encoded_len,
};

/// One quantized block before packing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeltaBlock {
    /// Index into `FILTER_TABLE`
    pub filter_index: u8,
    /// Signed deltas, unused trailing entries are zero
    pub deltas: [i32; DELTA_BLOCK_LEN],
}

impl DeltaBlock {
    /// Pack the filter index and deltas into payload bytes
    pub fn to_bytes(&self, bits: DeltaBits) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(1 + bits.block_bytes());
        bytes.push(self.filter_index);

        match bits {
            DeltaBits::Four => {
                for pair in self.deltas.chunks_exact(2) {
                    let lo = (pair[0] as u8) & 0x0F;
                    let hi = (pair[1] as u8) & 0x0F;
                    bytes.push(lo | (hi << 4));
                }
            }
            DeltaBits::Eight => {
                for &delta in &self.deltas {
                    bytes.push(delta as i8 as u8);
                }
            }
        }

        bytes
    }
}

/// Result of encoding one channel
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedChannel {
    /// Channel scale, stored in the channel header by the caller
    pub scale: f32,
    /// Channel payload (initial value + delta blocks)
    pub data: Vec<u8>,
}

/// Encode a block of up to 16 target values
///
/// Tries every filter index and keeps the one with the lowest squared error.
/// Each delta is quantized against the value the decoder will have produced,
/// so error does not accumulate across the block.
///
/// # Arguments
/// * `previous` - Last decoded value of this component
/// * `targets` - Values to approximate (up to 16)
/// * `bits` - Delta width
/// * `scale` - Channel scale
pub fn encode_block(previous: f32, targets: &[f32], bits: DeltaBits, scale: f32) -> DeltaBlock {
    let (min_delta, max_delta) = bits.delta_range();

    let mut best = DeltaBlock {
        filter_index: FILTER_UNITY,
        deltas: [0; DELTA_BLOCK_LEN],
    };
    let mut best_error = f64::MAX;

    for (index, &filter) in FILTER_TABLE.iter().enumerate() {
        let step = filter * scale * bits.factor();
        let mut value = previous;
        let mut deltas = [0i32; DELTA_BLOCK_LEN];
        let mut total_error = 0.0f64;

        for (i, &target) in targets.iter().take(DELTA_BLOCK_LEN).enumerate() {
            let delta = if step > 0.0 && step.is_finite() {
                ((target - value) / step)
                    .round()
                    .clamp(min_delta as f32, max_delta as f32) as i32
            } else {
                0
            };

            value += step * delta as f32;
            deltas[i] = delta;

            let error = (target - value) as f64;
            total_error += error * error;
        }

        if total_error < best_error {
            best_error = total_error;
            best = DeltaBlock {
                filter_index: index as u8,
                deltas,
            };
        }
    }

    best
}

/// Encode frame-major samples to an adaptive-delta payload
///
/// # Arguments
/// * `samples` - `num_frames × vector_len` values in frame-major order
/// * `vector_len` - Components per frame
/// * `bits` - Delta width
///
/// # Errors
/// Returns `DeltaError` if `samples` is empty or not a whole number of frames
pub fn encode_channel(
    samples: &[f32],
    vector_len: usize,
    bits: DeltaBits,
) -> Result<EncodedChannel, DeltaError> {
    if vector_len == 0 {
        return Err(DeltaError::EmptyVector);
    }
    if samples.is_empty() {
        return Err(DeltaError::NoFrames);
    }
    if samples.len() % vector_len != 0 {
        return Err(DeltaError::LengthMismatch {
            expected: samples.len().next_multiple_of(vector_len),
            actual: samples.len(),
        });
    }

    let num_frames = samples.len() / vector_len;
    let scale = channel_scale(samples, vector_len, bits);

    let mut data = Vec::with_capacity(encoded_len(num_frames, vector_len, bits));
    for &value in &samples[..vector_len] {
        data.extend_from_slice(&value.to_le_bytes());
    }

    // Values as the decoder will see them, used as the base of each block
    let mut decoded = samples[..vector_len].to_vec();
    decoded.resize(samples.len(), 0.0);

    for block_idx in 0..block_count(num_frames) * vector_len {
        let component = block_idx % vector_len;
        let first_frame = (block_idx / vector_len) * DELTA_BLOCK_LEN + 1;

        if first_frame >= num_frames {
            // Trailing block the decoder skips; keep the layout complete
            let padding = DeltaBlock {
                filter_index: FILTER_UNITY,
                deltas: [0; DELTA_BLOCK_LEN],
            };
            data.extend_from_slice(&padding.to_bytes(bits));
            continue;
        }

        let frames_in_block = (num_frames - first_frame).min(DELTA_BLOCK_LEN);
        let targets: Vec<f32> = (first_frame..first_frame + frames_in_block)
            .map(|frame| samples[frame * vector_len + component])
            .collect();
        let previous = decoded[(first_frame - 1) * vector_len + component];

        let block = encode_block(previous, &targets, bits, scale);
        let bytes = block.to_bytes(bits);

        let mut temp = [0.0f32; DELTA_BLOCK_LEN];
        decode_block(
            previous,
            bytes[0],
            &bytes[1..],
            bits,
            scale,
            &mut temp[..frames_in_block],
        )?;
        for (i, &value) in temp[..frames_in_block].iter().enumerate() {
            decoded[(first_frame + i) * vector_len + component] = value;
        }

        data.extend_from_slice(&bytes);
    }

    Ok(EncodedChannel { scale, data })
}

/// Pick a scale so the largest frame-to-frame step fits the unity filter
fn channel_scale(samples: &[f32], vector_len: usize, bits: DeltaBits) -> f32 {
    let max_step = samples
        .windows(vector_len + 1)
        .map(|w| (w[vector_len] - w[0]).abs())
        .filter(|d| d.is_finite())
        .fold(0.0f32, f32::max);

    let (_, max_delta) = bits.delta_range();
    let scale = max_step / (max_delta as f32 * bits.factor());

    if scale.is_finite() { scale } else { 0.0 }
}
