//! Adaptive-delta decoder
//!
//! Decodes a channel payload to frame-major samples. The caller (w3d-common)
//! supplies the frame count, vector length and scale from the channel header.

use crate::{
    DELTA_BLOCK_LEN, DeltaBits, DeltaError, block_count, encoded_len, filter_step,
};

/// Read the signed delta at position `index` of a block
#[inline]
pub(crate) fn delta_at(deltas: &[u8], bits: DeltaBits, index: usize) -> i32 {
    match bits {
        DeltaBits::Four => {
            let byte = deltas[index / 2];
            let nibble = if index % 2 == 0 { byte & 0x0F } else { byte >> 4 };
            // Sign-extend the nibble through the top of an i8
            (((nibble << 4) as i8) >> 4) as i32
        }
        DeltaBits::Eight => deltas[index] as i8 as i32,
    }
}

/// Decode a single delta block
///
/// # Arguments
/// * `previous` - Last decoded value of this component
/// * `filter_index` - Index into `FILTER_TABLE`
/// * `deltas` - Packed delta bytes (8 bytes at 4-bit, 16 bytes at 8-bit)
/// * `bits` - Delta width
/// * `scale` - Channel scale from the channel header
/// * `output` - Output buffer for decoded values
///
/// # Returns
/// Number of values decoded (up to 16, or `output.len()` if smaller)
pub fn decode_block(
    previous: f32,
    filter_index: u8,
    deltas: &[u8],
    bits: DeltaBits,
    scale: f32,
    output: &mut [f32],
) -> Result<usize, DeltaError> {
    let filter =
        filter_step(filter_index as usize).ok_or(DeltaError::FilterIndex(filter_index as usize))?;

    if deltas.len() < bits.block_bytes() {
        return Err(DeltaError::LengthMismatch {
            expected: bits.block_bytes(),
            actual: deltas.len(),
        });
    }

    let step = filter * scale * bits.factor();
    let count = output.len().min(DELTA_BLOCK_LEN);
    let mut value = previous;

    for (i, slot) in output.iter_mut().take(count).enumerate() {
        value += step * delta_at(deltas, bits, i) as f32;
        *slot = value;
    }

    Ok(count)
}

/// Decode an adaptive-delta channel payload
///
/// # Arguments
/// * `data` - Channel payload (initial value followed by delta blocks)
/// * `num_frames` - Frame count from the channel header
/// * `vector_len` - Components per frame (1 for scalar channels, 4 for quaternions)
/// * `scale` - Channel scale from the channel header
/// * `bits` - Delta width (from the animation flavor)
///
/// # Returns
/// `num_frames × vector_len` samples in frame-major order
///
/// # Errors
/// Returns `DeltaError` if the payload size is inconsistent with the header
/// values. Up to three bytes of trailing alignment padding are tolerated.
pub fn decode_channel(
    data: &[u8],
    num_frames: usize,
    vector_len: usize,
    scale: f32,
    bits: DeltaBits,
) -> Result<Vec<f32>, DeltaError> {
    if vector_len == 0 {
        return Err(DeltaError::EmptyVector);
    }
    if num_frames == 0 {
        return Err(DeltaError::NoFrames);
    }

    let expected = encoded_len(num_frames, vector_len, bits);
    if data.len() < expected || data.len() >= expected + 4 {
        return Err(DeltaError::LengthMismatch {
            expected,
            actual: data.len(),
        });
    }

    let mut output = vec![0.0f32; num_frames * vector_len];

    // Initial value (frame 0)
    for (slot, bytes) in output.iter_mut().zip(data.chunks_exact(4)).take(vector_len) {
        *slot = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    }

    let block_stride = 1 + bits.block_bytes();
    let mut data_idx = vector_len * 4;

    for block_idx in 0..block_count(num_frames) * vector_len {
        let component = block_idx % vector_len;
        let first_frame = (block_idx / vector_len) * DELTA_BLOCK_LEN + 1;

        let filter_index = data[data_idx];
        let deltas = &data[data_idx + 1..data_idx + block_stride];
        data_idx += block_stride;

        if first_frame >= num_frames {
            continue;
        }

        let frames_in_block = (num_frames - first_frame).min(DELTA_BLOCK_LEN);
        let previous = output[(first_frame - 1) * vector_len + component];

        let mut temp = [0.0f32; DELTA_BLOCK_LEN];
        decode_block(
            previous,
            filter_index,
            deltas,
            bits,
            scale,
            &mut temp[..frames_in_block],
        )?;

        for (i, &value) in temp[..frames_in_block].iter().enumerate() {
            output[(first_frame + i) * vector_len + component] = value;
        }
    }

    Ok(output)
}
