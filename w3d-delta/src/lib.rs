//! W3D adaptive-delta curve codec
//!
//! Lossy encoding used by `COMPRESSED_ANIMATION` channels whose flavor is
//! adaptive delta. Each channel stores its first sample verbatim and every
//! following sample as a small signed delta against the previously *decoded*
//! sample, scaled by a per-channel `scale` and a per-block filter step.
//!
//! **This is a pure codec** - channel headers (pivot, vector length, channel
//! type, scale, frame count) belong to the caller (`w3d-common`). Only the
//! channel payload is produced or consumed here.
//!
//! # Payload Format
//!
//! ```text
//! Initial value (vector_len × f32 LE)
//!
//! Delta blocks, (num_frames + 15) / 16 per component, interleaved:
//!   [block0.c0][block0.c1]...[block0.cN][block1.c0]...
//!
//! Each block:
//!   0x00: filter index (u8)   - index into FILTER_TABLE
//!   0x01: deltas              - 16 × 4-bit (8 bytes, low nibble first)
//!                               or 16 × 8-bit (16 bytes)
//! ```
//!
//! # Decoding
//!
//! ```text
//! step     = FILTER_TABLE[index] * scale * bits_factor
//! value[i] = value[i - 1] + step * delta[i]
//! ```
//!
//! `bits_factor` is `1.0` for 4-bit deltas and `1/16` for 8-bit deltas. The
//! arithmetic is done in `f32` in exactly this order so decoding is bit-exact
//! with other readers of the format.
//!
//! # Usage
//!
//! ```
//! use w3d_delta::{DeltaBits, decode_channel, encode_channel};
//!
//! let samples: Vec<f32> = (0..40).map(|i| i as f32 * 0.25).collect();
//! let encoded = encode_channel(&samples, 1, DeltaBits::Four).unwrap();
//! let decoded = decode_channel(&encoded.data, 40, 1, encoded.scale, DeltaBits::Four).unwrap();
//! assert_eq!(decoded.len(), samples.len());
//! ```

mod decode;
mod encode;

use std::sync::LazyLock;

pub use decode::{decode_block, decode_channel};
pub use encode::{DeltaBlock, EncodedChannel, encode_block, encode_channel};

// =============================================================================
// Constants
// =============================================================================

/// Samples covered by one delta block
pub const DELTA_BLOCK_LEN: usize = 16;

/// Number of entries in the filter table (every u8 index is addressable)
pub const FILTER_TABLE_LEN: usize = 256;

/// Filter index whose step multiplier is exactly 1.0
pub const FILTER_UNITY: u8 = 16;

/// Decade entries of the filter table (indices 0..16)
const FILTER_DECADES: [f32; 16] = [
    1.0e-8, 1.0e-7, 1.0e-6, 1.0e-5, 1.0e-4, 1.0e-3, 1.0e-2, 1.0e-1,
    1.0, 1.0e1, 1.0e2, 1.0e3, 1.0e4, 1.0e5, 1.0e6, 1.0e7,
];

/// Falloff entry `k` (table index `16 + k`): `1 - sin(90° * k / 240)`
///
/// Evaluated in `f64` and rounded once to `f32`.
pub fn filter_falloff(k: usize) -> f32 {
    (1.0 - (90.0 * k as f64 / 240.0).to_radians().sin()) as f32
}

/// Filter step multipliers
///
/// Entries 0..16 are decades `10^(i - 8)`; entries 16..256 are
/// [`filter_falloff`] for `k` in 0..240.
pub static FILTER_TABLE: LazyLock<[f32; FILTER_TABLE_LEN]> = LazyLock::new(|| {
    let mut table = [0.0f32; FILTER_TABLE_LEN];
    table[..FILTER_DECADES.len()].copy_from_slice(&FILTER_DECADES);
    for (k, entry) in table[FILTER_DECADES.len()..].iter_mut().enumerate() {
        *entry = filter_falloff(k);
    }
    table
});

// =============================================================================
// Delta Width
// =============================================================================

/// Width of each quantized delta
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaBits {
    /// 4-bit signed deltas (-8..=7), 8 bytes per block
    Four,
    /// 8-bit signed deltas (-128..=127), 16 bytes per block
    Eight,
}

impl DeltaBits {
    /// Number of bits per delta
    pub const fn bits(self) -> usize {
        match self {
            DeltaBits::Four => 4,
            DeltaBits::Eight => 8,
        }
    }

    /// Bytes of delta data per block (excluding the filter index byte)
    pub const fn block_bytes(self) -> usize {
        self.bits() * DELTA_BLOCK_LEN / 8
    }

    /// Extra multiplier applied to the filter step
    pub const fn factor(self) -> f32 {
        match self {
            DeltaBits::Four => 1.0,
            DeltaBits::Eight => 1.0 / 16.0,
        }
    }

    /// Inclusive range of representable deltas
    pub const fn delta_range(self) -> (i32, i32) {
        match self {
            DeltaBits::Four => (-8, 7),
            DeltaBits::Eight => (-128, 127),
        }
    }
}

// =============================================================================
// Error Type
// =============================================================================

/// Errors that can occur while encoding or decoding a channel payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaError {
    /// Vector length of zero
    EmptyVector,
    /// Channel declares zero frames
    NoFrames,
    /// Payload size does not match the frame count and vector length
    LengthMismatch { expected: usize, actual: usize },
    /// Filter index outside the filter table
    FilterIndex(usize),
}

impl core::fmt::Display for DeltaError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DeltaError::EmptyVector => write!(f, "vector length must be at least 1"),
            DeltaError::NoFrames => write!(f, "channel has no frames"),
            DeltaError::LengthMismatch { expected, actual } => write!(
                f,
                "payload is {} bytes, expected {} bytes",
                actual, expected
            ),
            DeltaError::FilterIndex(index) => write!(
                f,
                "filter index {} outside table of {} entries",
                index, FILTER_TABLE_LEN
            ),
        }
    }
}

impl std::error::Error for DeltaError {}

// =============================================================================
// Helper Functions
// =============================================================================

/// Number of delta blocks per component for a channel of `num_frames`
#[inline]
pub const fn block_count(num_frames: usize) -> usize {
    num_frames.div_ceil(DELTA_BLOCK_LEN)
}

/// Exact payload size for a channel (no trailing padding)
pub const fn encoded_len(num_frames: usize, vector_len: usize, bits: DeltaBits) -> usize {
    vector_len * 4 + block_count(num_frames) * vector_len * (1 + bits.block_bytes())
}

/// Look up a filter step multiplier
#[inline]
pub fn filter_step(index: usize) -> Option<f32> {
    FILTER_TABLE.get(index).copied()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn generate_curve(frames: usize) -> Vec<f32> {
        (0..frames)
            .map(|i| (i as f32 * 0.15).sin() * 3.0 + i as f32 * 0.05)
            .collect()
    }

    #[test]
    fn test_filter_table_anchors() {
        assert_eq!(FILTER_TABLE[8], 1.0);
        assert_eq!(FILTER_TABLE[FILTER_UNITY as usize], 1.0);
        assert_eq!(FILTER_TABLE[0], 1.0e-8);
        assert_eq!(FILTER_TABLE[15], 1.0e7);
        assert_eq!(FILTER_TABLE[96], 0.5);
    }

    #[test]
    fn test_filter_table_matches_formula() {
        for i in 0..16i32 {
            let expected: f32 = format!("1e{}", i - 8).parse().unwrap();
            assert_eq!(FILTER_TABLE[i as usize].to_bits(), expected.to_bits(), "entry {}", i);
        }
        for k in 0..240usize {
            let expected = (1.0 - (90.0 * k as f64 / 240.0).to_radians().sin()) as f32;
            assert_eq!(
                FILTER_TABLE[16 + k].to_bits(),
                expected.to_bits(),
                "entry {}: {} vs {}",
                16 + k,
                FILTER_TABLE[16 + k],
                expected
            );
        }
    }

    #[test]
    fn test_filter_table_falloff_is_monotonic() {
        for pair in FILTER_TABLE[16..].windows(2) {
            assert!(pair[1] < pair[0], "{} !< {}", pair[1], pair[0]);
        }
        assert!(FILTER_TABLE[255] > 0.0);
    }

    #[test]
    fn test_block_sizes() {
        assert_eq!(DeltaBits::Four.block_bytes(), 8);
        assert_eq!(DeltaBits::Eight.block_bytes(), 16);
        assert_eq!(block_count(1), 1);
        assert_eq!(block_count(16), 1);
        assert_eq!(block_count(17), 2);
        // 4 initial floats + 2 blocks × 4 components × 9 bytes
        assert_eq!(encoded_len(20, 4, DeltaBits::Four), 16 + 2 * 4 * 9);
    }

    #[test]
    fn test_roundtrip_curve_four_bit() {
        let original = generate_curve(60);
        let encoded = encode_channel(&original, 1, DeltaBits::Four).unwrap();
        assert_eq!(encoded.data.len(), encoded_len(60, 1, DeltaBits::Four));

        let decoded =
            decode_channel(&encoded.data, 60, 1, encoded.scale, DeltaBits::Four).unwrap();
        assert_eq!(decoded.len(), original.len());
        assert_eq!(decoded[0], original[0], "first sample is stored verbatim");

        let max_error = original
            .iter()
            .zip(&decoded)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f32, f32::max);
        assert!(max_error < 0.1, "max error {} too large", max_error);
    }

    #[test]
    fn test_roundtrip_curve_eight_bit_is_tighter() {
        let original = generate_curve(48);
        let four = encode_channel(&original, 1, DeltaBits::Four).unwrap();
        let eight = encode_channel(&original, 1, DeltaBits::Eight).unwrap();

        let error = |bits, encoded: &EncodedChannel| {
            decode_channel(&encoded.data, 48, 1, encoded.scale, bits)
                .unwrap()
                .iter()
                .zip(&original)
                .map(|(a, b)| (a - b).abs())
                .fold(0.0f32, f32::max)
        };

        assert!(error(DeltaBits::Eight, &eight) <= error(DeltaBits::Four, &four));
    }

    #[test]
    fn test_roundtrip_constant_channel() {
        let original = vec![2.5f32; 33];
        let encoded = encode_channel(&original, 1, DeltaBits::Four).unwrap();
        assert_eq!(encoded.scale, 0.0);

        let decoded =
            decode_channel(&encoded.data, 33, 1, encoded.scale, DeltaBits::Four).unwrap();
        assert!(decoded.iter().all(|&v| v == 2.5));
    }

    #[test]
    fn test_roundtrip_vector_channel() {
        // Quaternion-like channel: 4 components, frame-major
        let frames = 25;
        let mut original = Vec::with_capacity(frames * 4);
        for i in 0..frames {
            let angle = i as f32 * 0.05;
            original.extend_from_slice(&[(angle * 0.5).sin(), 0.0, 0.0, (angle * 0.5).cos()]);
        }

        let encoded = encode_channel(&original, 4, DeltaBits::Four).unwrap();
        let decoded =
            decode_channel(&encoded.data, frames, 4, encoded.scale, DeltaBits::Four).unwrap();

        for (a, b) in original.iter().zip(&decoded) {
            assert!((a - b).abs() < 0.01, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_decode_is_deterministic() {
        let original = generate_curve(70);
        let encoded = encode_channel(&original, 1, DeltaBits::Four).unwrap();

        let first = decode_channel(&encoded.data, 70, 1, encoded.scale, DeltaBits::Four).unwrap();
        let second = decode_channel(&encoded.data, 70, 1, encoded.scale, DeltaBits::Four).unwrap();

        let first_bits: Vec<u32> = first.iter().map(|v| v.to_bits()).collect();
        let second_bits: Vec<u32> = second.iter().map(|v| v.to_bits()).collect();
        assert_eq!(first_bits, second_bits);
    }

    #[test]
    fn test_error_display() {
        let err = DeltaError::LengthMismatch {
            expected: 12,
            actual: 4,
        };
        assert_eq!(err.to_string(), "payload is 4 bytes, expected 12 bytes");
    }
}
