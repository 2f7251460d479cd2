use glam::Quat;
use w3d_delta::{DeltaBits, encode_channel};

use super::*;
use crate::chunk::{RawChunk, read_chunks};
use crate::error::W3dError;
use crate::primitives::{BinaryRecord, WriteLe};

// ============================================================================
// Helpers
// ============================================================================

fn scalar(frame: u32, value: f32) -> Keyframe {
    Keyframe::new(frame, ChannelValue::Scalar(value))
}

fn visible(frame: u32, value: bool) -> Keyframe {
    Keyframe::new(frame, ChannelValue::Visible(value))
}

fn rotation(frame: u32, angle: f32) -> Keyframe {
    Keyframe::new(frame, ChannelValue::Rotation(Quat::from_rotation_z(angle)))
}

fn walk() -> Animation {
    let mut anim = Animation::new("WALK", "SKL", 20, 30);
    anim.channels.push(Channel::new(
        1,
        ChannelKind::X,
        vec![scalar(0, 0.0), scalar(10, 1.0), scalar(19, -2.5)],
    ));
    anim.channels.push(Channel::new(
        2,
        ChannelKind::Quaternion,
        vec![rotation(0, 0.0), rotation(5, 0.4), rotation(15, 1.2)],
    ));
    anim.channels.push(Channel::new(
        2,
        ChannelKind::Visibility,
        vec![visible(0, true), visible(8, false), visible(12, true)],
    ));
    anim
}

fn with_encoding(mut anim: Animation, encoding: Compression) -> Animation {
    for channel in &mut anim.channels {
        channel.encoding = encoding;
    }
    anim
}

fn roundtrip(anim: &Animation, compression: Compression) -> Result<Animation> {
    let mut writer = ChunkWriter::new();
    anim.write(&mut writer, compression)?;
    let bytes = writer.into_bytes();
    let chunk = read_chunks(&bytes).next().unwrap()?;
    Animation::read(&chunk)
}

/// Hand-built `COMPRESSED_ANIMATION` chunk
fn compressed_bytes<F>(frames: u32, flavor: u16, channels: F) -> Vec<u8>
where
    F: FnOnce(&mut ChunkWriter) -> Result<()>,
{
    let mut writer = ChunkWriter::new();
    writer
        .container(ChunkKind::CompressedAnimation.tag(), |w| {
            w.data(ChunkKind::CompressedAnimationHeader.tag(), |out| {
                CompressedAnimationHeader {
                    version: ANIMATION_VERSION,
                    name: "CLIP".into(),
                    hierarchy_name: "SKL".into(),
                    num_frames: frames,
                    frame_rate: 30,
                    flavor,
                }
                .write(out)
            })?;
            channels(w)
        })
        .unwrap();
    writer.into_bytes()
}

/// Hand-built `ANIMATION` chunk with one motion channel
fn uncompressed_bytes(frames: u32, first: u16, last: u16, vector_len: u16, data: &[f32]) -> Vec<u8> {
    let mut writer = ChunkWriter::new();
    writer
        .container(ChunkKind::Animation.tag(), |w| {
            w.data(ChunkKind::AnimationHeader.tag(), |out| {
                AnimationHeader {
                    version: ANIMATION_VERSION,
                    name: "CLIP".into(),
                    hierarchy_name: "SKL".into(),
                    num_frames: frames,
                    frame_rate: 30,
                }
                .write(out)
            })?;
            w.data(ChunkKind::AnimationChannel.tag(), |out| {
                out.write_u16(first);
                out.write_u16(last);
                out.write_u16(vector_len);
                out.write_u16(0);
                out.write_u16(1);
                out.write_u16(0);
                for &v in data {
                    out.write_f32(v);
                }
                Ok(())
            })
        })
        .unwrap();
    writer.into_bytes()
}

fn parse(bytes: &[u8]) -> Result<Animation> {
    let chunk = read_chunks(bytes).next().unwrap()?;
    Animation::read(&chunk)
}

fn time_coded_channel(out: &mut Vec<u8>, pivot: u16, codes: &[(u32, f32)]) {
    out.write_u32(codes.len() as u32);
    out.write_u16(pivot);
    out.write_u8(1);
    out.write_u8(0);
    for &(code, value) in codes {
        out.write_u32(code);
        out.write_f32(value);
    }
}

// ============================================================================
// Time-coded
// ============================================================================

#[test]
fn test_time_coded_roundtrip_is_exact() {
    let mut anim = walk();
    anim.channels[0].keyframes[1].step = true;

    let parsed = roundtrip(&anim, Compression::TimeCoded).unwrap();
    assert_eq!(parsed, anim);
    assert_eq!(parsed.encoding(), Some(Compression::TimeCoded));
}

#[test]
fn test_time_coded_midpoint() {
    let bytes = compressed_bytes(11, Flavor::TimeCoded as u16, |w| {
        w.data(ChunkKind::CompressedAnimationChannel.tag(), |out| {
            time_coded_channel(out, 0, &[(0, 0.0), (10, 1.0)]);
            Ok(())
        })
    });

    let anim = parse(&bytes).unwrap();
    assert_eq!(
        anim.sample(0, ChannelKind::X, 5.0),
        Some(ChannelValue::Scalar(0.5))
    );
    assert_eq!(
        anim.sample(0, ChannelKind::X, 0.0),
        Some(ChannelValue::Scalar(0.0))
    );
}

#[test]
fn test_time_code_step_bit() {
    let bytes = compressed_bytes(11, Flavor::TimeCoded as u16, |w| {
        w.data(ChunkKind::CompressedAnimationChannel.tag(), |out| {
            time_coded_channel(out, 0, &[(TIME_CODE_FLAG, 0.0), (10, 1.0)]);
            Ok(())
        })
    });

    let anim = parse(&bytes).unwrap();
    assert!(anim.channels[0].keyframes[0].step);
    assert_eq!(
        anim.sample(0, ChannelKind::X, 5.0),
        Some(ChannelValue::Scalar(0.0))
    );
}

#[test]
fn test_time_codes_out_of_order() {
    let bytes = compressed_bytes(11, Flavor::TimeCoded as u16, |w| {
        w.data(ChunkKind::CompressedAnimationChannel.tag(), |out| {
            time_coded_channel(out, 3, &[(5, 0.0), (5, 1.0)]);
            Ok(())
        })
    });
    assert!(matches!(
        parse(&bytes),
        Err(W3dError::CorruptAnimationChannel { pivot: 3, .. })
    ));
}

#[test]
fn test_time_code_out_of_range() {
    let bytes = compressed_bytes(11, Flavor::TimeCoded as u16, |w| {
        w.data(ChunkKind::CompressedAnimationChannel.tag(), |out| {
            time_coded_channel(out, 0, &[(0, 0.0), (11, 1.0)]);
            Ok(())
        })
    });
    assert!(matches!(
        parse(&bytes),
        Err(W3dError::CorruptAnimationChannel { .. })
    ));
}

#[test]
fn test_time_coded_vector_len_mismatch() {
    let bytes = compressed_bytes(4, Flavor::TimeCoded as u16, |w| {
        w.data(ChunkKind::CompressedAnimationChannel.tag(), |out| {
            out.write_u32(1);
            out.write_u16(0);
            out.write_u8(1); // a quaternion needs 4
            out.write_u8(ChannelKind::Quaternion.flags() as u8);
            out.write_u32(0);
            out.write_f32(1.0);
            Ok(())
        })
    });
    assert!(matches!(
        parse(&bytes),
        Err(W3dError::CorruptAnimationChannel { .. })
    ));
}

#[test]
fn test_time_coded_payload_length() {
    let bytes = compressed_bytes(4, Flavor::TimeCoded as u16, |w| {
        w.data(ChunkKind::CompressedAnimationChannel.tag(), |out| {
            time_coded_channel(out, 0, &[(0, 0.0), (1, 1.0)]);
            out.truncate(out.len() - 4);
            Ok(())
        })
    });
    assert!(matches!(
        parse(&bytes),
        Err(W3dError::CorruptAnimationChannel { .. })
    ));
}

#[test]
fn test_bit_channel_default_before_first_key() {
    let bytes = compressed_bytes(10, Flavor::TimeCoded as u16, |w| {
        w.data(ChunkKind::CompressedBitChannel.tag(), |out| {
            out.write_u32(1);
            out.write_u16(4);
            out.write_u8(0);
            out.write_u8(0); // hidden by default
            out.write_u32(3 | TIME_CODE_FLAG);
            Ok(())
        })
    });

    let anim = parse(&bytes).unwrap();
    let channel = &anim.channels[0];
    assert_eq!(channel.kind, ChannelKind::Visibility);
    assert_eq!(channel.keyframes, vec![visible(0, false), visible(3, true)]);
    assert_eq!(
        anim.sample(4, ChannelKind::Visibility, 2.0),
        Some(ChannelValue::Visible(false))
    );
}

#[test]
fn test_unknown_flavor() {
    let bytes = compressed_bytes(10, 7, |_| Ok(()));
    assert!(matches!(
        parse(&bytes),
        Err(W3dError::MalformedChunk { .. })
    ));
}

// ============================================================================
// Uncompressed
// ============================================================================

#[test]
fn test_uncompressed_roundtrip_dense() {
    let mut anim = Animation::new("IDLE", "SKL", 4, 15);
    anim.channels.push(Channel::new(
        0,
        ChannelKind::Z,
        vec![scalar(1, 0.5), scalar(2, 0.75), scalar(3, 1.0)],
    ));
    anim.channels.push(Channel::new(
        0,
        ChannelKind::Quaternion,
        (0..4).map(|f| rotation(f, f as f32 * 0.1)).collect(),
    ));
    anim.channels.push(Channel::new(
        0,
        ChannelKind::Visibility,
        vec![visible(0, true), visible(1, false), visible(2, false), visible(3, true)],
    ));
    let anim = with_encoding(anim, Compression::Uncompressed);

    let parsed = roundtrip(&anim, Compression::Uncompressed).unwrap();
    assert_eq!(parsed, anim);
    assert_eq!(parsed.encoding(), Some(Compression::Uncompressed));
}

#[test]
fn test_uncompressed_samples_sparse_keys() {
    let mut anim = Animation::new("SLIDE", "SKL", 11, 30);
    anim.channels.push(Channel::new(
        0,
        ChannelKind::X,
        vec![scalar(0, 0.0), scalar(10, 1.0)],
    ));

    let parsed = roundtrip(&anim, Compression::Uncompressed).unwrap();
    let keys = &parsed.channels[0].keyframes;
    assert_eq!(keys.len(), 11);
    assert_eq!(keys[5], scalar(5, 0.5));
}

#[test]
fn test_uncompressed_visibility_covers_clip() {
    let mut anim = Animation::new("BLINK", "SKL", 6, 30);
    anim.channels.push(Channel::new(
        3,
        ChannelKind::Visibility,
        vec![visible(2, false), visible(4, true)],
    ));

    let parsed = roundtrip(&anim, Compression::Uncompressed).unwrap();
    let values: Vec<bool> = parsed.channels[0]
        .keyframes
        .iter()
        .filter_map(|k| k.value.as_visible())
        .collect();
    assert_eq!(values, vec![false, false, false, false, true, true]);
}

#[test]
fn test_uncompressed_range_outside_header() {
    // 5 frames declared, channel claims frames 0..=5
    let bytes = uncompressed_bytes(5, 0, 5, 1, &[0.0; 6]);
    assert!(matches!(
        parse(&bytes),
        Err(W3dError::CorruptAnimationChannel { pivot: 1, .. })
    ));
}

#[test]
fn test_uncompressed_payload_length() {
    let bytes = uncompressed_bytes(5, 0, 4, 1, &[0.0; 4]);
    assert!(matches!(
        parse(&bytes),
        Err(W3dError::CorruptAnimationChannel { .. })
    ));
}

#[test]
fn test_uncompressed_vector_len_mismatch() {
    let bytes = uncompressed_bytes(2, 0, 1, 4, &[0.0; 8]);
    assert!(matches!(
        parse(&bytes),
        Err(W3dError::CorruptAnimationChannel { .. })
    ));
}

#[test]
fn test_uncompressed_frame_limit() {
    let mut anim = Animation::new("LONG", "SKL", 70_000, 30);
    anim.channels.push(Channel::new(
        0,
        ChannelKind::X,
        vec![scalar(0, 0.0), scalar(69_999, 1.0)],
    ));
    assert!(matches!(
        roundtrip(&anim, Compression::Uncompressed),
        Err(W3dError::Unencodable(_))
    ));
}

// ============================================================================
// Adaptive delta
// ============================================================================

#[test]
fn test_adaptive_delta_roundtrip_is_close() {
    let anim = walk();
    let parsed = roundtrip(&anim, Compression::AdaptiveDelta).unwrap();

    assert_eq!(parsed.channels.len(), anim.channels.len());
    assert_eq!(parsed.encoding(), Some(Compression::AdaptiveDelta));

    let x = &parsed.channels[0];
    assert_eq!(x.keyframes.len(), 20);
    for frame in 0..20 {
        let expected = anim.channels[0].sample(frame as f32).unwrap().as_scalar().unwrap();
        let actual = x.keyframes[frame].value.as_scalar().unwrap();
        assert!(
            (expected - actual).abs() < 0.2,
            "frame {}: {} vs {}",
            frame,
            expected,
            actual
        );
    }

    // Visibility stays time-coded and exact
    assert_eq!(parsed.channels[2].keyframes, anim.channels[2].keyframes);
    assert_eq!(parsed.channels[2].encoding, Compression::TimeCoded);
}

#[test]
fn test_adaptive_delta_eight_bit_decode() {
    let samples: Vec<f32> = (0..40).map(|f| (f as f32 * 0.2).sin()).collect();
    let encoded = encode_channel(&samples, 1, DeltaBits::Eight).unwrap();

    let bytes = compressed_bytes(40, Flavor::AdaptiveDelta8 as u16, |w| {
        w.data(ChunkKind::CompressedAnimationChannel.tag(), |out| {
            out.write_u32(40);
            out.write_u16(0);
            out.write_u8(1);
            out.write_u8(ChannelKind::Y.flags() as u8);
            out.write_f32(encoded.scale);
            out.extend_from_slice(&encoded.data);
            Ok(())
        })
    });

    let anim = parse(&bytes).unwrap();
    let channel = &anim.channels[0];
    assert_eq!(channel.kind, ChannelKind::Y);
    assert_eq!(channel.keyframes.len(), 40);
    for (key, &expected) in channel.keyframes.iter().zip(&samples) {
        let actual = key.value.as_scalar().unwrap();
        assert!((actual - expected).abs() < 0.05, "{} vs {}", actual, expected);
    }
}

#[test]
fn test_adaptive_delta_decode_is_deterministic() {
    let anim = walk();
    let mut writer = ChunkWriter::new();
    anim.write(&mut writer, Compression::AdaptiveDelta).unwrap();
    let bytes = writer.into_bytes();

    let first = parse(&bytes).unwrap();
    let second = parse(&bytes).unwrap();
    for (a, b) in first.channels.iter().zip(&second.channels) {
        for (ka, kb) in a.keyframes.iter().zip(&b.keyframes) {
            let (mut ca, mut cb) = (Vec::new(), Vec::new());
            ka.value.push_components(&mut ca);
            kb.value.push_components(&mut cb);
            let bits_a: Vec<u32> = ca.iter().map(|v| v.to_bits()).collect();
            let bits_b: Vec<u32> = cb.iter().map(|v| v.to_bits()).collect();
            assert_eq!(bits_a, bits_b);
        }
    }
}

#[test]
fn test_adaptive_delta_frame_count_mismatch() {
    let samples = [0.0f32; 8];
    let encoded = encode_channel(&samples, 1, DeltaBits::Four).unwrap();

    let bytes = compressed_bytes(10, Flavor::AdaptiveDelta4 as u16, |w| {
        w.data(ChunkKind::CompressedAnimationChannel.tag(), |out| {
            out.write_u32(8);
            out.write_u16(0);
            out.write_u8(1);
            out.write_u8(0);
            out.write_f32(encoded.scale);
            out.extend_from_slice(&encoded.data);
            Ok(())
        })
    });
    assert!(matches!(
        parse(&bytes),
        Err(W3dError::CorruptAnimationChannel { .. })
    ));
}

#[test]
fn test_adaptive_delta_short_payload() {
    let bytes = compressed_bytes(10, Flavor::AdaptiveDelta4 as u16, |w| {
        w.data(ChunkKind::CompressedAnimationChannel.tag(), |out| {
            out.write_u32(10);
            out.write_u16(0);
            out.write_u8(1);
            out.write_u8(0);
            out.write_f32(1.0);
            out.extend_from_slice(&[0; 6]);
            Ok(())
        })
    });
    assert!(matches!(
        parse(&bytes),
        Err(W3dError::CorruptAnimationChannel { .. })
    ));
}

// ============================================================================
// Validation on export
// ============================================================================

#[test]
fn test_key_outside_clip_rejected() {
    let mut anim = walk();
    anim.channels[0].keyframes.push(scalar(20, 0.0));
    assert!(matches!(
        roundtrip(&anim, Compression::TimeCoded),
        Err(W3dError::CorruptAnimationChannel { .. })
    ));
}

#[test]
fn test_value_kind_mismatch_rejected() {
    let mut anim = walk();
    anim.channels[1].keyframes[0] = scalar(0, 1.0);
    assert!(matches!(
        anim.validate(),
        Err(W3dError::CorruptAnimationChannel { pivot: 2, .. })
    ));
}

#[test]
fn test_frame_rate_limit_for_compressed() {
    let mut anim = walk();
    anim.frames_per_second = 70_000;
    assert!(matches!(
        roundtrip(&anim, Compression::TimeCoded),
        Err(W3dError::Unencodable(_))
    ));
}

#[test]
fn test_duration() {
    let anim = walk();
    assert!((anim.duration() - 20.0 / 30.0).abs() < 1e-6);
    assert_eq!(anim.max_pivot(), Some(2));
    assert_eq!(anim.channels_for(2).count(), 2);
}

#[test]
fn test_unknown_subchunk_kept_in_compressed_animation() {
    let bytes = compressed_bytes(10, Flavor::TimeCoded as u16, |w| {
        w.bytes(0x0000_02F0, &[0xAB, 0xCD, 0xEF])
    });
    let anim = parse(&bytes).unwrap();
    assert_eq!(
        anim.extra_chunks,
        vec![RawChunk::data(0x0000_02F0, vec![0xAB, 0xCD, 0xEF])]
    );

    let mut writer = ChunkWriter::new();
    anim.write(&mut writer, Compression::TimeCoded).unwrap();
    assert_eq!(writer.into_bytes(), bytes);
}

#[test]
fn test_unknown_subchunk_kept_in_uncompressed_animation() {
    let mut anim = walk();
    anim.extra_chunks.push(RawChunk::container(
        0x0000_02F1,
        vec![RawChunk::data(0x0000_02F2, vec![5; 8])],
    ));

    let back = roundtrip(&anim, Compression::Uncompressed).unwrap();
    assert_eq!(back.extra_chunks, anim.extra_chunks);
    assert_eq!(back.channels.len(), anim.channels.len());
}
