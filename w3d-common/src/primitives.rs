//! Little-endian primitive codec for chunk payloads
//!
//! Every numeric field in a W3D payload is little-endian. Names are
//! fixed-length, null-padded ASCII fields. Vectors are three `f32`s and
//! quaternions are four `f32`s stored x, y, z, w.
//!
//! Reading goes through [`ByteReader`], a cursor over a borrowed payload that
//! fails with [`W3dError::TruncatedInput`] instead of panicking. Writing goes
//! through [`WriteLe`], implemented for `Vec<u8>`.

use glam::{Quat, Vec3};

use crate::error::{Result, W3dError};

/// Length of pivot, mesh, hierarchy and animation name fields
pub const NAME_LEN: usize = 16;

/// Length of HLOD sub-object and box names (`CONTAINER.MESH`)
pub const LONG_NAME_LEN: usize = 32;

/// Fixed-size record stored inside a chunk payload
///
/// Mirrors the header pattern used for the chunk formats: a constant size, a
/// reader and a writer. Writers are fallible because names may not fit.
pub trait BinaryRecord: Sized {
    /// Serialized size in bytes
    const SIZE: usize;

    /// Read one record, advancing the cursor by `SIZE`
    fn read(reader: &mut ByteReader<'_>) -> Result<Self>;

    /// Append the record to `out`
    fn write(&self, out: &mut Vec<u8>) -> Result<()>;
}

/// Read-only cursor over a chunk payload
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current offset from the start of the payload
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes not yet consumed
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Take the next `len` bytes
    pub fn take(&mut self, len: usize, what: &'static str) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(W3dError::TruncatedInput {
                what,
                needed: len,
                remaining: self.remaining(),
            });
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Take everything left
    pub fn rest(&mut self) -> &'a [u8] {
        let bytes = &self.data[self.pos..];
        self.pos = self.data.len();
        bytes
    }

    fn array<const N: usize>(&mut self, what: &'static str) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, what)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>("u8")?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.array("u16")?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array("u32")?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.array("i32")?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.array("f32")?))
    }

    pub fn read_vec3(&mut self) -> Result<Vec3> {
        let bytes: [u8; 12] = self.array("vector")?;
        Ok(Vec3::new(
            f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            f32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            f32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
        ))
    }

    /// Quaternion stored x, y, z, w
    pub fn read_quat(&mut self) -> Result<Quat> {
        let bytes: [u8; 16] = self.array("quaternion")?;
        let component = |i: usize| {
            f32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]])
        };
        Ok(Quat::from_xyzw(
            component(0),
            component(4),
            component(8),
            component(12),
        ))
    }

    /// Fixed-length name field; everything from the first null is dropped
    pub fn read_name(&mut self, len: usize) -> Result<String> {
        let bytes = self.take(len, "name")?;
        Ok(decode_name(bytes))
    }

    /// Read `count` records of the same type
    pub fn read_records<T: BinaryRecord>(&mut self, count: usize) -> Result<Vec<T>> {
        // Cap the pre-allocation by what the payload can actually hold
        let mut records = Vec::with_capacity(count.min(self.remaining() / T::SIZE.max(1)));
        for _ in 0..count {
            records.push(T::read(self)?);
        }
        Ok(records)
    }
}

/// Decode a null-terminated (or null-padded) byte field
pub fn decode_name(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Little-endian writers for payload buffers
pub trait WriteLe {
    fn write_u8(&mut self, value: u8);
    fn write_u16(&mut self, value: u16);
    fn write_u32(&mut self, value: u32);
    fn write_i32(&mut self, value: i32);
    fn write_f32(&mut self, value: f32);
    fn write_vec3(&mut self, value: Vec3);
    fn write_quat(&mut self, value: Quat);

    /// Null-padded name; fails if the name plus its terminator exceeds `len`
    fn write_name(&mut self, name: &str, len: usize) -> Result<()>;
}

impl WriteLe for Vec<u8> {
    fn write_u8(&mut self, value: u8) {
        self.push(value);
    }

    fn write_u16(&mut self, value: u16) {
        self.extend_from_slice(&value.to_le_bytes());
    }

    fn write_u32(&mut self, value: u32) {
        self.extend_from_slice(&value.to_le_bytes());
    }

    fn write_i32(&mut self, value: i32) {
        self.extend_from_slice(&value.to_le_bytes());
    }

    fn write_f32(&mut self, value: f32) {
        self.extend_from_slice(&value.to_le_bytes());
    }

    fn write_vec3(&mut self, value: Vec3) {
        self.write_f32(value.x);
        self.write_f32(value.y);
        self.write_f32(value.z);
    }

    fn write_quat(&mut self, value: Quat) {
        self.write_f32(value.x);
        self.write_f32(value.y);
        self.write_f32(value.z);
        self.write_f32(value.w);
    }

    fn write_name(&mut self, name: &str, len: usize) -> Result<()> {
        let bytes = name.as_bytes();
        if bytes.len() >= len {
            return Err(W3dError::Unencodable(format!(
                "name '{}' is {} bytes, field holds {} plus terminator",
                name,
                bytes.len(),
                len - 1
            )));
        }
        if bytes.contains(&0) {
            return Err(W3dError::Unencodable(format!(
                "name '{}' contains a null byte",
                name.escape_debug()
            )));
        }
        self.extend_from_slice(bytes);
        self.resize(self.len() + (len - bytes.len()), 0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars_little_endian() {
        let mut out = Vec::new();
        out.write_u8(0xAB);
        out.write_u16(0x1234);
        out.write_u32(0xDEAD_BEEF);
        out.write_i32(-2);
        out.write_f32(1.5);

        assert_eq!(&out[..3], &[0xAB, 0x34, 0x12]);
        assert_eq!(&out[3..7], &[0xEF, 0xBE, 0xAD, 0xDE]);

        let mut reader = ByteReader::new(&out);
        assert_eq!(reader.read_u8().unwrap(), 0xAB);
        assert_eq!(reader.read_u16().unwrap(), 0x1234);
        assert_eq!(reader.read_u32().unwrap(), 0xDEAD_BEEF);
        assert_eq!(reader.read_i32().unwrap(), -2);
        assert_eq!(reader.read_f32().unwrap(), 1.5);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_quaternion_is_w_last() {
        let mut out = Vec::new();
        out.write_quat(Quat::from_xyzw(0.0, 0.0, 0.0, 1.0));
        assert_eq!(&out[12..16], &1.0f32.to_le_bytes());

        let q = ByteReader::new(&out).read_quat().unwrap();
        assert_eq!(q, Quat::IDENTITY);
    }

    #[test]
    fn test_name_padding() {
        let mut out = Vec::new();
        out.write_name("BONE01", NAME_LEN).unwrap();
        assert_eq!(out.len(), NAME_LEN);
        assert_eq!(&out[..6], b"BONE01");
        assert!(out[6..].iter().all(|&b| b == 0));

        assert_eq!(ByteReader::new(&out).read_name(NAME_LEN).unwrap(), "BONE01");
    }

    #[test]
    fn test_name_ignores_garbage_after_terminator() {
        let mut field = [0u8; NAME_LEN];
        field[..3].copy_from_slice(b"ABC");
        field[4..8].copy_from_slice(b"JUNK");
        assert_eq!(decode_name(&field), "ABC");
    }

    #[test]
    fn test_name_too_long() {
        let mut out = Vec::new();
        // 16 characters leave no room for the terminator
        let err = out.write_name("ABCDEFGHIJKLMNOP", NAME_LEN).unwrap_err();
        assert!(matches!(err, W3dError::Unencodable(_)));
        assert!(out.is_empty());

        out.write_name("ABCDEFGHIJKLMNO", NAME_LEN).unwrap();
        assert_eq!(out.len(), NAME_LEN);
    }

    #[test]
    fn test_short_read_is_truncated_input() {
        let mut reader = ByteReader::new(&[1, 2, 3]);
        let err = reader.read_u32().unwrap_err();
        assert!(matches!(
            err,
            W3dError::TruncatedInput {
                needed: 4,
                remaining: 3,
                ..
            }
        ));
        // A failed read does not advance the cursor
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.read_u16().unwrap(), 0x0201);
    }
}
