//! Big-endian wire format utilities for dbsz encoding/decoding.

/// Read a 16-bit unsigned integer from a big-endian byte slice.
#[inline]
pub fn read_u16_be(buf: &[u8]) -> u16 {
    u16::from_be_bytes([buf[0], buf[1]])
}

/// Write a 16-bit unsigned integer in big-endian.
#[inline]
pub fn write_u16_be(buf: &mut [u8], val: u16) {
    buf[..2].copy_from_slice(&val.to_be_bytes());
}

/// Append a 16-bit unsigned integer in big-endian.
#[inline]
pub fn put_u16_be(buf: &mut Vec<u8>, val: u16) {
    buf.extend_from_slice(&val.to_be_bytes());
}

/// Append the low `width` bytes of `val` in big-endian.
///
/// Signed values are passed as their two's complement bit pattern, so the
/// truncation keeps the sign for any value that fits in `width` bytes.
#[inline]
pub fn put_uint_be(buf: &mut Vec<u8>, val: u64, width: usize) {
    buf.extend_from_slice(&val.to_be_bytes()[8 - width..]);
}

/// Read `buf.len()` (at most 8) big-endian bytes as an unsigned integer.
#[inline]
pub fn read_uint_be(buf: &[u8]) -> u64 {
    buf.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

/// Sign-extend the low `width` bytes of `v` to 64 bits.
#[inline]
pub fn sign_extend(v: u64, width: usize) -> i64 {
    let shift = 64 - width * 8;
    ((v << shift) as i64) >> shift
}

/// Schema fingerprint header on top-level buffers.
pub const SIZEOF_FINGERPRINT: usize = 4;
/// Length prefix of nested blocks and dynamic strings.
pub const SIZEOF_LENGTH: usize = 2;
/// Element count prefix of schema arrays.
pub const SIZEOF_COUNT: usize = 2;
