//! Fixed-width integer encoding for hashed payloads
//!
//! Timestamp, difficulty and nonce are serialized as 8-byte big-endian
//! two's-complement values. The layout is part of the hashed payload, so any
//! validator must reproduce it bit for bit.

use crate::{Error, Result};
use byteorder::{BigEndian, ByteOrder};

/// Width of an encoded integer in bytes
pub const INT_SIZE: usize = 8;

/// Encode a signed 64-bit integer as 8 big-endian bytes
pub fn encode_i64(value: i64) -> [u8; INT_SIZE] {
    let mut buf = [0u8; INT_SIZE];
    BigEndian::write_i64(&mut buf, value);
    buf
}

/// Encode `value` into the first 8 bytes of `buf` without allocating
///
/// Panics if `buf` is shorter than 8 bytes; callers always pass the nonce tail
/// of a payload.
pub fn encode_i64_into(buf: &mut [u8], value: i64) {
    BigEndian::write_i64(&mut buf[..INT_SIZE], value);
}

/// Decode 8 big-endian bytes back into a signed 64-bit integer
pub fn decode_i64(bytes: &[u8]) -> Result<i64> {
    if bytes.len() != INT_SIZE {
        return Err(Error::invalid_length(INT_SIZE, bytes.len()));
    }
    Ok(BigEndian::read_i64(bytes))
}

/// Reverse a byte slice in place
pub fn reverse_bytes(data: &mut [u8]) {
    data.reverse();
}
