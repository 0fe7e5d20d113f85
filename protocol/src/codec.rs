//! Canonical little-endian encoding shared by the store and the id hashes.
//!
//! The encoding is deterministic: integers are little-endian, sequences and
//! byte strings carry a u32 length prefix, optional fields a one-byte
//! presence marker. Decoding rejects truncated input and trailing bytes.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("unexpected end of input at byte {0}")]
    UnexpectedEof(usize),
    #[error("{0} trailing bytes after decoded value")]
    TrailingBytes(usize),
    #[error("invalid presence marker {0:#04x}")]
    BadMarker(u8),
    #[error("declared length {0} exceeds remaining input")]
    BadLength(u32),
    #[error("string field is not valid utf-8")]
    InvalidUtf8,
    #[error("value is {got} bytes, record takes {want}")]
    WrongSize { want: usize, got: usize },
}

/// Cursor over canonical input.
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < n {
            return Err(CodecError::UnexpectedEof(self.pos));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let bytes = self.take(N)?;
        bytes
            .try_into()
            .map_err(|_| CodecError::UnexpectedEof(self.pos))
    }

    pub fn u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    pub fn u32(&mut self) -> Result<u32, CodecError> {
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    pub fn u64(&mut self) -> Result<u64, CodecError> {
        Ok(u64::from_le_bytes(self.take_array()?))
    }

    pub fn array32(&mut self) -> Result<[u8; 32], CodecError> {
        self.take_array()
    }

    pub fn bytes(&mut self) -> Result<Vec<u8>, CodecError> {
        let len = self.u32()?;
        if self.remaining() < len as usize {
            return Err(CodecError::BadLength(len));
        }
        Ok(self.take(len as usize)?.to_vec())
    }

    pub fn string(&mut self) -> Result<String, CodecError> {
        String::from_utf8(self.bytes()?).map_err(|_| CodecError::InvalidUtf8)
    }
}

pub fn put_u8(out: &mut Vec<u8>, v: u8) {
    out.push(v);
}

pub fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

pub fn put_u64(out: &mut Vec<u8>, v: u64) {
    out.extend_from_slice(&v.to_le_bytes());
}

pub fn put_array32(out: &mut Vec<u8>, v: &[u8; 32]) {
    out.extend_from_slice(v);
}

pub fn put_bytes(out: &mut Vec<u8>, v: &[u8]) {
    put_u32(out, v.len() as u32);
    out.extend_from_slice(v);
}

pub fn put_str(out: &mut Vec<u8>, v: &str) {
    put_bytes(out, v.as_bytes());
}

/// A value with a canonical byte form.
pub trait Codec: Sized {
    fn encode_into(&self, out: &mut Vec<u8>);
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, CodecError>;
}

pub fn encode<T: Codec>(value: &T) -> Vec<u8> {
    let mut out = Vec::new();
    value.encode_into(&mut out);
    out
}

pub fn decode<T: Codec>(bytes: &[u8]) -> Result<T, CodecError> {
    let mut reader = Reader::new(bytes);
    let value = T::decode_from(&mut reader)?;
    if reader.remaining() != 0 {
        return Err(CodecError::TrailingBytes(reader.remaining()));
    }
    Ok(value)
}
