//! Little-endian primitives of the container format.
//!
//! Strings and byte blobs are prefixed with their length as a `u32`. Every
//! read is bounds-checked and reports the offset it failed at.

use crate::error::StorageError;

/// Append-only encoder.
#[derive(Debug, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Length-prefixed blob.
    pub fn bytes(&mut self, bytes: &[u8]) -> Result<(), StorageError> {
        self.count(bytes.len())?;
        self.raw(bytes);
        Ok(())
    }

    pub fn str(&mut self, s: &str) -> Result<(), StorageError> {
        self.bytes(s.as_bytes())
    }

    /// A count or length. Fails if it does not fit the format's `u32` fields.
    pub fn count(&mut self, n: usize) -> Result<(), StorageError> {
        let n = u32::try_from(n)
            .map_err(|_| StorageError::unsavable(format!("length {n} does not fit a 32-bit field")))?;
        self.u32(n);
        Ok(())
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// Bounds-checked decoder over a borrowed buffer.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        ByteReader { buf, pos: 0 }
    }

    /// Current position from the start of the buffer.
    pub fn offset(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8], StorageError> {
        if n > self.remaining() {
            return Err(StorageError::corrupt_at(
                self.pos,
                format!(
                    "unexpected end of data, needed {n} bytes but only {} remain",
                    self.remaining()
                ),
            ));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], StorageError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8, StorageError> {
        Ok(self.array::<1>()?[0])
    }

    pub fn u32(&mut self) -> Result<u32, StorageError> {
        self.array().map(u32::from_le_bytes)
    }

    pub fn i32(&mut self) -> Result<i32, StorageError> {
        self.array().map(i32::from_le_bytes)
    }

    pub fn i64(&mut self) -> Result<i64, StorageError> {
        self.array().map(i64::from_le_bytes)
    }

    pub fn f32(&mut self) -> Result<f32, StorageError> {
        self.array().map(f32::from_le_bytes)
    }

    pub fn bytes(&mut self) -> Result<&'a [u8], StorageError> {
        let len = self.u32()? as usize;
        self.take(len)
    }

    pub fn str(&mut self) -> Result<&'a str, StorageError> {
        let start = self.pos;
        let bytes = self.bytes()?;
        std::str::from_utf8(bytes).map_err(|e| StorageError::corrupt_at(start, format!("invalid UTF-8 text: {e}")))
    }

    /// Fails unless the whole buffer was consumed.
    pub fn finish(&self) -> Result<(), StorageError> {
        if self.remaining() > 0 {
            return Err(StorageError::corrupt_at(
                self.pos,
                format!("{} trailing bytes after the link table", self.remaining()),
            ));
        }
        Ok(())
    }
}
