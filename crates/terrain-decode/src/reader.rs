//! Little-endian cursor over a byte slice.

use crate::error::{DecodeError, DecodeResult};

pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Take the next `len` bytes.
    pub(crate) fn bytes(&mut self, len: usize, what: &'static str) -> DecodeResult<&'a [u8]> {
        let available = self.remaining();
        if len > available {
            return Err(DecodeError::Truncated {
                what,
                needed: len,
                available,
            });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self, what: &'static str) -> DecodeResult<[u8; N]> {
        let mut out = [0; N];
        out.copy_from_slice(self.bytes(N, what)?);
        Ok(out)
    }

    pub(crate) fn u8(&mut self, what: &'static str) -> DecodeResult<u8> {
        Ok(self.array::<1>(what)?[0])
    }

    pub(crate) fn u32(&mut self, what: &'static str) -> DecodeResult<u32> {
        self.array(what).map(u32::from_le_bytes)
    }

    pub(crate) fn f32(&mut self, what: &'static str) -> DecodeResult<f32> {
        self.array(what).map(f32::from_le_bytes)
    }

    pub(crate) fn f64(&mut self, what: &'static str) -> DecodeResult<f64> {
        self.array(what).map(f64::from_le_bytes)
    }

    /// Skip padding so the position is a multiple of `alignment`.
    pub(crate) fn align(&mut self, alignment: usize, what: &'static str) -> DecodeResult<()> {
        let padding = self.pos.next_multiple_of(alignment) - self.pos;
        self.bytes(padding, what).map(|_| ())
    }

    /// Read `count` little-endian u16 values.
    pub(crate) fn u16_array(&mut self, count: usize, what: &'static str) -> DecodeResult<Vec<u16>> {
        let bytes = self.bytes(count * 2, what)?;
        Ok(bytes
            .chunks_exact(2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
            .collect())
    }

    /// Read `count` little-endian u32 values.
    pub(crate) fn u32_array(&mut self, count: usize, what: &'static str) -> DecodeResult<Vec<u32>> {
        let bytes = self.bytes(count * 4, what)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }
}
