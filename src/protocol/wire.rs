//! Big-endian fixed-width field reads

use thiserror::Error;

/// Why a single frame could not be decoded.
///
/// Never leaves the protocol layer; the decoder drops the frame instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("frame truncated: need {needed} bytes at offset {offset}, have {len}")]
    Truncated { offset: usize, needed: usize, len: usize },

    #[error("unexpected selector {found:02x?}")]
    Selector { found: [u8; 2] },

    #[error("unsupported sensor sub-type {0}")]
    SubType(u8),
}

/// Trait for types that can be read from a frame at a byte offset.
pub trait WireField: Sized {
    /// Read this type big-endian from `data` starting at `offset`.
    fn read_be(data: &[u8], offset: usize) -> Result<Self, DecodeError>;
}

fn take<const N: usize>(data: &[u8], offset: usize) -> Result<[u8; N], DecodeError> {
    offset
        .checked_add(N)
        .and_then(|end| data.get(offset..end))
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(DecodeError::Truncated { offset, needed: N, len: data.len() })
}

impl WireField for u8 {
    fn read_be(data: &[u8], offset: usize) -> Result<Self, DecodeError> {
        Ok(take::<1>(data, offset)?[0])
    }
}

impl WireField for i8 {
    fn read_be(data: &[u8], offset: usize) -> Result<Self, DecodeError> {
        Ok(take::<1>(data, offset)?[0] as i8)
    }
}

impl WireField for u16 {
    fn read_be(data: &[u8], offset: usize) -> Result<Self, DecodeError> {
        take(data, offset).map(u16::from_be_bytes)
    }
}

impl WireField for i16 {
    fn read_be(data: &[u8], offset: usize) -> Result<Self, DecodeError> {
        take(data, offset).map(i16::from_be_bytes)
    }
}

impl WireField for u32 {
    fn read_be(data: &[u8], offset: usize) -> Result<Self, DecodeError> {
        take(data, offset).map(u32::from_be_bytes)
    }
}

/// Sequential reader over a fixed-layout record.
///
/// Offsets are relative to the slice handed in; `skip` advances over
/// reserved bytes without reading them.
pub struct Cursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Fail unless `len` bytes remain from the current position.
    pub fn require(&self, len: usize) -> Result<(), DecodeError> {
        if self.offset.checked_add(len).is_some_and(|end| end <= self.data.len()) {
            Ok(())
        } else {
            Err(DecodeError::Truncated { offset: self.offset, needed: len, len: self.data.len() })
        }
    }

    pub fn skip(&mut self, count: usize) -> &mut Self {
        self.offset += count;
        self
    }

    pub fn read<T: WireField>(&mut self) -> Result<T, DecodeError> {
        let value = T::read_be(self.data, self.offset)?;
        self.offset += std::mem::size_of::<T>();
        Ok(value)
    }
}
