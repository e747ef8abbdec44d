use core::fmt::{Debug, Display, Write};

use log::trace;

use super::*;
use crate::{try_split_off_byte_array, try_split_off_u32_be, FormatError};

#[cfg(test)]
use alloc::{vec, vec::Vec};

/// The largest payload length a chunk may declare.
pub const MAX_CHUNK_LEN: u32 = (1 << 31) - 1;

/// The 4-byte tag of a chunk.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ChunkType(pub [u8; 4]);
#[allow(nonstandard_style)]
#[allow(missing_docs)]
impl ChunkType {
  pub const IHDR: Self = Self(*b"IHDR");
  pub const PLTE: Self = Self(*b"PLTE");
  pub const IDAT: Self = Self(*b"IDAT");
  pub const IEND: Self = Self(*b"IEND");
  pub const tRNS: Self = Self(*b"tRNS");
  pub const acTL: Self = Self(*b"acTL");
  pub const fcTL: Self = Self(*b"fcTL");
  pub const fdAT: Self = Self(*b"fdAT");
}
impl ChunkType {
  /// Critical chunks have an uppercase first letter (bit 5 clear).
  ///
  /// A decoder that doesn't understand a critical chunk can't safely show the
  /// image.
  #[inline]
  #[must_use]
  pub const fn is_critical(self) -> bool {
    (self.0[0] & 32) == 0
  }
}
impl Debug for ChunkType {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    for byte in self.0 {
      if byte.is_ascii_graphic() {
        f.write_char(byte as char)?;
      } else {
        write!(f, "\\x{byte:02X}")?;
      }
    }
    Ok(())
  }
}
impl Display for ChunkType {
  #[inline]
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    Debug::fmt(self, f)
  }
}

/// An unparsed chunk from a PNG.
///
/// The iterator only hands these out after the CRC has been checked, so
/// `declared_crc` is always the correct CRC.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawChunk<'b> {
  /// The chunk's tag.
  pub chunk_type: ChunkType,
  /// The chunk's payload.
  pub data: &'b [u8],
  /// The CRC that was stored in the stream.
  pub declared_crc: u32,
}
impl RawChunk<'_> {
  /// The payload length, as it was declared in the stream.
  #[inline]
  #[must_use]
  pub const fn declared_length(&self) -> u32 {
    self.data.len() as u32
  }

  /// Computes the CRC of the chunk's tag and payload.
  #[inline]
  #[must_use]
  pub fn compute_actual_crc(&self) -> u32 {
    chunk_crc(self.chunk_type.0, &[self.data])
  }
}
impl Debug for RawChunk<'_> {
  #[inline]
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("RawChunk")
      .field("chunk_type", &self.chunk_type)
      .field("data", &(&self.data[..self.data.len().min(12)], self.data.len()))
      .field("declared_crc", &self.declared_crc)
      .finish()
  }
}

/// An iterator that produces successive raw chunks from PNG bytes.
///
/// * The first error ends the iteration (the error is the last item).
/// * Iteration also ends right after the `IEND` chunk, so any trailing bytes
///   are never looked at.
/// * If the bytes run out without an `IEND` chunk the last item is
///   [`FormatError::Truncated`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawChunkIter<'b> {
  rest: &'b [u8],
  finished: bool,
}
impl<'b> RawChunkIter<'b> {
  /// Pass the full PNG bytes, the PNG signature is checked and removed.
  ///
  /// ## Failure
  /// * [`FormatError::BadSignature`] if the bytes don't start with the PNG
  ///   signature.
  #[inline]
  pub fn new(bytes: &'b [u8]) -> Result<Self, FormatError> {
    match bytes.strip_prefix(&PNG_SIGNATURE) {
      Some(rest) => Ok(Self { rest, finished: false }),
      None => Err(FormatError::BadSignature),
    }
  }

  fn read_chunk(&mut self) -> Result<RawChunk<'b>, FormatError> {
    let (chunk_len, rest) = try_split_off_u32_be(self.rest).ok_or(FormatError::Truncated)?;
    let (type_bytes, rest) = try_split_off_byte_array::<4>(rest).ok_or(FormatError::Truncated)?;
    let chunk_type = ChunkType(type_bytes);
    if chunk_len > MAX_CHUNK_LEN {
      return Err(FormatError::MalformedChunk { chunk: chunk_type });
    }
    if rest.len() < chunk_len as usize {
      return Err(FormatError::Truncated);
    }
    let (data, rest) = rest.split_at(chunk_len as usize);
    let (declared_crc, rest) = try_split_off_u32_be(rest).ok_or(FormatError::Truncated)?;
    let chunk = RawChunk { chunk_type, data, declared_crc };
    let actual = chunk.compute_actual_crc();
    if actual != declared_crc {
      return Err(FormatError::ChecksumMismatch { chunk: chunk_type, declared: declared_crc, actual });
    }
    self.rest = rest;
    trace!("read {chunk_type} chunk, {chunk_len} bytes");
    Ok(chunk)
  }
}
impl<'b> Iterator for RawChunkIter<'b> {
  type Item = Result<RawChunk<'b>, FormatError>;
  #[inline]
  fn next(&mut self) -> Option<Self::Item> {
    if self.finished {
      return None;
    }
    let out = self.read_chunk();
    self.finished = match &out {
      Ok(chunk) => chunk.chunk_type == ChunkType::IEND,
      Err(_) => true,
    };
    Some(out)
  }
}
impl core::iter::FusedIterator for RawChunkIter<'_> {}

#[test]
fn test_chunk_type_is_critical() {
  assert!(ChunkType::IHDR.is_critical());
  assert!(ChunkType::IDAT.is_critical());
  assert!(!ChunkType::tRNS.is_critical());
  assert!(!ChunkType::acTL.is_critical());
  assert!(!ChunkType::fdAT.is_critical());
}

#[test]
fn test_raw_chunk_iter_stops_after_iend() {
  let mut bytes = PNG_SIGNATURE.to_vec();
  for chunk_type in [*b"teST", *b"IEND", *b"teST"] {
    bytes.extend_from_slice(&0_u32.to_be_bytes());
    bytes.extend_from_slice(&chunk_type);
    bytes.extend_from_slice(&chunk_crc(chunk_type, &[]).to_be_bytes());
  }
  let types: Vec<ChunkType> = RawChunkIter::new(&bytes).unwrap().map(|c| c.unwrap().chunk_type).collect();
  assert_eq!(types, vec![ChunkType(*b"teST"), ChunkType::IEND]);
}

#[test]
fn test_raw_chunk_iter_errors() {
  assert_eq!(RawChunkIter::new(b"GIF89a").unwrap_err(), FormatError::BadSignature);

  let mut it = RawChunkIter::new(&PNG_SIGNATURE).unwrap();
  assert_eq!(it.next(), Some(Err(FormatError::Truncated)));
  assert_eq!(it.next(), None);

  let mut bytes = PNG_SIGNATURE.to_vec();
  bytes.extend_from_slice(&4_u32.to_be_bytes());
  bytes.extend_from_slice(b"teST");
  bytes.extend_from_slice(&[1, 2, 3, 4]);
  bytes.extend_from_slice(&0_u32.to_be_bytes());
  let actual = chunk_crc(*b"teST", &[&[1, 2, 3, 4]]);
  assert_eq!(
    RawChunkIter::new(&bytes).unwrap().next(),
    Some(Err(FormatError::ChecksumMismatch { chunk: ChunkType(*b"teST"), declared: 0, actual }))
  );
  bytes.truncate(bytes.len() - 6);
  assert_eq!(RawChunkIter::new(&bytes).unwrap().next(), Some(Err(FormatError::Truncated)));
}
