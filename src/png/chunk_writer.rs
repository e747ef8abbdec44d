use alloc::vec::Vec;

use log::trace;

use super::*;
use crate::ChunkTooLarge;

/// Serializes chunks into a PNG data stream.
///
/// The PNG signature is written as soon as the writer is made, so
/// [`finish`](Self::finish) always gives back a complete stream as long as the
/// last chunk written was `IEND`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChunkWriter {
  bytes: Vec<u8>,
}
impl Default for ChunkWriter {
  #[inline]
  fn default() -> Self {
    Self::new()
  }
}
impl ChunkWriter {
  /// A new stream holding just the PNG signature.
  #[inline]
  #[must_use]
  pub fn new() -> Self {
    Self { bytes: PNG_SIGNATURE.to_vec() }
  }

  /// Writes a chunk with the given payload.
  ///
  /// ## Failure
  /// * The payload is longer than [`MAX_CHUNK_LEN`]. Nothing is written.
  #[inline]
  pub fn write_chunk(&mut self, chunk_type: ChunkType, payload: &[u8]) -> Result<&mut Self, ChunkTooLarge> {
    self.write_chunk_parts(chunk_type, &[payload])
  }

  /// Writes a chunk whose payload is the concatenation of `parts`.
  ///
  /// ## Failure
  /// * The total payload is longer than [`MAX_CHUNK_LEN`]. Nothing is written.
  pub fn write_chunk_parts(
    &mut self, chunk_type: ChunkType, parts: &[&[u8]],
  ) -> Result<&mut Self, ChunkTooLarge> {
    let len: usize = parts.iter().map(|part| part.len()).sum();
    let declared_len = match u32::try_from(len) {
      Ok(declared_len) if declared_len <= MAX_CHUNK_LEN => declared_len,
      _ => return Err(ChunkTooLarge { chunk_type, len }),
    };
    self.bytes.reserve(12 + len);
    self.bytes.extend_from_slice(&declared_len.to_be_bytes());
    self.bytes.extend_from_slice(&chunk_type.0);
    for part in parts {
      self.bytes.extend_from_slice(part);
    }
    self.bytes.extend_from_slice(&chunk_crc(chunk_type.0, parts).to_be_bytes());
    trace!("wrote {chunk_type} chunk, {len} bytes");
    Ok(self)
  }

  /// Number of bytes written so far, including the signature.
  #[inline]
  #[must_use]
  pub fn len(&self) -> usize {
    self.bytes.len()
  }

  /// If only the signature has been written.
  #[inline]
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.bytes.len() == PNG_SIGNATURE.len()
  }

  /// Gives back the bytes written.
  #[inline]
  #[must_use]
  pub fn finish(self) -> Vec<u8> {
    self.bytes
  }
}

#[test]
fn test_chunk_writer_reads_back() {
  let mut writer = ChunkWriter::new();
  writer.write_chunk(ChunkType(*b"teST"), b"hello").unwrap();
  writer.write_chunk_parts(ChunkType::fdAT, &[&7_u32.to_be_bytes(), b"abc"]).unwrap();
  writer.write_chunk(ChunkType::IEND, &[]).unwrap();
  let bytes = writer.finish();
  assert!(is_png_header_correct(&bytes));
  let chunks: Vec<RawChunk<'_>> = RawChunkIter::new(&bytes).unwrap().map(Result::unwrap).collect();
  assert_eq!(chunks.len(), 3);
  assert_eq!(chunks[0].data, b"hello");
  assert_eq!(chunks[1].chunk_type, ChunkType::fdAT);
  assert_eq!(chunks[1].data, &[0, 0, 0, 7, b'a', b'b', b'c']);
  assert_eq!(chunks[2].declared_crc, 0xAE42_6082);
}
