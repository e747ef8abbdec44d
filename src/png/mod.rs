//! Holds the chunk level tools for PNG data.
//!
//! The general format of a PNG is that the information is stored in "chunks".
//! Each chunk is a big-endian `u32` length, a 4-byte tag, the payload, and a
//! CRC-32 of the tag and payload. There's four "critical" chunk types that a
//! still image needs:
//! * **Header** (`IHDR`) - The image's dimensions, pixel format, and if the
//!   image is interlaced or not. This is always the first chunk.
//! * **Palette** (`PLTE`) - If an image uses indexed color it will have a
//!   palette of what index values map to what `RGB8` values.
//! * **Image Data** (`IDAT`) - One or more chunks of compressed data. All of
//!   the compressed data forms a single zlib data stream.
//! * **End** (`IEND`) - The last chunk, lets you know you had the full PNG and
//!   your data wasn't truncated accidentally.
//!
//! An APNG adds three more, which are all "ancillary" so that an older decoder
//! skips them and just shows the still image:
//! * **Animation Control** (`acTL`) - The frame count and loop count.
//! * **Frame Control** (`fcTL`) - One per frame: the frame's region, delay,
//!   and how it's disposed of and blended.
//! * **Frame Data** (`fdAT`) - Like `IDAT`, but for frames other than the
//!   default image, and with a sequence number in front.
//!
//! [`RawChunkIter`] reads chunks, [`ChunkWriter`] writes them, and
//! [`PngStillCodec`] turns a single image stream into pixels and back.

mod crc32;
pub use crc32::*;

mod raw_chunk;
pub use raw_chunk::*;

mod chunk_writer;
pub use chunk_writer::*;

mod ihdr;
pub use ihdr::*;

mod actl;
pub use actl::*;

mod fctl;
pub use fctl::*;

mod fdat;
pub use fdat::*;

mod unfilter;
pub use unfilter::*;

mod filter;
pub use filter::*;

mod still;
pub use still::*;

use alloc::vec::Vec;

use crate::FormatError;

/// The 8 bytes that every PNG data stream starts with.
pub const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Checks if the PNG's initial 8 bytes are correct.
///
/// * If this is the case, the rest of the bytes are very likely PNG data.
/// * If this is *not* the case, the rest of the bytes are very likely *not* PNG
///   data.
#[inline]
#[must_use]
pub const fn is_png_header_correct(bytes: &[u8]) -> bool {
  matches!(bytes, [137, 80, 78, 71, 13, 10, 26, 10, ..])
}

/// Lists the tag of every chunk in the stream, in order.
///
/// This reads (and CRC checks) the whole stream, so it also works as a quick
/// validity check.
pub fn chunk_types(bytes: &[u8]) -> Result<Vec<ChunkType>, FormatError> {
  RawChunkIter::new(bytes)?.map(|chunk| chunk.map(|chunk| chunk.chunk_type)).collect()
}
