//! Assembles still images into an APNG data stream.

use alloc::vec::Vec;

use log::debug;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use super::config::{is_valid_duration, EncodeConfig};
use crate::png::*;
use crate::{Bitmap, CodecError, EncodeError};

/// Hands out the `fcTL`/`fdAT` sequence numbers.
struct SequenceCounter(u32);
impl SequenceCounter {
  fn next(&mut self) -> Result<u32, EncodeError> {
    let out = self.0;
    self.0 = self.0.checked_add(1).ok_or(EncodeError::TooManyFrames)?;
    Ok(out)
  }
}

/// Splits image data into chunk sized pieces.
///
/// `overhead` is the bytes of the chunk payload that come before the data.
fn fragments(data: &[u8], max_fragment_len: Option<usize>, overhead: usize) -> core::slice::Chunks<'_, u8> {
  let chunk_limit = MAX_CHUNK_LEN as usize - overhead;
  let len = max_fragment_len.map_or(chunk_limit, |max| max.clamp(1, chunk_limit));
  data.chunks(len)
}

/// Encodes each bitmap with the still codec and pulls the parts back out.
fn encode_stills(
  codec: &dyn StillImageCodec, bitmaps: &[&Bitmap], quality: f32,
) -> Result<Vec<Vec<u8>>, CodecError> {
  #[cfg(feature = "rayon")]
  let stills = bitmaps.par_iter().map(|bitmap| codec.encode(bitmap, quality)).collect();
  #[cfg(not(feature = "rayon"))]
  let stills = bitmaps.iter().map(|bitmap| codec.encode(bitmap, quality)).collect();
  stills
}

/// Checks that an encoded frame is usable, and pulls its parts out.
///
/// Every frame has to come back with the canvas size and the same pixel format
/// (and palette) as the first frame, since they all share one `IHDR`.
fn still_parts<'b>(
  png: &'b [u8], bitmap: &Bitmap, first: Option<&StillImageParts<'_>>,
) -> Result<StillImageParts<'b>, CodecError> {
  let parts = StillImageParts::parse(png)?;
  let header = parts.header;
  if (header.width, header.height) != bitmap.dimensions() {
    return Err(CodecError::InconsistentOutput);
  }
  if let Some(first) = first {
    let same_format = (header.bit_depth, header.color_type, header.is_interlaced)
      == (first.header.bit_depth, first.header.color_type, first.header.is_interlaced);
    if !same_format || parts.palette_chunks != first.palette_chunks {
      return Err(CodecError::InconsistentOutput);
    }
  }
  Ok(parts)
}

/// Builds a PNG data stream out of `(bitmap, seconds)` frames.
///
/// * One frame gives a plain PNG, with no animation chunks at all.
/// * Two or more frames give an APNG. The first frame is also the default
///   image, so programs without APNG support show it.
///
/// Every frame covers the full canvas, with `None` disposal and `Source`
/// blending. Durations are stored as the closest delay fraction (see
/// [`delay_from_seconds`]).
///
/// ## Failure
/// * [`EncodeError::EmptyInput`] if there are no frames.
/// * [`EncodeError::InconsistentDimensions`] if the bitmaps aren't all the
///   same size as the first.
/// * [`EncodeError::InvalidDuration`] for a negative or non-finite duration.
/// * [`EncodeError::UnderlyingCodecFailure`] if the codec fails or gives back
///   something other than a PNG in one shared format.
///
/// Nothing is returned unless the whole stream was built.
pub fn build(
  codec: &dyn StillImageCodec, frames: &[(&Bitmap, f64)], config: &EncodeConfig,
) -> Result<Vec<u8>, EncodeError> {
  let (first_bitmap, _) = frames.first().ok_or(EncodeError::EmptyInput)?;
  let canvas = first_bitmap.dimensions();
  for (frame, (bitmap, duration)) in frames.iter().enumerate() {
    if bitmap.dimensions() != canvas {
      return Err(EncodeError::InconsistentDimensions { frame, expected: canvas, found: bitmap.dimensions() });
    }
    if !is_valid_duration(*duration) {
      return Err(EncodeError::InvalidDuration { frame });
    }
  }
  let frame_count = u32::try_from(frames.len()).map_err(|_| EncodeError::TooManyFrames)?;

  let bitmaps: Vec<&Bitmap> = frames.iter().map(|(bitmap, _)| *bitmap).collect();
  let stills = encode_stills(codec, &bitmaps, config.quality)?;
  let mut all_parts: Vec<StillImageParts<'_>> = Vec::with_capacity(stills.len());
  for (png, bitmap) in stills.iter().zip(&bitmaps) {
    let parts = still_parts(png, bitmap, all_parts.first())?;
    all_parts.push(parts);
  }
  let Some((base, rest)) = all_parts.split_first() else {
    return Err(EncodeError::EmptyInput);
  };

  let mut writer = ChunkWriter::new();
  writer.write_chunk(ChunkType::IHDR, &base.header.to_bytes())?;
  if frame_count > 1 {
    let actl = AnimationHeader { frame_count, loop_count: config.loop_count };
    writer.write_chunk(ChunkType::acTL, &actl.to_bytes())?;
  }
  for chunk in &base.palette_chunks {
    writer.write_chunk(chunk.chunk_type, chunk.data)?;
  }

  if frame_count == 1 {
    debug!("encoding a single frame as a still image");
    for data in &base.image_data {
      for fragment in fragments(data, config.max_fragment_len, 0) {
        writer.write_chunk(ChunkType::IDAT, fragment)?;
      }
    }
    writer.write_chunk(ChunkType::IEND, &[])?;
    return Ok(writer.finish());
  }

  let (width, height) = canvas;
  let mut sequence = SequenceCounter(0);

  let control = FrameControl::full_canvas(sequence.next()?, width, height).with_duration(frames[0].1);
  writer.write_chunk(ChunkType::fcTL, &control.to_bytes())?;
  for data in &base.image_data {
    for fragment in fragments(data, config.max_fragment_len, 0) {
      writer.write_chunk(ChunkType::IDAT, fragment)?;
    }
  }
  debug!("frame 0 (default image): delay {}/{}", control.delay_num, control.delay_den);

  for (index, (parts, (_, duration))) in rest.iter().zip(&frames[1..]).enumerate() {
    let control = FrameControl::full_canvas(sequence.next()?, width, height).with_duration(*duration);
    writer.write_chunk(ChunkType::fcTL, &control.to_bytes())?;
    for data in &parts.image_data {
      for fragment in fragments(data, config.max_fragment_len, 4) {
        let sequence_number = sequence.next()?;
        writer.write_chunk_parts(ChunkType::fdAT, &[&sequence_number.to_be_bytes(), fragment])?;
      }
    }
    debug!("frame {}: delay {}/{}", index + 1, control.delay_num, control.delay_den);
  }
  writer.write_chunk(ChunkType::IEND, &[])?;
  Ok(writer.finish())
}
