//! The single image PNG codec that frames are handed to.

use alloc::{format, vec::Vec};

use bitfrob::u8_replicate_bits;
use log::trace;

use super::*;
use crate::{Bitmap, CodecError, FormatError, RGB888, RGBA8888};

/// Decodes and encodes single PNG images.
///
/// The animation code never looks inside a frame's pixel data itself, it only
/// moves chunks around and hands complete PNG streams to one of these. Frames
/// are handed over as a standalone PNG with a frame-sized `IHDR`, and encoded
/// frames must come back as a complete PNG stream.
///
/// The trait is `Send + Sync` so that frames can be processed in parallel.
pub trait StillImageCodec: Send + Sync {
  /// Decodes a complete PNG stream into RGBA pixels.
  fn decode(&self, png: &[u8]) -> Result<Bitmap, CodecError>;

  /// Encodes a bitmap as a complete PNG stream.
  ///
  /// `quality` goes from 0.0 (work hard for small output) to 1.0 (go fast).
  fn encode(&self, bitmap: &Bitmap, quality: f32) -> Result<Vec<u8>, CodecError>;
}

/// The built in [`StillImageCodec`], using `miniz_oxide` for zlib.
///
/// * Decoding supports every PNG color type and bit depth, `tRNS`
///   transparency, and interlacing. 16-bit channels are cut down to 8-bit.
/// * Encoding always writes 8-bit RGBA without interlacing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PngStillCodec;

/// The chunks of a still PNG that matter for moving its image around.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StillImageParts<'b> {
  /// The image header.
  pub header: IHDR,
  /// `PLTE` and `tRNS` chunks, in stream order.
  pub palette_chunks: Vec<RawChunk<'b>>,
  /// The payload of each `IDAT` chunk, in stream order.
  pub image_data: Vec<&'b [u8]>,
}
impl<'b> StillImageParts<'b> {
  /// Pulls the parts out of a PNG stream.
  ///
  /// Any other chunks (including animation chunks) are skipped.
  ///
  /// ## Failure
  /// * Any error from the chunk reader.
  /// * [`FormatError::MissingHeader`] if the first chunk isn't `IHDR`.
  /// * [`FormatError::MissingImageData`] if there's no `IDAT` chunk.
  pub fn parse(png: &'b [u8]) -> Result<Self, FormatError> {
    let mut it = RawChunkIter::new(png)?;
    let header = match it.next() {
      Some(Ok(chunk)) if chunk.chunk_type == ChunkType::IHDR => IHDR::parse(chunk.data)?,
      Some(Err(e)) => return Err(e),
      _ => return Err(FormatError::MissingHeader),
    };
    let mut palette_chunks = Vec::new();
    let mut image_data = Vec::new();
    for chunk in it {
      let chunk = chunk?;
      match chunk.chunk_type {
        ChunkType::PLTE | ChunkType::tRNS => palette_chunks.push(chunk),
        ChunkType::IDAT => image_data.push(chunk.data),
        _ => (),
      }
    }
    if image_data.is_empty() {
      return Err(FormatError::MissingImageData);
    }
    Ok(Self { header, palette_chunks, image_data })
  }

  /// Writes the parts back out as a standalone PNG stream.
  pub fn to_png(&self) -> Result<Vec<u8>, crate::ChunkTooLarge> {
    let mut writer = ChunkWriter::new();
    writer.write_chunk(ChunkType::IHDR, &self.header.to_bytes())?;
    for chunk in &self.palette_chunks {
      writer.write_chunk(chunk.chunk_type, chunk.data)?;
    }
    for data in &self.image_data {
      writer.write_chunk(ChunkType::IDAT, data)?;
    }
    writer.write_chunk(ChunkType::IEND, &[])?;
    Ok(writer.finish())
  }
}

/// Maps `quality` to a `miniz_oxide` compression level, 1 (fast) to 10
/// (slowest).
#[inline]
#[must_use]
pub fn compression_level(quality: f32) -> u8 {
  let quality = if quality.is_nan() { 1.0 } else { quality.clamp(0.0, 1.0) };
  // `as` truncates, the extra 0.5 makes it round
  (1.5 + (1.0 - quality) * 9.0) as u8
}

/// The transparency info of a `tRNS` chunk, depending on the color type.
enum Transparency<'b> {
  None,
  Gray(u16),
  Rgb([u16; 3]),
  Alphas(&'b [u8]),
}
impl<'b> Transparency<'b> {
  fn new(color_type: PngColorType, data: Option<&'b [u8]>) -> Self {
    match (color_type, data) {
      (PngColorType::Y, Some([y0, y1])) => Self::Gray(u16::from_be_bytes([*y0, *y1])),
      (PngColorType::RGB, Some([r0, r1, g0, g1, b0, b1])) => Self::Rgb([
        u16::from_be_bytes([*r0, *r1]),
        u16::from_be_bytes([*g0, *g1]),
        u16::from_be_bytes([*b0, *b1]),
      ]),
      (PngColorType::Index, Some(alphas)) => Self::Alphas(alphas),
      _ => Self::None,
    }
  }
}

impl StillImageCodec for PngStillCodec {
  fn decode(&self, png: &[u8]) -> Result<Bitmap, CodecError> {
    let parts = StillImageParts::parse(png)?;
    let ihdr = parts.header;
    let format = ihdr.pixel_format()?;
    let mut palette: &[RGB888] = &[];
    let mut trns: Option<&[u8]> = None;
    for chunk in &parts.palette_chunks {
      if chunk.chunk_type == ChunkType::PLTE {
        palette = bytemuck::try_cast_slice(chunk.data)
          .map_err(|_| FormatError::MalformedChunk { chunk: ChunkType::PLTE })?;
      } else {
        trns = Some(chunk.data);
      }
    }
    if format.color_type == PngColorType::Index && palette.is_empty() {
      return Err(CodecError::MissingPalette);
    }
    let transparency = Transparency::new(format.color_type, trns);

    let zlib_len = format.filtered_data_len(ihdr.width, ihdr.height, ihdr.is_interlaced);
    let mut zlib_buffer: Vec<u8> = Vec::new();
    zlib_buffer.try_reserve_exact(zlib_len)?;
    zlib_buffer.resize(zlib_len, 0);
    let decompression_count = miniz_oxide::inflate::decompress_slice_iter_to_slice(
      &mut zlib_buffer,
      parts.image_data.iter().copied(),
      true,
      false,
    )
    .map_err(|status| CodecError::Inflate(format!("{status:?}")))?;
    trace!("inflated {decompression_count} of {zlib_len} expected bytes");
    zlib_buffer.truncate(decompression_count);

    let mut image = Bitmap::try_new(ihdr.width, ihdr.height)?;
    let depth = format.bit_depth;
    // `i`th sample as the full value and as the high 8 bits
    let sample = |data: &[u8], i: usize| -> (u16, u8) {
      if depth == 16 {
        (u16::from_be_bytes([data[2 * i], data[2 * i + 1]]), data[2 * i])
      } else {
        (u16::from(data[i]), u8_replicate_bits(u32::from(depth), data[i]))
      }
    };
    let mut bad_index: Option<u8> = None;
    let unfilter_op = |x: u32, y: u32, data: &[u8]| {
      let Some(p) = image.get_mut(x, y) else { return };
      *p = match format.color_type {
        PngColorType::Y => {
          let (full, y) = sample(data, 0);
          let a = if matches!(transparency, Transparency::Gray(t) if t == full) { 0 } else { 255 };
          RGBA8888 { r: y, g: y, b: y, a }
        }
        PngColorType::RGB => {
          let ((r_full, r), (g_full, g), (b_full, b)) =
            (sample(data, 0), sample(data, 1), sample(data, 2));
          let key = [r_full, g_full, b_full];
          let a = if matches!(transparency, Transparency::Rgb(t) if t == key) { 0 } else { 255 };
          RGBA8888 { r, g, b, a }
        }
        PngColorType::Index => {
          let index = data[0];
          let Some(&RGB888 { r, g, b }) = palette.get(usize::from(index)) else {
            bad_index.get_or_insert(index);
            return;
          };
          let a = match transparency {
            Transparency::Alphas(alphas) => alphas.get(usize::from(index)).copied().unwrap_or(255),
            _ => 255,
          };
          RGBA8888 { r, g, b, a }
        }
        PngColorType::YA => {
          let ((_, y), (_, a)) = (sample(data, 0), sample(data, 1));
          RGBA8888 { r: y, g: y, b: y, a }
        }
        PngColorType::RGBA => {
          let ((_, r), (_, g), (_, b), (_, a)) =
            (sample(data, 0), sample(data, 1), sample(data, 2), sample(data, 3));
          RGBA8888 { r, g, b, a }
        }
      };
    };
    unfilter_decompressed_data(&ihdr, format, &mut zlib_buffer, unfilter_op)?;
    if let Some(index) = bad_index {
      return Err(CodecError::PaletteIndex { index, len: palette.len() });
    }
    Ok(image)
  }

  fn encode(&self, bitmap: &Bitmap, quality: f32) -> Result<Vec<u8>, CodecError> {
    if bitmap.width == 0 || bitmap.height == 0 {
      return Err(CodecError::ZeroDimensions);
    }
    if !bitmap.is_consistent() {
      return Err(CodecError::BufferSize {
        expected: crate::Region::full(bitmap.width, bitmap.height).pixel_count(),
        found: bitmap.pixels.len(),
      });
    }
    let format = PixelFormat::RGBA8;
    let header = IHDR::new(bitmap.width, bitmap.height, format);
    let strategy = if quality < 0.5 { FilterStrategy::Adaptive } else { FilterStrategy::Sub };
    let filtered = filter_scanlines(
      bitmap.as_bytes(),
      format.bytes_per_scanline(bitmap.width),
      format.filter_chunk_size(),
      strategy,
    );
    let level = compression_level(quality);
    let compressed = miniz_oxide::deflate::compress_to_vec_zlib(&filtered, level);
    trace!("compressed {} filtered bytes to {} at level {level}", filtered.len(), compressed.len());
    let mut writer = ChunkWriter::new();
    writer
      .write_chunk(ChunkType::IHDR, &header.to_bytes())?
      .write_chunk(ChunkType::IDAT, &compressed)?
      .write_chunk(ChunkType::IEND, &[])?;
    Ok(writer.finish())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use alloc::{boxed::Box, vec};

  /// Writes a PNG with the given header and unfiltered data (each row gets a
  /// `None` filter byte added).
  fn make_png(header: IHDR, extra: &[(ChunkType, &[u8])], rows: &[&[u8]]) -> Vec<u8> {
    let mut filtered = Vec::new();
    for row in rows {
      filtered.push(0);
      filtered.extend_from_slice(row);
    }
    let mut writer = ChunkWriter::new();
    writer.write_chunk(ChunkType::IHDR, &header.to_bytes()).unwrap();
    for (chunk_type, data) in extra {
      writer.write_chunk(*chunk_type, data).unwrap();
    }
    let compressed = miniz_oxide::deflate::compress_to_vec_zlib(&filtered, 6);
    let (a, b) = compressed.split_at(compressed.len() / 2);
    writer.write_chunk(ChunkType::IDAT, a).unwrap();
    writer.write_chunk(ChunkType::IDAT, b).unwrap();
    writer.write_chunk(ChunkType::IEND, &[]).unwrap();
    writer.finish()
  }

  #[test]
  fn test_encode_decode_rgba() {
    let pixels: Vec<RGBA8888> =
      (0..20_u8).map(|i| RGBA8888::new(i * 12, 255 - i, i ^ 0x5A, i * 7)).collect();
    let bitmap = Bitmap::from_pixels(5, 4, pixels).unwrap();
    for quality in [0.0, 0.3, 1.0] {
      let png = PngStillCodec.encode(&bitmap, quality).unwrap();
      assert_eq!(PngStillCodec.decode(&png).unwrap(), bitmap);
    }
  }

  #[test]
  fn test_encode_rejects_bad_bitmaps() {
    let empty = Bitmap::new(0, 3);
    assert_eq!(PngStillCodec.encode(&empty, 1.0), Err(CodecError::ZeroDimensions));
    let bad = Bitmap { width: 2, height: 2, pixels: vec![RGBA8888::TRANSPARENT; 3] };
    assert_eq!(
      PngStillCodec.encode(&bad, 1.0),
      Err(CodecError::BufferSize { expected: 4, found: 3 })
    );
  }

  #[test]
  fn test_compression_level() {
    assert_eq!(compression_level(1.0), 1);
    assert_eq!(compression_level(0.0), 10);
    assert_eq!(compression_level(0.5), 6);
    assert_eq!(compression_level(7.0), 1);
    assert_eq!(compression_level(f32::NAN), 1);
  }

  #[test]
  fn test_decode_gray_1bit() {
    let header = IHDR::new(3, 2, PixelFormat { color_type: PngColorType::Y, bit_depth: 1 });
    let png = make_png(header, &[], &[&[0b101_00000], &[0b010_00000]]);
    let image = PngStillCodec.decode(&png).unwrap();
    let white = RGBA8888::opaque(255, 255, 255);
    let black = RGBA8888::opaque(0, 0, 0);
    assert_eq!(image.pixels, vec![white, black, white, black, white, black]);
  }

  #[test]
  fn test_decode_palette_with_trns() {
    let header = IHDR::new(3, 1, PixelFormat { color_type: PngColorType::Index, bit_depth: 8 });
    let plte: &[u8] = &[255, 0, 0, 0, 255, 0, 0, 0, 255];
    let trns: &[u8] = &[0, 128];
    let png = make_png(header, &[(ChunkType::PLTE, plte), (ChunkType::tRNS, trns)], &[&[0, 1, 2]]);
    let image = PngStillCodec.decode(&png).unwrap();
    assert_eq!(
      image.pixels,
      vec![RGBA8888::new(255, 0, 0, 0), RGBA8888::new(0, 255, 0, 128), RGBA8888::opaque(0, 0, 255)]
    );
  }

  #[test]
  fn test_decode_gray_2bit_and_4bit() {
    let header = IHDR::new(4, 1, PixelFormat { color_type: PngColorType::Y, bit_depth: 2 });
    let png = make_png(header, &[], &[&[0b00_01_10_11]]);
    let grays: Vec<u8> = PngStillCodec.decode(&png).unwrap().pixels.iter().map(|p| p.r).collect();
    assert_eq!(grays, vec![0x00, 0x55, 0xAA, 0xFF]);

    let header = IHDR::new(2, 1, PixelFormat { color_type: PngColorType::Y, bit_depth: 4 });
    let png = make_png(header, &[], &[&[0x3C]]);
    let grays: Vec<u8> = PngStillCodec.decode(&png).unwrap().pixels.iter().map(|p| p.r).collect();
    assert_eq!(grays, vec![0x33, 0xCC]);
  }

  #[test]
  fn test_decode_palette_errors() {
    let header = IHDR::new(3, 1, PixelFormat { color_type: PngColorType::Index, bit_depth: 8 });
    let no_plte = make_png(header, &[], &[&[0, 0, 0]]);
    assert_eq!(PngStillCodec.decode(&no_plte), Err(CodecError::MissingPalette));

    let plte: &[u8] = &[255, 0, 0, 0, 255, 0];
    let past_end = make_png(header, &[(ChunkType::PLTE, plte)], &[&[0, 2, 1]]);
    assert_eq!(PngStillCodec.decode(&past_end), Err(CodecError::PaletteIndex { index: 2, len: 2 }));
  }

  #[test]
  fn test_decode_rgb16_with_trns() {
    let header = IHDR::new(2, 1, PixelFormat { color_type: PngColorType::RGB, bit_depth: 16 });
    let trns: &[u8] = &[0x12, 0x34, 0, 0, 0xFF, 0xFF];
    let row: &[u8] = &[0x12, 0x34, 0, 0, 0xFF, 0xFF, 0x12, 0x35, 0, 0, 0xFF, 0xFF];
    let png = make_png(header, &[(ChunkType::tRNS, trns)], &[row]);
    let image = PngStillCodec.decode(&png).unwrap();
    assert_eq!(image.pixels, vec![RGBA8888::new(0x12, 0, 0xFF, 0), RGBA8888::opaque(0x12, 0, 0xFF)]);
  }

  #[test]
  fn test_decode_interlaced() {
    // 2x2 gray+alpha, Adam7 passes 1 (0,0), 6 (1,0), and 7 (0,1) (1,1) are
    // the only non-empty ones.
    let header = IHDR {
      is_interlaced: true,
      ..IHDR::new(2, 2, PixelFormat { color_type: PngColorType::YA, bit_depth: 8 })
    };
    let png = make_png(header, &[], &[&[10, 255], &[20, 255], &[30, 255, 40, 128]]);
    let image = PngStillCodec.decode(&png).unwrap();
    assert_eq!(
      image.pixels,
      vec![
        RGBA8888::new(10, 10, 10, 255),
        RGBA8888::new(20, 20, 20, 255),
        RGBA8888::new(30, 30, 30, 255),
        RGBA8888::new(40, 40, 40, 128),
      ]
    );
  }

  #[test]
  fn test_decode_errors() {
    let header = IHDR::new(2, 2, PixelFormat::RGBA8);
    let short = make_png(header, &[], &[&[0; 8]]);
    assert_eq!(PngStillCodec.decode(&short), Err(CodecError::ShortImageData));

    let mut writer = ChunkWriter::new();
    writer.write_chunk(ChunkType::IHDR, &header.to_bytes()).unwrap();
    writer.write_chunk(ChunkType::IEND, &[]).unwrap();
    let no_data = writer.finish();
    assert_eq!(
      PngStillCodec.decode(&no_data),
      Err(CodecError::Stream(Box::new(FormatError::MissingImageData)))
    );
  }
}
