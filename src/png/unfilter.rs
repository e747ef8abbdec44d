use super::*;
use crate::CodecError;

#[cfg(test)]
use alloc::{vec, vec::Vec};

pub(crate) const fn paeth_predict(a: u8, b: u8, c: u8) -> u8 {
  let a_ = a as i32;
  let b_ = b as i32;
  let c_ = c as i32;
  let p: i32 = a_ + b_ - c_;
  let pa = (p - a_).abs();
  let pb = (p - b_).abs();
  let pc = (p - c_).abs();
  // Note: the order of these tests is fixed by the PNG format, don't touch it.
  if pa <= pb && pa <= pc {
    a
  } else if pb <= pc {
    b
  } else {
    c
  }
}

/// Reverses the filter on one line, in place.
///
/// `prev` is the already unfiltered previous line of the same reduced image,
/// or `None` for the first line (which acts like a line of zeroes).
fn unfilter_line(
  filter: u8, prev: Option<&[u8]>, line: &mut [u8], chunk_size: usize,
) -> Result<(), CodecError> {
  let up = |i: usize| prev.map_or(0, |prev| prev[i]);
  match filter {
    0 => (),
    1 => {
      // Sub
      for i in chunk_size..line.len() {
        line[i] = line[i].wrapping_add(line[i - chunk_size]);
      }
    }
    2 => {
      // Up
      if let Some(prev) = prev {
        line.iter_mut().zip(prev).for_each(|(p, b)| *p = p.wrapping_add(*b));
      }
    }
    3 => {
      // Average
      for i in 0..line.len() {
        let a = if i >= chunk_size { line[i - chunk_size] } else { 0 };
        let average = ((u16::from(a) + u16::from(up(i))) / 2) as u8;
        line[i] = line[i].wrapping_add(average);
      }
    }
    4 => {
      // Paeth
      for i in 0..line.len() {
        let (a, c) = if i >= chunk_size { (line[i - chunk_size], up(i - chunk_size)) } else { (0, 0) };
        line[i] = line[i].wrapping_add(paeth_predict(a, up(i), c));
      }
    }
    other => return Err(CodecError::BadFilter(other)),
  }
  Ok(())
}

/// Passes each pixel of an unfiltered line to the `op`.
///
/// Bit-packed pixels are unpacked, with the value in the low bits of a single
/// byte.
fn send_out_line<F: FnMut(u32, u32, &[u8])>(
  format: PixelFormat, image_level: usize, reduced_y: u32, reduced_width: u32, line: &[u8],
  op: &mut F,
) {
  match format.bit_depth {
    depth @ (1 | 2 | 4) => {
      let depth = u32::from(depth);
      let mask = (1_u8 << depth) - 1;
      for reduced_x in 0..reduced_width {
        let bit_pos = reduced_x * depth;
        let byte = line[(bit_pos / 8) as usize];
        let down_shift = 8 - depth - (bit_pos % 8);
        let (x, y) = interlaced_pos_to_full_pos(image_level, reduced_x, reduced_y);
        op(x, y, &[(byte >> down_shift) & mask]);
      }
    }
    _ => {
      let pixels = line.chunks_exact(format.filter_chunk_size()).take(reduced_width as usize);
      for (reduced_x, pixel) in (0..).zip(pixels) {
        let (x, y) = interlaced_pos_to_full_pos(image_level, reduced_x, reduced_y);
        op(x, y, pixel);
      }
    }
  }
}

/// Given the `header`, `decompressed` buffer, and a per-pixel `op`, unfilters
/// the data and passes each pixel output to the `op` as the unfiltering occurs.
///
/// Each call to the `op` gets `|x, y, data|` as arguments, where `x` and `y`
/// are the position of the pixel data (relative to the top left), and `data` is
/// a slice of bytes representing the unfiltered pixel value at that location.
///
/// The data is unfiltered in place. Extra bytes after the image data are
/// ignored.
///
/// ## Failure
/// * [`CodecError::ShortImageData`] if the buffer runs out early (possibly
///   after some amount of the unfiltering is done).
/// * [`CodecError::BadFilter`] for an unknown filter type byte.
pub fn unfilter_decompressed_data<F>(
  header: &IHDR, format: PixelFormat, mut decompressed: &mut [u8], mut op: F,
) -> Result<(), CodecError>
where
  F: FnMut(u32, u32, &[u8]),
{
  if header.width == 0 || header.height == 0 {
    return Err(CodecError::ZeroDimensions);
  }
  let chunk_size = format.filter_chunk_size();
  let dimensions = reduced_image_dimensions(header.width, header.height);
  // a non-interlaced image is handled as "reduced image 0" (the full image).
  let image_levels = if header.is_interlaced { 1..8 } else { 0..1 };
  for image_level in image_levels {
    let (reduced_width, reduced_height) = dimensions[image_level];
    if reduced_width == 0 || reduced_height == 0 {
      continue;
    }
    let bytes_per_filterline = format.bytes_per_filterline(reduced_width);
    let bytes_used_this_image = bytes_per_filterline.saturating_mul(reduced_height as usize);
    if decompressed.len() < bytes_used_this_image {
      return Err(CodecError::ShortImageData);
    }
    let (these_bytes, more_bytes) =
      core::mem::take(&mut decompressed).split_at_mut(bytes_used_this_image);
    decompressed = more_bytes;

    let mut prev: Option<&[u8]> = None;
    for (reduced_y, filterline) in (0..).zip(these_bytes.chunks_exact_mut(bytes_per_filterline)) {
      let (f, line) = filterline.split_at_mut(1);
      unfilter_line(f[0], prev, line, chunk_size)?;
      f[0] = 0;
      send_out_line(format, image_level, reduced_y, reduced_width, line, &mut op);
      prev = Some(&*line);
    }
  }
  Ok(())
}

#[test]
fn test_unfilter_each_filter() {
  // 2x2 gray 8-bit, every row a different filter
  let header = IHDR::new(2, 4, PixelFormat { color_type: PngColorType::Y, bit_depth: 8 });
  let format = header.pixel_format().unwrap();
  #[rustfmt::skip]
  let mut data = vec![
    1, 10, 5,   // Sub: 10, 15
    2, 1, 1,    // Up: 11, 16
    3, 1, 1,    // Average: 1 + 11/2 = 6, 1 + (6 + 16)/2 = 12
    4, 1, 1,    // Paeth: 1 + 6 = 7, 1 + paeth(7, 12, 6) = 13
  ];
  let mut out = vec![0_u8; 8];
  unfilter_decompressed_data(&header, format, &mut data, |x, y, px| {
    out[(y * 2 + x) as usize] = px[0];
  })
  .unwrap();
  assert_eq!(out, vec![10, 15, 11, 16, 6, 12, 7, 13]);
}

#[test]
fn test_unfilter_errors() {
  let header = IHDR::new(2, 1, PixelFormat { color_type: PngColorType::Y, bit_depth: 8 });
  let format = header.pixel_format().unwrap();
  let result = unfilter_decompressed_data(&header, format, &mut [5, 0, 0], |_, _, _| ());
  assert_eq!(result, Err(CodecError::BadFilter(5)));
  let result = unfilter_decompressed_data(&header, format, &mut [0, 0], |_, _, _| ());
  assert_eq!(result, Err(CodecError::ShortImageData));
}

#[test]
fn test_unfilter_bit_packed() {
  let header = IHDR::new(5, 1, PixelFormat { color_type: PngColorType::Y, bit_depth: 2 });
  let format = header.pixel_format().unwrap();
  let mut data = vec![0, 0b00_01_10_11, 0b01_000000];
  let mut out = Vec::new();
  unfilter_decompressed_data(&header, format, &mut data, |_, _, px| out.push(px[0])).unwrap();
  assert_eq!(out, vec![0, 1, 2, 3, 1]);
}
