use alloc::vec::Vec;

use super::*;

#[cfg(test)]
use alloc::vec;

/// How the encoder picks the filter for each scanline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FilterStrategy {
  /// Every line uses `Sub`. Fast, and good for flat colors.
  #[default]
  Sub,
  /// Every line tries all five filters and keeps the one with the smallest
  /// sum of absolute differences.
  Adaptive,
}

/// Filters one line with the given filter type, appending the output bytes
/// (without the filter type byte) to `out`.
fn filter_line(filter: u8, prev: Option<&[u8]>, line: &[u8], chunk_size: usize, out: &mut Vec<u8>) {
  let up = |i: usize| prev.map_or(0, |prev| prev[i]);
  let left = |i: usize| if i >= chunk_size { line[i - chunk_size] } else { 0 };
  let up_left = |i: usize| if i >= chunk_size { up(i - chunk_size) } else { 0 };
  out.extend((0..line.len()).map(|i| {
    let predicted = match filter {
      1 => left(i),
      2 => up(i),
      3 => ((u16::from(left(i)) + u16::from(up(i))) / 2) as u8,
      4 => paeth_predict(left(i), up(i), up_left(i)),
      _ => 0,
    };
    line[i].wrapping_sub(predicted)
  }));
}

/// Turns raw scanlines into filtered data ready for zlib compression.
///
/// `scanlines` is the image's pixel data, `bytes_per_scanline` bytes per row,
/// and the output has one extra filter type byte per row.
#[must_use]
pub fn filter_scanlines(
  scanlines: &[u8], bytes_per_scanline: usize, chunk_size: usize, strategy: FilterStrategy,
) -> Vec<u8> {
  if bytes_per_scanline == 0 {
    return Vec::new();
  }
  let row_count = scanlines.len() / bytes_per_scanline;
  let mut out = Vec::with_capacity(row_count * (bytes_per_scanline + 1));
  let mut scratch = Vec::with_capacity(bytes_per_scanline);
  let mut prev: Option<&[u8]> = None;
  for line in scanlines.chunks_exact(bytes_per_scanline) {
    match strategy {
      FilterStrategy::Sub => {
        out.push(1);
        filter_line(1, prev, line, chunk_size, &mut out);
      }
      FilterStrategy::Adaptive => {
        let mut best: Option<(u64, u8)> = None;
        for filter in 0..=4 {
          scratch.clear();
          filter_line(filter, prev, line, chunk_size, &mut scratch);
          let cost: u64 = scratch.iter().map(|&b| u64::from((b as i8).unsigned_abs())).sum();
          if best.map_or(true, |(best_cost, _)| cost < best_cost) {
            best = Some((cost, filter));
          }
        }
        let filter = best.map_or(0, |(_, filter)| filter);
        out.push(filter);
        filter_line(filter, prev, line, chunk_size, &mut out);
      }
    }
    prev = Some(line);
  }
  out
}

#[test]
fn test_filter_scanlines_unfilter_back() {
  let header = IHDR::new(3, 3, PixelFormat::RGBA8);
  let pixels: Vec<u8> = (0..36_u32).map(|i| (i * 37 % 251) as u8).collect();
  for strategy in [FilterStrategy::Sub, FilterStrategy::Adaptive] {
    let mut filtered = filter_scanlines(&pixels, 12, 4, strategy);
    assert_eq!(filtered.len(), 39);
    let mut out = vec![0_u8; 36];
    unfilter_decompressed_data(&header, PixelFormat::RGBA8, &mut filtered, |x, y, px| {
      let i = ((y * 3 + x) * 4) as usize;
      out[i..i + 4].copy_from_slice(px);
    })
    .unwrap();
    assert_eq!(out, pixels, "{strategy:?}");
  }
}

#[test]
fn test_adaptive_prefers_up_for_repeated_rows() {
  let row: Vec<u8> = (0..16).map(|i| (i * 53) as u8).collect();
  let pixels = [row.as_slice(), row.as_slice()].concat();
  let filtered = filter_scanlines(&pixels, 16, 4, FilterStrategy::Adaptive);
  assert_eq!(filtered[17], 2);
  assert!(filtered[18..].iter().all(|&b| b == 0));
}
