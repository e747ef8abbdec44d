//! The CRC-32 used by PNG chunks (ISO 3309 polynomial, reflected).

const CRC_TABLE: [u32; 256] = make_crc_table();

const fn make_crc_table() -> [u32; 256] {
  let mut out = [0; 256];
  let mut n = 0;
  while n < 256 {
    let mut c = n as u32;
    let mut k = 0;
    while k < 8 {
      if (c & 1) != 0 {
        c = 0xEDB8_8320_u32 ^ (c >> 1);
      } else {
        c >>= 1;
      }
      k += 1;
    }
    out[n] = c;
    n += 1;
  }
  out
}

#[inline]
fn update_crc(mut crc: u32, bytes: &[u8]) -> u32 {
  for &byte in bytes {
    let i = (crc ^ u32::from(byte)) as u8 as usize;
    crc = CRC_TABLE[i] ^ (crc >> 8);
  }
  crc
}

/// CRC-32 of some bytes, with the pre and post conditioning PNG uses.
#[inline]
#[must_use]
pub fn png_crc(bytes: &[u8]) -> u32 {
  update_crc(u32::MAX, bytes) ^ u32::MAX
}

/// The CRC a chunk should carry: computed over the tag, then the payload.
///
/// The payload can be given as several parts, which is handy for `fdAT` where
/// the sequence number and the image data come from different places.
#[inline]
#[must_use]
pub fn chunk_crc(chunk_type: [u8; 4], payload_parts: &[&[u8]]) -> u32 {
  let crc = update_crc(u32::MAX, &chunk_type);
  payload_parts.iter().fold(crc, |crc, part| update_crc(crc, part)) ^ u32::MAX
}

#[test]
fn test_png_crc() {
  assert_eq!(png_crc(b"123456789"), 0xCBF4_3926);
  assert_eq!(png_crc(b"IEND"), 0xAE42_6082);
  assert_eq!(chunk_crc(*b"IEND", &[]), 0xAE42_6082);
  assert_eq!(chunk_crc(*b"IDAT", &[b"ab", b"c"]), chunk_crc(*b"IDAT", &[b"abc"]));
  assert_eq!(chunk_crc(*b"IDAT", &[b"abc"]), png_crc(b"IDATabc"));
}
