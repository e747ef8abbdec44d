//! Shorthands for pulling fixed size pieces off the front of a byte slice.

/// Splits `N` bytes off the front of the slice, if there's enough bytes.
#[inline]
#[must_use]
pub(crate) fn try_split_off_byte_array<const N: usize>(bytes: &[u8]) -> Option<([u8; N], &[u8])> {
  bytes.split_first_chunk::<N>().map(|(head, tail)| (*head, tail))
}

/// Reads a big-endian `u32` off the front of the slice.
#[inline]
#[must_use]
pub(crate) fn try_split_off_u32_be(bytes: &[u8]) -> Option<(u32, &[u8])> {
  try_split_off_byte_array::<4>(bytes).map(|(head, tail)| (u32::from_be_bytes(head), tail))
}

#[test]
fn test_try_split_off() {
  assert_eq!(try_split_off_byte_array::<2>(&[1, 2, 3]), Some(([1, 2], &[3][..])));
  assert_eq!(try_split_off_byte_array::<4>(&[1, 2, 3]), None);
  assert_eq!(try_split_off_u32_be(&[0, 0, 1, 0, 9]), Some((256, &[9][..])));
  assert_eq!(try_split_off_u32_be(&[]), None);
}
