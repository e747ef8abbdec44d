//! Big-endian integers with an alignment of 1.
//!
//! PNG stores every multi-byte integer in network byte order. Keeping them as
//! byte arrays lets a chunk payload be described as a plain `#[repr(C)]`
//! struct and read straight out of the stream with [`bytemuck`].

use bytemuck::{Pod, Zeroable};

macro_rules! big_endian_int {
  ($(#[$meta:meta])* $name:ident, $int:ty, $to:ident, $from:ident) => {
    $(#[$meta])*
    #[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Zeroable, Pod)]
    #[repr(transparent)]
    pub struct $name([u8; core::mem::size_of::<$int>()]);
    impl $name {
      #[doc = concat!("Converts to a native `", stringify!($int), "`.")]
      #[inline]
      #[must_use]
      pub const fn $to(self) -> $int {
        <$int>::from_be_bytes(self.0)
      }
      #[doc = concat!("Makes a value from a native `", stringify!($int), "`.")]
      #[inline]
      #[must_use]
      pub const fn $from(value: $int) -> Self {
        Self(value.to_be_bytes())
      }
    }
    impl core::fmt::Debug for $name {
      #[inline]
      fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple(stringify!($name)).field(&self.$to()).finish()
      }
    }
    impl From<$int> for $name {
      #[inline]
      fn from(value: $int) -> Self {
        Self::$from(value)
      }
    }
    impl From<$name> for $int {
      #[inline]
      fn from(value: $name) -> Self {
        value.$to()
      }
    }
  };
}

big_endian_int!(
  /// A `u16` stored as big-endian bytes.
  U16BE,
  u16,
  to_u16,
  from_u16
);

big_endian_int!(
  /// A `u32` stored as big-endian bytes.
  U32BE,
  u32,
  to_u32,
  from_u32
);

#[test]
fn test_big_endian_layout() {
  assert_eq!(bytemuck::bytes_of(&U32BE::from_u32(0x0102_0304)), &[1, 2, 3, 4]);
  assert_eq!(bytemuck::bytes_of(&U16BE::from_u16(0xABCD)), &[0xAB, 0xCD]);
  assert_eq!(u32::from(U32BE::from(7_u32)), 7);
  assert_eq!(core::mem::align_of::<U32BE>(), 1);
}
