#![no_std]
#![forbid(unsafe_code)]
#![cfg_attr(docs_rs, feature(doc_cfg))]
#![warn(missing_docs)]

//! A crate for decoding and encoding Animated PNG (APNG) data.
//!
//! APNG layers an animation on top of a normal PNG data stream. A program that
//! doesn't understand the animation chunks still sees a valid PNG (the
//! "default image"), while an APNG-aware program sees a series of timed frames
//! that are composed against each other on a shared canvas.
//!
//! * [APNG Specification](https://wiki.mozilla.org/APNG_Specification)
//! * [PNG Specification (Third Edition)](https://www.w3.org/TR/png-3/)
//!
//! ## Decoding
//!
//! Call [`decode_apng`] and you get back every frame fully composed onto the
//! canvas, along with how long each frame should be shown.
//!
//! ```no_run
//! use apng_serialization::*;
//! # fn demo(bytes: &[u8]) -> Result<(), FormatError> {
//! let animation = decode_apng(bytes, &DecodeConfig::default())?;
//! for frame in &animation.frames {
//!   println!("{}x{} for {}s", frame.image.width, frame.image.height, frame.duration);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! A plain PNG decodes as a single frame that lasts for
//! [`DecodeConfig::default_duration`].
//!
//! ## Encoding
//!
//! Call [`encode_images`] with bitmaps that all have the same size. A single
//! bitmap is written as a plain PNG, two or more become an APNG whose default
//! image is the first frame.
//!
//! ```no_run
//! use apng_serialization::*;
//! # fn demo(images: &[Bitmap]) -> Result<(), EncodeError> {
//! let config = EncodeConfig::default().with_loop_count(3);
//! let png: Vec<u8> = encode_images(images, &FrameDurations::Uniform(0.1), &config)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Layers
//!
//! The [`png`] module has the chunk level plumbing (reading, writing, and the
//! still image codec that the animation layer treats as a black box), and the
//! [`apng`] module has the animation parser, the frame compositor, and the
//! animation builder. Most users only need the re-exports at the crate root.
//!
//! ## Features
//!
//! * `std` (default): turns on `std` support in the dependencies. Without it
//!   the crate only needs `alloc`.
//! * `rayon`: decodes and encodes the per-frame still images in parallel.

extern crate alloc;
#[cfg(any(test, feature = "std"))]
extern crate std;

#[cfg(target_pointer_width = "16")]
compile_error!("this crate assumes 32-bit or bigger pointers!");

mod parser_helpers;
pub(crate) use parser_helpers::*;

mod error;
pub use error::*;

pub mod int_endian;
pub use int_endian::*;

pub mod pixels;
pub use pixels::*;

pub mod bitmap;
pub use bitmap::*;

pub mod png;

pub mod apng;
pub use apng::*;
