//! The animation layer: parsing frames out of a stream, composing them, and
//! building new streams.
//!
//! Decoding goes bytes → [`parse`] → still image decode → [`compose`] →
//! [`ComposedFrame`]s, and encoding goes bitmaps → still image encode →
//! [`build`] → bytes. The [`decode_apng`] and [`encode_images`] functions run
//! the whole pipeline.

mod parser;
pub use parser::*;

mod compositor;
pub use compositor::*;

mod builder;
pub use builder::*;

mod config;
pub use config::*;

mod api;
pub use api::*;
