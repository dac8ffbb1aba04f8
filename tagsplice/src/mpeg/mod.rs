//! MPEG audio stream properties
//!
//! MPEG files carry no container, so every tag lives around the frames: an ID3v2 tag at the start,
//! and APE and ID3v1 tags at the end.

mod constants;
pub(crate) mod header;
pub(crate) mod properties;
