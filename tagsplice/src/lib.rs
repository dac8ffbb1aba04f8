//! Read and rewrite audio metadata in place.
//!
//! A file can carry several tag systems at once (an MP3 with ID3v2, APEv2 and ID3v1 tags, a WAV
//! file with `LIST INFO` and ID3v2). `tagsplice` reads all of them, presents them as one
//! [`Tag`](tag::Tag), and writes edits back to every system present. The audio payload is never
//! re-encoded: tags are spliced into the file, reusing padding left by earlier edits where
//! possible.
//!
//! # Supported formats
//!
//! | Format          | Tag systems                               |
//! |-----------------|-------------------------------------------|
//! | MPEG (mp1-3)    | ID3v2, APEv2, ID3v1                       |
//! | MP4             | iTunes-style `ilst`, Nero `chpl` chapters |
//! | WAV             | RIFF `LIST INFO` and `disp`, ID3v2        |
//! | Monkey's Audio  | APEv2, ID3v2, ID3v1                       |
//! | OptimFROG       | APEv2, ID3v2, ID3v1                       |
//!
//! # Examples
//!
//! ## Reading a file
//!
//! ```rust,no_run
//! # fn main() -> tagsplice::error::Result<()> {
//! use tagsplice::track::Track;
//!
//! let track = Track::load("test.mp3")?;
//!
//! println!("Title: {:?}", track.tag().title());
//! println!("Duration: {:?}", track.info().duration());
//! # Ok(())
//! # }
//! ```
//!
//! ## Writing a file
//!
//! ```rust,no_run
//! # fn main() -> tagsplice::error::Result<()> {
//! use tagsplice::config::{RemovalPolicy, WriteOptions};
//! use tagsplice::progress::NoProgress;
//! use tagsplice::track::Track;
//!
//! let mut track = Track::load("test.m4b")?;
//! track.tag_mut().set_artist("Foo artist");
//!
//! let options = WriteOptions::new()
//! 	.preferred_padding(2048)
//! 	.removal_policy(RemovalPolicy::Collapse);
//! track.try_save_with(options, &mut NoProgress)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Reading from a stream
//!
//! ```rust,no_run
//! # fn main() -> tagsplice::error::Result<()> {
//! use tagsplice::config::{ParseOptions, ParsingMode};
//! use tagsplice::track::Track;
//!
//! let mut file = std::fs::File::open("test.wav")?;
//! let parse_options = ParseOptions::new().parsing_mode(ParsingMode::Strict);
//! let track = Track::read_from(&mut file, parse_options)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Non-atomic writes
//!
//! Every tag is encoded, and every size and offset is checked, before the first byte of a file is
//! changed. Once data starts moving however, an I/O error leaves the file partially rewritten.
//! Callers needing atomicity should work on a copy.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod chapter;
pub mod config;
pub mod error;
pub mod file;
pub mod issue;
pub(crate) mod macros;
pub mod picture;
pub mod progress;
pub mod properties;
pub mod tag;
pub mod track;
mod util;

mod adapter;
mod ape;
mod id3;
mod iff;
mod layout;
mod mp4;
mod mpeg;
mod ofr;

pub use util::text::TextEncoding;

pub use util::io;

/// Commonly used items
pub mod prelude {
	pub use crate::config::{ParseOptions, WriteOptions};
	pub use crate::tag::{StandardField, Tag, TagType};
	pub use crate::track::{TagSelector, Track};
}
