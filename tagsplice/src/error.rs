//! Errors raised while reading or rewriting a track
//!
//! Every fallible operation returns a [`TagspliceError`], whose [`ErrorKind`] says what went
//! wrong. New kinds may be added in any release.

use crate::file::FileType;
pub use crate::util::text::TextEncodingError;

use std::collections::TryReserveError;
use std::fmt::{Debug, Display, Formatter};

/// Alias for `Result<T, TagspliceError>`
pub type Result<T> = std::result::Result<T, TagspliceError>;

/// What went wrong
#[derive(Debug)]
#[non_exhaustive]
pub enum ErrorKind {
	/// A size read from the file asks for more memory than the allocation limit permits
	///
	/// See [`GlobalOptions::allocation_limit`](crate::config::GlobalOptions::allocation_limit).
	TooMuchData,
	/// A stored size does not fit the structure that contains it
	SizeMismatch,
	/// The container itself is malformed
	FileDecoding(FileDecodingError),

	/// Picture data could not be understood
	NotAPicture,

	/// The tag system cannot live in this format
	UnsupportedTag,
	/// A tag signature was found, but what follows it is not a tag
	FakeTag,
	/// Text could not be decoded
	TextDecode(&'static str),
	/// Text could not be encoded
	TextEncode(TextEncodingError),
	/// A malformed ID3v2 tag or frame
	Id3v2(Id3v2Error),
	/// A malformed MP4 atom
	BadAtom(&'static str),

	/// The tag region cannot be rewritten without damaging the file
	///
	/// Always raised before the first byte is modified.
	Layout(&'static str),

	/// Bytes that were expected to be UTF-8 are not
	StringFromUtf8(std::string::FromUtf8Error),
	/// Any [`std::io::Error`]
	Io(std::io::Error),
	/// An allocation failed
	Alloc(TryReserveError),
	/// Unreachable, only present to satisfy conversions
	Infallible(std::convert::Infallible),
}

/// What went wrong within an ID3v2 tag
#[derive(Debug)]
#[non_exhaustive]
pub enum Id3v2ErrorKind {
	/// The major version is neither 3 nor 4
	BadId3v2Version(u8, u8),
	/// The extended header is smaller than its minimum or larger than the tag
	BadExtendedHeaderSize,

	/// A frame ID holds something other than `A-Z` and `0-9`
	BadFrameId(Vec<u8>),
	/// A frame is shorter than its fixed fields
	BadFrameLength,
	/// A `CHAP` or `CTOC` frame contradicts itself
	BadChapter(&'static str),

	/// A compressed frame failed to inflate
	#[cfg(feature = "id3v2_compression_support")]
	Decompression(std::io::Error),
	/// A compressed frame was found with the `id3v2_compression_support` feature disabled
	#[cfg(not(feature = "id3v2_compression_support"))]
	CompressedFrameEncountered,
}

impl Display for Id3v2ErrorKind {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::BadId3v2Version(major, minor) => {
				write!(f, "Unsupported version v2.{major}.{minor}, expected v2.3 or v2.4")
			},
			Self::BadExtendedHeaderSize => write!(f, "Extended header has an impossible size"),
			Self::BadFrameId(frame_id) => write!(f, "Invalid frame ID: 0x{frame_id:x?}"),
			Self::BadFrameLength => write!(f, "Frame is too short for its fixed fields"),
			Self::BadChapter(message) => write!(f, "Chapter: {message}"),
			#[cfg(feature = "id3v2_compression_support")]
			Self::Decompression(err) => write!(f, "Unable to inflate frame: {err}"),
			#[cfg(not(feature = "id3v2_compression_support"))]
			Self::CompressedFrameEncountered => {
				write!(f, "Found a compressed frame, but compression support is disabled")
			},
		}
	}
}

/// An error within an ID3v2 tag
pub struct Id3v2Error {
	kind: Id3v2ErrorKind,
}

impl Id3v2Error {
	/// Wrap an [`Id3v2ErrorKind`]
	#[must_use]
	pub const fn new(kind: Id3v2ErrorKind) -> Self {
		Self { kind }
	}

	/// The [`Id3v2ErrorKind`]
	pub fn kind(&self) -> &Id3v2ErrorKind {
		&self.kind
	}
}

impl Debug for Id3v2Error {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "ID3v2: {:?}", self.kind)
	}
}

impl Display for Id3v2Error {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "ID3v2: {}", self.kind)
	}
}

/// A container that could not be parsed
pub struct FileDecodingError {
	format: Option<FileType>,
	description: &'static str,
}

impl FileDecodingError {
	/// An error tied to a [`FileType`]
	#[must_use]
	pub const fn new(format: FileType, description: &'static str) -> Self {
		Self {
			format: Some(format),
			description,
		}
	}

	/// An error raised before the format was known
	pub fn from_description(description: &'static str) -> Self {
		Self {
			format: None,
			description,
		}
	}

	/// The [`FileType`] being decoded, if known
	pub fn format(&self) -> Option<FileType> {
		self.format
	}

	/// What went wrong
	pub fn description(&self) -> &str {
		self.description
	}
}

impl Debug for FileDecodingError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self.format {
			Some(format) => write!(f, "{format:?}: {:?}", self.description),
			None => write!(f, "{:?}", self.description),
		}
	}
}

impl Display for FileDecodingError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self.format {
			Some(format) => write!(f, "{}: {}", format.name(), self.description),
			None => write!(f, "{}", self.description),
		}
	}
}

/// The error type of every fallible operation in tagsplice
pub struct TagspliceError {
	pub(crate) kind: ErrorKind,
}

impl TagspliceError {
	/// Wrap an [`ErrorKind`]
	///
	/// # Examples
	///
	/// ```rust
	/// use tagsplice::error::{ErrorKind, TagspliceError};
	///
	/// let err = TagspliceError::new(ErrorKind::UnsupportedTag);
	/// assert!(matches!(err.kind(), ErrorKind::UnsupportedTag));
	/// ```
	#[must_use]
	pub const fn new(kind: ErrorKind) -> Self {
		Self { kind }
	}

	/// The [`ErrorKind`]
	pub fn kind(&self) -> &ErrorKind {
		&self.kind
	}
}

impl std::error::Error for TagspliceError {}

impl Debug for TagspliceError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{:?}", self.kind)
	}
}

macro_rules! from_error {
	($($source:ty => $variant:ident),+ $(,)?) => {
		$(
			impl From<$source> for TagspliceError {
				fn from(input: $source) -> Self {
					Self {
						kind: ErrorKind::$variant(input),
					}
				}
			}
		)+
	};
}

from_error! {
	Id3v2Error => Id3v2,
	FileDecodingError => FileDecoding,
	TextEncodingError => TextEncode,
	std::io::Error => Io,
	std::string::FromUtf8Error => StringFromUtf8,
	TryReserveError => Alloc,
	std::convert::Infallible => Infallible,
}

impl Display for TagspliceError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self.kind {
			ErrorKind::TooMuchData => write!(f, "Refusing to allocate past the allocation limit"),
			ErrorKind::SizeMismatch => write!(f, "Stored size does not fit its container"),
			ErrorKind::FileDecoding(ref err) => write!(f, "{err}"),
			ErrorKind::NotAPicture => write!(f, "Picture: Unrecognized data"),
			ErrorKind::UnsupportedTag => write!(f, "Tag system is not supported by this format"),
			ErrorKind::FakeTag => write!(f, "Found a tag signature, but no valid tag"),
			ErrorKind::TextDecode(message) => write!(f, "Text decoding: {message}"),
			ErrorKind::TextEncode(ref err) => write!(f, "Text encoding: {err}"),
			ErrorKind::Id3v2(ref err) => write!(f, "{err}"),
			ErrorKind::BadAtom(message) => write!(f, "MP4 atom: {message}"),
			ErrorKind::Layout(message) => write!(f, "Layout: {message}"),
			ErrorKind::StringFromUtf8(ref err) => write!(f, "{err}"),
			ErrorKind::Io(ref err) => write!(f, "{err}"),
			ErrorKind::Alloc(ref err) => write!(f, "{err}"),
			ErrorKind::Infallible(_) => write!(f, "Unreachable"),
		}
	}
}
