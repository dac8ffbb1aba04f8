//! Format-agnostic picture handling
//!
//! Pictures are stored exactly as they were read. No tag system transcodes the payload, so an
//! untouched picture is written back byte for byte.

use crate::error::Result;
use crate::macros::err;

use std::fmt::{Debug, Display, Formatter};

/// MIME types for pictures
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub enum MimeType {
	/// PNG image
	Png,
	/// JPEG image
	Jpeg,
	/// TIFF image
	Tiff,
	/// BMP image
	Bmp,
	/// GIF image
	Gif,
	/// Some unknown MIME type
	Unknown(String),
}

impl MimeType {
	/// Get a `MimeType` from a string
	///
	/// # Examples
	///
	/// ```rust
	/// use tagsplice::picture::MimeType;
	///
	/// assert_eq!(MimeType::from_str("image/jpg"), MimeType::Jpeg);
	/// ```
	#[must_use]
	#[allow(clippy::should_implement_trait)] // Infallible in contrast to FromStr
	pub fn from_str(mime_type: &str) -> Self {
		match &*mime_type.to_ascii_lowercase() {
			"image/jpeg" | "image/jpg" => Self::Jpeg,
			"image/png" => Self::Png,
			"image/tiff" => Self::Tiff,
			"image/bmp" => Self::Bmp,
			"image/gif" => Self::Gif,
			_ => Self::Unknown(mime_type.to_owned()),
		}
	}

	/// Get a &str from a `MimeType`
	#[must_use]
	pub fn as_str(&self) -> &str {
		match self {
			MimeType::Jpeg => "image/jpeg",
			MimeType::Png => "image/png",
			MimeType::Tiff => "image/tiff",
			MimeType::Bmp => "image/bmp",
			MimeType::Gif => "image/gif",
			MimeType::Unknown(unknown) => unknown,
		}
	}

	/// Guess the `MimeType` from the first bytes of a picture
	///
	/// # Errors
	///
	/// The signature is not one of the known formats
	pub fn sniff(bytes: &[u8]) -> Result<Self> {
		match bytes {
			[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Ok(MimeType::Png),
			[0xFF, 0xD8, ..] => Ok(MimeType::Jpeg),
			[b'G', b'I', b'F', 0x38, 0x37 | 0x39, b'a', ..] => Ok(MimeType::Gif),
			[b'B', b'M', ..] => Ok(MimeType::Bmp),
			[b'I', b'I', b'*', 0x00, ..] | [b'M', b'M', 0x00, b'*', ..] => Ok(MimeType::Tiff),
			_ => err!(NotAPicture),
		}
	}
}

impl Display for MimeType {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

macro_rules! picture_types {
	($($variant:ident = $value:literal => $ape_suffix:literal),+ $(,)?) => {
		/// The picture type, according to ID3v2 APIC
		#[allow(missing_docs)]
		#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
		#[non_exhaustive]
		pub enum PictureType {
			$($variant,)+
			Undefined(u8),
		}

		impl PictureType {
			/// Get a `u8` from a `PictureType` according to ID3v2 APIC
			pub fn as_u8(&self) -> u8 {
				match self {
					$(Self::$variant => $value,)+
					Self::Undefined(i) => *i,
				}
			}

			/// Get a `PictureType` from a u8 according to ID3v2 APIC
			pub fn from_u8(byte: u8) -> Self {
				match byte {
					$($value => Self::$variant,)+
					i => Self::Undefined(i),
				}
			}

			/// Get an APE item key from a `PictureType`
			pub fn as_ape_key(&self) -> Option<&'static str> {
				match self {
					$(Self::$variant => Some(concat!("Cover Art (", $ape_suffix, ")")),)+
					Self::Undefined(_) => None,
				}
			}

			/// Get a `PictureType` from an APE item key
			///
			/// Returns `None` if `key` is not a cover art key.
			pub fn from_ape_key(key: &str) -> Option<Self> {
				$(
					if key.eq_ignore_ascii_case(concat!("Cover Art (", $ape_suffix, ")")) {
						return Some(Self::$variant);
					}
				)+

				None
			}
		}
	};
}

picture_types! {
	Other = 0 => "Other",
	Icon = 1 => "Png Icon",
	OtherIcon = 2 => "Icon",
	CoverFront = 3 => "Front",
	CoverBack = 4 => "Back",
	Leaflet = 5 => "Leaflet",
	Media = 6 => "Media",
	LeadArtist = 7 => "Lead Artist",
	Artist = 8 => "Artist",
	Conductor = 9 => "Conductor",
	Band = 10 => "Band",
	Composer = 11 => "Composer",
	Lyricist = 12 => "Lyricist",
	RecordingLocation = 13 => "Recording Location",
	DuringRecording = 14 => "During Recording",
	DuringPerformance = 15 => "During Performance",
	ScreenCapture = 16 => "Video Capture",
	BrightFish = 17 => "Fish",
	Illustration = 18 => "Illustration",
	BandLogo = 19 => "Band Logotype",
	PublisherLogo = 20 => "Publisher Logotype",
}

/// An embedded picture
///
/// A picture is exclusively owned by the [`Tag`](crate::tag::Tag) or
/// [`Chapter`](crate::chapter::Chapter) holding it. Cloning a tag deep-copies its pictures.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct Picture {
	pub(crate) pic_type: PictureType,
	pub(crate) mime_type: Option<MimeType>,
	pub(crate) description: Option<String>,
	pub(crate) data: Vec<u8>,
}

impl Debug for Picture {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Picture")
			.field("pic_type", &self.pic_type)
			.field("mime_type", &self.mime_type)
			.field("description", &self.description)
			.field("data", &format!("<{} bytes>", self.data.len()))
			.finish()
	}
}

impl Picture {
	/// Create a new `Picture`
	///
	/// When `mime_type` is `None`, it is sniffed from `data`. Data with an unrecognized signature
	/// is still accepted and simply has no MIME type.
	///
	/// # Examples
	///
	/// ```rust
	/// use tagsplice::picture::{MimeType, Picture, PictureType};
	///
	/// let png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
	/// let picture = Picture::new(PictureType::CoverFront, None, None, png);
	///
	/// assert_eq!(picture.mime_type(), Some(&MimeType::Png));
	/// ```
	pub fn new(
		pic_type: PictureType,
		mime_type: Option<MimeType>,
		description: Option<String>,
		data: Vec<u8>,
	) -> Self {
		let mime_type = mime_type.or_else(|| MimeType::sniff(&data).ok());

		Self {
			pic_type,
			mime_type,
			description,
			data,
		}
	}

	/// Returns the [`PictureType`]
	pub fn pic_type(&self) -> PictureType {
		self.pic_type
	}

	/// Sets the [`PictureType`]
	pub fn set_pic_type(&mut self, pic_type: PictureType) {
		self.pic_type = pic_type
	}

	/// Returns the [`MimeType`]
	pub fn mime_type(&self) -> Option<&MimeType> {
		self.mime_type.as_ref()
	}

	pub(crate) fn mime_str(&self) -> &str {
		match self.mime_type.as_ref() {
			Some(mime_type) => mime_type.as_str(),
			None => "",
		}
	}

	/// Returns the description
	pub fn description(&self) -> Option<&str> {
		self.description.as_deref()
	}

	/// Sets the description
	pub fn set_description(&mut self, description: Option<String>) {
		self.description = description;
	}

	/// Returns the picture data
	pub fn data(&self) -> &[u8] {
		&self.data
	}

	/// Consumes the `Picture`, returning its data
	pub fn into_data(self) -> Vec<u8> {
		self.data
	}

	/// A BLAKE3 digest of the picture data
	///
	/// This is meant for comparison and deduplication, two pictures with the same payload have the
	/// same hash regardless of their type or description.
	pub fn content_hash(&self) -> [u8; 32] {
		*blake3::hash(&self.data).as_bytes()
	}

	/// Whether two pictures would be written identically
	pub(crate) fn same_as(&self, other: &Picture) -> bool {
		self.pic_type == other.pic_type
			&& self.mime_type == other.mime_type
			&& self.description == other.description
			&& self.data.len() == other.data.len()
			&& self.content_hash() == other.content_hash()
	}

	/// Convert a `Picture` to an APE cover art item value
	///
	/// This is the description, a null terminator, and the picture data.
	pub(crate) fn as_ape_bytes(&self) -> Vec<u8> {
		let description = self.description.as_deref().unwrap_or_default();

		let mut data = Vec::with_capacity(description.len() + 1 + self.data.len());
		data.extend_from_slice(description.as_bytes());
		data.push(0);
		data.extend_from_slice(&self.data);

		data
	}

	/// Read a `Picture` from an APE cover art item value
	pub(crate) fn from_ape_bytes(pic_type: PictureType, bytes: &[u8]) -> Result<Self> {
		if bytes.is_empty() {
			err!(NotAPicture);
		}

		let (description, data) = match bytes.iter().position(|b| *b == 0) {
			Some(pos) => (&bytes[..pos], &bytes[pos + 1..]),
			None => (&[][..], bytes),
		};

		let description = (!description.is_empty())
			.then(|| String::from_utf8_lossy(description).into_owned());

		Ok(Self::new(pic_type, None, description, data.to_vec()))
	}
}
