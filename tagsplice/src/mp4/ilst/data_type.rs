use crate::picture::MimeType;

/// The type set of every [`DataType`] read or written
pub(crate) const WELL_KNOWN_TYPE_SET: u8 = 0;

/// The [well known] types of a `data` atom
///
/// [well known]: https://developer.apple.com/documentation/quicktime-file-format/well-known_types
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum DataType {
	/// Reserved for use where no type needs to be indicated
	Reserved,
	/// UTF-8 string without any count or NULL terminator
	Utf8,
	/// A big-endian UTF-16 string
	Utf16,
	/// **DEPRECATED** A GIF image
	Gif,
	/// A JPEG in a JFIF wrapper
	Jpeg,
	/// A PNG in a PNG wrapper
	Png,
	/// A big-endian signed integer in 1,2,3 or 4 bytes
	BeSignedInteger,
	/// A big-endian unsigned integer in 1,2,3 or 4 bytes
	BeUnsignedInteger,
	/// Windows bitmap format graphics
	Bmp,
	/// Anything else, carried as its code
	Other(u32),
}

impl DataType {
	pub(crate) fn for_picture(mime_type: Option<&MimeType>) -> Option<Self> {
		match mime_type {
			// GIF is deprecated
			Some(MimeType::Gif) => Some(DataType::Gif),
			Some(MimeType::Jpeg) => Some(DataType::Jpeg),
			Some(MimeType::Png) => Some(DataType::Png),
			Some(MimeType::Bmp) => Some(DataType::Bmp),
			// Implicit, readers sniff the payload
			None => Some(DataType::Reserved),
			Some(_) => None,
		}
	}

	pub(crate) fn mime_type(self) -> Option<MimeType> {
		match self {
			DataType::Gif => Some(MimeType::Gif),
			DataType::Jpeg => Some(MimeType::Jpeg),
			DataType::Png => Some(MimeType::Png),
			DataType::Bmp => Some(MimeType::Bmp),
			_ => None,
		}
	}
}

impl From<u32> for DataType {
	fn from(value: u32) -> Self {
		match value {
			0 => DataType::Reserved,
			1 => DataType::Utf8,
			2 => DataType::Utf16,
			12 => DataType::Gif,
			13 => DataType::Jpeg,
			14 => DataType::Png,
			21 => DataType::BeSignedInteger,
			22 => DataType::BeUnsignedInteger,
			27 => DataType::Bmp,
			other => DataType::Other(other),
		}
	}
}

impl From<DataType> for u32 {
	fn from(value: DataType) -> Self {
		match value {
			DataType::Reserved => 0,
			DataType::Utf8 => 1,
			DataType::Utf16 => 2,
			DataType::Gif => 12,
			DataType::Jpeg => 13,
			DataType::Png => 14,
			DataType::BeSignedInteger => 21,
			DataType::BeUnsignedInteger => 22,
			DataType::Bmp => 27,
			DataType::Other(code) => code,
		}
	}
}
