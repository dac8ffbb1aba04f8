//! Frame bodies with a field mapping

use super::header::Id3v2Version;
use crate::error::Result;
use crate::macros::{err, id3v2_err};
use crate::picture::{MimeType, Picture, PictureType};
use crate::util::text::{TextEncoding, decode_text, latin1_decode, split_terminated};

/// Used for comments and lyrics, when no language is known
pub(crate) const UNKNOWN_LANGUAGE: [u8; 3] = *b"XXX";

/// Separator for frames holding several values
pub(crate) const VALUE_SEPARATOR: &str = "/";

/// The encoding to write `text` with
///
/// ID3v2.3 has no UTF-8, so Latin-1 is used when possible and UTF-16 otherwise.
pub(crate) fn encoding_for(version: Id3v2Version, text: &str) -> TextEncoding {
	match version {
		Id3v2Version::V4 => TextEncoding::UTF8,
		_ if TextEncoding::verify_latin1(text) => TextEncoding::Latin1,
		_ => TextEncoding::UTF16,
	}
}

fn read_encoding(content: &[u8]) -> Result<(TextEncoding, &[u8])> {
	let Some((first, rest)) = content.split_first() else {
		id3v2_err!(BadFrameLength);
	};

	match TextEncoding::from_u8(*first) {
		Some(encoding) => Ok((encoding, rest)),
		None => err!(TextDecode("Found invalid encoding")),
	}
}

/// `T***` frames (other than `TXXX`), multiple values are joined
pub(crate) fn decode_text_frame(content: &[u8]) -> Result<String> {
	let (encoding, mut rest) = read_encoding(content)?;

	let mut values = Vec::new();
	while !rest.is_empty() {
		let (value, remaining) = split_terminated(rest, encoding);
		values.push(decode_text(value, encoding)?);
		rest = remaining;
	}

	values.retain(|value| !value.is_empty());
	Ok(values.join(VALUE_SEPARATOR))
}

pub(crate) fn encode_text_frame(text: &str, version: Id3v2Version, lossy: bool) -> Result<Vec<u8>> {
	let encoding = encoding_for(version, text);

	let mut content = vec![encoding as u8];
	content.extend(encoding.encode(text, false, lossy)?);
	Ok(content)
}

/// `TXXX`, a description and a value
pub(crate) fn decode_user_text(content: &[u8]) -> Result<(String, String)> {
	let (encoding, rest) = read_encoding(content)?;
	let (description, value) = split_terminated(rest, encoding);

	Ok((
		decode_text(description, encoding)?,
		decode_user_value(value, encoding)?,
	))
}

// The value of a `TXXX` may hold several null-separated strings as well
fn decode_user_value(mut value: &[u8], encoding: TextEncoding) -> Result<String> {
	let mut values = Vec::new();
	while !value.is_empty() {
		let (part, rest) = split_terminated(value, encoding);
		values.push(decode_text(part, encoding)?);
		value = rest;
	}

	Ok(values.join(VALUE_SEPARATOR))
}

pub(crate) fn encode_user_text(
	description: &str,
	value: &str,
	version: Id3v2Version,
	lossy: bool,
) -> Result<Vec<u8>> {
	let encoding = match version {
		Id3v2Version::V4 => TextEncoding::UTF8,
		_ => encoding_for(version, &format!("{description}{value}")),
	};

	let mut content = vec![encoding as u8];
	content.extend(encoding.encode(description, true, lossy)?);
	content.extend(encoding.encode(value, false, lossy)?);
	Ok(content)
}

/// `COMM` and `USLT`: a language, a description, and the text
pub(crate) struct LanguageFrame {
	pub(crate) language: [u8; 3],
	pub(crate) description: String,
	pub(crate) text: String,
}

impl LanguageFrame {
	pub(crate) fn decode(content: &[u8]) -> Result<Self> {
		let (encoding, rest) = read_encoding(content)?;
		if rest.len() < 3 {
			id3v2_err!(BadFrameLength);
		}

		let language = [rest[0], rest[1], rest[2]];
		let (description, text) = split_terminated(&rest[3..], encoding);

		Ok(Self {
			language,
			description: decode_text(description, encoding)?,
			text: decode_text(text, encoding)?,
		})
	}

	pub(crate) fn encode(&self, version: Id3v2Version, lossy: bool) -> Result<Vec<u8>> {
		let encoding = encoding_for(version, &format!("{}{}", self.description, self.text));

		let mut content = vec![encoding as u8];
		content.extend_from_slice(&self.language);
		content.extend(encoding.encode(&self.description, true, lossy)?);
		content.extend(encoding.encode(&self.text, false, lossy)?);
		Ok(content)
	}
}

/// `APIC`
pub(crate) fn decode_picture(content: &[u8]) -> Result<Picture> {
	let (encoding, rest) = read_encoding(content)?;

	let (mime_type, rest) = split_terminated(rest, TextEncoding::Latin1);
	let Some((pic_type, rest)) = rest.split_first() else {
		id3v2_err!(BadFrameLength);
	};

	let (description, data) = split_terminated(rest, encoding);
	if data.is_empty() {
		err!(NotAPicture);
	}

	let mime_type = latin1_decode(mime_type);
	let mime_type = (!mime_type.is_empty()).then(|| MimeType::from_str(&mime_type));

	let description = decode_text(description, encoding)?;
	let description = (!description.is_empty()).then_some(description);

	Ok(Picture::new(
		PictureType::from_u8(*pic_type),
		mime_type,
		description,
		data.to_vec(),
	))
}

pub(crate) fn encode_picture(picture: &Picture, version: Id3v2Version, lossy: bool) -> Result<Vec<u8>> {
	let description = picture.description().unwrap_or_default();
	let encoding = encoding_for(version, description);

	let mut content = Vec::new();
	content.try_reserve(picture.data().len() + description.len() + 32)?;

	content.push(encoding as u8);
	content.extend(TextEncoding::Latin1.encode(picture.mime_str(), true, true)?);
	content.push(picture.pic_type().as_u8());
	content.extend(encoding.encode(description, true, lossy)?);
	content.extend_from_slice(picture.data());

	Ok(content)
}

#[cfg(test)]
mod tests {
	use super::{
		LanguageFrame, UNKNOWN_LANGUAGE, decode_picture, decode_text_frame, decode_user_text,
		encode_picture, encode_text_frame, encode_user_text,
	};
	use crate::id3::v2::header::Id3v2Version;
	use crate::picture::{MimeType, Picture, PictureType};

	#[test_log::test]
	fn multiple_values_are_joined() {
		assert_eq!(decode_text_frame(b"\x03Foo\0Bar\0").unwrap(), "Foo/Bar");
		assert_eq!(decode_text_frame(b"\x00Single").unwrap(), "Single");
		assert!(decode_text_frame(b"\x09Bad").is_err());
		assert!(decode_text_frame(b"").is_err());
	}

	#[test_log::test]
	fn text_encodings_per_version() {
		assert_eq!(
			encode_text_frame("Caf\u{e9}", Id3v2Version::V3, false).unwrap(),
			b"\x00Caf\xe9"
		);

		let utf16 = encode_text_frame("\u{65e5}", Id3v2Version::V3, false).unwrap();
		assert_eq!(utf16, [0x01, 0xFF, 0xFE, 0xE5, 0x65]);

		let utf8 = encode_text_frame("\u{65e5}", Id3v2Version::V4, false).unwrap();
		assert_eq!(utf8[0], 0x03);
		assert_eq!(decode_text_frame(&utf8).unwrap(), "\u{65e5}");
	}

	#[test_log::test]
	fn user_text() {
		for version in [Id3v2Version::V3, Id3v2Version::V4] {
			let content = encode_user_text("MOOD", "Calm", version, false).unwrap();
			assert_eq!(
				decode_user_text(&content).unwrap(),
				(String::from("MOOD"), String::from("Calm"))
			);
		}
	}

	#[test_log::test]
	fn comment() {
		let frame = LanguageFrame {
			language: UNKNOWN_LANGUAGE,
			description: String::new(),
			text: String::from("A comment"),
		};

		let content = frame.encode(Id3v2Version::V3, false).unwrap();
		assert_eq!(&content[..], b"\x00XXX\0A comment");

		let read = LanguageFrame::decode(&content).unwrap();
		assert_eq!(read.language, UNKNOWN_LANGUAGE);
		assert!(read.description.is_empty());
		assert_eq!(read.text, "A comment");
	}

	#[test_log::test]
	fn picture() {
		let png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0xFF, 0];
		let picture = Picture::new(
			PictureType::CoverBack,
			None,
			Some(String::from("\u{65e5}")),
			png,
		);

		for version in [Id3v2Version::V3, Id3v2Version::V4] {
			let content = encode_picture(&picture, version, false).unwrap();
			let read = decode_picture(&content).unwrap();

			assert_eq!(read, picture);
			assert_eq!(read.mime_type(), Some(&MimeType::Png));
		}
	}
}
