use crate::error::{ErrorKind, Result, TagspliceError};
use crate::macros::err;

/// Errors that can occur while encoding text
#[derive(Copy, Clone, Debug)]
pub struct TextEncodingError {
	encoding: TextEncoding,
	valid_up_to: usize,
}

impl TextEncodingError {
	/// The target text encoding
	pub fn encoding(&self) -> TextEncoding {
		self.encoding
	}

	/// The character index in the provided string up to which the encoding was valid
	pub fn valid_up_to(&self) -> usize {
		self.valid_up_to
	}
}

impl core::fmt::Display for TextEncodingError {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		let encoding = match self.encoding {
			TextEncoding::Latin1 => "Latin-1",
			TextEncoding::UTF16 => "UTF-16",
			TextEncoding::UTF8 => "UTF-8",
			TextEncoding::UTF16BE => "UTF-16 BE",
		};

		write!(
			f,
			"invalid {encoding} sequence from index {}",
			self.valid_up_to
		)
	}
}

impl core::error::Error for TextEncodingError {}

/// The text encoding for use in ID3v2 frames
#[derive(Debug, Clone, Eq, PartialEq, Copy, Hash)]
#[repr(u8)]
pub enum TextEncoding {
	/// ISO-8859-1
	Latin1 = 0,
	/// UTF-16 with a byte order mark
	UTF16 = 1,
	/// UTF-16 big endian
	UTF16BE = 2,
	/// UTF-8
	UTF8 = 3,
}

impl TextEncoding {
	/// Get a `TextEncoding` from a u8, must be 0-3 inclusive
	pub fn from_u8(byte: u8) -> Option<Self> {
		match byte {
			0 => Some(Self::Latin1),
			1 => Some(Self::UTF16),
			2 => Some(Self::UTF16BE),
			3 => Some(Self::UTF8),
			_ => None,
		}
	}

	pub(crate) fn verify_latin1(text: &str) -> bool {
		text.chars().all(|c| c as u32 <= 255)
	}

	pub(crate) fn terminator_len(self) -> usize {
		match self {
			Self::Latin1 | Self::UTF8 => 1,
			Self::UTF16 | Self::UTF16BE => 2,
		}
	}

	pub(crate) fn encode(
		self,
		text: &str,
		terminated: bool,
		lossy: bool,
	) -> std::result::Result<Vec<u8>, TextEncodingError> {
		let mut out = match self {
			TextEncoding::Latin1 => {
				latin1_encode(text, lossy).collect::<std::result::Result<Vec<u8>, _>>()?
			},
			TextEncoding::UTF16 => utf16_encode(text, u16::to_le_bytes, true),
			TextEncoding::UTF16BE => utf16_encode(text, u16::to_be_bytes, false),
			TextEncoding::UTF8 => text.as_bytes().to_vec(),
		};

		if terminated {
			out.extend(std::iter::repeat_n(0, self.terminator_len()));
		}

		Ok(out)
	}
}

/// Split `bytes` at the first terminator valid for `encoding`
///
/// Returns the text (without terminator) and the remainder after it. If no terminator exists,
/// the whole input is text.
pub(crate) fn split_terminated(bytes: &[u8], encoding: TextEncoding) -> (&[u8], &[u8]) {
	match encoding {
		TextEncoding::Latin1 | TextEncoding::UTF8 => match bytes.iter().position(|b| *b == 0) {
			Some(pos) => (&bytes[..pos], &bytes[pos + 1..]),
			None => (bytes, &[]),
		},
		TextEncoding::UTF16 | TextEncoding::UTF16BE => {
			let terminator = bytes
				.chunks_exact(2)
				.position(|pair| pair == [0, 0])
				.map(|idx| idx * 2);

			match terminator {
				Some(pos) => (&bytes[..pos], &bytes[pos + 2..]),
				None => (bytes, &[]),
			}
		},
	}
}

/// Decode an entire buffer, ignoring any trailing null characters
pub(crate) fn decode_text(bytes: &[u8], encoding: TextEncoding) -> Result<String> {
	let text = match encoding {
		TextEncoding::Latin1 => latin1_decode(bytes),
		TextEncoding::UTF8 => utf8_decode(bytes.to_vec())?,
		TextEncoding::UTF16BE => utf16_decode_bytes(bytes, u16::from_be_bytes)?,
		TextEncoding::UTF16 => match bytes {
			[] => String::new(),
			[0xFE, 0xFF, rest @ ..] => utf16_decode_bytes(rest, u16::from_be_bytes)?,
			[0xFF, 0xFE, rest @ ..] => utf16_decode_bytes(rest, u16::from_le_bytes)?,
			// Some encoders only write a BOM for the first string of a frame
			_ => {
				log::debug!("UTF-16 string without a byte order mark, assuming little endian");
				utf16_decode_bytes(bytes, u16::from_le_bytes)?
			},
		},
	};

	Ok(text)
}

pub(crate) fn latin1_decode(bytes: &[u8]) -> String {
	let mut text = bytes.iter().map(|c| *c as char).collect::<String>();
	trim_end_nulls(&mut text);
	text
}

pub(crate) fn latin1_encode(
	s: &str,
	lossy: bool,
) -> impl Iterator<Item = std::result::Result<u8, TextEncodingError>> {
	s.chars().enumerate().map(move |(index, c)| {
		if (c as u32) <= 255 {
			Ok(c as u8)
		} else if lossy {
			Ok(b'?')
		} else {
			Err(TextEncodingError {
				encoding: TextEncoding::Latin1,
				valid_up_to: index,
			})
		}
	})
}

pub(crate) fn utf8_decode(bytes: Vec<u8>) -> Result<String> {
	String::from_utf8(bytes)
		.map(|mut text| {
			trim_end_nulls(&mut text);
			text
		})
		.map_err(Into::into)
}

pub(crate) fn utf16_decode_bytes(bytes: &[u8], endianness: fn([u8; 2]) -> u16) -> Result<String> {
	if bytes.len() % 2 != 0 {
		err!(TextDecode("UTF-16 string has an odd length"));
	}

	let words = bytes
		.chunks_exact(2)
		.map(|c| endianness([c[0], c[1]]))
		.collect::<Vec<u16>>();

	String::from_utf16(&words)
		.map(|mut text| {
			trim_end_nulls(&mut text);
			text
		})
		.map_err(|_| TagspliceError::new(ErrorKind::TextDecode("Given an invalid UTF-16 string")))
}

pub(crate) fn trim_end_nulls(text: &mut String) {
	if text.ends_with('\0') {
		let new_len = text.trim_end_matches('\0').len();
		text.truncate(new_len);
	}
}

fn utf16_encode(text: &str, endianness: fn(u16) -> [u8; 2], bom: bool) -> Vec<u8> {
	let mut encoded = Vec::<u8>::new();

	if bom {
		encoded.extend_from_slice(&endianness(0xFEFF_u16));
	}

	for ch in text.encode_utf16() {
		encoded.extend_from_slice(&endianness(ch));
	}

	encoded
}

#[cfg(test)]
mod tests {
	use super::{TextEncoding, decode_text, split_terminated};

	const TEST_STRING: &str = "l\u{00f8}ft\u{00a5}";

	#[test_log::test]
	fn text_decode() {
		let be = decode_text(
			&[
				0xFE, 0xFF, 0x00, 0x6C, 0x00, 0xF8, 0x00, 0x66, 0x00, 0x74, 0x00, 0xA5,
			],
			TextEncoding::UTF16,
		)
		.unwrap();
		let le = decode_text(
			&[
				0xFF, 0xFE, 0x6C, 0x00, 0xF8, 0x00, 0x66, 0x00, 0x74, 0x00, 0xA5, 0x00,
			],
			TextEncoding::UTF16,
		)
		.unwrap();

		assert_eq!(be, TEST_STRING);
		assert_eq!(le, TEST_STRING);

		let latin1 = decode_text(&[0x6C, 0xF8, 0x66, 0x74, 0xA5, 0x00], TextEncoding::Latin1).unwrap();
		assert_eq!(latin1, TEST_STRING);

		assert!(decode_text(&[0x00, 0x6C, 0x00], TextEncoding::UTF16BE).is_err());
	}

	#[test_log::test]
	fn text_encode() {
		let le = TextEncoding::UTF16.encode(TEST_STRING, true, false).unwrap();
		assert_eq!(
			le.as_slice(),
			&[
				0xFF, 0xFE, 0x6C, 0x00, 0xF8, 0x00, 0x66, 0x00, 0x74, 0x00, 0xA5, 0x00, 0x00, 0x00
			]
		);

		let be = TextEncoding::UTF16BE.encode(TEST_STRING, false, false).unwrap();
		assert_eq!(
			be.as_slice(),
			&[0x00, 0x6C, 0x00, 0xF8, 0x00, 0x66, 0x00, 0x74, 0x00, 0xA5]
		);

		assert!(TextEncoding::Latin1.encode("\u{1F600}", false, false).is_err());
		assert_eq!(
			TextEncoding::Latin1.encode("a\u{1F600}", false, true).unwrap(),
			b"a?"
		);
	}

	#[test_log::test]
	fn terminated_split() {
		let (text, rest) = split_terminated(b"desc\0value", TextEncoding::Latin1);
		assert_eq!(text, b"desc");
		assert_eq!(rest, b"value");

		// A zero byte that is part of a UTF-16 code unit is not a terminator
		let (text, rest) = split_terminated(&[0x41, 0x00, 0x00, 0x00, 0x42, 0x00], TextEncoding::UTF16);
		assert_eq!(text, &[0x41, 0x00]);
		assert_eq!(rest, &[0x42, 0x00]);
	}
}
