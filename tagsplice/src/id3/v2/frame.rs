//! Raw frame handling
//!
//! Frames are read into their plain content: unsynchronisation is undone, compressed frames are
//! inflated and the extra header data (group identifier, data length indicator) is discarded. Only
//! the status flags survive, everything else is recalculated when the frame is written.

use super::header::Id3v2Version;
use super::synchsafe::{SynchsafeInteger, resynchronize};
use crate::config::ParsingMode;
use crate::error::Result;
use crate::macros::{id3v2_err, parse_mode_choice};

use byteorder::{BigEndian, ByteOrder};

pub(crate) const FRAME_HEADER_LEN: usize = 10;

// ID3v2.4 status flags, ID3v2.3 keeps them one bit higher
const STATUS_FLAGS_V4: u16 = 0x7000;

const V3_COMPRESSION: u16 = 0x0080;
const V3_ENCRYPTION: u16 = 0x0040;
const V3_GROUPING: u16 = 0x0020;

const V4_GROUPING: u16 = 0x0040;
const V4_COMPRESSION: u16 = 0x0008;
const V4_ENCRYPTION: u16 = 0x0004;
const V4_UNSYNCHRONISATION: u16 = 0x0002;
const V4_DATA_LENGTH_INDICATOR: u16 = 0x0001;

/// A single frame, with its content fully decoded
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Frame {
	pub(crate) id: String,
	/// Status flags (tag alter preservation, file alter preservation, read only), ID3v2.4 layout
	pub(crate) status: u16,
	pub(crate) content: Vec<u8>,
}

impl Frame {
	#[cfg(test)]
	pub(crate) fn new(id: &str, content: Vec<u8>) -> Self {
		Self {
			id: id.to_owned(),
			status: 0,
			content,
		}
	}
}

fn valid_frame_id(id: &[u8]) -> bool {
	id.iter().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

/// Read every frame in `body`, stopping at the first padding byte
///
/// `unsynchronised` is the tag-level flag, which in ID3v2.4 applies to every frame.
pub(crate) fn read_frames(
	mut body: &[u8],
	version: Id3v2Version,
	unsynchronised: bool,
	parsing_mode: ParsingMode,
) -> Result<Vec<Frame>> {
	let mut frames = Vec::new();

	while body.len() >= FRAME_HEADER_LEN {
		// Padding
		if body[0] == 0 {
			break;
		}

		let id = &body[..4];
		let size = BigEndian::read_u32(&body[4..8]);
		let flags = BigEndian::read_u16(&body[8..10]);
		body = &body[FRAME_HEADER_LEN..];

		let size = match version {
			Id3v2Version::V4 => size.unsynch(),
			_ => size,
		} as usize;

		if size > body.len() {
			parse_mode_choice!(
				parsing_mode,
				STRICT: id3v2_err!(BadFrameLength),
				DEFAULT: {
					log::warn!("ID3v2: Frame overruns the tag, discarding the remaining frames");
					break;
				}
			);
		}

		let (raw, rest) = body.split_at(size);
		body = rest;

		if !valid_frame_id(id) {
			parse_mode_choice!(
				parsing_mode,
				STRICT: id3v2_err!(BadFrameId(id.to_vec())),
				DEFAULT: {
					log::warn!("ID3v2: Skipping a frame with an invalid ID: {id:x?}");
					continue;
				}
			);
		}

		// Checked above
		let id = id.iter().map(|c| char::from(*c)).collect::<String>();

		if size == 0 {
			log::debug!("ID3v2: Skipping empty frame `{id}`");
			continue;
		}

		let decoded = match version {
			Id3v2Version::V4 => decode_v4(&id, flags, raw, unsynchronised),
			_ => decode_v3(&id, flags, raw),
		};

		match decoded {
			Ok(Some(frame)) => frames.push(frame),
			Ok(None) => {},
			Err(err) => parse_mode_choice!(
				parsing_mode,
				STRICT: return Err(err),
				DEFAULT: log::warn!("ID3v2: Skipping frame `{id}`: {err}")
			),
		}
	}

	Ok(frames)
}

fn decode_v3(id: &str, flags: u16, mut raw: &[u8]) -> Result<Option<Frame>> {
	let compressed = flags & V3_COMPRESSION != 0;

	if compressed {
		// Decompressed size
		raw = take(raw, 4)?;
	}

	if flags & V3_ENCRYPTION != 0 {
		log::warn!("ID3v2: Dropping encrypted frame `{id}`");
		return Ok(None);
	}

	if flags & V3_GROUPING != 0 {
		raw = take(raw, 1)?;
	}

	let content = if compressed {
		decompress(raw)?
	} else {
		raw.to_vec()
	};

	Ok(Some(Frame {
		id: id.to_owned(),
		status: (flags >> 1) & STATUS_FLAGS_V4,
		content,
	}))
}

fn decode_v4(id: &str, flags: u16, mut raw: &[u8], tag_unsynchronised: bool) -> Result<Option<Frame>> {
	if flags & V4_GROUPING != 0 {
		raw = take(raw, 1)?;
	}

	if flags & V4_ENCRYPTION != 0 {
		log::warn!("ID3v2: Dropping encrypted frame `{id}`");
		return Ok(None);
	}

	let compressed = flags & V4_COMPRESSION != 0;

	if flags & V4_DATA_LENGTH_INDICATOR != 0 {
		raw = take(raw, 4)?;
	} else if compressed {
		// Plenty of taggers forget the flag, but still write the indicator
		log::debug!("ID3v2: Compressed frame `{id}` has no data length indicator flag");
		raw = take(raw, 4)?;
	}

	let resynchronised;
	let mut raw: &[u8] = raw;
	if tag_unsynchronised || flags & V4_UNSYNCHRONISATION != 0 {
		resynchronised = resynchronize(raw);
		raw = &resynchronised;
	}

	let content = if compressed {
		decompress(raw)?
	} else {
		raw.to_vec()
	};

	Ok(Some(Frame {
		id: id.to_owned(),
		status: flags & STATUS_FLAGS_V4,
		content,
	}))
}

fn take(raw: &[u8], n: usize) -> Result<&[u8]> {
	if raw.len() <= n {
		id3v2_err!(BadFrameLength);
	}

	Ok(&raw[n..])
}

#[cfg(feature = "id3v2_compression_support")]
fn decompress(raw: &[u8]) -> Result<Vec<u8>> {
	use crate::error::{Id3v2Error, Id3v2ErrorKind};
	use std::io::Read;

	let mut content = Vec::new();
	flate2::read::ZlibDecoder::new(raw)
		.read_to_end(&mut content)
		.map_err(|err| Id3v2Error::new(Id3v2ErrorKind::Decompression(err)))?;

	Ok(content)
}

#[cfg(not(feature = "id3v2_compression_support"))]
fn decompress(_: &[u8]) -> Result<Vec<u8>> {
	id3v2_err!(CompressedFrameEncountered)
}

/// Append a frame to `writer`
pub(crate) fn write_frame(
	writer: &mut Vec<u8>,
	id: &str,
	status: u16,
	content: &[u8],
	version: Id3v2Version,
) -> Result<()> {
	let Ok(len) = u32::try_from(content.len()) else {
		id3v2_err!(BadFrameLength);
	};

	let (size, flags) = match version {
		Id3v2Version::V3 => (len, (status & STATUS_FLAGS_V4) << 1),
		_ => match len.synch() {
			Some(size) => (size, status & STATUS_FLAGS_V4),
			None => id3v2_err!(BadFrameLength),
		},
	};

	writer.extend_from_slice(id.as_bytes());
	writer.extend_from_slice(&size.to_be_bytes());
	writer.extend_from_slice(&flags.to_be_bytes());
	writer.extend_from_slice(content);

	Ok(())
}
