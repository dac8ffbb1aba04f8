//! `CHAP` and `CTOC` frames
//!
//! A `CHAP` frame holds the element ID, the start and end times in milliseconds, the start and end
//! byte offsets (`0xFFFFFFFF` when unset) and a list of embedded frames. Only `TIT2`, `TIT3` and
//! `APIC` are kept from those. Chapter pictures are read even when top-level cover art is skipped,
//! since nothing else would carry them over to the next write.
//!
//! A single top-level, ordered `CTOC` lists every chapter. It is regenerated from the chapters on
//! every write.

use super::content::{decode_picture, decode_text_frame, encode_picture, encode_text_frame};
use super::frame::{read_frames, write_frame};
use super::header::Id3v2Version;
use crate::chapter::{self, Chapter};
use crate::config::ParsingMode;
use crate::error::Result;
use crate::issue::IssueLog;
use crate::macros::id3v2_err;
use crate::tag::TagType;
use crate::util::text::{TextEncoding, decode_text, split_terminated};

use byteorder::{BigEndian, ByteOrder};

pub(crate) const CHAPTER_ID: &str = "CHAP";
pub(crate) const TABLE_OF_CONTENTS_ID: &str = "CTOC";

const TOC_ELEMENT_ID: &str = "toc";
const UNSET_OFFSET: u32 = u32::MAX;

const TOC_TOP_LEVEL: u8 = 0x02;
const TOC_ORDERED: u8 = 0x01;

pub(crate) fn decode_chapter(
	content: &[u8],
	version: Id3v2Version,
	parsing_mode: ParsingMode,
) -> Result<Chapter> {
	let (element_id, rest) = split_terminated(content, TextEncoding::Latin1);
	if rest.len() < 16 {
		id3v2_err!(BadChapter("`CHAP` frame is too short"));
	}

	let start_ms = BigEndian::read_u32(&rest[..4]);
	let end_ms = BigEndian::read_u32(&rest[4..8]);
	let start_offset = BigEndian::read_u32(&rest[8..12]);
	let end_offset = BigEndian::read_u32(&rest[12..16]);

	if end_ms < start_ms {
		id3v2_err!(BadChapter("`CHAP` frame ends before it starts"));
	}

	let mut chapter = Chapter::new(start_ms)
		.unique_id(decode_text(element_id, TextEncoding::Latin1)?)
		.end_ms(end_ms);

	if start_offset != UNSET_OFFSET || end_offset != UNSET_OFFSET {
		chapter.start_offset = (start_offset != UNSET_OFFSET).then_some(start_offset);
		chapter.end_offset = (end_offset != UNSET_OFFSET).then_some(end_offset);
		chapter.use_offset = true;
	}

	// Subframes never use the tag-level unsynchronisation
	for frame in read_frames(&rest[16..], version, false, parsing_mode)? {
		match &*frame.id {
			"TIT2" => chapter.title = Some(decode_text_frame(&frame.content)?),
			"TIT3" => chapter.subtitle = Some(decode_text_frame(&frame.content)?),
			"APIC" => chapter.picture = Some(decode_picture(&frame.content)?),
			other => log::debug!("ID3v2: Discarding `{other}` frame embedded in a chapter"),
		}
	}

	Ok(chapter)
}

/// Write every chapter, followed by a table of contents when `toc` is set
pub(crate) fn write_chapters(
	writer: &mut Vec<u8>,
	chapters: &[Chapter],
	duration_ms: u32,
	version: Id3v2Version,
	lossy: bool,
	toc: bool,
	issues: &mut IssueLog,
) -> Result<()> {
	let mut ids = Vec::with_capacity(chapters.len());

	for index in 0..chapters.len() {
		let id = chapter::resolve_id(chapters, index);
		let end_ms = chapter::resolve_end(chapters, index, duration_ms);

		let content = encode_chapter(&chapters[index], &id, end_ms, version, lossy)?;
		write_frame(writer, CHAPTER_ID, 0, &content, version)?;

		ids.push(id);
	}

	if !toc || ids.is_empty() {
		return Ok(());
	}

	// The entry count is a single byte
	if ids.len() > usize::from(u8::MAX) {
		issues.dropped(
			TagType::Id3v2,
			format!(
				"Only the first {} of {} chapters fit in the table of contents",
				u8::MAX,
				ids.len()
			),
		);
		ids.truncate(usize::from(u8::MAX));
	}

	let mut content = Vec::new();
	content.extend(TextEncoding::Latin1.encode(TOC_ELEMENT_ID, true, true)?);
	content.push(TOC_TOP_LEVEL | TOC_ORDERED);
	content.push(ids.len() as u8);
	for id in &ids {
		content.extend(TextEncoding::Latin1.encode(id, true, lossy)?);
	}

	write_frame(writer, TABLE_OF_CONTENTS_ID, 0, &content, version)
}

fn encode_chapter(
	chapter: &Chapter,
	id: &str,
	end_ms: u32,
	version: Id3v2Version,
	lossy: bool,
) -> Result<Vec<u8>> {
	let mut content = TextEncoding::Latin1.encode(id, true, lossy)?;

	content.extend_from_slice(&chapter.start_ms.to_be_bytes());
	content.extend_from_slice(&end_ms.to_be_bytes());

	let (start_offset, end_offset) = if chapter.use_offset {
		(
			chapter.start_offset.unwrap_or(UNSET_OFFSET),
			chapter.end_offset.unwrap_or(UNSET_OFFSET),
		)
	} else {
		(UNSET_OFFSET, UNSET_OFFSET)
	};
	content.extend_from_slice(&start_offset.to_be_bytes());
	content.extend_from_slice(&end_offset.to_be_bytes());

	if let Some(title) = &chapter.title {
		write_frame(
			&mut content,
			"TIT2",
			0,
			&encode_text_frame(title, version, lossy)?,
			version,
		)?;
	}

	if let Some(subtitle) = &chapter.subtitle {
		write_frame(
			&mut content,
			"TIT3",
			0,
			&encode_text_frame(subtitle, version, lossy)?,
			version,
		)?;
	}

	if let Some(picture) = &chapter.picture {
		write_frame(
			&mut content,
			"APIC",
			0,
			&encode_picture(picture, version, lossy)?,
			version,
		)?;
	}

	Ok(content)
}
