//! Nero chapters (`udta.chpl`)
//!
//! A `chpl` atom only holds a start time and a title per chapter. Times are in units of 100ns.

use crate::chapter::{self, Chapter};
use crate::config::ParsingMode;
use crate::error::Result;
use crate::issue::IssueLog;
use crate::macros::{err, parse_mode_choice};
use crate::tag::TagType;
use crate::util::text::utf8_decode;

use byteorder::{BigEndian, ByteOrder};

const UNITS_PER_MS: u64 = 10_000;
const MAX_CHAPTERS: usize = u8::MAX as usize;
const MAX_TITLE_LEN: usize = u8::MAX as usize;

/// Decode the body of a `chpl` atom
pub(crate) fn decode(body: &[u8], parsing_mode: ParsingMode) -> Result<Vec<Chapter>> {
	let Some(&version) = body.first() else {
		err!(BadAtom("`chpl` atom is empty"));
	};

	// Version and flags, then 4 reserved bytes from version 1 onwards
	let header_len = if version >= 1 { 8 } else { 4 };
	let Some(&count) = body.get(header_len) else {
		err!(BadAtom("`chpl` atom is missing its chapter count"));
	};

	let mut data = &body[header_len + 1..];
	let mut chapters = Vec::with_capacity(usize::from(count));

	for _ in 0..count {
		// Start time and title length
		if data.len() < 9 {
			parse_mode_choice!(
				parsing_mode,
				STRICT: err!(BadAtom("`chpl` atom is shorter than its chapter count")),
				DEFAULT: {
					log::warn!("MP4: `chpl` atom ends early, keeping {} chapter(s)", chapters.len());
					break;
				}
			);
		}

		let start = BigEndian::read_u64(&data[..8]);
		let title_len = usize::from(data[8]);
		data = &data[9..];

		if data.len() < title_len {
			err!(SizeMismatch);
		}

		let (title, rest) = data.split_at(title_len);
		data = rest;

		let Ok(start_ms) = u32::try_from(start / UNITS_PER_MS) else {
			err!(BadAtom("Chapter start time is out of range"));
		};

		let mut chapter = Chapter::new(start_ms);
		if !title.is_empty() {
			chapter.title = Some(utf8_decode(title.to_vec())?);
		}

		chapters.push(chapter);
	}

	log::trace!("MP4: Read {} chapter(s) from `chpl`", chapters.len());

	chapter::sort(&mut chapters);
	Ok(chapters)
}

/// Encode `chapters` into the body of a `chpl` atom
///
/// Nothing but start times and titles survives, losing anything else is recorded in `issues`.
pub(crate) fn encode(chapters: &[Chapter], duration_ms: u32, issues: &mut IssueLog) -> Vec<u8> {
	let kept = if chapters.len() > MAX_CHAPTERS {
		issues.dropped(
			TagType::Mp4Ilst,
			format!(
				"`chpl` holds at most {MAX_CHAPTERS} chapters, dropping {}",
				chapters.len() - MAX_CHAPTERS
			),
		);
		&chapters[..MAX_CHAPTERS]
	} else {
		chapters
	};

	let lossy = kept.iter().enumerate().any(|(index, chapter)| {
		!chapter.unique_id.is_empty()
			|| chapter.subtitle.is_some()
			|| chapter.picture.is_some()
			|| chapter.start_offset.is_some()
			|| chapter.end_offset.is_some()
			|| chapter
				.end_ms
				.is_some_and(|end| end != implied_end(kept, index, duration_ms))
	});

	if lossy {
		issues.dropped(
			TagType::Mp4Ilst,
			"`chpl` only holds chapter start times and titles, dropping the rest",
		);
	}

	// Version 1, no flags, 4 reserved bytes and the count
	let mut body = vec![1, 0, 0, 0, 0, 0, 0, 0, kept.len() as u8];

	for chapter in kept {
		body.extend_from_slice(&(u64::from(chapter.start_ms) * UNITS_PER_MS).to_be_bytes());

		let title = chapter.title.as_deref().unwrap_or_default();
		let title = truncate(title, MAX_TITLE_LEN);
		if title.len() < chapter.title.as_ref().map_or(0, String::len) {
			issues.dropped(
				TagType::Mp4Ilst,
				format!("Truncating the title of the chapter at {}ms", chapter.start_ms),
			);
		}

		body.push(title.len() as u8);
		body.extend_from_slice(title.as_bytes());
	}

	body
}

/// The end time a chapter gets when it has none of its own
fn implied_end(chapters: &[Chapter], index: usize, duration_ms: u32) -> u32 {
	chapters
		.get(index + 1)
		.map_or(duration_ms, |next| next.start_ms)
		.max(chapters[index].start_ms)
}

/// The longest prefix of `text` that fits in `max` bytes
fn truncate(text: &str, max: usize) -> &str {
	if text.len() <= max {
		return text;
	}

	let mut end = max;
	while !text.is_char_boundary(end) {
		end -= 1;
	}

	&text[..end]
}
