use super::constants::{GENRES, ID3V1_TAG_MARKER};
use crate::adapter::DecodeContext;
use crate::config::ParsingMode;
use crate::error::Result;
use crate::macros::{err, parse_mode_choice};
use crate::tag::{StandardField, Tag};
use crate::util::text::latin1_decode;

pub(crate) fn decode(bytes: &[u8], ctx: &mut DecodeContext<'_>) -> Result<Tag> {
	let Ok(bytes) = <&[u8; 128]>::try_from(bytes) else {
		err!(SizeMismatch);
	};

	if bytes[..3] != ID3V1_TAG_MARKER {
		err!(FakeTag);
	}

	let body = &bytes[3..];
	let mut tag = Tag::new();

	let mut set = |field, value: Option<String>| {
		if let Some(value) = value {
			tag.set(field, value);
		}
	};

	set(StandardField::Title, decode_text(&body[..30]));
	set(StandardField::Artist, decode_text(&body[30..60]));
	set(StandardField::Album, decode_text(&body[60..90]));
	set(
		StandardField::RecordingDate,
		parse_year(&body[90..94], ctx.options.parsing_mode)?,
	);

	// ID3v1.1 steals the last two bytes of the comment: a null, then a non-zero track number
	let comment_range = if body[122] == 0 && body[123] != 0 {
		set(StandardField::TrackNumber, Some(body[123].to_string()));
		94..122
	} else {
		94..124
	};

	set(StandardField::Comment, decode_text(&body[comment_range]));

	if let Some(genre) = GENRES.get(usize::from(body[124])) {
		tag.set(StandardField::Genre, (*genre).to_string());
	}

	Ok(tag)
}

fn decode_text(data: &[u8]) -> Option<String> {
	let end = data.iter().position(|b| *b == 0).unwrap_or(data.len());
	if end == 0 {
		return None;
	}

	if data[end..].iter().any(|b| *b != 0) {
		log::debug!("ID3v1 text field contains trailing junk, skipping");
	}

	let text = latin1_decode(&data[..end]);
	let trimmed = text.trim_end();
	(!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_year(input: &[u8], parsing_mode: ParsingMode) -> Result<Option<String>> {
	if input.iter().all(|b| *b == 0) {
		return Ok(None);
	}

	if input.iter().all(u8::is_ascii_digit) {
		return Ok(Some(latin1_decode(input)));
	}

	parse_mode_choice!(
		parsing_mode,
		STRICT: err!(TextDecode("ID3v1 year field contains non-digit characters")),
		DEFAULT: {
			log::debug!("ID3v1 year field contains non-digit characters, skipping");
			Ok(None)
		}
	)
}
