use super::constants::{GENRES, ID3V1_TAG_MARKER, genre_index};
use crate::adapter::{Capabilities, EncodeContext};
use crate::error::Result;
use crate::tag::{StandardField, Tag, TagType, parse_number};
use crate::util::text::latin1_encode;

use std::io::Write;

use byteorder::WriteBytesExt;

const CAPABILITIES: Capabilities = Capabilities {
	fields: &[
		StandardField::Title,
		StandardField::Artist,
		StandardField::Album,
		StandardField::RecordingDate,
		StandardField::Comment,
		StandardField::TrackNumber,
		StandardField::Genre,
	],
	additional: false,
	pictures: false,
	chapters: false,
};

pub(crate) fn encode(tag: &Tag, ctx: &mut EncodeContext<'_>) -> Result<Vec<u8>> {
	CAPABILITIES.report_dropped(tag, TagType::Id3v1, ctx.issues);

	if CAPABILITIES
		.fields
		.iter()
		.all(|field| tag.get(*field).is_none_or(str::is_empty))
	{
		log::debug!("ID3v1: Nothing to write");
		return Ok(Vec::new());
	}

	let mut writer = Vec::with_capacity(128);
	writer.write_all(&ID3V1_TAG_MARKER)?;

	for (field, len) in [
		(StandardField::Title, 30),
		(StandardField::Artist, 30),
		(StandardField::Album, 30),
	] {
		writer.write_all(&fixed_text(tag.get(field), len, field, ctx))?;
	}

	let mut year = [0; 4];
	if let Some(tag_year) = tag.year() {
		year.copy_from_slice(format!("{:04}", tag_year.min(9999)).as_bytes());
	}
	writer.write_all(&year)?;

	let comment = fixed_text(tag.comment(), 28, StandardField::Comment, ctx);
	writer.write_all(&comment)?;
	writer.write_u8(0)?;

	let track = match tag.track() {
		Some(track) if track <= u32::from(u8::MAX) => track as u8,
		Some(track) => {
			ctx.issues.dropped(
				TagType::Id3v1,
				format!("Track number {track} does not fit in a byte"),
			);
			0
		},
		None => 0,
	};
	writer.write_u8(track)?;

	writer.write_u8(genre_byte(tag.genre(), ctx))?;

	Ok(writer)
}

fn fixed_text(value: Option<&str>, len: usize, field: StandardField, ctx: &mut EncodeContext<'_>) -> Vec<u8> {
	let mut out = vec![0; len];

	let Some(value) = value else {
		return out;
	};

	let encoded = latin1_encode(value, ctx.options.lossy_text_encoding)
		.take(len)
		.collect::<std::result::Result<Vec<u8>, _>>();

	match encoded {
		Ok(encoded) => out[..encoded.len()].copy_from_slice(&encoded),
		Err(_) => ctx.issues.dropped(
			TagType::Id3v1,
			format!("{field:?} cannot be represented in Latin-1"),
		),
	}

	out
}

fn genre_byte(genre: Option<&str>, ctx: &mut EncodeContext<'_>) -> u8 {
	let Some(genre) = genre.filter(|g| !g.is_empty()) else {
		return 255;
	};

	if let Some(index) = genre_index(genre) {
		return index;
	}

	// "(17)" and "17" are already indices
	let numeric = genre.trim_start_matches('(').trim_end_matches(')');
	if let Some(index) = parse_number(numeric).filter(|i| (*i as usize) < GENRES.len()) {
		if numeric.len() == index.to_string().len() {
			return index as u8;
		}
	}

	ctx.issues.dropped(
		TagType::Id3v1,
		format!("Genre `{genre}` is not in the ID3v1 genre list"),
	);
	255
}

#[cfg(test)]
mod tests {
	use super::encode;
	use crate::adapter::{DecodeContext, EncodeContext};
	use crate::config::{ParseOptions, WriteOptions};
	use crate::file::FileType;
	use crate::id3::v1::read::decode;
	use crate::issue::{IssueLog, Severity};
	use crate::tag::Tag;

	fn encode_with(tag: &Tag, options: WriteOptions, issues: &mut IssueLog) -> Vec<u8> {
		let mut ctx = EncodeContext {
			file_type: FileType::Mpeg,
			options,
			duration_ms: 0,
			issues,
		};

		encode(tag, &mut ctx).unwrap()
	}

	#[test_log::test]
	fn write_then_read() {
		let mut tag = Tag::new();
		tag.set_title("A title that is definitely longer than thirty bytes");
		tag.set_artist("Artist");
		tag.set_recording_date("2004-05-06");
		tag.set_track(12);
		tag.set_genre("(9)");
		tag.set_album_artist("Nowhere to go");

		let mut issues = IssueLog::default();
		let bytes = encode_with(&tag, WriteOptions::new(), &mut issues);
		assert_eq!(bytes.len(), 128);
		assert!(
			issues
				.as_slice()
				.iter()
				.any(|issue| issue.severity() == Severity::Info)
		);

		let read = decode(
			&bytes,
			&mut DecodeContext {
				file_type: FileType::Mpeg,
				options: ParseOptions::new(),
				issues: &mut issues,
			},
		)
		.unwrap();

		assert_eq!(read.title(), Some("A title that is definitely lon"));
		assert_eq!(read.artist(), Some("Artist"));
		assert_eq!(read.year(), Some(2004));
		assert_eq!(read.track(), Some(12));
		assert_eq!(read.genre(), Some("Metal"));
	}

	#[test_log::test]
	fn strict_latin1() {
		let mut tag = Tag::new();
		tag.set_title("日本語");
		tag.set_artist("Artist");

		let mut issues = IssueLog::default();
		let bytes = encode_with(
			&tag,
			WriteOptions::new().lossy_text_encoding(false),
			&mut issues,
		);
		assert!(bytes[3..33].iter().all(|b| *b == 0));

		let bytes = encode_with(&tag, WriteOptions::new(), &mut issues);
		assert_eq!(&bytes[3..6], b"???");
	}

	#[test_log::test]
	fn empty_tag_removes() {
		let mut tag = Tag::new();
		tag.set_lyrics("Only lyrics");

		let mut issues = IssueLog::default();
		assert!(encode_with(&tag, WriteOptions::new(), &mut issues).is_empty());
	}
}
