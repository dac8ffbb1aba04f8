use super::chapter::write_chapters;
use super::content::{
	LanguageFrame, UNKNOWN_LANGUAGE, encode_picture, encode_text_frame, encode_user_text,
};
use super::frame::write_frame;
use super::header::{Id3v2Header, Id3v2Version};
use super::{SPECIAL_FRAMES, TEXT_FRAMES};
use crate::adapter::{EncodeContext, Residue};
use crate::error::Result;
use crate::macros::err;
use crate::tag::{StandardField, Tag, TagType};

pub(crate) fn encode(tag: &Tag, residue: &Residue, ctx: &mut EncodeContext<'_>) -> Result<Vec<u8>> {
	let version = if ctx.options.use_id3v23 {
		Id3v2Version::V3
	} else {
		Id3v2Version::V4
	};
	let lossy = ctx.options.lossy_text_encoding;

	let mut body = Vec::new();

	for (field, id) in TEXT_FRAMES {
		if let Some(value) = non_empty(tag.get(*field)) {
			write_text(&mut body, id, value, version, lossy)?;
		}
	}

	write_pair(
		&mut body,
		"TRCK",
		tag,
		StandardField::TrackNumber,
		StandardField::TrackTotal,
		version,
	)?;
	write_pair(
		&mut body,
		"TPOS",
		tag,
		StandardField::DiscNumber,
		StandardField::DiscTotal,
		version,
	)?;

	if let Some(date) = non_empty(tag.recording_date()) {
		write_date(&mut body, date, version, lossy, ctx)?;
	}

	for (field, id) in [(StandardField::Comment, "COMM"), (StandardField::Lyrics, "USLT")] {
		if let Some(text) = non_empty(tag.get(field)) {
			let frame = LanguageFrame {
				language: UNKNOWN_LANGUAGE,
				description: String::new(),
				text: text.to_owned(),
			};

			write_frame(&mut body, id, 0, &frame.encode(version, lossy)?, version)?;
		}
	}

	for (key, value) in &tag.additional {
		if is_text_frame_id(key) {
			write_text(&mut body, key, value, version, lossy)?;
		} else {
			let content = encode_user_text(key, value, version, lossy)?;
			write_frame(&mut body, "TXXX", 0, &content, version)?;
		}
	}

	for picture in &tag.pictures {
		write_frame(
			&mut body,
			"APIC",
			0,
			&encode_picture(picture, version, lossy)?,
			version,
		)?;
	}

	write_chapters(
		&mut body,
		&tag.chapters,
		ctx.duration_ms,
		version,
		lossy,
		ctx.options.write_id3v2_chapter_toc,
		ctx.issues,
	)?;

	if let Residue::Id3v2(frames) = residue {
		for frame in frames {
			write_frame(&mut body, &frame.id, frame.status, &frame.content, version)?;
		}
	}

	if body.is_empty() {
		log::debug!("ID3v2: Nothing to write");
		return Ok(body);
	}

	let Ok(size) = u32::try_from(body.len()) else {
		err!(TooMuchData);
	};

	let mut tag_bytes = Vec::new();
	tag_bytes.try_reserve(body.len() + 10)?;
	tag_bytes.extend_from_slice(&Id3v2Header::render(version, size)?);
	tag_bytes.append(&mut body);

	Ok(tag_bytes)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
	value.filter(|v| !v.is_empty())
}

/// Additional fields keyed by a text frame ID are written as that frame, rather than a `TXXX`
fn is_text_frame_id(key: &str) -> bool {
	key.len() == 4
		&& key.starts_with('T')
		&& key.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
		&& !SPECIAL_FRAMES.contains(&key)
		&& !TEXT_FRAMES.iter().any(|(_, id)| *id == key)
}

fn write_text(
	body: &mut Vec<u8>,
	id: &str,
	value: &str,
	version: Id3v2Version,
	lossy: bool,
) -> Result<()> {
	write_frame(body, id, 0, &encode_text_frame(value, version, lossy)?, version)
}

fn write_pair(
	body: &mut Vec<u8>,
	id: &str,
	tag: &Tag,
	number: StandardField,
	total: StandardField,
	version: Id3v2Version,
) -> Result<()> {
	let value = match (non_empty(tag.get(number)), non_empty(tag.get(total))) {
		(Some(n), Some(t)) => format!("{n}/{t}"),
		(Some(n), None) => n.to_owned(),
		// A total alone is written as "0/t"
		(None, Some(t)) => format!("0/{t}"),
		(None, None) => return Ok(()),
	};

	write_text(body, id, &value, version, true)
}

fn write_date(
	body: &mut Vec<u8>,
	date: &str,
	version: Id3v2Version,
	lossy: bool,
	ctx: &mut EncodeContext<'_>,
) -> Result<()> {
	if version == Id3v2Version::V4 {
		return write_text(body, "TDRC", date, version, lossy);
	}

	// ID3v2.3 has no timestamps, only a year (YYYY) and a day and month (DDMM)
	let bytes = date.as_bytes();
	let digits = |range: std::ops::Range<usize>| {
		bytes.get(range).is_some_and(|b| b.iter().all(u8::is_ascii_digit))
	};

	if !digits(0..4) {
		ctx.issues.dropped(
			TagType::Id3v2,
			format!("Recording date `{date}` has no year, ID3v2.3 cannot hold it"),
		);
		return Ok(());
	}

	write_text(body, "TYER", &date[..4], version, lossy)?;

	if bytes.get(4) == Some(&b'-') && bytes.get(7) == Some(&b'-') && digits(5..7) && digits(8..10) {
		let ddmm = format!("{}{}", &date[8..10], &date[5..7]);
		write_text(body, "TDAT", &ddmm, version, lossy)?;
	}

	if bytes.len() > 10 {
		ctx.issues.dropped(
			TagType::Id3v2,
			"ID3v2.3 only keeps the date of a recording time",
		);
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::encode;
	use crate::adapter::{DecodeContext, EncodeContext, Residue};
	use crate::chapter::Chapter;
	use crate::config::{ParseOptions, WriteOptions};
	use crate::file::FileType;
	use crate::id3::v2::frame::Frame;
	use crate::id3::v2::read::decode;
	use crate::issue::IssueLog;
	use crate::picture::{Picture, PictureType};
	use crate::tag::Tag;

	fn write(tag: &Tag, residue: &Residue, options: WriteOptions) -> Vec<u8> {
		let mut issues = IssueLog::default();
		encode(
			tag,
			residue,
			&mut EncodeContext {
				file_type: FileType::Mpeg,
				options,
				duration_ms: 90_000,
				issues: &mut issues,
			},
		)
		.unwrap()
	}

	fn read(bytes: &[u8]) -> (Tag, Residue) {
		let mut issues = IssueLog::default();
		decode(
			bytes,
			&mut DecodeContext {
				file_type: FileType::Mpeg,
				options: ParseOptions::new(),
				issues: &mut issues,
			},
		)
		.unwrap()
	}

	fn full_tag() -> Tag {
		let mut tag = Tag::new();
		tag.set_title("Title \u{65e5}");
		tag.set_artist("Artist");
		tag.set_album("Album");
		tag.set_album_artist("Album Artist");
		tag.set_composer("Composer");
		tag.set_conductor("Conductor");
		tag.set_genre("Synthwave");
		tag.set_copyright("2004 Someone");
		tag.set_publisher("Publisher");
		tag.set_comment("Comment");
		tag.set_lyrics("La la la");
		tag.set_recording_date("2004-05-06");
		tag.set_track(3);
		tag.set_track_total(12);
		tag.set_disk(1);
		tag.set_disk_total(2);
		tag.set_additional("MOOD", "Calm");
		tag.set_additional("TBPM", "120");
		tag.push_picture(Picture::new(
			PictureType::CoverFront,
			None,
			Some(String::from("Front")),
			vec![0xFF, 0xD8, 0xFF, 0xE0, 0, 1, 2, 3],
		));
		tag.set_chapters(vec![
			Chapter::new(0).unique_id("a").title("One").end_ms(30_000),
			Chapter::new(30_000).unique_id("b").title("Two").end_ms(90_000),
		]);
		tag
	}

	#[test_log::test]
	fn roundtrip_both_versions() {
		let tag = full_tag();
		let residue = Residue::Id3v2(vec![Frame::new("PRIV", b"owner\0data".to_vec())]);

		for options in [WriteOptions::new(), WriteOptions::new().use_id3v23(true)] {
			let bytes = write(&tag, &residue, options);
			assert_eq!(bytes[3], if options.use_id3v23 { 3 } else { 4 });

			let (read_tag, read_residue) = read(&bytes);
			assert_eq!(read_tag, tag);
			assert_eq!(read_residue, residue);
		}
	}

	#[test_log::test]
	fn empty_tag_writes_nothing() {
		let mut tag = Tag::new();
		tag.clear_title();

		assert!(write(&tag, &Residue::None, WriteOptions::new()).is_empty());
	}

	#[test_log::test]
	fn v23_drops_time_of_day() {
		let mut tag = Tag::new();
		tag.set_recording_date("2004-05-06T12:30");

		let mut issues = IssueLog::default();
		let bytes = encode(
			&tag,
			&Residue::None,
			&mut EncodeContext {
				file_type: FileType::Mpeg,
				options: WriteOptions::new().use_id3v23(true),
				duration_ms: 0,
				issues: &mut issues,
			},
		)
		.unwrap();

		assert_eq!(issues.as_slice().len(), 1);
		assert_eq!(read(&bytes).0.recording_date(), Some("2004-05-06"));
	}

	#[test_log::test]
	fn open_chapter_ends_at_duration() {
		let mut tag = Tag::new();
		tag.set_chapters(vec![Chapter::new(0), Chapter::new(45_000)]);

		let (read_tag, _) = read(&write(&tag, &Residue::None, WriteOptions::new()));
		let ends = read_tag
			.chapters()
			.iter()
			.map(Chapter::get_end_ms)
			.collect::<Vec<_>>();
		assert_eq!(ends, [Some(45_000), Some(90_000)]);
	}
}
