//! `LIST INFO` and `disp` chunks
//!
//! ## Field mapping
//!
//! | Field          | Item   |
//! |----------------|--------|
//! | Title          | `INAM` |
//! | Artist         | `IART` |
//! | Album          | `IPRD` |
//! | Comment        | `ICMT` |
//! | Recording date | `ICRD` |
//! | Genre          | `IGNR` |
//! | Track / total  | `ITRK` |
//! | Copyright      | `ICOP` |
//! | Composer       | `IMUS` |
//!
//! Any other item is an additional field keyed by its identifier. Each `disp` chunk becomes the
//! additional fields `disp[N].type` and `disp[N].value`, with `N` counting from 0 in file order.
//! Text is held as is, other clipboard formats are base64 encoded.

use crate::adapter::{Capabilities, DecodeContext, EncodeContext};
use crate::config::ParsingMode;
use crate::error::Result;
use crate::iff::{Chunks, read_body, write_chunk};
use crate::macros::{decode_err, parse_mode_choice};
use crate::tag::{StandardField, Tag, TagType};
use crate::util::text::{TextEncoding, latin1_decode, latin1_encode, trim_end_nulls};

use std::collections::BTreeMap;
use std::io::Cursor;

use data_encoding::BASE64;

const ITEMS: &[(StandardField, &[u8; 4])] = &[
	(StandardField::Title, b"INAM"),
	(StandardField::Artist, b"IART"),
	(StandardField::Album, b"IPRD"),
	(StandardField::Comment, b"ICMT"),
	(StandardField::RecordingDate, b"ICRD"),
	(StandardField::Genre, b"IGNR"),
	(StandardField::Copyright, b"ICOP"),
	(StandardField::Composer, b"IMUS"),
];

const TRACK_ITEM: &[u8; 4] = b"ITRK";

const CAPABILITIES: Capabilities = Capabilities {
	fields: &[
		StandardField::Title,
		StandardField::Artist,
		StandardField::Album,
		StandardField::Comment,
		StandardField::RecordingDate,
		StandardField::Genre,
		StandardField::Copyright,
		StandardField::Composer,
		StandardField::TrackNumber,
		StandardField::TrackTotal,
	],
	additional: true,
	pictures: false,
	chapters: false,
};

/// Windows clipboard formats seen in `disp` chunks
const CLIPBOARD_FORMATS: &[(u32, &str)] = &[
	(1, "CF_TEXT"),
	(2, "CF_BITMAP"),
	(3, "CF_METAFILE"),
	(8, "CF_DIB"),
	(9, "CF_PALETTE"),
];

const CF_TEXT: u32 = 1;

fn format_name(code: u32) -> String {
	CLIPBOARD_FORMATS
		.iter()
		.find(|(c, _)| *c == code)
		.map_or_else(|| code.to_string(), |(_, name)| (*name).to_owned())
}

fn format_code(name: &str) -> Option<u32> {
	CLIPBOARD_FORMATS
		.iter()
		.find(|(_, n)| n.eq_ignore_ascii_case(name))
		.map(|(code, _)| *code)
		.or_else(|| name.parse().ok())
}

/// INFO item identifiers are 4 uppercase letters or digits
pub(crate) fn verify_key(key: &str) -> bool {
	key.len() == 4
		&& key
			.chars()
			.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

/// A `disp[N].type` or `disp[N].value` key
fn parse_disp_key(key: &str) -> Option<(usize, bool)> {
	let rest = key.strip_prefix("disp[")?;
	let (index, part) = rest.split_once("].")?;
	let index = index.parse().ok()?;
	match part {
		"type" => Some((index, true)),
		"value" => Some((index, false)),
		_ => None,
	}
}

/// UTF-8, or Latin-1 for anything that isn't
fn decode_value(bytes: &[u8]) -> String {
	match std::str::from_utf8(bytes) {
		Ok(text) => {
			let mut text = text.to_owned();
			trim_end_nulls(&mut text);
			text
		},
		Err(_) => latin1_decode(bytes),
	}
}

/// Decode a run of `LIST INFO` and `disp` chunks
pub(crate) fn decode(content: &[u8], ctx: &mut DecodeContext<'_>) -> Result<Tag> {
	let parsing_mode = ctx.options.parsing_mode;

	let mut tag = Tag::new();
	let mut disp_count = 0;

	let mut reader = Cursor::new(content);
	let mut chunks = Chunks::new(0, content.len() as u64, parsing_mode);
	while let Some(chunk) = chunks.next(&mut reader)? {
		let body = read_body(&mut reader, &chunk)?;

		if chunk.is(b"disp") {
			read_disp(&mut tag, disp_count, &body);
			disp_count += 1;
			continue;
		}

		if chunk.is(b"LIST") && body.starts_with(b"INFO") {
			read_info(&mut tag, &body[4..], parsing_mode)?;
			continue;
		}

		log::debug!(
			"WAV: Skipping unexpected `{}` chunk in the INFO run",
			String::from_utf8_lossy(&chunk.fourcc)
		);
	}

	Ok(tag)
}

fn read_info(tag: &mut Tag, list: &[u8], parsing_mode: ParsingMode) -> Result<()> {
	let mut reader = Cursor::new(list);
	let mut items = Chunks::new(0, list.len() as u64, parsing_mode);

	while let Some(item) = items.next(&mut reader)? {
		let Ok(key) = std::str::from_utf8(&item.fourcc) else {
			parse_mode_choice!(
				parsing_mode,
				STRICT: decode_err!(@BAIL Wav, "Non UTF-8 item key found in RIFF INFO"),
				DEFAULT: continue
			);
		};

		if !verify_key(key) {
			parse_mode_choice!(
				parsing_mode,
				STRICT: decode_err!(@BAIL Wav, "RIFF INFO item key contains invalid characters"),
				DEFAULT: {
					log::warn!("WAV: Skipping INFO item with invalid key `{key}`");
					continue;
				}
			);
		}

		let value = decode_value(&read_body(&mut reader, &item)?);

		if &item.fourcc == TRACK_ITEM {
			set_track(tag, &value);
		} else if let Some((field, _)) = ITEMS.iter().find(|(_, k)| *k == &item.fourcc) {
			if tag.get(*field).is_none() {
				tag.set(*field, value);
			}
		} else if tag.additional(key).is_none() {
			tag.additional.push((key.to_owned(), value));
		} else {
			log::debug!("WAV: Discarding duplicate INFO item `{key}`");
		}
	}

	Ok(())
}

fn set_track(tag: &mut Tag, value: &str) {
	let (number, total) = match value.split_once('/') {
		Some((n, t)) => (n.trim(), Some(t.trim())),
		None => (value.trim(), None),
	};

	if !number.is_empty() {
		tag.set(StandardField::TrackNumber, number.to_owned());
	}

	if let Some(total) = total.filter(|t| !t.is_empty()) {
		tag.set(StandardField::TrackTotal, total.to_owned());
	}
}

fn read_disp(tag: &mut Tag, index: usize, body: &[u8]) {
	if body.len() < 4 {
		log::warn!("WAV: Skipping a `disp` chunk with no type");
		return;
	}

	let code = u32::from_le_bytes([body[0], body[1], body[2], body[3]]);
	let data = &body[4..];

	let value = if code == CF_TEXT {
		latin1_decode(data)
	} else {
		BASE64.encode(data)
	};

	tag.additional
		.push((format!("disp[{index}].type"), format_name(code)));
	tag.additional.push((format!("disp[{index}].value"), value));
}

#[derive(Default)]
struct Disp<'a> {
	format: Option<&'a str>,
	value: Option<&'a str>,
}

/// Encode a `LIST INFO` chunk followed by the `disp` chunks
pub(crate) fn encode(tag: &Tag, ctx: &mut EncodeContext<'_>) -> Result<Vec<u8>> {
	CAPABILITIES.report_dropped(tag, TagType::RiffInfo, ctx.issues);

	let mut list = b"INFO".to_vec();

	for (field, key) in ITEMS {
		if let Some(value) = tag.get(*field) {
			write_item(&mut list, key, value);
		}
	}

	let track = match (
		tag.get(StandardField::TrackNumber),
		tag.get(StandardField::TrackTotal),
	) {
		(Some(n), Some(t)) if !t.is_empty() => Some(format!("{n}/{t}")),
		(Some(n), _) => Some(n.to_owned()),
		(None, Some(_)) => {
			ctx.issues
				.dropped(TagType::RiffInfo, "`ITRK` can't hold a track total on its own");
			None
		},
		(None, None) => None,
	};

	if let Some(track) = track {
		write_item(&mut list, TRACK_ITEM, &track);
	}

	let mut disps = BTreeMap::<usize, Disp<'_>>::new();
	for (key, value) in &tag.additional {
		if let Some((index, is_type)) = parse_disp_key(key) {
			let disp = disps.entry(index).or_default();
			if is_type {
				disp.format = Some(value.as_str());
			} else {
				disp.value = Some(value.as_str());
			}

			continue;
		}

		if !verify_key(key) {
			ctx.issues
				.dropped(TagType::RiffInfo, format!("`{key}` is not a valid INFO item key"));
			continue;
		}

		let fourcc = key.as_bytes();
		if fourcc == TRACK_ITEM || ITEMS.iter().any(|(_, k)| &k[..] == fourcc) {
			ctx.issues.dropped(
				TagType::RiffInfo,
				format!("`{key}` collides with a standard item"),
			);
			continue;
		}

		let mut ident = [0; 4];
		ident.copy_from_slice(fourcc);
		write_item(&mut list, &ident, value);
	}

	let mut out = Vec::new();
	if list.len() > 4 {
		write_chunk(&mut out, b"LIST", &list);
	}

	for (index, disp) in disps {
		if let Some(body) = disp_body(index, &disp, ctx) {
			write_chunk(&mut out, b"disp", &body);
		}
	}

	if out.is_empty() {
		log::debug!("WAV: No INFO to write");
	}

	Ok(out)
}

fn write_item(list: &mut Vec<u8>, key: &[u8; 4], value: &str) {
	let mut value = value.as_bytes().to_vec();
	value.push(0);
	write_chunk(list, key, &value);
}

fn disp_body(index: usize, disp: &Disp<'_>, ctx: &mut EncodeContext<'_>) -> Option<Vec<u8>> {
	let Some(value) = disp.value else {
		ctx.issues
			.dropped(TagType::RiffInfo, format!("`disp[{index}]` has no value"));
		return None;
	};

	// Plain text unless stated otherwise
	let code = match disp.format {
		Some(format) => {
			let Some(code) = format_code(format) else {
				ctx.issues.dropped(
					TagType::RiffInfo,
					format!("`disp[{index}]` has an unknown type `{format}`"),
				);
				return None;
			};
			code
		},
		None => CF_TEXT,
	};

	let mut body = code.to_le_bytes().to_vec();
	if code == CF_TEXT {
		if !TextEncoding::verify_latin1(value) {
			ctx.issues.dropped(
				TagType::RiffInfo,
				format!("`disp[{index}]` text is not Latin-1, replacing characters"),
			);
		}

		body.extend(latin1_encode(value, true).flatten());
		body.push(0);
		return Some(body);
	}

	match BASE64.decode(value.as_bytes()) {
		Ok(data) => {
			body.extend(data);
			Some(body)
		},
		Err(err) => {
			ctx.issues.dropped(
				TagType::RiffInfo,
				format!("`disp[{index}]` value is not valid base64: {err}"),
			);
			None
		},
	}
}

#[cfg(test)]
mod tests {
	use super::{decode, encode, verify_key};
	use crate::adapter::{DecodeContext, EncodeContext};
	use crate::config::{ParseOptions, ParsingMode, WriteOptions};
	use crate::file::FileType;
	use crate::iff::wav::tests::info_list;
	use crate::iff::write_chunk;
	use crate::issue::IssueLog;
	use crate::tag::Tag;

	fn read_with(content: &[u8], parsing_mode: ParsingMode) -> crate::error::Result<Tag> {
		let mut issues = IssueLog::default();
		let mut ctx = DecodeContext {
			file_type: FileType::Wav,
			options: ParseOptions::new().parsing_mode(parsing_mode),
			issues: &mut issues,
		};
		decode(content, &mut ctx)
	}

	fn write(tag: &Tag, issues: &mut IssueLog) -> Vec<u8> {
		let mut ctx = EncodeContext {
			file_type: FileType::Wav,
			options: WriteOptions::new(),
			duration_ms: 0,
			issues,
		};
		encode(tag, &mut ctx).unwrap()
	}

	#[test_log::test]
	fn keys() {
		assert!(verify_key("INAM"));
		assert!(verify_key("IAS1"));
		assert!(!verify_key("inam"));
		assert!(!verify_key("INA"));
	}

	#[test_log::test]
	fn roundtrip() {
		let mut tag = Tag::new();
		tag.set_title("Title");
		tag.set_artist("Artist");
		tag.set_track(3);
		tag.set_track_total(12);
		tag.clear_comment();
		tag.set_additional("ISFT", "Encoder");
		tag.set_additional("disp[0].type", "CF_TEXT");
		tag.set_additional("disp[0].value", "Caf\u{e9}");
		tag.set_additional("disp[1].type", "CF_DIB");
		tag.set_additional("disp[1].value", "AAEC");

		let mut issues = IssueLog::default();
		let content = write(&tag, &mut issues);
		assert!(issues.as_slice().is_empty());

		// `disp` chunks after the list
		let list_len = u32::from_le_bytes([content[4], content[5], content[6], content[7]]);
		assert_eq!(&content[8 + list_len as usize..][..4], b"disp");

		let read = read_with(&content, ParsingMode::Strict).unwrap();
		assert_eq!(read, tag);
	}

	#[test_log::test]
	fn unrepresentable_content() {
		let mut tag = Tag::new();
		tag.set_conductor("Conductor");
		tag.set_track_total(5);
		tag.set_additional("lower", "Nope");
		tag.set_additional("INAM", "Clash");
		tag.set_additional("disp[0].type", "CF_BITMAP");
		tag.set_additional("disp[0].value", "not base64!");
		tag.set_additional("disp[1].type", "CF_TEXT");

		let mut issues = IssueLog::default();
		let content = write(&tag, &mut issues);
		assert_eq!(issues.as_slice().len(), 6);
		assert!(content.is_empty());
	}

	#[test_log::test]
	fn empty_tag_writes_nothing() {
		assert!(write(&Tag::new(), &mut IssueLog::default()).is_empty());
	}

	#[test_log::test]
	fn invalid_keys_per_mode() {
		let mut content = Vec::new();
		write_chunk(
			&mut content,
			b"LIST",
			&info_list(&[(b"inam", "x"), (b"IART", "Artist")]),
		);

		assert!(read_with(&content, ParsingMode::Strict).is_err());

		let tag = read_with(&content, ParsingMode::BestAttempt).unwrap();
		assert_eq!(tag.artist(), Some("Artist"));
		assert!(tag.additional_fields().is_empty());
	}

	#[test_log::test]
	fn legacy_values() {
		let mut content = Vec::new();
		let mut list = b"INFO".to_vec();
		write_chunk(&mut list, b"INAM", b"Caf\xE9\0");
		write_chunk(&mut content, b"LIST", &list);

		let mut disp = 2u32.to_le_bytes().to_vec();
		disp.extend_from_slice(&[0, 1, 2]);
		write_chunk(&mut content, b"disp", &disp);

		let tag = read_with(&content, ParsingMode::Strict).unwrap();
		assert_eq!(tag.title(), Some("Caf\u{e9}"));
		assert_eq!(tag.additional("disp[0].type"), Some("CF_BITMAP"));
		assert_eq!(tag.additional("disp[0].value"), Some("AAEC"));
	}
}
