use super::chapter::{CHAPTER_ID, TABLE_OF_CONTENTS_ID, decode_chapter};
use super::content::{LanguageFrame, decode_picture, decode_text_frame, decode_user_text};
use super::frame::{Frame, read_frames};
use super::header::{HEADER_LEN, Id3v2Header, Id3v2Version, skip_extended_header};
use super::synchsafe::resynchronize;
use super::TEXT_FRAMES;
use crate::adapter::{DecodeContext, Residue};
use crate::error::Result;
use crate::id3::v1::constants::GENRES;
use crate::macros::{err, id3v2_err, parse_mode_choice};
use crate::tag::{StandardField, Tag};

const VALUE_SEPARATOR: char = '/';

pub(crate) fn decode(bytes: &[u8], ctx: &mut DecodeContext<'_>) -> Result<(Tag, Residue)> {
	let header = Id3v2Header::parse(&mut &bytes[..])?;

	if header.version == Id3v2Version::V2 {
		log::warn!("ID3v2: Discarding an ID3v2.2 tag");
		id3v2_err!(BadId3v2Version(2, header.minor));
	}

	let body_end = HEADER_LEN as usize + header.size as usize;
	if bytes.len() < body_end {
		err!(SizeMismatch);
	}

	let mut body = &bytes[HEADER_LEN as usize..body_end];

	// ID3v2.3 unsynchronises the entire body, extended header included
	let resynchronised;
	if header.version == Id3v2Version::V3 && header.unsynchronisation {
		resynchronised = resynchronize(body);
		body = &resynchronised;
	}

	if header.extended_header {
		body = skip_extended_header(body, header.version)?;
	}

	let parsing_mode = ctx.options.parsing_mode;
	let frames = read_frames(
		body,
		header.version,
		header.version == Id3v2Version::V4 && header.unsynchronisation,
		parsing_mode,
	)?;

	let mut mapper = FrameMapper::default();
	for frame in frames {
		let id = frame.id.clone();
		if let Err(err) = mapper.map(frame, header.version, ctx) {
			parse_mode_choice!(
				parsing_mode,
				STRICT: return Err(err),
				DEFAULT: log::warn!("ID3v2: Discarding frame `{id}`: {err}")
			);
		}
	}

	Ok(mapper.finish())
}

#[derive(Default)]
struct FrameMapper {
	tag: Tag,
	residue: Vec<Frame>,
	year: Option<String>,
	day_month: Option<String>,
}

impl FrameMapper {
	fn map(&mut self, frame: Frame, version: Id3v2Version, ctx: &mut DecodeContext<'_>) -> Result<()> {
		if let Some((field, _)) = TEXT_FRAMES.iter().find(|(_, id)| *id == frame.id) {
			let mut value = decode_text_frame(&frame.content)?;
			if *field == StandardField::Genre {
				value = resolve_genre(&value);
			}

			self.set_once(*field, value, &frame.id);
			return Ok(());
		}

		match &*frame.id {
			"TRCK" => self.set_pair(
				&frame.content,
				StandardField::TrackNumber,
				StandardField::TrackTotal,
			)?,
			"TPOS" => self.set_pair(
				&frame.content,
				StandardField::DiscNumber,
				StandardField::DiscTotal,
			)?,
			"TDRC" => {
				let value = decode_text_frame(&frame.content)?;
				self.set_once(StandardField::RecordingDate, value, &frame.id);
			},
			"TYER" => self.year = Some(decode_text_frame(&frame.content)?),
			"TDAT" => self.day_month = Some(decode_text_frame(&frame.content)?),
			"TXXX" => {
				let (description, value) = decode_user_text(&frame.content)?;
				self.push_additional(description, value);
			},
			"COMM" | "USLT" => {
				let language_frame = LanguageFrame::decode(&frame.content)?;
				let field = if frame.id == "COMM" {
					StandardField::Comment
				} else {
					StandardField::Lyrics
				};

				// Comments with a description have no field, they are kept as they are
				if (field == StandardField::Comment && !language_frame.description.is_empty())
					|| self.tag.get(field).is_some()
				{
					self.residue.push(frame);
				} else {
					self.tag.set(field, language_frame.text);
				}
			},
			"APIC" if ctx.options.read_cover_art => {
				self.tag.pictures.push(decode_picture(&frame.content)?);
			},
			CHAPTER_ID => {
				let chapter = decode_chapter(&frame.content, version, ctx.options.parsing_mode)?;
				self.tag.chapters.push(chapter);
			},
			// Regenerated from the chapters on write
			TABLE_OF_CONTENTS_ID => {},
			id if id.starts_with('T') => {
				let value = decode_text_frame(&frame.content)?;
				self.push_additional(frame.id, value);
			},
			_ => self.residue.push(frame),
		}

		Ok(())
	}

	fn set_once(&mut self, field: StandardField, value: String, id: &str) {
		if self.tag.get(field).is_some() {
			log::debug!("ID3v2: Discarding duplicate `{id}` frame");
			return;
		}

		self.tag.set(field, value);
	}

	/// Additional keys are unique, the values of repeated frames are joined
	fn push_additional(&mut self, key: String, value: String) {
		match self.tag.additional.iter_mut().find(|(k, _)| *k == key) {
			Some((_, existing)) => {
				log::debug!("ID3v2: Joining the values of repeated `{key}` frames");
				existing.push(VALUE_SEPARATOR);
				existing.push_str(&value);
			},
			None => self.tag.additional.push((key, value)),
		}
	}

	fn set_pair(&mut self, content: &[u8], number: StandardField, total: StandardField) -> Result<()> {
		let value = decode_text_frame(content)?;

		let (n, t) = match value.split_once('/') {
			Some((n, t)) => (n.trim(), Some(t.trim())),
			None => (value.trim(), None),
		};

		if !n.is_empty() {
			self.tag.set(number, n.to_owned());
		}

		if let Some(t) = t.filter(|t| !t.is_empty()) {
			self.tag.set(total, t.to_owned());
		}

		Ok(())
	}

	fn finish(mut self) -> (Tag, Residue) {
		// ID3v2.3 splits the date into a year (YYYY) and a day and month (DDMM)
		if let Some(year) = self.year.take() {
			let date = match self.day_month.take() {
				Some(ddmm) if ddmm.len() == 4 && ddmm.bytes().all(|b| b.is_ascii_digit()) => {
					format!("{year}-{}-{}", &ddmm[2..], &ddmm[..2])
				},
				_ => year,
			};

			if self.tag.get(StandardField::RecordingDate).is_none() {
				self.tag.set(StandardField::RecordingDate, date);
			}
		}

		crate::chapter::sort(&mut self.tag.chapters);

		let residue = if self.residue.is_empty() {
			Residue::None
		} else {
			Residue::Id3v2(self.residue)
		};

		(self.tag, residue)
	}
}

/// Resolve ID3v1 genre references, "(17)", "17" and "(17)Rock" are all "Rock"
fn resolve_genre(value: &str) -> String {
	let (reference, refinement) = match value.strip_prefix('(') {
		Some(rest) => match rest.split_once(')') {
			Some((reference, refinement)) => (reference, refinement),
			None => return value.to_owned(),
		},
		None => (value, ""),
	};

	if !refinement.is_empty() {
		return refinement.to_owned();
	}

	match reference {
		"RX" => String::from("Remix"),
		"CR" => String::from("Cover"),
		_ => match reference.parse::<usize>().ok().and_then(|i| GENRES.get(i)) {
			Some(genre) => (*genre).to_owned(),
			None => value.to_owned(),
		},
	}
}
