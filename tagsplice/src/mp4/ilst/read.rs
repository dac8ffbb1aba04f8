use super::data_type::{DataType, WELL_KNOWN_TYPE_SET};
use super::{
	COVER_ITEM, DISC_ITEM, FREEFORM_ITEM, GENRE_ID_ITEM, TEXT_ITEMS, TRACK_ITEM, freeform_key,
	ident_key,
};
use crate::adapter::{DecodeContext, Residue};
use crate::chapter;
use crate::config::ParsingMode;
use crate::error::Result;
use crate::id3::v1::constants::GENRES;
use crate::macros::{err, parse_mode_choice};
use crate::mp4::atom::{Atom, Atoms, FULL_ATOM_HEADER_LEN, find_child, meta_is_full};
use crate::mp4::{Mp4Residue, chpl};
use crate::picture::{Picture, PictureType};
use crate::tag::{StandardField, Tag, TagType};
use crate::util::text::{utf8_decode, utf16_decode_bytes};

use byteorder::{BigEndian, ByteOrder};

/// Decode a complete `udta` atom
pub(crate) fn decode(content: &[u8], ctx: &mut DecodeContext<'_>) -> Result<(Tag, Residue)> {
	let parsing_mode = ctx.options.parsing_mode;

	let Some(udta) = Atoms::new(content, 0, parsing_mode).next().transpose()? else {
		err!(BadAtom("Expected a `udta` atom"));
	};

	if udta.info.ident != *b"udta" {
		err!(BadAtom("Expected a `udta` atom"));
	}

	let mut reader = IlstReader {
		tag: Tag::new(),
		residue: Mp4Residue::default(),
		parsing_mode,
	};

	let mut found_meta = false;
	for child in Atoms::children(&udta, 0, parsing_mode) {
		let child = child?;
		match &child.info.ident {
			b"meta" if !found_meta => {
				found_meta = true;
				reader.read_meta(&child, ctx)?;
			},
			b"chpl" if reader.tag.chapters.is_empty() => match chpl::decode(child.body, parsing_mode) {
				Ok(chapters) => reader.tag.chapters = chapters,
				Err(err) => {
					parse_mode_choice!(
						parsing_mode,
						STRICT: return Err(err),
						DEFAULT: {
							log::warn!("MP4: Discarding `chpl` atom: {err}");
							ctx.issues.warn(
								Some(TagType::Mp4Ilst),
								format!("Discarding unreadable chapters: {err}"),
							);
						}
					);
				},
			},
			b"free" | b"skip" => log::trace!("MP4: Skipping `free` atom in `udta`"),
			_ => reader.residue.atoms.push(child.raw.to_vec()),
		}
	}

	chapter::sort(&mut reader.tag.chapters);

	let residue = if reader.residue.is_empty() {
		Residue::None
	} else {
		Residue::Mp4(reader.residue)
	};

	Ok((reader.tag, residue))
}

struct IlstReader {
	tag: Tag,
	residue: Mp4Residue,
	parsing_mode: ParsingMode,
}

impl IlstReader {
	fn read_meta(&mut self, meta: &Atom<'_>, ctx: &mut DecodeContext<'_>) -> Result<()> {
		let skip = if meta_is_full(meta.body) {
			FULL_ATOM_HEADER_LEN
		} else {
			0
		};

		let Some(ilst) = find_child(Atoms::children(meta, skip, self.parsing_mode), b"ilst")? else {
			log::debug!("MP4: `meta` atom has no `ilst`");
			return Ok(());
		};

		for item in Atoms::children(&ilst, 0, self.parsing_mode) {
			let item = item?;
			if matches!(&item.info.ident, b"free" | b"skip") {
				continue;
			}

			if let Err(err) = self.read_item(&item, ctx) {
				let ident = ident_key(&item.info.ident);
				let parsing_mode = self.parsing_mode;
				parse_mode_choice!(
					parsing_mode,
					STRICT: return Err(err),
					DEFAULT: {
						log::warn!("MP4: Discarding item `{ident}`: {err}");
						ctx.issues.warn(
							Some(TagType::Mp4Ilst),
							format!("Discarding unreadable item `{ident}`"),
						);
					}
				);
			}
		}

		Ok(())
	}

	fn read_item(&mut self, item: &Atom<'_>, ctx: &DecodeContext<'_>) -> Result<()> {
		let ident = item.info.ident;

		if let Some((field, _)) = TEXT_ITEMS.iter().find(|(_, i)| *i == ident) {
			match self.first_text(item, 0)? {
				Some(value) => self.set_once(*field, value, &ident),
				None => self.residue.items.push(item.raw.to_vec()),
			}
			return Ok(());
		}

		match ident {
			TRACK_ITEM => self.set_pair(item, StandardField::TrackNumber, StandardField::TrackTotal)?,
			DISC_ITEM => self.set_pair(item, StandardField::DiscNumber, StandardField::DiscTotal)?,
			GENRE_ID_ITEM => {
				let genre = self
					.data(item, 0)?
					.into_iter()
					.find_map(|(_, payload)| genre_from_id(payload));

				match genre {
					// `©gen` wins over the numeric form
					Some(genre) if self.tag.get(StandardField::Genre).is_none() => {
						self.tag.set(StandardField::Genre, genre.to_owned());
					},
					Some(_) => log::debug!("MP4: Discarding `gnre`, `©gen` is present"),
					None => self.residue.items.push(item.raw.to_vec()),
				}
			},
			COVER_ITEM if ctx.options.read_cover_art => {
				for (data_type, payload) in self.data(item, 0)? {
					let picture = Picture::new(
						PictureType::CoverFront,
						data_type.mime_type(),
						None,
						payload.to_vec(),
					);
					self.tag.pictures.push(picture);
				}
			},
			FREEFORM_ITEM => self.read_freeform(item)?,
			_ => match self.first_text(item, 0)? {
				Some(value) if !self.has_additional(&ident_key(&ident)) => {
					self.tag.additional.push((ident_key(&ident), value));
				},
				_ => self.residue.items.push(item.raw.to_vec()),
			},
		}

		Ok(())
	}

	fn read_freeform(&mut self, item: &Atom<'_>) -> Result<()> {
		let mut mean = None;
		let mut name = None;
		let mut data_start = 0;

		for child in Atoms::children(item, 0, self.parsing_mode) {
			let child = child?;
			let Some(value) = child.body.get(FULL_ATOM_HEADER_LEN..) else {
				err!(BadAtom("Freeform item has a truncated child"));
			};

			match &child.info.ident {
				b"mean" => mean = Some(utf8_decode(value.to_vec())?),
				b"name" => name = Some(utf8_decode(value.to_vec())?),
				_ => break,
			}

			data_start += child.raw.len();
		}

		let (Some(mean), Some(name)) = (mean, name) else {
			err!(BadAtom("Freeform item is missing its `mean` or `name`"));
		};

		let key = freeform_key(&mean, &name);
		match self.first_text(item, data_start)? {
			Some(value) if !self.has_additional(&key) => self.tag.additional.push((key, value)),
			_ => self.residue.items.push(item.raw.to_vec()),
		}

		Ok(())
	}

	/// The `data` atoms of an item, as their type and payload
	fn data<'a>(&self, item: &Atom<'a>, skip: usize) -> Result<Vec<(DataType, &'a [u8])>> {
		let mut values = Vec::new();

		for data in Atoms::children(item, skip, self.parsing_mode) {
			let data = data?;
			if data.info.ident != *b"data" {
				if self.parsing_mode == ParsingMode::Strict {
					err!(BadAtom("Expected atom \"data\" to follow name"));
				}

				log::warn!(
					"MP4: Skipping unexpected atom `{}` in an item",
					ident_key(&data.info.ident)
				);
				continue;
			}

			// Type set and type, then the locale
			if data.body.len() < 8 {
				err!(BadAtom("Data atom is too small"));
			}

			if data.body[0] != WELL_KNOWN_TYPE_SET {
				if self.parsing_mode == ParsingMode::Strict {
					err!(BadAtom("Unknown type set in data atom"));
				}

				log::warn!("MP4: Skipping data atom with an unknown type set");
				continue;
			}

			let data_type = DataType::from(BigEndian::read_u24(&data.body[1..4]));
			values.push((data_type, &data.body[8..]));
		}

		Ok(values)
	}

	/// The first text value of an item, `None` if it holds no text
	fn first_text(&self, item: &Atom<'_>, skip: usize) -> Result<Option<String>> {
		let Some((data_type, payload)) = self.data(item, skip)?.into_iter().next() else {
			return Ok(None);
		};

		let text = match data_type {
			DataType::Utf8 => utf8_decode(payload.to_vec())?,
			DataType::Utf16 => utf16_decode_bytes(payload, u16::from_be_bytes)?,
			_ => return Ok(None),
		};

		Ok(Some(text))
	}

	fn set_once(&mut self, field: StandardField, value: String, ident: &[u8; 4]) {
		if self.tag.get(field).is_some() {
			log::debug!("MP4: Discarding duplicate `{}` item", ident_key(ident));
			return;
		}

		self.tag.set(field, value);
	}

	/// `trkn` and `disk`: 2 reserved bytes, the number, the total, then (for `trkn`) 2 more bytes
	fn set_pair(&mut self, item: &Atom<'_>, number: StandardField, total: StandardField) -> Result<()> {
		let values = self.data(item, 0)?;
		let Some((_, payload)) = values.first() else {
			err!(BadAtom("Number pair item has no data"));
		};

		if payload.len() < 6 {
			err!(BadAtom("Number pair item is too short"));
		}

		for (field, value) in [
			(number, BigEndian::read_u16(&payload[2..4])),
			(total, BigEndian::read_u16(&payload[4..6])),
		] {
			// Zero means unset
			if value != 0 {
				self.tag.set(field, value.to_string());
			}
		}

		Ok(())
	}

	fn has_additional(&self, key: &str) -> bool {
		self.tag.additional.iter().any(|(k, _)| k == key)
	}
}

/// `gnre` holds an ID3v1 genre index, plus one
fn genre_from_id(payload: &[u8]) -> Option<&'static str> {
	let index = match payload {
		[index] => usize::from(*index),
		[high, low] => usize::from(u16::from_be_bytes([*high, *low])),
		_ => return None,
	};

	index.checked_sub(1).and_then(|i| GENRES.get(i)).copied()
}

#[cfg(test)]
mod tests {
	use super::{decode, genre_from_id};
	use crate::adapter::{DecodeContext, Residue};
	use crate::config::{ParseOptions, ParsingMode};
	use crate::file::FileType;
	use crate::issue::IssueLog;
	use crate::mp4::atom::write_atom;
	use crate::picture::MimeType;
	use crate::tag::Tag;

	fn data(data_type: u32, payload: &[u8]) -> Vec<u8> {
		let mut body = data_type.to_be_bytes().to_vec();
		body.extend_from_slice(&[0; 4]);
		body.extend_from_slice(payload);

		let mut atom = Vec::new();
		write_atom(&mut atom, b"data", &body).unwrap();
		atom
	}

	fn item(ident: &[u8; 4], body: &[u8]) -> Vec<u8> {
		let mut atom = Vec::new();
		write_atom(&mut atom, ident, body).unwrap();
		atom
	}

	fn udta(items: &[Vec<u8>], extra: &[Vec<u8>]) -> Vec<u8> {
		let mut meta = vec![0; 4];
		meta.extend(item(b"ilst", &items.concat()));

		let mut body = item(b"meta", &meta);
		body.extend(extra.concat());
		item(b"udta", &body)
	}

	fn read(content: &[u8], options: ParseOptions) -> crate::error::Result<(Tag, Residue)> {
		let mut issues = IssueLog::default();
		decode(
			content,
			&mut DecodeContext {
				file_type: FileType::Mp4,
				options,
				issues: &mut issues,
			},
		)
	}

	fn freeform(mean: &str, name: &str, value: &str) -> Vec<u8> {
		let mut body = item(b"mean", &[&[0; 4], mean.as_bytes()].concat());
		body.extend(item(b"name", &[&[0; 4], name.as_bytes()].concat()));
		body.extend(data(1, value.as_bytes()));
		item(b"----", &body)
	}

	#[test_log::test]
	fn items() {
		let content = udta(
			&[
				item(b"\xA9nam", &data(1, b"Title")),
				item(b"\xA9ART", &data(1, b"Artist")),
				item(b"gnre", &data(0, &[0, 18])),
				item(b"trkn", &data(0, &[0, 0, 0, 3, 0, 12, 0, 0])),
				item(b"disk", &data(0, &[0, 0, 0, 0, 0, 2])),
				item(b"tvsh", &data(1, b"Show")),
				item(b"rtng", &data(21, &[1])),
				freeform("com.apple.iTunes", "MOOD", "Calm"),
				freeform("org.example", "KEY", "Value"),
				item(
					b"covr",
					&[data(14, b"\x89PNG\r\n\x1a\n"), data(13, &[0xFF, 0xD8])].concat(),
				),
			],
			&[item(b"Xtra", b"\0\0\0\0")],
		);

		let (tag, residue) = read(&content, ParseOptions::new()).unwrap();

		assert_eq!(tag.title(), Some("Title"));
		assert_eq!(tag.artist(), Some("Artist"));
		assert_eq!(tag.genre(), Some("Rock"));
		assert_eq!(tag.track(), Some(3));
		assert_eq!(tag.track_total(), Some(12));
		assert_eq!(tag.disk(), None);
		assert_eq!(tag.disk_total(), Some(2));
		assert_eq!(tag.additional("tvsh"), Some("Show"));
		assert_eq!(tag.additional("MOOD"), Some("Calm"));
		assert_eq!(tag.additional("----:org.example:KEY"), Some("Value"));

		assert_eq!(tag.pictures().len(), 2);
		assert_eq!(tag.pictures()[0].mime_type(), Some(&MimeType::Png));
		assert_eq!(tag.pictures()[1].mime_type(), Some(&MimeType::Jpeg));

		let Residue::Mp4(residue) = residue else {
			panic!("Expected MP4 residue");
		};
		assert_eq!(residue.items.len(), 1);
		assert_eq!(&residue.items[0][4..8], b"rtng");
		assert_eq!(residue.atoms.len(), 1);
		assert_eq!(&residue.atoms[0][4..8], b"Xtra");
	}

	#[test_log::test]
	fn cover_art_skipped() {
		let content = udta(&[item(b"covr", &data(13, &[0xFF, 0xD8]))], &[]);

		let (tag, residue) = read(&content, ParseOptions::new().read_cover_art(false)).unwrap();
		assert!(tag.pictures().is_empty());
		assert!(matches!(residue, Residue::Mp4(ref residue) if residue.items.len() == 1));
	}

	#[test_log::test]
	fn bad_items_per_mode() {
		let content = udta(
			&[
				item(b"\xA9nam", &data(1, &[0xFF, 0xFE])),
				item(b"\xA9alb", &data(1, b"Album")),
			],
			&[],
		);

		assert!(read(&content, ParseOptions::new().parsing_mode(ParsingMode::Strict)).is_err());

		let (tag, _) = read(&content, ParseOptions::new()).unwrap();
		assert_eq!(tag.title(), None);
		assert_eq!(tag.album(), Some("Album"));
	}

	#[test_log::test]
	fn quicktime_meta() {
		// `meta` without version and flags
		let ilst = item(b"ilst", &item(b"\xA9nam", &data(1, b"Title")));
		let content = item(b"udta", &item(b"meta", &ilst));

		let (tag, _) = read(&content, ParseOptions::new()).unwrap();
		assert_eq!(tag.title(), Some("Title"));
	}

	#[test_log::test]
	fn genre_ids() {
		assert_eq!(genre_from_id(&[0, 1]), Some("Blues"));
		assert_eq!(genre_from_id(&[18]), Some("Rock"));
		assert_eq!(genre_from_id(&[0, 0]), None);
		assert_eq!(genre_from_id(&[1, 0, 0]), None);
	}
}
