use super::header::{ApeHeader, HEADER_LEN};
use super::item::{Item, ItemKind, verify_key};
use super::{DISC_KEY, FIELD_KEYS, TRACK_KEY};
use crate::adapter::{DecodeContext, Residue};
use crate::config::ParsingMode;
use crate::error::Result;
use crate::macros::{decode_err, err, parse_mode_choice};
use crate::picture::{Picture, PictureType};
use crate::tag::{StandardField, Tag};
use crate::util::text::utf8_decode;

use byteorder::{ByteOrder, LittleEndian};

/// Multiple values of a text item are separated by a null
const VALUE_SEPARATOR: &str = "/";

/// Decode a complete APE tag, with its footer and optional header
pub(crate) fn decode(content: &[u8], ctx: &mut DecodeContext<'_>) -> Result<(Tag, Residue)> {
	let parsing_mode = ctx.options.parsing_mode;
	let items = read_items(content, parsing_mode)?;

	let mut tag = Tag::new();
	let mut residue = Vec::new();

	for item in items {
		if let Err(err) = map_item(&mut tag, &mut residue, item, ctx) {
			parse_mode_choice!(
				parsing_mode,
				STRICT: return Err(err),
				DEFAULT: log::warn!("APE: Discarding item: {err}")
			);
		}
	}

	let residue = if residue.is_empty() {
		Residue::None
	} else {
		Residue::Ape(residue)
	};

	Ok((tag, residue))
}

fn read_items(content: &[u8], parsing_mode: ParsingMode) -> Result<Vec<Item>> {
	let footer_len = HEADER_LEN as usize;
	if content.len() < footer_len {
		err!(SizeMismatch);
	}

	let footer = ApeHeader::parse(&content[content.len() - footer_len..])?;
	if footer.full_tag_size() != content.len() as u64 {
		err!(SizeMismatch);
	}

	let header_len = if footer.has_header() { footer_len } else { 0 };
	let mut data = &content[header_len..content.len() - footer_len];

	let mut items = Vec::new();
	for _ in 0..footer.item_count {
		// Value size, flags, a key of at least two characters and its terminator
		if data.len() < 11 {
			break;
		}

		let value_size = LittleEndian::read_u32(&data[..4]) as usize;
		let flags = LittleEndian::read_u32(&data[4..8]);
		data = &data[8..];

		let Some(key_len) = data.iter().position(|b| *b == 0) else {
			decode_err!(@BAIL Ape, "APE tag item has an unterminated key");
		};

		let key = utf8_decode(data[..key_len].to_vec())
			.map_err(|_| decode_err!(Ape, "APE tag item contains a non UTF-8 key"))?;
		data = &data[key_len + 1..];

		if value_size > data.len() {
			err!(SizeMismatch);
		}

		let (value, rest) = data.split_at(value_size);
		data = rest;

		if !verify_key(&key) {
			parse_mode_choice!(
				parsing_mode,
				STRICT: decode_err!(@BAIL Ape, "APE tag item contains an illegal key"),
				DEFAULT: {
					log::warn!("APE: Encountered invalid item key '{key}'");
					continue;
				}
			);
		}

		if value.is_empty() {
			log::debug!("APE: Skipping empty item '{key}'");
			continue;
		}

		items.push(Item::from_flags(key, flags, value.to_vec())?);
	}

	Ok(items)
}

fn map_item(
	tag: &mut Tag,
	residue: &mut Vec<Item>,
	item: Item,
	ctx: &mut DecodeContext<'_>,
) -> Result<()> {
	match item.kind {
		ItemKind::Binary if ctx.options.read_cover_art => {
			match PictureType::from_ape_key(&item.key) {
				Some(pic_type) => tag
					.pictures
					.push(Picture::from_ape_bytes(pic_type, &item.value)?),
				None => residue.push(item),
			}
		},
		ItemKind::Binary | ItemKind::Locator => residue.push(item),
		ItemKind::Text => {
			let value = utf8_decode(item.value.clone())
				.map_err(|_| decode_err!(Ape, "Failed to convert text item into a UTF-8 string"))?;
			let value = value
				.split('\0')
				.filter(|v| !v.is_empty())
				.collect::<Vec<_>>()
				.join(VALUE_SEPARATOR);

			if let Some((field, _)) = FIELD_KEYS.iter().find(|(_, key)| item.key_matches(key)) {
				set_once(tag, *field, value);
			} else if item.key_matches(TRACK_KEY) {
				set_pair(tag, &value, StandardField::TrackNumber, StandardField::TrackTotal);
			} else if item.key_matches(DISC_KEY) {
				set_pair(tag, &value, StandardField::DiscNumber, StandardField::DiscTotal);
			} else if tag
				.additional
				.iter()
				.any(|(key, _)| key.eq_ignore_ascii_case(&item.key))
			{
				log::debug!("APE: Discarding duplicate item '{}'", item.key);
			} else {
				tag.additional.push((item.key, value));
			}
		},
	}

	Ok(())
}

fn set_once(tag: &mut Tag, field: StandardField, value: String) {
	if tag.get(field).is_some() {
		log::debug!("APE: Discarding duplicate {field:?} item");
		return;
	}

	tag.set(field, value);
}

fn set_pair(tag: &mut Tag, value: &str, number: StandardField, total: StandardField) {
	let (n, t) = match value.split_once('/') {
		Some((n, t)) => (n.trim(), Some(t.trim())),
		None => (value.trim(), None),
	};

	if !n.is_empty() && n != "0" {
		tag.set(number, n.to_owned());
	}

	if let Some(t) = t.filter(|t| !t.is_empty()) {
		tag.set(total, t.to_owned());
	}
}
