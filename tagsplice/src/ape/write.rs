use super::header::{
	ApeHeader, FLAG_HAS_FOOTER, FLAG_HAS_HEADER, FLAG_IS_HEADER, HEADER_LEN, VERSION_2,
};
use super::item::{Item, verify_key};
use super::{DISC_KEY, FIELD_KEYS, TRACK_KEY};
use crate::adapter::{Capabilities, EncodeContext, Residue};
use crate::error::Result;
use crate::macros::err;
use crate::picture::PictureType;
use crate::tag::{StandardField, Tag, TagType};

const CAPABILITIES: Capabilities = Capabilities {
	fields: &StandardField::ALL,
	additional: true,
	pictures: true,
	chapters: false,
};

pub(crate) fn encode(tag: &Tag, residue: &Residue, ctx: &mut EncodeContext<'_>) -> Result<Vec<u8>> {
	CAPABILITIES.report_dropped(tag, TagType::Ape, ctx.issues);

	let items = collect_items(tag, residue, ctx);

	// Unnecessary to write anything if there's no metadata
	if items.is_empty() {
		log::debug!("APE: Nothing to write");
		return Ok(Vec::new());
	}

	let mut body = Vec::new();
	for item in &items {
		let Ok(value_len) = u32::try_from(item.value.len()) else {
			err!(TooMuchData);
		};

		body.extend_from_slice(&value_len.to_le_bytes());
		body.extend_from_slice(&item.flags().to_le_bytes());
		body.extend_from_slice(item.key.as_bytes());
		body.push(0);
		body.extend_from_slice(&item.value);
	}

	// The size includes the footer, but not the header
	let Ok(size) = u32::try_from(body.len() as u64 + HEADER_LEN) else {
		err!(TooMuchData);
	};

	let mut footer = ApeHeader {
		version: VERSION_2,
		size,
		item_count: items.len() as u32,
		flags: FLAG_HAS_HEADER | FLAG_HAS_FOOTER,
	};

	let mut tag_bytes = Vec::new();
	tag_bytes.try_reserve(body.len() + 2 * HEADER_LEN as usize)?;

	footer.flags |= FLAG_IS_HEADER;
	tag_bytes.extend_from_slice(&footer.render());
	footer.flags &= !FLAG_IS_HEADER;

	tag_bytes.append(&mut body);
	tag_bytes.extend_from_slice(&footer.render());

	Ok(tag_bytes)
}

fn collect_items(tag: &Tag, residue: &Residue, ctx: &mut EncodeContext<'_>) -> Vec<Item> {
	let mut items = Vec::new();

	for (field, key) in FIELD_KEYS {
		if let Some(value) = tag.get(*field).filter(|v| !v.is_empty()) {
			items.push(Item::text(key, value));
		}
	}

	for (key, number, total) in [
		(TRACK_KEY, StandardField::TrackNumber, StandardField::TrackTotal),
		(DISC_KEY, StandardField::DiscNumber, StandardField::DiscTotal),
	] {
		let number = tag.get(number).filter(|v| !v.is_empty());
		let total = tag.get(total).filter(|v| !v.is_empty());

		let value = match (number, total) {
			(Some(n), Some(t)) => format!("{n}/{t}"),
			(Some(n), None) => n.to_owned(),
			(None, Some(t)) => format!("0/{t}"),
			(None, None) => continue,
		};

		items.push(Item::text(key, &value));
	}

	for (key, value) in &tag.additional {
		if !verify_key(key) {
			ctx.issues
				.dropped(TagType::Ape, format!("`{key}` is not a valid item key"));
			continue;
		}

		if is_reserved(key) {
			ctx.issues
				.dropped(TagType::Ape, format!("`{key}` collides with a standard item"));
			continue;
		}

		items.push(Item::text(key, value));
	}

	for picture in &tag.pictures {
		let Some(key) = picture.pic_type().as_ape_key() else {
			ctx.issues.dropped(
				TagType::Ape,
				format!("Picture type {} has no item key", picture.pic_type().as_u8()),
			);
			continue;
		};

		// Keys are unique, so there is room for one picture of each type
		if items.iter().any(|item| item.key_matches(key)) {
			ctx.issues
				.dropped(TagType::Ape, format!("Dropping a second `{key}` picture"));
			continue;
		}

		items.push(Item::binary(key, picture.as_ape_bytes()));
	}

	if let Residue::Ape(residue) = residue {
		for item in residue {
			if items.iter().any(|existing| existing.key_matches(&item.key)) {
				log::debug!("APE: Retained item '{}' was replaced", item.key);
				continue;
			}

			items.push(item.clone());
		}
	}

	items
}

/// Keys that belong to a standard field or a picture
fn is_reserved(key: &str) -> bool {
	FIELD_KEYS.iter().any(|(_, k)| k.eq_ignore_ascii_case(key))
		|| TRACK_KEY.eq_ignore_ascii_case(key)
		|| DISC_KEY.eq_ignore_ascii_case(key)
		|| PictureType::from_ape_key(key).is_some()
}

#[cfg(test)]
mod tests {
	use super::encode;
	use crate::adapter::{DecodeContext, EncodeContext, Residue};
	use crate::ape::item::{Item, ItemKind};
	use crate::ape::read::decode;
	use crate::config::{ParseOptions, WriteOptions};
	use crate::file::FileType;
	use crate::issue::IssueLog;
	use crate::picture::{Picture, PictureType};
	use crate::tag::Tag;

	fn write(tag: &Tag, residue: &Residue, issues: &mut IssueLog) -> Vec<u8> {
		encode(
			tag,
			residue,
			&mut EncodeContext {
				file_type: FileType::Ape,
				options: WriteOptions::new(),
				duration_ms: 0,
				issues,
			},
		)
		.unwrap()
	}

	fn read(bytes: &[u8]) -> (Tag, Residue) {
		let mut issues = IssueLog::default();
		decode(
			bytes,
			&mut DecodeContext {
				file_type: FileType::Ape,
				options: ParseOptions::new(),
				issues: &mut issues,
			},
		)
		.unwrap()
	}

	#[test_log::test]
	fn roundtrip() {
		let mut tag = Tag::new();
		tag.set_title("Title");
		tag.set_album_artist("Album Artist");
		tag.set_recording_date("2004-05-06");
		tag.set_disk(1);
		tag.set_disk_total(2);
		tag.set_lyrics("La la la");
		tag.set_additional("MOOD", "Calm");
		tag.push_picture(Picture::new(
			PictureType::CoverBack,
			None,
			Some(String::from("Back")),
			vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 1],
		));

		let residue = Residue::Ape(vec![Item {
			key: String::from("Related"),
			kind: ItemKind::Locator,
			value: b"http://example.com".to_vec(),
			read_only: true,
		}]);

		let mut issues = IssueLog::default();
		let bytes = write(&tag, &residue, &mut issues);
		assert!(issues.as_slice().is_empty());

		// Header and footer only differ in their flags
		assert_eq!(&bytes[..20], &bytes[bytes.len() - 32..bytes.len() - 12]);

		let (read_tag, read_residue) = read(&bytes);
		assert_eq!(read_tag, tag);
		assert_eq!(read_residue, residue);
	}

	#[test_log::test]
	fn unrepresentable_content() {
		let mut tag = Tag::new();
		tag.set_additional("ID3", "Nope");
		tag.set_additional("Title", "Clash");

		let picture = Picture::new(PictureType::CoverFront, None, None, vec![0xFF, 0xD8, 0xFF]);
		tag.push_picture(picture.clone());
		tag.push_picture(picture);

		let mut issues = IssueLog::default();
		let bytes = write(&tag, &Residue::None, &mut issues);
		assert_eq!(issues.as_slice().len(), 3);

		let (read_tag, _) = read(&bytes);
		assert_eq!(read_tag.title(), None);
		assert!(read_tag.additional_fields().is_empty());
		assert_eq!(read_tag.pictures().len(), 1);
	}

	#[test_log::test]
	fn empty_tag_writes_nothing() {
		let mut tag = Tag::new();
		tag.clear_title();

		assert!(write(&tag, &Residue::None, &mut IssueLog::default()).is_empty());
	}
}
