//! The `ilst` item list, and the `udta` atom around it

pub(crate) mod data_type;
pub(crate) mod read;
pub(crate) mod write;

use crate::tag::StandardField;

/// Items holding a single text field
pub(crate) const TEXT_ITEMS: &[(StandardField, [u8; 4])] = &[
	(StandardField::Title, *b"\xA9nam"),
	(StandardField::Artist, *b"\xA9ART"),
	(StandardField::Album, *b"\xA9alb"),
	(StandardField::AlbumArtist, *b"aART"),
	(StandardField::Composer, *b"\xA9wrt"),
	(StandardField::RecordingDate, *b"\xA9day"),
	(StandardField::Comment, *b"\xA9cmt"),
	(StandardField::Genre, *b"\xA9gen"),
	(StandardField::Copyright, *b"cprt"),
	(StandardField::Lyrics, *b"\xA9lyr"),
];

pub(crate) const TRACK_ITEM: [u8; 4] = *b"trkn";
pub(crate) const DISC_ITEM: [u8; 4] = *b"disk";
pub(crate) const GENRE_ID_ITEM: [u8; 4] = *b"gnre";
pub(crate) const COVER_ITEM: [u8; 4] = *b"covr";
pub(crate) const FREEFORM_ITEM: [u8; 4] = *b"----";

/// The `mean` of freeform items that are keyed by their `name` alone
pub(crate) const ITUNES_MEAN: &str = "com.apple.iTunes";

/// Whether `ident` has a meaning beyond a plain text item
pub(crate) fn is_mapped(ident: &[u8; 4]) -> bool {
	TEXT_ITEMS.iter().any(|(_, item)| item == ident)
		|| [TRACK_ITEM, DISC_ITEM, GENRE_ID_ITEM, COVER_ITEM, FREEFORM_ITEM].contains(ident)
}

/// The additional field key of a freeform item
pub(crate) fn freeform_key(mean: &str, name: &str) -> String {
	if mean == ITUNES_MEAN {
		return name.to_owned();
	}

	format!("----:{mean}:{name}")
}

/// The textual form of an item identifier
///
/// Identifiers are Latin-1, mostly for the `©` prefix.
pub(crate) fn ident_key(ident: &[u8; 4]) -> String {
	ident.iter().map(|b| char::from(*b)).collect()
}

/// The item identifier spelled by `key`, if it is one
///
/// Only identifiers in the style of the well-known items are accepted: a `©` followed by three
/// characters, or four lowercase letters and digits.
pub(crate) fn key_ident(key: &str) -> Option<[u8; 4]> {
	let mut ident = [0; 4];
	let mut len = 0;
	for c in key.chars() {
		let byte = u8::try_from(u32::from(c)).ok()?;
		*ident.get_mut(len)? = byte;
		len += 1;
	}

	if len != 4 {
		return None;
	}

	let valid = match ident {
		[0xA9, rest @ ..] => rest.iter().all(u8::is_ascii_alphanumeric),
		_ => ident
			.iter()
			.all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()),
	};

	valid.then_some(ident)
}

#[cfg(test)]
mod tests {
	use super::{freeform_key, ident_key, is_mapped, key_ident};

	#[test_log::test]
	fn keys() {
		assert_eq!(ident_key(b"\xA9too"), "\u{a9}too");
		assert_eq!(key_ident("\u{a9}too"), Some(*b"\xA9too"));
		assert_eq!(key_ident("tvsh"), Some(*b"tvsh"));
		assert_eq!(key_ident("MOOD"), None);
		assert_eq!(key_ident("abcde"), None);
		assert_eq!(key_ident("\u{65e5}abc"), None);

		assert!(is_mapped(b"\xA9nam"));
		assert!(is_mapped(b"covr"));
		assert!(!is_mapped(b"tvsh"));

		assert_eq!(freeform_key("com.apple.iTunes", "MOOD"), "MOOD");
		assert_eq!(freeform_key("org.example", "MOOD"), "----:org.example:MOOD");
	}
}
