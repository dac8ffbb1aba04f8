use crate::error::Result;
use crate::macros::decode_err;

/// Keys that would make the tag look like another tag system
const INVALID_KEYS: [&str; 4] = ["ID3", "TAG", "OGGS", "MP+"];

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum ItemKind {
	/// UTF-8, with multiple values separated by a null
	Text,
	Binary,
	/// A UTF-8 link to an external resource
	Locator,
}

impl ItemKind {
	fn from_flags(flags: u32) -> Option<Self> {
		match (flags >> 1) & 3 {
			0 => Some(Self::Text),
			1 => Some(Self::Binary),
			2 => Some(Self::Locator),
			_ => None,
		}
	}

	fn flags(self) -> u32 {
		match self {
			Self::Text => 0,
			Self::Binary => 1 << 1,
			Self::Locator => 2 << 1,
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Item {
	pub(crate) key: String,
	pub(crate) kind: ItemKind,
	pub(crate) value: Vec<u8>,
	pub(crate) read_only: bool,
}

impl Item {
	pub(crate) fn text(key: &str, value: &str) -> Self {
		Self {
			key: key.to_owned(),
			kind: ItemKind::Text,
			value: value.as_bytes().to_vec(),
			read_only: false,
		}
	}

	pub(crate) fn binary(key: &str, value: Vec<u8>) -> Self {
		Self {
			key: key.to_owned(),
			kind: ItemKind::Binary,
			value,
			read_only: false,
		}
	}

	pub(crate) fn flags(&self) -> u32 {
		self.kind.flags() | u32::from(self.read_only)
	}

	pub(crate) fn from_flags(key: String, flags: u32, value: Vec<u8>) -> Result<Self> {
		let Some(kind) = ItemKind::from_flags(flags) else {
			decode_err!(@BAIL Ape, "APE tag item contains an invalid item type");
		};

		Ok(Self {
			key,
			kind,
			value,
			read_only: flags & 1 == 1,
		})
	}

	pub(crate) fn key_matches(&self, key: &str) -> bool {
		self.key.eq_ignore_ascii_case(key)
	}
}

/// Keys are 2 to 255 printable ASCII characters, and must not be mistaken for another tag
pub(crate) fn verify_key(key: &str) -> bool {
	(2..=255).contains(&key.len())
		&& key.bytes().all(|b| (0x20..=0x7E).contains(&b))
		&& !INVALID_KEYS.contains(&&*key.to_ascii_uppercase())
}
