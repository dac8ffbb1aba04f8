use std::fmt::{Display, Formatter};

/// A tag system that can live inside an audio file
///
/// A single file may carry several of these at once, each one is read and written independently.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[non_exhaustive]
pub enum TagType {
	/// ID3v2.3 and ID3v2.4, written as ID3v2.4 unless requested otherwise
	Id3v2,
	/// An MP4 `udta` atom, holding the `ilst` items and Nero chapters
	Mp4Ilst,
	/// A RIFF `LIST INFO` chunk, along with any `disp` chunks
	RiffInfo,
	/// APEv2, APEv1 tags are upgraded when written
	Ape,
	/// ID3v1 and ID3v1.1
	Id3v1,
}

impl TagType {
	/// The order in which tag systems are written
	///
	/// Tags at the start of the file come first, so the offsets of the trailing tags are final
	/// by the time they are written.
	pub const SAVE_ORDER: [TagType; 5] = [
		TagType::Id3v2,
		TagType::Mp4Ilst,
		TagType::RiffInfo,
		TagType::Ape,
		TagType::Id3v1,
	];

	pub(crate) fn save_rank(self) -> usize {
		match self {
			TagType::Id3v2 => 0,
			TagType::Mp4Ilst => 1,
			TagType::RiffInfo => 2,
			TagType::Ape => 3,
			TagType::Id3v1 => 4,
		}
	}
}

impl Display for TagType {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		let name = match self {
			TagType::Id3v2 => "ID3v2",
			TagType::Mp4Ilst => "MP4 ilst",
			TagType::RiffInfo => "RIFF INFO",
			TagType::Ape => "APE",
			TagType::Id3v1 => "ID3v1",
		};

		f.write_str(name)
	}
}

#[cfg(test)]
mod tests {
	use super::TagType;

	#[test_log::test]
	fn save_order_matches_rank() {
		for (index, tag_type) in TagType::SAVE_ORDER.iter().enumerate() {
			assert_eq!(tag_type.save_rank(), index);
		}
	}
}
