//! ID3v2
//!
//! ID3v2.3 and ID3v2.4 tags are read, ID3v2.4 is written unless
//! [`WriteOptions::use_id3v23`](crate::config::WriteOptions::use_id3v23) is set. ID3v2.2 tags are
//! detected, so they can be replaced or removed, but their contents are discarded.
//!
//! Padding lives inside the tag: the size in the header covers it, and a tag that fits its old
//! extent is rewritten in place with the rest zeroed.
//!
//! ## Field mapping
//!
//! | Field          | Frame                            |
//! |----------------|----------------------------------|
//! | Title          | `TIT2`                           |
//! | Artist         | `TPE1`                           |
//! | Album          | `TALB`                           |
//! | Album artist   | `TPE2`                           |
//! | Composer       | `TCOM`                           |
//! | Conductor      | `TPE3`                           |
//! | Genre          | `TCON`                           |
//! | Copyright      | `TCOP`                           |
//! | Publisher      | `TPUB`                           |
//! | Recording date | `TDRC` (`TYER` + `TDAT` in v2.3) |
//! | Track / total  | `TRCK` (`n/t`)                   |
//! | Disc / total   | `TPOS` (`n/t`)                   |
//! | Comment        | `COMM` without a description     |
//! | Lyrics         | `USLT`                           |
//!
//! `TXXX` frames and any other text frame become additional fields, `APIC` frames become
//! pictures and `CHAP` frames become chapters. Everything else is written back as it was read.

pub(crate) mod chapter;
pub(crate) mod content;
pub(crate) mod frame;
pub(crate) mod header;
pub(crate) mod read;
pub(crate) mod synchsafe;
pub(crate) mod write;

use crate::error::Result;
use crate::layout::{Extent, PaddingKind, Site};
use crate::tag::StandardField;
use crate::util::io::FieldWidth;
use header::{HEADER_LEN, Id3v2Header};

use std::io::{Read, Seek, SeekFrom};

/// Frames holding a single standard field
pub(crate) const TEXT_FRAMES: &[(StandardField, &str)] = &[
	(StandardField::Title, "TIT2"),
	(StandardField::Artist, "TPE1"),
	(StandardField::Album, "TALB"),
	(StandardField::AlbumArtist, "TPE2"),
	(StandardField::Composer, "TCOM"),
	(StandardField::Conductor, "TPE3"),
	(StandardField::Genre, "TCON"),
	(StandardField::Copyright, "TCOP"),
	(StandardField::Publisher, "TPUB"),
];

/// Frames with a field mapping beyond [`TEXT_FRAMES`]
pub(crate) const SPECIAL_FRAMES: &[&str] = &[
	"TRCK", "TPOS", "TDRC", "TYER", "TDAT", "TXXX", "COMM", "USLT", "APIC", "CHAP", "CTOC",
];

pub(crate) const PADDING_KIND: PaddingKind = PaddingKind::Inline {
	size_pos: 6,
	header_len: HEADER_LEN,
	width: FieldWidth::Synchsafe32,
};

/// Find the ID3v2 tag at the start of the stream
pub(crate) fn locate<R>(reader: &mut R) -> Result<Site>
where
	R: Read + Seek,
{
	reader.seek(SeekFrom::Start(0))?;

	match Id3v2Header::parse(reader) {
		Ok(header) => {
			log::debug!(
				"Found an ID3v2.{} tag, size: {}",
				match header.version {
					header::Id3v2Version::V2 => 2,
					header::Id3v2Version::V3 => 3,
					header::Id3v2Version::V4 => 4,
				},
				header.full_tag_size()
			);

			Ok(Site::new(
				Extent::new(0, header.full_tag_size()),
				true,
				PADDING_KIND,
			))
		},
		// Any other tag is rejected when decoded
		Err(_) => Ok(Site::new(Extent::at(0), false, PADDING_KIND)),
	}
}
