//! APEv1 and APEv2
//!
//! The tag sits at the end of the stream, before an ID3v1 tag if there is one. It is found through
//! its 32 byte footer, which holds the size of everything but the optional header of the same
//! layout. APEv2 is always written, with both a header and a footer.
//!
//! APE has no padding convention, a tag of a different size always moves what follows it.
//!
//! ## Field mapping
//!
//! Keys are matched case-insensitively.
//!
//! | Field          | Item key                 |
//! |----------------|--------------------------|
//! | Title          | `Title`                  |
//! | Artist         | `Artist`                 |
//! | Album          | `Album`                  |
//! | Album artist   | `Album Artist`           |
//! | Composer       | `Composer`               |
//! | Conductor      | `Conductor`              |
//! | Genre          | `Genre`                  |
//! | Comment        | `Comment`                |
//! | Recording date | `Year`                   |
//! | Track / total  | `Track` (`n/t`)          |
//! | Disc / total   | `Disc` (`n/t`)           |
//! | Copyright      | `Copyright`              |
//! | Publisher      | `Publisher`              |
//! | Lyrics         | `Lyrics`                 |
//!
//! `Cover Art (...)` binary items are pictures, other text items are additional fields. Binary and
//! locator items are written back as they were read.

pub(crate) mod header;
pub(crate) mod item;
pub(crate) mod properties;
pub(crate) mod read;
pub(crate) mod write;

use crate::error::Result;
use crate::id3::v1::constants::{ID3V1_TAG_LEN, ID3V1_TAG_MARKER};
use crate::layout::{Extent, PaddingKind, Site};
use crate::tag::StandardField;
use crate::util::io::SeekStreamLen;
use header::{APE_PREAMBLE, ApeHeader, HEADER_LEN};

use std::io::{Read, Seek, SeekFrom};

pub(crate) const FIELD_KEYS: &[(StandardField, &str)] = &[
	(StandardField::Title, "Title"),
	(StandardField::Artist, "Artist"),
	(StandardField::Album, "Album"),
	(StandardField::AlbumArtist, "Album Artist"),
	(StandardField::Composer, "Composer"),
	(StandardField::Conductor, "Conductor"),
	(StandardField::Genre, "Genre"),
	(StandardField::Comment, "Comment"),
	(StandardField::RecordingDate, "Year"),
	(StandardField::Copyright, "Copyright"),
	(StandardField::Publisher, "Publisher"),
	(StandardField::Lyrics, "Lyrics"),
];

pub(crate) const TRACK_KEY: &str = "Track";
pub(crate) const DISC_KEY: &str = "Disc";

/// The end of the stream, excluding a trailing ID3v1 tag
pub(crate) fn id3v1_boundary<R>(reader: &mut R) -> Result<u64>
where
	R: Read + Seek,
{
	let len = reader.stream_len_hack()?;
	if len < ID3V1_TAG_LEN {
		return Ok(len);
	}

	reader.seek(SeekFrom::Start(len - ID3V1_TAG_LEN))?;

	let mut marker = [0; 3];
	reader.read_exact(&mut marker)?;

	if marker == ID3V1_TAG_MARKER {
		return Ok(len - ID3V1_TAG_LEN);
	}

	Ok(len)
}

/// Find the APE tag at the end of the stream
pub(crate) fn locate<R>(reader: &mut R) -> Result<Site>
where
	R: Read + Seek,
{
	let end = id3v1_boundary(reader)?;
	let missing = Site::new(Extent::at(end), false, PaddingKind::None);

	if end < HEADER_LEN {
		return Ok(missing);
	}

	reader.seek(SeekFrom::Start(end - HEADER_LEN))?;

	let mut footer = [0; HEADER_LEN as usize];
	reader.read_exact(&mut footer)?;

	if &footer[..8] != APE_PREAMBLE {
		return Ok(missing);
	}

	let footer = ApeHeader::parse(&footer)?;
	let Some(start) = end.checked_sub(footer.full_tag_size()) else {
		log::warn!("APE: Tag claims to be larger than the file, ignoring it");
		return Ok(missing);
	};

	log::debug!("Found an APE tag at {start}, size: {}", footer.full_tag_size());
	Ok(Site::new(Extent::new(start, end), true, PaddingKind::None))
}
