//! ID3v1 and ID3v1.1
//!
//! A fixed 128 byte structure at the very end of the file. Every text field is Latin-1 and
//! silently truncated to its slot:
//!
//! | Field   | Length                         |
//! |---------|--------------------------------|
//! | Title   | 30                             |
//! | Artist  | 30                             |
//! | Album   | 30                             |
//! | Year    | 4                              |
//! | Comment | 30 (28 + track number in v1.1) |
//! | Genre   | 1 (index into [`GENRES`])      |

pub(crate) mod constants;
pub(crate) mod read;
pub(crate) mod write;

use crate::error::Result;
use crate::layout::{Extent, PaddingKind, Site};
use crate::util::io::SeekStreamLen;
use constants::{ID3V1_TAG_LEN, ID3V1_TAG_MARKER};

#[cfg(doc)]
use constants::GENRES;

use std::io::{Read, Seek, SeekFrom};

pub(crate) fn locate<R>(reader: &mut R) -> Result<Site>
where
	R: Read + Seek,
{
	let len = reader.stream_len_hack()?;

	// Too small to contain an ID3v1 tag
	if len < ID3V1_TAG_LEN {
		return Ok(Site::new(Extent::at(len), false, PaddingKind::None));
	}

	reader.seek(SeekFrom::Start(len - ID3V1_TAG_LEN))?;

	let mut marker = [0; 3];
	reader.read_exact(&mut marker)?;

	if marker != ID3V1_TAG_MARKER {
		return Ok(Site::new(Extent::at(len), false, PaddingKind::None));
	}

	log::debug!("Found an ID3v1 tag");
	Ok(Site::new(
		Extent::new(len - ID3V1_TAG_LEN, len),
		true,
		PaddingKind::None,
	))
}
