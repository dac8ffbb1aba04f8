//! MP4 `ilst` and Nero chapters
//!
//! Everything lives in `moov.udta`: the item list in `meta.ilst`, chapters in `chpl`. The whole
//! `udta` atom is the extent of the tag, so other `udta` children are carried along as they are.
//!
//! A `free` atom following `udta` in `moov` is its padding. When `udta` changes size, the size of
//! `moov` follows, as do the chunk offsets (`stco`, `co64`) and fragment base offsets (`tfhd`)
//! pointing past it.
//!
//! ## Field mapping
//!
//! | Field          | Item                                   |
//! |----------------|----------------------------------------|
//! | Title          | `©nam`                                 |
//! | Artist         | `©ART`                                 |
//! | Album          | `©alb`                                 |
//! | Album artist   | `aART`                                 |
//! | Composer       | `©wrt`                                 |
//! | Recording date | `©day`                                 |
//! | Comment        | `©cmt`                                 |
//! | Genre          | `©gen` (or `gnre`)                     |
//! | Track / total  | `trkn`                                 |
//! | Disc / total   | `disk`                                 |
//! | Copyright      | `cprt`                                 |
//! | Lyrics         | `©lyr`                                 |
//!
//! `covr` holds the pictures, and freeform (`----`) items are additional fields. Any other text
//! item becomes an additional field keyed by its identifier.

pub(crate) mod atom;
pub(crate) mod chpl;
pub(crate) mod ilst;
pub(crate) mod properties;

use crate::config::{ParseOptions, ParsingMode};
use crate::error::Result;
use crate::layout::{Extent, Marker, PaddingKind, Patch, PatchKind, Site};
use crate::macros::{decode_err, err, try_vec};
use crate::util::io::{FieldWidth, SeekStreamLen};
use atom::{AtomInfo, Atoms, FULL_ATOM_HEADER_LEN, skip_atom};

use std::io::{Read, Seek, SeekFrom};

use byteorder::{BigEndian, ByteOrder};

/// The parts of `udta` with no place in the field model
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Mp4Residue {
	/// `ilst` items, as complete atoms
	pub(crate) items: Vec<Vec<u8>>,
	/// `udta` children other than `meta` and `chpl`, as complete atoms
	pub(crate) atoms: Vec<Vec<u8>>,
}

impl Mp4Residue {
	pub(crate) fn is_empty(&self) -> bool {
		self.items.is_empty() && self.atoms.is_empty()
	}
}

// Containers that can hold chunk offset tables
#[rustfmt::skip]
const OFFSET_CONTAINERS: &[[u8; 4]] = &[
	*b"trak",
		*b"mdia",
			*b"minf",
				*b"stbl",
];

/// Find `moov.udta`, or the spot a new one would go
pub(crate) fn locate<R>(reader: &mut R) -> Result<Site>
where
	R: Read + Seek,
{
	let parsing_mode = ParseOptions::DEFAULT_PARSING_MODE;
	let file_len = reader.stream_len_hack()?;

	reader.seek(SeekFrom::Start(0))?;

	let mut moov = None;
	let mut moofs = Vec::new();
	while let Some(atom) = AtomInfo::read(reader, file_len, parsing_mode)? {
		match &atom.ident {
			b"moov" if moov.is_none() => moov = Some(atom),
			b"moof" => moofs.push(atom),
			_ => {},
		}

		skip_atom(reader, &atom)?;
	}

	let Some(moov) = moov else {
		decode_err!(@BAIL Mp4, "No \"moov\" atom found");
	};

	let moov_bytes = read_atom(reader, &moov)?;
	if BigEndian::read_u32(&moov_bytes[..4]) == 0 {
		err!(BadAtom("`moov` atom has no explicit size"));
	}

	let moov_size = if moov.is_extended() {
		Patch::container_size(moov.start + 8, FieldWidth::U64Be)
	} else {
		Patch::container_size(moov.start, FieldWidth::U32Be)
	};

	let mut patches = vec![moov_size];
	let mut udta = None;
	let mut frees = Vec::new();

	let children = Atoms::new(
		&moov_bytes[moov.header_len as usize..],
		moov.body_start(),
		parsing_mode,
	);

	for child in children {
		let child = child?;
		match &child.info.ident {
			b"udta" if udta.is_none() => udta = Some(child.info),
			b"free" => frees.push(child.info),
			b"trak" => collect_offset_tables(&child, &mut patches, parsing_mode)?,
			_ => {},
		}
	}

	for moof in &moofs {
		let moof_bytes = read_atom(reader, moof)?;
		collect_fragment_offsets(&moof_bytes, moof, &mut patches, parsing_mode)?;
	}

	let padding_kind = PaddingKind::Marker(Marker::Atom);
	let mut site = match udta {
		Some(udta) => {
			let mut site = Site::new(Extent::new(udta.start, udta.end()), true, padding_kind);
			site.padding = free_run(&frees, udta.end());
			site
		},
		// A new `udta` takes the place of the first free space in `moov`
		None => match frees.first() {
			Some(free) => {
				let mut site = Site::new(Extent::at(free.start), false, padding_kind);
				site.padding = free_run(&frees, free.start);
				site
			},
			None => Site::new(Extent::at(moov.end()), false, padding_kind),
		},
	};

	log::debug!(
		"MP4: `udta` at {}..{}, {} offset field(s) to follow it",
		site.extent.start,
		site.extent.end,
		patches.len() - 1
	);

	site.patches = patches;
	Ok(site)
}

/// The run of back to back `free` atoms starting exactly at `pos`
fn free_run(frees: &[AtomInfo], pos: u64) -> Option<Extent> {
	let mut end = pos;
	for free in frees {
		if free.start == end {
			end = free.end();
		}
	}

	(end > pos).then(|| Extent::new(pos, end))
}

fn read_atom<R>(reader: &mut R, atom: &AtomInfo) -> Result<Vec<u8>>
where
	R: Read + Seek,
{
	let mut bytes = try_vec![0; atom.len as usize];
	reader.seek(SeekFrom::Start(atom.start))?;
	reader.read_exact(&mut bytes)?;
	Ok(bytes)
}

fn collect_offset_tables(
	container: &atom::Atom<'_>,
	patches: &mut Vec<Patch>,
	parsing_mode: ParsingMode,
) -> Result<()> {
	for child in Atoms::children(container, 0, parsing_mode) {
		let child = child?;
		let width = match &child.info.ident {
			ident if OFFSET_CONTAINERS.contains(ident) => {
				collect_offset_tables(&child, patches, parsing_mode)?;
				continue;
			},
			b"stco" => FieldWidth::U32Be,
			b"co64" => FieldWidth::U64Be,
			_ => continue,
		};

		// Version and flags, then the entry count
		let Some(count) = child.body.get(4..8).map(BigEndian::read_u32) else {
			err!(BadAtom("Found an incomplete chunk offset table"));
		};

		let table_len = u64::from(count) * width.byte_len();
		if (child.body.len() as u64) < 8 + table_len {
			err!(BadAtom("Chunk offset table is larger than its atom"));
		}

		log::trace!(
			"MP4: Found `{}` with {count} entries",
			String::from_utf8_lossy(&child.info.ident)
		);

		patches.push(Patch {
			pos: child.info.body_start() + 8,
			width,
			kind: PatchKind::OffsetTable { count },
		});
	}

	Ok(())
}

fn collect_fragment_offsets(
	moof_bytes: &[u8],
	moof: &AtomInfo,
	patches: &mut Vec<Patch>,
	parsing_mode: ParsingMode,
) -> Result<()> {
	let moof_body = &moof_bytes[moof.header_len as usize..];

	for traf in Atoms::new(moof_body, moof.body_start(), parsing_mode) {
		let traf = traf?;
		if traf.info.ident != *b"traf" {
			continue;
		}

		for tfhd in Atoms::children(&traf, 0, parsing_mode) {
			let tfhd = tfhd?;
			if tfhd.info.ident != *b"tfhd" || tfhd.body.len() < FULL_ATOM_HEADER_LEN + 12 {
				continue;
			}

			let flags = BigEndian::read_u24(&tfhd.body[1..4]);
			let has_base_data_offset = flags & 1 != 0;
			if has_base_data_offset {
				// Version and flags (4), track ID (4)
				patches.push(Patch {
					pos: tfhd.info.body_start() + 8,
					width: FieldWidth::U64Be,
					kind: PatchKind::Offset,
				});
			}
		}
	}

	Ok(())
}
