use crate::config::ParsingMode;
use crate::error::Result;
use crate::macros::err;

use std::io::{Read, Seek, SeekFrom};

use byteorder::{BigEndian, ByteOrder, ReadBytesExt};

pub(crate) const ATOM_HEADER_LEN: u64 = 8;
/// Version (1) and flags (3) of a full atom
pub(crate) const FULL_ATOM_HEADER_LEN: usize = 4;

// Any character is permitted to be used in atom identifiers, which leaves no room for error
// detection. This is the character set TagLib considers valid.
fn is_valid_identifier_byte(b: u8) -> bool {
	(b' '..=b'~').contains(&b) || b == b'\xA9'
}

/// The position and size of an atom, relative to whatever it was read from
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct AtomInfo {
	pub(crate) start: u64,
	pub(crate) len: u64,
	/// 8, or 16 for atoms with an extended size
	pub(crate) header_len: u64,
	pub(crate) ident: [u8; 4],
}

impl AtomInfo {
	pub(crate) fn end(&self) -> u64 {
		self.start + self.len
	}

	pub(crate) fn body_start(&self) -> u64 {
		self.start + self.header_len
	}

	pub(crate) fn is_extended(&self) -> bool {
		self.header_len > ATOM_HEADER_LEN
	}

	/// Read an atom header at the current position of `reader`, which ends at `end`
	///
	/// The reader is left at the start of the atom body.
	pub(crate) fn read<R>(reader: &mut R, end: u64, parsing_mode: ParsingMode) -> Result<Option<Self>>
	where
		R: Read + Seek,
	{
		let start = reader.stream_position()?;
		if start >= end {
			return Ok(None);
		}

		if end - start < ATOM_HEADER_LEN {
			log::warn!("MP4: {} trailing bytes after the last atom", end - start);
			return Ok(None);
		}

		let len_raw = u64::from(reader.read_u32::<BigEndian>()?);

		let mut ident = [0; 4];
		reader.read_exact(&mut ident)?;

		let (len, header_len) = match len_raw {
			// The atom extends to the end of the file
			0 => (end - start, ATOM_HEADER_LEN),
			1 => (reader.read_u64::<BigEndian>()?, ATOM_HEADER_LEN + 8),
			_ => (len_raw, ATOM_HEADER_LEN),
		};

		Self::validate(
			Self {
				start,
				len,
				header_len,
				ident,
			},
			end,
			parsing_mode,
		)
	}

	/// Parse an atom header at the start of `data`, `start` being its position
	pub(crate) fn parse(data: &[u8], start: u64, parsing_mode: ParsingMode) -> Result<Option<Self>> {
		if data.len() < ATOM_HEADER_LEN as usize {
			if !data.is_empty() {
				log::warn!("MP4: {} trailing bytes after the last atom", data.len());
			}

			return Ok(None);
		}

		let len_raw = u64::from(BigEndian::read_u32(&data[..4]));
		let mut ident = [0; 4];
		ident.copy_from_slice(&data[4..8]);

		let (len, header_len) = match len_raw {
			0 => (data.len() as u64, ATOM_HEADER_LEN),
			1 if data.len() >= 16 => (BigEndian::read_u64(&data[8..16]), ATOM_HEADER_LEN + 8),
			1 => err!(BadAtom("Found an incomplete extended size")),
			_ => (len_raw, ATOM_HEADER_LEN),
		};

		Self::validate(
			Self {
				start,
				len,
				header_len,
				ident,
			},
			start + data.len() as u64,
			parsing_mode,
		)
	}

	fn validate(self, end: u64, parsing_mode: ParsingMode) -> Result<Option<Self>> {
		if !self.ident.iter().copied().all(is_valid_identifier_byte) {
			match parsing_mode {
				ParsingMode::Strict => {
					err!(BadAtom("Encountered an atom with invalid characters"));
				},
				ParsingMode::BestAttempt | ParsingMode::Relaxed => {
					log::warn!("MP4: Encountered an atom with invalid characters, stopping");
					return Ok(None);
				},
			}
		}

		if self.len < self.header_len {
			err!(BadAtom("Found an invalid length (< 8)"));
		}

		if self.start + self.len > end {
			// Software that doesn't understand padding may leave a truncated `free` atom at the end
			let skippable = (parsing_mode != ParsingMode::Strict && self.ident == *b"free")
				|| parsing_mode == ParsingMode::Relaxed;
			if skippable {
				log::warn!("MP4: Encountered an atom with an invalid length, stopping");
				return Ok(None);
			}

			err!(SizeMismatch);
		}

		Ok(Some(self))
	}
}

/// An atom borrowed from an in-memory buffer
#[derive(Copy, Clone, Debug)]
pub(crate) struct Atom<'a> {
	pub(crate) info: AtomInfo,
	/// Everything past the header
	pub(crate) body: &'a [u8],
	/// The complete atom
	pub(crate) raw: &'a [u8],
}

/// Iterates over the atoms of `data`, `base` being the position of its first byte
pub(crate) struct Atoms<'a> {
	data: &'a [u8],
	base: u64,
	pos: usize,
	parsing_mode: ParsingMode,
}

impl<'a> Atoms<'a> {
	pub(crate) fn new(data: &'a [u8], base: u64, parsing_mode: ParsingMode) -> Self {
		Self {
			data,
			base,
			pos: 0,
			parsing_mode,
		}
	}

	/// The children of `atom`, skipping `skip` bytes of its body first
	pub(crate) fn children(atom: &Atom<'a>, skip: usize, parsing_mode: ParsingMode) -> Self {
		let skip = skip.min(atom.body.len());
		Self::new(
			&atom.body[skip..],
			atom.info.body_start() + skip as u64,
			parsing_mode,
		)
	}
}

impl<'a> Iterator for Atoms<'a> {
	type Item = Result<Atom<'a>>;

	fn next(&mut self) -> Option<Self::Item> {
		let remaining = &self.data[self.pos..];
		let start = self.base + self.pos as u64;

		let info = match AtomInfo::parse(remaining, start, self.parsing_mode) {
			Ok(Some(info)) => info,
			Ok(None) => return None,
			Err(err) => {
				// Nothing past a broken atom can be trusted
				self.pos = self.data.len();
				return Some(Err(err));
			},
		};

		let raw = &remaining[..info.len as usize];
		self.pos += info.len as usize;

		Some(Ok(Atom {
			info,
			body: &raw[info.header_len as usize..],
			raw,
		}))
	}
}

/// Find the first child of `atoms` named `ident`
pub(crate) fn find_child<'a>(atoms: Atoms<'a>, ident: &[u8; 4]) -> Result<Option<Atom<'a>>> {
	for atom in atoms {
		let atom = atom?;
		if atom.info.ident == *ident {
			return Ok(Some(atom));
		}
	}

	Ok(None)
}

/// Whether a `meta` body starts with version and flags
///
/// `meta` is a full atom, but QuickTime writes it as a plain container.
pub(crate) fn meta_is_full(body: &[u8]) -> bool {
	match body.get(4..8) {
		Some(b"hdlr" | b"ilst" | b"mhdr" | b"ctry" | b"lang") => {
			log::warn!("MP4: File contains a non-full 'meta' atom");
			false
		},
		_ => true,
	}
}

/// Append an atom, using an extended size only when needed
pub(crate) fn write_atom(out: &mut Vec<u8>, ident: &[u8; 4], body: &[u8]) -> Result<()> {
	let len = ATOM_HEADER_LEN + body.len() as u64;
	out.try_reserve(body.len() + 16)?;

	match u32::try_from(len) {
		Ok(len) => {
			out.extend_from_slice(&len.to_be_bytes());
			out.extend_from_slice(ident);
		},
		Err(_) => {
			out.extend_from_slice(&1u32.to_be_bytes());
			out.extend_from_slice(ident);
			out.extend_from_slice(&(len + 8).to_be_bytes());
		},
	}

	out.extend_from_slice(body);
	Ok(())
}

/// Skip to the end of an atom read with [`AtomInfo::read`]
pub(crate) fn skip_atom<R>(reader: &mut R, atom: &AtomInfo) -> Result<()>
where
	R: Seek,
{
	reader.seek(SeekFrom::Start(atom.end()))?;
	Ok(())
}
