use super::synchsafe::SynchsafeInteger;
use crate::error::Result;
use crate::macros::{err, id3v2_err};

use std::io::Read;

use byteorder::{BigEndian, ByteOrder};

pub(crate) const HEADER_LEN: u64 = 10;
pub(crate) const FOOTER_LEN: u64 = 10;

/// The ID3v2 version
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub(crate) enum Id3v2Version {
	V2,
	V3,
	V4,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub(crate) struct Id3v2Header {
	pub(crate) version: Id3v2Version,
	pub(crate) minor: u8,
	/// In ID3v2.3 the whole tag body is unsynchronised, in ID3v2.4 every frame is
	pub(crate) unsynchronisation: bool,
	pub(crate) extended_header: bool,
	pub(crate) footer: bool,
	/// The size of the tag contents, excluding the header and footer but including padding
	pub(crate) size: u32,
}

impl Id3v2Header {
	pub(crate) fn parse<R>(reader: &mut R) -> Result<Self>
	where
		R: Read,
	{
		let mut header = [0; HEADER_LEN as usize];
		reader.read_exact(&mut header)?;

		if &header[..3] != b"ID3" {
			err!(FakeTag);
		}

		let version = match header[3] {
			2 => Id3v2Version::V2,
			3 => Id3v2Version::V3,
			4 => Id3v2Version::V4,
			major => id3v2_err!(BadId3v2Version(major, header[4])),
		};

		let flags = header[5];
		let modern = version != Id3v2Version::V2;

		Ok(Self {
			version,
			minor: header[4],
			unsynchronisation: flags & 0x80 == 0x80,
			extended_header: modern && flags & 0x40 == 0x40,
			footer: version == Id3v2Version::V4 && flags & 0x10 == 0x10,
			size: BigEndian::read_u32(&header[6..]).unsynch(),
		})
	}

	/// The total size of the tag, including the header and footer
	pub(crate) fn full_tag_size(&self) -> u64 {
		HEADER_LEN + u64::from(self.size) + if self.footer { FOOTER_LEN } else { 0 }
	}

	/// Render a header for a tag with `size` bytes of content
	pub(crate) fn render(version: Id3v2Version, size: u32) -> Result<[u8; HEADER_LEN as usize]> {
		let Some(size) = size.synch() else {
			err!(TooMuchData);
		};

		let major = match version {
			Id3v2Version::V3 => 3,
			_ => 4,
		};

		let mut header = [0; HEADER_LEN as usize];
		header[..3].copy_from_slice(b"ID3");
		header[3] = major;
		BigEndian::write_u32(&mut header[6..], size);

		Ok(header)
	}
}

/// Skip the extended header at the start of `body`
///
/// Its contents (CRC, restrictions) are not needed, and are never written back.
pub(crate) fn skip_extended_header(body: &[u8], version: Id3v2Version) -> Result<&[u8]> {
	if body.len() < 4 {
		id3v2_err!(BadExtendedHeaderSize);
	}

	let raw = BigEndian::read_u32(body);

	// ID3v2.3 excludes the size field itself, ID3v2.4 includes it and makes it synchsafe
	let total = match version {
		Id3v2Version::V4 => u64::from(raw.unsynch()),
		_ => u64::from(raw) + 4,
	};

	if total < 6 || total >= body.len() as u64 {
		id3v2_err!(BadExtendedHeaderSize);
	}

	log::debug!("ID3v2: Skipping a {total} byte extended header");
	Ok(&body[total as usize..])
}
