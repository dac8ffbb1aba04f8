use crate::error::Result;
use crate::macros::decode_err;

use byteorder::{ByteOrder, LittleEndian};

pub(crate) const APE_PREAMBLE: &[u8; 8] = b"APETAGEX";
/// The header and footer share a layout
pub(crate) const HEADER_LEN: u64 = 32;

pub(crate) const FLAG_IS_HEADER: u32 = 1 << 29;
pub(crate) const FLAG_HAS_FOOTER: u32 = 1 << 30;
pub(crate) const FLAG_HAS_HEADER: u32 = 1 << 31;

const VERSION_1: u32 = 1000;
pub(crate) const VERSION_2: u32 = 2000;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct ApeHeader {
	pub(crate) version: u32,
	/// Items and footer, but not the header
	pub(crate) size: u32,
	pub(crate) item_count: u32,
	pub(crate) flags: u32,
}

impl ApeHeader {
	pub(crate) fn parse(bytes: &[u8]) -> Result<Self> {
		if bytes.len() < HEADER_LEN as usize || &bytes[..8] != APE_PREAMBLE {
			decode_err!(@BAIL Ape, "APE tag has an invalid preamble");
		}

		let header = Self {
			version: LittleEndian::read_u32(&bytes[8..12]),
			size: LittleEndian::read_u32(&bytes[12..16]),
			item_count: LittleEndian::read_u32(&bytes[16..20]),
			flags: LittleEndian::read_u32(&bytes[20..24]),
		};

		if header.version != VERSION_1 && header.version != VERSION_2 {
			log::warn!("APE: Unknown tag version {}, reading it as APEv2", header.version);
		}

		if u64::from(header.size) < HEADER_LEN {
			decode_err!(@BAIL Ape, "APE tag has an invalid size (< 32)");
		}

		Ok(header)
	}

	/// APEv1 tags never have a header
	pub(crate) fn has_header(&self) -> bool {
		self.version != VERSION_1 && self.flags & FLAG_HAS_HEADER != 0
	}

	pub(crate) fn full_tag_size(&self) -> u64 {
		let header = if self.has_header() { HEADER_LEN } else { 0 };
		u64::from(self.size) + header
	}

	pub(crate) fn render(&self) -> [u8; HEADER_LEN as usize] {
		let mut out = [0; HEADER_LEN as usize];
		out[..8].copy_from_slice(APE_PREAMBLE);
		LittleEndian::write_u32(&mut out[8..12], self.version);
		LittleEndian::write_u32(&mut out[12..16], self.size);
		LittleEndian::write_u32(&mut out[16..20], self.item_count);
		LittleEndian::write_u32(&mut out[20..24], self.flags);
		// The last 8 bytes are reserved
		out
	}
}
