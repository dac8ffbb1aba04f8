//! Little endian chunk files

pub(crate) mod wav;

use crate::config::ParsingMode;
use crate::error::Result;
use crate::layout::Extent;
use crate::macros::{err, parse_mode_choice, try_vec};

use std::io::{Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

pub(crate) const CHUNK_HEADER_LEN: u64 = 8;

/// The position and size of a chunk
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct ChunkInfo {
	pub(crate) start: u64,
	pub(crate) fourcc: [u8; 4],
	/// The size of the body, as stored
	pub(crate) size: u32,
	/// The end of the chunk, including its pad byte
	pub(crate) end: u64,
}

impl ChunkInfo {
	pub(crate) fn body_start(&self) -> u64 {
		self.start + CHUNK_HEADER_LEN
	}

	/// The length of the body, which can be smaller than `size` for a truncated chunk
	pub(crate) fn body_len(&self) -> u64 {
		u64::from(self.size).min(self.end - self.body_start())
	}

	pub(crate) fn extent(&self) -> Extent {
		Extent::new(self.start, self.end)
	}

	pub(crate) fn is(&self, fourcc: &[u8; 4]) -> bool {
		&self.fourcc == fourcc
	}
}

/// Walks the chunks between two offsets
pub(crate) struct Chunks {
	pos: u64,
	end: u64,
	parsing_mode: ParsingMode,
}

impl Chunks {
	pub(crate) fn new(start: u64, end: u64, parsing_mode: ParsingMode) -> Self {
		Self {
			pos: start,
			end,
			parsing_mode,
		}
	}

	pub(crate) fn next<R>(&mut self, reader: &mut R) -> Result<Option<ChunkInfo>>
	where
		R: Read + Seek,
	{
		if self.end.saturating_sub(self.pos) < CHUNK_HEADER_LEN {
			if self.pos < self.end {
				log::warn!("RIFF: {} trailing bytes after the last chunk", self.end - self.pos);
			}

			return Ok(None);
		}

		reader.seek(SeekFrom::Start(self.pos))?;

		let mut fourcc = [0; 4];
		reader.read_exact(&mut fourcc)?;
		let size = reader.read_u32::<LittleEndian>()?;

		let start = self.pos;

		// Chunks start on even boundaries, an odd sized body is followed by a pad byte that the
		// size does not include
		let mut end = start + CHUNK_HEADER_LEN + u64::from(size) + u64::from(size & 1);
		if end > self.end {
			let body_end = start + CHUNK_HEADER_LEN + u64::from(size);
			let parsing_mode = self.parsing_mode;
			if body_end > self.end {
				parse_mode_choice!(
					parsing_mode,
					STRICT: err!(SizeMismatch),
					DEFAULT: log::warn!(
						"RIFF: Chunk `{}` is {} bytes past the end of its parent",
						String::from_utf8_lossy(&fourcc),
						body_end - self.end
					)
				);
			}

			// A missing pad byte after the last chunk is common enough to not warn about
			end = self.end;
		}

		self.pos = end;

		Ok(Some(ChunkInfo {
			start,
			fourcc,
			size,
			end,
		}))
	}
}

/// Read the body of `chunk`
pub(crate) fn read_body<R>(reader: &mut R, chunk: &ChunkInfo) -> Result<Vec<u8>>
where
	R: Read + Seek,
{
	let mut body = try_vec![0; chunk.body_len() as usize];
	reader.seek(SeekFrom::Start(chunk.body_start()))?;
	reader.read_exact(&mut body)?;
	Ok(body)
}

/// Write a chunk, padding it to an even length
pub(crate) fn write_chunk(out: &mut Vec<u8>, fourcc: &[u8; 4], body: &[u8]) {
	out.extend_from_slice(fourcc);
	out.extend_from_slice(&(body.len() as u32).to_le_bytes());
	out.extend_from_slice(body);
	if body.len() % 2 != 0 {
		out.push(0);
	}
}
