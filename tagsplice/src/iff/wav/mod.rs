//! RIFF WAVE
//!
//! Two tag systems live in the chunks of the `RIFF` form: `LIST INFO` together with `disp`
//! chunks, and an ID3v2 tag wrapped in an `id3 ` (or `ID3 `) chunk. Free space is a `JUNK` chunk.
//! When a chunk changes size, the size of the `RIFF` form follows.
//!
//! A file can spread its `LIST INFO` and `disp` chunks around. The first run of adjacent ones is
//! the extent of the tag, the rest are folded into it on save.

pub(crate) mod info;
pub(crate) mod properties;

use super::{CHUNK_HEADER_LEN, ChunkInfo, Chunks};
use crate::config::{ParseOptions, ParsingMode, WriteOptions};
use crate::error::Result;
use crate::layout::{Extent, Marker, PaddingKind, Patch, Site};
use crate::macros::{decode_err, err};
use crate::util::io::{FieldWidth, SeekStreamLen};

use std::io::{Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

/// The offset of the `RIFF` form size
const RIFF_SIZE_POS: u64 = 4;
/// `RIFF`, its size, and `WAVE`
pub(crate) const RIFF_HEADER_LEN: u64 = 12;

const PADDING_KIND: PaddingKind = PaddingKind::Marker(Marker::Chunk);

/// Check the `RIFF` header, returning the end of the form
pub(crate) fn verify_wav<R>(reader: &mut R) -> Result<u64>
where
	R: Read + Seek,
{
	let file_len = reader.stream_len_hack()?;
	reader.seek(SeekFrom::Start(0))?;

	let mut id = [0; 4];
	reader.read_exact(&mut id)?;
	if &id != b"RIFF" {
		decode_err!(@BAIL Wav, "WAV file doesn't contain a RIFF chunk");
	}

	let size = reader.read_u32::<LittleEndian>()?;

	reader.read_exact(&mut id)?;
	if &id != b"WAVE" {
		decode_err!(@BAIL Wav, "Found RIFF file, format is not WAVE");
	}

	let end = RIFF_SIZE_POS + 4 + u64::from(size);
	if end > file_len {
		log::warn!("WAV: RIFF form claims {} more bytes than the file holds", end - file_len);
		return Ok(file_len);
	}

	if end < file_len {
		log::debug!("WAV: {} bytes follow the RIFF form", file_len - end);
	}

	Ok(end)
}

/// Every top-level chunk of the form
pub(crate) fn chunks<R>(reader: &mut R, parsing_mode: ParsingMode) -> Result<Vec<ChunkInfo>>
where
	R: Read + Seek,
{
	let end = verify_wav(reader)?;

	let mut walker = Chunks::new(RIFF_HEADER_LEN, end, parsing_mode);
	let mut chunks = Vec::new();
	while let Some(chunk) = walker.next(reader)? {
		chunks.push(chunk);
	}

	Ok(chunks)
}

/// Whether `chunk` is part of the INFO tag system
pub(crate) fn is_info_chunk<R>(reader: &mut R, chunk: &ChunkInfo) -> Result<bool>
where
	R: Read + Seek,
{
	if chunk.is(b"disp") {
		return Ok(true);
	}

	if !chunk.is(b"LIST") || chunk.body_len() < 4 {
		return Ok(false);
	}

	reader.seek(SeekFrom::Start(chunk.body_start()))?;

	let mut list_type = [0; 4];
	reader.read_exact(&mut list_type)?;
	Ok(&list_type == b"INFO")
}

fn is_id3v2_chunk(chunk: &ChunkInfo) -> bool {
	chunk.is(b"id3 ") || chunk.is(b"ID3 ")
}

/// The run of back to back `JUNK` chunks starting exactly at `pos`
fn padding_at(chunks: &[ChunkInfo], pos: u64) -> Option<Extent> {
	let mut end = pos;
	for chunk in chunks.iter().filter(|chunk| chunk.is(b"JUNK")) {
		if chunk.start == end {
			end = chunk.end;
		}
	}

	(end > pos).then(|| Extent::new(pos, end))
}

fn site(chunks: &[ChunkInfo], extent: Extent, exists: bool) -> Site {
	let mut site = Site::new(extent, exists, PADDING_KIND);
	site.padding = padding_at(chunks, extent.end);
	site.patches = vec![Patch::container_size(RIFF_SIZE_POS, FieldWidth::U32Le)];
	site
}

/// A new tag goes after the last chunk
///
/// The last chunk may be missing its pad byte, in which case the new tag has to restore it.
fn insertion_site(chunks: &[ChunkInfo]) -> Site {
	let pos = chunks.last().map_or(RIFF_HEADER_LEN, |chunk| chunk.end);

	let mut site = site(chunks, Extent::at(pos), false);
	site.needs_pad_byte = pos % 2 != 0;
	site
}

/// Find the chunk holding an ID3v2 tag
pub(crate) fn locate_id3v2<R>(reader: &mut R) -> Result<Site>
where
	R: Read + Seek,
{
	let chunks = chunks(reader, ParseOptions::DEFAULT_PARSING_MODE)?;

	let site = match chunks.iter().find(|chunk| is_id3v2_chunk(chunk)) {
		Some(chunk) => site(&chunks, chunk.extent(), true),
		None => insertion_site(&chunks),
	};

	Ok(site)
}

/// Find the `LIST INFO` and `disp` chunks
pub(crate) fn locate_info<R>(reader: &mut R) -> Result<Site>
where
	R: Read + Seek,
{
	let chunks = chunks(reader, ParseOptions::DEFAULT_PARSING_MODE)?;

	let mut owned = Vec::new();
	for chunk in &chunks {
		if is_info_chunk(reader, chunk)? {
			owned.push(chunk.extent());
		}
	}

	let Some(first) = owned.first().copied() else {
		return Ok(insertion_site(&chunks));
	};

	let mut extent = first;
	let mut orphans = Vec::new();
	for chunk in &owned[1..] {
		if orphans.is_empty() && chunk.start == extent.end {
			extent.end = chunk.end;
		} else {
			orphans.push(*chunk);
		}
	}

	if !orphans.is_empty() {
		log::debug!("WAV: {} INFO chunk(s) apart from the rest", orphans.len());
	}

	let mut site = site(&chunks, extent, true);
	site.orphans = orphans;
	Ok(site)
}

/// The body of an ID3v2 chunk
pub(crate) fn chunk_body(content: &[u8]) -> Result<&[u8]> {
	if content.len() < CHUNK_HEADER_LEN as usize {
		err!(SizeMismatch);
	}

	let size = u32::from_le_bytes([content[4], content[5], content[6], content[7]]) as usize;
	match content.get(CHUNK_HEADER_LEN as usize..CHUNK_HEADER_LEN as usize + size) {
		Some(body) => Ok(body),
		None => err!(SizeMismatch),
	}
}

/// Wrap an encoded ID3v2 tag in its chunk
pub(crate) fn wrap_id3v2(content: Vec<u8>, options: WriteOptions) -> Vec<u8> {
	if content.is_empty() {
		return content;
	}

	let fourcc = if options.uppercase_id3v2_chunk {
		b"ID3 "
	} else {
		b"id3 "
	};

	let mut chunk = Vec::with_capacity(content.len() + 9);
	super::write_chunk(&mut chunk, fourcc, &content);
	chunk
}

#[cfg(test)]
pub(crate) mod tests {
	use super::{chunk_body, locate_id3v2, locate_info, wrap_id3v2};
	use crate::config::WriteOptions;
	use crate::iff::write_chunk;
	use crate::layout::{Extent, PatchKind};

	use std::io::Cursor;

	/// A RIFF form with a 16 bit stereo 44.1kHz `fmt ` chunk, followed by `chunks`
	pub(crate) fn build_wav(chunks: &[(&[u8; 4], &[u8])]) -> Vec<u8> {
		let mut fmt = Vec::new();
		fmt.extend_from_slice(&1u16.to_le_bytes());
		fmt.extend_from_slice(&2u16.to_le_bytes());
		fmt.extend_from_slice(&44_100u32.to_le_bytes());
		fmt.extend_from_slice(&(44_100u32 * 4).to_le_bytes());
		fmt.extend_from_slice(&4u16.to_le_bytes());
		fmt.extend_from_slice(&16u16.to_le_bytes());

		let mut body = b"WAVE".to_vec();
		write_chunk(&mut body, b"fmt ", &fmt);
		for (fourcc, chunk) in chunks {
			write_chunk(&mut body, fourcc, chunk);
		}

		let mut file = Vec::new();
		write_chunk(&mut file, b"RIFF", &body);
		file
	}

	pub(crate) fn info_list(items: &[(&[u8; 4], &str)]) -> Vec<u8> {
		let mut list = b"INFO".to_vec();
		for (key, value) in items {
			let mut value = value.as_bytes().to_vec();
			value.push(0);
			write_chunk(&mut list, key, &value);
		}

		list
	}

	#[test_log::test]
	fn id3v2_chunk() {
		let file = build_wav(&[
			(b"data", &[0; 400]),
			(b"id3 ", &[1; 15]),
			(b"JUNK", &[0; 20]),
		]);

		let site = locate_id3v2(&mut Cursor::new(&file)).unwrap();
		assert!(site.exists);
		// RIFF header, `fmt ` and `data`
		let start = 12 + 24 + 408;
		assert_eq!(site.extent, Extent::new(start, start + 24));
		assert_eq!(site.padding, Some(Extent::new(start + 24, start + 52)));
		assert_eq!(site.patches.len(), 1);
		assert_eq!(site.patches[0].pos, 4);
		assert_eq!(site.patches[0].kind, PatchKind::ContainerSize);

		let content = &file[start as usize..site.extent.end as usize];
		assert_eq!(chunk_body(content).unwrap(), &[1; 15]);
	}

	#[test_log::test]
	fn missing_tags_are_appended() {
		let file = build_wav(&[(b"data", &[0; 10])]);
		let len = file.len() as u64;

		let site = locate_id3v2(&mut Cursor::new(&file)).unwrap();
		assert!(!site.exists);
		assert_eq!(site.extent, Extent::at(len));

		let site = locate_info(&mut Cursor::new(&file)).unwrap();
		assert!(!site.exists);
		assert_eq!(site.extent, Extent::at(len));
	}

	#[test_log::test]
	fn unpadded_last_chunk() {
		let mut file = build_wav(&[(b"data", &[0; 401])]);
		file.pop();
		let riff_size = file.len() as u32 - 8;
		file[4..8].copy_from_slice(&riff_size.to_le_bytes());

		let site = locate_info(&mut Cursor::new(&file)).unwrap();
		assert!(!site.exists);
		assert_eq!(site.extent, Extent::at(file.len() as u64));
		assert!(site.needs_pad_byte);

		let site = locate_id3v2(&mut Cursor::new(&file)).unwrap();
		assert!(site.needs_pad_byte);
	}

	#[test_log::test]
	fn back_to_back_junk_is_one_padding() {
		let list = info_list(&[(b"INAM", "Title")]);
		let file = build_wav(&[
			(b"LIST", &list),
			(b"JUNK", &[0; 12]),
			(b"JUNK", &[0; 20]),
			(b"data", &[0; 10]),
		]);

		let site = locate_info(&mut Cursor::new(&file)).unwrap();
		let list_end = 12 + 24 + 8 + list.len() as u64;
		assert_eq!(site.extent.end, list_end);
		assert_eq!(site.padding, Some(Extent::new(list_end, list_end + 20 + 28)));
		assert!(!site.needs_pad_byte);
	}

	#[test_log::test]
	fn scattered_info_chunks() {
		let list = info_list(&[(b"INAM", "Title")]);
		let mut disp = 1u32.to_le_bytes().to_vec();
		disp.extend_from_slice(b"Hi\0");

		let file = build_wav(&[
			(b"LIST", &list),
			(b"disp", &disp),
			(b"data", &[0; 10]),
			(b"LIST", b"adtl"),
			(b"disp", &disp),
		]);

		let site = locate_info(&mut Cursor::new(&file)).unwrap();
		assert!(site.exists);

		let list_start = 12 + 24;
		let disp_end = list_start + 8 + list.len() as u64 + 8 + 8;
		assert_eq!(site.extent, Extent::new(list_start, disp_end));

		// `LIST adtl` belongs to nothing
		let orphan_start = disp_end + 18 + 12;
		assert_eq!(site.orphans, [Extent::new(orphan_start, orphan_start + 16)]);
	}

	#[test_log::test]
	fn id3v2_chunk_name() {
		assert!(wrap_id3v2(Vec::new(), WriteOptions::new()).is_empty());

		let chunk = wrap_id3v2(vec![1, 2, 3], WriteOptions::new());
		assert_eq!(chunk, b"id3 \x03\0\0\0\x01\x02\x03\0");

		let chunk = wrap_id3v2(vec![1, 2], WriteOptions::new().uppercase_id3v2_chunk(true));
		assert_eq!(chunk, b"ID3 \x02\0\0\0\x01\x02");
	}
}
