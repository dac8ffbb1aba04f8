use tagsplice::config::ParseOptions;
use tagsplice::picture::{MimeType, Picture, PictureType};
use tagsplice::track::Track;

use std::io::Write as _;
use std::path::Path;

use tempfile::NamedTempFile;

/// Write `content` to a new temporary file
///
/// The file is deleted once the returned handle is dropped.
pub fn temp_file(content: &[u8]) -> NamedTempFile {
	let mut file = NamedTempFile::new().unwrap();
	file.write_all(content).unwrap();
	file.flush().unwrap();

	file
}

pub fn load(path: impl AsRef<Path>) -> Track {
	Track::load_with_options(path, ParseOptions::new()).unwrap()
}

pub fn file_len(path: impl AsRef<Path>) -> u64 {
	std::fs::metadata(path).unwrap().len()
}

/// The bytes the track claims as its audio
pub fn audio_of(path: impl AsRef<Path>, track: &Track) -> Vec<u8> {
	let file = std::fs::read(path).unwrap();
	let info = track.info();

	let start = info.audio_data_offset() as usize;
	let end = start + info.audio_data_size() as usize;
	assert!(end <= file.len(), "audio runs past the end of the file");

	file[start..end].to_vec()
}

/// A PNG signature followed by `len` bytes of `fill`
pub fn png(len: usize, fill: u8) -> Picture {
	let mut data = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
	data.resize(data.len() + len, fill);

	Picture::new(PictureType::Other, Some(MimeType::Png), None, data)
}

/// MPEG-1 Layer III frames, 128 kbps, 44.1 kHz
pub fn mpeg_frames(count: usize) -> Vec<u8> {
	const FRAME_LEN: usize = 417;

	let mut stream = Vec::with_capacity(count * FRAME_LEN);
	for index in 0..count {
		stream.extend_from_slice(&0xFFFB_9064_u32.to_be_bytes());
		// Never 0xFF, so nothing in the payload looks like a frame sync
		stream.resize(stream.len() + FRAME_LEN - 4, (index % 200) as u8 + 1);
	}

	stream
}

/// A 128 byte ID3v1 tag
pub fn id3v1(title: &str, artist: &str) -> Vec<u8> {
	let mut tag = b"TAG".to_vec();

	for value in [title, artist, ""] {
		let mut field = value.as_bytes().to_vec();
		field.resize(30, 0);
		tag.extend(field);
	}

	// Year, comment, and genre
	tag.extend_from_slice(b"2024");
	tag.resize(tag.len() + 30, 0);
	tag.push(0xFF);

	assert_eq!(tag.len(), 128);
	tag
}

pub fn atom(ident: &[u8; 4], body: &[u8]) -> Vec<u8> {
	let mut atom = ((body.len() + 8) as u32).to_be_bytes().to_vec();
	atom.extend_from_slice(ident);
	atom.extend_from_slice(body);
	atom
}

/// `ftyp`, `moov` with a five second `mvhd` and a chunk offset table, then `mdat`
pub fn mp4_file(mdat: &[u8]) -> Vec<u8> {
	let mut file = atom(b"ftyp", b"M4A \0\0\0\0isomM4A ");

	let mut mvhd = vec![0; 100];
	mvhd[12..16].copy_from_slice(&1000u32.to_be_bytes());
	mvhd[16..20].copy_from_slice(&5000u32.to_be_bytes());

	// One entry, patched below once the `mdat` position is known
	let stco = atom(b"stco", &[0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0]);
	let trak = atom(
		b"trak",
		&atom(b"mdia", &atom(b"minf", &atom(b"stbl", &stco))),
	);

	let mut moov = atom(b"mvhd", &mvhd);
	moov.extend(trak);
	file.extend(atom(b"moov", &moov));

	let mdat_body_start = file.len() as u32 + 8;
	let entry = stco_entry_pos(&file);
	file[entry..entry + 4].copy_from_slice(&mdat_body_start.to_be_bytes());

	file.extend(atom(b"mdat", mdat));
	file
}

/// The position of the first entry of the `stco` table
pub fn stco_entry_pos(file: &[u8]) -> usize {
	file.windows(4).position(|w| w == b"stco").unwrap() + 12
}

pub fn chunk(fourcc: &[u8; 4], body: &[u8]) -> Vec<u8> {
	let mut chunk = fourcc.to_vec();
	chunk.extend_from_slice(&(body.len() as u32).to_le_bytes());
	chunk.extend_from_slice(body);
	if body.len() % 2 != 0 {
		chunk.push(0);
	}

	chunk
}

/// A RIFF form with a 16 bit stereo 44.1kHz `fmt ` chunk, followed by `chunks`
pub fn wav_file(chunks: &[Vec<u8>]) -> Vec<u8> {
	let mut fmt = Vec::new();
	fmt.extend_from_slice(&1u16.to_le_bytes());
	fmt.extend_from_slice(&2u16.to_le_bytes());
	fmt.extend_from_slice(&44_100u32.to_le_bytes());
	fmt.extend_from_slice(&(44_100u32 * 4).to_le_bytes());
	fmt.extend_from_slice(&4u16.to_le_bytes());
	fmt.extend_from_slice(&16u16.to_le_bytes());

	let mut body = b"WAVE".to_vec();
	body.extend(chunk(b"fmt ", &fmt));
	for c in chunks {
		body.extend_from_slice(c);
	}

	chunk(b"RIFF", &body)
}

/// An OptimFROG stream of `samples` stereo 16 bit samples at 44.1kHz, with `audio_len` bytes
/// of audio
pub fn ofr_file(samples: u32, audio_len: usize) -> Vec<u8> {
	let mut stream = b"OFR ".to_vec();
	stream.extend_from_slice(&15u32.to_le_bytes());
	stream.extend_from_slice(&(samples * 2).to_le_bytes());
	stream.extend_from_slice(&0u16.to_le_bytes());
	// Sample type, channel mode
	stream.extend_from_slice(&[2, 1]);
	stream.extend_from_slice(&44_100i32.to_le_bytes());
	stream.extend_from_slice(&0x4510u16.to_le_bytes());
	stream.push(1);

	for index in 0..audio_len {
		stream.push((index % 251) as u8);
	}

	stream
}
