use super::atom::{Atom, AtomInfo, Atoms, find_child, skip_atom};
use crate::config::{ParseOptions, ParsingMode};
use crate::error::Result;
use crate::macros::{decode_err, try_vec};
use crate::properties::TechnicalInfo;
use crate::util::io::SeekStreamLen;

use std::io::{Read, Seek, SeekFrom};
use std::time::Duration;

use byteorder::{BigEndian, ByteOrder};

struct TimeScale {
	timescale: u32,
	duration: u64,
}

impl TimeScale {
	/// `mvhd` and `mdhd` share the layout of their first fields
	fn parse(body: &[u8]) -> Option<Self> {
		let version = *body.first()?;
		if version == 1 {
			// Version and flags, creation and modification time (8 each)
			let timescale = BigEndian::read_u32(body.get(20..24)?);
			let duration = BigEndian::read_u64(body.get(24..32)?);
			return Some(Self {
				timescale,
				duration,
			});
		}

		let timescale = BigEndian::read_u32(body.get(12..16)?);
		let duration = u64::from(BigEndian::read_u32(body.get(16..20)?));
		Some(Self {
			timescale,
			duration,
		})
	}

	fn as_duration(&self) -> Duration {
		if self.timescale == 0 {
			return Duration::ZERO;
		}

		let timescale = u64::from(self.timescale);
		Duration::from_millis((self.duration * 1000 + timescale / 2) / timescale)
	}
}

struct AudioTrak {
	mdhd: Option<TimeScale>,
	codec: [u8; 4],
	channels: u16,
	sample_size: u16,
	sample_rate: u32,
}

/// Read the properties of the first audio track, along with the extent of the first `mdat`
pub(crate) fn read_properties<R>(reader: &mut R, parse_options: ParseOptions) -> Result<TechnicalInfo>
where
	R: Read + Seek,
{
	let parsing_mode = parse_options.parsing_mode;
	let file_len = reader.stream_len_hack()?;

	reader.seek(SeekFrom::Start(0))?;

	let mut moov = None;
	let mut mdat = None;
	while let Some(atom) = AtomInfo::read(reader, file_len, parsing_mode)? {
		match &atom.ident {
			b"moov" if moov.is_none() => {
				let mut body = try_vec![0; (atom.len - atom.header_len) as usize];
				reader.read_exact(&mut body)?;
				moov = Some((atom, body));
			},
			b"mdat" if mdat.is_none() => mdat = Some(atom),
			_ => {},
		}

		skip_atom(reader, &atom)?;
	}

	let Some((moov, moov_body)) = moov else {
		decode_err!(@BAIL Mp4, "No \"moov\" atom found");
	};

	let mut info = TechnicalInfo::default();
	if let Some(mdat) = mdat {
		info.audio_data_offset = mdat.body_start();
		info.audio_data_size = mdat.len - mdat.header_len;
	} else {
		log::warn!("MP4: No `mdat` atom found");
	}

	let children = || Atoms::new(&moov_body, moov.body_start(), parsing_mode);

	let mvhd = find_child(children(), b"mvhd")?.and_then(|mvhd| TimeScale::parse(mvhd.body));

	let mut audio = None;
	for child in children() {
		let child = child?;
		if child.info.ident == *b"trak" {
			audio = read_trak(&child, parsing_mode)?;
			if audio.is_some() {
				break;
			}
		}
	}

	let timescale = match audio.as_mut().and_then(|trak| trak.mdhd.take()) {
		Some(mdhd) => Some(mdhd),
		None => mvhd,
	};

	match audio {
		Some(trak) => {
			log::debug!(
				"MP4: Audio track `{}`, {} channel(s)",
				String::from_utf8_lossy(&trak.codec),
				trak.channels
			);

			info.channels = u8::try_from(trak.channels).ok();
			info.sample_rate = Some(trak.sample_rate);
			if &trak.codec != b"mp4a" && trak.sample_size > 0 {
				info.bit_depth = u8::try_from(trak.sample_size).ok();
			}
		},
		None if parsing_mode == ParsingMode::Strict => {
			decode_err!(@BAIL Mp4, "File contains no audio tracks");
		},
		None => log::warn!("MP4: No audio track found, using the movie header"),
	}

	if let Some(timescale) = timescale {
		info.duration = timescale.as_duration();
	}

	info.bitrate = TechnicalInfo::audio_bitrate(info.audio_data_size, info.duration);
	Ok(info)
}

/// The audio properties of `trak`, `None` if it is not a sound track
fn read_trak(trak: &Atom<'_>, parsing_mode: ParsingMode) -> Result<Option<AudioTrak>> {
	let Some(mdia) = find_child(Atoms::children(trak, 0, parsing_mode), b"mdia")? else {
		return Ok(None);
	};

	let mut is_sound = false;
	let mut mdhd = None;
	let mut minf = None;

	for child in Atoms::children(&mdia, 0, parsing_mode) {
		let child = child?;
		match &child.info.ident {
			b"mdhd" => mdhd = TimeScale::parse(child.body),
			// Version and flags, predefined, then the handler type
			b"hdlr" => is_sound = child.body.get(8..12) == Some(&b"soun"[..]),
			b"minf" => minf = Some(child),
			_ => {},
		}
	}

	if !is_sound {
		return Ok(None);
	}

	let mut trak = AudioTrak {
		mdhd,
		codec: [0; 4],
		channels: 0,
		sample_size: 0,
		sample_rate: 0,
	};

	let Some(minf) = minf else {
		return Ok(Some(trak));
	};

	let Some(stbl) = find_child(Atoms::children(&minf, 0, parsing_mode), b"stbl")? else {
		return Ok(Some(trak));
	};

	let Some(stsd) = find_child(Atoms::children(&stbl, 0, parsing_mode), b"stsd")? else {
		return Ok(Some(trak));
	};

	// Version and flags, then the entry count
	if let Some(entry) = Atoms::children(&stsd, 8, parsing_mode).next().transpose()? {
		trak.codec = entry.info.ident;

		// Reserved (6), data reference index (2), version (2), revision level (2), vendor (4)
		if let Some(fields) = entry.body.get(16..28) {
			trak.channels = BigEndian::read_u16(&fields[..2]);
			trak.sample_size = BigEndian::read_u16(&fields[2..4]);
			// Compression ID (2), packet size (2), then a 16.16 fixed point rate
			trak.sample_rate = BigEndian::read_u32(&fields[8..12]) >> 16;
		}
	}

	Ok(Some(trak))
}
