use crate::config::{ParseOptions, ParsingMode};
use crate::error::Result;
use crate::macros::decode_err;
use crate::properties::{StreamBounds, TechnicalInfo};

use std::io::{Read, Seek, SeekFrom};
use std::time::Duration;

use byteorder::{LittleEndian, ReadBytesExt};

/// The layout of the stream header changed in this version
const DESCRIPTOR_VERSION: u16 = 3980;
/// The descriptor length, including the `MAC ` magic and version
const DESCRIPTOR_LEN: u32 = 52;

struct StreamHeader {
	blocks_per_frame: u32,
	final_frame_blocks: u32,
	total_frames: u32,
	bit_depth: u8,
	channels: u8,
	sample_rate: u32,
}

/// Read the Monkey's Audio stream header at the start of `bounds`
pub(crate) fn read_properties<R>(
	reader: &mut R,
	bounds: StreamBounds,
	parse_options: ParseOptions,
) -> Result<TechnicalInfo>
where
	R: Read + Seek,
{
	reader.seek(SeekFrom::Start(bounds.start))?;

	let mut magic = [0; 4];
	reader.read_exact(&mut magic)?;
	if &magic != b"MAC " {
		decode_err!(@BAIL Ape, "Stream doesn't start with \"MAC \"");
	}

	let version = reader
		.read_u16::<LittleEndian>()
		.map_err(|_| decode_err!(Ape, "Unable to read the stream version"))?;

	log::debug!("APE: Stream version {version}");

	let header = if version >= DESCRIPTOR_VERSION {
		read_descriptor_header(reader)?
	} else {
		read_legacy_header(reader, version)?
	};

	let mut info = TechnicalInfo {
		sample_rate: Some(header.sample_rate),
		bit_depth: Some(header.bit_depth),
		channels: Some(header.channels),
		audio_data_offset: bounds.start,
		audio_data_size: bounds.len(),
		..TechnicalInfo::default()
	};

	if let Err(err) = verify(&header) {
		if parse_options.parsing_mode == ParsingMode::Strict {
			return Err(err);
		}

		log::warn!("APE: {err}, skipping the duration");
		return Ok(info);
	}

	// Every frame but the last holds `blocks_per_frame` samples
	let total_samples = u64::from(header.final_frame_blocks)
		+ u64::from(header.blocks_per_frame) * u64::from(header.total_frames - 1);

	if header.sample_rate > 0 {
		let sample_rate = u64::from(header.sample_rate);
		let millis = (total_samples * 1000 + sample_rate / 2) / sample_rate;

		info.duration = Duration::from_millis(millis);
		info.bitrate = TechnicalInfo::audio_bitrate(bounds.len(), info.duration);
	}

	Ok(info)
}

fn read_descriptor_header<R>(reader: &mut R) -> Result<StreamHeader>
where
	R: Read + Seek,
{
	let mut descriptor = [0; 46];
	reader.read_exact(&mut descriptor).map_err(|_| {
		decode_err!(
			Ape,
			"Not enough data left in reader to finish file descriptor"
		)
	})?;

	// The descriptor length is the only thing needed, anything past the known layout is skipped
	let descriptor_len = (&descriptor[2..6]).read_u32::<LittleEndian>()?;
	if descriptor_len > DESCRIPTOR_LEN {
		reader.seek(SeekFrom::Current(i64::from(descriptor_len - DESCRIPTOR_LEN)))?;
	}

	let mut header = [0; 24];
	reader
		.read_exact(&mut header)
		.map_err(|_| decode_err!(Ape, "Not enough data left in reader to finish MAC header"))?;

	// Skip the compression type (2) and format flags (2)
	let header_read = &mut &header[4..];

	Ok(StreamHeader {
		blocks_per_frame: header_read.read_u32::<LittleEndian>()?,
		final_frame_blocks: header_read.read_u32::<LittleEndian>()?,
		total_frames: header_read.read_u32::<LittleEndian>()?,
		bit_depth: header_read.read_u16::<LittleEndian>()? as u8,
		channels: header_read.read_u16::<LittleEndian>()? as u8,
		sample_rate: header_read.read_u32::<LittleEndian>()?,
	})
}

fn read_legacy_header<R>(reader: &mut R, version: u16) -> Result<StreamHeader>
where
	R: Read,
{
	let mut header = [0; 26];
	reader
		.read_exact(&mut header)
		.map_err(|_| decode_err!(Ape, "Not enough data left in reader to finish MAC header"))?;

	let header_read = &mut &header[..];

	let compression_level = header_read.read_u16::<LittleEndian>()?;
	let format_flags = header_read.read_u16::<LittleEndian>()?;

	let bit_depth = if format_flags & 0b1 == 1 {
		8
	} else if format_flags & 0b1000 == 8 {
		24
	} else {
		16
	};

	let blocks_per_frame = match version {
		_ if version >= 3950 => 73728 * 4,
		_ if version >= 3900 || (version >= 3800 && compression_level >= 4000) => 73728,
		_ => 9216,
	};

	let channels = header_read.read_u16::<LittleEndian>()? as u8;
	let sample_rate = header_read.read_u32::<LittleEndian>()?;

	// Skip the WAV header length (4) and WAV tail length (4)
	let mut skip = [0; 8];
	header_read.read_exact(&mut skip)?;

	Ok(StreamHeader {
		blocks_per_frame,
		total_frames: header_read.read_u32::<LittleEndian>()?,
		final_frame_blocks: header_read.read_u32::<LittleEndian>()?,
		bit_depth,
		channels,
		sample_rate,
	})
}

fn verify(header: &StreamHeader) -> Result<()> {
	if !(1..=32).contains(&header.channels) {
		decode_err!(@BAIL Ape, "File has an invalid channel count (must be between 1 and 32 inclusive)");
	}

	if header.total_frames == 0 {
		decode_err!(@BAIL Ape, "File contains no frames");
	}

	Ok(())
}
