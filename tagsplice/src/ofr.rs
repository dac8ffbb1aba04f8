//! OptimFROG
//!
//! A lossless format carrying the same tags as Monkey's Audio: APE (native), ID3v2 and ID3v1.
//! Only its stream header is read.

use crate::config::{ParseOptions, ParsingMode};
use crate::error::Result;
use crate::macros::decode_err;
use crate::properties::{StreamBounds, TechnicalInfo};

use std::io::{Read, Seek, SeekFrom};
use std::time::Duration;

use byteorder::{LittleEndian, ReadBytesExt};

const OFR_MAGIC: &[u8; 4] = b"OFR ";

/// Bits per sample, indexed by the sample type. Types from 8 onwards are floating point.
const SAMPLE_BITS: [u8; 11] = [8, 8, 16, 16, 24, 24, 32, 32, 32, 32, 32];

struct StreamHeader {
	size: u32,
	length: u32,
	hi_length: u16,
	sample_type: u8,
	channel_mode: u8,
	sample_rate: u32,
	encoder_id: u16,
	compression_id: u8,
}

impl StreamHeader {
	fn read<R>(reader: &mut R) -> Result<Self>
	where
		R: Read,
	{
		let mut magic = [0; 4];
		reader.read_exact(&mut magic)?;
		if &magic != OFR_MAGIC {
			decode_err!(@BAIL OptimFrog, "Stream doesn't start with \"OFR \"");
		}

		let size = reader.read_u32::<LittleEndian>()?;
		let length = reader.read_u32::<LittleEndian>()?;
		let hi_length = reader.read_u16::<LittleEndian>()?;
		let sample_type = reader.read_u8()?;
		let channel_mode = reader.read_u8()?;
		let sample_rate = reader.read_i32::<LittleEndian>()?;
		let encoder_id = reader.read_u16::<LittleEndian>()?;
		let compression_id = reader.read_u8()?;

		let Ok(sample_rate) = u32::try_from(sample_rate) else {
			decode_err!(@BAIL OptimFrog, "Stream has a negative sample rate");
		};

		Ok(Self {
			size,
			length,
			hi_length,
			sample_type,
			channel_mode,
			sample_rate,
			encoder_id,
			compression_id,
		})
	}

	fn total_samples(&self) -> u64 {
		// The lengths count samples across all channels
		let shift = u32::from(self.channel_mode);
		u64::from(self.length.checked_shr(shift).unwrap_or(0))
			+ u64::from(self.hi_length.checked_shr(shift).unwrap_or(0)) * 0x1_0000
	}
}

/// Read the OptimFROG stream header at the start of `bounds`
pub(crate) fn read_properties<R>(
	reader: &mut R,
	bounds: StreamBounds,
	parse_options: ParseOptions,
) -> Result<TechnicalInfo>
where
	R: Read + Seek,
{
	reader.seek(SeekFrom::Start(bounds.start))?;

	let header = StreamHeader::read(reader)?;

	log::debug!(
		"OptimFROG: Encoder {:#06x}, compression {}, header size {}",
		header.encoder_id,
		header.compression_id,
		header.size
	);

	let mut info = TechnicalInfo {
		sample_rate: Some(header.sample_rate),
		channels: Some(header.channel_mode.saturating_add(1)),
		audio_data_offset: bounds.start,
		audio_data_size: bounds.len(),
		..TechnicalInfo::default()
	};

	match SAMPLE_BITS.get(usize::from(header.sample_type)) {
		Some(bits) => info.bit_depth = Some(*bits),
		None if parse_options.parsing_mode == ParsingMode::Strict => {
			decode_err!(@BAIL OptimFrog, "Unknown sample type");
		},
		None => log::warn!("OptimFROG: Unknown sample type {}", header.sample_type),
	}

	if header.sample_rate > 0 {
		let sample_rate = u64::from(header.sample_rate);
		let millis = (header.total_samples() * 1000 + sample_rate / 2) / sample_rate;
		info.duration = Duration::from_millis(millis);
	}

	// The header is not audio
	let audio_len = bounds.len().saturating_sub(u64::from(header.size));
	info.bitrate = TechnicalInfo::audio_bitrate(audio_len, info.duration);

	Ok(info)
}
