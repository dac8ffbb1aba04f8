use super::chunks;
use crate::config::{ParseOptions, ParsingMode};
use crate::error::Result;
use crate::iff::read_body;
use crate::macros::decode_err;
use crate::properties::{StreamBounds, TechnicalInfo};

use std::io::{Read, Seek};
use std::time::Duration;

use byteorder::{ByteOrder, LittleEndian};

const PCM: u16 = 0x0001;
const IEEE_FLOAT: u16 = 0x0003;
const EXTENSIBLE: u16 = 0xFFFE;

#[derive(Copy, Clone, Debug)]
struct FmtChunk {
	format_tag: u16,
	channels: u16,
	sample_rate: u32,
	bytes_per_second: u32,
	block_align: u16,
	bits_per_sample: u16,
	/// Only present in the extensible format
	valid_bits_per_sample: Option<u16>,
}

fn read_fmt_chunk(fmt: &[u8]) -> Result<FmtChunk> {
	if fmt.len() < 16 {
		decode_err!(@BAIL Wav, "File does not contain a valid \"fmt \" chunk");
	}

	let mut fmt_chunk = FmtChunk {
		format_tag: LittleEndian::read_u16(&fmt[..2]),
		channels: LittleEndian::read_u16(&fmt[2..4]),
		sample_rate: LittleEndian::read_u32(&fmt[4..8]),
		bytes_per_second: LittleEndian::read_u32(&fmt[8..12]),
		block_align: LittleEndian::read_u16(&fmt[12..14]),
		bits_per_sample: LittleEndian::read_u16(&fmt[14..16]),
		valid_bits_per_sample: None,
	};

	if fmt_chunk.format_tag == EXTENSIBLE {
		if fmt.len() < 40 {
			decode_err!(@BAIL Wav, "Extensible format identified, invalid \"fmt \" chunk size found (< 40)");
		}

		// cbSize (2), valid bits per sample (2), channel mask (4), then the sub format GUID
		fmt_chunk.valid_bits_per_sample = Some(LittleEndian::read_u16(&fmt[18..20]));
		fmt_chunk.format_tag = LittleEndian::read_u16(&fmt[24..26]);
	}

	Ok(fmt_chunk)
}

/// Read the `fmt ` chunk, and the extent of the `data` chunk
pub(crate) fn read_properties<R>(
	reader: &mut R,
	bounds: StreamBounds,
	parse_options: ParseOptions,
) -> Result<TechnicalInfo>
where
	R: Read + Seek,
{
	let parsing_mode = parse_options.parsing_mode;

	let mut fmt = None;
	let mut total_samples = 0;
	let mut data = None;

	for chunk in chunks(reader, parsing_mode)? {
		match &chunk.fourcc {
			b"fmt " if fmt.is_none() => fmt = Some(read_body(reader, &chunk)?),
			b"fact" if total_samples == 0 && chunk.body_len() >= 4 => {
				total_samples = LittleEndian::read_u32(&read_body(reader, &chunk)?[..4]);
			},
			b"data" if data.is_none() => data = Some(chunk),
			_ => {},
		}
	}

	let Some(fmt) = fmt else {
		decode_err!(@BAIL Wav, "File does not contain a \"fmt \" chunk");
	};

	let mut info = TechnicalInfo::default();
	let stream_len = match data {
		Some(data) => {
			info.audio_data_offset = data.body_start();
			info.audio_data_size = data.body_len();
			data.body_len()
		},
		None if parsing_mode == ParsingMode::Strict => {
			decode_err!(@BAIL Wav, "File does not contain a \"data\" chunk");
		},
		None => {
			log::warn!("WAV: No `data` chunk found, assuming the audio spans the stream");
			info.audio_data_offset = bounds.start;
			info.audio_data_size = bounds.len();
			0
		},
	};

	let fmt = read_fmt_chunk(&fmt)?;

	if fmt.channels == 0 {
		decode_err!(@BAIL Wav, "File contains 0 channels");
	}

	if fmt.bits_per_sample % 8 != 0 {
		decode_err!(@BAIL Wav, "Bits per sample is not a multiple of 8");
	}

	info.channels = u8::try_from(fmt.channels).ok();
	info.sample_rate = Some(fmt.sample_rate);
	info.bit_depth = match fmt.valid_bits_per_sample {
		Some(valid) if valid > 0 => Some(valid as u8),
		_ if fmt.bits_per_sample > 0 => Some(fmt.bits_per_sample as u8),
		_ => Some(((fmt.block_align / fmt.channels) * 8) as u8),
	};

	let pcm = fmt.format_tag == PCM || fmt.format_tag == IEEE_FLOAT;
	if !pcm && total_samples == 0 {
		log::warn!("WAV: Non-PCM format without a \"fact\" chunk, using the byte rate");
	}

	let mut total_samples = u64::from(total_samples);
	if fmt.bits_per_sample > 0 && (total_samples == 0 || pcm) {
		total_samples = stream_len / (u64::from(fmt.channels) * u64::from(fmt.bits_per_sample / 8));
	}

	if fmt.sample_rate > 0 && total_samples > 0 {
		log::debug!("WAV: Calculating duration from total samples");

		let sample_rate = u64::from(fmt.sample_rate);
		info.duration = Duration::from_millis((total_samples * 1000 + sample_rate / 2) / sample_rate);
	} else if stream_len > 0 && fmt.bytes_per_second > 0 {
		log::debug!("WAV: Calculating duration from stream length and byte rate");

		let byte_rate = u64::from(fmt.bytes_per_second);
		info.duration = Duration::from_millis((stream_len * 1000 + byte_rate / 2) / byte_rate);
	} else {
		log::warn!("WAV: Unable to calculate duration");
	}

	info.bitrate = if fmt.bytes_per_second > 0 {
		Some(((u64::from(fmt.bytes_per_second) * 8 + 500) / 1000) as u32)
	} else {
		TechnicalInfo::audio_bitrate(stream_len, info.duration)
	};

	Ok(info)
}

#[cfg(test)]
mod tests {
	use super::read_properties;
	use crate::config::{ParseOptions, ParsingMode};
	use crate::iff::wav::tests::build_wav;
	use crate::properties::StreamBounds;

	use std::io::Cursor;

	fn bounds(file: &[u8]) -> StreamBounds {
		StreamBounds {
			start: 0,
			end: file.len() as u64,
		}
	}

	#[test_log::test]
	fn pcm() {
		// Half a second of 16 bit stereo at 44.1kHz
		let file = build_wav(&[(b"LIST", b"INFO"), (b"data", &[0; 88_200])]);

		let info = read_properties(&mut Cursor::new(&file), bounds(&file), ParseOptions::new()).unwrap();
		assert_eq!(info.duration_ms(), 500);
		assert_eq!(info.sample_rate(), Some(44_100));
		assert_eq!(info.channels(), Some(2));
		assert_eq!(info.bit_depth(), Some(16));
		assert_eq!(info.bitrate(), Some(1411));
		assert_eq!(info.audio_data_offset(), 12 + 24 + 12 + 8);
		assert_eq!(info.audio_data_size(), 88_200);
	}

	#[test_log::test]
	fn missing_data_per_mode() {
		let file = build_wav(&[]);

		let strict = ParseOptions::new().parsing_mode(ParsingMode::Strict);
		assert!(read_properties(&mut Cursor::new(&file), bounds(&file), strict).is_err());

		let info = read_properties(&mut Cursor::new(&file), bounds(&file), ParseOptions::new()).unwrap();
		assert_eq!(info.duration_ms(), 0);
		assert_eq!(info.audio_data_size(), file.len() as u64);
	}

	#[test_log::test]
	fn not_a_wav() {
		let file = b"RIFF\x04\0\0\0AVI ".to_vec();
		assert!(read_properties(&mut Cursor::new(&file), bounds(&file), ParseOptions::new()).is_err());
	}
}
