use super::header::{Header, VbrHeader, VbrHeaderType, find_next_frame, rev_search_for_frame_header};
use crate::config::ParseOptions;
use crate::error::Result;
use crate::macros::decode_err;
use crate::properties::{StreamBounds, TechnicalInfo};

use std::io::{Read, Seek, SeekFrom};
use std::time::Duration;

use byteorder::ReadBytesExt;

/// Read the properties of the frames within `bounds`
pub(crate) fn read_properties<R>(
	reader: &mut R,
	bounds: StreamBounds,
	parse_options: ParseOptions,
) -> Result<TechnicalInfo>
where
	R: Read + Seek,
{
	reader.seek(SeekFrom::Start(bounds.start))?;

	// Skip any invalid padding
	let mut skipped = 0;
	while skipped < parse_options.max_junk_bytes {
		match reader.read_u8() {
			Ok(0) => skipped += 1,
			Ok(_) => {
				reader.seek(SeekFrom::Current(-1))?;
				break;
			},
			Err(_) => break,
		}
	}

	let Some((first_frame, first_frame_offset)) = find_next_frame(reader)? else {
		decode_err!(@BAIL Mpeg, "File contains an invalid frame");
	};

	if first_frame_offset >= bounds.end {
		decode_err!(@BAIL Mpeg, "No frames found before the trailing tags");
	}

	if first_frame.sample_rate == 0 {
		decode_err!(@BAIL Mpeg, "Sample rate is 0");
	}

	let mut info = TechnicalInfo {
		sample_rate: Some(first_frame.sample_rate),
		channels: Some(first_frame.channels()),
		audio_data_offset: first_frame_offset,
		audio_data_size: bounds.end.saturating_sub(first_frame_offset),
		..TechnicalInfo::default()
	};

	let vbr_header = read_vbr_header(reader, &first_frame, first_frame_offset, bounds.end)?;

	if let Some(vbr_header) = vbr_header.filter(VbrHeader::is_valid) {
		log::debug!("MPEG: Valid VBR header; using it to calculate duration");

		let samples = u64::from(first_frame.samples) * u64::from(vbr_header.frames);
		let millis = (samples * 1000 + u64::from(first_frame.sample_rate) / 2)
			/ u64::from(first_frame.sample_rate);

		info.duration = Duration::from_millis(millis);
		info.is_vbr = vbr_header.ty != VbrHeaderType::Info;
		info.bitrate = TechnicalInfo::audio_bitrate(u64::from(vbr_header.size), info.duration);

		return Ok(info);
	}

	log::debug!("MPEG: Using bitrate to estimate duration");

	let stream_end = find_stream_end(reader, &first_frame, bounds.end)?;
	let stream_len = stream_end.saturating_sub(first_frame_offset);

	let millis = (stream_len * 8 + u64::from(first_frame.bitrate) / 2) / u64::from(first_frame.bitrate);
	info.duration = Duration::from_millis(millis);
	info.bitrate = Some(first_frame.bitrate);

	Ok(info)
}

fn read_vbr_header<R>(
	reader: &mut R,
	first_frame: &Header,
	first_frame_offset: u64,
	stream_end: u64,
) -> Result<Option<VbrHeader>>
where
	R: Read + Seek,
{
	let location = first_frame_offset + u64::from(first_frame.data_start);
	if location + 32 > stream_end {
		return Ok(None);
	}

	reader.seek(SeekFrom::Start(location))?;

	let mut buf = [0; 32];
	reader.read_exact(&mut buf)?;

	VbrHeader::read(&mut &buf[..])
}

// The end of the last frame belonging to the same stream as `first_frame`
fn find_stream_end<R>(reader: &mut R, first_frame: &Header, bounds_end: u64) -> Result<u64>
where
	R: Read + Seek,
{
	let mut pos = bounds_end;
	while pos > 0 {
		match rev_search_for_frame_header(reader, &mut pos) {
			Ok(Some(header)) if header.matches(first_frame) => {
				return Ok((pos + u64::from(header.len)).min(bounds_end));
			},
			Ok(_) => {},
			Err(_) => break,
		}
	}

	log::warn!("MPEG: Could not find the last frame, assuming the stream fills the file");
	Ok(bounds_end)
}
