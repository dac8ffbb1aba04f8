//! Technical audio properties

use crate::config::ParseOptions;
use crate::error::Result;
use crate::file::FileType;

use std::io::{Read, Seek};
use std::time::Duration;

/// Read-only technical information about the audio stream
///
/// The audio data offset and size are kept up to date across saves and removals, they always
/// describe the audio payload of the file as it currently is on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub struct TechnicalInfo {
	pub(crate) duration: Duration,
	pub(crate) sample_rate: Option<u32>,
	pub(crate) bit_depth: Option<u8>,
	pub(crate) channels: Option<u8>,
	pub(crate) bitrate: Option<u32>,
	pub(crate) is_vbr: bool,
	pub(crate) audio_data_offset: u64,
	pub(crate) audio_data_size: u64,
}

impl TechnicalInfo {
	/// Duration of the audio
	pub fn duration(&self) -> Duration {
		self.duration
	}

	/// Duration of the audio in whole milliseconds
	pub fn duration_ms(&self) -> u64 {
		self.duration.as_millis() as u64
	}

	/// Sample rate (Hz)
	pub fn sample_rate(&self) -> Option<u32> {
		self.sample_rate
	}

	/// Bits per sample, for formats that have a fixed one
	pub fn bit_depth(&self) -> Option<u8> {
		self.bit_depth
	}

	/// Channel count
	pub fn channels(&self) -> Option<u8> {
		self.channels
	}

	/// Audio bitrate (kbps)
	pub fn bitrate(&self) -> Option<u32> {
		self.bitrate
	}

	/// Whether the stream uses a variable bitrate
	pub fn is_vbr(&self) -> bool {
		self.is_vbr
	}

	/// The offset of the first byte of the audio payload
	pub fn audio_data_offset(&self) -> u64 {
		self.audio_data_offset
	}

	/// The length of the audio payload
	pub fn audio_data_size(&self) -> u64 {
		self.audio_data_size
	}

	/// Info for a file whose properties were not read, covering the whole file
	pub(crate) fn pass_through(file_len: u64) -> Self {
		Self {
			audio_data_size: file_len,
			..Self::default()
		}
	}

	/// Follow a splice that moved everything at or after `old_end` by `delta`
	pub(crate) fn shift(&mut self, old_end: u64, delta: i64) {
		if delta == 0 || self.audio_data_offset < old_end {
			return;
		}

		match self.audio_data_offset.checked_add_signed(delta) {
			Some(offset) => self.audio_data_offset = offset,
			None => log::warn!("Audio data offset would become negative, leaving it as is"),
		}
	}

	pub(crate) fn audio_bitrate(audio_len: u64, duration: Duration) -> Option<u32> {
		let millis = duration.as_millis() as u64;
		if millis == 0 {
			return None;
		}

		Some(((audio_len * 8) / millis) as u32)
	}
}

/// The part of the file not claimed by tags at its start or end
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct StreamBounds {
	pub(crate) start: u64,
	pub(crate) end: u64,
}

impl StreamBounds {
	pub(crate) fn len(self) -> u64 {
		self.end.saturating_sub(self.start)
	}
}

pub(crate) fn read_info<R>(
	file_type: FileType,
	reader: &mut R,
	bounds: StreamBounds,
	parse_options: ParseOptions,
) -> Result<TechnicalInfo>
where
	R: Read + Seek,
{
	match file_type {
		FileType::Mpeg => crate::mpeg::properties::read_properties(reader, bounds, parse_options),
		FileType::Mp4 => crate::mp4::properties::read_properties(reader, parse_options),
		FileType::Wav => crate::iff::wav::properties::read_properties(reader, bounds, parse_options),
		FileType::Ape => crate::ape::properties::read_properties(reader, bounds, parse_options),
		FileType::OptimFrog => crate::ofr::read_properties(reader, bounds, parse_options),
	}
}
