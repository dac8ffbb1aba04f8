use super::constants::{BITRATES, PADDING_SIZES, SAMPLE_RATES, SAMPLES, SIDE_INFORMATION_SIZES};
use crate::error::Result;
use crate::macros::decode_err;

use std::io::{Read, Seek, SeekFrom};

use byteorder::{BigEndian, ReadBytesExt};

pub(crate) fn verify_frame_sync(frame_sync: [u8; 2]) -> bool {
	frame_sync[0] == 0xFF && frame_sync[1] >> 5 == 0b111
}

/// Find the first frame sync (11 set bits, byte aligned) in the reader
///
/// The returned index is relative to where the reader started.
pub(crate) fn search_for_frame_sync<R>(input: &mut R) -> std::io::Result<Option<u64>>
where
	R: Read,
{
	let mut bytes = input.bytes();

	let mut pair = [0u8; 2];
	match bytes.next() {
		Some(byte) => pair[0] = byte?,
		None => return Ok(None),
	}

	// Overlapping pairs, [0x01, 0x02, 0x03] is checked as [0x01, 0x02], [0x02, 0x03]
	for (index, byte) in bytes.enumerate() {
		pair[1] = byte?;
		if verify_frame_sync(pair) {
			return Ok(Some(index as u64));
		}

		pair[0] = pair[1];
	}

	Ok(None)
}

// How far back from the end of the stream to look for the last frame
const REV_FRAME_SEARCH_BOUNDS: u64 = 1024;

/// Search backwards from `pos` for a valid frame header
///
/// On success, `pos` is moved to the start of the frame.
pub(super) fn rev_search_for_frame_header<R>(input: &mut R, pos: &mut u64) -> Result<Option<Header>>
where
	R: Read + Seek,
{
	let window = (*pos).min(REV_FRAME_SEARCH_BOUNDS);

	*pos -= window;
	input.seek(SeekFrom::Start(*pos))?;

	let mut buf = Vec::with_capacity(window as usize);
	input.take(window).read_to_end(&mut buf)?;

	for start in (0..buf.len().saturating_sub(3)).rev() {
		if !verify_frame_sync([buf[start], buf[start + 1]]) {
			continue;
		}

		let data = u32::from_be_bytes([buf[start], buf[start + 1], buf[start + 2], buf[start + 3]]);

		// Plenty of junk looks like a frame sync (0xFF_FF_FF_FF), the header has to be valid too
		if let Some(header) = Header::read(data) {
			*pos += start as u64;
			input.seek(SeekFrom::Start(*pos))?;
			return Ok(Some(header));
		}
	}

	Ok(None)
}

// Version, layer, and sample rate of consecutive frames must match
pub(super) const HEADER_MASK: u32 = 0xFFFE_0C00;

#[derive(Default, PartialEq, Eq, Copy, Clone, Debug)]
pub(crate) enum MpegVersion {
	#[default]
	V1,
	V2,
	V2_5,
}

#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Layer {
	Layer1 = 1,
	Layer2 = 2,
	#[default]
	Layer3 = 3,
}

#[derive(Default, Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) enum ChannelMode {
	#[default]
	Stereo = 0,
	JointStereo = 1,
	DualChannel = 2,
	SingleChannel = 3,
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct Header {
	pub(crate) sample_rate: u32,
	pub(crate) len: u32,
	/// Offset of the side information end, where a VBR header would begin
	pub(crate) data_start: u32,
	pub(crate) samples: u16,
	pub(crate) bitrate: u32,
	pub(crate) version: MpegVersion,
	pub(crate) layer: Layer,
	pub(crate) channel_mode: ChannelMode,
}

impl Header {
	pub(super) fn read(data: u32) -> Option<Self> {
		let version = match (data >> 19) & 0b11 {
			0b00 => MpegVersion::V2_5,
			0b10 => MpegVersion::V2,
			0b11 => MpegVersion::V1,
			_ => return None,
		};

		let layer = match (data >> 17) & 0b11 {
			0b01 => Layer::Layer3,
			0b10 => Layer::Layer2,
			0b11 => Layer::Layer1,
			_ => {
				log::trace!("MPEG: Frame header uses a reserved layer");
				return None;
			},
		};

		let version_index = usize::from(version != MpegVersion::V1);
		let layer_index = layer as usize - 1;

		let bitrate = BITRATES[version_index][layer_index][((data >> 12) & 0xF) as usize];
		if bitrate == 0 {
			return None;
		}

		let sample_rate = match (data >> 10) & 0b11 {
			0b11 => return None,
			index => SAMPLE_RATES[version as usize][index as usize],
		};

		let padding = if (data >> 9) & 1 == 1 {
			u32::from(PADDING_SIZES[layer_index])
		} else {
			0
		};

		let channel_mode = match (data >> 6) & 0b11 {
			0b00 => ChannelMode::Stereo,
			0b01 => ChannelMode::JointStereo,
			0b10 => ChannelMode::DualChannel,
			_ => ChannelMode::SingleChannel,
		};

		let samples = SAMPLES[layer_index][version_index];
		let len = (u32::from(samples) * bitrate * 125 / sample_rate) + padding;

		Some(Header {
			sample_rate,
			len,
			data_start: SIDE_INFORMATION_SIZES[version_index][channel_mode as usize] + 4,
			samples,
			bitrate,
			version,
			layer,
			channel_mode,
		})
	}

	pub(super) fn matches(self, other: &Self) -> bool {
		self.version == other.version
			&& self.layer == other.layer
			&& self.sample_rate == other.sample_rate
	}

	pub(super) fn channels(self) -> u8 {
		match self.channel_mode {
			ChannelMode::SingleChannel => 1,
			_ => 2,
		}
	}
}

/// Find the first frame that is followed by a frame of the same stream
pub(super) fn find_next_frame<R>(reader: &mut R) -> Result<Option<(Header, u64)>>
where
	R: Read + Seek,
{
	let mut pos = reader.stream_position()?;

	while let Some(relative) = search_for_frame_sync(reader)? {
		let frame_start = pos + relative;

		reader.seek(SeekFrom::Start(frame_start))?;
		let data = reader.read_u32::<BigEndian>()?;

		if let Some(header) = Header::read(data) {
			reader.seek(SeekFrom::Start(frame_start + u64::from(header.len)))?;
			match reader.read_u32::<BigEndian>() {
				Ok(next) if next & HEADER_MASK == data & HEADER_MASK => {
					return Ok(Some((header, frame_start)));
				},
				// A single frame at the very end of the stream
				Err(_) => return Ok(Some((header, frame_start))),
				Ok(_) => {},
			}
		}

		// Resume right after the false sync
		pos = frame_start + 1;
		reader.seek(SeekFrom::Start(pos))?;
	}

	Ok(None)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(super) enum VbrHeaderType {
	Xing,
	Info,
	Vbri,
}

#[derive(Copy, Clone, Debug)]
pub(super) struct VbrHeader {
	pub(super) ty: VbrHeaderType,
	pub(super) frames: u32,
	pub(super) size: u32,
}

impl VbrHeader {
	pub(super) fn read(reader: &mut &[u8]) -> Result<Option<Self>> {
		let available = reader.len();

		let mut ident = [0; 4];
		reader.read_exact(&mut ident)?;

		match &ident {
			b"Xing" | b"Info" => {
				if available < 16 {
					decode_err!(@BAIL Mpeg, "Xing header has an invalid size (< 16)");
				}

				let flags = reader.read_u32::<BigEndian>()?;
				if flags & 0x03 != 0x03 {
					log::debug!("MPEG: Xing header is missing the frame and byte counts");
					return Ok(None);
				}

				let frames = reader.read_u32::<BigEndian>()?;
				let size = reader.read_u32::<BigEndian>()?;

				let ty = if &ident == b"Xing" {
					VbrHeaderType::Xing
				} else {
					VbrHeaderType::Info
				};

				Ok(Some(Self { ty, frames, size }))
			},
			b"VBRI" => {
				if available < 32 {
					decode_err!(@BAIL Mpeg, "VBRI header has an invalid size (< 32)");
				}

				// Version (2), delay (2), quality (2)
				let _info = reader.read_uint::<BigEndian>(6)?;

				let size = reader.read_u32::<BigEndian>()?;
				let frames = reader.read_u32::<BigEndian>()?;

				Ok(Some(Self {
					ty: VbrHeaderType::Vbri,
					frames,
					size,
				}))
			},
			_ => Ok(None),
		}
	}

	pub(super) fn is_valid(&self) -> bool {
		self.frames > 0 && self.size > 0
	}
}
