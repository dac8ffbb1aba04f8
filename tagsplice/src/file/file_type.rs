use super::registry;
use crate::id3::v2::synchsafe::SynchsafeInteger;
use crate::mpeg::header::verify_frame_sync;
use crate::tag::TagType;

use std::ffi::OsStr;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// The container format of a file
///
/// Every supported format is a variant here, and is resolved once when a file is loaded.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[allow(missing_docs)]
#[non_exhaustive]
pub enum FileType {
	Mpeg,
	Mp4,
	Wav,
	Ape,
	OptimFrog,
}

impl FileType {
	/// The tag system most likely to be used in the format
	///
	/// # Examples
	///
	/// ```rust
	/// use tagsplice::file::FileType;
	/// use tagsplice::tag::TagType;
	///
	/// assert_eq!(FileType::Mp4.native_tag_type(), TagType::Mp4Ilst);
	/// ```
	pub fn native_tag_type(self) -> TagType {
		registry::descriptor(self).native
	}

	/// Whether the format can carry the given tag system
	pub fn supports_tag_type(self, tag_type: TagType) -> bool {
		registry::descriptor(self).tag_types.contains(&tag_type)
	}

	/// The tag systems the format can carry, in save order
	pub fn tag_types(self) -> &'static [TagType] {
		registry::descriptor(self).tag_types
	}

	/// Attempts to extract a [`FileType`] from an extension
	///
	/// # Examples
	///
	/// ```rust
	/// use tagsplice::file::FileType;
	///
	/// assert_eq!(FileType::from_ext("M4B"), Some(FileType::Mp4));
	/// ```
	pub fn from_ext<E>(ext: E) -> Option<Self>
	where
		E: AsRef<OsStr>,
	{
		let ext = ext.as_ref().to_str()?.to_ascii_lowercase();
		registry::registry().by_extension(&ext)
	}

	/// Attempts to extract a [`FileType`] from a MIME type
	///
	/// # Examples
	///
	/// ```rust
	/// use tagsplice::file::FileType;
	///
	/// assert_eq!(FileType::from_mime("audio/x-wav"), Some(FileType::Wav));
	/// ```
	pub fn from_mime(mime: &str) -> Option<Self> {
		registry::registry().by_mime(&mime.to_ascii_lowercase())
	}

	/// Attempts to determine a [`FileType`] from a path
	pub fn from_path<P>(path: P) -> Option<Self>
	where
		P: AsRef<Path>,
	{
		let ext = path.as_ref().extension();
		ext.and_then(Self::from_ext)
	}

	/// Attempts to extract a [`FileType`] from a buffer
	///
	/// This **will not** search past tags at the start of the buffer, see [`FileType::sniff`].
	///
	/// # Examples
	///
	/// ```rust
	/// use tagsplice::file::FileType;
	///
	/// assert_eq!(FileType::from_buffer(b"RIFF\x24\0\0\0WAVEfmt "), Some(FileType::Wav));
	/// ```
	pub fn from_buffer(buf: &[u8]) -> Option<Self> {
		match buf {
			[b'M', b'A', b'C', b' ', ..] => Some(Self::Ape),
			[b'O', b'F', b'R', b' ', ..] => Some(Self::OptimFrog),
			[b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'A', b'V', b'E', ..] => Some(Self::Wav),
			[_, _, _, _, b'f', b't', b'y', b'p', ..] => Some(Self::Mp4),
			[first, second, ..] if verify_frame_sync([*first, *second]) => Some(Self::Mpeg),
			_ => None,
		}
	}

	/// Guess the [`FileType`] of a stream by its content
	///
	/// Unlike [`FileType::from_buffer`], this skips an ID3v2 tag at the start of the stream, and
	/// searches up to `max_junk_bytes` for an MPEG frame.
	///
	/// The stream position is restored afterwards.
	///
	/// # Errors
	///
	/// * `reader` could not be read or seeked
	pub fn sniff<R>(reader: &mut R, max_junk_bytes: usize) -> std::io::Result<Option<Self>>
	where
		R: Read + Seek,
	{
		let start = reader.stream_position()?;
		let guess = Self::sniff_inner(reader, max_junk_bytes);
		reader.seek(SeekFrom::Start(start))?;

		guess
	}

	fn sniff_inner<R>(reader: &mut R, max_junk_bytes: usize) -> std::io::Result<Option<Self>>
	where
		R: Read + Seek,
	{
		let mut buf = [0; 12];
		let read = read_up_to(reader, &mut buf)?;

		if read >= 10 && &buf[..3] == b"ID3" {
			let size = u32::from_be_bytes([buf[6], buf[7], buf[8], buf[9]]).unsynch();
			let footer = if buf[5] & 0x10 == 0x10 { 10 } else { 0 };
			log::debug!("Skipping an ID3v2 tag of {size} bytes to find the file type");

			reader.seek(SeekFrom::Current(
				i64::from(size) + footer + 10 - read as i64,
			))?;

			let read = read_up_to(reader, &mut buf)?;
			if let Some(file_type) = Self::from_buffer(&buf[..read]) {
				return Ok(Some(file_type));
			}

			reader.seek(SeekFrom::Current(-(read as i64)))?;
			return search_for_mpeg(reader, max_junk_bytes);
		}

		if let Some(file_type) = Self::from_buffer(&buf[..read]) {
			return Ok(Some(file_type));
		}

		reader.seek(SeekFrom::Current(-(read as i64)))?;
		search_for_mpeg(reader, max_junk_bytes)
	}
}

fn read_up_to<R>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize>
where
	R: Read,
{
	let mut total = 0;
	while total < buf.len() {
		match reader.read(&mut buf[total..])? {
			0 => break,
			n => total += n,
		}
	}

	Ok(total)
}

fn search_for_mpeg<R>(reader: &mut R, max_junk_bytes: usize) -> std::io::Result<Option<FileType>>
where
	R: Read,
{
	let found = crate::mpeg::header::search_for_frame_sync(&mut reader.take(max_junk_bytes as u64))?;
	Ok(found.map(|_| FileType::Mpeg))
}

#[cfg(test)]
mod tests {
	use super::FileType;

	use std::io::Cursor;

	#[test_log::test]
	fn buffer_signatures() {
		assert_eq!(FileType::from_buffer(b"MAC \x96\x0f"), Some(FileType::Ape));
		assert_eq!(FileType::from_buffer(b"OFR \x0f\0\0\0"), Some(FileType::OptimFrog));
		assert_eq!(
			FileType::from_buffer(b"\0\0\0\x18ftypM4A "),
			Some(FileType::Mp4)
		);
		assert_eq!(FileType::from_buffer(&[0xFF, 0xFB, 0x90]), Some(FileType::Mpeg));
		assert_eq!(FileType::from_buffer(b"RIFF\0\0\0\0AVI "), None);
		assert_eq!(FileType::from_buffer(&[]), None);
	}

	#[test_log::test]
	fn sniff_skips_id3v2() {
		let mut data = b"ID3\x04\x00\x00\x00\x00\x00\x04\0\0\0\0".to_vec();
		data.extend_from_slice(&[0xFF, 0xFB, 0x90, 0x00]);

		let mut reader = Cursor::new(data);
		assert_eq!(
			FileType::sniff(&mut reader, 1024).unwrap(),
			Some(FileType::Mpeg)
		);
		assert_eq!(reader.position(), 0);
	}

	#[test_log::test]
	fn sniff_searches_junk() {
		let mut data = vec![0; 40];
		data.extend_from_slice(&[0xFF, 0xFB, 0x90, 0x00]);

		assert_eq!(
			FileType::sniff(&mut Cursor::new(data.clone()), 1024).unwrap(),
			Some(FileType::Mpeg)
		);
		assert_eq!(FileType::sniff(&mut Cursor::new(data), 8).unwrap(), None);
	}
}
