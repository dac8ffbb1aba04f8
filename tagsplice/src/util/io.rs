//! Various traits for reading and writing to file-like objects

use crate::error::{Result, TagspliceError};
use crate::id3::v2::synchsafe::SynchsafeInteger;
use crate::macros::err;

use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom, Write};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};

// TODO: https://github.com/rust-lang/rust/issues/59359
pub(crate) trait SeekStreamLen: Seek {
	fn stream_len_hack(&mut self) -> Result<u64> {
		let current_pos = self.stream_position()?;
		let len = self.seek(SeekFrom::End(0))?;

		self.seek(SeekFrom::Start(current_pos))?;

		Ok(len)
	}
}

impl<T> SeekStreamLen for T where T: Seek {}

/// Provides a method to truncate an object to the specified length
///
/// This is one component of the [`FileLike`] trait, which is used to provide implementors access to
/// the save and remove operations of [`Track`](crate::track::Track).
///
/// Take great care in implementing this for downstream types, as tagsplice will assume that the
/// container has the new length specified. If this assumption were to be broken, files **will** become corrupted.
///
/// # Examples
///
/// ```rust
/// use tagsplice::io::Truncate;
///
/// let mut data = vec![1, 2, 3, 4, 5];
/// Truncate::truncate(&mut data, 3).unwrap();
///
/// assert_eq!(data, vec![1, 2, 3]);
/// ```
pub trait Truncate {
	/// The error type of the truncation operation
	type Error: Into<TagspliceError>;

	/// Truncate a storage object to the specified length
	///
	/// # Errors
	///
	/// Errors depend on the object being truncated, which may not always be fallible.
	fn truncate(&mut self, new_len: u64) -> std::result::Result<(), Self::Error>;
}

impl Truncate for File {
	type Error = std::io::Error;

	fn truncate(&mut self, new_len: u64) -> std::result::Result<(), Self::Error> {
		self.set_len(new_len)
	}
}

impl Truncate for Vec<u8> {
	type Error = std::convert::Infallible;

	fn truncate(&mut self, new_len: u64) -> std::result::Result<(), Self::Error> {
		self.truncate(new_len as usize);
		Ok(())
	}
}

impl<T> Truncate for Cursor<T>
where
	T: Truncate,
{
	type Error = <T as Truncate>::Error;

	fn truncate(&mut self, new_len: u64) -> std::result::Result<(), Self::Error> {
		self.get_mut().truncate(new_len)
	}
}

impl<T> Truncate for Box<T>
where
	T: Truncate,
{
	type Error = <T as Truncate>::Error;

	fn truncate(&mut self, new_len: u64) -> std::result::Result<(), Self::Error> {
		self.as_mut().truncate(new_len)
	}
}

impl<T> Truncate for &mut T
where
	T: Truncate,
{
	type Error = <T as Truncate>::Error;

	fn truncate(&mut self, new_len: u64) -> std::result::Result<(), Self::Error> {
		(**self).truncate(new_len)
	}
}

/// Provides a method to get the length of a storage object
///
/// This is one component of the [`FileLike`] trait.
///
/// Take great care in implementing this for downstream types, as tagsplice will assume that the
/// container has the exact length specified. If this assumption were to be broken, files **may** become corrupted.
///
/// # Examples
///
/// ```rust
/// use tagsplice::io::Length;
///
/// let data = vec![1, 2, 3, 4, 5];
/// assert_eq!(Length::len(&data).unwrap(), 5);
/// ```
pub trait Length {
	/// The error type of the length operation
	type Error: Into<TagspliceError>;

	/// Get the length of a storage object
	///
	/// # Errors
	///
	/// Errors depend on the object being read, which may not always be fallible.
	fn len(&self) -> std::result::Result<u64, Self::Error>;
}

impl Length for File {
	type Error = std::io::Error;

	fn len(&self) -> std::result::Result<u64, Self::Error> {
		self.metadata().map(|m| m.len())
	}
}

impl Length for Vec<u8> {
	type Error = std::convert::Infallible;

	fn len(&self) -> std::result::Result<u64, Self::Error> {
		Ok(self.len() as u64)
	}
}

impl<T> Length for Cursor<T>
where
	T: Length,
{
	type Error = <T as Length>::Error;

	fn len(&self) -> std::result::Result<u64, Self::Error> {
		Length::len(self.get_ref())
	}
}

impl<T> Length for Box<T>
where
	T: Length,
{
	type Error = <T as Length>::Error;

	fn len(&self) -> std::result::Result<u64, Self::Error> {
		Length::len(self.as_ref())
	}
}

impl<T> Length for &T
where
	T: Length,
{
	type Error = <T as Length>::Error;

	fn len(&self) -> std::result::Result<u64, Self::Error> {
		Length::len(*self)
	}
}

impl<T> Length for &mut T
where
	T: Length,
{
	type Error = <T as Length>::Error;

	fn len(&self) -> std::result::Result<u64, Self::Error> {
		Length::len(*self)
	}
}

/// Provides a set of methods to read and write to a file-like object
///
/// This is a combination of the [`Read`], [`Write`], [`Seek`], [`Truncate`], and [`Length`] traits.
/// It is used to provide implementors access to [`Track::save_to`](crate::track::Track::save_to)
/// and friends.
///
/// Take great care in implementing this for downstream types, as tagsplice will assume that the
/// trait implementations are correct. If this assumption were to be broken, files **may** become corrupted.
pub trait FileLike: Read + Write + Seek + Truncate + Length
where
	<Self as Truncate>::Error: Into<TagspliceError>,
	<Self as Length>::Error: Into<TagspliceError>,
{
}

impl<T> FileLike for T
where
	T: Read + Write + Seek + Truncate + Length,
	<T as Truncate>::Error: Into<TagspliceError>,
	<T as Length>::Error: Into<TagspliceError>,
{
}

/// The on-disk encoding of a size or offset field
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum FieldWidth {
	U32Be,
	U32Le,
	U64Be,
	/// A 28-bit synchsafe integer, as used by ID3v2 headers
	Synchsafe32,
}

impl FieldWidth {
	pub(crate) fn byte_len(self) -> u64 {
		match self {
			FieldWidth::U32Be | FieldWidth::U32Le | FieldWidth::Synchsafe32 => 4,
			FieldWidth::U64Be => 8,
		}
	}

	pub(crate) fn max_value(self) -> u64 {
		match self {
			FieldWidth::U32Be | FieldWidth::U32Le => u64::from(u32::MAX),
			FieldWidth::U64Be => u64::MAX,
			FieldWidth::Synchsafe32 => 0x0FFF_FFFF,
		}
	}

	pub(crate) fn read<R>(self, reader: &mut R) -> Result<u64>
	where
		R: Read + ?Sized,
	{
		let value = match self {
			FieldWidth::U32Be => u64::from(reader.read_u32::<BigEndian>()?),
			FieldWidth::U32Le => u64::from(reader.read_u32::<LittleEndian>()?),
			FieldWidth::U64Be => reader.read_u64::<BigEndian>()?,
			FieldWidth::Synchsafe32 => u64::from(reader.read_u32::<BigEndian>()?.unsynch()),
		};

		Ok(value)
	}

	pub(crate) fn write<W>(self, writer: &mut W, value: u64) -> Result<()>
	where
		W: Write + ?Sized,
	{
		if value > self.max_value() {
			err!(TooMuchData);
		}

		match self {
			FieldWidth::U32Be => writer.write_u32::<BigEndian>(value as u32)?,
			FieldWidth::U32Le => writer.write_u32::<LittleEndian>(value as u32)?,
			FieldWidth::U64Be => writer.write_u64::<BigEndian>(value)?,
			FieldWidth::Synchsafe32 => {
				let Some(synch) = (value as u32).synch() else {
					err!(TooMuchData);
				};

				writer.write_u32::<BigEndian>(synch)?
			},
		}

		Ok(())
	}

	/// Overwrite the field at `pos` within an in-memory buffer
	pub(crate) fn write_into(self, buf: &mut [u8], pos: usize, value: u64) -> Result<()> {
		let end = pos + self.byte_len() as usize;
		let Some(mut dest) = buf.get_mut(pos..end) else {
			err!(SizeMismatch);
		};

		self.write(&mut dest, value)
	}
}

/// Positioned field access for seekable streams
pub(crate) trait SeekFieldExt: Read + Seek {
	fn read_field_at(&mut self, pos: u64, width: FieldWidth) -> Result<u64> {
		self.seek(SeekFrom::Start(pos))?;
		width.read(self)
	}
}

impl<T> SeekFieldExt for T where T: Read + Seek {}
