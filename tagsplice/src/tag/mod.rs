//! The format-agnostic field model
//!
//! A [`Tag`] holds the standard fields, the additional (free-form) fields, the pictures and the
//! chapters of one tag system, or the merged view of all of them. See [`Track`](crate::track::Track).

pub(crate) mod merge;
mod tag_type;

pub use tag_type::TagType;

use crate::chapter::{self, Chapter};
use crate::picture::{Picture, PictureType};

use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};

/// A field with a well-known meaning in every tag system
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(missing_docs)]
#[non_exhaustive]
pub enum StandardField {
	Title,
	Artist,
	Album,
	AlbumArtist,
	Composer,
	Conductor,
	Genre,
	Comment,
	RecordingDate,
	TrackNumber,
	TrackTotal,
	DiscNumber,
	DiscTotal,
	Copyright,
	Publisher,
	Lyrics,
}

impl StandardField {
	/// Every standard field, in a stable order
	pub const ALL: [StandardField; 16] = [
		StandardField::Title,
		StandardField::Artist,
		StandardField::Album,
		StandardField::AlbumArtist,
		StandardField::Composer,
		StandardField::Conductor,
		StandardField::Genre,
		StandardField::Comment,
		StandardField::RecordingDate,
		StandardField::TrackNumber,
		StandardField::TrackTotal,
		StandardField::DiscNumber,
		StandardField::DiscTotal,
		StandardField::Copyright,
		StandardField::Publisher,
		StandardField::Lyrics,
	];
}

macro_rules! impl_accessor {
	($($field:ident => $name:ident),+ $(,)?) => {
		paste::paste! {
			$(
				#[doc = "Returns the " $name ", `Some(\"\")` if it was cleared"]
				pub fn $name(&self) -> Option<&str> {
					self.get(StandardField::$field)
				}

				#[doc = "Sets the " $name]
				pub fn [<set_ $name>](&mut self, value: impl Into<String>) {
					self.set(StandardField::$field, value.into());
				}

				#[doc = "Clears the " $name ", keeping the field with an empty value"]
				pub fn [<clear_ $name>](&mut self) {
					self.clear(StandardField::$field);
				}

				#[doc = "Removes the " $name]
				pub fn [<remove_ $name>](&mut self) -> Option<String> {
					self.remove(StandardField::$field)
				}
			)+
		}
	}
}

macro_rules! impl_numeric_accessor {
	($($field:ident => $name:ident),+ $(,)?) => {
		paste::paste! {
			$(
				#[doc = "Returns the " $name " as a number"]
				pub fn $name(&self) -> Option<u32> {
					self.get(StandardField::$field).and_then(parse_number)
				}

				#[doc = "Sets the " $name]
				pub fn [<set_ $name>](&mut self, value: u32) {
					self.set(StandardField::$field, value.to_string());
				}

				#[doc = "Removes the " $name]
				pub fn [<remove_ $name>](&mut self) -> Option<u32> {
					self.remove(StandardField::$field)
						.as_deref()
						.and_then(parse_number)
				}
			)+
		}
	}
}

/// Parses the leading digits of a field, `"03"` and `"3/12"` are both `3`
pub(crate) fn parse_number(value: &str) -> Option<u32> {
	let value = value.trim();
	let end = value
		.find(|c: char| !c.is_ascii_digit())
		.unwrap_or(value.len());

	value[..end].parse().ok()
}

/// A tag in the format-agnostic field model
///
/// Absence of a field is distinct from an empty value: `None` means "not set", while `Some("")`
/// means "cleared".
///
/// # Examples
///
/// ```rust
/// use tagsplice::tag::Tag;
///
/// let mut tag = Tag::new();
/// assert_eq!(tag.title(), None);
///
/// tag.set_title("Foo");
/// tag.clear_title();
/// assert_eq!(tag.title(), Some(""));
///
/// tag.set_track(3);
/// tag.set_additional("MOOD", "Calm");
/// assert_eq!(tag.track(), Some(3));
/// assert_eq!(tag.additional("MOOD"), Some("Calm"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tag {
	pub(crate) fields: BTreeMap<StandardField, String>,
	pub(crate) additional: Vec<(String, String)>,
	pub(crate) pictures: Vec<Picture>,
	pub(crate) chapters: Vec<Chapter>,
}

impl Tag {
	/// Create an empty `Tag`
	pub fn new() -> Self {
		Self::default()
	}

	/// Whether the tag holds nothing at all
	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
			&& self.additional.is_empty()
			&& self.pictures.is_empty()
			&& self.chapters.is_empty()
	}

	impl_accessor!(
		Title         => title,
		Artist        => artist,
		Album         => album,
		AlbumArtist   => album_artist,
		Composer      => composer,
		Conductor     => conductor,
		Genre         => genre,
		Comment       => comment,
		RecordingDate => recording_date,
		Copyright     => copyright,
		Publisher     => publisher,
		Lyrics        => lyrics,
	);

	impl_numeric_accessor!(
		TrackNumber => track,
		TrackTotal  => track_total,
		DiscNumber  => disk,
		DiscTotal   => disk_total,
	);

	/// The year of the recording date, if it starts with one
	pub fn year(&self) -> Option<u32> {
		let date = self.recording_date()?;
		if date.len() < 4 || !date.as_bytes()[..4].iter().all(u8::is_ascii_digit) {
			return None;
		}

		date[..4].parse().ok()
	}

	/// Get a standard field
	pub fn get(&self, field: StandardField) -> Option<&str> {
		self.fields.get(&field).map(String::as_str)
	}

	/// Set a standard field
	pub fn set(&mut self, field: StandardField, value: String) {
		self.fields.insert(field, value);
	}

	/// Set a standard field to an empty value
	pub fn clear(&mut self, field: StandardField) {
		self.fields.insert(field, String::new());
	}

	/// Remove a standard field entirely
	pub fn remove(&mut self, field: StandardField) -> Option<String> {
		self.fields.remove(&field)
	}

	/// All standard fields that are set, in a stable order
	pub fn fields(&self) -> impl Iterator<Item = (StandardField, &str)> {
		self.fields.iter().map(|(k, v)| (*k, v.as_str()))
	}

	/// All additional fields, in insertion order
	pub fn additional_fields(&self) -> &[(String, String)] {
		&self.additional
	}

	/// Get an additional field
	pub fn additional(&self, key: &str) -> Option<&str> {
		self.additional
			.iter()
			.find(|(k, _)| k == key)
			.map(|(_, v)| v.as_str())
	}

	/// Set an additional field
	///
	/// Replacing an existing key keeps its position.
	pub fn set_additional(&mut self, key: impl Into<String>, value: impl Into<String>) {
		let key = key.into();
		let value = value.into();

		match self.additional.iter_mut().find(|(k, _)| *k == key) {
			Some((_, existing)) => *existing = value,
			None => self.additional.push((key, value)),
		}
	}

	/// Remove an additional field
	pub fn remove_additional(&mut self, key: &str) -> Option<String> {
		let pos = self.additional.iter().position(|(k, _)| k == key)?;
		Some(self.additional.remove(pos).1)
	}

	/// The embedded pictures
	pub fn pictures(&self) -> &[Picture] {
		&self.pictures
	}

	/// Mutable access to the embedded pictures
	pub fn pictures_mut(&mut self) -> &mut Vec<Picture> {
		&mut self.pictures
	}

	/// Append a picture
	pub fn push_picture(&mut self, picture: Picture) {
		self.pictures.push(picture);
	}

	/// Remove every picture of the given type
	pub fn remove_pictures_of_type(&mut self, pic_type: PictureType) {
		self.pictures.retain(|p| p.pic_type != pic_type);
	}

	/// The chapters, sorted by start time
	pub fn chapters(&self) -> &[Chapter] {
		&self.chapters
	}

	/// Mutable access to the chapters
	///
	/// The chapters are sorted by start time again when the returned guard is dropped.
	pub fn chapters_mut(&mut self) -> ChaptersMut<'_> {
		ChaptersMut {
			chapters: &mut self.chapters,
		}
	}

	/// Replace all chapters
	pub fn set_chapters(&mut self, mut chapters: Vec<Chapter>) {
		chapter::sort(&mut chapters);
		self.chapters = chapters;
	}
}

/// Mutable access to the chapters of a [`Tag`], see [`Tag::chapters_mut`]
pub struct ChaptersMut<'a> {
	chapters: &'a mut Vec<Chapter>,
}

impl Deref for ChaptersMut<'_> {
	type Target = Vec<Chapter>;

	fn deref(&self) -> &Self::Target {
		self.chapters
	}
}

impl DerefMut for ChaptersMut<'_> {
	fn deref_mut(&mut self) -> &mut Self::Target {
		self.chapters
	}
}

impl Drop for ChaptersMut<'_> {
	fn drop(&mut self) {
		chapter::sort(self.chapters);
	}
}
