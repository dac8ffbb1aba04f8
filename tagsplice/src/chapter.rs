//! Chapters
//!
//! A [`Chapter`] marks a section of the audio stream, with an optional title, subtitle and picture.
//! Within a [`Tag`](crate::tag::Tag), chapters are always kept sorted by start time.

use crate::picture::Picture;

/// A chapter of the audio stream
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct Chapter {
	pub(crate) unique_id: String,
	pub(crate) start_ms: u32,
	pub(crate) end_ms: Option<u32>,
	pub(crate) start_offset: Option<u32>,
	pub(crate) end_offset: Option<u32>,
	pub(crate) use_offset: bool,
	pub(crate) title: Option<String>,
	pub(crate) subtitle: Option<String>,
	pub(crate) picture: Option<Picture>,
}

impl Chapter {
	/// Create a new chapter starting at `start_ms`
	///
	/// # Examples
	///
	/// ```rust
	/// use tagsplice::chapter::Chapter;
	///
	/// let chapter = Chapter::new(0).title("Intro").end_ms(12_000);
	/// assert_eq!(chapter.get_title(), Some("Intro"));
	/// ```
	#[must_use]
	pub fn new(start_ms: u32) -> Self {
		Self {
			start_ms,
			..Self::default()
		}
	}

	/// Set the unique identifier
	///
	/// Chapters written without an identifier are assigned `ch{index}`.
	#[must_use]
	pub fn unique_id(mut self, unique_id: impl Into<String>) -> Self {
		self.unique_id = unique_id.into();
		self
	}

	/// Set the end time
	#[must_use]
	pub fn end_ms(mut self, end_ms: u32) -> Self {
		self.end_ms = Some(end_ms);
		self
	}

	/// Set the byte offsets into the audio stream
	///
	/// Setting offsets marks them as authoritative over the chapter times.
	#[must_use]
	pub fn offsets(mut self, start_offset: u32, end_offset: u32) -> Self {
		self.start_offset = Some(start_offset);
		self.end_offset = Some(end_offset);
		self.use_offset = true;
		self
	}

	/// Set the title
	#[must_use]
	pub fn title(mut self, title: impl Into<String>) -> Self {
		self.title = Some(title.into());
		self
	}

	/// Set the subtitle
	#[must_use]
	pub fn subtitle(mut self, subtitle: impl Into<String>) -> Self {
		self.subtitle = Some(subtitle.into());
		self
	}

	/// Set the picture
	#[must_use]
	pub fn picture(mut self, picture: Picture) -> Self {
		self.picture = Some(picture);
		self
	}

	/// The unique identifier, empty if none was assigned
	pub fn get_unique_id(&self) -> &str {
		&self.unique_id
	}

	/// The start time in milliseconds
	pub fn start_ms(&self) -> u32 {
		self.start_ms
	}

	/// The end time in milliseconds, if known
	pub fn get_end_ms(&self) -> Option<u32> {
		self.end_ms
	}

	/// The start offset in bytes, if known
	pub fn start_offset(&self) -> Option<u32> {
		self.start_offset
	}

	/// The end offset in bytes, if known
	pub fn end_offset(&self) -> Option<u32> {
		self.end_offset
	}

	/// Whether the byte offsets take precedence over the times
	pub fn use_offset(&self) -> bool {
		self.use_offset
	}

	/// The title
	pub fn get_title(&self) -> Option<&str> {
		self.title.as_deref()
	}

	/// The subtitle
	pub fn get_subtitle(&self) -> Option<&str> {
		self.subtitle.as_deref()
	}

	/// The picture
	pub fn get_picture(&self) -> Option<&Picture> {
		self.picture.as_ref()
	}

	/// Replace the title
	pub fn set_title(&mut self, title: Option<String>) {
		self.title = title;
	}

	/// Replace the subtitle
	pub fn set_subtitle(&mut self, subtitle: Option<String>) {
		self.subtitle = subtitle;
	}

	/// Replace the picture
	pub fn set_picture(&mut self, picture: Option<Picture>) {
		self.picture = picture;
	}

	/// Replace the start time
	pub fn set_start_ms(&mut self, start_ms: u32) {
		self.start_ms = start_ms;
	}

	/// Replace the end time
	pub fn set_end_ms(&mut self, end_ms: Option<u32>) {
		self.end_ms = end_ms;
	}
}

/// Sort chapters by start time, keeping the relative order of chapters starting together
pub(crate) fn sort(chapters: &mut [Chapter]) {
	chapters.sort_by_key(|chapter| chapter.start_ms);
}

/// The effective end time of `chapters[index]`
///
/// This is the explicit end time, or the next chapter's start, or the end of the track.
pub(crate) fn resolve_end(chapters: &[Chapter], index: usize, duration_ms: u32) -> u32 {
	let chapter = &chapters[index];
	if let Some(end_ms) = chapter.end_ms {
		return end_ms;
	}

	chapters
		.get(index + 1)
		.map_or(duration_ms, |next| next.start_ms)
		.max(chapter.start_ms)
}

/// The identifier to write for `chapters[index]`
pub(crate) fn resolve_id(chapters: &[Chapter], index: usize) -> String {
	let chapter = &chapters[index];
	if !chapter.unique_id.is_empty() {
		return chapter.unique_id.clone();
	}

	let id = format!("ch{index}");
	log::debug!("Assigning identifier `{id}` to an unnamed chapter");
	id
}
