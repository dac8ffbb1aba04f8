use crate::tag::TagType;

/// Options to control how tagsplice parses a file
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct ParseOptions {
	pub(crate) read_properties: bool,
	pub(crate) read_tags: bool,
	pub(crate) read_cover_art: bool,
	pub(crate) parsing_mode: ParsingMode,
	pub(crate) max_junk_bytes: usize,
	pub(crate) merge_priority: &'static [TagType],
}

impl Default for ParseOptions {
	/// The default implementation for `ParseOptions`
	///
	/// The defaults are as follows:
	///
	/// ```rust,ignore
	/// ParseOptions {
	/// 	read_properties: true,
	/// 	read_tags: true,
	/// 	read_cover_art: true,
	/// 	parsing_mode: ParsingMode::BestAttempt,
	/// 	max_junk_bytes: 1024,
	/// 	merge_priority: ParseOptions::DEFAULT_MERGE_PRIORITY,
	/// }
	/// ```
	fn default() -> Self {
		Self::new()
	}
}

impl ParseOptions {
	/// Default parsing mode
	pub const DEFAULT_PARSING_MODE: ParsingMode = ParsingMode::BestAttempt;

	/// Default number of junk bytes to read
	pub const DEFAULT_MAX_JUNK_BYTES: usize = 1024;

	/// Default merge priority, highest first
	///
	/// Native tag systems are preferred, followed by the richer legacy systems.
	pub const DEFAULT_MERGE_PRIORITY: &'static [TagType] = &[
		TagType::Mp4Ilst,
		TagType::RiffInfo,
		TagType::Id3v2,
		TagType::Ape,
		TagType::Id3v1,
	];

	/// Creates a new `ParseOptions`, alias for `Default` implementation
	///
	/// See also: [`ParseOptions::default`]
	///
	/// # Examples
	///
	/// ```rust
	/// use tagsplice::config::ParseOptions;
	///
	/// let parsing_options = ParseOptions::new();
	/// ```
	#[must_use]
	pub const fn new() -> Self {
		Self {
			read_properties: true,
			read_tags: true,
			read_cover_art: true,
			parsing_mode: Self::DEFAULT_PARSING_MODE,
			max_junk_bytes: Self::DEFAULT_MAX_JUNK_BYTES,
			merge_priority: Self::DEFAULT_MERGE_PRIORITY,
		}
	}

	/// Whether or not to read the audio properties
	///
	/// When disabled, [`Track::info`](crate::track::Track::info) is a pass-through stub covering the
	/// whole file.
	pub fn read_properties(&mut self, read_properties: bool) -> Self {
		self.read_properties = read_properties;
		*self
	}

	/// Whether or not to read the tags
	///
	/// A [`Track`](crate::track::Track) loaded without tags still knows where each tag system
	/// lives, so [`Track::remove`](crate::track::Track::remove) keeps working.
	pub fn read_tags(&mut self, read_tags: bool) -> Self {
		self.read_tags = read_tags;
		*self
	}

	/// Whether or not to read cover art
	///
	/// This only affects top-level pictures, pictures embedded in ID3v2 chapters are always read.
	///
	/// # Examples
	///
	/// ```rust
	/// use tagsplice::config::ParseOptions;
	///
	/// // Reading cover art is expensive, and I do not need it!
	/// let parsing_options = ParseOptions::new().read_cover_art(false);
	/// ```
	pub fn read_cover_art(&mut self, read_cover_art: bool) -> Self {
		self.read_cover_art = read_cover_art;
		*self
	}

	/// The parsing mode to use, see [`ParsingMode`] for details
	///
	/// # Examples
	///
	/// ```rust
	/// use tagsplice::config::{ParseOptions, ParsingMode};
	///
	/// // By default, `parsing_mode` is ParsingMode::BestAttempt. Here, we need absolute correctness.
	/// let parsing_options = ParseOptions::new().parsing_mode(ParsingMode::Strict);
	/// ```
	pub fn parsing_mode(&mut self, parsing_mode: ParsingMode) -> Self {
		self.parsing_mode = parsing_mode;
		*self
	}

	/// The maximum number of allowed junk bytes to search
	///
	/// Some information may be surrounded by junk bytes, such as tag padding remnants. This sets the maximum
	/// number of junk/unrecognized bytes tagsplice will search for required information before giving up.
	pub fn max_junk_bytes(&mut self, max_junk_bytes: usize) -> Self {
		self.max_junk_bytes = max_junk_bytes;
		*self
	}

	/// The order in which tag systems are consulted when building the merged view
	///
	/// When a field is present in multiple tag systems of the same file, the value from the first
	/// system listed here wins. Systems missing from the table are consulted last, in save order.
	///
	/// # Examples
	///
	/// ```rust
	/// use tagsplice::config::ParseOptions;
	/// use tagsplice::tag::TagType;
	///
	/// // I trust my APE tags more than anything else
	/// let parsing_options =
	/// 	ParseOptions::new().merge_priority(&[TagType::Ape, TagType::Id3v2, TagType::Id3v1]);
	/// ```
	pub fn merge_priority(&mut self, merge_priority: &'static [TagType]) -> Self {
		self.merge_priority = merge_priority;
		*self
	}
}

/// The parsing strictness mode
///
/// This can be set with [`ParseOptions::parsing_mode`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
#[non_exhaustive]
pub enum ParsingMode {
	/// Will eagerly error on invalid input
	///
	/// An adapter that hits inconsistent data is still dropped rather than failing the whole load,
	/// but individual frames and items are no longer skipped silently.
	Strict,
	/// Default mode, less eager to error on recoverably malformed input
	///
	/// Malformed frames, atoms and items are skipped with a warning.
	#[default]
	BestAttempt,
	/// Least eager to error, may produce partial output
	///
	/// Every adapter currently treats this the same as [`ParsingMode::BestAttempt`].
	Relaxed,
}
