/// Options to control how tagsplice writes to a file
///
/// This acts as a dumping ground for all sorts of format-specific settings. As such, this is best
/// used as an application global config that gets set once.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct WriteOptions {
	pub(crate) preferred_padding: Option<u32>,
	pub(crate) removal_policy: RemovalPolicy,
	pub(crate) use_id3v23: bool,
	pub(crate) uppercase_id3v2_chunk: bool,
	pub(crate) lossy_text_encoding: bool,
	pub(crate) write_id3v2_chapter_toc: bool,
}

impl WriteOptions {
	/// Default preferred padding size in bytes
	pub const DEFAULT_PREFERRED_PADDING: u32 = 1024;

	/// Creates a new `WriteOptions`, alias for `Default` implementation
	///
	/// See also: [`WriteOptions::default`]
	///
	/// # Examples
	///
	/// ```rust
	/// use tagsplice::config::WriteOptions;
	///
	/// let write_options = WriteOptions::new();
	/// ```
	pub const fn new() -> Self {
		Self {
			preferred_padding: Some(Self::DEFAULT_PREFERRED_PADDING),
			removal_policy: RemovalPolicy::LeavePaddingMarker,
			use_id3v23: false,
			uppercase_id3v2_chunk: false,
			lossy_text_encoding: true,
			write_id3v2_chapter_toc: true,
		}
	}

	/// Set the preferred padding size in bytes
	///
	/// Padding is only added when a tag no longer fits in its current space and the file has to be
	/// shifted. The padding then absorbs future growth, so the next saves happen in place.
	///
	/// NOTES:
	///
	/// * Not all tag formats support padding (APE and ID3v1 don't)
	/// * The actual padding size may be different from this value, depending on tag size limitations
	///
	/// # Examples
	///
	/// ```rust
	/// use tagsplice::config::WriteOptions;
	///
	/// // I edit these files constantly, reserve more space
	/// let options = WriteOptions::new().preferred_padding(4096);
	///
	/// // ...Or I don't want padding under any circumstances!
	/// let options = WriteOptions::new().preferred_padding(0);
	/// ```
	pub fn preferred_padding(mut self, preferred_padding: u32) -> Self {
		match preferred_padding {
			0 => self.preferred_padding = None,
			_ => self.preferred_padding = Some(preferred_padding),
		}
		self
	}

	/// What to leave behind when a tag is removed
	///
	/// See [`RemovalPolicy`]
	pub fn removal_policy(mut self, removal_policy: RemovalPolicy) -> Self {
		self.removal_policy = removal_policy;
		self
	}

	/// Whether to write ID3v2.3 instead of ID3v2.4
	///
	/// ID3v2.3 tags are written with UTF-16 text, and `TYER` in place of `TDRC`.
	pub fn use_id3v23(mut self, use_id3v23: bool) -> Self {
		self.use_id3v23 = use_id3v23;
		self
	}

	/// Whether to uppercase the ID3v2 chunk name
	///
	/// When dealing with RIFF files, some software may expect the ID3v2 chunk name to be
	/// uppercase (`ID3 `). The default is `id3 `.
	///
	/// NOTE: The vast majority of software will be able to read both upper and lowercase
	/// chunk names.
	pub fn uppercase_id3v2_chunk(mut self, uppercase_id3v2_chunk: bool) -> Self {
		self.uppercase_id3v2_chunk = uppercase_id3v2_chunk;
		self
	}

	/// Whether to replace unrepresentable characters when writing Latin-1 text
	///
	/// This only affects formats that are restricted to Latin-1 (ID3v1, RIFF INFO). When disabled,
	/// such fields are dropped and reported in the issue log instead.
	pub fn lossy_text_encoding(mut self, lossy_text_encoding: bool) -> Self {
		self.lossy_text_encoding = lossy_text_encoding;
		self
	}

	/// Whether to write a `CTOC` frame alongside ID3v2 chapters
	pub fn write_id3v2_chapter_toc(mut self, write_id3v2_chapter_toc: bool) -> Self {
		self.write_id3v2_chapter_toc = write_id3v2_chapter_toc;
		self
	}
}

impl Default for WriteOptions {
	/// The default implementation for `WriteOptions`
	///
	/// The defaults are as follows:
	///
	/// ```rust,ignore
	/// WriteOptions {
	///     preferred_padding: 1024,
	///     removal_policy: RemovalPolicy::LeavePaddingMarker,
	///     use_id3v23: false,
	///     uppercase_id3v2_chunk: false,
	///     lossy_text_encoding: true,
	///     write_id3v2_chapter_toc: true,
	/// }
	/// ```
	fn default() -> Self {
		Self::new()
	}
}

/// What happens to the space of a removed tag
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
pub enum RemovalPolicy {
	/// Replace the tag with the smallest padding marker the format recognizes
	///
	/// This is only possible for formats with a standalone free-space structure (an MP4 `free`
	/// atom, a RIFF `JUNK` chunk). Other formats always collapse.
	#[default]
	LeavePaddingMarker,
	/// Remove every byte of the tag, shifting the rest of the file
	Collapse,
}
