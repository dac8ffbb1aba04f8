//! The load, edit, and save cycle of a single audio file
//!
//! A [`Track`] holds every tag system found in a file, and exposes them through one merged
//! [`Tag`]. Edits made to that view are pushed back into each system on save.
//!
//! ```rust,no_run
//! use tagsplice::track::{TagSelector, Track};
//!
//! # fn main() -> tagsplice::error::Result<()> {
//! let mut track = Track::load("song.mp3")?;
//! track.tag_mut().set_artist("Foo artist");
//! track.try_save()?;
//!
//! // Strip everything but the native tag
//! track.try_remove(TagSelector::Only(tagsplice::tag::TagType::Id3v1))?;
//! # Ok(()) }
//! ```

use crate::adapter::{self, DecodeContext, EncodeContext, Residue};
use crate::config::{ParseOptions, ParsingMode, WriteOptions};
use crate::error::{ErrorKind, Result, TagspliceError};
use crate::file::FileType;
use crate::file::registry::descriptor;
use crate::issue::{Issue, IssueLog};
use crate::layout::{self, Site};
use crate::macros::err;
use crate::progress::{NoProgress, Progress, ProgressSink};
use crate::properties::{self, StreamBounds, TechnicalInfo};
use crate::tag::merge::{TagDiff, merge_by_priority, priority_order};
use crate::tag::{Tag, TagType};
use crate::util::io::{FileLike, Length, SeekStreamLen, Truncate};

use std::cmp::Reverse;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

/// The tag systems [`Track::remove`] acts on
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TagSelector<'a> {
	/// Every tag system the format supports
	Any,
	/// The native tag system of the format
	Native,
	/// A single tag system
	Only(TagType),
	/// Several tag systems
	Several(&'a [TagType]),
}

impl TagSelector<'_> {
	/// The selected tag systems, in save order
	fn resolve(self, file_type: FileType) -> Result<Vec<TagType>> {
		let mut tag_types = match self {
			TagSelector::Any => file_type.tag_types().to_vec(),
			TagSelector::Native => vec![file_type.native_tag_type()],
			TagSelector::Only(tag_type) => vec![tag_type],
			TagSelector::Several(tag_types) => tag_types.to_vec(),
		};

		if let Some(unsupported) = tag_types
			.iter()
			.find(|tag_type| !file_type.supports_tag_type(**tag_type))
		{
			log::warn!("{} files can't hold {unsupported} tags", file_type.name());
			err!(UnsupportedTag);
		}

		tag_types.sort_by_key(|tag_type| tag_type.save_rank());
		tag_types.dedup();
		Ok(tag_types)
	}
}

/// A tag system present in the file
#[derive(Clone, Debug)]
struct TagSystem {
	tag_type: TagType,
	tag: Tag,
	residue: Residue,
}

/// An audio file, its tags, and its technical info
///
/// Tags are read once, on load. The file is only touched again by a save or a removal, each of
/// which re-locates every tag system it writes, so changes made to the file in between are
/// observed.
#[derive(Debug)]
pub struct Track {
	path: Option<PathBuf>,
	file_type: Option<FileType>,
	parse_options: ParseOptions,
	info: TechnicalInfo,
	/// Present systems, in save order
	systems: Vec<TagSystem>,
	merged: Tag,
	/// The merged view as of the last load, save, or removal
	baseline: Tag,
	issues: IssueLog,
}

impl Track {
	/// Read the file at `path` with the default [`ParseOptions`]
	///
	/// # Errors
	///
	/// See [`Track::load_with_options`]
	///
	/// # Examples
	///
	/// ```rust,no_run
	/// use tagsplice::track::Track;
	///
	/// # fn main() -> tagsplice::error::Result<()> {
	/// let track = Track::load("song.mp3")?;
	/// println!("{} ms", track.info().duration_ms());
	/// # Ok(()) }
	/// ```
	pub fn load<P>(path: P) -> Result<Self>
	where
		P: AsRef<Path>,
	{
		Self::load_with_options(path, ParseOptions::new())
	}

	/// Read the file at `path`
	///
	/// The format is guessed from the content first, and from the extension if that fails. A
	/// file of unknown format still loads, with no tag systems and the whole file as its audio.
	///
	/// # Errors
	///
	/// * The file could not be opened or read
	/// * A tag or the stream is malformed, and [`ParsingMode::Strict`] is in use
	pub fn load_with_options<P>(path: P, parse_options: ParseOptions) -> Result<Self>
	where
		P: AsRef<Path>,
	{
		let path = path.as_ref();
		log::debug!("Loading {}", path.display());

		let mut file = File::open(path)?;
		let mut track = Self::read_inner(&mut file, FileType::from_path(path), parse_options)?;
		track.path = Some(path.to_path_buf());

		Ok(track)
	}

	/// Read a track from a stream
	///
	/// The format is guessed from the content alone. A track read this way has no path, so it
	/// can only be written with [`Track::save_to`] and [`Track::remove_from`].
	///
	/// # Errors
	///
	/// See [`Track::load_with_options`]
	pub fn read_from<R>(reader: &mut R, parse_options: ParseOptions) -> Result<Self>
	where
		R: Read + Seek,
	{
		Self::read_inner(reader, None, parse_options)
	}

	fn read_inner<R>(
		reader: &mut R,
		by_extension: Option<FileType>,
		parse_options: ParseOptions,
	) -> Result<Self>
	where
		R: Read + Seek,
	{
		let file_len = reader.stream_len_hack()?;
		reader.seek(SeekFrom::Start(0))?;

		let file_type = FileType::sniff(reader, parse_options.max_junk_bytes)?.or(by_extension);

		let mut track = Self {
			path: None,
			file_type,
			parse_options,
			info: TechnicalInfo::pass_through(file_len),
			systems: Vec::new(),
			merged: Tag::new(),
			baseline: Tag::new(),
			issues: IssueLog::default(),
		};

		let Some(file_type) = file_type else {
			track
				.issues
				.warn(None, "Unrecognized format, no tag system found");
			return Ok(track);
		};

		log::debug!("Detected a {} file", file_type.name());

		let mut bounds = StreamBounds {
			start: 0,
			end: file_len,
		};

		for &tag_type in file_type.tag_types() {
			let site = match adapter::locate(tag_type, file_type, reader) {
				Ok(site) => site,
				Err(e) => {
					track.absorb(Some(tag_type), e)?;
					continue;
				},
			};

			if !site.exists {
				continue;
			}

			match tag_type {
				TagType::Id3v2 if site.extent.start == 0 => bounds.start = site.extent.end,
				TagType::Ape | TagType::Id3v1 => bounds.end = bounds.end.min(site.extent.start),
				_ => {},
			}

			if !parse_options.read_tags {
				continue;
			}

			match track.decode(reader, file_type, tag_type, &site) {
				Ok(system) => track.systems.push(system),
				Err(e) => track.absorb(Some(tag_type), e)?,
			}
		}

		if parse_options.read_properties {
			match properties::read_info(file_type, reader, bounds, parse_options) {
				Ok(info) => track.info = info,
				Err(e) => track.absorb(None, e)?,
			}
		}

		track.rebuild_view();
		Ok(track)
	}

	fn decode<R>(
		&mut self,
		reader: &mut R,
		file_type: FileType,
		tag_type: TagType,
		site: &Site,
	) -> Result<TagSystem>
	where
		R: Read + Seek,
	{
		let content = adapter::read_site(reader, site)?;

		let mut ctx = DecodeContext {
			file_type,
			options: self.parse_options,
			issues: &mut self.issues,
		};
		let (tag, residue) = adapter::decode(tag_type, &mut ctx, &content)?;

		Ok(TagSystem {
			tag_type,
			tag,
			residue,
		})
	}

	/// Record a read error, or return it if reading can't go on
	fn absorb(&mut self, tag_type: Option<TagType>, error: TagspliceError) -> Result<()> {
		if matches!(error.kind(), ErrorKind::Io(_))
			|| self.parse_options.parsing_mode == ParsingMode::Strict
		{
			return Err(error);
		}

		let message = match tag_type {
			Some(_) => format!("Ignoring malformed tag: {error}"),
			None => format!("Unable to read the audio properties: {error}"),
		};
		self.issues.warn(tag_type, message);

		Ok(())
	}

	fn rebuild_view(&mut self) {
		let mut order = self
			.systems
			.iter()
			.map(|system| system.tag_type)
			.collect::<Vec<_>>();
		priority_order(&mut order, self.parse_options.merge_priority);

		let merged = merge_by_priority(order.iter().filter_map(|tag_type| self.tag_of(*tag_type)));
		self.baseline = merged.clone();
		self.merged = merged;
	}

	/// The merged view of every tag system
	///
	/// A field present in several systems takes its value from the one ranked highest by
	/// [`ParseOptions::merge_priority`].
	pub fn tag(&self) -> &Tag {
		&self.merged
	}

	/// A mutable reference to the merged view
	///
	/// Changes are written to every present tag system on the next save. If the file has no tags
	/// at all, the default systems of the format are created.
	pub fn tag_mut(&mut self) -> &mut Tag {
		&mut self.merged
	}

	/// The tag of a single system, as read from the file
	pub fn tag_of(&self, tag_type: TagType) -> Option<&Tag> {
		self.systems
			.iter()
			.find(|system| system.tag_type == tag_type)
			.map(|system| &system.tag)
	}

	/// The tag systems present in the file, in save order
	pub fn tag_types(&self) -> Vec<TagType> {
		self.systems.iter().map(|system| system.tag_type).collect()
	}

	/// Whether the file holds a tag of type `tag_type`
	pub fn contains_tag_type(&self, tag_type: TagType) -> bool {
		self.systems.iter().any(|system| system.tag_type == tag_type)
	}

	/// The technical info of the stream
	///
	/// The audio data offset follows the stream through every save and removal.
	pub fn info(&self) -> &TechnicalInfo {
		&self.info
	}

	/// The detected format, if any
	pub fn file_type(&self) -> Option<FileType> {
		self.file_type
	}

	/// The path the track was loaded from
	pub fn path(&self) -> Option<&Path> {
		self.path.as_deref()
	}

	/// Everything noteworthy that happened during the last load, save, or removal
	pub fn issues(&self) -> &[Issue] {
		self.issues.as_slice()
	}

	/// Save the track with the default [`WriteOptions`]
	///
	/// Returns `false` on failure, with the error recorded in [`Track::issues`].
	pub fn save(&mut self) -> bool {
		self.save_with(WriteOptions::default(), &mut NoProgress)
	}

	/// Save the track, reporting progress to `sink`
	///
	/// Returns `false` on failure, with the error recorded in [`Track::issues`].
	pub fn save_with(&mut self, write_options: WriteOptions, sink: &mut dyn ProgressSink) -> bool {
		match self.try_save_with(write_options, sink) {
			Ok(()) => true,
			Err(e) => {
				self.issues.error(None, format!("Save failed: {e}"));
				false
			},
		}
	}

	/// Save the track with the default [`WriteOptions`]
	///
	/// # Errors
	///
	/// See [`Track::save_to`]
	pub fn try_save(&mut self) -> Result<()> {
		self.try_save_with(WriteOptions::default(), &mut NoProgress)
	}

	/// Save the track to the path it was loaded from
	///
	/// # Errors
	///
	/// * The track was not loaded from a path
	/// * See [`Track::save_to`]
	pub fn try_save_with(
		&mut self,
		write_options: WriteOptions,
		sink: &mut dyn ProgressSink,
	) -> Result<()> {
		self.issues.clear();

		let mut file = self.open()?;
		self.save_inner(&mut file, write_options, sink)
	}

	/// Save the track to `file`
	///
	/// Only the tag systems touched since the last load or save are rewritten, in the order of
	/// [`TagType::SAVE_ORDER`]. Every tag is encoded before the first byte of `file` is changed.
	///
	/// # Errors
	///
	/// * `file` could not be read or written
	/// * A tag could not be encoded
	/// * A splice would corrupt the file (See [`ErrorKind::Layout`])
	pub fn save_to<F>(
		&mut self,
		file: &mut F,
		write_options: WriteOptions,
		sink: &mut dyn ProgressSink,
	) -> Result<()>
	where
		F: FileLike,
		TagspliceError: From<<F as Truncate>::Error>,
		TagspliceError: From<<F as Length>::Error>,
	{
		self.issues.clear();
		self.save_inner(file, write_options, sink)
	}

	fn save_inner<F>(
		&mut self,
		file: &mut F,
		write_options: WriteOptions,
		sink: &mut dyn ProgressSink,
	) -> Result<()>
	where
		F: FileLike,
		TagspliceError: From<<F as Truncate>::Error>,
		TagspliceError: From<<F as Length>::Error>,
	{
		let Some(file_type) = self.file_type else {
			self.issues.warn(None, "Unrecognized format, nothing to save");
			return Ok(());
		};

		let mut targets = Vec::new();
		if self.systems.is_empty() {
			if self.merged.is_empty() {
				log::debug!("No tags to save");
				return Ok(());
			}

			for &tag_type in descriptor(file_type).defaults {
				targets.push(TagSystem {
					tag_type,
					tag: self.merged.clone(),
					residue: Residue::None,
				});
			}
		} else {
			let diff = TagDiff::between(&self.baseline, &self.merged);
			if diff.is_empty() {
				log::debug!("No changes to save");
				return Ok(());
			}

			for system in &self.systems {
				let mut tag = system.tag.clone();
				diff.apply(&mut tag);

				if tag == system.tag {
					log::trace!("{}: Unchanged, skipping", system.tag_type);
					continue;
				}

				targets.push(TagSystem {
					tag_type: system.tag_type,
					tag,
					residue: system.residue.clone(),
				});
			}
		}

		targets.sort_by_key(|system| system.tag_type.save_rank());

		// Nothing is written until every system has been encoded
		let duration_ms = u32::try_from(self.info.duration_ms()).unwrap_or(u32::MAX);
		let mut encoded = Vec::with_capacity(targets.len());
		for system in &targets {
			let mut ctx = EncodeContext {
				file_type,
				options: write_options,
				duration_ms,
				issues: &mut self.issues,
			};

			encoded.push(adapter::encode(
				system.tag_type,
				&mut ctx,
				&system.tag,
				&system.residue,
			)?);
		}

		let mut progress = Progress::new(sink);
		let count = targets.len();
		for (index, (system, content)) in targets.iter().zip(&encoded).enumerate() {
			progress.step(index, count);
			self.splice(
				file,
				file_type,
				system.tag_type,
				content,
				&write_options,
				&mut progress,
			)?;
		}
		progress.finish();

		for (system, content) in targets.into_iter().zip(encoded) {
			self.systems.retain(|s| s.tag_type != system.tag_type);
			if !content.is_empty() {
				self.systems.push(system);
			}
		}

		self.systems.sort_by_key(|system| system.tag_type.save_rank());
		self.baseline = self.merged.clone();

		Ok(())
	}

	/// Re-locate `tag_type` and replace it with `content`
	fn splice<F>(
		&mut self,
		file: &mut F,
		file_type: FileType,
		tag_type: TagType,
		content: &[u8],
		write_options: &WriteOptions,
		progress: &mut Progress<'_>,
	) -> Result<()>
	where
		F: FileLike,
		TagspliceError: From<<F as Truncate>::Error>,
		TagspliceError: From<<F as Length>::Error>,
	{
		let mut site = adapter::locate(tag_type, file_type, file)?;

		if !site.orphans.is_empty() {
			// Back to front, so the remaining orphans stay where they were located
			let mut orphans = site.orphans.clone();
			orphans.sort_by_key(|orphan| Reverse(orphan.start));

			for orphan in orphans {
				let outcome = layout::collapse(file, orphan, &site.patches, progress)?;
				self.info.shift(outcome.old_end, outcome.delta);
			}

			site = adapter::locate(tag_type, file_type, file)?;
		}

		if content.is_empty() && !site.exists {
			return Ok(());
		}

		let outcome = layout::splice(file, &site, content, write_options, progress)?;
		self.info.shift(outcome.old_end, outcome.delta);

		log::debug!(
			"{tag_type}: {:?}, following data moved by {} bytes",
			outcome.path,
			outcome.delta
		);

		Ok(())
	}

	/// Remove tag systems from the file with the default [`WriteOptions`]
	///
	/// Returns `false` on failure, with the error recorded in [`Track::issues`].
	pub fn remove(&mut self, selector: TagSelector<'_>) -> bool {
		self.remove_with(selector, WriteOptions::default(), &mut NoProgress)
	}

	/// Remove tag systems from the file, reporting progress to `sink`
	///
	/// Returns `false` on failure, with the error recorded in [`Track::issues`].
	pub fn remove_with(
		&mut self,
		selector: TagSelector<'_>,
		write_options: WriteOptions,
		sink: &mut dyn ProgressSink,
	) -> bool {
		match self.try_remove_with(selector, write_options, sink) {
			Ok(()) => true,
			Err(e) => {
				self.issues.error(None, format!("Removal failed: {e}"));
				false
			},
		}
	}

	/// Remove tag systems from the file with the default [`WriteOptions`]
	///
	/// # Errors
	///
	/// See [`Track::remove_from`]
	pub fn try_remove(&mut self, selector: TagSelector<'_>) -> Result<()> {
		self.try_remove_with(selector, WriteOptions::default(), &mut NoProgress)
	}

	/// Remove tag systems from the file at the path the track was loaded from
	///
	/// # Errors
	///
	/// * The track was not loaded from a path
	/// * See [`Track::remove_from`]
	pub fn try_remove_with(
		&mut self,
		selector: TagSelector<'_>,
		write_options: WriteOptions,
		sink: &mut dyn ProgressSink,
	) -> Result<()> {
		self.issues.clear();

		let mut file = self.open()?;
		self.remove_inner(&mut file, selector, write_options, sink)
	}

	/// Remove tag systems from `file`
	///
	/// With [`RemovalPolicy::LeavePaddingMarker`](crate::config::RemovalPolicy::LeavePaddingMarker),
	/// formats with a padding marker keep one in place of the tag. Existing markers are never
	/// removed. Edits made to [`Track::tag_mut`] and not yet saved survive the removal.
	///
	/// # Errors
	///
	/// * The format can't hold one of the selected tag systems
	/// * `file` could not be read or written
	/// * A splice would corrupt the file (See [`ErrorKind::Layout`])
	pub fn remove_from<F>(
		&mut self,
		file: &mut F,
		selector: TagSelector<'_>,
		write_options: WriteOptions,
		sink: &mut dyn ProgressSink,
	) -> Result<()>
	where
		F: FileLike,
		TagspliceError: From<<F as Truncate>::Error>,
		TagspliceError: From<<F as Length>::Error>,
	{
		self.issues.clear();
		self.remove_inner(file, selector, write_options, sink)
	}

	fn remove_inner<F>(
		&mut self,
		file: &mut F,
		selector: TagSelector<'_>,
		write_options: WriteOptions,
		sink: &mut dyn ProgressSink,
	) -> Result<()>
	where
		F: FileLike,
		TagspliceError: From<<F as Truncate>::Error>,
		TagspliceError: From<<F as Length>::Error>,
	{
		let Some(file_type) = self.file_type else {
			self.issues
				.warn(None, "Unrecognized format, nothing to remove");
			return Ok(());
		};

		let tag_types = match selector.resolve(file_type) {
			Ok(tag_types) => tag_types,
			Err(e) => {
				self.issues
					.warn(None, format!("{} files can't hold every selected tag", file_type.name()));
				return Err(e);
			},
		};

		let pending = TagDiff::between(&self.baseline, &self.merged);

		let mut progress = Progress::new(sink);
		let count = tag_types.len();
		for (index, tag_type) in tag_types.into_iter().enumerate() {
			progress.step(index, count);
			self.splice(file, file_type, tag_type, &[], &write_options, &mut progress)?;
			self.systems.retain(|system| system.tag_type != tag_type);
		}
		progress.finish();

		self.rebuild_view();
		pending.apply(&mut self.merged);

		Ok(())
	}

	/// Save the track on a worker thread with the default [`WriteOptions`]
	///
	/// The track comes back through the handle, along with the result of [`Track::save_with`].
	/// `sink` is called from the worker thread.
	///
	/// # Examples
	///
	/// ```rust,no_run
	/// use tagsplice::track::Track;
	///
	/// # fn main() -> tagsplice::error::Result<()> {
	/// let mut track = Track::load("audiobook.m4b")?;
	/// track.tag_mut().set_album("Foo album");
	///
	/// let handle = track.save_in_background(|fraction: f32| println!("{fraction}"));
	/// let (track, saved) = handle.join().expect("worker panicked");
	/// assert!(saved, "{:?}", track.issues());
	/// # Ok(()) }
	/// ```
	pub fn save_in_background<S>(mut self, mut sink: S) -> JoinHandle<(Self, bool)>
	where
		S: ProgressSink + Send + 'static,
	{
		std::thread::spawn(move || {
			let saved = self.save_with(WriteOptions::default(), &mut sink);
			(self, saved)
		})
	}

	fn open(&self) -> Result<File> {
		let Some(path) = &self.path else {
			return Err(std::io::Error::new(
				std::io::ErrorKind::InvalidInput,
				"Track was not loaded from a path",
			)
			.into());
		};

		Ok(OpenOptions::new().read(true).write(true).open(path)?)
	}
}
