//! Splicing serialized tags into a file
//!
//! Every tag system describes where its tag lives with a [`Site`]: the byte extent of the tag, the
//! free space next to it, how free space is expressed in the format, and the container fields that
//! need to follow the tag when it changes size. [`splice`] then picks the cheapest way to put the
//! new bytes in place:
//!
//! 1. Write over the old extent, filling what is left with padding
//! 2. Grow into the padding that directly follows the extent
//! 3. Shift everything after the extent, reserving fresh padding when the format allows it
//!
//! An empty tag removes the old one, leaving the smallest padding marker the format recognizes
//! behind, or nothing at all (see [`RemovalPolicy`]).
//!
//! Only the third path moves the audio data. Container fields are checked before the first byte
//! is moved, so a shift that cannot be expressed in the container fails with the file untouched.

mod shift;

pub(crate) use shift::collapse;

use crate::config::{RemovalPolicy, WriteOptions};
use crate::error::{Result, TagspliceError};
use crate::macros::{err, try_vec};
use crate::progress::Progress;
use crate::util::io::{FieldWidth, FileLike, Length, Truncate};

use std::io::{Seek, SeekFrom, Write};

/// A half-open byte range of the file
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Extent {
	pub(crate) start: u64,
	pub(crate) end: u64,
}

impl Extent {
	pub(crate) fn new(start: u64, end: u64) -> Self {
		debug_assert!(start <= end);
		Self { start, end }
	}

	/// An empty extent, marking where a new tag would be inserted
	pub(crate) fn at(pos: u64) -> Self {
		Self::new(pos, pos)
	}

	pub(crate) fn len(self) -> u64 {
		self.end - self.start
	}
}

/// A standalone free-space structure
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Marker {
	/// An MP4 `free` atom: big endian size (including the header), then the identifier
	Atom,
	/// A RIFF `JUNK` chunk: the identifier, then a little endian size (excluding the header).
	/// Chunks always have an even length.
	Chunk,
}

impl Marker {
	pub(crate) const MIN_LEN: u64 = 8;

	pub(crate) fn can_fill(self, len: u64) -> bool {
		len == 0
			|| (len >= Self::MIN_LEN
				&& match self {
					Marker::Atom => len <= u64::from(u32::MAX),
					Marker::Chunk => len % 2 == 0 && len - 8 <= u64::from(u32::MAX),
				})
	}

	/// The smallest usable marker length at or above `len`
	fn round_up(self, len: u64) -> u64 {
		let len = len.max(Self::MIN_LEN);
		match self {
			Marker::Atom => len,
			Marker::Chunk => len + (len & 1),
		}
	}

	pub(crate) fn render(self, len: u64) -> Result<Vec<u8>> {
		if len == 0 {
			return Ok(Vec::new());
		}

		if !self.can_fill(len) {
			err!(Layout("Padding marker has an invalid size"));
		}

		let mut marker = try_vec![0; len as usize];
		match self {
			Marker::Atom => {
				FieldWidth::U32Be.write_into(&mut marker, 0, len)?;
				marker[4..8].copy_from_slice(b"free");
			},
			Marker::Chunk => {
				marker[..4].copy_from_slice(b"JUNK");
				FieldWidth::U32Le.write_into(&mut marker, 4, len - 8)?;
			},
		}

		Ok(marker)
	}
}

/// How a format expresses unused space around its tag
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum PaddingKind {
	/// No free space, the tag always has its exact size
	None,
	/// Zeroes at the end of the tag itself, counted in a size field of the tag header
	///
	/// `size_pos` is relative to the start of the tag, and the size stored excludes the first
	/// `header_len` bytes.
	Inline {
		size_pos: usize,
		header_len: u64,
		width: FieldWidth,
	},
	/// A separate structure following the tag
	Marker(Marker),
}

/// A container field that must follow the tag when it changes size
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Patch {
	pub(crate) pos: u64,
	pub(crate) width: FieldWidth,
	pub(crate) kind: PatchKind,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum PatchKind {
	/// The size of a structure enclosing the tag
	ContainerSize,
	/// An absolute file offset
	Offset,
	/// `count` consecutive absolute file offsets
	OffsetTable { count: u32 },
}

impl Patch {
	pub(crate) fn container_size(pos: u64, width: FieldWidth) -> Self {
		Self {
			pos,
			width,
			kind: PatchKind::ContainerSize,
		}
	}
}

/// Where a tag lives, or would live, in the current file
#[derive(Clone, Debug)]
pub(crate) struct Site {
	pub(crate) extent: Extent,
	/// `false` when `extent` is an empty insertion point
	pub(crate) exists: bool,
	/// Free space directly following `extent`
	pub(crate) padding: Option<Extent>,
	pub(crate) padding_kind: PaddingKind,
	pub(crate) patches: Vec<Patch>,
	/// Other pieces of the same tag system, which are folded into `extent` on save
	pub(crate) orphans: Vec<Extent>,
	/// A new tag must be preceded by a zero byte to land on an even offset
	pub(crate) needs_pad_byte: bool,
}

impl Site {
	pub(crate) fn new(extent: Extent, exists: bool, padding_kind: PaddingKind) -> Self {
		Self {
			extent,
			exists,
			padding: None,
			padding_kind,
			patches: Vec::new(),
			orphans: Vec::new(),
			needs_pad_byte: false,
		}
	}

	/// The padding, if it is directly adjacent to the extent
	fn adjacent_padding(&self) -> Option<Extent> {
		self.padding.filter(|p| p.start == self.extent.end)
	}
}

/// How a splice was carried out
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum SplicePath {
	/// Nothing to write or remove
	Unchanged,
	/// The tag was written over its old extent
	InPlace,
	/// The tag grew into the padding following it
	IntoPadding,
	/// The rest of the file was moved
	Shift,
	/// The tag was replaced by a padding marker
	RemovedToMarker,
	/// The tag was removed entirely
	Collapsed,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct SpliceOutcome {
	pub(crate) path: SplicePath,
	/// The end of the replaced range before the splice, anything at or after it moved by `delta`
	pub(crate) old_end: u64,
	pub(crate) delta: i64,
}

impl SpliceOutcome {
	fn unmoved(path: SplicePath, old_end: u64) -> Self {
		Self {
			path,
			old_end,
			delta: 0,
		}
	}
}

/// Replace the tag at `site` with `content`
///
/// An empty `content` removes the tag.
pub(crate) fn splice<F>(
	file: &mut F,
	site: &Site,
	content: &[u8],
	options: &WriteOptions,
	progress: &mut Progress<'_>,
) -> Result<SpliceOutcome>
where
	F: FileLike,
	TagspliceError: From<<F as Truncate>::Error>,
	TagspliceError: From<<F as Length>::Error>,
{
	if content.is_empty() {
		return remove(file, site, options.removal_policy, progress);
	}

	if !site.exists && site.needs_pad_byte {
		log::debug!("Layout: Restoring a missing pad byte before the new tag");

		let mut aligned = Vec::new();
		aligned.try_reserve(content.len() + 1)?;
		aligned.push(0);
		aligned.extend_from_slice(content);

		let mut site = site.clone();
		site.needs_pad_byte = false;
		return splice(file, &site, &aligned, options, progress);
	}

	let extent = site.extent;
	let new_len = content.len() as u64;

	let outcome = match site.padding_kind {
		PaddingKind::None => {
			if site.exists && new_len == extent.len() {
				log::debug!("Layout: Tag has the same size, writing in place");
				write_at(file, extent.start, content)?;
				SpliceOutcome::unmoved(SplicePath::InPlace, extent.end)
			} else {
				shift::replace(file, &site.patches, extent, content.to_vec(), progress)?
			}
		},
		PaddingKind::Inline {
			size_pos,
			header_len,
			width,
		} => {
			if site.exists && new_len <= extent.len() {
				log::debug!(
					"Layout: Tag fits in its extent, {} bytes of padding remain",
					extent.len() - new_len
				);

				let filled = fill_inline(content, extent.len(), size_pos, header_len, width)?;
				write_at(file, extent.start, &filled)?;
				SpliceOutcome::unmoved(SplicePath::InPlace, extent.end)
			} else {
				let padding = u64::from(options.preferred_padding.unwrap_or(0));
				let filled = fill_inline(content, new_len + padding, size_pos, header_len, width)?;
				shift::replace(file, &site.patches, extent, filled, progress)?
			}
		},
		PaddingKind::Marker(marker) => splice_with_marker(file, site, content, marker, options, progress)?,
	};

	progress.report(1.0);
	Ok(outcome)
}

fn splice_with_marker<F>(
	file: &mut F,
	site: &Site,
	content: &[u8],
	marker: Marker,
	options: &WriteOptions,
	progress: &mut Progress<'_>,
) -> Result<SpliceOutcome>
where
	F: FileLike,
	TagspliceError: From<<F as Truncate>::Error>,
	TagspliceError: From<<F as Length>::Error>,
{
	let extent = site.extent;
	let new_len = content.len() as u64;
	let padding = site.adjacent_padding();

	// Leftover space and the old padding become one marker, so free space never fragments
	if let Some(padding) = padding {
		let available = extent.len() + padding.len();
		if new_len <= available && marker.can_fill(available - new_len) {
			log::debug!(
				"Layout: Tag fits in its extent and {} bytes of padding, {} bytes remain",
				padding.len(),
				available - new_len
			);

			let mut buf = content.to_vec();
			buf.extend(marker.render(available - new_len)?);
			write_at(file, extent.start, &buf)?;

			let path = if new_len <= extent.len() {
				SplicePath::InPlace
			} else {
				SplicePath::IntoPadding
			};
			return Ok(SpliceOutcome::unmoved(path, padding.end));
		}
	}

	if new_len <= extent.len() && marker.can_fill(extent.len() - new_len) {
		log::debug!(
			"Layout: Tag fits in its extent, leaving {} bytes of padding",
			extent.len() - new_len
		);

		let mut buf = content.to_vec();
		buf.extend(marker.render(extent.len() - new_len)?);
		write_at(file, extent.start, &buf)?;

		return Ok(SpliceOutcome::unmoved(SplicePath::InPlace, extent.end));
	}

	// The old padding is replaced along with the tag
	let range = Extent::new(extent.start, padding.map_or(extent.end, |p| p.end));

	let mut buf = content.to_vec();
	if let Some(preferred) = options.preferred_padding {
		buf.extend(marker.render(marker.round_up(u64::from(preferred)))?);
	}

	shift::replace(file, &site.patches, range, buf, progress)
}

fn remove<F>(
	file: &mut F,
	site: &Site,
	policy: RemovalPolicy,
	progress: &mut Progress<'_>,
) -> Result<SpliceOutcome>
where
	F: FileLike,
	TagspliceError: From<<F as Truncate>::Error>,
	TagspliceError: From<<F as Length>::Error>,
{
	if !site.exists {
		return Ok(SpliceOutcome::unmoved(SplicePath::Unchanged, site.extent.end));
	}

	let mut outcome = match (site.padding_kind, policy) {
		(PaddingKind::Marker(marker), RemovalPolicy::LeavePaddingMarker) => {
			log::debug!("Layout: Replacing tag with a padding marker");
			let replacement = marker.render(Marker::MIN_LEN)?;
			shift::replace(file, &site.patches, site.extent, replacement, progress)?
		},
		_ => {
			log::debug!("Layout: Removing tag entirely");
			shift::replace(file, &site.patches, site.extent, Vec::new(), progress)?
		},
	};

	outcome.path = match site.padding_kind {
		PaddingKind::Marker(_) if policy == RemovalPolicy::LeavePaddingMarker => {
			SplicePath::RemovedToMarker
		},
		_ => SplicePath::Collapsed,
	};

	progress.report(1.0);
	Ok(outcome)
}

fn fill_inline(
	content: &[u8],
	total_len: u64,
	size_pos: usize,
	header_len: u64,
	width: FieldWidth,
) -> Result<Vec<u8>> {
	if total_len < header_len || (content.len() as u64) > total_len {
		err!(Layout("Tag is smaller than its own header"));
	}

	let mut filled = Vec::new();
	filled.try_reserve(total_len as usize)?;
	filled.extend_from_slice(content);
	filled.resize(total_len as usize, 0);

	width.write_into(&mut filled, size_pos, total_len - header_len)?;
	Ok(filled)
}

fn write_at<F>(file: &mut F, pos: u64, bytes: &[u8]) -> Result<()>
where
	F: Write + Seek,
{
	file.seek(SeekFrom::Start(pos))?;
	file.write_all(bytes)?;
	Ok(())
}
