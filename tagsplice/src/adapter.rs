//! Dispatch from a [`TagType`] to its format adapter
//!
//! Every tag system is resolved once, as a variant of [`TagType`], and each operation matches on
//! it. An adapter knows how to find its tag in the file (a [`Site`]), how to turn the tag bytes
//! into a [`Tag`], and how to turn a [`Tag`] back into bytes. Anything a tag system holds that
//! has no place in the field model is kept as [`Residue`] and written back untouched.

use crate::config::{ParseOptions, WriteOptions};
use crate::error::Result;
use crate::file::FileType;
use crate::id3::v2::frame::Frame;
use crate::issue::IssueLog;
use crate::layout::{Extent, Site};
use crate::macros::try_vec;
use crate::tag::{StandardField, Tag, TagType};
use crate::{ape, id3, iff, mp4};

use std::io::{Read, Seek, SeekFrom};

/// The parts of a tag that the field model does not cover
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) enum Residue {
	#[default]
	None,
	/// Frames with no field mapping
	Id3v2(Vec<Frame>),
	/// Binary and locator items
	Ape(Vec<ape::item::Item>),
	/// Unmapped `ilst` items and `udta` children
	Mp4(mp4::Mp4Residue),
}

pub(crate) struct DecodeContext<'a> {
	pub(crate) file_type: FileType,
	pub(crate) options: ParseOptions,
	pub(crate) issues: &'a mut IssueLog,
}

pub(crate) struct EncodeContext<'a> {
	pub(crate) file_type: FileType,
	pub(crate) options: WriteOptions,
	/// Used to close the last chapter
	pub(crate) duration_ms: u32,
	pub(crate) issues: &'a mut IssueLog,
}

/// What a tag system can hold besides its standard fields
pub(crate) struct Capabilities {
	pub(crate) fields: &'static [StandardField],
	pub(crate) additional: bool,
	pub(crate) pictures: bool,
	pub(crate) chapters: bool,
}

impl Capabilities {
	/// Record everything in `tag` the tag system has no room for
	pub(crate) fn report_dropped(&self, tag: &Tag, tag_type: TagType, issues: &mut IssueLog) {
		for (field, _) in tag.fields() {
			if !self.fields.contains(&field) {
				issues.dropped(tag_type, format!("No slot for {field:?}, dropping it"));
			}
		}

		if !self.additional && !tag.additional.is_empty() {
			issues.dropped(
				tag_type,
				format!("Dropping {} additional field(s)", tag.additional.len()),
			);
		}

		if !self.pictures && !tag.pictures.is_empty() {
			issues.dropped(
				tag_type,
				format!("Dropping {} picture(s)", tag.pictures.len()),
			);
		}

		if !self.chapters && !tag.chapters.is_empty() {
			issues.dropped(
				tag_type,
				format!("Dropping {} chapter(s)", tag.chapters.len()),
			);
		}
	}
}

/// Find where `tag_type` lives in the file, or where it would be inserted
pub(crate) fn locate<R>(tag_type: TagType, file_type: FileType, reader: &mut R) -> Result<Site>
where
	R: Read + Seek,
{
	let site = match (tag_type, file_type) {
		(TagType::Id3v2, FileType::Wav) => iff::wav::locate_id3v2(reader)?,
		(TagType::Id3v2, _) => id3::v2::locate(reader)?,
		(TagType::Id3v1, _) => id3::v1::locate(reader)?,
		(TagType::Ape, _) => ape::locate(reader)?,
		(TagType::Mp4Ilst, _) => mp4::locate(reader)?,
		(TagType::RiffInfo, _) => iff::wav::locate_info(reader)?,
	};

	log::trace!(
		"Located {tag_type} at {}..{} (exists: {})",
		site.extent.start,
		site.extent.end,
		site.exists
	);

	Ok(site)
}

pub(crate) fn read_extent<R>(reader: &mut R, extent: Extent) -> Result<Vec<u8>>
where
	R: Read + Seek,
{
	let mut content = try_vec![0; extent.len() as usize];

	reader.seek(SeekFrom::Start(extent.start))?;
	reader.read_exact(&mut content)?;

	Ok(content)
}

/// Read the extent of `site`, followed by its orphans in file order
pub(crate) fn read_site<R>(reader: &mut R, site: &Site) -> Result<Vec<u8>>
where
	R: Read + Seek,
{
	let mut content = read_extent(reader, site.extent)?;
	for orphan in &site.orphans {
		content.extend(read_extent(reader, *orphan)?);
	}

	Ok(content)
}

/// Decode the bytes of a site returned by [`locate`]
pub(crate) fn decode(
	tag_type: TagType,
	ctx: &mut DecodeContext<'_>,
	content: &[u8],
) -> Result<(Tag, Residue)> {
	match (tag_type, ctx.file_type) {
		(TagType::Id3v2, FileType::Wav) => {
			let body = iff::wav::chunk_body(content)?;
			id3::v2::read::decode(body, ctx)
		},
		(TagType::Id3v2, _) => id3::v2::read::decode(content, ctx),
		(TagType::Id3v1, _) => Ok((id3::v1::read::decode(content, ctx)?, Residue::None)),
		(TagType::Ape, _) => ape::read::decode(content, ctx),
		(TagType::Mp4Ilst, _) => mp4::ilst::read::decode(content, ctx),
		(TagType::RiffInfo, _) => Ok((iff::wav::info::decode(content, ctx)?, Residue::None)),
	}
}

/// Encode a tag, an empty result removes the tag system from the file
pub(crate) fn encode(
	tag_type: TagType,
	ctx: &mut EncodeContext<'_>,
	tag: &Tag,
	residue: &Residue,
) -> Result<Vec<u8>> {
	match (tag_type, ctx.file_type) {
		(TagType::Id3v2, FileType::Wav) => {
			let content = id3::v2::write::encode(tag, residue, ctx)?;
			Ok(iff::wav::wrap_id3v2(content, ctx.options))
		},
		(TagType::Id3v2, _) => id3::v2::write::encode(tag, residue, ctx),
		(TagType::Id3v1, _) => id3::v1::write::encode(tag, ctx),
		(TagType::Ape, _) => ape::write::encode(tag, residue, ctx),
		(TagType::Mp4Ilst, _) => mp4::ilst::write::encode(tag, residue, ctx),
		(TagType::RiffInfo, _) => iff::wav::info::encode(tag, ctx),
	}
}
