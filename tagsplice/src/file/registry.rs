//! The process-wide format registry
//!
//! Maps extensions and MIME types to a [`FileType`], and describes which tag systems each
//! format carries. It is built on first use and never mutated afterwards, so it can be read from
//! any number of threads.

use super::FileType;
use crate::tag::TagType;

use std::collections::HashMap;
use std::sync::OnceLock;

/// Everything the orchestrator needs to know about a format
#[derive(Debug)]
pub(crate) struct FormatDescriptor {
	pub(crate) file_type: FileType,
	pub(crate) name: &'static str,
	pub(crate) extensions: &'static [&'static str],
	pub(crate) mime_types: &'static [&'static str],
	/// Supported tag systems, in save order
	pub(crate) tag_types: &'static [TagType],
	pub(crate) native: TagType,
	/// The tag systems created when a file has none at all
	pub(crate) defaults: &'static [TagType],
}

static DESCRIPTORS: [FormatDescriptor; 5] = [
	FormatDescriptor {
		file_type: FileType::Mpeg,
		name: "MPEG Audio",
		extensions: &["mp1", "mp2", "mp3"],
		mime_types: &["audio/mp3", "audio/mpeg", "audio/x-mpeg"],
		tag_types: &[TagType::Id3v2, TagType::Ape, TagType::Id3v1],
		native: TagType::Id3v2,
		defaults: &[TagType::Id3v2],
	},
	FormatDescriptor {
		file_type: FileType::Mp4,
		name: "MPEG-4 Part 14",
		extensions: &["mp4", "m4a", "m4b", "m4p", "m4r", "m4v", "aax"],
		mime_types: &["audio/mp4", "audio/mp4a-latm", "audio/vnd.audible.aax"],
		tag_types: &[TagType::Mp4Ilst],
		native: TagType::Mp4Ilst,
		defaults: &[TagType::Mp4Ilst],
	},
	FormatDescriptor {
		file_type: FileType::Wav,
		name: "Waveform Audio",
		extensions: &["wav", "bwf", "bwav"],
		mime_types: &["audio/x-wav", "audio/wav"],
		tag_types: &[TagType::Id3v2, TagType::RiffInfo],
		native: TagType::RiffInfo,
		defaults: &[TagType::Id3v2, TagType::RiffInfo],
	},
	FormatDescriptor {
		file_type: FileType::Ape,
		name: "Monkey's Audio",
		extensions: &["ape"],
		mime_types: &["audio/ape", "audio/x-ape"],
		tag_types: &[TagType::Id3v2, TagType::Ape, TagType::Id3v1],
		native: TagType::Ape,
		defaults: &[TagType::Ape],
	},
	FormatDescriptor {
		file_type: FileType::OptimFrog,
		name: "OptimFROG",
		extensions: &["ofr", "ofs"],
		mime_types: &["audio/ofr", "audio/x-ofr"],
		tag_types: &[TagType::Id3v2, TagType::Ape, TagType::Id3v1],
		native: TagType::Ape,
		defaults: &[TagType::Ape],
	},
];

pub(crate) struct Registry {
	extensions: HashMap<&'static str, FileType>,
	mime_types: HashMap<&'static str, FileType>,
}

impl Registry {
	fn build() -> Self {
		let mut extensions = HashMap::new();
		let mut mime_types = HashMap::new();

		for descriptor in &DESCRIPTORS {
			for ext in descriptor.extensions {
				extensions.insert(*ext, descriptor.file_type);
			}

			for mime in descriptor.mime_types {
				mime_types.insert(*mime, descriptor.file_type);
			}
		}

		log::trace!(
			"Built format registry ({} extensions, {} MIME types)",
			extensions.len(),
			mime_types.len()
		);

		Self {
			extensions,
			mime_types,
		}
	}

	/// `ext` must be lowercase
	pub(crate) fn by_extension(&self, ext: &str) -> Option<FileType> {
		self.extensions.get(ext).copied()
	}

	/// `mime` must be lowercase
	pub(crate) fn by_mime(&self, mime: &str) -> Option<FileType> {
		self.mime_types.get(mime).copied()
	}
}

pub(crate) fn registry() -> &'static Registry {
	static REGISTRY: OnceLock<Registry> = OnceLock::new();
	REGISTRY.get_or_init(Registry::build)
}

pub(crate) fn descriptor(file_type: FileType) -> &'static FormatDescriptor {
	match file_type {
		FileType::Mpeg => &DESCRIPTORS[0],
		FileType::Mp4 => &DESCRIPTORS[1],
		FileType::Wav => &DESCRIPTORS[2],
		FileType::Ape => &DESCRIPTORS[3],
		FileType::OptimFrog => &DESCRIPTORS[4],
	}
}

/// All extensions known to the registry
///
/// This can be used as a filter when scanning directories.
pub fn extensions() -> impl Iterator<Item = &'static str> {
	DESCRIPTORS.iter().flat_map(|d| d.extensions.iter().copied())
}

impl FileType {
	/// A human readable name of the format
	pub fn name(self) -> &'static str {
		descriptor(self).name
	}
}

#[cfg(test)]
mod tests {
	use super::{DESCRIPTORS, descriptor, extensions, registry};
	use crate::file::FileType;
	use crate::tag::TagType;

	#[test_log::test]
	fn descriptors_are_indexed_by_type() {
		for d in &DESCRIPTORS {
			assert_eq!(descriptor(d.file_type).file_type, d.file_type);
			assert!(d.tag_types.contains(&d.native));
			assert!(d.defaults.iter().all(|t| d.tag_types.contains(t)));
			assert!(
				d.tag_types
					.windows(2)
					.all(|pair| pair[0].save_rank() < pair[1].save_rank())
			);
		}
	}

	#[test_log::test]
	fn lookups() {
		assert_eq!(registry().by_extension("aax"), Some(FileType::Mp4));
		assert_eq!(registry().by_extension("ofs"), Some(FileType::OptimFrog));
		assert_eq!(registry().by_mime("audio/x-mpeg"), Some(FileType::Mpeg));
		assert_eq!(registry().by_mime("audio/flac"), None);
		assert_eq!(extensions().count(), 16);
		assert_eq!(FileType::Wav.native_tag_type(), TagType::RiffInfo);
	}

	#[test_log::test]
	fn concurrent_reads() {
		let handles = (0..4)
			.map(|_| std::thread::spawn(|| registry().by_extension("mp3")))
			.collect::<Vec<_>>();

		for handle in handles {
			assert_eq!(handle.join().unwrap(), Some(FileType::Mpeg));
		}
	}
}
