//! Merging the tags of several systems into one view, and pushing edits of that view back

use super::{StandardField, Tag, TagType};
use crate::chapter::Chapter;
use crate::picture::Picture;

/// Build the merged view of `tags`
///
/// `tags` is ordered by priority, highest first. A standard field takes the value of the first tag
/// that has it, additional fields are united with the first occurrence of a key winning, and the
/// pictures and chapters come from the first tag that has any.
pub(crate) fn merge_by_priority<'a, I>(tags: I) -> Tag
where
	I: IntoIterator<Item = &'a Tag>,
{
	let mut merged = Tag::new();

	for tag in tags {
		for (field, value) in &tag.fields {
			merged.fields.entry(*field).or_insert_with(|| value.clone());
		}

		for (key, value) in &tag.additional {
			if merged.additional(key).is_none() {
				merged.additional.push((key.clone(), value.clone()));
			}
		}

		if merged.pictures.is_empty() {
			merged.pictures.clone_from(&tag.pictures);
		}

		if merged.chapters.is_empty() {
			merged.chapters.clone_from(&tag.chapters);
		}
	}

	merged
}

/// Order `types` by the merge priority table
///
/// Systems missing from the table come last, in save order.
pub(crate) fn priority_order(types: &mut [TagType], priority: &[TagType]) {
	types.sort_by_key(|ty| {
		priority
			.iter()
			.position(|p| p == ty)
			.map_or((1, ty.save_rank()), |pos| (0, pos))
	});
}

/// The edits made to a merged view since it was built
#[derive(Debug, Default)]
pub(crate) struct TagDiff {
	/// `None` removes the field
	fields: Vec<(StandardField, Option<String>)>,
	additional_set: Vec<(String, String)>,
	additional_removed: Vec<String>,
	pictures: Option<Vec<Picture>>,
	chapters: Option<Vec<Chapter>>,
}

impl TagDiff {
	pub(crate) fn between(before: &Tag, after: &Tag) -> Self {
		let mut diff = TagDiff::default();

		for field in StandardField::ALL {
			let old = before.get(field);
			let new = after.get(field);
			if old != new {
				diff.fields.push((field, new.map(str::to_owned)));
			}
		}

		for (key, value) in &after.additional {
			if before.additional(key) != Some(value.as_str()) {
				diff.additional_set.push((key.clone(), value.clone()));
			}
		}

		for (key, _) in &before.additional {
			if after.additional(key).is_none() {
				diff.additional_removed.push(key.clone());
			}
		}

		let pictures_changed = before.pictures.len() != after.pictures.len()
			|| before
				.pictures
				.iter()
				.zip(&after.pictures)
				.any(|(a, b)| !a.same_as(b));
		if pictures_changed {
			diff.pictures = Some(after.pictures.clone());
		}

		if before.chapters != after.chapters {
			diff.chapters = Some(after.chapters.clone());
		}

		diff
	}

	pub(crate) fn is_empty(&self) -> bool {
		self.fields.is_empty()
			&& self.additional_set.is_empty()
			&& self.additional_removed.is_empty()
			&& self.pictures.is_none()
			&& self.chapters.is_none()
	}

	pub(crate) fn apply(&self, tag: &mut Tag) {
		for (field, value) in &self.fields {
			match value {
				Some(value) => tag.set(*field, value.clone()),
				None => {
					tag.remove(*field);
				},
			}
		}

		for key in &self.additional_removed {
			tag.remove_additional(key);
		}

		for (key, value) in &self.additional_set {
			tag.set_additional(key.clone(), value.clone());
		}

		if let Some(pictures) = &self.pictures {
			tag.pictures.clone_from(pictures);
		}

		if let Some(chapters) = &self.chapters {
			tag.chapters.clone_from(chapters);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::{TagDiff, merge_by_priority, priority_order};
	use crate::picture::{Picture, PictureType};
	use crate::tag::{Tag, TagType};

	#[test_log::test]
	fn first_system_wins() {
		let mut native = Tag::new();
		native.set_title("Native");
		native.set_additional("K", "native");

		let mut legacy = Tag::new();
		legacy.set_title("Legacy");
		legacy.set_artist("Legacy artist");
		legacy.set_additional("K", "legacy");
		legacy.set_additional("L", "legacy");

		let merged = merge_by_priority([&native, &legacy]);
		assert_eq!(merged.title(), Some("Native"));
		assert_eq!(merged.artist(), Some("Legacy artist"));
		assert_eq!(merged.additional("K"), Some("native"));
		assert_eq!(merged.additional("L"), Some("legacy"));
	}

	#[test_log::test]
	fn priority_table_order() {
		let mut types = [TagType::Id3v1, TagType::Id3v2, TagType::Ape];
		priority_order(&mut types, &[TagType::Ape]);
		assert_eq!(types, [TagType::Ape, TagType::Id3v2, TagType::Id3v1]);
	}

	#[test_log::test]
	fn diff_applies_to_other_tags() {
		let mut before = Tag::new();
		before.set_title("Old");
		before.set_album("Album");
		before.set_additional("GONE", "x");

		let mut after = before.clone();
		after.set_title("New");
		after.remove_album();
		after.remove_additional("GONE");
		after.push_picture(Picture::new(PictureType::CoverFront, None, None, vec![1]));

		let diff = TagDiff::between(&before, &after);
		assert!(!diff.is_empty());

		let mut system = Tag::new();
		system.set_title("Old");
		system.set_album("Album");
		system.set_artist("Untouched");
		system.set_additional("GONE", "x");
		diff.apply(&mut system);

		assert_eq!(system.title(), Some("New"));
		assert_eq!(system.album(), None);
		assert_eq!(system.artist(), Some("Untouched"));
		assert_eq!(system.additional("GONE"), None);
		assert_eq!(system.pictures().len(), 1);

		assert!(TagDiff::between(&after, &after.clone()).is_empty());
	}
}
