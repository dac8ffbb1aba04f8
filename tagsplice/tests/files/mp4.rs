use crate::util::{audio_of, file_len, load, mp4_file, png, stco_entry_pos, temp_file};
use tagsplice::chapter::Chapter;
use tagsplice::config::{RemovalPolicy, WriteOptions};
use tagsplice::file::FileType;
use tagsplice::issue::Severity;
use tagsplice::progress::NoProgress;
use tagsplice::tag::TagType;
use tagsplice::track::TagSelector;

fn mdat() -> Vec<u8> {
	(0..4000u32).map(|i| (i % 241) as u8).collect()
}

/// The size of the `udta` atom, which holds every tag
fn udta_len(file: &[u8]) -> u64 {
	let ident = file.windows(4).position(|w| w == b"udta").unwrap();
	u64::from(u32::from_be_bytes(
		file[ident - 4..ident].try_into().unwrap(),
	))
}

fn stco_entry(file: &[u8]) -> u64 {
	let pos = stco_entry_pos(file);
	u64::from(u32::from_be_bytes(file[pos..pos + 4].try_into().unwrap()))
}

#[test_log::test]
fn write_and_reread() {
	let file = temp_file(&mp4_file(&mdat()));

	let mut track = load(file.path());
	assert_eq!(track.file_type(), Some(FileType::Mp4));
	assert!(track.tag_types().is_empty());
	assert_eq!(track.info().duration_ms(), 5000);

	track.tag_mut().set_title("Foo title");
	track.tag_mut().set_artist("Foo artist");
	track.tag_mut().set_track(3);
	track.tag_mut().set_track_total(12);
	track.tag_mut().set_additional("MOOD", "Calm");
	track.tag_mut().push_picture(png(512, 0x33));
	assert!(track.save(), "{:?}", track.issues());

	let track = load(file.path());
	assert_eq!(track.tag_types(), [TagType::Mp4Ilst]);

	let tag = track.tag();
	assert_eq!(tag.title(), Some("Foo title"));
	assert_eq!(tag.artist(), Some("Foo artist"));
	assert_eq!(tag.track(), Some(3));
	assert_eq!(tag.track_total(), Some(12));
	assert_eq!(tag.additional("MOOD"), Some("Calm"));
	assert_eq!(tag.pictures().len(), 1);
	assert_eq!(tag.pictures()[0].data(), png(512, 0x33).data());
}

#[test_log::test]
fn chunk_offsets_follow_the_audio() {
	let file = temp_file(&mp4_file(&mdat()));

	let track = load(file.path());
	let audio = audio_of(file.path(), &track);
	let offset = track.info().audio_data_offset();
	assert_eq!(stco_entry(&std::fs::read(file.path()).unwrap()), offset);

	let mut track = load(file.path());
	track.tag_mut().set_album("Foo album");
	track.tag_mut().set_comment("A".repeat(3000));
	assert!(track.save(), "{:?}", track.issues());

	let content = std::fs::read(file.path()).unwrap();
	let moved = track.info().audio_data_offset();
	assert!(moved > offset);
	assert_eq!(stco_entry(&content), moved);
	assert_eq!(audio_of(file.path(), &track), audio);

	let reread = load(file.path());
	assert_eq!(reread.info().audio_data_offset(), moved);
	assert_eq!(reread.info().duration_ms(), 5000);
	assert!(
		reread.info().audio_data_offset() + reread.info().audio_data_size()
			<= file_len(file.path())
	);
}

#[test_log::test]
fn padding_is_reused() {
	let file = temp_file(&mp4_file(&mdat()));

	let mut sizes = Vec::new();
	for cycle in 0..12u32 {
		let mut track = load(file.path());
		// Shrinks and grows in turn, with the title growing past every earlier size
		track.tag_mut().set_title(format!("Take {cycle}"));
		track.tag_mut().set_artist(if cycle % 2 == 0 { "Foo" } else { "Foo artist much longer" });
		assert!(track.save(), "{:?}", track.issues());

		sizes.push(file_len(file.path()));
	}

	assert!(sizes.iter().all(|size| *size == sizes[0]), "{sizes:?}");

	let track = load(file.path());
	assert_eq!(track.tag().title(), Some("Take 11"));
	assert_eq!(track.tag().artist(), Some("Foo artist much longer"));
	assert_eq!(track.info().duration_ms(), 5000);

	let content = std::fs::read(file.path()).unwrap();
	assert_eq!(
		content.windows(4).filter(|w| *w == b"free").count(),
		1,
		"free space is kept in a single atom"
	);
}

#[test_log::test]
fn remove_leaves_marker() {
	let file = temp_file(&mp4_file(&mdat()));

	let mut track = load(file.path());
	track.tag_mut().set_title("Foo title");
	track.tag_mut().set_album("Foo album");
	assert!(track.save(), "{:?}", track.issues());

	let content = std::fs::read(file.path()).unwrap();
	let tagged_len = content.len() as u64;
	let tag_len = udta_len(&content);

	let mut track = load(file.path());
	let audio = audio_of(file.path(), &track);
	assert!(track.remove(TagSelector::Native), "{:?}", track.issues());

	// The tag is replaced by an 8 byte `free` atom
	assert_eq!(file_len(file.path()), tagged_len - tag_len + 8);
	assert!(track.tag_types().is_empty());

	let reread = load(file.path());
	assert!(reread.tag_types().is_empty());
	assert_eq!(reread.info().duration_ms(), 5000);
	assert_eq!(audio_of(file.path(), &reread), audio);

	// The marker is not a tag, removing again changes nothing
	let mut track = reread;
	assert!(track.remove(TagSelector::Any));
	assert_eq!(file_len(file.path()), tagged_len - tag_len + 8);
}

#[test_log::test]
fn remove_collapsed() {
	let original = mp4_file(&mdat());
	let file = temp_file(&original);

	let mut track = load(file.path());
	track.tag_mut().set_title("Foo title");
	assert!(track.save_with(WriteOptions::new().preferred_padding(0), &mut NoProgress));

	let mut track = load(file.path());
	assert!(track.remove_with(
		TagSelector::Any,
		WriteOptions::new().removal_policy(RemovalPolicy::Collapse),
		&mut NoProgress,
	));

	assert_eq!(std::fs::read(file.path()).unwrap(), original);
}

#[test_log::test]
fn chapters_keep_start_and_title() {
	let file = temp_file(&mp4_file(&mdat()));

	let mut track = load(file.path());
	track.tag_mut().set_chapters(vec![
		Chapter::new(0).title("Intro"),
		Chapter::new(1500).title("Middle").subtitle("Dropped"),
		Chapter::new(3000).title("End"),
	]);
	assert!(track.save(), "{:?}", track.issues());

	assert!(track.issues().iter().any(|issue| {
		issue.severity() == Severity::Info && issue.tag_type() == Some(TagType::Mp4Ilst)
	}));

	let track = load(file.path());
	let chapters = track.tag().chapters();
	assert_eq!(chapters.len(), 3);
	assert_eq!(chapters[1].start_ms(), 1500);
	assert_eq!(chapters[1].get_title(), Some("Middle"));
	assert_eq!(chapters[1].get_subtitle(), None);
	assert_eq!(chapters[2].get_title(), Some("End"));
}
