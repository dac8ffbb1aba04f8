use crate::util::{audio_of, file_len, id3v1, load, mpeg_frames, png, temp_file};
use tagsplice::chapter::Chapter;
use tagsplice::config::{ParseOptions, RemovalPolicy, WriteOptions};
use tagsplice::file::FileType;
use tagsplice::issue::Severity;
use tagsplice::picture::MimeType;
use tagsplice::tag::TagType;
use tagsplice::track::{TagSelector, Track};

#[test_log::test]
fn read_untagged() {
	let file = temp_file(&mpeg_frames(100));
	let track = load(file.path());

	assert_eq!(track.file_type(), Some(FileType::Mpeg));
	assert!(track.tag_types().is_empty());
	assert!(track.tag().is_empty());

	let info = track.info();
	assert_eq!(info.sample_rate(), Some(44_100));
	assert_eq!(info.bitrate(), Some(128));
	// 41700 bytes at 128 kbps
	assert_eq!(info.duration_ms(), 2606);
	assert_eq!(info.audio_data_offset(), 0);
	assert_eq!(info.audio_data_size(), 41_700);
}

#[test_log::test]
fn padding_is_reused() {
	let file = temp_file(&mpeg_frames(50));

	let mut sizes = Vec::new();
	for cycle in 0..12 {
		let mut track = load(file.path());
		track.tag_mut().set_title(format!("Title, take {cycle}"));
		track.tag_mut().set_artist(if cycle % 2 == 0 { "Foo" } else { "Foo artist" });
		track.tag_mut().set_track(cycle + 1);
		assert!(track.save(), "{:?}", track.issues());

		sizes.push(file_len(file.path()));
	}

	// The first save creates the tag, every later one fits in its padding
	assert!(sizes.iter().all(|size| *size == sizes[0]), "{sizes:?}");

	let track = load(file.path());
	assert_eq!(track.tag().title(), Some("Title, take 11"));
	assert_eq!(track.tag().artist(), Some("Foo artist"));
	assert_eq!(track.tag().track(), Some(12));
}

#[test_log::test]
fn audio_survives_save_and_remove() {
	let file = temp_file(&mpeg_frames(100));
	let original_len = file_len(file.path());

	let track = load(file.path());
	let duration = track.info().duration_ms();
	let audio = audio_of(file.path(), &track);

	let mut track = load(file.path());
	track.tag_mut().set_album("Foo album");
	track.tag_mut().push_picture(png(3000, 0x42));
	assert!(track.save(), "{:?}", track.issues());

	let tagged_len = file_len(file.path());
	assert!(tagged_len > original_len);

	// The track follows its own changes
	assert_eq!(audio_of(file.path(), &track), audio);
	assert_eq!(track.info().duration_ms(), duration);

	let reread = load(file.path());
	assert_eq!(reread.tag_types(), [TagType::Id3v2]);
	assert_eq!(reread.info().duration_ms(), duration);
	assert_eq!(
		reread.info().audio_data_offset(),
		track.info().audio_data_offset()
	);
	assert_eq!(audio_of(file.path(), &reread), audio);
	assert_eq!(reread.tag().pictures()[0].data(), track.tag().pictures()[0].data());

	let mut track = reread;
	assert!(track.remove(TagSelector::Any), "{:?}", track.issues());
	assert!(file_len(file.path()) < tagged_len);
	assert_eq!(file_len(file.path()), original_len);

	let reread = load(file.path());
	assert!(reread.tag_types().is_empty());
	assert_eq!(reread.info().duration_ms(), duration);
	assert_eq!(audio_of(file.path(), &reread), audio);
}

#[test_log::test]
fn chapter_round_trip() {
	let file = temp_file(&mpeg_frames(200));

	let cover = png(1500, 0x11);
	let chapters = vec![
		Chapter::new(0)
			.unique_id("intro")
			.end_ms(2000)
			.offsets(0, 41_700)
			.title("Intro")
			.subtitle("Where it starts")
			.picture(cover.clone()),
		Chapter::new(2000)
			.unique_id("outro")
			.end_ms(5200)
			.title("Outro"),
	];

	let mut track = load(file.path());
	track.tag_mut().set_title("Foo title");
	track.tag_mut().set_chapters(chapters.clone());
	assert!(track.save(), "{:?}", track.issues());

	let reread = load(file.path());
	let read_chapters = reread.tag().chapters();
	assert_eq!(read_chapters.len(), 2);

	let intro = &read_chapters[0];
	assert_eq!(intro.get_unique_id(), "intro");
	assert_eq!(intro.start_ms(), 0);
	assert_eq!(intro.get_end_ms(), Some(2000));
	assert_eq!(intro.start_offset(), Some(0));
	assert_eq!(intro.end_offset(), Some(41_700));
	assert!(intro.use_offset());
	assert_eq!(intro.get_title(), Some("Intro"));
	assert_eq!(intro.get_subtitle(), Some("Where it starts"));

	let picture = intro.get_picture().unwrap();
	assert_eq!(picture.data(), cover.data());
	assert_eq!(picture.mime_type(), Some(&MimeType::Png));

	let outro = &read_chapters[1];
	assert_eq!(outro.get_unique_id(), "outro");
	assert_eq!(outro.start_ms(), 2000);
	assert_eq!(outro.get_end_ms(), Some(5200));
	assert_eq!(outro.start_offset(), None);
	assert_eq!(outro.get_title(), Some("Outro"));
	assert!(outro.get_picture().is_none());
}

#[test_log::test]
fn alternating_chapter_pictures() {
	let file = temp_file(&mpeg_frames(200));

	let mut track = load(file.path());
	track.tag_mut().set_chapters(vec![
		Chapter::new(0).title("One"),
		Chapter::new(2500).title("Two"),
	]);
	assert!(track.save(), "{:?}", track.issues());

	let small = png(700, 0xAA);
	let large = png(2900, 0xBB);

	for round in 0..40 {
		let (first, second) = if round % 2 == 0 {
			(&small, &large)
		} else {
			(&large, &small)
		};

		let mut track = load(file.path());
		{
			let mut chapters = track.tag_mut().chapters_mut();
			chapters[0].set_picture(Some(first.clone()));
			chapters[1].set_picture(Some(second.clone()));
		}
		assert!(track.save(), "{:?}", track.issues());

		let reread = load(file.path());
		let chapters = reread.tag().chapters();
		assert_eq!(chapters.len(), 2);
		assert_eq!(chapters[0].get_picture().unwrap().data(), first.data());
		assert_eq!(chapters[1].get_picture().unwrap().data(), second.data());
	}

	// Round 39 was the last, with the large picture first
	let track = load(file.path());
	let chapters = track.tag().chapters();
	assert_eq!(chapters[0].get_title(), Some("One"));
	assert_eq!(chapters[0].start_ms(), 0);
	assert_eq!(chapters[0].get_picture().unwrap().data(), large.data());
	assert_eq!(chapters[1].get_title(), Some("Two"));
	assert_eq!(chapters[1].start_ms(), 2500);
	assert_eq!(chapters[1].get_picture().unwrap().data(), small.data());
}

#[test_log::test]
fn chapter_pictures_survive_without_cover_art() {
	let file = temp_file(&mpeg_frames(100));
	let cover = png(1200, 0x33);

	let mut track = load(file.path());
	track.tag_mut().push_picture(png(800, 0x44));
	track
		.tag_mut()
		.set_chapters(vec![Chapter::new(0).title("One").picture(cover.clone())]);
	assert!(track.save(), "{:?}", track.issues());

	let options = ParseOptions::new().read_cover_art(false);
	let mut track = Track::load_with_options(file.path(), options).unwrap();
	assert!(track.tag().pictures().is_empty());
	assert_eq!(
		track.tag().chapters()[0].get_picture().map(|p| p.data()),
		Some(cover.data())
	);

	track.tag_mut().set_title("Foo title");
	assert!(track.save(), "{:?}", track.issues());

	let reread = load(file.path());
	assert_eq!(reread.tag().title(), Some("Foo title"));
	assert_eq!(reread.tag().pictures().len(), 1);
	let chapters = reread.tag().chapters();
	assert_eq!(chapters.len(), 1);
	assert_eq!(chapters[0].get_picture().unwrap().data(), cover.data());
}

#[test_log::test]
fn merge_priority() {
	let mut content = mpeg_frames(50);
	content.extend(id3v1("Bar title", "Bar artist"));
	let file = temp_file(&content);

	// Only ID3v1 is present, so only ID3v1 is written
	let mut track = load(file.path());
	assert_eq!(track.tag_types(), [TagType::Id3v1]);
	assert_eq!(track.tag().title(), Some("Bar title"));
	assert_eq!(track.info().audio_data_size(), 50 * 417);

	track.tag_mut().set_album("Bar album");
	assert!(track.save(), "{:?}", track.issues());

	let track = load(file.path());
	assert_eq!(track.tag_types(), [TagType::Id3v1]);
	assert_eq!(track.tag().album(), Some("Bar album"));

	// Prepend an ID3v2 tag with a different title
	let mut content = std::fs::read(file.path()).unwrap();
	let id3v2 = {
		let id3v2_file = temp_file(&mpeg_frames(2));
		let mut id3v2_track = load(id3v2_file.path());
		id3v2_track.tag_mut().set_title("Foo title");
		assert!(id3v2_track.save());

		let bytes = std::fs::read(id3v2_file.path()).unwrap();
		bytes[..bytes.len() - 2 * 417].to_vec()
	};
	content.splice(0..0, id3v2);
	let file = temp_file(&content);

	let mut track = load(file.path());
	assert_eq!(track.tag_types(), [TagType::Id3v2, TagType::Id3v1]);
	assert_eq!(track.tag().title(), Some("Foo title"));
	// Only ID3v1 has an artist
	assert_eq!(track.tag().artist(), Some("Bar artist"));

	// An edit of the merged view reaches both systems
	track.tag_mut().set_artist("Baz artist");
	assert!(track.save(), "{:?}", track.issues());

	let track = load(file.path());
	assert_eq!(track.tag_of(TagType::Id3v2).unwrap().artist(), Some("Baz artist"));
	assert_eq!(track.tag_of(TagType::Id3v1).unwrap().artist(), Some("Baz artist"));
	assert_eq!(track.tag_of(TagType::Id3v1).unwrap().title(), Some("Bar title"));
}

#[test_log::test]
fn unsupported_content_is_reported() {
	let mut content = mpeg_frames(20);
	content.extend(id3v1("Bar title", "Bar artist"));
	let file = temp_file(&content);

	let mut track = load(file.path());
	track.tag_mut().push_picture(png(100, 0x01));
	track.tag_mut().set_chapters(vec![Chapter::new(0).title("One")]);
	assert!(track.save());

	let dropped = track
		.issues()
		.iter()
		.filter(|issue| issue.severity() == Severity::Info)
		.filter(|issue| issue.tag_type() == Some(TagType::Id3v1))
		.count();
	assert_eq!(dropped, 2, "{:?}", track.issues());
}

#[test_log::test]
fn progress_is_monotonic() {
	let mut content = mpeg_frames(300);
	content.extend(id3v1("Bar title", "Bar artist"));
	let file = temp_file(&content);

	let mut track = load(file.path());
	track.tag_mut().set_title("Foo title");

	let mut reports = Vec::new();
	let saved = track.save_with(
		WriteOptions::new().removal_policy(RemovalPolicy::Collapse),
		&mut |fraction: f32| reports.push(fraction),
	);
	assert!(saved);

	assert!(!reports.is_empty());
	assert!(reports.windows(2).all(|w| w[0] <= w[1]), "{reports:?}");
	assert_eq!(reports.last(), Some(&1.0));
}

#[test_log::test]
fn unsupported_selector() {
	let file = temp_file(&mpeg_frames(20));

	let mut track = load(file.path());
	assert!(!track.remove(TagSelector::Only(TagType::Mp4Ilst)));
	assert_eq!(
		track.issues().last().map(|issue| issue.severity()),
		Some(Severity::Error)
	);
}

#[test_log::test]
fn background_save() {
	let file = temp_file(&mpeg_frames(100));

	let mut track = load(file.path());
	track.tag_mut().set_title("Foo title");

	let (track, saved) = track
		.save_in_background(|_: f32| {})
		.join()
		.unwrap();
	assert!(saved, "{:?}", track.issues());

	assert_eq!(load(file.path()).tag().title(), Some("Foo title"));
}
