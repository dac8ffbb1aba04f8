use crate::util::{audio_of, file_len, load, ofr_file, png, temp_file};
use tagsplice::file::FileType;
use tagsplice::tag::TagType;
use tagsplice::track::TagSelector;

#[test_log::test]
fn read_properties() {
	let file = temp_file(&ofr_file(88_200, 6000));

	let track = load(file.path());
	assert_eq!(track.file_type(), Some(FileType::OptimFrog));
	assert!(track.tag_types().is_empty());

	let info = track.info();
	assert_eq!(info.duration_ms(), 2000);
	assert_eq!(info.sample_rate(), Some(44_100));
	assert_eq!(info.channels(), Some(2));
	assert_eq!(info.bit_depth(), Some(16));
}

#[test_log::test]
fn ape_is_appended_and_removed() {
	let original = ofr_file(88_200, 6000);
	let file = temp_file(&original);

	let track = load(file.path());
	let audio = audio_of(file.path(), &track);

	let mut track = load(file.path());
	track.tag_mut().set_title("Foo title");
	track.tag_mut().set_album_artist("Foo album artist");
	track.tag_mut().set_disk(2);
	track.tag_mut().set_additional("CATALOG", "FOO-001");
	track.tag_mut().push_picture(png(200, 0x07));
	assert!(track.save(), "{:?}", track.issues());

	// Tags go after the stream, so nothing moved
	assert_eq!(&std::fs::read(file.path()).unwrap()[..original.len()], &original[..]);

	let reread = load(file.path());
	assert_eq!(reread.tag_types(), [TagType::Ape]);
	assert_eq!(reread.tag().title(), Some("Foo title"));
	assert_eq!(reread.tag().album_artist(), Some("Foo album artist"));
	assert_eq!(reread.tag().disk(), Some(2));
	assert_eq!(reread.tag().additional("CATALOG"), Some("FOO-001"));
	assert_eq!(reread.tag().pictures().len(), 1);
	assert_eq!(reread.info().duration_ms(), 2000);
	assert_eq!(audio_of(file.path(), &reread), audio);

	let mut track = reread;
	assert!(track.remove(TagSelector::Any), "{:?}", track.issues());

	// APE has no padding marker
	assert_eq!(file_len(file.path()), original.len() as u64);
	assert_eq!(std::fs::read(file.path()).unwrap(), original);
}
