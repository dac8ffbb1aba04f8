use super::data_type::DataType;
use super::{
	COVER_ITEM, DISC_ITEM, FREEFORM_ITEM, ITUNES_MEAN, TEXT_ITEMS, TRACK_ITEM, is_mapped, key_ident,
};
use crate::adapter::{Capabilities, EncodeContext, Residue};
use crate::error::Result;
use crate::issue::IssueLog;
use crate::mp4::atom::write_atom;
use crate::mp4::chpl;
use crate::picture::PictureType;
use crate::tag::{StandardField, Tag, TagType, parse_number};

const CAPABILITIES: Capabilities = Capabilities {
	fields: &[
		StandardField::Title,
		StandardField::Artist,
		StandardField::Album,
		StandardField::AlbumArtist,
		StandardField::Composer,
		StandardField::Genre,
		StandardField::Comment,
		StandardField::RecordingDate,
		StandardField::TrackNumber,
		StandardField::TrackTotal,
		StandardField::DiscNumber,
		StandardField::DiscTotal,
		StandardField::Copyright,
		StandardField::Lyrics,
	],
	additional: true,
	pictures: true,
	chapters: true,
};

// Version and flags, predefined, handler type, manufacturer, then flags, mask and an empty name
const HDLR_BODY: [u8; 25] = [
	0, 0, 0, 0, 0, 0, 0, 0, b'm', b'd', b'i', b'r', b'a', b'p', b'p', b'l', 0, 0, 0, 0, 0, 0, 0, 0,
	0,
];

/// Encode a complete `udta` atom, or nothing if there is nothing to hold
pub(crate) fn encode(tag: &Tag, residue: &Residue, ctx: &mut EncodeContext<'_>) -> Result<Vec<u8>> {
	CAPABILITIES.report_dropped(tag, TagType::Mp4Ilst, ctx.issues);

	let residue = match residue {
		Residue::Mp4(residue) => Some(residue),
		_ => None,
	};

	let mut ilst = IlstWriter::default();

	for (field, ident) in TEXT_ITEMS {
		if let Some(value) = tag.get(*field).filter(|v| !v.is_empty()) {
			ilst.text(*ident, value)?;
		}
	}

	ilst.pair(
		TRACK_ITEM,
		tag,
		(StandardField::TrackNumber, StandardField::TrackTotal),
		true,
		ctx.issues,
	)?;
	ilst.pair(
		DISC_ITEM,
		tag,
		(StandardField::DiscNumber, StandardField::DiscTotal),
		false,
		ctx.issues,
	)?;

	for (key, value) in &tag.additional {
		ilst.additional(key, value, ctx.issues)?;
	}

	ilst.pictures(tag, ctx.issues)?;

	if let Some(residue) = residue {
		for item in &residue.items {
			let ident = item.get(4..8).and_then(|i| <[u8; 4]>::try_from(i).ok());
			if ident.is_some_and(|ident| ilst.written.contains(&ident)) {
				log::debug!("MP4: Discarding retained item, it was replaced");
				continue;
			}

			ilst.body.extend_from_slice(item);
		}
	}

	let mut udta = Vec::new();

	if !ilst.body.is_empty() {
		let mut meta = vec![0; 4];
		write_atom(&mut meta, b"hdlr", &HDLR_BODY)?;
		write_atom(&mut meta, b"ilst", &ilst.body)?;
		write_atom(&mut udta, b"meta", &meta)?;
	}

	if !tag.chapters.is_empty() {
		let body = chpl::encode(&tag.chapters, ctx.duration_ms, ctx.issues);
		write_atom(&mut udta, b"chpl", &body)?;
	}

	if let Some(residue) = residue {
		for atom in &residue.atoms {
			udta.extend_from_slice(atom);
		}
	}

	if udta.is_empty() {
		log::debug!("MP4: Nothing to write");
		return Ok(udta);
	}

	let mut out = Vec::new();
	write_atom(&mut out, b"udta", &udta)?;

	log::trace!("MP4: Built `udta` atom, size: {} bytes", out.len());
	Ok(out)
}

#[derive(Default)]
struct IlstWriter {
	body: Vec<u8>,
	/// Identifiers of the plain items written so far
	written: Vec<[u8; 4]>,
}

impl IlstWriter {
	fn item(&mut self, ident: [u8; 4], values: &[(DataType, &[u8])]) -> Result<()> {
		let mut body = Vec::new();
		for (data_type, payload) in values {
			write_data(&mut body, *data_type, payload)?;
		}

		self.written.push(ident);
		write_atom(&mut self.body, &ident, &body)
	}

	fn text(&mut self, ident: [u8; 4], value: &str) -> Result<()> {
		self.item(ident, &[(DataType::Utf8, value.as_bytes())])
	}

	/// `trkn` and `disk`, `trkn` having 2 trailing reserved bytes
	fn pair(
		&mut self,
		ident: [u8; 4],
		tag: &Tag,
		(number, total): (StandardField, StandardField),
		trailing: bool,
		issues: &mut IssueLog,
	) -> Result<()> {
		let mut values = [0u16; 2];

		for (slot, field) in values.iter_mut().zip([number, total]) {
			let Some(value) = tag.get(field).filter(|v| !v.is_empty()) else {
				continue;
			};

			match parse_number(value).and_then(|n| u16::try_from(n).ok()) {
				Some(n) => *slot = n,
				None => issues.dropped(
					TagType::Mp4Ilst,
					format!("{field:?} `{value}` does not fit in a 16-bit number, dropping it"),
				),
			}
		}

		if values == [0, 0] {
			return Ok(());
		}

		let mut payload = vec![0, 0];
		payload.extend_from_slice(&values[0].to_be_bytes());
		payload.extend_from_slice(&values[1].to_be_bytes());
		if trailing {
			payload.extend_from_slice(&[0, 0]);
		}

		self.item(ident, &[(DataType::Reserved, &payload)])
	}

	fn additional(&mut self, key: &str, value: &str, issues: &mut IssueLog) -> Result<()> {
		if let Some(rest) = key.strip_prefix("----:") {
			match rest.split_once(':') {
				Some((mean, name)) if !mean.is_empty() && !name.is_empty() => {
					return self.freeform(mean, name, value);
				},
				_ => {
					issues.dropped(
						TagType::Mp4Ilst,
						format!("Additional field `{key}` is not a valid freeform key, dropping it"),
					);
					return Ok(());
				},
			}
		}

		match key_ident(key) {
			Some(ident) if is_mapped(&ident) => {
				issues.dropped(
					TagType::Mp4Ilst,
					format!("Additional field `{key}` collides with a mapped item, dropping it"),
				);
				Ok(())
			},
			Some(ident) => self.text(ident, value),
			None => self.freeform(ITUNES_MEAN, key, value),
		}
	}

	fn freeform(&mut self, mean: &str, name: &str, value: &str) -> Result<()> {
		// ---- : mean : name : data
		let mut body = Vec::new();
		for (ident, text) in [(b"mean", mean), (b"name", name)] {
			let mut child = vec![0; 4];
			child.extend_from_slice(text.as_bytes());
			write_atom(&mut body, ident, &child)?;
		}

		write_data(&mut body, DataType::Utf8, value.as_bytes())?;
		write_atom(&mut self.body, &FREEFORM_ITEM, &body)
	}

	fn pictures(&mut self, tag: &Tag, issues: &mut IssueLog) -> Result<()> {
		let mut values = Vec::with_capacity(tag.pictures.len());

		for picture in &tag.pictures {
			match DataType::for_picture(picture.mime_type()) {
				Some(data_type) => values.push((data_type, picture.data.as_slice())),
				None => issues.dropped(
					TagType::Mp4Ilst,
					format!("`covr` cannot hold a {} picture, dropping it", picture.mime_str()),
				),
			}
		}

		if tag
			.pictures
			.iter()
			.any(|p| p.pic_type != PictureType::CoverFront || p.description.is_some())
		{
			issues.dropped(
				TagType::Mp4Ilst,
				"`covr` has no picture types or descriptions, dropping them",
			);
		}

		if values.is_empty() {
			return Ok(());
		}

		self.item(COVER_ITEM, &values)
	}
}

fn write_data(out: &mut Vec<u8>, data_type: DataType, payload: &[u8]) -> Result<()> {
	// Type set and type, then the locale
	let mut body = Vec::new();
	body.try_reserve(payload.len() + 8)?;
	body.extend_from_slice(&u32::from(data_type).to_be_bytes());
	body.extend_from_slice(&[0; 4]);
	body.extend_from_slice(payload);

	write_atom(out, b"data", &body)
}

#[cfg(test)]
mod tests {
	use super::encode;
	use crate::adapter::{DecodeContext, EncodeContext, Residue};
	use crate::chapter::Chapter;
	use crate::config::{ParseOptions, WriteOptions};
	use crate::file::FileType;
	use crate::issue::IssueLog;
	use crate::mp4::Mp4Residue;
	use crate::mp4::ilst::read::decode;
	use crate::picture::{MimeType, Picture, PictureType};
	use crate::tag::Tag;

	fn write(tag: &Tag, residue: &Residue, issues: &mut IssueLog) -> Vec<u8> {
		encode(
			tag,
			residue,
			&mut EncodeContext {
				file_type: FileType::Mp4,
				options: WriteOptions::new(),
				duration_ms: 60_000,
				issues,
			},
		)
		.unwrap()
	}

	fn read(bytes: &[u8]) -> (Tag, Residue) {
		let mut issues = IssueLog::default();
		decode(
			bytes,
			&mut DecodeContext {
				file_type: FileType::Mp4,
				options: ParseOptions::new(),
				issues: &mut issues,
			},
		)
		.unwrap()
	}

	fn png() -> Vec<u8> {
		vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 1, 2]
	}

	#[test_log::test]
	fn roundtrip() {
		let mut tag = Tag::new();
		tag.set_title("Title \u{65e5}");
		tag.set_artist("Artist");
		tag.set_album("Album");
		tag.set_album_artist("Album Artist");
		tag.set_composer("Composer");
		tag.set_genre("Synthwave");
		tag.set_comment("Comment");
		tag.set_recording_date("2004-05-06");
		tag.set_copyright("2004 Someone");
		tag.set_lyrics("La la la");
		tag.set_track(3);
		tag.set_track_total(12);
		tag.set_disk(1);
		tag.set_disk_total(2);
		tag.set_additional("MOOD", "Calm");
		tag.set_additional("tvsh", "Show");
		tag.set_additional("----:org.example:KEY", "Value");
		tag.push_picture(Picture::new(PictureType::CoverFront, None, None, png()));
		tag.set_chapters(vec![Chapter::new(0).title("One"), Chapter::new(30_000).title("Two")]);

		let residue = Residue::Mp4(Mp4Residue {
			items: vec![b"\0\0\0\x19rtng\0\0\0\x11data\0\0\0\x15\0\0\0\0\x01".to_vec()],
			atoms: vec![b"\0\0\0\x08Xtra".to_vec()],
		});

		let mut issues = IssueLog::default();
		let bytes = write(&tag, &residue, &mut issues);
		assert!(issues.as_slice().is_empty());
		assert_eq!(&bytes[4..8], b"udta");

		let (read_tag, read_residue) = read(&bytes);
		assert_eq!(read_tag, tag);
		assert_eq!(read_residue, residue);

		// Nothing changes on a second pass
		assert_eq!(write(&read_tag, &read_residue, &mut issues), bytes);
	}

	#[test_log::test]
	fn unrepresentable_content() {
		let mut tag = Tag::new();
		tag.set_conductor("Conductor");
		tag.set_track(70_000);
		tag.set_additional("\u{a9}nam", "Shadow title");
		tag.push_picture(Picture::new(
			PictureType::Artist,
			Some(MimeType::Tiff),
			None,
			b"II*\0".to_vec(),
		));

		let mut issues = IssueLog::default();
		let bytes = write(&tag, &Residue::None, &mut issues);

		// Conductor, the track number, the additional field, the TIFF and the picture type
		assert_eq!(issues.as_slice().len(), 5);
		assert!(bytes.is_empty());
	}

	#[test_log::test]
	fn chapters_only() {
		let mut tag = Tag::new();
		tag.set_chapters(vec![Chapter::new(0)]);

		let bytes = write(&tag, &Residue::None, &mut IssueLog::default());
		assert_eq!(&bytes[12..16], b"chpl");
		assert_eq!(read(&bytes).0.chapters(), tag.chapters());
	}

	#[test_log::test]
	fn empty_tag_writes_nothing() {
		let mut tag = Tag::new();
		tag.clear_title();

		assert!(write(&tag, &Residue::None, &mut IssueLog::default()).is_empty());
	}
}
