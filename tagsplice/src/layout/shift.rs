use super::{Extent, Patch, PatchKind, SpliceOutcome, SplicePath};
use crate::error::{Result, TagspliceError};
use crate::macros::{err, try_vec};
use crate::progress::Progress;
use crate::util::io::{FieldWidth, FileLike, Length, SeekFieldExt, Truncate};

use std::io::{Cursor, Read, Seek, SeekFrom, Write};

// Data is moved in blocks of this size
const BLOCK_SIZE: u64 = 1024 * 1024;

/// A container field rewrite, computed before the file is touched
struct PendingWrite {
	pos: u64,
	bytes: Vec<u8>,
}

/// Remove `range` entirely, keeping `patches` consistent
pub(crate) fn collapse<F>(
	file: &mut F,
	range: Extent,
	patches: &[Patch],
	progress: &mut Progress<'_>,
) -> Result<SpliceOutcome>
where
	F: FileLike,
	TagspliceError: From<<F as Truncate>::Error>,
	TagspliceError: From<<F as Length>::Error>,
{
	log::debug!(
		"Layout: Collapsing {} bytes at offset {}",
		range.len(),
		range.start
	);

	let mut outcome = replace(file, patches, range, Vec::new(), progress)?;
	outcome.path = SplicePath::Collapsed;
	Ok(outcome)
}

/// Replace `range` with `bytes`, moving everything after it
pub(super) fn replace<F>(
	file: &mut F,
	patches: &[Patch],
	range: Extent,
	bytes: Vec<u8>,
	progress: &mut Progress<'_>,
) -> Result<SpliceOutcome>
where
	F: FileLike,
	TagspliceError: From<<F as Truncate>::Error>,
	TagspliceError: From<<F as Length>::Error>,
{
	let file_len = Length::len(&*file)?;
	if range.end > file_len {
		err!(Layout("Tag extent lies beyond the end of the file"));
	}

	let delta = bytes.len() as i64 - range.len() as i64;
	let pending = prepare_patches(file, patches, range, delta)?;

	log::debug!(
		"Layout: Shifting {} bytes after offset {} by {delta}",
		file_len - range.end,
		range.end
	);

	match delta {
		0 => {},
		d if d > 0 => grow(file, range.end, file_len, d as u64, progress)?,
		d => shrink(file, range.end, file_len, d.unsigned_abs(), progress)?,
	}

	file.seek(SeekFrom::Start(range.start))?;
	file.write_all(&bytes)?;

	for write in pending {
		file.seek(SeekFrom::Start(write.pos))?;
		file.write_all(&write.bytes)?;
	}

	file.flush()?;

	Ok(SpliceOutcome {
		path: SplicePath::Shift,
		old_end: range.end,
		delta,
	})
}

/// Where a byte position ends up after the shift
///
/// Positions inside the replaced range have no new location.
fn map_position(pos: u64, width: FieldWidth, range: Extent, delta: i64) -> Option<u64> {
	if pos >= range.end {
		return pos.checked_add_signed(delta);
	}

	if pos + width.byte_len() <= range.start {
		return Some(pos);
	}

	None
}

fn adjust_offset(offset: u64, range: Extent, delta: i64) -> Result<u64> {
	if offset < range.end {
		return Ok(offset);
	}

	match offset.checked_add_signed(delta) {
		Some(adjusted) => Ok(adjusted),
		None => err!(Layout("Shifted offset is negative")),
	}
}

fn prepare_patches<F>(
	file: &mut F,
	patches: &[Patch],
	range: Extent,
	delta: i64,
) -> Result<Vec<PendingWrite>>
where
	F: Read + Write + Seek,
{
	let mut pending = Vec::with_capacity(patches.len());

	for patch in patches {
		let Some(pos) = map_position(patch.pos, patch.width, range, delta) else {
			log::warn!(
				"Layout: Ignoring a patch inside the replaced range (offset {})",
				patch.pos
			);
			continue;
		};

		let mut bytes = Vec::new();
		match patch.kind {
			PatchKind::ContainerSize => {
				let size = file.read_field_at(patch.pos, patch.width)?;
				let Some(new_size) = size.checked_add_signed(delta) else {
					err!(Layout("Container would have a negative size"));
				};

				if new_size > patch.width.max_value() {
					err!(Layout("Container size no longer fits in its field"));
				}

				patch.width.write(&mut bytes, new_size)?;
			},
			PatchKind::Offset => {
				let offset = file.read_field_at(patch.pos, patch.width)?;
				let new_offset = adjust_offset(offset, range, delta)?;
				if new_offset > patch.width.max_value() {
					err!(Layout("Offset no longer fits in its field"));
				}

				patch.width.write(&mut bytes, new_offset)?;
			},
			PatchKind::OffsetTable { count } => {
				let table_len = u64::from(count) * patch.width.byte_len();
				let mut table = try_vec![0; table_len as usize];

				file.seek(SeekFrom::Start(patch.pos))?;
				file.read_exact(&mut table)?;

				bytes.try_reserve(table.len())?;

				let mut reader = Cursor::new(table);
				for _ in 0..count {
					let offset = patch.width.read(&mut reader)?;
					let new_offset = adjust_offset(offset, range, delta)?;
					if new_offset > patch.width.max_value() {
						err!(Layout("Chunk offset no longer fits in its table"));
					}

					patch.width.write(&mut bytes, new_offset)?;
				}
			},
		}

		pending.push(PendingWrite { pos, bytes });
	}

	Ok(pending)
}

fn grow<F>(
	file: &mut F,
	tail_start: u64,
	file_len: u64,
	delta: u64,
	progress: &mut Progress<'_>,
) -> Result<()>
where
	F: Read + Write + Seek,
{
	// Claim the new space first, so running out of space leaves the original data in place
	file.seek(SeekFrom::Start(file_len + delta - 1))?;
	file.write_all(&[0])?;

	let tail_len = file_len - tail_start;
	if tail_len == 0 {
		return Ok(());
	}

	let mut buf = try_vec![0; BLOCK_SIZE.min(tail_len) as usize];

	// Back to front, so no block overwrites data that has yet to be moved
	let mut remaining = tail_len;
	while remaining > 0 {
		let chunk = BLOCK_SIZE.min(remaining);
		let src = tail_start + remaining - chunk;

		file.seek(SeekFrom::Start(src))?;
		file.read_exact(&mut buf[..chunk as usize])?;

		file.seek(SeekFrom::Start(src + delta))?;
		file.write_all(&buf[..chunk as usize])?;

		remaining -= chunk;
		progress.report((tail_len - remaining) as f32 / tail_len as f32);
	}

	Ok(())
}

fn shrink<F>(
	file: &mut F,
	tail_start: u64,
	file_len: u64,
	shift: u64,
	progress: &mut Progress<'_>,
) -> Result<()>
where
	F: FileLike,
	TagspliceError: From<<F as Truncate>::Error>,
{
	let tail_len = file_len - tail_start;
	if tail_len > 0 {
		let mut buf = try_vec![0; BLOCK_SIZE.min(tail_len) as usize];

		let mut read_pos = tail_start;
		while read_pos < file_len {
			let chunk = BLOCK_SIZE.min(file_len - read_pos);

			file.seek(SeekFrom::Start(read_pos))?;
			file.read_exact(&mut buf[..chunk as usize])?;

			file.seek(SeekFrom::Start(read_pos - shift))?;
			file.write_all(&buf[..chunk as usize])?;

			read_pos += chunk;
			progress.report((read_pos - tail_start) as f32 / tail_len as f32);
		}
	}

	file.truncate(file_len - shift)?;
	Ok(())
}
