//! Synchsafe integers and unsynchronised content

use std::io::Read;

/// An integer that can be converted to and from its synchsafe form
///
/// A synchsafe integer keeps the most significant bit of every byte clear, so it can never
/// produce a false MPEG frame sync. Only 28 bits of a `u32` are usable.
pub(crate) trait SynchsafeInteger: Sized {
	/// Returns `None` if `self` needs more than 28 bits
	fn synch(self) -> Option<Self>;
	fn unsynch(self) -> Self;
}

impl SynchsafeInteger for u32 {
	fn synch(self) -> Option<Self> {
		if self > 0x0FFF_FFFF {
			return None;
		}

		Some(
			(self & 0x7F)
				| ((self & (0x7F << 7)) << 1)
				| ((self & (0x7F << 14)) << 2)
				| ((self & (0x7F << 21)) << 3),
		)
	}

	fn unsynch(self) -> Self {
		((self & 0x7F00_0000) >> 3)
			| ((self & 0x7F_0000) >> 2)
			| ((self & 0x7F00) >> 1)
			| (self & 0x7F)
	}
}

/// A reader that removes the `0x00` inserted after every `0xFF` by the unsynchronisation scheme
pub(crate) struct UnsynchronizedStream<R> {
	reader: R,
	// Same buffer size as `BufReader`
	buf: [u8; 8 * 1024],
	bytes_available: usize,
	pos: usize,
	encountered_ff: bool,
}

impl<R> UnsynchronizedStream<R> {
	pub(crate) fn new(reader: R) -> Self {
		Self {
			reader,
			buf: [0; 8 * 1024],
			bytes_available: 0,
			pos: 0,
			encountered_ff: false,
		}
	}
}

impl<R: Read> Read for UnsynchronizedStream<R> {
	fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
		let mut dest_pos = 0;
		while dest_pos < buf.len() {
			if self.pos >= self.bytes_available {
				self.bytes_available = self.reader.read(&mut self.buf)?;
				self.pos = 0;

				if self.bytes_available == 0 {
					break;
				}
			}

			let current_byte = self.buf[self.pos];
			self.pos += 1;

			// Only a zero directly following 0xFF was inserted
			if std::mem::take(&mut self.encountered_ff) && current_byte == 0 {
				continue;
			}

			buf[dest_pos] = current_byte;
			dest_pos += 1;

			self.encountered_ff = current_byte == 0xFF;
		}

		Ok(dest_pos)
	}
}

/// Undo unsynchronisation on an in-memory buffer
pub(crate) fn resynchronize(content: &[u8]) -> Vec<u8> {
	let mut out = Vec::with_capacity(content.len());
	let mut stream = UnsynchronizedStream::new(content);
	// Reading from a slice cannot fail
	let _ = stream.read_to_end(&mut out);
	out
}

#[cfg(test)]
mod tests {
	use super::{SynchsafeInteger, UnsynchronizedStream, resynchronize};

	use std::io::{Cursor, Read};

	const UNSYNCHRONIZED_CONTENT: &[u8] =
		&[0xFF, 0x00, 0x00, 0xFF, 0x12, 0xB0, 0x05, 0xFF, 0x00, 0x00];
	const EXPECTED: &[u8] = &[0xFF, 0x00, 0xFF, 0x12, 0xB0, 0x05, 0xFF, 0x00];

	#[test_log::test]
	fn unsynchronized_stream() {
		let mut reader = UnsynchronizedStream::new(Cursor::new(UNSYNCHRONIZED_CONTENT));

		let mut final_content = Vec::new();
		reader.read_to_end(&mut final_content).unwrap();

		assert_eq!(final_content, EXPECTED);
	}

	#[test_log::test]
	fn unsynchronized_stream_across_buffer_refills() {
		let content = UNSYNCHRONIZED_CONTENT.repeat(1000);
		assert_eq!(resynchronize(&content), EXPECTED.repeat(1000));
	}

	#[test_log::test]
	fn unrelated_bytes_untouched() {
		const ORIGINAL_CONTENT: &[u8] = &[0xFF, 0x1A, 0xFF, 0xC0, 0x10, 0x01];
		assert_eq!(resynchronize(ORIGINAL_CONTENT), ORIGINAL_CONTENT);
	}

	#[test_log::test]
	fn synchsafe_u32() {
		assert_eq!(0x0FFF_FFFF_u32.synch(), Some(0x7F7F_7F7F));
		assert_eq!(257_u32.synch(), Some(0x0000_0201));
		assert_eq!(0x1000_0000_u32.synch(), None);
		assert_eq!(0x7F7F_7F7F_u32.unsynch(), 0x0FFF_FFFF);
		assert_eq!(0x0000_0201_u32.unsynch(), 257);
	}
}
