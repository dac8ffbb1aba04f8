//! Progress reporting for long saves

/// Receives the progress of a save or removal
///
/// The reported value goes from `0.0` to `1.0` and never decreases. It is reported synchronously,
/// from the thread doing the work, once per tag system and once per block of shifted data.
///
/// Any `FnMut(f32)` is a sink:
///
/// ```rust,no_run
/// use tagsplice::config::WriteOptions;
/// use tagsplice::track::Track;
///
/// # fn main() -> tagsplice::error::Result<()> {
/// let mut track = Track::load("audiobook.m4b")?;
/// track.tag_mut().set_title("Part 1");
/// track.try_save_with(WriteOptions::default(), &mut |fraction: f32| {
/// 	println!("{:.0}%", fraction * 100.0);
/// })?;
/// # Ok(()) }
/// ```
pub trait ProgressSink {
	/// Report the overall fraction of work done
	fn report(&mut self, fraction: f32);
}

impl<F> ProgressSink for F
where
	F: FnMut(f32),
{
	fn report(&mut self, fraction: f32) {
		self(fraction)
	}
}

/// A sink that discards every report
#[derive(Copy, Clone, Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
	fn report(&mut self, _: f32) {}
}

/// Maps the progress of one step onto its share of the whole operation
pub(crate) struct Progress<'a> {
	sink: &'a mut dyn ProgressSink,
	base: f32,
	span: f32,
	last: f32,
}

impl<'a> Progress<'a> {
	pub(crate) fn new(sink: &'a mut dyn ProgressSink) -> Self {
		Self {
			sink,
			base: 0.0,
			span: 1.0,
			last: 0.0,
		}
	}

	/// Restrict the following reports to step `index` out of `count`
	pub(crate) fn step(&mut self, index: usize, count: usize) {
		let count = count.max(1) as f32;
		self.base = index as f32 / count;
		self.span = 1.0 / count;
		self.report(0.0);
	}

	/// Report the fraction of the current step
	pub(crate) fn report(&mut self, fraction: f32) {
		let value = (self.base + self.span * fraction.clamp(0.0, 1.0)).clamp(0.0, 1.0);
		if value < self.last {
			return;
		}

		self.last = value;
		self.sink.report(value);
	}

	pub(crate) fn finish(&mut self) {
		self.base = 1.0;
		self.span = 0.0;
		self.report(1.0);
	}
}
