//! The queryable log of everything that went wrong, or was dropped, during an operation

use crate::tag::TagType;

use std::fmt::{Display, Formatter};

/// How serious an [`Issue`] is
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
	/// Something was left out, such as a field the tag system cannot represent
	Info,
	/// Data was malformed and skipped, the rest of the operation went on
	Warning,
	/// The operation failed
	Error,
}

/// A single entry in the issue log of a [`Track`](crate::track::Track)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Issue {
	pub(crate) severity: Severity,
	pub(crate) tag_type: Option<TagType>,
	pub(crate) message: String,
}

impl Issue {
	/// The severity
	pub fn severity(&self) -> Severity {
		self.severity
	}

	/// The tag system this issue concerns, if any
	pub fn tag_type(&self) -> Option<TagType> {
		self.tag_type
	}

	/// A human readable description
	pub fn message(&self) -> &str {
		&self.message
	}
}

impl Display for Issue {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self.tag_type {
			Some(tag_type) => write!(f, "{tag_type}: {}", self.message),
			None => f.write_str(&self.message),
		}
	}
}

/// Collects [`Issue`]s, forwarding each of them to the `log` facade as well
#[derive(Clone, Debug, Default)]
pub(crate) struct IssueLog {
	issues: Vec<Issue>,
}

impl IssueLog {
	pub(crate) fn push(
		&mut self,
		severity: Severity,
		tag_type: Option<TagType>,
		message: impl Into<String>,
	) {
		let issue = Issue {
			severity,
			tag_type,
			message: message.into(),
		};

		match severity {
			Severity::Info => log::debug!("{issue}"),
			Severity::Warning => log::warn!("{issue}"),
			Severity::Error => log::error!("{issue}"),
		}

		self.issues.push(issue);
	}

	/// A field or structure the tag system has no room for
	pub(crate) fn dropped(&mut self, tag_type: TagType, message: impl Into<String>) {
		self.push(Severity::Info, Some(tag_type), message);
	}

	pub(crate) fn warn(&mut self, tag_type: Option<TagType>, message: impl Into<String>) {
		self.push(Severity::Warning, tag_type, message);
	}

	pub(crate) fn error(&mut self, tag_type: Option<TagType>, message: impl Into<String>) {
		self.push(Severity::Error, tag_type, message);
	}

	pub(crate) fn as_slice(&self) -> &[Issue] {
		&self.issues
	}

	pub(crate) fn clear(&mut self) {
		self.issues.clear();
	}
}

#[cfg(test)]
mod tests {
	use super::{IssueLog, Severity};
	use crate::tag::TagType;

	#[test_log::test]
	fn issues_are_recorded_in_order() {
		let mut log = IssueLog::default();
		log.dropped(TagType::Id3v1, "Pictures are not supported");
		log.warn(None, "Skipping a malformed frame");

		let issues = log.as_slice();
		assert_eq!(issues.len(), 2);
		assert_eq!(issues[0].severity(), Severity::Info);
		assert_eq!(issues[0].to_string(), "ID3v1: Pictures are not supported");
		assert_eq!(issues[1].tag_type(), None);

		log.clear();
		assert!(log.as_slice().is_empty());
	}
}
