//! Version parsing and ordering.
//!
//! # Format
//! A version is split on `.`, `-` and `_` into segments. Segments made entirely of ASCII digits
//! are numeric, everything else is text. The qualifier `SNAPSHOT` (any case) marks the version
//! as unstable and is dropped from the segment list.
//!
//! # Ordering
//! Segments are compared left to right:
//! - numeric against numeric compares the values.
//! - text against text compares lexically.
//! - a numeric segment is always lower than a text segment, so `1.0.1` < `1.0.a` and
//!   `1.10` < `1.2a`. Digits too large for a `u64` count as text.
//!
//! When one version runs out of segments first it is the lower one. If every segment matches,
//! an unstable version is lower than a stable one, and two unstable versions are equal.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Qualifier marking an in-progress build.
pub const UNSTABLE_QUALIFIER: &str = "SNAPSHOT";

#[derive(Debug, Clone)]
enum Segment {
	Numeric(u64),
	Text(String),
}

impl Segment {
	fn parse(token: &str) -> Segment {
		if token.bytes().all(|b| b.is_ascii_digit()) {
			/* Digits that overflow u64 are left as text. */
			if let Ok(n) = token.parse::<u64>() {
				return Segment::Numeric(n)
			}
		}
		Segment::Text(token.to_string())
	}
}

impl Ord for Segment {
	fn cmp(&self, other: &Self) -> Ordering {
		match (self, other) {
			(Segment::Numeric(l), Segment::Numeric(r)) => l.cmp(r),
			(Segment::Text(l), Segment::Text(r)) => l.cmp(r),
			(Segment::Numeric(_), Segment::Text(_)) => Ordering::Less,
			(Segment::Text(_), Segment::Numeric(_)) => Ordering::Greater,
		}
	}
}

impl PartialOrd for Segment {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl PartialEq for Segment {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == Ordering::Equal
	}
}

impl Eq for Segment {}

/// A parsed version string.
///
/// Equality follows the ordering, not the raw text: `1.2.0-SNAPSHOT` equals `1.2.0-snapshot`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Version {
	raw: String,
	segments: Vec<Segment>,
	unstable: bool,
}

impl Version {
	pub fn parse(text: impl AsRef<str>) -> Version {
		let raw = text.as_ref().trim().to_string();
		let mut unstable = false;
		let mut segments = Vec::new();
		for token in raw.split(['.', '-', '_']).filter(|t| !t.is_empty()) {
			if token.eq_ignore_ascii_case(UNSTABLE_QUALIFIER) {
				unstable = true;
			} else {
				segments.push(Segment::parse(token));
			}
		}
		Version { raw, segments, unstable }
	}

	pub fn as_str(&self) -> &str {
		&self.raw
	}

	/// `true` for snapshot builds.
	pub fn is_unstable(&self) -> bool {
		self.unstable
	}

	pub fn higher(&self, other: &Version) -> bool {
		self > other
	}

	pub fn lower(&self, other: &Version) -> bool {
		self < other
	}
}

impl Ord for Version {
	fn cmp(&self, other: &Self) -> Ordering {
		for (l, r) in self.segments.iter().zip(&other.segments) {
			match l.cmp(r) {
				Ordering::Equal => {},
				ord => return ord,
			}
		}
		match self.segments.len().cmp(&other.segments.len()) {
			Ordering::Equal => {},
			ord => return ord,
		}
		/* Same numbers: a release supersedes its own snapshot. */
		other.unstable.cmp(&self.unstable)
	}
}

impl PartialOrd for Version {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl PartialEq for Version {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == Ordering::Equal
	}
}

impl Eq for Version {}

impl std::hash::Hash for Version {
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		for segment in &self.segments {
			match segment {
				Segment::Numeric(n) => n.hash(state),
				Segment::Text(s) => s.hash(state),
			}
		}
		self.unstable.hash(state);
	}
}

impl From<&str> for Version {
	fn from(value: &str) -> Self { Self::parse(value) }
}

impl From<String> for Version {
	fn from(value: String) -> Self { Self::parse(value) }
}

impl From<Version> for String {
	fn from(value: Version) -> Self { value.raw }
}

impl std::fmt::Display for Version {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.raw)
	}
}
