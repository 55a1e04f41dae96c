use std::num::{ParseFloatError, ParseIntError};

use crate::snapping::SnapError;

#[derive(Debug, thiserror::Error)]
#[error("Couldn't parse value of field {field:?}")]
pub struct FieldParseError {
	pub field: &'static str,
	#[source]
	pub kind: FieldParseErrorKind,
}

#[derive(Debug, thiserror::Error)]
pub enum FieldParseErrorKind {
	#[error("Field is missing")]
	Missing,

	#[error("Invalid int")]
	InvalidInt(
		#[from]
		#[source]
		ParseIntError,
	),

	#[error("Invalid float")]
	InvalidFloat(
		#[from]
		#[source]
		ParseFloatError,
	),

	#[error("Value is not finite")]
	NotFinite,

	#[error("Time {0}ms is out of range")]
	TimeOutOfRange(f64),
}

pub(crate) fn field_err<T: Into<FieldParseErrorKind>>(field: &'static str) -> impl FnOnce(T) -> FieldParseError {
	move |kind| FieldParseError {
		field,
		kind: kind.into(),
	}
}

#[derive(Debug, thiserror::Error)]
pub enum TimingPointParseError {
	#[error(transparent)]
	Field(#[from] FieldParseError),

	#[error("Beat length is equal to 0")]
	ZeroBeatLength,

	#[error("Inherited timing point is not on the grid of its uninherited timing point")]
	Snap(
		#[from]
		#[source]
		SnapError,
	),
}

#[derive(Debug, thiserror::Error)]
pub enum HitObjectParseError {
	#[error(transparent)]
	Field(#[from] FieldParseError),
}

#[derive(Debug, thiserror::Error)]
#[error("Couldn't process section [{section}] at line {line:?}")]
pub struct SectionParseError {
	pub section: &'static str,
	pub line: String,
	#[source]
	pub kind: SectionParseErrorKind,
}

#[derive(Debug, thiserror::Error)]
pub enum SectionParseErrorKind {
	#[error("Could not parse timing point")]
	TimingPointParse(
		#[from]
		#[source]
		TimingPointParseError,
	),

	#[error("Could not parse hit object")]
	HitObjectParse(
		#[from]
		#[source]
		HitObjectParseError,
	),

	#[error("Hit object is not on the grid of its timing section")]
	Snap(
		#[from]
		#[source]
		SnapError,
	),
}

pub(crate) fn section_err<'a, T: Into<SectionParseErrorKind>>(
	section: &'static str,
	line: &'a str,
) -> impl FnOnce(T) -> SectionParseError + 'a {
	move |kind| SectionParseError {
		section,
		line: line.to_owned(),
		kind: kind.into(),
	}
}

/// Anything that prevents a chart's hitsounds from being resolved.
#[derive(Debug, thiserror::Error)]
pub enum ChartError {
	#[error("Chart has no timing points")]
	NoTimingPoints,

	#[error("First timing point {line:?} is inherited, there is no tempo to inherit from")]
	MissingRootTimingPoint { line: String },

	#[error(transparent)]
	Section(#[from] SectionParseError),
}

impl ChartError {
	/// The error at the root of this one, if it is a snapping error.
	#[must_use]
	pub fn snap_error(&self) -> Option<&SnapError> {
		match self {
			Self::Section(SectionParseError {
				kind: SectionParseErrorKind::Snap(err),
				..
			})
			| Self::Section(SectionParseError {
				kind: SectionParseErrorKind::TimingPointParse(TimingPointParseError::Snap(err)),
				..
			}) => Some(err),
			_ => None,
		}
	}
}
