use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

pub mod errors;
pub mod parsing;
pub mod serializing;

pub use errors::*;
use parsing::split_sections;
use serializing::serialize_sections;

use crate::timestamp::Timestamp;
use crate::Timestamped;

/// Sections of an `.osu` file, in the order they are written.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
	/// Lines preceding the first section header, usually just `osu file format v14`.
	Version,
	General,
	Editor,
	Metadata,
	Difficulty,
	Events,
	TimingPoints,
	Colours,
	HitObjects,
}

impl Section {
	/// Name of the section as written in its header.
	#[must_use]
	pub const fn name(self) -> &'static str {
		match self {
			Self::Version => "version",
			Self::General => "General",
			Self::Editor => "Editor",
			Self::Metadata => "Metadata",
			Self::Difficulty => "Difficulty",
			Self::Events => "Events",
			Self::TimingPoints => "TimingPoints",
			Self::Colours => "Colours",
			Self::HitObjects => "HitObjects",
		}
	}
}

impl fmt::Display for Section {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.name())
	}
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("Unknown section [{0}]")]
pub struct UnknownSectionError(pub String);

impl FromStr for Section {
	type Err = UnknownSectionError;

	/// Parses a section name, ignoring case. The version pseudo-section has no header and is never parsed.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"general" => Ok(Self::General),
			"editor" => Ok(Self::Editor),
			"metadata" => Ok(Self::Metadata),
			"difficulty" => Ok(Self::Difficulty),
			"events" => Ok(Self::Events),
			"timingpoints" => Ok(Self::TimingPoints),
			"colours" => Ok(Self::Colours),
			"hitobjects" => Ok(Self::HitObjects),
			_ => Err(UnknownSectionError(s.to_owned())),
		}
	}
}

/// Raw lines of an `.osu` file grouped by section.
///
/// Blank lines are dropped. Every other line is kept as-is, without its line terminator.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChartSections {
	pub sections: BTreeMap<Section, Vec<String>>,
}

impl ChartSections {
	#[must_use]
	pub fn parse(text: &str) -> Self {
		split_sections(text)
	}

	/// Lines of a section, or `None` if the section is absent.
	#[must_use]
	pub fn lines(&self, section: Section) -> Option<&[String]> {
		self.sections.get(&section).map(Vec::as_slice)
	}

	#[must_use]
	pub fn lines_mut(&mut self, section: Section) -> Option<&mut Vec<String>> {
		self.sections.get_mut(&section)
	}

	/// Write the sections in canonical order, with CRLF line endings.
	///
	/// # Errors
	///
	/// This function will return an error if an IO issue occured.
	pub fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
		serialize_sections(self, writer)
	}
}

/// Sample settings a timing point applies to the hit objects of its section.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SampleSettings {
	/// Default sample set for hit objects (0 = beatmap default, 1 = normal, 2 = soft, 3 = drum).
	pub sample_set: u32,
	/// Custom sample index for hit objects. `0` indicates osu!'s default hitsounds.
	pub sample_index: u32,
	/// Volume percentage for hit objects.
	pub volume: u32,
}

impl Default for SampleSettings {
	fn default() -> Self {
		Self {
			sample_set: 0,
			sample_index: 0,
			volume: 100,
		}
	}
}

/// Timing point which starts a new tempo region.
#[derive(Clone, Debug, PartialEq)]
pub struct UninheritedPoint {
	/// Always absolute.
	pub time: Timestamp,
	pub bpm: f64,
	/// Amount of beats in a measure.
	pub meter: u32,
	pub samples: SampleSettings,
	pub kiai: bool,
}

/// Timing point which only changes samples or slider velocity.
#[derive(Clone, Debug, PartialEq)]
pub struct InheritedPoint {
	/// Index of the governing uninherited point within its [`TimingPoints`].
	pub parent: usize,
	/// Relative to the governing uninherited point.
	pub time: Timestamp,
	pub sv_multiplier: f64,
	pub samples: SampleSettings,
	pub kiai: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TimingPoint {
	Uninherited(UninheritedPoint),
	Inherited(InheritedPoint),
}

impl TimingPoint {
	#[must_use]
	pub const fn time(&self) -> &Timestamp {
		match self {
			Self::Uninherited(point) => &point.time,
			Self::Inherited(point) => &point.time,
		}
	}

	#[must_use]
	pub const fn samples(&self) -> SampleSettings {
		match self {
			Self::Uninherited(point) => point.samples,
			Self::Inherited(point) => point.samples,
		}
	}

	#[must_use]
	pub const fn kiai(&self) -> bool {
		match self {
			Self::Uninherited(point) => point.kiai,
			Self::Inherited(point) => point.kiai,
		}
	}

	#[must_use]
	pub const fn is_uninherited(&self) -> bool {
		matches!(self, Self::Uninherited(_))
	}
}

impl Timestamped for TimingPoint {
	fn millis(&self) -> i64 {
		self.time().millis()
	}
}

impl Timestamped for UninheritedPoint {
	fn millis(&self) -> i64 {
		self.time.millis()
	}
}

/// Timing points of a chart, sorted by time. The first one is always uninherited.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimingPoints {
	pub(crate) points: Vec<TimingPoint>,
}

impl TimingPoints {
	#[must_use]
	pub fn as_slice(&self) -> &[TimingPoint] {
		&self.points
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.points.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.points.is_empty()
	}

	/// The uninherited timing point that defines the tempo of the given point.
	#[must_use]
	pub fn governing<'a>(&'a self, point: &'a TimingPoint) -> Option<&'a UninheritedPoint> {
		match point {
			TimingPoint::Uninherited(point) => Some(point),
			TimingPoint::Inherited(point) => match self.points.get(point.parent) {
				Some(TimingPoint::Uninherited(parent)) => Some(parent),
				_ => None,
			},
		}
	}

	/// Tempo in effect at the given point.
	#[must_use]
	pub fn bpm(&self, point: &TimingPoint) -> Option<f64> {
		self.governing(point).map(|parent| parent.bpm)
	}

	/// Meter in effect at the given point.
	#[must_use]
	pub fn meter(&self, point: &TimingPoint) -> Option<u32> {
		self.governing(point).map(|parent| parent.meter)
	}

	/// Uninherited timing points only, in ascending time.
	pub fn uninherited(&self) -> impl Iterator<Item = &UninheritedPoint> {
		self.points.iter().filter_map(|point| match point {
			TimingPoint::Uninherited(point) => Some(point),
			TimingPoint::Inherited(_) => None,
		})
	}
}

/// Kind of a hit object, as far as hitsounds are concerned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HitObjectKind {
	HitCircle,
	Slider,
	/// Hitsounds of spinners play when they end.
	Spinner { end_time: i64 },
}

/// The fields of a hit object line that hitsound copying cares about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HitObjectRecord {
	/// Time when the object is to be hit, in milliseconds from the beginning of the beatmap's audio.
	pub time: i64,
	/// Raw bit flags indicating the type of the object.
	pub raw_type: u32,
	/// `None` if the type is none of hit circle, slider or spinner.
	pub kind: Option<HitObjectKind>,
	/// Bit flags indicating the hitsound applied to the object.
	pub additions: u32,
}

impl HitObjectRecord {
	/// Position of the bit that signifies whether a hit object is a hit circle in its `type` bit flags.
	pub const RAW_TYPE_HIT_CIRCLE: u32 = 0;
	/// Position of the bit that signifies whether a hit object is a slider in its `type` bit flags.
	pub const RAW_TYPE_SLIDER: u32 = 1;
	/// Position of the bit that signifies whether a hit object is a spinner in its `type` bit flags.
	pub const RAW_TYPE_SPINNER: u32 = 3;

	/// Index of the `hitSound` field in a hit object line.
	pub const ADDITIONS_FIELD: usize = 4;

	const fn raw_is_base_type(raw_object_type: u32, base_type: u32) -> bool {
		raw_object_type & (1 << base_type) > 0
	}

	#[must_use]
	pub const fn raw_is_hit_circle(raw_object_type: u32) -> bool {
		Self::raw_is_base_type(raw_object_type, Self::RAW_TYPE_HIT_CIRCLE)
	}

	#[must_use]
	pub const fn raw_is_slider(raw_object_type: u32) -> bool {
		Self::raw_is_base_type(raw_object_type, Self::RAW_TYPE_SLIDER)
	}

	#[must_use]
	pub const fn raw_is_spinner(raw_object_type: u32) -> bool {
		Self::raw_is_base_type(raw_object_type, Self::RAW_TYPE_SPINNER)
	}

	/// Time at which the hitsound of this object plays. Spinners use their end time.
	#[must_use]
	pub const fn hitsound_time(&self) -> Option<i64> {
		match self.kind {
			Some(HitObjectKind::HitCircle | HitObjectKind::Slider) => Some(self.time),
			Some(HitObjectKind::Spinner { end_time }) => Some(end_time),
			None => None,
		}
	}
}
