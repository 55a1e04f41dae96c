use std::fmt;

use crate::snapping::{SnapConfig, SnapError};

/// Position of a beat inside the rhythmic grid of a timing section.
///
/// The fraction `num / denom` is never reduced, and `num` may reach up to `2 * denom - 1`
/// when the closest grid line lies in the next measure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BeatPosition {
	/// Whole measures elapsed since the anchor. Negative for times before the anchor.
	pub measures: i64,
	/// Numerator of the position within the measure.
	pub num: u32,
	/// Snap divisor the position was found with.
	pub denom: u32,
}

/// Duration of one measure, in milliseconds.
#[must_use]
pub fn ms_per_measure(bpm: f64, meter: u32) -> f64 {
	60_000. / bpm * f64::from(meter)
}

/// A point in time expressed relatively to a tempo anchor.
#[derive(Clone, Debug, PartialEq)]
pub struct RelativeTimestamp {
	/// Timestamp the beat position is counted from.
	pub anchor: Box<Timestamp>,
	/// Tempo of the grid, in beats per minute.
	pub bpm: f64,
	/// Amount of beats in a measure.
	pub meter: u32,
	/// Position on the grid.
	pub position: BeatPosition,
}

impl RelativeTimestamp {
	#[must_use]
	pub fn millis(&self) -> i64 {
		let measure = ms_per_measure(self.bpm, self.meter);
		let BeatPosition { measures, num, denom } = self.position;

		let measure_offset = measure * measures as f64;
		let remaining_offset = measure * f64::from(num) / f64::from(denom);
		(self.anchor.millis() as f64 + measure_offset + remaining_offset).round() as i64
	}
}

/// A point in time within a chart.
#[derive(Clone, Debug, PartialEq)]
pub enum Timestamp {
	/// Milliseconds from the beginning of the chart's audio.
	Absolute(i64),
	/// Musical address resolved against an anchor.
	Relative(RelativeTimestamp),
}

impl Timestamp {
	/// Absolute time in milliseconds, rounded to the nearest millisecond for relative timestamps.
	#[must_use]
	pub fn millis(&self) -> i64 {
		match self {
			Self::Absolute(ms) => *ms,
			Self::Relative(relative) => relative.millis(),
		}
	}

	/// Converts this timestamp into an address on the grid defined by `anchor`, `bpm` and `meter`.
	///
	/// # Errors
	///
	/// Fails if no snap divisor of `config` puts a grid line close enough to this timestamp.
	pub fn to_relative(&self, anchor: &Self, bpm: f64, meter: u32, config: &SnapConfig) -> Result<Self, SnapError> {
		let position = config.snap(self.millis(), anchor.millis(), bpm, meter)?;

		Ok(Self::Relative(RelativeTimestamp {
			anchor: Box::new(anchor.clone()),
			bpm,
			meter,
			position,
		}))
	}

	/// Identity of this timestamp which doesn't depend on its absolute time.
	///
	/// Two timestamps with the same chain of anchors and the same beat position
	/// share the same signature.
	#[must_use]
	pub fn signature(&self) -> String {
		SignatureView(self).to_string()
	}
}

/// Writes the signature of a timestamp, recursing through its anchors.
pub struct SignatureView<'a>(pub &'a Timestamp);

impl fmt::Display for SignatureView<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.0 {
			Timestamp::Absolute(ms) => write!(f, "a:{ms}"),
			Timestamp::Relative(relative) => {
				let RelativeTimestamp {
					anchor,
					bpm,
					meter,
					position: BeatPosition { measures, num, denom },
				} = relative;

				write!(
					f,
					"r:({}):{bpm:.6}:{meter}:{measures}:{num}:{denom}",
					SignatureView(anchor)
				)
			}
		}
	}
}
