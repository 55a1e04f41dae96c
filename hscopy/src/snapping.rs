use crate::timestamp::{ms_per_measure, BeatPosition};

/// Maximum distance in milliseconds between a timestamp and the grid line it snaps to.
pub const DEFAULT_TOLERANCE: f64 = 3.0;

/// Snap divisors offered by the osu! editor.
pub const DEFAULT_DIVISORS: [u32; 8] = [1, 2, 3, 4, 6, 8, 12, 16];

/// Largest snap divisor a [`SnapConfig`] accepts.
pub const MAX_DIVISOR: u32 = 256;

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum SnapError {
	#[error(
		"Could not find accurate snapping for {time}ms from anchor at {anchor}ms \
		(closest grid line is {delta:.3}ms away, tolerance is {tolerance}ms)"
	)]
	NoAccurateSnapping {
		time: i64,
		anchor: i64,
		delta: f64,
		tolerance: f64,
	},

	#[error("Cannot snap on a grid of {bpm} BPM with a meter of {meter}")]
	InvalidGrid { bpm: f64, meter: u32 },
}

/// Settings used to snap absolute timestamps onto a rhythmic grid.
#[derive(Clone, Debug, PartialEq)]
pub struct SnapConfig {
	tolerance: f64,
	divisors: Vec<u32>,
}

impl Default for SnapConfig {
	fn default() -> Self {
		Self {
			tolerance: DEFAULT_TOLERANCE,
			divisors: DEFAULT_DIVISORS.to_vec(),
		}
	}
}

impl SnapConfig {
	/// Creates a snapping configuration.
	///
	/// Divisors are sorted and deduplicated.
	/// Zero divisors and divisors above [`MAX_DIVISOR`] are dropped.
	#[must_use]
	pub fn new(tolerance: f64, divisors: impl IntoIterator<Item = u32>) -> Self {
		let mut divisors: Vec<u32> = divisors
			.into_iter()
			.filter(|&d| {
				let valid = (1..=MAX_DIVISOR).contains(&d);
				if !valid {
					tracing::warn!("Ignoring snap divisor {d}, it must be between 1 and {MAX_DIVISOR}");
				}
				valid
			})
			.collect();
		divisors.sort_unstable();
		divisors.dedup();

		Self { tolerance, divisors }
	}

	#[must_use]
	pub const fn tolerance(&self) -> f64 {
		self.tolerance
	}

	#[must_use]
	pub fn divisors(&self) -> &[u32] {
		&self.divisors
	}

	/// Finds the grid line closest to `target` on the grid anchored at `base`.
	///
	/// Every divisor `d` proposes the lines `i/d` and `(i+d)/d` of the current measure for each `i` in `[0, d)`.
	/// On equal distances, the smallest divisor wins, then the smallest numerator,
	/// then the line of the current measure over the one in the next measure.
	///
	/// # Errors
	///
	/// Fails if the closest grid line is further than the tolerance, or if the grid has no positive length.
	pub fn snap(&self, target: i64, base: i64, bpm: f64, meter: u32) -> Result<BeatPosition, SnapError> {
		let measure = ms_per_measure(bpm, meter);
		if !(measure.is_finite() && measure > 0.) {
			return Err(SnapError::InvalidGrid { bpm, meter });
		}

		let elapsed = target as f64 - base as f64;
		let measures = (elapsed / measure).floor();
		let offset = elapsed - measures * measure;

		let mut closest: Option<(u32, u32, f64)> = None;
		for &denom in &self.divisors {
			for i in 0..denom {
				for num in [i, i + denom] {
					let snap_at = measure * f64::from(num) / f64::from(denom);
					let delta = (offset - snap_at).abs();

					if closest.map_or(true, |(_, _, closest_delta)| delta < closest_delta) {
						closest = Some((num, denom, delta));
					}
				}
			}
		}

		match closest {
			Some((num, denom, delta)) if delta <= self.tolerance => Ok(BeatPosition {
				measures: measures as i64,
				num,
				denom,
			}),
			closest => Err(SnapError::NoAccurateSnapping {
				time: target,
				anchor: base,
				delta: closest.map_or(f64::INFINITY, |(_, _, delta)| delta),
				tolerance: self.tolerance,
			}),
		}
	}
}
