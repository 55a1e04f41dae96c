use std::collections::HashMap;

use crate::file::chart::parsing::{is_record_line, parse_hit_object, parse_timing_points};
use crate::file::chart::{section_err, ChartError, ChartSections, HitObjectRecord, Section, TimingPoints};
use crate::snapping::SnapConfig;
use crate::timestamp::Timestamp;
use crate::Timestamped;

const SECTION_HIT_OBJECTS: &str = "HitObjects";

/// The hitsound of a hit object, placed on the timing grid of its chart.
#[derive(Clone, Debug, PartialEq)]
pub struct Hitsound {
	/// Relative to the uninherited timing point governing it, once collected.
	pub timestamp: Timestamp,
	/// Bit flags indicating the hitsound applied to the object.
	pub additions: u32,
}

impl Hitsound {
	#[must_use]
	pub fn signature(&self) -> String {
		self.timestamp.signature()
	}
}

impl Timestamped for Hitsound {
	fn millis(&self) -> i64 {
		self.timestamp.millis()
	}
}

/// Every hitsound of a chart, indexed by signature.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HitsoundData {
	pub timing_points: TimingPoints,
	pub hitsounds: HashMap<String, Hitsound>,
}

impl HitsoundData {
	#[must_use]
	pub fn get(&self, signature: &str) -> Option<&Hitsound> {
		self.hitsounds.get(signature)
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.hitsounds.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.hitsounds.is_empty()
	}
}

/// A hit object line whose hitsound got resolved onto the timing grid.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedHitObject {
	/// Index of the line within the `[HitObjects]` section.
	pub line_index: usize,
	pub record: HitObjectRecord,
	pub hitsound: Hitsound,
}

/// Hit objects of a chart, in ascending hitsound time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResolvedHitObjects {
	pub objects: Vec<ResolvedHitObject>,
	/// Amount of record lines that are neither hit circles, sliders nor spinners.
	pub skipped: usize,
}

/// Resolve the hitsound of every hit object line onto the grid of its governing uninherited timing point.
///
/// # Errors
///
/// Fails on the first line that can't be parsed, or whose hitsound can't be snapped.
pub fn resolve_hit_objects(
	lines: &[String],
	timing_points: &TimingPoints,
	config: &SnapConfig,
) -> Result<ResolvedHitObjects, ChartError> {
	let mut resolved = ResolvedHitObjects::default();

	for (line_index, line) in lines.iter().enumerate() {
		let line = line.trim();
		if !is_record_line(line) {
			continue;
		}

		let record = parse_hit_object(line).map_err(section_err(SECTION_HIT_OBJECTS, line))?;
		let Some(time) = record.hitsound_time() else {
			tracing::warn!("Skipping hit object {line:?} of unsupported type {}", record.raw_type);
			resolved.skipped += 1;
			continue;
		};

		resolved.objects.push(ResolvedHitObject {
			line_index,
			record,
			hitsound: Hitsound {
				timestamp: Timestamp::Absolute(time),
				additions: record.additions,
			},
		});
	}

	resolved.objects.sort_by_key(|object| object.hitsound.millis());

	let uninherited: Vec<_> = timing_points.uninherited().collect();
	if uninherited.is_empty() {
		return Err(ChartError::NoTimingPoints);
	}

	// Single pass: both sequences are sorted.
	let mut cursor = 0;
	for object in &mut resolved.objects {
		let time = object.hitsound.millis();
		while cursor + 1 < uninherited.len() && uninherited[cursor + 1].millis() <= time {
			cursor += 1;
		}

		let anchor = uninherited[cursor];
		object.hitsound.timestamp = (object.hitsound.timestamp)
			.to_relative(&anchor.time, anchor.bpm, anchor.meter, config)
			.map_err(section_err(SECTION_HIT_OBJECTS, lines[object.line_index].trim()))?;
	}

	Ok(resolved)
}

/// Collect the hitsounds of a chart.
///
/// Hitsounds landing on the same signature are deduplicated, the last one in time wins.
///
/// # Errors
///
/// Fails if the timing points or any hit object can't be parsed, or if a hitsound can't be snapped.
pub fn collect_hitsounds(chart: &ChartSections, config: &SnapConfig) -> Result<HitsoundData, ChartError> {
	let timing_points = parse_timing_points(chart.lines(Section::TimingPoints).unwrap_or_default(), config)?;
	let resolved = resolve_hit_objects(
		chart.lines(Section::HitObjects).unwrap_or_default(),
		&timing_points,
		config,
	)?;

	let mut hitsounds = HashMap::with_capacity(resolved.objects.len());
	for ResolvedHitObject { hitsound, .. } in resolved.objects {
		let signature = hitsound.signature();
		tracing::debug!("{signature} -> {}", hitsound.additions);
		hitsounds.insert(signature, hitsound);
	}

	tracing::info!(
		"Collected {} hitsounds over {} timing points ({} hit objects skipped)",
		hitsounds.len(),
		timing_points.len(),
		resolved.skipped,
	);

	Ok(HitsoundData {
		timing_points,
		hitsounds,
	})
}
