use std::num::ParseIntError;
use std::str::FromStr;

use super::{
	field_err, section_err, ChartError, ChartSections, FieldParseError, FieldParseErrorKind, HitObjectKind,
	HitObjectParseError, HitObjectRecord, InheritedPoint, SampleSettings, Section, TimingPoint, TimingPointParseError,
	TimingPoints, UninheritedPoint,
};
use crate::snapping::SnapConfig;
use crate::timestamp::Timestamp;

const SECTION_TIMING_POINTS: &str = "TimingPoints";

/// Largest time in milliseconds a record can have. Every time in this range is exact as an `f64`.
pub const MAX_TIME: i64 = 1 << 53;

/// Meter used when a timing point has a non-positive one.
const FALLBACK_METER: u32 = 4;

/// Name of a section header line such as `[General]`.
fn section_header(line: &str) -> Option<&str> {
	let name = line.strip_prefix('[')?.strip_suffix(']')?;
	(!name.is_empty() && name.chars().all(|c| c.is_ascii_alphabetic())).then_some(name)
}

/// Whether a trimmed line holds a record, as opposed to being blank or a comment.
pub(crate) fn is_record_line(line: &str) -> bool {
	!line.is_empty() && !line.starts_with("//")
}

/// Split an `.osu` file into its sections.
///
/// Lines of unknown sections are dropped.
pub(crate) fn split_sections(text: &str) -> ChartSections {
	let mut chart = ChartSections::default();

	// `None` while inside an unknown section
	let mut current = Some(Section::Version);
	for line in text.lines() {
		let trimmed = line.trim();
		if trimmed.is_empty() {
			continue;
		}

		if let Some(name) = section_header(trimmed) {
			current = match name.parse::<Section>() {
				Ok(section) => {
					chart.sections.entry(section).or_default();
					Some(section)
				}
				Err(err) => {
					tracing::warn!("{err}: its lines will not be written back");
					None
				}
			};
			continue;
		}

		if let Some(section) = current {
			chart.sections.entry(section).or_default().push(line.to_owned());
		}
	}

	chart
}

fn field<'a>(values: &[&'a str], index: usize, name: &'static str) -> Result<&'a str, FieldParseError> {
	optional_field(values, index).ok_or(FieldParseError {
		field: name,
		kind: FieldParseErrorKind::Missing,
	})
}

fn optional_field<'a>(values: &[&'a str], index: usize) -> Option<&'a str> {
	values.get(index).map(|value| value.trim()).filter(|value| !value.is_empty())
}

fn parse_int<T: FromStr<Err = ParseIntError>>(value: &str, name: &'static str) -> Result<T, FieldParseError> {
	value.parse().map_err(field_err(name))
}

fn parse_float(value: &str, name: &'static str) -> Result<f64, FieldParseError> {
	let float: f64 = value.parse().map_err(field_err(name))?;
	if float.is_finite() {
		Ok(float)
	} else {
		Err(FieldParseError {
			field: name,
			kind: FieldParseErrorKind::NotFinite,
		})
	}
}

/// Times are usually integers, but some editors write decimals.
///
/// Times further than [`MAX_TIME`] from zero are rejected.
fn parse_time(value: &str, name: &'static str) -> Result<i64, FieldParseError> {
	let ms = match value.parse::<i64>() {
		Ok(ms) => ms as f64,
		Err(_) => parse_float(value, name)?.round(),
	};

	if ms.abs() > MAX_TIME as f64 {
		return Err(FieldParseError {
			field: name,
			kind: FieldParseErrorKind::TimeOutOfRange(ms),
		});
	}

	Ok(ms as i64)
}

/// The fields of a timing point line, before it is placed in the timing hierarchy.
#[derive(Clone, Debug, PartialEq)]
struct RawTimingPoint<'a> {
	line: &'a str,
	time: i64,
	beat_length: f64,
	meter: i32,
	samples: SampleSettings,
	kiai: bool,
}

fn parse_raw_timing_point(line: &str) -> Result<RawTimingPoint<'_>, FieldParseError> {
	let values: Vec<_> = line.split(',').collect();

	let time = parse_time(field(&values, 0, "time")?, "time")?;
	let beat_length = parse_float(field(&values, 1, "beatLength")?, "beatLength")?;
	let meter = parse_int(field(&values, 2, "meter")?, "meter")?;

	let mut samples = SampleSettings::default();
	if let Some(sample_set) = optional_field(&values, 3) {
		samples.sample_set = parse_int(sample_set, "sampleSet")?;
	}
	if let Some(sample_index) = optional_field(&values, 4) {
		samples.sample_index = parse_int(sample_index, "sampleIndex")?;
	}
	if let Some(volume) = optional_field(&values, 5) {
		samples.volume = parse_int(volume, "volume")?;
	}

	// Field 6 says whether the point is uninherited, but the sign of the beat length is what osu! goes by.
	let mut kiai = false;
	if let Some(effects) = optional_field(&values, 7) {
		kiai = parse_int::<u32>(effects, "effects")? & 1 == 1;
	}

	Ok(RawTimingPoint {
		line,
		time,
		beat_length,
		meter,
		samples,
		kiai,
	})
}

/// Uninherited timing point that inherited ones get resolved against.
struct Governing {
	index: usize,
	time: Timestamp,
	bpm: f64,
	meter: u32,
}

fn resolve_timing_point(
	raw: &RawTimingPoint<'_>,
	governing: Option<&Governing>,
	config: &SnapConfig,
) -> Result<Option<TimingPoint>, TimingPointParseError> {
	let RawTimingPoint {
		line,
		time,
		beat_length,
		meter,
		samples,
		kiai,
	} = *raw;

	if beat_length == 0. {
		return Err(TimingPointParseError::ZeroBeatLength);
	}

	if beat_length > 0. {
		let meter = u32::try_from(meter).ok().filter(|&meter| meter > 0).unwrap_or_else(|| {
			tracing::warn!("Timing point {line:?} has a meter of {meter}, using {FALLBACK_METER} instead");
			FALLBACK_METER
		});

		return Ok(Some(TimingPoint::Uninherited(UninheritedPoint {
			time: Timestamp::Absolute(time),
			bpm: (60_000. / beat_length + 0.5).trunc(),
			meter,
			samples,
			kiai,
		})));
	}

	let Some(governing) = governing else {
		return Ok(None);
	};

	let time = Timestamp::Absolute(time).to_relative(&governing.time, governing.bpm, governing.meter, config)?;
	Ok(Some(TimingPoint::Inherited(InheritedPoint {
		parent: governing.index,
		time,
		sv_multiplier: (100. / beat_length).abs(),
		samples,
		kiai,
	})))
}

/// Parse the lines of a `[TimingPoints]` section into a timing hierarchy.
///
/// Timing points are sorted by time first. Each inherited timing point is snapped
/// onto the grid of the closest uninherited timing point preceding it.
///
/// # Errors
///
/// Fails if there are no timing points, if the first one is inherited,
/// or if any of them is invalid or can't be snapped.
pub fn parse_timing_points(lines: &[String], config: &SnapConfig) -> Result<TimingPoints, ChartError> {
	let mut raw_points = Vec::with_capacity(lines.len());
	for line in lines.iter().map(|line| line.trim()).filter(|line| is_record_line(line)) {
		let raw_point = parse_raw_timing_point(line)
			.map_err(TimingPointParseError::from)
			.map_err(section_err(SECTION_TIMING_POINTS, line))?;
		raw_points.push(raw_point);
	}

	// stable, so points at the same time keep their order
	raw_points.sort_by_key(|point| point.time);

	let root = raw_points.first().ok_or(ChartError::NoTimingPoints)?;
	if root.beat_length < 0. {
		return Err(ChartError::MissingRootTimingPoint {
			line: root.line.to_owned(),
		});
	}

	let mut points = Vec::with_capacity(raw_points.len());
	let mut governing: Option<Governing> = None;
	for raw_point in &raw_points {
		let point = resolve_timing_point(raw_point, governing.as_ref(), config)
			.map_err(section_err(SECTION_TIMING_POINTS, raw_point.line))?
			.ok_or_else(|| ChartError::MissingRootTimingPoint {
				line: raw_point.line.to_owned(),
			})?;

		if let TimingPoint::Uninherited(uninherited) = &point {
			governing = Some(Governing {
				index: points.len(),
				time: uninherited.time.clone(),
				bpm: uninherited.bpm,
				meter: uninherited.meter,
			});
		}

		points.push(point);
	}

	Ok(TimingPoints { points })
}

/// Parse a hit object line.
///
/// Only the time, type and hitsound fields are read, plus the end time of spinners.
/// Objects which are neither hit circles, sliders nor spinners get no kind.
///
/// # Errors
///
/// Fails if one of the fields it reads is missing or isn't a number.
pub fn parse_hit_object(line: &str) -> Result<HitObjectRecord, HitObjectParseError> {
	let values: Vec<_> = line.split(',').collect();

	let time = parse_time(field(&values, 2, "time")?, "time")?;
	let raw_type: u32 = parse_int(field(&values, 3, "type")?, "type")?;
	let additions: u32 = parse_int(
		field(&values, HitObjectRecord::ADDITIONS_FIELD, "hitSound")?,
		"hitSound",
	)?;

	let kind = if HitObjectRecord::raw_is_hit_circle(raw_type) {
		Some(HitObjectKind::HitCircle)
	} else if HitObjectRecord::raw_is_slider(raw_type) {
		Some(HitObjectKind::Slider)
	} else if HitObjectRecord::raw_is_spinner(raw_type) {
		let end_time = parse_time(field(&values, 5, "endTime")?, "endTime")?;
		Some(HitObjectKind::Spinner { end_time })
	} else {
		None
	};

	Ok(HitObjectRecord {
		time,
		raw_type,
		kind,
		additions,
	})
}

#[cfg(test)]
mod tests {
	use crate::file::chart::parsing::{parse_hit_object, parse_timing_points, section_header};
	use crate::file::chart::{
		ChartError, ChartSections, FieldParseErrorKind, HitObjectKind, HitObjectParseError, SampleSettings, Section,
		SectionParseErrorKind, TimingPoint, TimingPointParseError,
	};
	use crate::snapping::SnapConfig;
	use crate::timestamp::{BeatPosition, Timestamp};

	fn lines(lines: &[&str]) -> Vec<String> {
		lines.iter().map(|&line| line.to_owned()).collect()
	}

	#[test]
	fn section_headers() {
		assert_eq!(section_header("[General]"), Some("General"));
		assert_eq!(section_header("[hitobjects]"), Some("hitobjects"));
		assert_eq!(section_header("[]"), None);
		assert_eq!(section_header("[Hit Objects]"), None);
		assert_eq!(section_header("General"), None);
		assert_eq!(section_header("[General"), None);
	}

	#[test]
	fn split_sections() {
		let text = "\u{feff}osu file format v14\r\n\r\n[General]\r\nAudioFilename: audio.mp3\r\nMode: 0\r\n\r\n\
			[timingpoints]\r\n0,500,4,2,0,60,1,0\r\n\r\n[Fonts]\r\nsecret stuff\r\n\r\n[HitObjects]\r\n\
			256,192,500,1,2,0:0:0:0:\r\n";
		let chart = ChartSections::parse(text);

		assert_eq!(chart.lines(Section::Version), Some(&["\u{feff}osu file format v14".to_owned()][..]));
		assert_eq!(
			chart.lines(Section::General),
			Some(&lines(&["AudioFilename: audio.mp3", "Mode: 0"])[..])
		);
		assert_eq!(
			chart.lines(Section::TimingPoints),
			Some(&lines(&["0,500,4,2,0,60,1,0"])[..])
		);
		assert_eq!(
			chart.lines(Section::HitObjects),
			Some(&lines(&["256,192,500,1,2,0:0:0:0:"])[..])
		);
		assert_eq!(chart.lines(Section::Editor), None);
		assert_eq!(chart.sections.len(), 4);
	}

	#[test]
	fn empty_section_is_present() {
		let chart = ChartSections::parse("osu file format v14\n[Colours]\n\n[Events]\n");
		assert_eq!(chart.lines(Section::Colours).map(<[String]>::len), Some(0));
		assert_eq!(chart.lines(Section::Events).map(<[String]>::len), Some(0));
	}

	#[test]
	fn timing_point_hierarchy() {
		let config = SnapConfig::default();
		let timing_points = parse_timing_points(
			&lines(&[
				"1000,333.333333333333,4,2,1,70,1,0",
				"1666,-50,4,2,1,40,0,1",
				"5000,500,3,1,0,100,1,1",
				"5250,-200,3,3,0,100,0,0",
			]),
			&config,
		)
		.unwrap();

		let points = timing_points.as_slice();
		assert_eq!(points.len(), 4);

		let TimingPoint::Uninherited(root) = &points[0] else {
			panic!("root is not uninherited");
		};
		assert_eq!(root.time, Timestamp::Absolute(1000));
		assert_eq!(root.bpm, 180.);
		assert_eq!(root.meter, 4);
		assert_eq!(root.samples, SampleSettings {
			sample_set: 2,
			sample_index: 1,
			volume: 70,
		});
		assert!(!root.kiai);

		let TimingPoint::Inherited(inherited) = &points[1] else {
			panic!("second point is not inherited");
		};
		assert_eq!(inherited.parent, 0);
		assert_eq!(inherited.sv_multiplier, 2.);
		assert!(inherited.kiai);
		let Timestamp::Relative(relative) = &inherited.time else {
			panic!("inherited point has an absolute time");
		};
		assert_eq!(*relative.anchor, Timestamp::Absolute(1000));
		assert_eq!(relative.position, BeatPosition {
			measures: 0,
			num: 1,
			denom: 2,
		});
		assert_eq!(timing_points.bpm(&points[1]), Some(180.));
		assert_eq!(timing_points.meter(&points[1]), Some(4));

		let TimingPoint::Inherited(last) = &points[3] else {
			panic!("last point is not inherited");
		};
		assert_eq!(last.parent, 2);
		assert_eq!(last.sv_multiplier, 0.5);
		assert_eq!(timing_points.bpm(&points[3]), Some(120.));
		assert_eq!(timing_points.meter(&points[3]), Some(3));

		assert_eq!(timing_points.uninherited().count(), 2);
	}

	#[test]
	fn optional_fields_default() {
		let config = SnapConfig::default();
		let timing_points = parse_timing_points(&lines(&["0,500,4"]), &config).unwrap();

		let point = &timing_points.as_slice()[0];
		assert_eq!(point.samples(), SampleSettings {
			sample_set: 0,
			sample_index: 0,
			volume: 100,
		});
		assert!(!point.kiai());
	}

	#[test]
	fn timing_points_get_sorted() {
		let config = SnapConfig::default();
		let timing_points = parse_timing_points(
			&lines(&["2000,-100,4,1,0,50,0,0", "3000,400,4,1,0,50,1,0", "0,500,4,1,0,50,1,0"]),
			&config,
		)
		.unwrap();

		let times: Vec<_> = timing_points.as_slice().iter().map(|point| point.time().millis()).collect();
		assert_eq!(times, [0, 2000, 3000]);
		assert!(timing_points.as_slice()[0].is_uninherited());
	}

	#[test]
	fn comments_are_ignored() {
		let config = SnapConfig::default();
		let timing_points =
			parse_timing_points(&lines(&["// offset fix", "0,500,4,1,0,50,1,0"]), &config).unwrap();
		assert_eq!(timing_points.len(), 1);
	}

	#[test]
	fn decimal_offsets_are_rounded() {
		let config = SnapConfig::default();
		let timing_points = parse_timing_points(&lines(&["12.6,500,4"]), &config).unwrap();
		assert_eq!(timing_points.as_slice()[0].time(), &Timestamp::Absolute(13));
	}

	#[test]
	fn non_positive_meter_falls_back() {
		let config = SnapConfig::default();
		let timing_points = parse_timing_points(&lines(&["0,500,-3"]), &config).unwrap();

		let TimingPoint::Uninherited(root) = &timing_points.as_slice()[0] else {
			panic!("root is not uninherited");
		};
		assert_eq!(root.meter, 4);
	}

	#[test]
	fn no_timing_points() {
		let config = SnapConfig::default();
		assert!(matches!(parse_timing_points(&[], &config), Err(ChartError::NoTimingPoints)));
		assert!(matches!(
			parse_timing_points(&lines(&["// nothing"]), &config),
			Err(ChartError::NoTimingPoints)
		));
	}

	#[test]
	fn missing_root_timing_point() {
		let config = SnapConfig::default();
		let result = parse_timing_points(&lines(&["0,-100,4,1,0,50,0,0", "1000,500,4,1,0,50,1,0"]), &config);
		assert!(matches!(
			result,
			Err(ChartError::MissingRootTimingPoint { line }) if line == "0,-100,4,1,0,50,0,0"
		));
	}

	#[test]
	fn zero_beat_length() {
		let config = SnapConfig::default();
		let result = parse_timing_points(&lines(&["0,500,4", "1000,0,4"]), &config);

		let Err(ChartError::Section(err)) = result else {
			panic!("expected a section error");
		};
		assert_eq!(err.line, "1000,0,4");
		assert!(matches!(
			err.kind,
			SectionParseErrorKind::TimingPointParse(TimingPointParseError::ZeroBeatLength)
		));
	}

	#[test]
	fn unsnappable_inherited_point() {
		let config = SnapConfig::default();
		let result = parse_timing_points(&lines(&["0,500,4", "1040,-100,4"]), &config);

		let err = result.unwrap_err();
		assert!(err.snap_error().is_some());
	}

	#[test]
	fn invalid_field() {
		let config = SnapConfig::default();
		let result = parse_timing_points(&lines(&["0,500,four"]), &config);

		let Err(ChartError::Section(err)) = result else {
			panic!("expected a section error");
		};
		let SectionParseErrorKind::TimingPointParse(TimingPointParseError::Field(field_err)) = err.kind else {
			panic!("expected a field error");
		};
		assert_eq!(field_err.field, "meter");
		assert!(matches!(field_err.kind, FieldParseErrorKind::InvalidInt(_)));
	}

	#[test]
	fn huge_times_are_rejected() {
		let config = SnapConfig::default();
		let result = parse_timing_points(&lines(&["1e30,500,4"]), &config);

		let Err(ChartError::Section(err)) = result else {
			panic!("expected a section error");
		};
		let SectionParseErrorKind::TimingPointParse(TimingPointParseError::Field(field_err)) = err.kind else {
			panic!("expected a field error");
		};
		assert_eq!(field_err.field, "time");
		assert!(matches!(field_err.kind, FieldParseErrorKind::TimeOutOfRange(_)));

		let HitObjectParseError::Field(err) = parse_hit_object("256,192,9223372036854775807,1,2,0:0:0:0:").unwrap_err();
		assert!(matches!(err.kind, FieldParseErrorKind::TimeOutOfRange(_)));
		assert!(parse_hit_object("256,192,-9007199254740992,1,2,0:0:0:0:").is_ok());
	}

	#[test]
	fn hit_objects() {
		let circle = parse_hit_object("256,192,1500,5,2,0:0:0:0:").unwrap();
		assert_eq!(circle.time, 1500);
		assert_eq!(circle.kind, Some(HitObjectKind::HitCircle));
		assert_eq!(circle.additions, 2);

		let slider = parse_hit_object("100,100,2000,6,8,B|200:200|250:200,1,140,8|0,0:0|0:0,0:0:0:0:").unwrap();
		assert_eq!(slider.kind, Some(HitObjectKind::Slider));
		assert_eq!(slider.hitsound_time(), Some(2000));

		let spinner = parse_hit_object("256,192,3000,12,4,5000,0:0:0:0:").unwrap();
		assert_eq!(spinner.kind, Some(HitObjectKind::Spinner { end_time: 5000 }));
		assert_eq!(spinner.hitsound_time(), Some(5000));

		let hold = parse_hit_object("64,192,3000,128,0,3500:0:0:0:0:").unwrap();
		assert_eq!(hold.kind, None);
	}

	#[test]
	fn invalid_hit_objects() {
		let HitObjectParseError::Field(err) = parse_hit_object("256,192,abc,1,0").unwrap_err();
		assert_eq!(err.field, "time");

		let HitObjectParseError::Field(err) = parse_hit_object("256,192,1000,1").unwrap_err();
		assert_eq!(err.field, "hitSound");
		assert!(matches!(err.kind, FieldParseErrorKind::Missing));

		let HitObjectParseError::Field(err) = parse_hit_object("256,192,1000,12,0").unwrap_err();
		assert_eq!(err.field, "endTime");
	}
}
