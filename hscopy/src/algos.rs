use crate::file::chart::parsing::parse_timing_points;
use crate::file::chart::{ChartError, ChartSections, HitObjectRecord, Section};
use crate::hitsounds::{resolve_hit_objects, HitsoundData};
use crate::snapping::SnapConfig;

/// What happened to the hit objects of a chart during a merge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Hit objects which took the hitsound of the source chart.
    pub matched: usize,
    /// Hit objects with no counterpart in the source chart. They keep their hitsound.
    pub unmatched: usize,
    /// Hit objects which are neither hit circles, sliders nor spinners.
    pub skipped: usize,
}

/// Replace the `hitSound` field of a hit object line, keeping every other field as written.
#[must_use]
pub fn with_additions(line: &str, additions: u32) -> String {
    let additions = additions.to_string();
    let mut values: Vec<&str> = line.split(',').collect();
    if let Some(value) = values.get_mut(HitObjectRecord::ADDITIONS_FIELD) {
        *value = &additions;
    }

    values.join(",")
}

/// Copy the hitsounds of `source` onto the hit objects of `chart` that land on the same signature.
///
/// Only the `hitSound` field of hit objects changes. Timing points are left untouched.
///
/// # Errors
///
/// Fails if the timing points or hit objects of `chart` can't be resolved,
/// in which case `chart` is left unmodified.
pub fn apply_hitsounds(
    source: &HitsoundData,
    chart: &mut ChartSections,
    config: &SnapConfig,
) -> Result<MergeStats, ChartError> {
    let timing_points = parse_timing_points(chart.lines(Section::TimingPoints).unwrap_or_default(), config)?;

    let Some(lines) = chart.lines_mut(Section::HitObjects) else {
        return Ok(MergeStats::default());
    };

    let resolved = resolve_hit_objects(lines, &timing_points, config)?;

    let mut stats = MergeStats {
        skipped: resolved.skipped,
        ..MergeStats::default()
    };

    for object in &resolved.objects {
        if let Some(hitsound) = source.get(&object.hitsound.signature()) {
            let line = &mut lines[object.line_index];
            *line = with_additions(line.trim(), hitsound.additions);
            stats.matched += 1;
        } else {
            stats.unmatched += 1;
        }
    }

    tracing::info!(
        "Matched {} of {} hit objects ({} skipped)",
        stats.matched,
        stats.matched + stats.unmatched,
        stats.skipped,
    );

    Ok(stats)
}
