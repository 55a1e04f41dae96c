use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use error_stack::{IntoReport, Result, ResultExt};

use crate::algos::{apply_hitsounds, MergeStats};
use crate::file::chart::ChartSections;
use crate::hitsounds::collect_hitsounds;
use crate::snapping::SnapConfig;

/// Appended to the destination path to name its backup.
pub const BACKUP_SUFFIX: &str = ".bak";

/// Stage of a transplant that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TransplantError {
	#[error("Could not read the source chart")]
	ReadSource,
	#[error("Could not collect the hitsounds of the source chart")]
	CollectSource,
	#[error("Could not read the destination chart")]
	ReadDestination,
	#[error("Could not apply hitsounds to the destination chart")]
	MergeDestination,
	#[error("Could not back up the destination chart")]
	WriteBackup,
	#[error("Could not write the destination chart")]
	WriteDestination,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TransplantOptions {
	/// Whether to copy the destination to `<destination>.bak` before overwriting it.
	pub backup: bool,
	pub snap: SnapConfig,
}

impl Default for TransplantOptions {
	fn default() -> Self {
		Self {
			backup: true,
			snap: SnapConfig::default(),
		}
	}
}

/// A destination chart carrying the hitsounds of a source chart, ready to be written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergedChart {
	pub bytes: Vec<u8>,
	pub stats: MergeStats,
}

/// Path of the backup of a destination chart.
#[must_use]
pub fn backup_path(dest: &Path) -> PathBuf {
	let mut path = OsString::from(dest.as_os_str());
	path.push(BACKUP_SUFFIX);
	PathBuf::from(path)
}

/// Copy the hitsounds of the `source` chart text onto the `dest` chart text, in memory.
///
/// # Errors
///
/// Fails if either chart can't be parsed or if one of their hitsounds can't be snapped.
pub fn merge_charts(source: &str, dest: &str, config: &SnapConfig) -> Result<MergedChart, TransplantError> {
	let hitsounds = rctx!(
		collect_hitsounds(&ChartSections::parse(source), config),
		TransplantError::CollectSource
	)?;

	let mut chart = ChartSections::parse(dest);
	let stats = rctx!(apply_hitsounds(&hitsounds, &mut chart, config), TransplantError::MergeDestination)?;

	let mut bytes = Vec::with_capacity(dest.len());
	rctx!(chart.serialize(&mut bytes), TransplantError::MergeDestination)?;

	Ok(MergedChart { bytes, stats })
}

/// Read both charts and merge them without writing anything.
///
/// Only the timing points and hit objects of the source are used, so invalid UTF-8 in it is replaced.
/// The destination must be valid UTF-8, since its other sections are written back as they are.
///
/// # Errors
///
/// Fails if a chart can't be read, or for any reason [`merge_charts`] does.
pub fn merge_files(source: &Path, dest: &Path, config: &SnapConfig) -> Result<MergedChart, TransplantError> {
	let source_bytes = rctx!(fs::read(source), TransplantError::ReadSource)
		.attach_printable_lazy(|| format!("Path: {}", source.display()))?;
	let source_text = String::from_utf8_lossy(&source_bytes);
	let dest_text = rctx!(fs::read_to_string(dest), TransplantError::ReadDestination)
		.attach_printable_lazy(|| format!("Path: {}", dest.display()))?;

	merge_charts(&source_text, &dest_text, config)
		.attach_printable_lazy(|| format!("Source: {}", source.display()))
		.attach_printable_lazy(|| format!("Destination: {}", dest.display()))
}

/// Overwrite the hitsounds of the `dest` chart with the ones of the `source` chart.
///
/// Both charts are fully processed before anything is written.
/// The backup, if enabled, is written before the destination is touched.
///
/// # Errors
///
/// Fails if a chart can't be read or merged, or if the backup or destination can't be written.
/// Nothing is written to `dest` in any of these cases, except when writing `dest` itself fails.
pub fn transplant_with(source: &Path, dest: &Path, options: &TransplantOptions) -> Result<MergeStats, TransplantError> {
	let merged = merge_files(source, dest, &options.snap)?;

	if options.backup {
		let backup = backup_path(dest);
		rctx!(fs::copy(dest, &backup), TransplantError::WriteBackup)
			.attach_printable_lazy(|| format!("Path: {}", backup.display()))?;
		tracing::info!("Backup written to {}", backup.display());
	}

	rctx!(fs::write(dest, &merged.bytes), TransplantError::WriteDestination)
		.attach_printable_lazy(|| format!("Path: {}", dest.display()))?;
	tracing::info!("Hitsounds written to {}", dest.display());

	Ok(merged.stats)
}

/// Overwrite the hitsounds of the `dest` chart with the ones of the `source` chart, with the default snapping.
///
/// # Errors
///
/// See [`transplant_with`].
pub fn transplant(source: &Path, dest: &Path, backup: bool) -> Result<(), TransplantError> {
	let options = TransplantOptions {
		backup,
		..TransplantOptions::default()
	};

	transplant_with(source, dest, &options).map(|_| ())
}
