#[macro_use]
pub mod utils;

pub mod algos;
pub mod file;
pub mod hitsounds;
pub mod snapping;
pub mod timestamp;
pub mod transplant;

pub use transplant::{
    backup_path, merge_charts, merge_files, transplant, transplant_with, MergedChart, TransplantError,
    TransplantOptions, BACKUP_SUFFIX,
};

/// Anything that sits at a point in time of a chart.
pub trait Timestamped {
    /// Absolute time in milliseconds.
    fn millis(&self) -> i64;
}
