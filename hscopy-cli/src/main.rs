use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use hscopy::snapping::{SnapConfig, DEFAULT_DIVISORS, DEFAULT_TOLERANCE};
use hscopy::{merge_files, transplant_with, TransplantOptions};
use tracing_subscriber::EnvFilter;

/// Copy the hitsounds of one osu! beatmap onto another, by musical position.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(help = "Beatmap to take the hitsounds from.")]
    from: PathBuf,

    #[arg(help = "Beatmap to write the hitsounds to.")]
    to: PathBuf,

    #[arg(long, help = "Don't copy the destination to <TO>.bak before overwriting it.")]
    no_backup: bool,

    #[arg(
        long,
        value_name = "MS",
        default_value_t = DEFAULT_TOLERANCE,
        help = "Maximum distance in milliseconds between a hit object and its snapped position."
    )]
    tolerance: f64,

    #[arg(
        long,
        value_name = "LIST",
        value_delimiter = ',',
        help = "Snap divisors to try, separated by commas (defaults to 1,2,3,4,6,8,12,16)."
    )]
    divisors: Vec<u32>,

    #[arg(long, help = "Write the resulting beatmap to stdout instead of overwriting <TO>.")]
    dry_run: bool,

    #[arg(short, long, action = clap::ArgAction::Count, help = "Log more (-v for debug, -vv for trace).")]
    verbose: u8,
}

impl Cli {
    fn snap_config(&self) -> SnapConfig {
        if self.divisors.is_empty() {
            SnapConfig::new(self.tolerance, DEFAULT_DIVISORS)
        } else {
            SnapConfig::new(self.tolerance, self.divisors.iter().copied())
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let snap = cli.snap_config();

    if cli.dry_run {
        tracing::info!("Merging {} into {} (dry run)...", cli.from.display(), cli.to.display());
        let merged = match merge_files(&cli.from, &cli.to, &snap) {
            Ok(merged) => merged,
            Err(err) => {
                tracing::error!("\n{err:?}");
                return ExitCode::FAILURE;
            }
        };

        if let Err(err) = io::stdout().lock().write_all(&merged.bytes) {
            tracing::error!("Could not write to stdout: {err}");
            return ExitCode::FAILURE;
        }

        return ExitCode::SUCCESS;
    }

    tracing::info!("Copying hitsounds from {} to {}...", cli.from.display(), cli.to.display());
    let options = TransplantOptions {
        backup: !cli.no_backup,
        snap,
    };

    match transplant_with(&cli.from, &cli.to, &options) {
        Ok(stats) => {
            tracing::info!(
                "Done: {} hit objects updated, {} without a match",
                stats.matched,
                stats.unmatched
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!("\n{err:?}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};
    use hscopy::snapping::{DEFAULT_DIVISORS, DEFAULT_TOLERANCE};

    use crate::Cli;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["hscopy", "a.osu", "b.osu"]).unwrap();
        assert!(!cli.no_backup);
        assert!(!cli.dry_run);

        let config = cli.snap_config();
        assert_eq!(config.tolerance(), DEFAULT_TOLERANCE);
        assert_eq!(config.divisors(), &DEFAULT_DIVISORS);
    }

    #[test]
    fn custom_snapping() {
        let cli = Cli::try_parse_from([
            "hscopy",
            "a.osu",
            "b.osu",
            "--no-backup",
            "--tolerance",
            "5",
            "--divisors",
            "4,1,2",
            "-vv",
        ])
        .unwrap();

        assert!(cli.no_backup);
        assert_eq!(cli.verbose, 2);

        let config = cli.snap_config();
        assert_eq!(config.tolerance(), 5.);
        assert_eq!(config.divisors(), &[1, 2, 4]);
    }
}
