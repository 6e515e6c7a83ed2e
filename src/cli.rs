// ============================================================================
// FilterFE CLI — headless batch processing via command-line arguments
// ============================================================================
//
// Usage examples:
//   FilterFE --input photo.png --filter grayscale
//   FilterFE -i photo.jpg -f invert -f brightness=1.2 -o out.png
//   FilterFE -i "shots/*.png" -f brightness --output-dir processed/ --history
//
// Files are processed one at a time on the current thread; each filter is
// still row-parallel internally.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use crate::batch::{BatchCoordinator, BatchEvent, BatchOptions};
use crate::components::history::ProcessingHistory;
use crate::io::has_open_extension;
use crate::jobs::CancelToken;
use crate::ops::filters::{FilterError, FilterSpec};
use crate::settings::Settings;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// FilterFE headless image processor.
#[derive(Parser, Debug)]
#[command(
    name = "FilterFE",
    about = "Apply grayscale / invert / brightness filters to images",
    long_about = "Apply a sequence of color filters to one or more images and save the\n\
                  results as PNG. Filters run in the order given.\n\n\
                  Filters: grayscale, invert, brightness, brightness=<factor>\n\n\
                  Example:\n  \
                  FilterFE -i photo.png -f grayscale\n  \
                  FilterFE -i \"*.jpg\" -f invert -f brightness=1.2 --output-dir out/"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Filter to apply; repeat for a sequence (applied in order).
    #[arg(short, long = "filter", required = true, num_args = 1.., value_name = "FILTER")]
    pub filters: Vec<String>,

    /// Output file path. Only valid for single-file input.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory (default: from settings, else ~/ProcessedImages).
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Suffix inserted before the extension of each output file.
    #[arg(long, value_name = "SUFFIX")]
    pub suffix: Option<String>,

    /// Settings file to use instead of the per-user one.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write the session log here instead of the per-user data directory.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Message language (en, es).
    #[arg(long, value_name = "CODE")]
    pub lang: Option<String>,

    /// Print the processing history when done.
    #[arg(long)]
    pub history: bool,

    /// Print per-file timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = bad arguments or one or more files failed.
pub fn run(args: CliArgs) -> ExitCode {
    let mut settings = match &args.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    apply_overrides(&mut settings, &args);
    crate::i18n::set_language(&settings.language);

    // Parse every filter before touching any file
    let filters = match parse_filters(&args.filters, settings.brightness_factor) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: {}", t!("cli.no_inputs"));
        return ExitCode::FAILURE;
    }
    if inputs.len() > 1 && args.output.is_some() {
        eprintln!("error: {}", t!("cli.output_needs_single"));
        return ExitCode::FAILURE;
    }

    let mut options = BatchOptions::from_settings(&settings);
    options.explicit_output = args.output.clone();
    let coordinator = BatchCoordinator::new(options);
    let history = ProcessingHistory::new();
    let multi = inputs.len() > 1;

    let result = coordinator.run(&inputs, &filters, &CancelToken::new(), &history, |event| match event {
        BatchEvent::Started { index, total, file } => {
            if multi || args.verbose {
                println!("[{}/{}] {}", index + 1, total, file.display());
            }
        }
        BatchEvent::Finished { output, elapsed, .. } => match output {
            Ok(out) => {
                if args.verbose {
                    println!("  → {} ({:.0}ms)", out.display(), elapsed.as_secs_f64() * 1000.0);
                } else {
                    println!("  → {}", out.display());
                }
            }
            Err(e) => eprintln!("  error: {}", e),
        },
    });

    let result = match result {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if multi {
        println!(
            "{}",
            t!("cli.summary", succeeded = result.succeeded, failed = result.failed.len())
        );
    }
    if args.history {
        print_history(&history);
    }

    if result.is_complete_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

// ============================================================================
// Helpers
// ============================================================================

fn apply_overrides(settings: &mut Settings, args: &CliArgs) {
    if let Some(dir) = &args.output_dir {
        settings.output_dir = dir.clone();
    }
    if let Some(suffix) = &args.suffix {
        settings.filtered_suffix = suffix.clone();
    }
    if let Some(lang) = &args.lang {
        settings.language = lang.clone();
    }
}

/// Parse filter arguments. A bare `brightness` uses the configured factor.
fn parse_filters(raw: &[String], brightness_factor: f32) -> Result<Vec<FilterSpec>, FilterError> {
    raw.iter()
        .map(|s| {
            if s.trim().eq_ignore_ascii_case("brightness") {
                let spec = FilterSpec::Brightness { factor: brightness_factor };
                spec.validate()?;
                Ok(spec)
            } else {
                s.parse()
            }
        })
        .collect()
}

fn print_history(history: &ProcessingHistory) {
    println!("{}", t!("cli.history_header"));
    for entry in history.entries() {
        println!("  {}", entry);
    }
}

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
/// Glob matches are limited to PNG/JPEG files; literal paths are kept as given.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            // Literal path, use directly
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        // Treat as glob pattern
        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !has_open_extension(&entry) {
                        continue;
                    }
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no PNG/JPEG files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}
