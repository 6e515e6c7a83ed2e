// ============================================================================
// BATCH PROCESSING — one filter sequence over many files
// ============================================================================
//
// Files are processed one after another: decode → filters in order → PNG
// encode + write. A file that fails is recorded and the run moves on; the
// only thing that stops a run early is cancellation, which is checked
// before each file starts (the file in progress always completes).
// ============================================================================

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::components::history::ProcessingHistory;
use crate::io::{DEFAULT_FILTERED_SUFFIX, decode_image, display_name, filtered_output_path, save_png};
use crate::jobs::{CancelToken, JobError};
use crate::ops::filters::{FilterSpec, apply_sequence};
use crate::settings::Settings;

/// Where batch outputs go.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchOptions {
    pub output_dir: PathBuf,
    /// Inserted before each output's extension.
    pub suffix: String,
    /// Exact destination; honoured only when the batch has a single file.
    pub explicit_output: Option<PathBuf>,
}

impl BatchOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            suffix: DEFAULT_FILTERED_SUFFIX.to_string(),
            explicit_output: None,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            output_dir: settings.output_dir.clone(),
            suffix: settings.filtered_suffix.clone(),
            explicit_output: None,
        }
    }

    /// Output path for `input` in a batch of `total` files.
    pub fn output_path_for(&self, input: &Path, total: usize) -> PathBuf {
        match &self.explicit_output {
            Some(out) if total == 1 => out.clone(),
            _ => filtered_output_path(&self.output_dir, &display_name(input), &self.suffix),
        }
    }
}

/// Shared `completed / total` counter of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
}

impl BatchProgress {
    /// Completed share in [0, 1]; an empty batch counts as done.
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f32 / self.total as f32
        }
    }
}

impl fmt::Display for BatchProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.completed, self.total)
    }
}

/// Per-file notifications emitted while a batch runs.
#[derive(Debug)]
pub enum BatchEvent<'a> {
    /// `index` is 0-based.
    Started { index: usize, total: usize, file: &'a Path },
    Finished {
        progress: BatchProgress,
        file: &'a Path,
        output: Result<&'a Path, &'a JobError>,
        elapsed: Duration,
    },
}

#[derive(Debug)]
pub struct BatchFailure {
    pub file: PathBuf,
    pub error: JobError,
}

#[derive(Debug, Default)]
pub struct BatchResult {
    pub succeeded: usize,
    pub failed: Vec<BatchFailure>,
    /// Files written, in processing order.
    pub outputs: Vec<PathBuf>,
    /// The run stopped early; files not reached are in neither list.
    pub cancelled: bool,
}

impl BatchResult {
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty() && !self.cancelled
    }

    pub fn processed(&self) -> usize {
        self.succeeded + self.failed.len()
    }
}

pub struct BatchCoordinator {
    options: BatchOptions,
}

impl BatchCoordinator {
    pub fn new(options: BatchOptions) -> Self {
        Self { options }
    }

    /// Process every file in `files` with `filters`.
    ///
    /// Errors only for problems that affect the whole run (an invalid filter
    /// or an output directory that can't be created); per-file failures end
    /// up in [`BatchResult::failed`].
    pub fn run(
        &self,
        files: &[PathBuf],
        filters: &[FilterSpec],
        cancel: &CancelToken,
        history: &ProcessingHistory,
        mut on_progress: impl FnMut(BatchEvent<'_>),
    ) -> Result<BatchResult, JobError> {
        for spec in filters {
            spec.validate()?;
        }
        let total = files.len();
        let single_explicit = total == 1 && self.options.explicit_output.is_some();
        if total > 0 && !single_explicit {
            std::fs::create_dir_all(&self.options.output_dir)
                .map_err(|e| JobError::Image(e.into()))?;
        }

        crate::log_info!(
            "Batch started: {} file(s), filters [{}]",
            total,
            filters.iter().map(|f| f.to_string()).collect::<Vec<_>>().join(", ")
        );

        let mut result = BatchResult::default();
        let mut progress = BatchProgress { completed: 0, total };
        // Same-named inputs from different folders must not share an output.
        let mut written: HashSet<PathBuf> = HashSet::new();

        for (index, input) in files.iter().enumerate() {
            if cancel.is_cancelled() {
                crate::log_warn!("Batch cancelled after {} of {} file(s)", progress.completed, total);
                result.cancelled = true;
                break;
            }
            on_progress(BatchEvent::Started { index, total, file: input });

            let file_start = Instant::now();
            let output = unclaimed_path(self.options.output_path_for(input, total), &written);
            let outcome = self.run_one(input, &output, filters);
            progress.completed += 1;

            match &outcome {
                Ok(()) => {
                    let image_name = display_name(input);
                    for spec in filters {
                        history.add_entry(image_name.clone(), spec.to_string());
                    }
                    crate::log_info!("Batch: {} → {}", input.display(), output.display());
                }
                Err(e) => crate::log_warn!("Batch: {} failed: {}", input.display(), e),
            }

            on_progress(BatchEvent::Finished {
                progress,
                file: input,
                output: outcome.as_ref().map(|_| output.as_path()),
                elapsed: file_start.elapsed(),
            });

            match outcome {
                Ok(()) => {
                    result.succeeded += 1;
                    written.insert(output.clone());
                    result.outputs.push(output);
                }
                Err(error) => result.failed.push(BatchFailure {
                    file: input.clone(),
                    error,
                }),
            }
        }

        crate::log_info!(
            "Batch finished: {} succeeded, {} failed{}",
            result.succeeded,
            result.failed.len(),
            if result.cancelled { " (cancelled)" } else { "" }
        );
        Ok(result)
    }

    fn run_one(&self, input: &Path, output: &Path, filters: &[FilterSpec]) -> Result<(), JobError> {
        // -- Step 1: Load ----------------------------------------------------
        let buffer = decode_image(input)?;

        // -- Step 2: Filters -------------------------------------------------
        let filtered = apply_sequence(&buffer, filters)?;

        // -- Step 3: Save ----------------------------------------------------
        save_png(&filtered, output)?;
        Ok(())
    }
}

/// `path`, or `<stem>_2.<ext>`, `<stem>_3.<ext>`, ... when an earlier file
/// of the same run already wrote it.
fn unclaimed_path(path: PathBuf, written: &HashSet<PathBuf>) -> PathBuf {
    if !written.contains(&path) {
        return path;
    }
    let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (2u32..)
        .map(|n| parent.join(format!("{}_{}{}", stem, n, ext)))
        .find(|candidate| !written.contains(candidate))
        .unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::PixelBuffer;
    use crate::io::ImageIoError;
    use crate::ops::filters::FilterError;
    use tempfile::tempdir;

    fn write_png(dir: &Path, name: &str, color: [u8; 4]) -> PathBuf {
        let path = dir.join(name);
        save_png(&PixelBuffer::solid(4, 4, color).unwrap(), &path).unwrap();
        path
    }

    #[test]
    fn test_one_corrupt_file_does_not_stop_the_batch() {
        let dir = tempdir().unwrap();
        let a = write_png(dir.path(), "a.png", [255, 0, 0, 255]);
        let bad = dir.path().join("bad.png");
        std::fs::write(&bad, b"not an image").unwrap();
        let c = write_png(dir.path(), "c.png", [0, 0, 255, 255]);

        let out_dir = dir.path().join("out");
        let coordinator = BatchCoordinator::new(BatchOptions::new(&out_dir));
        let history = ProcessingHistory::new();
        let files = vec![a, bad.clone(), c];

        let result = coordinator
            .run(&files, &[FilterSpec::Grayscale], &CancelToken::new(), &history, |_| {})
            .unwrap();

        assert_eq!(result.succeeded, 2);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].file, bad);
        assert!(matches!(
            result.failed[0].error,
            JobError::Image(ImageIoError::Decode { .. })
        ));
        assert!(!result.is_complete_success());

        let gray = decode_image(&out_dir.join("a_filtered.png")).unwrap();
        assert_eq!(gray.pixel(0, 0), Some([85, 85, 85, 255]));
        assert!(out_dir.join("c_filtered.png").exists());
        assert!(!out_dir.join("bad_filtered.png").exists());
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_filters_applied_in_order_and_logged_per_filter() {
        let dir = tempdir().unwrap();
        let src = write_png(dir.path(), "p.png", [100, 50, 20, 255]);
        let mut options = BatchOptions::new(dir.path());
        options.explicit_output = Some(dir.path().join("exact.png"));
        let coordinator = BatchCoordinator::new(options);
        let history = ProcessingHistory::new();

        let filters = [FilterSpec::Invert, FilterSpec::Brightness { factor: 2.0 }];
        let result = coordinator
            .run(&[src], &filters, &CancelToken::new(), &history, |_| {})
            .unwrap();

        assert!(result.is_complete_success());
        assert_eq!(result.outputs, vec![dir.path().join("exact.png")]);
        // invert → (155, 205, 235), then ×2 clamped
        let out = decode_image(&dir.path().join("exact.png")).unwrap();
        assert_eq!(out.pixel(1, 1), Some([255, 255, 255, 255]));

        let names: Vec<_> = history.entries().into_iter().map(|e| e.filter_name).collect();
        assert_eq!(names, vec!["Invert Colors", "Brightness x2"]);
    }

    #[test]
    fn test_progress_counts_every_file() {
        let dir = tempdir().unwrap();
        let files: Vec<_> = (0..3)
            .map(|i| write_png(dir.path(), &format!("f{}.png", i), [i * 40, 0, 0, 255]))
            .collect();
        let coordinator = BatchCoordinator::new(BatchOptions::new(dir.path().join("out")));

        let mut fractions = Vec::new();
        let mut started = 0;
        coordinator
            .run(&files, &[FilterSpec::Invert], &CancelToken::new(), &ProcessingHistory::new(), |ev| {
                match ev {
                    BatchEvent::Started { .. } => started += 1,
                    BatchEvent::Finished { progress, .. } => fractions.push(progress.fraction()),
                }
            })
            .unwrap();

        assert_eq!(started, 3);
        assert_eq!(fractions.len(), 3);
        assert!(fractions.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(fractions.last().copied(), Some(1.0));
    }

    #[test]
    fn test_cancel_stops_before_next_file() {
        let dir = tempdir().unwrap();
        let files: Vec<_> = (0..3)
            .map(|i| write_png(dir.path(), &format!("f{}.png", i), [0, 0, 0, 255]))
            .collect();
        let coordinator = BatchCoordinator::new(BatchOptions::new(dir.path().join("out")));
        let cancel = CancelToken::new();

        let result = coordinator
            .run(&files, &[FilterSpec::Invert], &cancel, &ProcessingHistory::new(), |ev| {
                // Cancel while the first file is in flight.
                if let BatchEvent::Started { index: 0, .. } = ev {
                    cancel.cancel();
                }
            })
            .unwrap();

        assert!(result.cancelled);
        assert_eq!(result.succeeded, 1, "the in-flight file completes");
        assert!(result.failed.is_empty());
        assert!(dir.path().join("out").join("f0_filtered.png").exists());
        assert!(!dir.path().join("out").join("f1_filtered.png").exists());
    }

    #[test]
    fn test_invalid_filter_rejects_whole_run() {
        let dir = tempdir().unwrap();
        let src = write_png(dir.path(), "p.png", [1, 2, 3, 255]);
        let coordinator = BatchCoordinator::new(BatchOptions::new(dir.path().join("out")));

        let err = coordinator
            .run(
                &[src],
                &[FilterSpec::Brightness { factor: 0.0 }],
                &CancelToken::new(),
                &ProcessingHistory::new(),
                |_| {},
            )
            .unwrap_err();
        assert!(matches!(err, JobError::Filter(FilterError::InvalidSpec(_))));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_same_file_name_in_two_folders_gets_two_outputs() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("a")).unwrap();
        std::fs::create_dir_all(dir.path().join("b")).unwrap();
        let red = write_png(&dir.path().join("a"), "photo.png", [255, 0, 0, 255]);
        let blue = write_png(&dir.path().join("b"), "photo.png", [0, 0, 255, 255]);

        let out_dir = dir.path().join("out");
        let coordinator = BatchCoordinator::new(BatchOptions::new(&out_dir));
        let result = coordinator
            .run(&[red, blue], &[FilterSpec::Invert], &CancelToken::new(), &ProcessingHistory::new(), |_| {})
            .unwrap();

        assert_eq!(result.succeeded, 2);
        assert_eq!(
            result.outputs,
            vec![out_dir.join("photo_filtered.png"), out_dir.join("photo_filtered_2.png")]
        );
        let first = decode_image(&out_dir.join("photo_filtered.png")).unwrap();
        let second = decode_image(&out_dir.join("photo_filtered_2.png")).unwrap();
        assert_eq!(first.pixel(0, 0), Some([0, 255, 255, 255]));
        assert_eq!(second.pixel(0, 0), Some([255, 255, 0, 255]));
    }

    #[test]
    fn test_unclaimed_path_numbers_clashes() {
        let mut written = HashSet::new();
        let base = PathBuf::from("out/x_filtered.png");
        assert_eq!(unclaimed_path(base.clone(), &written), base);
        written.insert(base.clone());
        written.insert(PathBuf::from("out/x_filtered_2.png"));
        assert_eq!(unclaimed_path(base, &written), PathBuf::from("out/x_filtered_3.png"));
    }

    #[test]
    fn test_empty_batch() {
        let dir = tempdir().unwrap();
        let coordinator = BatchCoordinator::new(BatchOptions::new(dir.path().join("out")));
        let result = coordinator
            .run(&[], &[FilterSpec::Grayscale], &CancelToken::new(), &ProcessingHistory::new(), |_| {})
            .unwrap();
        assert!(result.is_complete_success());
        assert_eq!(result.processed(), 0);
        assert_eq!(BatchProgress::default().fraction(), 1.0);
    }
}
