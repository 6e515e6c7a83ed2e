// ============================================================================
// IMAGE FILTERS — grayscale, invert, brightness
// ============================================================================
//
// Every filter is a pure function of (PixelBuffer, FilterSpec): the input is
// never touched and the output always has the input's dimensions.
// Rows are processed in parallel via rayon; there is no ordering dependency
// between pixels.
// ============================================================================

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rayon::prelude::*;

use crate::canvas::PixelBuffer;

/// Factor used by the plain `brightness` filter (no explicit value).
pub const DEFAULT_BRIGHTNESS_FACTOR: f32 = 1.5;

// ============================================================================
// FILTER SPEC
// ============================================================================

/// One fully described transform. Adding a filter means adding a variant
/// here and a case in [`apply_with_progress`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FilterSpec {
    Grayscale,
    Invert,
    /// Multiplies R, G and B by `factor` (> 0), clamped to the channel max.
    Brightness { factor: f32 },
}

impl FilterSpec {
    /// Short, stable identifier (also what [`FromStr`] accepts).
    pub fn name(&self) -> &'static str {
        match self {
            FilterSpec::Grayscale => "grayscale",
            FilterSpec::Invert => "invert",
            FilterSpec::Brightness { .. } => "brightness",
        }
    }

    /// Reject parameters the engine can't honour.
    pub fn validate(&self) -> Result<(), FilterError> {
        match *self {
            FilterSpec::Brightness { factor } if !factor.is_finite() || factor <= 0.0 => {
                Err(FilterError::InvalidSpec(format!(
                    "brightness factor must be a positive number, got {}",
                    factor
                )))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterSpec::Grayscale => write!(f, "Grayscale"),
            FilterSpec::Invert => write!(f, "Invert Colors"),
            FilterSpec::Brightness { factor } => write!(f, "Brightness x{}", factor),
        }
    }
}

impl FromStr for FilterSpec {
    type Err = FilterError;

    /// Accepts `grayscale`, `invert`, `brightness`, `brightness=2.0`
    /// (or `brightness:2.0`). Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        let (kind, arg) = match s.split_once(['=', ':']) {
            Some((k, a)) => (k.trim(), Some(a.trim())),
            None => (s.as_str(), None),
        };

        let spec = match (kind, arg) {
            ("grayscale" | "greyscale" | "gray" | "grey", None) => FilterSpec::Grayscale,
            ("invert", None) => FilterSpec::Invert,
            ("brightness", None) => FilterSpec::Brightness {
                factor: DEFAULT_BRIGHTNESS_FACTOR,
            },
            ("brightness", Some(raw)) => {
                let factor = raw.parse::<f32>().map_err(|_| {
                    FilterError::InvalidSpec(format!("invalid brightness factor '{}'", raw))
                })?;
                FilterSpec::Brightness { factor }
            }
            ("grayscale" | "greyscale" | "gray" | "grey" | "invert", Some(_)) => {
                return Err(FilterError::InvalidSpec(format!(
                    "filter '{}' takes no parameter",
                    kind
                )));
            }
            _ => {
                return Err(FilterError::InvalidSpec(format!(
                    "unrecognized filter '{}'",
                    s
                )));
            }
        };
        spec.validate()?;
        Ok(spec)
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum FilterError {
    /// Bad parameters or an unknown filter name.
    InvalidSpec(String),
    /// The transform itself failed.
    Failed(String),
    /// The progress observer asked the filter to stop.
    Interrupted,
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterError::InvalidSpec(e) => write!(f, "Invalid filter: {}", e),
            FilterError::Failed(e) => write!(f, "Filter failed: {}", e),
            FilterError::Interrupted => write!(f, "Filter interrupted"),
        }
    }
}

impl std::error::Error for FilterError {}

// ============================================================================
// ENGINE
// ============================================================================

/// Apply `spec` to `buffer` and return the result as a new buffer.
pub fn apply(buffer: &PixelBuffer, spec: &FilterSpec) -> Result<PixelBuffer, FilterError> {
    apply_with_progress(buffer, spec, &|_| true)
}

/// Like [`apply`], but `observer` is called with the fraction of rows done
/// (0..=1) as rows complete. Returning `false` stops the filter; remaining
/// rows are skipped and the call returns [`FilterError::Interrupted`].
///
/// The observer may be called from several rayon worker threads at once.
pub fn apply_with_progress(
    buffer: &PixelBuffer,
    spec: &FilterSpec,
    observer: &(dyn Fn(f32) -> bool + Sync),
) -> Result<PixelBuffer, FilterError> {
    spec.validate()?;
    match *spec {
        FilterSpec::Grayscale => apply_pixel_transform(buffer, observer, |r, g, b, a| {
            let mean = (r + g + b) / 3.0;
            (mean.round(), mean.round(), mean.round(), a)
        }),
        FilterSpec::Invert => apply_pixel_transform(buffer, observer, |r, g, b, a| {
            (255.0 - r, 255.0 - g, 255.0 - b, a)
        }),
        FilterSpec::Brightness { factor } => {
            apply_pixel_transform(buffer, observer, move |r, g, b, a| {
                (
                    (r * factor).min(255.0).floor(),
                    (g * factor).min(255.0).floor(),
                    (b * factor).min(255.0).floor(),
                    a,
                )
            })
        }
    }
}

/// Apply each filter in order, feeding every output into the next filter.
pub fn apply_sequence(buffer: &PixelBuffer, specs: &[FilterSpec]) -> Result<PixelBuffer, FilterError> {
    let mut out = buffer.clone();
    for spec in specs {
        out = apply(&out, spec)?;
    }
    Ok(out)
}

/// Per-pixel transform over the whole buffer.
/// `transform` receives (r, g, b, a) as f32 in 0..=255 and returns the same;
/// results are clamped back into the 8-bit range.
fn apply_pixel_transform<F>(
    buffer: &PixelBuffer,
    observer: &(dyn Fn(f32) -> bool + Sync),
    transform: F,
) -> Result<PixelBuffer, FilterError>
where
    F: Fn(f32, f32, f32, f32) -> (f32, f32, f32, f32) + Sync,
{
    let (w, h) = buffer.dimensions();
    let (w, h) = (w as usize, h as usize);
    let src_raw = buffer.as_raw();
    let stride = w * 4;
    let mut dst_raw = vec![0u8; stride * h];

    let rows_done = AtomicUsize::new(0);
    let stop = AtomicBool::new(false);

    dst_raw.par_chunks_mut(stride).enumerate().for_each(|(y, row_out)| {
        if stop.load(Ordering::Relaxed) {
            return;
        }
        let row_in = &src_raw[y * stride..(y + 1) * stride];
        for x in 0..w {
            let pi = x * 4;
            let r = row_in[pi] as f32;
            let g = row_in[pi + 1] as f32;
            let b = row_in[pi + 2] as f32;
            let a = row_in[pi + 3] as f32;
            let (nr, ng, nb, na) = transform(r, g, b, a);
            row_out[pi]     = nr.round().clamp(0.0, 255.0) as u8;
            row_out[pi + 1] = ng.round().clamp(0.0, 255.0) as u8;
            row_out[pi + 2] = nb.round().clamp(0.0, 255.0) as u8;
            row_out[pi + 3] = na.round().clamp(0.0, 255.0) as u8;
        }
        let done = rows_done.fetch_add(1, Ordering::Relaxed) + 1;
        if !observer(done as f32 / h as f32) {
            stop.store(true, Ordering::Relaxed);
        }
    });

    if stop.load(Ordering::Relaxed) {
        return Err(FilterError::Interrupted);
    }

    PixelBuffer::from_raw(w as u32, h as u32, dst_raw)
        .ok_or_else(|| FilterError::Failed("filter produced a buffer of the wrong size".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// 16×9 buffer with a spread of channel values and alphas.
    fn gradient() -> PixelBuffer {
        let (w, h) = (16u32, 9u32);
        let mut raw = Vec::with_capacity((w * h * 4) as usize);
        for y in 0..h {
            for x in 0..w {
                raw.push((x * 17) as u8);
                raw.push((y * 31) as u8);
                raw.push(((x * y * 7) % 256) as u8);
                raw.push((255 - x * 3) as u8);
            }
        }
        PixelBuffer::from_raw(w, h, raw).unwrap()
    }

    // ========================================================================
    // Grayscale
    // ========================================================================

    #[test]
    fn test_grayscale_equal_channels_alpha_preserved() {
        let src = gradient();
        let out = apply(&src, &FilterSpec::Grayscale).unwrap();
        assert_eq!(out.dimensions(), src.dimensions());
        for (p_in, p_out) in src.as_raw().chunks(4).zip(out.as_raw().chunks(4)) {
            assert_eq!(p_out[0], p_out[1]);
            assert_eq!(p_out[1], p_out[2]);
            assert_eq!(p_out[3], p_in[3]);
        }
    }

    #[test]
    fn test_grayscale_of_pure_red_is_one_third() {
        let red = PixelBuffer::solid(4, 4, [255, 0, 0, 255]).unwrap();
        let out = apply(&red, &FilterSpec::Grayscale).unwrap();
        assert_eq!(out.pixel(2, 3), Some([85, 85, 85, 255]));
    }

    // ========================================================================
    // Invert
    // ========================================================================

    #[test]
    fn test_invert_twice_is_identity() {
        let src = gradient();
        let once = apply(&src, &FilterSpec::Invert).unwrap();
        assert_ne!(once, src);
        let twice = apply(&once, &FilterSpec::Invert).unwrap();
        assert_eq!(twice, src);
    }

    #[test]
    fn test_invert_keeps_alpha() {
        let src = PixelBuffer::solid(2, 2, [0, 100, 255, 40]).unwrap();
        let out = apply(&src, &FilterSpec::Invert).unwrap();
        assert_eq!(out.pixel(0, 0), Some([255, 155, 0, 40]));
    }

    // ========================================================================
    // Brightness
    // ========================================================================

    #[test]
    fn test_brightness_one_is_identity() {
        let src = gradient();
        let out = apply(&src, &FilterSpec::Brightness { factor: 1.0 }).unwrap();
        assert_eq!(out, src);
    }

    #[test]
    fn test_brightness_bounded_by_factor_and_max() {
        let src = gradient();
        for factor in [0.25f32, 0.8, 1.5, 3.0] {
            let out = apply(&src, &FilterSpec::Brightness { factor }).unwrap();
            for (p_in, p_out) in src.as_raw().chunks(4).zip(out.as_raw().chunks(4)) {
                for c in 0..3 {
                    assert!(
                        p_out[c] as f32 <= p_in[c] as f32 * factor + 1e-3,
                        "factor {}: {} -> {}",
                        factor,
                        p_in[c],
                        p_out[c]
                    );
                }
                assert_eq!(p_out[3], p_in[3]);
            }
        }
    }

    #[test]
    fn test_brightness_clamps_to_max() {
        let src = PixelBuffer::solid(1, 1, [200, 100, 10, 255]).unwrap();
        let out = apply(&src, &FilterSpec::Brightness { factor: 1.5 }).unwrap();
        assert_eq!(out.pixel(0, 0), Some([255, 150, 15, 255]));
    }

    #[test]
    fn test_brightness_rejects_non_positive_factor() {
        let src = gradient();
        for factor in [0.0f32, -1.0, f32::NAN, f32::INFINITY] {
            let err = apply(&src, &FilterSpec::Brightness { factor }).unwrap_err();
            assert!(matches!(err, FilterError::InvalidSpec(_)));
        }
    }

    // ========================================================================
    // Engine behaviour
    // ========================================================================

    #[test]
    fn test_input_is_not_mutated() {
        let src = gradient();
        let snapshot = src.as_raw().to_vec();
        let _ = apply(&src, &FilterSpec::Invert).unwrap();
        assert_eq!(src.as_raw(), snapshot.as_slice());
    }

    #[test]
    fn test_progress_reaches_one() {
        let src = gradient();
        let seen = Mutex::new(Vec::new());
        apply_with_progress(&src, &FilterSpec::Grayscale, &|f| {
            seen.lock().unwrap().push(f);
            true
        })
        .unwrap();
        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.len(), src.height() as usize);
        assert!(seen.iter().all(|f| (0.0..=1.0).contains(f)));
        assert!(seen.iter().any(|f| (*f - 1.0).abs() < f32::EPSILON));
    }

    #[test]
    fn test_observer_can_interrupt() {
        let src = gradient();
        let err = apply_with_progress(&src, &FilterSpec::Invert, &|_| false).unwrap_err();
        assert_eq!(err, FilterError::Interrupted);
    }

    #[test]
    fn test_apply_sequence_composes_in_order() {
        let src = PixelBuffer::solid(2, 2, [255, 0, 0, 255]).unwrap();
        let out = apply_sequence(&src, &[FilterSpec::Grayscale, FilterSpec::Invert]).unwrap();
        assert_eq!(out.pixel(0, 0), Some([170, 170, 170, 255]));
        let same = apply_sequence(&src, &[]).unwrap();
        assert!(same.ptr_eq(&src));
    }

    // ========================================================================
    // Parsing
    // ========================================================================

    #[test]
    fn test_parse_filter_names() {
        assert_eq!("grayscale".parse::<FilterSpec>().unwrap(), FilterSpec::Grayscale);
        assert_eq!("Grey".parse::<FilterSpec>().unwrap(), FilterSpec::Grayscale);
        assert_eq!(" INVERT ".parse::<FilterSpec>().unwrap(), FilterSpec::Invert);
        assert_eq!(
            "brightness".parse::<FilterSpec>().unwrap(),
            FilterSpec::Brightness { factor: DEFAULT_BRIGHTNESS_FACTOR }
        );
        assert_eq!(
            "brightness=2".parse::<FilterSpec>().unwrap(),
            FilterSpec::Brightness { factor: 2.0 }
        );
        assert_eq!(
            "brightness:0.5".parse::<FilterSpec>().unwrap(),
            FilterSpec::Brightness { factor: 0.5 }
        );
    }

    #[test]
    fn test_parse_rejects_unknown_and_bad_params() {
        for bad in ["sepia", "", "brightness=abc", "brightness=0", "brightness=-2", "invert=3"] {
            assert!(
                matches!(bad.parse::<FilterSpec>(), Err(FilterError::InvalidSpec(_))),
                "'{}' should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_display_names() {
        assert_eq!(FilterSpec::Grayscale.to_string(), "Grayscale");
        assert_eq!(FilterSpec::Invert.to_string(), "Invert Colors");
        assert_eq!(FilterSpec::Brightness { factor: 1.5 }.to_string(), "Brightness x1.5");
    }
}
