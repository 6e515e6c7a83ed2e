// ============================================================================
// SETTINGS — key=value configuration file
// ============================================================================

use std::path::{Path, PathBuf};

use crate::io::{DEFAULT_FILTERED_SUFFIX, default_output_dir};
use crate::ops::filters::DEFAULT_BRIGHTNESS_FACTOR;

const SETTINGS_FILE: &str = "filterfe_settings.cfg";

/// Per-user configuration. Command-line flags override whatever is loaded.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    /// Where saved and batch-processed images go. Created on demand.
    pub output_dir: PathBuf,
    /// Inserted before the extension of saved images (`photo_filtered.png`).
    pub filtered_suffix: String,
    /// Factor used by the plain `brightness` filter.
    pub brightness_factor: f32,
    /// Background worker threads (0 = one per core, rayon's default).
    pub worker_threads: usize,
    /// Message language code ("en", "es"). Taken from the system locale
    /// when the file doesn't set one.
    pub language: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            filtered_suffix: DEFAULT_FILTERED_SUFFIX.to_string(),
            brightness_factor: DEFAULT_BRIGHTNESS_FACTOR,
            worker_threads: 0,
            language: crate::i18n::detect_system_language(),
        }
    }
}

impl Settings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/filterfe/filterfe_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\FilterFE\filterfe_settings.cfg
    /// On macOS:   ~/Library/Application Support/FilterFE/filterfe_settings.cfg
    /// Fallback:   same directory as the executable.
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
                    PathBuf::from(home).join(".config")
                })
                .join("filterfe");
            return Some(config_dir.join(SETTINGS_FILE));
        }
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA").or_else(|_| std::env::var("USERPROFILE")).ok()?;
            return Some(PathBuf::from(appdata).join("FilterFE").join(SETTINGS_FILE));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("FilterFE")
                    .join(SETTINGS_FILE),
            );
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            std::env::current_exe().ok().and_then(|p| p.parent().map(|d| d.join(SETTINGS_FILE)))
        }
    }

    /// Load settings from the default location (defaults if missing or unreadable).
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load settings from `path` (defaults if missing or unreadable).
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    /// Parse `key=value` lines. Unknown keys are ignored; malformed values
    /// keep their defaults.
    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let key = key.trim();
            let val = val.trim();
            match key {
                "output_dir" => {
                    if !val.is_empty() {
                        s.output_dir = PathBuf::from(val);
                    }
                }
                "filtered_suffix" => {
                    s.filtered_suffix = val.to_string();
                }
                "brightness_factor" => {
                    if let Ok(f) = val.parse::<f32>()
                        && f.is_finite()
                        && f > 0.0
                    {
                        s.brightness_factor = f;
                    } else {
                        crate::log_warn!("Ignoring invalid brightness_factor '{}'", val);
                    }
                }
                "worker_threads" => {
                    s.worker_threads = val.parse().unwrap_or(0);
                }
                "language" => {
                    s.language = val.to_string();
                }
                _ => {}
            }
        }
        s
    }

    pub fn to_config_string(&self) -> String {
        format!(
            "output_dir={}\n\
             filtered_suffix={}\n\
             brightness_factor={}\n\
             worker_threads={}\n\
             language={}\n",
            self.output_dir.display(),
            self.filtered_suffix,
            self.brightness_factor,
            self.worker_threads,
            self.language,
        )
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_config_string())
    }
}
