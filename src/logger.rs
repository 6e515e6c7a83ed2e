//! Session logger: one plain-text file per run in the OS data directory.
//!
//! The file is truncated when the logger starts, so it only holds the
//! latest run.
//!
//! Log location:
//!   Windows:  `%APPDATA%\FilterFE\filterfe.log`
//!   Linux:    `~/.local/share/FilterFE/filterfe.log`
//!   macOS:    `~/Library/Application Support/FilterFE/filterfe.log`
//!
//! Use the `log_info!` / `log_warn!` / `log_err!` macros anywhere in the
//! crate; they are plain expressions, so they also work as match arms.
//! Before `init()` / `init_at()` every call is a no-op, which keeps library
//! users and tests off the filesystem.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

static SESSION: OnceLock<SessionLog> = OnceLock::new();

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
    Panic,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Panic => "PANIC",
        })
    }
}

struct SessionLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl SessionLog {
    fn create(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    fn append(&self, line: fmt::Arguments<'_>) {
        // I/O errors are dropped; a failed log line must never take the run down.
        let mut file = self.file.lock().unwrap_or_else(|p| p.into_inner());
        let _ = writeln!(file, "{}", line);
    }
}

/// The active log file, once the logger is running.
pub fn log_path() -> Option<&'static Path> {
    SESSION.get().map(|s| s.path.as_path())
}

/// Append a `[time] [LEVEL] message` line. No-op before initialisation.
pub fn write(level: Level, msg: fmt::Arguments<'_>) {
    if let Some(session) = SESSION.get() {
        session.append(format_args!("[{}] [{}] {}", clock_now(), level, msg));
    }
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Info, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Warn, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_err {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Error, format_args!($($arg)*))
    };
}

/// Start logging to `<data dir>/FilterFE/filterfe.log`.
pub fn init() {
    init_at(&data_dir().join("FilterFE").join("filterfe.log"));
}

/// Start logging to `path` (truncated), and mirror panics into it.
/// Later calls are ignored once a log file is open.
pub fn init_at(path: &Path) {
    if SESSION.get().is_some() {
        return;
    }
    let session = match SessionLog::create(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("[logger] cannot open {}: {}", path.display(), e);
            return;
        }
    };
    if SESSION.set(session).is_err() {
        return;
    }
    if let Some(session) = SESSION.get() {
        session.append(format_args!("=== FilterFE session started (unix {}) ===", unix_secs()));
        session.append(format_args!("Log file: {}", path.display()));
    }

    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        write(Level::Panic, format_args!("{}", info));
        previous(info);
    }));
}

/// Platform data directory (without the app sub-folder).
fn data_dir() -> PathBuf {
    let env_dir = |var: &str| std::env::var_os(var).map(PathBuf::from);
    let home = env_dir("HOME");

    if cfg!(target_os = "windows") {
        if let Some(appdata) = env_dir("APPDATA") {
            return appdata;
        }
    } else if cfg!(target_os = "macos") {
        if let Some(home) = &home {
            return home.join("Library").join("Application Support");
        }
    }
    env_dir("XDG_DATA_HOME")
        .or_else(|| home.map(|h| h.join(".local").join("share")))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn unix_time() -> Duration {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default()
}

fn unix_secs() -> u64 {
    unix_time().as_secs()
}

fn clock_now() -> String {
    format_clock(unix_time())
}

/// `HH:MM:SS.mmm` (UTC) within the day of `since_epoch`.
fn format_clock(since_epoch: Duration) -> String {
    let secs = since_epoch.as_secs();
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        (secs % 86_400) / 3_600,
        (secs % 3_600) / 60,
        secs % 60,
        since_epoch.subsec_millis()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(Duration::from_millis(3_723_045)), "01:02:03.045");
        // Wraps at midnight.
        assert_eq!(format_clock(Duration::from_secs(86_400 + 59)), "00:00:59.000");
    }

    #[test]
    fn test_macros_work_as_expressions() {
        let outcome: Result<u8, &str> = Err("bad");
        match outcome {
            Ok(v) => crate::log_info!("got {}", v),
            Err(e) => crate::log_warn!("failed: {}", e),
        }
        let values: Vec<u8> = (0..3)
            .inspect(|v| crate::log_err!("plain {}", v))
            .collect();
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn test_level_tags() {
        let tags: Vec<String> = [Level::Info, Level::Warn, Level::Error, Level::Panic]
            .iter()
            .map(|l| l.to_string())
            .collect();
        assert_eq!(tags, vec!["INFO", "WARN", "ERROR", "PANIC"]);
    }
}
