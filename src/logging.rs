// src/logging.rs
//
// Timestamped logging to stderr, mirrored into the app's log file once
// file logging has been started.

use std::path::Path;
use std::sync::Mutex;

/// Timestamped logging macro.
/// Prepends `HH:MM:SS.mmm` local time to every message written to stderr.
/// Also writes to the log file when file logging is enabled.
macro_rules! tlog {
    ($($arg:tt)*) => {{
        use std::io::Write as _;
        let msg = format!("{} {}", chrono::Local::now().format("%H:%M:%S%.3f"), format_args!($($arg)*));
        eprintln!("{}", msg);
        if let Ok(mut guard) = $crate::logging::LOG_FILE.lock() {
            if let Some(ref mut f) = *guard {
                let _ = writeln!(f, "{}", msg);
            }
        }
    }};
}

/// Log file handle. When `Some`, `tlog!` writes to both stderr and this file.
pub(crate) static LOG_FILE: Mutex<Option<std::fs::File>> = Mutex::new(None);

/// Start mirroring `tlog!` output into `minterm.log` in the given directory.
pub(crate) fn init_file_logging(logs_dir: &Path) -> Result<(), String> {
    std::fs::create_dir_all(logs_dir)
        .map_err(|e| format!("Failed to create logs dir: {}", e))?;

    let log_path = logs_dir.join("minterm.log");
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|e| format!("Failed to open log file: {}", e))?;

    if let Ok(mut guard) = LOG_FILE.lock() {
        *guard = Some(file);
    }

    tlog!("[logging] File logging started: {}", log_path.display());
    Ok(())
}
