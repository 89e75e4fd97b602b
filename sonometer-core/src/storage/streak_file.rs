//! File output for completed streaks and plot captures.
//!
//! Streak files hold one comma-separated row of raw intensities with no
//! header. Both streak and plot files are named from the local time as
//! `SSMMHHddmmyy` (seconds, minutes, hours, day, month, year).

use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};

use crate::models::error::SonometerError;

pub fn timestamp_tag<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%S%M%H%d%m%y").to_string()
}

pub fn streak_file_name(tag: &str) -> String {
    format!("data{}.csv", tag)
}

/// Attempts at a free name before giving up on a crowded second.
const MAX_NAME_SUFFIX: usize = 100;

pub fn plot_file_name(tag: &str, extension: &str) -> String {
    format!("sound{}.{}", tag, extension)
}

/// Write `samples` as a single CSV row followed by a line break.
pub fn write_streak_row<W: Write>(mut writer: W, samples: &[f64]) -> std::io::Result<()> {
    for (i, sample) in samples.iter().enumerate() {
        if i > 0 {
            writer.write_all(b",")?;
        }
        write!(writer, "{}", sample)?;
    }
    writer.write_all(b"\r\n")?;
    writer.flush()
}

/// Persist a completed streak into `directory`, returning the file path.
pub fn save_streak(directory: &Path, tag: &str, samples: &[f64]) -> Result<PathBuf, SonometerError> {
    fs::create_dir_all(directory)
        .map_err(|e| SonometerError::StorageError(format!("failed to create directory: {}", e)))?;

    let (path, file) = create_unique(directory, tag)?;
    write_streak_row(BufWriter::new(file), samples)
        .map_err(|e| SonometerError::StorageError(format!("write failed: {}", e)))?;

    log::info!("saved streak of {} samples to {}", samples.len(), path.display());
    Ok(path)
}

/// Create `data{tag}.csv`, or `data{tag}_N.csv` when streaks stopped within
/// the same second already took the name. Never truncates an existing file.
fn create_unique(directory: &Path, tag: &str) -> Result<(PathBuf, File), SonometerError> {
    for suffix in 0..MAX_NAME_SUFFIX {
        let name = if suffix == 0 {
            streak_file_name(tag)
        } else {
            streak_file_name(&format!("{}_{}", tag, suffix))
        };
        let path = directory.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => {
                return Err(SonometerError::StorageError(format!("failed to create file: {}", e)));
            }
        }
    }
    Err(SonometerError::StorageError(format!(
        "no free file name for data{}.csv",
        tag
    )))
}
