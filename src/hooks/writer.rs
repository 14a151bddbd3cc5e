//! JSONL checkpoint event log, one file per UTC day.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::NaiveDate;

use super::{CheckpointEvent, CheckpointObserver};
use crate::checkpoint::paths::ensure_writable_dir;
use crate::{AppError, Result};

/// The day file currently open for appending.
struct DayFile {
    date: NaiveDate,
    file: File,
}

/// Observer that appends every event to
/// `<log_dir>/checkpoint-events-YYYY-MM-DD.jsonl`.
///
/// The file is chosen by the event's own timestamp, so replayed or
/// backdated events land in the day they describe. Each record goes out
/// in a single write, keeping lines whole when several processes share
/// the directory.
pub struct JsonlEventWriter {
    log_dir: PathBuf,
    open: Mutex<Option<DayFile>>,
}

impl JsonlEventWriter {
    /// Writer storing day files in `log_dir`, created if missing.
    ///
    /// # Errors
    ///
    /// Returns `AppError::PermissionDenied`, `AppError::InvalidArgument` or
    /// `AppError::Io` if `log_dir` cannot be created or written.
    pub fn new(log_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&log_dir).map_err(|err| {
            AppError::from_io("cannot create event log directory", &log_dir, &err)
        })?;
        ensure_writable_dir(&log_dir, "event log")?;
        Ok(Self {
            log_dir,
            open: Mutex::new(None),
        })
    }

    /// Day file holding events of `date`.
    #[must_use]
    pub fn log_path(&self, date: NaiveDate) -> PathBuf {
        self.log_dir.join(format!("checkpoint-events-{date}.jsonl"))
    }

    fn open_day(&self, date: NaiveDate) -> Result<DayFile> {
        let path = self.log_path(date);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| AppError::from_io("cannot open event log", &path, &err))?;
        Ok(DayFile { date, file })
    }
}

impl CheckpointObserver for JsonlEventWriter {
    fn on_event(&self, event: &CheckpointEvent) -> Result<()> {
        let mut record = serde_json::to_vec(event)
            .map_err(|err| AppError::Io(format!("cannot encode checkpoint event: {err}")))?;
        record.push(b'\n');

        let date = event.timestamp.date_naive();
        let mut open = self
            .open
            .lock()
            .map_err(|_| AppError::Io("event log lock poisoned".into()))?;

        let day = match open.take() {
            Some(day) if day.date == date => day,
            _ => self.open_day(date)?,
        };
        let day = open.insert(day);

        day.file.write_all(&record).map_err(|err| {
            AppError::from_io("cannot append to event log", &self.log_path(date), &err)
        })
    }
}
