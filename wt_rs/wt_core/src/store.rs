//! CSV-backed measurement log.
//!
//! One row per entry: `DD/MM/YYYY,weight,body_fat,muscle,water`, values with two
//! decimals or `NA` when unset.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::measurement::{Field, FieldValues, Measurement};
use crate::{WtError, WtResult};

pub const DATE_FORMAT: &str = "%d/%m/%Y";
pub const UNSET_TOKEN: &str = "NA";
pub const DEFAULT_DATA_DIR: &str = ".local/share/wt";
pub const DEFAULT_HISTORY_FILE: &str = "weight_history.csv";

pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$HOME/.local/share/wt/weight_history.csv`
    pub fn default_location() -> WtResult<Self> {
        let home = std::env::var_os("HOME")
            .filter(|h| !h.is_empty())
            .ok_or(WtError::MissingHome)?;
        Ok(Self::new(
            PathBuf::from(home)
                .join(DEFAULT_DATA_DIR)
                .join(DEFAULT_HISTORY_FILE),
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the directory holding the log if it is missing.
    pub fn ensure_data_dir(&self) -> WtResult<()> {
        let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) else {
            return Ok(());
        };
        if dir.is_dir() {
            return Ok(());
        }
        create_private_dir(dir).map_err(|source| WtError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        debug!("created data directory {}", dir.display());
        Ok(())
    }

    /// Read every well-formed entry in file order.
    pub fn load(&self) -> WtResult<Vec<Measurement>> {
        let file = fs::File::open(&self.path).map_err(|source| WtError::Io {
            path: self.path.clone(),
            source,
        })?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .trim(csv::Trim::All)
            .from_reader(file);

        let mut history = Vec::new();
        for row in reader.byte_records() {
            let row = match row {
                Ok(row) => row,
                Err(err) if err.is_io_error() => return Err(err.into()),
                Err(err) => {
                    warn!("{}: skipping unreadable line ({})", self.path.display(), err);
                    continue;
                }
            };
            let line = row.position().map_or(0, |p| p.line());
            let row = match csv::StringRecord::from_byte_record(row) {
                Ok(row) => row,
                Err(err) => {
                    warn!("{}:{}: skipping line ({})", self.path.display(), line, err);
                    continue;
                }
            };
            match parse_row(&row) {
                Ok(measurement) => history.push(measurement),
                Err(RowIssue::Short) => {
                    debug!("{}:{}: skipping short line", self.path.display(), line);
                }
                Err(RowIssue::Header) => {}
                Err(RowIssue::Malformed(reason)) => {
                    warn!("{}:{}: skipping line ({})", self.path.display(), line, reason);
                }
            }
        }
        debug!("loaded {} entries from {}", history.len(), self.path.display());
        Ok(history)
    }

    /// Append one entry, writing the header first when the file is new.
    pub fn append(&self, measurement: &Measurement) -> WtResult<()> {
        let is_new = !self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| WtError::Io {
                path: self.path.clone(),
                source,
            })?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .quote_style(csv::QuoteStyle::Never)
            .from_writer(file);
        if is_new {
            writer.write_record(header())?;
        }
        writer.write_record(format_row(measurement))?;
        writer.flush().map_err(|source| WtError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(())
    }
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)
}

fn header() -> Vec<&'static str> {
    let mut cols = vec!["date"];
    cols.extend(Field::ALL.iter().map(|f| f.key()));
    cols
}

enum RowIssue {
    Short,
    Header,
    Malformed(String),
}

fn parse_row(row: &csv::StringRecord) -> Result<Measurement, RowIssue> {
    if row.len() < 1 + Field::COUNT {
        return Err(RowIssue::Short);
    }
    let date_str = &row[0];
    if date_str == "date" {
        return Err(RowIssue::Header);
    }
    let date = NaiveDate::parse_from_str(date_str, DATE_FORMAT)
        .map_err(|e| RowIssue::Malformed(format!("bad date '{}': {}", date_str, e)))?;
    let mut values: FieldValues = [None; Field::COUNT];
    for field in Field::ALL {
        let token = &row[1 + field.index()];
        values[field.index()] = parse_value(token).ok_or_else(|| {
            RowIssue::Malformed(format!("bad {} value '{}'", field.key(), token))
        })?;
    }
    Ok(Measurement::new(date, values))
}

/// `Some(None)` for the unset token, `Some(Some(v))` for a number, `None` if unparseable.
pub fn parse_value(token: &str) -> Option<Option<f64>> {
    let token = token.trim();
    if token.eq_ignore_ascii_case(UNSET_TOKEN) || token.eq_ignore_ascii_case("nan") {
        return Some(None);
    }
    token.parse::<f64>().ok().filter(|v| v.is_finite()).map(Some)
}

pub fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) if !v.is_nan() => format!("{:.2}", v),
        _ => UNSET_TOKEN.to_string(),
    }
}

pub fn format_row(measurement: &Measurement) -> Vec<String> {
    let mut cols = Vec::with_capacity(1 + Field::COUNT);
    cols.push(measurement.date.format(DATE_FORMAT).to_string());
    cols.extend(Field::ALL.iter().map(|&f| format_value(measurement.get(f))));
    cols
}
