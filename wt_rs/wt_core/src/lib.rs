//! Body-composition history: data model, moving averages and trend fitting.

use std::path::PathBuf;

use thiserror::Error;

pub mod average;
pub mod column;
pub mod measurement;
pub mod report;
pub mod store;
pub mod trend;

pub use average::{moving_average, DEFAULT_WINDOW};
pub use column::{extract, extract_dated};
pub use measurement::{Field, FieldValues, Measurement};
pub use report::{
    report, report_with, FieldOutcome, FieldTrend, ReportMode, ReportOptions, StatsSummary,
    TimeAxis,
};
pub use store::HistoryStore;
pub use trend::{fit, fit_calendar, fit_points, TrendFit};

#[derive(Error, Debug)]
pub enum WtError {
    #[error("no data points{}", field.map(|f| format!(" for {}", f)).unwrap_or_default())]
    EmptyInput { field: Option<Field> },
    #[error("not enough data: {available} entries for a window of {window}")]
    InsufficientData { available: usize, window: usize },
    #[error("averaging window must be at least 1")]
    InvalidWindow,
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed history file: {0}")]
    Csv(#[from] csv::Error),
    #[error("HOME is not set; pass an explicit history file")]
    MissingHome,
}

pub type WtResult<T> = Result<T, WtError>;
