use chrono::NaiveDate;

use crate::measurement::{Field, Measurement};

/// Collect the recorded values of `field`, dropping unset entries and keeping history order.
pub fn extract(history: &[Measurement], field: Field) -> Vec<f64> {
    history.iter().filter_map(|m| m.get(field)).collect()
}

/// Like [`extract`], but keeps the date each surviving sample was logged on.
pub fn extract_dated(history: &[Measurement], field: Field) -> Vec<(NaiveDate, f64)> {
    history
        .iter()
        .filter_map(|m| m.get(field).map(|v| (m.date, v)))
        .collect()
}
