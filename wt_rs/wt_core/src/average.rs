use crate::measurement::{Field, FieldValues, Measurement};
use crate::{WtError, WtResult};

/// Default averaging window, in entries.
pub const DEFAULT_WINDOW: usize = 7;

/// Sliding-window mean of every field over `history`.
///
/// Each output entry averages the set values of one field within its window;
/// a window without any set value yields an unset field. The output carries
/// the date of the last entry in its window and has exactly
/// `history.len() - window + 1` entries.
pub fn moving_average(history: &[Measurement], window: usize) -> WtResult<Vec<Measurement>> {
    if window == 0 {
        return Err(WtError::InvalidWindow);
    }
    if history.len() < window {
        return Err(WtError::InsufficientData {
            available: history.len(),
            window,
        });
    }

    let out = history
        .windows(window)
        .map(|slice| {
            let mut values: FieldValues = [None; Field::COUNT];
            for field in Field::ALL {
                values[field.index()] = mean_of(slice, field);
            }
            // windows() never yields an empty slice for window >= 1
            let date = slice[slice.len() - 1].date;
            Measurement::new(date, values)
        })
        .collect();
    Ok(out)
}

fn mean_of(slice: &[Measurement], field: Field) -> Option<f64> {
    let (sum, count) = slice
        .iter()
        .filter_map(|m| m.get(field))
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}
