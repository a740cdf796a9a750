use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::column::{extract, extract_dated};
use crate::measurement::{Field, Measurement};
use crate::trend::{fit, fit_calendar, TrendFit};
use crate::{WtError, WtResult};

/// How a field with no usable samples affects the whole report.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReportMode {
    /// Any field without data fails the report.
    #[default]
    FailFast,
    /// Keep one outcome per field and let the caller decide.
    Partial,
}

/// Abscissa used for the trend fit.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TimeAxis {
    /// Surviving samples are one step apart regardless of their dates.
    #[default]
    SampleIndex,
    /// Samples are placed at the days elapsed since the first one.
    CalendarDays,
}

impl TimeAxis {
    /// Unit of the fitted slope's denominator: `step` (one entry) or `day`.
    pub fn step_name(self) -> &'static str {
        match self {
            TimeAxis::SampleIndex => "step",
            TimeAxis::CalendarDays => "day",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportOptions {
    pub mode: ReportMode,
    pub axis: TimeAxis,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct FieldTrend {
    pub fit: TrendFit,
    pub samples: usize,
}

pub type FieldOutcome = WtResult<FieldTrend>;

/// Per-field rate of change over a history.
#[derive(Debug)]
pub struct StatsSummary {
    outcomes: BTreeMap<Field, FieldOutcome>,
    options: ReportOptions,
}

impl StatsSummary {
    pub fn outcome(&self, field: Field) -> Option<&FieldOutcome> {
        self.outcomes.get(&field)
    }

    /// Slope for `field`, if it could be fitted.
    pub fn slope(&self, field: Field) -> Option<f64> {
        match self.outcomes.get(&field) {
            Some(Ok(trend)) => Some(trend.fit.slope),
            _ => None,
        }
    }

    /// Outcomes in declared field order.
    pub fn iter(&self) -> impl Iterator<Item = (Field, &FieldOutcome)> {
        self.outcomes.iter().map(|(field, outcome)| (*field, outcome))
    }

    pub fn is_complete(&self) -> bool {
        self.outcomes.values().all(Result::is_ok)
    }

    pub fn mode(&self) -> ReportMode {
        self.options.mode
    }

    pub fn axis(&self) -> TimeAxis {
        self.options.axis
    }
}

/// Rate of change per field with the fail-fast, sample-index behaviour.
pub fn report(history: &[Measurement]) -> WtResult<StatsSummary> {
    report_with(history, &ReportOptions::default())
}

pub fn report_with(history: &[Measurement], options: &ReportOptions) -> WtResult<StatsSummary> {
    let mut outcomes = BTreeMap::new();
    for field in Field::ALL {
        match fit_field(history, field, options.axis) {
            Ok(trend) => {
                outcomes.insert(field, Ok(trend));
            }
            Err(err) => {
                tracing::debug!("no trend for {}: {}", field, err);
                if options.mode == ReportMode::FailFast {
                    return Err(err);
                }
                outcomes.insert(field, Err(err));
            }
        }
    }
    Ok(StatsSummary {
        outcomes,
        options: *options,
    })
}

fn fit_field(history: &[Measurement], field: Field, axis: TimeAxis) -> FieldOutcome {
    let (fitted, samples) = match axis {
        TimeAxis::SampleIndex => {
            let column = extract(history, field);
            (fit(&column), column.len())
        }
        TimeAxis::CalendarDays => {
            let column = extract_dated(history, field);
            (fit_calendar(&column), column.len())
        }
    };
    fitted
        .map(|fit| FieldTrend { fit, samples })
        .map_err(|err| match err {
            WtError::EmptyInput { .. } => WtError::EmptyInput { field: Some(field) },
            other => other,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
    }

    fn full_history() -> Vec<Measurement> {
        (0..5)
            .map(|i| {
                let x = i as f64;
                Measurement::new(
                    day(i + 1),
                    [
                        Some(80.0 - 0.5 * x),
                        Some(25.0 - 0.2 * x),
                        Some(40.0 + 0.1 * x),
                        Some(55.0),
                    ],
                )
            })
            .collect()
    }

    fn weight_only_history() -> Vec<Measurement> {
        [70.0, 70.2, 70.1, 69.9, 69.8, 69.7, 69.5]
            .iter()
            .enumerate()
            .map(|(i, &w)| Measurement::weight_only(day(i as u32 + 1), w))
            .collect()
    }

    #[test]
    fn reports_every_field_in_declared_order() {
        let summary = report(&full_history()).unwrap();
        let fields: Vec<Field> = summary.iter().map(|(f, _)| f).collect();
        assert_eq!(fields, Field::ALL.to_vec());
        assert!((summary.slope(Field::Weight).unwrap() + 0.5).abs() < 1e-9);
        assert!((summary.slope(Field::BodyFat).unwrap() + 0.2).abs() < 1e-9);
        assert!((summary.slope(Field::MuscleMass).unwrap() - 0.1).abs() < 1e-9);
        assert!(summary.slope(Field::WaterMass).unwrap().abs() < 1e-9);
        assert!(summary.is_complete());
    }

    #[test]
    fn fail_fast_rejects_field_without_data() {
        let err = report(&weight_only_history()).unwrap_err();
        match err {
            WtError::EmptyInput { field } => assert_eq!(field, Some(Field::BodyFat)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn partial_mode_keeps_per_field_outcomes() {
        let options = ReportOptions {
            mode: ReportMode::Partial,
            ..ReportOptions::default()
        };
        let summary = report_with(&weight_only_history(), &options).unwrap();
        assert!(!summary.is_complete());
        assert_eq!(summary.mode(), ReportMode::Partial);

        let weight = summary.outcome(Field::Weight).unwrap().as_ref().unwrap();
        assert_eq!(weight.samples, 7);
        assert!(weight.fit.slope < 0.0);

        for field in &Field::ALL[1..] {
            assert!(matches!(
                summary.outcome(*field),
                Some(Err(WtError::EmptyInput { field: Some(f) })) if f == field
            ));
            assert_eq!(summary.slope(*field), None);
        }
    }

    #[test]
    fn axis_names_the_rate_denominator() {
        assert_eq!(TimeAxis::default().step_name(), "step");
        assert_eq!(TimeAxis::CalendarDays.step_name(), "day");
    }

    #[test]
    fn calendar_axis_accounts_for_gaps() {
        let history = vec![
            Measurement::new(day(1), [Some(70.0), Some(20.0), Some(40.0), Some(55.0)]),
            Measurement::new(day(2), [Some(69.9), Some(20.0), Some(40.0), Some(55.0)]),
            Measurement::new(day(11), [Some(69.0), Some(20.0), Some(40.0), Some(55.0)]),
        ];
        let by_step = report(&history).unwrap();
        let by_day = report_with(
            &history,
            &ReportOptions {
                axis: TimeAxis::CalendarDays,
                ..ReportOptions::default()
            },
        )
        .unwrap();
        assert_eq!(by_day.axis(), TimeAxis::CalendarDays);
        assert!((by_day.slope(Field::Weight).unwrap() + 0.1).abs() < 1e-6);
        assert!(by_step.slope(Field::Weight).unwrap() < -0.4);
    }

    #[test]
    fn empty_history_fails_even_in_partial_mode_per_field() {
        assert!(report(&[]).is_err());
        let options = ReportOptions {
            mode: ReportMode::Partial,
            axis: TimeAxis::SampleIndex,
        };
        let summary = report_with(&[], &options).unwrap();
        assert!(summary.iter().all(|(_, outcome)| outcome.is_err()));
    }
}
