use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Tracked body-composition metrics, in declared (and on-disk) order.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Weight,
    BodyFat,
    MuscleMass,
    WaterMass,
}

impl Field {
    pub const COUNT: usize = 4;
    pub const ALL: [Field; Field::COUNT] = [
        Field::Weight,
        Field::BodyFat,
        Field::MuscleMass,
        Field::WaterMass,
    ];

    pub fn index(self) -> usize {
        match self {
            Field::Weight => 0,
            Field::BodyFat => 1,
            Field::MuscleMass => 2,
            Field::WaterMass => 3,
        }
    }

    /// Column key used in the CSV header and JSON output.
    pub fn key(self) -> &'static str {
        match self {
            Field::Weight => "weight_kg",
            Field::BodyFat => "body_fat_percent",
            Field::MuscleMass => "muscle_mass_percent",
            Field::WaterMass => "water_mass_percent",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Field::Weight => "Weight",
            Field::BodyFat => "BF",
            Field::MuscleMass => "MM",
            Field::WaterMass => "WM",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Field::Weight => "Kg",
            Field::BodyFat | Field::MuscleMass | Field::WaterMass => "%",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One value slot per [`Field`]; `None` marks a metric that was not measured.
pub type FieldValues = [Option<f64>; Field::COUNT];

/// A dated entry of the body-composition log.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Measurement {
    pub date: NaiveDate,
    values: FieldValues,
}

impl Measurement {
    pub fn new(date: NaiveDate, values: FieldValues) -> Self {
        Self { date, values }
    }

    /// Entry with only the weight recorded.
    pub fn weight_only(date: NaiveDate, weight_kg: f64) -> Self {
        let mut values = [None; Field::COUNT];
        values[Field::Weight.index()] = Some(weight_kg);
        Self { date, values }
    }

    /// Value of `field`, or `None` when it was not recorded. NaN is treated as unset.
    pub fn get(&self, field: Field) -> Option<f64> {
        self.values[field.index()].filter(|v| !v.is_nan())
    }

    pub fn with(mut self, field: Field, value: Option<f64>) -> Self {
        self.values[field.index()] = value;
        self
    }

    pub fn values(&self) -> &FieldValues {
        &self.values
    }

    pub fn is_set(&self, field: Field) -> bool {
        self.get(field).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn weight_only_leaves_other_fields_unset() {
        let m = Measurement::weight_only(day(1), 70.5);
        assert_eq!(m.get(Field::Weight), Some(70.5));
        for field in &Field::ALL[1..] {
            assert!(!m.is_set(*field));
        }
    }

    #[test]
    fn nan_reads_back_as_unset() {
        let m = Measurement::weight_only(day(2), 70.0).with(Field::BodyFat, Some(f64::NAN));
        assert_eq!(m.get(Field::BodyFat), None);
    }

    #[test]
    fn declared_order_matches_index() {
        for (i, field) in Field::ALL.iter().enumerate() {
            assert_eq!(field.index(), i);
        }
        assert!(Field::Weight < Field::WaterMass);
    }
}
