use std::fmt;

use anyhow::{anyhow, Result};
use chrono::{Days, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Data categories the statistics service can be asked about.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    StepCount,
    ActiveEnergyBurned,
    AppleStandTime,
    ExerciseTime,
    ActivitySummary,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::StepCount,
        Category::ActiveEnergyBurned,
        Category::AppleStandTime,
        Category::ExerciseTime,
        Category::ActivitySummary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::StepCount => "StepCount",
            Category::ActiveEnergyBurned => "ActiveEnergyBurned",
            Category::AppleStandTime => "AppleStandTime",
            Category::ExerciseTime => "ExerciseTime",
            Category::ActivitySummary => "ActivitySummary",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == value)
            .ok_or_else(|| anyhow!("unknown category '{value}'"))
    }

    /// Unit the service reports sums in.
    pub fn unit(&self) -> &'static str {
        match self {
            Category::StepCount => "count",
            Category::ActiveEnergyBurned => "kcal",
            Category::AppleStandTime | Category::ExerciseTime => "min",
            Category::ActivitySummary => "summary",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AuthorizationState {
    #[default]
    NotDetermined,
    Authorized,
    Denied,
    Unavailable,
}

impl AuthorizationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorizationState::NotDetermined => "NotDetermined",
            AuthorizationState::Authorized => "Authorized",
            AuthorizationState::Denied => "Denied",
            AuthorizationState::Unavailable => "Unavailable",
        }
    }
}

impl fmt::Display for AuthorizationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Half-open wall-clock interval `[start, end)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start <= at && at < self.end
    }

    /// Calendar days overlapping the range, oldest first.
    pub fn days(&self) -> Vec<NaiveDate> {
        let mut days = Vec::new();
        let mut day = self.start.date();
        while day.and_hms_opt(0, 0, 0).is_some_and(|midnight| midnight < self.end) {
            days.push(day);
            match day.checked_add_days(Days::new(1)) {
                Some(next) => day = next,
                None => break,
            }
        }
        days
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum BucketSize {
    Day,
}

/// One pre-aggregated window returned by a bucketed query.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Bucket {
    pub start: NaiveDate,
    /// `None` when the window holds no samples at all.
    pub sum: Option<f64>,
}

impl Bucket {
    pub fn new(start: NaiveDate, sum: Option<f64>) -> Self {
        Self { start, sum }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum RecordKind {
    Step,
    Calorie,
}

impl RecordKind {
    pub fn category(&self) -> Category {
        match self {
            RecordKind::Step => Category::StepCount,
            RecordKind::Calorie => Category::ActiveEnergyBurned,
        }
    }

    pub fn unit_label(&self) -> &'static str {
        match self {
            RecordKind::Step => "Steps",
            RecordKind::Calorie => "kcal",
        }
    }
}

/// A dated, strictly positive daily aggregate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: Uuid,
    pub kind: RecordKind,
    pub value: i64,
    pub date: NaiveDate,
}

impl Record {
    /// Materializes a bucket, truncating its sum toward zero. Empty buckets
    /// and buckets that truncate to zero or below produce nothing.
    pub fn from_bucket(kind: RecordKind, bucket: &Bucket) -> Option<Self> {
        let value = bucket.sum.filter(|sum| sum.is_finite())?.trunc() as i64;
        (value > 0).then(|| Self {
            id: Uuid::new_v4(),
            kind,
            value,
            date: bucket.start,
        })
    }

    pub fn display_value(&self) -> String {
        format!("{} {}", self.value, self.kind.unit_label())
    }

    /// Abbreviated calendar day, e.g. "Jan 5, 2025".
    pub fn display_date(&self) -> String {
        self.date.format("%b %-d, %Y").to_string()
    }
}

/// Most recent first. Records sharing a date keep their insertion order.
pub fn ordered(records: &[Record]) -> Vec<Record> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));
    sorted
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySummary {
    pub date: NaiveDate,
    pub active_energy_kcal: f64,
    pub exercise_minutes: f64,
    pub stand_minutes: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn positive_only_filtering() {
        let sums = [0.0, 5.0, -1.0, 12.0, 0.0];
        let records: Vec<Record> = sums
            .iter()
            .enumerate()
            .filter_map(|(i, sum)| {
                Record::from_bucket(
                    RecordKind::Step,
                    &Bucket::new(day(2025, 1, 1 + i as u32), Some(*sum)),
                )
            })
            .collect();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].value, 5);
        assert_eq!(records[0].date, day(2025, 1, 2));
        assert_eq!(records[1].value, 12);
        assert_eq!(records[1].date, day(2025, 1, 4));
    }

    #[test]
    fn fractions_truncate_before_the_positivity_check() {
        let bucket = Bucket::new(day(2025, 3, 1), Some(0.9));
        assert!(Record::from_bucket(RecordKind::Calorie, &bucket).is_none());

        let bucket = Bucket::new(day(2025, 3, 1), Some(431.7));
        let record = Record::from_bucket(RecordKind::Calorie, &bucket).unwrap();
        assert_eq!(record.value, 431);
        assert_eq!(record.display_value(), "431 kcal");
    }

    #[test]
    fn absent_and_non_finite_sums_are_skipped() {
        assert!(Record::from_bucket(RecordKind::Step, &Bucket::new(day(2025, 1, 1), None)).is_none());
        assert!(Record::from_bucket(
            RecordKind::Step,
            &Bucket::new(day(2025, 1, 1), Some(f64::NAN))
        )
        .is_none());
    }

    #[test]
    fn ordered_view_is_most_recent_first() {
        let make = |d| Record {
            id: Uuid::new_v4(),
            kind: RecordKind::Step,
            value: 1,
            date: d,
        };
        let records = vec![make(day(2025, 1, 1)), make(day(2025, 1, 5)), make(day(2025, 1, 3))];

        let dates: Vec<NaiveDate> = ordered(&records).iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![day(2025, 1, 5), day(2025, 1, 3), day(2025, 1, 1)]);
        assert_eq!(records[0].date, day(2025, 1, 1), "source is untouched");
    }

    #[test]
    fn display_date_is_abbreviated() {
        let record = Record {
            id: Uuid::new_v4(),
            kind: RecordKind::Step,
            value: 8042,
            date: day(2025, 1, 5),
        };
        assert_eq!(record.display_date(), "Jan 5, 2025");
        assert_eq!(record.display_value(), "8042 Steps");
    }

    #[test]
    fn range_days_cover_partial_first_day() {
        let start = day(2025, 1, 1).and_hms_opt(15, 30, 0).unwrap();
        let end = day(2025, 1, 4).and_hms_opt(9, 0, 0).unwrap();
        let days = DateRange::new(start, end).days();
        assert_eq!(
            days,
            vec![day(2025, 1, 1), day(2025, 1, 2), day(2025, 1, 3), day(2025, 1, 4)]
        );
    }

    #[test]
    fn range_ending_at_midnight_excludes_that_day() {
        let start = day(2025, 1, 1).and_hms_opt(0, 0, 0).unwrap();
        let end = day(2025, 1, 2).and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(DateRange::new(start, end).days(), vec![day(2025, 1, 1)]);
    }

    #[test]
    fn categories_round_trip_through_names() {
        for category in Category::ALL {
            assert_eq!(Category::parse(category.as_str()).unwrap(), category);
        }
        assert!(Category::parse("Heartbeat").is_err());
    }
}
