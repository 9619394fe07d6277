use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::{Days, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use crate::db::{
    connection::Database,
    helpers::{format_timestamp, parse_day, parse_timestamp},
    models::QuantitySample,
};
use crate::health::{Category, DateRange};

/// Hours of the day demo samples are spread over.
const DEMO_HOURS: std::ops::Range<u32> = 8..21;

impl Database {
    pub async fn insert_samples(&self, samples: &[QuantitySample]) -> Result<usize> {
        let records = samples.to_vec();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO quantity_samples (id, category, start_at, value)
                     VALUES (?1, ?2, ?3, ?4)",
                )?;
                for record in &records {
                    stmt.execute(params![
                        record.id.to_string(),
                        record.category.as_str(),
                        format_timestamp(record.start_at),
                        record.value,
                    ])
                    .with_context(|| format!("failed to insert sample {}", record.id))?;
                }
            }
            tx.commit().context("failed to commit samples")?;
            Ok(records.len())
        })
        .await
    }

    pub async fn count_samples(&self) -> Result<u64> {
        self.execute(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM quantity_samples", [], |row| row.get(0))?;
            Ok(u64::try_from(count).unwrap_or(0))
        })
        .await
    }

    pub async fn get_samples_in_range(
        &self,
        category: Category,
        range: DateRange,
    ) -> Result<Vec<QuantitySample>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, start_at, value
                 FROM quantity_samples
                 WHERE category = ?1 AND start_at >= ?2 AND start_at < ?3
                 ORDER BY start_at ASC",
            )?;

            let mut rows = stmt.query(params![
                category.as_str(),
                format_timestamp(range.start),
                format_timestamp(range.end),
            ])?;

            let mut samples = Vec::new();
            while let Some(row) = rows.next()? {
                let id: String = row.get(0)?;
                let start_at: String = row.get(1)?;
                samples.push(QuantitySample {
                    id: Uuid::parse_str(&id).with_context(|| format!("invalid sample id '{id}'"))?,
                    category,
                    start_at: parse_timestamp(&start_at, "start_at")?,
                    value: row.get(2)?,
                });
            }
            Ok(samples)
        })
        .await
    }

    /// Sums per calendar day for days that have at least one sample.
    pub async fn daily_sums(
        &self,
        category: Category,
        range: DateRange,
    ) -> Result<BTreeMap<NaiveDate, f64>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT date(start_at) AS day, SUM(value)
                 FROM quantity_samples
                 WHERE category = ?1 AND start_at >= ?2 AND start_at < ?3
                 GROUP BY day
                 ORDER BY day ASC",
            )?;

            let mut rows = stmt.query(params![
                category.as_str(),
                format_timestamp(range.start),
                format_timestamp(range.end),
            ])?;

            let mut sums = BTreeMap::new();
            while let Some(row) = rows.next()? {
                let day: String = row.get(0)?;
                sums.insert(parse_day(&day, "day")?, row.get::<_, f64>(1)?);
            }
            Ok(sums)
        })
        .await
    }

    /// `None` when the range holds no samples.
    pub async fn total(&self, category: Category, range: DateRange) -> Result<Option<f64>> {
        self.execute(move |conn| {
            let total = conn
                .query_row(
                    "SELECT SUM(value)
                     FROM quantity_samples
                     WHERE category = ?1 AND start_at >= ?2 AND start_at < ?3",
                    params![
                        category.as_str(),
                        format_timestamp(range.start),
                        format_timestamp(range.end),
                    ],
                    |row| row.get::<_, Option<f64>>(0),
                )
                .optional()?
                .flatten();
            Ok(total)
        })
        .await
    }

    /// Fills the `days` calendar days up to `now` with plausible samples.
    pub async fn seed_demo_samples(&self, now: NaiveDateTime, days: u32) -> Result<usize> {
        let samples = demo_samples(now, days, &mut StdRng::from_entropy());
        self.insert_samples(&samples).await
    }
}

fn demo_samples(now: NaiveDateTime, days: u32, rng: &mut StdRng) -> Vec<QuantitySample> {
    let today = now.date();
    let mut samples = Vec::new();

    for back in 0..=u64::from(days) {
        let Some(day) = today.checked_sub_days(Days::new(back)) else {
            break;
        };
        // Some days the phone stayed in a drawer.
        let idle_day = rng.gen_bool(0.1);

        for hour in DEMO_HOURS {
            let Some(at) = day.and_hms_opt(hour, rng.gen_range(0..60), 0) else {
                continue;
            };
            if at >= now {
                break;
            }

            if !idle_day {
                samples.push(QuantitySample::new(
                    Category::StepCount,
                    at,
                    f64::from(rng.gen_range(150..1400)),
                ));
                samples.push(QuantitySample::new(
                    Category::ActiveEnergyBurned,
                    at,
                    rng.gen_range(8.0..45.0),
                ));
            }
            if rng.gen_bool(0.6) {
                samples.push(QuantitySample::new(
                    Category::AppleStandTime,
                    at,
                    f64::from(rng.gen_range(1..12)),
                ));
            }
            if !idle_day && rng.gen_bool(0.15) {
                samples.push(QuantitySample::new(
                    Category::ExerciseTime,
                    at,
                    f64::from(rng.gen_range(5..35)),
                ));
            }
        }
    }

    samples
}
