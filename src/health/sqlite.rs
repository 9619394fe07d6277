use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::Utc;
use log::info;

use crate::db::Database;
use crate::error::{AuthError, QueryError};

use super::service::{AggregateQueryService, AuthorizationService};
use super::types::{ActivitySummary, Bucket, BucketSize, Category, DateRange};

/// Statistics service backed by the local SQLite sample store.
///
/// Categories listed in `denied` are refused at authorization time, and
/// queries for categories without a recorded grant fail.
#[derive(Clone)]
pub struct SqliteHealthService {
    db: Database,
    denied: BTreeSet<Category>,
}

impl SqliteHealthService {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            denied: BTreeSet::new(),
        }
    }

    pub fn with_denied(mut self, denied: impl IntoIterator<Item = Category>) -> Self {
        self.denied = denied.into_iter().collect();
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    async fn ensure_granted(&self, category: Category) -> Result<(), QueryError> {
        let granted = self
            .db
            .granted_categories()
            .await
            .map_err(|err| QueryError::Unavailable(format!("{err:#}")))?;
        if granted.contains(&category) {
            Ok(())
        } else {
            Err(QueryError::Failed {
                category,
                reason: "read access was never granted".into(),
            })
        }
    }
}

fn failed(category: Category) -> impl FnOnce(anyhow::Error) -> QueryError {
    move |err| QueryError::Failed {
        category,
        reason: format!("{err:#}"),
    }
}

#[async_trait]
impl AuthorizationService for SqliteHealthService {
    fn is_available(&self) -> bool {
        true
    }

    async fn request_authorization(&self, read: &BTreeSet<Category>) -> Result<(), AuthError> {
        let refused: Vec<Category> = read.intersection(&self.denied).copied().collect();
        if !refused.is_empty() {
            return Err(AuthError::Denied(refused));
        }

        self.db
            .record_grants(read, Utc::now())
            .await
            .map_err(|err| AuthError::Failed(format!("{err:#}")))?;
        info!("granted read access to {} categories", read.len());
        Ok(())
    }
}

#[async_trait]
impl AggregateQueryService for SqliteHealthService {
    async fn query_bucketed_sum(
        &self,
        category: Category,
        range: DateRange,
        bucket: BucketSize,
    ) -> Result<Vec<Bucket>, QueryError> {
        self.ensure_granted(category).await?;
        let sums = self
            .db
            .daily_sums(category, range)
            .await
            .map_err(failed(category))?;

        let buckets = match bucket {
            BucketSize::Day => range
                .days()
                .into_iter()
                .map(|day| Bucket::new(day, sums.get(&day).copied()))
                .collect(),
        };
        Ok(buckets)
    }

    async fn query_single_sum(
        &self,
        category: Category,
        range: DateRange,
    ) -> Result<Option<f64>, QueryError> {
        self.ensure_granted(category).await?;
        self.db
            .total(category, range)
            .await
            .map_err(failed(category))
    }

    async fn query_activity_summaries(
        &self,
        range: DateRange,
    ) -> Result<Vec<ActivitySummary>, QueryError> {
        self.ensure_granted(Category::ActivitySummary).await?;

        let energy = self
            .db
            .daily_sums(Category::ActiveEnergyBurned, range)
            .await
            .map_err(failed(Category::ActiveEnergyBurned))?;
        let exercise = self
            .db
            .daily_sums(Category::ExerciseTime, range)
            .await
            .map_err(failed(Category::ExerciseTime))?;
        let stand = self
            .db
            .daily_sums(Category::AppleStandTime, range)
            .await
            .map_err(failed(Category::AppleStandTime))?;

        let days: BTreeSet<_> = energy
            .keys()
            .chain(exercise.keys())
            .chain(stand.keys())
            .copied()
            .collect();

        Ok(days
            .into_iter()
            .map(|date| ActivitySummary {
                date,
                active_energy_kcal: energy.get(&date).copied().unwrap_or(0.0),
                exercise_minutes: exercise.get(&date).copied().unwrap_or(0.0),
                stand_minutes: stand.get(&date).copied().unwrap_or(0.0),
            })
            .collect())
    }
}
