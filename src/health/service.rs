use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};

use crate::error::{AuthError, QueryError};

use super::types::{ActivitySummary, Bucket, BucketSize, Category, DateRange};

/// Grants read access to statistics categories.
#[async_trait]
pub trait AuthorizationService: Send + Sync {
    /// Whether the device keeps statistics at all.
    fn is_available(&self) -> bool;

    async fn request_authorization(&self, read: &BTreeSet<Category>) -> Result<(), AuthError>;
}

/// Pre-aggregated statistics over stored samples.
#[async_trait]
pub trait AggregateQueryService: Send + Sync {
    /// One bucket per calendar day overlapping `range`, oldest first.
    async fn query_bucketed_sum(
        &self,
        category: Category,
        range: DateRange,
        bucket: BucketSize,
    ) -> Result<Vec<Bucket>, QueryError>;

    /// Total over `range`, `None` when nothing was recorded.
    async fn query_single_sum(
        &self,
        category: Category,
        range: DateRange,
    ) -> Result<Option<f64>, QueryError>;

    async fn query_activity_summaries(
        &self,
        range: DateRange,
    ) -> Result<Vec<ActivitySummary>, QueryError>;
}

/// Source of the "now" anchor for relative windows.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
