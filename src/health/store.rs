use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::sync::Mutex;

use crate::error::{AuthError, HealthError};
use crate::settings::HistorySettings;

use super::range::{day_window, trailing_days};
use super::service::{AggregateQueryService, AuthorizationService, Clock, SystemClock};
use super::types::{
    ordered, ActivitySummary, AuthorizationState, BucketSize, Category, Record, RecordKind,
};

#[derive(Debug, Default)]
struct HealthState {
    authorization: AuthorizationState,
    steps: Vec<Record>,
    calories: Vec<Record>,
    time_standing_minutes: Option<f64>,
    activity: Vec<ActivitySummary>,
}

impl HealthState {
    fn records_mut(&mut self, kind: RecordKind) -> &mut Vec<Record> {
        match kind {
            RecordKind::Step => &mut self.steps,
            RecordKind::Calorie => &mut self.calories,
        }
    }
}

/// Historical statistics facade.
///
/// Every query is gated on a successful authorization request, bounded by
/// the configured timeout, and converts collaborator failures into
/// [`HealthError`]. A failed query leaves previously loaded data untouched.
#[derive(Clone)]
pub struct HealthStore {
    auth: Arc<dyn AuthorizationService>,
    queries: Arc<dyn AggregateQueryService>,
    clock: Arc<dyn Clock>,
    settings: HistorySettings,
    state: Arc<Mutex<HealthState>>,
    authorizing: Arc<Mutex<()>>,
}

impl HealthStore {
    pub fn new(
        auth: Arc<dyn AuthorizationService>,
        queries: Arc<dyn AggregateQueryService>,
        settings: HistorySettings,
    ) -> Self {
        Self {
            auth,
            queries,
            clock: Arc::new(SystemClock),
            settings,
            state: Arc::new(Mutex::new(HealthState::default())),
            authorizing: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Categories requested for read access.
    pub fn read_categories() -> BTreeSet<Category> {
        Category::ALL.into_iter().collect()
    }

    pub async fn authorization_state(&self) -> AuthorizationState {
        self.state.lock().await.authorization
    }

    /// Asks for read access once; later calls return immediately after a
    /// grant. Denied or failed requests may be retried.
    pub async fn request_authorization(&self) -> Result<(), HealthError> {
        let _in_flight = self.authorizing.lock().await;

        if self.authorization_state().await == AuthorizationState::Authorized {
            return Ok(());
        }

        if !self.auth.is_available() {
            warn!("health data is not available; queries stay disabled");
            self.set_authorization(AuthorizationState::Unavailable).await;
            return Err(AuthError::Unavailable.into());
        }

        let read = Self::read_categories();
        let outcome = self
            .bounded("authorization", self.auth.request_authorization(&read))
            .await;

        let next_state = match &outcome {
            Ok(()) => AuthorizationState::Authorized,
            Err(HealthError::Authorization(AuthError::Denied(_))) => AuthorizationState::Denied,
            Err(HealthError::Authorization(AuthError::Unavailable)) => {
                AuthorizationState::Unavailable
            }
            Err(_) => AuthorizationState::NotDetermined,
        };
        self.set_authorization(next_state).await;

        match &outcome {
            Ok(()) => info!("health authorization granted for {} categories", read.len()),
            Err(err) => error!("health authorization failed: {err}"),
        }
        outcome
    }

    /// Reloads daily step totals for the trailing window and returns them
    /// most recent first.
    pub async fn calculate_steps(&self) -> Result<Vec<Record>, HealthError> {
        self.refresh_records(RecordKind::Step).await
    }

    /// Reloads daily active energy totals for the trailing window and
    /// returns them most recent first.
    pub async fn calculate_calories(&self) -> Result<Vec<Record>, HealthError> {
        self.refresh_records(RecordKind::Calorie).await
    }

    /// Minutes stood during the current calendar day.
    pub async fn fetch_time_standing(&self) -> Result<f64, HealthError> {
        self.ensure_authorized().await?;
        let range = day_window(self.clock.now())?;

        let total = self
            .bounded(
                "time standing query",
                self.queries
                    .query_single_sum(Category::AppleStandTime, range),
            )
            .await
            .inspect_err(|err| error!("time standing query failed: {err}"))?;

        let minutes = total.unwrap_or(0.0);
        self.state.lock().await.time_standing_minutes = Some(minutes);
        info!("time standing today: {minutes:.1} min");
        Ok(minutes)
    }

    /// Per-day activity summaries for the trailing window, most recent first.
    pub async fn fetch_activity_summary(&self) -> Result<Vec<ActivitySummary>, HealthError> {
        self.ensure_authorized().await?;
        let range = trailing_days(self.clock.now(), self.settings.window_days)?;

        let mut summaries = self
            .bounded(
                "activity summary query",
                self.queries.query_activity_summaries(range),
            )
            .await
            .inspect_err(|err| error!("activity summary query failed: {err}"))?;
        summaries.sort_by(|a, b| b.date.cmp(&a.date));

        for summary in &summaries {
            debug!("activity summary: {summary:?}");
        }

        self.state.lock().await.activity = summaries.clone();
        Ok(summaries)
    }

    pub async fn steps_ordered(&self) -> Vec<Record> {
        ordered(&self.state.lock().await.steps)
    }

    pub async fn calories_ordered(&self) -> Vec<Record> {
        ordered(&self.state.lock().await.calories)
    }

    pub async fn time_standing(&self) -> Option<f64> {
        self.state.lock().await.time_standing_minutes
    }

    pub async fn activity_summaries(&self) -> Vec<ActivitySummary> {
        self.state.lock().await.activity.clone()
    }

    async fn refresh_records(&self, kind: RecordKind) -> Result<Vec<Record>, HealthError> {
        self.ensure_authorized().await?;
        let category = kind.category();
        let range = trailing_days(self.clock.now(), self.settings.window_days)?;

        let buckets = self
            .bounded(
                "bucketed sum query",
                self.queries
                    .query_bucketed_sum(category, range, BucketSize::Day),
            )
            .await
            .inspect_err(|err| error!("{category} query failed: {err}"))?;

        let records: Vec<Record> = buckets
            .iter()
            .filter_map(|bucket| Record::from_bucket(kind, bucket))
            .collect();
        info!(
            "{category}: {} of {} daily buckets had data",
            records.len(),
            buckets.len()
        );

        let mut state = self.state.lock().await;
        let slot = state.records_mut(kind);
        *slot = records;
        Ok(ordered(slot))
    }

    async fn ensure_authorized(&self) -> Result<(), HealthError> {
        match self.authorization_state().await {
            AuthorizationState::Authorized => Ok(()),
            other => Err(HealthError::NotAuthorized(other)),
        }
    }

    async fn set_authorization(&self, next: AuthorizationState) {
        self.state.lock().await.authorization = next;
    }

    async fn bounded<T, E>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T, E>>,
    ) -> Result<T, HealthError>
    where
        HealthError: From<E>,
    {
        let timeout = self.settings.query_timeout();
        match tokio::time::timeout(timeout, fut).await {
            Ok(result) => result.map_err(HealthError::from),
            Err(_) => {
                warn!("{operation} timed out after {timeout:?}");
                Err(HealthError::Timeout { operation, timeout })
            }
        }
    }
}
