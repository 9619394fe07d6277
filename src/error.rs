//! Error taxonomy shared by the motion and health facades.

use std::time::Duration;

use thiserror::Error;

use crate::health::{AuthorizationState, Category};
use crate::motion::Feed;

/// Failures raised by a streaming sensor provider.
///
/// A missing capability is *not* an error at the source level: sources
/// record it as [`crate::motion::Availability::Unavailable`] and keep going.
#[derive(Debug, Error)]
pub enum MotionError {
    #[error("{feed} feed is not available on this device")]
    Unavailable { feed: Feed },

    #[error("failed to subscribe to {feed}: {reason}")]
    Subscribe { feed: Feed, reason: String },
}

/// Outcome of a failed authorization request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("health data is not available on this device")]
    Unavailable,

    #[error("read access denied for {}", format_categories(.0))]
    Denied(Vec<Category>),

    #[error("authorization request failed: {0}")]
    Failed(String),
}

/// Failure reported by the aggregate query service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("query service unavailable: {0}")]
    Unavailable(String),

    #[error("query for {category} failed: {reason}")]
    Failed { category: Category, reason: String },
}

/// Errors surfaced by [`crate::health::HealthStore`] to its callers.
#[derive(Debug, Error)]
pub enum HealthError {
    /// A query was attempted before authorization succeeded.
    #[error("health store is not authorized (state: {0})")]
    NotAuthorized(AuthorizationState),

    #[error(transparent)]
    Authorization(#[from] AuthError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    /// Calendar arithmetic produced a date that cannot be represented.
    #[error("invalid date: {0}")]
    InvalidDate(String),
}

fn format_categories(categories: &[Category]) -> String {
    categories
        .iter()
        .map(|category| category.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denied_lists_every_category() {
        let err = AuthError::Denied(vec![Category::StepCount, Category::AppleStandTime]);
        assert_eq!(
            err.to_string(),
            "read access denied for StepCount, AppleStandTime"
        );
    }

    #[test]
    fn query_errors_convert_into_health_errors() {
        let err: HealthError = QueryError::Unavailable("offline".into()).into();
        assert!(matches!(err, HealthError::Query(QueryError::Unavailable(_))));
        assert_eq!(err.to_string(), "query service unavailable: offline");
    }
}
