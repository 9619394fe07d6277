pub mod range;
pub mod service;
pub mod sqlite;
pub mod store;
pub mod types;

pub use service::{AggregateQueryService, AuthorizationService, Clock, FixedClock, SystemClock};
pub use sqlite::SqliteHealthService;
pub use store::HealthStore;
pub use types::{
    ordered, ActivitySummary, AuthorizationState, Bucket, BucketSize, Category, DateRange, Record,
    RecordKind,
};
