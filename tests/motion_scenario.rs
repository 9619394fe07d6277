use std::sync::Arc;
use std::time::Duration;

use motionstat_lib::db::Database;
use motionstat_lib::health::{AuthorizationState, HealthStore, SqliteHealthService};
use motionstat_lib::motion::{
    Availability, Channel, Feed, FeedSample, ManualProvider, MotionController, Sample,
    SourceConfig,
};
use motionstat_lib::settings::HistorySettings;

fn health_store() -> HealthStore {
    let db = Database::in_memory().unwrap();
    let service = Arc::new(SqliteHealthService::new(db));
    HealthStore::new(service.clone(), service, HistorySettings::default())
}

#[tokio::test]
async fn authorize_stream_and_stop() {
    let health = health_store();
    health.request_authorization().await.unwrap();
    assert_eq!(
        health.authorization_state().await,
        AuthorizationState::Authorized
    );

    let provider = Arc::new(ManualProvider::new());
    let controller = MotionController::raw_sensors(provider.clone(), SourceConfig::default());
    let statuses = controller.start();
    assert!(statuses.iter().all(|status| status.active));
    assert_eq!(
        provider.interval_for(Feed::Accelerometer),
        Some(Duration::from_millis(100))
    );

    let late = provider.handler_for(Feed::Accelerometer).unwrap();
    assert_eq!(
        provider.emit(Feed::Accelerometer, FeedSample::Axis(Sample::new(0.1, 0.2, 9.8))),
        1
    );
    assert_eq!(
        controller.value(Channel::Accelerometer).as_deref(),
        Some("0.1000 | 0.2000 | 9.8000")
    );

    controller.stop();
    let frozen = controller.snapshot();

    late(FeedSample::Axis(Sample::new(5.0, 5.0, 5.0)));
    assert_eq!(
        provider.emit(Feed::Accelerometer, FeedSample::Axis(Sample::new(1.0, 1.0, 1.0))),
        0
    );

    assert_eq!(controller.snapshot(), frozen);
    assert!(!controller.is_active());
    assert_eq!(provider.active_subscriptions(), 0);
}

#[tokio::test]
async fn missing_feed_is_reported_without_blocking_the_other() {
    let provider = Arc::new(ManualProvider::new());
    provider.set_available(Feed::Gyroscope, false);
    let controller = MotionController::raw_sensors(provider.clone(), SourceConfig::default());

    controller.start();

    let gyro = controller.source(Feed::Gyroscope).unwrap();
    assert_eq!(gyro.availability(), Availability::Unavailable);
    assert!(gyro.snapshot().is_empty());

    provider.emit(Feed::Accelerometer, FeedSample::Axis(Sample::new(0.0, 0.0, 1.0)));
    assert_eq!(
        controller.value(Channel::Accelerometer).as_deref(),
        Some("0.0000 | 0.0000 | 1.0000")
    );
}

#[tokio::test]
async fn queries_before_authorization_are_refused() {
    let health = health_store();
    assert!(health.calculate_steps().await.is_err());
    assert!(health.steps_ordered().await.is_empty());
}
