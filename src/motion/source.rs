use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;

use crate::settings::MotionSettings;

use super::format::FormatStyle;
use super::provider::{MotionProvider, SampleHandler, SubscriptionHandle};
use super::snapshot::{Snapshot, SnapshotCell};
use super::types::{Availability, Channel, Feed, FeedSample};

const ENABLE_LOGS: bool = true;
const LOG_TARGET: &str = "motionstat::motion::source";

use crate::{log_debug, log_error, log_info, log_warn};

pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// Raw-axis feeds a [`StreamSource`] can wrap directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawAxis {
    Accelerometer,
    Gyroscope,
}

impl RawAxis {
    pub fn feed(&self) -> Feed {
        match self {
            RawAxis::Accelerometer => Feed::Accelerometer,
            RawAxis::Gyroscope => Feed::Gyroscope,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceConfig {
    pub interval: Duration,
    pub raw_precision: usize,
    pub fused_precision: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SAMPLE_INTERVAL,
            raw_precision: FormatStyle::RAW.precision,
            fused_precision: FormatStyle::FUSED.precision,
        }
    }
}

impl SourceConfig {
    fn style(&self, channel: Channel) -> FormatStyle {
        let style = FormatStyle::for_channel(channel);
        if channel.is_fused() {
            style.with_precision(self.fused_precision)
        } else {
            style.with_precision(self.raw_precision)
        }
    }
}

impl From<&MotionSettings> for SourceConfig {
    fn from(settings: &MotionSettings) -> Self {
        Self {
            interval: Duration::from_millis(settings.sample_interval_ms),
            raw_precision: settings.raw_precision,
            fused_precision: settings.fused_precision,
        }
    }
}

/// Point-in-time view of a source's lifecycle.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SourceStatus {
    pub feed: Feed,
    pub availability: Availability,
    pub active: bool,
}

/// State reachable from the provider's callback context.
struct Shared {
    feed: Feed,
    config: SourceConfig,
    cell: SnapshotCell,
    /// Bumped on every start and stop; callbacks carrying an older epoch
    /// are late deliveries and get dropped.
    epoch: AtomicU64,
}

impl Shared {
    fn apply(&self, epoch: u64, sample: FeedSample) {
        if self.epoch.load(Ordering::Acquire) != epoch {
            log_debug!("discarding late {} sample", self.feed);
            return;
        }

        match (self.feed, sample) {
            (Feed::Accelerometer, FeedSample::Axis(sample)) => {
                self.publish_axis(Channel::Accelerometer, sample)
            }
            (Feed::Gyroscope, FeedSample::Axis(sample)) => {
                self.publish_axis(Channel::Gyroscope, sample)
            }
            (Feed::DeviceMotion, FeedSample::Motion(motion)) => {
                let acceleration = self
                    .config
                    .style(Channel::Acceleration)
                    .format(&motion.user_acceleration);
                let rotation = self
                    .config
                    .style(Channel::Rotation)
                    .format(&motion.rotation_rate);
                self.cell.publish(
                    [
                        (Channel::Acceleration, acceleration),
                        (Channel::Rotation, rotation),
                    ],
                    motion.captured_at,
                );
            }
            (feed, other) => {
                log_warn!("ignoring sample of the wrong shape for {feed}: {other:?}");
            }
        }
    }

    fn publish_axis(&self, channel: Channel, sample: super::types::Sample) {
        let text = self.config.style(channel).format(&sample.vector);
        self.cell.publish([(channel, text)], sample.captured_at);
    }
}

/// Bridges one push-based provider feed into a [`Snapshot`].
///
/// `start` and `stop` are idempotent and return immediately. A feed the
/// device lacks leaves the source [`Availability::Unavailable`] and the
/// snapshot empty; callers can read or watch that state.
pub struct StreamSource {
    provider: Arc<dyn MotionProvider>,
    shared: Arc<Shared>,
    subscription: Mutex<Option<SubscriptionHandle>>,
    availability: watch::Sender<Availability>,
}

impl StreamSource {
    pub fn raw_axis(provider: Arc<dyn MotionProvider>, axis: RawAxis, config: SourceConfig) -> Self {
        Self::new(provider, axis.feed(), config)
    }

    pub fn fused_motion(provider: Arc<dyn MotionProvider>, config: SourceConfig) -> Self {
        Self::new(provider, Feed::DeviceMotion, config)
    }

    fn new(provider: Arc<dyn MotionProvider>, feed: Feed, config: SourceConfig) -> Self {
        let (availability, _rx) = watch::channel(Availability::Unknown);
        Self {
            provider,
            shared: Arc::new(Shared {
                feed,
                config,
                cell: SnapshotCell::new(feed.channels()),
                epoch: AtomicU64::new(0),
            }),
            subscription: Mutex::new(None),
            availability,
        }
    }

    pub fn feed(&self) -> Feed {
        self.shared.feed
    }

    pub fn channels(&self) -> &'static [Channel] {
        self.shared.feed.channels()
    }

    pub fn interval(&self) -> Duration {
        self.shared.config.interval
    }

    /// Subscribes to the feed unless already subscribed.
    pub fn start(&self) -> SourceStatus {
        let mut subscription = self.lock_subscription();
        if subscription.is_some() {
            return self.status_with(true);
        }

        let feed = self.shared.feed;
        if !self.provider.is_available(feed) {
            log_warn!("{feed} is not available on this device; source stays idle");
            self.availability.send_replace(Availability::Unavailable);
            return self.status_with(false);
        }
        self.availability.send_replace(Availability::Available);

        let epoch = self.shared.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        let handler: SampleHandler = Arc::new(move |sample| {
            if let Some(shared) = weak.upgrade() {
                shared.apply(epoch, sample);
            }
        });

        match self
            .provider
            .subscribe(feed, self.shared.config.interval, handler)
        {
            Ok(handle) => {
                log_info!(
                    "{feed} source started ({handle}, every {:?})",
                    self.shared.config.interval
                );
                *subscription = Some(handle);
            }
            Err(err) => {
                log_error!("{feed} source failed to start: {err}");
            }
        }

        self.status_with(subscription.is_some())
    }

    /// Unsubscribes if subscribed and returns the released handle so the
    /// caller can cancel samples still queued for it.
    ///
    /// Best effort: a callback that is already applying a sample when `stop`
    /// runs may still land it. Anything delivered afterwards is discarded.
    pub fn stop(&self) -> Option<SubscriptionHandle> {
        let mut subscription = self.lock_subscription();
        let handle = subscription.take()?;

        self.shared.epoch.fetch_add(1, Ordering::AcqRel);
        self.provider.unsubscribe(handle);
        log_info!("{} source stopped ({handle})", self.shared.feed);
        Some(handle)
    }

    pub fn is_active(&self) -> bool {
        self.lock_subscription().is_some()
    }

    pub fn availability(&self) -> Availability {
        *self.availability.borrow()
    }

    pub fn watch_availability(&self) -> watch::Receiver<Availability> {
        self.availability.subscribe()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.shared.cell.current()
    }

    pub fn watch(&self) -> watch::Receiver<Snapshot> {
        self.shared.cell.subscribe()
    }

    pub fn status(&self) -> SourceStatus {
        self.status_with(self.is_active())
    }

    fn status_with(&self, active: bool) -> SourceStatus {
        SourceStatus {
            feed: self.shared.feed,
            availability: self.availability(),
            active,
        }
    }

    fn lock_subscription(&self) -> MutexGuard<'_, Option<SubscriptionHandle>> {
        self.subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for StreamSource {
    fn drop(&mut self) {
        if let Some(handle) = self.stop() {
            self.provider.cancel_pending(&[handle]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::manual::ManualProvider;
    use crate::motion::types::{MotionSample, Sample, Vector3};

    fn accelerometer(provider: &Arc<ManualProvider>) -> StreamSource {
        StreamSource::raw_axis(
            provider.clone(),
            RawAxis::Accelerometer,
            SourceConfig::default(),
        )
    }

    #[test]
    fn start_twice_subscribes_once() {
        let provider = Arc::new(ManualProvider::new());
        let source = accelerometer(&provider);

        assert!(source.start().active);
        assert!(source.start().active);

        assert_eq!(provider.subscribe_calls(), 1);
        assert_eq!(provider.active_subscriptions(), 1);
    }

    #[test]
    fn start_uses_configured_interval() {
        let provider = Arc::new(ManualProvider::new());
        let source = accelerometer(&provider);
        source.start();
        assert_eq!(
            provider.interval_for(Feed::Accelerometer),
            Some(Duration::from_millis(100))
        );
    }

    #[test]
    fn stop_without_start_is_a_no_op() {
        let provider = Arc::new(ManualProvider::new());
        let source = accelerometer(&provider);

        source.stop();
        source.stop();

        assert_eq!(provider.unsubscribe_calls(), 0);
        assert!(!source.is_active());
    }

    #[test]
    fn stop_twice_unsubscribes_once() {
        let provider = Arc::new(ManualProvider::new());
        let source = accelerometer(&provider);
        source.start();

        assert!(source.stop().is_some());
        assert_eq!(source.stop(), None);

        assert_eq!(provider.unsubscribe_calls(), 1);
        assert_eq!(provider.active_subscriptions(), 0);
    }

    #[test]
    fn missing_feed_degrades_to_unavailable() {
        let provider = Arc::new(ManualProvider::new());
        provider.set_available(Feed::Gyroscope, false);
        let source = StreamSource::raw_axis(
            provider.clone(),
            RawAxis::Gyroscope,
            SourceConfig::default(),
        );
        assert_eq!(source.availability(), Availability::Unknown);

        let status = source.start();

        assert_eq!(status.availability, Availability::Unavailable);
        assert!(!status.active);
        assert_eq!(provider.subscribe_calls(), 0);
        assert_eq!(source.snapshot().get(Channel::Gyroscope), Some(""));
    }

    #[test]
    fn latest_sample_wins() {
        let provider = Arc::new(ManualProvider::new());
        let source = accelerometer(&provider);
        source.start();

        provider.emit(Feed::Accelerometer, FeedSample::Axis(Sample::new(1.0, 2.0, 3.0)));
        provider.emit(Feed::Accelerometer, FeedSample::Axis(Sample::new(0.1, 0.2, 9.8)));

        assert_eq!(
            source.snapshot().get(Channel::Accelerometer),
            Some("0.1000 | 0.2000 | 9.8000")
        );
    }

    #[test]
    fn fused_source_updates_both_channels() {
        let provider = Arc::new(ManualProvider::new());
        let source = StreamSource::fused_motion(provider.clone(), SourceConfig::default());
        source.start();

        provider.emit(
            Feed::DeviceMotion,
            FeedSample::Motion(MotionSample::new(
                Vector3::new(0.01, -0.02, 0.03),
                Vector3::new(1.0, 0.5, -0.25),
            )),
        );

        let snapshot = source.snapshot();
        assert_eq!(
            snapshot.get(Channel::Acceleration),
            Some("0.010000, -0.020000, 0.030000")
        );
        assert_eq!(
            snapshot.get(Channel::Rotation),
            Some("1.000000, 0.500000, -0.250000")
        );
    }

    #[test]
    fn late_callback_after_stop_is_ignored() {
        let provider = Arc::new(ManualProvider::new());
        let source = accelerometer(&provider);
        source.start();
        let handler = provider
            .handler_for(Feed::Accelerometer)
            .expect("subscribed");
        provider.emit(Feed::Accelerometer, FeedSample::Axis(Sample::new(1.0, 1.0, 1.0)));

        source.stop();
        handler(FeedSample::Axis(Sample::new(5.0, 5.0, 5.0)));

        assert_eq!(
            source.snapshot().get(Channel::Accelerometer),
            Some("1.0000 | 1.0000 | 1.0000")
        );
    }

    #[test]
    fn stale_handler_from_previous_run_is_ignored_after_restart() {
        let provider = Arc::new(ManualProvider::new());
        let source = accelerometer(&provider);
        source.start();
        let old_handler = provider
            .handler_for(Feed::Accelerometer)
            .expect("subscribed");
        source.stop();
        source.start();

        old_handler(FeedSample::Axis(Sample::new(7.0, 7.0, 7.0)));
        assert_eq!(source.snapshot().get(Channel::Accelerometer), Some(""));

        provider.emit(Feed::Accelerometer, FeedSample::Axis(Sample::new(2.0, 2.0, 2.0)));
        assert_eq!(
            source.snapshot().get(Channel::Accelerometer),
            Some("2.0000 | 2.0000 | 2.0000")
        );
    }

    #[test]
    fn configured_precision_applies() {
        let provider = Arc::new(ManualProvider::new());
        let config = SourceConfig {
            raw_precision: 2,
            ..SourceConfig::default()
        };
        let source = StreamSource::raw_axis(provider.clone(), RawAxis::Gyroscope, config);
        source.start();
        provider.emit(Feed::Gyroscope, FeedSample::Axis(Sample::new(0.5, 0.25, 0.126)));
        assert_eq!(
            source.snapshot().get(Channel::Gyroscope),
            Some("0.50 | 0.25 | 0.13")
        );
    }

    #[test]
    fn dropping_source_unsubscribes() {
        let provider = Arc::new(ManualProvider::new());
        {
            let source = accelerometer(&provider);
            source.start();
            assert_eq!(provider.active_subscriptions(), 1);
        }
        assert_eq!(provider.active_subscriptions(), 0);
    }
}
