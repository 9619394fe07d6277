use std::sync::Arc;

use log::info;

use super::provider::{MotionProvider, SubscriptionHandle};
use super::snapshot::Snapshot;
use super::source::{RawAxis, SourceConfig, SourceStatus, StreamSource};
use super::types::{Channel, Feed};

/// Owns a fixed set of [`StreamSource`]s and drives them together.
///
/// Sources are independent: one failing to start never keeps the others
/// from starting, and their sampling is not phase-aligned.
pub struct MotionController {
    provider: Arc<dyn MotionProvider>,
    sources: Vec<StreamSource>,
}

impl MotionController {
    pub fn new(provider: Arc<dyn MotionProvider>, sources: Vec<StreamSource>) -> Self {
        Self { provider, sources }
    }

    /// Raw accelerometer and gyroscope.
    pub fn raw_sensors(provider: Arc<dyn MotionProvider>, config: SourceConfig) -> Self {
        let sources = vec![
            StreamSource::raw_axis(provider.clone(), RawAxis::Accelerometer, config),
            StreamSource::raw_axis(provider.clone(), RawAxis::Gyroscope, config),
        ];
        Self::new(provider, sources)
    }

    /// Fused user acceleration and rotation rate.
    pub fn device_motion(provider: Arc<dyn MotionProvider>, config: SourceConfig) -> Self {
        let sources = vec![StreamSource::fused_motion(provider.clone(), config)];
        Self::new(provider, sources)
    }

    /// Starts every source and reports where each one ended up.
    pub fn start(&self) -> Vec<SourceStatus> {
        let statuses: Vec<SourceStatus> = self.sources.iter().map(StreamSource::start).collect();
        let active = statuses.iter().filter(|status| status.active).count();
        info!(
            "motion controller started {active}/{} sources",
            statuses.len()
        );
        statuses
    }

    /// Stops every source, then drops deliveries the provider still holds
    /// for them. Subscriptions owned by other controllers are not touched.
    pub fn stop(&self) {
        let released: Vec<SubscriptionHandle> =
            self.sources.iter().filter_map(StreamSource::stop).collect();
        if released.is_empty() {
            return;
        }
        self.provider.cancel_pending(&released);
        info!("motion controller stopped {} sources", released.len());
    }

    pub fn is_active(&self) -> bool {
        self.sources.iter().any(StreamSource::is_active)
    }

    pub fn statuses(&self) -> Vec<SourceStatus> {
        self.sources.iter().map(StreamSource::status).collect()
    }

    pub fn sources(&self) -> &[StreamSource] {
        &self.sources
    }

    pub fn source(&self, feed: Feed) -> Option<&StreamSource> {
        self.sources.iter().find(|source| source.feed() == feed)
    }

    /// All channels of all sources in one view.
    pub fn snapshot(&self) -> Snapshot {
        self.sources
            .iter()
            .fold(Snapshot::default(), |mut merged, source| {
                merged.absorb(&source.snapshot());
                merged
            })
    }

    pub fn value(&self, channel: Channel) -> Option<String> {
        self.sources
            .iter()
            .find(|source| source.channels().contains(&channel))
            .and_then(|source| source.snapshot().get(channel).map(str::to_owned))
    }
}
