use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::MotionError;

use super::types::{Feed, FeedSample};

/// Callback invoked by a provider for every delivered sample.
///
/// Providers call it from their own execution context, never from the
/// thread that subscribed.
pub type SampleHandler = Arc<dyn Fn(FeedSample) + Send + Sync>;

/// Opaque token identifying one live subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

impl SubscriptionHandle {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

/// Push-based access to motion hardware.
pub trait MotionProvider: Send + Sync {
    fn is_available(&self, feed: Feed) -> bool;

    /// Starts delivering `feed` samples to `handler` every `interval`.
    fn subscribe(
        &self,
        feed: Feed,
        interval: Duration,
        handler: SampleHandler,
    ) -> Result<SubscriptionHandle, MotionError>;

    /// Stops the subscription. Unknown handles are ignored.
    fn unsubscribe(&self, handle: SubscriptionHandle);

    /// Drops samples queued for `handles` that have not reached their
    /// handler yet. Other subscriptions keep their queued samples. Providers
    /// without a queue have nothing to cancel.
    fn cancel_pending(&self, _handles: &[SubscriptionHandle]) {}
}
