//! A provider driven by the caller instead of hardware.
//!
//! Samples pushed through [`ManualProvider::emit`] are delivered synchronously
//! to whichever handler is subscribed to that feed. Useful for replaying
//! recorded data and for exercising sources deterministically.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::MotionError;

use super::provider::{MotionProvider, SampleHandler, SubscriptionHandle};
use super::types::{Feed, FeedSample};

struct Subscription {
    feed: Feed,
    interval: Duration,
    handler: SampleHandler,
}

#[derive(Default)]
pub struct ManualProvider {
    unavailable: Mutex<HashSet<Feed>>,
    subscriptions: Mutex<HashMap<SubscriptionHandle, Subscription>>,
    next_id: AtomicU64,
    subscribe_calls: AtomicUsize,
    unsubscribe_calls: AtomicUsize,
    cancel_calls: AtomicUsize,
    cancelled: Mutex<Vec<SubscriptionHandle>>,
}

impl ManualProvider {
    /// All feeds start out available.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&self, feed: Feed, available: bool) {
        let mut unavailable = lock(&self.unavailable);
        if available {
            unavailable.remove(&feed);
        } else {
            unavailable.insert(feed);
        }
    }

    /// Delivers `sample` to every live subscription on `feed` and returns
    /// how many handlers received it.
    pub fn emit(&self, feed: Feed, sample: FeedSample) -> usize {
        let handlers: Vec<SampleHandler> = lock(&self.subscriptions)
            .values()
            .filter(|sub| sub.feed == feed)
            .map(|sub| sub.handler.clone())
            .collect();

        for handler in &handlers {
            handler(sample);
        }
        handlers.len()
    }

    /// Handler of the live subscription on `feed`, if any. Holding on to it
    /// past `unsubscribe` reproduces a late in-flight delivery.
    pub fn handler_for(&self, feed: Feed) -> Option<SampleHandler> {
        lock(&self.subscriptions)
            .values()
            .find(|sub| sub.feed == feed)
            .map(|sub| sub.handler.clone())
    }

    pub fn handle_for(&self, feed: Feed) -> Option<SubscriptionHandle> {
        lock(&self.subscriptions)
            .iter()
            .find(|(_, sub)| sub.feed == feed)
            .map(|(handle, _)| *handle)
    }

    pub fn interval_for(&self, feed: Feed) -> Option<Duration> {
        lock(&self.subscriptions)
            .values()
            .find(|sub| sub.feed == feed)
            .map(|sub| sub.interval)
    }

    pub fn active_subscriptions(&self) -> usize {
        lock(&self.subscriptions).len()
    }

    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::Relaxed)
    }

    pub fn unsubscribe_calls(&self) -> usize {
        self.unsubscribe_calls.load(Ordering::Relaxed)
    }

    pub fn cancel_pending_calls(&self) -> usize {
        self.cancel_calls.load(Ordering::Relaxed)
    }

    /// Every handle passed to `cancel_pending`, in call order.
    pub fn cancelled_handles(&self) -> Vec<SubscriptionHandle> {
        lock(&self.cancelled).clone()
    }
}

impl MotionProvider for ManualProvider {
    fn is_available(&self, feed: Feed) -> bool {
        !lock(&self.unavailable).contains(&feed)
    }

    fn subscribe(
        &self,
        feed: Feed,
        interval: Duration,
        handler: SampleHandler,
    ) -> Result<SubscriptionHandle, MotionError> {
        if !self.is_available(feed) {
            return Err(MotionError::Unavailable { feed });
        }
        self.subscribe_calls.fetch_add(1, Ordering::Relaxed);
        let handle = SubscriptionHandle::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.subscriptions).insert(
            handle,
            Subscription {
                feed,
                interval,
                handler,
            },
        );
        Ok(handle)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        self.unsubscribe_calls.fetch_add(1, Ordering::Relaxed);
        lock(&self.subscriptions).remove(&handle);
    }

    fn cancel_pending(&self, handles: &[SubscriptionHandle]) {
        self.cancel_calls.fetch_add(1, Ordering::Relaxed);
        lock(&self.cancelled).extend_from_slice(handles);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
