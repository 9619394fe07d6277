use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::error::MotionError;

use super::provider::{MotionProvider, SampleHandler, SubscriptionHandle};
use super::types::{Feed, FeedSample, MotionSample, Sample, Vector3};

const ENABLE_LOGS: bool = true;
const LOG_TARGET: &str = "motionstat::motion::simulated";

use crate::{log_debug, log_info};

const MIN_INTERVAL: Duration = Duration::from_millis(1);
const GRAVITY_Z: f64 = -1.0;

/// A sample waiting on the dispatch queue.
struct Job {
    /// Queue generation of the owning subscription.
    generation: Arc<AtomicU64>,
    queued_in: u64,
    handler: SampleHandler,
    sample: FeedSample,
}

struct Subscription {
    token: CancellationToken,
    generation: Arc<AtomicU64>,
}

struct Shared {
    unavailable: HashSet<Feed>,
    live: Mutex<HashMap<SubscriptionHandle, Subscription>>,
    /// Unsubscribed handles whose jobs may still sit on the queue. The
    /// generation dies with the last of them.
    draining: Mutex<HashMap<SubscriptionHandle, Weak<AtomicU64>>>,
    next_id: AtomicU64,
}

/// Synthetic motion hardware running on the tokio runtime.
///
/// Every subscription gets a generator task ticking at the requested
/// interval. Generated samples go through one shared queue and a single
/// dispatcher task, so handlers always run off the subscribing thread and
/// in arrival order. Each subscription carries its own queue generation,
/// which `cancel_pending` bumps to drop that subscription's queued jobs.
pub struct SimulatedMotionProvider {
    runtime: Handle,
    shared: Arc<Shared>,
    queue: mpsc::UnboundedSender<Job>,
    shutdown: CancellationToken,
}

impl SimulatedMotionProvider {
    /// Must be called from within a tokio runtime.
    pub fn new() -> Result<Self, MotionError> {
        Self::with_unavailable(&[])
    }

    /// Like [`SimulatedMotionProvider::new`], pretending the device lacks
    /// `missing` feeds.
    pub fn with_unavailable(missing: &[Feed]) -> Result<Self, MotionError> {
        let runtime = Handle::try_current().map_err(|err| MotionError::Subscribe {
            feed: Feed::DeviceMotion,
            reason: format!("no tokio runtime: {err}"),
        })?;

        let shutdown = CancellationToken::new();
        let (queue, rx) = mpsc::unbounded_channel();
        runtime.spawn(dispatch_loop(rx, shutdown.clone()));

        Ok(Self {
            runtime,
            shared: Arc::new(Shared {
                unavailable: missing.iter().copied().collect(),
                live: Mutex::new(HashMap::new()),
                draining: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
            queue,
            shutdown,
        })
    }

    pub fn active_subscriptions(&self) -> usize {
        lock(&self.shared.live).len()
    }

    fn generation_of(&self, handle: SubscriptionHandle) -> Option<Arc<AtomicU64>> {
        if let Some(sub) = lock(&self.shared.live).get(&handle) {
            return Some(sub.generation.clone());
        }
        lock(&self.shared.draining)
            .remove(&handle)
            .and_then(|generation| generation.upgrade())
    }
}

impl MotionProvider for SimulatedMotionProvider {
    fn is_available(&self, feed: Feed) -> bool {
        !self.shared.unavailable.contains(&feed)
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
        if self.queue.is_closed() {
            return Err(MotionError::Subscribe {
                feed,
                reason: "dispatcher has shut down".into(),
            });
        }

        let handle =
            SubscriptionHandle::new(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        let token = self.shutdown.child_token();
        let generation = Arc::new(AtomicU64::new(0));
        lock(&self.shared.live).insert(
            handle,
            Subscription {
                token: token.clone(),
                generation: generation.clone(),
            },
        );

        self.runtime.spawn(generate_loop(
            feed,
            interval.max(MIN_INTERVAL),
            handler,
            self.queue.clone(),
            generation,
            token,
        ));

        log_info!("simulated {feed} feed subscribed as {handle}");
        Ok(handle)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        let Some(sub) = lock(&self.shared.live).remove(&handle) else {
            return;
        };
        sub.token.cancel();

        let mut draining = lock(&self.shared.draining);
        draining.retain(|_, generation| generation.strong_count() > 0);
        draining.insert(handle, Arc::downgrade(&sub.generation));
        log_info!("simulated feed {handle} unsubscribed");
    }

    fn cancel_pending(&self, handles: &[SubscriptionHandle]) {
        for &handle in handles {
            if let Some(generation) = self.generation_of(handle) {
                generation.fetch_add(1, Ordering::AcqRel);
                log_debug!("pending deliveries for {handle} cancelled");
            }
        }
    }
}

impl Drop for SimulatedMotionProvider {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn generate_loop(
    feed: Feed,
    interval: Duration,
    handler: SampleHandler,
    queue: mpsc::UnboundedSender<Job>,
    generation: Arc<AtomicU64>,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut rng = StdRng::from_entropy();

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => break,
            _ = ticker.tick() => {
                let job = Job {
                    queued_in: generation.load(Ordering::Acquire),
                    generation: generation.clone(),
                    handler: handler.clone(),
                    sample: synthesize(feed, &mut rng),
                };
                if queue.send(job).is_err() {
                    break;
                }
            }
        }
    }

    log_debug!("simulated {feed} generator exiting");
}

async fn dispatch_loop(mut rx: mpsc::UnboundedReceiver<Job>, shutdown: CancellationToken) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            job = rx.recv() => {
                let Some(job) = job else { break };
                if job.queued_in != job.generation.load(Ordering::Acquire) {
                    continue;
                }
                (job.handler)(job.sample);
            }
        }
    }

    log_debug!("simulated dispatcher exiting");
}

fn synthesize(feed: Feed, rng: &mut StdRng) -> FeedSample {
    match feed {
        Feed::Accelerometer => FeedSample::Axis(Sample::new(
            rng.gen_range(-0.05..0.05),
            rng.gen_range(-0.05..0.05),
            GRAVITY_Z + rng.gen_range(-0.02..0.02),
        )),
        Feed::Gyroscope => FeedSample::Axis(Sample::new(
            rng.gen_range(-0.1..0.1),
            rng.gen_range(-0.1..0.1),
            rng.gen_range(-0.1..0.1),
        )),
        Feed::DeviceMotion => FeedSample::Motion(MotionSample::new(
            Vector3::new(
                rng.gen_range(-0.01..0.01),
                rng.gen_range(-0.01..0.01),
                rng.gen_range(-0.01..0.01),
            ),
            Vector3::new(
                rng.gen_range(-0.05..0.05),
                rng.gen_range(-0.05..0.05),
                rng.gen_range(-0.05..0.05),
            ),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::{MotionController, SourceConfig};
    use std::sync::atomic::AtomicUsize;

    fn counting_handler() -> (SampleHandler, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let handler: SampleHandler = Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (handler, count)
    }

    #[tokio::test(start_paused = true)]
    async fn delivers_at_requested_cadence() {
        let provider = SimulatedMotionProvider::new().expect("runtime");
        let (handler, count) = counting_handler();

        let handle = provider
            .subscribe(Feed::Accelerometer, Duration::from_millis(100), handler)
            .expect("subscribe");
        tokio::time::sleep(Duration::from_millis(350)).await;

        let delivered = count.load(Ordering::SeqCst);
        assert!(delivered >= 3, "expected at least 3 samples, got {delivered}");

        provider.unsubscribe(handle);
        tokio::time::sleep(Duration::from_millis(10)).await;
        let after_stop = count.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(count.load(Ordering::SeqCst), after_stop);
        assert_eq!(provider.active_subscriptions(), 0);
    }

    const IDLE: Duration = Duration::from_secs(3600);

    /// Puts one sample for `handle` on the dispatch queue, as its generator
    /// would.
    fn enqueue(
        provider: &SimulatedMotionProvider,
        handle: SubscriptionHandle,
        handler: SampleHandler,
        sample: FeedSample,
    ) {
        let generation = provider.generation_of(handle).expect("known subscription");
        let job = Job {
            queued_in: generation.load(Ordering::Acquire),
            generation,
            handler,
            sample,
        };
        assert!(provider.queue.send(job).is_ok(), "dispatcher running");
    }

    fn axis_sample() -> FeedSample {
        FeedSample::Axis(Sample::new(0.0, 0.0, -1.0))
    }

    fn motion_sample() -> FeedSample {
        FeedSample::Motion(MotionSample::new(Vector3::default(), Vector3::default()))
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_pending_drops_queued_samples() {
        let provider = SimulatedMotionProvider::new().expect("runtime");
        let (handler, count) = counting_handler();
        let handle = provider
            .subscribe(Feed::Accelerometer, IDLE, handler.clone())
            .expect("subscribe");
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1, "first tick is immediate");

        enqueue(&provider, handle, handler.clone(), axis_sample());
        provider.cancel_pending(&[handle]);
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        enqueue(&provider, handle, handler, axis_sample());
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2, "later samples still flow");
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_pending_reaches_unsubscribed_handles() {
        let provider = SimulatedMotionProvider::new().expect("runtime");
        let (handler, count) = counting_handler();
        let handle = provider
            .subscribe(Feed::Gyroscope, IDLE, handler.clone())
            .expect("subscribe");
        tokio::time::sleep(Duration::from_millis(1)).await;

        enqueue(&provider, handle, handler, axis_sample());
        provider.unsubscribe(handle);
        provider.cancel_pending(&[handle]);
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_pending_leaves_other_subscriptions_queued() {
        let provider = SimulatedMotionProvider::new().expect("runtime");
        let (raw_handler, raw_count) = counting_handler();
        let (fused_handler, fused_count) = counting_handler();
        let raw = provider
            .subscribe(Feed::Accelerometer, IDLE, raw_handler.clone())
            .expect("subscribe raw");
        let fused = provider
            .subscribe(Feed::DeviceMotion, IDLE, fused_handler.clone())
            .expect("subscribe fused");
        tokio::time::sleep(Duration::from_millis(1)).await;

        enqueue(&provider, raw, raw_handler, axis_sample());
        enqueue(&provider, fused, fused_handler, motion_sample());
        provider.cancel_pending(&[raw]);
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert_eq!(raw_count.load(Ordering::SeqCst), 1);
        assert_eq!(fused_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stopping_raw_sensors_keeps_device_motion_deliveries() {
        let provider = Arc::new(SimulatedMotionProvider::new().expect("runtime"));
        let config = SourceConfig {
            interval: IDLE,
            ..SourceConfig::default()
        };
        let raw = MotionController::raw_sensors(provider.clone(), config);
        raw.start();
        let (handler, count) = counting_handler();
        let fused = provider
            .subscribe(Feed::DeviceMotion, IDLE, handler.clone())
            .expect("subscribe fused");
        tokio::time::sleep(Duration::from_millis(1)).await;

        enqueue(&provider, fused, handler, motion_sample());
        raw.stop();
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(provider.active_subscriptions(), 1);
    }

    #[tokio::test]
    async fn unavailable_feed_refuses_subscription() {
        let provider =
            SimulatedMotionProvider::with_unavailable(&[Feed::Gyroscope]).expect("runtime");
        let (handler, _) = counting_handler();

        assert!(!provider.is_available(Feed::Gyroscope));
        let err = provider
            .subscribe(Feed::Gyroscope, Duration::from_millis(100), handler)
            .unwrap_err();
        assert!(matches!(err, MotionError::Unavailable { feed: Feed::Gyroscope }));
    }

    #[test]
    fn requires_a_runtime() {
        assert!(SimulatedMotionProvider::new().is_err());
    }

    #[test]
    fn device_motion_produces_motion_samples() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(matches!(
            synthesize(Feed::DeviceMotion, &mut rng),
            FeedSample::Motion(_)
        ));
        assert!(matches!(
            synthesize(Feed::Accelerometer, &mut rng),
            FeedSample::Axis(_)
        ));
    }
}
