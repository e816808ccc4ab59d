//! Event broadcaster
//!
//! Recorders push events onto a channel; a single delivery task drains it,
//! drops events that exceed the per-object rate limit, and hands the rest to
//! an [`EventSink`].

use std::num::{NonZeroU32, NonZeroUsize};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use lru::LruCache;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use k8s_event_types::{
    DEFAULT_RATE_BURST, DEFAULT_RATE_CACHE_SIZE, DEFAULT_RATE_QPS, RateSettings,
};

use crate::recorder::{BroadcastRecorder, PendingEvent};
use crate::sink::EventSink;

/// Events waiting for delivery beyond this are dropped
pub const MAX_QUEUED_EVENTS: usize = 1000;

/// Longest time a single delivery may take
const PUBLISH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default time [`Broadcaster::join`] waits for queued events
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Tuning for the broadcaster's spam filter
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CorrelatorOptions {
    /// Number of source objects with a tracked token bucket
    pub lru_cache_size: usize,

    /// Token refill rate, in events per second
    pub qps: f32,

    /// Bucket capacity
    pub burst_size: u32,
}

impl Default for CorrelatorOptions {
    fn default() -> Self {
        Self {
            lru_cache_size: DEFAULT_RATE_CACHE_SIZE,
            qps: DEFAULT_RATE_QPS,
            burst_size: DEFAULT_RATE_BURST,
        }
    }
}

impl From<RateSettings> for CorrelatorOptions {
    fn from(rate: RateSettings) -> Self {
        Self {
            lru_cache_size: rate.cache_size,
            qps: rate.qps,
            burst_size: rate.burst,
        }
    }
}

/// Token bucket per source object, evicting the least recently seen object
struct SpamFilter {
    quota: Quota,
    buckets: Mutex<LruCache<String, DefaultDirectRateLimiter>>,
}

impl SpamFilter {
    fn new(options: &CorrelatorOptions) -> Self {
        // Out-of-range values are clamped rather than rejected; the config
        // parser has already validated anything coming from a Corefile.
        let qps = if options.qps.is_finite() && options.qps > 0. {
            options.qps
        } else {
            DEFAULT_RATE_QPS
        };
        let period = Duration::try_from_secs_f64(1. / f64::from(qps))
            .unwrap_or(Duration::from_secs(3600));
        let burst = NonZeroU32::new(options.burst_size).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
            .allow_burst(burst);
        let capacity = NonZeroUsize::new(options.lru_cache_size).unwrap_or(NonZeroUsize::MIN);

        Self {
            quota,
            buckets: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Take a token for the event's object, returning false when throttled
    fn allow(&self, event: &PendingEvent) -> bool {
        let mut buckets = self.buckets.lock();
        let limiter = buckets.get_or_insert(event.spam_key(), || RateLimiter::direct(self.quota));
        limiter.check().is_ok()
    }
}

/// Fans recorded events out to a sink, rate limited per source object
pub struct Broadcaster {
    tx: mpsc::Sender<PendingEvent>,
    rx: Mutex<Option<mpsc::Receiver<PendingEvent>>>,
    filter: Arc<SpamFilter>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
    shutdown_grace: Duration,
}

impl Broadcaster {
    /// Create a broadcaster with the default correlator options
    pub fn new() -> Self {
        Self::with_correlator_options(CorrelatorOptions::default())
    }

    /// Create a broadcaster with explicit correlator options
    pub fn with_correlator_options(options: CorrelatorOptions) -> Self {
        let (tx, rx) = mpsc::channel(MAX_QUEUED_EVENTS);
        Self {
            tx,
            rx: Mutex::new(Some(rx)),
            filter: Arc::new(SpamFilter::new(&options)),
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
            shutdown_grace: SHUTDOWN_GRACE,
        }
    }

    /// Set how long [`join`](Self::join) waits for queued events to drain
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Create a recorder reporting events as `component`
    pub fn new_recorder(&self, component: &str) -> BroadcastRecorder {
        BroadcastRecorder::new(component.to_string(), self.tx.clone())
    }

    /// Number of events waiting for delivery
    pub fn queued(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    /// Start delivering recorded events to `sink`
    ///
    /// Must be called from within a tokio runtime. A broadcaster can only be
    /// started once.
    pub fn start_recording_to_sink<S: EventSink>(&self, sink: S) -> Result<()> {
        let Some(mut rx) = self.rx.lock().take() else {
            anyhow::bail!("Event broadcaster has already been started");
        };
        let filter = Arc::clone(&self.filter);
        let cancel = self.cancel.clone();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;

                    maybe_event = rx.recv() => {
                        let Some(event) = maybe_event else { break };
                        if !filter.allow(&event) {
                            debug!(reason = %event.reason, "Event rate limited, dropping");
                            continue;
                        }
                        match tokio::time::timeout(PUBLISH_TIMEOUT, sink.publish(&event)).await {
                            Ok(Ok(())) => {}
                            Ok(Err(e)) => {
                                warn!(reason = %event.reason, "Could not deliver event: {:#}", e);
                            }
                            Err(_) => {
                                warn!(reason = %event.reason, "Timed out delivering event");
                            }
                        }
                    }
                    _ = cancel.cancelled() => break,
                }
            }
            debug!("Event broadcaster stopped");
        });

        *self.task.lock() = Some(task);
        Ok(())
    }

    /// Stop delivering events
    ///
    /// Events already queued are still delivered, within the shutdown grace
    /// period; anything recorded afterwards is dropped.
    pub fn shutdown(&self) {
        debug!(queued = self.queued(), "Shutting down event broadcaster");
        self.cancel.cancel();
        self.rx.lock().take();
    }

    /// Wait for the delivery task to finish after [`shutdown`](Self::shutdown)
    ///
    /// Gives up on undelivered events once the shutdown grace period expires.
    pub async fn join(&self) {
        let task = self.task.lock().take();
        let Some(mut task) = task else {
            return;
        };
        match tokio::time::timeout(self.shutdown_grace, &mut task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Event broadcaster task failed: {}", e),
            Err(_) => {
                warn!("Event broadcaster did not drain in time, dropping queued events");
                task.abort();
            }
        }
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}
