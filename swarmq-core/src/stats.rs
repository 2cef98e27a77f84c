use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use hdrhistogram::Histogram;

use crate::resource::ResourceUsage;

/// Mutable accumulator shared across all connections for one run.
///
/// Counters are written from concurrent session callbacks and driver tasks;
/// derived metrics are computed once via [`RunStats::finalize`], strictly
/// after the publish phase has ended.
#[derive(Debug)]
pub struct RunStats {
    sent: AtomicU64,
    received: AtomicU64,
    failed: AtomicU64,
    subscribe_failures: AtomicU64,
    connected_subscribers: AtomicU64,
    connected_publishers: AtomicU64,
    publish_latency_us: Mutex<Histogram<u64>>,
}

impl Default for RunStats {
    fn default() -> Self {
        // Track publish-call latency up to 60s in microseconds (3 sigfigs).
        let hist = Histogram::<u64>::new_with_bounds(1, 60_000_000, 3)
            .unwrap_or_else(|err| panic!("failed to init histogram: {err}"));

        Self {
            sent: AtomicU64::new(0),
            received: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            subscribe_failures: AtomicU64::new(0),
            connected_subscribers: AtomicU64::new(0),
            connected_publishers: AtomicU64::new(0),
            publish_latency_us: Mutex::new(hist),
        }
    }
}

impl RunStats {
    pub fn record_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_subscribe_failure(&self) {
        self.subscribe_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_publish_latency(&self, elapsed: Duration) {
        let us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        let mut hist = self
            .publish_latency_us
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let _ = hist.record(us.clamp(1, 60_000_000));
    }

    pub fn set_connected_subscribers(&self, n: u64) {
        self.connected_subscribers.store(n, Ordering::Relaxed);
    }

    pub fn set_connected_publishers(&self, n: u64) {
        self.connected_publishers.store(n, Ordering::Relaxed);
    }

    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn subscribe_failures(&self) -> u64 {
        self.subscribe_failures.load(Ordering::Relaxed)
    }

    pub fn connected_subscribers(&self) -> u64 {
        self.connected_subscribers.load(Ordering::Relaxed)
    }

    pub fn connected_publishers(&self) -> u64 {
        self.connected_publishers.load(Ordering::Relaxed)
    }

    pub fn publish_latency_snapshot(&self) -> Option<LatencySummary> {
        let hist = self
            .publish_latency_us
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        #[allow(clippy::len_zero)]
        if hist.len() == 0 {
            return None;
        }

        Some(LatencySummary {
            count: hist.len(),
            mean_us: hist.mean(),
            p50_us: hist.value_at_quantile(0.50),
            p90_us: hist.value_at_quantile(0.90),
            p99_us: hist.value_at_quantile(0.99),
            max_us: hist.max(),
        })
    }

    /// Computes the derived metrics over the publish window.
    ///
    /// Must only be called after all traffic-generating phases have ended;
    /// sessions may still mutate `received` afterwards (teardown races are
    /// tolerated, the snapshot is taken here).
    pub fn finalize(
        &self,
        publish_elapsed: Duration,
        payload_len: usize,
        resources: ResourceUsage,
    ) -> StatisticsSnapshot {
        let sent = self.sent();
        let received = self.received();

        let sent_per_sec = per_sec(sent, publish_elapsed);
        let received_per_sec = per_sec(received, publish_elapsed);

        StatisticsSnapshot {
            sent_messages: sent,
            received_messages: received,
            failed_messages: self.failed(),
            subscribers: self.connected_subscribers(),
            publishers: self.connected_publishers(),
            sent_per_sec,
            received_per_sec,
            cpu_percent: resources.cpu_percent,
            memory_used_mib: resources.memory_used_bytes / (1024 * 1024),
            network_out_kbit: estimated_kbit(sent_per_sec, payload_len),
            network_in_kbit: estimated_kbit(received_per_sec, payload_len),
            publish_elapsed,
            publish_latency: self.publish_latency_snapshot(),
        }
    }
}

/// Floored messages/sec over the window. A window that rounds to zero is
/// treated as one second so the rate is always defined.
fn per_sec(count: u64, elapsed: Duration) -> u64 {
    let secs = elapsed.as_secs_f64().max(1.0);
    ((count as f64) / secs).floor() as u64
}

/// Nominal throughput in kilobits/sec derived from the message rate and the
/// configured payload size. An estimate, not measured packet bytes.
fn estimated_kbit(rate_per_sec: u64, payload_len: usize) -> u64 {
    rate_per_sec
        .saturating_mul(payload_len as u64)
        .saturating_mul(8)
        / 1000
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencySummary {
    pub count: u64,
    pub mean_us: f64,
    pub p50_us: u64,
    pub p90_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Finalized statistics for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsSnapshot {
    pub sent_messages: u64,
    pub received_messages: u64,
    pub failed_messages: u64,
    pub subscribers: u64,
    pub publishers: u64,
    pub sent_per_sec: u64,
    pub received_per_sec: u64,
    pub cpu_percent: f32,
    pub memory_used_mib: u64,
    pub network_in_kbit: u64,
    pub network_out_kbit: u64,
    pub publish_elapsed: Duration,
    pub publish_latency: Option<LatencySummary>,
}

/// Immutable output of one run.
///
/// `statistics` is `None` exactly when neither pool connected anything
/// (a degraded run, not a hard failure).
#[derive(Debug, Clone)]
pub struct RunReport {
    pub connected: bool,
    pub statistics: Option<StatisticsSnapshot>,
}
