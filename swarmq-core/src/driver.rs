use std::sync::Arc;
use std::time::Instant;

use crate::client::{BrokerSession, QosLevel};
use crate::config::RunConfig;
use crate::error::Result;
use crate::pool::ConnectionPool;
use crate::stats::RunStats;

/// All traffic runs at QoS 1.
pub const TRAFFIC_QOS: QosLevel = QosLevel::AtLeastOnce;

/// Topic for one sub-level under the normalized base path.
pub fn level_topic(base: &str, level: u32) -> String {
    format!("{base}/{level}/")
}

/// Subscribe phase: every pooled subscriber subscribes to all configured
/// sub-levels, subscribers running concurrently, no delay between calls.
/// A failed subscribe is counted and noted; the run continues.
pub async fn subscribe_all<S: BrokerSession>(
    pool: &ConnectionPool<S>,
    cfg: &RunConfig,
    stats: &Arc<RunStats>,
) -> Result<()> {
    let mut handles = Vec::with_capacity(pool.len());
    for conn in pool.members() {
        let session = Arc::clone(&conn.session);
        let client_id = conn.client_id.clone();
        let stats = Arc::clone(stats);
        let base = cfg.topic_base.clone();
        let levels = cfg.subscriber_topic_levels;
        let op_timeout = cfg.op_timeout;

        handles.push(tokio::spawn(async move {
            for level in 0..levels {
                let topic = level_topic(&base, level);
                let outcome =
                    tokio::time::timeout(op_timeout, session.subscribe(&topic, TRAFFIC_QOS)).await;

                match outcome {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        stats.record_subscribe_failure();
                        eprintln!("swarmq: {client_id}: subscribe {topic} failed: {err}");
                    }
                    Err(_) => {
                        stats.record_subscribe_failure();
                        eprintln!("swarmq: {client_id}: subscribe {topic} timed out");
                    }
                }
            }
        }));
    }

    for handle in handles {
        handle.await?;
    }

    Ok(())
}

/// Publish phase: every pooled publisher publishes the payload to all
/// configured sub-levels. Publishers run concurrently, each pacing its own
/// publishes with the configured delay; the last publish of a publisher is
/// not followed by a wait.
///
/// An accepted publish increments `sent` and records call latency; a
/// rejected or timed-out one increments `failed`.
pub async fn publish_all<S: BrokerSession>(
    pool: &ConnectionPool<S>,
    cfg: &RunConfig,
    stats: &Arc<RunStats>,
) -> Result<()> {
    let mut handles = Vec::with_capacity(pool.len());
    for conn in pool.members() {
        let session = Arc::clone(&conn.session);
        let stats = Arc::clone(stats);
        let base = cfg.topic_base.clone();
        let payload = cfg.payload.clone();
        let levels = cfg.publisher_topic_levels;
        let op_timeout = cfg.op_timeout;
        let delay = cfg.message_delay;

        handles.push(tokio::spawn(async move {
            for level in 0..levels {
                let topic = level_topic(&base, level);
                let started = Instant::now();
                let outcome = tokio::time::timeout(
                    op_timeout,
                    session.publish(&topic, payload.clone(), TRAFFIC_QOS),
                )
                .await;

                match outcome {
                    Ok(Ok(())) => {
                        stats.record_publish_latency(started.elapsed());
                        stats.record_sent();
                    }
                    Ok(Err(_)) | Err(_) => stats.record_failed(),
                }

                if !delay.is_zero() && level + 1 < levels {
                    tokio::time::sleep(delay).await;
                }
            }
        }));
    }

    for handle in handles {
        handle.await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::InboundFn;
    use crate::config::Credentials;
    use crate::pool::{ConnectionPool, FillOptions, Role};
    use crate::testutil::{MockConnector, MockState, noop_inbound};
    use bytes::Bytes;
    use std::time::Duration;

    fn config(pub_levels: u32, sub_levels: u32, delay: Duration) -> RunConfig {
        RunConfig {
            credentials: Credentials {
                username: "bench".to_string(),
                password: "secret".to_string(),
            },
            host: "localhost".to_string(),
            port: 1883,
            topic_base: "bench/load".to_string(),
            publisher_topic_levels: pub_levels,
            subscriber_topic_levels: sub_levels,
            payload: Bytes::from_static(b"x"),
            publishers: 0,
            subscribers: 0,
            message_delay: delay,
            connect_timeout: Duration::from_secs(5),
            op_timeout: Duration::from_secs(5),
            connect_retries: 0,
            fill_concurrency: 8,
            tls: false,
        }
    }

    async fn pool_of(
        role: Role,
        size: u32,
        connector: &Arc<MockConnector>,
        on_inbound: InboundFn,
    ) -> ConnectionPool<crate::testutil::MockSession> {
        ConnectionPool::fill(
            role,
            size,
            Arc::clone(connector),
            FillOptions {
                connect_timeout: Duration::from_secs(5),
                retries: 0,
                concurrency: 8,
            },
            on_inbound,
        )
        .await
    }

    #[test]
    fn level_topics_are_slash_delimited_with_a_trailing_separator() {
        assert_eq!(level_topic("bench/load", 0), "bench/load/0/");
        assert_eq!(level_topic("bench/load", 12), "bench/load/12/");
    }

    #[tokio::test]
    async fn subscribe_calls_fan_out_over_connected_subscribers_and_levels() {
        let connector = Arc::new(MockConnector::default());
        let pool = pool_of(Role::Subscriber, 3, &connector, noop_inbound()).await;
        let stats = Arc::new(RunStats::default());

        let cfg = config(0, 4, Duration::ZERO);
        match subscribe_all(&pool, &cfg, &stats).await {
            Ok(()) => {}
            Err(err) => panic!("subscribe phase failed: {err}"),
        }

        assert_eq!(connector.state.subscribe_calls(), 3 * 4);
    }

    #[tokio::test]
    async fn every_publish_attempt_is_classified_as_sent_or_failed() {
        let connector = Arc::new(MockConnector::default());
        // Reject every third publish.
        connector.state.fail_publishes_matching(|n| n % 3 == 2);

        let pool = pool_of(Role::Publisher, 2, &connector, noop_inbound()).await;
        let stats = Arc::new(RunStats::default());

        let cfg = config(3, 0, Duration::ZERO);
        match publish_all(&pool, &cfg, &stats).await {
            Ok(()) => {}
            Err(err) => panic!("publish phase failed: {err}"),
        }

        assert_eq!(connector.state.publish_calls(), 2 * 3);
        assert_eq!(stats.sent() + stats.failed(), 6);
        assert_eq!(stats.failed(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn delay_applies_between_publishes_but_not_after_the_last() {
        let connector = Arc::new(MockConnector::default());
        let pool = pool_of(Role::Publisher, 2, &connector, noop_inbound()).await;
        let stats = Arc::new(RunStats::default());

        let cfg = config(3, 0, Duration::from_millis(100));
        let started = tokio::time::Instant::now();
        match publish_all(&pool, &cfg, &stats).await {
            Ok(()) => {}
            Err(err) => panic!("publish phase failed: {err}"),
        }

        // 3 publishes per publisher => 2 gaps, publishers paced independently.
        assert_eq!(started.elapsed(), Duration::from_millis(200));
        assert_eq!(stats.sent(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_delay_injects_no_wait() {
        let connector = Arc::new(MockConnector::default());
        let pool = pool_of(Role::Publisher, 1, &connector, noop_inbound()).await;
        let stats = Arc::new(RunStats::default());

        let cfg = config(5, 0, Duration::ZERO);
        let started = tokio::time::Instant::now();
        match publish_all(&pool, &cfg, &stats).await {
            Ok(()) => {}
            Err(err) => panic!("publish phase failed: {err}"),
        }

        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(stats.sent(), 5);
    }

    #[tokio::test]
    async fn inbound_deliveries_land_in_the_shared_received_counter() {
        let connector = Arc::new(MockConnector::default());
        let stats = Arc::new(RunStats::default());

        let sink: InboundFn = {
            let stats = Arc::clone(&stats);
            Arc::new(move |_| stats.record_received())
        };
        let _pool = pool_of(Role::Subscriber, 2, &connector, sink).await;

        let state: &MockState = &connector.state;
        state.deliver_to_all(7);

        // One global counter: deliveries are not attributed per subscriber.
        assert_eq!(stats.received(), 14);
    }
}
