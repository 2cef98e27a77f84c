use std::sync::Arc;
use std::time::Instant;

use crate::client::{BrokerConnector, InboundFn};
use crate::config::RunConfig;
use crate::driver::{publish_all, subscribe_all};
use crate::error::{Error, Result};
use crate::pool::{ConnectionPool, FillOptions, Role};
use crate::progress::{Phase, ProgressFn, ProgressUpdate};
use crate::resource::ResourceSampler;
use crate::stats::{RunReport, RunStats};

/// Composes pool fill, traffic driving, measurement, and teardown into one
/// run: connect subscribers, subscribe, connect publishers, publish,
/// measure, disconnect everything, report.
pub struct RunOrchestrator<C, R> {
    connector: Arc<C>,
    sampler: R,
}

impl<C, R> RunOrchestrator<C, R>
where
    C: BrokerConnector,
    R: ResourceSampler,
{
    pub fn new(connector: C, sampler: R) -> Self {
        Self {
            connector: Arc::new(connector),
            sampler,
        }
    }

    pub async fn run(mut self, cfg: RunConfig, progress: Option<ProgressFn>) -> Result<RunReport> {
        let stats = Arc::new(RunStats::default());
        let run_started = Instant::now();

        let emit = |phase: Phase| {
            if let Some(progress) = &progress {
                progress(ProgressUpdate {
                    phase,
                    elapsed: run_started.elapsed(),
                    connected_subscribers: stats.connected_subscribers(),
                    connected_publishers: stats.connected_publishers(),
                    sent: stats.sent(),
                    received: stats.received(),
                    failed: stats.failed(),
                });
            }
        };

        let fill_opts = FillOptions {
            connect_timeout: cfg.connect_timeout,
            retries: cfg.connect_retries,
            concurrency: cfg.fill_concurrency,
        };

        // Deliveries from any session land in one shared counter; inbound
        // traffic is deliberately not attributed to individual subscribers.
        let on_inbound: InboundFn = {
            let stats = Arc::clone(&stats);
            Arc::new(move |_inbound| stats.record_received())
        };

        emit(Phase::Idle);

        emit(Phase::ConnectingSubscribers);
        let sub_pool = ConnectionPool::fill(
            Role::Subscriber,
            cfg.subscribers,
            Arc::clone(&self.connector),
            fill_opts,
            on_inbound.clone(),
        )
        .await;
        stats.set_connected_subscribers(sub_pool.len() as u64);

        emit(Phase::Subscribing);
        let mut first_err: Option<Error> = subscribe_all(&sub_pool, &cfg, &stats).await.err();

        emit(Phase::ConnectingPublishers);
        let pub_pool = ConnectionPool::fill(
            Role::Publisher,
            cfg.publishers,
            Arc::clone(&self.connector),
            fill_opts,
            on_inbound,
        )
        .await;
        stats.set_connected_publishers(pub_pool.len() as u64);

        emit(Phase::Publishing);
        let publish_started = Instant::now();
        if first_err.is_none() {
            first_err = publish_all(&pub_pool, &cfg, &stats).await.err();
        }
        let publish_elapsed = publish_started.elapsed();

        // The accumulator is finalized here and only here; all
        // traffic-generating phases are over.
        emit(Phase::Measuring);
        let connected = !sub_pool.is_empty() || !pub_pool.is_empty();
        let statistics = (first_err.is_none() && connected).then(|| {
            stats.finalize(publish_elapsed, cfg.payload.len(), self.sampler.sample())
        });

        // Teardown runs on every exit path, over every pooled session.
        emit(Phase::TearingDown);
        if let Err(err) = sub_pool.teardown().await {
            eprintln!("swarmq: subscriber teardown: {err}");
        }
        if let Err(err) = pub_pool.teardown().await {
            eprintln!("swarmq: publisher teardown: {err}");
        }

        emit(Phase::Done);

        if let Some(err) = first_err {
            return Err(err);
        }

        Ok(RunReport {
            connected,
            statistics,
        })
    }
}
