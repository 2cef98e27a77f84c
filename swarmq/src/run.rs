use anyhow::Context as _;
use bytes::Bytes;

use swarmq_core::{
    Credentials, MqttConnector, MqttConnectorConfig, RunConfig, RunOrchestrator, SystemSampler,
    normalize_topic_base,
};

use crate::cli::RunArgs;
use crate::exit_codes::ExitCode;
use crate::output;

pub async fn run(args: RunArgs) -> anyhow::Result<ExitCode> {
    let out = output::formatter(args.output);
    let cfg = run_config(&args);

    let connector = MqttConnector::new(MqttConnectorConfig::from(&cfg));
    let orchestrator = RunOrchestrator::new(connector, SystemSampler::new());

    let report = orchestrator
        .run(cfg, out.progress())
        .await
        .context("load test run failed")?;

    out.finish();
    out.print_report(&report)?;

    Ok(ExitCode::from_report(&report))
}

/// Intake: clap already produced typed values; what remains is topic
/// normalization and packaging. The engine performs no further validation.
fn run_config(args: &RunArgs) -> RunConfig {
    RunConfig {
        credentials: Credentials {
            username: args.username.clone(),
            password: args.password.clone(),
        },
        host: args.host.clone(),
        port: args.port,
        topic_base: normalize_topic_base(&args.topic),
        publisher_topic_levels: args.publisher_levels,
        subscriber_topic_levels: args.subscriber_levels,
        payload: Bytes::from(args.payload.clone().into_bytes()),
        publishers: args.publishers,
        subscribers: args.subscribers,
        message_delay: args.delay,
        connect_timeout: args.connect_timeout,
        op_timeout: args.op_timeout,
        connect_retries: args.connect_retries,
        fill_concurrency: args.fill_concurrency,
        tls: !args.no_tls,
    }
}
