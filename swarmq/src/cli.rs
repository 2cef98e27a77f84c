use clap::{Args, Parser, Subcommand};
use std::time::Duration;

fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("duration cannot be empty (expected e.g. 10s, 250ms, 1m)".to_string());
    }

    let number_end = s
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map_or(s.len(), |(idx, _)| idx);

    if number_end == 0 {
        return Err(format!(
            "invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"
        ));
    }

    let (number_str, unit_str) = s.split_at(number_end);
    let value: u64 = number_str
        .parse()
        .map_err(|_| format!("invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"))?;

    match unit_str.trim() {
        "" | "s" | "sec" | "secs" | "second" | "seconds" => Ok(Duration::from_secs(value)),
        "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => {
            Ok(Duration::from_millis(value))
        }
        "m" | "min" | "mins" | "minute" | "minutes" => {
            let secs = value
                .checked_mul(60)
                .ok_or_else(|| format!("duration '{s}' is too large"))?;
            Ok(Duration::from_secs(secs))
        }
        _ => Err(format!(
            "invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"
        )),
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary with a phase spinner on stderr.
    HumanReadable,
    /// Emit JSON lines (NDJSON) to stdout; the final line is the report.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "swarmq",
    author,
    version,
    about = "Load-testing harness for MQTT brokers",
    long_about = "swarmq stresses a publish/subscribe broker: it fills a pool of subscriber \
connections and a pool of publisher connections, fans traffic across a hierarchy of topic \
sub-levels, and reports throughput and resource statistics for the run.",
    after_help = "Examples:\n  swarmq run --host broker.example.com --username bench --password secret \\\n      --topic bench/load --publishers 10 --subscribers 10 --pub-levels 5 --sub-levels 5 \\\n      --payload hello --delay 100ms\n  swarmq run --host 127.0.0.1 --port 1883 --no-tls --username a --password b \\\n      --topic t --payload x --output json"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one load test against a broker
    Run(RunArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Broker hostname or IP
    #[arg(long)]
    pub host: String,

    /// Broker port
    #[arg(long, default_value_t = 8883)]
    pub port: u16,

    #[arg(long)]
    pub username: String,

    #[arg(long)]
    pub password: String,

    /// Base topic path; trailing `/`, `#`, and `+` markers are stripped
    #[arg(long, value_parser = clap::builder::NonEmptyStringValueParser::new())]
    pub topic: String,

    /// Desired publisher connections
    #[arg(long, default_value_t = 1)]
    pub publishers: u32,

    /// Desired subscriber connections
    #[arg(long, default_value_t = 1)]
    pub subscribers: u32,

    /// Topic sub-levels each publisher publishes to
    #[arg(long = "pub-levels", default_value_t = 1)]
    pub publisher_levels: u32,

    /// Topic sub-levels each subscriber subscribes to
    #[arg(long = "sub-levels", default_value_t = 1)]
    pub subscriber_levels: u32,

    /// Message body published to every topic level
    #[arg(long, value_parser = clap::builder::NonEmptyStringValueParser::new())]
    pub payload: String,

    /// Pause between two consecutive publishes of one publisher (e.g. 100ms)
    #[arg(long, value_parser = parse_duration, default_value = "0s")]
    pub delay: Duration,

    /// Bound for a single connect attempt
    #[arg(long, value_parser = parse_duration, default_value = "10s")]
    pub connect_timeout: Duration,

    /// Bound for a single subscribe/publish call
    #[arg(long, value_parser = parse_duration, default_value = "10s")]
    pub op_timeout: Duration,

    /// Extra connect attempts per pool slot after the first failure
    #[arg(long, default_value_t = 2)]
    pub connect_retries: u32,

    /// Concurrent connect attempts while filling a pool
    #[arg(long, default_value_t = 16)]
    pub fill_concurrency: usize,

    /// Connect over plain TCP instead of TLS
    #[arg(long)]
    pub no_tls: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,
}
