use std::io::Write as _;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use super::OutputFormatter;

pub(crate) struct JsonOutput;

impl OutputFormatter for JsonOutput {
    fn progress(&self) -> Option<swarmq_core::ProgressFn> {
        Some(Arc::new(move |u: swarmq_core::ProgressUpdate| {
            emit_json_line(&JsonPhaseLine::from(&u));
        }))
    }

    fn finish(&self) {}

    fn print_report(&self, report: &swarmq_core::RunReport) -> anyhow::Result<()> {
        emit_json_line(&JsonReportLine::from(report));
        Ok(())
    }
}

fn emit_json_line<T: Serialize>(line: &T) {
    if let Ok(s) = serde_json::to_string(line) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{s}");
    }
}

#[derive(Debug, Serialize)]
struct JsonPhaseLine {
    kind: &'static str,
    phase: String,
    elapsed_ms: u64,
    subscribers: u64,
    publishers: u64,
    sent_messages: u64,
    received_messages: u64,
    failed_messages: u64,
}

impl From<&swarmq_core::ProgressUpdate> for JsonPhaseLine {
    fn from(u: &swarmq_core::ProgressUpdate) -> Self {
        Self {
            kind: "phase",
            phase: u.phase.to_string(),
            elapsed_ms: u64::try_from(u.elapsed.as_millis()).unwrap_or(u64::MAX),
            subscribers: u.connected_subscribers,
            publishers: u.connected_publishers,
            sent_messages: u.sent,
            received_messages: u.received,
            failed_messages: u.failed,
        }
    }
}

/// Final line: `{"status": "success"|"fail", "data": {...}}`.
/// A degraded run reports `fail` with an empty statistics map.
#[derive(Debug, Serialize)]
struct JsonReportLine {
    status: &'static str,
    data: JsonReportData,
}

#[derive(Debug, Serialize)]
struct JsonReportData {
    connected: bool,
    #[serde(serialize_with = "empty_object_when_none")]
    statistics: Option<JsonStatistics>,
}

#[derive(Debug, Serialize)]
struct JsonStatistics {
    sent_messages: u64,
    received_messages: u64,
    failed_messages: u64,
    subscribers: u64,
    publishers: u64,
    sent_messages_per_sec: u64,
    received_messages_per_sec: u64,
    cpu_percent: f32,
    memory_used_mib: u64,
    network_in_kbit: u64,
    network_out_kbit: u64,
    publish_elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    publish_latency: Option<JsonLatency>,
}

#[derive(Debug, Serialize)]
struct JsonLatency {
    count: u64,
    mean_us: f64,
    p50_us: u64,
    p90_us: u64,
    p99_us: u64,
    max_us: u64,
}

impl From<&swarmq_core::RunReport> for JsonReportLine {
    fn from(report: &swarmq_core::RunReport) -> Self {
        Self {
            status: if report.connected { "success" } else { "fail" },
            data: JsonReportData {
                connected: report.connected,
                statistics: report.statistics.as_ref().map(JsonStatistics::from),
            },
        }
    }
}

impl From<&swarmq_core::StatisticsSnapshot> for JsonStatistics {
    fn from(s: &swarmq_core::StatisticsSnapshot) -> Self {
        Self {
            sent_messages: s.sent_messages,
            received_messages: s.received_messages,
            failed_messages: s.failed_messages,
            subscribers: s.subscribers,
            publishers: s.publishers,
            sent_messages_per_sec: s.sent_per_sec,
            received_messages_per_sec: s.received_per_sec,
            cpu_percent: s.cpu_percent,
            memory_used_mib: s.memory_used_mib,
            network_in_kbit: s.network_in_kbit,
            network_out_kbit: s.network_out_kbit,
            publish_elapsed_ms: u64::try_from(s.publish_elapsed.as_millis()).unwrap_or(u64::MAX),
            publish_latency: s.publish_latency.as_ref().map(|h| JsonLatency {
                count: h.count,
                mean_us: h.mean_us,
                p50_us: h.p50_us,
                p90_us: h.p90_us,
                p99_us: h.p99_us,
                max_us: h.max_us,
            }),
        }
    }
}

fn empty_object_when_none<S>(v: &Option<JsonStatistics>, ser: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    use serde::ser::SerializeMap as _;

    match v {
        Some(stats) => stats.serialize(ser),
        None => ser.serialize_map(Some(0))?.end(),
    }
}
