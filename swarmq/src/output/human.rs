use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::OutputFormatter;

pub(crate) struct HumanReadableOutput {
    spinner: ProgressBar,
}

impl HumanReadableOutput {
    pub(crate) fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_draw_target(ProgressDrawTarget::stderr_with_hz(5));
        spinner.set_style(spinner_style());
        spinner.enable_steady_tick(Duration::from_millis(120));

        Self { spinner }
    }
}

impl OutputFormatter for HumanReadableOutput {
    fn progress(&self) -> Option<swarmq_core::ProgressFn> {
        let spinner = self.spinner.clone();
        Some(Arc::new(move |u: swarmq_core::ProgressUpdate| {
            spinner.set_message(format!(
                "{} subs={} pubs={} sent={} recv={} failed={}",
                u.phase,
                u.connected_subscribers,
                u.connected_publishers,
                u.sent,
                u.received,
                u.failed
            ));
        }))
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }

    fn print_report(&self, report: &swarmq_core::RunReport) -> anyhow::Result<()> {
        print!("{}", render(report));
        Ok(())
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn render(report: &swarmq_core::RunReport) -> String {
    let mut out = String::new();

    let Some(s) = &report.statistics else {
        out.push_str("run: nothing connected (degraded)\n");
        out.push_str("  statistics: none\n");
        return out;
    };

    out.push_str("run: connected\n");
    writeln!(
        &mut out,
        "  pools: subscribers={} publishers={}",
        s.subscribers, s.publishers
    )
    .ok();
    writeln!(
        &mut out,
        "  messages: sent {} received {} (failed {})",
        s.sent_messages, s.received_messages, s.failed_messages
    )
    .ok();
    writeln!(
        &mut out,
        "  rates: sent/s={} received/s={}",
        s.sent_per_sec, s.received_per_sec
    )
    .ok();
    writeln!(
        &mut out,
        "  network (estimated): in {}kbit/s out {}kbit/s",
        s.network_in_kbit, s.network_out_kbit
    )
    .ok();
    writeln!(
        &mut out,
        "  resources: cpu {:.1}% memory {}MiB",
        s.cpu_percent, s.memory_used_mib
    )
    .ok();

    match &s.publish_latency {
        Some(h) => {
            writeln!(
                &mut out,
                "  publish latency = p50={} p90={} p99={} mean={} max={} (n={})",
                format_us(h.p50_us),
                format_us(h.p90_us),
                format_us(h.p99_us),
                format_us(h.mean_us.round() as u64),
                format_us(h.max_us),
                h.count
            )
            .ok();
        }
        None => out.push_str("  publish latency: n/a\n"),
    }

    writeln!(
        &mut out,
        "  publish window: {}",
        format_us(u64::try_from(s.publish_elapsed.as_micros()).unwrap_or(u64::MAX))
    )
    .ok();

    out
}

// Renders as a single rounded component in one of: us, ms, s.
fn format_us(us: u64) -> String {
    const US_PER_MS: u64 = 1_000;
    const US_PER_S: u64 = 1_000_000;

    fn round_div(value: u64, unit: u64) -> u64 {
        (value + (unit / 2)) / unit
    }

    if us >= US_PER_S {
        return format!("{}s", round_div(us, US_PER_S));
    }
    if us >= US_PER_MS {
        return format!("{}ms", round_div(us, US_PER_MS));
    }
    format!("{us}us")
}
