use std::time::Duration;

use bytes::Bytes;

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Immutable input for one run.
///
/// The orchestrator performs no validation of its own: intake (the CLI, or
/// whatever glue embeds the engine) is expected to hand over typed,
/// validated values. `topic_base` must already be normalized via
/// [`normalize_topic_base`].
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub credentials: Credentials,
    pub host: String,
    pub port: u16,
    pub topic_base: String,
    pub publisher_topic_levels: u32,
    pub subscriber_topic_levels: u32,
    /// Non-empty message body published to every topic level.
    pub payload: Bytes,
    pub publishers: u32,
    pub subscribers: u32,
    /// Pause between two consecutive publishes of one publisher.
    pub message_delay: Duration,
    pub connect_timeout: Duration,
    /// Bound for a single subscribe/publish call.
    pub op_timeout: Duration,
    /// Extra connect attempts per pool slot after the first failure.
    pub connect_retries: u32,
    /// Concurrent connect attempts while filling a pool.
    pub fill_concurrency: usize,
    pub tls: bool,
}

/// Strips trailing level separators and wildcard markers so topics can be
/// fanned out as `<base>/<level>/`.
pub fn normalize_topic_base(raw: &str) -> String {
    raw.trim_end_matches(['/', '#', '+']).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_trailing_separators_and_wildcards() {
        assert_eq!(normalize_topic_base("bench/load/"), "bench/load");
        assert_eq!(normalize_topic_base("bench/load/#"), "bench/load");
        assert_eq!(normalize_topic_base("bench/load/+"), "bench/load");
        assert_eq!(normalize_topic_base("bench/load/#/"), "bench/load");
        assert_eq!(normalize_topic_base("bench/load"), "bench/load");
    }

    #[test]
    fn normalize_leaves_interior_segments_alone() {
        assert_eq!(normalize_topic_base("a/+/b"), "a/+/b");
        assert_eq!(normalize_topic_base("a/#/b"), "a/#/b");
    }
}
