use std::sync::Arc;
use std::time::Duration;

/// Run phases, entered strictly in order. Every phase completes before the
/// next one starts; concurrency lives inside a phase, never across phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Phase {
    Idle,
    ConnectingSubscribers,
    Subscribing,
    ConnectingPublishers,
    Publishing,
    Measuring,
    TearingDown,
    Done,
}

/// Emitted on every phase transition.
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub phase: Phase,
    pub elapsed: Duration,
    pub connected_subscribers: u64,
    pub connected_publishers: u64,
    pub sent: u64,
    pub received: u64,
    pub failed: u64,
}

pub type ProgressFn = Arc<dyn Fn(ProgressUpdate) + Send + Sync>;
