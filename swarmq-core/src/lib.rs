mod client;
mod config;
mod driver;
mod error;
mod mqtt;
mod pool;
mod progress;
mod resource;
mod run;
mod stats;

pub use client::{
    BrokerConnector, BrokerSession, ConnectError, Inbound, InboundFn, QosLevel, SessionError,
};
pub use config::{Credentials, RunConfig, normalize_topic_base};
pub use driver::{TRAFFIC_QOS, level_topic};
pub use error::{Error, Result};
pub use mqtt::{MqttConnector, MqttConnectorConfig};
pub use pool::{ConnectionPool, FillOptions, ManagedConnection, Role};
pub use progress::{Phase, ProgressFn, ProgressUpdate};
pub use resource::{ResourceSampler, ResourceUsage, SystemSampler};
pub use run::RunOrchestrator;
pub use stats::{LatencySummary, RunReport, RunStats, StatisticsSnapshot};

#[cfg(test)]
pub(crate) mod testutil;
