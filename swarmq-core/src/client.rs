use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

/// Delivery guarantee tier requested for a publish or subscribe operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum QosLevel {
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

/// An inbound message delivered to a subscribed session.
#[derive(Debug, Clone)]
pub struct Inbound {
    pub topic: String,
    pub payload_len: usize,
}

/// Callback fired by a session's background delivery loop for every inbound
/// message. Fires concurrently across sessions.
pub type InboundFn = Arc<dyn Fn(Inbound) + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("broker refused the connection: {0}")]
    Refused(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("no connection acknowledgment within {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("request was not accepted by the client: {0}")]
    Rejected(String),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
}

/// One authenticated broker connection.
///
/// Wire-level concerns (framing, auth handshake, TLS) live entirely behind
/// this trait. `publish` resolving to `Ok` means the client accepted the
/// message for transmission, not that the broker acknowledged delivery.
pub trait BrokerSession: Send + Sync + 'static {
    fn subscribe(
        &self,
        topic: &str,
        qos: QosLevel,
    ) -> impl Future<Output = std::result::Result<(), SessionError>> + Send;

    fn publish(
        &self,
        topic: &str,
        payload: Bytes,
        qos: QosLevel,
    ) -> impl Future<Output = std::result::Result<(), SessionError>> + Send;

    /// Best effort: stops the background delivery loop and releases the
    /// underlying transport.
    fn disconnect(&self) -> impl Future<Output = ()> + Send;
}

/// Factory for broker sessions. The `on_inbound` callback is registered
/// before the connection is acknowledged so no delivery is lost.
pub trait BrokerConnector: Send + Sync + 'static {
    type Session: BrokerSession;

    fn connect(
        &self,
        client_id: &str,
        on_inbound: InboundFn,
    ) -> impl Future<Output = std::result::Result<Self::Session, ConnectError>> + Send;
}
