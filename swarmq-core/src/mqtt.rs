use std::time::Duration;

use bytes::Bytes;
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, QoS, Transport,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::client::{
    BrokerConnector, BrokerSession, ConnectError, Inbound, InboundFn, QosLevel, SessionError,
};
use crate::config::RunConfig;

#[derive(Debug, Clone)]
pub struct MqttConnectorConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub tls: bool,
    pub keep_alive: Duration,
}

impl From<&RunConfig> for MqttConnectorConfig {
    fn from(cfg: &RunConfig) -> Self {
        Self {
            host: cfg.host.clone(),
            port: cfg.port,
            username: cfg.credentials.username.clone(),
            password: cfg.credentials.password.clone(),
            tls: cfg.tls,
            keep_alive: Duration::from_secs(30),
        }
    }
}

/// Broker-client capability backed by [`rumqttc`].
///
/// Each session owns an MQTT connection plus the background task polling
/// its event loop; that task doubles as the delivery loop feeding inbound
/// publishes into the registered callback.
pub struct MqttConnector {
    cfg: MqttConnectorConfig,
}

impl MqttConnector {
    pub fn new(cfg: MqttConnectorConfig) -> Self {
        Self { cfg }
    }
}

#[derive(Debug, Clone)]
enum AckState {
    Pending,
    Accepted,
    Refused(String),
    Failed(String),
}

impl BrokerConnector for MqttConnector {
    type Session = MqttSession;

    async fn connect(
        &self,
        client_id: &str,
        on_inbound: InboundFn,
    ) -> Result<MqttSession, ConnectError> {
        let mut opts = MqttOptions::new(client_id, self.cfg.host.clone(), self.cfg.port);
        opts.set_credentials(self.cfg.username.clone(), self.cfg.password.clone());
        opts.set_keep_alive(self.cfg.keep_alive);
        if self.cfg.tls {
            opts.set_transport(Transport::tls_with_default_config());
        }

        let (client, event_loop) = AsyncClient::new(opts, 64);
        let (ack_tx, mut ack_rx) = watch::channel(AckState::Pending);
        let delivery = tokio::spawn(delivery_loop(event_loop, ack_tx, on_inbound));

        // The session is not usable until the broker acknowledges the
        // connection; the caller bounds this wait with its own timeout.
        loop {
            match &*ack_rx.borrow_and_update() {
                AckState::Pending => {}
                AckState::Accepted => break,
                AckState::Refused(reason) => {
                    let reason = reason.clone();
                    delivery.abort();
                    return Err(ConnectError::Refused(reason));
                }
                AckState::Failed(reason) => {
                    let reason = reason.clone();
                    delivery.abort();
                    return Err(ConnectError::Transport(reason));
                }
            }

            if ack_rx.changed().await.is_err() {
                delivery.abort();
                return Err(ConnectError::Transport(
                    "connection task exited before acknowledgment".to_string(),
                ));
            }
        }

        Ok(MqttSession { client, delivery })
    }
}

async fn delivery_loop(
    mut event_loop: EventLoop,
    ack: watch::Sender<AckState>,
    on_inbound: InboundFn,
) {
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(conn_ack))) => {
                let state = if conn_ack.code == ConnectReturnCode::Success {
                    AckState::Accepted
                } else {
                    AckState::Refused(format!("{:?}", conn_ack.code))
                };
                let _ = ack.send(state);
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                on_inbound(Inbound {
                    topic: publish.topic.clone(),
                    payload_len: publish.payload.len(),
                });
            }
            Ok(Event::Incoming(Packet::Disconnect)) => break,
            Ok(_) => {}
            Err(err) => {
                // Only matters before the ack; afterwards the session is
                // simply dead and later publishes fail at the client.
                let _ = ack.send(AckState::Failed(err.to_string()));
                break;
            }
        }
    }
}

pub struct MqttSession {
    client: AsyncClient,
    delivery: JoinHandle<()>,
}

impl BrokerSession for MqttSession {
    async fn subscribe(&self, topic: &str, qos: QosLevel) -> Result<(), SessionError> {
        self.client
            .subscribe(topic, map_qos(qos))
            .await
            .map_err(|err| SessionError::Rejected(err.to_string()))
    }

    async fn publish(&self, topic: &str, payload: Bytes, qos: QosLevel) -> Result<(), SessionError> {
        self.client
            .publish(topic, map_qos(qos), false, payload.to_vec())
            .await
            .map_err(|err| SessionError::Rejected(err.to_string()))
    }

    async fn disconnect(&self) {
        let _ = self.client.disconnect().await;
        self.delivery.abort();
    }
}

fn map_qos(qos: QosLevel) -> QoS {
    match qos {
        QosLevel::AtMostOnce => QoS::AtMostOnce,
        QosLevel::AtLeastOnce => QoS::AtLeastOnce,
        QosLevel::ExactlyOnce => QoS::ExactlyOnce,
    }
}
