//! Mock broker-client capability for unit tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;

use crate::client::{
    BrokerConnector, BrokerSession, ConnectError, Inbound, InboundFn, QosLevel, SessionError,
};

type AttemptPredicate = Box<dyn Fn(u64) -> bool + Send + Sync>;

#[derive(Default)]
pub(crate) struct MockState {
    connect_attempts: AtomicU64,
    subscribe_calls: AtomicU64,
    publish_calls: AtomicU64,
    disconnects: AtomicU64,
    refuse_connect: Mutex<Option<AttemptPredicate>>,
    fail_publish: Mutex<Option<AttemptPredicate>>,
    panic_publish: Mutex<Option<AttemptPredicate>>,
    sinks: Mutex<Vec<InboundFn>>,
}

impl MockState {
    pub(crate) fn connect_attempts(&self) -> u64 {
        self.connect_attempts.load(Ordering::Relaxed)
    }

    pub(crate) fn subscribe_calls(&self) -> u64 {
        self.subscribe_calls.load(Ordering::Relaxed)
    }

    pub(crate) fn publish_calls(&self) -> u64 {
        self.publish_calls.load(Ordering::Relaxed)
    }

    pub(crate) fn disconnects(&self) -> u64 {
        self.disconnects.load(Ordering::Relaxed)
    }

    /// Refuses every connect attempt whose zero-based sequence number
    /// matches the predicate.
    pub(crate) fn refuse_connects_matching<F>(&self, pred: F)
    where
        F: Fn(u64) -> bool + Send + Sync + 'static,
    {
        *lock(&self.refuse_connect) = Some(Box::new(pred));
    }

    /// Rejects every publish whose zero-based sequence number matches.
    pub(crate) fn fail_publishes_matching<F>(&self, pred: F)
    where
        F: Fn(u64) -> bool + Send + Sync + 'static,
    {
        *lock(&self.fail_publish) = Some(Box::new(pred));
    }

    /// Panics inside every publish whose zero-based sequence number
    /// matches, to simulate a traffic task dying mid-phase.
    pub(crate) fn panic_publishes_matching<F>(&self, pred: F)
    where
        F: Fn(u64) -> bool + Send + Sync + 'static,
    {
        *lock(&self.panic_publish) = Some(Box::new(pred));
    }

    /// Pushes `count` inbound messages through every registered session
    /// callback, as the background delivery loops would.
    pub(crate) fn deliver_to_all(&self, count: usize) {
        let sinks = lock(&self.sinks);
        for sink in sinks.iter() {
            for _ in 0..count {
                sink(Inbound {
                    topic: "bench/0/".to_string(),
                    payload_len: 1,
                });
            }
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
pub(crate) struct MockConnector {
    pub(crate) state: Arc<MockState>,
}

pub(crate) struct MockSession {
    state: Arc<MockState>,
}

impl BrokerConnector for MockConnector {
    type Session = MockSession;

    async fn connect(
        &self,
        _client_id: &str,
        on_inbound: InboundFn,
    ) -> Result<MockSession, ConnectError> {
        let attempt = self.state.connect_attempts.fetch_add(1, Ordering::Relaxed);

        let refused = lock(&self.state.refuse_connect)
            .as_ref()
            .is_some_and(|pred| pred(attempt));
        if refused {
            return Err(ConnectError::Refused("not authorized".to_string()));
        }

        lock(&self.state.sinks).push(on_inbound);
        Ok(MockSession {
            state: Arc::clone(&self.state),
        })
    }
}

impl BrokerSession for MockSession {
    async fn subscribe(&self, _topic: &str, _qos: QosLevel) -> Result<(), SessionError> {
        self.state.subscribe_calls.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn publish(
        &self,
        _topic: &str,
        _payload: Bytes,
        _qos: QosLevel,
    ) -> Result<(), SessionError> {
        let call = self.state.publish_calls.fetch_add(1, Ordering::Relaxed);

        let explode = lock(&self.state.panic_publish)
            .as_ref()
            .is_some_and(|pred| pred(call));
        if explode {
            panic!("induced publish failure");
        }

        let rejected = lock(&self.state.fail_publish)
            .as_ref()
            .is_some_and(|pred| pred(call));
        if rejected {
            return Err(SessionError::Rejected("queue full".to_string()));
        }

        Ok(())
    }

    async fn disconnect(&self) {
        self.state.disconnects.fetch_add(1, Ordering::Relaxed);
    }
}

pub(crate) fn noop_inbound() -> InboundFn {
    Arc::new(|_| {})
}
