use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::client::{BrokerConnector, BrokerSession, ConnectError, InboundFn};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Subscriber,
    Publisher,
}

/// One broker session owned by a pool.
///
/// Sessions are shared behind `Arc` so traffic tasks can run concurrently
/// while the pool retains ownership for teardown.
#[derive(Debug)]
pub struct ManagedConnection<S> {
    pub client_id: String,
    pub role: Role,
    pub session: Arc<S>,
}

#[derive(Debug, Clone, Copy)]
pub struct FillOptions {
    pub connect_timeout: Duration,
    /// Extra attempts per slot after the first failure.
    pub retries: u32,
    /// Concurrent connect attempts.
    pub concurrency: usize,
}

/// A managed collection of live connections of one role.
#[derive(Debug)]
pub struct ConnectionPool<S> {
    role: Role,
    members: Vec<ManagedConnection<S>>,
}

impl<S: BrokerSession> ConnectionPool<S> {
    /// Attempts exactly `desired` connects (indices `0..desired` for both
    /// roles) and pools the ones that succeed. A slot whose attempts are all
    /// exhausted is skipped: no retry beyond the configured budget, no error
    /// surfaced beyond a stderr note, no effect on already-pooled sessions.
    pub async fn fill<C>(
        role: Role,
        desired: u32,
        connector: Arc<C>,
        opts: FillOptions,
        on_inbound: InboundFn,
    ) -> Self
    where
        C: BrokerConnector<Session = S>,
    {
        let limit = Arc::new(Semaphore::new(opts.concurrency.max(1)));

        let mut handles = Vec::with_capacity(desired as usize);
        for index in 0..desired {
            let client_id = format!("swarmq-{role}-{index}-{}", std::process::id());
            let connector = Arc::clone(&connector);
            let on_inbound = on_inbound.clone();
            let limit = Arc::clone(&limit);

            handles.push(tokio::spawn(async move {
                let Ok(_permit) = limit.acquire().await else {
                    return None;
                };

                match connect_with_retry(connector.as_ref(), &client_id, on_inbound, opts).await {
                    Ok(session) => Some(ManagedConnection {
                        client_id,
                        role,
                        session: Arc::new(session),
                    }),
                    Err(err) => {
                        eprintln!("swarmq: {role} slot {index} gave up connecting: {err}");
                        None
                    }
                }
            }));
        }

        let mut members = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(Some(conn)) => members.push(conn),
                // A panicked connect attempt counts as a failed slot.
                Ok(None) | Err(_) => {}
            }
        }

        Self { role, members }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> &[ManagedConnection<S>] {
        &self.members
    }

    /// Disconnects every pooled session exactly once, concurrently.
    /// Failures are best-effort by contract on [`BrokerSession::disconnect`].
    pub async fn teardown(self) -> Result<()> {
        let mut handles = Vec::with_capacity(self.members.len());
        for conn in self.members {
            handles.push(tokio::spawn(async move {
                conn.session.disconnect().await;
            }));
        }

        for handle in handles {
            handle.await?;
        }

        Ok(())
    }
}

async fn connect_with_retry<C: BrokerConnector>(
    connector: &C,
    client_id: &str,
    on_inbound: InboundFn,
    opts: FillOptions,
) -> std::result::Result<C::Session, ConnectError> {
    let mut backoff = Duration::from_millis(250);
    let mut attempt = 0u32;

    loop {
        let outcome = tokio::time::timeout(
            opts.connect_timeout,
            connector.connect(client_id, on_inbound.clone()),
        )
        .await;

        let err = match outcome {
            Ok(Ok(session)) => return Ok(session),
            Ok(Err(err)) => err,
            Err(_) => ConnectError::Timeout(opts.connect_timeout),
        };

        if attempt >= opts.retries {
            return Err(err);
        }
        attempt += 1;

        tokio::time::sleep(backoff).await;
        backoff = backoff.saturating_mul(2);
    }
}
