//! Shared pooled HTTP client and its lifecycle.
//!
//! A [`ConnectionManager`] is constructed once at startup and handed to the
//! orchestrator. The underlying [`PooledClient`] is built lazily on the first
//! [`ConnectionManager::acquire`], exactly once even under concurrent first
//! use, and is read-only afterwards.
//!
//! `reqwest` pools connections but does not cap how many are open at once, so
//! the pooled client pairs it with a semaphore. A request waits for a permit
//! up to the acquisition timeout and holds it until the body is fully read.

use crate::config::PoolConfig;
use crate::error::ConnectionError;
use reqwest::{RequestBuilder, StatusCode};
use rootcause::prelude::Report;
use serde_json::Value as JsonValue;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{OnceCell, Semaphore};
use tracing::{debug, info};

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: StatusCode,
    pub body: String,
}

impl HttpReply {
    /// Returns true for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Decodes the body as JSON, if it is JSON.
    #[must_use]
    pub fn json(&self) -> Option<JsonValue> {
        serde_json::from_str(&self.body).ok()
    }
}

#[derive(Debug)]
struct PoolInner {
    http: reqwest::Client,
    permits: Semaphore,
    max_connections: u32,
    acquire_timeout: Duration,
}

/// Handle to the process-wide connection pool. Cloning shares the pool.
#[derive(Debug, Clone)]
pub struct PooledClient {
    inner: Arc<PoolInner>,
}

impl PooledClient {
    fn build(config: &PoolConfig) -> Result<Self, ConnectionError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .read_timeout(config.read_timeout())
            // reqwest has no separate write phase timeout; bound the whole exchange instead.
            .timeout(config.write_timeout() + config.read_timeout())
            .pool_max_idle_per_host(config.max_idle_connections)
            .pool_idle_timeout(config.keepalive());
        if let Some(agent) = &config.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        let http = builder.build().map_err(|e| ConnectionError::Build {
            reason: e.to_string(),
        })?;

        Ok(Self {
            inner: Arc::new(PoolInner {
                http,
                permits: Semaphore::new(config.max_connections as usize),
                max_connections: config.max_connections,
                acquire_timeout: config.acquire_timeout(),
            }),
        })
    }

    /// Starts a POST request on the pooled client.
    #[must_use]
    pub fn post(&self, url: &str) -> RequestBuilder {
        self.inner.http.post(url)
    }

    /// Sends a request built from this client and reads the whole body.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::PoolTimeout`] when no slot frees up in time,
    /// [`ConnectionError::Closed`] after shutdown, and timeout/transport/body
    /// errors from the exchange itself. Non-2xx statuses are not errors here.
    pub async fn send(&self, request: RequestBuilder) -> Result<HttpReply, ConnectionError> {
        let acquire_timeout = self.inner.acquire_timeout;
        let _permit = tokio::time::timeout(acquire_timeout, self.inner.permits.acquire())
            .await
            .map_err(|_| ConnectionError::PoolTimeout {
                waited_ms: u64::try_from(acquire_timeout.as_millis()).unwrap_or(u64::MAX),
            })?
            .map_err(|_| ConnectionError::Closed)?;

        let response = request.send().await.map_err(classify_send_error)?;
        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                ConnectionError::Timeout {
                    reason: e.to_string(),
                }
            } else {
                ConnectionError::Body {
                    reason: e.to_string(),
                }
            }
        })?;

        debug!(status = status.as_u16(), bytes = body.len(), "HTTP exchange complete");
        Ok(HttpReply { status, body })
    }

    /// Returns true when both handles refer to the same pool.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of requests currently holding a connection slot.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.inner.max_connections as usize - self.inner.permits.available_permits()
    }

    async fn drain(&self) {
        // Waiting for every permit means every in-flight exchange has finished.
        if let Ok(all) = self.inner.permits.acquire_many(self.inner.max_connections).await {
            self.inner.permits.close();
            drop(all);
        }
    }
}

fn classify_send_error(e: reqwest::Error) -> ConnectionError {
    if e.is_timeout() {
        ConnectionError::Timeout {
            reason: e.to_string(),
        }
    } else {
        ConnectionError::Transport {
            reason: e.to_string(),
        }
    }
}

/// Owns the lazily created [`PooledClient`].
#[derive(Debug)]
pub struct ConnectionManager {
    config: PoolConfig,
    client: OnceCell<PooledClient>,
    closed: AtomicBool,
}

impl ConnectionManager {
    /// Creates a manager. No connection is opened until the first acquire.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::InvalidConfig`] for zero timeouts or limits.
    pub fn new(config: PoolConfig) -> Result<Self, Report<ConnectionError>> {
        config.validate()?;
        Ok(Self {
            config,
            client: OnceCell::new(),
            closed: AtomicBool::new(false),
        })
    }

    /// Runs `body` with a fresh manager and closes it afterwards, whatever
    /// `body` returned.
    ///
    /// # Errors
    ///
    /// Fails only if the manager itself cannot be constructed.
    pub async fn scoped<F, Fut, T>(config: PoolConfig, body: F) -> Result<T, Report<ConnectionError>>
    where
        F: FnOnce(Arc<ConnectionManager>) -> Fut,
        Fut: Future<Output = T>,
    {
        let manager = Arc::new(Self::new(config)?);
        let output = body(Arc::clone(&manager)).await;
        manager.close().await;
        Ok(output)
    }

    /// Returns the shared client, building it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::Closed`] after [`close`](Self::close), or
    /// [`ConnectionError::Build`] if the transport cannot be constructed.
    pub async fn acquire(&self) -> Result<PooledClient, Report<ConnectionError>> {
        if self.is_closed() {
            return Err(ConnectionError::Closed.into());
        }

        let client = self
            .client
            .get_or_try_init(|| async {
                let client = PooledClient::build(&self.config)?;
                info!(
                    connect_timeout_ms = self.config.connect_timeout_ms,
                    read_timeout_ms = self.config.read_timeout_ms,
                    write_timeout_ms = self.config.write_timeout_ms,
                    acquire_timeout_ms = self.config.acquire_timeout_ms,
                    max_connections = self.config.max_connections,
                    max_idle_connections = self.config.max_idle_connections,
                    keepalive_ms = self.config.keepalive_ms,
                    "initialized pooled HTTP client"
                );
                Ok::<_, ConnectionError>(client)
            })
            .await?;

        if self.is_closed() {
            return Err(ConnectionError::Closed.into());
        }
        Ok(client.clone())
    }

    /// Waits for in-flight requests, then releases the pool.
    ///
    /// Safe to call more than once, and a no-op if nothing was ever acquired.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(client) = self.client.get() {
            client.drain().await;
            info!("closed pooled HTTP client");
        }
    }

    /// Returns true once [`close`](Self::close) has started.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Returns true if the pooled client has been built.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.client.initialized()
    }
}
