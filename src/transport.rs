//! The HTTP transport that actually makes requests.
//!
//! Gosling does not speak HTTP itself. The [`Runner`](../runner/struct.Runner.html)
//! hands each [`GoslingRequest`] to a [`Transport`], which reports the size of each
//! body chunk as it streams in through a [`ChunkSender`] and resolves exactly once
//! with a [`Completion`]. [`ReqwestTransport`] is the default implementation.

use async_trait::async_trait;
use std::time::Duration;

use crate::events::RequestHandle;
use crate::request::GoslingRequest;
use crate::{GoslingError, APP_USER_AGENT};

/// Status code recorded for requests that failed without a response, such as a
/// refused connection or a timeout.
pub const TRANSPORT_ERROR_CODE: u16 = 599;

/// How a request ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// The server responded and the body was read to the end.
    Response { status: u16 },
    /// The request failed before a complete response was received.
    Failed { error: String },
}
impl Completion {
    /// The status code to record for this completion.
    pub fn code(&self) -> u16 {
        match self {
            Completion::Response { status } => *status,
            Completion::Failed { .. } => TRANSPORT_ERROR_CODE,
        }
    }
}

/// A received chunk of response body, tagged with the request it belongs to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Chunk {
    pub handle: RequestHandle,
    pub bytes: usize,
}

/// Reports streamed body chunks of one request back to the runner.
#[derive(Debug, Clone)]
pub struct ChunkSender {
    handle: RequestHandle,
    tx: flume::Sender<Chunk>,
}
impl ChunkSender {
    pub fn new(handle: RequestHandle, tx: flume::Sender<Chunk>) -> Self {
        ChunkSender { handle, tx }
    }

    /// Report that `bytes` bytes of the body were received.
    pub fn send(&self, bytes: usize) {
        // The runner is gone if the run already ended, there's nobody left to tell.
        let chunk = Chunk {
            handle: self.handle,
            bytes,
        };
        if self.tx.send(chunk).is_err() {
            trace!("dropped {} byte chunk for {}", bytes, self.handle);
        }
    }
}

/// Makes HTTP requests on behalf of the [`Runner`](../runner/struct.Runner.html).
///
/// Implementations must not retry, and must resolve every call exactly once.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, request: GoslingRequest, chunks: ChunkSender) -> Completion;
}

/// A [`Transport`] built on a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}
impl ReqwestTransport {
    /// Build a client with an idle pool large enough for `concurrency` connections
    /// and an optional per-request timeout.
    pub fn new(concurrency: usize, timeout: Option<Duration>) -> Result<Self, GoslingError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .pool_max_idle_per_host(concurrency);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(ReqwestTransport {
            client: builder.build()?,
        })
    }

    /// Use an already configured client.
    pub fn with_client(client: reqwest::Client) -> Self {
        ReqwestTransport { client }
    }

    fn build(&self, request: GoslingRequest) -> reqwest::RequestBuilder {
        let mut builder = self.client.request(request.method, request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        builder
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn fetch(&self, request: GoslingRequest, chunks: ChunkSender) -> Completion {
        let mut response = match self.build(request).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!("request failed: {}", e);
                return Completion::Failed {
                    error: e.to_string(),
                };
            }
        };
        let status = response.status().as_u16();

        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => chunks.send(chunk.len()),
                Ok(None) => break,
                Err(e) => {
                    debug!("failed to read response body: {}", e);
                    return Completion::Failed {
                        error: e.to_string(),
                    };
                }
            }
        }

        Completion::Response { status }
    }
}
