//! Offline caching agent.
//!
//! Sits between the application and the network transport as an independent,
//! long-lived task. Per request it decides: pass through, serve from cache,
//! fetch from network, or both (network with cached fallback).
//!
//! Lifecycle: `install` populates the precache generation with the shell
//! manifest (all-or-nothing); `activate` deletes every stale generation and
//! only then starts intercepting. Cache writes on the response path are
//! detached tasks whose failure is logged and never joins the response error
//! channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use crate::http::{CacheKey, Request, RequestClass, Response};
use crate::store::{CacheStore, StoreError};
use crate::transport::{FetchError, Transport};

/// Agent configuration. Generation names carry a literal version suffix that
/// the operator bumps per deploy to force cleanup of stale entries on the
/// next activation.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub precache_generation: String,
    pub runtime_generation: String,
    /// Essential shell assets fetched at install time.
    pub precache_manifest: Vec<String>,
    /// Path prefix marking api-class (network-first) requests.
    pub api_prefix: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            precache_generation: "precache-v1".to_string(),
            runtime_generation: "runtime-v1".to_string(),
            precache_manifest: vec![
                "/".to_string(),
                "/index.html".to_string(),
                "/manifest.json".to_string(),
                "/icons/offline.png".to_string(),
            ],
            api_prefix: "/api".to_string(),
        }
    }
}

/// Commands the application can send to a running agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    /// Delete every cache generation unconditionally, independent of the
    /// install/activate lifecycle.
    #[serde(rename = "CLEAR_CACHE")]
    ClearCache,
}

/// Errors surfaced by agent lifecycle operations and the actor handle.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("precache of {url} failed: {reason}")]
    Precache { url: String, reason: String },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("agent task is gone")]
    ChannelClosed,
}

/// The agent itself. Usually driven through [`spawn`] and [`AgentHandle`];
/// direct method calls exist for single-task embedding and tests.
pub struct OfflineAgent {
    config: AgentConfig,
    store: Arc<dyn CacheStore>,
    transport: Arc<dyn Transport>,
    serving: AtomicBool,
}

impl OfflineAgent {
    pub fn new(
        config: AgentConfig,
        store: Arc<dyn CacheStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self { config, store, transport, serving: AtomicBool::new(false) }
    }

    /// Whether the agent intercepts fetches yet.
    pub fn is_serving(&self) -> bool {
        self.serving.load(Ordering::SeqCst)
    }

    /// Populate the precache generation with every manifest asset.
    ///
    /// All-or-nothing: one failed asset fails the install, and the partially
    /// filled generation is deleted so a failed install leaves no trace.
    pub async fn install(&self) -> Result<(), AgentError> {
        self.store.open().await?;
        for url in &self.config.precache_manifest {
            let request = Request::get(url.clone());
            let outcome = match self.transport.fetch(&request).await {
                Ok(response) if response.is_cacheable() => {
                    self.store
                        .put(&self.config.precache_generation, &request.cache_key(), response)
                        .await
                        .map_err(AgentError::from)
                }
                Ok(response) => Err(AgentError::Precache {
                    url: url.clone(),
                    reason: format!("status {}", response.status),
                }),
                Err(error) => {
                    Err(AgentError::Precache { url: url.clone(), reason: error.to_string() })
                }
            };
            if let Err(error) = outcome {
                let _ = self.store.delete_generation(&self.config.precache_generation).await;
                tracing::warn!(url = %url, %error, "install aborted");
                return Err(error);
            }
        }
        tracing::info!(
            generation = %self.config.precache_generation,
            assets = self.config.precache_manifest.len(),
            "precache installed"
        );
        Ok(())
    }

    /// Delete stale generations, then begin intercepting fetches.
    ///
    /// Cleanup strictly precedes interception: the serving flag flips only
    /// after every stale generation is gone.
    pub async fn activate(&self) -> Result<(), AgentError> {
        for name in self.store.list_generations().await? {
            if name != self.config.precache_generation && name != self.config.runtime_generation {
                self.store.delete_generation(&name).await?;
                tracing::info!(generation = %name, "stale generation deleted");
            }
        }
        self.serving.store(true, Ordering::SeqCst);
        tracing::info!("agent serving");
        Ok(())
    }

    /// Classify a request path.
    pub fn classify(&self, request: &Request) -> RequestClass {
        if request.path().starts_with(&self.config.api_prefix) {
            RequestClass::Api
        } else {
            RequestClass::Static
        }
    }

    /// Route one fetch. Non-GET requests, non-HTTP(S) schemes, and anything
    /// arriving before activation pass through to the transport untouched.
    pub async fn handle_fetch(&self, request: &Request) -> Result<Response, FetchError> {
        if !self.is_serving() || !request.method.is_get() || !request.is_http() {
            return self.transport.fetch(request).await;
        }
        match self.classify(request) {
            RequestClass::Api => Ok(self.network_first(request).await),
            RequestClass::Static => self.cache_first(request).await,
        }
    }

    /// Handle a control command.
    pub async fn handle_message(&self, message: ControlMessage) -> Result<(), AgentError> {
        match message {
            ControlMessage::ClearCache => {
                for name in self.store.list_generations().await? {
                    self.store.delete_generation(&name).await?;
                }
                tracing::info!("all cache generations cleared");
                Ok(())
            }
        }
    }

    /// Network-first policy for api-class requests. Never fails: a network
    /// failure falls back to cache, and a cache miss becomes the synthesized
    /// offline response.
    async fn network_first(&self, request: &Request) -> Response {
        let key = request.cache_key();
        match self.transport.fetch(request).await {
            Ok(response) => {
                if response.is_success() {
                    self.spawn_cache_write(key, response.clone());
                }
                response
            }
            Err(error) => {
                tracing::debug!(url = %request.url, %error, "network failed, trying cache");
                match self.cached_lookup(&key).await {
                    Some(cached) => cached,
                    None => Response::offline(),
                }
            }
        }
    }

    /// Cache-first policy for static-class requests. A miss goes to the
    /// network; a network failure with no cached entry propagates as-is.
    async fn cache_first(&self, request: &Request) -> Result<Response, FetchError> {
        let key = request.cache_key();
        if let Some(cached) = self.cached_lookup(&key).await {
            return Ok(cached);
        }
        let response = self.transport.fetch(request).await?;
        if response.is_cacheable() {
            self.spawn_cache_write(key, response.clone());
        }
        Ok(response)
    }

    /// Look a key up in the runtime generation, then the precache generation.
    /// Read failures degrade to a miss.
    async fn cached_lookup(&self, key: &CacheKey) -> Option<Response> {
        for generation in [&self.config.runtime_generation, &self.config.precache_generation] {
            match self.store.get(generation, key).await {
                Ok(Some(response)) => return Some(response),
                Ok(None) => {}
                Err(error) => {
                    tracing::warn!(%key, generation = %generation, %error, "cache read failed");
                }
            }
        }
        None
    }

    /// Best-effort runtime-generation write, detached from the response path.
    fn spawn_cache_write(&self, key: CacheKey, response: Response) {
        let store = self.store.clone();
        let generation = self.config.runtime_generation.clone();
        tokio::spawn(async move {
            if let Err(error) = store.put(&generation, &key, response).await {
                tracing::warn!(%key, %error, "cache write failed; response already served");
            }
        });
    }
}

/// Signals understood by a spawned agent task.
pub enum AgentSignal {
    Install { reply: oneshot::Sender<Result<(), AgentError>> },
    Activate { reply: oneshot::Sender<Result<(), AgentError>> },
    Fetch { request: Request, reply: oneshot::Sender<Result<Response, FetchError>> },
    Message(ControlMessage),
}

/// Cheap-to-clone handle to a spawned agent task.
#[derive(Clone)]
pub struct AgentHandle {
    signals: mpsc::Sender<AgentSignal>,
}

impl AgentHandle {
    pub async fn install(&self) -> Result<(), AgentError> {
        let (reply, rx) = oneshot::channel();
        self.signals
            .send(AgentSignal::Install { reply })
            .await
            .map_err(|_| AgentError::ChannelClosed)?;
        rx.await.map_err(|_| AgentError::ChannelClosed)?
    }

    pub async fn activate(&self) -> Result<(), AgentError> {
        let (reply, rx) = oneshot::channel();
        self.signals
            .send(AgentSignal::Activate { reply })
            .await
            .map_err(|_| AgentError::ChannelClosed)?;
        rx.await.map_err(|_| AgentError::ChannelClosed)?
    }

    pub async fn fetch(&self, request: Request) -> Result<Response, AgentError> {
        let (reply, rx) = oneshot::channel();
        self.signals
            .send(AgentSignal::Fetch { request, reply })
            .await
            .map_err(|_| AgentError::ChannelClosed)?;
        Ok(rx.await.map_err(|_| AgentError::ChannelClosed)??)
    }

    /// Send a control command. Fire-and-forget; failures are logged by the
    /// agent task.
    pub async fn message(&self, message: ControlMessage) -> Result<(), AgentError> {
        self.signals
            .send(AgentSignal::Message(message))
            .await
            .map_err(|_| AgentError::ChannelClosed)
    }

    pub async fn clear_cache(&self) -> Result<(), AgentError> {
        self.message(ControlMessage::ClearCache).await
    }
}

/// Run the agent as an independent task, returning its handle.
///
/// The task owns all agent state and processes signals sequentially, so no
/// two cache mutations for one generation interleave without an awaited
/// suspension point.
pub fn spawn(agent: OfflineAgent) -> AgentHandle {
    let (signals, mut rx) = mpsc::channel::<AgentSignal>(32);
    tokio::spawn(async move {
        while let Some(signal) = rx.recv().await {
            match signal {
                AgentSignal::Install { reply } => {
                    let _ = reply.send(agent.install().await);
                }
                AgentSignal::Activate { reply } => {
                    let _ = reply.send(agent.activate().await);
                }
                AgentSignal::Fetch { request, reply } => {
                    let _ = reply.send(agent.handle_fetch(&request).await);
                }
                AgentSignal::Message(message) => {
                    if let Err(error) = agent.handle_message(message).await {
                        tracing::warn!(%error, "control message failed");
                    }
                }
            }
        }
        tracing::info!("agent task stopped");
    });
    AgentHandle { signals }
}
