use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use roamkit::{FetchError, Request, Response, Transport};

/// Transport backed by a fixed route table. Can be flipped offline, and
/// counts every fetch so tests can assert on network traffic.
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, Response>>,
    offline: AtomicBool,
    fetches: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            routes: Mutex::new(HashMap::new()),
            offline: AtomicBool::new(false),
            fetches: AtomicUsize::new(0),
        }
    }

    /// A transport already serving the default shell manifest.
    pub fn with_shell() -> Self {
        let transport = Self::new();
        for url in ["/", "/index.html", "/manifest.json", "/icons/offline.png"] {
            transport.route(url, Response::new(200, url.as_bytes().to_vec()));
        }
        transport
    }

    pub fn route(&self, url: &str, response: Response) {
        self.routes.lock().unwrap().insert(url.to_string(), response);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(FetchError::Connection("network unreachable".to_string()));
        }
        Ok(self
            .routes
            .lock()
            .unwrap()
            .get(&request.url)
            .cloned()
            .unwrap_or_else(|| Response::new(404, b"not found".to_vec())))
    }
}

/// Let detached cache-write tasks run to completion.
pub async fn drain_detached_tasks() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}
