//! End-to-end offline agent scenarios, driven through the spawned actor the
//! way the hosting application would.

mod common;

use std::sync::Arc;

use common::test_helpers::{drain_detached_tasks, ScriptedTransport};
use roamkit::{
    spawn, AgentConfig, AgentError, CacheStore, ControlMessage, MemoryStore, OfflineAgent,
    Request, Response,
};

async fn running_agent(
    transport: Arc<ScriptedTransport>,
    store: Arc<MemoryStore>,
) -> roamkit::AgentHandle {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let agent = OfflineAgent::new(AgentConfig::default(), store, transport);
    let handle = spawn(agent);
    handle.install().await.expect("install");
    handle.activate().await.expect("activate");
    handle
}

#[tokio::test]
async fn api_response_survives_going_offline() {
    let transport = Arc::new(ScriptedTransport::with_shell());
    transport.route("/api/hotels?city=lisbon", Response::new(200, b"lisbon hotels".to_vec()));
    let store = Arc::new(MemoryStore::new());
    let handle = running_agent(transport.clone(), store.clone()).await;

    // Online: served from the network and stored in the runtime generation.
    let request = Request::get("/api/hotels?city=lisbon");
    let online = handle.fetch(request.clone()).await.unwrap();
    assert_eq!(online.body, b"lisbon hotels");
    drain_detached_tasks().await;
    assert_eq!(
        store.get("runtime-v1", &request.cache_key()).await.unwrap().unwrap().body,
        b"lisbon hotels"
    );

    // Offline: the stored 200 body comes back, not the synthesized 503.
    transport.set_offline(true);
    let offline = handle.fetch(request).await.unwrap();
    assert_eq!(offline.status, 200);
    assert_eq!(offline.body, b"lisbon hotels");
}

#[tokio::test]
async fn api_offline_with_no_cache_returns_structured_503() {
    let transport = Arc::new(ScriptedTransport::with_shell());
    let store = Arc::new(MemoryStore::new());
    let handle = running_agent(transport.clone(), store).await;

    transport.set_offline(true);
    let response = handle.fetch(Request::get("/api/availability")).await.unwrap();

    assert_eq!(response.status, 503);
    let body = response.body_json().unwrap();
    assert_eq!(body["error"], "Offline");
    assert_eq!(body["message"], "No network connection");
}

#[tokio::test]
async fn static_miss_while_offline_propagates_the_failure() {
    let transport = Arc::new(ScriptedTransport::with_shell());
    let store = Arc::new(MemoryStore::new());
    let handle = running_agent(transport.clone(), store).await;

    transport.set_offline(true);
    let result = handle.fetch(Request::get("/static/uncached.css")).await;

    // Cache-first with no cached entry: the transport failure comes through
    // as-is, no synthesized response.
    assert!(matches!(result.unwrap_err(), AgentError::Fetch(_)));
}

#[tokio::test]
async fn precached_shell_serves_while_offline() {
    let transport = Arc::new(ScriptedTransport::with_shell());
    let store = Arc::new(MemoryStore::new());
    let handle = running_agent(transport.clone(), store).await;

    transport.set_offline(true);
    let response = handle.fetch(Request::get("/index.html")).await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.body, b"/index.html");
}

#[tokio::test]
async fn activation_cleans_up_previous_deploy_generations() {
    let transport = Arc::new(ScriptedTransport::with_shell());
    let store = Arc::new(MemoryStore::new());

    // Seed leftovers as if an older agent version had been running.
    store.open().await.unwrap();
    let old_key = Request::get("/old-asset").cache_key();
    store.put("precache-v0", &old_key, Response::new(200, vec![])).await.unwrap();
    store.put("runtime-v0", &old_key, Response::new(200, vec![])).await.unwrap();

    let _handle = running_agent(transport, store.clone()).await;

    let mut generations = store.list_generations().await.unwrap();
    generations.sort();
    assert_eq!(generations, vec!["precache-v1".to_string()]);
}

#[tokio::test]
async fn clear_cache_command_wipes_everything() {
    let transport = Arc::new(ScriptedTransport::with_shell());
    transport.route("/api/deals", Response::new(200, b"deals".to_vec()));
    let store = Arc::new(MemoryStore::new());
    let handle = running_agent(transport.clone(), store.clone()).await;

    let _ = handle.fetch(Request::get("/api/deals")).await.unwrap();
    drain_detached_tasks().await;
    assert!(!store.list_generations().await.unwrap().is_empty());

    // The command arrives as the app would send it: a JSON envelope.
    let message: ControlMessage =
        serde_json::from_str(r#"{"type":"CLEAR_CACHE"}"#).unwrap();
    handle.message(message).await.unwrap();
    drain_detached_tasks().await;

    assert!(store.list_generations().await.unwrap().is_empty());

    // Offline api request after the wipe falls back to the synthesized 503.
    transport.set_offline(true);
    let response = handle.fetch(Request::get("/api/deals")).await.unwrap();
    assert_eq!(response.status, 503);
}

#[tokio::test]
async fn failed_install_leaves_no_precache_generation() {
    let transport = Arc::new(ScriptedTransport::new());
    // Only part of the shell resolves; the icon is missing (404).
    transport.route("/", Response::new(200, vec![]));
    transport.route("/index.html", Response::new(200, vec![]));
    transport.route("/manifest.json", Response::new(200, vec![]));
    let store = Arc::new(MemoryStore::new());
    let handle = spawn(OfflineAgent::new(AgentConfig::default(), store.clone(), transport));

    let err = handle.install().await.unwrap_err();
    assert!(matches!(err, AgentError::Precache { .. }));
    assert_eq!(store.generation_len("precache-v1").await, 0);
}

#[tokio::test]
async fn custom_generation_names_version_the_caches() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.route("/", Response::new(200, vec![]));
    let store = Arc::new(MemoryStore::new());
    let config = AgentConfig {
        precache_generation: "precache-v7".to_string(),
        runtime_generation: "runtime-v7".to_string(),
        precache_manifest: vec!["/".to_string()],
        api_prefix: "/api".to_string(),
    };
    let handle = spawn(OfflineAgent::new(config, store.clone(), transport));
    handle.install().await.unwrap();
    handle.activate().await.unwrap();

    assert_eq!(store.generation_len("precache-v7").await, 1);
}
