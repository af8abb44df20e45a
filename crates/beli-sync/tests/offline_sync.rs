//! End-to-end offline scenarios through the assembled engine.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use beli_core::{
    MutationKind, NetworkEvent, NetworkType, Payload, PersistedQueue, Provider, ProviderMode,
};
use beli_sync::{
    FallbackOptions, FileStore, KeyValueStore, MemoryStore, RemoteSettings, SyncConfig, SyncEngine,
    SyncError,
};

fn wifi() -> NetworkEvent {
    NetworkEvent::new(true, NetworkType::Wifi)
}

fn follow(target: &str) -> Payload {
    json!({ "userId": "u-alex", "targetUserId": target })
        .as_object()
        .cloned()
        .unwrap()
}

/// Engine with no remote configured; replay does not depend on it.
async fn local_engine(store: Arc<dyn KeyValueStore>) -> SyncEngine {
    SyncEngine::builder(SyncConfig::default())
        .with_store(store)
        .build()
        .await
        .unwrap()
}

async fn engine_for(server: &MockServer, store: Arc<dyn KeyValueStore>) -> SyncEngine {
    let mut config = SyncConfig::default();
    config.remote = RemoteSettings::new(server.uri(), "anon-key");

    SyncEngine::builder(config)
        .with_store(store)
        .build()
        .await
        .unwrap()
}

async fn healthy_remote() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/rest/v1/"))
        .and(header("apikey", "anon-key"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn offline_reads_use_local_data_without_probing() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let engine = engine_for(&server, Arc::new(MemoryStore::new())).await;
    engine.monitor().update(NetworkEvent::disconnected());

    assert_eq!(engine.resolver().resolve_provider().await, Provider::Local);

    let fetched = engine
        .executor()
        .with_fallback(
            || async { Err::<Vec<&str>, _>(SyncError::Http("unreachable".into())) },
            || async { vec!["Carbone", "Lilia"] },
            FallbackOptions::named("getRestaurants"),
        )
        .await;

    assert_eq!(fetched.provider, Provider::Local);
    assert_eq!(fetched.data, vec!["Carbone", "Lilia"]);
}

#[tokio::test]
async fn successful_probe_is_cached() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/rest/v1/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let engine = engine_for(&server, Arc::new(MemoryStore::new())).await;
    engine.monitor().update(wifi());

    assert_eq!(engine.resolver().resolve_provider().await, Provider::Remote);
    assert_eq!(engine.resolver().resolve_provider().await, Provider::Remote);

    let status = engine.provider_status().await;
    assert_eq!(status.configured, ProviderMode::Auto);
    assert_eq!(status.active, Provider::Remote);
    assert_eq!(status.remote_url, Some(server.uri()));
}

#[tokio::test]
async fn primary_failure_routes_later_calls_locally() {
    let server = healthy_remote().await;
    let engine = engine_for(&server, Arc::new(MemoryStore::new())).await;
    engine.monitor().update(wifi());

    let fallbacks = AtomicUsize::new(0);
    let hook = |_: &(dyn std::error::Error + 'static)| {
        fallbacks.fetch_add(1, Ordering::SeqCst);
    };

    let first = engine
        .executor()
        .with_fallback(
            || async { Err::<u32, _>(SyncError::Http("500".into())) },
            || async { 1 },
            FallbackOptions::named("getFeed").on_fallback(&hook),
        )
        .await;
    assert_eq!(first.provider, Provider::Local);
    assert_eq!(fallbacks.load(Ordering::SeqCst), 1);

    let primary_calls = AtomicUsize::new(0);
    let calls = &primary_calls;
    let second = engine
        .executor()
        .with_fallback(
            || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, SyncError>(2)
            },
            || async { 3 },
            FallbackOptions::named("getFeed"),
        )
        .await;

    assert_eq!(second.provider, Provider::Local);
    assert_eq!(second.data, 3);
    assert_eq!(primary_calls.load(Ordering::SeqCst), 0);

    // Probed once for the first call only
    let requests = server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn queued_write_drains_after_reconnect() {
    let engine = local_engine(Arc::new(MemoryStore::new())).await;
    engine.monitor().update(NetworkEvent::disconnected());

    let applied = Arc::new(AtomicUsize::new(0));
    let counter = applied.clone();
    engine
        .queue()
        .register_handler(MutationKind::FollowUser, move |payload: Payload| {
            let counter = counter.clone();
            async move {
                assert_eq!(payload["targetUserId"], "u-sam");
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, SyncError>(())
            }
        });

    let _listener = engine.start().unwrap();
    engine.queue().enqueue(MutationKind::FollowUser, follow("u-sam")).await;
    assert_eq!(engine.network_status().await.pending_mutations, 1);

    engine.monitor().update(wifi());

    // Still settling
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(applied.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(applied.load(Ordering::SeqCst), 1);

    let status = engine.sync_status().await;
    assert_eq!(status.pending_count, 0);
    assert!(status.last_sync_at.is_some());
}

#[tokio::test(start_paused = true)]
async fn reconnect_that_drops_again_does_not_drain() {
    let engine = local_engine(Arc::new(MemoryStore::new())).await;
    engine.monitor().update(NetworkEvent::disconnected());
    engine
        .queue()
        .register_handler(MutationKind::MarkBeen, |_p: Payload| async { Ok::<_, SyncError>(()) });

    let _listener = engine.start().unwrap();
    engine.queue().enqueue(MutationKind::MarkBeen, Payload::new()).await;

    engine.monitor().update(wifi());
    engine.monitor().update(NetworkEvent::disconnected());
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(engine.queue().pending_count().await, 1);
}

#[tokio::test(start_paused = true)]
async fn pending_writes_drain_at_startup() {
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());

    {
        let engine = local_engine(store.clone()).await;
        engine.monitor().update(NetworkEvent::disconnected());
        engine.queue().enqueue(MutationKind::LikeActivity, Payload::new()).await;
        engine.queue().enqueue(MutationKind::AddToList, Payload::new()).await;
    }

    let engine = local_engine(store.clone()).await;
    assert_eq!(engine.queue().pending_count().await, 2);

    let applied = Arc::new(AtomicUsize::new(0));
    for kind in [MutationKind::LikeActivity, MutationKind::AddToList] {
        let counter = applied.clone();
        engine.queue().register_handler(kind, move |_p: Payload| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, SyncError>(())
            }
        });
    }

    engine.monitor().update(wifi());
    let _listener = engine.start().unwrap();

    tokio::time::sleep(Duration::from_millis(2_100)).await;
    assert_eq!(applied.load(Ordering::SeqCst), 2);

    let raw = store.get("beli-sync-store").await.unwrap().unwrap();
    let persisted: PersistedQueue = serde_json::from_str(&raw).unwrap();
    assert!(persisted.pending_mutations.is_empty());
    assert!(persisted.last_sync_at.is_some());
}

#[tokio::test(start_paused = true)]
async fn failing_mutation_is_dropped_after_three_attempts() {
    let store = Arc::new(MemoryStore::new());
    let engine = local_engine(store.clone()).await;
    engine.monitor().update(wifi());

    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    engine
        .queue()
        .register_handler(MutationKind::AddReview, move |_p: Payload| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(SyncError::handler("restaurant not found"))
            }
        });
    engine.queue().enqueue(MutationKind::AddReview, Payload::new()).await;
    let keeper = engine.queue().enqueue(MutationKind::CreateList, Payload::new()).await;

    for _ in 0..3 {
        engine.queue().trigger_sync().await;
    }

    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    let pending = engine.queue().pending().await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, keeper);

    let raw = store.get("beli-sync-store").await.unwrap().unwrap();
    let persisted: PersistedQueue = serde_json::from_str(&raw).unwrap();
    assert_eq!(persisted.pending_mutations.len(), 1);
}

#[tokio::test]
async fn file_backed_queue_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    let id = {
        let store = Arc::new(FileStore::open(dir.path()).await.unwrap());
        let engine = local_engine(store).await;
        engine.monitor().update(NetworkEvent::disconnected());
        engine
            .queue()
            .enqueue(MutationKind::UnbookmarkPost, json!({"postId": "post-9"}).as_object().cloned().unwrap())
            .await
    };

    let store = Arc::new(FileStore::open(dir.path()).await.unwrap());
    let engine = local_engine(store).await;
    let pending = engine.queue().mutations_by_kind(MutationKind::UnbookmarkPost).await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, id);
    assert_eq!(pending[0].payload["postId"], "post-9");
}
