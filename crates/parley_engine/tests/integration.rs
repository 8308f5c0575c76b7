//! Integration tests for the sync engine against real server handlers.

use parking_lot::Mutex;
use parley_engine::{
    EngineConfig, EngineError, EngineResult, RetryConfig, SyncApi, SyncCoordinator,
};
use parley_model::{
    AuthRequest, AuthResponse, Conversation, EntityKind, PullResponse, PushRequest, PushResponse,
    Syncable,
};
use parley_server::{ServerConfig, StaticVerifier, SyncService};
use parley_store::{delete_record, get_record, upsert_record, EntityStore, MemoryStore};
use parley_testkit::{conversation, group, message};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Routes engine requests straight into the server's handlers.
struct LoopbackApi {
    service: Arc<SyncService>,
    token: Mutex<Option<String>>,
    /// When set, pushes apply server-side but the response is "lost".
    drop_push_response: AtomicBool,
}

impl LoopbackApi {
    fn new(service: Arc<SyncService>) -> Self {
        Self {
            service,
            token: Mutex::new(None),
            drop_push_response: AtomicBool::new(false),
        }
    }

    fn user(&self) -> EngineResult<String> {
        let token = self.token.lock().clone();
        self.service.authorize(token.as_deref()).map_err(to_engine)
    }
}

/// Mirrors the HTTP status mapping of the real transport.
fn to_engine(err: parley_server::ServerError) -> EngineError {
    match &err {
        parley_server::ServerError::Unauthorized(_) => EngineError::Auth(err.to_string()),
        parley_server::ServerError::InvalidRequest(_) => EngineError::Rejected(err.to_string()),
        _ => EngineError::Server(err.to_string()),
    }
}

impl SyncApi for LoopbackApi {
    fn authenticate(&self, request: &AuthRequest) -> EngineResult<AuthResponse> {
        let response = self.service.handle_auth(request).map_err(to_engine)?;
        *self.token.lock() = Some(response.access_token.clone());
        Ok(response)
    }

    fn push(&self, request: &PushRequest) -> EngineResult<PushResponse> {
        let user = self.user()?;
        let response = self.service.handle_push(&user, request).map_err(to_engine)?;
        if self.drop_push_response.load(Ordering::SeqCst) {
            return Err(EngineError::transport_retryable("response lost"));
        }
        Ok(response)
    }

    fn pull(&self, since: i64) -> EngineResult<PullResponse> {
        let user = self.user()?;
        self.service.handle_pull(&user, since).map_err(to_engine)
    }
}

const USER: &str = "user-1";

fn server() -> Arc<SyncService> {
    let verifier = StaticVerifier::new().allow("google-id-1", USER);
    Arc::new(SyncService::new(ServerConfig::default(), Arc::new(verifier)))
}

/// A device: its own local store and coordinator against the shared server.
fn device(
    name: &str,
    service: &Arc<SyncService>,
) -> (Arc<MemoryStore>, SyncCoordinator<LoopbackApi>) {
    let store = Arc::new(MemoryStore::new());
    let api = LoopbackApi::new(Arc::clone(service));
    api.authenticate(&AuthRequest {
        id_token: "google-id-1".into(),
        device_id: name.into(),
    })
    .unwrap();

    let config = EngineConfig::new("loopback://", name).with_retry(RetryConfig::no_retry());
    let coordinator = SyncCoordinator::new(config, api, Arc::clone(&store) as Arc<dyn EntityStore>, USER);
    (store, coordinator)
}

#[test]
fn two_devices_converge_on_higher_version() {
    let service = server();
    let (store_a, coord_a) = device("device-a", &service);
    let (store_b, coord_b) = device("device-b", &service);

    // Independent, offline edits to the same conversation.
    upsert_record(store_a.as_ref(), USER, &conversation("c1", "Hello", 100)).unwrap();
    upsert_record(store_b.as_ref(), USER, &conversation("c1", "World", 200)).unwrap();

    // Push in version order, then let A pick up the winner.
    coord_a.trigger().unwrap().unwrap();
    coord_b.trigger().unwrap().unwrap();
    coord_a.trigger().unwrap().unwrap();

    let a: Conversation = get_record(store_a.as_ref(), USER, "c1").unwrap().unwrap();
    let b: Conversation = get_record(store_b.as_ref(), USER, "c1").unwrap().unwrap();
    assert_eq!(a.title, "World");
    assert_eq!(b.title, "World");
}

#[test]
fn two_devices_converge_with_reversed_push_order() {
    let service = server();
    let (store_a, coord_a) = device("device-a", &service);
    let (store_b, coord_b) = device("device-b", &service);

    upsert_record(store_a.as_ref(), USER, &conversation("c1", "Hello", 100)).unwrap();
    upsert_record(store_b.as_ref(), USER, &conversation("c1", "World", 200)).unwrap();

    // The newer write reaches the server first this time.
    coord_b.trigger().unwrap().unwrap();
    coord_a.trigger().unwrap().unwrap();
    coord_b.trigger().unwrap().unwrap();

    let a: Conversation = get_record(store_a.as_ref(), USER, "c1").unwrap().unwrap();
    let b: Conversation = get_record(store_b.as_ref(), USER, "c1").unwrap().unwrap();
    assert_eq!(a.title, "World");
    assert_eq!(b.title, "World");
}

#[test]
fn stale_update_cannot_resurrect_deleted_conversation() {
    let service = server();
    let (store_a, coord_a) = device("device-a", &service);
    let (store_b, coord_b) = device("device-b", &service);

    // Both devices know the conversation.
    upsert_record(store_a.as_ref(), USER, &conversation("c2", "doomed", 100)).unwrap();
    coord_a.trigger().unwrap().unwrap();
    coord_b.trigger().unwrap().unwrap();

    // A deletes at 300 and pushes; B edits at 250 while offline.
    delete_record(
        store_a.as_ref(),
        USER,
        EntityKind::Conversation,
        "c2",
        300,
        "device-a",
    )
    .unwrap();
    coord_a.trigger().unwrap().unwrap();

    upsert_record(store_b.as_ref(), USER, &conversation("c2", "late edit", 250)).unwrap();
    coord_b.trigger().unwrap().unwrap();

    // The stale edit is dropped everywhere; C2 stays deleted.
    let on_b: Option<Conversation> = get_record(store_b.as_ref(), USER, "c2").unwrap();
    assert!(on_b.is_none());

    let server_view = service.handle_pull(USER, 0).unwrap();
    assert!(server_view.conversations.iter().all(|c| c.id != "c2"));
    assert!(server_view.tombstones.iter().any(|t| t.target_id == "c2"));
}

#[test]
fn update_after_delete_revives_record() {
    let service = server();
    let (store_a, coord_a) = device("device-a", &service);
    let (store_b, coord_b) = device("device-b", &service);

    upsert_record(store_a.as_ref(), USER, &conversation("c3", "first", 100)).unwrap();
    coord_a.trigger().unwrap().unwrap();
    coord_b.trigger().unwrap().unwrap();

    delete_record(
        store_a.as_ref(),
        USER,
        EntityKind::Conversation,
        "c3",
        300,
        "device-a",
    )
    .unwrap();
    coord_a.trigger().unwrap().unwrap();

    // B edits after the delete with a higher clock.
    upsert_record(store_b.as_ref(), USER, &conversation("c3", "revived", 400)).unwrap();
    coord_b.trigger().unwrap().unwrap();
    coord_a.trigger().unwrap().unwrap();

    let a: Conversation = get_record(store_a.as_ref(), USER, "c3").unwrap().unwrap();
    assert_eq!(a.title, "revived");
    assert_eq!(a.version(), 400);
}

#[test]
fn lost_push_response_resend_changes_nothing() {
    let service = server();
    let (store_a, coord_a) = device("device-a", &service);

    upsert_record(store_a.as_ref(), USER, &conversation("c1", "once", 100)).unwrap();
    upsert_record(store_a.as_ref(), USER, &message("m1", "c1", "hi", 110)).unwrap();
    upsert_record(store_a.as_ref(), USER, &group("g1", "work", &["c1"], 120)).unwrap();

    // Server commits the batch but the response never arrives.
    coord_a.api().drop_push_response.store(true, Ordering::SeqCst);
    assert!(coord_a.trigger().is_err());
    assert_eq!(service.store().row_count(USER), 3);

    // Watermark never advanced, so the identical batch is resent.
    coord_a.api().drop_push_response.store(false, Ordering::SeqCst);
    coord_a.trigger().unwrap().unwrap();
    assert_eq!(service.store().row_count(USER), 3);
    assert!(service.store().tombstones_since(USER, 0).unwrap().is_empty());
}

#[test]
fn pull_watermark_only_advances_past_seen_versions() {
    let service = server();
    let (store_a, coord_a) = device("device-a", &service);
    let (store_b, coord_b) = device("device-b", &service);

    upsert_record(store_b.as_ref(), USER, &conversation("c1", "early", 100)).unwrap();
    coord_b.trigger().unwrap().unwrap();
    coord_a.trigger().unwrap().unwrap();

    let clock = store_a.device_clock(USER, "device-a").unwrap().unwrap();
    assert_eq!(clock.last_pull_at, 100);

    // A record committed "concurrently" with A's pull carries a version
    // above the watermark, so the next cycle still sees it.
    upsert_record(store_b.as_ref(), USER, &conversation("c2", "concurrent", 101)).unwrap();
    coord_b.trigger().unwrap().unwrap();
    coord_a.trigger().unwrap().unwrap();

    let c2: Option<Conversation> = get_record(store_a.as_ref(), USER, "c2").unwrap();
    assert!(c2.is_some());
}

#[test]
fn repeat_pull_with_old_watermark_is_a_superset() {
    let service = server();
    let (store_a, coord_a) = device("device-a", &service);

    upsert_record(store_a.as_ref(), USER, &conversation("c1", "a", 100)).unwrap();
    upsert_record(store_a.as_ref(), USER, &message("m1", "c1", "hi", 150)).unwrap();
    coord_a.trigger().unwrap().unwrap();

    let first = service.handle_pull(USER, 0).unwrap();
    upsert_record(store_a.as_ref(), USER, &conversation("c2", "b", 200)).unwrap();
    coord_a.trigger().unwrap().unwrap();
    let second = service.handle_pull(USER, 0).unwrap();

    // Never a different answer for records already seen.
    assert!(second.record_count() >= first.record_count());
    for seen in &first.conversations {
        assert!(second.conversations.iter().any(|c| c.id == seen.id));
    }
}

#[test]
fn full_bidirectional_convergence_across_all_tables() {
    let service = server();
    let (store_a, coord_a) = device("device-a", &service);
    let (store_b, coord_b) = device("device-b", &service);

    upsert_record(store_a.as_ref(), USER, &conversation("c-a", "from a", 100)).unwrap();
    upsert_record(store_a.as_ref(), USER, &message("m-a", "c-a", "hi", 110)).unwrap();
    upsert_record(store_b.as_ref(), USER, &group("g-b", "from b", &["c-a"], 120)).unwrap();

    coord_a.trigger().unwrap().unwrap();
    coord_b.trigger().unwrap().unwrap();
    coord_a.trigger().unwrap().unwrap();

    for store in [&store_a, &store_b] {
        let conv: Option<Conversation> = get_record(store.as_ref(), USER, "c-a").unwrap();
        assert!(conv.is_some());
        let grp: Option<parley_model::Group> = get_record(store.as_ref(), USER, "g-b").unwrap();
        assert!(grp.is_some());
        let msg: Option<parley_model::Message> = get_record(store.as_ref(), USER, "m-a").unwrap();
        assert!(msg.is_some());
    }
}

#[test]
fn sync_without_token_fails_with_auth_error() {
    let service = server();
    let store = Arc::new(MemoryStore::new());
    let api = LoopbackApi::new(Arc::clone(&service));
    // No authenticate call.
    let config = EngineConfig::new("loopback://", "device-x").with_retry(RetryConfig::no_retry());
    let coordinator =
        SyncCoordinator::new(config, api, Arc::clone(&store) as Arc<dyn EntityStore>, USER);

    upsert_record(store.as_ref(), USER, &conversation("c1", "x", 100)).unwrap();
    match coordinator.trigger() {
        Err(EngineError::Auth(_)) => {}
        other => panic!("expected auth error, got {other:?}"),
    }
}

#[test]
fn auth_registers_device_clock_on_first_use() {
    let service = server();
    let api = LoopbackApi::new(Arc::clone(&service));
    api.authenticate(&AuthRequest {
        id_token: "google-id-1".into(),
        device_id: "brand-new-device".into(),
    })
    .unwrap();

    assert!(service
        .store()
        .device_clock(USER, "brand-new-device")
        .unwrap()
        .is_some());
}

/// Token lifetime is honored end to end.
#[test]
fn expired_token_is_rejected() {
    let verifier = StaticVerifier::new().allow("google-id-1", USER);
    let config = ServerConfig::default().with_token_expiry(Duration::from_secs(0));
    let service = Arc::new(SyncService::new(config, Arc::new(verifier)));

    let api = LoopbackApi::new(Arc::clone(&service));
    api.authenticate(&AuthRequest {
        id_token: "google-id-1".into(),
        device_id: "device-a".into(),
    })
    .unwrap();

    std::thread::sleep(Duration::from_millis(10));
    assert!(matches!(api.pull(0), Err(EngineError::Auth(_))));
}
