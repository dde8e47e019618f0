use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{
    Form, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    routing::{get, post},
};
use moodgroov::{
    config::ProviderConfig,
    error::AuthError,
    management::{FileTokenStore, MemoryTokenStore, SessionManager, SessionState, TokenStore},
    spotify::{AuthorizationFlow, SpotifyProfileClient},
    types::{CallbackParams, Credential},
    utils,
};
use reqwest::Url;
use serde_json::json;
use tokio::{net::TcpListener, sync::broadcast};

#[derive(Clone)]
struct Behavior {
    exchange_status: StatusCode,
    refresh_status: StatusCode,
    profile_status: StatusCode,
    rotate_refresh_token: bool,
    token_delay: Duration,
    profile_delay: Duration,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            exchange_status: StatusCode::OK,
            refresh_status: StatusCode::OK,
            profile_status: StatusCode::OK,
            rotate_refresh_token: false,
            token_delay: Duration::ZERO,
            profile_delay: Duration::ZERO,
        }
    }
}

#[derive(Clone)]
struct MockState {
    behavior: Behavior,
    token_calls: Arc<AtomicUsize>,
    profile_calls: Arc<AtomicUsize>,
    token_requests: Arc<Mutex<Vec<(Option<String>, HashMap<String, String>)>>>,
}

struct MockProvider {
    base: String,
    state: MockState,
}

impl MockProvider {
    fn token_calls(&self) -> usize {
        self.state.token_calls.load(Ordering::SeqCst)
    }

    fn profile_calls(&self) -> usize {
        self.state.profile_calls.load(Ordering::SeqCst)
    }

    fn token_requests(&self) -> Vec<(Option<String>, HashMap<String, String>)> {
        self.state.token_requests.lock().unwrap().clone()
    }

    fn config(&self) -> ProviderConfig {
        ProviderConfig::new("client-id", "client-secret", "http://127.0.0.1:3000/callback")
            .unwrap()
            .with_auth_url(Url::parse(&format!("{}/authorize", self.base)).unwrap())
            .with_token_url(Url::parse(&format!("{}/api/token", self.base)).unwrap())
            .with_api_url(Url::parse(&format!("{}/v1", self.base)).unwrap())
    }
}

async fn token_handler(
    State(state): State<MockState>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> (StatusCode, String) {
    state.token_calls.fetch_add(1, Ordering::SeqCst);
    let auth = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state
        .token_requests
        .lock()
        .unwrap()
        .push((auth, form.clone()));

    tokio::time::sleep(state.behavior.token_delay).await;

    match form.get("grant_type").map(String::as_str) {
        Some("authorization_code") if state.behavior.exchange_status == StatusCode::OK => (
            StatusCode::OK,
            json!({
                "access_token": "access-1",
                "token_type": "Bearer",
                "expires_in": 3600,
                "refresh_token": "refresh-1",
                "scope": "user-read-private",
            })
            .to_string(),
        ),
        Some("authorization_code") => (
            state.behavior.exchange_status,
            json!({ "error": "invalid_grant" }).to_string(),
        ),
        Some("refresh_token") if state.behavior.refresh_status == StatusCode::OK => {
            let mut body = json!({
                "access_token": "access-2",
                "token_type": "Bearer",
                "expires_in": 3600,
            });
            if state.behavior.rotate_refresh_token {
                body["refresh_token"] = json!("refresh-2");
            }
            (StatusCode::OK, body.to_string())
        }
        Some("refresh_token") => (
            state.behavior.refresh_status,
            json!({ "error": "invalid_grant" }).to_string(),
        ),
        _ => (StatusCode::BAD_REQUEST, "unsupported grant".to_string()),
    }
}

async fn me_handler(State(state): State<MockState>, headers: HeaderMap) -> (StatusCode, String) {
    state.profile_calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(state.behavior.profile_delay).await;

    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !bearer.starts_with("Bearer access-") || state.behavior.profile_status != StatusCode::OK {
        let status = if state.behavior.profile_status == StatusCode::OK {
            StatusCode::UNAUTHORIZED
        } else {
            state.behavior.profile_status
        };
        return (status, json!({ "error": "invalid token" }).to_string());
    }

    (
        StatusCode::OK,
        json!({
            "id": "user-1",
            "display_name": "Test Listener",
            "email": "listener@example.com",
            "country": "DE",
            "images": [{ "url": "https://img.example.com/a.jpg", "height": 64, "width": 64 }],
            "followers": { "total": 42 },
            "product": "premium",
        })
        .to_string(),
    )
}

async fn spawn_provider(behavior: Behavior) -> MockProvider {
    let state = MockState {
        behavior,
        token_calls: Arc::new(AtomicUsize::new(0)),
        profile_calls: Arc::new(AtomicUsize::new(0)),
        token_requests: Arc::new(Mutex::new(Vec::new())),
    };

    let app = Router::new()
        .route("/api/token", post(token_handler))
        .route("/v1/me", get(me_handler))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockProvider {
        base: format!("http://{addr}"),
        state,
    }
}

fn session_for<S: TokenStore>(
    config: ProviderConfig,
    store: Arc<S>,
) -> SessionManager<S, SpotifyProfileClient> {
    let profiles = SpotifyProfileClient::new(&config).unwrap();
    let flow = AuthorizationFlow::new(config).unwrap();
    SessionManager::new(flow, store, profiles)
}

fn credential(suffix: &str, expires_at_epoch_ms: i64) -> Credential {
    Credential {
        access_token: format!("access-{suffix}"),
        refresh_token: format!("refresh-{suffix}"),
        expires_at_epoch_ms,
        token_type: "Bearer".to_string(),
    }
}

fn valid_credential(suffix: &str) -> Credential {
    credential(suffix, utils::now_ms() + 3_600_000)
}

fn expired_credential(suffix: &str) -> Credential {
    credential(suffix, utils::now_ms() - 1_000)
}

fn callback(code: Option<&str>, error: Option<&str>, state: Option<&str>) -> CallbackParams {
    CallbackParams {
        code: code.map(str::to_string),
        error: error.map(str::to_string),
        state: state.map(str::to_string),
    }
}

fn drain(rx: &mut broadcast::Receiver<SessionState>) -> Vec<SessionState> {
    let mut events = Vec::new();
    while let Ok(state) = rx.try_recv() {
        events.push(state);
    }
    events
}

#[tokio::test]
async fn test_initial_state_is_restoring() {
    let provider = spawn_provider(Behavior::default()).await;
    let session = session_for(provider.config(), Arc::new(MemoryTokenStore::new()));

    assert_eq!(session.state(), SessionState::Restoring);
    assert!(!session.session().authenticated);
}

#[tokio::test]
async fn test_restore_without_credential_is_anonymous() {
    let provider = spawn_provider(Behavior::default()).await;
    let session = session_for(provider.config(), Arc::new(MemoryTokenStore::new()));

    let restored = session.restore().await.unwrap();

    assert!(!restored.authenticated);
    assert_eq!(session.state(), SessionState::Anonymous);
    assert_eq!(provider.profile_calls(), 0);
}

#[tokio::test]
async fn test_restore_with_expired_credential_is_anonymous() {
    let provider = spawn_provider(Behavior::default()).await;
    let store = Arc::new(MemoryTokenStore::with_credential(expired_credential("old")));
    let session = session_for(provider.config(), Arc::clone(&store));

    let restored = session.restore().await.unwrap();

    assert!(!restored.authenticated);
    assert_eq!(session.state(), SessionState::Anonymous);
    assert_eq!(provider.profile_calls(), 0);
    assert!(matches!(
        session.access_token().await,
        Err(AuthError::NotAuthenticated)
    ));
    assert_eq!(provider.token_calls(), 0);
}

#[tokio::test]
async fn test_restore_with_valid_credential_authenticates() {
    let provider = spawn_provider(Behavior::default()).await;
    let store = Arc::new(MemoryTokenStore::with_credential(valid_credential("1")));
    let session = session_for(provider.config(), store);

    let restored = session.restore().await.unwrap();

    assert!(restored.authenticated);
    let user = restored.user.unwrap();
    assert_eq!(user.id, "user-1");
    assert_eq!(user.display_name, "Test Listener");
    assert_eq!(user.image_urls, vec!["https://img.example.com/a.jpg"]);
    assert_eq!(user.follower_count, Some(42));
    assert_eq!(user.product_tier.as_deref(), Some("premium"));
    assert!(matches!(session.state(), SessionState::Authenticated(_)));
}

#[tokio::test]
async fn test_restore_profile_failure_clears_store() {
    let provider = spawn_provider(Behavior {
        profile_status: StatusCode::UNAUTHORIZED,
        ..Default::default()
    })
    .await;
    let store = Arc::new(MemoryTokenStore::with_credential(valid_credential("1")));
    let session = session_for(provider.config(), Arc::clone(&store));

    let restored = session.restore().await.unwrap();

    assert!(!restored.authenticated);
    assert_eq!(session.state(), SessionState::Anonymous);
    assert_eq!(store.load().await.unwrap(), None);
}

#[tokio::test]
async fn test_login_end_to_end() {
    let provider = spawn_provider(Behavior::default()).await;
    let store = Arc::new(MemoryTokenStore::new());
    let session = session_for(provider.config(), Arc::clone(&store));
    let mut events = session.subscribe();

    let request = session.begin_login().await;
    let user = session
        .complete_login(&callback(Some("abc123"), None, Some(&request.state)))
        .await
        .unwrap();

    assert_eq!(user.id, "user-1");
    assert_eq!(session.state(), SessionState::Authenticated(user.clone()));
    assert!(session.session().authenticated);
    assert_eq!(drain(&mut events), vec![SessionState::Authenticated(user)]);

    let stored = store.load().await.unwrap().unwrap();
    assert_eq!(stored.access_token, "access-1");
    assert_eq!(stored.refresh_token, "refresh-1");
    assert_eq!(stored.token_type, "Bearer");
    assert!(stored.is_valid_at(utils::now_ms()));

    let requests = provider.token_requests();
    assert_eq!(requests.len(), 1);
    let (auth, form) = &requests[0];
    assert_eq!(
        auth.as_deref(),
        Some(utils::basic_auth_header("client-id", "client-secret").as_str())
    );
    assert_eq!(form["grant_type"], "authorization_code");
    assert_eq!(form["code"], "abc123");
    assert_eq!(form["redirect_uri"], "http://127.0.0.1:3000/callback");

    assert_eq!(session.access_token().await.unwrap(), "access-1");
}

#[tokio::test]
async fn test_login_user_denied() {
    let provider = spawn_provider(Behavior::default()).await;
    let store = Arc::new(MemoryTokenStore::new());
    let session = session_for(provider.config(), Arc::clone(&store));
    let mut events = session.subscribe();

    let request = session.begin_login().await;
    let result = session
        .complete_login(&callback(None, Some("access_denied"), Some(&request.state)))
        .await;

    assert!(matches!(result, Err(AuthError::UserDenied(ref r)) if r == "access_denied"));
    assert_eq!(session.state(), SessionState::Anonymous);
    assert_eq!(store.load().await.unwrap(), None);
    assert_eq!(provider.token_calls(), 0);

    let events = drain(&mut events);
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], SessionState::Failed(_)));
    assert_eq!(events[1], SessionState::Anonymous);
}

#[tokio::test]
async fn test_login_state_mismatch_never_reaches_token_endpoint() {
    let provider = spawn_provider(Behavior::default()).await;
    let store = Arc::new(MemoryTokenStore::new());
    let session = session_for(provider.config(), Arc::clone(&store));

    let _request = session.begin_login().await;
    let result = session
        .complete_login(&callback(Some("abc123"), None, Some("forged-state")))
        .await;

    assert!(matches!(result, Err(AuthError::StateMismatch)));
    assert_eq!(provider.token_calls(), 0);
    assert_eq!(session.state(), SessionState::Anonymous);
    assert_eq!(store.load().await.unwrap(), None);
}

#[tokio::test]
async fn test_login_state_is_single_use() {
    let provider = spawn_provider(Behavior::default()).await;
    let session = session_for(provider.config(), Arc::new(MemoryTokenStore::new()));

    let request = session.begin_login().await;
    let denied = session
        .complete_login(&callback(None, Some("access_denied"), Some(&request.state)))
        .await;
    assert!(matches!(denied, Err(AuthError::UserDenied(_))));

    // The state was spent on the denied callback
    let replay = session
        .complete_login(&callback(Some("abc123"), None, Some(&request.state)))
        .await;
    assert!(matches!(replay, Err(AuthError::StateMismatch)));
    assert_eq!(provider.token_calls(), 0);
}

#[tokio::test]
async fn test_forged_callback_keeps_established_session() {
    let provider = spawn_provider(Behavior::default()).await;
    let stored = valid_credential("1");
    let store = Arc::new(MemoryTokenStore::with_credential(stored.clone()));
    let session = session_for(provider.config(), Arc::clone(&store));
    session.restore().await.unwrap();
    let mut events = session.subscribe();

    let result = session
        .complete_login(&callback(Some("evil"), None, Some("forged")))
        .await;

    assert!(matches!(result, Err(AuthError::AlreadyAuthenticated)));
    assert_eq!(provider.token_calls(), 0);
    assert!(drain(&mut events).is_empty());
    assert!(matches!(session.state(), SessionState::Authenticated(_)));
    assert!(session.session().authenticated);
    assert_eq!(store.load().await.unwrap(), Some(stored));
    assert_eq!(session.access_token().await.unwrap(), "access-1");
}

#[tokio::test]
async fn test_login_while_authenticated_is_rejected() {
    let provider = spawn_provider(Behavior::default()).await;
    let store = Arc::new(MemoryTokenStore::new());
    let session = session_for(provider.config(), Arc::clone(&store));

    let request = session.begin_login().await;
    session
        .complete_login(&callback(Some("abc123"), None, Some(&request.state)))
        .await
        .unwrap();

    let second = session.login("other-code").await;
    assert!(matches!(second, Err(AuthError::AlreadyAuthenticated)));
    assert_eq!(provider.token_calls(), 1);
    assert!(matches!(session.state(), SessionState::Authenticated(_)));
    assert_eq!(
        store.load().await.unwrap().unwrap().access_token,
        "access-1"
    );

    // The same callback replayed after logout finds no pending state
    session.logout().await;
    let replay = session
        .complete_login(&callback(Some("abc123"), None, Some(&request.state)))
        .await;
    assert!(matches!(replay, Err(AuthError::StateMismatch)));
    assert_eq!(provider.token_calls(), 1);
}

#[tokio::test]
async fn test_complete_login_without_begin_is_rejected() {
    let provider = spawn_provider(Behavior::default()).await;
    let session = session_for(provider.config(), Arc::new(MemoryTokenStore::new()));

    let result = session
        .complete_login(&callback(Some("abc123"), None, Some("anything")))
        .await;

    assert!(matches!(result, Err(AuthError::StateMismatch)));
    assert_eq!(provider.token_calls(), 0);
}

#[tokio::test]
async fn test_login_exchange_failure() {
    let provider = spawn_provider(Behavior {
        exchange_status: StatusCode::BAD_REQUEST,
        ..Default::default()
    })
    .await;
    let store = Arc::new(MemoryTokenStore::new());
    let session = session_for(provider.config(), Arc::clone(&store));

    let result = session.login("abc123").await;

    match result {
        Err(AuthError::TokenExchangeFailed { status, body }) => {
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(body.contains("invalid_grant"));
        }
        other => panic!("expected TokenExchangeFailed, got {:?}", other),
    }
    assert_eq!(session.state(), SessionState::Anonymous);
    assert_eq!(store.load().await.unwrap(), None);
    assert_eq!(provider.profile_calls(), 0);
}

#[tokio::test]
async fn test_login_profile_failure_clears_store() {
    let provider = spawn_provider(Behavior {
        profile_status: StatusCode::FORBIDDEN,
        ..Default::default()
    })
    .await;
    let store = Arc::new(MemoryTokenStore::new());
    let session = session_for(provider.config(), Arc::clone(&store));

    let result = session.login("abc123").await;

    assert!(matches!(
        result,
        Err(AuthError::ProfileFetchFailed { status, .. }) if status == StatusCode::FORBIDDEN
    ));
    assert_eq!(session.state(), SessionState::Anonymous);
    assert_eq!(store.load().await.unwrap(), None);
}

#[tokio::test]
async fn test_expired_credential_refresh_keeps_refresh_token() {
    let provider = spawn_provider(Behavior::default()).await;
    let store = Arc::new(MemoryTokenStore::with_credential(valid_credential("1")));
    let session = session_for(provider.config(), Arc::clone(&store));
    session.restore().await.unwrap();

    store.save(&expired_credential("old")).await.unwrap();
    let token = session.access_token().await.unwrap();

    assert_eq!(token, "access-2");
    let stored = store.load().await.unwrap().unwrap();
    assert_eq!(stored.access_token, "access-2");
    assert_eq!(stored.refresh_token, "refresh-old");
    assert!(stored.is_valid_at(utils::now_ms()));
    assert!(matches!(session.state(), SessionState::Authenticated(_)));

    let requests = provider.token_requests();
    let (_, form) = requests.last().unwrap();
    assert_eq!(form["grant_type"], "refresh_token");
    assert_eq!(form["refresh_token"], "refresh-old");
}

#[tokio::test]
async fn test_expired_credential_refresh_rotates_refresh_token() {
    let provider = spawn_provider(Behavior {
        rotate_refresh_token: true,
        ..Default::default()
    })
    .await;
    let store = Arc::new(MemoryTokenStore::with_credential(valid_credential("1")));
    let session = session_for(provider.config(), Arc::clone(&store));
    session.restore().await.unwrap();

    store.save(&expired_credential("old")).await.unwrap();
    session.access_token().await.unwrap();

    let stored = store.load().await.unwrap().unwrap();
    assert_eq!(stored.refresh_token, "refresh-2");
}

#[tokio::test]
async fn test_refresh_failure_forces_anonymous() {
    let provider = spawn_provider(Behavior {
        refresh_status: StatusCode::BAD_REQUEST,
        ..Default::default()
    })
    .await;
    let store = Arc::new(MemoryTokenStore::with_credential(valid_credential("1")));
    let session = session_for(provider.config(), Arc::clone(&store));
    session.restore().await.unwrap();

    store.save(&expired_credential("old")).await.unwrap();
    let result = session.access_token().await;

    assert!(matches!(
        result,
        Err(AuthError::RefreshFailed { status, .. }) if status == StatusCode::BAD_REQUEST
    ));
    assert_eq!(session.state(), SessionState::Anonymous);
    assert_eq!(store.load().await.unwrap(), None);
}

#[tokio::test]
async fn test_logout_clears_store() {
    let provider = spawn_provider(Behavior::default()).await;
    let store = Arc::new(MemoryTokenStore::with_credential(valid_credential("1")));
    let session = session_for(provider.config(), Arc::clone(&store));
    session.restore().await.unwrap();

    session.logout().await;

    assert_eq!(session.state(), SessionState::Anonymous);
    assert_eq!(store.load().await.unwrap(), None);
    assert!(matches!(
        session.access_token().await,
        Err(AuthError::NotAuthenticated)
    ));
}

#[tokio::test]
async fn test_concurrent_token_mutation_is_rejected() {
    let provider = spawn_provider(Behavior {
        token_delay: Duration::from_millis(300),
        ..Default::default()
    })
    .await;
    let session = session_for(provider.config(), Arc::new(MemoryTokenStore::new()));

    let (login, second) = tokio::join!(session.login("abc123"), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        session.login("def456").await
    });

    assert!(login.is_ok());
    assert!(matches!(second, Err(AuthError::SessionBusy)));
    assert_eq!(provider.token_calls(), 1);
}

#[tokio::test]
async fn test_cancelled_login_keeps_saved_credential() {
    let provider = spawn_provider(Behavior {
        profile_delay: Duration::from_millis(500),
        ..Default::default()
    })
    .await;
    let store = Arc::new(MemoryTokenStore::new());
    let session = session_for(provider.config(), Arc::clone(&store));

    // Give up while the profile is still loading
    let cancelled = tokio::time::timeout(Duration::from_millis(200), session.login("abc123")).await;
    assert!(cancelled.is_err());

    let stored = store.load().await.unwrap().unwrap();
    assert_eq!(stored.access_token, "access-1");
    assert_eq!(stored.refresh_token, "refresh-1");
}

#[tokio::test]
async fn test_request_timeout_is_network_error() {
    let provider = spawn_provider(Behavior {
        token_delay: Duration::from_secs(2),
        ..Default::default()
    })
    .await;
    let config = provider
        .config()
        .with_request_timeout(Duration::from_millis(100));
    let store = Arc::new(MemoryTokenStore::new());
    let session = session_for(config, Arc::clone(&store));

    let result = session.login("abc123").await;

    match result {
        Err(e @ AuthError::Network(_)) => assert!(e.is_retryable()),
        other => panic!("expected Network, got {:?}", other),
    }
    assert_eq!(session.state(), SessionState::Anonymous);
    assert_eq!(store.load().await.unwrap(), None);
}

#[tokio::test]
async fn test_session_reports_expired_credential_before_refresh() {
    let provider = spawn_provider(Behavior::default()).await;
    let store = Arc::new(MemoryTokenStore::with_credential(credential(
        "1",
        utils::now_ms() + 300,
    )));
    let session = session_for(provider.config(), Arc::clone(&store));
    assert!(session.restore().await.unwrap().authenticated);

    tokio::time::sleep(Duration::from_millis(400)).await;

    let snapshot = session.session();
    assert!(!snapshot.authenticated);
    assert_eq!(snapshot.user, None);
    assert!(matches!(session.state(), SessionState::Authenticated(_)));

    assert_eq!(session.access_token().await.unwrap(), "access-2");
    assert!(session.session().authenticated);
}

#[tokio::test]
async fn test_refresh_with_unreadable_store_signs_out() {
    let provider = spawn_provider(Behavior::default()).await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("token.json");
    let store = Arc::new(FileTokenStore::new(&path));
    store.save(&valid_credential("1")).await.unwrap();
    let session = session_for(provider.config(), Arc::clone(&store));
    session.restore().await.unwrap();

    std::fs::write(&path, "{\"access_token\": \"half").unwrap();
    let result = session.refresh().await;

    assert!(matches!(result, Err(AuthError::Storage(_))));
    assert_eq!(session.state(), SessionState::Anonymous);
    assert!(!path.exists());
    assert_eq!(provider.token_calls(), 0);
}

#[tokio::test]
async fn test_access_token_with_unreadable_store_signs_out() {
    let provider = spawn_provider(Behavior::default()).await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("token.json");
    let store = Arc::new(FileTokenStore::new(&path));
    store.save(&valid_credential("1")).await.unwrap();
    let session = session_for(provider.config(), Arc::clone(&store));
    session.restore().await.unwrap();

    std::fs::write(&path, "not json").unwrap();
    let result = session.access_token().await;

    assert!(matches!(result, Err(AuthError::Storage(_))));
    assert_eq!(session.state(), SessionState::Anonymous);
    assert!(!session.session().authenticated);
    assert!(!path.exists());
}
