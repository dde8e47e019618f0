use std::sync::{
    Arc,
    atomic::{AtomicI64, Ordering},
};

use tokio::sync::{Mutex, MutexGuard, broadcast, watch};

use crate::{
    error::AuthError,
    spotify::{AuthorizationFlow, AuthorizationRequest, ProfileSource},
    types::{CallbackParams, Credential, UserProfile},
    utils, warning,
};

use super::TokenStore;

/// Lifecycle states of a [`SessionManager`].
///
/// `Failed` is transient: it is published to subscribers and immediately followed
/// by `Anonymous`.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Anonymous,
    Restoring,
    Authenticated(UserProfile),
    Failed(String),
}

/// Snapshot of the session as seen by the view layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub authenticated: bool,
    pub user: Option<UserProfile>,
}

impl From<&SessionState> for Session {
    fn from(state: &SessionState) -> Self {
        match state {
            SessionState::Authenticated(user) => Session {
                authenticated: true,
                user: Some(user.clone()),
            },
            _ => Session {
                authenticated: false,
                user: None,
            },
        }
    }
}

const EVENT_CAPACITY: usize = 32;

/// Drives the authorization flow and the token store to answer "who is signed in".
///
/// Token-mutating operations (`restore`, `login`, `complete_login`, `refresh`) are
/// mutually exclusive; a second caller is rejected with [`AuthError::SessionBusy`]
/// instead of waiting. Persisting a credential runs on its own task, so dropping
/// the caller's future after the provider answered 2xx still completes the write.
pub struct SessionManager<S, P> {
    flow: AuthorizationFlow,
    store: Arc<S>,
    profiles: P,
    state: watch::Sender<SessionState>,
    events: broadcast::Sender<SessionState>,
    pending_state: Mutex<Option<String>>,
    mutation: Mutex<()>,
    expires_at: AtomicI64,
}

impl<S, P> SessionManager<S, P>
where
    S: TokenStore,
    P: ProfileSource,
{
    pub fn new(flow: AuthorizationFlow, store: Arc<S>, profiles: P) -> Self {
        let (state, _) = watch::channel(SessionState::Restoring);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            flow,
            store,
            profiles,
            state,
            events,
            pending_state: Mutex::new(None),
            mutation: Mutex::new(()),
            expires_at: AtomicI64::new(0),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Snapshot for the view layer.
    ///
    /// Reports unauthenticated as soon as the credential behind the session has
    /// expired. [`state`](Self::state) keeps saying `Authenticated` until the next
    /// [`access_token`](Self::access_token) call refreshes the credential or drops
    /// the session.
    pub fn session(&self) -> Session {
        let state = self.state.borrow();
        if matches!(*state, SessionState::Authenticated(_))
            && utils::now_ms() >= self.expires_at.load(Ordering::Acquire)
        {
            return Session::from(&SessionState::Anonymous);
        }
        Session::from(&*state)
    }

    /// Latest state, updated on every transition.
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Every transition in order, including transient `Failed` states.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionState> {
        self.events.subscribe()
    }

    pub fn flow(&self) -> &AuthorizationFlow {
        &self.flow
    }

    /// Re-establishes a session from the stored credential.
    ///
    /// An absent or expired credential leaves the session anonymous. A credential
    /// whose profile cannot be fetched is cleared from the store.
    pub async fn restore(&self) -> Result<Session, AuthError> {
        let _guard = self.acquire()?;
        self.transition(SessionState::Restoring);

        let credential = match self.store.load().await {
            Ok(Some(c)) if c.is_valid_at(utils::now_ms()) => c,
            Ok(_) => {
                self.transition(SessionState::Anonymous);
                return Ok(self.session());
            }
            Err(e) => {
                warning!("Stored credential unreadable, clearing it: {}", e);
                self.clear_store().await;
                self.transition(SessionState::Anonymous);
                return Ok(self.session());
            }
        };

        match self.profiles.fetch_profile(&credential.access_token).await {
            Ok(user) => {
                self.authenticate(user, credential.expires_at_epoch_ms);
            }
            Err(e) => {
                warning!("Could not restore session: {}", e);
                self.clear_store().await;
                self.transition(SessionState::Anonymous);
            }
        }

        Ok(self.session())
    }

    /// Starts a login by issuing an authorization URL.
    ///
    /// The embedded `state` is remembered until the next [`complete_login`]
    /// consumes it; starting another login replaces it.
    ///
    /// [`complete_login`]: Self::complete_login
    pub async fn begin_login(&self) -> AuthorizationRequest {
        let request = self.flow.build_authorization_url();
        *self.pending_state.lock().await = Some(request.state.clone());
        request
    }

    /// Finishes a login from the provider's callback parameters.
    ///
    /// The callback is validated against the pending `state` before the code is
    /// exchanged; a mismatch never reaches the token endpoint. An established
    /// session is never touched: the call is rejected with
    /// [`AuthError::AlreadyAuthenticated`] and the pending `state` is kept.
    pub async fn complete_login(&self, params: &CallbackParams) -> Result<UserProfile, AuthError> {
        let guard = self.acquire()?;
        self.ensure_signed_out()?;
        let expected = self.pending_state.lock().await.take();

        let code = match AuthorizationFlow::validate_callback(params, expected.as_deref()) {
            Ok(code) => code,
            Err(e) => {
                self.fail(&e);
                return Err(e);
            }
        };

        self.login_locked(&guard, &code).await
    }

    /// Exchanges an already validated authorization code and loads the profile.
    pub async fn login(&self, code: &str) -> Result<UserProfile, AuthError> {
        let guard = self.acquire()?;
        self.ensure_signed_out()?;
        self.login_locked(&guard, code).await
    }

    async fn login_locked(
        &self,
        _guard: &MutexGuard<'_, ()>,
        code: &str,
    ) -> Result<UserProfile, AuthError> {
        let credential = match self.flow.exchange_code_for_tokens(code).await {
            Ok(c) => c,
            Err(e) => {
                self.fail(&e);
                return Err(e);
            }
        };

        let access_token = credential.access_token.clone();
        let expires_at = credential.expires_at_epoch_ms;
        if let Err(e) = self.persist(credential).await {
            self.fail(&e);
            return Err(e);
        }

        match self.profiles.fetch_profile(&access_token).await {
            Ok(user) => {
                self.authenticate(user.clone(), expires_at);
                Ok(user)
            }
            Err(e) => {
                self.clear_store().await;
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Returns a usable access token, refreshing the stored credential first if it
    /// has expired.
    ///
    /// A failed refresh clears the store and drops the session to `Anonymous`.
    pub async fn access_token(&self) -> Result<String, AuthError> {
        if !matches!(self.state(), SessionState::Authenticated(_)) {
            return Err(AuthError::NotAuthenticated);
        }

        match self.load_or_sign_out().await? {
            Some(c) if c.is_valid_at(utils::now_ms()) => Ok(c.access_token),
            Some(_) => self.refresh().await.map(|c| c.access_token),
            None => {
                self.transition(SessionState::Anonymous);
                Err(AuthError::NotAuthenticated)
            }
        }
    }

    /// Replaces the stored credential with a refreshed one.
    pub async fn refresh(&self) -> Result<Credential, AuthError> {
        let _guard = self.acquire()?;

        let Some(current) = self.load_or_sign_out().await? else {
            self.transition(SessionState::Anonymous);
            return Err(AuthError::NotAuthenticated);
        };

        let refreshed = match self.flow.refresh_tokens(&current.refresh_token).await {
            Ok(c) => c,
            Err(e) => {
                warning!("Token refresh failed, signing out: {}", e);
                self.clear_store().await;
                self.transition(SessionState::Anonymous);
                return Err(e);
            }
        };

        if let Err(e) = self.persist(refreshed.clone()).await {
            warning!("Could not store refreshed token, signing out: {}", e);
            self.clear_store().await;
            self.transition(SessionState::Anonymous);
            return Err(e);
        }

        self.expires_at
            .store(refreshed.expires_at_epoch_ms, Ordering::Release);
        Ok(refreshed)
    }

    /// Clears the stored credential and drops to `Anonymous`. Never fails; a store
    /// error is reported and the session is dropped anyway.
    pub async fn logout(&self) {
        let _guard = self.mutation.lock().await;
        self.pending_state.lock().await.take();
        self.clear_store().await;
        self.transition(SessionState::Anonymous);
    }

    fn acquire(&self) -> Result<MutexGuard<'_, ()>, AuthError> {
        self.mutation.try_lock().map_err(|_| AuthError::SessionBusy)
    }

    fn ensure_signed_out(&self) -> Result<(), AuthError> {
        match *self.state.borrow() {
            SessionState::Authenticated(_) => Err(AuthError::AlreadyAuthenticated),
            _ => Ok(()),
        }
    }

    /// Loads the stored credential; an unreadable document is cleared and the
    /// session dropped, the same way `restore` treats it.
    async fn load_or_sign_out(&self) -> Result<Option<Credential>, AuthError> {
        match self.store.load().await {
            Ok(credential) => Ok(credential),
            Err(e) => {
                warning!("Stored credential unreadable, signing out: {}", e);
                self.clear_store().await;
                self.transition(SessionState::Anonymous);
                Err(e)
            }
        }
    }

    async fn persist(&self, credential: Credential) -> Result<(), AuthError> {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move { store.save(&credential).await })
            .await
            .map_err(|e| AuthError::Storage(e.to_string()))?
    }

    async fn clear_store(&self) {
        if let Err(e) = self.store.clear().await {
            warning!("Failed to clear stored credential: {}", e);
        }
    }

    fn fail(&self, err: &AuthError) {
        warning!("Login failed ({}): {}", err.kind(), err);
        self.transition(SessionState::Failed(err.to_string()));
        self.transition(SessionState::Anonymous);
    }

    fn authenticate(&self, user: UserProfile, expires_at: i64) {
        self.expires_at.store(expires_at, Ordering::Release);
        self.transition(SessionState::Authenticated(user));
    }

    fn transition(&self, next: SessionState) {
        self.state.send_replace(next.clone());
        let _ = self.events.send(next);
    }
}
