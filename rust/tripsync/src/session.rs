//! # Session
//!
//! The authentication context shared by every outgoing request: the bearer
//! token and the signed-in user. It is created once and handed around as an
//! `Arc<Session>`; nothing reads it from a global.
//!
//! ```text
//!  SignedOut --sign_in--> SignedIn --sign_out--> SignedOut
//!                            |
//!                            +------expire (401)--> Expired --sign_in--> SignedIn
//! ```
//!
//! Status changes are broadcast on a `watch` channel so the UI can send the
//! user back to the login view when the session expires.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use itinerary::{AccessToken, User};
use log::{debug, info, warn};
use tokio::sync::watch;

use crate::error::{ClientError, Result};
use crate::store::TripStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    SignedOut,
    SignedIn,
    /// The backend rejected the token; a new sign-in is required
    Expired,
}

#[derive(Debug, Default)]
struct SessionState {
    token: Option<String>,
    user: Option<User>,
}

#[derive(Debug)]
pub struct Session {
    state: RwLock<SessionState>,
    status: watch::Sender<SessionStatus>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A signed-out session.
    pub fn new() -> Self {
        let (status, _) = watch::channel(SessionStatus::SignedOut);
        Self {
            state: RwLock::new(SessionState::default()),
            status,
        }
    }

    /// Resume with a token obtained earlier. The user is loaded lazily by
    /// whoever needs it.
    pub fn with_token(token: impl Into<String>) -> Self {
        let session = Self::new();
        session.write().token = Some(token.into());
        session.status.send_replace(SessionStatus::SignedIn);
        session
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    pub fn is_signed_in(&self) -> bool {
        self.read().token.is_some()
    }

    /// Token for the `Authorization: Bearer` header.
    pub fn bearer(&self) -> Option<String> {
        self.read().token.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.read().user.clone()
    }

    /// Replace the cached profile, e.g. after trips were created or deleted.
    pub fn set_user(&self, user: User) {
        self.write().user = Some(user);
    }

    /// Start a session from a freshly issued token.
    pub fn authenticate(&self, token: AccessToken) {
        {
            let mut state = self.write();
            state.token = Some(token.access_token);
            state.user = None;
        }
        self.status.send_replace(SessionStatus::SignedIn);
    }

    /// Log in and load the profile.
    ///
    /// A profile that cannot be loaded right after login ends the session
    /// again, so a half-initialized session is never left behind. A 401 on
    /// the profile leaves it `Expired` rather than `SignedOut`.
    pub async fn sign_in<S: TripStore>(&self, store: &S, email: &str, password: &str) -> Result<User> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(ClientError::validation("Enter your email and password"));
        }

        let token = store.login(email, password).await?;
        self.authenticate(token);
        debug!("[Session] Signed in");

        match store.current_user().await {
            Ok(user) => {
                self.set_user(user.clone());
                Ok(user)
            }
            Err(e) => {
                warn!("[Session] Profile load after sign-in failed: {}", e);
                if !matches!(e, ClientError::Unauthorized) {
                    self.sign_out();
                }
                Err(e)
            }
        }
    }

    pub fn sign_out(&self) {
        self.clear();
        self.status.send_replace(SessionStatus::SignedOut);
        info!("[Session] Signed out");
    }

    /// The backend answered 401: drop the credentials and tell subscribers.
    pub fn expire(&self) {
        self.clear();
        if self.status.send_replace(SessionStatus::Expired) != SessionStatus::Expired {
            warn!("[Session] Token rejected, session expired");
        }
    }

    fn clear(&self) {
        let mut state = self.write();
        state.token = None;
        state.user = None;
    }
}
