//! Client-side authentication service
//!
//! Checks credentials against the single built-in operator account, keeps the
//! resulting session (token, user, expiry) in a [`SessionStorage`] and tells
//! subscribers about every login and logout. There is no server-side session:
//! every check is derived from the stored record and the current time.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use thiserror::Error;
use tracing::{error, warn};

/// Storage key of the session token
pub const TOKEN_KEY: &str = "scada_auth_token";
/// Storage key of the serialized user profile
pub const USER_KEY: &str = "scada_auth_user";
/// Storage key of the expiry timestamp (milliseconds since epoch)
pub const EXPIRY_KEY: &str = "scada_token_expiry";

const ADMIN_USERNAME: &str = "admin";
const ADMIN_PASSWORD: &str = "admin123";

/// Session lifetime, from login or refresh
pub const SESSION_TTL_HOURS: i64 = 24;

/// Permission required to change configuration
pub const PERMISSION_EDIT_CONFIG: &str = "edit_config";

/// Authentication errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Login failed: Invalid username or password")]
    InvalidCredentials,

    #[error("No active session")]
    NoActiveSession,
}

/// User roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Operator,
    Viewer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Operator => write!(f, "operator"),
            Role::Viewer => write!(f, "viewer"),
        }
    }
}

/// Login credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// An authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: String,
    pub username: String,
    pub role: Role,
    pub permissions: Vec<String>,
    pub token: String,
    /// Expiry in milliseconds since the Unix epoch
    pub expires_at: i64,
}

impl AuthUser {
    /// Expiry as a timestamp
    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp_millis(self.expires_at)
    }
}

/// The profile part of a user persisted under [`USER_KEY`]
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredProfile {
    id: String,
    username: String,
    role: Role,
    permissions: Vec<String>,
}

/// Snapshot of the authentication state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    pub is_authenticated: bool,
    pub user: Option<AuthUser>,
    pub token: Option<String>,
    pub expires_at: Option<i64>,
}

/// String key/value storage holding the session between runs
pub trait SessionStorage {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> crate::Result<()>;
    fn remove(&mut self, key: &str) -> crate::Result<()>;
}

/// In-memory session storage
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> crate::Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> crate::Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Handle returned by [`AuthService::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn Fn(&AuthState) + Send + Sync>;

/// Authentication service over a session storage
pub struct AuthService<S: SessionStorage> {
    storage: S,
    state: AuthState,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl<S: SessionStorage> AuthService<S> {
    /// Create the service, restoring a stored session if one is still valid.
    pub fn new(storage: S) -> Self {
        let mut service = Self {
            storage,
            state: AuthState::default(),
            listeners: Vec::new(),
            next_subscription: 0,
        };
        service.restore_session();
        service
    }

    /// Access the underlying storage
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Check credentials and start a 24 hour session.
    pub fn login(&mut self, credentials: &Credentials) -> Result<AuthUser, AuthError> {
        if credentials.username != ADMIN_USERNAME || credentials.password != ADMIN_PASSWORD {
            warn!("Rejected login for user '{}'", credentials.username);
            return Err(AuthError::InvalidCredentials);
        }

        let user = AuthUser {
            id: "1".to_string(),
            username: credentials.username.clone(),
            role: Role::Admin,
            permissions: ["view_all", "edit_config", "manage_alarms", "manage_users"]
                .iter()
                .map(|p| p.to_string())
                .collect(),
            token: generate_token(),
            expires_at: session_expiry(Utc::now()),
        };

        self.set_user(user.clone());
        Ok(user)
    }

    /// End the session and notify subscribers.
    pub fn logout(&mut self) {
        self.clear_session();
        self.notify_listeners();
    }

    /// Whether a session is active. An expired session is cleared.
    pub fn is_authenticated(&mut self) -> bool {
        self.is_authenticated_at(Utc::now())
    }

    /// Like [`is_authenticated`](Self::is_authenticated), at a given instant.
    pub fn is_authenticated_at(&mut self, now: DateTime<Utc>) -> bool {
        let expires_at = match (&self.state.token, self.state.expires_at) {
            (Some(_), Some(expires_at)) => expires_at,
            _ => return false,
        };

        if now.timestamp_millis() > expires_at {
            self.clear_session();
            return false;
        }

        true
    }

    /// The user of the active session
    pub fn current_user(&mut self) -> Option<AuthUser> {
        if self.is_authenticated() {
            self.state.user.clone()
        } else {
            None
        }
    }

    /// The token of the active session
    pub fn token(&mut self) -> Option<String> {
        if self.is_authenticated() {
            self.state.token.clone()
        } else {
            None
        }
    }

    /// Whether the active user holds `permission`.
    pub fn has_permission(&mut self, permission: &str) -> bool {
        if !self.is_authenticated() {
            return false;
        }
        self.state
            .user
            .as_ref()
            .is_some_and(|u| u.permissions.iter().any(|p| p == permission))
    }

    /// Whether the active user has `role`.
    pub fn has_role(&mut self, role: Role) -> bool {
        if !self.is_authenticated() {
            return false;
        }
        self.state.user.as_ref().is_some_and(|u| u.role == role)
    }

    /// Snapshot of the current state
    pub fn state(&self) -> AuthState {
        self.state.clone()
    }

    /// Register a listener called on every login, logout and refresh.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&AuthState) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    /// Extend the active session by another 24 hours from now.
    pub fn refresh_token(&mut self) -> Result<AuthUser, AuthError> {
        let mut user = self.state.user.clone().ok_or(AuthError::NoActiveSession)?;
        user.expires_at = session_expiry(Utc::now());
        self.set_user(user.clone());
        Ok(user)
    }

    fn set_user(&mut self, user: AuthUser) {
        self.state = AuthState {
            is_authenticated: true,
            token: Some(user.token.clone()),
            expires_at: Some(user.expires_at),
            user: Some(user.clone()),
        };

        if let Err(e) = self.persist(&user) {
            error!("Failed to persist session: {}", e);
        }

        self.notify_listeners();
    }

    fn persist(&mut self, user: &AuthUser) -> crate::Result<()> {
        let profile = StoredProfile {
            id: user.id.clone(),
            username: user.username.clone(),
            role: user.role,
            permissions: user.permissions.clone(),
        };
        self.storage.set(TOKEN_KEY, &user.token)?;
        self.storage.set(USER_KEY, &serde_json::to_string(&profile)?)?;
        self.storage.set(EXPIRY_KEY, &user.expires_at.to_string())?;
        Ok(())
    }

    fn clear_session(&mut self) {
        self.state = AuthState::default();

        for key in [TOKEN_KEY, USER_KEY, EXPIRY_KEY] {
            if let Err(e) = self.storage.remove(key) {
                error!("Failed to remove '{}' from session storage: {}", key, e);
            }
        }
    }

    fn restore_session(&mut self) {
        let token = self.storage.get(TOKEN_KEY);
        let profile = self.storage.get(USER_KEY);
        let expiry = self.storage.get(EXPIRY_KEY);

        let (token, profile, expiry) = match (token, profile, expiry) {
            (Some(t), Some(p), Some(e)) => (t, p, e),
            _ => return,
        };

        let expires_at = match expiry.trim().parse::<i64>() {
            Ok(v) => v,
            Err(_) => {
                warn!("Discarding session with unreadable expiry '{}'", expiry);
                self.clear_session();
                return;
            }
        };

        if Utc::now().timestamp_millis() >= expires_at {
            self.clear_session();
            return;
        }

        match serde_json::from_str::<StoredProfile>(&profile) {
            Ok(profile) => {
                let user = AuthUser {
                    id: profile.id,
                    username: profile.username,
                    role: profile.role,
                    permissions: profile.permissions,
                    token: token.clone(),
                    expires_at,
                };
                self.state = AuthState {
                    is_authenticated: true,
                    user: Some(user),
                    token: Some(token),
                    expires_at: Some(expires_at),
                };
            }
            Err(e) => {
                warn!("Discarding session with unreadable user profile: {}", e);
                self.clear_session();
            }
        }
    }

    fn notify_listeners(&self) {
        let state = self.state();
        for (_, listener) in &self.listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(&state))).is_err() {
                error!("Auth state listener panicked");
            }
        }
    }
}

fn session_expiry(now: DateTime<Utc>) -> i64 {
    (now + Duration::hours(SESSION_TTL_HOURS)).timestamp_millis()
}

/// `token_{millis}_{7 base36 chars}`
fn generate_token() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..7)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("token_{}_{}", Utc::now().timestamp_millis(), suffix)
}
