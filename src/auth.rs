use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    extract::{FromRef, FromRequestParts, Request},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tower_sessions::Session;

use crate::{
    config::AppConfig,
    models::{Role, User},
};

/// Session key under which the logged-in user is stored.
pub const SESSION_USER_KEY: &str = "user";

/// SessionUser
///
/// The copy of the authenticated user kept in the server-side session for the
/// lifetime of the login. The password column is deliberately not part of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: i32,
    pub username: String,
    pub role: Role,
}

impl SessionUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            role: user.role,
        }
    }
}

/// CurrentUser Extractor
///
/// The per-request identity: `Some` when the session holds a user, `None` for
/// anonymous visitors. Never rejects; a broken session reads as anonymous.
/// Handlers pass it on to the view layer so pages can show who is logged in.
#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<SessionUser>);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = match Session::from_request_parts(parts, state).await {
            Ok(session) => session,
            Err((_, reason)) => {
                tracing::warn!("no session attached to request: {}", reason);
                return Ok(CurrentUser(None));
            }
        };

        match session.get::<SessionUser>(SESSION_USER_KEY).await {
            Ok(user) => Ok(CurrentUser(user)),
            Err(e) => {
                tracing::error!("session read failed: {:?}", e);
                Ok(CurrentUser(None))
            }
        }
    }
}

/// AuthUser Extractor
///
/// Resolves to the logged-in user or rejects with a redirect to the login page.
/// Used both directly and through `require_authenticated`.
#[derive(Debug, Clone)]
pub struct AuthUser(pub SessionUser);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state)
            .await
            .unwrap_or_default();

        match user {
            Some(user) => Ok(AuthUser(user)),
            None => {
                let config = AppConfig::from_ref(state);
                tracing::debug!(uri = %parts.uri, "anonymous request redirected to login");
                Err(Redirect::to(&config.path("/login")).into_response())
            }
        }
    }
}

/// AdminUser Extractor
///
/// Like `AuthUser`, and additionally requires the `admin` role. A logged-in
/// non-admin gets the fixed 403 page rather than a redirect.
#[derive(Debug, Clone)]
pub struct AdminUser(pub SessionUser);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;

        if user.is_admin() {
            Ok(AdminUser(user))
        } else {
            let config = AppConfig::from_ref(state);
            tracing::debug!(user = %user.username, uri = %parts.uri, "non-admin refused");
            Err(forbidden(&config))
        }
    }
}

/// The fixed "forbidden" page for role mismatches.
pub fn forbidden(config: &AppConfig) -> Response {
    (
        StatusCode::FORBIDDEN,
        Html(format!(
            r#"Nincs jogosultságod! <a href="{}">Vissza a főoldalra</a>"#,
            config.path("/")
        )),
    )
        .into_response()
}

/// require_authenticated
///
/// Route-layer guard: the `AuthUser` extractor rejects anonymous requests before
/// the handler runs.
pub async fn require_authenticated(_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// require_admin
///
/// Route-layer guard for the admin panel (login first, then role).
pub async fn require_admin(_admin: AdminUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

// --- Passwords ---

/// Hashes a new password with Argon2id and a random salt (PHC string output).
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
}

/// verify_password
///
/// Checks a login attempt against the stored value. PHC strings are verified by
/// Argon2. Anything else is a legacy plain-text row and must match exactly.
pub fn verify_password(candidate: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(candidate.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => candidate == stored,
    }
}
