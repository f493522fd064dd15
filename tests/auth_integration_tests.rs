use axum::{
    body::to_bytes,
    extract::FromRequestParts,
    http::{Request, StatusCode, header, request::Parts},
    response::Response,
};
use lotto_portal::{
    AppConfig,
    auth::{
        AdminUser, AuthUser, CurrentUser, SESSION_USER_KEY, SessionUser, forbidden,
        hash_password, verify_password,
    },
    models::{Role, User},
};
use std::sync::Arc;
use tower_sessions::{MemoryStore, Session};

// --- Test Utilities ---

fn session() -> Session {
    Session::new(None, Arc::new(MemoryStore::default()), None)
}

/// Request parts for `uri`, optionally carrying a session the way the
/// session layer would attach it.
fn parts_with(uri: &str, session: Option<Session>) -> Parts {
    let (mut parts, _) = Request::builder()
        .uri(uri)
        .body(())
        .unwrap()
        .into_parts();
    if let Some(session) = session {
        parts.extensions.insert(session);
    }
    parts
}

async fn session_with(user: &SessionUser) -> Session {
    let session = session();
    session.insert(SESSION_USER_KEY, user).await.unwrap();
    session
}

fn admin() -> SessionUser {
    SessionUser {
        id: 1,
        username: "root".to_string(),
        role: Role::Admin,
    }
}

fn visitor() -> SessionUser {
    SessionUser {
        id: 2,
        username: "guest".to_string(),
        role: Role::Visitor,
    }
}

async fn body_of(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// --- CurrentUser ---

#[tokio::test]
async fn test_current_user_without_session_layer_is_anonymous() {
    let mut parts = parts_with("/", None);
    let CurrentUser(user) = CurrentUser::from_request_parts(&mut parts, &())
        .await
        .unwrap();
    assert!(user.is_none());
}

#[tokio::test]
async fn test_current_user_with_empty_session_is_anonymous() {
    let mut parts = parts_with("/", Some(session()));
    let CurrentUser(user) = CurrentUser::from_request_parts(&mut parts, &())
        .await
        .unwrap();
    assert!(user.is_none());
}

#[tokio::test]
async fn test_current_user_reads_session_user() {
    let mut parts = parts_with("/", Some(session_with(&visitor()).await));
    let CurrentUser(user) = CurrentUser::from_request_parts(&mut parts, &())
        .await
        .unwrap();
    assert_eq!(user, Some(visitor()));
}

#[tokio::test]
async fn test_current_user_with_malformed_session_value_is_anonymous() {
    let session = session();
    session.insert(SESSION_USER_KEY, 42).await.unwrap();
    let mut parts = parts_with("/", Some(session));

    let CurrentUser(user) = CurrentUser::from_request_parts(&mut parts, &())
        .await
        .unwrap();
    assert!(user.is_none());
}

// --- AuthUser ---

#[tokio::test]
async fn test_auth_user_redirects_anonymous_to_login() {
    let config = AppConfig::default();
    let mut parts = parts_with("/uzenetek", Some(session()));

    let rejection = AuthUser::from_request_parts(&mut parts, &config)
        .await
        .unwrap_err();
    assert_eq!(rejection.status(), StatusCode::SEE_OTHER);
    assert_eq!(rejection.headers()[header::LOCATION], "/login");
}

#[tokio::test]
async fn test_auth_user_redirect_honours_base_path() {
    let config = AppConfig {
        base_path: "/lotto".to_string(),
        ..AppConfig::default()
    };
    let mut parts = parts_with("/lotto/uzenetek", None);

    let rejection = AuthUser::from_request_parts(&mut parts, &config)
        .await
        .unwrap_err();
    assert_eq!(rejection.headers()[header::LOCATION], "/lotto/login");
}

#[tokio::test]
async fn test_auth_user_accepts_any_role() {
    let config = AppConfig::default();
    for user in [admin(), visitor()] {
        let mut parts = parts_with("/uzenetek", Some(session_with(&user).await));
        let AuthUser(found) = AuthUser::from_request_parts(&mut parts, &config)
            .await
            .unwrap();
        assert_eq!(found, user);
    }
}

// --- AdminUser ---

#[tokio::test]
async fn test_admin_user_redirects_anonymous_before_role_check() {
    let config = AppConfig::default();
    let mut parts = parts_with("/crud", Some(session()));

    let rejection = AdminUser::from_request_parts(&mut parts, &config)
        .await
        .unwrap_err();
    assert_eq!(rejection.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_admin_user_forbids_visitor() {
    let config = AppConfig::default();
    let mut parts = parts_with("/crud", Some(session_with(&visitor()).await));

    let rejection = AdminUser::from_request_parts(&mut parts, &config)
        .await
        .unwrap_err();
    assert_eq!(rejection.status(), StatusCode::FORBIDDEN);
    let body = body_of(rejection).await;
    assert!(body.contains("Nincs jogosultságod!"));
    assert!(body.contains(r#"<a href="/">Vissza a főoldalra</a>"#));
}

#[tokio::test]
async fn test_admin_user_accepts_admin() {
    let config = AppConfig::default();
    let mut parts = parts_with("/crud", Some(session_with(&admin()).await));

    let AdminUser(found) = AdminUser::from_request_parts(&mut parts, &config)
        .await
        .unwrap();
    assert!(found.is_admin());
}

#[tokio::test]
async fn test_forbidden_page_links_to_prefixed_home() {
    let config = AppConfig {
        base_path: "/lotto".to_string(),
        ..AppConfig::default()
    };
    let response = forbidden(&config);
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(body_of(response).await.contains(r#"href="/lotto""#));
}

// --- SessionUser ---

#[test]
fn test_session_user_copies_identity_without_password() {
    let account = User {
        id: 7,
        username: "bob".to_string(),
        password: "hunter2".to_string(),
        role: Role::Visitor,
    };
    let user = SessionUser::from(&account);
    assert_eq!(user.id, 7);
    assert_eq!(user.username, "bob");
    assert!(!user.is_admin());

    let stored = serde_json::to_value(&user).unwrap();
    assert!(stored.get("password").is_none());
    assert_eq!(stored["role"], "visitor");
}

// --- Passwords ---

#[test]
fn test_hash_password_verifies_and_salts() {
    let first = hash_password("titok").unwrap();
    let second = hash_password("titok").unwrap();

    assert!(first.starts_with("$argon2"));
    assert_ne!(first, second, "each hash must carry its own salt");
    assert!(verify_password("titok", &first));
    assert!(verify_password("titok", &second));
    assert!(!verify_password("Titok", &first));
    assert!(!verify_password("", &first));
}

#[test]
fn test_verify_password_legacy_plain_text_rows() {
    assert!(verify_password("secret", "secret"));
    assert!(!verify_password("secret ", "secret"));
    assert!(!verify_password("wrong", "secret"));
}
