#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use chrono::Utc;
use lotto_portal::{
    AppConfig, AppState, HtmlViews, create_router,
    models::{Draw, DrawResultRow, DrawnNumber, Message, NewPrize, Prize, Role, User},
    repository::{RepoResult, Repository},
};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

// --- IN-MEMORY REPOSITORY ---

// Mirrors the Postgres schema closely enough for handler tests: ordered
// listings, LEFT JOIN rows and the cascading draw delete.
#[derive(Default)]
pub struct MemoryState {
    pub next_id: i32,
    pub draws: Vec<Draw>,
    pub numbers: Vec<DrawnNumber>,
    pub prizes: Vec<Prize>,
    pub users: Vec<User>,
    pub messages: Vec<Message>,
    // When set, every call fails with this message.
    pub failure: Option<String>,
}

impl MemoryState {
    fn id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct MemoryRepository {
    pub state: Mutex<MemoryState>,
}

impl MemoryRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing(message: &str) -> Arc<Self> {
        let repo = Self::default();
        repo.state.lock().unwrap().failure = Some(message.to_string());
        Arc::new(repo)
    }

    /// Inserts a user row as-is (the password is stored verbatim).
    pub fn seed_user(&self, username: &str, password: &str, role: Role) -> i32 {
        let mut state = self.state.lock().unwrap();
        let id = state.id();
        state.users.push(User {
            id,
            username: username.to_string(),
            password: password.to_string(),
            role,
        });
        id
    }

    pub fn seed_draw(&self, year: i32, week: i32) -> i32 {
        let mut state = self.state.lock().unwrap();
        let id = state.id();
        state.draws.push(Draw { id, year, week });
        id
    }

    pub fn seed_number(&self, draw_id: i32, value: i32) -> i32 {
        let mut state = self.state.lock().unwrap();
        let id = state.id();
        state.numbers.push(DrawnNumber { id, draw_id, value });
        id
    }

    pub fn seed_prize(&self, draw_id: i32, matches: i32, winners: i32, amount: i64) -> i32 {
        let mut state = self.state.lock().unwrap();
        let id = state.id();
        state.prizes.push(Prize {
            id,
            draw_id,
            matches,
            winners,
            amount,
        });
        id
    }

    pub fn set_failure(&self, message: Option<&str>) {
        self.state.lock().unwrap().failure = message.map(str::to_string);
    }

    pub fn users(&self) -> Vec<User> {
        self.state.lock().unwrap().users.clone()
    }

    pub fn draws(&self) -> Vec<Draw> {
        self.state.lock().unwrap().draws.clone()
    }

    pub fn numbers(&self) -> Vec<DrawnNumber> {
        self.state.lock().unwrap().numbers.clone()
    }

    pub fn prizes(&self) -> Vec<Prize> {
        self.state.lock().unwrap().prizes.clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.state.lock().unwrap().messages.clone()
    }

    fn lock(&self) -> RepoResult<std::sync::MutexGuard<'_, MemoryState>> {
        let state = self.state.lock().unwrap();
        if let Some(message) = state.failure.clone() {
            return Err(sqlx::Error::Protocol(message));
        }
        Ok(state)
    }
}

fn sorted_draws(state: &MemoryState) -> Vec<Draw> {
    let mut draws = state.draws.clone();
    draws.sort_by(|a, b| b.year.cmp(&a.year).then(b.week.cmp(&a.week)));
    draws
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn list_draw_results(&self, limit: i64) -> RepoResult<Vec<DrawResultRow>> {
        let state = self.lock()?;
        let mut rows = Vec::new();
        for draw in sorted_draws(&state) {
            let numbers: Vec<_> = state.numbers.iter().filter(|n| n.draw_id == draw.id).collect();
            let prizes: Vec<_> = state.prizes.iter().filter(|p| p.draw_id == draw.id).collect();
            let numbers: Vec<Option<&DrawnNumber>> = if numbers.is_empty() {
                vec![None]
            } else {
                numbers.into_iter().map(Some).collect()
            };
            let prizes: Vec<Option<&Prize>> = if prizes.is_empty() {
                vec![None]
            } else {
                prizes.into_iter().map(Some).collect()
            };
            for number in &numbers {
                for prize in &prizes {
                    rows.push(DrawResultRow {
                        ev: draw.year,
                        het: draw.week,
                        szam: number.map(|n| n.value),
                        talalat: prize.map(|p| p.matches),
                        ertek: prize.map(|p| p.amount),
                    });
                }
            }
        }
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn create_message(&self, sender_name: &str, email: &str, text: &str) -> RepoResult<()> {
        let mut state = self.lock()?;
        let id = state.id();
        state.messages.push(Message {
            id,
            sender_name: sender_name.to_string(),
            email: email.to_string(),
            message: text.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn list_messages(&self) -> RepoResult<Vec<Message>> {
        let state = self.lock()?;
        let mut messages = state.messages.clone();
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(messages)
    }

    async fn list_draws(&self) -> RepoResult<Vec<Draw>> {
        let state = self.lock()?;
        Ok(sorted_draws(&state))
    }

    async fn list_numbers(&self) -> RepoResult<Vec<DrawnNumber>> {
        let state = self.lock()?;
        let mut numbers = state.numbers.clone();
        numbers.sort_by_key(|n| n.value);
        Ok(numbers)
    }

    async fn list_prizes(&self) -> RepoResult<Vec<Prize>> {
        let state = self.lock()?;
        let mut prizes = state.prizes.clone();
        prizes.sort_by(|a, b| b.matches.cmp(&a.matches));
        Ok(prizes)
    }

    async fn create_draw(&self, year: i32, week: i32) -> RepoResult<i32> {
        let mut state = self.lock()?;
        let id = state.id();
        state.draws.push(Draw { id, year, week });
        Ok(id)
    }

    async fn delete_draw(&self, id: i32) -> RepoResult<u64> {
        let mut state = self.lock()?;
        let before = state.draws.len();
        state.draws.retain(|d| d.id != id);
        // ON DELETE CASCADE
        state.numbers.retain(|n| n.draw_id != id);
        state.prizes.retain(|p| p.draw_id != id);
        Ok((before - state.draws.len()) as u64)
    }

    async fn create_number(&self, draw_id: i32, value: i32) -> RepoResult<i32> {
        let mut state = self.lock()?;
        if !state.draws.iter().any(|d| d.id == draw_id) {
            return Err(sqlx::Error::Protocol("foreign key violation".to_string()));
        }
        let id = state.id();
        state.numbers.push(DrawnNumber { id, draw_id, value });
        Ok(id)
    }

    async fn delete_number(&self, id: i32) -> RepoResult<u64> {
        let mut state = self.lock()?;
        let before = state.numbers.len();
        state.numbers.retain(|n| n.id != id);
        Ok((before - state.numbers.len()) as u64)
    }

    async fn create_prize(&self, draw_id: i32, prize: NewPrize) -> RepoResult<i32> {
        let mut state = self.lock()?;
        if !state.draws.iter().any(|d| d.id == draw_id) {
            return Err(sqlx::Error::Protocol("foreign key violation".to_string()));
        }
        let id = state.id();
        state.prizes.push(Prize {
            id,
            draw_id,
            matches: prize.matches,
            winners: prize.winners,
            amount: prize.amount,
        });
        Ok(id)
    }

    async fn delete_prize(&self, id: i32) -> RepoResult<u64> {
        let mut state = self.lock()?;
        let before = state.prizes.len();
        state.prizes.retain(|p| p.id != id);
        Ok((before - state.prizes.len()) as u64)
    }

    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let state = self.lock()?;
        Ok(state.users.iter().find(|u| u.username == username).cloned())
    }

    async fn create_user(&self, username: &str, password: &str, role: Role) -> RepoResult<i32> {
        let mut state = self.lock()?;
        let id = state.id();
        state.users.push(User {
            id,
            username: username.to_string(),
            password: password.to_string(),
            role,
        });
        Ok(id)
    }
}

// --- APP / HTTP HELPERS ---

pub fn test_state(repo: Arc<MemoryRepository>, config: AppConfig) -> AppState {
    AppState {
        repo,
        views: Arc::new(HtmlViews),
        config,
    }
}

pub fn app(repo: Arc<MemoryRepository>) -> Router {
    create_router(test_state(repo, AppConfig::default()))
}

pub fn app_with_config(repo: Arc<MemoryRepository>, config: AppConfig) -> Router {
    create_router(test_state(repo, config))
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_form(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn post_json(uri: &str, body: serde_json::Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn location(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// `name=value` pair of the session cookie, if the response set one.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(lotto_portal::SESSION_COOKIE))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

/// Logs in through the real endpoint and returns the session cookie.
pub async fn login(app: &Router, username: &str, password: &str) -> String {
    let response = send(
        app,
        post_form(
            "/login",
            &format!("username={}&password={}", username, password),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER, "login should redirect");
    session_cookie(&response).expect("login should set the session cookie")
}

/// An app with one admin (`root`/`secret`) and one visitor (`guest`/`guest`).
pub async fn app_with_accounts() -> (Router, Arc<MemoryRepository>) {
    let repo = MemoryRepository::new();
    repo.seed_user("root", "secret", Role::Admin);
    repo.seed_user("guest", "guest", Role::Visitor);
    (app(repo.clone()), repo)
}
