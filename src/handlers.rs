use crate::{
    AppState, aggregator,
    auth::{self, CurrentUser, SESSION_USER_KEY, SessionUser},
    error::{AppError, AppResult},
    form::FormOrJson,
    models::{
        ContactForm, Credentials, DrawForm, FieldError, NumberForm, PrizeForm, Role,
        optional_text, required_int,
    },
    views::ViewContext,
};
use axum::{
    extract::{Path, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde_json::{Value, json};
use tower_sessions::Session;

/// Row cap of the public results page.
pub const RESULTS_LIMIT: i64 = 50;

// --- Helpers ---

/// Renders `view` with `data`, exposing the request's identity to the layout.
fn render(state: &AppState, user: &CurrentUser, view: &str, data: Value) -> AppResult<Html<String>> {
    let ctx = ViewContext {
        base_path: &state.config.base_path,
        user: user.0.as_ref(),
        data: &data,
    };
    Ok(Html(state.views.render(view, &ctx)?))
}

// Redirect-after-write target, prefixed with the base path.
fn redirect(state: &AppState, route: &str) -> Redirect {
    Redirect::to(&state.config.path(route))
}

// --- Public Pages ---

/// home
///
/// [Public Route] Static landing page.
pub async fn home(State(state): State<AppState>, user: CurrentUser) -> AppResult<Html<String>> {
    render(
        &state,
        &user,
        "index",
        json!({ "title": "Főoldal - SzerencseAdat Kft." }),
    )
}

/// database
///
/// [Public Route] The newest draw results, one row per draw/number/prize
/// combination. A failing query renders an empty table instead of an error.
pub async fn database(State(state): State<AppState>, user: CurrentUser) -> AppResult<Html<String>> {
    let data = match state.repo.list_draw_results(RESULTS_LIMIT).await {
        Ok(rows) => json!({ "title": "Eredmények", "huzasok": rows }),
        Err(e) => {
            tracing::error!("results query failed: {:?}", e);
            json!({ "title": "Adatbázis Hiba", "huzasok": [] })
        }
    };
    render(&state, &user, "database", data)
}

pub async fn contact_form(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Html<String>> {
    render(&state, &user, "contact", json!({ "title": "Kapcsolat" }))
}

/// send_message
///
/// [Public Route] Stores a contact message and re-renders the form with the
/// outcome. Incomplete submissions never reach the store.
pub async fn send_message(
    State(state): State<AppState>,
    user: CurrentUser,
    FormOrJson(form): FormOrJson<ContactForm>,
) -> AppResult<Html<String>> {
    let fields = (
        optional_text(&form.name),
        optional_text(&form.email),
        optional_text(&form.text),
    );

    let stored = match fields {
        (Some(name), Some(email), Some(text)) => {
            match state.repo.create_message(&name, &email, &text).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!("message insert failed: {:?}", e);
                    false
                }
            }
        }
        _ => {
            tracing::warn!("incomplete contact form submission");
            false
        }
    };

    let msg = if stored {
        "Üzenet elküldve!"
    } else {
        "Hiba történt!"
    };
    render(
        &state,
        &user,
        "contact",
        json!({ "title": "Kapcsolat", "msg": msg }),
    )
}

// --- Authenticated Pages ---

/// messages
///
/// [Authenticated Route] All contact messages, newest first. A failing query
/// renders an empty list.
pub async fn messages(State(state): State<AppState>, user: CurrentUser) -> AppResult<Html<String>> {
    let messages = state.repo.list_messages().await.unwrap_or_else(|e| {
        tracing::error!("messages query failed: {:?}", e);
        Vec::new()
    });
    render(
        &state,
        &user,
        "messages",
        json!({ "title": "Üzenetek", "messages": messages }),
    )
}

// --- Admin Panel ---

/// crud_list
///
/// [Admin Route] Every draw with its numbers and prizes attached.
/// Store failures are reported as plain text.
pub async fn crud_list(State(state): State<AppState>, user: CurrentUser) -> AppResult<Html<String>> {
    let items = aggregator::load_listing(state.repo.as_ref())
        .await
        .map_err(|e| AppError::store("Hiba", e, state.config.expose_store_errors))?;
    render(
        &state,
        &user,
        "crud",
        json!({ "title": "CRUD Admin", "items": items }),
    )
}

/// add_draw
///
/// [Admin Route] Creates a draw from the `ev` (year) and `het` (week) fields.
pub async fn add_draw(
    State(state): State<AppState>,
    FormOrJson(form): FormOrJson<DrawForm>,
) -> AppResult<Redirect> {
    let (year, week) = match (required_int::<i32>(&form.ev), required_int::<i32>(&form.het)) {
        (Ok(year), Ok(week)) => (year, week),
        (Err(FieldError::Missing), _) | (_, Err(FieldError::Missing)) => {
            return Err(AppError::Validation("Hiányzó adatok!"));
        }
        _ => return Err(AppError::Validation("Hibás adatok!")),
    };

    let id = state
        .repo
        .create_draw(year, week)
        .await
        .map_err(|e| AppError::store("Mentési hiba", e, state.config.expose_store_errors))?;
    tracing::info!(id, year, week, "draw created");

    Ok(redirect(&state, "/crud"))
}

/// delete_draw
///
/// [Admin Route] Removes a draw; the store cascades to its numbers and prizes.
pub async fn delete_draw(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Redirect> {
    let deleted = state
        .repo
        .delete_draw(id)
        .await
        .map_err(|e| AppError::store("Hiba törlésnél", e, state.config.expose_store_errors))?;
    tracing::info!(id, deleted, "draw deleted");

    Ok(redirect(&state, "/crud"))
}

/// add_number
///
/// [Admin Route] Adds a drawn number under draw `id`. Failures are logged and
/// the admin is sent back to the listing regardless.
pub async fn add_number(
    State(state): State<AppState>,
    Path(draw_id): Path<i32>,
    FormOrJson(form): FormOrJson<NumberForm>,
) -> Redirect {
    match required_int::<i32>(&form.szam) {
        Ok(value) => {
            if let Err(e) = state.repo.create_number(draw_id, value).await {
                tracing::error!(draw_id, "number insert failed: {:?}", e);
            }
        }
        Err(e) => tracing::warn!(draw_id, "number not added: {}", e),
    }
    redirect(&state, "/crud")
}

pub async fn delete_number(State(state): State<AppState>, Path(id): Path<i32>) -> Redirect {
    if let Err(e) = state.repo.delete_number(id).await {
        tracing::error!(id, "number delete failed: {:?}", e);
    }
    redirect(&state, "/crud")
}

/// add_prize
///
/// [Admin Route] Adds a prize tier under draw `id`. Same failure policy as
/// `add_number`.
pub async fn add_prize(
    State(state): State<AppState>,
    Path(draw_id): Path<i32>,
    FormOrJson(form): FormOrJson<PrizeForm>,
) -> Redirect {
    match form.to_new_prize() {
        Ok(prize) => {
            if let Err(e) = state.repo.create_prize(draw_id, prize).await {
                tracing::error!(draw_id, "prize insert failed: {:?}", e);
            }
        }
        Err(e) => tracing::warn!(draw_id, "prize not added: {}", e),
    }
    redirect(&state, "/crud")
}

pub async fn delete_prize(State(state): State<AppState>, Path(id): Path<i32>) -> Redirect {
    if let Err(e) = state.repo.delete_prize(id).await {
        tracing::error!(id, "prize delete failed: {:?}", e);
    }
    redirect(&state, "/crud")
}

// --- Login / Registration ---

pub async fn login_form(State(state): State<AppState>, user: CurrentUser) -> AppResult<Html<String>> {
    render(&state, &user, "login", json!({ "title": "Belépés" }))
}

/// login
///
/// [Public Route] Looks the user up by name and checks the password. On success
/// the session id is rotated, the user copied into the session and the client
/// sent home; on any failure (unknown user, wrong password, store error) the
/// form is shown again with a generic message and the session is left alone.
pub async fn login(
    State(state): State<AppState>,
    user: CurrentUser,
    session: Session,
    FormOrJson(form): FormOrJson<Credentials>,
) -> AppResult<Response> {
    let found = state
        .repo
        .find_user_by_username(form.username.trim())
        .await
        .unwrap_or_else(|e| {
            tracing::error!("user lookup failed: {:?}", e);
            None
        });

    match found {
        Some(account) if auth::verify_password(&form.password, &account.password) => {
            session.cycle_id().await?;
            session
                .insert(SESSION_USER_KEY, SessionUser::from(&account))
                .await?;
            tracing::info!(user = %account.username, role = %account.role, "login succeeded");
            Ok(redirect(&state, "/").into_response())
        }
        _ => {
            tracing::warn!(user = %form.username, "login failed");
            let page = render(
                &state,
                &user,
                "login",
                json!({ "title": "Belépés", "error": "Hibás adatok" }),
            )?;
            Ok(page.into_response())
        }
    }
}

pub async fn logout(State(state): State<AppState>, session: Session) -> AppResult<Redirect> {
    session.flush().await?;
    Ok(redirect(&state, "/"))
}

pub async fn register_form(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Html<String>> {
    render(&state, &user, "register", json!({ "title": "Regisztráció" }))
}

/// register
///
/// [Public Route] Creates a `visitor` account. The role is fixed here and never
/// taken from the request. Store failures are logged and the client is sent to
/// the login page either way.
pub async fn register(
    State(state): State<AppState>,
    FormOrJson(form): FormOrJson<Credentials>,
) -> AppResult<Redirect> {
    let username = form.username.trim();
    if username.is_empty() || form.password.is_empty() {
        tracing::warn!("registration without username or password ignored");
        return Ok(redirect(&state, "/login"));
    }

    let password_hash =
        auth::hash_password(&form.password).map_err(|e| AppError::Password(e.to_string()))?;

    match state
        .repo
        .create_user(username, &password_hash, Role::Visitor)
        .await
    {
        Ok(id) => tracing::info!(id, user = %username, "visitor registered"),
        Err(e) => tracing::error!(user = %username, "registration failed: {:?}", e),
    }

    Ok(redirect(&state, "/login"))
}
