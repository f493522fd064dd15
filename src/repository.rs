use crate::models::{
    Draw, DrawResultRow, DrawnNumber, Message, NewPrize, Prize, Role, User,
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

/// Store calls either yield their rows or the driver error; each route decides
/// whether that error is rendered, shown as text, or only logged.
pub type RepoResult<T> = Result<T, sqlx::Error>;

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations, so handlers talk
/// to the store without knowing the concrete implementation (Postgres in
/// production, an in-memory double in tests).
///
/// **Send + Sync + async_trait** are required to share the trait object
/// (`Arc<dyn Repository>`) across Axum's task boundaries.
///
/// Every implementation must pass user-supplied values as bound parameters and
/// never splice them into statement text.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Public Results ---
    // Draws LEFT JOINed with numbers and prizes, newest first.
    async fn list_draw_results(&self, limit: i64) -> RepoResult<Vec<DrawResultRow>>;

    // --- Contact Messages ---
    // Stamped with the store's clock at insertion.
    async fn create_message(&self, sender_name: &str, email: &str, text: &str) -> RepoResult<()>;
    async fn list_messages(&self) -> RepoResult<Vec<Message>>;

    // --- Draw Administration ---
    async fn list_draws(&self) -> RepoResult<Vec<Draw>>;
    async fn list_numbers(&self) -> RepoResult<Vec<DrawnNumber>>;
    async fn list_prizes(&self) -> RepoResult<Vec<Prize>>;
    // Returns the new draw's id.
    async fn create_draw(&self, year: i32, week: i32) -> RepoResult<i32>;
    // Cascades to the draw's numbers and prizes. Returns rows affected.
    async fn delete_draw(&self, id: i32) -> RepoResult<u64>;
    async fn create_number(&self, draw_id: i32, value: i32) -> RepoResult<i32>;
    async fn delete_number(&self, id: i32) -> RepoResult<u64>;
    async fn create_prize(&self, draw_id: i32, prize: NewPrize) -> RepoResult<i32>;
    async fn delete_prize(&self, id: i32) -> RepoResult<u64>;

    // --- Users ---
    // Usernames are not unique; the oldest matching row wins.
    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    async fn create_user(&self, username: &str, password: &str, role: Role) -> RepoResult<i32>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    /// list_draw_results
    ///
    /// One row per (draw, number, prize) combination; draws without numbers or
    /// prizes still appear once with NULLs in the joined columns.
    async fn list_draw_results(&self, limit: i64) -> RepoResult<Vec<DrawResultRow>> {
        sqlx::query_as::<_, DrawResultRow>(
            r#"
            SELECT huzas.ev, huzas.het, huzott.szam, nyeremeny.talalat, nyeremeny.ertek
            FROM huzas
            LEFT JOIN huzott ON huzas.id = huzott.huzasid
            LEFT JOIN nyeremeny ON huzas.id = nyeremeny.huzasid
            ORDER BY huzas.ev DESC, huzas.het DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    async fn create_message(&self, sender_name: &str, email: &str, text: &str) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO messages (sender_name, email, message, created_at) VALUES ($1, $2, $3, NOW())",
        )
        .bind(sender_name)
        .bind(email)
        .bind(text)
        .execute(&self.pool)
        .await
        .map(|_| ())
    }

    async fn list_messages(&self) -> RepoResult<Vec<Message>> {
        sqlx::query_as::<_, Message>(
            "SELECT id, sender_name, email, message, created_at FROM messages ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn list_draws(&self) -> RepoResult<Vec<Draw>> {
        sqlx::query_as::<_, Draw>("SELECT id, ev, het FROM huzas ORDER BY ev DESC, het DESC")
            .fetch_all(&self.pool)
            .await
    }

    async fn list_numbers(&self) -> RepoResult<Vec<DrawnNumber>> {
        sqlx::query_as::<_, DrawnNumber>("SELECT id, huzasid, szam FROM huzott ORDER BY szam ASC")
            .fetch_all(&self.pool)
            .await
    }

    async fn list_prizes(&self) -> RepoResult<Vec<Prize>> {
        sqlx::query_as::<_, Prize>(
            "SELECT id, huzasid, talalat, darab, ertek FROM nyeremeny ORDER BY talalat DESC",
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn create_draw(&self, year: i32, week: i32) -> RepoResult<i32> {
        sqlx::query_scalar::<_, i32>("INSERT INTO huzas (ev, het) VALUES ($1, $2) RETURNING id")
            .bind(year)
            .bind(week)
            .fetch_one(&self.pool)
            .await
    }

    /// delete_draw
    ///
    /// Relies on the `ON DELETE CASCADE` foreign keys of `huzott` and `nyeremeny`.
    async fn delete_draw(&self, id: i32) -> RepoResult<u64> {
        sqlx::query("DELETE FROM huzas WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map(|res| res.rows_affected())
    }

    async fn create_number(&self, draw_id: i32, value: i32) -> RepoResult<i32> {
        sqlx::query_scalar::<_, i32>(
            "INSERT INTO huzott (huzasid, szam) VALUES ($1, $2) RETURNING id",
        )
        .bind(draw_id)
        .bind(value)
        .fetch_one(&self.pool)
        .await
    }

    async fn delete_number(&self, id: i32) -> RepoResult<u64> {
        sqlx::query("DELETE FROM huzott WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map(|res| res.rows_affected())
    }

    async fn create_prize(&self, draw_id: i32, prize: NewPrize) -> RepoResult<i32> {
        sqlx::query_scalar::<_, i32>(
            "INSERT INTO nyeremeny (huzasid, talalat, darab, ertek) VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(draw_id)
        .bind(prize.matches)
        .bind(prize.winners)
        .bind(prize.amount)
        .fetch_one(&self.pool)
        .await
    }

    async fn delete_prize(&self, id: i32) -> RepoResult<u64> {
        sqlx::query("DELETE FROM nyeremeny WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map(|res| res.rows_affected())
    }

    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, password, role FROM users WHERE username = $1 ORDER BY id LIMIT 1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_user(&self, username: &str, password: &str, role: Role) -> RepoResult<i32> {
        sqlx::query_scalar::<_, i32>(
            "INSERT INTO users (username, password, role) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(username)
        .bind(password)
        .bind(role.as_str())
        .fetch_one(&self.pool)
        .await
    }
}
