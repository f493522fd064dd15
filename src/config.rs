use sqlx::postgres::PgConnectOptions;
use std::{env, str::FromStr};
use thiserror::Error;

/// AppConfig
///
/// Holds the application's entire configuration state. Loaded once at startup and
/// shared read-only through the application state (pulled into handlers and
/// extractors via `FromRef`).
#[derive(Clone)]
pub struct AppConfig {
    // Runtime environment marker. Drives log format and the error/migration defaults.
    pub env: Env,
    // Full connection string; takes precedence over the DB_* parts when set.
    pub database_url: Option<String>,
    pub db_host: String,
    pub db_port: u16,
    pub db_user: String,
    pub db_password: String,
    pub db_name: String,
    // Route prefix, either empty or "/segment" without a trailing slash.
    pub base_path: String,
    pub host: String,
    pub port: u16,
    // Directory served as the router fallback (css, images).
    pub static_dir: String,
    // Marks the session cookie `Secure`. Off by default: plain HTTP is assumed.
    pub session_secure: bool,
    pub session_idle_hours: i64,
    // When set, raw store error text is included in plain-text error responses.
    pub expose_store_errors: bool,
    // Apply ./migrations at startup.
    pub run_migrations: bool,
}

/// Env
///
/// Defines the runtime context: `Local` favours debuggability (pretty logs, store
/// error detail), `Production` favours safety (JSON logs, generic error text).
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// ConfigError
///
/// Raised by `AppConfig::load` when the environment is incomplete or malformed.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    Missing(&'static str),
    #[error("{name} has an invalid value `{value}`")]
    Invalid { name: &'static str, value: String },
}

impl Default for AppConfig {
    /// Safe, non-panicking values for test setup; no environment access.
    fn default() -> Self {
        Self {
            env: Env::Local,
            database_url: None,
            db_host: "localhost".to_string(),
            db_port: 5432,
            db_user: "postgres".to_string(),
            db_password: String::new(),
            db_name: "lotto".to_string(),
            base_path: String::new(),
            host: "0.0.0.0".to_string(),
            port: 3000,
            static_dir: "public".to_string(),
            session_secure: false,
            session_idle_hours: 24,
            expose_store_errors: true,
            run_migrations: true,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables (call `dotenv` first).
    /// Local runs fall back to development defaults; production refuses to start
    /// without explicit store coordinates.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match var("APP_ENV").as_deref() {
            Some("production") => Env::Production,
            _ => Env::Local,
        };
        let defaults = Self::default();
        let database_url = var("DATABASE_URL");

        let required = |name: &'static str, fallback: &str| -> Result<String, ConfigError> {
            match (var(name), env, database_url.is_some()) {
                (Some(value), _, _) => Ok(value),
                (None, Env::Production, false) => Err(ConfigError::Missing(name)),
                (None, _, _) => Ok(fallback.to_string()),
            }
        };

        let db_host = required("DB_HOST", &defaults.db_host)?;
        let db_user = required("DB_USER", &defaults.db_user)?;
        let db_name = required("DB_NAME", &defaults.db_name)?;

        let local = env == Env::Local;

        Ok(Self {
            env,
            db_host,
            db_port: parse_var("DB_PORT", defaults.db_port)?,
            db_user,
            db_password: var("DB_PASSWORD").unwrap_or_default(),
            db_name,
            database_url,
            base_path: normalize_base_path(&var("BASE_PATH").unwrap_or_default()),
            host: var("HOST").unwrap_or(defaults.host),
            port: parse_var("PORT", defaults.port)?,
            static_dir: var("STATIC_DIR").unwrap_or(defaults.static_dir),
            session_secure: parse_flag("SESSION_SECURE", false)?,
            session_idle_hours: parse_idle_hours(defaults.session_idle_hours)?,
            expose_store_errors: parse_flag("EXPOSE_STORE_ERRORS", local)?,
            run_migrations: parse_flag("RUN_MIGRATIONS", local)?,
        })
    }

    /// Store connection options, built field by field so credentials never need
    /// URL escaping.
    pub fn connect_options(&self) -> Result<PgConnectOptions, sqlx::Error> {
        if let Some(url) = &self.database_url {
            return url.parse();
        }
        let mut options = PgConnectOptions::new()
            .host(&self.db_host)
            .port(self.db_port)
            .username(&self.db_user)
            .database(&self.db_name);
        if !self.db_password.is_empty() {
            options = options.password(&self.db_password);
        }
        Ok(options)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Prefixes an absolute route with the configured base path.
    /// The root maps to the bare prefix (`/lotto`), or `/` without one.
    pub fn path(&self, route: &str) -> String {
        prefixed(&self.base_path, route)
    }
}

/// Upper bound for `SESSION_IDLE_HOURS` (ten years). Keeps the cookie expiry
/// inside the range `time` can represent.
pub const MAX_SESSION_IDLE_HOURS: i64 = 24 * 365 * 10;

/// Joins a base path (empty or `/segment`) and an absolute route.
pub fn prefixed(base_path: &str, route: &str) -> String {
    match (base_path.is_empty(), route) {
        (true, _) => route.to_string(),
        (false, "/") => base_path.to_string(),
        (false, _) => format!("{}{}", base_path, route),
    }
}

/// Normalizes a user-supplied prefix: `lotto/` -> `/lotto`, `/` -> ``.
pub fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

// Unset and blank variables are treated the same.
fn var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match var(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

// Inactivity window in hours, 1..=MAX_SESSION_IDLE_HOURS.
fn parse_idle_hours(default: i64) -> Result<i64, ConfigError> {
    let name = "SESSION_IDLE_HOURS";
    let hours = parse_var(name, default)?;
    if (1..=MAX_SESSION_IDLE_HOURS).contains(&hours) {
        Ok(hours)
    } else {
        Err(ConfigError::Invalid {
            name,
            value: hours.to_string(),
        })
    }
}

fn parse_flag(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match var(name) {
        None => Ok(default),
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid { name, value }),
        },
    }
}
