use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use thiserror::Error;

// --- Core Application Schemas (Mapped to Database) ---

/// Draw
///
/// One lottery drawing event from the `huzas` table, identified by year and week.
/// The Hungarian column names are kept on the wire so form posts and rendered
/// views use the same keys as the store (`ev`, `het`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, Default)]
pub struct Draw {
    pub id: i32,
    #[serde(rename = "ev")]
    #[sqlx(rename = "ev")]
    pub year: i32,
    #[serde(rename = "het")]
    #[sqlx(rename = "het")]
    pub week: i32,
}

/// DrawnNumber
///
/// A single drawn value (`huzott` table). Deleted together with its owning draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, Default)]
pub struct DrawnNumber {
    pub id: i32,
    // FK to huzas.id (ON DELETE CASCADE).
    #[serde(rename = "huzasid")]
    #[sqlx(rename = "huzasid")]
    pub draw_id: i32,
    #[serde(rename = "szam")]
    #[sqlx(rename = "szam")]
    pub value: i32,
}

/// Prize
///
/// A payout tier of a draw (`nyeremeny` table): how many winners matched
/// `matches` numbers and what each of them received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, Default)]
pub struct Prize {
    pub id: i32,
    #[serde(rename = "huzasid")]
    #[sqlx(rename = "huzasid")]
    pub draw_id: i32,
    #[serde(rename = "talalat")]
    #[sqlx(rename = "talalat")]
    pub matches: i32,
    #[serde(rename = "darab")]
    #[sqlx(rename = "darab")]
    pub winners: i32,
    #[serde(rename = "ertek")]
    #[sqlx(rename = "ertek")]
    pub amount: i64,
}

/// Role
///
/// The RBAC field of a user. The store only ever holds `admin` or `visitor`;
/// anything else fails to decode instead of silently degrading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Visitor,
}

#[derive(Debug, Error)]
#[error("unknown role `{0}`")]
pub struct UnknownRole(pub String);

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Visitor => "visitor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "visitor" => Ok(Role::Visitor),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// User
///
/// Account row from the `users` table. `password` holds either an Argon2 PHC
/// string or, for rows created before hashing was introduced, the plain text.
/// Never serialized; the session keeps a `SessionUser` copy instead.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub password: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
}

/// Message
///
/// Contact form submission. Immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: i32,
    pub sender_name: String,
    pub email: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// DrawResultRow
///
/// One row of the public results page: a draw LEFT JOINed with its numbers and
/// prizes, so the joined columns are optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, Default)]
pub struct DrawResultRow {
    pub ev: i32,
    pub het: i32,
    pub szam: Option<i32>,
    pub talalat: Option<i32>,
    pub ertek: Option<i64>,
}

/// DrawListing
///
/// A draw together with its own numbers and prizes, as produced by the
/// aggregator for the admin panel. Serializes flat: `{id, ev, het, numbers, prizes}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawListing {
    #[serde(flatten)]
    pub draw: Draw,
    pub numbers: Vec<DrawnNumber>,
    pub prizes: Vec<Prize>,
}

/// NewPrize
///
/// Validated prize tier ready for insertion under a draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewPrize {
    pub matches: i32,
    pub winners: i32,
    pub amount: i64,
}

// --- Request Payloads (Form / JSON Bodies) ---

/// FormScalar
///
/// A single submitted field. HTML forms send every value as text, JSON clients
/// may send numbers, so both are accepted and normalized on read.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FormScalar {
    Int(i64),
    Float(f64),
    Text(String),
}

/// Why a required form field could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("missing field")]
    Missing,
    #[error("invalid field")]
    Invalid,
}

impl FormScalar {
    /// Text view of the value; blank strings count as absent.
    pub fn text(&self) -> Option<String> {
        match self {
            FormScalar::Int(n) => Some(n.to_string()),
            FormScalar::Float(f) => Some(f.to_string()),
            FormScalar::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
        }
    }
}

/// Reads a required integer field of any width.
pub fn required_int<T>(field: &Option<FormScalar>) -> Result<T, FieldError>
where
    T: TryFrom<i64> + FromStr,
{
    match field {
        None => Err(FieldError::Missing),
        Some(FormScalar::Int(n)) => T::try_from(*n).map_err(|_| FieldError::Invalid),
        // `i64::MAX as f64` rounds up to 2^63, so the upper bound is exclusive.
        Some(FormScalar::Float(f))
            if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 =>
        {
            T::try_from(*f as i64).map_err(|_| FieldError::Invalid)
        }
        Some(FormScalar::Float(_)) => Err(FieldError::Invalid),
        Some(scalar @ FormScalar::Text(_)) => match scalar.text() {
            None => Err(FieldError::Missing),
            Some(text) => text.parse::<T>().map_err(|_| FieldError::Invalid),
        },
    }
}

/// Reads an optional free-text field; blank counts as absent.
pub fn optional_text(field: &Option<FormScalar>) -> Option<String> {
    field.as_ref().and_then(FormScalar::text)
}

/// DrawForm
///
/// Body of POST /crud/add. Both fields are required.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DrawForm {
    #[serde(default)]
    pub ev: Option<FormScalar>,
    #[serde(default)]
    pub het: Option<FormScalar>,
}

/// NumberForm
///
/// Body of POST /crud/add-number/{id}.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NumberForm {
    #[serde(default)]
    pub szam: Option<FormScalar>,
}

/// PrizeForm
///
/// Body of POST /crud/add-prize/{id}.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrizeForm {
    #[serde(default)]
    pub talalat: Option<FormScalar>,
    #[serde(default)]
    pub darab: Option<FormScalar>,
    #[serde(default)]
    pub ertek: Option<FormScalar>,
}

impl PrizeForm {
    pub fn to_new_prize(&self) -> Result<NewPrize, FieldError> {
        Ok(NewPrize {
            matches: required_int(&self.talalat)?,
            winners: required_int(&self.darab)?,
            amount: required_int(&self.ertek)?,
        })
    }
}

/// ContactForm
///
/// Body of POST /kapcsolat.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: Option<FormScalar>,
    #[serde(default)]
    pub email: Option<FormScalar>,
    #[serde(default)]
    pub text: Option<FormScalar>,
}

/// Credentials
///
/// Body of POST /login and POST /register.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}
