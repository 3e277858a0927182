use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::db::time_column;

/// A table-backed record owned by one account.
pub trait Record: Sized {
    const TABLE: &'static str;
    /// Select list matching the column order `from_row` reads.
    const COLUMNS: &'static str;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    fn owner_id(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
        }
    }
}

impl ToSql for Priority {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Priority {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "LOW" => Ok(Priority::Low),
            "MEDIUM" => Ok(Priority::Medium),
            "HIGH" => Ok(Priority::High),
            other => Err(FromSqlError::Other(
                format!("unknown priority {}", other).into(),
            )),
        }
    }
}

/// A review score, always within 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: i64) -> Option<Self> {
        if (Self::MIN as i64..=Self::MAX as i64).contains(&value) {
            Some(Self(value as u8))
        } else {
            None
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Rating::new(value).ok_or_else(|| {
            format!(
                "Rating must be between {} and {}",
                Rating::MIN,
                Rating::MAX
            )
        })
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl ToSql for Rating {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0 as i64))
    }
}

impl FromSql for Rating {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_i64()?;
        Rating::new(raw).ok_or(FromSqlError::OutOfRange(raw))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub completed: bool,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Task {
    const TABLE: &'static str = "tasks";
    const COLUMNS: &'static str = "id, user_id, title, completed, priority, created_at, updated_at";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            completed: row.get(3)?,
            priority: row.get(4)?,
            created_at: time_column(row, 5)?,
            updated_at: time_column(row, 6)?,
        })
    }

    fn owner_id(&self) -> &str {
        &self.user_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub url: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Image {
    const TABLE: &'static str = "images";
    const COLUMNS: &'static str = "id, user_id, name, url, size, created_at, updated_at";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            url: row.get(3)?,
            size: row.get::<_, i64>(4)? as u64,
            created_at: time_column(row, 5)?,
            updated_at: time_column(row, 6)?,
        })
    }

    fn owner_id(&self) -> &str {
        &self.user_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodPost {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for FoodPost {
    const TABLE: &'static str = "food_posts";
    const COLUMNS: &'static str = "id, user_id, name, url, created_at, updated_at";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            url: row.get(3)?,
            created_at: time_column(row, 4)?,
            updated_at: time_column(row, 5)?,
        })
    }

    fn owner_id(&self) -> &str {
        &self.user_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodComment {
    pub id: String,
    pub food_post_id: String,
    pub user_id: String,
    pub rating: Rating,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for FoodComment {
    const TABLE: &'static str = "food_comments";
    const COLUMNS: &'static str =
        "id, food_post_id, user_id, rating, body, created_at, updated_at";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            food_post_id: row.get(1)?,
            user_id: row.get(2)?,
            rating: row.get(3)?,
            body: row.get(4)?,
            created_at: time_column(row, 5)?,
            updated_at: time_column(row, 6)?,
        })
    }

    fn owner_id(&self) -> &str {
        &self.user_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatureComment {
    pub id: String,
    pub creature_id: i64,
    /// Copied from the catalog when the comment is written.
    pub creature_name: String,
    pub user_id: String,
    pub rating: Rating,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for CreatureComment {
    const TABLE: &'static str = "creature_comments";
    const COLUMNS: &'static str =
        "id, creature_id, creature_name, user_id, rating, body, created_at, updated_at";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            creature_id: row.get(1)?,
            creature_name: row.get(2)?,
            user_id: row.get(3)?,
            rating: row.get(4)?,
            body: row.get(5)?,
            created_at: time_column(row, 6)?,
            updated_at: time_column(row, 7)?,
        })
    }

    fn owner_id(&self) -> &str {
        &self.user_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub user_id: String,
    pub title: String,
    /// Markdown source.
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Note {
    const TABLE: &'static str = "notes";
    const COLUMNS: &'static str = "id, user_id, title, body, created_at, updated_at";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            body: row.get(3)?,
            created_at: time_column(row, 4)?,
            updated_at: time_column(row, 5)?,
        })
    }

    fn owner_id(&self) -> &str {
        &self.user_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountProfile {
    pub id: String,
    pub display_name: Option<String>,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for AccountProfile {
    const TABLE: &'static str = "profiles";
    const COLUMNS: &'static str = "id, display_name, email, created_at, updated_at";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            display_name: row.get(1)?,
            email: row.get(2)?,
            created_at: time_column(row, 3)?,
            updated_at: time_column(row, 4)?,
        })
    }

    fn owner_id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub display_name: Option<String>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub const COLUMNS: &'static str = "id, email, password_hash, display_name, is_admin, created_at";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            password_hash: row.get(2)?,
            display_name: row.get(3)?,
            is_admin: row.get(4)?,
            created_at: time_column(row, 5)?,
        })
    }
}
