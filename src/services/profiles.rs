use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection};
use serde::Deserialize;

use super::{fetch_owned, find, required};
use crate::db::models::{AccountProfile, Record};
use crate::db;
use crate::error::{AppError, AppResult};
use crate::extractors::AccountContext;
use crate::state::DbPool;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfilePatch {
    pub display_name: Option<String>,
}

impl ProfilePatch {
    pub fn validate(self) -> AppResult<Self> {
        match self.display_name {
            None => Err(AppError::validation("Nothing to update")),
            Some(name) => Ok(Self {
                display_name: Some(required(&name, "Name cannot be empty")?),
            }),
        }
    }
}

/// Insert a profile row inside an existing transaction.
pub(crate) fn insert(
    conn: &Connection,
    id: &str,
    email: &str,
    display_name: Option<&str>,
    now: &DateTime<Utc>,
) -> AppResult<AccountProfile> {
    let profile = AccountProfile {
        id: id.to_string(),
        display_name: display_name.map(str::to_string),
        email: email.to_string(),
        created_at: *now,
        updated_at: *now,
    };
    conn.execute(
        "INSERT INTO profiles (id, display_name, email, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            profile.id,
            profile.display_name,
            profile.email,
            db::format_time(&profile.created_at),
            db::format_time(&profile.updated_at)
        ],
    )?;
    Ok(profile)
}

pub fn get(pool: &DbPool, id: &str) -> AppResult<Option<AccountProfile>> {
    let conn = pool.get()?;
    find(&conn, id)
}

/// Profiles for a set of account ids, in id order. Unknown ids are skipped.
pub fn get_many(pool: &DbPool, ids: &[String]) -> AppResult<Vec<AccountProfile>> {
    let mut ids: Vec<&str> = ids.iter().map(String::as_str).collect();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let conn = pool.get()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM profiles WHERE id IN ({}) ORDER BY id",
        AccountProfile::COLUMNS,
        placeholders
    ))?;
    let rows = stmt.query_map(params_from_iter(ids), AccountProfile::from_row)?;
    let profiles = rows.collect::<Result<Vec<_>, _>>()?;
    Ok(profiles)
}

/// Create the profile for an existing account that lacks one.
pub fn create(
    pool: &DbPool,
    id: &str,
    email: &str,
    display_name: Option<&str>,
) -> AppResult<AccountProfile> {
    let conn = pool.get()?;
    if find::<AccountProfile>(&conn, id)?.is_some() {
        return Err(AppError::validation("Profile already exists"));
    }
    let display_name = display_name.map(str::trim).filter(|s| !s.is_empty());
    let profile = insert(&conn, id, email, display_name, &db::now())?;
    tracing::info!(account = %id, "Profile created");
    Ok(profile)
}

/// Update the caller's own profile. The display name is mirrored onto the
/// account so sessions pick it up.
pub fn update(pool: &DbPool, ctx: &AccountContext, patch: ProfilePatch) -> AppResult<AccountProfile> {
    let patch = patch.validate()?;
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;

    let mut profile: AccountProfile = fetch_owned(&tx, ctx, &ctx.id)?;
    if let Some(name) = patch.display_name {
        profile.display_name = Some(name);
    }
    profile.updated_at = db::advance(&profile.updated_at);

    tx.execute(
        "UPDATE profiles SET display_name = ?1, updated_at = ?2 WHERE id = ?3",
        params![
            profile.display_name,
            db::format_time(&profile.updated_at),
            ctx.id
        ],
    )?;
    tx.execute(
        "UPDATE accounts SET display_name = ?1 WHERE id = ?2",
        params![profile.display_name, ctx.id],
    )?;
    tx.commit()?;

    tracing::info!(account = %ctx.id, "Profile updated");
    Ok(profile)
}
