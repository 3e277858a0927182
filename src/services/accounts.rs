//! Administrative account removal.

use rusqlite::params;
use serde::Serialize;

use crate::error::{AppError, AppResult, PartialCleanupWarning};
use crate::extractors::AccountContext;
use crate::state::DbPool;
use crate::storage::{Bucket, ObjectStore};

/// Owned tables, children before parents.
const OWNED_TABLES: &[&str] = &[
    "food_comments",
    "creature_comments",
    "food_posts",
    "images",
    "tasks",
    "notes",
    "sessions",
];

#[derive(Debug, Clone, Serialize)]
pub struct AccountDeletion {
    pub id: String,
    pub rows: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<PartialCleanupWarning>,
}

/// Delete an account with every row it owns, then its stored files.
/// Accounts may delete themselves; admins may delete anyone.
pub async fn delete_account(
    pool: &DbPool,
    store: &dyn ObjectStore,
    ctx: &AccountContext,
    account_id: &str,
) -> AppResult<AccountDeletion> {
    let account_id = account_id.trim();
    if account_id.is_empty() {
        return Err(AppError::validation("User ID required"));
    }
    if !ctx.owns(account_id) && !ctx.is_admin {
        return Err(AppError::Forbidden);
    }

    let rows = {
        let mut conn = pool.get()?;
        let tx = conn.transaction()?;

        let exists: bool = tx.query_row(
            "SELECT COUNT(*) > 0 FROM accounts WHERE id = ?1",
            params![account_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(AppError::NotFound);
        }

        let mut rows = 0;
        for table in OWNED_TABLES {
            rows += tx.execute(
                &format!("DELETE FROM {} WHERE user_id = ?1", table),
                params![account_id],
            )?;
        }
        rows += tx.execute("DELETE FROM profiles WHERE id = ?1", params![account_id])?;
        rows += tx.execute("DELETE FROM accounts WHERE id = ?1", params![account_id])?;
        tx.commit()?;
        rows
    };

    let mut warnings = Vec::new();
    for bucket in Bucket::ALL {
        if let Err(e) = store.remove_owner(bucket, account_id).await {
            let warning = PartialCleanupWarning {
                bucket: bucket.to_string(),
                key: format!("{}/", account_id),
                reason: e.to_string(),
            };
            warning.log();
            warnings.push(warning);
        }
    }

    tracing::info!(account = %account_id, by = %ctx.id, rows, "Account deleted");
    Ok(AccountDeletion {
        id: account_id.to_string(),
        rows,
        warnings,
    })
}
