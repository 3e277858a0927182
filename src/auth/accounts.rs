//! Password accounts: sign-up, sign-in, sign-out and session lookup.

use rusqlite::{params, OptionalExtension};
use serde::Serialize;

use crate::auth::session;
use crate::config::AuthConfig;
use crate::db::{self, models::Account};
use crate::error::{AppError, AppResult};
use crate::extractors::AccountContext;
use crate::services::profiles;
use crate::state::DbPool;

const MIN_PASSWORD_LEN: usize = 6;

/// A freshly opened session.
#[derive(Debug, Clone, Serialize)]
pub struct SignedIn {
    pub token: String,
    pub account: AccountContext,
}

fn normalize_email(email: &str) -> AppResult<String> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(AppError::validation("Email is required"));
    }
    if !email.contains('@') {
        return Err(AppError::validation("Email address is invalid"));
    }
    Ok(email)
}

/// Register an account, create its profile and open a session.
/// The first account on a fresh database is made admin.
pub fn sign_up(
    pool: &DbPool,
    auth: &AuthConfig,
    email: &str,
    password: &str,
    display_name: Option<&str>,
) -> AppResult<SignedIn> {
    let email = normalize_email(email)?;
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    let display_name = display_name
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let password_hash = bcrypt::hash(password, auth.bcrypt_cost)?;
    let id = db::new_id();
    let now = db::now();

    let is_admin = {
        let mut conn = pool.get()?;
        let tx = conn.transaction()?;

        let taken: bool = tx.query_row(
            "SELECT COUNT(*) > 0 FROM accounts WHERE email = ?1",
            params![email],
            |row| row.get(0),
        )?;
        if taken {
            return Err(AppError::validation(
                "An account with this email already exists",
            ));
        }

        let is_admin: bool =
            tx.query_row("SELECT COUNT(*) = 0 FROM accounts", [], |row| row.get(0))?;

        tx.execute(
            "INSERT INTO accounts (id, email, password_hash, display_name, is_admin, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id,
                email,
                password_hash,
                display_name,
                is_admin,
                db::format_time(&now)
            ],
        )?;
        profiles::insert(&tx, &id, &email, display_name.as_deref(), &now)?;
        tx.commit()?;
        is_admin
    };

    tracing::info!(account = %id, "Account created");

    let token = session::create_session(pool, &id, auth.session_hours)?;
    Ok(SignedIn {
        token,
        account: AccountContext {
            id,
            email,
            display_name,
            is_admin,
        },
    })
}

/// Check credentials and open a session. An account whose profile is missing
/// gets a fresh one.
pub fn sign_in(
    pool: &DbPool,
    auth: &AuthConfig,
    email: &str,
    password: &str,
) -> AppResult<SignedIn> {
    let email = normalize_email(email)?;
    let account = find_by_email(pool, &email)?.ok_or(AppError::Unauthorized)?;

    if !bcrypt::verify(password, &account.password_hash)? {
        tracing::warn!(account = %account.id, "Rejected sign-in");
        return Err(AppError::Unauthorized);
    }

    if profiles::get(pool, &account.id)?.is_none() {
        profiles::create(
            pool,
            &account.id,
            &account.email,
            account.display_name.as_deref(),
        )?;
    }

    let token = session::create_session(pool, &account.id, auth.session_hours)?;
    tracing::info!(account = %account.id, "Signed in");
    Ok(SignedIn {
        token,
        account: AccountContext {
            id: account.id,
            email: account.email,
            display_name: account.display_name,
            is_admin: account.is_admin,
        },
    })
}

pub fn sign_out(pool: &DbPool, token: &str) -> AppResult<()> {
    session::delete_session(pool, token)
}

pub fn current_session(pool: &DbPool, token: &str) -> AppResult<Option<AccountContext>> {
    session::lookup_session(pool, token)
}

fn find_by_email(pool: &DbPool, email: &str) -> AppResult<Option<Account>> {
    let conn = pool.get()?;
    let account = conn
        .query_row(
            &format!("SELECT {} FROM accounts WHERE email = ?1", Account::COLUMNS),
            params![email],
            Account::from_row,
        )
        .optional()?;
    Ok(account)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (DbPool, AuthConfig) {
        let pool = db::memory_pool().unwrap();
        db::run_migrations(&pool).unwrap();
        let auth = AuthConfig {
            bcrypt_cost: 4,
            ..AuthConfig::default()
        };
        (pool, auth)
    }

    #[test]
    fn sign_up_creates_account_profile_and_session() {
        let (pool, auth) = setup();
        let signed =
            sign_up(&pool, &auth, " Ana@Example.com ", "hunter22", Some("Ana")).unwrap();
        assert_eq!(signed.account.email, "ana@example.com");
        assert_eq!(signed.account.display_name.as_deref(), Some("Ana"));

        let ctx = current_session(&pool, &signed.token).unwrap().unwrap();
        assert_eq!(ctx.id, signed.account.id);

        let profile = profiles::get(&pool, &ctx.id).unwrap().unwrap();
        assert_eq!(profile.email, "ana@example.com");
        assert_eq!(profile.display_name.as_deref(), Some("Ana"));
    }

    #[test]
    fn sign_in_restores_a_missing_profile() {
        let (pool, auth) = setup();
        let signed = sign_up(&pool, &auth, "a@example.com", "secret1", Some("Ana")).unwrap();
        pool.get()
            .unwrap()
            .execute("DELETE FROM profiles WHERE id = ?1", params![signed.account.id])
            .unwrap();
        assert!(profiles::get(&pool, &signed.account.id).unwrap().is_none());

        sign_in(&pool, &auth, "a@example.com", "secret1").unwrap();
        let profile = profiles::get(&pool, &signed.account.id).unwrap().unwrap();
        assert_eq!(profile.email, "a@example.com");
        assert_eq!(profile.display_name.as_deref(), Some("Ana"));
    }

    #[test]
    fn first_account_is_admin_only() {
        let (pool, auth) = setup();
        let first = sign_up(&pool, &auth, "a@example.com", "secret1", None).unwrap();
        let second = sign_up(&pool, &auth, "b@example.com", "secret1", None).unwrap();
        assert!(first.account.is_admin);
        assert!(!second.account.is_admin);
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let (pool, auth) = setup();
        sign_up(&pool, &auth, "a@example.com", "secret1", None).unwrap();
        let err = sign_up(&pool, &auth, "A@example.com", "secret1", None).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn short_password_is_rejected() {
        let (pool, auth) = setup();
        let err = sign_up(&pool, &auth, "a@example.com", "123", None).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn sign_in_checks_password() {
        let (pool, auth) = setup();
        sign_up(&pool, &auth, "a@example.com", "secret1", None).unwrap();

        let ok = sign_in(&pool, &auth, "a@example.com", "secret1").unwrap();
        assert_eq!(ok.account.email, "a@example.com");

        let bad = sign_in(&pool, &auth, "a@example.com", "wrong-one").unwrap_err();
        assert!(matches!(bad, AppError::Unauthorized));

        let unknown = sign_in(&pool, &auth, "nobody@example.com", "secret1").unwrap_err();
        assert!(matches!(unknown, AppError::Unauthorized));
    }

    #[test]
    fn sign_out_ends_the_session() {
        let (pool, auth) = setup();
        let signed = sign_up(&pool, &auth, "a@example.com", "secret1", None).unwrap();
        sign_out(&pool, &signed.token).unwrap();
        assert!(current_session(&pool, &signed.token).unwrap().is_none());
    }
}
