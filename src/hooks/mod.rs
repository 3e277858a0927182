//! Data hooks: each wraps one service behind the view cache.
//!
//! A hook serves its list from the cache, reports whether a load is in
//! flight, and runs mutations. After a mutation succeeds the hook applies
//! its [`Invalidation`] and waits for the affected views to reload before
//! calling `on_success` and returning, so the next read sees the write.

mod accounts;
mod creatures;
mod food;
mod images;
mod notes;
mod profiles;
mod tasks;

pub use accounts::AccountHook;
pub use creatures::{AccountCreatureCommentsHook, CreatureCommentHook, CreatureSearchHook};
pub use food::{FoodCommentHook, FoodPostHook};
pub use images::ImageHook;
pub use notes::NoteHook;
pub use profiles::ProfileHook;
pub use tasks::TaskHook;

use std::future::{ready, Ready};

use crate::cache::{Invalidation, ViewCache};
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

type SuccessFn<T> = Box<dyn FnOnce(&T) + Send>;
type ErrorFn = Box<dyn FnOnce(&AppError) + Send>;

/// Per-call completion callbacks for a hook mutation.
pub struct MutationCallbacks<T> {
    on_success: Option<SuccessFn<T>>,
    on_error: Option<ErrorFn>,
}

impl<T> Default for MutationCallbacks<T> {
    fn default() -> Self {
        Self {
            on_success: None,
            on_error: None,
        }
    }
}

impl<T> MutationCallbacks<T> {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn on_success(mut self, f: impl FnOnce(&T) + Send + 'static) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnOnce(&AppError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }
}

/// Finish a mutation: invalidate and refresh on success, then notify.
pub(crate) async fn settle<T>(
    views: &ViewCache,
    result: AppResult<T>,
    invalidation: impl FnOnce(&T) -> Invalidation,
    callbacks: MutationCallbacks<T>,
) -> AppResult<T> {
    match result {
        Ok(value) => {
            views.invalidate(&invalidation(&value)).await;
            if let Some(f) = callbacks.on_success {
                f(&value);
            }
            Ok(value)
        }
        Err(e) => {
            if let Some(f) = callbacks.on_error {
                f(&e);
            }
            Err(e)
        }
    }
}

/// A cache loader running a synchronous service query against the pool.
pub(crate) fn db_loader<T, F>(
    pool: &DbPool,
    query: F,
) -> impl Fn() -> Ready<AppResult<T>> + Send + Sync + 'static
where
    T: 'static,
    F: Fn(&DbPool) -> AppResult<T> + Send + Sync + 'static,
{
    let pool = pool.clone();
    move || ready(query(&pool))
}
