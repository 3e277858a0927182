use std::sync::Arc;

use super::{db_loader, settle, MutationCallbacks};
use crate::cache::{Invalidation, ViewKey};
use crate::catalog::Creature;
use crate::db::models::CreatureComment;
use crate::error::AppResult;
use crate::extractors::AccountContext;
use crate::services::creatures::{self, NewCreatureComment};
use crate::services::food::{CommentPatch, NewComment};
use crate::state::AppState;

/// Shortest query sent to the catalog.
pub const MIN_SEARCH_LEN: usize = 3;

/// Comments about one creature, written by anyone.
pub struct CreatureCommentHook<'a> {
    state: &'a AppState,
    ctx: &'a AccountContext,
    creature_id: i64,
}

fn invalidation(comment: &CreatureComment) -> Invalidation {
    Invalidation::CreatureComments {
        creature: comment.creature_id,
        owner: comment.user_id.clone(),
    }
}

impl<'a> CreatureCommentHook<'a> {
    pub fn new(state: &'a AppState, ctx: &'a AccountContext, creature_id: i64) -> Self {
        Self {
            state,
            ctx,
            creature_id,
        }
    }

    pub fn key(&self) -> ViewKey {
        ViewKey::CreatureComments(self.creature_id)
    }

    pub async fn comments(&self) -> AppResult<Arc<Vec<CreatureComment>>> {
        let creature_id = self.creature_id;
        let load = db_loader(&self.state.db, move |pool| {
            creatures::list_comments(pool, creature_id)
        });
        self.state.views.get(self.key(), load).await
    }

    pub async fn is_loading(&self) -> bool {
        self.state.views.is_loading(&self.key()).await
    }

    pub async fn create(
        &self,
        creature_name: &str,
        input: NewComment,
        callbacks: MutationCallbacks<CreatureComment>,
    ) -> AppResult<CreatureComment> {
        let input = NewCreatureComment {
            creature_id: self.creature_id,
            creature_name: creature_name.to_string(),
            comment: input,
        };
        let result = creatures::create_comment(&self.state.db, self.ctx, input);
        settle(&self.state.views, result, invalidation, callbacks).await
    }

    pub async fn update(
        &self,
        id: &str,
        patch: CommentPatch,
        callbacks: MutationCallbacks<CreatureComment>,
    ) -> AppResult<CreatureComment> {
        let result = creatures::update_comment(&self.state.db, self.ctx, id, patch);
        settle(&self.state.views, result, invalidation, callbacks).await
    }

    pub async fn delete(
        &self,
        id: &str,
        callbacks: MutationCallbacks<CreatureComment>,
    ) -> AppResult<CreatureComment> {
        let result = creatures::delete_comment(&self.state.db, self.ctx, id);
        settle(&self.state.views, result, invalidation, callbacks).await
    }
}

/// Every creature comment the caller has written.
pub struct AccountCreatureCommentsHook<'a> {
    state: &'a AppState,
    ctx: &'a AccountContext,
}

impl<'a> AccountCreatureCommentsHook<'a> {
    pub fn new(state: &'a AppState, ctx: &'a AccountContext) -> Self {
        Self { state, ctx }
    }

    pub fn key(&self) -> ViewKey {
        ViewKey::AccountCreatureComments(self.ctx.id.clone())
    }

    pub async fn comments(&self) -> AppResult<Arc<Vec<CreatureComment>>> {
        let owner = self.ctx.id.clone();
        let load = db_loader(&self.state.db, move |pool| {
            creatures::list_for_account(pool, &owner)
        });
        self.state.views.get(self.key(), load).await
    }

    pub async fn is_loading(&self) -> bool {
        self.state.views.is_loading(&self.key()).await
    }
}

/// Catalog search, cached per normalized query.
pub struct CreatureSearchHook<'a> {
    state: &'a AppState,
    query: String,
}

impl<'a> CreatureSearchHook<'a> {
    pub fn new(state: &'a AppState, query: &str) -> Self {
        Self {
            state,
            query: query.trim().to_lowercase(),
        }
    }

    /// Short queries are not sent to the catalog.
    pub fn is_enabled(&self) -> bool {
        self.query.chars().count() >= MIN_SEARCH_LEN
    }

    pub fn key(&self) -> ViewKey {
        ViewKey::CreatureSearch(self.query.clone())
    }

    /// Matching creatures. A failed search yields no results and is not
    /// cached, so the next call asks the catalog again.
    pub async fn results(&self) -> Arc<Vec<Creature>> {
        if !self.is_enabled() {
            return Arc::new(Vec::new());
        }

        let catalog = self.state.catalog.clone();
        let query = self.query.clone();
        let load = move || {
            let catalog = catalog.clone();
            let query = query.clone();
            async move { catalog.try_search(&query).await }
        };
        match self.state.views.get(self.key(), load).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(query = %self.query, "Creature search failed: {}", e);
                Arc::new(Vec::new())
            }
        }
    }

    pub async fn is_loading(&self) -> bool {
        self.state.views.is_loading(&self.key()).await
    }
}
