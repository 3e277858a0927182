use super::{settle, MutationCallbacks};
use crate::auth;
use crate::cache::Invalidation;
use crate::error::AppResult;
use crate::extractors::AccountContext;
use crate::services::accounts::{self, AccountDeletion};
use crate::state::AppState;

/// Session and account lifecycle for the signed-in caller.
pub struct AccountHook<'a> {
    state: &'a AppState,
    ctx: &'a AccountContext,
}

impl<'a> AccountHook<'a> {
    pub fn new(state: &'a AppState, ctx: &'a AccountContext) -> Self {
        Self { state, ctx }
    }

    /// End the session behind `token` and drop the caller's private views.
    pub async fn sign_out(&self, token: &str, callbacks: MutationCallbacks<()>) -> AppResult<()> {
        let result = auth::sign_out(&self.state.db, token);
        let invalidation = |_: &()| Invalidation::SignedOut {
            account: self.ctx.id.clone(),
        };
        settle(&self.state.views, result, invalidation, callbacks).await
    }

    pub async fn delete_account(
        &self,
        account_id: &str,
        callbacks: MutationCallbacks<AccountDeletion>,
    ) -> AppResult<AccountDeletion> {
        let result = accounts::delete_account(
            &self.state.db,
            self.state.store.as_ref(),
            self.ctx,
            account_id,
        )
        .await;
        let invalidation = |deleted: &AccountDeletion| Invalidation::AccountDeleted {
            account: deleted.id.clone(),
        };
        settle(&self.state.views, result, invalidation, callbacks).await
    }
}
