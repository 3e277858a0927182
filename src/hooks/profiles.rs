use std::sync::Arc;

use super::{db_loader, settle, MutationCallbacks};
use crate::cache::{Invalidation, ViewKey};
use crate::db::models::AccountProfile;
use crate::error::AppResult;
use crate::extractors::AccountContext;
use crate::services::profiles::{self, ProfilePatch};
use crate::state::AppState;

/// Profiles: the caller's own, and sets of others' for display names.
pub struct ProfileHook<'a> {
    state: &'a AppState,
    ctx: &'a AccountContext,
}

impl<'a> ProfileHook<'a> {
    pub fn new(state: &'a AppState, ctx: &'a AccountContext) -> Self {
        Self { state, ctx }
    }

    pub fn key(&self) -> ViewKey {
        ViewKey::Profile(self.ctx.id.clone())
    }

    pub async fn profile(&self) -> AppResult<Arc<Option<AccountProfile>>> {
        let id = self.ctx.id.clone();
        let load = db_loader(&self.state.db, move |pool| profiles::get(pool, &id));
        self.state.views.get(self.key(), load).await
    }

    /// Profiles for `ids`. An empty set is answered without a lookup.
    pub async fn profiles(&self, ids: &[String]) -> AppResult<Arc<Vec<AccountProfile>>> {
        if ids.is_empty() {
            return Ok(Arc::new(Vec::new()));
        }
        let key = ViewKey::profiles(ids);
        let ids = ids.to_vec();
        let load = db_loader(&self.state.db, move |pool| profiles::get_many(pool, &ids));
        self.state.views.get(key, load).await
    }

    pub async fn is_loading(&self) -> bool {
        self.state.views.is_loading(&self.key()).await
    }

    pub async fn update(
        &self,
        patch: ProfilePatch,
        callbacks: MutationCallbacks<AccountProfile>,
    ) -> AppResult<AccountProfile> {
        let result = profiles::update(&self.state.db, self.ctx, patch);
        let invalidation = |_: &AccountProfile| Invalidation::Profile {
            owner: self.ctx.id.clone(),
        };
        settle(&self.state.views, result, invalidation, callbacks).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::testing;

    #[tokio::test]
    async fn renaming_refreshes_every_view_showing_the_name() {
        let (_tmp, state) = testing::state();
        let ana = testing::account(&state, "ana@example.com");
        let bob = testing::account(&state, "bob@example.com");
        let anas = ProfileHook::new(&state, &ana);
        let bobs = ProfileHook::new(&state, &bob);

        let pair = vec![ana.id.clone(), bob.id.clone()];
        assert_eq!(bobs.profiles(&pair).await.unwrap().len(), 2);
        let own = anas.profile().await.unwrap();
        assert_eq!(Option::clone(&own).unwrap().display_name, None);

        anas.update(
            ProfilePatch {
                display_name: Some("Ana".into()),
            },
            MutationCallbacks::none(),
        )
        .await
        .unwrap();

        let own = anas.profile().await.unwrap();
        let own = Option::clone(&own).unwrap();
        assert_eq!(own.display_name.as_deref(), Some("Ana"));
        let seen_by_bob = bobs.profiles(&pair).await.unwrap();
        let ana_row = seen_by_bob.iter().find(|p| p.id == ana.id).unwrap();
        assert_eq!(ana_row.display_name.as_deref(), Some("Ana"));
    }

    #[tokio::test]
    async fn empty_id_set_does_not_touch_the_cache() {
        let (_tmp, state) = testing::state();
        let ana = testing::account(&state, "ana@example.com");
        let hook = ProfileHook::new(&state, &ana);
        assert!(hook.profiles(&[]).await.unwrap().is_empty());
        assert_eq!(state.views.len().await, 0);
    }
}
