use std::sync::Arc;

use super::{db_loader, settle, MutationCallbacks};
use crate::cache::{Invalidation, ViewKey};
use crate::db::models::Image;
use crate::error::AppResult;
use crate::extractors::AccountContext;
use crate::services::images::{self, ImagePatch};
use crate::services::{Removal, Upload};
use crate::state::AppState;

/// The caller's photo gallery.
pub struct ImageHook<'a> {
    state: &'a AppState,
    ctx: &'a AccountContext,
}

impl<'a> ImageHook<'a> {
    pub fn new(state: &'a AppState, ctx: &'a AccountContext) -> Self {
        Self { state, ctx }
    }

    pub fn key(&self) -> ViewKey {
        ViewKey::Images(self.ctx.id.clone())
    }

    fn invalidation(&self) -> Invalidation {
        Invalidation::Images {
            owner: self.ctx.id.clone(),
        }
    }

    pub async fn images(&self) -> AppResult<Arc<Vec<Image>>> {
        let owner = self.ctx.id.clone();
        let load = db_loader(&self.state.db, move |pool| images::list(pool, &owner));
        self.state.views.get(self.key(), load).await
    }

    pub async fn is_loading(&self) -> bool {
        self.state.views.is_loading(&self.key()).await
    }

    pub async fn upload(&self, file: Upload, callbacks: MutationCallbacks<Image>) -> AppResult<Image> {
        let result = images::upload(&self.state.db, self.state.store.as_ref(), self.ctx, file).await;
        settle(&self.state.views, result, |_| self.invalidation(), callbacks).await
    }

    pub async fn update(
        &self,
        id: &str,
        patch: ImagePatch,
        callbacks: MutationCallbacks<Image>,
    ) -> AppResult<Image> {
        let result = images::update(&self.state.db, self.ctx, id, patch);
        settle(&self.state.views, result, |_| self.invalidation(), callbacks).await
    }

    pub async fn delete(&self, id: &str, callbacks: MutationCallbacks<Removal>) -> AppResult<Removal> {
        let result = images::delete(&self.state.db, self.state.store.as_ref(), self.ctx, id).await;
        settle(&self.state.views, result, |_| self.invalidation(), callbacks).await
    }
}
