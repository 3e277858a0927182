use std::sync::Arc;

use super::{db_loader, settle, MutationCallbacks};
use crate::cache::{Invalidation, ViewKey};
use crate::db::models::{FoodComment, FoodPost};
use crate::error::AppResult;
use crate::extractors::AccountContext;
use crate::services::food::{self, CommentPatch, FoodPostPatch, NewComment};
use crate::services::{Removal, Upload};
use crate::state::AppState;

/// The caller's food posts.
pub struct FoodPostHook<'a> {
    state: &'a AppState,
    ctx: &'a AccountContext,
}

impl<'a> FoodPostHook<'a> {
    pub fn new(state: &'a AppState, ctx: &'a AccountContext) -> Self {
        Self { state, ctx }
    }

    pub fn key(&self) -> ViewKey {
        ViewKey::FoodPosts(self.ctx.id.clone())
    }

    pub async fn posts(&self) -> AppResult<Arc<Vec<FoodPost>>> {
        let owner = self.ctx.id.clone();
        let load = db_loader(&self.state.db, move |pool| food::list_posts(pool, &owner));
        self.state.views.get(self.key(), load).await
    }

    pub async fn is_loading(&self) -> bool {
        self.state.views.is_loading(&self.key()).await
    }

    fn saved(&self) -> Invalidation {
        Invalidation::FoodPostSaved {
            owner: self.ctx.id.clone(),
        }
    }

    pub async fn upload(
        &self,
        file: Upload,
        name: &str,
        callbacks: MutationCallbacks<FoodPost>,
    ) -> AppResult<FoodPost> {
        let result =
            food::upload_post(&self.state.db, self.state.store.as_ref(), self.ctx, file, name).await;
        settle(&self.state.views, result, |_| self.saved(), callbacks).await
    }

    pub async fn update(
        &self,
        id: &str,
        patch: FoodPostPatch,
        callbacks: MutationCallbacks<FoodPost>,
    ) -> AppResult<FoodPost> {
        let result = food::update_post(&self.state.db, self.ctx, id, patch);
        settle(&self.state.views, result, |_| self.saved(), callbacks).await
    }

    pub async fn delete(&self, id: &str, callbacks: MutationCallbacks<Removal>) -> AppResult<Removal> {
        let result = food::delete_post(&self.state.db, self.state.store.as_ref(), self.ctx, id).await;
        let invalidation = |removal: &Removal| Invalidation::FoodPostDeleted {
            owner: self.ctx.id.clone(),
            post: removal.id.clone(),
        };
        settle(&self.state.views, result, invalidation, callbacks).await
    }
}

/// Comments under one food post, written by anyone.
pub struct FoodCommentHook<'a> {
    state: &'a AppState,
    ctx: &'a AccountContext,
    post_id: String,
}

impl<'a> FoodCommentHook<'a> {
    pub fn new(state: &'a AppState, ctx: &'a AccountContext, post_id: impl Into<String>) -> Self {
        Self {
            state,
            ctx,
            post_id: post_id.into(),
        }
    }

    pub fn key(&self) -> ViewKey {
        ViewKey::FoodComments(self.post_id.clone())
    }

    fn invalidation(&self, comment: &FoodComment) -> Invalidation {
        Invalidation::FoodComments {
            post: comment.food_post_id.clone(),
        }
    }

    pub async fn comments(&self) -> AppResult<Arc<Vec<FoodComment>>> {
        let post_id = self.post_id.clone();
        let load = db_loader(&self.state.db, move |pool| food::list_comments(pool, &post_id));
        self.state.views.get(self.key(), load).await
    }

    pub async fn is_loading(&self) -> bool {
        self.state.views.is_loading(&self.key()).await
    }

    pub async fn create(
        &self,
        input: NewComment,
        callbacks: MutationCallbacks<FoodComment>,
    ) -> AppResult<FoodComment> {
        let result = food::create_comment(&self.state.db, self.ctx, &self.post_id, input);
        settle(&self.state.views, result, |c| self.invalidation(c), callbacks).await
    }

    pub async fn update(
        &self,
        id: &str,
        patch: CommentPatch,
        callbacks: MutationCallbacks<FoodComment>,
    ) -> AppResult<FoodComment> {
        let result = food::update_comment(&self.state.db, self.ctx, id, patch);
        settle(&self.state.views, result, |c| self.invalidation(c), callbacks).await
    }

    pub async fn delete(
        &self,
        id: &str,
        callbacks: MutationCallbacks<FoodComment>,
    ) -> AppResult<FoodComment> {
        let result = food::delete_comment(&self.state.db, self.ctx, id);
        settle(&self.state.views, result, |c| self.invalidation(c), callbacks).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SHARED_VIEW_CAPACITY;
    use crate::hooks::testing;
    use bytes::Bytes;

    fn photo() -> Upload {
        Upload {
            file_name: "soup.jpg".into(),
            content_type: Some("image/jpeg".into()),
            data: Bytes::from_static(b"soup"),
        }
    }

    #[tokio::test]
    async fn commenters_and_authors_share_the_comment_view() {
        let (_tmp, state) = testing::state();
        let ana = testing::account(&state, "ana@example.com");
        let bob = testing::account(&state, "bob@example.com");

        let post = FoodPostHook::new(&state, &ana)
            .upload(photo(), "Soup", MutationCallbacks::none())
            .await
            .unwrap();

        let anas_view = FoodCommentHook::new(&state, &ana, post.id.clone());
        let bobs_view = FoodCommentHook::new(&state, &bob, post.id.clone());
        assert!(anas_view.comments().await.unwrap().is_empty());

        let comment = bobs_view
            .create(
                NewComment {
                    rating: 5,
                    body: "Hearty".into(),
                },
                MutationCallbacks::none(),
            )
            .await
            .unwrap();
        assert_eq!(*anas_view.comments().await.unwrap(), vec![comment.clone()]);

        let edited = bobs_view
            .update(
                &comment.id,
                CommentPatch {
                    rating: Some(3),
                    body: None,
                },
                MutationCallbacks::none(),
            )
            .await
            .unwrap();
        assert_eq!(anas_view.comments().await.unwrap()[0].rating, edited.rating);
    }

    #[tokio::test]
    async fn deleting_a_post_clears_its_comment_view() {
        let (_tmp, state) = testing::state();
        let ana = testing::account(&state, "ana@example.com");
        let posts = FoodPostHook::new(&state, &ana);

        let post = posts
            .upload(photo(), "Soup", MutationCallbacks::none())
            .await
            .unwrap();
        let comments = FoodCommentHook::new(&state, &ana, post.id.clone());
        comments
            .create(
                NewComment {
                    rating: 4,
                    body: "Good".into(),
                },
                MutationCallbacks::none(),
            )
            .await
            .unwrap();
        assert_eq!(comments.comments().await.unwrap().len(), 1);
        assert_eq!(posts.posts().await.unwrap().len(), 1);

        posts.delete(&post.id, MutationCallbacks::none()).await.unwrap();
        assert!(posts.posts().await.unwrap().is_empty());
        assert!(state
            .views
            .peek::<Vec<FoodComment>>(&comments.key())
            .await
            .is_none());
        assert!(comments.comments().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_post_ids_do_not_grow_the_cache_unbounded() {
        let (_tmp, state) = testing::state();
        let ana = testing::account(&state, "ana@example.com");
        let own = FoodPostHook::new(&state, &ana);
        own.posts().await.unwrap();

        for i in 0..(SHARED_VIEW_CAPACITY + 200) {
            let thread = FoodCommentHook::new(&state, &ana, format!("no-such-post-{}", i));
            assert!(thread.comments().await.unwrap().is_empty());
        }
        assert_eq!(state.views.len().await, SHARED_VIEW_CAPACITY + 1);
        assert!(state
            .views
            .peek::<Vec<FoodPost>>(&own.key())
            .await
            .is_some());
    }
}
