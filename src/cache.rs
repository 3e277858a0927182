//! Cached list views and the mutations that invalidate them.
//!
//! Every view remembers the loader that produced it. A mutation names an
//! [`Invalidation`]; the cache marks the affected views stale, bumps their
//! generation and re-runs their loaders. A load that started before an
//! invalidation never lands in the cache, so cache content always reflects
//! the last confirmed write.
//!
//! Views that are not scoped to an account (comment threads, searches,
//! profile sets) are keyed by whatever a caller asks for, so they are held
//! in least-recently-read order and capped at a fixed count.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use lru::LruCache;
use tokio::sync::Mutex;

use crate::error::AppResult;

/// A cached list, identified by what it lists and whose it is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ViewKey {
    Tasks(String),
    Images(String),
    FoodPosts(String),
    /// Comments under one food post.
    FoodComments(String),
    /// Comments about one catalog creature.
    CreatureComments(i64),
    /// Every creature comment written by one account.
    AccountCreatureComments(String),
    Notes(String),
    Profile(String),
    /// A set of profiles, ids sorted and deduplicated.
    Profiles(Vec<String>),
    CreatureSearch(String),
}

impl ViewKey {
    pub fn profiles(ids: &[String]) -> Self {
        let mut ids = ids.to_vec();
        ids.sort();
        ids.dedup();
        ViewKey::Profiles(ids)
    }

    /// The account whose private view this is.
    pub fn account(&self) -> Option<&str> {
        match self {
            ViewKey::Tasks(owner)
            | ViewKey::Images(owner)
            | ViewKey::FoodPosts(owner)
            | ViewKey::AccountCreatureComments(owner)
            | ViewKey::Notes(owner)
            | ViewKey::Profile(owner) => Some(owner),
            ViewKey::FoodComments(_)
            | ViewKey::CreatureComments(_)
            | ViewKey::Profiles(_)
            | ViewKey::CreatureSearch(_) => None,
        }
    }
}

/// A confirmed mutation, named by what it changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invalidation {
    Tasks { owner: String },
    Images { owner: String },
    FoodPostSaved { owner: String },
    FoodPostDeleted { owner: String, post: String },
    FoodComments { post: String },
    CreatureComments { creature: i64, owner: String },
    Notes { owner: String },
    Profile { owner: String },
    SignedOut { account: String },
    AccountDeleted { account: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Keep,
    /// Mark stale and reload.
    Refresh,
    /// Drop the view and its loader.
    Evict,
}

impl Invalidation {
    /// What this mutation does to one cached view.
    pub fn effect(&self, key: &ViewKey) -> Effect {
        let hit = match (self, key) {
            (Invalidation::Tasks { owner }, ViewKey::Tasks(o)) => owner == o,
            (Invalidation::Images { owner }, ViewKey::Images(o)) => owner == o,
            (Invalidation::FoodPostSaved { owner }, ViewKey::FoodPosts(o)) => owner == o,
            (Invalidation::FoodPostDeleted { owner, .. }, ViewKey::FoodPosts(o)) => owner == o,
            (Invalidation::FoodPostDeleted { post, .. }, ViewKey::FoodComments(p)) => {
                return if post == p { Effect::Evict } else { Effect::Keep };
            }
            (Invalidation::FoodComments { post }, ViewKey::FoodComments(p)) => post == p,
            (Invalidation::CreatureComments { creature, .. }, ViewKey::CreatureComments(c)) => {
                creature == c
            }
            (
                Invalidation::CreatureComments { owner, .. },
                ViewKey::AccountCreatureComments(o),
            ) => owner == o,
            (Invalidation::Notes { owner }, ViewKey::Notes(o)) => owner == o,
            (Invalidation::Profile { owner }, ViewKey::Profile(o)) => owner == o,
            (Invalidation::Profile { owner }, ViewKey::Profiles(ids)) => ids.contains(owner),
            (Invalidation::SignedOut { account }, key) => {
                return if key.account() == Some(account.as_str()) {
                    Effect::Evict
                } else {
                    Effect::Keep
                };
            }
            (Invalidation::AccountDeleted { account }, key) => {
                if key.account() == Some(account.as_str()) {
                    return Effect::Evict;
                }
                match key {
                    ViewKey::FoodComments(_) | ViewKey::CreatureComments(_) => true,
                    ViewKey::Profiles(ids) => ids.contains(account),
                    _ => false,
                }
            }
            _ => false,
        };
        if hit {
            Effect::Refresh
        } else {
            Effect::Keep
        }
    }
}

type Value = Arc<dyn Any + Send + Sync>;
type Loader = Arc<dyn Fn() -> BoxFuture<'static, AppResult<Value>> + Send + Sync>;

struct Entry {
    generation: u64,
    stale: bool,
    value: Option<Value>,
    loader: Loader,
}

struct Views {
    entries: HashMap<ViewKey, Entry>,
    loading: HashMap<ViewKey, usize>,
    /// Read order of the shared views.
    shared: LruCache<ViewKey, ()>,
}

impl Views {
    fn new(shared_capacity: NonZeroUsize) -> Self {
        Self {
            entries: HashMap::new(),
            loading: HashMap::new(),
            shared: LruCache::new(shared_capacity),
        }
    }

    /// Note a read of `key`. Reading a shared view past capacity drops the
    /// least recently read one.
    fn touch(&mut self, key: &ViewKey) {
        if key.account().is_some() {
            return;
        }
        if let Some((oldest, ())) = self.shared.push(key.clone(), ()) {
            if &oldest != key {
                tracing::debug!(key = ?oldest, "Shared view dropped");
                self.entries.remove(&oldest);
            }
        }
    }

    fn forget(&mut self, key: &ViewKey) {
        self.entries.remove(key);
        self.shared.pop(key);
    }

    fn start_loading(&mut self, key: &ViewKey) {
        *self.loading.entry(key.clone()).or_insert(0) += 1;
    }

    fn finish_loading(&mut self, key: &ViewKey) {
        if let Some(count) = self.loading.get_mut(key) {
            *count -= 1;
            if *count == 0 {
                self.loading.remove(key);
            }
        }
    }
}

/// A reader that keeps losing to invalidations gets the freshest value it
/// loaded, uncached, after this many retries.
const MAX_RELOADS: usize = 3;

/// How many shared views stay cached.
pub const SHARED_VIEW_CAPACITY: usize = 256;

pub struct ViewCache {
    views: Mutex<Views>,
    clock: AtomicU64,
}

impl Default for ViewCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewCache {
    pub fn new() -> Self {
        Self::with_shared_capacity(SHARED_VIEW_CAPACITY)
    }

    pub fn with_shared_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            views: Mutex::new(Views::new(capacity)),
            clock: AtomicU64::new(0),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Return the view at `key`, loading it with `load` when it is missing or
    /// stale. `load` is kept for later refreshes. A view whose first load
    /// fails is not kept.
    pub async fn get<T, F, Fut>(&self, key: ViewKey, load: F) -> AppResult<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<T>> + Send + 'static,
    {
        let load = Arc::new(load);
        let loader: Loader = {
            let load = load.clone();
            Arc::new(move || {
                let fut = load();
                async move { fut.await.map(|v| Arc::new(v) as Value) }.boxed()
            })
        };

        let mut attempt = 0;
        loop {
            let generation = {
                let mut views = self.views.lock().await;
                let fresh = self.tick();
                views.touch(&key);
                let entry = views.entries.entry(key.clone()).or_insert_with(|| Entry {
                    generation: fresh,
                    stale: true,
                    value: None,
                    loader: loader.clone(),
                });
                entry.loader = loader.clone();
                if !entry.stale {
                    if let Some(cached) = entry.value.clone().and_then(|v| v.downcast::<T>().ok()) {
                        return Ok(cached);
                    }
                }
                let generation = entry.generation;
                views.start_loading(&key);
                generation
            };

            let result = load().await;

            let mut views = self.views.lock().await;
            views.finish_loading(&key);
            let value = match result {
                Ok(value) => Arc::new(value),
                Err(e) => {
                    if views.entries.get(&key).is_some_and(|entry| entry.value.is_none()) {
                        views.forget(&key);
                    }
                    return Err(e);
                }
            };
            match views.entries.get_mut(&key) {
                Some(entry) if entry.generation == generation => {
                    entry.value = Some(value.clone() as Value);
                    entry.stale = false;
                    return Ok(value);
                }
                Some(_) if attempt < MAX_RELOADS => {
                    tracing::debug!(?key, "View invalidated while loading, reloading");
                    attempt += 1;
                }
                // Evicted, or still racing writers: serve without caching.
                _ => return Ok(value),
            }
        }
    }

    /// Cached value at `key`, fresh or stale.
    pub async fn peek<T: Send + Sync + 'static>(&self, key: &ViewKey) -> Option<Arc<T>> {
        let views = self.views.lock().await;
        views
            .entries
            .get(key)
            .and_then(|entry| entry.value.clone())
            .and_then(|v| v.downcast::<T>().ok())
    }

    pub async fn is_loading(&self, key: &ViewKey) -> bool {
        self.views.lock().await.loading.contains_key(key)
    }

    /// `None` when the view is not cached.
    pub async fn is_stale(&self, key: &ViewKey) -> Option<bool> {
        let views = self.views.lock().await;
        views.entries.get(key).map(|entry| entry.stale)
    }

    /// Apply a mutation and refresh exactly the views it invalidated.
    /// Returns the refreshed keys.
    pub async fn invalidate(&self, invalidation: &Invalidation) -> Vec<ViewKey> {
        let stale = self.mark(invalidation).await;
        self.refresh(&stale).await;
        stale
    }

    /// Mark and evict without reloading.
    async fn mark(&self, invalidation: &Invalidation) -> Vec<ViewKey> {
        let mut views = self.views.lock().await;
        let mut stale = Vec::new();
        let mut evicted = Vec::new();
        for (key, entry) in views.entries.iter_mut() {
            match invalidation.effect(key) {
                Effect::Keep => {}
                Effect::Refresh => {
                    entry.stale = true;
                    entry.generation = self.tick();
                    stale.push(key.clone());
                }
                Effect::Evict => evicted.push(key.clone()),
            }
        }
        for key in &evicted {
            views.forget(key);
        }
        tracing::debug!(
            ?invalidation,
            stale = stale.len(),
            evicted = evicted.len(),
            "Views invalidated"
        );
        stale
    }

    /// Re-run the stored loaders of stale views. Failures leave the view
    /// stale so the next read loads it again.
    pub async fn refresh(&self, keys: &[ViewKey]) {
        join_all(keys.iter().map(|key| self.refresh_one(key))).await;
    }

    async fn refresh_one(&self, key: &ViewKey) {
        let (generation, loader) = {
            let mut views = self.views.lock().await;
            let Some(entry) = views.entries.get(key) else {
                return;
            };
            if !entry.stale {
                return;
            }
            let pending = (entry.generation, entry.loader.clone());
            views.start_loading(key);
            pending
        };

        let result = loader().await;

        let mut views = self.views.lock().await;
        views.finish_loading(key);
        match result {
            Ok(value) => {
                if let Some(entry) = views.entries.get_mut(key) {
                    if entry.generation == generation {
                        entry.value = Some(value);
                        entry.stale = false;
                    }
                }
            }
            Err(e) => tracing::warn!(?key, "View refresh failed: {}", e),
        }
    }

    pub async fn len(&self) -> usize {
        self.views.lock().await.entries.len()
    }
}
