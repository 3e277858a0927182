//! Client for the public creature catalog (PokeAPI-shaped, read-only).

use std::time::Duration;

use futures::future::try_join_all;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::CatalogConfig;
use crate::error::AppResult;

const USER_AGENT: &str = concat!("quintet/", env!("CARGO_PKG_VERSION"));
/// Size of the name index fetched for approximate search.
const INDEX_LIMIT: usize = 1000;

/// A creature as shown in search results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Creature {
    pub id: i64,
    pub name: String,
    pub image_url: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Deserialize)]
struct CreatureDetails {
    id: i64,
    name: String,
    #[serde(default)]
    sprites: Sprites,
    #[serde(default)]
    types: Vec<TypeSlot>,
}

#[derive(Deserialize, Default)]
struct Sprites {
    front_default: Option<String>,
}

#[derive(Deserialize)]
struct TypeSlot {
    #[serde(rename = "type")]
    kind: NamedResource,
}

#[derive(Deserialize)]
struct NamedResource {
    name: String,
    #[serde(default)]
    url: String,
}

#[derive(Deserialize)]
struct NameIndex {
    results: Vec<NamedResource>,
}

impl From<CreatureDetails> for Creature {
    fn from(details: CreatureDetails) -> Self {
        Self {
            id: details.id,
            name: details.name,
            image_url: details.sprites.front_default,
            tags: details.types.into_iter().map(|t| t.kind.name).collect(),
        }
    }
}

#[derive(Clone)]
pub struct CatalogClient {
    client: Client,
    base_url: String,
    suggestion_limit: usize,
}

impl CatalogClient {
    pub fn new(config: &CatalogConfig) -> Result<Self, reqwest::Error> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            suggestion_limit: config.suggestion_limit,
        })
    }

    /// Exact lookup. `None` when the catalog has no creature by that name.
    pub async fn fetch_by_name(&self, name: &str) -> AppResult<Option<Creature>> {
        let name = name.trim().to_lowercase();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Ok(None);
        }

        let url = format!("{}/pokemon/{}", self.base_url, name);
        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let details: CreatureDetails = response.error_for_status()?.json().await?;
        Ok(Some(details.into()))
    }

    /// Names in the catalog index containing `query`, up to the suggestion
    /// limit, with their details fetched concurrently.
    pub async fn fetch_matching(&self, query: &str) -> AppResult<Vec<Creature>> {
        let needle = query.trim().to_lowercase();
        let url = format!("{}/pokemon?limit={}", self.base_url, INDEX_LIMIT);
        let index: NameIndex = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let lookups = index
            .results
            .into_iter()
            .filter(|entry| entry.name.contains(&needle))
            .take(self.suggestion_limit)
            .map(|entry| self.fetch_details(entry.url));
        try_join_all(lookups).await
    }

    async fn fetch_details(&self, url: String) -> AppResult<Creature> {
        let details: CreatureDetails = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(details.into())
    }

    /// Exact match first, then approximate matches.
    pub async fn try_search(&self, query: &str) -> AppResult<Vec<Creature>> {
        match self.fetch_by_name(query).await {
            Ok(Some(creature)) => return Ok(vec![creature]),
            Ok(None) => {}
            Err(e) => tracing::debug!(query, "Exact creature lookup failed: {}", e),
        }
        self.fetch_matching(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn details_map_to_creature() {
        let details: CreatureDetails = serde_json::from_str(
            r#"{
                "id": 25,
                "name": "pikachu",
                "sprites": {"front_default": "https://img/25.png", "back_default": null},
                "types": [{"slot": 1, "type": {"name": "electric", "url": "https://x/type/13/"}}],
                "height": 4
            }"#,
        )
        .unwrap();
        let creature = Creature::from(details);
        assert_eq!(creature.id, 25);
        assert_eq!(creature.image_url.as_deref(), Some("https://img/25.png"));
        assert_eq!(creature.tags, vec!["electric"]);
    }

    #[test]
    fn missing_sprite_is_none() {
        let details: CreatureDetails =
            serde_json::from_str(r#"{"id": 1, "name": "x", "sprites": {"front_default": null}, "types": []}"#)
                .unwrap();
        assert_eq!(Creature::from(details).image_url, None);
    }

    #[tokio::test]
    async fn odd_names_are_not_looked_up() {
        let client = CatalogClient::new(&CatalogConfig {
            base_url: "http://127.0.0.1:9".into(),
            ..CatalogConfig::default()
        })
        .unwrap();
        assert_eq!(client.fetch_by_name("../admin").await.unwrap(), None);
        assert_eq!(client.fetch_by_name("  ").await.unwrap(), None);
    }
}
