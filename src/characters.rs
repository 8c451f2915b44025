use std::collections::HashMap;
use std::env;
use std::time::Duration;

use anyhow::Context as _;
use serde::Deserialize;

use crate::site;

/// Every character page the prerender pass produces, keyed by upstream id.
pub const CHARACTER_IDS: [u32; 10] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10];

const DEFAULT_API_BASE: &str = "https://swapi.dev/api";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Deserialize)]
pub struct Character {
    pub name: String,
    pub birth_year: String,
}

pub struct CharacterApi {
    client: reqwest::Client,
    base_url: String,
}

impl CharacterApi {
    pub fn from_env() -> anyhow::Result<Self> {
        let base_url =
            env::var("SITESNAP_CHARACTER_API").unwrap_or_else(|_| DEFAULT_API_BASE.to_owned());
        Self::new(&base_url)
    }

    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(site::USER_AGENT)
            .build()
            .context("build character api client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    fn people_url(&self, id: u32) -> String {
        format!("{}/people/{id}/", self.base_url)
    }

    pub async fn fetch(&self, id: u32) -> anyhow::Result<Character> {
        let url = self.people_url(id);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("request {url}"))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("character request failed ({status}): {body}");
        }
        resp.json::<Character>()
            .await
            .with_context(|| format!("decode character {id}"))
    }
}

/// Characters fetched ahead of rendering. Ids that failed to fetch are simply
/// absent; lookups return `None` and the caller renders a placeholder.
#[derive(Debug, Default)]
pub struct PrefetchCache {
    characters: HashMap<u32, Character>,
}

impl PrefetchCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn populate(&mut self, id: u32, character: Character) {
        self.characters.insert(id, character);
    }

    pub fn get(&self, id: u32) -> Option<&Character> {
        self.characters.get(&id)
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }
}

/// Fetches all requested characters concurrently. A failed fetch is logged
/// and leaves its id out of the cache instead of failing the run.
pub async fn prefetch(api: &CharacterApi, ids: &[u32], cache: &mut PrefetchCache) {
    let requests = ids.iter().map(|&id| async move { (id, api.fetch(id).await) });
    for (id, fetched) in futures::future::join_all(requests).await {
        match fetched {
            Ok(character) => cache.populate(id, character),
            Err(err) => tracing::warn!(id, ?err, "character prefetch failed"),
        }
    }
}
