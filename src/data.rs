use crate::config::{CATALOG_ENDPOINT, PLACEHOLDER_SPRITE};
use gloo_net::http::Request;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

pub type ItemId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    #[serde(default)]
    pub sprite_url: String,
}

impl Item {
    pub fn new(id: ItemId, name: impl Into<String>, sprite_url: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            sprite_url: sprite_url.into(),
        }
    }

    /// Fills a missing sprite with the placeholder image.
    pub fn normalized(mut self) -> Self {
        if self.sprite_url.trim().is_empty() {
            warn!("Missing sprite URL for item {} ({})", self.id, self.name);
            self.sprite_url = PLACEHOLDER_SPRITE.to_owned();
        }
        self
    }
}

#[derive(Debug)]
pub enum DataError {
    NotFound(String),
    Network(String),
    Parse(String),
}

impl DataError {
    pub(crate) fn network<E: fmt::Display>(err: E) -> Self {
        Self::Network(err.to_string())
    }

    pub(crate) fn parse<E: fmt::Display>(err: E) -> Self {
        Self::Parse(err.to_string())
    }
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataError::NotFound(what) => write!(f, "not found: {}", what),
            DataError::Network(message) => write!(f, "network error: {}", message),
            DataError::Parse(message) => write!(f, "parse error: {}", message),
        }
    }
}

impl std::error::Error for DataError {}

pub fn catalog_url(category: &str) -> String {
    format!("{}?gen={}", CATALOG_ENDPOINT, category)
}

/// Fetches the rankable items of one category, in server order.
pub async fn fetch_catalog(category: &str) -> Result<Vec<Item>, DataError> {
    let url = catalog_url(category);
    let response = Request::get(&url)
        .send()
        .await
        .map_err(DataError::network)?;

    if response.status() == 404 {
        return Err(DataError::NotFound(url));
    }

    if !response.ok() {
        return Err(DataError::Network(format!(
            "HTTP {} while fetching {}",
            response.status(),
            url
        )));
    }

    let text = response.text().await.map_err(DataError::network)?;
    parse_catalog(&text)
}

pub fn parse_catalog(text: &str) -> Result<Vec<Item>, DataError> {
    let raw_items: Vec<Item> = serde_json::from_str(text).map_err(DataError::parse)?;

    let mut seen = HashSet::new();
    let mut items = Vec::with_capacity(raw_items.len());
    for item in raw_items {
        if !seen.insert(item.id) {
            warn!("Skipping repeated catalog entry {} ({})", item.id, item.name);
            continue;
        }
        items.push(item.normalized());
    }

    Ok(items)
}
