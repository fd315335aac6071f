//! Source id to scraper mapping.

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::Config;
use crate::services::{HtmlListingScraper, SourceScraper};

/// Registered scrapers in registration order.
#[derive(Default)]
pub struct SourceRegistry {
    scrapers: Vec<Arc<dyn SourceScraper>>,
    index: HashMap<String, usize>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a scraper under `source_id`.
    ///
    /// The factory only runs if the id is free, and the scraper it builds must
    /// report the same id.
    pub fn register<F>(&mut self, source_id: &str, factory: F) -> Result<()>
    where
        F: FnOnce() -> Result<Arc<dyn SourceScraper>>,
    {
        if self.index.contains_key(source_id) {
            return Err(AppError::DuplicateSource(source_id.to_string()));
        }
        let scraper = factory()?;
        if scraper.source_id() != source_id {
            return Err(AppError::config(format!(
                "scraper registered as '{source_id}' reports id '{}'",
                scraper.source_id()
            )));
        }
        self.index
            .insert(source_id.to_string(), self.scrapers.len());
        self.scrapers.push(scraper);
        Ok(())
    }

    /// Look up a scraper by source id.
    pub fn get(&self, source_id: &str) -> Result<Arc<dyn SourceScraper>> {
        self.index
            .get(source_id)
            .map(|&i| Arc::clone(&self.scrapers[i]))
            .ok_or_else(|| AppError::UnknownSource(source_id.to_string()))
    }

    /// All scrapers in registration order.
    pub fn all(&self) -> &[Arc<dyn SourceScraper>] {
        &self.scrapers
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.scrapers.iter().map(|s| s.source_id())
    }

    pub fn len(&self) -> usize {
        self.scrapers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scrapers.is_empty()
    }

    /// Keep only the given sources, in registration order.
    ///
    /// Fails with `UnknownSource` for any id that is not registered.
    pub fn restrict_to(&self, source_ids: &[String]) -> Result<Self> {
        for id in source_ids {
            self.get(id)?;
        }
        let mut restricted = Self::new();
        for scraper in &self.scrapers {
            if source_ids.iter().any(|id| id == scraper.source_id()) {
                let id = scraper.source_id().to_string();
                let scraper = Arc::clone(scraper);
                restricted.register(&id, move || Ok(scraper))?;
            }
        }
        Ok(restricted)
    }

    /// Build a registry with one listing scraper per enabled source.
    pub fn from_config(config: &Config, client: &Client) -> Result<Self> {
        let mut registry = Self::new();
        for source in config.enabled_sources() {
            registry.register(&source.id, || {
                let scraper =
                    HtmlListingScraper::new(source.clone(), client.clone(), &config.http)?;
                Ok(Arc::new(scraper) as Arc<dyn SourceScraper>)
            })?;
        }
        log::info!("Registered {} source(s)", registry.len());
        Ok(registry)
    }
}
