//! Performance counter catalog
//!
//! Maps qualified counter names (`group.name.rollup`) to the provider's
//! numeric counter ids. The full list is expensive to fetch, so it is cached
//! as newline-delimited `name,id` pairs and rebuilt once the cache is older
//! than [`CACHE_MAX_AGE_DAYS`].

mod store;

#[cfg(test)]
mod tests;

pub use store::{CacheStore, Clock, FileCacheStore, SystemClock};
pub(crate) use store::replace_file;

use crate::error::CatalogError;
use crate::provider::InfrastructureProvider;
use chrono::Duration;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Cache invalidation window
pub const CACHE_MAX_AGE_DAYS: i64 = 7;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CounterCatalog {
    entries: HashMap<String, i32>,
}

impl CounterCatalog {
    pub fn from_entries(entries: HashMap<String, i32>) -> Self {
        Self { entries }
    }

    /// Load the catalog from `store`, rebuilding it from the provider when
    /// the cache is missing, stale or empty
    pub async fn load_or_refresh(
        provider: &dyn InfrastructureProvider,
        store: &dyn CacheStore,
        clock: &dyn Clock,
    ) -> Result<Self, CatalogError> {
        if let Some(modified) = store.modified()? {
            let age = clock.now().signed_duration_since(modified);
            if age <= Duration::days(CACHE_MAX_AGE_DAYS) {
                let entries = parse_cache(&store.read()?);
                if !entries.is_empty() {
                    debug!(entries = entries.len(), "Loaded counter catalog from cache");
                    return Ok(Self { entries });
                }
                warn!("Counter cache is empty, rebuilding");
            } else {
                info!(age_hours = age.num_hours(), "Counter cache is stale, rebuilding");
            }
        }

        let entries: HashMap<String, i32> = provider
            .perf_counters()
            .await?
            .into_iter()
            .map(|counter| (counter.qualified_name(), counter.key))
            .collect();

        if let Err(e) = store.write(&render_cache(&entries)) {
            warn!(error = %e, "Failed to persist counter cache");
        }
        info!(entries = entries.len(), "Rebuilt counter catalog");

        Ok(Self { entries })
    }

    pub fn resolve(&self, qualified_name: &str) -> Result<i32, CatalogError> {
        self.entries
            .get(qualified_name)
            .copied()
            .ok_or_else(|| CatalogError::UnknownCounter(qualified_name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse `name,id` lines; malformed lines are skipped
pub fn parse_cache(contents: &str) -> HashMap<String, i32> {
    let mut entries = HashMap::new();

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line.rsplit_once(',') {
            Some((name, id)) => match id.trim().parse::<i32>() {
                Ok(id) => {
                    entries.insert(name.trim().to_string(), id);
                }
                Err(_) => warn!(line = %line, "Skipping malformed counter cache line"),
            },
            None => warn!(line = %line, "Skipping malformed counter cache line"),
        }
    }

    entries
}

/// Render entries as sorted `name,id` lines
pub fn render_cache(entries: &HashMap<String, i32>) -> String {
    let mut names: Vec<&String> = entries.keys().collect();
    names.sort();

    let mut out = String::new();
    for name in names {
        out.push_str(&format!("{},{}\n", name, entries[name]));
    }
    out
}
