//! Property fetcher
//!
//! Traverses every object of one managed-object type reachable from the
//! root folder and returns the requested properties of each, following
//! continuation tokens until the provider reports no more pages.

use crate::error::ProviderError;
use crate::models::{ManagedObjectRecord, MoRef, ObjectKind};
use crate::provider::InfrastructureProvider;
use tracing::{debug, warn};

pub struct PropertyFetcher<'a> {
    provider: &'a dyn InfrastructureProvider,
}

impl<'a> PropertyFetcher<'a> {
    pub fn new(provider: &'a dyn InfrastructureProvider) -> Self {
        Self { provider }
    }

    /// Fetch `properties` for all objects of `kind`
    ///
    /// Properties an object does not have are simply absent from its
    /// attribute map. The container view is destroyed even when a page
    /// request fails.
    pub async fn fetch(
        &self,
        kind: ObjectKind,
        properties: &[&str],
    ) -> Result<Vec<ManagedObjectRecord>, ProviderError> {
        let properties: Vec<String> = properties.iter().map(|p| p.to_string()).collect();
        let view = self.provider.create_container_view(kind).await?;

        let result = self.retrieve_all(&view, kind, &properties).await;

        if let Err(e) = self.provider.destroy_view(&view).await {
            warn!(view = %view, error = %e, "Failed to destroy container view");
        }

        result
    }

    async fn retrieve_all(
        &self,
        view: &MoRef,
        kind: ObjectKind,
        properties: &[String],
    ) -> Result<Vec<ManagedObjectRecord>, ProviderError> {
        let mut page = self
            .provider
            .retrieve_properties(view, kind, properties)
            .await?;
        let mut records = std::mem::take(&mut page.objects);
        let mut pages = 1usize;

        while let Some(token) = page.token.take() {
            page = self.provider.continue_retrieve(&token).await?;
            records.append(&mut page.objects);
            pages += 1;
        }

        debug!(kind = %kind, pages = pages, records = records.len(), "Fetched properties");
        Ok(records)
    }
}
