//! Scoped provider sessions
//!
//! A [`Session`] owns one logged-in provider connection. Work is run through
//! [`Session::scoped`], which logs out afterwards whatever the work returned.

use crate::error::ProviderError;
use crate::provider::{ConnectParams, InfrastructureProvider, VimClient};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct Session {
    provider: Arc<dyn InfrastructureProvider>,
}

impl Session {
    /// Wrap an already authenticated provider
    pub fn new(provider: Arc<dyn InfrastructureProvider>) -> Self {
        Self { provider }
    }

    /// Connect and log in to a vSphere endpoint
    ///
    /// Nothing needs releasing when this fails, since no session exists yet.
    pub async fn connect(params: &ConnectParams) -> Result<Self, ProviderError> {
        let client = VimClient::connect(params).await?;
        Ok(Self::new(Arc::new(client)))
    }

    /// Run `work` against the session, then log out
    pub async fn scoped<T, F, Fut>(self, work: F) -> T
    where
        F: FnOnce(Arc<dyn InfrastructureProvider>) -> Fut,
        Fut: Future<Output = T>,
    {
        let result = work(Arc::clone(&self.provider)).await;
        self.close().await;
        result
    }

    /// Log out; failures are logged and swallowed
    pub async fn close(self) {
        match self.provider.logout().await {
            Ok(()) => debug!("Session closed"),
            Err(e) => warn!(error = %e, "Failed to log out of provider session"),
        }
    }
}
