//! Application state shared across handlers.

use std::sync::Arc;

use crate::auth::{AuthorizationPipeline, IdentityProvider, IdentityVerifier, ServiceTokenCache};
use crate::config::ServerConfig;
use crate::db::OrderStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the order store and the authorization pipeline.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    orders: Arc<dyn OrderStore>,
    pipeline: AuthorizationPipeline,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Builds the process-wide [`ServiceTokenCache`] and wires it into the
    /// authorization pipeline.
    ///
    /// # Arguments
    ///
    /// * `config` - Server configuration
    /// * `orders` - Order storage
    /// * `provider` - Identity provider used for token validation and lookups
    #[must_use]
    pub fn new(
        config: ServerConfig,
        orders: Arc<dyn OrderStore>,
        provider: Arc<dyn IdentityProvider>,
    ) -> Self {
        let tokens = Arc::new(ServiceTokenCache::new(provider.clone()));
        let verifier = IdentityVerifier::new(provider.clone(), tokens, config.identity.timeout);
        let pipeline = AuthorizationPipeline::new(provider, verifier);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                orders,
                pipeline,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the order store.
    #[must_use]
    pub fn orders(&self) -> &dyn OrderStore {
        self.inner.orders.as_ref()
    }

    /// Get a reference to the authorization pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &AuthorizationPipeline {
        &self.inner.pipeline
    }
}
