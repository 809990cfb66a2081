//! Storage providers for the tiered file store
//!
//! - `local`: a component's own namespace on disk
//! - `archive`: in-process archive writer behind the [`Archiver`] seam
//! - `transport`: the short-lived client role the Router plays toward a tier
//! - `session`: the persistent client connection toward the Router

pub mod archive;
mod local;
pub mod session;
pub mod transport;

pub use archive::{Archiver, TarArchiver};
pub use local::LocalStore;
pub use session::{Download, RouterSession};
pub use transport::TierClient;

use std::collections::HashMap;
use std::sync::Arc;
use tfs_core::{Config, TfsError, TfsResult, TierId};

/// Registry of the storage tiers the Router proxies to
pub struct TierRegistry {
    tiers: HashMap<TierId, Arc<TierClient>>,
}

impl TierRegistry {
    pub fn new() -> Self {
        Self { tiers: HashMap::new() }
    }

    /// Clients for the PDF and Text tiers described by `config`.
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::new();
        for tier in [TierId::Pdf, TierId::Text] {
            let component = config.component(tier);
            registry.register(Arc::new(TierClient::new(
                tier,
                component.listen,
                config.transfer.clone(),
            )));
        }
        registry
    }

    pub fn register(&mut self, client: Arc<TierClient>) {
        self.tiers.insert(client.tier(), client);
    }

    pub fn get(&self, tier: TierId) -> Option<Arc<TierClient>> {
        self.tiers.get(&tier).cloned()
    }

    pub fn get_or_err(&self, tier: TierId) -> TfsResult<Arc<TierClient>> {
        self.get(tier).ok_or_else(|| TfsError::TierUnavailable {
            tier: tier.to_string(),
            reason: "not registered".into(),
        })
    }
}

impl Default for TierRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_from_config_registers_both_tiers() {
        let config = Config::with_home(Path::new("/home/u"));
        let registry = TierRegistry::from_config(&config);
        assert_eq!(registry.get(TierId::Pdf).unwrap().addr(), config.pdf.listen);
        assert_eq!(registry.get(TierId::Text).unwrap().addr(), config.text.listen);
        assert!(registry.get(TierId::Router).is_none());
    }

    #[test]
    fn test_get_or_err() {
        let mut registry = TierRegistry::default();
        assert!(matches!(
            registry.get_or_err(TierId::Text),
            Err(TfsError::TierUnavailable { .. })
        ));
        let config = Config::with_home(Path::new("/h"));
        registry.register(Arc::new(TierClient::new(
            TierId::Text,
            config.text.listen,
            config.transfer.clone(),
        )));
        assert!(registry.get_or_err(TierId::Text).is_ok());
    }
}
