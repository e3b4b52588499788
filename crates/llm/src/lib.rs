//! LLM client implementations: the local HTTP backend and the deterministic
//! mock, plus the provider factory.

mod http;
mod mock;

pub use http::{HttpLlmClient, Timeouts};
pub use mock::{MockLlmClient, RecordedCall};

use std::sync::Arc;

use maestro_core::{
    error::{Error, Result},
    traits::LlmClient,
    Provider, RuntimeConfig,
};

/// Build the LLM client selected by configuration.
pub fn client_for(config: &RuntimeConfig) -> Result<Arc<dyn LlmClient>> {
    match config.provider {
        Provider::LocalHttp => Ok(Arc::new(HttpLlmClient::new(config.base_url.clone()))),
        Provider::Mock => Ok(Arc::new(MockLlmClient::canned(config.embedding_dim))),
        // Validated by config (the key is present), but this build carries no
        // hosted binding.
        Provider::HostedCloud => Err(Error::config(
            "the hosted-cloud provider is not available in this build",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_mock() {
        let config = RuntimeConfig {
            provider: Provider::Mock,
            ..Default::default()
        };
        assert!(client_for(&config).is_ok());
    }

    #[test]
    fn test_factory_rejects_hosted() {
        let config = RuntimeConfig {
            provider: Provider::HostedCloud,
            ..Default::default()
        };
        assert!(matches!(client_for(&config), Err(Error::Config(_))));
    }
}
