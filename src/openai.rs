//! Client construction for OpenAI-compatible providers.

use crate::config::ProviderSettings;
use crate::error::Result;
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Client type shared by the transcriber, embedder and agent.
pub type ProviderClient = Client<OpenAIConfig>;

/// Create a client for the configured provider using `api_key`.
pub fn create_client(provider: &ProviderSettings, api_key: &str) -> Result<ProviderClient> {
    create_client_for(
        &provider.api_base,
        api_key,
        Duration::from_secs(provider.timeout_secs),
    )
}

/// Create a client for an arbitrary OpenAI-compatible base URL.
pub fn create_client_for(api_base: &str, api_key: &str, timeout: Duration) -> Result<ProviderClient> {
    let http_client = reqwest::Client::builder().timeout(timeout).build()?;

    let config = OpenAIConfig::new()
        .with_api_base(api_base.trim_end_matches('/'))
        .with_api_key(api_key);

    Ok(Client::with_config(config).with_http_client(http_client))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_openai::config::Config;

    #[test]
    fn test_client_uses_configured_base() {
        let provider = ProviderSettings {
            api_base: "https://api.groq.com/openai/v1/".to_string(),
            ..ProviderSettings::default()
        };
        let client = create_client(&provider, "gsk-test").unwrap();
        assert_eq!(client.config().api_base(), "https://api.groq.com/openai/v1");
    }
}
