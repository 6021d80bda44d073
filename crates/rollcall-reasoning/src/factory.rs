use anyhow::Result;
use rollcall_core::{Config, ReasoningProvider};
use std::sync::Arc;
use std::time::Duration;

use crate::ReasoningService;

/// Create the configured reasoning client
pub fn create_reasoning_service(config: &Config) -> Result<Arc<dyn ReasoningService>> {
    let timeout = Duration::from_secs(config.reasoning_timeout_secs());

    match config.reasoning_provider() {
        #[cfg(feature = "provider-gemini")]
        ReasoningProvider::Gemini => {
            let api_key = config
                .gemini_api_key()
                .ok_or_else(|| anyhow::anyhow!("GEMINI_API_KEY not configured"))?;
            let client = crate::GeminiClient::new(api_key, config.gemini_model(), timeout)?;
            tracing::info!(model = config.gemini_model(), "Reasoning provider: gemini");
            Ok(Arc::new(client))
        }

        #[cfg(feature = "provider-anthropic")]
        ReasoningProvider::Anthropic => {
            let api_key = config
                .anthropic_api_key()
                .ok_or_else(|| anyhow::anyhow!("ANTHROPIC_API_KEY not configured"))?;
            let client = crate::AnthropicClient::new(api_key, config.anthropic_model(), timeout)?;
            tracing::info!(model = config.anthropic_model(), "Reasoning provider: anthropic");
            Ok(Arc::new(client))
        }

        #[cfg(not(all(feature = "provider-gemini", feature = "provider-anthropic")))]
        provider => Err(anyhow::anyhow!(
            "Reasoning provider {} not available (feature not enabled)",
            provider
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_core::AttendanceConfig;

    #[test]
    fn test_factory_requires_api_key() {
        let config = Config::new(AttendanceConfig::default());
        assert!(create_reasoning_service(&config).is_err());
    }

    #[test]
    fn test_factory_builds_selected_provider() {
        let config = Config::new(AttendanceConfig {
            reasoning_provider: ReasoningProvider::Anthropic,
            anthropic_api_key: Some("sk-test".to_string()),
            ..AttendanceConfig::default()
        });
        let service = create_reasoning_service(&config).unwrap();
        assert_eq!(service.name(), "anthropic");
    }
}
