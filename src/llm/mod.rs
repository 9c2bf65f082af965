//! LLM 层：客户端抽象与实现（OpenAI 兼容 / Gemini / Mock）

pub mod gemini;
pub mod message;
pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

use crate::config::AppConfig;

pub use gemini::{create_gemini_client, GEMINI_FLASH};
pub use message::{Message, Role};
pub use mock::{MockLlmClient, ScriptedLlmClient};
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::{LlmClient, LlmError};

/// 根据配置选择 LLM 后端：gemini（默认，需 GOOGLE_API_KEY）/ openai（需 OPENAI_API_KEY）/ mock
pub fn create_llm_from_config(cfg: &AppConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    let provider = cfg.llm.provider.to_lowercase();
    let base_url = cfg.llm.base_url.as_deref();
    match provider.as_str() {
        "gemini" | "google" => {
            let client = create_gemini_client(Some(&cfg.llm.model), base_url)?;
            tracing::info!(model = %client.model(), "Using Gemini LLM");
            Ok(Arc::new(client))
        }
        "openai" => {
            let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
                LlmError::NotConfigured("Missing OPENAI_API_KEY".to_string())
            })?;
            let client = OpenAiClient::new(base_url, &cfg.llm.model, &api_key);
            tracing::info!(model = %client.model(), "Using OpenAI-compatible LLM");
            Ok(Arc::new(client))
        }
        "mock" => {
            tracing::info!("Using Mock LLM (offline)");
            Ok(Arc::new(MockLlmClient))
        }
        other => Err(LlmError::NotConfigured(format!(
            "unknown llm provider '{other}' (expected gemini, openai or mock)"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_provider_needs_no_key() {
        let mut cfg = AppConfig::default();
        cfg.llm.provider = "mock".to_string();
        assert!(create_llm_from_config(&cfg).is_ok());
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        let mut cfg = AppConfig::default();
        cfg.llm.provider = "carrier-pigeon".to_string();
        let err = create_llm_from_config(&cfg).err();
        assert!(matches!(err, Some(LlmError::NotConfigured(_))));
    }
}
