//! Gemini 客户端（走 Google 提供的 OpenAI 兼容端点）
//!
//! - Base URL: https://generativelanguage.googleapis.com/v1beta/openai
//! - 模型: gemini-2.5-flash（默认）
//! - API Key: 环境变量 `GOOGLE_API_KEY`，缺失时返回 NotConfigured

use crate::llm::{LlmError, OpenAiClient};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const GEMINI_FLASH: &str = "gemini-2.5-flash";

/// 创建 Gemini 客户端；model 为 None 时依次尝试 `GEMINI_MODEL` 环境变量与默认模型
pub fn create_gemini_client(
    model: Option<&str>,
    base_url: Option<&str>,
) -> Result<OpenAiClient, LlmError> {
    let api_key = std::env::var("GOOGLE_API_KEY").map_err(|_| {
        LlmError::NotConfigured("Missing GOOGLE_API_KEY - check your .env file".to_string())
    })?;

    let model = model
        .map(String::from)
        .or_else(|| std::env::var("GEMINI_MODEL").ok())
        .unwrap_or_else(|| GEMINI_FLASH.to_string());

    Ok(OpenAiClient::new(
        Some(base_url.unwrap_or(GEMINI_BASE_URL)),
        &model,
        &api_key,
    ))
}
