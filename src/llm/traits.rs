//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / Gemini / Mock）实现 LlmClient；管线各阶段与 LlmScorer / LlmDrafter 只依赖此 trait。

use async_trait::async_trait;
use thiserror::Error;

use crate::llm::Message;

/// LLM 调用错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    /// 请求构造或网络/服务端错误
    #[error("request failed: {0}")]
    Request(String),

    /// 服务端返回成功但没有任何 content
    #[error("empty response")]
    EmptyResponse,

    /// 缺少 API Key 等配置问题
    #[error("not configured: {0}")]
    NotConfigured(String),
}

/// LLM 客户端 trait：非流式完成
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 发送完整消息列表，返回首条回复的文本
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError>;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}
