//! 管线错误类型
//!
//! 覆盖配置、LLM、工具、论文发现与合成阶段；精修循环本身的失败不在此处，
//! 而是作为 `TerminationReason::Failed` 随最佳文档一起返回。

use thiserror::Error;

use crate::llm::LlmError;

/// 管线运行过程中可能出现的错误
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("LLM error: {0}")]
    LlmError(#[from] LlmError),

    #[error("JSON parse error: {0}")]
    JsonParseError(String),

    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),

    #[error("Tool timeout: {0}")]
    ToolTimeout(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// 论文发现阶段没有得到任何可用论文
    #[error("No papers discovered for topic: {0}")]
    NoPapers(String),

    /// 合成阶段 LLM 返回空文本
    #[error("Synthesis produced an empty draft")]
    EmptyDraft,

    #[error("Cancelled")]
    Cancelled,
}
