//! 精修循环的失败类型：评分不可用 / 生成失败
//!
//! 两者对当前精修尝试都是致命的：循环不做内部重试，也不会用兜底分数替代。

use thiserror::Error;

/// Scorer / Drafter 调用失败（含超时）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RefineError {
    /// Scorer 不可达、超时，或返回无法解析/越界的结果
    #[error("evaluation unavailable: {0}")]
    EvaluationUnavailable(String),

    /// Drafter 出错、超时，或返回空文本
    #[error("generation failed: {0}")]
    GenerationFailed(String),
}

/// 失败种类（不含明细），便于调用方分支
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    EvaluationUnavailable,
    GenerationFailed,
}

impl RefineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            RefineError::EvaluationUnavailable(_) => FailureKind::EvaluationUnavailable,
            RefineError::GenerationFailed(_) => FailureKind::GenerationFailed,
        }
    }

    /// 按失败种类构造
    pub(crate) fn of_kind(kind: FailureKind, message: impl Into<String>) -> RefineError {
        match kind {
            FailureKind::EvaluationUnavailable => RefineError::EvaluationUnavailable(message.into()),
            FailureKind::GenerationFailed => RefineError::GenerationFailed(message.into()),
        }
    }

    /// 归一到指定失败种类：Scorer 返回的任何错误都算 EvaluationUnavailable，Drafter 同理
    pub(crate) fn into_kind(self, kind: FailureKind) -> RefineError {
        if self.kind() == kind {
            return self;
        }
        match self {
            RefineError::EvaluationUnavailable(m) | RefineError::GenerationFailed(m) => {
                RefineError::of_kind(kind, m)
            }
        }
    }
}

/// 精修配置非法（阈值越界、轮数为 0、超时为 0）
#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid refinement config: {0}")]
pub struct InvalidConfig(pub String);
