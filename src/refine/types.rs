//! 精修循环的数据模型：Document、EvaluationResult、每轮记录、终止原因与循环状态

use std::fmt;

use serde::Serialize;

use crate::refine::error::{FailureKind, RefineError};
use crate::refine::policy::BestDraft;

/// 评分下限（含）
pub const SCORE_MIN: f64 = 1.0;
/// 评分上限（含）
pub const SCORE_MAX: f64 = 10.0;

/// 综述草稿：不可变文本，每次修订产生新的 Document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    text: String,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    /// 全空白也算空
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

impl From<String> for Document {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl From<&str> for Document {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

/// 单次评分结果：分数位于 [SCORE_MIN, SCORE_MAX]，外加零或多条反馈
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationResult {
    score: f64,
    feedback: Vec<String>,
}

impl EvaluationResult {
    /// 分数非有限或越界时返回 EvaluationUnavailable；空白反馈条目会被丢弃
    pub fn new(score: f64, feedback: Vec<String>) -> Result<Self, RefineError> {
        if !score.is_finite() || !(SCORE_MIN..=SCORE_MAX).contains(&score) {
            return Err(RefineError::EvaluationUnavailable(format!(
                "score {score} outside [{SCORE_MIN}, {SCORE_MAX}]"
            )));
        }
        let feedback = feedback
            .into_iter()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();
        Ok(Self { score, feedback })
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn feedback(&self) -> &[String] {
        &self.feedback
    }

    pub fn passes(&self, threshold: f64) -> bool {
        self.score >= threshold
    }
}

/// 一轮评分的历史记录（诊断用）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IterationRecord {
    /// 从 1 开始的轮次
    pub iteration: usize,
    pub score: f64,
    pub feedback: Vec<String>,
    pub word_count: usize,
}

/// 终止原因
#[derive(Debug, Clone, PartialEq)]
pub enum TerminationReason {
    /// 某轮分数达到阈值
    Approved { iteration: usize, score: f64 },
    /// 轮数用尽仍未达标（正常终态，不是错误）
    Exhausted { best_iteration: usize, best_score: f64 },
    /// Scorer 或 Drafter 失败
    Failed { error: RefineError, iteration: usize },
    /// 调用方请求取消
    Cancelled { iteration: usize },
}

impl TerminationReason {
    pub fn is_approved(&self) -> bool {
        matches!(self, TerminationReason::Approved { .. })
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            TerminationReason::Failed { error, .. } => Some(error.kind()),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TerminationReason::Approved { .. } => "approved",
            TerminationReason::Exhausted { .. } => "budget_exhausted",
            TerminationReason::Failed { .. } => "failed",
            TerminationReason::Cancelled { .. } => "cancelled",
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::Approved { iteration, score } => {
                write!(f, "approved at iteration {iteration} (score {score:.1})")
            }
            TerminationReason::Exhausted {
                best_iteration,
                best_score,
            } => write!(
                f,
                "iteration budget exhausted; best was iteration {best_iteration} (score {best_score:.1})"
            ),
            TerminationReason::Failed { error, iteration } => {
                write!(f, "failed at iteration {iteration}: {error}")
            }
            TerminationReason::Cancelled { iteration } => {
                write!(f, "cancelled after iteration {iteration}")
            }
        }
    }
}

/// 循环工作状态：由运行中的循环独占修改，终止后连同最佳文档一起交还调用方
#[derive(Debug, Clone)]
pub struct RefinementState {
    current: Document,
    iteration: usize,
    max_iterations: usize,
    history: Vec<IterationRecord>,
    best: Option<BestDraft>,
    reason: Option<TerminationReason>,
}

impl RefinementState {
    pub(crate) fn new(start: Document, max_iterations: usize) -> Self {
        Self {
            current: start,
            iteration: 0,
            max_iterations,
            history: Vec::new(),
            best: None,
            reason: None,
        }
    }

    /// 开始新一轮评分，返回轮次（从 1 开始）
    pub(crate) fn begin_round(&mut self) -> usize {
        debug_assert!(self.iteration < self.max_iterations);
        self.iteration += 1;
        self.iteration
    }

    /// 记录本轮评分，并在严格更高时更新最佳草稿（同分保留更早的一轮）
    pub(crate) fn record(&mut self, result: &EvaluationResult) {
        self.history.push(IterationRecord {
            iteration: self.iteration,
            score: result.score(),
            feedback: result.feedback().to_vec(),
            word_count: self.current.word_count(),
        });
        BestDraft::offer(&mut self.best, self.iteration, result.score(), &self.current);
    }

    /// 用修订稿替换当前文档（旧文档若不是最佳即被丢弃）
    pub(crate) fn replace_current(&mut self, revised: Document) {
        self.current = revised;
    }

    pub(crate) fn finish(&mut self, reason: TerminationReason) {
        self.reason = Some(reason);
    }

    /// 最佳文档：历史最高分者；尚无任何评分时为当前（即起始）文档
    pub fn best_document(&self) -> &Document {
        self.best
            .as_ref()
            .map(|b| &b.document)
            .unwrap_or(&self.current)
    }

    pub fn current(&self) -> &Document {
        &self.current
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn history(&self) -> &[IterationRecord] {
        &self.history
    }

    pub fn best_iteration(&self) -> Option<usize> {
        self.best.as_ref().map(|b| b.iteration)
    }

    pub fn best_score(&self) -> Option<f64> {
        self.best.as_ref().map(|b| b.score)
    }

    /// 终止后必为 Some
    pub fn reason(&self) -> Option<&TerminationReason> {
        self.reason.as_ref()
    }
}
