//! 精修过程事件：用于 CLI 进度展示或前端推送

use serde::Serialize;

/// 单步过程事件（可序列化为 JSON）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RefineEvent {
    /// 开始第几轮评分
    RoundStarted { iteration: usize, max_iterations: usize },
    /// 本轮评分完成
    Evaluated {
        iteration: usize,
        score: f64,
        passed: bool,
        feedback: Vec<String>,
    },
    /// 开始按反馈修订
    Revising { iteration: usize },
    /// 修订完成（新稿字数）
    Revised { iteration: usize, word_count: usize },
    /// 循环终止
    Finished {
        reason: String,
        detail: String,
        best_iteration: Option<usize>,
        best_score: Option<f64>,
    },
}
