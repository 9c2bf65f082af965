//! Scorer：对草稿打分并给出反馈
//!
//! Scorer trait 是精修循环消费的评分契约；LlmScorer 用 LLM 实现它，
//! 提示词中注入 schemars 生成的 JSON Schema，解析失败一律视为 EvaluationUnavailable（不给兜底分）。

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use schemars::{schema_for, JsonSchema};
use serde::Deserialize;

use crate::llm::{LlmClient, Message};
use crate::prompts;
use crate::refine::error::RefineError;
use crate::refine::types::{Document, EvaluationResult};

/// 评分契约：不修改文档；不可达或结果无法解析时返回 EvaluationUnavailable
#[async_trait]
pub trait Scorer: Send + Sync {
    async fn evaluate(&self, document: &Document) -> Result<EvaluationResult, RefineError>;
}

/// LLM 评分回复格式（仅用于 Schema 生成与反序列化）
#[derive(Debug, Deserialize, JsonSchema)]
struct EvaluationFormat {
    /// 总分，1.0 到 10.0
    score: f64,
    /// 每条指出一个具体不足
    #[serde(default)]
    feedback: Vec<String>,
}

/// 返回评分回复的 JSON Schema 字符串，拼入评分提示词
pub fn evaluation_schema_json() -> String {
    let schema = schema_for!(EvaluationFormat);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

/// 取出回复中的 JSON 对象：```json 代码块优先，否则取最外层花括号
fn extract_json_object(output: &str) -> Option<&str> {
    if let Some(start) = output.find("```json") {
        let rest = &output[start + 7..];
        return Some(rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim()));
    }
    let start = output.find('{')?;
    let end = output.rfind('}')?;
    (end > start).then(|| &output[start..=end])
}

/// 回退解析：`Score: 7.5`（可带 `/10`）一行，加上 `- ` / `* ` 开头的条目作为反馈
fn parse_plain_evaluation(output: &str) -> Option<(f64, Vec<String>)> {
    static SCORE_RE: OnceLock<Regex> = OnceLock::new();
    static ITEM_RE: OnceLock<Regex> = OnceLock::new();
    let score_re = SCORE_RE
        .get_or_init(|| Regex::new(r"(?im)^\s*\**score\**\s*[:=]\s*(\d+(?:\.\d+)?)").unwrap());
    let item_re = ITEM_RE.get_or_init(|| Regex::new(r"(?m)^\s*[-*]\s+(.+?)\s*$").unwrap());

    let score = score_re
        .captures(output)
        .and_then(|c| c[1].parse::<f64>().ok())?;
    let feedback = item_re
        .captures_iter(output)
        .map(|c| c[1].to_string())
        .collect();
    Some((score, feedback))
}

/// 解析 LLM 的评分回复
pub fn parse_evaluation(output: &str) -> Result<EvaluationResult, RefineError> {
    let trimmed = output.trim();

    if let Some(json) = extract_json_object(trimmed) {
        if let Ok(parsed) = serde_json::from_str::<EvaluationFormat>(json) {
            return EvaluationResult::new(parsed.score, parsed.feedback);
        }
    }

    if let Some((score, feedback)) = parse_plain_evaluation(trimmed) {
        return EvaluationResult::new(score, feedback);
    }

    let preview: String = trimmed.chars().take(120).collect();
    Err(RefineError::EvaluationUnavailable(format!(
        "unparseable evaluation: {preview}"
    )))
}

/// 基于 LLM 的 Scorer
pub struct LlmScorer {
    llm: Arc<dyn LlmClient>,
    prompt_template: String,
    schema: String,
}

impl LlmScorer {
    pub fn new(llm: Arc<dyn LlmClient>, prompt_template: impl Into<String>) -> Self {
        Self {
            llm,
            prompt_template: prompt_template.into(),
            schema: evaluation_schema_json(),
        }
    }

    /// 使用内置评分提示词
    pub fn with_default_prompt(llm: Arc<dyn LlmClient>) -> Self {
        Self::new(llm, prompts::builtin(prompts::EVALUATION).unwrap_or_default())
    }

    fn build_prompt(&self, document: &Document) -> String {
        prompts::render(
            &self.prompt_template,
            &[("schema", &self.schema), ("document", document.text())],
        )
    }
}

#[async_trait]
impl Scorer for LlmScorer {
    async fn evaluate(&self, document: &Document) -> Result<EvaluationResult, RefineError> {
        let messages = vec![Message::user(self.build_prompt(document))];
        let response = self
            .llm
            .complete(&messages)
            .await
            .map_err(|e| RefineError::EvaluationUnavailable(e.to_string()))?;
        parse_evaluation(&response)
    }
}
