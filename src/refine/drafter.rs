//! Drafter：根据反馈修订草稿
//!
//! Drafter trait 是精修循环消费的修订契约；LlmDrafter 用 LLM 实现它。
//! 循环不比较修订前后的内容，只对新稿重新评分。

use std::sync::Arc;

use async_trait::async_trait;

use crate::llm::{LlmClient, Message};
use crate::prompts;
use crate::refine::error::RefineError;
use crate::refine::types::Document;

/// 修订契约：返回新的 Document；出错或返回空文本时为 GenerationFailed
#[async_trait]
pub trait Drafter: Send + Sync {
    async fn revise(&self, document: &Document, feedback: &[String]) -> Result<Document, RefineError>;
}

/// 反馈渲染为 Markdown 列表
fn render_feedback(feedback: &[String]) -> String {
    if feedback.is_empty() {
        return "- (no specific feedback; improve overall quality)".to_string();
    }
    feedback
        .iter()
        .map(|f| format!("- {f}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// 整段回复被 ``` 包裹时去掉外层代码块
pub(crate) fn strip_code_fence(output: &str) -> &str {
    let trimmed = output.trim();
    if !(trimmed.starts_with("```") && trimmed.ends_with("```") && trimmed.len() > 6) {
        return trimmed;
    }
    let inner = &trimmed[3..trimmed.len() - 3];
    // 第一行是语言标记（如 markdown），可能为空
    match inner.find('\n') {
        Some(idx) => inner[idx + 1..].trim(),
        None => inner.trim(),
    }
}

/// 基于 LLM 的 Drafter
pub struct LlmDrafter {
    llm: Arc<dyn LlmClient>,
    prompt_template: String,
}

impl LlmDrafter {
    pub fn new(llm: Arc<dyn LlmClient>, prompt_template: impl Into<String>) -> Self {
        Self {
            llm,
            prompt_template: prompt_template.into(),
        }
    }

    /// 使用内置修订提示词
    pub fn with_default_prompt(llm: Arc<dyn LlmClient>) -> Self {
        Self::new(llm, prompts::builtin(prompts::REVISION).unwrap_or_default())
    }
}

#[async_trait]
impl Drafter for LlmDrafter {
    async fn revise(&self, document: &Document, feedback: &[String]) -> Result<Document, RefineError> {
        let prompt = prompts::render(
            &self.prompt_template,
            &[
                ("feedback", &render_feedback(feedback)),
                ("document", document.text()),
            ],
        );
        let response = self
            .llm
            .complete(&[Message::user(prompt)])
            .await
            .map_err(|e| RefineError::GenerationFailed(e.to_string()))?;

        let text = strip_code_fence(&response);
        if text.is_empty() {
            return Err(RefineError::GenerationFailed(
                "drafter returned empty text".to_string(),
            ));
        }
        Ok(Document::new(text))
    }
}
