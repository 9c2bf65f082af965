//! 综述合成：把各篇分析交给 LLM，写出第一版综述草稿

use std::sync::Arc;

use crate::core::PipelineError;
use crate::llm::{LlmClient, Message};
use crate::pipeline::analyzer::PaperAnalysis;
use crate::prompts;
use crate::refine::drafter::strip_code_fence;
use crate::refine::Document;

/// 分析结果渲染为提示词中的编号小节
fn render_analyses(analyses: &[PaperAnalysis]) -> String {
    analyses
        .iter()
        .enumerate()
        .map(|(i, a)| {
            format!(
                "### {}. {}\nCitation: {}\n\n{}",
                i + 1,
                a.paper.title,
                a.citation,
                a.summary
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub struct Synthesizer {
    llm: Arc<dyn LlmClient>,
    prompt_template: String,
}

impl Synthesizer {
    pub fn new(llm: Arc<dyn LlmClient>, prompt_template: impl Into<String>) -> Self {
        Self {
            llm,
            prompt_template: prompt_template.into(),
        }
    }

    /// 生成初稿；LLM 返回空文本时为 EmptyDraft
    pub async fn synthesize(
        &self,
        topic: &str,
        analyses: &[PaperAnalysis],
    ) -> Result<Document, PipelineError> {
        let prompt = prompts::render(
            &self.prompt_template,
            &[("topic", topic), ("analyses", &render_analyses(analyses))],
        );
        let response = self.llm.complete(&[Message::user(prompt)]).await?;
        let draft = Document::new(strip_code_fence(&response));
        if draft.is_blank() {
            return Err(PipelineError::EmptyDraft);
        }
        tracing::info!(words = draft.word_count(), "draft synthesized");
        Ok(draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedLlmClient;
    use crate::pipeline::analyzer::TextSource;
    use crate::pipeline::discovery::Paper;

    fn analysis(title: &str) -> PaperAnalysis {
        PaperAnalysis {
            paper: Paper {
                title: title.to_string(),
                authors: vec![],
                year: None,
                venue: None,
                url: None,
            },
            citation: format!("*{title}* (n.d.)."),
            bibtex: None,
            source: TextSource::MetadataOnly,
            summary: format!("{title} summary"),
        }
    }

    #[test]
    fn test_render_analyses_numbers_sections() {
        let text = render_analyses(&[analysis("A"), analysis("B")]);
        assert!(text.starts_with("### 1. A\nCitation: *A* (n.d.)."));
        assert!(text.contains("### 2. B"));
    }

    #[tokio::test]
    async fn test_synthesize_strips_fence_and_rejects_empty() {
        let llm = Arc::new(ScriptedLlmClient::new(["```markdown\n# Review\n\nBody\n```", "   "]));
        let synth = Synthesizer::new(llm.clone(), "{topic}\n{analyses}");

        let draft = synth.synthesize("t", &[analysis("A")]).await.unwrap();
        assert_eq!(draft.text(), "# Review\n\nBody");

        let err = synth.synthesize("t", &[analysis("A")]).await.unwrap_err();
        assert!(matches!(err, PipelineError::EmptyDraft));
    }
}
