//! 论文分析：生成引文、抓取全文并让 LLM 写结构化摘要
//!
//! 每篇论文先调 extract_citation，再在有 URL 时调 fetch_pdf；PDF 失败只记 warn，降级为仅凭元数据分析。
//! 多篇论文按 concurrency 并发分析，结果保持输入顺序。

use std::sync::Arc;

use futures_util::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::core::PipelineError;
use crate::llm::{LlmClient, Message};
use crate::pipeline::discovery::Paper;
use crate::prompts;
use crate::tools::{Citation, PdfText, ToolExecutor};

const METADATA_ONLY: &str = "(Full text unavailable. Base the analysis on the title, authors, venue and your own knowledge of this paper.)";

/// 正文来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSource {
    FullText,
    MetadataOnly,
}

/// 单篇论文的分析结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperAnalysis {
    pub paper: Paper,
    /// APA 引文（References 一节使用）
    pub citation: String,
    pub bibtex: Option<String>,
    pub source: TextSource,
    pub summary: String,
}

/// 引文工具不可用时的兜底格式
fn fallback_citation(paper: &Paper) -> String {
    let year = paper
        .year
        .map(|y| y.to_string())
        .unwrap_or_else(|| "n.d.".to_string());
    if paper.authors.is_empty() {
        format!("*{}* ({}).", paper.title, year)
    } else {
        format!("{} ({}). *{}*.", paper.authors.join(", "), year, paper.title)
    }
}

fn excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        text.chars().take(max_chars).collect::<String>() + " ..."
    } else {
        text.to_string()
    }
}

pub struct PaperAnalyzer {
    llm: Arc<dyn LlmClient>,
    tools: Arc<ToolExecutor>,
    prompt_template: String,
    concurrency: usize,
    excerpt_chars: usize,
}

impl PaperAnalyzer {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        tools: Arc<ToolExecutor>,
        prompt_template: impl Into<String>,
        concurrency: usize,
        excerpt_chars: usize,
    ) -> Self {
        Self {
            llm,
            tools,
            prompt_template: prompt_template.into(),
            concurrency: concurrency.max(1),
            excerpt_chars,
        }
    }

    async fn cite(&self, paper: &Paper) -> (String, Option<String>) {
        let Some(year) = paper.year else {
            return (fallback_citation(paper), None);
        };
        let args = json!({
            "title": paper.title,
            "authors": paper.authors,
            "year": year,
            "venue": paper.venue,
        });
        let parsed = self
            .tools
            .execute("extract_citation", args)
            .await
            .and_then(|out| {
                serde_json::from_str::<Citation>(&out)
                    .map_err(|e| PipelineError::JsonParseError(e.to_string()))
            });
        match parsed {
            Ok(c) => (c.citation, Some(c.bibtex)),
            Err(e) => {
                tracing::warn!(title = %paper.title, error = %e, "citation tool failed, using fallback");
                (fallback_citation(paper), None)
            }
        }
    }

    async fn full_text(&self, paper: &Paper) -> Option<String> {
        let url = paper.url.as_deref()?;
        let parsed = self
            .tools
            .execute("fetch_pdf", json!({ "url": url }))
            .await
            .and_then(|out| {
                serde_json::from_str::<PdfText>(&out)
                    .map_err(|e| PipelineError::JsonParseError(e.to_string()))
            });
        match parsed {
            Ok(pdf) => {
                tracing::debug!(title = %paper.title, pages = pdf.pages_read, "full text fetched");
                Some(pdf.text)
            }
            Err(e) => {
                tracing::warn!(title = %paper.title, url = %url, error = %e, "pdf unavailable, analyzing metadata only");
                None
            }
        }
    }

    /// 分析单篇论文；只有 LLM 调用失败才返回错误
    pub async fn analyze(&self, topic: &str, paper: &Paper) -> Result<PaperAnalysis, PipelineError> {
        let (citation, bibtex) = self.cite(paper).await;
        let text = self.full_text(paper).await;
        let source = if text.is_some() {
            TextSource::FullText
        } else {
            TextSource::MetadataOnly
        };
        let body = text
            .map(|t| excerpt(&t, self.excerpt_chars))
            .unwrap_or_else(|| METADATA_ONLY.to_string());

        let prompt = prompts::render(
            &self.prompt_template,
            &[
                ("topic", topic),
                ("title", &paper.title),
                ("citation", &citation),
                ("excerpt", &body),
            ],
        );
        let summary = self.llm.complete(&[Message::user(prompt)]).await?;

        Ok(PaperAnalysis {
            paper: paper.clone(),
            citation,
            bibtex,
            source,
            summary: summary.trim().to_string(),
        })
    }

    /// 并发分析全部论文，结果与输入同序；任一篇的 LLM 调用失败即整体失败
    pub async fn analyze_all(
        &self,
        topic: &str,
        papers: &[Paper],
    ) -> Result<Vec<PaperAnalysis>, PipelineError> {
        let analyses: Vec<PaperAnalysis> = stream::iter(papers.iter().map(|p| self.analyze(topic, p)))
            .buffered(self.concurrency)
            .try_collect()
            .await?;
        tracing::info!(
            papers = analyses.len(),
            full_text = analyses.iter().filter(|a| a.source == TextSource::FullText).count(),
            "papers analyzed"
        );
        Ok(analyses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolsSection;
    use crate::llm::ScriptedLlmClient;
    use crate::tools::research_tools;

    fn paper(title: &str, url: Option<&str>) -> Paper {
        Paper {
            title: title.to_string(),
            authors: vec!["Ashish Vaswani".to_string(), "Noam Shazeer".to_string()],
            year: Some(2017),
            venue: Some("NeurIPS".to_string()),
            url: url.map(str::to_string),
        }
    }

    #[test]
    fn test_fallback_citation() {
        let mut p = paper("T", None);
        p.year = None;
        assert_eq!(fallback_citation(&p), "Ashish Vaswani, Noam Shazeer (n.d.). *T*.");
        p.authors.clear();
        assert_eq!(fallback_citation(&p), "*T* (n.d.).");
    }

    #[tokio::test]
    async fn test_analyze_without_url_uses_metadata_and_apa_citation() {
        let llm = Arc::new(ScriptedLlmClient::new(["  Summary of the transformer.  "]));
        let analyzer = PaperAnalyzer::new(
            llm.clone(),
            Arc::new(research_tools(&ToolsSection::default())),
            "{citation}\n{excerpt}",
            1,
            100,
        );

        let analysis = analyzer.analyze("transformers", &paper("Attention Is All You Need", None)).await.unwrap();

        assert_eq!(analysis.source, TextSource::MetadataOnly);
        assert_eq!(analysis.summary, "Summary of the transformer.");
        assert_eq!(
            analysis.citation,
            "Vaswani, A., & Shazeer, N. (2017). *Attention Is All You Need*. *NeurIPS*."
        );
        assert!(analysis.bibtex.unwrap().starts_with("@article{vaswani2017,"));
        assert!(llm.prompt(0).unwrap().contains("Full text unavailable"));
    }

    #[tokio::test]
    async fn test_analyze_all_keeps_order_and_propagates_llm_error() {
        let llm = Arc::new(ScriptedLlmClient::new(["first", "second"]));
        let analyzer = PaperAnalyzer::new(
            llm.clone(),
            Arc::new(research_tools(&ToolsSection::default())),
            "{title}",
            2,
            100,
        );
        let papers = vec![paper("A", None), paper("B", None)];
        let analyses = analyzer.analyze_all("t", &papers).await.unwrap();
        assert_eq!(analyses[0].paper.title, "A");
        assert_eq!(analyses[1].paper.title, "B");

        // 回复已耗尽：LLM 报错应向上传递
        let err = analyzer.analyze_all("t", &papers).await.unwrap_err();
        assert!(matches!(err, PipelineError::LlmError(_)));
    }
}
