//! 论文发现：让 LLM 按主题列出候选论文，并解析其返回的 JSON 数组
//!
//! LLM 的输出并不规整：authors 可能是列表也可能是逗号分隔的字符串，year 可能是数字或字符串，
//! 数组可能包在 ```json 代码块里。解析时一律兼容。

use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};

use crate::core::PipelineError;
use crate::llm::{LlmClient, Message};
use crate::prompts;

/// 一篇候选论文
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub title: String,
    #[serde(default, deserialize_with = "de_authors")]
    pub authors: Vec<String>,
    #[serde(default, deserialize_with = "de_year")]
    pub year: Option<i32>,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default, alias = "URL", alias = "link")]
    pub url: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AuthorsField {
    List(Vec<String>),
    Text(String),
    Null,
}

fn de_authors<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let raw = match AuthorsField::deserialize(d)? {
        AuthorsField::List(list) => list,
        AuthorsField::Text(text) => text.split(',').map(str::to_string).collect(),
        AuthorsField::Null => Vec::new(),
    };
    Ok(raw
        .into_iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum YearField {
    Number(i64),
    Text(String),
    Null,
}

fn de_year<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i32>, D::Error> {
    Ok(match YearField::deserialize(d)? {
        YearField::Number(n) => i32::try_from(n).ok(),
        // "2017"、"2017a"、"NeurIPS 2017" 都取第一个四位数字
        YearField::Text(text) => text
            .as_bytes()
            .windows(4)
            .position(|w| w.iter().all(u8::is_ascii_digit))
            .and_then(|i| text[i..i + 4].parse().ok()),
        YearField::Null => None,
    })
}

/// 取出回复中的 JSON 数组：```json 代码块优先，否则取最外层方括号
fn extract_json_array(output: &str) -> Option<&str> {
    if let Some(start) = output.find("```json") {
        let rest = &output[start + 7..];
        return Some(rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim()));
    }
    let start = output.find('[')?;
    let end = output.rfind(']')?;
    (end > start).then(|| &output[start..=end])
}

/// 解析论文列表；丢弃标题为空的条目，URL 为空串时视为无
pub fn parse_papers(output: &str) -> Result<Vec<Paper>, PipelineError> {
    let json = extract_json_array(output.trim()).ok_or_else(|| {
        let preview: String = output.trim().chars().take(120).collect();
        PipelineError::JsonParseError(format!("no JSON array in discovery output: {preview}"))
    })?;
    let papers: Vec<Paper> =
        serde_json::from_str(json).map_err(|e| PipelineError::JsonParseError(e.to_string()))?;

    Ok(papers
        .into_iter()
        .filter(|p| !p.title.trim().is_empty())
        .map(|mut p| {
            p.title = p.title.trim().to_string();
            p.url = p.url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty());
            p.venue = p.venue.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
            p
        })
        .collect())
}

/// 论文发现阶段
pub struct PaperDiscovery {
    llm: Arc<dyn LlmClient>,
    prompt_template: String,
    paper_count: usize,
}

impl PaperDiscovery {
    pub fn new(llm: Arc<dyn LlmClient>, prompt_template: impl Into<String>, paper_count: usize) -> Self {
        Self {
            llm,
            prompt_template: prompt_template.into(),
            paper_count,
        }
    }

    pub async fn discover(&self, topic: &str) -> Result<Vec<Paper>, PipelineError> {
        let count = self.paper_count.to_string();
        let prompt = prompts::render(&self.prompt_template, &[("count", &count), ("topic", topic)]);
        let response = self.llm.complete(&[Message::user(prompt)]).await?;

        let mut papers = parse_papers(&response)?;
        if papers.is_empty() {
            return Err(PipelineError::NoPapers(topic.to_string()));
        }
        if self.paper_count > 0 && papers.len() > self.paper_count {
            papers.truncate(self.paper_count);
        }
        tracing::info!(
            topic = %topic,
            papers = papers.len(),
            with_url = papers.iter().filter(|p| p.url.is_some()).count(),
            "papers discovered"
        );
        Ok(papers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedLlmClient;

    #[test]
    fn test_parse_fenced_array_with_loose_fields() {
        let out = r#"Sure! Here are the papers:
```json
[
  {"title": "Attention Is All You Need", "authors": "Ashish Vaswani, Noam Shazeer", "year": "2017", "venue": "NeurIPS", "URL": "https://arxiv.org/pdf/1706.03762.pdf"},
  {"title": "  ", "authors": [], "year": 2020},
  {"title": "BERT", "authors": ["Jacob Devlin"], "year": 2019, "url": ""}
]
```"#;
        let papers = parse_papers(out).unwrap();
        assert_eq!(papers.len(), 2);
        assert_eq!(papers[0].authors, vec!["Ashish Vaswani", "Noam Shazeer"]);
        assert_eq!(papers[0].year, Some(2017));
        assert!(papers[0].url.is_some());
        assert_eq!(papers[1].url, None);
    }

    #[test]
    fn test_parse_bare_array_and_odd_years() {
        let out = r#"[{"title": "A", "authors": null, "year": "circa 1999a"}, {"title": "B"}]"#;
        let papers = parse_papers(out).unwrap();
        assert_eq!(papers[0].year, Some(1999));
        assert!(papers[0].authors.is_empty());
        assert_eq!(papers[1].year, None);
    }

    #[test]
    fn test_parse_rejects_prose() {
        assert!(matches!(
            parse_papers("I could not find any papers."),
            Err(PipelineError::JsonParseError(_))
        ));
    }

    #[tokio::test]
    async fn test_discover_empty_list_is_error() {
        let llm = Arc::new(ScriptedLlmClient::new(["[]"]));
        let discovery = PaperDiscovery::new(llm.clone(), "Find {count} papers about {topic}", 5);
        let err = discovery.discover("graph neural networks").await.unwrap_err();
        assert!(matches!(err, PipelineError::NoPapers(t) if t == "graph neural networks"));
        assert_eq!(llm.prompt(0).as_deref(), Some("Find 5 papers about graph neural networks"));
    }
}
