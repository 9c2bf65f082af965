//! extract_citation 工具：生成 APA 引文与 BibTeX 条目

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::Tool;

/// extract_citation 参数
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CitationArgs {
    pub title: String,
    /// 作者全名列表，如 ["Ashish Vaswani", "Noam Shazeer"]
    pub authors: Vec<String>,
    pub year: i32,
    #[serde(default)]
    pub venue: Option<String>,
}

/// 工具输出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub citation: String,
    pub bibtex: String,
}

/// "Ashish Vaswani" -> "Vaswani, A."；单个词视为姓
fn format_single_author(name: &str) -> String {
    let parts: Vec<&str> = name.split_whitespace().collect();
    match parts.as_slice() {
        [] => String::new(),
        [only] => format!("{}.", only),
        [first, .., last] => {
            let initial: String = first.chars().next().into_iter().flat_map(char::to_uppercase).collect();
            format!("{}, {}.", last, initial)
        }
    }
}

/// APA 作者串：一人 "A"；两人 "A, & B"；多人 "A, B, & C"
pub fn format_authors_apa(authors: &[String]) -> String {
    let formatted: Vec<String> = authors
        .iter()
        .filter(|a| !a.trim().is_empty())
        .map(|a| format_single_author(a))
        .collect();
    match formatted.as_slice() {
        [] => String::new(),
        [one] => one.clone(),
        [init @ .., last] => format!("{}, & {}", init.join(", "), last),
    }
}

/// `{authors} ({year}). *{title}*. *{venue}*.`，venue 为空时省略该段
pub fn format_citation(args: &CitationArgs) -> Result<String, String> {
    if args.authors.iter().all(|a| a.trim().is_empty()) {
        return Err("No authors provided".to_string());
    }
    let mut citation = format!(
        "{} ({}). *{}*.",
        format_authors_apa(&args.authors),
        args.year,
        args.title.trim()
    );
    if let Some(venue) = args.venue.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        citation.push_str(&format!(" *{}*.", venue));
    }
    Ok(citation)
}

/// 引用键：首作者姓（仅字母数字、小写）+ 年份
fn cite_key(args: &CitationArgs) -> String {
    let last = args
        .authors
        .first()
        .and_then(|a| a.split_whitespace().last())
        .unwrap_or("unknown");
    let last: String = last
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect();
    format!("{}{}", last, args.year)
}

pub fn bibtex(args: &CitationArgs) -> String {
    format!(
        "@article{{{},\n  title={{{}}},\n  author={{{}}},\n  year={{{}}},\n  venue={{{}}}\n}}",
        cite_key(args),
        args.title.trim(),
        args.authors.join(" and "),
        args.year,
        args.venue.as_deref().unwrap_or("")
    )
}

pub struct CitationTool;

#[async_trait]
impl Tool for CitationTool {
    fn name(&self) -> &str {
        "extract_citation"
    }

    fn description(&self) -> &str {
        "Format a paper reference in APA style and as BibTeX. Args: {\"title\", \"authors\": [..], \"year\", \"venue\"?}."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::to_value(schemars::schema_for!(CitationArgs)).unwrap_or(Value::Null)
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let args: CitationArgs =
            serde_json::from_value(args).map_err(|e| format!("Invalid arguments: {}", e))?;
        let citation = Citation {
            citation: format_citation(&args)?,
            bibtex: bibtex(&args),
        };
        serde_json::to_string(&citation).map_err(|e| e.to_string())
    }
}
