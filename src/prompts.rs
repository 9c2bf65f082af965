//! 内置提示词与覆盖加载
//!
//! 每个阶段一个模板，占位符形如 `{topic}`；`<prompts_dir>/<name>.txt` 存在时整体替换内置模板。

use std::path::Path;
use std::sync::OnceLock;

use regex::{Captures, Regex};

pub const DISCOVERY: &str = "discovery";
pub const ANALYSIS: &str = "analysis";
pub const SYNTHESIS: &str = "synthesis";
pub const EVALUATION: &str = "evaluation";
pub const REVISION: &str = "revision";

const DEFAULT_DISCOVERY: &str = "\
Find {count} highly relevant academic papers about: {topic}. \
Return the results as a JSON array with title, authors, year, venue, and URL for each paper.
Prefer direct PDF links (for example https://arxiv.org/pdf/<id>) for the URL field and use null when no link is known.
Output only the JSON array.";

const DEFAULT_ANALYSIS: &str = "\
Analyze the following paper for a literature review on \"{topic}\".

Title: {title}
Citation: {citation}

Content excerpt:
{excerpt}

Summarize the research question, the method, the key findings and the limitations in 150-250 words.";

const DEFAULT_SYNTHESIS: &str = "\
Write a literature review on \"{topic}\" based on the paper analyses below.
Organize it into an introduction, thematic sections that compare and connect the papers, open research gaps and a conclusion.
Cite papers inline as (Author, Year). Output markdown only.

Paper analyses:
{analyses}";

const DEFAULT_EVALUATION: &str = "\
You are reviewing a draft literature review. Score it from 1 to 10 for coverage, synthesis across papers, structure, use of citations and clarity.
List every concrete deficiency as a separate feedback item.

Reply with a single JSON object matching this schema:
{schema}

Draft:
---
{document}
---";

const DEFAULT_REVISION: &str = "\
Revise the literature review below so that it addresses every feedback item.
Keep what already works and keep the existing citations. Return only the full revised review in markdown.

Feedback:
{feedback}

Current draft:
---
{document}
---";

/// 内置模板
pub fn builtin(name: &str) -> Option<&'static str> {
    match name {
        DISCOVERY => Some(DEFAULT_DISCOVERY),
        ANALYSIS => Some(DEFAULT_ANALYSIS),
        SYNTHESIS => Some(DEFAULT_SYNTHESIS),
        EVALUATION => Some(DEFAULT_EVALUATION),
        REVISION => Some(DEFAULT_REVISION),
        _ => None,
    }
}

/// 读取 `<dir>/<name>.txt`，不存在或为空时回退到内置模板
pub fn load_prompt(dir: &Path, name: &str) -> String {
    let path = dir.join(format!("{name}.txt"));
    match std::fs::read_to_string(&path) {
        Ok(text) if !text.trim().is_empty() => {
            tracing::debug!(path = %path.display(), "using prompt override");
            text
        }
        _ => builtin(name).unwrap_or_default().to_string(),
    }
}

/// 单遍替换 `{key}` 占位符；未知占位符原样保留，变量值中的花括号不会被再次展开
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();
    let re = PLACEHOLDER_RE.get_or_init(|| Regex::new(r"\{([a-z_]+)\}").unwrap());
    re.replace_all(template, |caps: &Captures| {
        let key = &caps[1];
        vars.iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
            .unwrap_or_else(|| caps[0].to_string())
    })
    .into_owned()
}
