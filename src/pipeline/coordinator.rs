//! 研究协调器：发现 -> 分析 -> 合成 -> 精修
//!
//! 每个阶段开始前检查取消，阶段内的在途调用也会被取消打断。
//! 精修阶段自身的失败或取消不是管线错误：最佳草稿连同 RefinementState 一起放进 LiteratureReview。

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::core::PipelineError;
use crate::llm::LlmClient;
use crate::pipeline::analyzer::{PaperAnalysis, PaperAnalyzer};
use crate::pipeline::discovery::{Paper, PaperDiscovery};
use crate::pipeline::synthesis::Synthesizer;
use crate::prompts;
use crate::refine::{
    Document, InvalidConfig, LlmDrafter, LlmScorer, RefineEvent, RefinementConfig,
    RefinementLoop, RefinementState,
};
use crate::tools::{research_tools, ToolExecutor};

/// 按配置构建精修循环：评分与修订提示词可由 prompts_dir 覆盖
pub fn build_refiner(
    cfg: &AppConfig,
    llm: Arc<dyn LlmClient>,
) -> Result<RefinementLoop, InvalidConfig> {
    let dir = cfg.app.prompts_dir.as_path();
    RefinementLoop::new(
        Arc::new(LlmScorer::new(llm.clone(), prompts::load_prompt(dir, prompts::EVALUATION))),
        Arc::new(LlmDrafter::new(llm, prompts::load_prompt(dir, prompts::REVISION))),
        RefinementConfig::from(&cfg.refinement),
    )
}

/// 一次完整运行的产物
#[derive(Debug, Clone)]
pub struct LiteratureReview {
    pub id: String,
    pub topic: String,
    pub created_at: DateTime<Utc>,
    pub papers: Vec<Paper>,
    pub analyses: Vec<PaperAnalysis>,
    /// 精修后的最终稿（通过稿或最佳稿）
    pub document: Document,
    pub refinement: RefinementState,
}

impl LiteratureReview {
    /// 综述正文 + 按字母序排列的 References
    pub fn to_markdown(&self) -> String {
        let mut references: Vec<&str> = self.analyses.iter().map(|a| a.citation.as_str()).collect();
        // 小写相同再比原文，重复引文必然相邻
        references.sort_unstable_by(|a, b| (a.to_lowercase(), *a).cmp(&(b.to_lowercase(), *b)));
        references.dedup();

        let mut out = self.document.text().trim_end().to_string();
        if !references.is_empty() {
            out.push_str("\n\n## References\n\n");
            for r in references {
                out.push_str("- ");
                out.push_str(r);
                out.push('\n');
            }
        }
        out
    }

    /// 默认输出文件名：review-<主题 slug>-<日期>.md
    pub fn file_name(&self) -> String {
        let slug: String = self
            .topic
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .take(8)
            .map(|w| w.to_lowercase())
            .collect::<Vec<_>>()
            .join("-");
        let slug = if slug.is_empty() { "untitled".to_string() } else { slug };
        format!("review-{}-{}.md", slug, self.created_at.format("%Y%m%d-%H%M%S"))
    }
}

/// 在取消前完成 fut，取消则返回 Cancelled
async fn until_cancelled<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T, PipelineError>>,
) -> Result<T, PipelineError> {
    if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PipelineError::Cancelled),
        res = fut => res,
    }
}

pub struct ResearchCoordinator {
    discovery: PaperDiscovery,
    analyzer: PaperAnalyzer,
    synthesizer: Synthesizer,
    refiner: RefinementLoop,
}

impl ResearchCoordinator {
    pub fn new(
        discovery: PaperDiscovery,
        analyzer: PaperAnalyzer,
        synthesizer: Synthesizer,
        refiner: RefinementLoop,
    ) -> Self {
        Self {
            discovery,
            analyzer,
            synthesizer,
            refiner,
        }
    }

    /// 用同一个 LLM 组装全部阶段，工具按 [tools] 注册
    pub fn from_config(cfg: &AppConfig, llm: Arc<dyn LlmClient>) -> Result<Self, PipelineError> {
        let tools = Arc::new(research_tools(&cfg.tools));
        Self::with_tools(cfg, llm, tools)
    }

    pub fn with_tools(
        cfg: &AppConfig,
        llm: Arc<dyn LlmClient>,
        tools: Arc<ToolExecutor>,
    ) -> Result<Self, PipelineError> {
        let dir: &Path = cfg.app.prompts_dir.as_path();
        let refiner = build_refiner(cfg, llm.clone())
            .map_err(|e| PipelineError::ConfigError(e.to_string()))?;
        Ok(Self::new(
            PaperDiscovery::new(
                llm.clone(),
                prompts::load_prompt(dir, prompts::DISCOVERY),
                cfg.discovery.paper_count,
            ),
            PaperAnalyzer::new(
                llm.clone(),
                tools,
                prompts::load_prompt(dir, prompts::ANALYSIS),
                cfg.analysis.concurrency,
                cfg.analysis.excerpt_chars,
            ),
            Synthesizer::new(llm, prompts::load_prompt(dir, prompts::SYNTHESIS)),
            refiner,
        ))
    }

    /// 精修进度事件转发
    pub fn with_event_tx(mut self, tx: mpsc::UnboundedSender<RefineEvent>) -> Self {
        self.refiner = self.refiner.with_event_tx(tx);
        self
    }

    pub async fn run(
        &self,
        topic: &str,
        cancel: CancellationToken,
    ) -> Result<LiteratureReview, PipelineError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(PipelineError::ConfigError("topic must not be empty".to_string()));
        }
        let id = uuid::Uuid::new_v4().to_string();
        let created_at = Utc::now();
        tracing::info!(run_id = %id, topic = %topic, "literature review started");

        tracing::info!(stage = "discovery", "stage started");
        let papers = until_cancelled(&cancel, self.discovery.discover(topic)).await?;

        tracing::info!(stage = "analysis", papers = papers.len(), "stage started");
        let analyses = until_cancelled(&cancel, self.analyzer.analyze_all(topic, &papers)).await?;

        tracing::info!(stage = "synthesis", "stage started");
        let draft = until_cancelled(&cancel, self.synthesizer.synthesize(topic, &analyses)).await?;

        tracing::info!(stage = "refinement", words = draft.word_count(), "stage started");
        let (document, refinement) = self.refiner.run(draft, cancel).await;

        if let Some(reason) = refinement.reason() {
            tracing::info!(run_id = %id, outcome = reason.label(), detail = %reason, "literature review finished");
        }
        Ok(LiteratureReview {
            id,
            topic: topic.to_string(),
            created_at,
            papers,
            analyses,
            document,
            refinement,
        })
    }
}
