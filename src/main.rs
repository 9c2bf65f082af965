//! LitSynth 命令行入口
//!
//! - `litsynth review <TOPIC>`：完整管线（发现 -> 分析 -> 合成 -> 精修），写出 markdown 综述
//! - `litsynth refine <FILE>`：只对已有草稿跑精修循环
//! - `litsynth tools`：打印已注册工具及参数 Schema
//!
//! Ctrl+C / SIGTERM 取消当前运行，已得到的最佳稿仍会写出。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use litsynth::config::{load_config, AppConfig};
use litsynth::core::ShutdownManager;
use litsynth::llm::{create_llm_from_config, LlmClient};
use litsynth::pipeline::{build_refiner, ResearchCoordinator};
use litsynth::refine::{Document, RefineEvent, RefinementState};
use litsynth::tools::research_tools;

#[derive(Parser)]
#[command(name = "litsynth")]
#[command(about = "Literature review co-pilot: discover, analyze, synthesize and refine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline for a research topic
    Review {
        /// Research topic, e.g. "attention mechanisms in transformer models"
        #[arg(trailing_var_arg = true, required = true)]
        topic: Vec<String>,

        #[arg(long)]
        config: Option<PathBuf>,

        /// Output file (default: <output_dir>/review-<topic>-<timestamp>.md)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Refine an existing markdown draft
    Refine {
        file: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,

        /// Output file (default: <FILE stem>.refined.md next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Override [refinement].approval_threshold
        #[arg(long)]
        threshold: Option<f64>,

        /// Override [refinement].max_iterations
        #[arg(short, long)]
        max_iterations: Option<usize>,
    },
    /// List the research tools and their argument schemas
    Tools {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn load(config: Option<PathBuf>) -> anyhow::Result<AppConfig> {
    load_config(config).context("Failed to load configuration")
}

fn write_output(path: &Path, content: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

/// 单个精修事件对应的终端输出行
fn progress_lines(ev: &RefineEvent) -> Vec<String> {
    match ev {
        RefineEvent::RoundStarted { iteration, max_iterations } => {
            vec![format!("🔎 Evaluating draft (round {iteration}/{max_iterations})...")]
        }
        RefineEvent::Evaluated { score, passed, feedback, .. } => {
            let mut lines = vec![format!("   score {score:.1}{}", if *passed { " ✓" } else { "" })];
            lines.extend(feedback.iter().map(|item| format!("   - {item}")));
            lines
        }
        RefineEvent::Revising { .. } => vec!["✏️  Revising draft...".to_string()],
        RefineEvent::Revised { word_count, .. } => vec![format!("   revised draft: {word_count} words")],
        RefineEvent::Finished { detail, .. } => vec![format!("🏁 Refinement {detail}")],
    }
}

/// 精修事件打印到终端；所有发送端释放后任务结束，调用方 await 句柄以确保输出完整
fn spawn_progress() -> (mpsc::UnboundedSender<RefineEvent>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<RefineEvent>();
    let handle = tokio::spawn(async move {
        while let Some(ev) = rx.recv().await {
            for line in progress_lines(&ev) {
                println!("{line}");
            }
        }
    });
    (tx, handle)
}

fn log_token_usage(llm: &Arc<dyn LlmClient>) {
    let (prompt, completion, total) = llm.token_usage();
    if total > 0 {
        tracing::info!(prompt, completion, total, "token usage");
    }
}

fn print_summary(state: &RefinementState, output: &Path) {
    if let Some(reason) = state.reason() {
        println!("Outcome: {reason}");
    }
    for record in state.history() {
        println!(
            "  round {}/{}: score {:.1}, {} feedback items, {} words",
            record.iteration,
            state.max_iterations(),
            record.score,
            record.feedback.len(),
            record.word_count
        );
    }
    println!("Saved to {}", output.display());
}

async fn run_review(topic: String, config: Option<PathBuf>, output: Option<PathBuf>) -> anyhow::Result<()> {
    let cfg = load(config)?;
    let _guard = litsynth::observability::init(cfg.app.log_file.as_deref());
    let llm = create_llm_from_config(&cfg).context("Failed to create LLM client")?;

    let shutdown = Arc::new(ShutdownManager::new());
    shutdown.install_signal_handlers();

    let (progress_tx, progress) = spawn_progress();
    let coordinator = ResearchCoordinator::from_config(&cfg, llm.clone())
        .context("Failed to build pipeline")?
        .with_event_tx(progress_tx);

    println!("🔬 {}: literature review on \"{}\"", cfg.app.name, topic);
    let review = coordinator
        .run(&topic, shutdown.token())
        .await
        .context("Literature review failed")?;
    drop(coordinator);
    let _ = progress.await;

    let path = output.unwrap_or_else(|| cfg.app.output_dir.join(review.file_name()));
    write_output(&path, &review.to_markdown())?;
    log_token_usage(&llm);
    print_summary(&review.refinement, &path);
    Ok(())
}

async fn run_refine(
    file: PathBuf,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
    threshold: Option<f64>,
    max_iterations: Option<usize>,
) -> anyhow::Result<()> {
    let mut cfg = load(config)?;
    if let Some(t) = threshold {
        cfg.refinement.approval_threshold = t;
    }
    if let Some(m) = max_iterations {
        cfg.refinement.max_iterations = m;
    }
    let _guard = litsynth::observability::init(cfg.app.log_file.as_deref());

    let text = std::fs::read_to_string(&file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let llm = create_llm_from_config(&cfg).context("Failed to create LLM client")?;
    let (progress_tx, progress) = spawn_progress();
    let refiner = build_refiner(&cfg, llm.clone())?.with_event_tx(progress_tx);

    let shutdown = Arc::new(ShutdownManager::new());
    shutdown.install_signal_handlers();

    let (document, state) = refiner.run(Document::new(text), shutdown.token()).await;
    drop(refiner);
    let _ = progress.await;

    let path = output.unwrap_or_else(|| {
        let stem = file.file_stem().and_then(|s| s.to_str()).unwrap_or("draft");
        file.with_file_name(format!("{stem}.refined.md"))
    });
    write_output(&path, document.text())?;
    log_token_usage(&llm);
    print_summary(&state, &path);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    match cli.command {
        Command::Review { topic, config, output } => run_review(topic.join(" "), config, output).await,
        Command::Refine {
            file,
            config,
            output,
            threshold,
            max_iterations,
        } => run_refine(file, config, output, threshold, max_iterations).await,
        Command::Tools { config } => {
            let cfg = load(config)?;
            let schema = research_tools(&cfg.tools).schema_json();
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }
    }
}
