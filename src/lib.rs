//! LitSynth - 文献综述生成与迭代精修
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 管线错误类型与优雅关闭（CancellationToken）
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Gemini / Mock）
//! - **observability**: tracing 初始化（控制台 + 文件）
//! - **pipeline**: 论文发现、分析、合成与研究协调器
//! - **prompts**: 内置提示词与目录覆盖
//! - **refine**: Scorer / Drafter 契约与有界精修循环
//! - **tools**: fetch_pdf、extract_citation 与带超时的执行器

pub mod config;
pub mod core;
pub mod llm;
pub mod observability;
pub mod pipeline;
pub mod prompts;
pub mod refine;
pub mod tools;

pub use pipeline::{LiteratureReview, ResearchCoordinator};
pub use refine::{Document, Drafter, RefinementConfig, RefinementLoop, RefinementState, Scorer, TerminationReason};
