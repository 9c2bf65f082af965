//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `LITSYNTH__*` 覆盖（双下划线表示嵌套，如 `LITSYNTH__REFINEMENT__MAX_ITERATIONS=5`）。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub refinement: RefinementSection,
    pub discovery: DiscoverySection,
    pub analysis: AnalysisSection,
    pub tools: ToolsSection,
}

/// [app] 段：应用名、日志文件、输出目录、提示词目录
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: String,
    /// 日志文件（除控制台外额外写一份）；为 None 时只输出到控制台
    pub log_file: Option<PathBuf>,
    pub output_dir: PathBuf,
    /// 提示词覆盖目录：<prompts_dir>/<name>.txt 存在时替代内置提示词
    pub prompts_dir: PathBuf,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: "LitSynth".to_string(),
            log_file: Some(PathBuf::from("litsynth.log")),
            output_dir: PathBuf::from("output"),
            prompts_dir: PathBuf::from("config/prompts"),
        }
    }
}

/// [llm] 段：后端选择
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：gemini / openai / mock
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: crate::llm::GEMINI_FLASH.to_string(),
            base_url: None,
        }
    }
}

/// [refinement] 段：精修循环的三个参数（通过阈值、最大轮数、单次调用超时）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RefinementSection {
    pub approval_threshold: f64,
    pub max_iterations: usize,
    pub call_timeout_secs: u64,
}

impl Default for RefinementSection {
    fn default() -> Self {
        Self {
            approval_threshold: 8.0,
            max_iterations: 3,
            call_timeout_secs: 120,
        }
    }
}

impl RefinementSection {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

/// [discovery] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscoverySection {
    /// 要求 LLM 返回的论文数量
    pub paper_count: usize,
}

impl Default for DiscoverySection {
    fn default() -> Self {
        Self { paper_count: 5 }
    }
}

/// [analysis] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisSection {
    /// 同时分析的论文数
    pub concurrency: usize,
    /// 送给 LLM 的全文摘录最大字符数
    pub excerpt_chars: usize,
}

impl Default for AnalysisSection {
    fn default() -> Self {
        Self {
            concurrency: 3,
            excerpt_chars: 12_000,
        }
    }
}

/// [tools] 段：工具超时与 PDF 抓取限制
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒），应大于 pdf.timeout_secs 以覆盖解析时间
    pub tool_timeout_secs: u64,
    pub pdf: PdfSection,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: 60,
            pdf: PdfSection::default(),
        }
    }
}

/// [tools.pdf] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PdfSection {
    /// 下载超时（秒）
    pub timeout_secs: u64,
    /// 只提取前 N 页
    pub max_pages: usize,
    /// 提取文本上限，超出截断
    pub max_chars: usize,
    /// 少于此字符数视为扫描件/图片 PDF
    pub min_chars: usize,
    /// 响应体字节上限
    pub max_bytes: u64,
}

impl Default for PdfSection {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_pages: 50,
            max_chars: 100_000,
            min_chars: 100,
            max_bytes: 50 * 1024 * 1024,
        }
    }
}

/// 从 config 目录加载配置，环境变量 LITSYNTH__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 LITSYNTH__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        } else {
            tracing::warn!(path = %path.display(), "config file not found, ignoring");
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("LITSYNTH")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
