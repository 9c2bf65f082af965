//! 研究工具：注册表、带超时的执行器，以及 fetch_pdf / extract_citation 两个工具

pub mod citation;
pub mod executor;
pub mod pdf;
pub mod registry;

pub use citation::{format_authors_apa, format_citation, Citation, CitationArgs, CitationTool};
pub use executor::ToolExecutor;
pub use pdf::{FetchPdfTool, PdfText};
pub use registry::{Tool, ToolRegistry};

use crate::config::ToolsSection;

/// 按配置注册全部研究工具
pub fn research_tools(cfg: &ToolsSection) -> ToolExecutor {
    let mut registry = ToolRegistry::new();
    registry.register(FetchPdfTool::new(cfg.pdf.clone()));
    registry.register(CitationTool);
    ToolExecutor::new(registry, cfg.tool_timeout_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_research_tools_registers_both() {
        let exec = research_tools(&ToolsSection::default());
        assert_eq!(
            exec.tool_names(),
            vec!["extract_citation".to_string(), "fetch_pdf".to_string()]
        );
        let schema = exec.schema_json();
        assert_eq!(schema.as_array().map(|a| a.len()), Some(2));
    }
}
