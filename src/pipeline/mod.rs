//! 文献综述管线：论文发现、论文分析、综述合成，以及串联四个阶段的协调器

pub mod analyzer;
pub mod coordinator;
pub mod discovery;
pub mod synthesis;

pub use analyzer::{PaperAnalysis, PaperAnalyzer, TextSource};
pub use coordinator::{build_refiner, LiteratureReview, ResearchCoordinator};
pub use discovery::{parse_papers, Paper, PaperDiscovery};
pub use synthesis::Synthesizer;
