//! 管线集成测试：脚本化 LLM 驱动 发现 -> 分析 -> 合成 -> 精修

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use litsynth::config::AppConfig;
    use litsynth::core::PipelineError;
    use litsynth::llm::{LlmError, ScriptedLlmClient};
    use litsynth::pipeline::{ResearchCoordinator, TextSource};
    use litsynth::refine::{FailureKind, TerminationReason};
    use tokio_util::sync::CancellationToken;

    const PAPERS: &str = r#"```json
[
  {"title": "Attention Is All You Need", "authors": ["Ashish Vaswani", "Noam Shazeer"], "year": 2017, "venue": "NeurIPS", "url": null},
  {"title": "BERT: Pre-training of Deep Bidirectional Transformers", "authors": "Jacob Devlin, Ming-Wei Chang", "year": "2019", "venue": "NAACL"}
]
```"#;

    /// 分析阶段串行，保证脚本回复与论文一一对应；提示词目录指向不存在的路径，使用内置提示词
    fn config() -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.llm.provider = "mock".to_string();
        cfg.analysis.concurrency = 1;
        cfg.app.prompts_dir = "no-such-prompts-dir".into();
        cfg
    }

    #[tokio::test]
    async fn test_review_refined_until_approved() {
        let llm = Arc::new(ScriptedLlmClient::new([
            PAPERS,
            "Transformer summary.",
            "BERT summary.",
            "# Review v1\n\nTransformers (Vaswani, 2017).",
            r#"{"score": 6.0, "feedback": ["Compare the two papers directly"]}"#,
            "# Review v2\n\nTransformers and BERT compared.",
            r#"{"score": 8.5, "feedback": []}"#,
        ]));

        let review = ResearchCoordinator::from_config(&config(), llm.clone())
            .unwrap()
            .run("  transformer language models ", CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(review.topic, "transformer language models");
        assert_eq!(review.papers.len(), 2);
        assert_eq!(review.papers[1].year, Some(2019));
        assert!(review.analyses.iter().all(|a| a.source == TextSource::MetadataOnly));
        assert_eq!(review.analyses[1].summary, "BERT summary.");
        assert_eq!(review.document.text(), "# Review v2\n\nTransformers and BERT compared.");
        assert_eq!(
            review.refinement.reason(),
            Some(&TerminationReason::Approved { iteration: 2, score: 8.5 })
        );
        assert_eq!(llm.calls(), 7);

        // 发现提示词带上数量与主题；修订提示词带上反馈
        let discovery = llm.prompt(0).unwrap();
        assert!(discovery.contains("Find 5 highly relevant academic papers about: transformer language models"));
        assert!(llm.prompt(5).unwrap().contains("- Compare the two papers directly"));

        let md = review.to_markdown();
        assert!(md.starts_with("# Review v2"));
        let refs = md.split("## References").nth(1).unwrap();
        let devlin = refs.find("Devlin, J., & Chang, M. (2019).").unwrap();
        let vaswani = refs.find("Vaswani, A., & Shazeer, N. (2017).").unwrap();
        assert!(devlin < vaswani);
    }

    #[tokio::test]
    async fn test_refinement_failure_still_returns_draft() {
        let llm = Arc::new(ScriptedLlmClient::new([
            PAPERS,
            "a",
            "b",
            "# Draft",
            "I think this review is quite good overall.",
        ]));

        let review = ResearchCoordinator::from_config(&config(), llm)
            .unwrap()
            .run("topic", CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(review.document.text(), "# Draft");
        assert_eq!(
            review.refinement.reason().and_then(|r| r.failure_kind()),
            Some(FailureKind::EvaluationUnavailable)
        );
    }

    #[tokio::test]
    async fn test_unreachable_pdf_degrades_to_metadata() {
        let papers = r#"[{"title": "Offline Paper", "authors": ["Ada Lovelace"], "year": 1843, "url": "http://127.0.0.1:9/paper.pdf"}]"#;
        let llm = Arc::new(ScriptedLlmClient::new([
            papers,
            "summary",
            "# Draft",
            r#"{"score": 9.0, "feedback": []}"#,
        ]));

        let review = ResearchCoordinator::from_config(&config(), llm.clone())
            .unwrap()
            .run("analytical engines", CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(review.analyses[0].source, TextSource::MetadataOnly);
        assert!(llm.prompt(1).unwrap().contains("Full text unavailable"));
        assert!(review.refinement.reason().unwrap().is_approved());
    }

    #[tokio::test]
    async fn test_stage_errors_surface_as_pipeline_errors() {
        let llm = Arc::new(ScriptedLlmClient::new(["No papers found, sorry."]));
        let err = ResearchCoordinator::from_config(&config(), llm)
            .unwrap()
            .run("topic", CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::JsonParseError(_)));

        let llm = Arc::new(ScriptedLlmClient::new([PAPERS, "a", "b", "  "]));
        let err = ResearchCoordinator::from_config(&config(), llm)
            .unwrap()
            .run("topic", CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::EmptyDraft));

        let llm = Arc::new(ScriptedLlmClient::default());
        llm.push(Err(LlmError::Request("503".to_string())));
        let err = ResearchCoordinator::from_config(&config(), llm)
            .unwrap()
            .run("topic", CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::LlmError(LlmError::Request(_))));
    }

    #[tokio::test]
    async fn test_blank_topic_rejected() {
        let llm = Arc::new(ScriptedLlmClient::default());
        let err = ResearchCoordinator::from_config(&config(), llm.clone())
            .unwrap()
            .run("   ", CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::ConfigError(_)));
        assert_eq!(llm.calls(), 0);
    }
}
