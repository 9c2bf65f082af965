//! Mock LLM 客户端（用于离线运行与测试，无需 API）
//!
//! - MockLlmClient：按提示词特征返回固定内容（论文 JSON 数组 / 评分 JSON / 文本），可离线跑通整条管线
//! - ScriptedLlmClient：按顺序返回预设回复，并记录每次收到的消息，供测试断言

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError, Message, Role};

const MOCK_PAPERS: &str = r#"[
  {"title": "Attention Is All You Need", "authors": ["Ashish Vaswani", "Noam Shazeer"], "year": 2017, "venue": "NeurIPS", "url": null},
  {"title": "BERT: Pre-training of Deep Bidirectional Transformers", "authors": ["Jacob Devlin", "Ming-Wei Chang", "Kenton Lee", "Kristina Toutanova"], "year": 2019, "venue": "NAACL", "url": null}
]"#;

const MOCK_EVALUATION: &str = r#"{"score": 8.5, "feedback": []}"#;

fn last_user(messages: &[Message]) -> &str {
    messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
        .unwrap_or("(no input)")
}

/// Mock 客户端：论文发现返回两篇经典论文，评分恒为 8.5，其余回显提示词首行
#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let prompt = last_user(messages);
        if prompt.contains("JSON array") {
            return Ok(MOCK_PAPERS.to_string());
        }
        if prompt.contains("\"score\"") {
            return Ok(MOCK_EVALUATION.to_string());
        }
        let first_line = prompt.lines().next().unwrap_or_default();
        Ok(format!(
            "Mock output.\n\nThis text was produced offline in response to: {}",
            first_line
        ))
    }
}

/// 脚本化客户端：每次 complete 弹出一条预设回复；回复耗尽时返回 EmptyResponse
#[derive(Debug, Default)]
pub struct ScriptedLlmClient {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    received: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedLlmClient {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(|s| Ok(s.into())).collect()),
            received: Mutex::new(Vec::new()),
        }
    }

    /// 追加一条回复（可为错误）
    pub fn push(&self, response: Result<String, LlmError>) {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(response);
        }
    }

    /// 已收到的调用次数
    pub fn calls(&self) -> usize {
        self.received.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// 第 n 次调用中最后一条 User 消息
    pub fn prompt(&self, n: usize) -> Option<String> {
        let received = self.received.lock().ok()?;
        received.get(n).map(|msgs| last_user(msgs).to_string())
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        if let Ok(mut received) = self.received.lock() {
            received.push(messages.to_vec());
        }
        self.responses
            .lock()
            .map_err(|e| LlmError::Request(e.to_string()))?
            .pop_front()
            .unwrap_or(Err(LlmError::EmptyResponse))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_client_replays_in_order() {
        let client = ScriptedLlmClient::new(["first", "second"]);
        client.push(Err(LlmError::Request("boom".into())));

        assert_eq!(client.complete(&[Message::user("a")]).await.unwrap(), "first");
        assert_eq!(client.complete(&[Message::user("b")]).await.unwrap(), "second");
        assert!(client.complete(&[Message::user("c")]).await.is_err());
        assert_eq!(
            client.complete(&[Message::user("d")]).await,
            Err(LlmError::EmptyResponse)
        );
        assert_eq!(client.calls(), 4);
        assert_eq!(client.prompt(1).as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_mock_client_answers_discovery_and_scoring() {
        let client = MockLlmClient;
        let papers = client
            .complete(&[Message::user("Find 5 papers. Return the results as a JSON array")])
            .await
            .unwrap();
        assert!(papers.trim_start().starts_with('['));

        let eval = client
            .complete(&[Message::user("Reply with {\"score\": n}")])
            .await
            .unwrap();
        assert!(eval.contains("8.5"));
    }
}
