//! fetch_pdf 工具：下载论文 PDF 并抽取正文
//!
//! GET 带浏览器 UA 与超时；响应须为 application/pdf 或 URL 以 .pdf 结尾。
//! 用 lopdf 抽取前 max_pages 页文本（在 spawn_blocking 中解析），合并空白后按 max_chars 截断；
//! 抽取结果少于 min_chars 视为扫描件，返回错误。响应体超过 max_bytes（声明长度或实际读取量）直接拒绝。

use std::time::Duration;

use async_trait::async_trait;
use lopdf::Document as PdfDocument;
use reqwest::Client;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::PdfSection;
use crate::tools::Tool;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const TRUNCATION_MARKER: &str = "\n\n[Text truncated due to length...]";

/// fetch_pdf 参数
#[derive(Debug, Deserialize, JsonSchema)]
pub struct FetchPdfArgs {
    /// PDF 直链（如 https://arxiv.org/pdf/1706.03762.pdf）
    pub url: String,
}

/// fetch_pdf 成功结果（工具输出即此结构的 JSON）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfText {
    pub text: String,
    pub page_count: usize,
    pub pages_read: usize,
}

pub struct FetchPdfTool {
    client: Client,
    limits: PdfSection,
}

impl FetchPdfTool {
    pub fn new(limits: PdfSection) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(limits.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self { client, limits }
    }

    pub async fn fetch(&self, url: &str) -> Result<PdfText, String> {
        let mut resp = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                "Request timed out. The PDF source may be slow or unavailable.".to_string()
            } else {
                format!("Failed to download PDF: {}", e)
            }
        })?;
        if !resp.status().is_success() {
            return Err(format!("Failed to download PDF: HTTP {}", resp.status()));
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();
        if !is_pdf_response(&content_type, url) {
            return Err(format!(
                "URL does not point to a PDF file. Content-Type: {}",
                content_type
            ));
        }

        let max_bytes = self.limits.max_bytes;
        if let Some(declared) = resp.content_length() {
            check_size(declared, max_bytes)?;
        }
        let mut bytes = Vec::new();
        while let Some(chunk) = resp.chunk().await.map_err(|e| {
            if e.is_timeout() {
                "Request timed out. The PDF source may be slow or unavailable.".to_string()
            } else {
                format!("Failed to download PDF: {}", e)
            }
        })? {
            check_size((bytes.len() + chunk.len()) as u64, max_bytes)?;
            bytes.extend_from_slice(&chunk);
        }

        let max_pages = self.limits.max_pages;
        let (raw, page_count, pages_read) =
            tokio::task::spawn_blocking(move || extract_pages(&bytes, max_pages))
                .await
                .map_err(|e| format!("Unexpected error processing PDF: {}", e))??;

        let text = normalize_text(&raw, self.limits.max_chars);
        if text.trim().chars().count() < self.limits.min_chars {
            return Err(
                "PDF text extraction yielded very little text. PDF may be scanned/image-based."
                    .to_string(),
            );
        }
        tracing::debug!(url = %url, page_count, pages_read, chars = text.chars().count(), "pdf extracted");

        Ok(PdfText {
            text,
            page_count,
            pages_read,
        })
    }
}

/// 响应体大小不得超过 max_bytes
fn check_size(len: u64, max_bytes: u64) -> Result<(), String> {
    if len > max_bytes {
        return Err(format!(
            "PDF is too large: {} bytes exceeds the {} byte limit",
            len, max_bytes
        ));
    }
    Ok(())
}

/// Content-Type 含 application/pdf，或 URL 路径以 .pdf 结尾
pub fn is_pdf_response(content_type: &str, url: &str) -> bool {
    if content_type.to_lowercase().contains("application/pdf") {
        return true;
    }
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.to_lowercase().ends_with(".pdf")
}

/// 合并所有空白为单个空格；超过 max_chars 时截断并追加提示
pub fn normalize_text(raw: &str, max_chars: usize) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > max_chars {
        collapsed.chars().take(max_chars).collect::<String>() + TRUNCATION_MARKER
    } else {
        collapsed
    }
}

/// 返回 (前 max_pages 页文本以空行拼接, 总页数, 实际读取页数)；单页抽取失败按空页处理
fn extract_pages(bytes: &[u8], max_pages: usize) -> Result<(String, usize, usize), String> {
    let doc = PdfDocument::load_mem(bytes)
        .map_err(|e| format!("Unexpected error processing PDF: {}", e))?;
    let pages = doc.get_pages();
    let page_count = pages.len();

    let parts: Vec<String> = pages
        .keys()
        .take(max_pages)
        .map(|&n| doc.extract_text(&[n]).unwrap_or_default())
        .collect();
    let pages_read = parts.len();
    Ok((parts.join("\n\n"), page_count, pages_read))
}

#[async_trait]
impl Tool for FetchPdfTool {
    fn name(&self) -> &str {
        "fetch_pdf"
    }

    fn description(&self) -> &str {
        "Download a paper PDF and extract its text. Args: {\"url\": \"https://.../paper.pdf\"}. Returns {text, page_count, pages_read}."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::to_value(schemars::schema_for!(FetchPdfArgs)).unwrap_or(Value::Null)
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let args: FetchPdfArgs =
            serde_json::from_value(args).map_err(|e| format!("Invalid arguments: {}", e))?;
        let url = args.url.trim();
        if url.is_empty() {
            return Err("Missing url".to_string());
        }
        tracing::info!(url = %url, "fetch_pdf");
        let pdf = self.fetch(url).await?;
        serde_json::to_string(&pdf).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_pdf_response() {
        assert!(is_pdf_response("application/pdf", "https://example.org/download"));
        assert!(is_pdf_response("Application/PDF; charset=binary", "https://x.org/a"));
        assert!(is_pdf_response("", "https://arxiv.org/pdf/1706.03762.pdf"));
        assert!(is_pdf_response("binary/octet-stream", "https://x.org/paper.PDF?download=1"));
        assert!(!is_pdf_response("text/html", "https://arxiv.org/abs/1706.03762"));
    }

    #[test]
    fn test_normalize_text_collapses_and_truncates() {
        assert_eq!(normalize_text("  a\n\n b\t c  ", 100), "a b c");

        let long = "word ".repeat(50);
        let out = normalize_text(&long, 20);
        assert!(out.ends_with("[Text truncated due to length...]"));
        assert_eq!(out.chars().count(), 20 + TRUNCATION_MARKER.chars().count());
    }

    #[test]
    fn test_extract_pages_rejects_non_pdf_bytes() {
        let err = extract_pages(b"<html>not a pdf</html>", 50).unwrap_err();
        assert!(err.contains("Unexpected error processing PDF"));
    }

    #[test]
    fn test_check_size_limit_is_inclusive() {
        assert!(check_size(1024, 1024).is_ok());
        assert!(check_size(1025, 1024).unwrap_err().contains("too large"));
    }

    /// 本地单次 HTTP 服务：返回给定头部与 body_len 字节的 PDF 响应体
    async fn serve_once(headers: &'static str, body_len: usize) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let head = format!("HTTP/1.1 200 OK\r\nContent-Type: application/pdf\r\n{headers}\r\n");
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(&vec![b'%'; body_len]).await;
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}/paper.pdf")
    }

    #[tokio::test]
    async fn test_fetch_rejects_oversized_body() {
        let limits = PdfSection {
            max_bytes: 1024,
            ..PdfSection::default()
        };
        let tool = FetchPdfTool::new(limits);

        let declared = serve_once("Content-Length: 4096\r\nConnection: close\r\n", 4096).await;
        assert!(tool.fetch(&declared).await.unwrap_err().contains("too large"));

        let streamed = serve_once("Connection: close\r\n", 4096).await;
        assert!(tool.fetch(&streamed).await.unwrap_err().contains("too large"));
    }

    #[tokio::test]
    async fn test_execute_requires_url() {
        let tool = FetchPdfTool::new(PdfSection::default());
        assert!(tool.execute(json!({})).await.is_err());
        assert_eq!(tool.execute(json!({"url": "  "})).await.unwrap_err(), "Missing url");
    }

    #[test]
    fn test_parameters_schema_lists_url() {
        let schema = FetchPdfTool::new(PdfSection::default()).parameters_schema();
        assert!(schema["properties"]["url"].is_object());
    }
}
