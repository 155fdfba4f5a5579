use crate::domain::ports::TextGenerator;
use crate::utils::error::{DigestError, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::io::Write;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

/// 一行 SSE 的解讀結果
#[derive(Debug, PartialEq, Eq)]
pub enum SseEvent {
    Delta(String),
    Done,
    Skip,
}

pub fn parse_sse_line(line: &str) -> Result<SseEvent> {
    let Some(payload) = line.trim().strip_prefix("data:") else {
        return Ok(SseEvent::Skip);
    };
    let payload = payload.trim();

    if payload == "[DONE]" {
        return Ok(SseEvent::Done);
    }

    let chunk: ChatChunk = serde_json::from_str(payload)?;
    if let Some(error) = chunk.error {
        return Err(DigestError::GenerationError {
            message: error.to_string(),
        });
    }

    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty())
        .map(SseEvent::Delta)
        .unwrap_or(SseEvent::Skip))
}

/// OpenAI 相容的 `/v1/chat/completions` 串流客戶端（LM Studio 本地伺服器）
pub struct OpenAiCompatClient {
    client: Client,
    base_url: String,
    model: String,
}

impl OpenAiCompatClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    pub fn for_local_port(port: u16, model: impl Into<String>) -> Self {
        Self::new(format!("http://localhost:{}/v1", port), model)
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl TextGenerator for OpenAiCompatClient {
    async fn generate(
        &self,
        system: &str,
        user: &str,
        sink: &mut (dyn Write + Send),
    ) -> Result<String> {
        tracing::info!("  → Sending content to AI ({} characters)...", user.len());

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            stream: true,
        };

        let response = self
            .client
            .post(self.completions_url())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DigestError::GenerationError {
                message: format!("HTTP {}: {}", status.as_u16(), body.trim()),
            });
        }

        write!(sink, "\n  → AI Response:\n")?;

        let mut stream = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        let mut text = String::new();
        let mut finished = false;

        while let Some(chunk) = stream.next().await {
            buffer.extend_from_slice(&chunk?);

            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                match parse_sse_line(&String::from_utf8_lossy(&line))? {
                    SseEvent::Delta(fragment) => {
                        sink.write_all(fragment.as_bytes())?;
                        sink.flush()?;
                        text.push_str(&fragment);
                    }
                    SseEvent::Done => {
                        finished = true;
                        break;
                    }
                    SseEvent::Skip => {}
                }
            }

            if finished {
                break;
            }
        }

        // 最後一行可能沒有換行
        if !finished && !buffer.is_empty() {
            if let SseEvent::Delta(fragment) = parse_sse_line(&String::from_utf8_lossy(&buffer))? {
                sink.write_all(fragment.as_bytes())?;
                text.push_str(&fragment);
            }
        }

        write!(sink, "\n\n")?;
        sink.flush()?;
        tracing::info!("  ✓ AI response received");

        Ok(text)
    }
}
