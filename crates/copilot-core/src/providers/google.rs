//! Google Gemini chat adapter
//!
//! Speaks the generateContent REST API: role-remapped `contents` with
//! `parts`, a separate `systemInstruction`, `functionDeclarations` for
//! tools, and `functionCall`/`functionResponse` parts for the tool loop.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};

use crate::history;
use crate::logging::SharedLogger;
use crate::types::{EventSink, Message, MessageRole, StreamEvent, TokenUsage, Tool, ToolRequest};

use super::driver::{run_tool_loop, RoundReply, ToolOutcome, VendorDialogue};
use super::error::{ProviderError, ProviderResult};
use super::sse::{extract_data_payload, SseLineBuffer};
use super::traits::{CallOptions, ChatOutcome, ProviderAdapter, ToolExecutor};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Adapter for Google's Gemini API
pub struct GoogleAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    logger: SharedLogger,
}

impl GoogleAdapter {
    /// Create an adapter against the hosted Gemini endpoint
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, logger: SharedLogger) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            logger,
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/models/{}:{}",
            self.base_url.trim_end_matches('/'),
            self.model,
            method
        )
    }

    async fn post(&self, url: String, body: &Value) -> ProviderResult<reqwest::Response> {
        let response = self
            .client
            .post(url)
            .timeout(REQUEST_TIMEOUT)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(ProviderError::api("google", status.as_u16(), text));
        }
        Ok(response)
    }
}

#[async_trait]
impl ProviderAdapter for GoogleAdapter {
    fn name(&self) -> &str {
        "google"
    }

    async fn chat(
        &self,
        messages: &[Message],
        tools: &[Tool],
        executor: &dyn ToolExecutor,
        options: &CallOptions,
    ) -> ChatOutcome {
        let mut dialogue = GoogleDialogue::new(self, messages, tools, *options);
        match run_tool_loop(&mut dialogue, executor, options, None, &self.logger).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.logger
                    .error(&format!("LLM API call failed (google): {}", e));
                ChatOutcome::failure("google", &e)
            }
        }
    }

    async fn chat_stream(
        &self,
        messages: &[Message],
        tools: &[Tool],
        executor: &dyn ToolExecutor,
        options: &CallOptions,
        sink: EventSink,
    ) -> ChatOutcome {
        let mut dialogue = GoogleDialogue::new(self, messages, tools, *options);
        match run_tool_loop(&mut dialogue, executor, options, Some(&sink), &self.logger).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.logger
                    .error(&format!("LLM API call failed (google): {}", e));
                let outcome = ChatOutcome::failure("google", &e);
                let _ = sink.send(StreamEvent::Content(outcome.content.clone())).await;
                let _ = sink.send(StreamEvent::End).await;
                outcome
            }
        }
    }
}

/// Convert tool descriptors to Gemini function declarations
fn to_function_declarations(tools: &[Tool]) -> Vec<Value> {
    tools
        .iter()
        .map(|tool| {
            json!({
                "name": tool.name,
                "description": tool.description,
                "parameters": tool
                    .input_schema
                    .clone()
                    .unwrap_or_else(|| json!({"type": "object"})),
            })
        })
        .collect()
}

/// Pull text and function calls out of one response or stream chunk
///
/// Gemini responses sometimes carry no top-level text (reasoning models in
/// particular), so everything is extracted from `candidates[0].content.parts`.
fn parse_candidate(value: &Value) -> (String, Vec<ToolRequest>) {
    let mut text = String::new();
    let mut requests = Vec::new();

    if let Some(parts) = value
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
    {
        for part in parts {
            if let Some(piece) = part.get("text").and_then(Value::as_str) {
                text.push_str(piece);
            }
            if let Some(call) = part.get("functionCall") {
                let name = call
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let args = call
                    .get("args")
                    .or_else(|| call.get("arguments"))
                    .cloned()
                    .unwrap_or_else(|| json!({}));
                if !name.is_empty() {
                    requests.push(ToolRequest::new("", name, args));
                }
            }
        }
    }

    (text, requests)
}

fn parse_usage(value: &Value) -> Option<TokenUsage> {
    value.get("usageMetadata").and_then(TokenUsage::from_vendor)
}

/// Vendor conversation state for one Gemini call
struct GoogleDialogue<'a> {
    adapter: &'a GoogleAdapter,
    contents: Vec<Value>,
    system: Option<String>,
    declarations: Vec<Value>,
    pending_responses: Vec<Value>,
    options: CallOptions,
}

impl<'a> GoogleDialogue<'a> {
    fn new(
        adapter: &'a GoogleAdapter,
        messages: &[Message],
        tools: &[Tool],
        options: CallOptions,
    ) -> Self {
        // System instruction travels out-of-band for Gemini
        let system = messages
            .iter()
            .find(|m| m.role == MessageRole::System)
            .map(|m| m.content.clone());

        let conversation: Vec<Message> = messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .cloned()
            .collect();

        let contents = history::flatten_remapped(&conversation)
            .into_iter()
            .map(|(role, content)| json!({"role": role, "parts": [{"text": content}]}))
            .collect();

        Self {
            adapter,
            contents,
            system,
            declarations: to_function_declarations(tools),
            pending_responses: Vec::new(),
            options,
        }
    }

    fn body(&self, with_tools: bool) -> Value {
        let mut body = json!({
            "contents": self.contents,
            "generationConfig": {
                "temperature": self.options.temperature,
                "maxOutputTokens": self.options.max_tokens,
            },
        });
        if let Some(system) = &self.system {
            body["systemInstruction"] = json!({"parts": [{"text": system}]});
        }
        if with_tools && !self.declarations.is_empty() {
            body["tools"] = json!([{"functionDeclarations": self.declarations}]);
        }
        body
    }

    /// Tool results for the previous round travel as one user message
    fn flush_pending_responses(&mut self) {
        if !self.pending_responses.is_empty() {
            let parts = std::mem::take(&mut self.pending_responses);
            self.contents.push(json!({"role": "user", "parts": parts}));
        }
    }

    fn push_model_turn(&mut self, text: &str, requests: &[ToolRequest]) {
        let mut parts = Vec::new();
        if !text.is_empty() {
            parts.push(json!({"text": text}));
        }
        for request in requests {
            parts.push(json!({
                "functionCall": {"name": request.name, "args": request.args}
            }));
        }
        self.contents.push(json!({"role": "model", "parts": parts}));
    }

    async fn round_blocking(&mut self) -> ProviderResult<RoundReply> {
        self.flush_pending_responses();

        let url = self.adapter.endpoint("generateContent");
        let response = self.adapter.post(url, &self.body(true)).await?;
        let value: Value = response.json().await?;

        let (text, requests) = parse_candidate(&value);
        let usage = parse_usage(&value);

        if !requests.is_empty() {
            self.push_model_turn(&text, &requests);
        }

        Ok(RoundReply {
            text,
            requests,
            usage,
        })
    }

    async fn round_streaming(&mut self, sink: &EventSink) -> ProviderResult<RoundReply> {
        self.flush_pending_responses();

        let url = format!("{}?alt=sse", self.adapter.endpoint("streamGenerateContent"));
        let response = self.adapter.post(url, &self.body(true)).await?;

        let mut stream = response.bytes_stream();
        let mut lines = SseLineBuffer::new();
        let mut text = String::new();
        let mut requests: Vec<ToolRequest> = Vec::new();
        let mut usage = None;

        while let Some(chunk) = stream.next().await {
            lines.push(&chunk?);

            while let Some(line) = lines.next_line() {
                let Some(payload) = extract_data_payload(&line) else {
                    continue;
                };
                if payload.is_empty() {
                    continue;
                }
                let Ok(value) = serde_json::from_str::<Value>(payload) else {
                    continue;
                };

                let (piece, mut calls) = parse_candidate(&value);
                if !piece.is_empty() {
                    text.push_str(&piece);
                    let _ = sink.send(StreamEvent::Content(piece)).await;
                }
                requests.append(&mut calls);

                if let Some(reported) = parse_usage(&value) {
                    usage = Some(reported);
                }
            }
        }

        if !requests.is_empty() {
            self.push_model_turn(&text, &requests);
        }

        Ok(RoundReply {
            text,
            requests,
            usage,
        })
    }
}

#[async_trait]
impl VendorDialogue for GoogleDialogue<'_> {
    async fn round(&mut self, sink: Option<&EventSink>) -> ProviderResult<RoundReply> {
        match sink {
            None => self.round_blocking().await,
            Some(sink) => self.round_streaming(sink).await,
        }
    }

    fn push_tool_result(&mut self, request: &ToolRequest, outcome: &ToolOutcome) {
        let response = match outcome {
            ToolOutcome::Success(result) => json!({"result": result}),
            ToolOutcome::Failure(error) => json!({"error": error}),
        };
        self.pending_responses.push(json!({
            "functionResponse": {"name": request.name, "response": response}
        }));
    }

    /// Reasoning models can finish a round with neither text nor calls;
    /// retry once without tools before giving up
    async fn recover_text(&mut self) -> ProviderResult<Option<String>> {
        let url = self.adapter.endpoint("generateContent");
        let response = match self.adapter.post(url, &self.body(false)).await {
            Ok(response) => response,
            Err(_) => return Ok(None),
        };
        let value: Value = match response.json().await {
            Ok(value) => value,
            Err(_) => return Ok(None),
        };

        let (text, _) = parse_candidate(&value);
        if text.is_empty() {
            Ok(None)
        } else {
            Ok(Some(text))
        }
    }
}
