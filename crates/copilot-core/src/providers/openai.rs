//! OpenAI-compatible chat adapter
//!
//! Covers OpenAI, DeepSeek, custom OpenAI-compatible endpoints and Azure
//! deployments. They share the Chat Completions wire format; only base URL
//! and auth header differ.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};

use crate::history;
use crate::logging::SharedLogger;
use crate::types::{EventSink, Message, StreamEvent, TokenUsage, Tool, ToolRequest};

use super::driver::{run_tool_loop, RoundReply, ToolOutcome, VendorDialogue};
use super::error::{ProviderError, ProviderResult};
use super::sse::{extract_data_payload, SseLineBuffer};
use super::traits::{CallOptions, ChatOutcome, ProviderAdapter, ToolExecutor};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How the API key travels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthStyle {
    /// `Authorization: Bearer <key>` (OpenAI, DeepSeek, custom)
    Bearer,
    /// `api-key: <key>` (Azure)
    ApiKeyHeader,
}

/// Adapter for the OpenAI-compatible provider family
pub struct OpenAiCompatibleAdapter {
    client: reqwest::Client,
    provider: String,
    base_url: String,
    api_key: String,
    auth: AuthStyle,
    model: String,
    logger: SharedLogger,
}

impl OpenAiCompatibleAdapter {
    fn with_base(
        provider: &str,
        base_url: impl Into<String>,
        auth: AuthStyle,
        api_key: impl Into<String>,
        model: impl Into<String>,
        logger: SharedLogger,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            provider: provider.to_string(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            auth,
            model: model.into(),
            logger,
        }
    }

    /// OpenAI's hosted endpoint
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>, logger: SharedLogger) -> Self {
        Self::with_base(
            "openai",
            "https://api.openai.com/v1",
            AuthStyle::Bearer,
            api_key,
            model,
            logger,
        )
    }

    /// DeepSeek's OpenAI-compatible endpoint
    pub fn deepseek(
        api_key: impl Into<String>,
        model: impl Into<String>,
        logger: SharedLogger,
    ) -> Self {
        Self::with_base(
            "deepseek",
            "https://api.deepseek.com",
            AuthStyle::Bearer,
            api_key,
            model,
            logger,
        )
    }

    /// Any OpenAI-compatible endpoint at a custom base URL
    pub fn custom(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        logger: SharedLogger,
    ) -> Self {
        Self::with_base("custom", base_url, AuthStyle::Bearer, api_key, model, logger)
    }

    /// An Azure OpenAI deployment exposing the compatible chat API
    pub fn azure(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        logger: SharedLogger,
    ) -> Self {
        Self::with_base("azure", base_url, AuthStyle::ApiKeyHeader, api_key, model, logger)
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn request(&self, body: &Value) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .post(self.completions_url())
            .timeout(REQUEST_TIMEOUT)
            .header("Content-Type", "application/json");

        let builder = match self.auth {
            AuthStyle::Bearer => builder.bearer_auth(&self.api_key),
            AuthStyle::ApiKeyHeader => builder.header("api-key", &self.api_key),
        };

        builder.json(body)
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiCompatibleAdapter {
    fn name(&self) -> &str {
        &self.provider
    }

    async fn chat(
        &self,
        messages: &[Message],
        tools: &[Tool],
        executor: &dyn ToolExecutor,
        options: &CallOptions,
    ) -> ChatOutcome {
        let mut dialogue = OpenAiDialogue::new(self, messages, tools, *options);
        match run_tool_loop(&mut dialogue, executor, options, None, &self.logger).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.logger
                    .error(&format!("LLM API call failed ({}): {}", self.provider, e));
                ChatOutcome::failure(&self.provider, &e)
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
        let mut dialogue = OpenAiDialogue::new(self, messages, tools, *options);
        match run_tool_loop(&mut dialogue, executor, options, Some(&sink), &self.logger).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.logger
                    .error(&format!("LLM API call failed ({}): {}", self.provider, e));
                let outcome = ChatOutcome::failure(&self.provider, &e);
                let _ = sink.send(StreamEvent::Content(outcome.content.clone())).await;
                let _ = sink.send(StreamEvent::End).await;
                outcome
            }
        }
    }
}

/// Convert tool descriptors to the Chat Completions function format
fn to_wire_tools(tools: &[Tool]) -> Vec<Value> {
    tools
        .iter()
        .map(|tool| {
            json!({
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool
                        .input_schema
                        .clone()
                        .unwrap_or_else(|| json!({"type": "object"})),
                }
            })
        })
        .collect()
}

/// Parse an assistant message into text and tool requests
fn parse_assistant_message(message: &Value, usage: Option<TokenUsage>) -> RoundReply {
    let text = message
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let requests = message
        .get("tool_calls")
        .and_then(Value::as_array)
        .map(|calls| {
            calls
                .iter()
                .filter_map(|call| {
                    let function = call.get("function")?;
                    let name = function.get("name").and_then(Value::as_str)?;
                    let args = parse_arguments(function.get("arguments"));
                    let id = call.get("id").and_then(Value::as_str).unwrap_or_default();
                    Some(ToolRequest::new(id, name, args))
                })
                .collect()
        })
        .unwrap_or_default();

    RoundReply {
        text,
        requests,
        usage,
    }
}

/// Tool arguments arrive as a JSON-encoded string; malformed input degrades
/// to an empty object so the call still reaches the tool
fn parse_arguments(arguments: Option<&Value>) -> Value {
    match arguments {
        Some(Value::String(raw)) => serde_json::from_str(raw).unwrap_or_else(|_| json!({})),
        Some(object @ Value::Object(_)) => object.clone(),
        _ => json!({}),
    }
}

/// Buffers streamed tool-call fragments until each call is complete
///
/// Fragments are keyed by the vendor-assigned `index`; `id` and `name`
/// arrive once, `arguments` arrives as string pieces that must be
/// concatenated before parsing.
#[derive(Default)]
struct ToolCallAccumulator {
    partial: Vec<PartialCall>,
}

#[derive(Default, Clone)]
struct PartialCall {
    id: String,
    name: String,
    arguments: String,
}

impl ToolCallAccumulator {
    fn new() -> Self {
        Self::default()
    }

    fn feed(&mut self, deltas: &[Value]) {
        for delta in deltas {
            let index = delta
                .get("index")
                .and_then(Value::as_u64)
                .unwrap_or(self.partial.len() as u64) as usize;
            if index >= self.partial.len() {
                self.partial.resize(index + 1, PartialCall::default());
            }
            let slot = &mut self.partial[index];

            if slot.id.is_empty() {
                if let Some(id) = delta.get("id").and_then(Value::as_str) {
                    slot.id = id.to_string();
                }
            }
            if let Some(function) = delta.get("function") {
                if let Some(name) = function.get("name").and_then(Value::as_str) {
                    slot.name.push_str(name);
                }
                if let Some(fragment) = function.get("arguments").and_then(Value::as_str) {
                    slot.arguments.push_str(fragment);
                }
            }
        }
    }

    fn has_calls(&self) -> bool {
        self.partial.iter().any(|c| !c.name.is_empty())
    }

    /// Produce parsed requests plus the wire-shaped calls for the
    /// conversation transcript
    fn finish(self) -> (Vec<ToolRequest>, Vec<Value>) {
        let mut requests = Vec::new();
        let mut wire = Vec::new();

        for call in self.partial {
            if call.name.is_empty() {
                continue;
            }
            let args: Value = serde_json::from_str(&call.arguments).unwrap_or_else(|_| json!({}));
            requests.push(ToolRequest::new(&call.id, &call.name, args));
            wire.push(json!({
                "id": call.id,
                "type": "function",
                "function": {"name": call.name, "arguments": call.arguments},
            }));
        }

        (requests, wire)
    }
}

/// Vendor conversation state for one OpenAI-compatible call
struct OpenAiDialogue<'a> {
    adapter: &'a OpenAiCompatibleAdapter,
    messages: Vec<Value>,
    tools: Vec<Value>,
    options: CallOptions,
}

impl<'a> OpenAiDialogue<'a> {
    fn new(
        adapter: &'a OpenAiCompatibleAdapter,
        messages: &[Message],
        tools: &[Tool],
        options: CallOptions,
    ) -> Self {
        let messages = history::flatten(messages)
            .into_iter()
            .map(|(role, content)| json!({"role": role.to_string(), "content": content}))
            .collect();

        Self {
            adapter,
            messages,
            tools: to_wire_tools(tools),
            options,
        }
    }

    fn body(&self, stream: bool) -> Value {
        let mut body = json!({
            "model": self.adapter.model,
            "messages": self.messages,
            "temperature": self.options.temperature,
            "max_tokens": self.options.max_tokens,
        });
        if !self.tools.is_empty() {
            body["tools"] = Value::Array(self.tools.clone());
            body["tool_choice"] = json!("auto");
        }
        if stream {
            body["stream"] = json!(true);
        }
        body
    }

    async fn round_blocking(&mut self) -> ProviderResult<RoundReply> {
        let response = self.adapter.request(&self.body(false)).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(ProviderError::api(
                &self.adapter.provider,
                status.as_u16(),
                text,
            ));
        }

        let value: Value = response.json().await?;
        let message = value
            .pointer("/choices/0/message")
            .cloned()
            .ok_or_else(|| {
                ProviderError::invalid_response(
                    &self.adapter.provider,
                    "missing choices[0].message",
                )
            })?;

        let usage = value.get("usage").and_then(TokenUsage::from_vendor);
        let reply = parse_assistant_message(&message, usage);
        self.messages.push(message);
        Ok(reply)
    }

    async fn round_streaming(&mut self, sink: &EventSink) -> ProviderResult<RoundReply> {
        let response = self.adapter.request(&self.body(true)).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(ProviderError::api(
                &self.adapter.provider,
                status.as_u16(),
                text,
            ));
        }

        let mut stream = response.bytes_stream();
        let mut lines = SseLineBuffer::new();
        let mut text = String::new();
        let mut accumulator = ToolCallAccumulator::new();
        let mut usage = None;
        let mut done = false;

        while let Some(chunk) = stream.next().await {
            lines.push(&chunk?);

            while let Some(line) = lines.next_line() {
                let Some(payload) = extract_data_payload(&line) else {
                    continue;
                };
                if payload == "[DONE]" {
                    done = true;
                    break;
                }
                if payload.is_empty() {
                    continue;
                }
                let Ok(value) = serde_json::from_str::<Value>(payload) else {
                    continue;
                };

                if let Some(error) = value.get("error") {
                    return Err(ProviderError::invalid_response(
                        &self.adapter.provider,
                        error.to_string(),
                    ));
                }
                if let Some(reported) = value.get("usage").and_then(TokenUsage::from_vendor) {
                    usage = Some(reported);
                }

                let Some(delta) = value.pointer("/choices/0/delta") else {
                    continue;
                };
                if let Some(piece) = delta.get("content").and_then(Value::as_str) {
                    if !piece.is_empty() {
                        text.push_str(piece);
                        let _ = sink.send(StreamEvent::Content(piece.to_string())).await;
                    }
                }
                if let Some(calls) = delta.get("tool_calls").and_then(Value::as_array) {
                    accumulator.feed(calls);
                }
            }

            if done {
                break;
            }
        }

        let has_calls = accumulator.has_calls();
        let (requests, wire_calls) = accumulator.finish();

        let mut assistant = json!({
            "role": "assistant",
            "content": if text.is_empty() { Value::Null } else { Value::String(text.clone()) },
        });
        if has_calls {
            assistant["tool_calls"] = Value::Array(wire_calls);
        }
        self.messages.push(assistant);

        Ok(RoundReply {
            text,
            requests,
            usage,
        })
    }
}

#[async_trait]
impl VendorDialogue for OpenAiDialogue<'_> {
    async fn round(&mut self, sink: Option<&EventSink>) -> ProviderResult<RoundReply> {
        match sink {
            None => self.round_blocking().await,
            Some(sink) => self.round_streaming(sink).await,
        }
    }

    fn push_tool_result(&mut self, request: &ToolRequest, outcome: &ToolOutcome) {
        self.messages.push(json!({
            "role": "tool",
            "tool_call_id": request.id,
            "content": outcome.as_str(),
        }));
    }
}
