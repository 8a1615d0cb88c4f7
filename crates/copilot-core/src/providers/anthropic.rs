//! Anthropic Messages API adapter
//!
//! Top-level `system` string, `tool_use` content blocks in, user-role
//! `tool_result` blocks out. Streaming arrives as typed SSE events with
//! tool input split across `input_json_delta` fragments.

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
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

/// Adapter for Anthropic's Messages API
pub struct AnthropicAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    logger: SharedLogger,
}

impl AnthropicAdapter {
    /// Create an adapter against the hosted Anthropic endpoint
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, logger: SharedLogger) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            logger,
        }
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }

    async fn post(&self, body: &Value) -> ProviderResult<reqwest::Response> {
        let response = self
            .client
            .post(self.messages_url())
            .timeout(REQUEST_TIMEOUT)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
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
            return Err(ProviderError::api("anthropic", status.as_u16(), text));
        }
        Ok(response)
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn chat(
        &self,
        messages: &[Message],
        tools: &[Tool],
        executor: &dyn ToolExecutor,
        options: &CallOptions,
    ) -> ChatOutcome {
        let mut dialogue = AnthropicDialogue::new(self, messages, tools, *options);
        match run_tool_loop(&mut dialogue, executor, options, None, &self.logger).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.logger
                    .error(&format!("LLM API call failed (anthropic): {}", e));
                ChatOutcome::failure("anthropic", &e)
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
        let mut dialogue = AnthropicDialogue::new(self, messages, tools, *options);
        match run_tool_loop(&mut dialogue, executor, options, Some(&sink), &self.logger).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.logger
                    .error(&format!("LLM API call failed (anthropic): {}", e));
                let outcome = ChatOutcome::failure("anthropic", &e);
                let _ = sink.send(StreamEvent::Content(outcome.content.clone())).await;
                let _ = sink.send(StreamEvent::End).await;
                outcome
            }
        }
    }
}

/// Convert tool descriptors to the Messages API tool format
fn to_wire_tools(tools: &[Tool]) -> Vec<Value> {
    tools
        .iter()
        .map(|tool| {
            json!({
                "name": tool.name,
                "description": tool.description,
                "input_schema": tool
                    .input_schema
                    .clone()
                    .unwrap_or_else(|| json!({"type": "object"})),
            })
        })
        .collect()
}

/// Extract text and tool requests from a response's content blocks
fn parse_content_blocks(content: &Value) -> (String, Vec<ToolRequest>) {
    let mut text = String::new();
    let mut requests = Vec::new();

    if let Some(blocks) = content.as_array() {
        for block in blocks {
            match block.get("type").and_then(Value::as_str) {
                Some("text") => {
                    if let Some(piece) = block.get("text").and_then(Value::as_str) {
                        text.push_str(piece);
                    }
                }
                Some("tool_use") => {
                    let id = block.get("id").and_then(Value::as_str).unwrap_or_default();
                    let name = block
                        .get("name")
                        .and_then(Value::as_str)
                        .unwrap_or_default();
                    let args = block.get("input").cloned().unwrap_or_else(|| json!({}));
                    if !name.is_empty() {
                        requests.push(ToolRequest::new(id, name, args));
                    }
                }
                _ => {}
            }
        }
    }

    (text, requests)
}

/// Accumulates streamed content blocks by index
///
/// `tool_use` input arrives as `input_json_delta` fragments that must be
/// concatenated before parsing.
#[derive(Default)]
struct BlockAccumulator {
    blocks: Vec<StreamedBlock>,
}

#[derive(Clone)]
enum StreamedBlock {
    Text(String),
    ToolUse {
        id: String,
        name: String,
        partial_json: String,
    },
}

impl BlockAccumulator {
    fn start_block(&mut self, index: usize, block: &Value) {
        if index >= self.blocks.len() {
            self.blocks
                .resize(index + 1, StreamedBlock::Text(String::new()));
        }
        if block.get("type").and_then(Value::as_str) == Some("tool_use") {
            self.blocks[index] = StreamedBlock::ToolUse {
                id: block
                    .get("id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                name: block
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                partial_json: String::new(),
            };
        }
    }

    fn feed_delta(&mut self, index: usize, delta: &Value) -> Option<String> {
        if index >= self.blocks.len() {
            self.blocks
                .resize(index + 1, StreamedBlock::Text(String::new()));
        }
        match delta.get("type").and_then(Value::as_str) {
            Some("text_delta") => {
                let piece = delta.get("text").and_then(Value::as_str)?.to_string();
                if let StreamedBlock::Text(text) = &mut self.blocks[index] {
                    text.push_str(&piece);
                }
                Some(piece)
            }
            Some("input_json_delta") => {
                if let Some(fragment) = delta.get("partial_json").and_then(Value::as_str) {
                    if let StreamedBlock::ToolUse { partial_json, .. } = &mut self.blocks[index] {
                        partial_json.push_str(fragment);
                    }
                }
                None
            }
            _ => None,
        }
    }

    /// Produce accumulated text, parsed requests and wire-shaped blocks
    fn finish(self) -> (String, Vec<ToolRequest>, Vec<Value>) {
        let mut text = String::new();
        let mut requests = Vec::new();
        let mut wire = Vec::new();

        for block in self.blocks {
            match block {
                StreamedBlock::Text(piece) => {
                    if !piece.is_empty() {
                        text.push_str(&piece);
                        wire.push(json!({"type": "text", "text": piece}));
                    }
                }
                StreamedBlock::ToolUse {
                    id,
                    name,
                    partial_json,
                } => {
                    if name.is_empty() {
                        continue;
                    }
                    let input: Value =
                        serde_json::from_str(&partial_json).unwrap_or_else(|_| json!({}));
                    requests.push(ToolRequest::new(&id, &name, input.clone()));
                    wire.push(json!({
                        "type": "tool_use",
                        "id": id,
                        "name": name,
                        "input": input,
                    }));
                }
            }
        }

        (text, requests, wire)
    }
}

/// Vendor conversation state for one Messages API call
struct AnthropicDialogue<'a> {
    adapter: &'a AnthropicAdapter,
    messages: Vec<Value>,
    system: Option<String>,
    tools: Vec<Value>,
    pending_results: Vec<Value>,
    options: CallOptions,
}

impl<'a> AnthropicDialogue<'a> {
    fn new(
        adapter: &'a AnthropicAdapter,
        messages: &[Message],
        tools: &[Tool],
        options: CallOptions,
    ) -> Self {
        let system = messages
            .iter()
            .find(|m| m.role == MessageRole::System)
            .map(|m| m.content.clone());

        let conversation: Vec<Message> = messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .cloned()
            .collect();

        let messages = history::flatten(&conversation)
            .into_iter()
            .map(|(role, content)| {
                let role = match role {
                    MessageRole::Assistant => "assistant",
                    _ => "user",
                };
                json!({"role": role, "content": content})
            })
            .collect();

        Self {
            adapter,
            messages,
            system,
            tools: to_wire_tools(tools),
            pending_results: Vec::new(),
            options,
        }
    }

    fn body(&self, stream: bool) -> Value {
        let mut body = json!({
            "model": self.adapter.model,
            "max_tokens": self.options.max_tokens,
            "temperature": self.options.temperature,
            "messages": self.messages,
        });
        if let Some(system) = &self.system {
            body["system"] = json!(system);
        }
        if !self.tools.is_empty() {
            body["tools"] = Value::Array(self.tools.clone());
        }
        if stream {
            body["stream"] = json!(true);
        }
        body
    }

    /// Tool results for one assistant turn travel as a single user message
    fn flush_pending_results(&mut self) {
        if !self.pending_results.is_empty() {
            let blocks = std::mem::take(&mut self.pending_results);
            self.messages.push(json!({"role": "user", "content": blocks}));
        }
    }

    async fn round_blocking(&mut self) -> ProviderResult<RoundReply> {
        self.flush_pending_results();

        let response = self.adapter.post(&self.body(false)).await?;
        let value: Value = response.json().await?;

        let content = value.get("content").cloned().unwrap_or(Value::Null);
        let (text, requests) = parse_content_blocks(&content);
        let usage = value.get("usage").and_then(TokenUsage::from_vendor);

        if !requests.is_empty() {
            self.messages
                .push(json!({"role": "assistant", "content": content}));
        }

        Ok(RoundReply {
            text,
            requests,
            usage,
        })
    }

    async fn round_streaming(&mut self, sink: &EventSink) -> ProviderResult<RoundReply> {
        self.flush_pending_results();

        let response = self.adapter.post(&self.body(true)).await?;

        let mut stream = response.bytes_stream();
        let mut lines = SseLineBuffer::new();
        let mut accumulator = BlockAccumulator::default();
        let mut usage = TokenUsage::default();
        let mut stopped = false;

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

                let index = value.get("index").and_then(Value::as_u64).unwrap_or(0) as usize;
                match value.get("type").and_then(Value::as_str) {
                    Some("error") => {
                        return Err(ProviderError::invalid_response(
                            "anthropic",
                            value
                                .pointer("/error/message")
                                .and_then(Value::as_str)
                                .unwrap_or("stream error")
                                .to_string(),
                        ));
                    }
                    Some("message_start") => {
                        if let Some(reported) = value
                            .pointer("/message/usage")
                            .and_then(TokenUsage::from_vendor)
                        {
                            usage.input_tokens = reported.input_tokens;
                        }
                    }
                    Some("content_block_start") => {
                        if let Some(block) = value.get("content_block") {
                            accumulator.start_block(index, block);
                        }
                    }
                    Some("content_block_delta") => {
                        if let Some(delta) = value.get("delta") {
                            if let Some(piece) = accumulator.feed_delta(index, delta) {
                                let _ = sink.send(StreamEvent::Content(piece)).await;
                            }
                        }
                    }
                    Some("message_delta") => {
                        if let Some(reported) =
                            value.get("usage").and_then(TokenUsage::from_vendor)
                        {
                            usage.output_tokens = reported.output_tokens;
                        }
                    }
                    Some("message_stop") => {
                        stopped = true;
                        break;
                    }
                    _ => {}
                }
            }

            if stopped {
                break;
            }
        }

        let (text, requests, wire) = accumulator.finish();
        if !requests.is_empty() {
            self.messages
                .push(json!({"role": "assistant", "content": wire}));
        }

        let usage = if usage == TokenUsage::default() {
            None
        } else {
            Some(usage)
        };

        Ok(RoundReply {
            text,
            requests,
            usage,
        })
    }
}

#[async_trait]
impl VendorDialogue for AnthropicDialogue<'_> {
    async fn round(&mut self, sink: Option<&EventSink>) -> ProviderResult<RoundReply> {
        match sink {
            None => self.round_blocking().await,
            Some(sink) => self.round_streaming(sink).await,
        }
    }

    fn push_tool_result(&mut self, request: &ToolRequest, outcome: &ToolOutcome) {
        let mut block = json!({
            "type": "tool_result",
            "tool_use_id": request.id,
            "content": outcome.as_str(),
        });
        if matches!(outcome, ToolOutcome::Failure(_)) {
            block["is_error"] = json!(true);
        }
        self.pending_results.push(block);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;
    use std::sync::Arc;

    fn adapter() -> AnthropicAdapter {
        AnthropicAdapter::new("key", "claude-sonnet-4-5", Arc::new(NoOpLogger))
    }

    #[test]
    fn test_messages_url() {
        assert_eq!(
            adapter().messages_url(),
            "https://api.anthropic.com/v1/messages"
        );
    }

    #[test]
    fn test_wire_tools_use_input_schema() {
        let tools = vec![Tool::new("get-flows", "List flows").with_schema(json!({
            "type": "object"
        }))];
        let wire = to_wire_tools(&tools);

        assert_eq!(wire[0]["name"], "get-flows");
        assert!(wire[0].get("input_schema").is_some());
        assert!(wire[0].get("parameters").is_none());
    }

    #[test]
    fn test_parse_content_blocks() {
        let content = json!([
            {"type": "text", "text": "Let me check. "},
            {"type": "tool_use", "id": "toolu_1", "name": "get-flows", "input": {"tab": "1"}},
        ]);
        let (text, requests) = parse_content_blocks(&content);

        assert_eq!(text, "Let me check. ");
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].id, "toolu_1");
        assert_eq!(requests[0].args["tab"], "1");
    }

    #[test]
    fn test_dialogue_body_shape() {
        let binding = adapter();
        let messages = vec![Message::system("be terse"), Message::user("hi")];
        let dialogue = AnthropicDialogue::new(&binding, &messages, &[], CallOptions::default());

        let body = dialogue.body(false);
        assert_eq!(body["system"], "be terse");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["max_tokens"], 2000);
        assert!(body.get("stream").is_none());
    }

    #[test]
    fn test_tool_results_flush_as_single_user_message() {
        let binding = adapter();
        let mut dialogue = AnthropicDialogue::new(
            &binding,
            &[Message::user("hi")],
            &[],
            CallOptions::default(),
        );

        let request = ToolRequest::new("toolu_9", "inject", json!({}));
        dialogue.push_tool_result(&request, &ToolOutcome::Failure("Error: no".to_string()));
        dialogue.flush_pending_results();

        let last = dialogue.messages.last().unwrap();
        assert_eq!(last["role"], "user");
        assert_eq!(last["content"][0]["type"], "tool_result");
        assert_eq!(last["content"][0]["tool_use_id"], "toolu_9");
        assert_eq!(last["content"][0]["is_error"], true);
    }

    #[test]
    fn test_block_accumulator_streams_tool_input() {
        let mut accumulator = BlockAccumulator::default();
        accumulator.start_block(
            0,
            &json!({"type": "tool_use", "id": "toolu_1", "name": "get-flow"}),
        );
        assert!(accumulator
            .feed_delta(0, &json!({"type": "input_json_delta", "partial_json": "{\"id\":"}))
            .is_none());
        assert!(accumulator
            .feed_delta(0, &json!({"type": "input_json_delta", "partial_json": "\"f1\"}"}))
            .is_none());

        let (text, requests, wire) = accumulator.finish();
        assert!(text.is_empty());
        assert_eq!(requests[0].args, json!({"id": "f1"}));
        assert_eq!(wire[0]["input"]["id"], "f1");
    }

    #[test]
    fn test_block_accumulator_text_deltas() {
        let mut accumulator = BlockAccumulator::default();
        let piece = accumulator.feed_delta(0, &json!({"type": "text_delta", "text": "Hel"}));
        assert_eq!(piece.as_deref(), Some("Hel"));
        accumulator.feed_delta(0, &json!({"type": "text_delta", "text": "lo"}));

        let (text, requests, _) = accumulator.finish();
        assert_eq!(text, "Hello");
        assert!(requests.is_empty());
    }
}
