//! The bounded tool-calling loop
//!
//! Every vendor adapter drives the same loop; only the wire translation
//! differs. A `VendorDialogue` owns the vendor-side conversation state for
//! one call and exposes three hooks: issue one round, append one tool
//! result, and optionally probe for text when a final round came back
//! empty.

use async_trait::async_trait;

use crate::logging::SharedLogger;
use crate::log_info;
use crate::types::{EventSink, StreamEvent, TokenUsage, ToolCallRecord, ToolRequest};

use super::error::ProviderResult;
use super::traits::{CallOptions, ChatOutcome, ToolExecutor};

/// Placeholder when a vendor produces neither text nor tool calls
pub(crate) const NO_RESPONSE_PLACEHOLDER: &str = "No response generated";

/// Visible notice appended when the round cap is hit
pub(crate) fn limit_notice(max_rounds: u32) -> String {
    format!(
        "Reached maximum tool calls ({}), response may be incomplete",
        max_rounds
    )
}

/// What one vendor round produced
#[derive(Debug, Default)]
pub(crate) struct RoundReply {
    /// Text emitted this round (already streamed to the sink, if any)
    pub text: String,
    /// Tool invocations requested this round, in request order
    pub requests: Vec<ToolRequest>,
    /// Usage metadata, when the vendor reported it
    pub usage: Option<TokenUsage>,
}

/// Resolution of one tool invocation, as fed back to the vendor
#[derive(Debug, Clone)]
pub(crate) enum ToolOutcome {
    Success(String),
    Failure(String),
}

impl ToolOutcome {
    /// The string embedded into conversation state and the call record
    pub fn as_str(&self) -> &str {
        match self {
            ToolOutcome::Success(s) | ToolOutcome::Failure(s) => s,
        }
    }
}

/// Vendor-side conversation state for one adapter call
#[async_trait]
pub(crate) trait VendorDialogue: Send {
    /// Issue one request round; stream text deltas to `sink` when present
    async fn round(&mut self, sink: Option<&EventSink>) -> ProviderResult<RoundReply>;

    /// Append one tool result to the vendor conversation state
    ///
    /// Called once per request, in request order, before the next request
    /// executes.
    fn push_tool_result(&mut self, request: &ToolRequest, outcome: &ToolOutcome);

    /// One bounded recovery request when a final round yielded no text
    ///
    /// Default: no recovery; the loop substitutes the placeholder.
    async fn recover_text(&mut self) -> ProviderResult<Option<String>> {
        Ok(None)
    }
}

async fn emit(sink: Option<&EventSink>, event: StreamEvent) {
    if let Some(sink) = sink {
        let _ = sink.send(event).await;
    }
}

/// Drive the bounded loop to completion
///
/// Rounds are strictly sequential, tool calls within a round execute in
/// request order, and each result is appended before the next call starts.
/// The loop ends on the first round with zero tool requests; if all
/// `max_rounds` rounds requested tools, the limit notice is appended to the
/// visible output instead (reported, non-fatal).
pub(crate) async fn run_tool_loop(
    dialogue: &mut dyn VendorDialogue,
    executor: &dyn ToolExecutor,
    options: &CallOptions,
    sink: Option<&EventSink>,
    logger: &SharedLogger,
) -> ProviderResult<ChatOutcome> {
    let mut records: Vec<ToolCallRecord> = Vec::new();
    let mut notes: Vec<String> = Vec::new();
    let mut text = String::new();
    let mut usage = None;
    let mut finished = false;

    for round in 0..options.max_rounds {
        let reply = dialogue.round(sink).await?;
        if reply.usage.is_some() {
            usage = reply.usage;
        }
        text.push_str(&reply.text);

        if reply.requests.is_empty() {
            if text.is_empty() {
                // Some models finish a round with neither text nor calls;
                // give the vendor one non-streaming chance before giving up.
                if let Some(recovered) = dialogue.recover_text().await? {
                    if !recovered.is_empty() {
                        emit(sink, StreamEvent::Content(recovered.clone())).await;
                    }
                    text = recovered;
                }
            }
            if text.is_empty() {
                text = NO_RESPONSE_PLACEHOLDER.to_string();
                emit(sink, StreamEvent::Content(text.clone())).await;
            }
            finished = true;
            break;
        }

        log_info!(
            logger,
            "[ToolLoop] Round {}: {} tool call(s)",
            round,
            reply.requests.len()
        );

        for request in &reply.requests {
            let note = format!("Calling tool: {}", request.name);
            notes.push(note.clone());
            emit(sink, StreamEvent::Tool(note)).await;

            let outcome = match executor.execute_tool(&request.name, &request.args).await {
                Ok(result) => ToolOutcome::Success(result),
                Err(e) => {
                    let visible = format!("Tool call failed: {}", e);
                    notes.push(visible.clone());
                    emit(sink, StreamEvent::Error(visible)).await;
                    ToolOutcome::Failure(format!("Error: {}", e))
                }
            };

            records.push(ToolCallRecord::new(
                request.name.clone(),
                request.args.clone(),
                outcome.as_str(),
            ));
            dialogue.push_tool_result(request, &outcome);
        }
    }

    if !finished {
        let notice = limit_notice(options.max_rounds);
        emit(sink, StreamEvent::Warning(notice.clone())).await;
        if !text.is_empty() {
            text.push_str("\n\n");
        }
        text.push_str(&notice);
    }

    emit(sink, StreamEvent::End).await;

    // Streaming consumers already saw the text arrive; the non-streaming
    // outcome prepends the tool notes the way the sidebar renders them.
    let content = if sink.is_some() || notes.is_empty() {
        text
    } else {
        format!("{}\n\n{}", notes.join("\n\n"), text)
    };

    Ok(ChatOutcome {
        content,
        usage,
        tool_history: records,
        error: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;
    use crate::mcp::{McpError, McpResult};
    use crate::providers::error::ProviderError;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::sync::Mutex;

    /// Dialogue scripted from a list of replies
    struct ScriptedDialogue {
        replies: Vec<ScriptedReply>,
        rounds_issued: usize,
        pushed: Vec<(String, String)>,
        recovery: Option<String>,
        recoveries_used: usize,
    }

    enum ScriptedReply {
        Text(&'static str),
        Requests(Vec<&'static str>),
        Empty,
        Fail,
    }

    impl ScriptedDialogue {
        fn new(replies: Vec<ScriptedReply>) -> Self {
            Self {
                replies,
                rounds_issued: 0,
                pushed: Vec::new(),
                recovery: None,
                recoveries_used: 0,
            }
        }

        fn with_recovery(mut self, text: &str) -> Self {
            self.recovery = Some(text.to_string());
            self
        }
    }

    #[async_trait]
    impl VendorDialogue for ScriptedDialogue {
        async fn round(&mut self, sink: Option<&EventSink>) -> ProviderResult<RoundReply> {
            let index = self.rounds_issued;
            self.rounds_issued += 1;

            // Past the end of the script, keep requesting tools forever
            let reply = match self.replies.get(index).unwrap_or(&ScriptedReply::Requests(
                vec!["loop-tool"],
            )) {
                ScriptedReply::Text(text) => {
                    if let Some(sink) = sink {
                        let _ = sink.send(StreamEvent::Content(text.to_string())).await;
                    }
                    RoundReply {
                        text: text.to_string(),
                        ..Default::default()
                    }
                }
                ScriptedReply::Requests(names) => RoundReply {
                    requests: names
                        .iter()
                        .enumerate()
                        .map(|(i, name)| {
                            ToolRequest::new(format!("call_{}_{}", index, i), *name, json!({}))
                        })
                        .collect(),
                    ..Default::default()
                },
                ScriptedReply::Empty => RoundReply::default(),
                ScriptedReply::Fail => {
                    return Err(ProviderError::invalid_response("scripted", "boom"))
                }
            };
            Ok(reply)
        }

        fn push_tool_result(&mut self, request: &ToolRequest, outcome: &ToolOutcome) {
            self.pushed
                .push((request.name.clone(), outcome.as_str().to_string()));
        }

        async fn recover_text(&mut self) -> ProviderResult<Option<String>> {
            self.recoveries_used += 1;
            Ok(self.recovery.clone())
        }
    }

    /// Executor that succeeds or fails per tool name and records call order
    struct ScriptedExecutor {
        fail_names: Vec<&'static str>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedExecutor {
        fn new() -> Self {
            Self {
                fail_names: Vec::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing(names: Vec<&'static str>) -> Self {
            Self {
                fail_names: names,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ToolExecutor for ScriptedExecutor {
        async fn execute_tool(&self, name: &str, _args: &Value) -> McpResult<String> {
            self.calls.lock().unwrap().push(name.to_string());
            if self.fail_names.contains(&name) {
                Err(McpError::CallFailed {
                    name: name.to_string(),
                    message: "scripted failure".to_string(),
                })
            } else {
                Ok(format!("result-of-{}", name))
            }
        }
    }

    fn logger() -> SharedLogger {
        Arc::new(NoOpLogger)
    }

    #[tokio::test]
    async fn test_final_text_on_round_zero() {
        let mut dialogue = ScriptedDialogue::new(vec![ScriptedReply::Text("Hello there")]);
        let executor = ScriptedExecutor::new();

        let outcome = run_tool_loop(
            &mut dialogue,
            &executor,
            &CallOptions::default(),
            None,
            &logger(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.content, "Hello there");
        assert!(outcome.tool_history.is_empty());
        assert!(!outcome.error);
        assert_eq!(dialogue.rounds_issued, 1);
    }

    #[tokio::test]
    async fn test_round_bound_when_tools_never_stop() {
        // Every round requests a tool, so the loop must stop at the cap
        let mut dialogue = ScriptedDialogue::new(Vec::new());
        let executor = ScriptedExecutor::new();
        let options = CallOptions::default().with_max_rounds(4);

        let outcome = run_tool_loop(&mut dialogue, &executor, &options, None, &logger())
            .await
            .unwrap();

        assert_eq!(dialogue.rounds_issued, 4);
        assert_eq!(outcome.tool_history.len(), 4);
        assert!(outcome.content.contains("Reached maximum tool calls (4)"));
        assert!(!outcome.error);
    }

    #[tokio::test]
    async fn test_tools_execute_in_order_and_results_feed_back() {
        let mut dialogue = ScriptedDialogue::new(vec![
            ScriptedReply::Requests(vec!["first", "second"]),
            ScriptedReply::Text("done"),
        ]);
        let executor = ScriptedExecutor::new();

        let outcome = run_tool_loop(
            &mut dialogue,
            &executor,
            &CallOptions::default(),
            None,
            &logger(),
        )
        .await
        .unwrap();

        assert_eq!(
            *executor.calls.lock().unwrap(),
            vec!["first".to_string(), "second".to_string()]
        );
        assert_eq!(
            dialogue.pushed,
            vec![
                ("first".to_string(), "result-of-first".to_string()),
                ("second".to_string(), "result-of-second".to_string()),
            ]
        );
        assert_eq!(outcome.tool_history.len(), 2);
        assert_eq!(outcome.tool_history[0].result, "result-of-first");
        // Non-streaming display carries the tool notes before the text
        assert!(outcome.content.contains("Calling tool: first"));
        assert!(outcome.content.ends_with("done"));
    }

    #[tokio::test]
    async fn test_tool_failure_is_recorded_and_loop_continues() {
        let mut dialogue = ScriptedDialogue::new(vec![
            ScriptedReply::Requests(vec!["broken"]),
            ScriptedReply::Text("recovered anyway"),
        ]);
        let executor = ScriptedExecutor::failing(vec!["broken"]);

        let outcome = run_tool_loop(
            &mut dialogue,
            &executor,
            &CallOptions::default(),
            None,
            &logger(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.tool_history.len(), 1);
        assert!(outcome.tool_history[0].result.starts_with("Error: "));
        assert!(dialogue.pushed[0].1.starts_with("Error: "));
        assert!(outcome.content.ends_with("recovered anyway"));
        assert!(!outcome.error);
    }

    #[tokio::test]
    async fn test_empty_round_uses_recovery_probe() {
        let mut dialogue =
            ScriptedDialogue::new(vec![ScriptedReply::Empty]).with_recovery("from probe");
        let executor = ScriptedExecutor::new();

        let outcome = run_tool_loop(
            &mut dialogue,
            &executor,
            &CallOptions::default(),
            None,
            &logger(),
        )
        .await
        .unwrap();

        assert_eq!(dialogue.recoveries_used, 1);
        assert_eq!(outcome.content, "from probe");
    }

    #[tokio::test]
    async fn test_empty_round_without_recovery_uses_placeholder() {
        let mut dialogue = ScriptedDialogue::new(vec![ScriptedReply::Empty]);
        let executor = ScriptedExecutor::new();

        let outcome = run_tool_loop(
            &mut dialogue,
            &executor,
            &CallOptions::default(),
            None,
            &logger(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.content, NO_RESPONSE_PLACEHOLDER);
    }

    #[tokio::test]
    async fn test_vendor_error_propagates_to_adapter_boundary() {
        let mut dialogue = ScriptedDialogue::new(vec![ScriptedReply::Fail]);
        let executor = ScriptedExecutor::new();

        let result = run_tool_loop(
            &mut dialogue,
            &executor,
            &CallOptions::default(),
            None,
            &logger(),
        )
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_streaming_event_order() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(32);
        let mut dialogue = ScriptedDialogue::new(vec![
            ScriptedReply::Requests(vec!["probe"]),
            ScriptedReply::Text("final text"),
        ]);
        let executor = ScriptedExecutor::new();

        let outcome = run_tool_loop(
            &mut dialogue,
            &executor,
            &CallOptions::default(),
            Some(&tx),
            &logger(),
        )
        .await
        .unwrap();
        drop(tx);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        assert_eq!(
            events,
            vec![
                StreamEvent::Tool("Calling tool: probe".to_string()),
                StreamEvent::Content("final text".to_string()),
                StreamEvent::End,
            ]
        );
        // Streaming content is the text alone, without the tool notes
        assert_eq!(outcome.content, "final text");
    }

    #[tokio::test]
    async fn test_streaming_limit_emits_warning_before_end() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(32);
        let mut dialogue = ScriptedDialogue::new(Vec::new());
        let executor = ScriptedExecutor::new();
        let options = CallOptions::default().with_max_rounds(2);

        let outcome = run_tool_loop(&mut dialogue, &executor, &options, Some(&tx), &logger())
            .await
            .unwrap();
        drop(tx);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        assert!(matches!(events.last(), Some(StreamEvent::End)));
        assert!(matches!(
            events[events.len() - 2],
            StreamEvent::Warning(_)
        ));
        assert!(outcome.content.contains("Reached maximum tool calls (2)"));
    }
}
