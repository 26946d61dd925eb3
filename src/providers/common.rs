//! Shared HTTP transport for OpenAI-compatible chat-completions endpoints.
//!
//! Grounded directly in `clients/common.rs`'s `send_with_native_tools`/`get_shared_http_client`:
//! this module keeps the same pooled-client construction and the same wire-format table (system /
//! user / assistant-with-tool_calls / assistant-text / tool), adapted to build and parse the
//! crate's own [`Message`]/[`CompleteResponse`] types, and to surface `log::log_enabled!`-gated
//! diagnostics around each request.

use crate::message::{Message, ToolCall};
use crate::provider::{synthesize_call_id, CallOptions, CompleteResponse, ToolDefinition, TokenUsage};
use lazy_static::lazy_static;
use std::error::Error;
use std::time::Duration;
use tokio::sync::Mutex;

lazy_static! {
    /// Shared HTTP client with persistent connection pooling, mirroring
    /// `clients::common::SHARED_HTTP_CLIENT`'s tuning.
    static ref SHARED_HTTP_CLIENT: reqwest::Client = {
        reqwest::ClientBuilder::new()
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .pool_max_idle_per_host(10)
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .timeout(Duration::from_secs(300))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build shared HTTP client")
    };
}

/// Borrow the lazily initialized shared [`reqwest::Client`].
pub fn get_shared_http_client() -> &'static reqwest::Client {
    &SHARED_HTTP_CLIENT
}

/// Serialize the canonical message sequence into the OpenAI-compatible wire format.
///
/// | [`Message`] variant | Wire representation |
/// |---|---|
/// | `System` | `{"role":"system","content":"..."}` |
/// | `User` | `{"role":"user","content":"..."}` |
/// | `AssistantText` | `{"role":"assistant","content":"..."}` |
/// | `AssistantToolCalls` | `{"role":"assistant","content":null,"tool_calls":[...]}` |
/// | `Tool` | `{"role":"tool","tool_call_id":"<id>","content":"..."}` |
fn wire_messages(messages: &[Message]) -> Vec<serde_json::Value> {
    messages
        .iter()
        .map(|msg| match msg {
            Message::System { content } => serde_json::json!({"role": "system", "content": content.as_ref()}),
            Message::User { content } => serde_json::json!({"role": "user", "content": content.as_ref()}),
            Message::AssistantText { content } => {
                serde_json::json!({"role": "assistant", "content": content.as_ref()})
            }
            Message::AssistantToolCalls { tool_calls } => {
                let calls: Vec<serde_json::Value> = tool_calls
                    .iter()
                    .map(|tc| {
                        serde_json::json!({
                            "id": tc.call_id,
                            "type": "function",
                            "function": {
                                "name": tc.name,
                                "arguments": serde_json::to_string(&tc.arguments).unwrap_or_else(|_| "{}".to_string())
                            }
                        })
                    })
                    .collect();
                serde_json::json!({"role": "assistant", "content": serde_json::Value::Null, "tool_calls": calls})
            }
            Message::Tool { call_id, content, .. } => {
                serde_json::json!({"role": "tool", "tool_call_id": call_id, "content": content.as_ref()})
            }
        })
        .collect()
}

fn wire_tools(tools: &[ToolDefinition]) -> Vec<serde_json::Value> {
    tools
        .iter()
        .map(|t| {
            serde_json::json!({
                "type": "function",
                "function": {
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters_schema
                }
            })
        })
        .collect()
}

/// Call `{base_url}/chat/completions` with an `Authorization: Bearer {api_key}` header, parse the
/// assistant content and any native tool calls out of the response, and persist token usage into
/// `usage_slot`.
///
/// Compatible with OpenAI, Anthropic Claude (via its OpenAI-compatible endpoint), and Google
/// Gemini's OpenAI-compatible endpoint — the same compatibility story `send_with_native_tools`
/// documented.
pub async fn complete_via_chat_completions(
    base_url: &str,
    api_key: &str,
    model: &str,
    messages: &[Message],
    tools: &[ToolDefinition],
    options: &CallOptions,
    http_client: &reqwest::Client,
    usage_slot: &Mutex<Option<TokenUsage>>,
) -> Result<CompleteResponse, Box<dyn Error + Send + Sync>> {
    let mut body = serde_json::json!({
        "model": model,
        "messages": wire_messages(messages),
        "temperature": options.temperature,
    });
    if !tools.is_empty() {
        body["tools"] = serde_json::Value::Array(wire_tools(tools));
    }
    if let Some(max_tokens) = options.max_completion_tokens {
        body["max_completion_tokens"] = serde_json::json!(max_tokens);
    }
    if let Some(structured) = &options.structured_output {
        body["response_format"] = serde_json::json!({
            "type": "json_schema",
            "json_schema": {"name": structured.schema_name, "schema": structured.schema, "strict": true}
        });
    }

    let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));

    let resp = http_client
        .post(&url)
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await?;

    let status = resp.status();
    let text = resp.text().await?;

    if !status.is_success() {
        if log::log_enabled!(log::Level::Error) {
            log::error!("providers::common::complete_via_chat_completions: HTTP {} from {}: {}", status, url, text);
        }
        return Err(format!("HTTP {} from {}: {}", status, url, text).into());
    }

    let parsed: serde_json::Value = serde_json::from_str(&text)?;

    if let Some(usage_obj) = parsed.get("usage") {
        let input = usage_obj.get("prompt_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as usize;
        let output = usage_obj.get("completion_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as usize;
        *usage_slot.lock().await = Some(TokenUsage {
            input_tokens: input,
            output_tokens: output,
            total_tokens: input + output,
        });
    }

    let choice_msg = parsed
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .ok_or("no choices in provider response")?;

    let content = choice_msg.get("content").and_then(|c| c.as_str()).map(|s| s.to_string());

    let tool_calls: Vec<ToolCall> = choice_msg
        .get("tool_calls")
        .and_then(|tc| tc.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|tc| {
                    let call_id = tc
                        .get("id")
                        .and_then(|v| v.as_str())
                        .map(|s| s.to_string())
                        .unwrap_or_else(synthesize_call_id);
                    let func = tc.get("function")?;
                    let name = func.get("name")?.as_str()?.to_string();
                    let args_str = func.get("arguments").and_then(|v| v.as_str()).unwrap_or("{}");
                    let arguments: serde_json::Value =
                        serde_json::from_str(args_str).unwrap_or_else(|_| serde_json::json!({}));
                    Some(ToolCall { call_id, name, arguments })
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(CompleteResponse { content, tool_calls, raw_response: parsed })
}

/// Retry a `complete()` call up to twice with exponential backoff (250 ms, 1 s), to absorb
/// transient LLM provider failures (network/auth/rate-limit) before surfacing an error.
pub async fn with_retries<F, Fut>(mut attempt: F) -> Result<CompleteResponse, Box<dyn Error + Send + Sync>>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<CompleteResponse, Box<dyn Error + Send + Sync>>>,
{
    const BACKOFFS_MS: [u64; 2] = [250, 1000];
    let mut last_err = None;
    for backoff_ms in BACKOFFS_MS {
        match attempt().await {
            Ok(resp) => return Ok(resp),
            Err(e) => {
                if log::log_enabled!(log::Level::Warn) {
                    log::warn!("providers::common::with_retries: attempt failed, retrying in {} ms: {}", backoff_ms, e);
                }
                last_err = Some(e);
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            }
        }
    }
    attempt().await.map_err(|e| last_err.unwrap_or(e))
}
