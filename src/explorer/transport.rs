use std::io::{BufRead, BufReader};
use std::time::Duration;

use serde_json::{json, Value};
use thiserror::Error;

use crate::explorer::session::ChatSession;
use crate::settings::Settings;

pub(crate) const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub(crate) const DEFAULT_MODEL: &str = "llama3:8b";
pub(crate) const DEFAULT_TEMPERATURE: f64 = 0.6;
pub(crate) const DEFAULT_TOP_P: f64 = 0.9;
pub(crate) const DEFAULT_NUM_PREDICT: u32 = 2048;

// Streaming calls stay open for the whole generation, so they get the
// longer budget. Neither call retries internally.
const BUFFERED_TIMEOUT_SECS: u64 = 600;
const STREAM_TIMEOUT_SECS: u64 = 900;

#[derive(Debug, Error)]
pub(crate) enum GenerateError {
    /// Connection failure, operation timeout, or a stream that broke mid-read.
    #[error("backend unreachable: {0}")]
    Transport(String),
    /// Non-success HTTP status from the backend, body included verbatim.
    #[error("backend error {status}: {body}")]
    Backend { status: u16, body: String },
    /// Both the streaming and the buffered attempt failed; wraps the
    /// buffered attempt's error.
    #[error("generation failed: {0}")]
    Exhausted(#[source] Box<GenerateError>),
}

impl From<reqwest::Error> for GenerateError {
    fn from(err: reqwest::Error) -> Self {
        GenerateError::Transport(err.to_string())
    }
}

impl From<std::io::Error> for GenerateError {
    fn from(err: std::io::Error) -> Self {
        GenerateError::Transport(err.to_string())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SamplingOptions {
    pub(crate) temperature: f64,
    pub(crate) top_p: f64,
    pub(crate) num_predict: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct BackendConfig {
    pub(crate) base_url: String,
    pub(crate) model: String,
    pub(crate) options: SamplingOptions,
}

impl BackendConfig {
    /// Environment wins over the settings file, which wins over defaults.
    pub(crate) fn resolve(settings: &Settings) -> Self {
        let overrides = &settings.backend;
        Self {
            base_url: env_value("OLLAMA_BASE_URL")
                .or_else(|| overrides.base_url.clone())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: env_value("OLLAMA_MODEL")
                .or_else(|| overrides.model.clone())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            options: SamplingOptions {
                temperature: env_parse("OLLAMA_TEMPERATURE")
                    .or(overrides.temperature)
                    .unwrap_or(DEFAULT_TEMPERATURE),
                top_p: env_parse("OLLAMA_TOP_P")
                    .or(overrides.top_p)
                    .unwrap_or(DEFAULT_TOP_P),
                num_predict: env_parse("OLLAMA_NUM_PREDICT")
                    .or(overrides.num_predict)
                    .unwrap_or(DEFAULT_NUM_PREDICT),
            },
        }
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_value(key).and_then(|raw| raw.parse().ok())
}

/// Buffered single-turn completion. A missing `response` field on a success
/// body is a valid empty result, not an error.
pub(crate) fn complete(config: &BackendConfig, prompt: &str) -> Result<String, GenerateError> {
    let body = generate_body(config, prompt, false);
    let value = post_buffered(&generate_url(&config.base_url), &body)?;
    Ok(text_field(&value, generate_piece))
}

/// Incremental single-turn completion. Each extracted piece is handed to
/// `on_token` as it arrives and accumulated into the returned text.
pub(crate) fn complete_stream(
    config: &BackendConfig,
    prompt: &str,
    on_token: &mut dyn FnMut(&str),
) -> Result<String, GenerateError> {
    let body = generate_body(config, prompt, true);
    let response = post_streaming(&generate_url(&config.base_url), &body)?;
    drain_fragments(BufReader::new(response), generate_piece, on_token)
}

/// Buffered multi-turn completion over the full session transcript.
pub(crate) fn chat(session: &ChatSession) -> Result<String, GenerateError> {
    let config = session.config();
    let body = chat_body(session, false);
    let value = post_buffered(&chat_url(&config.base_url), &body)?;
    Ok(text_field(&value, chat_piece))
}

/// Incremental multi-turn completion over the full session transcript.
pub(crate) fn chat_stream(
    session: &ChatSession,
    on_token: &mut dyn FnMut(&str),
) -> Result<String, GenerateError> {
    let config = session.config();
    let body = chat_body(session, true);
    let response = post_streaming(&chat_url(&config.base_url), &body)?;
    drain_fragments(BufReader::new(response), chat_piece, on_token)
}

fn generate_url(base_url: &str) -> String {
    format!("{}/api/generate", base_url.trim_end_matches('/'))
}

fn chat_url(base_url: &str) -> String {
    format!("{}/api/chat", base_url.trim_end_matches('/'))
}

fn generate_body(config: &BackendConfig, prompt: &str, stream: bool) -> Value {
    json!({
        "model": config.model,
        "prompt": prompt,
        "stream": stream,
        "options": options_value(&config.options),
    })
}

fn chat_body(session: &ChatSession, stream: bool) -> Value {
    let config = session.config();
    json!({
        "model": config.model,
        "messages": session.to_wire(),
        "stream": stream,
        "options": options_value(&config.options),
    })
}

fn options_value(options: &SamplingOptions) -> Value {
    json!({
        "temperature": options.temperature,
        "top_p": options.top_p,
        "num_predict": options.num_predict,
    })
}

fn http_client(timeout_secs: u64) -> Result<reqwest::blocking::Client, GenerateError> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

fn post_buffered(url: &str, body: &Value) -> Result<Value, GenerateError> {
    tracing::debug!(url, "buffered backend request");
    let response = http_client(BUFFERED_TIMEOUT_SECS)?.post(url).json(body).send()?;
    let status = response.status();
    let text = response.text()?;
    if !status.is_success() {
        return Err(GenerateError::Backend {
            status: status.as_u16(),
            body: text,
        });
    }
    serde_json::from_str(&text)
        .map_err(|err| GenerateError::Transport(format!("malformed response body: {err}")))
}

fn post_streaming(url: &str, body: &Value) -> Result<reqwest::blocking::Response, GenerateError> {
    tracing::debug!(url, "streaming backend request");
    let response = http_client(STREAM_TIMEOUT_SECS)?.post(url).json(body).send()?;
    let status = response.status();
    if !status.is_success() {
        let text = response.text().unwrap_or_default();
        return Err(GenerateError::Backend {
            status: status.as_u16(),
            body: text,
        });
    }
    Ok(response)
}

/// Consumes newline-delimited JSON fragments until a terminal `done` marker
/// or end of stream. Fragments that fail to parse are skipped; the protocol
/// is lossy-tolerant rather than malformed-fatal.
pub(super) fn drain_fragments<R: BufRead>(
    reader: R,
    extract: fn(&Value) -> Option<&str>,
    on_token: &mut dyn FnMut(&str),
) -> Result<String, GenerateError> {
    let mut accumulated = String::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let Some(value) = parse_json_line(&line) else {
            continue;
        };
        if let Some(piece) = extract(&value) {
            if !piece.is_empty() {
                on_token(piece);
                accumulated.push_str(piece);
            }
        }
        if is_done(&value) {
            break;
        }
    }
    Ok(accumulated)
}

fn parse_json_line(line: &str) -> Option<Value> {
    serde_json::from_str(line).ok()
}

pub(super) fn generate_piece(value: &Value) -> Option<&str> {
    value.get("response")?.as_str()
}

pub(super) fn chat_piece(value: &Value) -> Option<&str> {
    value.get("message")?.get("content")?.as_str()
}

fn is_done(value: &Value) -> bool {
    value.get("done").and_then(Value::as_bool).unwrap_or(false)
}

fn text_field(value: &Value, extract: fn(&Value) -> Option<&str>) -> String {
    extract(value).unwrap_or_default().to_string()
}
