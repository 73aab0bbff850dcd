//! Remote command interpreter with retry, backoff, and rule fallback.
//!
//! Sends the fixed intent schema plus the raw operator text to the
//! inference endpoint and validates the returned payload. Transient
//! failures (429, 5xx, transport) are retried with exponential backoff up
//! to the attempt budget; permanent failures (auth, bad request) and
//! malformed payloads fall straight back to the rule matcher. The
//! interpreter never touches the ledger.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

use tally_core::config::InferenceConfig;
use tally_core::Command;

use crate::fallback;

/// Schema description sent with every request. The taxonomy and slot names
/// here must stay in sync with [`tally_core::Command`].
const SCHEMA_PROMPT: &str = "\
You translate one business instruction into a single JSON object. \
Respond with JSON only, no prose and no code fences.\n\
Schema: {\"intent\": \"sale\"|\"expense\"|\"customer\"|\"inventory\"|\"conversation\", \
\"amount\": number?, \"counterpartyName\": string?, \"description\": string?, \
\"category\": string?, \"quantity\": integer?, \
\"confidence\": number between 0 and 1, \"conversationalReply\": string?}\n\
Use \"conversation\" with a conversationalReply for greetings and questions. \
Only use a business intent when the instruction clearly asks to record something.";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InferenceError {
    #[error("inference endpoint returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("inference transport failure: {0}")]
    Transport(String),
}

impl InferenceError {
    /// 429 and 5xx are worth retrying; auth and other 4xx are not.
    /// Transport-level failures are treated as transient.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Transport(_) => true,
        }
    }
}

#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_text: &str)
        -> Result<String, InferenceError>;
}

/// OpenAI-compatible chat-completions client.
pub struct HttpInferenceClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
}

impl HttpInferenceClient {
    pub fn from_config(config: &InferenceConfig) -> Result<Self, InferenceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| InferenceError::Transport(error.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct CompletionEnvelope {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: String,
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_text: &str,
    ) -> Result<String, InferenceError> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": 0.0,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_text},
            ],
        });

        let mut request =
            self.http.post(format!("{}/v1/chat/completions", self.base_url)).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|error| InferenceError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(InferenceError::Status { status: status.as_u16(), message });
        }

        let envelope: CompletionEnvelope = response
            .json()
            .await
            .map_err(|error| InferenceError::Transport(format!("invalid envelope: {error}")))?;

        envelope
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| InferenceError::Transport("completion had no choices".to_string()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterpretationSource {
    /// The remote endpoint produced the command.
    Remote,
    /// Degraded mode: the deterministic rule matcher produced the command.
    FallbackRules,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Interpretation {
    pub command: Command,
    pub source: InterpretationSource,
}

impl Interpretation {
    pub fn is_degraded(&self) -> bool {
        self.source == InterpretationSource::FallbackRules
    }
}

/// Delay before the retry following `attempt` (1-based): doubles each time.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base * 2u32.saturating_pow(attempt.saturating_sub(1))
}

static FENCED_PAYLOAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```")
        .expect("fence pattern is a build-time constant")
});

/// Pull the first well-formed command payload out of the raw completion,
/// tolerating fenced code blocks and surrounding prose.
pub fn parse_command_payload(raw: &str) -> Option<Command> {
    let candidate = if let Some(captures) = FENCED_PAYLOAD.captures(raw) {
        captures.get(1).map(|payload| payload.as_str().to_string())?
    } else {
        let start = raw.find('{')?;
        let end = raw.rfind('}')?;
        if start >= end {
            return None;
        }
        raw[start..=end].to_string()
    };

    serde_json::from_str::<Command>(&candidate).ok().map(Command::clamp_confidence)
}

pub struct CommandInterpreter {
    client: Option<Arc<dyn InferenceClient>>,
    max_attempts: u32,
    backoff_base: Duration,
}

impl CommandInterpreter {
    pub fn new(client: Arc<dyn InferenceClient>, max_attempts: u32, backoff_base: Duration) -> Self {
        Self { client: Some(client), max_attempts: max_attempts.max(1), backoff_base }
    }

    /// An interpreter with no remote endpoint; every submission goes to the
    /// rule matcher.
    pub fn offline() -> Self {
        Self { client: None, max_attempts: 1, backoff_base: Duration::ZERO }
    }

    pub async fn interpret(&self, text: &str) -> Interpretation {
        let Some(client) = &self.client else {
            return self.fall_back(text);
        };

        let mut attempt: u32 = 1;
        loop {
            match client.complete(SCHEMA_PROMPT, text).await {
                Ok(raw) => match parse_command_payload(&raw) {
                    Some(command) => {
                        tracing::debug!(
                            event_name = "agent.interpret.remote_ok",
                            intent = %command.intent,
                            confidence = command.confidence,
                            attempt,
                            "remote interpreter produced a command"
                        );
                        return Interpretation {
                            command,
                            source: InterpretationSource::Remote,
                        };
                    }
                    None => {
                        // Log the raw payload for diagnosis; never crash on it.
                        tracing::warn!(
                            event_name = "agent.interpret.malformed_response",
                            raw = %preview(&raw),
                            "inference payload did not match the command schema"
                        );
                        return self.fall_back(text);
                    }
                },
                Err(error) if error.is_transient() && attempt < self.max_attempts => {
                    let delay = backoff_delay(self.backoff_base, attempt);
                    tracing::warn!(
                        event_name = "agent.interpret.transient_failure",
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "transient inference failure, backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    tracing::warn!(
                        event_name = "agent.interpret.giving_up",
                        attempt,
                        transient = error.is_transient(),
                        error = %error,
                        "inference unavailable, falling back to rule matching"
                    );
                    return self.fall_back(text);
                }
            }
        }
    }

    fn fall_back(&self, text: &str) -> Interpretation {
        Interpretation {
            command: fallback::match_text(text),
            source: InterpretationSource::FallbackRules,
        }
    }
}

fn preview(raw: &str) -> &str {
    let cut = raw
        .char_indices()
        .nth(200)
        .map(|(index, _)| index)
        .unwrap_or(raw.len());
    &raw[..cut]
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;

    use tally_core::Intent;

    use super::{
        backoff_delay, parse_command_payload, CommandInterpreter, InferenceClient, InferenceError,
        InterpretationSource,
    };

    struct ScriptedClient {
        responses: Mutex<VecDeque<Result<String, InferenceError>>>,
        calls: AtomicU32,
    }

    impl ScriptedClient {
        fn new(responses: Vec<Result<String, InferenceError>>) -> Arc<Self> {
            Arc::new(Self { responses: Mutex::new(responses.into()), calls: AtomicU32::new(0) })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl InferenceClient for ScriptedClient {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String, InferenceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .expect("script lock")
                .pop_front()
                .unwrap_or(Err(InferenceError::Transport("script exhausted".to_string())))
        }
    }

    fn sale_payload() -> String {
        r#"{"intent":"sale","amount":5000,"counterpartyName":"John","confidence":0.92}"#.to_string()
    }

    fn overloaded() -> Result<String, InferenceError> {
        Err(InferenceError::Status { status: 503, message: "overloaded".to_string() })
    }

    #[test]
    fn backoff_doubles_from_the_base_delay() {
        let base = Duration::from_secs(1);
        assert_eq!(backoff_delay(base, 1), Duration::from_secs(1));
        assert_eq!(backoff_delay(base, 2), Duration::from_secs(2));
        assert_eq!(backoff_delay(base, 3), Duration::from_secs(4));
    }

    #[test]
    fn transient_and_permanent_statuses_classify_correctly() {
        let overloaded = InferenceError::Status { status: 503, message: String::new() };
        let throttled = InferenceError::Status { status: 429, message: String::new() };
        let unauthorized = InferenceError::Status { status: 401, message: String::new() };
        let forbidden = InferenceError::Status { status: 403, message: String::new() };
        let transport = InferenceError::Transport("connection reset".to_string());

        assert!(overloaded.is_transient());
        assert!(throttled.is_transient());
        assert!(transport.is_transient());
        assert!(!unauthorized.is_transient());
        assert!(!forbidden.is_transient());
    }

    #[test]
    fn payload_parses_from_bare_json() {
        let command = parse_command_payload(&sale_payload()).expect("parse");
        assert_eq!(command.intent, Intent::Sale);
        assert_eq!(command.counterparty_name.as_deref(), Some("John"));
    }

    #[test]
    fn payload_parses_from_a_fenced_code_block() {
        let raw = format!("Here you go:\n```json\n{}\n```\nAnything else?", sale_payload());
        let command = parse_command_payload(&raw).expect("parse fenced");
        assert_eq!(command.intent, Intent::Sale);
    }

    #[test]
    fn payload_parses_from_prose_wrapped_braces() {
        let raw = format!("The command is {} as requested.", sale_payload());
        let command = parse_command_payload(&raw).expect("parse embedded");
        assert_eq!(command.intent, Intent::Sale);
    }

    #[test]
    fn out_of_band_confidence_is_clamped() {
        let command = parse_command_payload(r#"{"intent":"sale","confidence":3.5}"#).expect("parse");
        assert_eq!(command.confidence, 1.0);
    }

    #[test]
    fn garbage_payload_is_rejected() {
        assert!(parse_command_payload("I cannot help with that").is_none());
        assert!(parse_command_payload("{not json}").is_none());
    }

    #[tokio::test]
    async fn remote_success_is_not_degraded() {
        let client = ScriptedClient::new(vec![Ok(sale_payload())]);
        let interpreter =
            CommandInterpreter::new(client.clone(), 3, Duration::from_secs(1));

        let interpretation = interpreter.interpret("Record sales of 5000 for John").await;
        assert_eq!(interpretation.source, InterpretationSource::Remote);
        assert_eq!(interpretation.command.intent, Intent::Sale);
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn overload_is_retried_with_doubling_delays_then_falls_back() {
        let client = ScriptedClient::new(vec![overloaded(), overloaded(), overloaded()]);
        let interpreter =
            CommandInterpreter::new(client.clone(), 3, Duration::from_secs(1));

        let started = tokio::time::Instant::now();
        let interpretation = interpreter.interpret("Record sales of 5000 for John").await;

        assert_eq!(client.calls(), 3, "three attempts total");
        // 1s after the first failure, 2s after the second; no wait after the last.
        assert_eq!(started.elapsed(), Duration::from_secs(3));
        assert!(interpretation.is_degraded());
        assert_eq!(interpretation.command.intent, Intent::Sale, "fallback still parses the text");
    }

    #[tokio::test(start_paused = true)]
    async fn retry_then_success_keeps_the_remote_result() {
        let client = ScriptedClient::new(vec![overloaded(), Ok(sale_payload())]);
        let interpreter =
            CommandInterpreter::new(client.clone(), 3, Duration::from_secs(1));

        let interpretation = interpreter.interpret("Record sales of 5000 for John").await;
        assert_eq!(client.calls(), 2);
        assert_eq!(interpretation.source, InterpretationSource::Remote);
    }

    #[tokio::test]
    async fn auth_failure_falls_back_without_retry() {
        let client = ScriptedClient::new(vec![Err(InferenceError::Status {
            status: 401,
            message: "bad key".to_string(),
        })]);
        let interpreter =
            CommandInterpreter::new(client.clone(), 3, Duration::from_secs(1));

        let interpretation = interpreter.interpret("hello").await;
        assert_eq!(client.calls(), 1, "permanent failures are never retried");
        assert!(interpretation.is_degraded());
        assert_eq!(interpretation.command.intent, Intent::Conversation);
    }

    #[tokio::test]
    async fn malformed_payload_falls_back_with_a_single_call() {
        let client = ScriptedClient::new(vec![Ok("I'd rather chat about something else".into())]);
        let interpreter =
            CommandInterpreter::new(client.clone(), 3, Duration::from_secs(1));

        let interpretation = interpreter.interpret("Add expense of 200 for supplies").await;
        assert_eq!(client.calls(), 1);
        assert!(interpretation.is_degraded());
        assert_eq!(interpretation.command.intent, Intent::Expense);
    }

    #[tokio::test]
    async fn offline_interpreter_always_uses_the_rules() {
        let interpreter = CommandInterpreter::offline();
        let interpretation = interpreter.interpret("Add expense of 200 for supplies").await;
        assert!(interpretation.is_degraded());
        assert_eq!(interpretation.command.intent, Intent::Expense);
    }
}
