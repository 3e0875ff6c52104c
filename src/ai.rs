use std::path::Path;
use std::time::Duration;

use async_openai::config::OpenAIConfig;
use async_openai::Client;
use tracing::{debug, info};

use crate::error::{Result, VideoError};
use crate::script::{Script, Style};

const STOP_SEQUENCES: [&str; 2] = ["<|eot_id|>", "<|eom_id|>"];

/// Sampling parameters sent with every completion.
#[derive(Debug, Clone)]
pub(crate) struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub repetition_penalty: f32,
    pub stop: Vec<String>,
}

impl CompletionRequest {
    pub(crate) fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            max_tokens: 1000,
            temperature: 0.7,
            top_p: 0.7,
            top_k: 50,
            repetition_penalty: 1.0,
            stop: STOP_SEQUENCES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

pub(crate) trait TextCompletionService {
    fn model(&self) -> &str;

    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// OpenAI-compatible chat completions against Together.
pub(crate) struct TogetherClient {
    client: Client<OpenAIConfig>,
    model: String,
    timeout: Duration,
}

impl TogetherClient {
    pub(crate) fn new(
        api_key: &str,
        api_base: &str,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base);
        // A zero elapsed-time budget stops the client's built-in backoff from
        // retrying rate-limited requests: one attempt per generation.
        let no_retry = backoff::ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(Duration::ZERO))
            .build();
        Self {
            client: Client::with_config(config).with_backoff(no_retry),
            model: model.into(),
            timeout,
        }
    }
}

impl TextCompletionService for TogetherClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        // top_k and repetition_penalty are not part of the OpenAI schema, so the
        // body is built by hand.
        let body = serde_json::json!({
            "model": request.model,
            "messages": [{ "role": "user", "content": request.prompt }],
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "top_p": request.top_p,
            "top_k": request.top_k,
            "repetition_penalty": request.repetition_penalty,
            "stop": request.stop,
            "stream": false,
        });

        let response: serde_json::Value =
            tokio::time::timeout(self.timeout, self.client.chat().create_byot(body))
                .await
                .map_err(|_| VideoError::Generation("completion request timed out".to_string()))?
                .map_err(|e| VideoError::Generation(e.to_string()))?;

        completion_content(&response)
    }
}

fn completion_content(response: &serde_json::Value) -> Result<String> {
    response["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| VideoError::Generation("No content in completion response".to_string()))
}

pub(crate) fn script_prompt(topic: &str, style: Style) -> String {
    format!(
        "Write a detailed YouTube script about '{topic}' in {style} style. The script should include:\n\
         - Introduction (hook, background)\n\
         - Main Content (key sections, storytelling, examples)\n\
         - Conclusion (summary, call to action)."
    )
}

/// Generates a script and writes it verbatim to `script_path`.
pub(crate) async fn generate_script<T: TextCompletionService>(
    service: &T,
    topic: &str,
    style: Style,
    script_path: &Path,
) -> Result<Script> {
    let topic = topic.trim();
    if topic.is_empty() {
        return Err(VideoError::Generation("topic is empty".to_string()));
    }

    info!("Generating {} script about '{}'", style, topic);
    let request = CompletionRequest::new(service.model(), script_prompt(topic, style));
    let text = service.complete(&request).await?;
    debug!("Completion returned {} characters", text.len());

    save_script(script_path, &text).await?;
    info!("Script saved to: {}", script_path.display());

    Ok(Script::new(text))
}

pub(crate) async fn save_script(script_path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = script_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(script_path, text).await?;
    Ok(())
}
