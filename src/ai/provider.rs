//! Generation provider: the narrow contract the core needs from a language
//! model, plus the two shipped implementations.
//!
//! - [`HttpProvider`]: OpenAI-compatible `POST {endpoint}/chat/completions`
//!   over a blocking client with the configured timeout.
//! - [`OfflineProvider`]: used when no endpoint is configured. Explanations
//!   echo the prompt; test generation always fails, which sends the
//!   generate-validate loop to its deterministic stub.

use crate::core::config::NoxisConfig;
use crate::core::error::NoxisError;
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;

/// Bare filename -> file content, in the order the provider replied.
pub type GeneratedFiles = IndexMap<String, String>;

pub const TEST_FILE_PREFIX: &str = "test_";
pub const TEST_FILE_EXTENSION: &str = ".py";

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^\s*```[A-Za-z]*\s*\n(.*?)\n?\s*```\s*$").unwrap());

pub trait GenerationProvider {
    fn explain(&self, prompt: &str) -> Result<String, NoxisError>;

    /// Must fail on empty or malformed output, on unsafe filenames, and on
    /// suspiciously short content.
    fn generate_tests(&self, prompt: &str) -> Result<GeneratedFiles, NoxisError>;
}

/// Pick the provider the configuration asks for.
pub fn provider_from_config(config: &NoxisConfig) -> Box<dyn GenerationProvider> {
    match config.ai.endpoint.as_deref() {
        Some(endpoint) => match HttpProvider::new(config, endpoint) {
            Ok(provider) => Box::new(provider),
            Err(e) => {
                tracing::warn!(error = %e, "could not build HTTP provider; running offline");
                Box::new(OfflineProvider)
            }
        },
        None => Box::new(OfflineProvider),
    }
}

/// Deterministic explanation used offline and whenever the provider fails.
pub fn offline_explanation(prompt: &str) -> String {
    format!(
        "AI provider not configured yet.\n\nPrompt received:\n----------------\n{}",
        prompt
    )
}

pub struct OfflineProvider;

impl GenerationProvider for OfflineProvider {
    fn explain(&self, prompt: &str) -> Result<String, NoxisError> {
        Ok(offline_explanation(prompt))
    }

    fn generate_tests(&self, _prompt: &str) -> Result<GeneratedFiles, NoxisError> {
        Err(NoxisError::GenerationError(
            "no AI endpoint configured (set ai.endpoint or NOXIS_AI_ENDPOINT)".to_string(),
        ))
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

pub struct HttpProvider {
    client: reqwest::blocking::Client,
    url: String,
    model: String,
    api_key: Option<String>,
    min_test_chars: usize,
}

impl HttpProvider {
    pub fn new(config: &NoxisConfig, endpoint: &str) -> Result<Self, NoxisError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(config.ai.timeout_ms))
            .build()?;
        Ok(Self {
            client,
            url: format!("{}/chat/completions", endpoint.trim_end_matches('/')),
            model: config.ai.model.clone(),
            api_key: config.api_key(),
            min_test_chars: config.ai_tests.min_test_chars,
        })
    }

    fn complete(&self, system: &str, prompt: &str) -> Result<String, NoxisError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.0,
        };

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(NoxisError::GenerationError(format!(
                "provider returned HTTP {}: {}",
                status,
                text.trim()
            )));
        }

        let parsed: ChatCompletionResponse = response.json()?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| NoxisError::GenerationError("empty completion".to_string()))
    }
}

impl GenerationProvider for HttpProvider {
    fn explain(&self, prompt: &str) -> Result<String, NoxisError> {
        self.complete("You explain software project state to developers.", prompt)
    }

    fn generate_tests(&self, prompt: &str) -> Result<GeneratedFiles, NoxisError> {
        let raw = self.complete(
            "You write pytest test files. Reply with a JSON object only.",
            prompt,
        )?;
        let files = parse_generated(&raw)?;
        validate_generated(files, self.min_test_chars)
    }
}

/// Parse a model reply into a filename -> content mapping. A surrounding
/// Markdown code fence is tolerated.
pub fn parse_generated(raw: &str) -> Result<GeneratedFiles, NoxisError> {
    let body = CODE_FENCE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map_or(raw, |m| m.as_str());
    serde_json::from_str::<GeneratedFiles>(body.trim()).map_err(|e| {
        NoxisError::GenerationError(format!("reply is not a JSON filename->content object: {}", e))
    })
}

pub fn validate_generated(
    files: GeneratedFiles,
    min_test_chars: usize,
) -> Result<GeneratedFiles, NoxisError> {
    if files.is_empty() {
        return Err(NoxisError::GenerationError(
            "provider returned no files".to_string(),
        ));
    }
    for (name, content) in &files {
        if name.contains('/') || name.contains('\\') {
            return Err(NoxisError::GenerationError(format!(
                "filename must not contain a path separator: {}",
                name
            )));
        }
        if !name.starts_with(TEST_FILE_PREFIX) || !name.ends_with(TEST_FILE_EXTENSION) {
            return Err(NoxisError::GenerationError(format!(
                "filename must look like {}*{}: {}",
                TEST_FILE_PREFIX, TEST_FILE_EXTENSION, name
            )));
        }
        if content.trim().chars().count() < min_test_chars {
            return Err(NoxisError::GenerationError(format!(
                "content for {} is suspiciously short",
                name
            )));
        }
    }
    Ok(files)
}

/// The single-file stub written when generation fails. Always passes.
pub fn fallback_stub(test_filename: &str) -> GeneratedFiles {
    let content = "\
# Generated by noxis as a placeholder: the AI provider returned no usable tests.
# Replace this file with real tests for the target module.


def test_noxis_placeholder():
    assert True
";
    GeneratedFiles::from([(test_filename.to_string(), content.to_string())])
}
