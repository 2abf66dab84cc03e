//! LLM-backed collaborators
//!
//! [`OpenAiChat`] speaks the OpenAI-compatible chat-completions protocol over a
//! blocking client. Parsers and explainers are generic over [`LanguageModel`]
//! so they can be exercised without network access.

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::LlmConfig;
use crate::domain::Operation;
use crate::error::CollaboratorError;

use super::collaborators::{ExplanationRequest, Explainer, LanguageModel, OperationProposer};
use super::validation::validate_operations;

#[derive(Debug, Clone)]
pub struct OpenAiChat {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f64,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiChat {
    /// `Ok(None)` when no API key is configured: the collaborator is simply absent.
    pub fn from_config(cfg: &LlmConfig) -> Result<Option<Self>, CollaboratorError> {
        let Some(api_key) = cfg.resolved_api_key() else {
            return Ok(None);
        };
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_seconds))
            .build()?;
        Ok(Some(Self {
            client,
            endpoint: format!("{}/chat/completions", cfg.base_url.trim_end_matches('/')),
            api_key,
            model: cfg.model.clone(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
        }))
    }
}

impl LanguageModel for OpenAiChat {
    fn complete(&self, prompt: &str) -> Result<String, CollaboratorError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()?;

        if !response.status().is_success() {
            return Err(CollaboratorError::Transport(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let parsed: ChatResponse = response.json()?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(CollaboratorError::Empty);
        }
        Ok(content)
    }
}

/// Few-shot example steering the parser's output format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IclExample {
    pub question: String,
    pub ops: Vec<Operation>,
}

/// Read JSONL examples. A missing file yields none; unreadable lines are skipped.
pub fn load_icl_examples(path: &Path) -> Vec<IclExample> {
    let Ok(text) = std::fs::read_to_string(path) else {
        debug!(path = %path.display(), "no ICL examples file");
        return Vec::new();
    };
    parse_icl_examples(&text)
}

pub fn parse_icl_examples(text: &str) -> Vec<IclExample> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(n, line)| match serde_json::from_str(line) {
            Ok(example) => Some(example),
            Err(e) => {
                warn!(line = n + 1, error = %e, "skipping malformed ICL example");
                None
            }
        })
        .collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OpsPayload {
    List(Vec<Operation>),
    Wrapped { ops: Vec<Operation> },
}

/// Pull an operation list out of free-form model output.
///
/// Accepts a bare JSON array or an `{"ops": [...]}` object, optionally inside
/// a Markdown code fence or surrounded by prose.
pub fn extract_operations(text: &str) -> Result<Vec<Operation>, CollaboratorError> {
    let start = text
        .find(|c| c == '[' || c == '{')
        .ok_or_else(|| CollaboratorError::Malformed("no JSON found".to_string()))?;
    let closing = if text[start..].starts_with('[') { ']' } else { '}' };
    let end = text
        .rfind(closing)
        .filter(|&end| end > start)
        .ok_or_else(|| CollaboratorError::Malformed("unterminated JSON".to_string()))?;

    match serde_json::from_str::<OpsPayload>(&text[start..=end]) {
        Ok(OpsPayload::List(ops)) | Ok(OpsPayload::Wrapped { ops }) => Ok(ops),
        Err(e) => Err(CollaboratorError::Malformed(e.to_string())),
    }
}

pub struct LlmOperationParser<M> {
    model: M,
    examples: Vec<IclExample>,
    horizon: usize,
}

impl<M: LanguageModel> LlmOperationParser<M> {
    pub fn new(model: M, examples: Vec<IclExample>, horizon: usize) -> Self {
        Self {
            model,
            examples,
            horizon,
        }
    }

    pub fn examples(&self) -> &[IclExample] {
        &self.examples
    }

    pub fn prompt(&self, question: &str) -> String {
        let last_hour = self.horizon.saturating_sub(1);
        let mut prompt = format!(
            "You translate what-if questions about a {h}-step microgrid energy schedule \
             into JSON operations.\n\
             Allowed operations:\n\
             - {{\"op\":\"scale_series\",\"target\":\"PV\"|\"Load\"|\"Pimp\"|\"Pexp\",\"scale_pct\":<number>}}\n\
             - {{\"op\":\"shift_load\",\"percentage\":<number>,\"from_hour\":<0..{last_hour}>,\"to_hour\":<0..{last_hour}>}}\n\
             A decrease is a negative scale_pct. Answer with a JSON array only.\n\n",
            h = self.horizon,
        );
        for example in &self.examples {
            let ops = serde_json::to_string(&example.ops).unwrap_or_else(|_| "[]".to_string());
            prompt.push_str(&format!("Q: {}\nA: {}\n\n", example.question, ops));
        }
        prompt.push_str(&format!("Q: {question}\nA:"));
        prompt
    }
}

impl<M: LanguageModel> OperationProposer for LlmOperationParser<M> {
    fn propose(&self, question: &str) -> Result<Vec<Operation>, CollaboratorError> {
        let prompt = self.prompt(question);
        debug!(%prompt, "operation parser prompt");
        let response = self.model.complete(&prompt)?;
        debug!(%response, "operation parser response");

        let ops = extract_operations(&response)?;
        validate_operations(&ops, self.horizon)
            .map_err(|e| CollaboratorError::Malformed(e.to_string()))?;
        Ok(ops)
    }
}

pub struct LlmExplainer<M> {
    model: M,
}

impl<M: LanguageModel> LlmExplainer<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    pub fn prompt(&self, request: &ExplanationRequest<'_>) -> Result<String, CollaboratorError> {
        let context = serde_json::to_string_pretty(request)
            .map_err(|e| CollaboratorError::Malformed(e.to_string()))?;
        Ok(format!(
            "Explain the result of this microgrid what-if scenario to an energy manager \
             in at most four sentences. State the change that was applied, whether the \
             optimization succeeded, the total cost in {}, and how it compares with the \
             baseline cost when one is given.\n\n{context}",
            request.currency
        ))
    }
}

impl<M: LanguageModel> Explainer for LlmExplainer<M> {
    fn explain(&self, request: &ExplanationRequest<'_>) -> Result<String, CollaboratorError> {
        let prompt = self.prompt(request)?;
        debug!(%prompt, "explainer prompt");
        let text = self.model.complete(&prompt)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(CollaboratorError::Empty);
        }
        Ok(text.to_string())
    }
}
