//! AI assistance: LLM chat proxy and per-section CV suggestions.
//!
//! Suggestions try the LLM under the shared retry policy and fall back to a
//! local, deterministic source once the LLM path gives up. Chat has no
//! fallback: a proxy that invents answers is worse than an error.
//! All LLM calls go through llm_client.

pub mod fallback;
pub mod handlers;
pub mod prompts;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::llm_client::prompts::{HONESTY_INSTRUCTION, JSON_ONLY_SYSTEM};
use crate::llm_client::{strip_json_fences, ChatCompletion, ChatMessage, ChatRequest, LlmClient, LlmError};
use crate::models::curriculum::CurriculumData;
use crate::retry::{AbortSignal, Retry, RetryPolicy};

/// Upper bound on suggestions returned for one section.
pub const MAX_SUGGESTIONS: usize = 5;

const SUGGESTION_TEMPERATURE: f32 = 0.7;
const SUGGESTION_MAX_TOKENS: u32 = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionSection {
    Objective,
    Experience,
    Skills,
    Achievements,
}

#[derive(Debug, Clone, Serialize)]
pub struct Suggestions {
    pub section: SuggestionSection,
    pub suggestions: Vec<String>,
    pub attempts: u32,
    pub from_fallback: bool,
}

pub fn build_suggestion_request(section: SuggestionSection, data: &CurriculumData) -> ChatRequest {
    ChatRequest {
        messages: vec![
            ChatMessage::system(format!(
                "{} {} {}",
                prompts::SUGGESTION_SYSTEM_PREFIX,
                JSON_ONLY_SYSTEM,
                HONESTY_INSTRUCTION
            )),
            ChatMessage::user(prompts::build_suggestion_prompt(section, data)),
        ],
        temperature: Some(SUGGESTION_TEMPERATURE),
        max_tokens: Some(SUGGESTION_MAX_TOKENS),
    }
}

/// Parses a JSON array of strings out of the completion. Blank and
/// duplicate entries are dropped; at most `MAX_SUGGESTIONS` are kept.
pub fn parse_suggestions(completion: &ChatCompletion) -> Result<Vec<String>, LlmError> {
    let text = completion.text().ok_or(LlmError::EmptyContent)?;
    let raw: Vec<String> = serde_json::from_str(strip_json_fences(text))?;

    let mut suggestions: Vec<String> = Vec::with_capacity(MAX_SUGGESTIONS);
    for item in raw {
        let item = item.trim();
        if item.is_empty() || suggestions.iter().any(|s| s.eq_ignore_ascii_case(item)) {
            continue;
        }
        suggestions.push(item.to_string());
        if suggestions.len() == MAX_SUGGESTIONS {
            break;
        }
    }

    if suggestions.is_empty() {
        return Err(LlmError::EmptyContent);
    }
    Ok(suggestions)
}

/// Suggestions for one section. An empty list is never returned: the LLM
/// path and the local fallback both report it as `EmptyContent`.
pub async fn suggest(
    llm: &LlmClient,
    section: SuggestionSection,
    data: &CurriculumData,
    policy: &RetryPolicy,
    abort: &AbortSignal,
) -> Result<Suggestions, AppError> {
    if abort.is_cancelled() {
        return Err(AppError::Cancelled);
    }

    // Nothing for a prompt to work with; the local source answers directly.
    if data.is_blank() {
        info!(section = ?section, "Blank curriculum, serving local suggestions");
        return Ok(Suggestions {
            section,
            suggestions: fallback::suggestions_for(section, data),
            attempts: 0,
            from_fallback: true,
        });
    }

    let request = build_suggestion_request(section, data);
    let request = &request;

    let outcome = Retry::new(policy)
        .abort_on(abort)
        .retry_if(LlmError::is_retryable)
        .on_retry(|error, attempt, delay| {
            warn!(
                "Suggestion attempt {attempt} for {section:?} failed: {error}; retrying in {}ms",
                delay.as_millis()
            );
        })
        .run_with_fallback(
            move || async move {
                let completion = llm.complete_once(request).await?;
                parse_suggestions(&completion)
            },
            move || async move {
                let local = fallback::suggestions_for(section, data);
                if local.is_empty() {
                    return Err(LlmError::EmptyContent);
                }
                Ok(local)
            },
        )
        .await?;

    info!(
        section = ?section,
        attempts = outcome.attempts,
        from_fallback = outcome.from_fallback,
        "Suggestions ready"
    );

    Ok(Suggestions {
        section,
        suggestions: outcome.data,
        attempts: outcome.attempts,
        from_fallback: outcome.from_fallback,
    })
}
