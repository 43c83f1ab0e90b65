//! Axum route handlers for the AI API.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::ai::{suggest, SuggestionSection, Suggestions};
use crate::errors::AppError;
use crate::llm_client::{ChatRequest, Usage};
use crate::models::curriculum::CurriculumData;
use crate::state::AppState;

/// Conversations longer than this are rejected before reaching the provider.
const MAX_CHAT_MESSAGES: usize = 50;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub content: String,
    pub model: String,
    pub usage: Option<Usage>,
    pub attempts: u32,
}

#[derive(Debug, Deserialize)]
pub struct SuggestRequest {
    pub section: SuggestionSection,
    #[serde(default)]
    pub curriculum: CurriculumData,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/ai/chat
///
/// Thin proxy to the chat-completion provider. Transient upstream failures
/// are retried; the final failure maps to 503/504 so the client can offer
/// a retry button.
pub async fn handle_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    validate_chat(&request)?;

    let outcome = state
        .llm
        .chat(&request, &state.retry, &state.shutdown)
        .await?;

    let content = outcome
        .data
        .text()
        .ok_or_else(|| AppError::Upstream("LLM returned empty content".to_string()))?
        .to_string();

    Ok(Json(ChatResponse {
        content,
        model: state.llm.model().to_string(),
        usage: outcome.data.usage,
        attempts: outcome.attempts,
    }))
}

/// POST /api/v1/ai/suggest
///
/// Section suggestions for the wizard. Never fails because the LLM is down:
/// the local fallback answers instead and `from_fallback` is set.
pub async fn handle_suggest(
    State(state): State<AppState>,
    Json(request): Json<SuggestRequest>,
) -> Result<Json<Suggestions>, AppError> {
    let suggestions = suggest(
        &state.llm,
        request.section,
        &request.curriculum,
        &state.retry,
        &state.shutdown,
    )
    .await?;

    Ok(Json(suggestions))
}

fn validate_chat(request: &ChatRequest) -> Result<(), AppError> {
    if request.messages.is_empty() {
        return Err(AppError::Validation("messages cannot be empty".to_string()));
    }
    if request.messages.len() > MAX_CHAT_MESSAGES {
        return Err(AppError::Validation(format!(
            "at most {MAX_CHAT_MESSAGES} messages are allowed"
        )));
    }
    if let Some(i) = request.messages.iter().position(|m| m.content.trim().is_empty()) {
        return Err(AppError::Validation(format!("message {i} has empty content")));
    }
    if let Some(t) = request.temperature {
        if !(0.0..=2.0).contains(&t) {
            return Err(AppError::Validation(
                "temperature must be between 0 and 2".to_string(),
            ));
        }
    }
    if request.max_tokens == Some(0) {
        return Err(AppError::Validation("max_tokens must be positive".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::ChatMessage;

    fn request(messages: Vec<ChatMessage>) -> ChatRequest {
        ChatRequest {
            messages,
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_chat_accepts_normal_conversation() {
        let req = request(vec![
            ChatMessage::system("You help with CVs."),
            ChatMessage::user("Improve my summary"),
        ]);
        assert!(validate_chat(&req).is_ok());
    }

    #[test]
    fn test_validate_chat_rejects_bad_input() {
        assert!(validate_chat(&request(vec![])).is_err());
        assert!(validate_chat(&request(vec![ChatMessage::user("   ")])).is_err());
        assert!(validate_chat(&request(vec![ChatMessage::user("hi"); MAX_CHAT_MESSAGES + 1])).is_err());

        let mut hot = request(vec![ChatMessage::user("hi")]);
        hot.temperature = Some(3.5);
        assert!(validate_chat(&hot).is_err());

        let mut zero = request(vec![ChatMessage::user("hi")]);
        zero.max_tokens = Some(0);
        assert!(validate_chat(&zero).is_err());
    }
}
