// Shared prompt constants.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON value. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Common instruction appended to all résumé-writing prompts.
pub const HONESTY_INSTRUCTION: &str = "\
    CRITICAL: Only use facts present in the candidate's data. \
    Do NOT invent employers, dates, degrees, certifications or metrics. \
    If the data does not support a claim, omit it.";
