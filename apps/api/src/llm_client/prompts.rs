// Shared prompt fragments. Each service that calls the LLM keeps its own
// prompts.rs alongside it and builds on these.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Keeps generated text anchored to the data passed in the prompt.
pub const NO_INVENTION_INSTRUCTION: &str = "\
    Use only the skills, hours and phases given above. \
    Do NOT invent courses, certifications, employers or numbers that are not in the input.";
