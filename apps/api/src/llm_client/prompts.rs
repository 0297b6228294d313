// Shared prompt fragments. Each flow's own templates live in generation/prompts.rs.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Appended to every flow that rewrites the candidate's own material.
pub const HONESTY_INSTRUCTION: &str = "\
    CRITICAL: Use only facts present in the candidate's resume. \
    Do NOT invent employers, titles, dates, degrees, certifications or metrics. \
    Rephrase and reorder; never fabricate.";
