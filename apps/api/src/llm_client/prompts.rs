// Cross-cutting prompt fragments. Operation-specific prompts live next to
// the code that sends them (see `provider::prompts`).

/// System prompt that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Appended to every extraction prompt.
pub const NO_INVENTION_INSTRUCTION: &str = "\
    Use only information that is stated in the provided text. \
    Do NOT infer, embellish, or invent names, dates, or achievements. \
    When a field is not supported by the text, return an empty string or an empty array for it.";
