// Prompt constants for the structuring adapter. Kept next to the client so
// every model-facing string lives in one place.

/// System prompt that enforces JSON-only output for structuring calls.
pub const STRUCTURE_SYSTEM: &str = "You are a precise resume analyst. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    If a field cannot be determined, use an empty string, empty array, or null.";

/// User prompt for turning resume text into the candidate-profile shape.
/// `{schema}` is replaced with the rendered field schema and `{resume_text}`
/// with the normalized document text.
pub const STRUCTURE_PROMPT_TEMPLATE: &str = r#"Extract a structured candidate profile from the resume below.

Return ONLY a JSON object of this exact shape:
{
  "confidence": <float 0.0-1.0, your own confidence in the extraction>,
  "profile": {
{schema}
  }
}

Rules:
- Dates use MM/YYYY, or "Present" for ongoing positions.
- "skills" must list every technology, framework, tool, and methodology
  mentioned anywhere in the resume, including inside job descriptions.
- Report "confidence" honestly: lower it when the text is garbled, sparse,
  or ambiguous.

Resume text:
{resume_text}"#;
