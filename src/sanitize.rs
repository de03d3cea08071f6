//! Text sanitation for model output that should be structured.
//!
//! Models asked for bare JSON still wrap it in markdown fences or prefix
//! a language tag often enough that every consumer of structured output
//! runs through this step first. The contract is narrow: strip known
//! fence markers, strip a known leading language tag, return the
//! remainder unchanged. Structural validation is a separate step.

const LANGUAGE_TAGS: [&str; 5] = ["json", "javascript", "js", "ts", "typescript"];

/// Strip markdown code-fence markers and a leading language tag.
pub fn strip_code_fences(text: &str) -> String {
    let stripped = text.replace("```", "");
    let stripped = stripped.trim();

    // A fence like ```json leaves its tag behind on the first line.
    if let Some((first, rest)) = stripped.split_once('\n') {
        if LANGUAGE_TAGS.contains(&first.trim().to_ascii_lowercase().as_str()) {
            return rest.trim().to_string();
        }
    }

    stripped.to_string()
}
