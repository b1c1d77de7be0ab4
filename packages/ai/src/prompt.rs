//! Prompt composition.

/// Instructions prepended to every generation request.
pub const SYSTEM_PROMPT: &str = r#"You are INGRES AI, a concise, expert assistant on India's groundwater.

- Be accurate, neutral, and cite assumptions when data is missing.
- Prefer structured, scannable answers with headings, bullets, and key metrics.
- If specific regional data is unavailable, say so clearly and suggest what to ask next.
- Keep responses under 300-500 words unless the user requests more detail.

CRITICAL OUTPUT REQUIREMENTS:
- Respond in the SAME LANGUAGE as the user's query.
- Always include a compact JSON block (fenced with ```json) that the front end can parse for charts and stats.

Example JSON schema (treat as text only, do NOT execute):
```json
{
  "language": "en|hi|<other>",
  "explanation": "short, professional text in user's language",
  "stats": [ { "label": "string", "value": 0, "unit": "string" } ],
  "chart": {
    "type": "bar|pie|line",
    "title": "string",
    "xKey": "name",
    "yKey": "value",
    "data": [ { "name": "Region A", "value": 42 } ]
  }
}
```"#;

/// Composes the single prompt sent to the provider.
#[must_use]
pub fn compose_prompt(query: &str, context: Option<&str>) -> String {
    let context = context.map(str::trim).filter(|c| !c.is_empty());
    format!(
        "{SYSTEM_PROMPT}\n\nUser query: {query}\n\nContext (if any): {}\n",
        context.unwrap_or("N/A")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_includes_query_and_context() {
        let prompt = compose_prompt("status of Kolar", Some("Kolar is Semi-Critical."));
        assert!(prompt.starts_with(SYSTEM_PROMPT));
        assert!(prompt.contains("User query: status of Kolar"));
        assert!(prompt.contains("Context (if any): Kolar is Semi-Critical."));
    }

    #[test]
    fn blank_context_reads_not_available() {
        let prompt = compose_prompt("hi", Some("  "));
        assert!(prompt.contains("Context (if any): N/A"));
    }
}
