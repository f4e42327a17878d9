const ARTICLE_SCHEMA: &str = r#"{
  "title": string,              // engaging headline, 8-12 words
  "author": string,             // byline: a first and last name, 2-4 words
  "subtitle": string,           // optional supporting line, at most 120 characters
  "excerpt": string,            // 2-3 sentence summary
  "sections": [                 // ordered; each body under 350 words
    { "heading": string, "body": string }
  ],
  "readingTimeMinutes": number  // optional integer estimate
}"#;

/// Build the single instruction sent to the model for one code sample.
///
/// Guidance is trimmed and appended only when something is left.
pub fn build_prompt(code: &str, guidance: Option<&str>) -> String {
    let mut prompt = String::with_capacity(code.len() + ARTICLE_SCHEMA.len() + 768);

    prompt.push_str(
        "You are a senior software engineer writing for a Medium-style publication. \
         Write a narrative article for working developers that explains what the code below does, \
         why it matters and how a reader could adapt it. Prefer clear explanations and actionable advice.\n\n",
    );
    prompt.push_str("Answer with a single JSON object of this shape:\n\n");
    prompt.push_str(ARTICLE_SCHEMA);
    prompt.push_str(
        "\n\nWrite every section body as Markdown paragraphs, using lists where they help.\n\n",
    );
    prompt.push_str("Code sample:\n\n");
    prompt.push_str(code);
    prompt.push_str("\n\n");

    if let Some(guidance) = guidance.map(str::trim).filter(|g| !g.is_empty()) {
        prompt.push_str("Additional direction from the developer: ");
        prompt.push_str(guidance);
        prompt.push_str("\n\n");
    }

    prompt.push_str(
        "Respond with the JSON object only. No Markdown fences, no commentary before or after it.",
    );
    prompt
}
