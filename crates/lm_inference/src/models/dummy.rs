use std::fmt;

use async_trait::async_trait;
use lm_core::{InferenceModel, Invocation, Result};
use serde_json::json;

const CODE_MARKER: &str = "Code sample:\n\n";

/// Offline stand-in that answers with a small, well-formed article.
pub struct DummyModel;

impl fmt::Debug for DummyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyModel").finish()
    }
}

impl DummyModel {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DummyModel {
    fn default() -> Self {
        Self::new()
    }
}

/// First non-blank line of the code embedded in a prompt.
fn headline(prompt: &str) -> String {
    let code = prompt
        .split_once(CODE_MARKER)
        .map(|(_, rest)| rest)
        .unwrap_or(prompt);
    code.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.chars().take(60).collect())
        .unwrap_or_else(|| "an empty sample".to_string())
}

#[async_trait]
impl InferenceModel for DummyModel {
    fn name(&self) -> &str {
        "Dummy"
    }

    async fn complete(&self, invocation: &Invocation) -> Result<String> {
        let line = headline(&invocation.prompt);
        let words = invocation.prompt.split_whitespace().count();

        Ok(json!({
            "title": format!("Reading `{}` line by line", line),
            "author": "Offline Draft",
            "subtitle": "Generated without calling a hosted model",
            "excerpt": format!("A quick walkthrough of `{}`.", line),
            "sections": [
                {
                    "heading": "What it does",
                    "body": format!("The sample opens with `{}`.", line),
                },
                {
                    "heading": "Where to go next",
                    "body": "- Add tests around the edge cases\n- Name the intent in the signature",
                }
            ],
            "readingTimeMinutes": (words / 200).max(1),
        })
        .to_string())
    }
}
