use serde::{Deserialize, Serialize};

use crate::state::ComposerState;

pub const FALLBACK_TOPIC: &str = "Gemini developer workflows";
const FALLBACK_SLUG: &str = "topic";
const SLUG_CHARS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionAction {
    /// Generate straight away through the queue.
    Generate,
    /// Open the composer prefilled.
    Compose,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSuggestion {
    pub id: String,
    pub title: String,
    pub description: String,
    pub action: SuggestionAction,
    pub payload: ComposerState,
}

pub fn slugify(topic: &str) -> String {
    let mut slug = String::with_capacity(topic.len());
    for c in topic.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }

    let slug: String = slug.trim_matches('-').chars().take(SLUG_CHARS).collect();
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

fn search_code(topic: &str) -> String {
    format!(
        "// Idea captured via the search assistant\n\
         const TOPIC: &str = {:?};\n\
         \n\
         pub fn illustrate_idea() {{\n    \
             println!(\"Expanding on {{}}\", TOPIC);\n\
         }}\n",
        topic
    )
}

fn starter_code(topic: &str) -> String {
    format!(
        "fn explore_idea() {{\n    \
             // Replace with the implementation that inspired this article.\n    \
             println!(\"{{}}\", {:?});\n\
         }}\n",
        topic
    )
}

/// Three suggestions for a search query: one direct generation, two composer starts.
pub fn build_search_suggestions(query: &str) -> Vec<SearchSuggestion> {
    let trimmed = query.trim();
    let topic = if trimmed.is_empty() { FALLBACK_TOPIC } else { trimmed };
    let slug = slugify(topic);

    vec![
        SearchSuggestion {
            id: format!("generate-{}", slug),
            title: format!("Generate article for \"{}\"", topic),
            description: "Use Gemini to turn this idea into a shareable Medium draft.".to_string(),
            action: SuggestionAction::Generate,
            payload: ComposerState {
                code: search_code(topic),
                guidance: format!("Write a practical walkthrough focused on {}.", topic),
            },
        },
        SearchSuggestion {
            id: format!("compose-code-{}", slug),
            title: "Open Write modal with starter code".to_string(),
            description: "Jump into the composer with a scaffold you can refine.".to_string(),
            action: SuggestionAction::Compose,
            payload: ComposerState {
                code: starter_code(topic),
                guidance: format!(
                    "Highlight why {} matters and how readers can replicate it.",
                    topic
                ),
            },
        },
        SearchSuggestion {
            id: format!("compose-guidance-{}", slug),
            title: "Just capture the angle first".to_string(),
            description: "Prefill the guidance field so you can decide on examples later."
                .to_string(),
            action: SuggestionAction::Compose,
            payload: ComposerState {
                code: String::new(),
                guidance: format!(
                    "Summarize the audience and desired outcomes for {}.",
                    topic
                ),
            },
        },
    ]
}
