use lm_core::{ArticleSection, Error, GeneratedArticle, Result};
use serde_json::{Map, Value};

pub const FALLBACK_TITLE: &str = "Untitled Article";
pub const FALLBACK_AUTHOR: &str = "Gemini Assistant";
pub const FALLBACK_HEADING: &str = "Takeaways";
pub const FALLBACK_EXCERPT: &str = "A developer deep dive generated from your code sample.";
pub const OVERVIEW_HEADING: &str = "Overview";
pub const OVERVIEW_BODY: &str =
    "The Gemini API returned an empty body. Please try again with a different code sample.";
pub const EXCERPT_CHARS: usize = 160;

/// Coerce the model's raw text into an article draft.
///
/// Only a JSON syntax error is fatal. Every field that is missing or of the
/// wrong type falls back to a fixed value, and the result always has at
/// least one section.
pub fn normalize_response(raw: &str) -> Result<GeneratedArticle> {
    let parsed: Value = serde_json::from_str(raw).map_err(|source| Error::MalformedResponse {
        raw: raw.to_string(),
        source,
    })?;

    let empty = Map::new();
    let fields = parsed.as_object().unwrap_or(&empty);

    let sections = fields
        .get("sections")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().filter_map(normalize_section).collect::<Vec<_>>())
        .unwrap_or_default();

    let excerpt = trimmed(fields.get("excerpt"))
        .or_else(|| {
            sections
                .first()
                .map(|section| section.body.chars().take(EXCERPT_CHARS).collect())
        })
        .unwrap_or_else(|| FALLBACK_EXCERPT.to_string());

    let sections = if sections.is_empty() {
        vec![ArticleSection {
            heading: OVERVIEW_HEADING.to_string(),
            body: OVERVIEW_BODY.to_string(),
        }]
    } else {
        sections
    };

    Ok(GeneratedArticle {
        title: trimmed(fields.get("title")).unwrap_or_else(|| FALLBACK_TITLE.to_string()),
        author: trimmed(fields.get("author")).unwrap_or_else(|| FALLBACK_AUTHOR.to_string()),
        subtitle: trimmed(fields.get("subtitle")).or_else(|| trimmed(fields.get("dek"))),
        excerpt,
        sections,
        reading_time_minutes: fields.get("readingTimeMinutes").and_then(reading_time),
    })
}

fn trimmed(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn normalize_section(entry: &Value) -> Option<ArticleSection> {
    let body = trimmed(entry.get("body"))?;
    Some(ArticleSection {
        heading: trimmed(entry.get("heading")).unwrap_or_else(|| FALLBACK_HEADING.to_string()),
        body,
    })
}

fn reading_time(value: &Value) -> Option<u32> {
    let minutes = value.as_f64().filter(|minutes| minutes.is_finite())?;
    Some(minutes.round().max(1.0) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drops_sections_without_body() {
        let article = normalize_response(
            r#"{"sections":[{"heading":"A","body":""},{"heading":"B","body":"x"}]}"#,
        )
        .unwrap();
        assert_eq!(
            article.sections,
            vec![ArticleSection {
                heading: "B".to_string(),
                body: "x".to_string()
            }]
        );
    }

    #[test]
    fn test_missing_sections_use_overview_fallback() {
        let article = normalize_response(r#"{"title":"Hello"}"#).unwrap();
        assert_eq!(article.sections.len(), 1);
        assert_eq!(article.sections[0].heading, OVERVIEW_HEADING);
        assert_eq!(article.sections[0].body, OVERVIEW_BODY);
        // excerpt comes from retained sections only
        assert_eq!(article.excerpt, FALLBACK_EXCERPT);
    }

    #[test]
    fn test_missing_title_and_author_fall_back() {
        let article = normalize_response(r#"{"title":"   ","sections":[]}"#).unwrap();
        assert_eq!(article.title, FALLBACK_TITLE);
        assert_eq!(article.author, FALLBACK_AUTHOR);
        assert_eq!(article.subtitle, None);
    }

    #[test]
    fn test_fields_are_trimmed_and_dek_is_honoured() {
        let article = normalize_response(
            r#"{
                "title": "  Adding numbers, carefully ",
                "author": " Grace Hopper ",
                "dek": "  Small functions, big lessons ",
                "excerpt": " Short. ",
                "sections": [{"heading": "  ", "body": "  Body text  "}]
            }"#,
        )
        .unwrap();
        assert_eq!(article.title, "Adding numbers, carefully");
        assert_eq!(article.author, "Grace Hopper");
        assert_eq!(article.subtitle.as_deref(), Some("Small functions, big lessons"));
        assert_eq!(article.excerpt, "Short.");
        assert_eq!(article.sections[0].heading, FALLBACK_HEADING);
        assert_eq!(article.sections[0].body, "Body text");
    }

    #[test]
    fn test_subtitle_wins_over_dek() {
        let article = normalize_response(r#"{"subtitle":"S","dek":"D"}"#).unwrap();
        assert_eq!(article.subtitle.as_deref(), Some("S"));
    }

    #[test]
    fn test_excerpt_defaults_to_first_section_prefix() {
        let body = "é".repeat(200);
        let raw = serde_json::json!({ "sections": [{ "heading": "H", "body": body }] }).to_string();
        let article = normalize_response(&raw).unwrap();
        assert_eq!(article.excerpt.chars().count(), EXCERPT_CHARS);
        assert!(body.starts_with(&article.excerpt));
    }

    #[test]
    fn test_reading_time_rounding() {
        let cases = [
            (r#"{"readingTimeMinutes": 4.6}"#, Some(5)),
            (r#"{"readingTimeMinutes": 0.2}"#, Some(1)),
            (r#"{"readingTimeMinutes": -3}"#, Some(1)),
            (r#"{"readingTimeMinutes": "7"}"#, None),
            (r#"{"readingTimeMinutes": null}"#, None),
            (r#"{}"#, None),
        ];
        for (raw, expected) in cases {
            assert_eq!(normalize_response(raw).unwrap().reading_time_minutes, expected, "{raw}");
        }
    }

    #[test]
    fn test_non_object_json_gets_all_fallbacks() {
        let article = normalize_response("[1, 2, 3]").unwrap();
        assert_eq!(article.title, FALLBACK_TITLE);
        assert_eq!(article.sections[0].heading, OVERVIEW_HEADING);
    }

    #[test]
    fn test_invalid_json_keeps_raw_text() {
        let raw = "Sure! Here is your article: {title: oops";
        let error = normalize_response(raw).unwrap_err();
        assert!(error.to_string().contains(raw));
        assert!(std::error::Error::source(&error).is_some());
        assert_eq!(error.status(), 500);
        assert!(!error.is_transient());
    }
}
