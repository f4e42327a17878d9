//! Storage-side article shape shared by every backend.
//!
//! One table, `articles`, with the columns below. `sections` is a JSON
//! capable column and is read back defensively: depending on the backend it
//! arrives as an array, a JSON-encoded string, or an arbitrary object.

use lm_core::types::{format_timestamp, parse_timestamp};
use lm_core::{Article, ArticleSection, ArticlesPage, Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRow {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub author: String,
    pub subtitle: Option<String>,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub sections: Value,
    pub created_at: String,
    pub reading_time_minutes: Option<i64>,
    pub image_url: Option<String>,
}

impl ArticleRow {
    pub fn from_article(article: &Article) -> Result<Self> {
        Ok(Self {
            id: article.id.clone(),
            title: article.title.clone(),
            author: article.author.clone(),
            subtitle: article.subtitle.clone(),
            excerpt: article.excerpt.clone(),
            sections: serde_json::to_value(&article.sections)?,
            created_at: format_timestamp(&article.created_at),
            reading_time_minutes: article.reading_time_minutes.map(i64::from),
            image_url: article.image_url.clone(),
        })
    }

    /// Map back to the in-memory shape. Comments always start empty.
    pub fn into_article(self) -> Result<Article> {
        let created_at = parse_timestamp(&self.created_at).ok_or_else(|| {
            Error::Storage(format!(
                "Article {} has an unreadable created_at '{}'",
                self.id, self.created_at
            ))
        })?;

        Ok(Article {
            id: self.id,
            title: self.title,
            author: self.author,
            subtitle: self.subtitle,
            excerpt: self.excerpt,
            sections: sanitize_sections(self.sections),
            created_at,
            reading_time_minutes: self
                .reading_time_minutes
                .and_then(|minutes| u32::try_from(minutes).ok()),
            image_url: self.image_url,
            comments: Vec::new(),
        })
    }
}

/// Coerce whatever the `sections` column held into sections.
///
/// Unparseable content yields no sections rather than an error.
pub fn sanitize_sections(data: Value) -> Vec<ArticleSection> {
    match data {
        Value::Array(entries) => entries.iter().filter_map(section_from_value).collect(),
        Value::String(text) => match serde_json::from_str::<Value>(&text) {
            Ok(Value::Array(entries)) => entries.iter().filter_map(section_from_value).collect(),
            _ => Vec::new(),
        },
        Value::Object(map) => {
            if map.contains_key("body") || map.contains_key("heading") {
                return section_from_value(&Value::Object(map)).into_iter().collect();
            }
            // index-keyed objects, e.g. {"0": {...}, "1": {...}}
            let mut indexed: Vec<(usize, &Value)> = map
                .iter()
                .filter_map(|(key, value)| key.parse::<usize>().ok().map(|index| (index, value)))
                .collect();
            indexed.sort_by_key(|(index, _)| *index);
            indexed
                .into_iter()
                .filter_map(|(_, value)| section_from_value(value))
                .collect()
        }
        _ => Vec::new(),
    }
}

fn section_from_value(value: &Value) -> Option<ArticleSection> {
    let fields = value.as_object()?;
    let text = |key: &str| {
        fields
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    Some(ArticleSection {
        heading: text("heading"),
        body: text("body"),
    })
}

/// Turn `limit + 1` fetched rows into a page.
///
/// The extra row only signals that more exist; the cursor is the creation
/// time of the last row kept.
pub fn split_page(mut rows: Vec<ArticleRow>, limit: usize) -> Result<ArticlesPage> {
    let has_more = rows.len() > limit;
    rows.truncate(limit);

    let next_cursor = if has_more {
        rows.last().map(|row| row.created_at.clone())
    } else {
        None
    };

    let articles = rows
        .into_iter()
        .map(ArticleRow::into_article)
        .collect::<Result<Vec<_>>>()?;

    Ok(ArticlesPage {
        articles,
        has_more,
        next_cursor,
    })
}
