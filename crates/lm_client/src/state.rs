//! Client feed state and the actions that change it.
//!
//! Every change goes through [`FeedState::reduce`], so the whole session can
//! be replayed and tested without any I/O.

use lm_core::{Article, ArticleComment, ArticlesPage};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::queue::{GenerationQueueItem, QueueStats, QueueStatus};

/// Contents of the composer form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposerState {
    pub code: String,
    pub guidance: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SearchChanged(String),
    BannerSet(String),
    BannerDismissed,

    ComposerOpened(ComposerState),
    ComposerChanged(ComposerState),
    ComposerClosed,
    ComposerSubmitted,
    ComposerSucceeded(Article),
    ComposerFailed(String),

    QueueAdded { id: String, title: String },
    QueuePromoted { id: String },
    QueueCompleted { id: String },
    QueueFailed { id: String, error: String },
    QueueRemoved { id: String },
    ArticleGenerated(Article),

    LoadMoreStarted,
    LoadMoreSucceeded(ArticlesPage),
    LoadMoreFailed(String),

    CommentAdded { article_id: String, comment: ArticleComment },
    AssistantReplied { article_id: String, comment: ArticleComment },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedState {
    pub articles: Vec<Article>,
    pub queue: Vec<GenerationQueueItem>,
    pub search_query: String,
    pub banner_error: Option<String>,

    pub composer: ComposerState,
    pub composer_open: bool,
    pub composer_pending: bool,
    pub composer_error: Option<String>,

    pub has_more: bool,
    pub next_cursor: Option<String>,
    pub is_loading_more: bool,
    pub load_more_error: Option<String>,

    /// Article waiting for an assistant reply.
    pub reply_pending: Option<String>,
}

impl FeedState {
    /// Start from the first page the server rendered.
    pub fn new(initial: ArticlesPage) -> Self {
        Self {
            articles: initial.articles,
            has_more: initial.has_more,
            next_cursor: initial.next_cursor,
            ..Self::default()
        }
    }

    pub fn reduce(&mut self, action: Action) {
        match action {
            Action::SearchChanged(query) => self.search_query = query,
            Action::BannerSet(message) => self.banner_error = Some(message),
            Action::BannerDismissed => self.banner_error = None,

            Action::ComposerOpened(composer) => {
                self.composer = composer;
                self.composer_open = true;
            }
            Action::ComposerChanged(composer) => self.composer = composer,
            Action::ComposerClosed => {
                // the modal cannot be dismissed while its request is in flight
                if !self.composer_pending {
                    self.composer_open = false;
                }
            }
            Action::ComposerSubmitted => {
                if self.composer_pending {
                    return;
                }
                self.composer_error = None;
                self.banner_error = None;
                self.composer_pending = true;
            }
            Action::ComposerSucceeded(article) => {
                self.articles.insert(0, article);
                self.composer_pending = false;
                self.composer_open = false;
                self.composer = ComposerState::default();
            }
            Action::ComposerFailed(message) => {
                self.composer_pending = false;
                self.composer_error = Some(message);
            }

            Action::QueueAdded { id, title } => {
                self.queue.push(GenerationQueueItem::pending(id, title));
            }
            Action::QueuePromoted { id } => {
                if let Some(item) = self.queue_item_mut(&id) {
                    if item.status == QueueStatus::Pending {
                        item.status = QueueStatus::Generating;
                    }
                }
            }
            Action::QueueCompleted { id } => {
                if let Some(item) = self.queue_item_mut(&id) {
                    item.status = QueueStatus::Complete;
                }
            }
            Action::QueueFailed { id, error } => {
                if let Some(item) = self.queue_item_mut(&id) {
                    item.status = QueueStatus::Error;
                    item.error = Some(error);
                }
            }
            Action::QueueRemoved { id } => self.queue.retain(|item| item.id != id),
            Action::ArticleGenerated(article) => self.articles.insert(0, article),

            Action::LoadMoreStarted => {
                self.load_more_error = None;
                self.is_loading_more = true;
            }
            Action::LoadMoreSucceeded(page) => {
                self.articles.extend(page.articles);
                self.has_more = page.has_more;
                self.next_cursor = page.next_cursor;
                self.is_loading_more = false;
            }
            Action::LoadMoreFailed(message) => {
                self.load_more_error = Some(message);
                self.is_loading_more = false;
            }

            Action::CommentAdded {
                article_id,
                comment,
            } => {
                if let Some(article) = self.article_mut(&article_id) {
                    article.comments.push(comment);
                    self.reply_pending = Some(article_id);
                }
            }
            Action::AssistantReplied {
                article_id,
                comment,
            } => {
                if let Some(article) = self.article_mut(&article_id) {
                    article.comments.push(comment);
                }
                if self.reply_pending.as_deref() == Some(article_id.as_str()) {
                    self.reply_pending = None;
                }
            }
        }
    }

    pub fn can_load_more(&self) -> bool {
        self.has_more && !self.is_loading_more
    }

    pub fn queue_stats(&self) -> QueueStats {
        QueueStats::from_items(&self.queue)
    }

    pub fn article(&self, id: &str) -> Option<&Article> {
        self.articles.iter().find(|article| article.id == id)
    }

    pub fn queue_item(&self, id: &str) -> Option<&GenerationQueueItem> {
        self.queue.iter().find(|item| item.id == id)
    }

    fn article_mut(&mut self, id: &str) -> Option<&mut Article> {
        self.articles.iter_mut().find(|article| article.id == id)
    }

    fn queue_item_mut(&mut self, id: &str) -> Option<&mut GenerationQueueItem> {
        self.queue.iter_mut().find(|item| item.id == id)
    }
}

/// Shared handle to one session's [`FeedState`].
#[derive(Debug, Clone, Default)]
pub struct Store {
    state: Arc<Mutex<FeedState>>,
}

impl Store {
    pub fn new(state: FeedState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn dispatch(&self, action: Action) {
        self.lock().reduce(action);
    }

    /// Read and reduce under one lock, for check-then-act sequences.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut FeedState) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn read<R>(&self, f: impl FnOnce(&FeedState) -> R) -> R {
        f(&self.lock())
    }

    pub fn snapshot(&self) -> FeedState {
        self.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lm_core::types::now;
    use lm_core::{ArticleSection, CommentRole};

    fn article(id: &str) -> Article {
        Article {
            id: id.to_string(),
            title: format!("Article {}", id),
            author: "Author".to_string(),
            subtitle: None,
            excerpt: "Excerpt".to_string(),
            sections: vec![ArticleSection {
                heading: "H".to_string(),
                body: "B".to_string(),
            }],
            created_at: now(),
            reading_time_minutes: None,
            image_url: None,
            comments: vec![],
        }
    }

    fn comment(body: &str, role: CommentRole) -> ArticleComment {
        ArticleComment {
            id: body.to_string(),
            author: "Someone".to_string(),
            body: body.to_string(),
            created_at: now(),
            role,
        }
    }

    fn seeded() -> FeedState {
        FeedState::new(ArticlesPage {
            articles: vec![article("1"), article("2")],
            has_more: true,
            next_cursor: Some("cursor-1".to_string()),
        })
    }

    #[test]
    fn test_queue_lifecycle() {
        let mut state = FeedState::default();
        state.reduce(Action::QueueAdded {
            id: "q".to_string(),
            title: "Topic".to_string(),
        });
        assert_eq!(state.queue_item("q").unwrap().status, QueueStatus::Pending);

        state.reduce(Action::QueuePromoted { id: "q".to_string() });
        assert_eq!(state.queue_item("q").unwrap().status, QueueStatus::Generating);

        state.reduce(Action::QueueFailed {
            id: "q".to_string(),
            error: "boom".to_string(),
        });
        let item = state.queue_item("q").unwrap();
        assert_eq!(item.status, QueueStatus::Error);
        assert_eq!(item.error.as_deref(), Some("boom"));
        assert_eq!(state.queue_stats().error, 1);

        state.reduce(Action::QueueRemoved { id: "q".to_string() });
        assert!(state.queue.is_empty());
    }

    #[test]
    fn test_late_promotion_does_not_reopen_finished_item() {
        let mut state = FeedState::default();
        state.reduce(Action::QueueAdded {
            id: "q".to_string(),
            title: "Topic".to_string(),
        });
        state.reduce(Action::QueueCompleted { id: "q".to_string() });
        state.reduce(Action::QueuePromoted { id: "q".to_string() });
        assert_eq!(state.queue_item("q").unwrap().status, QueueStatus::Complete);
    }

    #[test]
    fn test_generated_articles_are_prepended() {
        let mut state = seeded();
        state.reduce(Action::ArticleGenerated(article("new")));
        let ids: Vec<&str> = state.articles.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "1", "2"]);
    }

    #[test]
    fn test_load_more_appends_and_tracks_cursor() {
        let mut state = seeded();
        assert!(state.can_load_more());

        state.reduce(Action::LoadMoreStarted);
        assert!(!state.can_load_more());

        state.reduce(Action::LoadMoreSucceeded(ArticlesPage {
            articles: vec![article("3")],
            has_more: false,
            next_cursor: None,
        }));
        assert_eq!(state.articles.len(), 3);
        assert_eq!(state.articles[2].id, "3");
        assert!(!state.has_more);
        assert!(!state.can_load_more());
    }

    #[test]
    fn test_load_more_failure_is_recorded_and_cleared_on_retry() {
        let mut state = seeded();
        state.reduce(Action::LoadMoreStarted);
        state.reduce(Action::LoadMoreFailed("offline".to_string()));
        assert_eq!(state.load_more_error.as_deref(), Some("offline"));
        assert!(state.can_load_more());

        state.reduce(Action::LoadMoreStarted);
        assert_eq!(state.load_more_error, None);
    }

    #[test]
    fn test_composer_cannot_close_while_pending() {
        let mut state = FeedState::default();
        state.reduce(Action::ComposerOpened(ComposerState {
            code: "fn main() {}".to_string(),
            guidance: String::new(),
        }));
        state.reduce(Action::ComposerSubmitted);
        state.reduce(Action::ComposerClosed);
        assert!(state.composer_open);

        state.reduce(Action::ComposerFailed("bad".to_string()));
        assert_eq!(state.composer_error.as_deref(), Some("bad"));
        assert_eq!(state.composer.code, "fn main() {}");

        state.reduce(Action::ComposerClosed);
        assert!(!state.composer_open);
    }

    #[test]
    fn test_second_composer_submit_keeps_pending_state() {
        let mut state = FeedState::default();
        state.reduce(Action::ComposerSubmitted);
        state.reduce(Action::ComposerFailed("bad".to_string()));
        state.reduce(Action::ComposerSubmitted);
        assert_eq!(state.composer_error, None);

        state.reduce(Action::BannerSet("busy".to_string()));
        state.reduce(Action::ComposerSubmitted);
        assert!(state.composer_pending);
        assert_eq!(state.banner_error.as_deref(), Some("busy"));
    }

    #[test]
    fn test_composer_success_resets_form() {
        let mut state = FeedState::default();
        state.reduce(Action::ComposerOpened(ComposerState {
            code: "x".to_string(),
            guidance: "y".to_string(),
        }));
        state.reduce(Action::ComposerSubmitted);
        state.reduce(Action::ComposerSucceeded(article("c")));
        assert!(!state.composer_open);
        assert!(!state.composer_pending);
        assert_eq!(state.composer, ComposerState::default());
        assert_eq!(state.articles[0].id, "c");
    }

    #[test]
    fn test_comments_and_reply_marker() {
        let mut state = seeded();
        state.reduce(Action::CommentAdded {
            article_id: "1".to_string(),
            comment: comment("hi", CommentRole::User),
        });
        assert_eq!(state.reply_pending.as_deref(), Some("1"));

        state.reduce(Action::AssistantReplied {
            article_id: "1".to_string(),
            comment: comment("thanks", CommentRole::Assistant),
        });
        assert_eq!(state.reply_pending, None);
        let roles: Vec<CommentRole> = state.article("1").unwrap().comments.iter().map(|c| c.role).collect();
        assert_eq!(roles, vec![CommentRole::User, CommentRole::Assistant]);
    }

    #[test]
    fn test_comment_on_unknown_article_is_ignored() {
        let mut state = seeded();
        state.reduce(Action::CommentAdded {
            article_id: "missing".to_string(),
            comment: comment("hi", CommentRole::User),
        });
        assert_eq!(state.reply_pending, None);
        assert!(state.articles.iter().all(|a| a.comments.is_empty()));
    }
}
