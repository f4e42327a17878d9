use std::sync::{Arc, RwLock};
use std::time::Duration;

use lm_core::types::{new_id, now};
use lm_core::{
    Article, ArticleComment, ArticleRequest, ArticlesPage, CommentRole, Error, FailureKind,
    Result,
};
use tracing::{error, info, warn};

use crate::api::ArticlesApi;
use crate::scheduler::Scheduler;
use crate::settings::{GeminiSettings, SettingsStore, SettingsUpdate};
use crate::state::{Action, ComposerState, FeedState, Store};
use crate::suggestions::{build_search_suggestions, SearchSuggestion, SuggestionAction};

pub const PAGE_SIZE: usize = lm_core::storage::DEFAULT_PAGE_SIZE;
pub const GENERATE_TIMEOUT: Duration = Duration::from_secs(120);
pub const COMPLETE_DISPLAY: Duration = Duration::from_secs(2);
pub const ERROR_DISPLAY: Duration = Duration::from_secs(5);
pub const ASSISTANT_REPLY_DELAY: Duration = Duration::from_millis(900);

pub const EMPTY_SEARCH_MESSAGE: &str =
    "Cannot generate an article from an empty search. Please type a topic.";
pub const TIMEOUT_MESSAGE: &str = "The generation request timed out after 120 seconds.";
pub const USER_AUTHOR: &str = "Current User";
pub const ASSISTANT_AUTHOR: &str = "Gemini Assistant";

const SNIPPET_LIMIT: usize = 150;
const SNIPPET_CHARS: usize = 147;

/// The canned reply appended a moment after a reader comments.
pub fn build_assistant_reply(article: &Article, message: &str) -> ArticleComment {
    let snippet = if message.chars().count() > SNIPPET_LIMIT {
        format!("{}…", message.chars().take(SNIPPET_CHARS).collect::<String>())
    } else {
        message.to_string()
    };

    ArticleComment {
        id: new_id(),
        author: ASSISTANT_AUTHOR.to_string(),
        body: format!(
            "Appreciate your perspective on \"{}\". I'll fold that into future updates of \"{}\".",
            snippet, article.title
        ),
        created_at: now(),
        role: CommentRole::Assistant,
    }
}

/// One reader's view of the feed, with its pending timers.
///
/// Cheap to clone; clones share state, so a generation can be spawned while
/// the caller keeps using the session.
#[derive(Clone)]
pub struct Session {
    api: Arc<dyn ArticlesApi>,
    store: Store,
    scheduler: Arc<Scheduler>,
    settings: Arc<RwLock<GeminiSettings>>,
    settings_store: Option<SettingsStore>,
    generate_timeout: Duration,
}

impl Session {
    pub fn new(api: Arc<dyn ArticlesApi>, initial: ArticlesPage, settings: GeminiSettings) -> Self {
        let store = Store::new(FeedState::new(initial));
        Self {
            api,
            scheduler: Arc::new(Scheduler::new(store.clone())),
            store,
            settings: Arc::new(RwLock::new(settings)),
            settings_store: None,
            generate_timeout: GENERATE_TIMEOUT,
        }
    }

    /// Read settings from `store` and write every change back to it.
    pub fn with_settings_store(mut self, store: SettingsStore) -> Self {
        *self.settings.write().unwrap_or_else(|p| p.into_inner()) = store.load();
        self.settings_store = Some(store);
        self
    }

    pub fn with_generate_timeout(mut self, timeout: Duration) -> Self {
        self.generate_timeout = timeout;
        self
    }

    pub fn state(&self) -> FeedState {
        self.store.snapshot()
    }

    pub fn settings(&self) -> GeminiSettings {
        self.settings.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn update_settings(&self, update: SettingsUpdate) -> Result<GeminiSettings> {
        let merged = {
            let mut settings = self.settings.write().unwrap_or_else(|p| p.into_inner());
            *settings = settings.merge(update);
            settings.clone()
        };
        if let Some(store) = &self.settings_store {
            store.save(&merged)?;
        }
        Ok(merged)
    }

    fn request(&self, code: &str, guidance: &str) -> ArticleRequest {
        let settings = self.settings();
        ArticleRequest {
            code: code.to_string(),
            guidance: Some(guidance.to_string()).filter(|g| !g.is_empty()),
            api_key: settings.api_key_override(),
            model: settings.model_override(),
        }
    }

    /// Generate through the queue, with the client-side timeout.
    ///
    /// The queue item is promoted to generating on the next scheduler tick and
    /// removed a few seconds after it settles. A timeout only abandons the
    /// wait; the server may still finish and store the article.
    pub async fn direct_generate(&self, code: &str, guidance: &str, title: &str) -> Result<Article> {
        self.store.dispatch(Action::BannerDismissed);

        if code.trim().is_empty() && guidance.trim().is_empty() {
            warn!("⚠️ Empty code and guidance, nothing to generate");
            self.store
                .dispatch(Action::BannerSet(EMPTY_SEARCH_MESSAGE.to_string()));
            return Err(Error::InvalidInput(EMPTY_SEARCH_MESSAGE.to_string()));
        }

        let id = new_id();
        info!(queue_id = %id, "⏳ Queued generation \"{}\"", title);
        self.store.dispatch(Action::QueueAdded {
            id: id.clone(),
            title: title.to_string(),
        });
        self.scheduler
            .schedule(Duration::ZERO, Action::QueuePromoted { id: id.clone() });

        let request = self.request(code, guidance);
        let outcome = match tokio::time::timeout(self.generate_timeout, self.api.generate(&request)).await {
            Ok(result) => result,
            Err(_) => Err(Error::upstream(TIMEOUT_MESSAGE, FailureKind::Transient)),
        };

        match outcome {
            Ok(article) => {
                info!(queue_id = %id, "✅ Article generated: {}", article.title);
                self.store.dispatch(Action::ArticleGenerated(article.clone()));
                self.store.dispatch(Action::QueueCompleted { id: id.clone() });
                self.scheduler
                    .schedule(COMPLETE_DISPLAY, Action::QueueRemoved { id });
                Ok(article)
            }
            Err(e) => {
                let message = e.to_string();
                error!(queue_id = %id, "💥 Article failed: {}", message);
                self.store.dispatch(Action::QueueFailed {
                    id: id.clone(),
                    error: message.clone(),
                });
                self.scheduler.schedule(ERROR_DISPLAY, Action::QueueRemoved { id });
                self.store.dispatch(Action::BannerSet(message));
                Err(e)
            }
        }
    }

    pub fn open_composer(&self, composer: ComposerState) {
        self.store.dispatch(Action::ComposerOpened(composer));
    }

    pub fn edit_composer(&self, composer: ComposerState) {
        self.store.dispatch(Action::ComposerChanged(composer));
    }

    pub fn close_composer(&self) {
        self.store.dispatch(Action::ComposerClosed);
    }

    /// Submit the composer form. Failures stay inline in the composer.
    /// Returns `None` without sending anything while a submission is pending.
    pub async fn submit_composer(&self) -> Result<Option<Article>> {
        let composer = self.store.with_mut(|state| {
            if state.composer_pending {
                return None;
            }
            state.reduce(Action::ComposerSubmitted);
            Some(state.composer.clone())
        });
        let Some(composer) = composer else {
            return Ok(None);
        };

        let request = self.request(&composer.code, &composer.guidance);
        match self.api.generate(&request).await {
            Ok(article) => {
                info!("✅ Composer article published: {}", article.title);
                self.store.dispatch(Action::ComposerSucceeded(article.clone()));
                Ok(Some(article))
            }
            Err(e) => {
                error!("💥 Composer generation failed: {}", e);
                self.store.dispatch(Action::ComposerFailed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Fetch the next page. Returns `false` when there is nothing to load or a
    /// load is already running.
    pub async fn load_more(&self) -> Result<bool> {
        let cursor = self.store.with_mut(|state| {
            if !state.can_load_more() {
                return None;
            }
            state.reduce(Action::LoadMoreStarted);
            Some(state.next_cursor.clone())
        });
        let Some(cursor) = cursor else {
            return Ok(false);
        };

        match self.api.fetch_page(cursor.as_deref(), PAGE_SIZE).await {
            Ok(page) => {
                info!("📚 Loaded {} more articles", page.articles.len());
                self.store.dispatch(Action::LoadMoreSucceeded(page));
                Ok(true)
            }
            Err(e) => {
                error!("💥 Failed to load more articles: {}", e);
                self.store.dispatch(Action::LoadMoreFailed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Append a reader comment and schedule the assistant's reply.
    pub fn add_comment(&self, article_id: &str, body: &str) -> Option<ArticleComment> {
        let comment = ArticleComment {
            id: new_id(),
            author: USER_AUTHOR.to_string(),
            body: body.to_string(),
            created_at: now(),
            role: CommentRole::User,
        };

        let reply = self.store.with_mut(|state| {
            let reply = state
                .article(article_id)
                .map(|article| build_assistant_reply(article, body))?;
            state.reduce(Action::CommentAdded {
                article_id: article_id.to_string(),
                comment: comment.clone(),
            });
            Some(reply)
        })?;

        self.scheduler.schedule(
            ASSISTANT_REPLY_DELAY,
            Action::AssistantReplied {
                article_id: article_id.to_string(),
                comment: reply,
            },
        );
        Some(comment)
    }

    pub fn set_search_query(&self, query: &str) {
        self.store.dispatch(Action::SearchChanged(query.to_string()));
    }

    pub fn suggestions(&self) -> Vec<SearchSuggestion> {
        build_search_suggestions(&self.store.read(|state| state.search_query.clone()))
    }

    /// Act on a suggestion. Only `generate` suggestions produce an article.
    pub async fn select_suggestion(&self, suggestion: SearchSuggestion) -> Option<Result<Article>> {
        self.store.dispatch(Action::SearchChanged(String::new()));

        match suggestion.action {
            SuggestionAction::Generate => Some(
                self.direct_generate(
                    &suggestion.payload.code,
                    &suggestion.payload.guidance,
                    &suggestion.title,
                )
                .await,
            ),
            SuggestionAction::Compose => {
                self.open_composer(suggestion.payload);
                None
            }
        }
    }

    pub async fn submit_top_suggestion(&self) -> Option<Result<Article>> {
        let top = self.suggestions().into_iter().next()?;
        self.select_suggestion(top).await
    }

    pub fn dismiss_banner(&self) {
        self.store.dispatch(Action::BannerDismissed);
    }

    pub fn pending_timers(&self) -> usize {
        self.scheduler.pending()
    }

    /// Cancel every delayed transition that has not fired yet.
    pub fn shutdown(&self) {
        self.scheduler.cancel_all();
    }
}
