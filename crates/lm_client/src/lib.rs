//! Reader-side orchestration for the article feed: an explicit state store,
//! the generation queue, delayed transitions, settings and the server API.

pub mod api;
pub mod format;
pub mod queue;
pub mod scheduler;
pub mod session;
pub mod settings;
pub mod state;
pub mod suggestions;

pub use api::{ArticlesApi, HttpApi};
pub use queue::{GenerationQueueItem, QueueStats, QueueStatus};
pub use scheduler::Scheduler;
pub use session::Session;
pub use settings::{GeminiSettings, SettingsStore, SettingsUpdate};
pub use state::{Action, ComposerState, FeedState, Store};
pub use suggestions::{build_search_suggestions, SearchSuggestion, SuggestionAction};

pub mod prelude {
    pub use super::format::format_relative_time;
    pub use super::{
        ArticlesApi, ComposerState, FeedState, GeminiSettings, HttpApi, Session, SettingsStore,
        SettingsUpdate,
    };
}
