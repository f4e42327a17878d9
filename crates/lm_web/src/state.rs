use std::sync::Arc;

use lm_core::ArticleStorage;
use lm_inference::ArticleGenerator;

/// Shared by every request; holds no per-request state.
#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<ArticleGenerator>,
    pub storage: Arc<dyn ArticleStorage>,
}

impl AppState {
    pub fn new(generator: ArticleGenerator, storage: Arc<dyn ArticleStorage>) -> Self {
        Self {
            generator: Arc::new(generator),
            storage,
        }
    }
}
