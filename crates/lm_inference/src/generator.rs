use std::fmt;
use std::sync::Arc;

use lm_core::{ArticleRequest, Error, GeneratedArticle, InferenceModel, Invocation, Result};
use tracing::info;

use crate::normalize::normalize_response;
use crate::prompt::build_prompt;
use crate::retry::RetryPolicy;

pub const MISSING_CODE_MESSAGE: &str = "Code sample is required to generate an article.";

/// Prompt, call the model behind the retry policy, normalize the answer.
pub struct ArticleGenerator {
    model: Arc<dyn InferenceModel>,
    retry: RetryPolicy,
}

impl fmt::Debug for ArticleGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArticleGenerator")
            .field("model", &self.model.name())
            .field("retry", &self.retry)
            .finish()
    }
}

impl ArticleGenerator {
    pub fn new(model: Arc<dyn InferenceModel>, retry: RetryPolicy) -> Self {
        Self { model, retry }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub async fn generate(&self, request: &ArticleRequest) -> Result<GeneratedArticle> {
        if request.code.trim().is_empty() {
            return Err(Error::InvalidInput(MISSING_CODE_MESSAGE.to_string()));
        }

        let invocation = Invocation {
            prompt: build_prompt(&request.code, request.guidance.as_deref()),
            api_key: request.api_key.clone(),
            model: request.model.clone(),
        };
        info!("📝 Prompt length: {} characters", invocation.prompt.len());

        info!("⏳ Calling {} (this may take 10-30 seconds)...", self.model.name());
        let model = &self.model;
        let call = &invocation;
        let text = self.retry.run(move || model.complete(call)).await?;
        info!("✅ {} responded with {} characters", self.model.name(), text.len());

        let article = normalize_response(&text)?;
        info!("✅ Response normalized into \"{}\"", article.title);
        Ok(article)
    }
}
