use async_trait::async_trait;
use crate::Result;

/// One call to a hosted language model.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    pub prompt: String,
    /// Caller-supplied credential, used instead of the process default when non-empty.
    pub api_key: Option<String>,
    /// Caller-supplied model name, used instead of the process default when non-empty.
    pub model: Option<String>,
}

#[async_trait]
pub trait InferenceModel: Send + Sync {
    fn name(&self) -> &str;

    /// Issue exactly one request and return the raw text the model produced.
    async fn complete(&self, invocation: &Invocation) -> Result<String>;
}
