pub mod models;
pub mod error;
pub mod storage;
pub mod types;

pub use error::{Error, FailureKind, Result};
pub use models::{InferenceModel, Invocation};
pub use storage::ArticleStorage;
pub use types::{
    Article, ArticleComment, ArticleRequest, ArticleSection, ArticlesPage, CommentRole,
    GeneratedArticle,
};
