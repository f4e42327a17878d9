use thiserror::Error;

/// Status answered when the model stays unavailable after every retry.
pub const UNAVAILABLE_STATUS: u16 = 503;

const TRANSIENT_MARKERS: &[&str] = &["503", "unavailable", "overloaded", "temporarily"];

/// Whether an upstream failure is worth retrying.
///
/// The tag is decided once, where the failure is observed (the model
/// invoker), and carried from there on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transient,
    Terminal,
}

impl FailureKind {
    /// Classify a failure from the upstream's own error text.
    pub fn from_message(message: &str) -> Self {
        let message = message.to_lowercase();
        if TRANSIENT_MARKERS.iter().any(|marker| message.contains(marker)) {
            Self::Transient
        } else {
            Self::Terminal
        }
    }

    /// Classify a non-success HTTP answer from the model service.
    pub fn from_status(status: u16, body: &str) -> Self {
        if status == UNAVAILABLE_STATUS {
            Self::Transient
        } else {
            Self::from_message(body)
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Configuration(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{message}")]
    Upstream { message: String, kind: FailureKind },

    #[error("{message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Gemini returned an unexpected response. Raw output: {raw}")]
    MalformedResponse {
        raw: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Storage(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    pub fn upstream(message: impl Into<String>, kind: FailureKind) -> Self {
        Self::Upstream {
            message: message.into(),
            kind,
        }
    }

    /// Upstream failure whose kind is read off its message.
    pub fn upstream_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let kind = FailureKind::from_message(&message);
        Self::Upstream { message, kind }
    }

    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Upstream {
                kind: FailureKind::Transient,
                ..
            }
        )
    }

    /// Status code a caller of the HTTP surface should see.
    pub fn status(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::Unavailable { .. } => UNAVAILABLE_STATUS,
            _ => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_messages() {
        assert_eq!(
            FailureKind::from_message("The model is OVERLOADED. Please try again later."),
            FailureKind::Transient
        );
        assert_eq!(
            FailureKind::from_message("[503 Service Unavailable]"),
            FailureKind::Transient
        );
        assert_eq!(
            FailureKind::from_message("temporarily out of capacity"),
            FailureKind::Transient
        );
        assert_eq!(
            FailureKind::from_message("invalid argument: contents is empty"),
            FailureKind::Terminal
        );
    }

    #[test]
    fn test_classify_status() {
        assert_eq!(FailureKind::from_status(503, ""), FailureKind::Transient);
        assert_eq!(
            FailureKind::from_status(500, "{\"status\": \"UNAVAILABLE\"}"),
            FailureKind::Transient
        );
        assert_eq!(FailureKind::from_status(400, "API key not valid"), FailureKind::Terminal);
    }

    #[test]
    fn test_status_mapping() {
        let unavailable = Error::Unavailable {
            message: "down".to_string(),
            source: Box::new(Error::upstream("overloaded", FailureKind::Transient)),
        };
        assert_eq!(unavailable.status(), 503);
        assert_eq!(Error::InvalidInput("empty".to_string()).status(), 400);
        assert_eq!(Error::Storage("nope".to_string()).status(), 500);
        assert_eq!(Error::Configuration("missing".to_string()).status(), 500);
    }

    #[test]
    fn test_transient_flag_only_on_tagged_upstream() {
        assert!(Error::upstream_message("model overloaded").is_transient());
        assert!(!Error::upstream_message("invalid argument").is_transient());
        assert!(!Error::Storage("503 unavailable".to_string()).is_transient());
    }
}
