use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Pending,
    Generating,
    Complete,
    Error,
}

impl QueueStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Queued",
            Self::Generating => "Generating...",
            Self::Complete => "Posted",
            Self::Error => "Failed",
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

/// One direct generation the session is tracking. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationQueueItem {
    pub id: String,
    pub title: String,
    pub status: QueueStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerationQueueItem {
    pub fn pending(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            status: QueueStatus::Pending,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub pending: usize,
    pub generating: usize,
    pub complete: usize,
    pub error: usize,
}

impl QueueStats {
    pub fn from_items(items: &[GenerationQueueItem]) -> Self {
        items.iter().fold(Self::default(), |mut stats, item| {
            match item.status {
                QueueStatus::Pending => stats.pending += 1,
                QueueStatus::Generating => stats.generating += 1,
                QueueStatus::Complete => stats.complete += 1,
                QueueStatus::Error => stats.error += 1,
            }
            stats
        })
    }
}

impl fmt::Display for QueueStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} waiting · {} processing · {} posted · {} issues",
            self.pending, self.generating, self.complete, self.error
        )
    }
}
