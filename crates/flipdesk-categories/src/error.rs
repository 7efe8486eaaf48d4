use flipdesk_core::MalformedTree;
use flipdesk_db::DbError;
use flipdesk_ebay::EbayError;
use thiserror::Error;

/// Reasons a category sync run aborts.
#[derive(Debug, Error)]
pub enum CategorySyncError {
    #[error("failed to fetch category tree: {0}")]
    Fetch(#[from] EbayError),

    #[error(transparent)]
    MalformedTree(#[from] MalformedTree),

    /// A store operation failed; `written` records had already been
    /// committed.
    #[error("persistence failed at {stage} after {written} records: {source}")]
    Persistence {
        stage: String,
        written: usize,
        #[source]
        source: DbError,
    },

    #[error("invalid sync configuration: {0}")]
    InvalidConfig(String),
}

impl CategorySyncError {
    /// Records committed before the failure.
    #[must_use]
    pub fn records_written(&self) -> usize {
        match self {
            CategorySyncError::Persistence { written, .. } => *written,
            _ => 0,
        }
    }

    /// `true` when the run failed talking to eBay.
    #[must_use]
    pub fn is_upstream(&self) -> bool {
        matches!(self, CategorySyncError::Fetch(e) if e.is_upstream())
    }
}
