//! eBay category sync and leaf-category resolution.

pub mod error;
pub mod ledger;
pub mod resolver;
pub mod source;
pub mod sync;

pub use error::CategorySyncError;
pub use ledger::{run_recorded_sync, RecordedSync, TriggerSource};
pub use resolver::{
    CategoryBranch, CategorySource, CategoryValidation, LeafResolver, ResolveRequest,
};
pub use source::{StoredCategories, StoredSourceError};
pub use sync::{
    persist, sync_categories, CategoryStore, CategoryTreeSource, PersistSummary, SyncOptions,
    SyncOutcome,
};
