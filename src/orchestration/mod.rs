//! Page loading, the operator's working set, and the mutations applied to it.

pub mod loader;
pub mod mutator;
pub mod worklist;

pub use loader::{PageLoader, ReconciledPage};
pub use mutator::{BulkFailure, BulkOutcome, Mutator};
pub use worklist::{BulkState, ItemState, RowView, WorkItem, Worklist, WorklistView};

use crate::datasource::DataSourceError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutationError {
    #[error("nothing to change")]
    NothingToChange,
    #[error("no store price for transaction {0}")]
    MissingStorePrice(String),
    #[error("transaction {0} is not in the working set")]
    NotFound(String),
    #[error("transaction {0} is already being updated")]
    Busy(String),
    #[error("a bulk update is already running")]
    BulkInProgress,
    #[error(transparent)]
    Upstream(#[from] DataSourceError),
}
