pub mod api;
pub mod config;
pub mod datasource;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;

pub use config::Config;
pub use datasource::{
    AffiliateSource, DataSourceError, EhubClient, MockAffiliateSource, MockStoreSource,
    StoreSource, UpgatesClient,
};
pub use domain::{
    AffiliateTransaction, Decimal, StatusChange, StoreOrder, TransactionStatus,
    TransactionUpdate,
};
pub use engine::{EnrichedTransaction, ReconcileRules, RowClass};
pub use error::AppError;
pub use orchestration::{Mutator, PageLoader, Worklist};
