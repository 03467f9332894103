// Payment Recovery - Core Library
// Normalization, aggregation, filtering and collection engine shared by the
// TUI, the API server, and tests

pub mod aggregate;
pub mod collection;
pub mod config;
pub mod error;
pub mod filter;
pub mod loader;
pub mod parsing;
pub mod record;
pub mod schema;
pub mod source;
pub mod state;

// Re-export commonly used types
pub use aggregate::{
    aggregate, balance_bucket, balance_bucket_label, balance_distribution, location_distribution,
    payment_aging, Dashboard, DistributionBucket, SummaryStats, TOP_LOCATIONS,
};
pub use collection::{collect, parse_collection_amount, CollectionReceipt};
pub use config::AppConfig;
pub use error::{RecoveryError, Result};
pub use filter::{
    apply_criteria, available_years, filter, matches_search, sort_records, BalanceRange,
    FilterCriteria, SortDirection, SortOrder, YearFilter,
};
pub use loader::{load_source, parse_table, read_source_text, Dataset, RawTable};
pub use parsing::{days_since, format_currency, parse_currency, parse_currency_value, parse_date};
pub use record::{CanonicalRecord, RawRecord};
pub use schema::{
    normalize, schema_for, visible_columns, CaptiraSchema, JointSchema, SimplySchema,
    SourceSchema,
};
pub use source::Source;
pub use state::{FilterControls, LoadOutcome, LoadStatus, LoadTicket, RecoveryState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
