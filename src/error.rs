use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecoveryError {
    #[error("Invalid collection amount '{0}': enter a positive number")]
    InvalidAmount(String),

    #[error("No record with index {0} in the loaded set")]
    RecordNotFound(usize),

    #[error("No data loaded yet for {0}")]
    NotLoaded(String),

    #[error("Unknown data source: {0}")]
    UnknownSource(String),

    #[error("Invalid balance range: min {min} is greater than max {max}")]
    InvalidRange { min: f64, max: f64 },

    #[error("Invalid sort direction '{0}': use asc or desc")]
    InvalidSortDirection(String),

    #[error("No column named '{0}' to sort by")]
    UnknownColumn(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RecoveryError>;
