use thiserror::Error;

pub type Result<T> = std::result::Result<T, LookupError>;

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("Lead store unavailable: {0}")]
    Transient(#[from] callscreen_store::StoreError),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("{0}")]
    Other(String),
}
