//! Error taxonomy for NFT sync and valuation.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, NftError>;

#[derive(Debug, Error)]
pub enum NftError {
    /// The NFT provider or the price oracle could not be reached or returned
    /// something unparseable. Aborts the operation that triggered it.
    #[error("{service} unavailable: {source}")]
    RemoteUnavailable {
        service: String,
        #[source]
        source: anyhow::Error,
    },

    /// A stored price asset no longer resolves to a known asset.
    #[error("Unknown asset {0}")]
    UnknownAsset(String),

    /// An update that must touch exactly one stored row touched some other number.
    #[error("Failed to update price for {identifier}: {affected} rows affected")]
    StoreConstraintViolation { identifier: String, affected: usize },

    #[error("Store operation failed: {0:#}")]
    Store(#[from] anyhow::Error),

    #[error("Background fetch task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl NftError {
    pub fn remote(service: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::RemoteUnavailable {
            service: service.into(),
            source: source.into(),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::RemoteUnavailable { .. })
    }
}
