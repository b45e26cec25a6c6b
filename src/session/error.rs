use thiserror::Error;

use super::{signer::SignerError, store::StoreError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid session configuration: {0}")]
    Config(&'static str),
    #[error(transparent)]
    Signing(#[from] SignerError),
    #[error("invalid refresh token")]
    InvalidRefreshToken,
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
}
