use thiserror::Error;

/// Failure taxonomy for the remote boundary and the components built on it.
///
/// `Validation` is caller-fixable and surfaced as state for re-entry;
/// `Auth` means the credential was rejected and the session must be torn
/// down (handled centrally by `SessionStore`); `Remote` is anything else
/// the service or transport reported, passed through verbatim.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("credential rejected by the service")]
    Auth,

    #[error("{0}")]
    Remote(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn remote(msg: impl Into<String>) -> Self {
        Self::Remote(msg.into())
    }
}
