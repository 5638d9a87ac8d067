use thiserror::Error;

/// Error type for identity assertion verification.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityError {
    /// Signature, issuer, audience, expiry or shape check failed.
    /// The reason is meant for logs, not for the caller.
    #[error("Invalid identity token: {0}")]
    InvalidToken(String),

    #[error("Identity provider key fetch timed out")]
    UpstreamTimeout,

    #[error("Identity provider key fetch failed: {0}")]
    KeyFetchFailed(String),
}

impl IdentityError {
    pub(crate) fn invalid(reason: impl ToString) -> Self {
        IdentityError::InvalidToken(reason.to_string())
    }
}
