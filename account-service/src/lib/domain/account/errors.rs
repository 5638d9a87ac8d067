use auth::IdentityError;
use auth::PasswordError;
use auth::SessionError;
use thiserror::Error;

/// Error for EmailAddress validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EmailError {
    #[error("Invalid email format: {0}")]
    InvalidFormat(String),
}

/// Error for registration profile validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProfileError {
    #[error("Password must not be empty")]
    EmptyPassword,

    #[error("Age out of range: {0}")]
    InvalidAge(i32),

    #[error("Field {field} too long: maximum {max} characters")]
    FieldTooLong { field: &'static str, max: usize },
}

/// Error reported by UserStore implementations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Email already exists: {0}")]
    DuplicateEmail(String),

    #[error("Account not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),
}

/// Top-level error for all authentication operations.
///
/// Messages are safe to show to clients: none of them says which part of a
/// credential was wrong.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Email already registered")]
    EmailAlreadyRegistered,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid external identity token")]
    InvalidExternalToken,

    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,

    #[error("User not found")]
    UserNotFound,

    #[error("Identity provider did not respond in time, try again")]
    UpstreamTimeout,

    #[error("Identity provider unavailable, try again")]
    UpstreamUnavailable,

    #[error("{0}")]
    MalformedInput(String),

    // Infrastructure errors
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<EmailError> for AuthError {
    fn from(err: EmailError) -> Self {
        AuthError::MalformedInput(err.to_string())
    }
}

impl From<ProfileError> for AuthError {
    fn from(err: ProfileError) -> Self {
        AuthError::MalformedInput(err.to_string())
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail(_) => AuthError::EmailAlreadyRegistered,
            StoreError::NotFound(_) => AuthError::UserNotFound,
            StoreError::Database(msg) => AuthError::Storage(msg),
        }
    }
}

impl From<IdentityError> for AuthError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidToken(_) => AuthError::InvalidExternalToken,
            IdentityError::UpstreamTimeout => AuthError::UpstreamTimeout,
            IdentityError::KeyFetchFailed(_) => AuthError::UpstreamUnavailable,
        }
    }
}

impl From<SessionError> for AuthError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::InvalidOrExpiredToken => AuthError::InvalidOrExpiredToken,
            SessionError::IssueFailed(msg) => AuthError::Internal(msg),
        }
    }
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        AuthError::Internal(err.to_string())
    }
}
