//! Authentication utilities library
//!
//! Provides the reusable authentication core for the account service:
//! - Password hashing (Argon2id)
//! - Session token issuance and validation (HS256 JWT, closed claims)
//! - Identity provider ID token verification (JWKS with key rotation)
//! - An injectable clock so expiry can be tested deterministically
//!
//! Nothing here knows about storage. The service owns its accounts and adapts
//! these building blocks.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::new();
//! let hash = hasher.hash("my_password").unwrap();
//! assert!(hasher.verify("my_password", &hash));
//! assert!(!hasher.verify("not_my_password", &hash));
//! ```
//!
//! ## Session Tokens
//! ```
//! use std::sync::Arc;
//!
//! use auth::{SessionGrant, SessionTokenService, SystemClock};
//!
//! let sessions = SessionTokenService::new(
//!     b"secret_key_at_least_32_bytes_long!",
//!     chrono::Duration::minutes(30),
//!     Arc::new(SystemClock),
//! );
//!
//! let token = sessions.issue(SessionGrant::local("a@x.com")).unwrap();
//! assert_eq!(sessions.validate(&token).unwrap(), "a@x.com");
//! ```

pub mod clock;
pub mod identity;
pub mod jwt;
pub mod password;
pub mod session;

// Re-export commonly used items
pub use clock::Clock;
pub use clock::ManualClock;
pub use clock::SystemClock;
pub use identity::IdentityClaims;
pub use identity::IdentityError;
pub use identity::IdentityTokenVerifier;
pub use jwt::AuthType;
pub use jwt::JwtError;
pub use jwt::JwtHandler;
pub use jwt::SessionClaims;
pub use jwt::SessionGrant;
pub use password::PasswordError;
pub use password::PasswordHasher;
pub use session::SessionError;
pub use session::SessionTokenService;
