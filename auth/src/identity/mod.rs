pub mod claims;
pub mod errors;
pub mod keys;
pub mod verifier;

pub use claims::IdentityClaims;
pub use errors::IdentityError;
pub use keys::FetchedKeys;
pub use keys::HttpJwksSource;
pub use keys::JwksCache;
pub use keys::JwksCacheOptions;
pub use keys::KeySource;
pub use keys::StaticKeySource;
pub use verifier::IdentityTokenVerifier;
