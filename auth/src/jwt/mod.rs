pub mod claims;
pub mod errors;
pub mod handler;

pub use claims::AuthType;
pub use claims::SessionClaims;
pub use claims::SessionGrant;
pub use claims::SESSION_CLAIMS_VERSION;
pub use errors::JwtError;
pub use handler::JwtHandler;
