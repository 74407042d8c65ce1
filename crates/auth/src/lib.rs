pub mod authenticator;
pub mod claims;
pub mod jwks;
pub mod oauth;
pub mod opaque;

pub use authenticator::{AuthOutcome, Authenticator};
pub use claims::ExtractedClaims;
pub use oauth::{OAuthVerifier, OAuthVerifierConfig};
pub use opaque::{ApiKeyRecord, ApiKeyRepository, OpaqueKeyVerifier};
