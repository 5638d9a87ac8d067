use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::decode;
use jsonwebtoken::decode_header;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::Validation;

use super::claims::IdentityClaims;
use super::claims::ProviderClaims;
use super::errors::IdentityError;
use super::keys::JwksCache;
use crate::clock::Clock;

/// Algorithms a provider may sign ID tokens with. Symmetric algorithms are
/// never accepted for externally issued tokens.
const ACCEPTED_ALGORITHMS: &[Algorithm] = &[
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
    Algorithm::ES256,
    Algorithm::ES384,
];

/// Verifies identity assertions issued by an external provider.
///
/// Checks, in order: header algorithm and `kid`, signature against the
/// provider's published keys, `iss` against the accepted issuer set, `aud`
/// against the expected client id, then `exp` against the injected clock.
pub struct IdentityTokenVerifier {
    keys: Arc<JwksCache>,
    issuers: Vec<String>,
    clock: Arc<dyn Clock>,
    leeway: Duration,
}

impl IdentityTokenVerifier {
    /// Create a verifier.
    ///
    /// # Arguments
    /// * `keys` - Provider key cache
    /// * `issuers` - Every issuer string the provider may put in `iss`
    /// * `clock` - Time source for the expiry check
    pub fn new(keys: Arc<JwksCache>, issuers: Vec<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            keys,
            issuers,
            clock,
            leeway: Duration::zero(),
        }
    }

    /// Tolerate this much clock skew on `exp`.
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    /// Verify a provider ID token.
    ///
    /// # Arguments
    /// * `raw_token` - Compact JWT as received from the client
    /// * `expected_audience` - Our client id at the provider
    ///
    /// # Returns
    /// Normalized identity claims
    ///
    /// # Errors
    /// * `InvalidToken` - Any validation failure
    /// * `UpstreamTimeout` - Provider keys could not be fetched in time
    /// * `KeyFetchFailed` - Provider keys could not be fetched
    pub async fn verify(
        &self,
        raw_token: &str,
        expected_audience: &str,
    ) -> Result<IdentityClaims, IdentityError> {
        let header = decode_header(raw_token)
            .map_err(|e| IdentityError::invalid(format!("malformed header: {}", e)))?;

        if !ACCEPTED_ALGORITHMS.contains(&header.alg) {
            return Err(IdentityError::invalid(format!(
                "algorithm {:?} not accepted",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| IdentityError::invalid("missing kid header"))?;

        let jwk = self.keys.key(&kid).await?;
        let decoding_key = DecodingKey::from_jwk(&jwk)
            .map_err(|e| IdentityError::invalid(format!("unusable provider key: {}", e)))?;

        let mut validation = Validation::new(header.alg);
        validation.set_issuer(&self.issuers);
        validation.set_audience(&[expected_audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.validate_exp = false;

        let claims = decode::<ProviderClaims>(raw_token, &decoding_key, &validation)
            .map_err(|e| IdentityError::invalid(format!("{:?}", e.kind())))?
            .claims;

        let now = self.clock.now().timestamp();
        if claims.exp + self.leeway.num_seconds() < now {
            return Err(IdentityError::invalid("token expired"));
        }

        claims.into_identity()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use chrono::Utc;
    use jsonwebtoken::encode;
    use jsonwebtoken::EncodingKey;
    use jsonwebtoken::Header;
    use serde_json::json;

    use super::*;
    use crate::clock::ManualClock;
    use crate::identity::keys::JwksCacheOptions;
    use crate::identity::keys::StaticKeySource;

    const PROVIDER_KEY: &[u8] = include_bytes!("../../tests/fixtures/provider.pem");
    const ROGUE_KEY: &[u8] = include_bytes!("../../tests/fixtures/rogue.pem");
    const JWKS: &str = include_str!("../../tests/fixtures/jwks.json");
    const KID: &str = "provider-key-1";
    const CLIENT_ID: &str = "client-123.apps.example.com";
    const ISSUER: &str = "https://accounts.example.com";

    struct Fixture {
        verifier: IdentityTokenVerifier,
        clock: Arc<ManualClock>,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
        ));
        let keys = Arc::new(JwksCache::new(
            Arc::new(StaticKeySource::from_json(JWKS).unwrap()),
            JwksCacheOptions::default(),
        ));
        let verifier = IdentityTokenVerifier::new(
            keys,
            vec!["accounts.example.com".to_string(), ISSUER.to_string()],
            clock.clone(),
        );
        Fixture { verifier, clock }
    }

    fn payload(clock: &ManualClock) -> serde_json::Value {
        let now = clock.now().timestamp();
        json!({
            "iss": ISSUER,
            "aud": CLIENT_ID,
            "sub": "110169484474386276334",
            "email": "ada@example.com",
            "email_verified": true,
            "given_name": "Ada",
            "family_name": "Lovelace",
            "picture": "https://example.com/ada.png",
            "iat": now,
            "exp": now + 3600
        })
    }

    fn sign_with(key: &[u8], kid: Option<&str>, claims: &serde_json::Value) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = kid.map(str::to_string);
        encode(&header, claims, &EncodingKey::from_rsa_pem(key).unwrap()).unwrap()
    }

    fn sign(claims: &serde_json::Value) -> String {
        sign_with(PROVIDER_KEY, Some(KID), claims)
    }

    #[tokio::test]
    async fn test_valid_token_yields_normalized_claims() {
        let f = fixture();
        let token = sign(&payload(&f.clock));

        let claims = f.verifier.verify(&token, CLIENT_ID).await.unwrap();

        assert_eq!(claims.subject, "110169484474386276334");
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.given_name.as_deref(), Some("Ada"));
        assert_eq!(claims.family_name.as_deref(), Some("Lovelace"));
        assert_eq!(claims.picture.as_deref(), Some("https://example.com/ada.png"));
    }

    #[tokio::test]
    async fn test_every_accepted_issuer_form() {
        let f = fixture();

        for issuer in ["accounts.example.com", ISSUER] {
            let mut claims = payload(&f.clock);
            claims["iss"] = json!(issuer);
            assert!(f.verifier.verify(&sign(&claims), CLIENT_ID).await.is_ok());
        }
    }

    #[tokio::test]
    async fn test_wrong_audience_rejected() {
        let f = fixture();
        let token = sign(&payload(&f.clock));

        let result = f.verifier.verify(&token, "someone-else").await;
        assert!(matches!(result, Err(IdentityError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn test_wrong_issuer_rejected() {
        let f = fixture();
        let mut claims = payload(&f.clock);
        claims["iss"] = json!("https://evil.example.com");

        let result = f.verifier.verify(&sign(&claims), CLIENT_ID).await;
        assert!(matches!(result, Err(IdentityError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let f = fixture();
        let token = sign(&payload(&f.clock));

        f.clock.advance(Duration::seconds(3601));

        let result = f.verifier.verify(&token, CLIENT_ID).await;
        assert!(matches!(result, Err(IdentityError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn test_leeway_tolerates_skew() {
        let f = fixture();
        let verifier = f.verifier.with_leeway(Duration::seconds(60));
        let token = sign(&payload(&f.clock));

        f.clock.advance(Duration::seconds(3630));
        assert!(verifier.verify(&token, CLIENT_ID).await.is_ok());

        f.clock.advance(Duration::seconds(60));
        assert!(verifier.verify(&token, CLIENT_ID).await.is_err());
    }

    #[tokio::test]
    async fn test_foreign_signature_rejected() {
        let f = fixture();
        let token = sign_with(ROGUE_KEY, Some(KID), &payload(&f.clock));

        let result = f.verifier.verify(&token, CLIENT_ID).await;
        assert!(matches!(result, Err(IdentityError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn test_missing_or_unknown_kid_rejected() {
        let f = fixture();
        let claims = payload(&f.clock);

        let no_kid = sign_with(PROVIDER_KEY, None, &claims);
        let unknown_kid = sign_with(PROVIDER_KEY, Some("not-published"), &claims);

        assert!(f.verifier.verify(&no_kid, CLIENT_ID).await.is_err());
        assert!(f.verifier.verify(&unknown_kid, CLIENT_ID).await.is_err());
    }

    #[tokio::test]
    async fn test_symmetric_algorithm_rejected() {
        let f = fixture();
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(KID.to_string());
        let token = encode(
            &header,
            &payload(&f.clock),
            &EncodingKey::from_secret(b"shared_secret_shared_secret_1234"),
        )
        .unwrap();

        let result = f.verifier.verify(&token, CLIENT_ID).await;
        assert!(matches!(result, Err(IdentityError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn test_malformed_token_rejected() {
        let f = fixture();

        for token in ["", "abc", "a.b.c"] {
            let result = f.verifier.verify(token, CLIENT_ID).await;
            assert!(matches!(result, Err(IdentityError::InvalidToken(_))));
        }
    }

    #[tokio::test]
    async fn test_token_without_email_rejected() {
        let f = fixture();
        let mut claims = payload(&f.clock);
        claims.as_object_mut().unwrap().remove("email");

        let result = f.verifier.verify(&sign(&claims), CLIENT_ID).await;
        assert!(matches!(result, Err(IdentityError::InvalidToken(_))));
    }
}
