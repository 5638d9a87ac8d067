use std::sync::Arc;

use account_service::domain::account::gateway::AuthGateway;
use account_service::domain::account::gateway::ExternalProvider;
use account_service::inbound::http::router::create_router;
use account_service::outbound::repositories::InMemoryUserStore;
use auth::identity::JwksCache;
use auth::identity::JwksCacheOptions;
use auth::identity::StaticKeySource;
use auth::IdentityTokenVerifier;
use auth::SessionTokenService;
use auth::SystemClock;
use jsonwebtoken::Algorithm;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use serde_json::json;
use serde_json::Value;

pub const SIGNING_SECRET: &[u8] = b"test-secret-key-for-session-signing-32b!";
pub const CLIENT_ID: &str = "client-123.apps.example.com";
pub const ISSUER: &str = "https://accounts.example.com";
pub const KID: &str = "provider-key-1";

const PROVIDER_KEY: &[u8] = include_bytes!("../fixtures/provider.pem");
const ROGUE_KEY: &[u8] = include_bytes!("../fixtures/rogue.pem");
const PROVIDER_JWKS: &str = include_str!("../fixtures/jwks.json");

/// Test application that spawns a real server
pub struct TestApp {
    pub address: String,
    pub store: Arc<InMemoryUserStore>,
    pub sessions: Arc<SessionTokenService>,
    pub api_client: reqwest::Client,
}

impl TestApp {
    /// Spawn the application in a background task and return TestApp
    pub async fn spawn() -> Self {
        // Use random port (0 = OS assigns)
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        let clock = Arc::new(SystemClock);
        let store = Arc::new(InMemoryUserStore::new());

        let key_source =
            StaticKeySource::from_json(PROVIDER_JWKS).expect("Failed to parse JWKS fixture");
        let keys = Arc::new(JwksCache::new(
            Arc::new(key_source),
            JwksCacheOptions::default(),
        ));
        let verifier = Arc::new(IdentityTokenVerifier::new(
            keys,
            vec![ISSUER.to_string(), "accounts.example.com".to_string()],
            clock.clone(),
        ));
        let sessions = Arc::new(SessionTokenService::new(
            SIGNING_SECRET,
            chrono::Duration::minutes(30),
            clock.clone(),
        ));

        let gateway = Arc::new(AuthGateway::new(
            Arc::clone(&store),
            verifier,
            Arc::clone(&sessions),
            ExternalProvider {
                name: "google".to_string(),
                client_id: CLIENT_ID.to_string(),
            },
            clock,
        ));

        let router = create_router(gateway);

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("Server error");
        });

        Self {
            address,
            store,
            sessions,
            api_client: reqwest::Client::new(),
        }
    }

    /// Helper to make GET request
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.get(&format!("{}{}", self.address, path))
    }

    /// Helper to make POST request
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.post(&format!("{}{}", self.address, path))
    }

    /// Helper to make GET request with Bearer token
    pub fn get_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.get(path).bearer_auth(token)
    }

    /// Register a local account with a minimal profile
    pub async fn signup(&self, email: &str, password: &str) -> reqwest::Response {
        self.post("/signup")
            .json(&json!({
                "email": email,
                "password": password,
                "first_name": "Ada",
                "last_name": "Lovelace",
            }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Log in with email and password
    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.post("/login")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Log in with a provider ID token
    pub async fn login_external(&self, id_token: &str) -> reqwest::Response {
        self.post("/auth/external")
            .json(&json!({ "id_token": id_token }))
            .send()
            .await
            .expect("Failed to execute request")
    }
}

/// Standard claims of a provider ID token issued now for our client.
pub fn identity_claims(subject: &str, email: &str) -> Value {
    let now = chrono::Utc::now().timestamp();
    json!({
        "iss": ISSUER,
        "aud": CLIENT_ID,
        "sub": subject,
        "email": email,
        "email_verified": true,
        "given_name": "Grace",
        "family_name": "Hopper",
        "picture": "https://example.com/grace.png",
        "iat": now,
        "exp": now + 3600,
    })
}

/// Sign claims as the identity provider.
pub fn provider_token(claims: &Value) -> String {
    sign(claims, PROVIDER_KEY)
}

/// Sign claims with a key the provider never published, under its kid.
pub fn rogue_token(claims: &Value) -> String {
    sign(claims, ROGUE_KEY)
}

fn sign(claims: &Value, pem: &[u8]) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(KID.to_string());
    let key = EncodingKey::from_rsa_pem(pem).expect("Failed to parse RSA fixture");
    jsonwebtoken::encode(&header, claims, &key).expect("Failed to sign token")
}
