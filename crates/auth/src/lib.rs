//! Bearer-token session issuance and validation for API callers.
//!
//! Identity itself (accounts, OAuth, SSO) stays external per the
//! engine's non-goals; this crate only issues and validates the
//! tokens that let a caller act as a given [`Member`] across requests.
//!
//! - [`Crypto`] — HMAC signing/verification of session tokens
//! - [`Claims`] — the decoded payload of a bearer token
//! - [`Session`] — the persisted, revocable record a token refers to
#[cfg(feature = "server")]
mod middleware;
mod session;

use dlb_core::Id;
pub use session::Session;

#[cfg(feature = "server")]
pub use middleware::Auth;
#[cfg(feature = "server")]
pub use middleware::MaybeAuth;

/// Opaque marker for the voter identity a session belongs to; the
/// concrete account record lives outside this engine entirely.
pub struct Member;

const ACCESS_TOKEN_DURATION: std::time::Duration = std::time::Duration::from_secs(60 * 60);

/// Decoded bearer-token payload.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Claims {
    session: Id<Session>,
    user: Id<Member>,
    exp: u64,
}

impl Claims {
    pub fn new(session: Id<Session>, user: Id<Member>) -> Self {
        let exp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time moves forward")
            .as_secs()
            + ACCESS_TOKEN_DURATION.as_secs();
        Self { session, user, exp }
    }
    pub fn session(&self) -> Id<Session> {
        self.session
    }
    pub fn user(&self) -> Id<Member> {
        self.user
    }
    pub fn expired(&self) -> bool {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time moves forward")
            .as_secs();
        now >= self.exp
    }
}

/// HMAC signing and verification of [`Claims`].
pub struct Crypto {
    encoding: jsonwebtoken::EncodingKey,
    decoding: jsonwebtoken::DecodingKey,
}

impl Crypto {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: jsonwebtoken::EncodingKey::from_secret(secret),
            decoding: jsonwebtoken::DecodingKey::from_secret(secret),
        }
    }
    pub fn from_env() -> Self {
        Self::new(
            std::env::var("JWT_SECRET")
                .unwrap_or_else(|_| String::default())
                .as_bytes(),
        )
    }
    pub fn encode(&self, claims: &Claims) -> Result<String, jsonwebtoken::errors::Error> {
        jsonwebtoken::encode(&jsonwebtoken::Header::default(), claims, &self.encoding)
    }
    pub fn decode(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &jsonwebtoken::Validation::default())
            .map(|data| data.claims)
    }
    /// Digest used to look up a session's revocation status without
    /// storing the bearer token itself.
    pub fn hash(token: &str) -> Vec<u8> {
        use sha2::Digest;
        sha2::Sha256::digest(token.as_bytes()).to_vec()
    }
    pub const fn duration() -> std::time::Duration {
        ACCESS_TOKEN_DURATION
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_encode_decode() {
        let crypto = Crypto::new(b"test-secret");
        let claims = Claims::new(Id::default(), Id::default());
        let token = crypto.encode(&claims).unwrap();
        let decoded = crypto.decode(&token).unwrap();
        assert_eq!(decoded.session().inner(), claims.session().inner());
        assert_eq!(decoded.user().inner(), claims.user().inner());
    }

    #[test]
    fn fresh_claims_are_not_expired() {
        let claims = Claims::new(Id::default(), Id::default());
        assert!(!claims.expired());
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(Crypto::hash("token-a"), Crypto::hash("token-a"));
        assert_ne!(Crypto::hash("token-a"), Crypto::hash("token-b"));
    }
}
