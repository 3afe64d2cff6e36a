//! Signed token generation and validation.
//!
//! Tokens are HS256 JWTs carrying a fixed claim set. Every token gets a
//! random 128-bit `jti` at issuance; the jti is the key the revocation
//! ledger tracks, so validation stays stateless except for that one lookup.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Default lifetime for session tokens: 24 hours.
pub const AUTH_TOKEN_TTL_SECS: u64 = 24 * 60 * 60;

/// Default lifetime for password reset tokens: 1 hour.
pub const RESET_TOKEN_TTL_SECS: u64 = 60 * 60;

/// Default lifetime for email verification tokens: 48 hours.
pub const VERIFY_TOKEN_TTL_SECS: u64 = 48 * 60 * 60;

/// Minimum length for a signing secret before it is considered weak.
pub const MIN_SECRET_LENGTH: usize = 32;

/// Placeholder secrets that ship in example configs and must never sign
/// production tokens.
const PLACEHOLDER_SECRETS: &[&[u8]] = &[b"secret", b"changeme", b"rookery-dev-secret"];

/// Returns true when a signing secret is too short or a known placeholder.
/// The caller decides whether to warn or refuse; startup only warns.
pub fn secret_is_weak(secret: &[u8]) -> bool {
    secret.len() < MIN_SECRET_LENGTH || PLACEHOLDER_SECRETS.contains(&secret)
}

/// Current Unix timestamp in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Token purpose, scoping each token to exactly one flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Session token presented as a bearer credential on API requests.
    Auth,
    /// One-time password reset token.
    Reset,
    /// One-time email verification token.
    Verify,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Auth => "auth",
            TokenType::Reset => "reset",
            TokenType::Verify => "verify",
        }
    }
}

/// The claim set carried inside every token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Subject user ID
    pub user_id: i64,
    /// Token purpose
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Unique token ID, the revocation key
    pub jti: String,
}

/// Per-type token lifetimes.
#[derive(Debug, Clone, Copy)]
pub struct TokenTtls {
    pub auth: Duration,
    pub reset: Duration,
    pub verify: Duration,
}

impl Default for TokenTtls {
    fn default() -> Self {
        Self {
            auth: Duration::from_secs(AUTH_TOKEN_TTL_SECS),
            reset: Duration::from_secs(RESET_TOKEN_TTL_SECS),
            verify: Duration::from_secs(VERIFY_TOKEN_TTL_SECS),
        }
    }
}

impl TokenTtls {
    fn for_type(&self, token_type: TokenType) -> Duration {
        match token_type {
            TokenType::Auth => self.auth,
            TokenType::Reset => self.reset,
            TokenType::Verify => self.verify,
        }
    }
}

/// Signs and validates tokens with a single symmetric secret.
#[derive(Clone)]
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttls: TokenTtls,
}

/// Result of issuing a token. The jti and expiry are returned alongside the
/// wire string so callers can revoke without re-decoding.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The signed wire-format token
    pub token: String,
    /// Unique token ID
    pub jti: String,
    /// Issued at (Unix timestamp)
    pub issued_at: u64,
    /// Expiration (Unix timestamp)
    pub expires_at: u64,
}

impl TokenSigner {
    pub fn new(secret: &[u8], ttls: TokenTtls) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttls,
        }
    }

    /// Issue a token of the given type for a user.
    /// The jti comes from a CSPRNG; predictable jtis would let an attacker
    /// guess revocation keys.
    pub fn issue(&self, user_id: i64, token_type: TokenType) -> Result<IssuedToken, TokenError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| TokenError::Clock)?
            .as_secs();

        let jti = uuid::Uuid::new_v4().to_string();
        let exp = now + self.ttls.for_type(token_type).as_secs();

        let claims = Claims {
            iat: now,
            exp,
            user_id,
            token_type,
            jti: jti.clone(),
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(TokenError::Encoding)?;

        Ok(IssuedToken {
            token,
            jti,
            issued_at: now,
            expires_at: exp,
        })
    }

    /// Validate a wire token and return its claims.
    ///
    /// The signature is verified over the raw segments before any claim
    /// content is parsed, so nothing unauthenticated is ever trusted. The
    /// type check runs last: a reset token can never pass as a session
    /// token or vice versa.
    pub fn decode(&self, token: &str, expected: TokenType) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => TokenError::BadSignature,
                _ => TokenError::Malformed,
            })?;

        if data.claims.token_type != expected {
            return Err(TokenError::WrongType);
        }

        Ok(data.claims)
    }
}

/// Errors from token operations.
#[derive(Debug)]
pub enum TokenError {
    /// Not three segments, or the payload is not a well-formed claim set
    Malformed,
    /// Signature does not match the secret
    BadSignature,
    /// `exp` is in the past
    Expired,
    /// Claim set is valid but scoped to a different flow
    WrongType,
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// System clock before the Unix epoch
    Clock,
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::Malformed => write!(f, "Malformed token"),
            TokenError::BadSignature => write!(f, "Invalid token signature"),
            TokenError::Expired => write!(f, "Token has expired"),
            TokenError::WrongType => write!(f, "Wrong token type"),
            TokenError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            TokenError::Clock => write!(f, "System time error"),
        }
    }
}

impl std::error::Error for TokenError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new(b"test-secret-key-long-enough-for-hs256", TokenTtls::default())
    }

    #[test]
    fn test_issue_and_decode_round_trip() {
        let signer = signer();

        let issued = signer.issue(42, TokenType::Auth).unwrap();
        let claims = signer.decode(&issued.token, TokenType::Auth).unwrap();

        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.token_type, TokenType::Auth);
        assert_eq!(claims.jti, issued.jti);
        assert_eq!(claims.iat, issued.issued_at);
        assert_eq!(claims.exp, issued.expires_at);
        assert_eq!(claims.exp - claims.iat, AUTH_TOKEN_TTL_SECS);
    }

    #[test]
    fn test_wire_format_is_three_segments() {
        let signer = signer();
        let issued = signer.issue(1, TokenType::Auth).unwrap();
        assert_eq!(issued.token.split('.').count(), 3);
        // base64url without padding
        assert!(!issued.token.contains('='));
    }

    #[test]
    fn test_claim_names_on_the_wire() {
        use base64::Engine;

        let signer = signer();
        let issued = signer.issue(7, TokenType::Reset).unwrap();
        let payload = issued.token.split('.').nth(1).unwrap();
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(payload)
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["user_id"], 7);
        assert_eq!(value["type"], "reset");
        assert!(value["iat"].is_u64());
        assert!(value["exp"].is_u64());
        assert!(value["jti"].is_string());
    }

    #[test]
    fn test_wrong_type_rejected_both_directions() {
        let signer = signer();

        let reset = signer.issue(1, TokenType::Reset).unwrap();
        let auth = signer.issue(1, TokenType::Auth).unwrap();

        assert!(matches!(
            signer.decode(&reset.token, TokenType::Auth),
            Err(TokenError::WrongType)
        ));
        assert!(matches!(
            signer.decode(&auth.token, TokenType::Reset),
            Err(TokenError::WrongType)
        ));
        assert!(matches!(
            signer.decode(&auth.token, TokenType::Verify),
            Err(TokenError::WrongType)
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let signer1 = TokenSigner::new(b"first-secret-key-of-sufficient-len", TokenTtls::default());
        let signer2 = TokenSigner::new(b"other-secret-key-of-sufficient-len", TokenTtls::default());

        let issued = signer1.issue(1, TokenType::Auth).unwrap();
        assert!(matches!(
            signer2.decode(&issued.token, TokenType::Auth),
            Err(TokenError::BadSignature)
        ));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let signer = signer();
        assert!(matches!(
            signer.decode("not-a-token", TokenType::Auth),
            Err(TokenError::Malformed)
        ));
        assert!(matches!(
            signer.decode("a.b", TokenType::Auth),
            Err(TokenError::Malformed)
        ));
        assert!(matches!(
            signer.decode("", TokenType::Auth),
            Err(TokenError::Malformed)
        ));
    }

    #[test]
    fn test_expired_token() {
        let secret = b"test-secret-key-long-enough-for-hs256";
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();

        let claims = Claims {
            iat: now - 100,
            exp: now - 50,
            user_id: 1,
            token_type: TokenType::Auth,
            jti: uuid::Uuid::new_v4().to_string(),
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap();

        let signer = TokenSigner::new(secret, TokenTtls::default());
        assert!(matches!(
            signer.decode(&token, TokenType::Auth),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn test_expiry_checked_even_with_matching_type() {
        // An expired reset token reports Expired, not WrongType, when decoded
        // as auth: expiry is checked before the type scope.
        let secret = b"test-secret-key-long-enough-for-hs256";
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();

        let claims = Claims {
            iat: now - 100,
            exp: now - 50,
            user_id: 1,
            token_type: TokenType::Reset,
            jti: uuid::Uuid::new_v4().to_string(),
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap();

        let signer = TokenSigner::new(secret, TokenTtls::default());
        assert!(matches!(
            signer.decode(&token, TokenType::Auth),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn test_unique_jti_per_token() {
        let signer = signer();
        let first = signer.issue(1, TokenType::Auth).unwrap();
        let second = signer.issue(1, TokenType::Auth).unwrap();
        assert_ne!(first.jti, second.jti);
    }

    #[test]
    fn test_configured_ttls_are_used() {
        let ttls = TokenTtls {
            auth: Duration::from_secs(60),
            reset: Duration::from_secs(120),
            verify: Duration::from_secs(180),
        };
        let signer = TokenSigner::new(b"test-secret-key-long-enough-for-hs256", ttls);

        let auth = signer.issue(1, TokenType::Auth).unwrap();
        let reset = signer.issue(1, TokenType::Reset).unwrap();
        let verify = signer.issue(1, TokenType::Verify).unwrap();

        assert_eq!(auth.expires_at - auth.issued_at, 60);
        assert_eq!(reset.expires_at - reset.issued_at, 120);
        assert_eq!(verify.expires_at - verify.issued_at, 180);
    }

    #[test]
    fn test_weak_secret_detection() {
        assert!(secret_is_weak(b"short"));
        assert!(secret_is_weak(b"secret"));
        assert!(secret_is_weak(b"changeme"));
        assert!(!secret_is_weak(b"0123456789abcdef0123456789abcdef"));
    }
}
