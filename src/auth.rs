use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{info, warn};

static BEARER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[Bb]earer (\S+)$").unwrap());

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<usize>,
}

/// Checks that a comment's claimed email is backed by a token signed with
/// the shared secret. A failed check only marks the comment unverified.
#[derive(Clone)]
pub struct IdentityVerifier {
    secret: String,
}

impl IdentityVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into() }
    }

    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        // exp is honoured when present but tokens without one are accepted
        validation.required_spec_claims = HashSet::new();
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation
    }

    fn decode_jwt(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Self::validation(),
        )?;
        Ok(data.claims)
    }

    pub fn verify(&self, email: &str, authorization: Option<&str>) -> bool {
        let Some(header) = authorization else {
            info!("no authorization header");
            return false;
        };
        let Some(token) = BEARER.captures(header).and_then(|c| c.get(1)) else {
            info!("not a bearer authorization header");
            return false;
        };
        let claims = match self.decode_jwt(token.as_str()) {
            Ok(claims) => claims,
            Err(e) => {
                warn!(error = %e, "error verifying JWT");
                return false;
            }
        };
        let matches = claims.email.as_deref() == Some(email);
        info!(claimed = ?claims.email, submitted = email, matches, "checked token email");
        matches
    }

    /// Mint a token accepted by [`IdentityVerifier::verify`].
    pub fn issue_token(&self, email: &str, ttl: chrono::Duration) -> Result<String, jsonwebtoken::errors::Error> {
        let exp = chrono::Utc::now()
            .checked_add_signed(ttl)
            .map(|t| t.timestamp() as usize);
        let claims = Claims { email: Some(email.to_string()), exp };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
    }
}
