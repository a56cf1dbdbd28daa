//! Signed, time-bounded bearer tokens.
//!
//! Tokens are compact JWTs signed with HMAC-SHA256:
//! `base64url(header) "." base64url(claims) "." base64url(signature)`, all
//! without padding. Validation is stateless; a token stays valid until its
//! `exp` claim passes.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::Sha256;

use crate::config::{AuthConfig, ConfigError, ENV_JWT_SECRET};
use crate::models::StudentId;
use crate::Error;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "HS256";

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub student_id: StudentId,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

/// Issues and validates session tokens with a single process-wide key.
#[derive(Clone)]
pub struct TokenIssuer {
    mac: HmacSha256,
    ttl: chrono::Duration,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Result<Self, ConfigError> {
        let mac = <HmacSha256 as Mac>::new_from_slice(config.signing_secret()).map_err(|_| {
            ConfigError::Invalid {
                key: ENV_JWT_SECRET,
                value: "<redacted>".to_string(),
                reason: "unusable HMAC key",
            }
        })?;
        Ok(Self {
            mac,
            ttl: config.token_ttl(),
        })
    }

    pub fn issue(&self, student_id: StudentId) -> Result<String, Error> {
        self.issue_at(student_id, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(&self, student_id: StudentId, now: DateTime<Utc>) -> Result<String, Error> {
        let header = Header {
            alg: ALGORITHM.to_string(),
            typ: "JWT".to_string(),
        };
        let claims = Claims {
            student_id,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        let signing_input = format!("{}.{}", encode_segment(&header)?, encode_segment(&claims)?);
        let signature = URL_SAFE_NO_PAD.encode(self.sign(signing_input.as_bytes()));
        Ok(format!("{}.{}", signing_input, signature))
    }

    pub fn validate(&self, token: &str) -> Result<StudentId, Error> {
        self.validate_at(token, Utc::now())
    }

    /// Validate `token` as if the current time were `now`.
    ///
    /// The signature is checked before the claims are decoded, so a forged
    /// token never reaches the expiry check. A token is accepted up to and
    /// including the second named by `exp`.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<StudentId, Error> {
        let (signing_input, signature) = token.rsplit_once('.').ok_or(Error::TokenInvalid)?;
        let (header, payload) = signing_input.split_once('.').ok_or(Error::TokenInvalid)?;

        let header: Header = decode_segment(header)?;
        if header.alg != ALGORITHM {
            return Err(Error::TokenInvalid);
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| Error::TokenInvalid)?;
        let mut mac = self.mac.clone();
        mac.update(signing_input.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| Error::TokenInvalid)?;

        let claims: Claims = decode_segment(payload)?;
        if now.timestamp() > claims.exp {
            return Err(Error::TokenExpired);
        }

        Ok(claims.student_id)
    }

    fn sign(&self, input: &[u8]) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(input);
        mac.finalize().into_bytes().to_vec()
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

fn encode_segment<T: Serialize>(value: &T) -> Result<String, Error> {
    let json = serde_json::to_vec(value)
        .map_err(|e| Error::Worker(format!("failed to encode token segment: {}", e)))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_segment<T: DeserializeOwned>(segment: &str) -> Result<T, Error> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| Error::TokenInvalid)?;
    serde_json::from_slice(&bytes).map_err(|_| Error::TokenInvalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn issuer(secret: &str) -> TokenIssuer {
        TokenIssuer::new(&AuthConfig::new(secret).unwrap()).unwrap()
    }

    #[test]
    fn round_trips_student_id() {
        let issuer = issuer("secret");
        let token = issuer.issue(StudentId::new(42)).unwrap();
        assert_eq!(issuer.validate(&token).unwrap(), StudentId::new(42));
    }

    #[test]
    fn token_has_three_segments() {
        let token = issuer("secret").issue(StudentId::new(1)).unwrap();
        assert_eq!(token.split('.').count(), 3);
        assert!(!token.contains('='));
    }

    #[test]
    fn expires_after_72_hours() {
        let issuer = issuer("secret");
        let issued = Utc::now();
        let token = issuer.issue_at(StudentId::new(7), issued).unwrap();

        let just_before = issued + Duration::hours(72);
        assert_eq!(
            issuer.validate_at(&token, just_before).unwrap(),
            StudentId::new(7)
        );

        let after = issued + Duration::hours(72) + Duration::seconds(1);
        assert!(matches!(
            issuer.validate_at(&token, after),
            Err(Error::TokenExpired)
        ));
    }

    #[test]
    fn honours_configured_ttl() {
        let config = AuthConfig::new("secret")
            .unwrap()
            .with_token_ttl(Duration::minutes(5));
        let issuer = TokenIssuer::new(&config).unwrap();
        let issued = Utc::now();
        let token = issuer.issue_at(StudentId::new(7), issued).unwrap();
        assert!(matches!(
            issuer.validate_at(&token, issued + Duration::minutes(6)),
            Err(Error::TokenExpired)
        ));
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let token = issuer("secret-a").issue(StudentId::new(1)).unwrap();
        assert!(matches!(
            issuer("secret-b").validate(&token),
            Err(Error::TokenInvalid)
        ));
    }

    #[test]
    fn rejects_tampered_claims() {
        let issuer = issuer("secret");
        let token = issuer.issue(StudentId::new(1)).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let forged_claims = Claims {
            student_id: StudentId::new(2),
            iat: Utc::now().timestamp(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
        };
        let forged = format!(
            "{}.{}.{}",
            parts[0],
            encode_segment(&forged_claims).unwrap(),
            parts[2]
        );

        assert!(matches!(issuer.validate(&forged), Err(Error::TokenInvalid)));
    }

    #[test]
    fn rejects_tampered_signature() {
        let issuer = issuer("secret");
        let mut token = issuer.issue(StudentId::new(1)).unwrap();
        let last = token.pop().unwrap();
        token.push(if last == 'A' { 'B' } else { 'A' });
        assert!(matches!(issuer.validate(&token), Err(Error::TokenInvalid)));
    }

    #[test]
    fn expired_forgery_is_invalid_not_expired() {
        let token = issuer("secret-a")
            .issue_at(StudentId::new(1), Utc::now() - Duration::days(30))
            .unwrap();
        assert!(matches!(
            issuer("secret-b").validate(&token),
            Err(Error::TokenInvalid)
        ));
    }

    #[test]
    fn rejects_unsigned_algorithm() {
        let issuer = issuer("secret");
        let header = encode_segment(&Header {
            alg: "none".to_string(),
            typ: "JWT".to_string(),
        })
        .unwrap();
        let claims = encode_segment(&Claims {
            student_id: StudentId::new(1),
            iat: Utc::now().timestamp(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
        })
        .unwrap();
        let token = format!("{}.{}.", header, claims);
        assert!(matches!(issuer.validate(&token), Err(Error::TokenInvalid)));
    }

    #[test]
    fn rejects_missing_claim() {
        let issuer = issuer("secret");
        let header = encode_segment(&Header {
            alg: ALGORITHM.to_string(),
            typ: "JWT".to_string(),
        })
        .unwrap();
        let claims = encode_segment(&serde_json::json!({ "exp": i64::MAX })).unwrap();
        let signing_input = format!("{}.{}", header, claims);
        let signature = URL_SAFE_NO_PAD.encode(issuer.sign(signing_input.as_bytes()));
        let token = format!("{}.{}", signing_input, signature);

        assert!(matches!(issuer.validate(&token), Err(Error::TokenInvalid)));
    }

    #[test]
    fn rejects_malformed_tokens() {
        let issuer = issuer("secret");
        for token in ["", "abc", "a.b", "a.b.c", "a.b.c.d", "...", "Bearer x.y.z"] {
            assert!(
                matches!(issuer.validate(token), Err(Error::TokenInvalid)),
                "{token:?} should be invalid"
            );
        }
    }
}
