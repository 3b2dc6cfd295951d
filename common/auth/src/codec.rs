use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::claims::{ShopClaims, TokenKind, UserClaims};
use crate::roles::Role;

/// Why a token failed verification. Callers must treat all three variants as
/// a single "invalid token" outcome at the HTTP boundary; the distinction
/// exists for diagnostics only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature does not match")]
    BadSignature,
    #[error("token has expired")]
    Expired,
}

impl From<jsonwebtoken::errors::Error> for VerificationError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match value.kind() {
            ErrorKind::ExpiredSignature => VerificationError::Expired,
            ErrorKind::InvalidSignature => VerificationError::BadSignature,
            _ => VerificationError::Malformed,
        }
    }
}

/// Signs and verifies the platform's bearer tokens with a single symmetric
/// secret. Stateless; cheap to clone behind an `Arc` in app state.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenCodec {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issue a user token valid for `ttl` from now.
    pub fn sign_user(
        &self,
        id: Uuid,
        email: impl Into<String>,
        role: Role,
        ttl: Duration,
    ) -> Result<String, VerificationError> {
        let now = Utc::now();
        let claims = UserClaims {
            sub: id,
            email: email.into(),
            role,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            typ: TokenKind::User,
        };
        self.sign(&claims)
    }

    /// Issue a shop token valid for `ttl` from now.
    pub fn sign_shop(
        &self,
        shop_id: Uuid,
        shop_name: impl Into<String>,
        ttl: Duration,
    ) -> Result<String, VerificationError> {
        let now = Utc::now();
        let claims = ShopClaims {
            shop_id,
            shop_name: shop_name.into(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            typ: TokenKind::Shop,
        };
        self.sign(&claims)
    }

    pub fn verify_user(&self, token: &str) -> Result<UserClaims, VerificationError> {
        self.verify_user_at(token, Utc::now())
    }

    pub fn verify_shop(&self, token: &str) -> Result<ShopClaims, VerificationError> {
        self.verify_shop_at(token, Utc::now())
    }

    fn verify_user_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<UserClaims, VerificationError> {
        let claims: UserClaims = self.decode(token)?;
        if claims.typ != TokenKind::User {
            debug!("rejected non-user token on user verification path");
            return Err(VerificationError::Malformed);
        }
        check_expiry(claims.exp, now)?;
        Ok(claims)
    }

    fn verify_shop_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<ShopClaims, VerificationError> {
        let claims: ShopClaims = self.decode(token)?;
        if claims.typ != TokenKind::Shop {
            debug!("rejected non-shop token on shop verification path");
            return Err(VerificationError::Malformed);
        }
        check_expiry(claims.exp, now)?;
        Ok(claims)
    }

    fn sign<T: Serialize>(&self, claims: &T) -> Result<String, VerificationError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(VerificationError::from)
    }

    fn decode<T: DeserializeOwned>(&self, token: &str) -> Result<T, VerificationError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against an explicit clock in check_expiry; the
        // library's own exp validation would reintroduce its leeway window.
        validation.validate_exp = false;
        let data = decode::<T>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }
}

/// No skew window: exp == now still verifies, exp < now does not.
fn check_expiry(exp: i64, now: DateTime<Utc>) -> Result<(), VerificationError> {
    if now.timestamp() > exp {
        return Err(VerificationError::Expired);
    }
    Ok(())
}
