use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::{header::AUTHORIZATION, request::Parts};
use tracing::warn;
use uuid::Uuid;

use crate::codec::TokenCodec;
use crate::error::{AuthError, AuthResult};
use crate::roles::Role;
use crate::shops::ShopDirectory;

/// Authenticated platform user, reconstructed per request from a verified
/// bearer token. Using this as an extractor is the `requireAuthenticated`
/// gate: the handler never runs if resolution fails.
#[derive(Debug, Clone)]
pub struct UserPrincipal {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

/// Authenticated tenant shop. Unlike [`UserPrincipal`], resolution includes
/// a live existence check against the shop directory.
#[derive(Debug, Clone)]
pub struct ShopPrincipal {
    pub shop_id: Uuid,
    pub shop_name: String,
}

/// Either principal kind, for code paths shared between the two surfaces.
#[derive(Debug, Clone)]
pub enum Principal {
    User(UserPrincipal),
    Shop(ShopPrincipal),
}

/// Resolve a user principal from a raw bearer token. Pure; no I/O.
pub fn resolve_user(codec: &TokenCodec, token: &str) -> AuthResult<UserPrincipal> {
    let claims = codec.verify_user(token)?;
    Ok(UserPrincipal {
        id: claims.sub,
        email: claims.email,
        role: claims.role,
    })
}

/// Resolve a shop principal: verify the token, then confirm the shop still
/// exists. A directory failure is fail-closed, never an implicit allow.
pub async fn resolve_shop(
    codec: &TokenCodec,
    directory: &dyn ShopDirectory,
    token: &str,
) -> AuthResult<ShopPrincipal> {
    let claims = codec.verify_shop(token)?;
    let record = directory.find_shop(claims.shop_id).await.map_err(|err| {
        warn!(shop_id = %claims.shop_id, error = %err, "shop existence check failed");
        AuthError::Store(err.to_string())
    })?;
    if record.is_none() {
        return Err(AuthError::UnknownShop(claims.shop_id));
    }
    Ok(ShopPrincipal {
        shop_id: claims.shop_id,
        shop_name: claims.shop_name,
    })
}

#[async_trait]
impl<S> FromRequestParts<S> for UserPrincipal
where
    Arc<TokenCodec>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let codec = Arc::<TokenCodec>::from_ref(state);
        let token = bearer_token(parts)?;
        resolve_user(&codec, &token)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ShopPrincipal
where
    Arc<TokenCodec>: FromRef<S>,
    Arc<dyn ShopDirectory>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let codec = Arc::<TokenCodec>::from_ref(state);
        let directory = Arc::<dyn ShopDirectory>::from_ref(state);
        let token = bearer_token(parts)?;
        resolve_shop(&codec, directory.as_ref(), &token).await
    }
}

fn bearer_token(parts: &Parts) -> AuthResult<String> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?;
    parse_bearer(header)
}

fn parse_bearer(value: &axum::http::HeaderValue) -> AuthResult<String> {
    let raw = value
        .to_str()
        .map_err(|_| AuthError::MalformedAuthorization)?
        .trim();

    let token = raw
        .strip_prefix("Bearer ")
        .ok_or(AuthError::MalformedAuthorization)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::MalformedAuthorization);
    }

    Ok(token.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::VerificationError;
    use crate::shops::{ShopDirectoryError, ShopRecord};
    use axum::http::HeaderValue;
    use chrono::Duration;

    struct StaticDirectory {
        known: Vec<ShopRecord>,
        fail: bool,
    }

    #[async_trait]
    impl ShopDirectory for StaticDirectory {
        async fn find_shop(
            &self,
            shop_id: Uuid,
        ) -> Result<Option<ShopRecord>, ShopDirectoryError> {
            if self.fail {
                return Err(ShopDirectoryError::Timeout);
            }
            Ok(self
                .known
                .iter()
                .find(|record| record.id == shop_id)
                .cloned())
        }
    }

    #[test]
    fn parse_bearer_accepts_valid_token() {
        let header = HeaderValue::from_static("Bearer abc.def.ghi");
        assert_eq!(parse_bearer(&header).expect("token"), "abc.def.ghi");
    }

    #[test]
    fn parse_bearer_rejects_wrong_scheme() {
        let header = HeaderValue::from_static("Basic credentials");
        let err = parse_bearer(&header).expect_err("should reject");
        assert!(matches!(err, AuthError::MalformedAuthorization));
    }

    #[test]
    fn parse_bearer_rejects_empty_value() {
        let header = HeaderValue::from_static("Bearer    ");
        let err = parse_bearer(&header).expect_err("should reject empty token");
        assert!(matches!(err, AuthError::MalformedAuthorization));
    }

    #[test]
    fn resolve_user_maps_claims() {
        let codec = TokenCodec::new("secret");
        let id = Uuid::new_v4();
        let token = codec
            .sign_user(id, "ops@example.com", Role::Admin, Duration::days(1))
            .expect("sign");
        let principal = resolve_user(&codec, &token).expect("resolve");
        assert_eq!(principal.id, id);
        assert_eq!(principal.email, "ops@example.com");
        assert_eq!(principal.role, Role::Admin);
    }

    #[tokio::test]
    async fn resolve_shop_confirms_existence() {
        let codec = TokenCodec::new("secret");
        let shop_id = Uuid::new_v4();
        let token = codec
            .sign_shop(shop_id, "Corner Store", Duration::days(1))
            .expect("sign");
        let directory = StaticDirectory {
            known: vec![ShopRecord {
                id: shop_id,
                name: "Corner Store".to_string(),
            }],
            fail: false,
        };
        let principal = resolve_shop(&codec, &directory, &token)
            .await
            .expect("resolve");
        assert_eq!(principal.shop_id, shop_id);
        assert_eq!(principal.shop_name, "Corner Store");
    }

    #[tokio::test]
    async fn deleted_shop_does_not_authorize() {
        let codec = TokenCodec::new("secret");
        let shop_id = Uuid::new_v4();
        let token = codec
            .sign_shop(shop_id, "Ghost Shop", Duration::days(1))
            .expect("sign");
        let directory = StaticDirectory {
            known: vec![],
            fail: false,
        };
        let err = resolve_shop(&codec, &directory, &token)
            .await
            .expect_err("must reject");
        assert!(matches!(err, AuthError::UnknownShop(id) if id == shop_id));
    }

    #[tokio::test]
    async fn directory_failure_is_fail_closed() {
        let codec = TokenCodec::new("secret");
        let token = codec
            .sign_shop(Uuid::new_v4(), "Corner Store", Duration::days(1))
            .expect("sign");
        let directory = StaticDirectory {
            known: vec![],
            fail: true,
        };
        let err = resolve_shop(&codec, &directory, &token)
            .await
            .expect_err("must reject");
        assert!(matches!(err, AuthError::Store(_)));
    }

    #[tokio::test]
    async fn expired_shop_token_skips_directory() {
        let codec = TokenCodec::new("secret");
        let token = codec
            .sign_shop(Uuid::new_v4(), "Corner Store", Duration::seconds(-60))
            .expect("sign");
        // Directory would error, but verification fails first.
        let directory = StaticDirectory {
            known: vec![],
            fail: true,
        };
        let err = resolve_shop(&codec, &directory, &token)
            .await
            .expect_err("must reject");
        assert!(matches!(
            err,
            AuthError::Verification(VerificationError::Expired)
        ));
    }
}
