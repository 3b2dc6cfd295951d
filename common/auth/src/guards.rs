use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;

use crate::codec::TokenCodec;
use crate::error::AuthError;
use crate::extract::UserPrincipal;
use crate::roles::Role;

/// Check a resolved principal against a minimum role on the total order
/// `user < moderator < admin`.
pub fn ensure_role(principal: &UserPrincipal, min: Role) -> Result<(), AuthError> {
    if principal.role.satisfies(min) {
        Ok(())
    } else {
        Err(AuthError::InsufficientRole {
            required: min,
            actual: principal.role,
        })
    }
}

/// `requireRole(moderator)` as an extractor: resolves the principal, then
/// rejects with 403 unless the role is moderator or above.
#[derive(Debug, Clone)]
pub struct RequireModerator(pub UserPrincipal);

/// `requireAdmin`: admits only the top role.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub UserPrincipal);

#[async_trait]
impl<S> FromRequestParts<S> for RequireModerator
where
    Arc<TokenCodec>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let principal = UserPrincipal::from_request_parts(parts, state).await?;
        ensure_role(&principal, Role::Moderator)?;
        Ok(Self(principal))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequireAdmin
where
    Arc<TokenCodec>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let principal = UserPrincipal::from_request_parts(parts, state).await?;
        ensure_role(&principal, Role::Admin)?;
        Ok(Self(principal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn principal(role: Role) -> UserPrincipal {
        UserPrincipal {
            id: Uuid::new_v4(),
            email: "member@example.com".to_string(),
            role,
        }
    }

    #[test]
    fn moderator_gate_admits_moderator_and_admin() {
        assert!(ensure_role(&principal(Role::Moderator), Role::Moderator).is_ok());
        assert!(ensure_role(&principal(Role::Admin), Role::Moderator).is_ok());
    }

    #[test]
    fn moderator_gate_rejects_user() {
        let err = ensure_role(&principal(Role::User), Role::Moderator).expect_err("reject");
        assert!(matches!(
            err,
            AuthError::InsufficientRole {
                required: Role::Moderator,
                actual: Role::User,
            }
        ));
    }

    #[test]
    fn admin_gate_admits_only_admin() {
        assert!(ensure_role(&principal(Role::Admin), Role::Admin).is_ok());
        assert!(ensure_role(&principal(Role::Moderator), Role::Admin).is_err());
        assert!(ensure_role(&principal(Role::User), Role::Admin).is_err());
    }
}
