use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::roles::Role;

/// Discriminates the two token shapes on the wire. A shop token presented to
/// a user-only route (or vice versa) must fail verification rather than be
/// reinterpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    User,
    Shop,
}

/// Claim payload for platform-user tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: Uuid,
    pub email: String,
    /// Absent in tokens minted before roles existed; treated as `user`.
    #[serde(default)]
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
    pub typ: TokenKind,
}

/// Claim payload for tenant-shop tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopClaims {
    #[serde(rename = "sid")]
    pub shop_id: Uuid,
    #[serde(rename = "sname")]
    pub shop_name: String,
    pub iat: i64,
    pub exp: i64,
    pub typ: TokenKind,
}
