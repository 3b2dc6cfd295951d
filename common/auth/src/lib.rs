pub mod claims;
pub mod codec;
pub mod config;
pub mod error;
pub mod extract;
pub mod guards;
pub mod roles;
pub mod shops;

pub use claims::{ShopClaims, TokenKind, UserClaims};
pub use codec::{TokenCodec, VerificationError};
pub use config::TokenConfig;
pub use error::{AuthError, AuthResult};
pub use extract::{resolve_shop, resolve_user, Principal, ShopPrincipal, UserPrincipal};
pub use guards::{ensure_role, RequireAdmin, RequireModerator};
pub use roles::Role;
pub use shops::{ShopDirectory, ShopDirectoryError, ShopRecord};
