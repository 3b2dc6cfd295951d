use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// A live row from the tenant registry.
#[derive(Debug, Clone)]
pub struct ShopRecord {
    pub id: Uuid,
    pub name: String,
}

/// Live view of the tenant registry. Shop tokens outlive shop deletion, so
/// every shop-principal resolution re-checks existence through this trait;
/// implementations must not cache results across requests.
#[async_trait]
pub trait ShopDirectory: Send + Sync {
    async fn find_shop(&self, shop_id: Uuid) -> Result<Option<ShopRecord>, ShopDirectoryError>;
}

#[derive(Debug, Error)]
pub enum ShopDirectoryError {
    #[error("shop lookup timed out")]
    Timeout,
    #[error("shop lookup failed: {0}")]
    Query(String),
}
