use std::time::Duration;

use async_trait::async_trait;
use common_auth::{ShopDirectory, ShopDirectoryError, ShopRecord};
use sqlx::{PgPool, Row};
use tracing::warn;
use uuid::Uuid;

/// Shop lookup against the platform's tenant table. Deliberately uncached:
/// a deleted shop must stop authorizing on the next request, even while its
/// tokens are still structurally valid.
pub struct PgShopDirectory {
    pool: PgPool,
    timeout: Duration,
}

impl PgShopDirectory {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[async_trait]
impl ShopDirectory for PgShopDirectory {
    async fn find_shop(&self, shop_id: Uuid) -> Result<Option<ShopRecord>, ShopDirectoryError> {
        let query = sqlx::query("SELECT id, name FROM shops WHERE id = $1")
            .bind(shop_id)
            .fetch_optional(&self.pool);

        let row = tokio::time::timeout(self.timeout, query)
            .await
            .map_err(|_| {
                warn!(shop_id = %shop_id, "shop lookup timed out");
                ShopDirectoryError::Timeout
            })?
            .map_err(|err| ShopDirectoryError::Query(err.to_string()))?;

        match row {
            Some(row) => {
                let id = row
                    .try_get("id")
                    .map_err(|err| ShopDirectoryError::Query(err.to_string()))?;
                let name = row
                    .try_get("name")
                    .map_err(|err| ShopDirectoryError::Query(err.to_string()))?;
                Ok(Some(ShopRecord { id, name }))
            }
            None => Ok(None),
        }
    }
}
