use chrono::Duration;

const DEFAULT_TTL_DAYS: i64 = 7;

/// Token lifetimes for the two principal kinds.
///
/// The signing secret deliberately does not live here: it is loaded by the
/// service configuration, which refuses to start without an explicit value.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub user_ttl: Duration,
    pub shop_ttl: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            user_ttl: Duration::days(DEFAULT_TTL_DAYS),
            shop_ttl: Duration::days(DEFAULT_TTL_DAYS),
        }
    }
}

impl TokenConfig {
    pub fn with_user_ttl(mut self, ttl: Duration) -> Self {
        self.user_ttl = ttl;
        self
    }

    pub fn with_shop_ttl(mut self, ttl: Duration) -> Self {
        self.shop_ttl = ttl;
        self
    }
}
