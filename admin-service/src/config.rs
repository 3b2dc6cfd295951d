use std::env;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration as StdDuration;

use anyhow::{anyhow, Context, Result};
use chrono::Duration;
use common_auth::TokenConfig;

const DEFAULT_PORT: u16 = 8086;
const DEFAULT_SHOP_LOOKUP_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_INVITE_SCHEME: &str = "marketbase://invite";

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub database_url: String,
    /// Symmetric signing secret. Mandatory; there is deliberately no
    /// fallback value, so a deployment without an explicit secret refuses
    /// to start.
    pub token_secret: String,
    pub tokens: TokenConfig,
    pub invitation_ttl: Duration,
    pub shop_lookup_timeout: StdDuration,
    pub invite_link_scheme: String,
    pub bind_addr: SocketAddr,
    pub cors_origins: Vec<String>,
}

pub fn load_config() -> Result<ServiceConfig> {
    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    let token_secret = env::var("AUTH_TOKEN_SECRET")
        .map_err(|_| anyhow!("AUTH_TOKEN_SECRET must be set; refusing to start with no signing secret"))?;
    if token_secret.trim().len() < 16 {
        return Err(anyhow!(
            "AUTH_TOKEN_SECRET is too short ({} bytes); supply at least 16",
            token_secret.trim().len()
        ));
    }

    let tokens = TokenConfig::default()
        .with_user_ttl(duration_from_env("AUTH_USER_TOKEN_TTL_DAYS")?.unwrap_or(Duration::days(7)))
        .with_shop_ttl(duration_from_env("AUTH_SHOP_TOKEN_TTL_DAYS")?.unwrap_or(Duration::days(7)));

    let invitation_ttl =
        duration_from_env("INVITATION_TTL_DAYS")?.unwrap_or(Duration::days(7));

    let shop_lookup_timeout = StdDuration::from_millis(
        env::var("SHOP_LOOKUP_TIMEOUT_MS")
            .ok()
            .map(|value| value.parse::<u64>())
            .transpose()
            .context("Failed to parse SHOP_LOOKUP_TIMEOUT_MS")?
            .unwrap_or(DEFAULT_SHOP_LOOKUP_TIMEOUT_MS),
    );

    let invite_link_scheme =
        env::var("INVITE_LINK_SCHEME").unwrap_or_else(|_| DEFAULT_INVITE_SCHEME.to_string());

    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .ok()
        .map(|value| value.parse())
        .transpose()
        .context("Failed to parse PORT")?
        .unwrap_or(DEFAULT_PORT);
    let ip: IpAddr = host
        .parse()
        .with_context(|| format!("Invalid HOST '{host}'"))?;

    let cors_origins = env::var("CORS_ALLOWED_ORIGINS")
        .ok()
        .map(|value| {
            value
                .split(',')
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    Ok(ServiceConfig {
        database_url,
        token_secret,
        tokens,
        invitation_ttl,
        shop_lookup_timeout,
        invite_link_scheme,
        bind_addr: SocketAddr::from((ip, port)),
        cors_origins,
    })
}

fn duration_from_env(key: &str) -> Result<Option<Duration>> {
    let days = env::var(key)
        .ok()
        .map(|value| value.parse::<i64>())
        .transpose()
        .with_context(|| format!("Failed to parse {key}"))?;

    match days {
        Some(days) if days <= 0 => Err(anyhow!("{key} must be a positive number of days")),
        Some(days) => Ok(Some(Duration::days(days))),
        None => Ok(None),
    }
}
