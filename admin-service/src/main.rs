use std::sync::Arc;

use common_auth::TokenCodec;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing::info;

use admin_service::config::load_config;
use admin_service::invitations::{InvitationService, PgInvitationStore};
use admin_service::router::build_router;
use admin_service::shops::PgShopDirectory;
use admin_service::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Fails here when AUTH_TOKEN_SECRET is absent; there is no default.
    let config = load_config()?;

    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;

    let codec = Arc::new(TokenCodec::new(&config.token_secret));
    let shops = Arc::new(PgShopDirectory::new(db.clone(), config.shop_lookup_timeout));
    let invitations = Arc::new(InvitationService::new(Arc::new(PgInvitationStore::new(db))));

    let addr = config.bind_addr;
    let state = AppState {
        codec,
        shops,
        invitations,
        config: Arc::new(config),
    };

    let app = build_router(state);

    info!(%addr, "starting admin-service");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
