use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

use crate::handlers::{
    accept_invitation, admin_ping, create_invitation, issue_shop_token, issue_user_token,
    list_invitations, lookup_invitation, me, moderation_ping, shop_me,
};
use crate::AppState;

async fn health() -> &'static str {
    "ok"
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/healthz", get(health))
        .route("/invitations", post(create_invitation).get(list_invitations))
        .route("/invitations/:token", get(lookup_invitation))
        .route("/invitations/:token/accept", post(accept_invitation))
        .route("/me", get(me))
        .route("/shop/me", get(shop_me))
        .route("/admin/ping", get(admin_ping))
        .route("/admin/user-tokens", post(issue_user_token))
        .route("/admin/shop-tokens", post(issue_shop_token))
        .route("/moderation/ping", get(moderation_ping))
        .with_state(state)
        .layer(cors)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([ACCEPT, CONTENT_TYPE, AUTHORIZATION])
}
