use std::sync::Arc;

use axum::extract::FromRef;
use common_auth::{ShopDirectory, TokenCodec};

use crate::config::ServiceConfig;
use crate::invitations::InvitationService;

/// Shared application state. The Postgres pool lives inside the stores;
/// nothing above them touches the database directly.
#[derive(Clone)]
pub struct AppState {
    pub codec: Arc<TokenCodec>,
    pub shops: Arc<dyn ShopDirectory>,
    pub invitations: Arc<InvitationService>,
    pub config: Arc<ServiceConfig>,
}

impl FromRef<AppState> for Arc<TokenCodec> {
    fn from_ref(state: &AppState) -> Self {
        state.codec.clone()
    }
}

impl FromRef<AppState> for Arc<dyn ShopDirectory> {
    fn from_ref(state: &AppState) -> Self {
        state.shops.clone()
    }
}
