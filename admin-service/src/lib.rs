pub mod app;
pub mod config;
pub mod handlers;
pub mod invitations;
pub mod router;
pub mod shops;

pub use app::AppState;
