pub mod api_response;
pub mod config;
mod download_routes;
mod http_layers;
pub mod metrics;
mod payment_routes;
pub mod server;
pub mod session;
pub mod state;

pub use config::ServerConfig;
pub use http_layers::*;
pub use server::{make_app, run_server};
