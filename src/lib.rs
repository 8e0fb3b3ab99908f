pub mod adapters;
pub mod client;
pub mod config;
pub mod ports;
pub mod push;
pub mod push_types;
pub mod state;

mod app;

pub use app::app;
pub use push::vapid::{VapidKeys, generate_vapid_keys};

use std::net::SocketAddr;

pub async fn serve(addr: SocketAddr, config: config::AppConfig) {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app(config)).await.expect("server error");
}
