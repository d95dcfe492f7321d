mod config;
mod gateway;
mod rate_limit;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::gateway::Upstream;
use crate::gateway::azure::AzureClient;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()
        .expect("invalid PORT");

    let config = config::GatewayConfig::from_env();

    // Missing config is non-fatal: the gateway answers with configuration
    // error envelopes until the variables are supplied.
    let upstream: Option<Arc<dyn Upstream>> = match AzureClient::from_config(&config) {
        Ok(Some(client)) => {
            tracing::info!(
                endpoint = config.endpoint.as_deref().unwrap_or(""),
                deployment = config.text_deployment.as_deref().unwrap_or(""),
                image_deployment = config.image_deployment.as_deref(),
                "upstream client initialized"
            );
            Some(Arc::new(client))
        }
        Ok(None) => {
            tracing::warn!("upstream not configured — gateway will return configuration errors");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "upstream client build failed");
            None
        }
    };

    let state = state::AppState::new(config, upstream);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "chatgate listening");
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .expect("server failed");
}
