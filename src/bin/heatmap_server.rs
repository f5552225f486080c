use std::net::SocketAddr;

use rankgrid::{
    heatmap_config_from_env, heatmap_router, init_logging, log_app_bind, log_app_start,
    log_heatmap_config, logging_config_from_env,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logging_cfg = logging_config_from_env();
    init_logging(&logging_cfg)?;
    log_app_start(&logging_cfg);

    let heatmap_cfg = heatmap_config_from_env();
    heatmap_cfg.validate()?;
    log_heatmap_config(&heatmap_cfg);

    let addr: SocketAddr = std::env::var("RANKGRID_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
        .parse()?;

    let app = heatmap_router(heatmap_cfg);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    log_app_bind(bound_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
