use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result as AnyResult};
use bursar_gateway::router;
use bursar_platform::{PgStore, ServiceConfig, connect_database, run_migrations};
use bursar_workflow::BursarService;
use tracing::info;

#[tokio::main]
async fn main() -> AnyResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "bursar_gateway=info,bursar_workflow=info".to_string()),
        )
        .init();

    let config = ServiceConfig::from_env()?;
    let pool = connect_database(&config).await?;
    if config.run_migrations {
        run_migrations(&pool).await?;
    }

    let service = BursarService::new(Arc::new(PgStore::new(pool)));
    let app = router(service);

    let addr: SocketAddr = config
        .http_addr
        .parse()
        .with_context(|| format!("HTTP_ADDR {:?} is not a socket address", config.http_addr))?;
    info!("gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
