use fichario::{api, config, logging, store::DocumentStore, workflow::WorkflowService};
use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;

const PORT_RANGE: std::ops::RangeInclusive<u16> = 4500..=4599;

#[tokio::main]
async fn main() {
    config::init_config();
    logging::init_tracing();

    let store = DocumentStore::connect(Path::new(&config::get_config().database_path))
        .await
        .expect("Failed to open document store");
    let app = api::create_router(Arc::new(WorkflowService::new(store)));

    let (listener, port) = bind_listener().await.expect("Failed to bind listener");
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app).await.unwrap();
}

/// Bind the configured port, or walk the fallback range until one is free.
async fn bind_listener() -> Result<(TcpListener, u16), std::io::Error> {
    if let Some(port) = config::get_config().server_port {
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await?;
        return Ok((listener, port));
    }

    for port in PORT_RANGE {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => return Ok((listener, port)),
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        format!(
            "No available port in range {}-{}",
            PORT_RANGE.start(),
            PORT_RANGE.end()
        ),
    ))
}
