#[cfg(feature = "http_api")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::net::SocketAddr;

    use gantt_planner::persistence::{JsonPlanStore, PlanStore};
    use gantt_planner::{PlannerConfig, TaskStore, diagnostics, http_api};

    diagnostics::init_tracing("info", None)?;

    let config = PlannerConfig::from_env()?;
    let addr: SocketAddr = config.http_addr.parse()?;
    if let Some(backend) = config.source.backend_label() {
        tracing::info!(%backend, "source backend configured");
    }

    let store = match &config.store_path {
        Some(path) => JsonPlanStore::new(path).load_plan()?.unwrap_or_default(),
        None => TaskStore::new(),
    };

    println!("gantt-planner HTTP API listening on http://{addr}");
    http_api::serve(addr, store).await?;
    Ok(())
}

#[cfg(not(feature = "http_api"))]
fn main() {
    eprintln!("Rebuild with the `http_api` feature to enable the HTTP server.");
}
