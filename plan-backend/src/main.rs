use anyhow::Context;
use plan_backend::{create_app, AppState};
use plan_graph::CategoryTable;
use std::path::PathBuf;
use tracing::info;

const DEFAULT_ADDR: &str = "0.0.0.0:3000";

fn load_category_table() -> anyhow::Result<CategoryTable> {
    match std::env::var("PLAN_CATEGORY_TABLE") {
        Ok(path) => {
            let path = PathBuf::from(path);
            let table = CategoryTable::from_path(&path)
                .with_context(|| format!("failed to load category table from {}", path.display()))?;
            info!("Loaded {} room labels from {}", table.len(), path.display());
            Ok(table)
        }
        Err(_) => Ok(CategoryTable::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting Plan Graph Server");

    let app = create_app(AppState::new(load_category_table()?));

    let addr = std::env::var("PLAN_BACKEND_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
