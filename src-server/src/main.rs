// FICHIER : src-server/src/main.rs

use safd::api::http;
use safd::utils::error::{AnyResult, Context};
use safd::utils::{init_logging, AppConfig};
use safd::Engine;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> AnyResult<()> {
    let config = AppConfig::load().context("Configuration SAFD invalide")?;
    init_logging(&config);
    info!("🚀 Démarrage de safd-server v{}", env!("CARGO_PKG_VERSION"));

    let engine = Engine::open(&config)
        .await
        .with_context(|| format!("Ouverture de {} impossible", config.data_dir.display()))?;

    http::serve(Arc::new(engine), &config.bind_addr).await
}
