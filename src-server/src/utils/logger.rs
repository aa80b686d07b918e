// FICHIER : src-server/src/utils/logger.rs

use crate::utils::config::AppConfig;
use std::sync::Once;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

// Sécurité pour éviter la double initialisation (crash fréquent en tests)
static INIT: Once = Once::new();

pub fn init_logging(config: &AppConfig) {
    INIT.call_once(|| {
        // =========================================================================
        // LAYER 1 : FICHIER JSON (optionnel)
        // =========================================================================
        let file_layer = config.log_dir.as_ref().map(|log_dir| {
            std::fs::create_dir_all(log_dir).ok();
            fmt::layer()
                .json()
                .with_writer(rolling::daily(log_dir, "safd.log"))
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
        });

        // =========================================================================
        // LAYER 2 : CONSOLE
        // =========================================================================
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));

        let console_layer = fmt::layer()
            .compact()
            .with_target(false)
            .with_filter(env_filter);

        let registry = tracing_subscriber::registry()
            .with(file_layer)
            .with(console_layer);

        if registry.try_init().is_err() {
            tracing::warn!("[Logger] Ré-initialisation ignorée (subscriber global déjà actif).");
            return;
        }

        tracing::info!(
            log_dir = ?config.log_dir,
            level = %config.log_level,
            "Logger initialisé"
        );
    });
}
