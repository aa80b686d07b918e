// FICHIER : src-server/src/utils/mod.rs

// =========================================================================
//  SAFD UTILS - Foundation Layer
// =========================================================================

pub mod clock;
pub mod config;
pub mod env;
pub mod error;
pub mod fs;
pub mod json;
pub mod logger;

/// **Le Prélude** : À utiliser via `use crate::utils::prelude::*;`
pub mod prelude {
    pub use super::config::AppConfig;
    pub use super::error::{AppError, Result};
    pub use super::json::{json, Map, Value};
    pub use serde::{Deserialize, Serialize};
    pub use tracing::{debug, error, info, instrument, warn};
}

// --> Config & Erreurs
pub use config::AppConfig;
pub use error::{AppError, Result};
pub use logger::init_logging;
