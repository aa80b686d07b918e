// FICHIER : src-server/src/utils/config.rs

use crate::utils::{env, json, AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Nombre de sauvegardes complètes conservées par défaut.
pub const DEFAULT_BACKUP_RETENTION: usize = 20;

/// Configuration du backend, construite une fois au démarrage puis passée
/// explicitement aux composants (pas de singleton global).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Dossier des jeux de données, des sauvegardes et du journal d'activité.
    pub data_dir: PathBuf,
    pub bind_addr: String,
    /// Plafond de rotation, appliqué séparément à chaque famille de bundle.
    pub backup_retention: usize,
    pub log_level: String,
    /// Si présent, logs techniques JSON en rotation journalière.
    pub log_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            bind_addr: "127.0.0.1:8080".to_string(),
            backup_retention: DEFAULT_BACKUP_RETENTION,
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl AppConfig {
    /// Configuration pointant sur un dossier de données donné (tests, CLI).
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Défauts -> fichier JSON optionnel (`SAFD_CONFIG`) -> variables d'environnement.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = match env::get_optional("SAFD_CONFIG") {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.check()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Lecture de {} impossible : {}", path.display(), e))
        })?;
        json::parse(&content)
            .map_err(|e| AppError::Config(format!("{} invalide : {}", path.display(), e)))
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(dir) = env::get_optional("SAFD_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        self.bind_addr = env::get_or("SAFD_BIND_ADDR", &self.bind_addr);
        if let Some(retention) = env::get_parsed::<usize>("SAFD_BACKUP_RETENTION")? {
            self.backup_retention = retention;
        }
        self.log_level = env::get_or("SAFD_LOG_LEVEL", &self.log_level);
        if let Some(dir) = env::get_optional("SAFD_LOG_DIR") {
            self.log_dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    fn check(&self) -> Result<()> {
        if self.backup_retention == 0 {
            return Err(AppError::Config(
                "backup_retention doit être strictement positif".to_string(),
            ));
        }
        Ok(())
    }
}
