// FICHIER : src-server/src/datasets/storage.rs

//! Persistance d'un jeu de données : un fichier JSON par type.
//! Aucune logique de sauvegarde ici, uniquement lecture/écriture/suppression.

use super::registry::{DatasetRegistry, DatasetType};
use crate::utils::clock;
use crate::utils::fs;
use crate::utils::json::{self, Value};
use crate::utils::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{instrument, warn};

/// Contenu courant d'un jeu de données.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDataset {
    pub value: Value,
    /// Date de modification du fichier, `None` si la valeur par défaut a été servie.
    pub modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetStats {
    pub count: usize,
    pub last_modified: Option<String>,
    pub size: u64,
}

#[derive(Debug, Clone)]
pub struct DatasetStore {
    registry: Arc<DatasetRegistry>,
}

impl DatasetStore {
    pub fn new(registry: Arc<DatasetRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &DatasetRegistry {
        &self.registry
    }

    pub async fn exists(&self, kind: DatasetType) -> bool {
        fs::is_file(&self.registry.path(kind)).await
    }

    /// Lit et parse le fichier courant. `Ok(None)` si le fichier est absent,
    /// `DatasetCorrupt` s'il ne se parse pas (UTF-8 invalide compris).
    pub async fn read_current(&self, kind: DatasetType) -> Result<Option<Value>> {
        let path = self.registry.path(kind);
        let Some(raw) = fs::read_optional(&path).await? else {
            return Ok(None);
        };
        match json::parse_bytes::<Value>(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(dataset = %kind, error = %e, "Fichier de données illisible");
                Err(AppError::DatasetCorrupt(kind.to_string()))
            }
        }
    }

    /// Contenu courant ou valeur par défaut du type. Jamais de repli sur le
    /// défaut pour un fichier corrompu.
    #[instrument(skip(self), fields(dataset = %kind))]
    pub async fn load(&self, kind: DatasetType) -> Result<LoadedDataset> {
        match self.read_current(kind).await? {
            Some(value) => {
                let meta = fs::metadata(&self.registry.path(kind)).await?;
                Ok(LoadedDataset {
                    value,
                    modified: Some(clock::from_system(meta.modified)),
                })
            }
            None => Ok(LoadedDataset {
                value: self.registry.default_value(kind),
                modified: None,
            }),
        }
    }

    /// Écrase le fichier (écriture atomique). Le dernier écrivain gagne.
    #[instrument(skip(self, value), fields(dataset = %kind))]
    pub async fn save(&self, kind: DatasetType, value: &Value) -> Result<()> {
        let path = self.registry.path(kind);
        fs::write_json_atomic(&path, value).await.map_err(|e| {
            warn!(dataset = %kind, error = %e, "Écriture échouée");
            AppError::WriteFailed(kind.to_string())
        })
    }

    pub fn count(&self, kind: DatasetType, value: &Value) -> usize {
        self.registry.count(kind, value)
    }

    /// Supprime le fichier. `Ok(false)` si rien n'était présent.
    #[instrument(skip(self), fields(dataset = %kind))]
    pub async fn clear(&self, kind: DatasetType) -> Result<bool> {
        let path = self.registry.path(kind);
        fs::remove_file_if_exists(&path).await.map_err(|e| {
            warn!(dataset = %kind, error = %e, "Suppression échouée");
            AppError::WriteFailed(kind.to_string())
        })
    }

    /// Statistiques d'un type ; un fichier corrompu compte 0 élément.
    pub async fn stats(&self, kind: DatasetType) -> Result<DatasetStats> {
        let path = self.registry.path(kind);
        if !fs::is_file(&path).await {
            return Ok(DatasetStats {
                count: 0,
                last_modified: None,
                size: 0,
            });
        }
        let meta = fs::metadata(&path).await?;
        let count = match self.read_current(kind).await {
            Ok(Some(value)) => self.count(kind, &value),
            Ok(None) | Err(AppError::DatasetCorrupt(_)) => 0,
            Err(e) => return Err(e),
        };
        Ok(DatasetStats {
            count,
            last_modified: Some(clock::display_date(clock::from_system(meta.modified))),
            size: meta.size,
        })
    }
}
