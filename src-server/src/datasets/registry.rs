// FICHIER : src-server/src/datasets/registry.rs

use super::validator::{
    DatasetSchema, FeatureCollectionSchema, RecordListSchema, SettingsSchema,
};
use crate::utils::json::Value;
use crate::utils::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const POI_CATEGORIES: &[&str] = &["gas_station", "windmill", "power_plant", "oil_pump", "tanks"];

/// Les cinq jeux de données gérés par le backend.
/// L'ordre de déclaration est l'ordre de traitement des opérations groupées.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetType {
    Hydrants,
    Markers,
    Drawings,
    Settings,
    Pois,
}

impl DatasetType {
    pub const ALL: [DatasetType; 5] = [
        DatasetType::Hydrants,
        DatasetType::Markers,
        DatasetType::Drawings,
        DatasetType::Settings,
        DatasetType::Pois,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DatasetType::Hydrants => "hydrants",
            DatasetType::Markers => "markers",
            DatasetType::Drawings => "drawings",
            DatasetType::Settings => "settings",
            DatasetType::Pois => "pois",
        }
    }

    /// "Hydrants", "Markers"... pour les messages utilisateur.
    pub fn label(self) -> String {
        let name = self.as_str();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for DatasetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        DatasetType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| AppError::InvalidDatasetType(s.to_string()))
    }
}

#[derive(Debug)]
pub struct DatasetEntry {
    pub kind: DatasetType,
    pub file_name: &'static str,
    pub schema: Box<dyn DatasetSchema>,
}

/// Table type -> (fichier, schéma), construite une fois au démarrage et
/// partagée par tous les composants.
#[derive(Debug)]
pub struct DatasetRegistry {
    data_dir: PathBuf,
    entries: [DatasetEntry; 5],
}

impl DatasetRegistry {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let entry = |kind: DatasetType, file_name: &'static str, schema: Box<dyn DatasetSchema>| {
            DatasetEntry {
                kind,
                file_name,
                schema,
            }
        };
        // Même ordre que DatasetType::ALL (indexation par discriminant)
        let entries = [
            entry(
                DatasetType::Hydrants,
                "hydrants.json",
                Box::new(RecordListSchema::new(&["id", "lng", "lat"])),
            ),
            entry(
                DatasetType::Markers,
                "custom_markers.json",
                Box::new(RecordListSchema::new(&["id", "lng", "lat", "name"])),
            ),
            entry(
                DatasetType::Drawings,
                "drawings.json",
                Box::new(FeatureCollectionSchema),
            ),
            entry(DatasetType::Settings, "settings.json", Box::new(SettingsSchema)),
            entry(
                DatasetType::Pois,
                "points_of_interest.json",
                Box::new(
                    RecordListSchema::new(&["id", "lng", "lat", "name", "category"])
                        .with_enum("category", POI_CATEGORIES),
                ),
            ),
        ];
        Self {
            data_dir: data_dir.into(),
            entries,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Résout le paramètre `type` d'une requête.
    pub fn resolve(&self, token: Option<&str>) -> Result<DatasetType> {
        match token.map(str::trim) {
            Some(t) if !t.is_empty() => t.parse(),
            _ => Err(AppError::InvalidDatasetType("missing".to_string())),
        }
    }

    pub fn entry(&self, kind: DatasetType) -> &DatasetEntry {
        &self.entries[kind.index()]
    }

    pub fn path(&self, kind: DatasetType) -> PathBuf {
        self.data_dir.join(self.entry(kind).file_name)
    }

    pub fn default_value(&self, kind: DatasetType) -> Value {
        self.entry(kind).schema.default_value()
    }

    pub fn validate(&self, kind: DatasetType, value: &Value) -> bool {
        self.entry(kind).schema.validate(value)
    }

    pub fn count(&self, kind: DatasetType, value: &Value) -> usize {
        self.entry(kind).schema.count(value)
    }
}
