// FICHIER : src-server/src/datasets/validator.rs

//! Une unité de schéma par famille de jeu de données : validation, valeur par
//! défaut et comptage. Ajouter un type = ajouter une unité dans le registre.

use crate::utils::json::{json, Map, Value};
use std::fmt::Debug;

pub trait DatasetSchema: Send + Sync + Debug {
    /// Vrai si la valeur candidate peut remplacer le contenu du fichier.
    /// Un seul élément invalide invalide l'ensemble.
    fn validate(&self, value: &Value) -> bool;

    /// Valeur renvoyée par `load` quand le fichier est absent.
    fn default_value(&self) -> Value;

    /// Nombre d'éléments exposé dans les réponses `save` et `stats`.
    fn count(&self, value: &Value) -> usize;
}

/// Un champ est "présent" s'il existe et n'est pas `null`.
fn has_field(obj: &Map<String, Value>, field: &str) -> bool {
    obj.get(field).is_some_and(|v| !v.is_null())
}

// --- LISTES D'ENREGISTREMENTS (hydrants, markers, pois) ---

#[derive(Debug, Clone)]
pub struct RecordListSchema {
    required: &'static [&'static str],
    /// Champ à valeurs énumérées : (nom, valeurs admises).
    enumerated: Option<(&'static str, &'static [&'static str])>,
}

impl RecordListSchema {
    pub fn new(required: &'static [&'static str]) -> Self {
        Self {
            required,
            enumerated: None,
        }
    }

    pub fn with_enum(mut self, field: &'static str, allowed: &'static [&'static str]) -> Self {
        self.enumerated = Some((field, allowed));
        self
    }

    fn validate_record(&self, record: &Value) -> bool {
        let Some(obj) = record.as_object() else {
            return false;
        };
        if !self.required.iter().all(|f| has_field(obj, f)) {
            return false;
        }
        match self.enumerated {
            Some((field, allowed)) => obj
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|v| allowed.contains(&v)),
            None => true,
        }
    }
}

impl DatasetSchema for RecordListSchema {
    fn validate(&self, value: &Value) -> bool {
        value
            .as_array()
            .is_some_and(|records| records.iter().all(|r| self.validate_record(r)))
    }

    fn default_value(&self) -> Value {
        json!([])
    }

    fn count(&self, value: &Value) -> usize {
        value.as_array().map_or(0, Vec::len)
    }
}

// --- GEOJSON (drawings) ---

#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureCollectionSchema;

impl FeatureCollectionSchema {
    fn validate_feature(feature: &Value) -> bool {
        let Some(obj) = feature.as_object() else {
            return false;
        };
        if obj.get("type").and_then(Value::as_str) != Some("Feature") {
            return false;
        }
        obj.get("geometry")
            .and_then(Value::as_object)
            .is_some_and(|geometry| has_field(geometry, "type") && has_field(geometry, "coordinates"))
    }
}

impl DatasetSchema for FeatureCollectionSchema {
    fn validate(&self, value: &Value) -> bool {
        let Some(obj) = value.as_object() else {
            return false;
        };
        if obj.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
            return false;
        }
        obj.get("features")
            .and_then(Value::as_array)
            .is_some_and(|features| features.iter().all(Self::validate_feature))
    }

    fn default_value(&self) -> Value {
        json!({ "type": "FeatureCollection", "features": [] })
    }

    fn count(&self, value: &Value) -> usize {
        value
            .get("features")
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }
}

// --- SETTINGS ---

#[derive(Debug, Clone, Copy, Default)]
pub struct SettingsSchema;

impl DatasetSchema for SettingsSchema {
    fn validate(&self, value: &Value) -> bool {
        value.is_object()
    }

    fn default_value(&self) -> Value {
        json!({ "autoSaveEnabled": true, "isAdmin": false })
    }

    fn count(&self, _value: &Value) -> usize {
        0
    }
}
