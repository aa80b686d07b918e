// FICHIER : src-server/src/utils/error.rs

use serde::Serialize;
use serde_json::{json, Value};
use std::io;

pub use anyhow::{anyhow, Context};
// On renomme le Result de anyhow pour ne pas qu'il écrase le nôtre
pub use anyhow::Result as AnyResult;

/// Type de résultat standard du backend SAFD.
pub type Result<T> = std::result::Result<T, AppError>;

/// Enumération centrale des erreurs de l'application.
///
/// Les variantes "métier" correspondent à la taxonomie exposée aux clients,
/// les autres encapsulent les erreurs d'infrastructure.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("invalid dataset type: {0}")]
    InvalidDatasetType(String),

    #[error("invalid request body: {0}")]
    InvalidRequestBody(String),

    #[error("data validation failed for {0}")]
    ValidationFailed(String),

    #[error("dataset file is corrupt: {0}")]
    DatasetCorrupt(String),

    #[error("failed to write data: {0}")]
    WriteFailed(String),

    #[error("backup file not found: {0}")]
    BackupNotFound(String),

    #[error("invalid backup format: {0}")]
    InvalidBackupFormat(String),

    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("system error: {0}")]
    System(#[from] anyhow::Error),
}

impl AppError {
    /// Code de statut HTTP associé à l'erreur.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::InvalidDatasetType(_)
            | AppError::InvalidRequestBody(_)
            | AppError::ValidationFailed(_)
            | AppError::InvalidBackupFormat(_)
            | AppError::UnknownAction(_) => 400,
            AppError::BackupNotFound(_) => 404,
            AppError::MethodNotAllowed(_) => 405,
            AppError::DatasetCorrupt(_)
            | AppError::WriteFailed(_)
            | AppError::Config(_)
            | AppError::Io(_)
            | AppError::Serialization(_)
            | AppError::System(_) => 500,
        }
    }

    /// Enveloppe d'échec : `{ "error": <message> }`, jamais de champ `success`.
    pub fn to_envelope(&self) -> Value {
        json!({ "error": self.to_string() })
    }
}

// Le client ne reçoit qu'une chaîne simple
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(self.to_string().as_ref())
    }
}

// Permet de faire : return Err("Mon erreur".into());
impl From<String> for AppError {
    fn from(s: String) -> Self {
        AppError::System(anyhow::anyhow!(s))
    }
}

impl From<&str> for AppError {
    fn from(s: &str) -> Self {
        AppError::System(anyhow::anyhow!(s.to_string()))
    }
}
