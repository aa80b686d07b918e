// FICHIER : src-server/src/datasets/backup.rs

//! Sauvegardes : copies unitaires avant mutation, bundles complets,
//! rotation par famille de bundle et restauration.

use super::registry::DatasetType;
use super::storage::DatasetStore;
use crate::utils::clock::{self, Clock};
use crate::utils::fs::{self, Path, PathBuf};
use crate::utils::json::{self, Map, Value};
use crate::utils::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, instrument, warn};

pub const BACKUP_PREFIX: &str = "backup_";
pub const BACKUP_SUFFIX: &str = ".json";
pub const BUNDLE_VERSION: &str = "2.1";

// Au-delà, on considère le dossier saturé plutôt que de boucler
const MAX_NAME_ATTEMPTS: usize = 1000;

/// Familles de bundles (sauvegardes multi-types).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleLabel {
    Full,
    PreRestore,
    BeforeClearAll,
}

impl BundleLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            BundleLabel::Full => "full",
            BundleLabel::PreRestore => "pre_restore",
            BundleLabel::BeforeClearAll => "before_clear_all",
        }
    }
}

/// Motif d'une copie unitaire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotReason {
    BeforeSave,
    BeforeClear,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupBundle {
    pub timestamp: i64,
    pub version: String,
    pub created_by: String,
    pub data: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackupInfo {
    pub filename: String,
    pub timestamp: i64,
    pub size: u64,
    pub date: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RestoreOutcome {
    Restored,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestoreReport {
    pub results: BTreeMap<DatasetType, RestoreOutcome>,
    pub success: bool,
    /// Bundle `pre_restore` créé, si la capture a réussi.
    pub pre_restore: Option<String>,
}

#[derive(Debug, Clone)]
struct BackupFile {
    path: PathBuf,
    name: String,
    modified: SystemTime,
    size: u64,
}

#[derive(Debug, Clone)]
pub struct BackupManager {
    store: DatasetStore,
    clock: Arc<dyn Clock>,
    retention: usize,
}

impl BackupManager {
    pub fn new(store: DatasetStore, clock: Arc<dyn Clock>, retention: usize) -> Self {
        Self {
            store,
            clock,
            retention,
        }
    }

    fn dir(&self) -> &Path {
        self.store.registry().data_dir()
    }

    fn file_name(qualifier: &str, stamp: &str, attempt: usize) -> String {
        if attempt == 0 {
            format!("{BACKUP_PREFIX}{qualifier}_{stamp}{BACKUP_SUFFIX}")
        } else {
            format!("{BACKUP_PREFIX}{qualifier}_{stamp}_{attempt}{BACKUP_SUFFIX}")
        }
    }

    /// Premier numéro jamais utilisé pour cet horodatage : un nom libéré par
    /// la rotation n'est pas repris.
    async fn next_sequence(&self, qualifier: &str, stamp: &str) -> Result<usize> {
        let base = format!("{BACKUP_PREFIX}{qualifier}_{stamp}");
        let taken = fs::list_matching(self.dir(), &base, BACKUP_SUFFIX).await?;
        let highest = taken
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
            .filter_map(|name| {
                let (stem, seq) = split_sequence(name);
                (stem == base).then_some(seq)
            })
            .max();
        Ok(highest.map_or(0, |seq| seq + 1))
    }

    /// Écrit un nouveau fichier de sauvegarde sous un nom libre et l'horodate
    /// avec l'horloge du gestionnaire. Un nom existant n'est jamais réutilisé.
    async fn publish(&self, qualifier: &str, content: &[u8]) -> Result<String> {
        let now = self.clock.now();
        let stamp = clock::file_stamp(now);
        let first = self.next_sequence(qualifier, &stamp).await?;

        for attempt in first..first + MAX_NAME_ATTEMPTS {
            let name = Self::file_name(qualifier, &stamp, attempt);
            let path = self.dir().join(&name);
            match fs::write_atomic_new(&path, content).await {
                Ok(()) => {
                    fs::set_modified(&path, clock::to_system(now)).await?;
                    return Ok(name);
                }
                Err(AppError::Io(e)) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    debug!(filename = %name, "Nom de sauvegarde déjà pris");
                }
                Err(e) => return Err(e),
            }
        }
        Err(AppError::WriteFailed(format!(
            "no free backup name for {qualifier}"
        )))
    }

    /// Copie verbatim du fichier courant. `Ok(None)` si le fichier n'existe pas.
    #[instrument(skip(self), fields(dataset = %kind))]
    pub async fn snapshot_one(
        &self,
        kind: DatasetType,
        reason: SnapshotReason,
    ) -> Result<Option<String>> {
        if !self.store.exists(kind).await {
            return Ok(None);
        }
        let qualifier = match reason {
            SnapshotReason::BeforeSave => kind.to_string(),
            SnapshotReason::BeforeClear => format!("{kind}_before_clear"),
        };

        let source = self.store.registry().path(kind);
        let published: Result<String> = async {
            let bytes = tokio::fs::read(&source).await?;
            self.publish(&qualifier, &bytes).await
        }
        .await;

        match published {
            Ok(name) => {
                info!(filename = %name, "Copie de sauvegarde créée");
                Ok(Some(name))
            }
            Err(e) => {
                warn!(error = %e, "Copie de sauvegarde impossible");
                Err(AppError::WriteFailed(format!("backup of {kind}")))
            }
        }
    }

    /// Valeurs courantes de tous les types (absents omis, corrompus ignorés).
    pub async fn collect_current(&self) -> Map<String, Value> {
        let mut data = Map::new();
        for kind in DatasetType::ALL {
            match self.store.read_current(kind).await {
                Ok(Some(value)) => {
                    data.insert(kind.to_string(), value);
                }
                Ok(None) => {}
                Err(e) => warn!(dataset = %kind, error = %e, "Type exclu du bundle"),
            }
        }
        data
    }

    /// Bundle de tous les types, puis rotation de sa famille.
    #[instrument(skip(self))]
    pub async fn snapshot_full(&self, label: BundleLabel, created_by: &str) -> Result<String> {
        let data = self.collect_current().await;
        self.write_bundle(label, created_by, data).await
    }

    /// Écrit un bundle déjà collecté (utile quand l'appelant a besoin des
    /// valeurs avant de muter les fichiers).
    pub async fn write_bundle(
        &self,
        label: BundleLabel,
        created_by: &str,
        data: Map<String, Value>,
    ) -> Result<String> {
        let bundle = BackupBundle {
            timestamp: self.clock.now().timestamp(),
            version: BUNDLE_VERSION.to_string(),
            created_by: created_by.to_string(),
            data,
        };
        let content = json::stringify_pretty(&bundle)?;
        let name = self
            .publish(label.as_str(), content.as_bytes())
            .await
            .map_err(|e| {
                warn!(label = label.as_str(), error = %e, "Bundle non écrit");
                AppError::WriteFailed(format!("{} backup", label.as_str()))
            })?;
        info!(filename = %name, label = label.as_str(), "Bundle créé");

        if let Err(e) = self.rotate(label).await {
            warn!(label = label.as_str(), error = %e, "Rotation incomplète");
        }
        Ok(name)
    }

    async fn scan(&self, prefix: &str) -> Result<Vec<BackupFile>> {
        let paths = fs::list_matching(self.dir(), prefix, BACKUP_SUFFIX).await?;
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };
            // Un fichier disparu entre le listing et le stat est ignoré
            let Ok(meta) = fs::metadata(&path).await else {
                continue;
            };
            files.push(BackupFile {
                path,
                name,
                modified: meta.modified,
                size: meta.size,
            });
        }
        // Plus ancien d'abord ; à date égale, horodatage du nom puis numéro
        files.sort_by(|a, b| {
            let (stem_a, seq_a) = split_sequence(&a.name);
            let (stem_b, seq_b) = split_sequence(&b.name);
            a.modified
                .cmp(&b.modified)
                .then_with(|| stem_a.cmp(stem_b))
                .then_with(|| seq_a.cmp(&seq_b))
        });
        Ok(files)
    }

    /// Ne garde que les `retention` bundles les plus récents de la famille.
    pub async fn rotate(&self, label: BundleLabel) -> Result<usize> {
        let prefix = format!("{BACKUP_PREFIX}{}_", label.as_str());
        let files = self.scan(&prefix).await?;
        if files.len() <= self.retention {
            return Ok(0);
        }

        let excess = files.len() - self.retention;
        let mut deleted = 0;
        for file in files.iter().take(excess) {
            if fs::remove_file_if_exists(&file.path).await? {
                deleted += 1;
            }
        }
        info!(label = label.as_str(), deleted, "Rotation des sauvegardes");
        Ok(deleted)
    }

    /// Toutes les sauvegardes, les plus récentes d'abord.
    pub async fn list(&self) -> Result<Vec<BackupInfo>> {
        let files = self.scan(BACKUP_PREFIX).await?;
        Ok(files
            .into_iter()
            .rev()
            .map(|f| {
                let at = clock::from_system(f.modified);
                BackupInfo {
                    filename: f.name,
                    timestamp: at.timestamp(),
                    size: f.size,
                    date: clock::display_date(at),
                }
            })
            .collect())
    }

    /// Résout un nom de sauvegarde fourni par le client (nom nu uniquement).
    pub fn backup_path(&self, filename: &str) -> Result<PathBuf> {
        let name = filename.trim();
        if name.is_empty() {
            return Err(AppError::InvalidRequestBody(
                "no backup filename given".to_string(),
            ));
        }
        if name.contains('/') || name.contains('\\') || name.contains("..") {
            return Err(AppError::InvalidRequestBody(format!(
                "invalid backup filename: {name}"
            )));
        }
        Ok(self.dir().join(name))
    }

    /// Charge un bundle. `BackupNotFound` / `InvalidBackupFormat`.
    pub async fn read_bundle(&self, filename: &str) -> Result<Map<String, Value>> {
        let path = self.backup_path(filename)?;
        if !fs::is_file(&path).await {
            return Err(AppError::BackupNotFound(filename.to_string()));
        }
        let raw = tokio::fs::read(&path).await?;
        let doc: Value = json::parse_bytes(&raw)
            .map_err(|_| AppError::InvalidBackupFormat("not valid JSON".to_string()))?;

        match doc {
            Value::Object(mut obj) => match obj.remove("data") {
                Some(Value::Object(data)) => Ok(data),
                Some(_) => Err(AppError::InvalidBackupFormat(
                    "data is not a mapping".to_string(),
                )),
                None => Err(AppError::InvalidBackupFormat(
                    "missing data field".to_string(),
                )),
            },
            _ => Err(AppError::InvalidBackupFormat(
                "not a bundle backup".to_string(),
            )),
        }
    }

    /// Restaure un bundle. L'appelant doit tenir les verrous de tous les types.
    #[instrument(skip(self))]
    pub async fn restore(&self, filename: &str, created_by: &str) -> Result<RestoreReport> {
        let data = self.read_bundle(filename).await?;

        let pre_restore = match self.snapshot_full(BundleLabel::PreRestore, created_by).await {
            Ok(name) => Some(name),
            Err(e) => {
                warn!(error = %e, "Capture pre_restore impossible, restauration poursuivie");
                None
            }
        };

        let mut results = BTreeMap::new();
        for kind in DatasetType::ALL {
            let Some(value) = data.get(kind.as_str()) else {
                continue;
            };
            let outcome = match self.store.save(kind, value).await {
                Ok(()) => RestoreOutcome::Restored,
                Err(_) => RestoreOutcome::Error,
            };
            results.insert(kind, outcome);
        }

        let success = results.values().all(|o| *o == RestoreOutcome::Restored);
        Ok(RestoreReport {
            results,
            success,
            pre_restore,
        })
    }
}

/// Sépare `backup_<qualif>_<stamp>[_<n>].json` en (`backup_<qualif>_<stamp>`, n).
/// Le nom nu vaut 0 : son dernier segment est l'heure `HH-MM-SS`.
fn split_sequence(name: &str) -> (&str, usize) {
    let stem = name.strip_suffix(BACKUP_SUFFIX).unwrap_or(name);
    if let Some((base, tail)) = stem.rsplit_once('_') {
        if !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(seq) = tail.parse() {
                return (base, seq);
            }
        }
    }
    (stem, 0)
}
