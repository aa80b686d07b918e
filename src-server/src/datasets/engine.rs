// FICHIER : src-server/src/datasets/engine.rs

//! Routeur des requêtes : (nature, action, type) -> opération du moteur,
//! puis mise en forme de l'enveloppe de réponse.

use super::activity_log::{ActivityLog, LogAction};
use super::backup::{BackupManager, BundleLabel, RestoreOutcome, SnapshotReason};
use super::lock_manager::LockManager;
use super::registry::{DatasetRegistry, DatasetType};
use super::storage::DatasetStore;
use crate::api::request::{ApiRequest, ApiResponse, RequestKind};
use crate::utils::clock::{Clock, SystemClock};
use crate::utils::fs;
use crate::utils::prelude::*;
use std::sync::Arc;

/// Cible des lignes du journal pour les opérations multi-types.
const ALL_TARGET: &str = "full";

#[derive(Debug, Clone)]
pub struct Engine {
    registry: Arc<DatasetRegistry>,
    store: DatasetStore,
    backups: BackupManager,
    activity: ActivityLog,
    locks: LockManager,
    clock: Arc<dyn Clock>,
}

impl Engine {
    pub async fn open(config: &AppConfig) -> Result<Self> {
        Self::open_with_clock(config, Arc::new(SystemClock)).await
    }

    /// Prépare le dossier de données et assemble les composants.
    pub async fn open_with_clock(config: &AppConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        fs::ensure_dir(&config.data_dir).await?;

        let registry = Arc::new(DatasetRegistry::new(&config.data_dir));
        let store = DatasetStore::new(registry.clone());
        let backups = BackupManager::new(store.clone(), clock.clone(), config.backup_retention);
        let activity = ActivityLog::new(registry.data_dir(), clock.clone());

        info!(
            data_dir = %config.data_dir.display(),
            retention = config.backup_retention,
            "Moteur de données prêt"
        );
        Ok(Self {
            registry,
            store,
            backups,
            activity,
            locks: LockManager::new(),
            clock,
        })
    }

    pub fn registry(&self) -> &DatasetRegistry {
        &self.registry
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    fn now_ts(&self) -> i64 {
        self.clock.now().timestamp()
    }

    // --- ROUTAGE ---

    /// Point d'entrée unique : ne renvoie jamais d'erreur, seulement une
    /// enveloppe `{success, ...}` ou `{error}` avec son statut.
    pub async fn handle(&self, req: &ApiRequest) -> ApiResponse {
        let res = self.dispatch(req).await;
        if let Err(e) = &res {
            debug!(method = %req.method, action = %req.action, error = %e, "Requête rejetée");
        }
        res.into()
    }

    async fn dispatch(&self, req: &ApiRequest) -> Result<Value> {
        let caller = req.caller.as_str();
        let action = req.action.as_str();

        match req.kind()? {
            RequestKind::Read => match action {
                "load" => {
                    let kind = self.registry.resolve(req.dataset.as_deref())?;
                    self.load(kind, caller).await
                }
                "list_backups" => self.list_backups().await,
                "stats" => self.stats().await,
                other => Err(AppError::UnknownAction(other.to_string())),
            },
            RequestKind::Write => {
                // Corps vérifié avant toute résolution d'action
                let body = req.json_body()?;
                match action {
                    "save" => {
                        let kind = self.registry.resolve(req.dataset.as_deref())?;
                        self.save(kind, unwrap_data(&body), caller).await
                    }
                    "save_all" => self.save_all(&body, caller).await,
                    "create_backup" => self.create_backup(caller).await,
                    other => Err(AppError::UnknownAction(other.to_string())),
                }
            }
            RequestKind::Update => match action {
                "restore_backup" => {
                    let body = req.json_body_or_null();
                    let filename = body
                        .get("filename")
                        .and_then(Value::as_str)
                        .unwrap_or_default();
                    self.restore_backup(filename, caller).await
                }
                other => Err(AppError::UnknownAction(other.to_string())),
            },
            RequestKind::Delete => match action {
                "clear" => {
                    let kind = self.registry.resolve(req.dataset.as_deref())?;
                    self.clear(kind, caller).await
                }
                "clear_all" => self.clear_all(caller).await,
                other => Err(AppError::UnknownAction(other.to_string())),
            },
        }
    }

    // --- LECTURES ---

    #[instrument(skip(self))]
    pub async fn load(&self, kind: DatasetType, caller: &str) -> Result<Value> {
        match self.store.load(kind).await {
            Ok(loaded) => {
                let (timestamp, detail) = match loaded.modified {
                    Some(at) => (at.timestamp(), "file"),
                    None => (self.now_ts(), "default"),
                };
                self.activity
                    .record(LogAction::Load, kind.as_str(), true, caller, detail)
                    .await;
                Ok(json!({
                    "success": true,
                    "data": loaded.value,
                    "timestamp": timestamp,
                }))
            }
            Err(e) => {
                let detail = match &e {
                    AppError::DatasetCorrupt(_) => "Invalid JSON".to_string(),
                    other => other.to_string(),
                };
                self.activity
                    .record(LogAction::Load, kind.as_str(), false, caller, &detail)
                    .await;
                Err(e)
            }
        }
    }

    pub async fn list_backups(&self) -> Result<Value> {
        let backups = self.backups.list().await?;
        Ok(json!({ "success": true, "backups": backups }))
    }

    pub async fn stats(&self) -> Result<Value> {
        let mut stats = Map::new();
        for kind in DatasetType::ALL {
            let entry = self.store.stats(kind).await?;
            stats.insert(kind.to_string(), serde_json::to_value(entry)?);
        }
        Ok(json!({ "success": true, "stats": stats }))
    }

    // --- ÉCRITURES ---

    /// validation -> copie de l'existant -> écriture, sous le verrou du type.
    #[instrument(skip(self, value))]
    pub async fn save(&self, kind: DatasetType, value: &Value, caller: &str) -> Result<Value> {
        let target = kind.as_str();
        if !self.registry.validate(kind, value) {
            self.activity
                .record(LogAction::Save, target, false, caller, "Data validation failed")
                .await;
            return Err(AppError::ValidationFailed(target.to_string()));
        }

        let _guard = self.locks.lock(kind).await;

        if let Err(e) = self.backups.snapshot_one(kind, SnapshotReason::BeforeSave).await {
            self.activity
                .record(LogAction::Save, target, false, caller, "Backup failed")
                .await;
            return Err(e);
        }

        if let Err(e) = self.store.save(kind, value).await {
            self.activity
                .record(LogAction::Save, target, false, caller, "File write failed")
                .await;
            return Err(e);
        }

        let count = self.store.count(kind, value);
        self.activity
            .record(LogAction::Save, target, true, caller, &format!("{count} items"))
            .await;
        Ok(json!({
            "success": true,
            "message": format!("{} saved successfully", kind.label()),
            "timestamp": self.now_ts(),
            "count": count,
        }))
    }

    /// Chaque type présent est traité indépendamment, dans l'ordre fixe.
    #[instrument(skip(self, body))]
    pub async fn save_all(&self, body: &Value, caller: &str) -> Result<Value> {
        let all = match body.get("data") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => {
                return Err(AppError::InvalidRequestBody(
                    "data must be a mapping of dataset types".to_string(),
                ))
            }
        };

        let mut results = Map::new();
        let mut success = true;
        for kind in DatasetType::ALL {
            let Some(value) = all.get(kind.as_str()) else {
                continue;
            };
            let (outcome, detail) = self.save_one_of_many(kind, value).await;
            let ok = outcome == "success";
            success &= ok;
            self.activity
                .record(LogAction::SaveAll, kind.as_str(), ok, caller, detail)
                .await;
            results.insert(kind.to_string(), json!(outcome));
        }

        Ok(json!({
            "success": success,
            "results": results,
            "timestamp": self.now_ts(),
        }))
    }

    async fn save_one_of_many(&self, kind: DatasetType, value: &Value) -> (&'static str, &'static str) {
        if !self.registry.validate(kind, value) {
            return ("validation_error", "Validation failed");
        }
        let _guard = self.locks.lock(kind).await;
        if self
            .backups
            .snapshot_one(kind, SnapshotReason::BeforeSave)
            .await
            .is_err()
        {
            return ("error", "Backup failed");
        }
        match self.store.save(kind, value).await {
            Ok(()) => ("success", ""),
            Err(_) => ("error", "File write failed"),
        }
    }

    #[instrument(skip(self))]
    pub async fn create_backup(&self, caller: &str) -> Result<Value> {
        match self.backups.snapshot_full(BundleLabel::Full, caller).await {
            Ok(filename) => {
                self.activity
                    .record(LogAction::CreateBackup, ALL_TARGET, true, caller, &filename)
                    .await;
                Ok(json!({
                    "success": true,
                    "message": "Backup created successfully",
                    "filename": filename,
                    "timestamp": self.now_ts(),
                }))
            }
            Err(e) => {
                self.activity
                    .record(LogAction::CreateBackup, ALL_TARGET, false, caller, &e.to_string())
                    .await;
                Err(e)
            }
        }
    }

    // --- MISES À JOUR ---

    #[instrument(skip(self))]
    pub async fn restore_backup(&self, filename: &str, caller: &str) -> Result<Value> {
        // Nom vérifié avant de bloquer tous les types
        self.backups.backup_path(filename)?;
        let _guards = self.locks.lock_all().await;

        let report = match self.backups.restore(filename, caller).await {
            Ok(report) => report,
            Err(e) => {
                self.activity
                    .record(LogAction::Restore, ALL_TARGET, false, caller, &e.to_string())
                    .await;
                return Err(e);
            }
        };

        for (kind, outcome) in &report.results {
            let ok = *outcome == RestoreOutcome::Restored;
            self.activity
                .record(LogAction::Restore, kind.as_str(), ok, caller, filename)
                .await;
        }

        Ok(json!({
            "success": report.success,
            "results": report.results,
            "restored_from": filename,
            "timestamp": self.now_ts(),
        }))
    }

    // --- SUPPRESSIONS ---

    #[instrument(skip(self))]
    pub async fn clear(&self, kind: DatasetType, caller: &str) -> Result<Value> {
        let target = kind.as_str();
        let _guard = self.locks.lock(kind).await;

        if !self.store.exists(kind).await {
            return Ok(json!({ "success": true, "message": "no data present" }));
        }

        if let Err(e) = self.backups.snapshot_one(kind, SnapshotReason::BeforeClear).await {
            self.activity
                .record(LogAction::Clear, target, false, caller, "Backup failed")
                .await;
            return Err(e);
        }

        match self.store.clear(kind).await {
            Ok(_) => {
                self.activity
                    .record(LogAction::Clear, target, true, caller, "")
                    .await;
                Ok(json!({
                    "success": true,
                    "message": format!("{} cleared", kind.label()),
                }))
            }
            Err(e) => {
                self.activity
                    .record(LogAction::Clear, target, false, caller, "Delete failed")
                    .await;
                Err(e)
            }
        }
    }

    /// Bundle `before_clear_all` d'abord ; sans lui, rien n'est supprimé.
    #[instrument(skip(self))]
    pub async fn clear_all(&self, caller: &str) -> Result<Value> {
        let _guards = self.locks.lock_all().await;

        let mut present = Vec::new();
        for kind in DatasetType::ALL {
            if self.store.exists(kind).await {
                present.push(kind);
            }
        }

        let current = self.backups.collect_current().await;
        let bundled: Vec<DatasetType> = present
            .iter()
            .copied()
            .filter(|kind| current.contains_key(kind.as_str()))
            .collect();
        let backup_created = match self
            .backups
            .write_bundle(BundleLabel::BeforeClearAll, caller, current)
            .await
        {
            Ok(name) => name,
            Err(e) => {
                self.activity
                    .record(LogAction::ClearAll, ALL_TARGET, false, caller, "Backup failed")
                    .await;
                return Err(e);
            }
        };

        let mut results = Map::new();
        let mut success = true;
        for kind in present {
            // Absent du lot (corrompu ou illisible) : copie brute avant suppression
            let preserved = bundled.contains(&kind)
                || self
                    .backups
                    .snapshot_one(kind, SnapshotReason::BeforeClear)
                    .await
                    .is_ok();
            let ok = preserved && self.store.clear(kind).await.is_ok();
            success &= ok;
            let detail = if preserved { "" } else { "Backup failed" };
            self.activity
                .record(LogAction::ClearAll, kind.as_str(), ok, caller, detail)
                .await;
            results.insert(
                kind.to_string(),
                json!(if ok { "cleared" } else { "error" }),
            );
        }

        Ok(json!({
            "success": success,
            "results": results,
            "backup_created": backup_created,
        }))
    }
}

/// Le corps d'une sauvegarde est soit la valeur nue, soit `{ "data": valeur }`.
fn unwrap_data(body: &Value) -> &Value {
    match body.get("data") {
        Some(inner) if !inner.is_null() => inner,
        _ => body,
    }
}
