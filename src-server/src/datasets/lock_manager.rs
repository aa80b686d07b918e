// FICHIER : src-server/src/datasets/lock_manager.rs

use super::registry::DatasetType;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::{Mutex, OwnedMutexGuard};

pub type DatasetGuard = OwnedMutexGuard<()>;

/// Gestionnaire de verrous (granularité : jeu de données).
/// Un seul écrivain à la fois par type pour la séquence
/// validation -> sauvegarde -> écriture.
#[derive(Debug, Default, Clone)]
pub struct LockManager {
    locks: Arc<RwLock<HashMap<DatasetType, Arc<Mutex<()>>>>>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, kind: DatasetType) -> Arc<Mutex<()>> {
        let mut map = self.locks.write().unwrap_or_else(PoisonError::into_inner);
        map.entry(kind)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Verrou exclusif d'un type, tenu jusqu'au drop du guard.
    pub async fn lock(&self, kind: DatasetType) -> DatasetGuard {
        self.handle(kind).lock_owned().await
    }

    /// Verrouille tous les types dans l'ordre fixe de `DatasetType::ALL`
    /// (ordre global => pas d'interblocage avec `lock`).
    pub async fn lock_all(&self) -> Vec<DatasetGuard> {
        let mut guards = Vec::with_capacity(DatasetType::ALL.len());
        for kind in DatasetType::ALL {
            guards.push(self.lock(kind).await);
        }
        guards
    }
}
