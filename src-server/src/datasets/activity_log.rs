// FICHIER : src-server/src/datasets/activity_log.rs

//! Journal d'audit métier (`activity.log`), distinct des traces `tracing`.
//! Une ligne par action, jamais réécrite.

use crate::utils::clock::{self, Clock};
use crate::utils::fs::{Path, PathBuf};
use std::fmt;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

pub const ACTIVITY_LOG_FILE: &str = "activity.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogAction {
    Load,
    Save,
    SaveAll,
    CreateBackup,
    Restore,
    Clear,
    ClearAll,
}

impl LogAction {
    pub fn as_str(self) -> &'static str {
        match self {
            LogAction::Load => "LOAD",
            LogAction::Save => "SAVE",
            LogAction::SaveAll => "SAVE_ALL",
            LogAction::CreateBackup => "CREATE_BACKUP",
            LogAction::Restore => "RESTORE",
            LogAction::Clear => "CLEAR",
            LogAction::ClearAll => "CLEAR_ALL",
        }
    }
}

impl fmt::Display for LogAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ActivityLog {
    path: PathBuf,
    clock: Arc<dyn Clock>,
    // Sérialise les ajouts : jamais deux lignes entrelacées
    write_lock: Arc<Mutex<()>>,
}

impl ActivityLog {
    pub fn new(data_dir: &Path, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: data_dir.join(ACTIVITY_LOG_FILE),
            clock,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format_line(
        &self,
        action: LogAction,
        target: &str,
        success: bool,
        caller: &str,
        detail: &str,
    ) -> String {
        format!(
            "[{}] {}: {} - {} - IP: {} - {}\n",
            clock::display_date(self.clock.now()),
            if success { "SUCCESS" } else { "ERROR" },
            action,
            target,
            caller,
            detail.replace('\n', " ")
        )
    }

    /// Ajoute une ligne. Un échec d'écriture est tracé puis ignoré.
    pub async fn record(
        &self,
        action: LogAction,
        target: &str,
        success: bool,
        caller: &str,
        detail: &str,
    ) {
        let line = self.format_line(action, target, success, caller, detail);
        let _guard = self.write_lock.lock().await;
        if let Err(e) = self.append(line.as_bytes()).await {
            warn!(action = %action, error = %e, "Journal d'activité non écrit");
        }
    }

    async fn append(&self, bytes: &[u8]) -> std::io::Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(bytes).await?;
        file.flush().await
    }
}
