// FICHIER : src-server/src/utils/fs.rs

use crate::utils::{json, Result};
use serde::Serialize;
use std::time::SystemTime;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::instrument;

// --- RE-EXPORTS (Isolation de la couche OS) ---
pub use std::path::{Path, PathBuf};

/// Métadonnées minimales d'un fichier de données.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMeta {
    pub modified: SystemTime,
    pub size: u64,
}

pub async fn exists(path: &Path) -> bool {
    fs::metadata(path).await.is_ok()
}

/// Vrai uniquement pour un fichier régulier (un dossier homonyme ne compte pas).
pub async fn is_file(path: &Path) -> bool {
    fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
}

pub async fn ensure_dir(path: &Path) -> Result<()> {
    if !exists(path).await {
        fs::create_dir_all(path).await?;
    }
    Ok(())
}

/// Lit un fichier brut. `Ok(None)` si le fichier n'existe pas.
/// Aucun décodage ici : l'appelant parse les octets.
#[instrument(skip(path), fields(path = ?path))]
pub async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path).await {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub async fn metadata(path: &Path) -> Result<FileMeta> {
    let meta = fs::metadata(path).await?;
    Ok(FileMeta {
        modified: meta.modified()?,
        size: meta.len(),
    })
}

// --- ÉCRITURE ATOMIQUE ---

/// Écriture atomique sécurisée (write -> sync -> rename).
/// Le fichier temporaire est unique par appel pour ne jamais partager un
/// `.tmp` entre deux écrivains.
#[instrument(skip(content, path), fields(path = ?path))]
pub async fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent).await?;
    }

    let tmp_path = path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
    {
        let mut file = fs::File::create(&tmp_path).await?;
        let written = async {
            file.write_all(content).await?;
            file.flush().await?;
            file.sync_all().await
        }
        .await;
        if let Err(e) = written {
            drop(file);
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
    }

    if let Err(e) = fs::rename(&tmp_path, path).await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(e.into());
    }
    Ok(())
}

pub async fn write_json_atomic<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let content = json::stringify_pretty(data)?;
    write_atomic(path, content.as_bytes()).await
}

/// Comme `write_atomic`, mais ne remplace jamais une cible existante :
/// publication par lien dur, `AlreadyExists` si le nom est déjà pris.
#[instrument(skip(content, path), fields(path = ?path))]
pub async fn write_atomic_new(path: &Path, content: &[u8]) -> Result<()> {
    let tmp_path = path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
    write_atomic(&tmp_path, content).await?;

    let published = fs::hard_link(&tmp_path, path).await;
    let _ = fs::remove_file(&tmp_path).await;
    published?;
    Ok(())
}

/// Supprime un fichier. Renvoie `false` si le fichier n'existait pas.
pub async fn remove_file_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Force la date de modification d'un fichier.
pub async fn set_modified(path: &Path, at: SystemTime) -> Result<()> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let file = std::fs::OpenOptions::new().write(true).open(&path)?;
        file.set_modified(at)
    })
    .await
    .map_err(|e| anyhow::anyhow!("set_modified interrompu : {e}"))??;
    Ok(())
}

/// Liste les fichiers `<prefix>*<suffix>` d'un dossier (non récursif).
pub async fn list_matching(dir: &Path, prefix: &str, suffix: &str) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    if !exists(dir).await {
        return Ok(out);
    }
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.starts_with(prefix) && name.ends_with(suffix) && entry.file_type().await?.is_file()
        {
            out.push(entry.path());
        }
    }
    out.sort();
    Ok(out)
}
