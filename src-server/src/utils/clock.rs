// FICHIER : src-server/src/utils/clock.rs

//! Source de temps injectable : horloge murale en production, horloge
//! manuelle dans les tests de rotation et d'ordonnancement.

use chrono::{DateTime, Local, TimeZone, Utc};
use std::fmt::Debug;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::SystemTime;

/// Format des dates lisibles (journal, statistiques, listes de sauvegardes).
pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Format de l'horodatage des noms de fichiers de sauvegarde.
pub const FILE_STAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Horloge pilotée à la main, à la seconde près.
#[derive(Debug)]
pub struct ManualClock {
    secs: AtomicI64,
}

impl ManualClock {
    pub fn starting_at(unix_secs: i64) -> Self {
        Self {
            secs: AtomicI64::new(unix_secs),
        }
    }

    pub fn advance(&self, secs: i64) {
        self.secs.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let secs = self.secs.load(Ordering::SeqCst);
        Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
    }
}

pub fn display_date(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format(DISPLAY_FORMAT).to_string()
}

pub fn file_stamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format(FILE_STAMP_FORMAT).to_string()
}

pub fn from_system(t: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(t)
}

pub fn to_system(at: DateTime<Utc>) -> SystemTime {
    SystemTime::from(at)
}
