// FICHIER : src-server/src/datasets/mod.rs

pub mod activity_log;
pub mod backup;
pub mod engine;
pub mod lock_manager;
pub mod registry;
pub mod storage;
pub mod validator;

pub use backup::{BackupManager, BundleLabel};
pub use engine::Engine;
pub use registry::{DatasetRegistry, DatasetType};
