// FICHIER : src-server/src/lib.rs

pub mod api;
pub mod datasets;
pub mod utils;

pub use datasets::Engine;
