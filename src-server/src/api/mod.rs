// FICHIER : src-server/src/api/mod.rs

pub mod http;
pub mod request;

pub use request::{ApiRequest, ApiResponse, RequestKind};
