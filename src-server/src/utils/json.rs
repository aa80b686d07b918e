// FICHIER : src-server/src/utils/json.rs

use crate::utils::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

// --- RE-EXPORTS (Single Source of Truth pour le JSON) ---
pub use serde_json::{json, Map, Value};

const INDENT: &[u8] = b"    ";

/// Parse une chaîne JSON en un type T.
pub fn parse<T: DeserializeOwned>(s: &str) -> Result<T> {
    Ok(serde_json::from_str(s)?)
}

/// Parse un buffer brut (corps de requête, fichier lu en binaire).
pub fn parse_bytes<T: DeserializeOwned>(b: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(b)?)
}

/// Sérialisation "humaine" : indentation 4 espaces, ordre des clés conservé,
/// caractères non-ASCII écrits tels quels.
pub fn stringify_pretty<T: Serialize>(v: &T) -> Result<String> {
    let mut buf = Vec::with_capacity(256);
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(INDENT));
    v.serialize(&mut ser)?;
    // serde_json n'émet que de l'UTF-8 valide
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
