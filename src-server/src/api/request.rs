// FICHIER : src-server/src/api/request.rs

//! Enveloppes requête / réponse indépendantes du transport.
//! Le serveur HTTP et le CLI construisent un `ApiRequest` et relaient
//! l'`ApiResponse` tels quels.

use crate::utils::json::{self, json, Value};
use crate::utils::{AppError, Result};
use std::fmt;
use std::str::FromStr;

pub const UNKNOWN_CALLER: &str = "unknown";

/// Nature de l'opération, dérivée du verbe HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Read,
    Write,
    Update,
    Delete,
}

impl RequestKind {
    pub fn verb(self) -> &'static str {
        match self {
            RequestKind::Read => "GET",
            RequestKind::Write => "POST",
            RequestKind::Update => "PUT",
            RequestKind::Delete => "DELETE",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

impl FromStr for RequestKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(RequestKind::Read),
            "POST" => Ok(RequestKind::Write),
            "PUT" => Ok(RequestKind::Update),
            "DELETE" => Ok(RequestKind::Delete),
            _ => Err(AppError::MethodNotAllowed(s.to_string())),
        }
    }
}

/// Requête entrante : verbe brut, action, type éventuel, corps brut.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiRequest {
    pub method: String,
    pub action: String,
    pub dataset: Option<String>,
    pub body: Option<Vec<u8>>,
    pub caller: String,
}

impl ApiRequest {
    pub fn new(method: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            action: action.into(),
            dataset: None,
            body: None,
            caller: UNKNOWN_CALLER.to_string(),
        }
    }

    pub fn with_dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = Some(dataset.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_json(self, value: &Value) -> Self {
        // La sérialisation d'une Value ne peut pas échouer
        let bytes = serde_json::to_vec(value).unwrap_or_default();
        self.with_body(bytes)
    }

    pub fn with_caller(mut self, caller: impl Into<String>) -> Self {
        self.caller = caller.into();
        self
    }

    pub fn kind(&self) -> Result<RequestKind> {
        self.method.parse()
    }

    /// Corps JSON obligatoire des écritures.
    pub fn json_body(&self) -> Result<Value> {
        let raw = match self.body.as_deref() {
            Some(b) if !b.iter().all(u8::is_ascii_whitespace) => b,
            _ => {
                return Err(AppError::InvalidRequestBody(
                    "no data received".to_string(),
                ))
            }
        };
        match json::parse_bytes::<Value>(raw) {
            Ok(Value::Null) | Err(_) => {
                Err(AppError::InvalidRequestBody("invalid JSON".to_string()))
            }
            Ok(v) => Ok(v),
        }
    }

    /// Corps optionnel (mises à jour) : vide ou illisible donne `Null`.
    pub fn json_body_or_null(&self) -> Value {
        self.body
            .as_deref()
            .and_then(|b| json::parse_bytes::<Value>(b).ok())
            .unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    pub fn from_error(err: &AppError) -> Self {
        Self {
            status: err.status_code(),
            body: err.to_envelope(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status < 400 && self.body.get("success") == Some(&json!(true))
    }
}

impl From<Result<Value>> for ApiResponse {
    fn from(res: Result<Value>) -> Self {
        match res {
            Ok(body) => ApiResponse::ok(body),
            Err(e) => ApiResponse::from_error(&e),
        }
    }
}
