//! Key-service collaborator seam.
//!
//! The key operations themselves (derivation, lookup, encryption,
//! decryption) live behind [`KeyService`]. This server only routes
//! requests to it and instruments the calls.

use axum::{extract::Request, http::StatusCode, response::IntoResponse, response::Response, Json};
use futures_util::future::BoxFuture;
use serde_json::json;

/// The business operations exposed under `/api`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyOperation {
    /// Derive and register the public key for a service.
    DerivePubkey,
    /// Return a previously derived public key.
    GetPubkey,
    /// Encrypt data to a registered service.
    Encrypt,
    /// Decrypt data addressed to a registered service.
    Decrypt,
}

impl KeyOperation {
    pub const ALL: [KeyOperation; 4] = [
        KeyOperation::DerivePubkey,
        KeyOperation::GetPubkey,
        KeyOperation::Encrypt,
        KeyOperation::Decrypt,
    ];

    /// Name used for logging and for the latency histogram.
    pub fn route_name(self) -> &'static str {
        match self {
            KeyOperation::DerivePubkey => "derive_pubkey",
            KeyOperation::GetPubkey => "get_pubkey",
            KeyOperation::Encrypt => "encrypt",
            KeyOperation::Decrypt => "decrypt",
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            KeyOperation::DerivePubkey => "/api/derive_pubkey",
            KeyOperation::GetPubkey => "/api/get_pubkey",
            KeyOperation::Encrypt => "/api/encrypt",
            KeyOperation::Decrypt => "/api/decrypt",
        }
    }
}

impl std::fmt::Display for KeyOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.route_name())
    }
}

/// Handles the key operations. Error responses are the implementor's to shape.
pub trait KeyService: Send + Sync + 'static {
    fn handle(&self, operation: KeyOperation, request: Request) -> BoxFuture<'_, Response>;
}

/// Placeholder backend answering every operation with 501.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableKeyService;

impl KeyService for UnavailableKeyService {
    fn handle(&self, operation: KeyOperation, _request: Request) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            tracing::debug!(%operation, "Key service backend not configured");
            (
                StatusCode::NOT_IMPLEMENTED,
                Json(json!({ "error": "key service backend not configured" })),
            )
                .into_response()
        })
    }
}
