use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// -- Session --

/// Payload of the signed session token carried in the `Token` cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub username: String,
    /// Absolute expiry, unix seconds.
    pub exp: i64,
}

// -- Playgrounds --

/// Form body of `POST /api/submittedPlaygrounds`.
///
/// Fields default to empty so that every missing field is reported by
/// validation instead of failing extraction on the first one.
#[derive(Debug, Default, Deserialize)]
pub struct SubmitPlaygroundForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub department: String,
}

/// Form body of `POST /api/playgrounds`, the moderation action that
/// publishes a draft.
#[derive(Debug, Default, Deserialize)]
pub struct PromotePlaygroundForm {
    #[serde(default, rename = "ID")]
    pub id: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub longitude: String,
    #[serde(default)]
    pub latitude: String,
    #[serde(default)]
    pub coating: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    pub open: Option<String>,
}

// -- Comments --

#[derive(Debug, Default, Deserialize)]
pub struct AddCommentForm {
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ModifyCommentRequest {
    #[serde(default)]
    pub content: String,
}

// -- Errors --

/// JSON body returned with every error status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable kind, e.g. `not_found` or `validation`.
    pub error: String,
    pub message: String,
    /// Per-field problems, all of them at once.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, String>,
}
