//! Wire types of the memory service API
//!
//! Shared by the HTTP client and the server handlers. All JSON uses
//! camelCase field names except `client_secret`, which follows the payment
//! provider's naming.

use crate::tone::Tone;
use serde::{Deserialize, Serialize};

/// `GET /health` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub ok: bool,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default, deserialize_with = "crate::time::deserialize")]
    pub ts: i64,
    #[serde(default)]
    pub db: bool,
    #[serde(default)]
    pub stripe: bool,
}

/// A gate (companion app) offered by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateInfo {
    pub key: String,
    pub name: String,
    pub toll: String,
    pub blurb: String,
}

/// `GET /gates` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatesResponse {
    pub gates: Vec<GateInfo>,
}

/// A reflection as stored by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryItem {
    #[serde(default)]
    pub text: String,
    #[serde(default, deserialize_with = "crate::tone::deserialize_lenient")]
    pub tone: Tone,
    #[serde(default, deserialize_with = "crate::time::deserialize")]
    pub ts: i64,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub division: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

/// `GET /memory` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryList {
    pub items: Vec<MemoryItem>,
}

/// `POST /memory` request as sent by the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMemory {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tone: Option<Tone>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ts: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub division: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// `POST /memory` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedMemory {
    pub saved: bool,
    pub entry: MemoryItem,
    #[serde(default)]
    pub db: bool,
}

/// A recorded toll transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TollTx {
    pub id: String,
    pub gate: String,
    pub amount: f64,
    pub currency: String,
    pub ts: i64,
    pub device_id: String,
}

/// `POST /tolls` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedToll {
    pub saved: bool,
    pub tx: TollTx,
}

/// `POST /tolls/pay` request as sent by the dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub gate: String,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// `POST /tolls/pay` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub simulated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

/// Error body returned with 4xx responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
