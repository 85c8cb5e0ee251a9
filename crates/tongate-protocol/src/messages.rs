use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of POST /api/communities/{id}/join/payment.
///
/// Fields are optional so that an incomplete request reaches the workflow's
/// own validation (and a 400 with a usable message) instead of being
/// rejected by the deserializer.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct JoinPaymentRequest {
    pub wallet_address: Option<String>,
    pub tx_reference: Option<String>,
    pub amount: Option<f64>,
}

/// Body of POST /api/communities/{id}/join/nft.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct JoinNftRequest {
    pub wallet_address: Option<String>,
    pub asset_reference: Option<String>,
}

/// Successful join result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    pub success: bool,
    pub invite_link: String,
    pub message: String,
}

/// Body of POST /api/members.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RegisterMemberRequest {
    pub wallet_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub mode: String,
    pub recipient_wallet: String,
}

/// Per-service operational flags, so clients can tell demo from live data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub server: String,
    pub database: String,
    pub telegram: BotStatus,
    pub gateway: GatewayStatus,
    pub recipient_wallet: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotStatus {
    pub initialized: bool,
    pub mode: String,
    pub token_present: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayStatus {
    pub mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}
