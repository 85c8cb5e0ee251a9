use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The rule gating entry to a community.
///
/// Exactly one variant applies per community; the `accessType` tag on the
/// wire selects it. Payment amounts are denominated in TON, the chain's
/// native token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "accessType", rename_all = "camelCase")]
pub enum AccessPolicy {
    #[serde(rename_all = "camelCase")]
    Payment { amount: f64 },
    #[serde(rename = "nft", rename_all = "camelCase")]
    NftOwnership {
        collection: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        token_id: Option<String>,
    },
}

impl AccessPolicy {
    /// Wire label of the join method this policy accepts.
    pub fn method_label(&self) -> &'static str {
        match self {
            AccessPolicy::Payment { .. } => "payment",
            AccessPolicy::NftOwnership { .. } => "nft",
        }
    }
}

/// Community data as served by the catalog endpoints.
///
/// The raw member list stays server-side; clients only see the computed
/// `memberCount`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    #[serde(flatten)]
    pub access: AccessPolicy,
    pub chat_group_id: String,
    pub member_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Per-wallet membership record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRecordView {
    pub wallet_address: String,
    pub joined_communities: Vec<String>,
    pub created_at: DateTime<Utc>,
}
