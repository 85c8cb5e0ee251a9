use crate::models::{Community, MemberRecord};
use async_trait::async_trait;
use thiserror::Error;

/// Sentinel category meaning "no filter" on the catalog listing.
pub const CATEGORY_ALL: &str = "All";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Community not found")]
    CommunityNotFound,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid stored access policy: {0}")]
    InvalidPolicy(String),
}

/// Whether reads/writes hit a durable backend or the in-memory fixture
/// catalog. Surfaced through /api/status so clients can tell demo data
/// from live data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    Live,
    Demo,
}

impl StoreMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreMode::Live => "live",
            StoreMode::Demo => "demo",
        }
    }
}

/// Durable mapping from community id to metadata/member set and from
/// wallet address to joined communities. Exclusively owns both; the join
/// workflow never caches across requests.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    async fn get_community(&self, id: &str) -> Result<Option<Community>, StoreError>;

    /// Exact, case-sensitive category match; `None` or the `"All"`
    /// sentinel lists everything.
    async fn list_communities(&self, category: Option<&str>) -> Result<Vec<Community>, StoreError>;

    /// Idempotent set-add: adding an already-present member is a no-op
    /// that still succeeds.
    async fn add_member(&self, community_id: &str, wallet: &str) -> Result<(), StoreError>;

    /// Creates the member record if absent; idempotent on repeat joins.
    async fn record_join(&self, wallet: &str, community_id: &str) -> Result<(), StoreError>;

    /// Fetches the member record for a wallet, creating it if absent.
    async fn ensure_member(&self, wallet: &str) -> Result<MemberRecord, StoreError>;

    fn mode(&self) -> StoreMode;
}
