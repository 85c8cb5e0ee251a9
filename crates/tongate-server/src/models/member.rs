use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tongate_protocol::MemberRecordView;

/// Per-wallet record of joined communities. Created lazily on first
/// successful join (or via POST /api/members) and never deleted.
#[derive(Debug, Clone)]
pub struct MemberRecord {
    pub wallet_address: String,
    pub joined_communities: HashSet<String>,
    pub created_at: DateTime<Utc>,
}

impl MemberRecord {
    pub fn new(wallet_address: impl Into<String>) -> Self {
        Self {
            wallet_address: wallet_address.into(),
            joined_communities: HashSet::new(),
            created_at: Utc::now(),
        }
    }

    pub fn to_view(&self) -> MemberRecordView {
        let mut joined: Vec<String> = self.joined_communities.iter().cloned().collect();
        joined.sort();
        MemberRecordView {
            wallet_address: self.wallet_address.clone(),
            joined_communities: joined,
            created_at: self.created_at,
        }
    }
}
