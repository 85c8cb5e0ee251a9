use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tongate_protocol::{AccessPolicy, CommunityView};

/// A Community - one token-gated access boundary mapping to a private
/// Telegram group.
#[derive(Debug, Clone)]
pub struct Community {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub access: AccessPolicy,
    /// Group reference handed to the invite issuer.
    pub chat_group_id: String,
    /// Wallet addresses of everyone who joined. Set semantics: repeat
    /// joins never duplicate an entry.
    pub members: HashSet<String>,
    pub created_at: DateTime<Utc>,
}

impl Community {
    /// Catalog view with the member count computed from the stored set,
    /// never a separately maintained counter.
    pub fn to_view(&self) -> CommunityView {
        CommunityView {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            access: self.access.clone(),
            chat_group_id: self.chat_group_id.clone(),
            member_count: self.members.len(),
            created_at: self.created_at,
        }
    }
}
