use crate::models::{Community, MemberRecord};
use crate::services::store::{CATEGORY_ALL, MembershipStore, StoreError, StoreMode};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tongate_protocol::AccessPolicy;

/// In-memory store serving the demo catalog when no database is
/// configured. Joins are accepted and kept in memory for the lifetime of
/// the process; the catalog is reseeded on restart.
pub struct MemoryStore {
    communities: RwLock<HashMap<String, Community>>,
    members: RwLock<HashMap<String, MemberRecord>>,
}

impl MemoryStore {
    pub fn with_communities(communities: Vec<Community>) -> Self {
        Self {
            communities: RwLock::new(
                communities.into_iter().map(|c| (c.id.clone(), c)).collect(),
            ),
            members: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_demo_catalog() -> Self {
        Self::with_communities(demo_catalog())
    }
}

#[async_trait]
impl MembershipStore for MemoryStore {
    async fn get_community(&self, id: &str) -> Result<Option<Community>, StoreError> {
        Ok(self.communities.read().await.get(id).cloned())
    }

    async fn list_communities(&self, category: Option<&str>) -> Result<Vec<Community>, StoreError> {
        let category = category.filter(|c| *c != CATEGORY_ALL);
        let mut communities: Vec<Community> = self
            .communities
            .read()
            .await
            .values()
            .filter(|c| category.is_none_or(|cat| c.category == cat))
            .cloned()
            .collect();
        communities.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(communities)
    }

    async fn add_member(&self, community_id: &str, wallet: &str) -> Result<(), StoreError> {
        let mut communities = self.communities.write().await;
        let community = communities
            .get_mut(community_id)
            .ok_or(StoreError::CommunityNotFound)?;
        community.members.insert(wallet.to_string());
        Ok(())
    }

    async fn record_join(&self, wallet: &str, community_id: &str) -> Result<(), StoreError> {
        let mut members = self.members.write().await;
        members
            .entry(wallet.to_string())
            .or_insert_with(|| MemberRecord::new(wallet))
            .joined_communities
            .insert(community_id.to_string());
        Ok(())
    }

    async fn ensure_member(&self, wallet: &str) -> Result<MemberRecord, StoreError> {
        let mut members = self.members.write().await;
        Ok(members
            .entry(wallet.to_string())
            .or_insert_with(|| MemberRecord::new(wallet))
            .clone())
    }

    fn mode(&self) -> StoreMode {
        StoreMode::Demo
    }
}

fn demo_community(
    id: &str,
    title: &str,
    description: &str,
    category: &str,
    access: AccessPolicy,
    chat_group_id: &str,
    members: &[&str],
    created: (i32, u32, u32),
) -> Community {
    Community {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        category: category.to_string(),
        access,
        chat_group_id: chat_group_id.to_string(),
        members: members.iter().map(|m| m.to_string()).collect(),
        created_at: Utc
            .with_ymd_and_hms(created.0, created.1, created.2, 0, 0, 0)
            .unwrap(),
    }
}

/// The fixture catalog served in demo mode.
pub fn demo_catalog() -> Vec<Community> {
    vec![
        demo_community(
            "1",
            "TON Developers Hub",
            "A community for TON blockchain developers to share knowledge, \
             discuss projects, and collaborate on innovative solutions.",
            "Development",
            AccessPolicy::Payment { amount: 2.5 },
            "ton_dev_hub",
            &["EQDemo1", "EQDemo2"],
            (2024, 1, 15),
        ),
        demo_community(
            "2",
            "NFT Artists Collective",
            "Connect with digital artists, showcase your NFT creations, and \
             discover the latest trends in the NFT space.",
            "Art & Design",
            AccessPolicy::NftOwnership {
                collection: "EQNFTCollection".to_string(),
                token_id: None,
            },
            "nft_artists",
            &["EQDemo3", "EQDemo4"],
            (2024, 1, 20),
        ),
        demo_community(
            "3",
            "Crypto Trading Signals",
            "Get exclusive trading signals, market analysis, and connect with \
             experienced traders in the crypto space.",
            "Finance",
            AccessPolicy::Payment { amount: 5.0 },
            "crypto_signals",
            &["EQDemo5"],
            (2024, 1, 25),
        ),
        demo_community(
            "4",
            "Web3 Gaming Community",
            "Discuss the latest Web3 games, share gaming experiences, and \
             discover new blockchain-based gaming opportunities.",
            "Gaming",
            AccessPolicy::Payment { amount: 1.5 },
            "web3_gaming",
            &["EQDemo6"],
            (2024, 2, 1),
        ),
        demo_community(
            "5",
            "Blockchain Startups",
            "Network with blockchain entrepreneurs, share startup ideas, and \
             find co-founders.",
            "Business",
            AccessPolicy::Payment { amount: 3.0 },
            "blockchain_startups",
            &["EQDemo7"],
            (2024, 2, 10),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn category_filter_is_exact_and_case_sensitive() {
        let store = MemoryStore::with_demo_catalog();
        let gaming = store.list_communities(Some("Gaming")).await.unwrap();
        assert_eq!(gaming.len(), 1);
        assert_eq!(gaming[0].title, "Web3 Gaming Community");

        assert!(store.list_communities(Some("gaming")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn all_sentinel_lists_everything() {
        let store = MemoryStore::with_demo_catalog();
        let all = store.list_communities(Some(CATEGORY_ALL)).await.unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all.len(), store.list_communities(None).await.unwrap().len());
    }

    #[tokio::test]
    async fn add_member_is_idempotent() {
        let store = MemoryStore::with_demo_catalog();
        let before = store.get_community("1").await.unwrap().unwrap().members.len();

        store.add_member("1", "EQNewWallet").await.unwrap();
        store.add_member("1", "EQNewWallet").await.unwrap();

        let after = store.get_community("1").await.unwrap().unwrap().members.len();
        assert_eq!(after, before + 1);
    }

    #[tokio::test]
    async fn add_member_rejects_unknown_community() {
        let store = MemoryStore::with_demo_catalog();
        assert!(matches!(
            store.add_member("999", "EQWallet").await,
            Err(StoreError::CommunityNotFound)
        ));
    }

    #[tokio::test]
    async fn record_join_creates_record_lazily() {
        let store = MemoryStore::with_demo_catalog();
        store.record_join("EQWallet", "1").await.unwrap();
        store.record_join("EQWallet", "1").await.unwrap();

        let record = store.ensure_member("EQWallet").await.unwrap();
        assert_eq!(record.joined_communities.len(), 1);
        assert!(record.joined_communities.contains("1"));
    }
}
