use crate::models::{Community, MemberRecord};
use crate::services::store::{CATEGORY_ALL, MembershipStore, StoreError, StoreMode};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::collections::HashSet;
use tongate_protocol::AccessPolicy;

/// Postgres-backed store. All membership inserts are upserts with
/// `ON CONFLICT DO NOTHING`, so concurrent duplicate joins from the same
/// wallet collapse into one row.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

const COMMUNITY_COLUMNS: &str = "id, title, description, category, access_type, ton_amount, \
     nft_collection, nft_token_id, chat_group_id, created_at";

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn community_from_row(row: &PgRow, members: HashSet<String>) -> Result<Community, StoreError> {
        let id: String = row.try_get("id")?;
        let access_type: String = row.try_get("access_type")?;
        let access = match access_type.as_str() {
            "payment" => AccessPolicy::Payment {
                amount: row.try_get::<Option<f64>, _>("ton_amount")?.unwrap_or(0.0),
            },
            "nft" => AccessPolicy::NftOwnership {
                collection: row
                    .try_get::<Option<String>, _>("nft_collection")?
                    .unwrap_or_default(),
                token_id: row.try_get("nft_token_id")?,
            },
            other => return Err(StoreError::InvalidPolicy(format!("{other} ({id})"))),
        };
        Ok(Community {
            id,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            category: row.try_get("category")?,
            access,
            chat_group_id: row.try_get("chat_group_id")?,
            members,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        })
    }

    async fn load_members(&self, community_id: &str) -> Result<HashSet<String>, StoreError> {
        let wallets: Vec<String> = sqlx::query_scalar(
            "SELECT wallet_address FROM community_members WHERE community_id = $1",
        )
        .bind(community_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(wallets.into_iter().collect())
    }
}

#[async_trait]
impl MembershipStore for PgStore {
    async fn get_community(&self, id: &str) -> Result<Option<Community>, StoreError> {
        let query = format!("SELECT {COMMUNITY_COLUMNS} FROM communities WHERE id = $1");
        let Some(row) = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };
        let members = self.load_members(id).await?;
        Ok(Some(Self::community_from_row(&row, members)?))
    }

    async fn list_communities(&self, category: Option<&str>) -> Result<Vec<Community>, StoreError> {
        let category = category.filter(|c| *c != CATEGORY_ALL);
        let rows = match category {
            Some(cat) => {
                let query = format!(
                    "SELECT {COMMUNITY_COLUMNS} FROM communities \
                     WHERE category = $1 ORDER BY created_at"
                );
                sqlx::query(&query).bind(cat).fetch_all(&self.pool).await?
            }
            None => {
                let query =
                    format!("SELECT {COMMUNITY_COLUMNS} FROM communities ORDER BY created_at");
                sqlx::query(&query).fetch_all(&self.pool).await?
            }
        };

        let mut communities = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: String = row.try_get("id")?;
            let members = self.load_members(&id).await?;
            communities.push(Self::community_from_row(row, members)?);
        }
        Ok(communities)
    }

    async fn add_member(&self, community_id: &str, wallet: &str) -> Result<(), StoreError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM communities WHERE id = $1)")
                .bind(community_id)
                .fetch_one(&self.pool)
                .await?;
        if !exists {
            return Err(StoreError::CommunityNotFound);
        }

        sqlx::query(
            "INSERT INTO community_members (community_id, wallet_address) \
             VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(community_id)
        .bind(wallet)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_join(&self, wallet: &str, community_id: &str) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO members (wallet_address) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(wallet)
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "INSERT INTO member_joins (wallet_address, community_id) \
             VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(wallet)
        .bind(community_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn ensure_member(&self, wallet: &str) -> Result<MemberRecord, StoreError> {
        sqlx::query("INSERT INTO members (wallet_address) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(wallet)
            .execute(&self.pool)
            .await?;

        let row = sqlx::query("SELECT wallet_address, created_at FROM members WHERE wallet_address = $1")
            .bind(wallet)
            .fetch_one(&self.pool)
            .await?;

        let joined: Vec<String> =
            sqlx::query_scalar("SELECT community_id FROM member_joins WHERE wallet_address = $1")
                .bind(wallet)
                .fetch_all(&self.pool)
                .await?;

        Ok(MemberRecord {
            wallet_address: row.try_get("wallet_address")?,
            joined_communities: joined.into_iter().collect(),
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        })
    }

    fn mode(&self) -> StoreMode {
        StoreMode::Live
    }
}
