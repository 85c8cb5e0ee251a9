use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tongate_protocol::BotStatus;

/// Prefix of the placeholder link handed out when the Bot API is
/// unavailable. Fixed so downstream code (and tests) can tell a synthetic
/// invite from a real one.
pub const SYNTHETIC_INVITE_PREFIX: &str = "https://t.me/+demo_";

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Confirmation messages sent after a successful join.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    PaymentConfirmed {
        amount: f64,
        tx_reference: String,
        community_title: String,
    },
    NftVerified {
        asset_reference: String,
        community_title: String,
    },
}

impl Notification {
    fn render(&self) -> String {
        match self {
            Notification::PaymentConfirmed {
                amount,
                tx_reference,
                community_title,
            } => format!(
                "Payment confirmed!\n\n\
                 Amount: {amount} TON\n\
                 Transaction: `{tx_reference}`\n\
                 Community: *{community_title}*\n\n\
                 Use the invite link you received to join the private group."
            ),
            Notification::NftVerified {
                asset_reference,
                community_title,
            } => format!(
                "NFT ownership verified!\n\n\
                 Asset: `{asset_reference}`\n\
                 Community: *{community_title}*\n\n\
                 Use the invite link you received to join the private group."
            ),
        }
    }
}

/// Capability boundary for producing time-limited chat invite links and
/// sending confirmation messages. Neither operation may fail the join
/// flow: invites fall back to a synthetic link, notifications are
/// best-effort.
#[async_trait]
pub trait InviteIssuer: Send + Sync {
    /// Mints a single-use invite for the group, expiring after
    /// `expire_in`. Never errors; on any underlying failure the returned
    /// link carries [`SYNTHETIC_INVITE_PREFIX`].
    async fn create_invite(
        &self,
        chat_group_id: &str,
        member_limit: u32,
        expire_in: Duration,
    ) -> String;

    /// Fire-and-forget confirmation message. Failures are logged and
    /// swallowed.
    async fn notify(&self, chat_id: &str, note: &Notification);

    fn status(&self) -> BotStatus;
}

/// Telegram Bot API client. Runs in demo mode (synthetic invites, dropped
/// notifications) when no bot token is configured.
pub struct TelegramBot {
    client: reqwest::Client,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatInviteLink {
    invite_link: String,
}

impl TelegramBot {
    pub fn new(token: Option<String>) -> anyhow::Result<Self> {
        if token.is_none() {
            tracing::warn!("TELEGRAM_BOT_TOKEN not set, issuing synthetic invite links");
        }
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent("TongateBot/1.0")
            .build()?;
        Ok(Self { client, token })
    }

    fn method_url(&self, token: &str, method: &str) -> String {
        format!("{TELEGRAM_API_BASE}/bot{token}/{method}")
    }

    fn synthetic_invite(chat_group_id: &str) -> String {
        let suffix: String = rand::thread_rng()
            .sample_iter(&rand::distributions::Alphanumeric)
            .take(8)
            .map(char::from)
            .collect();
        format!("{SYNTHETIC_INVITE_PREFIX}{chat_group_id}_{suffix}")
    }

    async fn request_invite(
        &self,
        token: &str,
        chat_group_id: &str,
        member_limit: u32,
        expire_in: Duration,
    ) -> anyhow::Result<String> {
        let expire_date = Utc::now().timestamp() + expire_in.as_secs() as i64;
        let response = self
            .client
            .post(self.method_url(token, "createChatInviteLink"))
            .json(&json!({
                "chat_id": chat_group_id,
                "expire_date": expire_date,
                "member_limit": member_limit,
                "name": format!("Tongate access {}", Utc::now().format("%Y-%m-%d")),
            }))
            .send()
            .await?
            .error_for_status()?;

        let body: ApiResponse<ChatInviteLink> = response.json().await?;
        match (body.ok, body.result) {
            (true, Some(link)) => Ok(link.invite_link),
            _ => anyhow::bail!(
                "Bot API rejected invite: {}",
                body.description.unwrap_or_else(|| "no description".into())
            ),
        }
    }
}

#[async_trait]
impl InviteIssuer for TelegramBot {
    async fn create_invite(
        &self,
        chat_group_id: &str,
        member_limit: u32,
        expire_in: Duration,
    ) -> String {
        let Some(token) = &self.token else {
            return Self::synthetic_invite(chat_group_id);
        };

        match self
            .request_invite(token, chat_group_id, member_limit, expire_in)
            .await
        {
            Ok(link) => link,
            Err(e) => {
                tracing::warn!(chat_group_id, "invite creation failed: {e:#}");
                Self::synthetic_invite(chat_group_id)
            }
        }
    }

    async fn notify(&self, chat_id: &str, note: &Notification) {
        let Some(token) = &self.token else {
            tracing::debug!(chat_id, "no bot token, dropping notification");
            return;
        };

        let result = self
            .client
            .post(self.method_url(token, "sendMessage"))
            .json(&json!({
                "chat_id": chat_id,
                "text": note.render(),
                "parse_mode": "Markdown",
            }))
            .send()
            .await
            .and_then(|r| r.error_for_status());

        if let Err(e) = result {
            tracing::warn!(chat_id, "notification send failed: {e:#}");
        }
    }

    fn status(&self) -> BotStatus {
        BotStatus {
            initialized: self.token.is_some(),
            mode: if self.token.is_some() { "live" } else { "demo" }.to_string(),
            token_present: self.token.is_some(),
        }
    }
}
