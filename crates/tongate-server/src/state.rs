use crate::services::join::JoinService;
use crate::services::store::MembershipStore;
use crate::services::telegram::InviteIssuer;
use crate::services::verify::VerificationGateway;
use std::sync::Arc;

#[derive(Clone)]
pub struct Config {
    pub bind_address: String,
    /// Absent means demo mode: the in-memory fixture catalog.
    pub database_url: Option<String>,
    /// Absent means synthetic invite links and dropped notifications.
    pub telegram_bot_token: Option<String>,
    /// Optional override for where confirmations are posted; defaults to
    /// each community's own group.
    pub notify_chat_id: Option<String>,
    /// Wallet that gated payments must be sent to.
    pub recipient_wallet: String,
    /// TON index endpoint; absent selects the demo gateway.
    pub ton_api_url: Option<String>,
    pub ton_api_key: Option<String>,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3001".to_string());

        let recipient_wallet = std::env::var("RECIPIENT_WALLET_ADDRESS").unwrap_or_else(|_| {
            tracing::warn!(
                "RECIPIENT_WALLET_ADDRESS not set, using placeholder (payments cannot verify!)"
            );
            "EQDemo_Recipient_Wallet".to_string()
        });

        Ok(Config {
            bind_address,
            database_url: std::env::var("DATABASE_URL").ok(),
            telegram_bot_token: std::env::var("TELEGRAM_BOT_TOKEN").ok(),
            notify_chat_id: std::env::var("NOTIFY_CHAT_ID").ok(),
            recipient_wallet,
            ton_api_url: std::env::var("TON_API_URL").ok(),
            ton_api_key: std::env::var("TON_API_KEY").ok(),
        })
    }

    /// Demo-everything configuration used by tests.
    pub fn demo() -> Self {
        Config {
            bind_address: "127.0.0.1:0".to_string(),
            database_url: None,
            telegram_bot_token: None,
            notify_chat_id: None,
            recipient_wallet: "EQDemo_Recipient_Wallet".to_string(),
            ton_api_url: None,
            ton_api_key: None,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn MembershipStore>,
    pub gateway: Arc<dyn VerificationGateway>,
    pub bot: Arc<dyn InviteIssuer>,
    pub joins: JoinService,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn MembershipStore>,
        gateway: Arc<dyn VerificationGateway>,
        bot: Arc<dyn InviteIssuer>,
    ) -> Self {
        let joins = JoinService::new(
            store.clone(),
            gateway.clone(),
            bot.clone(),
            config.recipient_wallet.clone(),
            config.notify_chat_id.clone(),
        );

        Self {
            config,
            store,
            gateway,
            bot,
            joins,
        }
    }
}
