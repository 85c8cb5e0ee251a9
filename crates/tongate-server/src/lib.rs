//! Tongate Server Library
//!
//! This module exposes the server components for testing and embedding.

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod state;

use anyhow::Result;
use services::memory_store::MemoryStore;
use services::pg_store::PgStore;
use services::store::MembershipStore;
use services::telegram::{InviteIssuer, TelegramBot};
use services::verify::{DemoGateway, TonIndexGateway, VerificationGateway};
use std::sync::Arc;

/// Create and configure the server application.
///
/// Each collaborator is built from configuration and injected into the
/// shared state; unconfigured collaborators come up in their demo modes
/// instead of failing startup.
pub async fn create_app(config: state::Config) -> Result<axum::Router> {
    let store = build_store(&config).await;
    let gateway = build_gateway(&config)?;
    let bot: Arc<dyn InviteIssuer> =
        Arc::new(TelegramBot::new(config.telegram_bot_token.clone())?);

    let app_state = state::AppState::new(config, store, gateway, bot);
    Ok(api::create_router(app_state))
}

async fn build_store(config: &state::Config) -> Arc<dyn MembershipStore> {
    if let Some(url) = &config.database_url {
        match db::init_pool(url).await {
            Ok(pool) => match db::run_migrations(&pool).await {
                Ok(()) => return Arc::new(PgStore::new(pool)),
                Err(e) => {
                    tracing::warn!("Migrations failed, serving the demo catalog instead: {e:#}")
                }
            },
            Err(e) => {
                tracing::warn!("Database unavailable, serving the demo catalog instead: {e:#}")
            }
        }
    } else {
        tracing::info!("DATABASE_URL not set, serving the demo catalog");
    }
    Arc::new(MemoryStore::with_demo_catalog())
}

fn build_gateway(config: &state::Config) -> Result<Arc<dyn VerificationGateway>> {
    match &config.ton_api_url {
        Some(url) => Ok(Arc::new(TonIndexGateway::new(
            url.clone(),
            config.ton_api_key.clone(),
        )?)),
        None => {
            tracing::warn!("TON_API_URL not set, verification runs in demo mode");
            Ok(Arc::new(DemoGateway))
        }
    }
}
