use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tongate_protocol::GatewayStatus;

/// Result of a payment lookup. `observed_amount` is what the chain index
/// actually saw, in TON, when the transaction was found.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentCheck {
    pub valid: bool,
    pub observed_amount: Option<f64>,
}

/// Result of an ownership lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnershipCheck {
    pub valid: bool,
    pub token_id: Option<String>,
}

impl PaymentCheck {
    pub fn rejected() -> Self {
        Self {
            valid: false,
            observed_amount: None,
        }
    }
}

impl OwnershipCheck {
    pub fn rejected() -> Self {
        Self {
            valid: false,
            token_id: None,
        }
    }
}

/// Capability boundary for confirming payment and asset-ownership claims.
///
/// Both operations are idempotent reads and fail closed: any inability to
/// confirm the claim yields `valid = false`, never an error treated as
/// success. Implementations bound their own network calls; the join
/// workflow adds an outer timeout on top.
#[async_trait]
pub trait VerificationGateway: Send + Sync {
    async fn verify_payment(
        &self,
        tx_reference: &str,
        expected_amount: f64,
        recipient: &str,
    ) -> PaymentCheck;

    async fn verify_asset_ownership(
        &self,
        wallet: &str,
        collection: &str,
        token_id: Option<&str>,
    ) -> OwnershipCheck;

    fn status(&self) -> GatewayStatus;
}

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const NANOTONS_PER_TON: f64 = 1_000_000_000.0;

fn to_nanotons(amount: f64) -> u128 {
    (amount * NANOTONS_PER_TON).round() as u128
}

/// Gateway backed by a toncenter-style TON HTTP index.
///
/// Payments are confirmed by looking the transaction up under the
/// recipient account and comparing the incoming value in nanotons;
/// ownership by listing NFT items for the owner/collection pair.
pub struct TonIndexGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TransactionsResponse {
    #[serde(default)]
    transactions: Vec<TransactionRecord>,
}

#[derive(Debug, Deserialize)]
struct TransactionRecord {
    in_msg: Option<InboundMessage>,
}

#[derive(Debug, Deserialize)]
struct InboundMessage {
    value: Option<String>,
    destination: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NftItemsResponse {
    #[serde(default)]
    nft_items: Vec<NftItem>,
}

#[derive(Debug, Deserialize)]
struct NftItem {
    address: String,
}

impl TonIndexGateway {
    pub fn new(base_url: String, api_key: Option<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent("TongateBot/1.0")
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let mut request = self.client.get(format!("{}{}", self.base_url, path));
        if let Some(key) = &self.api_key {
            request = request.header("X-API-Key", key);
        }
        request
    }

    async fn fetch_transaction(
        &self,
        tx_reference: &str,
        recipient: &str,
    ) -> anyhow::Result<Option<InboundMessage>> {
        let response = self
            .get("/transactions")
            .query(&[("account", recipient), ("hash", tx_reference), ("limit", "1")])
            .send()
            .await?
            .error_for_status()?;
        let body: TransactionsResponse = response.json().await?;
        Ok(body.transactions.into_iter().next().and_then(|tx| tx.in_msg))
    }

    async fn fetch_owned_items(
        &self,
        wallet: &str,
        collection: &str,
    ) -> anyhow::Result<Vec<NftItem>> {
        let response = self
            .get("/nft/items")
            .query(&[
                ("owner_address", wallet),
                ("collection_address", collection),
                ("limit", "100"),
            ])
            .send()
            .await?
            .error_for_status()?;
        let body: NftItemsResponse = response.json().await?;
        Ok(body.nft_items)
    }
}

#[async_trait]
impl VerificationGateway for TonIndexGateway {
    async fn verify_payment(
        &self,
        tx_reference: &str,
        expected_amount: f64,
        recipient: &str,
    ) -> PaymentCheck {
        let in_msg = match self.fetch_transaction(tx_reference, recipient).await {
            Ok(Some(msg)) => msg,
            Ok(None) => {
                tracing::info!(tx_reference, "transaction not found under recipient account");
                return PaymentCheck::rejected();
            }
            Err(e) => {
                tracing::warn!(tx_reference, "transaction lookup failed: {e:#}");
                return PaymentCheck::rejected();
            }
        };

        if in_msg
            .destination
            .as_deref()
            .is_some_and(|dest| !dest.eq_ignore_ascii_case(recipient))
        {
            tracing::info!(tx_reference, "transaction destination does not match recipient");
            return PaymentCheck::rejected();
        }

        let Some(observed) = in_msg.value.as_deref().and_then(|v| v.parse::<u128>().ok())
        else {
            tracing::warn!(tx_reference, "transaction value missing or unparseable");
            return PaymentCheck::rejected();
        };

        PaymentCheck {
            valid: observed >= to_nanotons(expected_amount),
            observed_amount: Some(observed as f64 / NANOTONS_PER_TON),
        }
    }

    async fn verify_asset_ownership(
        &self,
        wallet: &str,
        collection: &str,
        token_id: Option<&str>,
    ) -> OwnershipCheck {
        let items = match self.fetch_owned_items(wallet, collection).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(wallet, collection, "NFT lookup failed: {e:#}");
                return OwnershipCheck::rejected();
            }
        };

        let matched = match token_id {
            Some(required) => items.into_iter().find(|item| item.address == required),
            None => items.into_iter().next(),
        };

        match matched {
            Some(item) => OwnershipCheck {
                valid: true,
                token_id: Some(item.address),
            },
            None => OwnershipCheck::rejected(),
        }
    }

    fn status(&self) -> GatewayStatus {
        GatewayStatus {
            mode: "live".to_string(),
            endpoint: Some(self.base_url.clone()),
        }
    }
}

/// Always-approving gateway for demo deployments and tests. Selected only
/// when no TON index endpoint is configured; /api/status reports it so
/// nobody mistakes approved-by-default for verified.
pub struct DemoGateway;

#[async_trait]
impl VerificationGateway for DemoGateway {
    async fn verify_payment(
        &self,
        tx_reference: &str,
        expected_amount: f64,
        _recipient: &str,
    ) -> PaymentCheck {
        tracing::info!(tx_reference, "[demo] approving payment without chain lookup");
        PaymentCheck {
            valid: true,
            observed_amount: Some(expected_amount),
        }
    }

    async fn verify_asset_ownership(
        &self,
        wallet: &str,
        _collection: &str,
        token_id: Option<&str>,
    ) -> OwnershipCheck {
        tracing::info!(wallet, "[demo] approving NFT ownership without chain lookup");
        OwnershipCheck {
            valid: true,
            token_id: token_id.map(str::to_string),
        }
    }

    fn status(&self) -> GatewayStatus {
        GatewayStatus {
            mode: "demo".to_string(),
            endpoint: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nanoton_conversion_rounds_fractional_ton() {
        assert_eq!(to_nanotons(2.5), 2_500_000_000);
        assert_eq!(to_nanotons(0.000000001), 1);
    }

    #[tokio::test]
    async fn demo_gateway_echoes_expected_amount() {
        let check = DemoGateway.verify_payment("abc", 2.5, "EQRecipient").await;
        assert!(check.valid);
        assert_eq!(check.observed_amount, Some(2.5));
    }

    #[tokio::test]
    async fn unreachable_index_fails_closed() {
        // Discard port on loopback: the connection is refused immediately
        // and must come back as a rejection, not an error.
        let gateway =
            TonIndexGateway::new("http://127.0.0.1:9".to_string(), None).unwrap();
        let check = gateway.verify_payment("abc", 1.0, "EQRecipient").await;
        assert!(!check.valid);

        let ownership = gateway
            .verify_asset_ownership("EQWallet", "EQCollection", None)
            .await;
        assert!(!ownership.valid);
    }
}
