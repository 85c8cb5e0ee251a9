use crate::models::{Community, JoinProof, JoinRequest, JoinSubmission};
use crate::services::store::{MembershipStore, StoreError, StoreMode};
use crate::services::telegram::{InviteIssuer, Notification};
use crate::services::verify::VerificationGateway;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tongate_protocol::AccessPolicy;

/// Upper bound on a single gateway verification call.
pub const VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Invites are single-use and expire after a day.
pub const INVITE_MEMBER_LIMIT: u32 = 1;
pub const INVITE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Terminal failure of a join, reachable from validation or verification.
/// Granting and invite issuance never surface here except as
/// `Persistence`; the invite issuer falls back internally.
#[derive(Debug, Error)]
pub enum JoinFailure {
    #[error("Missing required fields: {0}")]
    InvalidRequest(String),

    #[error("Community not found")]
    CommunityNotFound,

    #[error("This community requires {required} access, but a {requested} join was requested")]
    MethodMismatch {
        required: &'static str,
        requested: &'static str,
    },

    #[error("{0}")]
    VerificationRejected(String),

    #[error("Membership update failed")]
    Persistence(#[source] StoreError),

    #[error("Verification timed out")]
    Timeout,
}

/// Successful join: the invite reference plus a user-facing confirmation.
#[derive(Debug, Clone)]
pub struct JoinGrant {
    pub invite_link: String,
    pub message: String,
}

/// Orchestrates a join request: validate shape, verify the claim against
/// the community's access policy, mutate membership, issue the invite,
/// and send the confirmation.
///
/// Collaborators are injected at construction; the service holds no
/// per-request state and repeat invocations with the same wallet and
/// community are idempotent on membership.
#[derive(Clone)]
pub struct JoinService {
    store: Arc<dyn MembershipStore>,
    gateway: Arc<dyn VerificationGateway>,
    bot: Arc<dyn InviteIssuer>,
    recipient_wallet: String,
    /// Override destination for confirmation messages; defaults to the
    /// community's own group.
    notify_chat: Option<String>,
}

impl JoinService {
    pub fn new(
        store: Arc<dyn MembershipStore>,
        gateway: Arc<dyn VerificationGateway>,
        bot: Arc<dyn InviteIssuer>,
        recipient_wallet: String,
        notify_chat: Option<String>,
    ) -> Self {
        Self {
            store,
            gateway,
            bot,
            recipient_wallet,
            notify_chat,
        }
    }

    pub async fn run(&self, submission: JoinSubmission) -> Result<JoinGrant, JoinFailure> {
        // Validating: shape check before any collaborator is contacted.
        let request = submission
            .validate()
            .map_err(|missing| JoinFailure::InvalidRequest(missing.join(", ")))?;

        tracing::info!(
            community = %request.community_id,
            wallet = %request.wallet_address,
            method = request.proof.method_label(),
            "join request validated"
        );

        let community = self
            .store
            .get_community(&request.community_id)
            .await
            .map_err(JoinFailure::Persistence)?
            .ok_or(JoinFailure::CommunityNotFound)?;

        // Verifying
        self.verify(&request, &community).await?;
        tracing::info!(community = %community.id, wallet = %request.wallet_address, "claim verified");

        // Granting: community member set first, so a partial failure
        // leaves the member list authoritative.
        match self
            .store
            .add_member(&community.id, &request.wallet_address)
            .await
        {
            Ok(()) => {}
            Err(StoreError::CommunityNotFound) => return Err(JoinFailure::CommunityNotFound),
            Err(e) => return Err(JoinFailure::Persistence(e)),
        }
        self.store
            .record_join(&request.wallet_address, &community.id)
            .await
            .map_err(JoinFailure::Persistence)?;

        // Notifying: the invite issuer falls back internally, so the flow
        // completes once we have a link; the confirmation is best-effort.
        let invite_link = self
            .bot
            .create_invite(&community.chat_group_id, INVITE_MEMBER_LIMIT, INVITE_TTL)
            .await;

        let note = match &request.proof {
            JoinProof::Payment { tx_reference, amount } => Notification::PaymentConfirmed {
                amount: *amount,
                tx_reference: tx_reference.clone(),
                community_title: community.title.clone(),
            },
            JoinProof::Nft { asset_reference } => Notification::NftVerified {
                asset_reference: asset_reference.clone(),
                community_title: community.title.clone(),
            },
        };
        let notify_chat = self
            .notify_chat
            .as_deref()
            .unwrap_or(&community.chat_group_id);
        self.bot.notify(notify_chat, &note).await;

        tracing::info!(community = %community.id, wallet = %request.wallet_address, "join completed");
        Ok(JoinGrant {
            message: self.grant_message(&request.proof),
            invite_link,
        })
    }

    async fn verify(&self, request: &JoinRequest, community: &Community) -> Result<(), JoinFailure> {
        match (&community.access, &request.proof) {
            (AccessPolicy::Payment { amount: required }, JoinProof::Payment { tx_reference, .. }) => {
                let check = timeout(
                    VERIFY_TIMEOUT,
                    self.gateway
                        .verify_payment(tx_reference, *required, &self.recipient_wallet),
                )
                .await
                .map_err(|_| JoinFailure::Timeout)?;
                if !check.valid {
                    return Err(JoinFailure::VerificationRejected(
                        "Transaction verification failed".to_string(),
                    ));
                }
            }
            (
                AccessPolicy::NftOwnership { collection, token_id },
                JoinProof::Nft { asset_reference },
            ) => {
                // When the policy pins a token, the claimed asset must be
                // that token.
                if token_id.as_deref().is_some_and(|t| t != asset_reference.as_str()) {
                    return Err(JoinFailure::VerificationRejected(
                        "NFT ownership verification failed".to_string(),
                    ));
                }
                let check = timeout(
                    VERIFY_TIMEOUT,
                    self.gateway.verify_asset_ownership(
                        &request.wallet_address,
                        collection,
                        Some(asset_reference.as_str()),
                    ),
                )
                .await
                .map_err(|_| JoinFailure::Timeout)?;
                if !check.valid {
                    return Err(JoinFailure::VerificationRejected(
                        "NFT ownership verification failed".to_string(),
                    ));
                }
            }
            (policy, proof) => {
                return Err(JoinFailure::MethodMismatch {
                    required: policy.method_label(),
                    requested: proof.method_label(),
                });
            }
        }
        Ok(())
    }

    fn grant_message(&self, proof: &JoinProof) -> String {
        let base = match proof {
            JoinProof::Payment { amount, .. } => {
                format!("Payment of {amount} TON verified successfully!")
            }
            JoinProof::Nft { .. } => "NFT ownership verified successfully!".to_string(),
        };
        match self.store.mode() {
            StoreMode::Demo => format!("{base} (demo mode)"),
            StoreMode::Live => base,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MemberRecord, ProofFields};
    use crate::services::memory_store::MemoryStore;
    use crate::services::verify::{OwnershipCheck, PaymentCheck};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tongate_protocol::{BotStatus, GatewayStatus, JoinNftRequest, JoinPaymentRequest};

    fn payment_community(id: &str, amount: f64) -> Community {
        Community {
            id: id.to_string(),
            title: format!("Community {id}"),
            description: "test".to_string(),
            category: "Test".to_string(),
            access: AccessPolicy::Payment { amount },
            chat_group_id: format!("group_{id}"),
            members: HashSet::new(),
            created_at: Utc::now(),
        }
    }

    fn nft_community(id: &str, collection: &str) -> Community {
        Community {
            access: AccessPolicy::NftOwnership {
                collection: collection.to_string(),
                token_id: None,
            },
            ..payment_community(id, 0.0)
        }
    }

    /// Store wrapper counting collaborator calls.
    struct CountingStore {
        inner: MemoryStore,
        lookups: AtomicUsize,
        writes: AtomicUsize,
    }

    impl CountingStore {
        fn new(communities: Vec<Community>) -> Arc<Self> {
            Arc::new(Self {
                inner: MemoryStore::with_communities(communities),
                lookups: AtomicUsize::new(0),
                writes: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl MembershipStore for CountingStore {
        async fn get_community(&self, id: &str) -> Result<Option<Community>, StoreError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.get_community(id).await
        }

        async fn list_communities(
            &self,
            category: Option<&str>,
        ) -> Result<Vec<Community>, StoreError> {
            self.inner.list_communities(category).await
        }

        async fn add_member(&self, community_id: &str, wallet: &str) -> Result<(), StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.add_member(community_id, wallet).await
        }

        async fn record_join(&self, wallet: &str, community_id: &str) -> Result<(), StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.record_join(wallet, community_id).await
        }

        async fn ensure_member(&self, wallet: &str) -> Result<MemberRecord, StoreError> {
            self.inner.ensure_member(wallet).await
        }

        fn mode(&self) -> StoreMode {
            self.inner.mode()
        }
    }

    struct MockGateway {
        verdict: bool,
        delay: Option<Duration>,
        payment_calls: AtomicUsize,
        ownership_calls: AtomicUsize,
    }

    impl MockGateway {
        fn approving() -> Arc<Self> {
            Arc::new(Self {
                verdict: true,
                delay: None,
                payment_calls: AtomicUsize::new(0),
                ownership_calls: AtomicUsize::new(0),
            })
        }

        fn rejecting() -> Arc<Self> {
            Arc::new(Self {
                verdict: false,
                delay: None,
                payment_calls: AtomicUsize::new(0),
                ownership_calls: AtomicUsize::new(0),
            })
        }

        fn stalled() -> Arc<Self> {
            Arc::new(Self {
                verdict: true,
                delay: Some(Duration::from_secs(60)),
                payment_calls: AtomicUsize::new(0),
                ownership_calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.payment_calls.load(Ordering::SeqCst) + self.ownership_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl VerificationGateway for MockGateway {
        async fn verify_payment(
            &self,
            _tx_reference: &str,
            expected_amount: f64,
            _recipient: &str,
        ) -> PaymentCheck {
            self.payment_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            PaymentCheck {
                valid: self.verdict,
                observed_amount: Some(expected_amount),
            }
        }

        async fn verify_asset_ownership(
            &self,
            _wallet: &str,
            _collection: &str,
            token_id: Option<&str>,
        ) -> OwnershipCheck {
            self.ownership_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            OwnershipCheck {
                valid: self.verdict,
                token_id: token_id.map(str::to_string),
            }
        }

        fn status(&self) -> GatewayStatus {
            GatewayStatus {
                mode: "mock".to_string(),
                endpoint: None,
            }
        }
    }

    struct MockIssuer {
        invites: AtomicUsize,
        notifies: AtomicUsize,
    }

    impl MockIssuer {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                invites: AtomicUsize::new(0),
                notifies: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl InviteIssuer for MockIssuer {
        async fn create_invite(
            &self,
            chat_group_id: &str,
            _member_limit: u32,
            _expire_in: Duration,
        ) -> String {
            self.invites.fetch_add(1, Ordering::SeqCst);
            format!("https://t.me/+real_{chat_group_id}")
        }

        async fn notify(&self, _chat_id: &str, _note: &Notification) {
            self.notifies.fetch_add(1, Ordering::SeqCst);
        }

        fn status(&self) -> BotStatus {
            BotStatus {
                initialized: true,
                mode: "mock".to_string(),
                token_present: false,
            }
        }
    }

    fn service(
        store: Arc<CountingStore>,
        gateway: Arc<MockGateway>,
        issuer: Arc<MockIssuer>,
    ) -> JoinService {
        JoinService::new(store, gateway, issuer, "EQRecipient".to_string(), None)
    }

    fn payment_submission(community_id: &str, wallet: &str, amount: f64) -> JoinSubmission {
        JoinSubmission::payment(
            community_id,
            JoinPaymentRequest {
                wallet_address: Some(wallet.to_string()),
                tx_reference: Some("tx_abc".to_string()),
                amount: Some(amount),
            },
        )
    }

    #[tokio::test]
    async fn missing_fields_fail_before_any_collaborator_call() {
        let store = CountingStore::new(vec![payment_community("1", 2.5)]);
        let gateway = MockGateway::approving();
        let issuer = MockIssuer::new();
        let joins = service(store.clone(), gateway.clone(), issuer.clone());

        let submission = JoinSubmission {
            community_id: "1".to_string(),
            wallet_address: None,
            proof: ProofFields::Payment {
                tx_reference: None,
                amount: None,
            },
        };
        let err = joins.run(submission).await.unwrap_err();

        assert!(matches!(err, JoinFailure::InvalidRequest(_)));
        assert_eq!(store.lookups.load(Ordering::SeqCst), 0);
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
        assert_eq!(gateway.calls(), 0);
        assert_eq!(issuer.invites.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_community_fails_without_verification() {
        let store = CountingStore::new(vec![payment_community("1", 2.5)]);
        let gateway = MockGateway::approving();
        let issuer = MockIssuer::new();
        let joins = service(store.clone(), gateway.clone(), issuer.clone());

        let err = joins
            .run(payment_submission("999", "EQWallet", 2.5))
            .await
            .unwrap_err();

        assert!(matches!(err, JoinFailure::CommunityNotFound));
        assert_eq!(gateway.calls(), 0);
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn method_mismatch_is_rejected_before_the_gateway() {
        let store = CountingStore::new(vec![nft_community("2", "EQCollection")]);
        let gateway = MockGateway::approving();
        let issuer = MockIssuer::new();
        let joins = service(store.clone(), gateway.clone(), issuer.clone());

        let err = joins
            .run(payment_submission("2", "EQWallet", 2.5))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            JoinFailure::MethodMismatch {
                required: "nft",
                requested: "payment"
            }
        ));
        assert_eq!(gateway.calls(), 0);
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rejected_verification_leaves_membership_untouched() {
        let store = CountingStore::new(vec![nft_community("2", "EQCollection")]);
        let gateway = MockGateway::rejecting();
        let issuer = MockIssuer::new();
        let joins = service(store.clone(), gateway.clone(), issuer.clone());

        let err = joins
            .run(JoinSubmission::nft(
                "2",
                JoinNftRequest {
                    wallet_address: Some("EQWallet".to_string()),
                    asset_reference: Some("EQWrongItem".to_string()),
                },
            ))
            .await
            .unwrap_err();

        assert!(matches!(err, JoinFailure::VerificationRejected(_)));
        assert_eq!(gateway.calls(), 1);
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
        assert_eq!(issuer.invites.load(Ordering::SeqCst), 0);

        let community = store.get_community("2").await.unwrap().unwrap();
        assert!(!community.members.contains("EQWallet"));
    }

    #[tokio::test]
    async fn successful_join_grants_membership_invite_and_notification() {
        let store = CountingStore::new(vec![payment_community("1", 2.5)]);
        let gateway = MockGateway::approving();
        let issuer = MockIssuer::new();
        let joins = service(store.clone(), gateway.clone(), issuer.clone());

        let grant = joins
            .run(payment_submission("1", "EQWallet", 2.5))
            .await
            .unwrap();

        assert_eq!(grant.invite_link, "https://t.me/+real_group_1");
        assert!(grant.message.contains("2.5 TON"));
        assert_eq!(issuer.invites.load(Ordering::SeqCst), 1);
        assert_eq!(issuer.notifies.load(Ordering::SeqCst), 1);

        let community = store.get_community("1").await.unwrap().unwrap();
        assert!(community.members.contains("EQWallet"));
        let record = store.ensure_member("EQWallet").await.unwrap();
        assert!(record.joined_communities.contains("1"));
    }

    #[tokio::test]
    async fn repeat_joins_do_not_duplicate_membership() {
        let store = CountingStore::new(vec![payment_community("1", 2.5)]);
        let gateway = MockGateway::approving();
        let issuer = MockIssuer::new();
        let joins = service(store.clone(), gateway.clone(), issuer.clone());

        for _ in 0..3 {
            joins
                .run(payment_submission("1", "EQWallet", 2.5))
                .await
                .unwrap();
        }

        let community = store.get_community("1").await.unwrap().unwrap();
        assert_eq!(community.members.len(), 1);
        let record = store.ensure_member("EQWallet").await.unwrap();
        assert_eq!(record.joined_communities.len(), 1);
    }

    #[tokio::test]
    async fn pinned_token_must_match_the_claimed_asset() {
        let mut community = nft_community("2", "EQCollection");
        community.access = AccessPolicy::NftOwnership {
            collection: "EQCollection".to_string(),
            token_id: Some("EQItem1".to_string()),
        };
        let store = CountingStore::new(vec![community]);
        let gateway = MockGateway::approving();
        let issuer = MockIssuer::new();
        let joins = service(store.clone(), gateway.clone(), issuer.clone());

        let err = joins
            .run(JoinSubmission::nft(
                "2",
                JoinNftRequest {
                    wallet_address: Some("EQWallet".to_string()),
                    asset_reference: Some("EQItem2".to_string()),
                },
            ))
            .await
            .unwrap_err();

        assert!(matches!(err, JoinFailure::VerificationRejected(_)));
        assert_eq!(gateway.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_gateway_times_out() {
        let store = CountingStore::new(vec![payment_community("1", 2.5)]);
        let gateway = MockGateway::stalled();
        let issuer = MockIssuer::new();
        let joins = service(store.clone(), gateway.clone(), issuer.clone());

        let err = joins
            .run(payment_submission("1", "EQWallet", 2.5))
            .await
            .unwrap_err();

        assert!(matches!(err, JoinFailure::Timeout));
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }
}
