use tongate_protocol::{JoinNftRequest, JoinPaymentRequest};

/// A join request as it arrives off the wire, before validation. Consumed
/// by the grant workflow and discarded with the response.
#[derive(Debug, Clone)]
pub struct JoinSubmission {
    pub community_id: String,
    pub wallet_address: Option<String>,
    pub proof: ProofFields,
}

/// Method-specific proof fields, still unvalidated.
#[derive(Debug, Clone)]
pub enum ProofFields {
    Payment {
        tx_reference: Option<String>,
        amount: Option<f64>,
    },
    Nft {
        asset_reference: Option<String>,
    },
}

/// A join request that passed shape validation.
#[derive(Debug, Clone)]
pub struct JoinRequest {
    pub community_id: String,
    pub wallet_address: String,
    pub proof: JoinProof,
}

#[derive(Debug, Clone)]
pub enum JoinProof {
    Payment { tx_reference: String, amount: f64 },
    Nft { asset_reference: String },
}

impl JoinProof {
    pub fn method_label(&self) -> &'static str {
        match self {
            JoinProof::Payment { .. } => "payment",
            JoinProof::Nft { .. } => "nft",
        }
    }
}

impl JoinSubmission {
    pub fn payment(community_id: impl Into<String>, body: JoinPaymentRequest) -> Self {
        Self {
            community_id: community_id.into(),
            wallet_address: body.wallet_address,
            proof: ProofFields::Payment {
                tx_reference: body.tx_reference,
                amount: body.amount,
            },
        }
    }

    pub fn nft(community_id: impl Into<String>, body: JoinNftRequest) -> Self {
        Self {
            community_id: community_id.into(),
            wallet_address: body.wallet_address,
            proof: ProofFields::Nft {
                asset_reference: body.asset_reference,
            },
        }
    }

    /// Shape check. Returns the validated request or the list of missing
    /// field names, wire-cased so the caller can echo them back verbatim.
    pub fn validate(self) -> Result<JoinRequest, Vec<&'static str>> {
        let mut missing = Vec::new();

        let wallet_address = self.wallet_address.filter(|w| !w.is_empty());
        if wallet_address.is_none() {
            missing.push("walletAddress");
        }

        let proof = match self.proof {
            ProofFields::Payment {
                tx_reference,
                amount,
            } => {
                let tx_reference = tx_reference.filter(|t| !t.is_empty());
                if tx_reference.is_none() {
                    missing.push("txReference");
                }
                if amount.is_none() {
                    missing.push("amount");
                }
                tx_reference.zip(amount).map(|(tx_reference, amount)| {
                    JoinProof::Payment {
                        tx_reference,
                        amount,
                    }
                })
            }
            ProofFields::Nft { asset_reference } => {
                let asset_reference = asset_reference.filter(|a| !a.is_empty());
                if asset_reference.is_none() {
                    missing.push("assetReference");
                }
                asset_reference.map(|asset_reference| JoinProof::Nft { asset_reference })
            }
        };

        match (wallet_address, proof) {
            (Some(wallet_address), Some(proof)) => Ok(JoinRequest {
                community_id: self.community_id,
                wallet_address,
                proof,
            }),
            _ => Err(missing),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_reports_all_missing_payment_fields() {
        let submission = JoinSubmission::payment("1", JoinPaymentRequest::default());
        let missing = submission.validate().unwrap_err();
        assert_eq!(missing, vec!["walletAddress", "txReference", "amount"]);
    }

    #[test]
    fn validate_rejects_empty_strings() {
        let submission = JoinSubmission::nft(
            "2",
            JoinNftRequest {
                wallet_address: Some(String::new()),
                asset_reference: Some("EQItem".into()),
            },
        );
        assert_eq!(submission.validate().unwrap_err(), vec!["walletAddress"]);
    }

    #[test]
    fn validate_passes_complete_payment() {
        let submission = JoinSubmission::payment(
            "1",
            JoinPaymentRequest {
                wallet_address: Some("EQWallet".into()),
                tx_reference: Some("abc123".into()),
                amount: Some(2.5),
            },
        );
        let request = submission.validate().unwrap();
        assert_eq!(request.wallet_address, "EQWallet");
        assert!(matches!(request.proof, JoinProof::Payment { amount, .. } if amount == 2.5));
    }
}
