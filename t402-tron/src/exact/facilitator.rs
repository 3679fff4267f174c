//! Facilitator-side verification and settlement for the TRON `exact`
//! scheme.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use t402::proto::helpers::{is_wildcard_pattern, matches_network_pattern};
use t402::proto::{PaymentPayload, PaymentRequirements, SettleResponse, VerifyResponse};
use t402::scheme::{BoxFuture, SchemeError, SchemeFacilitator, SchemeId};
use t402::timestamp::now_millis;

use super::error::TronFacilitatorError;
use super::types::{
    CONFIRM_TIMEOUT_MS, ExactTronPayload, ExpectedTransfer, MIN_VALIDITY_BUFFER_MS,
    TransactionConfirmation, TransactionVerification, VerifyTransactionRequest,
};
use super::{SCHEME_EXACT, TRON_NAMESPACE};
use crate::address::{addresses_equal, is_valid_address};
use crate::networks::{CAIP2_NETWORKS, default_token, normalize};

/// Full-node access the TRON facilitator needs.
pub trait FacilitatorTronSigner: Send + Sync {
    /// Addresses operated by this facilitator on `network`.
    fn addresses(&self, network: &str) -> Vec<String>;

    /// TRC-20 balance of `owner`, in atomic units.
    fn get_balance<'a>(
        &'a self,
        owner: &'a str,
        contract_address: &'a str,
        network: &'a str,
    ) -> BoxFuture<'a, Result<u128, TronFacilitatorError>>;

    /// Checks the signature and decodes the transfer of a signed
    /// transaction.
    fn verify_transaction<'a>(
        &'a self,
        request: &'a VerifyTransactionRequest,
    ) -> BoxFuture<'a, Result<TransactionVerification, TronFacilitatorError>>;

    /// Broadcasts a signed transaction; returns its id.
    fn broadcast_transaction<'a>(
        &'a self,
        signed_transaction: &'a str,
        network: &'a str,
    ) -> BoxFuture<'a, Result<String, TronFacilitatorError>>;

    /// Waits for `tx_id` to be included.
    fn wait_for_transaction<'a>(
        &'a self,
        tx_id: &'a str,
        network: &'a str,
        timeout_ms: u64,
    ) -> BoxFuture<'a, Result<TransactionConfirmation, TronFacilitatorError>>;

    /// Whether `address` exists on chain.
    fn is_activated<'a>(
        &'a self,
        address: &'a str,
        network: &'a str,
    ) -> BoxFuture<'a, Result<bool, TronFacilitatorError>>;
}

/// Tunables for [`ExactTronFacilitator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExactTronFacilitatorConfig {
    /// Advertise the first facilitator address as `gasSponsor`.
    pub can_sponsor_gas: bool,
    /// How long settlement waits for confirmation, in milliseconds.
    pub confirm_timeout_ms: u64,
}

impl Default for ExactTronFacilitatorConfig {
    fn default() -> Self {
        Self {
            can_sponsor_gas: false,
            confirm_timeout_ms: CONFIRM_TIMEOUT_MS,
        }
    }
}

struct Verified {
    payload: ExactTronPayload,
    network: String,
}

/// Facilitator for the TRON `exact` scheme.
#[derive(Debug)]
pub struct ExactTronFacilitator<S> {
    signer: S,
    config: ExactTronFacilitatorConfig,
}

impl<S: FacilitatorTronSigner> ExactTronFacilitator<S> {
    /// Creates a facilitator with default tunables.
    pub fn new(signer: S) -> Self {
        Self::with_config(signer, ExactTronFacilitatorConfig::default())
    }

    /// Creates a facilitator with explicit tunables.
    pub const fn with_config(signer: S, config: ExactTronFacilitatorConfig) -> Self {
        Self { signer, config }
    }

    async fn check(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<Verified, VerifyResponse> {
        if payload.accepted.scheme != SCHEME_EXACT || requirements.scheme != SCHEME_EXACT {
            return Err(VerifyResponse::invalid("unsupported_scheme"));
        }
        let required_network = normalize(&requirements.network);
        let offered_network = normalize(payload.network());
        let canonical = |normalized: &Option<String>, raw: &str| {
            normalized.clone().unwrap_or_else(|| raw.to_owned())
        };
        if canonical(&required_network, &requirements.network)
            != canonical(&offered_network, payload.network())
        {
            return Err(VerifyResponse::invalid("network_mismatch"));
        }
        let network =
            required_network.ok_or_else(|| VerifyResponse::invalid("unsupported_network"))?;

        let tron: ExactTronPayload = serde_json::from_value(payload.payload.clone())
            .map_err(|e| VerifyResponse::invalid("invalid_payload").with_message(e.to_string()))?;
        if tron.signed_transaction.is_empty() || tron.authorization.from.is_empty() {
            return Err(VerifyResponse::invalid("invalid_payload")
                .with_message("signedTransaction and authorization.from are required"));
        }
        let auth = &tron.authorization;
        let payer = auth.from.as_str();
        let reject = |reason: &str| VerifyResponse::invalid_with_payer(reason, payer);

        if !is_valid_address(payer) {
            return Err(reject("invalid_sender_address"));
        }
        if !is_valid_address(&auth.to) {
            return Err(reject("invalid_recipient_address"));
        }
        if !is_valid_address(&auth.contract_address) {
            return Err(reject("invalid_contract_address"));
        }
        if self
            .signer
            .addresses(&network)
            .iter()
            .any(|a| addresses_equal(a, payer))
        {
            return Err(reject("facilitator_self_payment"));
        }

        let request = VerifyTransactionRequest {
            signed_transaction: tron.signed_transaction.clone(),
            expected_from: payer.to_owned(),
            expected_transfer: ExpectedTransfer {
                to: requirements.pay_to.clone(),
                contract_address: requirements.asset.clone(),
                amount: auth.amount.clone(),
            },
            network: network.clone(),
        };
        let verification = self
            .signer
            .verify_transaction(&request)
            .await
            .unwrap_or_else(|e| TransactionVerification::invalid(e.to_string()));
        if !verification.valid {
            let why = verification.reason.as_deref().unwrap_or("invalid signature");
            return Err(reject(&format!("transaction_verification_failed: {why}")));
        }

        if now_millis() >= auth.expiration.saturating_sub(MIN_VALIDITY_BUFFER_MS) {
            return Err(reject("authorization_expired"));
        }

        let required: u128 = requirements
            .amount
            .parse()
            .map_err(|_| reject("invalid_required_amount"))?;
        let offered: u128 = auth
            .amount
            .parse()
            .map_err(|_| reject("invalid_payload_amount"))?;
        if offered < required {
            return Err(reject("insufficient_amount"));
        }
        if !addresses_equal(&auth.to, &requirements.pay_to) {
            return Err(reject("recipient_mismatch"));
        }
        if !addresses_equal(&auth.contract_address, &requirements.asset) {
            return Err(reject("asset_mismatch"));
        }

        let balance = self
            .signer
            .get_balance(payer, &requirements.asset, &network)
            .await
            .map_err(|e| reject("balance_check_failed").with_message(e.to_string()))?;
        if balance < offered {
            return Err(reject("insufficient_balance"));
        }
        let activated = self
            .signer
            .is_activated(payer, &network)
            .await
            .map_err(|e| reject("activation_check_failed").with_message(e.to_string()))?;
        if !activated {
            return Err(reject("account_not_activated"));
        }

        Ok(Verified {
            payload: tron,
            network,
        })
    }

    /// Verifies a payment without broadcasting.
    #[cfg_attr(
        feature = "telemetry",
        tracing::instrument(skip_all, fields(network = %requirements.network))
    )]
    pub async fn verify_payment(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> VerifyResponse {
        match self.check(payload, requirements).await {
            Ok(verified) => VerifyResponse::valid(verified.payload.authorization.from),
            Err(invalid) => invalid,
        }
    }

    /// Verifies, broadcasts and waits for confirmation.
    #[cfg_attr(
        feature = "telemetry",
        tracing::instrument(skip_all, fields(network = %requirements.network))
    )]
    pub async fn settle_payment(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> SettleResponse {
        let Verified { payload, network } = match self.check(payload, requirements).await {
            Ok(verified) => verified,
            Err(invalid) => return SettleResponse::from_invalid(invalid, &requirements.network),
        };
        let payer = payload.authorization.from;

        let tx_id = match self
            .signer
            .broadcast_transaction(&payload.signed_transaction, &network)
            .await
        {
            Ok(tx_id) => tx_id,
            Err(e) => {
                tracing::warn!(%network, %payer, error = %e, "tron broadcast failed");
                return SettleResponse::error("broadcast_failed", &network)
                    .with_payer(payer)
                    .with_message(e.to_string());
            }
        };

        match self
            .signer
            .wait_for_transaction(&tx_id, &network, self.config.confirm_timeout_ms)
            .await
        {
            Ok(TransactionConfirmation {
                success: true,
                tx_id: confirmed,
                ..
            }) => SettleResponse::success(confirmed.unwrap_or(tx_id), &network, payer),
            Ok(confirmation) => SettleResponse::error("transaction_failed", &network)
                .with_payer(payer)
                .with_transaction(tx_id)
                .with_message(confirmation.error.unwrap_or_default()),
            Err(e) => SettleResponse::error("confirmation_failed", &network)
                .with_payer(payer)
                .with_transaction(tx_id)
                .with_message(e.to_string()),
        }
    }
}

impl<S> SchemeId for ExactTronFacilitator<S> {
    fn namespace(&self) -> &str {
        TRON_NAMESPACE
    }

    fn scheme(&self) -> &str {
        SCHEME_EXACT
    }
}

impl<S: FacilitatorTronSigner> SchemeFacilitator for ExactTronFacilitator<S> {
    /// Advertises the default token and, when enabled, a gas sponsor.
    fn get_extra(&self, network: &str) -> Option<Value> {
        let token = default_token(network)?;
        let mut extra = json!({
            "defaultAsset": token.contract,
            "symbol": token.symbol,
            "decimals": token.decimals,
        });
        if self.config.can_sponsor_gas
            && let Some(sponsor) = self.signer.addresses(network).into_iter().next()
        {
            extra["gasSponsor"] = json!(sponsor);
        }
        Some(extra)
    }

    /// Addresses on `network`. A wildcard pattern is expanded to every
    /// supported network it matches.
    fn get_signers(&self, network: &str) -> Vec<String> {
        let mut signers: Vec<String> = if is_wildcard_pattern(network) {
            CAIP2_NETWORKS
                .iter()
                .filter(|caip2| matches_network_pattern(caip2, network))
                .flat_map(|caip2| self.signer.addresses(caip2))
                .collect()
        } else {
            let network = normalize(network).unwrap_or_else(|| network.to_owned());
            self.signer.addresses(&network)
        };
        signers.sort_unstable();
        signers.dedup();
        signers
    }

    fn verify<'a>(
        &'a self,
        payload: &'a PaymentPayload,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, Result<VerifyResponse, SchemeError>> {
        Box::pin(async move { Ok(self.verify_payment(payload, requirements).await) })
    }

    fn settle<'a>(
        &'a self,
        payload: &'a PaymentPayload,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, Result<SettleResponse, SchemeError>> {
        Box::pin(async move { Ok(self.settle_payment(payload, requirements).await) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::networks::{TRON_MAINNET, TRON_NILE, USDT_MAINNET};
    use serde_json::Map;
    use std::sync::Arc;
    use t402::scheme::SchemeRegistry;
    use std::sync::atomic::{AtomicBool, Ordering};

    const PAYER: &str = "TA4Wt1DUCqz6YegbnsmqsWC5uUfbdBqPxm";
    const MERCHANT: &str = "TA9pkx4DFxrEw8JZzUtyDrh2uAat1LDuJL";
    const OPERATOR: &str = "TAF8dttxK5iPKbvYC626aDBytrWANpLRXp";
    const NILE_OPERATOR: &str = "TNPeeaaFB7K9cmo4uQpcU32zGK8G1NYqeL";

    struct MockTron {
        balance: u128,
        activated: bool,
        signature_ok: bool,
        broadcast_error: Option<String>,
        broadcast: AtomicBool,
    }

    impl Default for MockTron {
        fn default() -> Self {
            Self {
                balance: 5_000_000,
                activated: true,
                signature_ok: true,
                broadcast_error: None,
                broadcast: AtomicBool::new(false),
            }
        }
    }

    impl FacilitatorTronSigner for MockTron {
        fn addresses(&self, network: &str) -> Vec<String> {
            match network {
                TRON_MAINNET => vec![OPERATOR.into()],
                TRON_NILE => vec![NILE_OPERATOR.into()],
                _ => Vec::new(),
            }
        }

        fn get_balance<'a>(
            &'a self,
            _owner: &'a str,
            _contract_address: &'a str,
            _network: &'a str,
        ) -> BoxFuture<'a, Result<u128, TronFacilitatorError>> {
            Box::pin(async move { Ok(self.balance) })
        }

        fn verify_transaction<'a>(
            &'a self,
            _request: &'a VerifyTransactionRequest,
        ) -> BoxFuture<'a, Result<TransactionVerification, TronFacilitatorError>> {
            Box::pin(async move {
                Ok(if self.signature_ok {
                    TransactionVerification::valid(Some("txid".into()))
                } else {
                    TransactionVerification::invalid("signer mismatch")
                })
            })
        }

        fn broadcast_transaction<'a>(
            &'a self,
            _signed_transaction: &'a str,
            _network: &'a str,
        ) -> BoxFuture<'a, Result<String, TronFacilitatorError>> {
            Box::pin(async move {
                self.broadcast.store(true, Ordering::SeqCst);
                match &self.broadcast_error {
                    Some(e) => Err(TronFacilitatorError::Broadcast(e.clone())),
                    None => Ok("txid".to_owned()),
                }
            })
        }

        fn wait_for_transaction<'a>(
            &'a self,
            tx_id: &'a str,
            _network: &'a str,
            timeout_ms: u64,
        ) -> BoxFuture<'a, Result<TransactionConfirmation, TronFacilitatorError>> {
            Box::pin(async move {
                assert_eq!(timeout_ms, 60_000);
                Ok(TransactionConfirmation {
                    success: true,
                    tx_id: Some(tx_id.to_owned()),
                    block_number: Some(1),
                    error: None,
                })
            })
        }

        fn is_activated<'a>(
            &'a self,
            _address: &'a str,
            _network: &'a str,
        ) -> BoxFuture<'a, Result<bool, TronFacilitatorError>> {
            Box::pin(async move { Ok(self.activated) })
        }
    }

    fn requirements(amount: &str) -> PaymentRequirements {
        PaymentRequirements {
            scheme: "exact".into(),
            network: "tron:mainnet".into(),
            asset: USDT_MAINNET.into(),
            amount: amount.into(),
            pay_to: MERCHANT.into(),
            max_timeout_seconds: 120,
            extra: Map::new(),
        }
    }

    fn payload(from: &str, amount: &str, expiration: u64) -> PaymentPayload {
        PaymentPayload {
            t402_version: 2,
            payload: json!({
                "signedTransaction": "0a02ab12",
                "authorization": {
                    "from": from,
                    "to": MERCHANT,
                    "contractAddress": USDT_MAINNET,
                    "amount": amount,
                    "expiration": expiration,
                    "refBlockBytes": "ab12",
                    "refBlockHash": "cd34ef5612345678",
                    "timestamp": now_millis()
                }
            }),
            accepted: requirements("1000000"),
            resource: None,
            extensions: None,
        }
    }

    fn fresh() -> u64 {
        now_millis() + 120_000
    }

    fn reason(response: &VerifyResponse) -> &str {
        response.invalid_reason.as_deref().unwrap_or_default()
    }

    #[tokio::test]
    async fn valid_transfer_settles() {
        let facilitator = ExactTronFacilitator::new(MockTron::default());
        let payload = payload(PAYER, "1000000", fresh());
        let verified = facilitator
            .verify_payment(&payload, &requirements("1000000"))
            .await;
        assert!(verified.is_valid, "{verified:?}");
        assert!(!facilitator.signer.broadcast.load(Ordering::SeqCst));

        let settled = facilitator
            .settle_payment(&payload, &requirements("1000000"))
            .await;
        assert!(settled.success, "{settled:?}");
        assert_eq!(settled.transaction, "txid");
        assert_eq!(settled.payer.as_deref(), Some(PAYER));
    }

    #[tokio::test]
    async fn amount_floor_blocks_broadcast() {
        let facilitator = ExactTronFacilitator::new(MockTron::default());
        let settled = facilitator
            .settle_payment(&payload(PAYER, "999999", fresh()), &requirements("1000000"))
            .await;
        assert!(!settled.success);
        assert_eq!(settled.error_reason.as_deref(), Some("insufficient_amount"));
        assert!(!facilitator.signer.broadcast.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn expiry_uses_thirty_second_buffer() {
        let facilitator = ExactTronFacilitator::new(MockTron::default());
        let verified = facilitator
            .verify_payment(
                &payload(PAYER, "1000000", now_millis() + 20_000),
                &requirements("1000000"),
            )
            .await;
        assert_eq!(reason(&verified), "authorization_expired");
    }

    #[tokio::test]
    async fn operator_cannot_pay_itself() {
        let facilitator = ExactTronFacilitator::new(MockTron::default());
        let verified = facilitator
            .verify_payment(&payload(OPERATOR, "1000000", fresh()), &requirements("1000000"))
            .await;
        assert_eq!(reason(&verified), "facilitator_self_payment");
    }

    #[tokio::test]
    async fn chain_checks() {
        let cases = [
            (
                MockTron {
                    signature_ok: false,
                    ..MockTron::default()
                },
                "transaction_verification_failed: signer mismatch",
            ),
            (
                MockTron {
                    balance: 1,
                    ..MockTron::default()
                },
                "insufficient_balance",
            ),
            (
                MockTron {
                    activated: false,
                    ..MockTron::default()
                },
                "account_not_activated",
            ),
        ];
        for (mock, expected) in cases {
            let facilitator = ExactTronFacilitator::new(mock);
            let verified = facilitator
                .verify_payment(&payload(PAYER, "1000000", fresh()), &requirements("1000000"))
                .await;
            assert_eq!(reason(&verified), expected);
        }
    }

    #[tokio::test]
    async fn network_and_amount_shapes() {
        let facilitator = ExactTronFacilitator::new(MockTron::default());

        let mut req = requirements("1000000");
        req.network = "tron:nile".into();
        let verified = facilitator
            .verify_payment(&payload(PAYER, "1000000", fresh()), &req)
            .await;
        assert_eq!(reason(&verified), "network_mismatch");

        let mut req = requirements("1000000");
        req.network = "tron:moon".into();
        let mut offered = payload(PAYER, "1000000", fresh());
        offered.accepted.network = "tron:moon".into();
        let verified = facilitator.verify_payment(&offered, &req).await;
        assert_eq!(reason(&verified), "unsupported_network");

        let verified = facilitator
            .verify_payment(&payload(PAYER, "1000000", fresh()), &requirements("1.5"))
            .await;
        assert_eq!(reason(&verified), "invalid_required_amount");

        let verified = facilitator
            .verify_payment(&payload(PAYER, "lots", fresh()), &requirements("1000000"))
            .await;
        assert_eq!(reason(&verified), "invalid_payload_amount");

        let verified = facilitator
            .verify_payment(&payload("TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6u", "1", fresh()), &requirements("1"))
            .await;
        assert_eq!(reason(&verified), "invalid_sender_address");
    }

    #[tokio::test]
    async fn broadcast_failure_is_a_response() {
        let facilitator = ExactTronFacilitator::new(MockTron {
            broadcast_error: Some("BANDWIDTH_ERROR".into()),
            ..MockTron::default()
        });
        let settled = facilitator
            .settle_payment(&payload(PAYER, "1000000", fresh()), &requirements("1000000"))
            .await;
        assert!(!settled.success);
        assert_eq!(settled.error_reason.as_deref(), Some("broadcast_failed"));
        assert_eq!(settled.error_message.as_deref(), Some("BANDWIDTH_ERROR"));
    }

    #[tokio::test]
    async fn balance_must_cover_the_offered_amount() {
        // Overpays 1 TRX against a 1 TRX price while holding 1.5.
        let facilitator = ExactTronFacilitator::new(MockTron {
            balance: 1_500_000,
            ..MockTron::default()
        });
        let settled = facilitator
            .settle_payment(&payload(PAYER, "2000000", fresh()), &requirements("1000000"))
            .await;
        assert!(!settled.success);
        assert_eq!(settled.error_reason.as_deref(), Some("insufficient_balance"));
        assert!(!facilitator.signer.broadcast.load(Ordering::SeqCst));
    }

    #[test]
    fn wildcard_registration_advertises_every_network_signer() {
        let registry: SchemeRegistry<dyn SchemeFacilitator> = SchemeRegistry::new();
        registry
            .register("tron:*", Arc::new(ExactTronFacilitator::new(MockTron::default())))
            .unwrap();
        let signers = registry.get_signers_by_family(2);
        assert_eq!(
            signers["tron:*"],
            vec![OPERATOR.to_owned(), NILE_OPERATOR.to_owned()]
        );

        let facilitator = ExactTronFacilitator::new(MockTron::default());
        assert_eq!(facilitator.get_signers("tron-nile"), vec![NILE_OPERATOR]);
        assert!(facilitator.get_signers("tron:shasta").is_empty());
    }

    #[test]
    fn extra_names_default_asset_and_sponsor() {
        let facilitator = ExactTronFacilitator::with_config(
            MockTron::default(),
            ExactTronFacilitatorConfig {
                can_sponsor_gas: true,
                ..ExactTronFacilitatorConfig::default()
            },
        );
        let extra = facilitator.get_extra("tron:mainnet").unwrap();
        assert_eq!(extra["defaultAsset"], USDT_MAINNET);
        assert_eq!(extra["gasSponsor"], OPERATOR);
        assert!(facilitator.get_extra("tron:moon").is_none());
    }
}
