//! Facilitator-side verification and settlement for the TON `exact`
//! scheme.
//!
//! The facilitator holds no key in the transfer. It checks the signed
//! message against the requirements and the chain, then relays it as an
//! external message and waits for the wallet seqno to advance.

use serde_json::Value;
use t402::proto::helpers::{is_wildcard_pattern, matches_network_pattern};
use t402::proto::{PaymentPayload, PaymentRequirements, SettleResponse, VerifyResponse};
use t402::scheme::{BoxFuture, SchemeError, SchemeFacilitator, SchemeId};
use t402::timestamp::UnixTimestamp;

use super::error::TonFacilitatorError;
use super::types::{
    ExactTonPayload, ExpectedTransfer, MIN_VALIDITY_BUFFER, MessageVerification,
    TransactionConfirmation, VerifyMessageRequest, WaitForTransactionRequest,
};
use super::{SCHEME_EXACT, TON_NAMESPACE};
use crate::address::{addresses_equal, is_valid_address, validate_boc};
use crate::networks::{CAIP2_NETWORKS, normalize};

/// Seconds to wait for a relayed message to land.
pub const DEFAULT_CONFIRM_TIMEOUT_SECS: u64 = 60;

/// Chain access the TON facilitator needs.
pub trait FacilitatorTonSigner: Send + Sync {
    /// Wallets operated by this facilitator on `network`.
    fn addresses(&self, network: &str) -> Vec<String>;

    /// Jetton balance of `owner`, in atomic units.
    fn get_jetton_balance<'a>(
        &'a self,
        owner: &'a str,
        jetton_master: &'a str,
        network: &'a str,
    ) -> BoxFuture<'a, Result<u128, TonFacilitatorError>>;

    /// Jetton wallet address of `owner`.
    fn get_jetton_wallet_address<'a>(
        &'a self,
        owner: &'a str,
        jetton_master: &'a str,
        network: &'a str,
    ) -> BoxFuture<'a, Result<String, TonFacilitatorError>>;

    /// Checks the signature and decodes the transfer in a signed message.
    fn verify_message<'a>(
        &'a self,
        request: &'a VerifyMessageRequest,
    ) -> BoxFuture<'a, Result<MessageVerification, TonFacilitatorError>>;

    /// Relays a signed external message; returns its hash.
    fn send_external_message<'a>(
        &'a self,
        signed_boc: &'a str,
        network: &'a str,
    ) -> BoxFuture<'a, Result<String, TonFacilitatorError>>;

    /// Waits until the wallet has processed the message.
    fn wait_for_transaction<'a>(
        &'a self,
        request: &'a WaitForTransactionRequest,
    ) -> BoxFuture<'a, Result<TransactionConfirmation, TonFacilitatorError>>;

    /// Current seqno of `address`.
    fn get_seqno<'a>(
        &'a self,
        address: &'a str,
        network: &'a str,
    ) -> BoxFuture<'a, Result<u64, TonFacilitatorError>>;

    /// Whether a wallet contract is deployed at `address`.
    fn is_deployed<'a>(
        &'a self,
        address: &'a str,
        network: &'a str,
    ) -> BoxFuture<'a, Result<bool, TonFacilitatorError>>;
}

struct Verified {
    payload: ExactTonPayload,
    network: String,
}

/// Facilitator for the TON `exact` scheme.
#[derive(Debug)]
pub struct ExactTonFacilitator<S> {
    signer: S,
    confirm_timeout_secs: u64,
}

impl<S: FacilitatorTonSigner> ExactTonFacilitator<S> {
    /// Creates a facilitator.
    pub const fn new(signer: S) -> Self {
        Self {
            signer,
            confirm_timeout_secs: DEFAULT_CONFIRM_TIMEOUT_SECS,
        }
    }

    /// Overrides how long settlement waits for the transaction.
    #[must_use]
    pub const fn with_confirm_timeout(mut self, secs: u64) -> Self {
        self.confirm_timeout_secs = secs;
        self
    }

    async fn check(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<Verified, VerifyResponse> {
        if payload.accepted.scheme != SCHEME_EXACT || requirements.scheme != SCHEME_EXACT {
            return Err(VerifyResponse::invalid("unsupported_scheme"));
        }
        let network = normalize(&requirements.network)
            .filter(|n| normalize(payload.network()).as_ref() == Some(n))
            .ok_or_else(|| VerifyResponse::invalid("network_mismatch"))?;

        let ton: ExactTonPayload = serde_json::from_value(payload.payload.clone())
            .map_err(|e| VerifyResponse::invalid("invalid_payload").with_message(e.to_string()))?;
        if ton.signed_boc.is_empty() || ton.authorization.from.is_empty() {
            return Err(VerifyResponse::invalid("invalid_payload")
                .with_message("signedBoc and authorization.from are required"));
        }
        let auth = &ton.authorization;
        let payer = auth.from.as_str();
        let reject = |reason: &str| VerifyResponse::invalid_with_payer(reason, payer);

        if !is_valid_address(payer) {
            return Err(reject("invalid_sender_address"));
        }
        if !is_valid_address(&auth.to) {
            return Err(reject("invalid_recipient_address"));
        }
        if self
            .signer
            .addresses(&network)
            .iter()
            .any(|a| addresses_equal(a, payer))
        {
            return Err(reject("facilitator_self_payment"));
        }
        if !validate_boc(&ton.signed_boc) {
            return Err(reject("invalid_boc"));
        }

        let jetton_wallet = self
            .signer
            .get_jetton_wallet_address(payer, &requirements.asset, &network)
            .await
            .map_err(|e| reject("jetton_wallet_lookup_failed").with_message(e.to_string()))?;
        let request = VerifyMessageRequest {
            signed_boc: ton.signed_boc.clone(),
            expected_from: payer.to_owned(),
            jetton_wallet,
            expected_transfer: ExpectedTransfer {
                jetton_amount: requirements.amount.clone(),
                destination: requirements.pay_to.clone(),
                jetton_master: requirements.asset.clone(),
            },
            network: network.clone(),
        };
        let verification = self
            .signer
            .verify_message(&request)
            .await
            .unwrap_or_else(|e| MessageVerification::invalid(e.to_string()));
        if !verification.valid {
            let why = verification.reason.as_deref().unwrap_or("invalid signature");
            return Err(reject(&format!("message_verification_failed: {why}")));
        }

        let now = UnixTimestamp::now().as_secs();
        if auth.valid_until < now + MIN_VALIDITY_BUFFER {
            return Err(reject("authorization_expired"));
        }

        let seqno = self
            .signer
            .get_seqno(payer, &network)
            .await
            .map_err(|e| reject("seqno_check_failed").with_message(e.to_string()))?;
        if seqno != auth.seqno {
            return Err(reject("seqno_mismatch")
                .with_message(format!("expected {seqno}, got {}", auth.seqno)));
        }
        let deployed = self
            .signer
            .is_deployed(payer, &network)
            .await
            .map_err(|e| reject("deployment_check_failed").with_message(e.to_string()))?;
        if !deployed {
            return Err(reject("wallet_not_deployed"));
        }

        let required: u128 = requirements.amount.parse().map_err(|_| {
            reject("invalid_payload").with_message("required amount is not an integer")
        })?;
        let offered: u128 = auth.jetton_amount.parse().map_err(|_| {
            reject("invalid_payload").with_message("jettonAmount is not an integer")
        })?;
        if offered < required {
            return Err(reject("insufficient_amount"));
        }
        if !addresses_equal(&auth.to, &requirements.pay_to) {
            return Err(reject("recipient_mismatch"));
        }
        if !addresses_equal(&auth.jetton_master, &requirements.asset) {
            return Err(reject("asset_mismatch"));
        }

        let balance = self
            .signer
            .get_jetton_balance(payer, &auth.jetton_master, &network)
            .await
            .map_err(|e| reject("balance_check_failed").with_message(e.to_string()))?;
        if balance < offered {
            return Err(reject("insufficient_balance"));
        }

        Ok(Verified {
            payload: ton,
            network,
        })
    }

    /// Verifies a payment without touching the chain state.
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

    /// Verifies, relays the signed message and waits for it to execute.
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
        let auth = payload.authorization;

        let message_hash = match self
            .signer
            .send_external_message(&payload.signed_boc, &network)
            .await
        {
            Ok(hash) => hash,
            Err(e) => {
                tracing::warn!(%network, payer = %auth.from, error = %e, "ton broadcast failed");
                return SettleResponse::error("broadcast_failed", &network)
                    .with_payer(auth.from)
                    .with_message(e.to_string());
            }
        };

        let wait = WaitForTransactionRequest {
            address: auth.from.clone(),
            seqno: auth.seqno,
            timeout_secs: self.confirm_timeout_secs,
            network: network.clone(),
        };
        match self.signer.wait_for_transaction(&wait).await {
            Ok(TransactionConfirmation {
                success: true,
                hash,
                ..
            }) => SettleResponse::success(hash.unwrap_or(message_hash), &network, auth.from),
            Ok(confirmation) => SettleResponse::error("transaction_failed", &network)
                .with_payer(auth.from)
                .with_transaction(confirmation.hash.unwrap_or(message_hash))
                .with_message(confirmation.error.unwrap_or_default()),
            Err(e) => SettleResponse::error("confirmation_failed", &network)
                .with_payer(auth.from)
                .with_transaction(message_hash)
                .with_message(e.to_string()),
        }
    }
}

impl<S> SchemeId for ExactTonFacilitator<S> {
    fn namespace(&self) -> &str {
        TON_NAMESPACE
    }

    fn scheme(&self) -> &str {
        SCHEME_EXACT
    }
}

impl<S: FacilitatorTonSigner> SchemeFacilitator for ExactTonFacilitator<S> {
    fn get_extra(&self, _network: &str) -> Option<Value> {
        None
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
    use crate::networks::{TON_MAINNET, TON_TESTNET, USDT_MAINNET};
    use std::sync::Arc;
    use t402::scheme::SchemeRegistry;
    use serde_json::{Map, json};
    use std::sync::atomic::{AtomicBool, Ordering};

    const PAYER: &str = "EQAAFhjXzKuQ5N0c96nsdZQWATcJm909LYSaCAvWFxVJP80D";
    const MERCHANT: &str = "UQBvW8Z5huBkMJYdnfAEM5JqTNkuWX3diqYENkWsIL0XggGG";
    const RELAYER: &str = "EQDj1b8yP0_vNUSQ5XvaJO4TTMu4bI3yZ7G-wZ8gNnMmS2LR";
    const TESTNET_RELAYER: &str = "kQBvW8Z5huBkMJYdnfAEM5JqTNkuWX3diqYENkWsIL0XgmSA";
    const BOC: &str = "te6cckEBAQEAAgAAAEysuc0=";

    struct MockTon {
        seqno: u64,
        deployed: bool,
        balance: u128,
        signature_ok: bool,
        confirmed: bool,
        sent: AtomicBool,
    }

    impl Default for MockTon {
        fn default() -> Self {
            Self {
                seqno: 3,
                deployed: true,
                balance: 10_000_000,
                signature_ok: true,
                confirmed: true,
                sent: AtomicBool::new(false),
            }
        }
    }

    impl FacilitatorTonSigner for MockTon {
        fn addresses(&self, network: &str) -> Vec<String> {
            match network {
                TON_MAINNET => vec![RELAYER.into()],
                TON_TESTNET => vec![TESTNET_RELAYER.into()],
                _ => Vec::new(),
            }
        }

        fn get_jetton_balance<'a>(
            &'a self,
            _owner: &'a str,
            _jetton_master: &'a str,
            _network: &'a str,
        ) -> BoxFuture<'a, Result<u128, TonFacilitatorError>> {
            Box::pin(async move { Ok(self.balance) })
        }

        fn get_jetton_wallet_address<'a>(
            &'a self,
            _owner: &'a str,
            _jetton_master: &'a str,
            _network: &'a str,
        ) -> BoxFuture<'a, Result<String, TonFacilitatorError>> {
            Box::pin(async { Ok("EQJettonWallet".to_owned()) })
        }

        fn verify_message<'a>(
            &'a self,
            request: &'a VerifyMessageRequest,
        ) -> BoxFuture<'a, Result<MessageVerification, TonFacilitatorError>> {
            Box::pin(async move {
                assert_eq!(request.jetton_wallet, "EQJettonWallet");
                Ok(if self.signature_ok {
                    MessageVerification::valid(None)
                } else {
                    MessageVerification::invalid("bad signature")
                })
            })
        }

        fn send_external_message<'a>(
            &'a self,
            _signed_boc: &'a str,
            _network: &'a str,
        ) -> BoxFuture<'a, Result<String, TonFacilitatorError>> {
            Box::pin(async move {
                self.sent.store(true, Ordering::SeqCst);
                Ok("msg-hash".to_owned())
            })
        }

        fn wait_for_transaction<'a>(
            &'a self,
            _request: &'a WaitForTransactionRequest,
        ) -> BoxFuture<'a, Result<TransactionConfirmation, TonFacilitatorError>> {
            Box::pin(async move {
                Ok(TransactionConfirmation {
                    success: self.confirmed,
                    lt: Some("1".into()),
                    hash: Some("tx-hash".into()),
                    error: (!self.confirmed).then(|| "exit code 37".to_owned()),
                })
            })
        }

        fn get_seqno<'a>(
            &'a self,
            _address: &'a str,
            _network: &'a str,
        ) -> BoxFuture<'a, Result<u64, TonFacilitatorError>> {
            Box::pin(async move { Ok(self.seqno) })
        }

        fn is_deployed<'a>(
            &'a self,
            _address: &'a str,
            _network: &'a str,
        ) -> BoxFuture<'a, Result<bool, TonFacilitatorError>> {
            Box::pin(async move { Ok(self.deployed) })
        }
    }

    fn requirements(amount: &str) -> PaymentRequirements {
        PaymentRequirements {
            scheme: "exact".into(),
            network: "ton:mainnet".into(),
            asset: USDT_MAINNET.into(),
            amount: amount.into(),
            pay_to: MERCHANT.into(),
            max_timeout_seconds: 300,
            extra: Map::new(),
        }
    }

    fn payload(from: &str, jetton_amount: &str) -> PaymentPayload {
        let valid_until = UnixTimestamp::now().as_secs() + 300;
        PaymentPayload {
            t402_version: 2,
            payload: json!({
                "signedBoc": BOC,
                "authorization": {
                    "from": from,
                    "to": MERCHANT,
                    "jettonMaster": USDT_MAINNET,
                    "jettonAmount": jetton_amount,
                    "tonAmount": "100000000",
                    "validUntil": valid_until,
                    "seqno": 3,
                    "queryId": "99"
                }
            }),
            accepted: requirements("1000000"),
            resource: None,
            extensions: None,
        }
    }

    fn reason(response: &VerifyResponse) -> &str {
        response.invalid_reason.as_deref().unwrap_or_default()
    }

    #[test]
    fn wildcard_registration_advertises_every_network_signer() {
        let registry: SchemeRegistry<dyn SchemeFacilitator> = SchemeRegistry::new();
        registry
            .register("ton:*", Arc::new(ExactTonFacilitator::new(MockTon::default())))
            .unwrap();
        let signers = registry.get_signers_by_family(2);
        assert_eq!(
            signers["ton:*"],
            vec![RELAYER.to_owned(), TESTNET_RELAYER.to_owned()]
        );

        let facilitator = ExactTonFacilitator::new(MockTon::default());
        assert_eq!(facilitator.get_signers("ton-testnet"), vec![TESTNET_RELAYER]);
    }

    #[tokio::test]
    async fn valid_transfer_settles() {
        let facilitator = ExactTonFacilitator::new(MockTon::default());
        let payload = payload(PAYER, "1000000");
        let verified = facilitator
            .verify_payment(&payload, &requirements("1000000"))
            .await;
        assert!(verified.is_valid, "{verified:?}");
        assert_eq!(verified.payer.as_deref(), Some(PAYER));
        assert!(!facilitator.signer.sent.load(Ordering::SeqCst));

        let settled = facilitator
            .settle_payment(&payload, &requirements("1000000"))
            .await;
        assert!(settled.success, "{settled:?}");
        assert_eq!(settled.transaction, "tx-hash");
        assert_eq!(settled.network, "ton:mainnet");
    }

    #[tokio::test]
    async fn amount_floor_blocks_settlement() {
        let facilitator = ExactTonFacilitator::new(MockTon::default());
        let settled = facilitator
            .settle_payment(&payload(PAYER, "999999"), &requirements("1000000"))
            .await;
        assert!(!settled.success);
        assert_eq!(settled.error_reason.as_deref(), Some("insufficient_amount"));
        assert!(!facilitator.signer.sent.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn relayer_cannot_pay_itself() {
        let facilitator = ExactTonFacilitator::new(MockTon::default());
        let verified = facilitator
            .verify_payment(&payload(RELAYER, "1000000"), &requirements("1000000"))
            .await;
        assert_eq!(reason(&verified), "facilitator_self_payment");
    }

    #[tokio::test]
    async fn chain_state_checks() {
        let cases = [
            (
                MockTon {
                    signature_ok: false,
                    ..MockTon::default()
                },
                "message_verification_failed: bad signature",
            ),
            (
                MockTon {
                    seqno: 4,
                    ..MockTon::default()
                },
                "seqno_mismatch",
            ),
            (
                MockTon {
                    deployed: false,
                    ..MockTon::default()
                },
                "wallet_not_deployed",
            ),
            (
                MockTon {
                    balance: 10,
                    ..MockTon::default()
                },
                "insufficient_balance",
            ),
        ];
        for (mock, expected) in cases {
            let facilitator = ExactTonFacilitator::new(mock);
            let verified = facilitator
                .verify_payment(&payload(PAYER, "1000000"), &requirements("1000000"))
                .await;
            assert_eq!(reason(&verified), expected);
        }
    }

    #[tokio::test]
    async fn structural_and_network_checks() {
        let facilitator = ExactTonFacilitator::new(MockTon::default());

        let mut req = requirements("1000000");
        req.network = "ton:testnet".into();
        let verified = facilitator.verify_payment(&payload(PAYER, "1"), &req).await;
        assert_eq!(reason(&verified), "network_mismatch");

        let mut bad = payload(PAYER, "1000000");
        bad.payload["signedBoc"] = json!("aGVsbG8=");
        let verified = facilitator
            .verify_payment(&bad, &requirements("1000000"))
            .await;
        assert_eq!(reason(&verified), "invalid_boc");

        let mut bad = payload(PAYER, "1000000");
        bad.payload["authorization"]["validUntil"] = json!(UnixTimestamp::now().as_secs() + 10);
        let verified = facilitator
            .verify_payment(&bad, &requirements("1000000"))
            .await;
        assert_eq!(reason(&verified), "authorization_expired");

        let mut req = requirements("1000000");
        req.pay_to = RELAYER.into();
        let verified = facilitator
            .verify_payment(&payload(PAYER, "1000000"), &req)
            .await;
        assert_eq!(reason(&verified), "recipient_mismatch");

        let verified = facilitator
            .verify_payment(&payload("nope", "1000000"), &requirements("1000000"))
            .await;
        assert_eq!(reason(&verified), "invalid_sender_address");
    }

    #[tokio::test]
    async fn failed_execution_is_reported() {
        let facilitator = ExactTonFacilitator::new(MockTon {
            confirmed: false,
            ..MockTon::default()
        });
        let settled = facilitator
            .settle_payment(&payload(PAYER, "1000000"), &requirements("1000000"))
            .await;
        assert!(!settled.success);
        assert_eq!(settled.error_reason.as_deref(), Some("transaction_failed"));
        assert_eq!(settled.error_message.as_deref(), Some("exit code 37"));
        assert_eq!(settled.payer.as_deref(), Some(PAYER));
    }
}
