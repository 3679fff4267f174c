//! Facilitator-side verification and settlement for the Solana `exact`
//! scheme.
//!
//! The facilitator pays the network fee, so the checks focus on making sure
//! the transaction cannot spend facilitator funds. The fee payer must be a
//! managed key in the fee-payer slot, the instruction layout is fixed apart
//! from allowlisted extras, and no instruction may touch a managed key.

use rand::RngExt;
use rand::rng;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use serde_with::{DisplayFromStr, serde_as};
use solana_pubkey::Pubkey;
use solana_signature::Signature;
use solana_transaction::versioned::VersionedTransaction;
use t402::proto::{PaymentPayload, PaymentRequirements, SettleResponse, VerifyResponse};
use t402::scheme::{BoxFuture, SchemeError, SchemeFacilitator, SchemeId};

use super::error::SvmFacilitatorError;
use super::types::{
    ExactSvmPayload, LIGHTHOUSE_PROGRAM_ID, TRANSFER_INDEX, associated_token_address,
    compute_unit_limit, compute_unit_price, decode_transaction, instructions_reference,
    is_fully_signed, parse_transfer_checked, program_id,
};
use super::{SCHEME_EXACT, SVM_NAMESPACE};
use crate::networks::normalize;

/// Chain access the Solana facilitator needs.
pub trait FacilitatorSvmSigner: Send + Sync {
    /// Fee-payer keys managed by this facilitator.
    fn addresses(&self) -> Vec<Pubkey>;

    /// Adds the `fee_payer` signature.
    fn sign_transaction(
        &self,
        tx: VersionedTransaction,
        fee_payer: Pubkey,
    ) -> BoxFuture<'_, Result<VersionedTransaction, SvmFacilitatorError>>;

    /// Simulates `tx`, failing if execution would fail.
    fn simulate_transaction<'a>(
        &'a self,
        tx: &'a VersionedTransaction,
    ) -> BoxFuture<'a, Result<(), SvmFacilitatorError>>;

    /// Submits `tx`.
    fn send_transaction<'a>(
        &'a self,
        tx: &'a VersionedTransaction,
    ) -> BoxFuture<'a, Result<Signature, SvmFacilitatorError>>;

    /// Waits until `signature` is confirmed.
    fn confirm_transaction(
        &self,
        signature: Signature,
    ) -> BoxFuture<'_, Result<(), SvmFacilitatorError>>;
}

/// Tunables for [`ExactSvmFacilitator`].
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExactSvmConfig {
    /// Highest compute-unit price the facilitator will pay, in micro-lamports.
    pub max_compute_unit_price: u64,
    /// Upper bound on instructions, the three required ones included.
    pub max_instruction_count: usize,
    /// Programs that may be invoked after the transfer. Anything else in
    /// that position is rejected.
    #[serde_as(as = "Vec<DisplayFromStr>")]
    pub allowed_programs: Vec<Pubkey>,
}

impl Default for ExactSvmConfig {
    fn default() -> Self {
        Self {
            max_compute_unit_price: 5_000_000,
            max_instruction_count: 10,
            allowed_programs: vec![LIGHTHOUSE_PROGRAM_ID],
        }
    }
}

impl ExactSvmConfig {
    /// Checks the fixed prefix (limit, price, transfer) and every extra
    /// instruction against the allowlist.
    fn check_layout(&self, tx: &VersionedTransaction) -> Result<(), &'static str> {
        let count = tx.message.instructions().len();
        if count <= TRANSFER_INDEX || count > self.max_instruction_count {
            return Err("invalid_exact_svm_payload_transaction_instructions_length");
        }
        if compute_unit_limit(tx).is_none() {
            return Err("invalid_exact_svm_payload_transaction_compute_limit_instruction");
        }
        if compute_unit_price(tx).is_none() {
            return Err("invalid_exact_svm_payload_transaction_instructions_compute_price_instruction");
        }
        let extras_allowed = (TRANSFER_INDEX + 1..count).all(|index| {
            program_id(tx, index).is_some_and(|program| self.allowed_programs.contains(&program))
        });
        if !extras_allowed {
            return Err("invalid_exact_svm_payload_transaction_instructions");
        }
        Ok(())
    }
}

/// A payload that passed every check, co-signed by the fee payer.
struct Verified {
    payer: String,
    transaction: VersionedTransaction,
}

/// Facilitator for the Solana `exact` scheme.
#[derive(Debug)]
pub struct ExactSvmFacilitator<S> {
    signer: S,
    config: ExactSvmConfig,
}

impl<S: FacilitatorSvmSigner> ExactSvmFacilitator<S> {
    /// Creates a facilitator with default tunables.
    pub fn new(signer: S) -> Self {
        Self::with_config(signer, ExactSvmConfig::default())
    }

    /// Creates a facilitator with explicit tunables.
    pub const fn with_config(signer: S, config: ExactSvmConfig) -> Self {
        Self { signer, config }
    }

    async fn check(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<Verified, VerifyResponse> {
        let structure =
            |msg: String| VerifyResponse::invalid("invalid_payload_structure").with_message(msg);
        let svm: ExactSvmPayload =
            serde_json::from_value(payload.payload.clone()).map_err(|e| structure(e.to_string()))?;
        let tx = decode_transaction(&svm.transaction).map_err(|e| structure(e.to_string()))?;

        if payload.accepted.scheme != SCHEME_EXACT || requirements.scheme != SCHEME_EXACT {
            return Err(VerifyResponse::invalid("unsupported_scheme"));
        }
        let network = normalize(&requirements.network);
        if network.is_none() || normalize(payload.network()) != network {
            return Err(VerifyResponse::invalid("network_mismatch"));
        }

        let fee_payer = requirements
            .extra_str("feePayer")
            .and_then(|s| s.parse::<Pubkey>().ok())
            .ok_or_else(|| VerifyResponse::invalid("invalid_exact_svm_payload_missing_fee_payer"))?;
        let managed = self.signer.addresses();
        if !managed.contains(&fee_payer) {
            return Err(VerifyResponse::invalid("fee_payer_not_managed_by_facilitator"));
        }
        if tx.message.static_account_keys().first() != Some(&fee_payer) {
            return Err(VerifyResponse::invalid("invalid_exact_svm_payload_fee_payer_mismatch"));
        }
        self.config.check_layout(&tx).map_err(VerifyResponse::invalid)?;

        let transfer = parse_transfer_checked(&tx).ok_or_else(|| {
            VerifyResponse::invalid("invalid_exact_svm_payload_no_transfer_instruction")
        })?;
        let payer = transfer.authority.to_string();
        let reject = |reason: &str| VerifyResponse::invalid_with_payer(reason, payer.as_str());

        if managed.contains(&transfer.authority) {
            return Err(reject(
                "invalid_exact_svm_payload_transaction_fee_payer_transferring_funds",
            ));
        }
        if managed.iter().any(|key| instructions_reference(&tx, key)) {
            return Err(reject(
                "invalid_exact_svm_payload_transaction_fee_payer_included_in_instruction_accounts",
            ));
        }

        let expected_destination = requirements
            .pay_to
            .parse::<Pubkey>()
            .ok()
            .map(|owner| associated_token_address(&owner, &transfer.mint, &transfer.token_program));
        if expected_destination != Some(transfer.destination) {
            return Err(reject("invalid_exact_svm_payload_recipient_mismatch"));
        }
        if requirements.asset.parse::<Pubkey>().ok() != Some(transfer.mint) {
            return Err(reject("invalid_exact_svm_payload_mint_mismatch"));
        }
        let required: u64 = requirements.amount.parse().map_err(|_| {
            reject("invalid_payload_structure").with_message("amount is not an integer")
        })?;
        if transfer.amount < required {
            return Err(reject("invalid_exact_svm_payload_amount_insufficient"));
        }
        if compute_unit_price(&tx).is_none_or(|price| price > self.config.max_compute_unit_price) {
            return Err(reject("invalid_exact_svm_payload_compute_price_too_high"));
        }

        let simulation = async {
            let signed = self.signer.sign_transaction(tx, fee_payer).await?;
            self.signer.simulate_transaction(&signed).await?;
            Ok::<_, SvmFacilitatorError>(signed)
        };
        let transaction = simulation
            .await
            .map_err(|e| reject(&format!("transaction_simulation_failed: {e}")))?;

        Ok(Verified { payer, transaction })
    }

    /// Verifies a payment; co-signs and simulates but never submits.
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
            Ok(verified) => VerifyResponse::valid(verified.payer),
            Err(invalid) => invalid,
        }
    }

    /// Verifies, then submits the co-signed transaction and confirms it.
    #[cfg_attr(
        feature = "telemetry",
        tracing::instrument(skip_all, fields(network = %requirements.network))
    )]
    pub async fn settle_payment(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> SettleResponse {
        let network = requirements.network.as_str();
        let Verified { payer, transaction } = match self.check(payload, requirements).await {
            Ok(verified) => verified,
            Err(invalid) => return SettleResponse::from_invalid(invalid, network),
        };
        if !is_fully_signed(&transaction) {
            return SettleResponse::error("transaction_failed", network)
                .with_payer(payer)
                .with_message("transaction is missing signatures");
        }

        let signature = match self.signer.send_transaction(&transaction).await {
            Ok(signature) => signature,
            Err(e) => {
                tracing::warn!(network, payer, error = %e, "solana submission failed");
                return SettleResponse::error("broadcast_failed", network)
                    .with_payer(payer)
                    .with_message(e.to_string());
            }
        };
        if let Err(e) = self.signer.confirm_transaction(signature).await {
            return SettleResponse::error("confirmation_failed", network)
                .with_payer(payer)
                .with_transaction(signature.to_string())
                .with_message(e.to_string());
        }
        SettleResponse::success(signature.to_string(), network, payer)
    }
}

impl<S> SchemeId for ExactSvmFacilitator<S> {
    fn namespace(&self) -> &str {
        SVM_NAMESPACE
    }

    fn scheme(&self) -> &str {
        SCHEME_EXACT
    }
}

impl<S: FacilitatorSvmSigner> SchemeFacilitator for ExactSvmFacilitator<S> {
    /// Advertises one managed fee payer, picked at random to spread load.
    fn get_extra(&self, _network: &str) -> Option<Value> {
        let addresses = self.signer.addresses();
        if addresses.is_empty() {
            return None;
        }
        let pick = addresses[rng().random_range(0..addresses.len())];
        Some(json!({ "feePayer": pick.to_string() }))
    }

    fn get_signers(&self, _network: &str) -> Vec<String> {
        self.signer
            .addresses()
            .iter()
            .map(ToString::to_string)
            .collect()
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
