//! Client-side signing for the Solana `exact` scheme.
//!
//! Building the transfer needs chain state (a recent blockhash, the mint's
//! token program and decimals), so the client delegates it to an injected
//! [`TransactionBuilder`] and only signs the result. The `rpc` feature
//! provides a builder backed by a Solana RPC node.

use std::sync::Arc;

use serde_json::Value;
use solana_compute_budget_interface::ComputeBudgetInstruction;
use solana_keypair::Keypair;
use solana_message::v0::Message as MessageV0;
use solana_message::{Hash, VersionedMessage};
use solana_pubkey::Pubkey;
use solana_signature::Signature;
use solana_signer::Signer;
use solana_transaction::versioned::VersionedTransaction;
use t402::authorization::SvmAuthorization;
use t402::proto::PaymentRequirements;
use t402::scheme::{BoxFuture, SchemeClient, SchemeError, SchemeId};
use t402::timestamp::UnixTimestamp;

use super::error::{ClientError, SignError};
use super::types::{
    ExactSvmPayload, associated_token_address, encode_transaction, parse_transfer_checked,
    partial_sign,
};
use super::{SCHEME_EXACT, SVM_NAMESPACE};

/// Compute-unit limit used when the builder has no estimate.
pub const DEFAULT_COMPUTE_UNIT_LIMIT: u32 = 100_000;

/// Compute-unit price in micro-lamports used by default.
pub const DEFAULT_COMPUTE_UNIT_PRICE: u64 = 1;

/// Signing capability the Solana client needs.
pub trait ClientSvmSigner: Send + Sync {
    /// The payer (token owner) address.
    fn address(&self) -> Pubkey;

    /// Adds the payer's signature to `tx`.
    fn sign_transaction(
        &self,
        tx: VersionedTransaction,
    ) -> BoxFuture<'_, Result<VersionedTransaction, SignError>>;
}

impl ClientSvmSigner for Keypair {
    fn address(&self) -> Pubkey {
        Signer::pubkey(self)
    }

    fn sign_transaction(
        &self,
        tx: VersionedTransaction,
    ) -> BoxFuture<'_, Result<VersionedTransaction, SignError>> {
        Box::pin(async move { partial_sign(tx, self) })
    }
}

/// What the builder must produce a transaction for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    /// Token owner signing the transfer.
    pub payer: Pubkey,
    /// Facilitator paying the network fee.
    pub fee_payer: Pubkey,
    /// Token mint.
    pub mint: Pubkey,
    /// Recipient wallet; the destination is its associated token account.
    pub pay_to: Pubkey,
    /// Amount in base units.
    pub amount: u64,
    /// Network as given in the requirements.
    pub network: String,
}

/// Produces the unsigned transfer transaction.
pub type TransactionBuilder = Arc<
    dyn Fn(TransferRequest) -> BoxFuture<'static, Result<VersionedTransaction, SchemeError>>
        + Send
        + Sync,
>;

/// Assembles the three-instruction transfer the facilitator expects.
///
/// Source and destination are the associated token accounts of the payer
/// and recipient. Signature slots are left empty.
///
/// # Errors
///
/// Fails if the token program rejects the arguments or the message cannot
/// be compiled.
pub fn build_transfer_transaction(
    request: &TransferRequest,
    token_program: &Pubkey,
    decimals: u8,
    compute_unit_limit: u32,
    compute_unit_price: u64,
    recent_blockhash: Hash,
) -> Result<VersionedTransaction, ClientError> {
    let source = associated_token_address(&request.payer, &request.mint, token_program);
    let destination = associated_token_address(&request.pay_to, &request.mint, token_program);
    let transfer = if *token_program == spl_token_2022::ID {
        spl_token_2022::instruction::transfer_checked(
            token_program,
            &source,
            &request.mint,
            &destination,
            &request.payer,
            &[],
            request.amount,
            decimals,
        )
    } else {
        spl_token::instruction::transfer_checked(
            token_program,
            &source,
            &request.mint,
            &destination,
            &request.payer,
            &[],
            request.amount,
            decimals,
        )
    }
    .map_err(|e| ClientError::Build(e.to_string()))?;

    let instructions = [
        ComputeBudgetInstruction::set_compute_unit_limit(compute_unit_limit),
        ComputeBudgetInstruction::set_compute_unit_price(compute_unit_price),
        transfer,
    ];
    let message = MessageV0::try_compile(&request.fee_payer, &instructions, &[], recent_blockhash)
        .map_err(|e| ClientError::Build(e.to_string()))?;
    let required = usize::from(message.header.num_required_signatures);
    Ok(VersionedTransaction {
        signatures: vec![Signature::default(); required],
        message: VersionedMessage::V0(message),
    })
}

/// A builder for SPL Token mints that needs no chain access.
///
/// Useful when the blockhash is obtained out of band, and in tests.
#[must_use]
pub fn fixed_builder(decimals: u8, recent_blockhash: Hash) -> TransactionBuilder {
    Arc::new(move |request: TransferRequest| {
        Box::pin(async move {
            build_transfer_transaction(
                &request,
                &spl_token::ID,
                decimals,
                DEFAULT_COMPUTE_UNIT_LIMIT,
                DEFAULT_COMPUTE_UNIT_PRICE,
                recent_blockhash,
            )
            .map_err(Into::into)
        })
    })
}

fn parse_pubkey(field: &'static str, value: &str) -> Result<Pubkey, ClientError> {
    value.parse().map_err(|_| ClientError::InvalidAddress {
        field,
        value: value.to_owned(),
    })
}

/// Client for the Solana `exact` scheme.
pub struct ExactSvmClient<S> {
    signer: S,
    builder: TransactionBuilder,
}

impl<S> std::fmt::Debug for ExactSvmClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExactSvmClient").finish_non_exhaustive()
    }
}

impl<S: ClientSvmSigner> ExactSvmClient<S> {
    /// Creates a client that signs transactions produced by `builder`.
    pub fn new(signer: S, builder: TransactionBuilder) -> Self {
        Self { signer, builder }
    }

    /// Builds, signs and summarizes a transfer for `requirements`.
    ///
    /// # Errors
    ///
    /// Fails on missing or malformed fields, a builder error, or a signer
    /// error.
    pub async fn sign_payment(
        &self,
        requirements: &PaymentRequirements,
    ) -> Result<ExactSvmPayload, ClientError> {
        if requirements.asset.is_empty() {
            return Err(ClientError::MissingField("Asset (SPL token mint address)"));
        }
        if requirements.pay_to.is_empty() {
            return Err(ClientError::MissingField("PayTo address"));
        }
        if requirements.amount.is_empty() {
            return Err(ClientError::MissingField("Amount"));
        }
        let mint = parse_pubkey("asset", &requirements.asset)?;
        let pay_to = parse_pubkey("payTo", &requirements.pay_to)?;
        let amount: u64 = requirements
            .amount
            .parse()
            .map_err(|_| ClientError::InvalidAmount(requirements.amount.clone()))?;
        let fee_payer = requirements
            .extra_str("feePayer")
            .ok_or(ClientError::MissingField("Fee payer (extra.feePayer)"))?;
        let fee_payer = parse_pubkey("feePayer", fee_payer)?;

        let request = TransferRequest {
            payer: self.signer.address(),
            fee_payer,
            mint,
            pay_to,
            amount,
            network: requirements.network.clone(),
        };
        let unsigned = (self.builder)(request)
            .await
            .map_err(|e| ClientError::Build(e.to_string()))?;
        let transfer = parse_transfer_checked(&unsigned).ok_or_else(|| {
            ClientError::Build("transaction has no TransferChecked instruction".to_owned())
        })?;
        let signed = self.signer.sign_transaction(unsigned).await?;

        let valid_until = UnixTimestamp::now() + requirements.max_timeout_seconds;
        let authorization = SvmAuthorization {
            from: transfer.authority.to_string(),
            to: pay_to.to_string(),
            mint: transfer.mint.to_string(),
            amount: transfer.amount.to_string(),
            valid_until: valid_until.as_secs(),
            fee_payer: Some(fee_payer.to_string()),
        };

        tracing::debug!(
            network = %requirements.network,
            payer = %self.signer.address(),
            "signed SPL transfer"
        );

        Ok(ExactSvmPayload {
            transaction: encode_transaction(&signed)?,
            authorization: Some(authorization),
        })
    }
}

impl<S> SchemeId for ExactSvmClient<S> {
    fn namespace(&self) -> &str {
        SVM_NAMESPACE
    }

    fn scheme(&self) -> &str {
        SCHEME_EXACT
    }
}

impl<S: ClientSvmSigner> SchemeClient for ExactSvmClient<S> {
    fn create_payment_payload<'a>(
        &'a self,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, Result<Value, SchemeError>> {
        Box::pin(async move {
            let payload = self.sign_payment(requirements).await?;
            Ok(serde_json::to_value(payload)?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exact::types::{decode_transaction, is_fully_signed};
    use serde_json::{Map, json};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn requirements(fee_payer: &Pubkey) -> PaymentRequirements {
        let mut extra = Map::new();
        extra.insert("feePayer".into(), json!(fee_payer.to_string()));
        PaymentRequirements {
            scheme: "exact".into(),
            network: "solana:EtWTRABZaYq6iMfeYKouRu166VU2xqa1".into(),
            asset: "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU".into(),
            amount: "1000000".into(),
            pay_to: Pubkey::new_unique().to_string(),
            max_timeout_seconds: 60,
            extra,
        }
    }

    #[tokio::test]
    async fn signs_as_payer_and_leaves_fee_payer_slot() {
        let payer = Keypair::new();
        let payer_key = payer.pubkey();
        let fee_payer = Pubkey::new_unique();
        let client = ExactSvmClient::new(payer, fixed_builder(6, Hash::default()));
        let req = requirements(&fee_payer);

        let payload = client.sign_payment(&req).await.unwrap();
        let tx = decode_transaction(&payload.transaction).unwrap();
        assert!(!is_fully_signed(&tx));
        assert_eq!(tx.message.static_account_keys()[0], fee_payer);

        let auth = payload.authorization.unwrap();
        assert_eq!(auth.from, payer_key.to_string());
        assert_eq!(auth.to, req.pay_to);
        assert_eq!(auth.amount, "1000000");
        assert_eq!(auth.fee_payer, Some(fee_payer.to_string()));
    }

    #[tokio::test]
    async fn invalid_pay_to_never_reaches_builder() {
        let called = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&called);
        let builder: TransactionBuilder = Arc::new(move |_| {
            flag.store(true, Ordering::SeqCst);
            Box::pin(async { Err("unreachable".into()) })
        });
        let client = ExactSvmClient::new(Keypair::new(), builder);
        let mut req = requirements(&Pubkey::new_unique());
        req.pay_to = "invalid-address".into();

        let err = client.sign_payment(&req).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid payTo address: invalid-address");
        assert!(!called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn transaction_without_transfer_fails_to_build() {
        let builder: TransactionBuilder = Arc::new(|request: TransferRequest| {
            Box::pin(async move {
                let instructions = [ComputeBudgetInstruction::set_compute_unit_limit(1)];
                let message =
                    MessageV0::try_compile(&request.fee_payer, &instructions, &[], Hash::default())
                        .map_err(|e| e.to_string())?;
                Ok(VersionedTransaction {
                    signatures: vec![Signature::default()],
                    message: VersionedMessage::V0(message),
                })
            })
        });
        let client = ExactSvmClient::new(Keypair::new(), builder);
        let err = client
            .sign_payment(&requirements(&Pubkey::new_unique()))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Build(_)), "{err}");
        assert_eq!(
            err.to_string(),
            "Failed to build transaction: transaction has no TransferChecked instruction"
        );
    }

    #[tokio::test]
    async fn fee_payer_is_required() {
        let client = ExactSvmClient::new(Keypair::new(), fixed_builder(6, Hash::default()));
        let mut req = requirements(&Pubkey::new_unique());
        req.extra.clear();
        let err = client.sign_payment(&req).await.unwrap_err();
        assert_eq!(err.to_string(), "Fee payer (extra.feePayer) is required");
    }
}
