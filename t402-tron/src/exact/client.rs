//! Client-side signing for the TRON `exact` scheme.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use t402::authorization::TronAuthorization;
use t402::proto::PaymentRequirements;
use t402::scheme::{BoxFuture, SchemeClient, SchemeError, SchemeId};
use t402::timestamp::now_millis;

use super::error::{ClientError, SignError};
use super::types::{BlockInfo, ExactTronPayload, SignTransactionRequest};
use super::{SCHEME_EXACT, TRON_NAMESPACE};
use crate::address::is_valid_address;
use crate::fees::fee_limit;
use crate::networks::normalize;

/// Wallet operations the TRON client needs.
pub trait ClientTronSigner: Send + Sync {
    /// Wallet address (`T...`).
    fn address(&self) -> String;

    /// Latest block reference to build the transaction against.
    fn get_block_info(&self) -> BoxFuture<'_, Result<BlockInfo, SignError>>;

    /// Builds and signs a TRC-20 transfer; returns the hex transaction.
    fn sign_transaction(
        &self,
        request: SignTransactionRequest,
    ) -> BoxFuture<'_, Result<String, SignError>>;
}

/// Settings for [`ExactTronClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExactTronConfig {
    /// Fee limit in SUN. Clamped to 10..=1000 TRX; 100 TRX when unset.
    pub fee_limit: Option<u64>,
}

/// Client for the TRON `exact` scheme.
#[derive(Debug)]
pub struct ExactTronClient<S> {
    signer: S,
    config: ExactTronConfig,
}

impl<S: ClientTronSigner> ExactTronClient<S> {
    /// Creates a client with the default fee limit.
    pub fn new(signer: S) -> Self {
        Self::with_config(signer, ExactTronConfig::default())
    }

    /// Creates a client with explicit settings.
    pub const fn with_config(signer: S, config: ExactTronConfig) -> Self {
        Self { signer, config }
    }

    /// Signs a TRC-20 transfer for `requirements`.
    ///
    /// # Errors
    ///
    /// Fails on missing fields, malformed addresses, an unknown network, or
    /// a signer error. Nothing is signed when validation fails.
    pub async fn sign_payment(
        &self,
        requirements: &PaymentRequirements,
    ) -> Result<ExactTronPayload, ClientError> {
        if requirements.asset.is_empty() {
            return Err(ClientError::MissingField("Asset (TRC-20 contract address)"));
        }
        if requirements.pay_to.is_empty() {
            return Err(ClientError::MissingField("PayTo address"));
        }
        if requirements.amount.is_empty() {
            return Err(ClientError::MissingField("Amount"));
        }
        let checks = [
            ("TRC-20 contract", requirements.asset.clone()),
            ("payTo", requirements.pay_to.clone()),
            ("signer", self.signer.address()),
        ];
        if let Some((field, value)) = checks.into_iter().find(|(_, v)| !is_valid_address(v)) {
            return Err(ClientError::InvalidAddress { field, value });
        }
        if normalize(&requirements.network).is_none() {
            return Err(ClientError::UnsupportedNetwork(requirements.network.clone()));
        }

        let block = self
            .signer
            .get_block_info()
            .await
            .map_err(ClientError::BlockInfo)?;
        let expiration = if block.expiration > 0 {
            block.expiration
        } else {
            now_millis() + requirements.max_timeout_seconds * 1000
        };

        let signed_transaction = self
            .signer
            .sign_transaction(SignTransactionRequest {
                contract_address: requirements.asset.clone(),
                to: requirements.pay_to.clone(),
                amount: requirements.amount.clone(),
                fee_limit: fee_limit(self.config.fee_limit),
                expiration,
                block: block.clone(),
            })
            .await?;

        tracing::debug!(network = %requirements.network, expiration, "signed trc20 transfer");

        Ok(ExactTronPayload {
            signed_transaction,
            authorization: TronAuthorization {
                from: self.signer.address(),
                to: requirements.pay_to.clone(),
                contract_address: requirements.asset.clone(),
                amount: requirements.amount.clone(),
                expiration,
                ref_block_bytes: block.ref_block_bytes,
                ref_block_hash: block.ref_block_hash,
                timestamp: now_millis(),
            },
        })
    }
}

impl<S> SchemeId for ExactTronClient<S> {
    fn namespace(&self) -> &str {
        TRON_NAMESPACE
    }

    fn scheme(&self) -> &str {
        SCHEME_EXACT
    }
}

impl<S: ClientTronSigner> SchemeClient for ExactTronClient<S> {
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
    use crate::networks::USDT_MAINNET;
    use serde_json::Map;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    const PAYER: &str = "TA4Wt1DUCqz6YegbnsmqsWC5uUfbdBqPxm";
    const MERCHANT: &str = "TA9pkx4DFxrEw8JZzUtyDrh2uAat1LDuJL";

    struct MockWallet {
        expiration: u64,
        signed: Mutex<Option<SignTransactionRequest>>,
        called: AtomicBool,
    }

    impl MockWallet {
        fn new(expiration: u64) -> Self {
            Self {
                expiration,
                signed: Mutex::new(None),
                called: AtomicBool::new(false),
            }
        }
    }

    impl ClientTronSigner for MockWallet {
        fn address(&self) -> String {
            PAYER.into()
        }

        fn get_block_info(&self) -> BoxFuture<'_, Result<BlockInfo, SignError>> {
            Box::pin(async move {
                Ok(BlockInfo {
                    ref_block_bytes: "ab12".into(),
                    ref_block_hash: "cd34ef5612345678".into(),
                    expiration: self.expiration,
                    timestamp: 1_700_000_000_000,
                })
            })
        }

        fn sign_transaction(
            &self,
            request: SignTransactionRequest,
        ) -> BoxFuture<'_, Result<String, SignError>> {
            Box::pin(async move {
                self.called.store(true, Ordering::SeqCst);
                *self.signed.lock().unwrap() = Some(request);
                Ok("0a02ab12".into())
            })
        }
    }

    fn requirements() -> PaymentRequirements {
        PaymentRequirements {
            scheme: "exact".into(),
            network: "tron:mainnet".into(),
            asset: USDT_MAINNET.into(),
            amount: "2500000".into(),
            pay_to: MERCHANT.into(),
            max_timeout_seconds: 120,
            extra: Map::new(),
        }
    }

    #[tokio::test]
    async fn signs_against_block_reference() {
        let client = ExactTronClient::new(MockWallet::new(1_700_000_060_000));
        let payload = client.sign_payment(&requirements()).await.unwrap();
        let auth = &payload.authorization;
        assert_eq!(auth.from, PAYER);
        assert_eq!(auth.to, MERCHANT);
        assert_eq!(auth.expiration, 1_700_000_060_000);
        assert_eq!(auth.ref_block_bytes, "ab12");
        assert_eq!(payload.signed_transaction, "0a02ab12");

        let signed = client.signer.signed.lock().unwrap().clone().unwrap();
        assert_eq!(signed.fee_limit, 100_000_000);
        assert_eq!(signed.amount, "2500000");
    }

    #[tokio::test]
    async fn expiration_falls_back_to_timeout() {
        let client = ExactTronClient::with_config(
            MockWallet::new(0),
            ExactTronConfig {
                fee_limit: Some(1),
            },
        );
        let before = now_millis();
        let payload = client.sign_payment(&requirements()).await.unwrap();
        assert!(payload.authorization.expiration >= before + 120_000);
        let signed = client.signer.signed.lock().unwrap().clone().unwrap();
        assert_eq!(signed.fee_limit, 10_000_000);
    }

    #[tokio::test]
    async fn invalid_pay_to_never_reaches_signer() {
        let client = ExactTronClient::new(MockWallet::new(1));
        let mut req = requirements();
        req.pay_to = "invalid-address".into();
        let err = client.sign_payment(&req).await.unwrap_err();
        assert!(err.to_string().contains("Invalid payTo address"));
        assert!(!client.signer.called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn required_fields_are_named() {
        let client = ExactTronClient::new(MockWallet::new(1));
        let mut req = requirements();
        req.asset.clear();
        let err = client.sign_payment(&req).await.unwrap_err();
        assert_eq!(err.to_string(), "Asset (TRC-20 contract address) is required");

        let mut req = requirements();
        req.network = "tron:moon".into();
        let err = client.sign_payment(&req).await.unwrap_err();
        assert_eq!(err.to_string(), "Unsupported TRON network: tron:moon");
    }
}
