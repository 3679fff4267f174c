//! JSON-RPC backed [`FacilitatorEvmSigner`].
//!
//! Reads go through `eth_call`; settlement is signed by a local wallet
//! and submitted through a filler-equipped alloy provider.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use alloy_network::{EthereumWallet, TransactionBuilder};
use alloy_primitives::{Address, B256, Bytes, U256};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_types_eth::TransactionRequest;
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::SolCall;
use t402::scheme::BoxFuture;
use url::Url;

use crate::exact::types::{authorizationStateCall, balanceOfCall, transferWithAuthorizationCall};
use crate::exact::{EvmFacilitatorError, ExactEvmPayload, FacilitatorEvmSigner, TransactionOutcome};

/// Seconds to wait for a settlement receipt by default.
pub const DEFAULT_RECEIPT_TIMEOUT_SECS: u64 = 30;

/// EVM chain access over JSON-RPC with one or more settlement keys.
#[derive(Debug, Clone)]
pub struct EvmProvider {
    inner: DynProvider,
    signers: Arc<Vec<Address>>,
    cursor: Arc<AtomicUsize>,
    receipt_timeout: Duration,
}

impl EvmProvider {
    /// Connects to `rpc_url`, signing settlements with `signers`.
    ///
    /// # Errors
    ///
    /// Returns an error when `signers` is empty.
    pub fn new(rpc_url: Url, signers: Vec<PrivateKeySigner>) -> Result<Self, EvmFacilitatorError> {
        let mut iter = signers.into_iter();
        let first = iter
            .next()
            .ok_or_else(|| EvmFacilitatorError::Rpc("no settlement signer configured".into()))?;
        let mut addresses = vec![first.address()];
        let mut wallet = EthereumWallet::from(first);
        for signer in iter {
            addresses.push(signer.address());
            wallet.register_signer(signer);
        }
        let inner = ProviderBuilder::new()
            .wallet(wallet)
            .connect_http(rpc_url)
            .erased();
        Ok(Self {
            inner,
            signers: Arc::new(addresses),
            cursor: Arc::new(AtomicUsize::new(0)),
            receipt_timeout: Duration::from_secs(DEFAULT_RECEIPT_TIMEOUT_SECS),
        })
    }

    /// Overrides the receipt timeout.
    #[must_use]
    pub const fn with_receipt_timeout(mut self, timeout: Duration) -> Self {
        self.receipt_timeout = timeout;
        self
    }

    /// Round-robin settlement account.
    fn next_signer(&self) -> Address {
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % self.signers.len();
        self.signers[idx]
    }

    async fn eth_call(&self, to: Address, calldata: Vec<u8>) -> Result<Bytes, EvmFacilitatorError> {
        let tx = TransactionRequest::default()
            .with_to(to)
            .with_input(calldata);
        self.inner
            .call(tx)
            .await
            .map_err(|e| EvmFacilitatorError::Rpc(e.to_string()))
    }
}

impl FacilitatorEvmSigner for EvmProvider {
    fn addresses(&self) -> Vec<Address> {
        self.signers.as_ref().clone()
    }

    fn balance_of(
        &self,
        token: Address,
        account: Address,
    ) -> BoxFuture<'_, Result<U256, EvmFacilitatorError>> {
        Box::pin(async move {
            let out = self
                .eth_call(token, balanceOfCall { account }.abi_encode())
                .await?;
            if out.len() < 32 {
                return Err(EvmFacilitatorError::Rpc("invalid balanceOf response".into()));
            }
            Ok(U256::from_be_slice(&out[..32]))
        })
    }

    fn authorization_state(
        &self,
        token: Address,
        authorizer: Address,
        nonce: B256,
    ) -> BoxFuture<'_, Result<bool, EvmFacilitatorError>> {
        Box::pin(async move {
            let out = self
                .eth_call(token, authorizationStateCall { authorizer, nonce }.abi_encode())
                .await?;
            Ok(out.len() >= 32 && out[31] != 0)
        })
    }

    fn transfer_with_authorization<'a>(
        &'a self,
        token: Address,
        payload: &'a ExactEvmPayload,
    ) -> BoxFuture<'a, Result<B256, EvmFacilitatorError>> {
        Box::pin(async move {
            let auth = &payload.authorization;
            let call = transferWithAuthorizationCall {
                from: auth.from,
                to: auth.to,
                value: auth.value,
                validAfter: U256::from(auth.valid_after.as_secs()),
                validBefore: U256::from(auth.valid_before.as_secs()),
                nonce: auth.nonce,
                signature: payload.signature.clone(),
            };
            let tx = TransactionRequest::default()
                .with_from(self.next_signer())
                .with_to(token)
                .with_input(call.abi_encode());
            let pending = self
                .inner
                .send_transaction(tx)
                .await
                .map_err(|e| EvmFacilitatorError::Broadcast(e.to_string()))?;
            Ok(*pending.tx_hash())
        })
    }

    fn wait_for_receipt(
        &self,
        hash: B256,
    ) -> BoxFuture<'_, Result<TransactionOutcome, EvmFacilitatorError>> {
        Box::pin(async move {
            let deadline = tokio::time::Instant::now() + self.receipt_timeout;
            loop {
                let receipt = self
                    .inner
                    .get_transaction_receipt(hash)
                    .await
                    .map_err(|e| EvmFacilitatorError::Confirmation(e.to_string()))?;
                if let Some(receipt) = receipt {
                    return Ok(TransactionOutcome {
                        hash,
                        success: receipt.status(),
                    });
                }
                if tokio::time::Instant::now() >= deadline {
                    return Err(EvmFacilitatorError::Confirmation(format!(
                        "no receipt for {hash} after {}s",
                        self.receipt_timeout.as_secs()
                    )));
                }
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        })
    }
}
