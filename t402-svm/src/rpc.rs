//! Solana RPC backed [`FacilitatorSvmSigner`] and [`TransactionBuilder`].

use std::sync::Arc;
use std::time::Duration;

use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSimulateTransactionConfig;
use solana_commitment_config::CommitmentConfig;
use solana_keypair::Keypair;
use solana_pubkey::Pubkey;
use solana_signature::Signature;
use solana_signer::Signer;
use solana_transaction::versioned::VersionedTransaction;
use spl_token::solana_program::program_pack::Pack;
use t402::scheme::BoxFuture;

use crate::exact::client::{
    DEFAULT_COMPUTE_UNIT_LIMIT, DEFAULT_COMPUTE_UNIT_PRICE, TransactionBuilder, TransferRequest,
    build_transfer_transaction,
};
use crate::exact::types::partial_sign;
use crate::exact::{FacilitatorSvmSigner, SvmFacilitatorError};

/// Seconds to wait for confirmation by default.
pub const DEFAULT_CONFIRM_TIMEOUT_SECS: u64 = 30;

/// Fee-payer keys plus an RPC connection to one Solana cluster.
pub struct SvmRpc {
    client: Arc<RpcClient>,
    keypairs: Vec<Keypair>,
    confirm_timeout: Duration,
}

impl std::fmt::Debug for SvmRpc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SvmRpc")
            .field("url", &self.client.url())
            .field("fee_payers", &self.keypairs.iter().map(Signer::pubkey).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl SvmRpc {
    /// Connects to `rpc_url` with `confirmed` commitment.
    #[must_use]
    pub fn new(rpc_url: impl Into<String>, keypairs: Vec<Keypair>) -> Self {
        let client = RpcClient::new_with_commitment(rpc_url.into(), CommitmentConfig::confirmed());
        Self {
            client: Arc::new(client),
            keypairs,
            confirm_timeout: Duration::from_secs(DEFAULT_CONFIRM_TIMEOUT_SECS),
        }
    }

    /// Overrides the confirmation timeout.
    #[must_use]
    pub const fn with_confirm_timeout(mut self, timeout: Duration) -> Self {
        self.confirm_timeout = timeout;
        self
    }

    /// A client-side builder that reads the mint and a fresh blockhash
    /// from this cluster.
    #[must_use]
    pub fn transaction_builder(&self) -> TransactionBuilder {
        let client = Arc::clone(&self.client);
        Arc::new(move |request: TransferRequest| {
            let client = Arc::clone(&client);
            Box::pin(async move {
                let account = client.get_account(&request.mint).await?;
                let data = account
                    .data
                    .get(..spl_token::state::Mint::LEN)
                    .ok_or("mint account is too short")?;
                let mint = spl_token::state::Mint::unpack(data)?;
                let blockhash = client.get_latest_blockhash().await?;
                Ok(build_transfer_transaction(
                    &request,
                    &account.owner,
                    mint.decimals,
                    DEFAULT_COMPUTE_UNIT_LIMIT,
                    DEFAULT_COMPUTE_UNIT_PRICE,
                    blockhash,
                )?)
            })
        })
    }
}

impl FacilitatorSvmSigner for SvmRpc {
    fn addresses(&self) -> Vec<Pubkey> {
        self.keypairs.iter().map(Signer::pubkey).collect()
    }

    fn sign_transaction(
        &self,
        tx: VersionedTransaction,
        fee_payer: Pubkey,
    ) -> BoxFuture<'_, Result<VersionedTransaction, SvmFacilitatorError>> {
        Box::pin(async move {
            let keypair = self
                .keypairs
                .iter()
                .find(|k| k.pubkey() == fee_payer)
                .ok_or(SvmFacilitatorError::UnknownFeePayer(fee_payer))?;
            Ok(partial_sign(tx, keypair)?)
        })
    }

    fn simulate_transaction<'a>(
        &'a self,
        tx: &'a VersionedTransaction,
    ) -> BoxFuture<'a, Result<(), SvmFacilitatorError>> {
        Box::pin(async move {
            let config = RpcSimulateTransactionConfig {
                sig_verify: false,
                replace_recent_blockhash: false,
                commitment: Some(CommitmentConfig::confirmed()),
                encoding: None,
                accounts: None,
                inner_instructions: false,
                min_context_slot: None,
            };
            let response = self
                .client
                .simulate_transaction_with_config(tx, config)
                .await
                .map_err(|e| SvmFacilitatorError::Simulation(e.to_string()))?;
            match response.value.err {
                Some(err) => Err(SvmFacilitatorError::Simulation(format!("{err:?}"))),
                None => Ok(()),
            }
        })
    }

    fn send_transaction<'a>(
        &'a self,
        tx: &'a VersionedTransaction,
    ) -> BoxFuture<'a, Result<Signature, SvmFacilitatorError>> {
        Box::pin(async move {
            self.client
                .send_transaction(tx)
                .await
                .map_err(|e| SvmFacilitatorError::Broadcast(e.to_string()))
        })
    }

    fn confirm_transaction(
        &self,
        signature: Signature,
    ) -> BoxFuture<'_, Result<(), SvmFacilitatorError>> {
        Box::pin(async move {
            let deadline = tokio::time::Instant::now() + self.confirm_timeout;
            loop {
                let status = self
                    .client
                    .get_signature_status_with_commitment(&signature, CommitmentConfig::confirmed())
                    .await
                    .map_err(|e| SvmFacilitatorError::Confirmation(e.to_string()))?;
                match status {
                    Some(Ok(())) => return Ok(()),
                    Some(Err(e)) => return Err(SvmFacilitatorError::Confirmation(e.to_string())),
                    None if tokio::time::Instant::now() >= deadline => {
                        return Err(SvmFacilitatorError::Confirmation(format!(
                            "{signature} not confirmed after {}s",
                            self.confirm_timeout.as_secs()
                        )));
                    }
                    None => tokio::time::sleep(Duration::from_millis(500)).await,
                }
            }
        })
    }
}
