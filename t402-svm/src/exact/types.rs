//! Wire types and transaction inspection for the Solana `exact` scheme.
//!
//! The payload carries a base64 bincode `VersionedTransaction` whose
//! instructions start with a compute-unit limit, a compute-unit price and
//! an SPL `TransferChecked`, in that order. The facilitator is the fee
//! payer and co-signs before submission.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use solana_pubkey::{Pubkey, pubkey};
use solana_signature::Signature;
use solana_signer::Signer;
use solana_transaction::versioned::VersionedTransaction;
use t402::authorization::SvmAuthorization;

use super::error::{SignError, TransactionCodecError};

/// Associated Token Account program.
pub const ATA_PROGRAM_ID: Pubkey = pubkey!("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");

/// `SetComputeUnitLimit` discriminator in the compute budget program.
const SET_COMPUTE_UNIT_LIMIT: u8 = 2;

/// `SetComputeUnitPrice` discriminator in the compute budget program.
const SET_COMPUTE_UNIT_PRICE: u8 = 3;

/// The `payload` object of a Solana exact payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactSvmPayload {
    /// Base64 bincode transaction, signed by the payer.
    pub transaction: String,
    /// Transfer summary extracted by the client; informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization: Option<SvmAuthorization>,
}

/// Fields of a decoded `TransferChecked` instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferDetails {
    /// Source token account.
    pub source: Pubkey,
    /// Token mint.
    pub mint: Pubkey,
    /// Destination token account.
    pub destination: Pubkey,
    /// Owner of the source account; the payer.
    pub authority: Pubkey,
    /// Amount in base units.
    pub amount: u64,
    /// Mint decimals asserted by the instruction.
    pub decimals: u8,
    /// SPL Token or Token-2022.
    pub token_program: Pubkey,
}

/// Decodes a base64 bincode transaction.
///
/// # Errors
///
/// Fails when either layer is malformed.
pub fn decode_transaction(encoded: &str) -> Result<VersionedTransaction, TransactionCodecError> {
    let bytes = BASE64.decode(encoded.trim())?;
    Ok(bincode::deserialize(&bytes)?)
}

/// Encodes a transaction as base64 bincode.
///
/// # Errors
///
/// Fails only if bincode serialization fails.
pub fn encode_transaction(tx: &VersionedTransaction) -> Result<String, TransactionCodecError> {
    Ok(BASE64.encode(bincode::serialize(tx)?))
}

/// Derives the associated token account of `owner` for `mint`.
#[must_use]
pub fn associated_token_address(owner: &Pubkey, mint: &Pubkey, token_program: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[owner.as_ref(), token_program.as_ref(), mint.as_ref()],
        &ATA_PROGRAM_ID,
    )
    .0
}

/// Position of the compute-unit limit instruction.
pub const COMPUTE_LIMIT_INDEX: usize = 0;

/// Position of the compute-unit price instruction.
pub const COMPUTE_PRICE_INDEX: usize = 1;

/// Position of the `TransferChecked` instruction.
pub const TRANSFER_INDEX: usize = 2;

/// Phantom's Lighthouse assertion program, which the wallet appends on
/// mainnet.
pub const LIGHTHOUSE_PROGRAM_ID: Pubkey = pubkey!("L2TExMFKdjpN9kozasaurPirfHy9P8sbXoAN1qA3S95");

/// Program invoked by the instruction at `index`.
#[must_use]
pub fn program_id(tx: &VersionedTransaction, index: usize) -> Option<Pubkey> {
    let ix = tx.message.instructions().get(index)?;
    tx.message
        .static_account_keys()
        .get(usize::from(ix.program_id_index))
        .copied()
}

/// Decodes the SPL `TransferChecked` at [`TRANSFER_INDEX`].
///
/// Only static account keys are resolved; a transfer referencing an
/// address-lookup table yields `None`.
#[must_use]
pub fn parse_transfer_checked(tx: &VersionedTransaction) -> Option<TransferDetails> {
    let keys = tx.message.static_account_keys();
    let ix = tx.message.instructions().get(TRANSFER_INDEX)?;
    let program = program_id(tx, TRANSFER_INDEX)?;
    let (amount, decimals) = if program == spl_token::ID {
        match spl_token::instruction::TokenInstruction::unpack(&ix.data).ok()? {
            spl_token::instruction::TokenInstruction::TransferChecked { amount, decimals } => {
                (amount, decimals)
            }
            _ => return None,
        }
    } else if program == spl_token_2022::ID {
        match spl_token_2022::instruction::TokenInstruction::unpack(&ix.data).ok()? {
            spl_token_2022::instruction::TokenInstruction::TransferChecked { amount, decimals } => {
                (amount, decimals)
            }
            _ => return None,
        }
    } else {
        return None;
    };
    let account = |i: usize| -> Option<Pubkey> {
        let index = *ix.accounts.get(i)?;
        keys.get(usize::from(index)).copied()
    };
    Some(TransferDetails {
        source: account(0)?,
        mint: account(1)?,
        destination: account(2)?,
        authority: account(3)?,
        amount,
        decimals,
        token_program: program,
    })
}

fn compute_budget_data<const N: usize>(
    tx: &VersionedTransaction,
    index: usize,
    discriminator: u8,
) -> Option<[u8; N]> {
    if program_id(tx, index)? != solana_compute_budget_interface::ID {
        return None;
    }
    match tx.message.instructions().get(index)?.data.split_first()? {
        (first, rest) if *first == discriminator => rest.try_into().ok(),
        _ => None,
    }
}

/// Compute-unit limit set by the instruction at [`COMPUTE_LIMIT_INDEX`].
#[must_use]
pub fn compute_unit_limit(tx: &VersionedTransaction) -> Option<u32> {
    compute_budget_data(tx, COMPUTE_LIMIT_INDEX, SET_COMPUTE_UNIT_LIMIT).map(u32::from_le_bytes)
}

/// Compute-unit price in micro-lamports, set by the instruction at
/// [`COMPUTE_PRICE_INDEX`].
#[must_use]
pub fn compute_unit_price(tx: &VersionedTransaction) -> Option<u64> {
    compute_budget_data(tx, COMPUTE_PRICE_INDEX, SET_COMPUTE_UNIT_PRICE).map(u64::from_le_bytes)
}

/// Whether any instruction lists `key` among its accounts.
///
/// An account index outside the static keys resolves through a lookup
/// table and cannot be ruled out, so it counts as a match.
#[must_use]
pub fn instructions_reference(tx: &VersionedTransaction, key: &Pubkey) -> bool {
    let keys = tx.message.static_account_keys();
    tx.message
        .instructions()
        .iter()
        .flat_map(|ix| ix.accounts.iter())
        .any(|index| keys.get(usize::from(*index)).is_none_or(|account| account == key))
}

/// Adds `signer`'s signature at its slot among the required signers.
///
/// # Errors
///
/// Fails if `signer` is not a required signer or cannot sign.
pub fn partial_sign<S: Signer + ?Sized>(
    mut tx: VersionedTransaction,
    signer: &S,
) -> Result<VersionedTransaction, SignError> {
    let required = usize::from(tx.message.header().num_required_signatures);
    let pubkey = signer.pubkey();
    let position = tx
        .message
        .static_account_keys()
        .iter()
        .take(required)
        .position(|k| *k == pubkey)
        .ok_or(SignError::NotARequiredSigner(pubkey))?;
    let signature = signer
        .try_sign_message(&tx.message.serialize())
        .map_err(|e| SignError::Signer(e.to_string()))?;
    if tx.signatures.len() < required {
        tx.signatures.resize(required, Signature::default());
    }
    tx.signatures[position] = signature;
    Ok(tx)
}

/// Returns `true` when every required signature slot is filled.
#[must_use]
pub fn is_fully_signed(tx: &VersionedTransaction) -> bool {
    let required = usize::from(tx.message.header().num_required_signatures);
    tx.signatures.len() >= required
        && tx.signatures.iter().all(|s| *s != Signature::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exact::client::{TransferRequest, build_transfer_transaction};
    use solana_keypair::Keypair;
    use solana_message::Hash;

    fn sample(payer: &Keypair, fee_payer: &Pubkey) -> (VersionedTransaction, TransferRequest) {
        let request = TransferRequest {
            payer: payer.pubkey(),
            fee_payer: *fee_payer,
            mint: Pubkey::new_unique(),
            pay_to: Pubkey::new_unique(),
            amount: 1_000_000,
            network: "solana-devnet".into(),
        };
        let tx = build_transfer_transaction(&request, &spl_token::ID, 6, 200_000, 1_000, Hash::default())
            .unwrap();
        (tx, request)
    }

    #[test]
    fn extracts_transfer_checked() {
        let payer = Keypair::new();
        let (tx, request) = sample(&payer, &Pubkey::new_unique());
        let transfer = parse_transfer_checked(&tx).unwrap();
        assert_eq!(transfer.authority, payer.pubkey());
        assert_eq!(transfer.mint, request.mint);
        assert_eq!(transfer.amount, 1_000_000);
        assert_eq!(transfer.decimals, 6);
        assert_eq!(
            transfer.destination,
            associated_token_address(&request.pay_to, &request.mint, &spl_token::ID)
        );
        assert_eq!(compute_unit_price(&tx), Some(1_000));
        assert_eq!(compute_unit_limit(&tx), Some(200_000));
    }

    #[test]
    fn signatures_fill_their_own_slot() {
        let payer = Keypair::new();
        let fee_payer = Keypair::new();
        let (tx, _) = sample(&payer, &fee_payer.pubkey());
        let tx = partial_sign(tx, &payer).unwrap();
        assert!(!is_fully_signed(&tx));

        let encoded = encode_transaction(&tx).unwrap();
        let tx = decode_transaction(&encoded).unwrap();
        let tx = partial_sign(tx, &fee_payer).unwrap();
        assert!(is_fully_signed(&tx));

        let stranger = Keypair::new();
        assert!(matches!(
            partial_sign(tx, &stranger),
            Err(SignError::NotARequiredSigner(_))
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            decode_transaction("not base64!"),
            Err(TransactionCodecError::Base64(_))
        ));
        assert!(matches!(
            decode_transaction("AAAA"),
            Err(TransactionCodecError::Bincode(_))
        ));
    }
}
