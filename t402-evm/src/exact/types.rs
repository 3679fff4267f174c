//! Wire types for the EVM `exact` scheme.

use alloy_primitives::{Address, B256, Bytes, U256};
use alloy_sol_types::{Eip712Domain, eip712_domain, sol};
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use t402::authorization::EvmAuthorization;
use t402::proto::PaymentRequirements;
use t402::timestamp::UnixTimestamp;

use crate::networks::{ChainId, DEFAULT_USDC_NAME, DEFAULT_USDC_VERSION};

sol! {
    /// EIP-712 message signed by the payer.
    #[derive(Debug)]
    struct TransferWithAuthorization {
        address from;
        address to;
        uint256 value;
        uint256 validAfter;
        uint256 validBefore;
        bytes32 nonce;
    }

    /// ERC-3009 settlement call (bytes-signature overload).
    function transferWithAuthorization(
        address from,
        address to,
        uint256 value,
        uint256 validAfter,
        uint256 validBefore,
        bytes32 nonce,
        bytes signature
    ) external;

    /// ERC-3009 nonce state lookup.
    function authorizationState(address authorizer, bytes32 nonce) external view returns (bool);

    /// ERC-20 balance lookup.
    function balanceOf(address account) external view returns (uint256);
}

/// Signed ERC-3009 authorization.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactEvmAuthorization {
    /// Payer.
    pub from: Address,
    /// Recipient.
    pub to: Address,
    /// Amount in atomic units, as a decimal string.
    #[serde_as(as = "DisplayFromStr")]
    pub value: U256,
    /// Not valid before this time.
    pub valid_after: UnixTimestamp,
    /// Not valid at or after this time.
    pub valid_before: UnixTimestamp,
    /// Random 32-byte nonce.
    pub nonce: B256,
}

impl ExactEvmAuthorization {
    /// Returns the EIP-712 message for this authorization.
    #[must_use]
    pub fn message(&self) -> TransferWithAuthorization {
        TransferWithAuthorization {
            from: self.from,
            to: self.to,
            value: self.value,
            validAfter: U256::from(self.valid_after.as_secs()),
            validBefore: U256::from(self.valid_before.as_secs()),
            nonce: self.nonce,
        }
    }
}

impl From<&ExactEvmAuthorization> for EvmAuthorization {
    fn from(auth: &ExactEvmAuthorization) -> Self {
        Self {
            from: auth.from.to_checksum(None),
            to: auth.to.to_checksum(None),
            value: auth.value.to_string(),
            valid_after: auth.valid_after.as_secs().to_string(),
            valid_before: auth.valid_before.as_secs().to_string(),
            nonce: auth.nonce.to_string(),
        }
    }
}

/// The `payload` object of an EVM exact payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExactEvmPayload {
    /// 65-byte ECDSA signature over the EIP-712 hash.
    pub signature: Bytes,
    /// The signed authorization.
    pub authorization: ExactEvmAuthorization,
}

/// EIP-712 domain metadata carried in `requirements.extra`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExactEvmExtra {
    /// Token name (domain `name`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Token version (domain `version`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ExactEvmExtra {
    /// Reads the domain metadata from requirements, ignoring malformed values.
    #[must_use]
    pub fn from_requirements(requirements: &PaymentRequirements) -> Self {
        Self {
            name: requirements.extra_str("name").map(str::to_owned),
            version: requirements.extra_str("version").map(str::to_owned),
        }
    }

    /// Builds the EIP-712 domain, defaulting to `"USD Coin"` version `"2"`.
    #[must_use]
    pub fn domain(&self, chain_id: ChainId, verifying_contract: Address) -> Eip712Domain {
        let name = self
            .name
            .clone()
            .unwrap_or_else(|| DEFAULT_USDC_NAME.to_owned());
        let version = self
            .version
            .clone()
            .unwrap_or_else(|| DEFAULT_USDC_VERSION.to_owned());
        eip712_domain! {
            name: name,
            version: version,
            chain_id: chain_id,
            verifying_contract: verifying_contract,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use serde_json::json;

    #[test]
    fn payload_uses_string_numbers() {
        let payload: ExactEvmPayload = serde_json::from_value(json!({
            "signature": "0x00",
            "authorization": {
                "from": "0x857b06519E91e3A54538791bDbb0E22373e36b66",
                "to": "0x209693Bc6afc0C5328bA36FaF03C514EF312287C",
                "value": "1000000",
                "validAfter": "1740672089",
                "validBefore": "1740672154",
                "nonce": "0xf3746613c2d920b5fdabc0856f2aeb2d4f88ee6037b8cc5d04a71a4462f13480"
            }
        }))
        .unwrap();
        assert_eq!(payload.authorization.value, U256::from(1_000_000));
        assert_eq!(payload.authorization.valid_before.as_secs(), 1_740_672_154);

        let back = serde_json::to_value(&payload).unwrap();
        assert_eq!(back["authorization"]["value"], "1000000");
        assert_eq!(back["authorization"]["validAfter"], "1740672089");
    }

    #[test]
    fn domain_defaults_to_usdc() {
        let domain = ExactEvmExtra::default().domain(
            8453,
            address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"),
        );
        assert_eq!(domain.name.as_deref(), Some("USD Coin"));
        assert_eq!(domain.version.as_deref(), Some("2"));
        assert_eq!(domain.chain_id, Some(U256::from(8453)));
    }
}
