//! Version sniffing and network pattern helpers.
//!
//! Messages arrive as untyped JSON. The `t402Version` field picks the wire
//! shape, and the `parse_*` functions return it as a version-tagged enum.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::ProtocolError;
use crate::v1::{PaymentPayloadV1, PaymentRequiredV1, PaymentRequirementsV1};
use crate::v2::{PaymentPayload, PaymentRequired, PaymentRequirements};

/// Reads `t402Version` from a message.
///
/// # Errors
///
/// [`ProtocolError::MissingVersion`] when absent,
/// [`ProtocolError::InvalidVersion`] for anything but 1 or 2.
pub fn detect_version(data: &Value) -> Result<u32, ProtocolError> {
    match data.get("t402Version").ok_or(ProtocolError::MissingVersion)?.as_u64() {
        Some(v @ (1 | 2)) => u32::try_from(v).map_err(|_| ProtocolError::InvalidVersion(v)),
        Some(other) => Err(ProtocolError::InvalidVersion(other)),
        None => Err(ProtocolError::InvalidVersion(0)),
    }
}

fn typed<T: DeserializeOwned>(data: &Value) -> Result<Box<T>, ProtocolError> {
    Ok(Box::new(T::deserialize(data)?))
}

/// Whether a payload was built for `requirements`.
///
/// V1 payloads only carry scheme and network. V2 payloads echo the accepted
/// requirements, so amount, asset and `payTo` must agree as well.
#[must_use]
pub fn match_payload_to_requirements(version: u32, payload: &Value, requirements: &Value) -> bool {
    let (source, keys): (Option<&Value>, &[&str]) = if version == 1 {
        (Some(payload), &["scheme", "network"])
    } else {
        (
            payload.get("accepted"),
            &["scheme", "network", "amount", "asset", "payTo"],
        )
    };
    source.is_some_and(|source| keys.iter().all(|key| source.get(key) == requirements.get(key)))
}

/// Decodes a 402 body of either version.
///
/// # Errors
///
/// Version or shape errors as [`ProtocolError`].
pub fn parse_payment_required(data: &Value) -> Result<PaymentRequiredEnum, ProtocolError> {
    Ok(match detect_version(data)? {
        1 => PaymentRequiredEnum::V1(typed::<PaymentRequiredV1>(data)?),
        _ => PaymentRequiredEnum::V2(typed::<PaymentRequired>(data)?),
    })
}

/// Decodes a payment payload of either version.
///
/// # Errors
///
/// Version or shape errors as [`ProtocolError`].
pub fn parse_payment_payload(data: &Value) -> Result<PaymentPayloadEnum, ProtocolError> {
    Ok(match detect_version(data)? {
        1 => PaymentPayloadEnum::V1(typed::<PaymentPayloadV1>(data)?),
        _ => PaymentPayloadEnum::V2(typed::<PaymentPayload>(data)?),
    })
}

/// Decodes requirements in the shape of `t402_version`.
///
/// Requirements have no version field, so the caller passes the version of
/// the payload they travel with.
///
/// # Errors
///
/// [`ProtocolError::InvalidVersion`] for an unknown version, otherwise
/// shape errors.
pub fn parse_payment_requirements(
    t402_version: u32,
    data: &Value,
) -> Result<PaymentRequirementsEnum, ProtocolError> {
    match t402_version {
        1 => Ok(PaymentRequirementsEnum::V1(typed::<PaymentRequirementsV1>(data)?)),
        2 => Ok(PaymentRequirementsEnum::V2(typed::<PaymentRequirements>(data)?)),
        other => Err(ProtocolError::InvalidVersion(u64::from(other))),
    }
}

/// Registration pattern matching.
///
/// `"*"` matches any network and `"ns:*"` any network with that prefix.
/// Other patterns are compared literally.
#[must_use]
pub fn matches_network_pattern(network: &str, pattern: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => network.starts_with(prefix),
        None => network == pattern,
    }
}

/// `true` for patterns containing `*`.
#[must_use]
pub fn is_wildcard_pattern(pattern: &str) -> bool {
    pattern.contains('*')
}

/// CAIP-2 namespace: `"eip155"` for `"eip155:8453"`. A legacy name without
/// a colon is returned as is.
#[must_use]
pub fn network_namespace(network: &str) -> &str {
    network.split_once(':').map_or(network, |(namespace, _)| namespace)
}

/// Family wildcard of a network: `"eip155:*"` for `"eip155:8453"`.
#[must_use]
pub fn caip_family(network: &str) -> String {
    format!("{}:*", network_namespace(network))
}

/// A 402 body tagged with its version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentRequiredEnum {
    /// Legacy body (`accepts` with `maxAmountRequired`).
    V1(Box<PaymentRequiredV1>),
    /// Current body.
    V2(Box<PaymentRequired>),
}

/// A payment payload tagged with its version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentPayloadEnum {
    /// Scheme and network at the top level.
    V1(Box<PaymentPayloadV1>),
    /// Scheme and network inside `accepted`.
    V2(Box<PaymentPayload>),
}

/// Payment requirements tagged with their version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentRequirementsEnum {
    /// Legacy requirements.
    V1(Box<PaymentRequirementsV1>),
    /// Current requirements.
    V2(Box<PaymentRequirements>),
}

impl PaymentPayloadEnum {
    /// `t402Version` of the payload.
    #[must_use]
    pub const fn version(&self) -> u32 {
        match self {
            Self::V1(p) => p.t402_version,
            Self::V2(p) => p.t402_version,
        }
    }

    /// Scheme name, wherever the version keeps it.
    #[must_use]
    pub fn scheme(&self) -> &str {
        match self {
            Self::V1(p) => p.scheme(),
            Self::V2(p) => p.scheme(),
        }
    }

    /// Network, wherever the version keeps it.
    #[must_use]
    pub fn network(&self) -> &str {
        match self {
            Self::V1(p) => p.network(),
            Self::V2(p) => p.network(),
        }
    }
}

impl PaymentRequirementsEnum {
    /// Scheme name.
    #[must_use]
    pub fn scheme(&self) -> &str {
        match self {
            Self::V1(r) => &r.scheme,
            Self::V2(r) => &r.scheme,
        }
    }

    /// Network identifier.
    #[must_use]
    pub fn network(&self) -> &str {
        match self {
            Self::V1(r) => &r.network,
            Self::V2(r) => &r.network,
        }
    }

    /// Atomic amount (`maxAmountRequired` in V1).
    #[must_use]
    pub fn amount(&self) -> &str {
        match self {
            Self::V1(r) => r.amount(),
            Self::V2(r) => r.amount(),
        }
    }
}
