//! Address and BOC format checks.
//!
//! These are syntactic only. Whether an address exists, or a BOC holds a
//! correctly signed message, is for the facilitator signer to decide.

use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use regex::Regex;

/// Magic prefix of a serialized bag of cells.
pub const BOC_MAGIC: [u8; 4] = [0xb5, 0xee, 0x9c, 0x72];

static FRIENDLY_ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{46,48}$").expect("valid friendly address regex"));

static RAW_ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?[0-9]:[a-fA-F0-9]{64}$").expect("valid raw address regex"));

/// Accepts user-friendly (base64url, 46 to 48 characters) and raw
/// (`workchain:hex64`) addresses.
///
/// ```
/// use t402_ton::address::is_valid_address;
///
/// assert!(is_valid_address("EQCxE6mUtQJKFnGfaROTKOt1lZbDiiX1kCixRv7Nw2Id_sDs"));
/// assert!(is_valid_address(
///     "0:b113a994b5024a16719f69139328eb759596c38a25f59028b146fecdc3621dfe"
/// ));
/// assert!(!is_valid_address("invalid-address"));
/// ```
#[must_use]
pub fn is_valid_address(address: &str) -> bool {
    FRIENDLY_ADDRESS.is_match(address) || RAW_ADDRESS.is_match(address)
}

/// Compares two addresses ignoring ASCII case.
#[must_use]
pub fn addresses_equal(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Returns `true` if `boc` is base64 (standard or URL-safe) of a bag of
/// cells.
#[must_use]
pub fn validate_boc(boc: &str) -> bool {
    let boc = boc.trim();
    if boc.is_empty() {
        return false;
    }
    STANDARD
        .decode(boc)
        .or_else(|_| URL_SAFE.decode(boc))
        .is_ok_and(|bytes| bytes.starts_with(&BOC_MAGIC))
}
