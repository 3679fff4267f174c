//! TRON address and hex helpers.

use std::sync::LazyLock;

use regex::Regex;

/// Version byte of mainnet-style TRON addresses.
pub const ADDRESS_PREFIX: u8 = 0x41;

static BASE58_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^T[1-9A-HJ-NP-Za-km-z]{33}$").expect("valid TRON address regex")
});

/// Returns `true` for a `T...` base58check address with the `0x41` prefix
/// and a valid checksum.
///
/// ```
/// use t402_tron::address::is_valid_address;
///
/// assert!(is_valid_address("TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t"));
/// assert!(!is_valid_address("TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6u"));
/// assert!(!is_valid_address("invalid-address"));
/// ```
#[must_use]
pub fn is_valid_address(address: &str) -> bool {
    BASE58_ADDRESS.is_match(address)
        && bs58::decode(address)
            .with_check(Some(ADDRESS_PREFIX))
            .into_vec()
            .is_ok_and(|bytes| bytes.len() == 21)
}

/// Compares two addresses. Base58 is case-sensitive, and empty addresses
/// never match.
#[must_use]
pub fn addresses_equal(a: &str, b: &str) -> bool {
    !a.is_empty() && a == b
}

/// Returns `true` for a non-empty hex string, with or without `0x`.
#[must_use]
pub fn is_valid_hex(value: &str) -> bool {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_hexdigit())
}
