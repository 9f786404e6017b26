use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{WalletError, WalletResult};
use crate::tokens::AccountToken;

const MAX_ADDRESS_LENGTH: usize = 128;
const MAX_TITLE_LENGTH: usize = 120;
pub const DEFAULT_TITLE: &str = "Transaction";

static ADDRESS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9]+$").expect("address pattern compiles"));

static SIGNATURE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[0-9a-fA-F]{2})+$").expect("signature pattern compiles"));

// Titles end up rendered in the transaction list.
static MALICIOUS_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"<script",
        r"javascript:",
        r"data:text/html",
        r"vbscript:",
        r"onload=",
        r"onerror=",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("malicious pattern compiles"))
    .collect()
});

/// Validate an account address as returned by a wallet provider.
pub fn validate_address(address: &str) -> WalletResult<()> {
    if address.is_empty() {
        return Err(WalletError::ValidationError(
            "Address cannot be empty".to_string(),
        ));
    }

    if address.len() > MAX_ADDRESS_LENGTH {
        return Err(WalletError::ValidationError("Address too long".to_string()));
    }

    if !ADDRESS_PATTERN.is_match(address) {
        return Err(WalletError::ValidationError(
            "Address format is invalid".to_string(),
        ));
    }

    Ok(())
}

/// Validate an ownership proof: non-empty, even-length hex.
pub fn validate_signature(signature: &str) -> WalletResult<()> {
    if !SIGNATURE_PATTERN.is_match(signature) {
        return Err(WalletError::ValidationError(
            "Signature must be hex encoded".to_string(),
        ));
    }
    Ok(())
}

/// Structural check of an account token before it is sent for verification.
pub fn validate_account_token(token: &AccountToken) -> WalletResult<()> {
    validate_address(&token.address)?;
    validate_signature(&token.signature)
}

/// Trim a display title, falling back to the default and capping its length.
pub fn normalize_title(title: &str) -> WalletResult<String> {
    let lowered = title.to_lowercase();
    if MALICIOUS_PATTERNS.iter().any(|p| p.is_match(&lowered)) {
        return Err(WalletError::ValidationError(
            "Title contains potentially malicious content".to_string(),
        ));
    }

    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Ok(DEFAULT_TITLE.to_string());
    }
    Ok(trimmed.chars().take(MAX_TITLE_LENGTH).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(address: &str, signature: &str) -> AccountToken {
        AccountToken {
            address: address.to_string(),
            signature: signature.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn accepts_well_formed_tokens() {
        assert!(validate_account_token(&token("erd1abc", "deadbeef")).is_ok());
    }

    #[test]
    fn rejects_empty_address_or_proof() {
        assert!(validate_account_token(&token("", "deadbeef")).is_err());
        assert!(validate_account_token(&token("erd1abc", "")).is_err());
    }

    #[test]
    fn rejects_odd_or_non_hex_signatures() {
        assert!(validate_signature("abc").is_err());
        assert!(validate_signature("zz").is_err());
    }

    #[test]
    fn rejects_addresses_with_separators() {
        assert!(validate_address("erd1 abc").is_err());
        assert!(validate_address("erd1abc?x=1").is_err());
    }

    #[test]
    fn titles_are_trimmed_and_defaulted() {
        assert_eq!(normalize_title("  Swap  ").unwrap(), "Swap");
        assert_eq!(normalize_title("   ").unwrap(), DEFAULT_TITLE);
        assert_eq!(normalize_title(&"x".repeat(500)).unwrap().len(), 120);
        assert!(normalize_title("<script>alert(1)</script>").is_err());
    }
}
