//! Access token validation.
//!
//! The caller's token is forwarded to the secret store untouched, but it must
//! first pass a purely lexical check: five hyphen-separated groups of ASCII
//! hex digits with lengths 8-4-4-4-12 (case-insensitive). Braces, surrounding
//! whitespace, and the compact 32-digit form are all rejected. The check runs
//! before any network I/O, so a malformed token never reaches Vault.

use std::fmt;

use crate::error::InvalidTokenError;

/// Required length of each hyphen-separated token group.
const TOKEN_GROUP_LENGTHS: [usize; 5] = [8, 4, 4, 4, 12];

/// Total token length including the four hyphens.
const TOKEN_LENGTH: usize = 36;

/// Check that `token` has the 8-4-4-4-12 hexadecimal shape.
///
/// # Errors
///
/// Returns [`InvalidTokenError`] if the token does not fully match.
pub fn validate_token(token: &str) -> Result<(), InvalidTokenError> {
    if is_valid_token(token) {
        Ok(())
    } else {
        Err(InvalidTokenError)
    }
}

fn is_valid_token(token: &str) -> bool {
    if token.len() != TOKEN_LENGTH {
        return false;
    }

    let mut groups = 0usize;
    for (i, group) in token.split('-').enumerate() {
        let Some(&expected) = TOKEN_GROUP_LENGTHS.get(i) else {
            return false;
        };
        if group.len() != expected || !group.bytes().all(|b| b.is_ascii_hexdigit()) {
            return false;
        }
        groups = i.saturating_add(1);
    }

    groups == TOKEN_GROUP_LENGTHS.len()
}

/// A caller-supplied token that passed shape validation.
///
/// The raw value is only reachable through [`AccessToken::expose`]; the
/// `Debug` and `Display` impls print the first group only.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Validate and wrap a raw token.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTokenError`] if the token does not have the
    /// 8-4-4-4-12 hexadecimal shape.
    pub fn parse(raw: impl Into<String>) -> Result<Self, InvalidTokenError> {
        let raw = raw.into();
        validate_token(&raw)?;
        Ok(Self(raw))
    }

    /// The raw token, for forwarding to the secret store.
    pub fn expose(&self) -> &str {
        &self.0
    }

    fn redacted(&self) -> &str {
        self.0.split('-').next().unwrap_or_default()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessToken({}-****)", self.redacted())
    }
}

impl fmt::Display for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-****", self.redacted())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn accepts_lowercase_token() {
        assert!(validate_token("abcdef01-1234-4abc-9def-0123456789ab").is_ok());
    }

    #[test]
    fn accepts_uppercase_and_mixed_case() {
        assert!(validate_token("ABCDEF01-1234-4ABC-9DEF-0123456789AB").is_ok());
        assert!(validate_token("AbCdEf01-1234-4aBc-9DeF-0123456789aB").is_ok());
    }

    #[test]
    fn accepts_generated_uuid() {
        let token = uuid::Uuid::new_v4().to_string();
        assert!(validate_token(&token).is_ok());
    }

    #[test]
    fn does_not_constrain_version_nibble() {
        assert!(validate_token("00000000-0000-0000-0000-000000000000").is_ok());
        assert!(validate_token("ffffffff-ffff-ffff-ffff-ffffffffffff").is_ok());
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(validate_token(""), Err(InvalidTokenError));
    }

    #[test]
    fn rejects_braced_token() {
        assert!(validate_token("{abcdef01-1234-4abc-9def-0123456789ab}").is_err());
    }

    #[test]
    fn rejects_surrounding_whitespace() {
        assert!(validate_token(" abcdef01-1234-4abc-9def-0123456789ab").is_err());
        assert!(validate_token("abcdef01-1234-4abc-9def-0123456789ab\n").is_err());
    }

    #[test]
    fn rejects_compact_form() {
        assert!(validate_token("abcdef0112344abc9def0123456789ab").is_err());
    }

    #[test]
    fn rejects_non_hex_characters() {
        assert!(validate_token("abcdef0g-1234-4abc-9def-0123456789ab").is_err());
        assert!(validate_token("s.abcdef1234-4abc-9def-0123456789ab").is_err());
    }

    #[test]
    fn rejects_shifted_groups() {
        // Right length, wrong grouping.
        assert!(validate_token("abcdef011-234-4abc-9def-0123456789ab").is_err());
        assert!(validate_token("abcdef01-1234-4abc-9def0-123456789ab").is_err());
    }

    #[test]
    fn rejects_extra_group() {
        assert!(validate_token("abcdef01-1234-4abc-9def-01234-6789ab").is_err());
    }

    #[test]
    fn parse_keeps_raw_value() {
        let token = AccessToken::parse("abcdef01-1234-4abc-9def-0123456789ab").unwrap();
        assert_eq!(token.expose(), "abcdef01-1234-4abc-9def-0123456789ab");
    }

    #[test]
    fn debug_and_display_are_redacted() {
        let token = AccessToken::parse("abcdef01-1234-4abc-9def-0123456789ab").unwrap();
        assert_eq!(format!("{token:?}"), "AccessToken(abcdef01-****)");
        assert_eq!(token.to_string(), "abcdef01-****");
    }

    proptest! {
        #[test]
        fn accepts_every_well_formed_token(
            token in "[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}"
        ) {
            prop_assert!(validate_token(&token).is_ok());
        }

        #[test]
        fn rejects_anything_without_hyphens(token in "[^-]{0,48}") {
            prop_assert!(validate_token(&token).is_err());
        }

        #[test]
        fn rejects_wrong_group_lengths(
            a in "[0-9a-f]{1,12}",
            b in "[0-9a-f]{1,12}",
        ) {
            let token = format!("{a}-{b}-4abc-9def-0123456789ab");
            prop_assume!(a.len() != 8 || b.len() != 4);
            prop_assert!(validate_token(&token).is_err());
        }
    }
}
