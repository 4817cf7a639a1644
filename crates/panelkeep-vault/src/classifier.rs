// SPDX-FileCopyrightText: 2026 Panelkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Heuristic ciphertext classifier.
//!
//! Legacy rows may hold unencrypted logins, MAC addresses or phone numbers.
//! [`classify`] is the single predicate every vault component uses to decide
//! whether a stored value should be handed to the decrypt provider.

/// Values shorter than this are never treated as ciphertext.
pub const MIN_CIPHERTEXT_LEN: usize = 20;

/// Returns `true` when `value` looks like base64 ciphertext.
///
/// Rules, first match wins:
/// 1. fewer than 20 characters: plaintext;
/// 2. any character outside `[A-Za-z0-9+/=]`: plaintext;
/// 3. no ASCII letter at all: plaintext;
/// 4. ciphertext iff it mixes upper and lower case, ends with `=`, or contains `+` or `/`.
pub fn classify(value: &str) -> bool {
    if value.len() < MIN_CIPHERTEXT_LEN {
        return false;
    }

    let mut has_upper = false;
    let mut has_lower = false;
    let mut has_symbol = false;
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' => has_upper = true,
            b'a'..=b'z' => has_lower = true,
            b'0'..=b'9' | b'=' => {}
            b'+' | b'/' => has_symbol = true,
            _ => return false,
        }
    }

    if !has_upper && !has_lower {
        return false;
    }

    (has_upper && has_lower) || value.ends_with('=') || has_symbol
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn mixed_case_base64_is_ciphertext() {
        assert!(classify("QWxhZGRpbjpvcGVuc2VzYW1l"));
    }

    #[test]
    fn numeric_phone_is_plaintext() {
        assert!(!classify("5531999998888"));
    }

    #[test]
    fn uppercase_mac_is_plaintext() {
        assert!(!classify("001A2B3C4D5E"));
        // Long enough, but still single-case hex with no padding or symbols.
        assert!(!classify("001A2B3C4D5E6F7A8B9C0D"));
    }

    #[test]
    fn padding_or_symbols_mark_single_case_values() {
        assert!(classify("abcdefghijklmnopqrs="));
        assert!(classify("abcdefghij+klmnopqrs"));
        assert!(classify("ABCDEFGHIJ/KLMNOPQRS"));
        assert!(!classify("abcdefghijklmnopqrst"));
    }

    #[test]
    fn non_base64_characters_are_plaintext() {
        assert!(!classify("user.name@example.com.br"));
        assert!(!classify("Mixed Case With Spaces Here"));
        assert!(!classify("ÁÉÍÓÚáéíóúÁÉÍÓÚáéíóú"));
    }

    #[test]
    fn long_digits_with_padding_are_plaintext() {
        assert!(!classify("12345678901234567890=="));
    }

    #[test]
    fn empty_string_is_plaintext() {
        assert!(!classify(""));
    }

    proptest! {
        #[test]
        fn short_values_are_never_ciphertext(value in "[ -~]{0,19}") {
            prop_assert!(!classify(&value));
        }

        #[test]
        fn numeric_values_are_never_ciphertext(value in "[0-9]{0,64}") {
            prop_assert!(!classify(&value));
        }

        #[test]
        fn lowercase_logins_are_never_ciphertext(value in "[a-z0-9._@-]{1,64}") {
            prop_assert!(!classify(&value));
        }
    }
}
