// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Phone normalization into canonical E.164 subscriber identifiers.

/// Country prefix applied to national numbers when none is configured.
pub const DEFAULT_COUNTRY_CODE: &str = "91";

/// Shortest digit string accepted after normalization.
const MIN_DIGITS: usize = 10;

/// Normalize a raw phone number using the default country prefix.
///
/// Returns `None` when the input cannot form a valid identifier.
pub fn normalize_phone(raw: &str) -> Option<String> {
    normalize_phone_with_country(raw, DEFAULT_COUNTRY_CODE)
}

/// Normalize a raw phone number into `"+" + digits`.
///
/// Rules, applied in order: strip every non-digit; replace a leading `0`
/// with the country prefix; prepend the prefix to a 10-digit result;
/// reject anything shorter than 10 digits.
pub fn normalize_phone_with_country(raw: &str, country_code: &str) -> Option<String> {
    let mut digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    if let Some(rest) = digits.strip_prefix('0') {
        digits = format!("{country_code}{rest}");
    }

    if digits.len() == 10 {
        digits = format!("{country_code}{digits}");
    }

    if digits.len() < MIN_DIGITS {
        return None;
    }

    Some(format!("+{digits}"))
}

/// Recipient form expected by the gateway: the canonical phone without `+`.
pub fn recipient_digits(phone: &str) -> &str {
    phone.strip_prefix('+').unwrap_or(phone)
}
