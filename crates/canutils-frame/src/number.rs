//! C-style unsigned integer literals.
//!
//! Identifiers, masks and payload bytes on the command line follow the
//! `strtoul(..., 0)` convention: `0x`/`0X` selects hex, a leading `0`
//! selects octal, anything else is decimal. Filter fields are the
//! exception: they are always hexadecimal.

/// Parse a C-style unsigned literal into a `u32`.
///
/// Returns `None` for empty input, stray characters or overflow.
pub fn parse_c_ulong(input: &str) -> Option<u32> {
    let input = input.trim();
    let (digits, radix) = if let Some(hex) = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        (hex, 16)
    } else if input.len() > 1 && input.starts_with('0') {
        (&input[1..], 8)
    } else {
        (input, 10)
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    u32::from_str_radix(digits, radix).ok()
}

/// Parse a hexadecimal `u32`, with or without a `0x`/`0X` prefix.
pub fn parse_hex_u32(input: &str) -> Option<u32> {
    let input = input.trim();
    let digits = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}
