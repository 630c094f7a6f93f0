//! Payee normalization

/// Fold a full-width character to its half-width ASCII equivalent
fn to_half_width(c: char) -> char {
    match c {
        '\u{3000}' => ' ',
        '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
        _ => c,
    }
}

/// Normalize a payee for the ledger.
///
/// Full-width ASCII (as printed on Japanese receipts) becomes half-width,
/// whitespace runs collapse to a single space and the result is trimmed.
pub fn sanitize_payee(name: &str) -> String {
    name.chars()
        .map(to_half_width)
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
