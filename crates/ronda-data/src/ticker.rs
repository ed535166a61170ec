//! Ticker normalisation for the quote provider.

/// Normalise an index ticker to the symbol format Yahoo Finance expects.
///
/// Uppercases, strips whitespace, and turns a share-class dot (`BRK.B`) into a
/// dash (`BRK-B`). Only a dot followed by a trailing alphanumeric suffix is
/// rewritten.
pub fn normalize_ticker(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();

    match cleaned.rsplit_once('.') {
        Some((base, suffix))
            if !base.is_empty()
                && !suffix.is_empty()
                && suffix.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            format!("{base}-{suffix}")
        }
        _ => cleaned,
    }
}
