//! Blind digit scrape of peer address text.
//!
//! The address is never parsed structurally. Every maximal run of ASCII
//! decimal digits becomes one token; tokens that do not fit an `i32` are
//! dropped without error.

/// Iterate over the maximal digit runs of `text`, left to right.
fn digit_runs(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_ascii_digit())
        .filter(|run| !run.is_empty())
}

/// Parse one digit run, swallowing overflow.
fn parse_token(run: &str) -> Option<i64> {
    run.parse::<i32>().ok().map(i64::from)
}

/// Extract every digit run of `address` that fits a 32-bit signed integer,
/// in order of appearance.
///
/// ```
/// use pingseed_core::extract_digits;
///
/// assert_eq!(extract_digits("127.0.0.1"), vec![127, 0, 0, 1]);
/// assert_eq!(extract_digits("fe80::1%2"), vec![80, 1, 2]);
/// assert!(extract_digits("::").is_empty());
/// ```
pub fn extract_digits(address: &str) -> Vec<i64> {
    digit_runs(address).filter_map(parse_token).collect()
}
