//! String-splitting helper used to tokenize service argstrings.

/// Splits `input` on the first occurrence of `sep`, returning the whole
/// string as the first element and an empty second element if `sep`
/// never occurs.
#[must_use]
pub fn split_first(input: &str, sep: char) -> (&str, &str) {
    input.split_once(sep).unwrap_or((input, ""))
}
