//! Shared proptest strategies for unit tests.

use proptest::prelude::*;

/// Printable, non-blank text no longer than `max_len` bytes.
pub fn arb_valid_text(max_len: usize) -> impl Strategy<Value = String> {
    let upper = max_len.clamp(1, 64);
    prop::string::string_regex(&format!("[A-Za-z0-9_@.-][A-Za-z0-9_@. -]{{0,{}}}", upper - 1))
        .expect("valid regex")
}

/// Text carrying at least one control character.
pub fn arb_control_text() -> impl Strategy<Value = String> {
    (
        "[A-Za-z0-9]{0,8}",
        prop::sample::select(vec!['\n', '\r', '\t', '\0', '\u{7f}', '\u{1b}']),
        "[A-Za-z0-9]{0,8}",
    )
        .prop_map(|(head, c, tail)| format!("{}{}{}", head, c, tail))
}
