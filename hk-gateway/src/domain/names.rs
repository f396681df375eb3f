//! Stop name normalisation.

use std::sync::LazyLock;

use regex::Regex;

/// Trailing parenthetical, e.g. `"彩虹站 (CH123)"` -> `"彩虹站"`.
static PARENTHETICAL_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(.*\)\s*$").expect("static regex is valid"));

/// Remove a trailing parenthetical suffix without trimming the rest.
///
/// The match starts at the first `(` that is followed by a `)` at the end
/// of the string, so `"A (x) B (y)"` becomes `"A"`.
pub fn strip_parenthetical(name: &str) -> &str {
    match PARENTHETICAL_SUFFIX.find(name) {
        Some(m) => &name[..m.start()],
        None => name,
    }
}

/// Display form of a stop name: suffix stripped and surrounding
/// whitespace trimmed.
pub fn display_name(name: &str) -> &str {
    strip_parenthetical(name).trim()
}
