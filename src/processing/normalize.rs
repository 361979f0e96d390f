//! Whitespace cleanup for extracted document text.

/// Collapse every run of two or more space characters into a single space.
///
/// Only U+0020 is affected; newlines, tabs, and other whitespace pass through untouched. The
/// input is scanned once and copied into a fresh buffer, so runtime is linear in the input
/// length no matter how many runs it contains. Normalizing already-normalized text returns it
/// unchanged.
pub fn collapse_spaces(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut previous_was_space = false;

    for ch in text.chars() {
        if ch == ' ' {
            if previous_was_space {
                continue;
            }
            previous_was_space = true;
        } else {
            previous_was_space = false;
        }
        output.push(ch);
    }

    output
}
