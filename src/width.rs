//! Terminal display width helpers.
//!
//! Card labels may carry ANSI styling; padding is computed on what the
//! terminal actually shows.

use unicode_width::UnicodeWidthStr;

/// Display width of `text` after stripping ANSI escapes.
pub fn display_width(text: &str) -> usize {
    let clean = strip_ansi_escapes::strip(text);
    let clean_str = String::from_utf8_lossy(&clean);
    UnicodeWidthStr::width(&*clean_str)
}

/// Cut `text` to at most `max` columns, then pad with spaces to exactly `max`.
pub fn fit_to_width(text: &str, max: usize) -> String {
    let clean = strip_ansi_escapes::strip(text);
    let clean_str = String::from_utf8_lossy(&clean);
    let mut out = String::with_capacity(max);
    let mut used = 0;
    for ch in clean_str.chars() {
        let w = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w > max {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.extend(std::iter::repeat_n(' ', max - used));
    out
}
