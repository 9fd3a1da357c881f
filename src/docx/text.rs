/// Clean run text as extracted from `w:t`.
///
/// Typographic spaces become plain spaces, invisible characters are dropped,
/// and control characters other than tab, newline and carriage return are
/// removed. Whitespace is otherwise preserved.
pub(super) fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{00a0}' | '\u{2007}' | '\u{2008}' | '\u{2009}' => out.push(' '),
            '\u{200b}' | '\u{200c}' | '\u{200d}' | '\u{feff}' | '\u{00ad}' => {}
            '\u{2011}' => out.push('-'),
            '\t' | '\n' | '\r' => out.push(c),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}
