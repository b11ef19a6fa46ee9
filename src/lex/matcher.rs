//! Priority-ordered pattern matching over the front of the lexer buffer.
//!
//! The pattern set is total: every non-empty buffer matches exactly one
//! pattern, so the lexer can never fail on any input.

/// The lexical pattern that matched at the front of the buffer.
///
/// How a match maps to a [`super::Token`] depends on whether the lexer is
/// currently inside a parameter; that classification lives in the lexer
/// loop, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum RawMatch {
    /// A run of ordinary text, a bare `/`, or a trailing `\` at end of input.
    Text,
    /// A single `#`.
    Pound,
    /// A single `:`.
    Colon,
    /// A single `;`.
    Semicolon,
    /// A `\` plus the one following character.
    Escape,
    /// `//` up to (excluding) the line terminator.
    Comment,
}

/// Matches the front of `buffer`, returning the winning pattern and the byte
/// length of the matched text. `buffer` must be non-empty, and must either
/// contain a line terminator or be the remainder of the whole input, so that
/// comments and escapes cannot be truncated mid-line.
pub(super) fn match_front(buffer: &str, escapes: bool) -> (RawMatch, usize) {
    let mut chars = buffer.chars();
    let Some(first) = chars.next() else {
        return (RawMatch::Text, 0);
    };
    match first {
        '#' => (RawMatch::Pound, 1),
        ':' => (RawMatch::Colon, 1),
        ';' => (RawMatch::Semicolon, 1),
        '\\' if escapes => match chars.next() {
            Some(escaped) => (RawMatch::Escape, 1 + escaped.len_utf8()),
            // A backslash at end of input escapes nothing; lex it as
            // literal text so every input tokenizes.
            None => (RawMatch::Text, 1),
        },
        '/' if buffer.starts_with("//") => {
            let len = buffer.find(['\r', '\n']).unwrap_or(buffer.len());
            (RawMatch::Comment, len)
        }
        '/' => (RawMatch::Text, 1),
        _ => {
            let len = if escapes {
                buffer.find(['\\', '/', ':', ';', '#'])
            } else {
                buffer.find(['/', ':', ';', '#'])
            }
            .unwrap_or(buffer.len());
            (RawMatch::Text, len)
        }
    }
}
