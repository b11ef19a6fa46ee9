//! Definitions of the lexical tokens of the MSD format.

use std::fmt;

/// A lexical token of an MSD document.
///
/// Tokens always follow these constraints:
///
/// - [`Token::StartParameter`], [`Token::NextComponent`] and
///   [`Token::EndParameter`] represent *semantically meaningful* instances of
///   their metacharacters (`#`, `:`, `;`), never escaped or out-of-context
///   ones.
/// - Occurrences of [`Token::StartParameter`] and [`Token::EndParameter`]
///   perfectly alternate. When a semicolon was missing, the
///   [`Token::EndParameter`] holds the line break (and surrounding
///   whitespace) used to recover instead.
/// - [`Token::Text`] is maximal: two text tokens are never adjacent.
/// - Concatenating the literal text of every token, in order, reproduces the
///   original input. [`Token`]'s [`fmt::Display`] writes that literal text.
///
/// A component is often split over several [`Token::Text`] fragments with
/// [`Token::Escape`] and [`Token::Comment`] tokens interspersed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Token {
    /// A literal text fragment. Anything not matched by the tokens below.
    Text(String),
    /// A `#` starting a parameter.
    StartParameter(char),
    /// A `:` separating two components inside a parameter.
    NextComponent(char),
    /// A `;` ending a parameter, or the whitespace span (containing at least
    /// one line break) that ended it when the semicolon was missing.
    EndParameter(String),
    /// A `\` followed by (and including) the escaped character.
    Escape(String),
    /// A `//` followed by (and including) the comment text, excluding the
    /// line terminator.
    Comment(String),
}

impl Token {
    /// Returns the escaped character of a [`Token::Escape`], `None` for any
    /// other variant.
    #[must_use]
    pub fn escaped_char(&self) -> Option<char> {
        match self {
            Self::Escape(text) => text.chars().nth(1),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    /// Writes the literal source text of the token.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) | Self::EndParameter(text) | Self::Escape(text)
            | Self::Comment(text) => f.write_str(text),
            Self::StartParameter(ch) | Self::NextComponent(ch) => {
                fmt::Write::write_char(f, *ch)
            }
        }
    }
}
