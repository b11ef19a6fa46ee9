//! Parsing [`MsdParameter`]s from the [`crate::lex`] token stream.
//!
//! The parser is a pull-based iterator: it drives the lexer one token at a
//! time, and the caller drives the parser one parameter at a time. Nothing
//! is computed until the next parameter is requested.
//!
//! A parameter is buffered until the `#` of the next one (or end of input)
//! so that the text between parameters can be captured as its suffix; the
//! suffix, together with the preamble, comments and escape positions, is
//! what makes exact re-serialization possible.
//!
//! By default the parser is lenient: stray text between parameters and
//! missing semicolons are absorbed into the surrounding parameter's
//! metadata. With [`ParseOptions::strict`] both conditions become
//! [`ParseError`]s that reference the last successfully completed key.

use std::{
    fmt,
    io::{self, Read},
    mem,
};

use thiserror::Error;

use crate::{
    lex::{MsdLexer, Token, lex_msd, lex_msd_reader},
    param::MsdParameter,
};

/// The byte order mark, special-cased as whitespace by the stray-text check
/// to simplify handling UTF-8 files with a leading BOM.
const BOM: char = '\u{feff}';

/// Where stray text was encountered, for error messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StrayTextLocation {
    /// Before any parameter completed.
    StartOfDocument,
    /// After the parameter with this key.
    AfterParameter(String),
}

impl fmt::Display for StrayTextLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StartOfDocument => f.write_str("at start of document"),
            Self::AfterParameter(key) => write!(f, "after {key:?} parameter"),
        }
    }
}

/// An error occurred when parsing the token stream.
///
/// The format-level variants only fire in strict mode; lenient parsing
/// absorbs both conditions into parameter metadata instead.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ParseError {
    /// Non-whitespace, non-BOM text found outside any parameter.
    #[error("stray {ch:?} encountered {location}")]
    StrayText {
        /// The first offending character.
        ch: char,
        /// Where in the document the text appeared.
        location: StrayTextLocation,
    },
    /// A parameter was closed by the line-break recovery heuristic rather
    /// than an explicit `;`.
    #[error("parameter {key:?} terminated by a line break instead of `;`")]
    MissingTerminator {
        /// The key of the unterminated parameter.
        key: String,
    },
    /// The underlying reader failed, or its bytes were not valid UTF-8.
    #[error("failed to read the input")]
    Io(#[from] io::Error),
}

/// Configuration of [`parse_msd`] and friends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParseOptions {
    /// Treat `\` as an escape character. Most modern applications of MSD
    /// (like the SM and SSC formats) do; some older ones (like DWI) treat
    /// backslashes as regular text, so set this to `false` for them.
    /// Defaults to `true`.
    pub escapes: bool,
    /// Surface stray text and missing semicolons as [`ParseError`]s instead
    /// of silently absorbing them. Defaults to `false`.
    pub strict: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            escapes: true,
            strict: false,
        }
    }
}

/// Parses an in-memory MSD document into a stream of parameters.
pub fn parse_msd(source: &str, options: ParseOptions) -> MsdParser<MsdLexer<&[u8]>> {
    MsdParser::new(lex_msd(source, options.escapes), options)
}

/// Parses MSD data from a caller-owned reader into a stream of parameters.
/// The reader is only read when the caller pulls the next parameter.
pub fn parse_msd_reader<R: Read>(reader: R, options: ParseOptions) -> MsdParser<MsdLexer<R>> {
    MsdParser::new(lex_msd_reader(reader, options.escapes), options)
}

/// Parses a pre-tokenized stream, for callers supplying their own lexer
/// output. The tokens must uphold the guarantees documented on [`Token`].
pub fn parse_msd_tokens<I>(
    tokens: I,
    options: ParseOptions,
) -> MsdParser<impl Iterator<Item = io::Result<Token>>>
where
    I: IntoIterator<Item = Token>,
{
    MsdParser::new(tokens.into_iter().map(Ok), options)
}

/// Per-document parser state, owned by the parse call and threaded through
/// the token-consumption steps. Line and character counters are relative to
/// the current parameter's opening `#` (the `#` itself is character 0 on
/// line 0).
#[derive(Debug)]
struct ParserContext {
    escapes: bool,
    /// Components of the in-progress parameter; empty between parameters.
    components: Vec<String>,
    inside_parameter: bool,
    line: usize,
    offset: usize,
    comments: Vec<(usize, String)>,
    escape_positions: Vec<usize>,
    /// `Some` until the first parameter is emitted, then `None` forever.
    preamble: Option<String>,
    suffix: String,
    /// Key of the most recently completed parameter, for diagnostics.
    last_key: Option<String>,
}

impl ParserContext {
    fn new(escapes: bool) -> Self {
        Self {
            escapes,
            components: Vec::new(),
            inside_parameter: false,
            line: 0,
            offset: 1,
            comments: Vec::new(),
            escape_positions: Vec::new(),
            preamble: Some(String::new()),
            suffix: String::new(),
            last_key: None,
        }
    }

    /// Appends literal text to the current component, or absorbs it into the
    /// preamble/suffix when outside a parameter (raising in strict mode if
    /// it is anything but whitespace or a BOM).
    fn push_text(&mut self, text: &str, strict: bool) -> Result<(), ParseError> {
        if self.inside_parameter {
            self.line += text.matches('\n').count();
            self.offset += text.chars().count();
            if let Some(component) = self.components.last_mut() {
                component.push_str(text);
            }
            return Ok(());
        }
        if strict
            && let Some(ch) = text.chars().find(|&ch| !ch.is_whitespace() && ch != BOM)
        {
            return Err(ParseError::StrayText {
                ch,
                location: self.stray_location(),
            });
        }
        self.absorb(text);
        Ok(())
    }

    /// Records an escape position and appends the escaped character (not the
    /// backslash) to the current component.
    fn push_escape(&mut self, escape: &str, strict: bool) -> Result<(), ParseError> {
        if !self.inside_parameter {
            // The lexer never produces an escape outside a parameter; a
            // pre-tokenized stream might, and it goes the way of any text.
            return self.push_text(escape, strict);
        }
        if self.escapes {
            self.escape_positions.push(self.offset);
        }
        self.line += escape.matches('\n').count();
        self.offset += escape.chars().count();
        let mut chars = escape.chars();
        chars.next();
        if let (Some(escaped), Some(component)) = (chars.next(), self.components.last_mut()) {
            component.push(escaped);
        }
        Ok(())
    }

    /// Records a comment against the current line, or absorbs it into the
    /// preamble/suffix. Comments are never stray.
    fn push_comment(&mut self, comment: String) {
        if self.inside_parameter {
            self.offset += comment.chars().count();
            self.comments.push((self.line, comment));
        } else {
            self.absorb(&comment);
        }
    }

    /// Text outside any parameter belongs to the document preamble until the
    /// first parameter is buffered, and to the previous parameter's suffix
    /// after that.
    fn absorb(&mut self, text: &str) {
        if self.components.is_empty()
            && let Some(preamble) = &mut self.preamble
        {
            preamble.push_str(text);
        } else {
            self.suffix.push_str(text);
        }
    }

    fn begin_parameter(&mut self) {
        self.inside_parameter = true;
        self.line = 0;
        self.offset = 1;
        self.components.push(String::new());
    }

    fn begin_component(&mut self) {
        debug_assert!(self.inside_parameter, "`:` outside a parameter is text");
        if self.inside_parameter {
            self.offset += 1;
            self.components.push(String::new());
        }
    }

    /// Stops accepting component text; the terminator itself becomes the
    /// start of the suffix.
    fn close_parameter(&mut self, terminator: &str) {
        debug_assert!(self.inside_parameter, "`;` outside a parameter is text");
        self.inside_parameter = false;
        self.last_key = self.components.first().cloned();
        self.suffix.push_str(terminator);
    }

    /// Forms the buffered components into a parameter and resets the
    /// per-parameter state. Returns `None` when nothing is buffered.
    fn take_parameter(&mut self) -> Option<MsdParameter> {
        if self.components.is_empty() {
            return None;
        }
        self.inside_parameter = false;
        Some(MsdParameter {
            components: mem::take(&mut self.components),
            preamble: self.preamble.take(),
            comments: mem::take(&mut self.comments),
            escape_positions: self.escapes.then(|| mem::take(&mut self.escape_positions)),
            suffix: mem::take(&mut self.suffix),
        })
    }

    fn stray_location(&self) -> StrayTextLocation {
        match &self.last_key {
            Some(key) => StrayTextLocation::AfterParameter(key.clone()),
            None => StrayTextLocation::StartOfDocument,
        }
    }
}

/// A pull-based MSD parser over a token stream.
///
/// Yields `Result<MsdParameter, ParseError>`. Construct it with
/// [`parse_msd`], [`parse_msd_reader`] or [`parse_msd_tokens`]. After an
/// error is yielded the iterator is fused; the document state at that point
/// is not recoverable.
#[derive(Debug)]
pub struct MsdParser<I> {
    tokens: I,
    strict: bool,
    context: ParserContext,
    /// An error to yield on the next pull, after a completed parameter has
    /// been handed out first.
    queued_error: Option<ParseError>,
    finished: bool,
}

impl<I> MsdParser<I>
where
    I: Iterator<Item = io::Result<Token>>,
{
    /// Creates a parser over any token stream.
    pub fn new(tokens: I, options: ParseOptions) -> Self {
        Self {
            tokens,
            strict: options.strict,
            context: ParserContext::new(options.escapes),
            queued_error: None,
            finished: false,
        }
    }

    /// Applies one token to the context. `Ok(Some(_))` hands a completed
    /// parameter back to the iterator.
    fn consume(&mut self, token: Token) -> Result<Option<MsdParameter>, ParseError> {
        match token {
            Token::Text(text) => {
                self.context.push_text(&text, self.strict)?;
                Ok(None)
            }
            Token::StartParameter(_) => {
                let completed = self.context.take_parameter();
                self.context.begin_parameter();
                Ok(completed)
            }
            Token::NextComponent(_) => {
                self.context.begin_component();
                Ok(None)
            }
            Token::EndParameter(terminator) => {
                self.context.close_parameter(&terminator);
                if self.strict && terminator != ";" {
                    return Err(ParseError::MissingTerminator {
                        key: self.context.last_key.clone().unwrap_or_default(),
                    });
                }
                Ok(None)
            }
            Token::Escape(escape) => {
                self.context.push_escape(&escape, self.strict)?;
                Ok(None)
            }
            Token::Comment(comment) => {
                self.context.push_comment(comment);
                Ok(None)
            }
        }
    }
}

impl<I> Iterator for MsdParser<I>
where
    I: Iterator<Item = io::Result<Token>>,
{
    type Item = Result<MsdParameter, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.queued_error.take() {
            self.finished = true;
            return Some(Err(err));
        }
        if self.finished {
            return None;
        }
        loop {
            let Some(token) = self.tokens.next() else {
                self.finished = true;
                return self.context.take_parameter().map(Ok);
            };
            let token = match token {
                Ok(token) => token,
                Err(err) => {
                    self.finished = true;
                    return Some(Err(err.into()));
                }
            };
            match self.consume(token) {
                Ok(None) => {}
                Ok(Some(parameter)) => return Some(Ok(parameter)),
                // A parameter completed before the offending token is still
                // handed out; the error follows on the next pull.
                Err(err) => match self.context.take_parameter() {
                    Some(parameter) => {
                        self.queued_error = Some(err);
                        return Some(Ok(parameter));
                    }
                    None => {
                        self.finished = true;
                        return Some(Err(err));
                    }
                },
            }
        }
    }
}
