//! Lexical analyzer of the MSD format.
//!
//! Raw text == [`lex_msd`] ==> [`Token`] stream == [`crate::parse`] ==>
//! [`crate::MsdParameter`] stream
//!
//! The lexer reads its input in fixed-size chunks for throughput, but only
//! attempts a match once its buffer holds a line terminator or the remainder
//! of the whole input. Comments and the missing-semicolon recovery rule are
//! both line-scoped, so this guarantees neither ever evaluates against a
//! truncated line.
//!
//! The lexer has no notion of a "parameter" record; it only tracks whether
//! the scan position is between a `#` and its matching `;` to classify the
//! metacharacters. It cannot fail on any input: the pattern set is total
//! over the character set, and the only error the token stream can carry is
//! an [`std::io::Error`] from the underlying reader (including invalid
//! UTF-8, surfaced as [`std::io::ErrorKind::InvalidData`]).

mod matcher;
pub mod token;

use std::{
    collections::VecDeque,
    io::{self, Read},
    mem,
};

use self::matcher::{RawMatch, match_front};
pub use self::token::Token;

/// How many bytes to request from the reader at a time.
const CHUNK_SIZE: usize = 4096;

/// Tokenizes an in-memory MSD document.
///
/// Most modern applications of MSD (like the SM and SSC formats) treat
/// backslashes as escape characters, but some older ones (like DWI) don't.
/// Set `escapes` to `false` to treat backslashes as regular text.
pub fn lex_msd(source: &str, escapes: bool) -> MsdLexer<&[u8]> {
    MsdLexer::new(source.as_bytes(), escapes)
}

/// Tokenizes MSD data from a caller-owned reader.
///
/// The reader is never opened, closed or seeked by this crate, and is only
/// read when the caller pulls the next token. The bytes must be UTF-8.
pub fn lex_msd_reader<R: Read>(reader: R, escapes: bool) -> MsdLexer<R> {
    MsdLexer::new(reader, escapes)
}

/// A pull-based MSD tokenizer over a byte reader.
///
/// Yields `io::Result<Token>`; see [`Token`] for the guarantees the token
/// stream upholds. Construct it with [`lex_msd`] or [`lex_msd_reader`].
#[derive(Debug)]
pub struct MsdLexer<R> {
    reader: R,
    escapes: bool,
    /// Bytes of an incomplete UTF-8 sequence cut off by a chunk boundary.
    carry: Vec<u8>,
    /// Decoded text that has been read but not yet consumed by a match.
    buffer: String,
    /// Literal text accumulated so that `Text` tokens stay maximal.
    text_buffer: String,
    /// Tokens produced but not yet pulled (recovery emits up to three).
    pending: VecDeque<Token>,
    inside_parameter: bool,
    done_reading: bool,
}

impl<R: Read> MsdLexer<R> {
    /// Creates a lexer over `reader`. See [`lex_msd`] for the `escapes` flag.
    pub fn new(reader: R, escapes: bool) -> Self {
        Self {
            reader,
            escapes,
            carry: Vec::new(),
            buffer: String::new(),
            text_buffer: String::new(),
            pending: VecDeque::new(),
            inside_parameter: false,
            done_reading: false,
        }
    }

    /// Whether the buffer is safe to match against: it holds a full line
    /// terminator, or it is known to be the rest of the input.
    fn buffer_lexable(&self) -> bool {
        self.buffer.contains('\n')
            || self.buffer.contains('\r')
            || (self.done_reading && !self.buffer.is_empty())
    }

    /// Reads one chunk from the reader into the buffer, decoding UTF-8 and
    /// carrying an incomplete trailing sequence over to the next chunk.
    fn fill_buffer(&mut self) -> io::Result<()> {
        let mut chunk = [0_u8; CHUNK_SIZE];
        let read = self.reader.read(&mut chunk)?;
        if read == 0 {
            self.done_reading = true;
            if !self.carry.is_empty() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "incomplete UTF-8 sequence at end of input",
                ));
            }
            return Ok(());
        }
        self.carry.extend_from_slice(&chunk[..read]);
        let bytes = mem::take(&mut self.carry);
        match str::from_utf8(&bytes) {
            Ok(decoded) => self.buffer.push_str(decoded),
            Err(err) if err.error_len().is_some() => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "input is not valid UTF-8",
                ));
            }
            Err(err) => {
                let (decoded, tail) = bytes.split_at(err.valid_up_to());
                // `valid_up_to` guarantees this slice decodes.
                self.buffer.push_str(str::from_utf8(decoded).unwrap_or_default());
                self.carry = tail.to_vec();
            }
        }
        Ok(())
    }

    /// Moves the accumulated literal text into the pending queue.
    fn flush_text(&mut self) {
        if !self.text_buffer.is_empty() {
            let text = mem::take(&mut self.text_buffer);
            self.pending.push_back(Token::Text(text));
        }
    }

    /// Consumes one match from the front of the buffer. May queue zero
    /// tokens (text keeps accumulating) or several (terminator recovery).
    fn scan_one(&mut self) {
        let (kind, len) = match_front(&self.buffer, self.escapes);
        match kind {
            RawMatch::Text => {
                self.text_buffer.extend(self.buffer.drain(..len));
            }
            RawMatch::Pound => {
                self.buffer.drain(..len);
                if self.inside_parameter {
                    self.recover_or_literal_pound();
                } else {
                    self.flush_text();
                    self.pending.push_back(Token::StartParameter('#'));
                    self.inside_parameter = true;
                }
            }
            RawMatch::Colon => {
                self.buffer.drain(..len);
                if self.inside_parameter {
                    self.flush_text();
                    self.pending.push_back(Token::NextComponent(':'));
                } else {
                    self.text_buffer.push(':');
                }
            }
            RawMatch::Semicolon => {
                self.buffer.drain(..len);
                if self.inside_parameter {
                    self.flush_text();
                    self.pending.push_back(Token::EndParameter(";".into()));
                    self.inside_parameter = false;
                } else {
                    self.text_buffer.push(';');
                }
            }
            RawMatch::Escape => {
                let escape: String = self.buffer.drain(..len).collect();
                if self.inside_parameter {
                    self.flush_text();
                    self.pending.push_back(Token::Escape(escape));
                } else {
                    self.text_buffer.push_str(&escape);
                }
            }
            RawMatch::Comment => {
                let comment: String = self.buffer.drain(..len).collect();
                self.flush_text();
                self.pending.push_back(Token::Comment(comment));
            }
        }
    }

    /// A `#` was matched while inside a parameter. If the pending text ends
    /// in a line break followed only by horizontal whitespace, the parameter
    /// is missing its `;`: the trailing whitespace span becomes the
    /// terminator and the `#` starts a fresh parameter. Otherwise the `#` is
    /// literal text — a mid-line `#` never closes a parameter.
    fn recover_or_literal_pound(&mut self) {
        match recovery_split(&self.text_buffer) {
            Some(split_at) => {
                let terminator = self.text_buffer.split_off(split_at);
                self.flush_text();
                self.pending.push_back(Token::EndParameter(terminator));
                self.pending.push_back(Token::StartParameter('#'));
            }
            None => self.text_buffer.push('#'),
        }
    }
}

/// Returns the byte index where the trailing whitespace/line-break span of
/// `text` begins, if everything after the last line break is horizontal
/// whitespace. `None` when there is no line break or the line is not blank.
fn recovery_split(text: &str) -> Option<usize> {
    let last_break = text.rfind(['\r', '\n'])?;
    let (_, tail) = text.split_at(last_break + 1);
    tail.bytes()
        .all(|b| b == b' ' || b == b'\t')
        .then(|| text.trim_end_matches([' ', '\t', '\r', '\n']).len())
}

impl<R: Read> Iterator for MsdLexer<R> {
    type Item = io::Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Some(Ok(token));
            }
            if self.buffer_lexable() {
                self.scan_one();
                continue;
            }
            if self.done_reading {
                if self.text_buffer.is_empty() {
                    return None;
                }
                let text = mem::take(&mut self.text_buffer);
                return Some(Ok(Token::Text(text)));
            }
            if let Err(err) = self.fill_buffer() {
                return Some(Err(err));
            }
        }
    }
}
