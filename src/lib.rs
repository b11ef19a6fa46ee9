//! The parser library of MSD, the `#key:value;` text micro-format shared by
//! rhythm-game file formats (SM, SSC, DWI and friends).
//!
//! This crate consists of two phases: lexical analyzing and token parsing.
//!
//! Raw text == [`lex`] ==> token stream == [`parse`] ==> [`MsdParameter`] stream
//!
//! The [`lex`] module tokenizes a document into [`lex::Token`]s. It reads its
//! input in fixed-size chunks rather than line by line, but never splits a
//! multi-character lexical unit (an escape, a comment, the missing-semicolon
//! recovery span) across a chunk boundary. Concatenating the text of every
//! token reproduces the input exactly.
//!
//! The [`parse`] module assembles tokens into [`MsdParameter`] records. Each
//! parameter keeps enough reverse-mapping metadata (preamble, comments,
//! escape positions, suffix) for the [`param`] module to re-serialize the
//! original document byte for byte, in addition to the usual normalized form.
//!
//! In detail, our policies are:
//!
//! - Support only UTF-8. A reader handing us anything else surfaces
//!   [`std::io::ErrorKind::InvalidData`]; encoding detection belongs to the
//!   caller.
//! - Do not interpret keys or values. Schema semantics belong to the simfile
//!   parsers built on top of this crate.
//! - Tolerate malformed input by default: stray text and missing semicolons
//!   are absorbed into parameter metadata instead of failing. Opt into
//!   strict mode with [`ParseOptions`] to surface them as errors.
//! - Never fail in the lexer: every input tokenizes.
//!
//! ```
//! use msd_rs::prelude::*;
//!
//! let mut parameters = parse_msd("#TITLE:Springtime;\n#BPMS:0=181;", ParseOptions::default());
//! let title = parameters.next().unwrap().unwrap();
//! assert_eq!(title.key(), "TITLE");
//! assert_eq!(title.value(), Some("Springtime"));
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod lex;
pub mod param;
pub mod parse;
pub mod prelude;

pub use self::{
    lex::{MsdLexer, Token, lex_msd, lex_msd_reader},
    param::{MsdParameter, SerializeError, SerializeOptions},
    parse::{
        MsdParser, ParseError, ParseOptions, StrayTextLocation, parse_msd, parse_msd_reader,
        parse_msd_tokens,
    },
};
