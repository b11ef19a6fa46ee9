//! A prelude module exporting the whole public API of this crate.
//!
//! ```
//! use msd_rs::prelude::*;
//! ```

pub use crate::{
    lex::{MsdLexer, Token, lex_msd, lex_msd_reader},
    param::{MsdParameter, SerializeError, SerializeOptions},
    parse::{
        MsdParser, ParseError, ParseOptions, StrayTextLocation, parse_msd, parse_msd_reader,
        parse_msd_tokens,
    },
};
