//! The MSD parameter model.
//!
//! An [`MsdParameter`] is one `#key:value;` unit. Besides its components it
//! carries the reverse-mapping metadata collected by [`crate::parse`]
//! (preamble, comments, escape positions, suffix), which lets
//! [`MsdParameter::serialize`] reproduce the original document byte for byte
//! in exact mode. Parameters are plain immutable values: constructed once,
//! never mutated, compared structurally.

use std::{borrow::Cow, fmt};

use itertools::Itertools;
use thiserror::Error;

/// Substrings that cannot appear unescaped in a serialized component.
const MUST_ESCAPE: [&str; 3] = ["//", ":", ";"];
/// Characters that are escaped for round-trip hygiene but would not make the
/// output unparseable.
const SHOULD_ESCAPE: [&str; 2] = ["\\", "#"];

/// An error occurred when serializing an [`MsdParameter`].
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerializeError {
    /// Escapes were disabled but a component contains a special substring,
    /// so any output would be ambiguous or invalid MSD.
    #[error("component {component:?} can't be serialized without escapes")]
    UnescapableComponent {
        /// The offending component.
        component: String,
    },
    /// Exact serialization was requested with escapes disabled while escape
    /// positions are recorded. Escape positions are meaningless without
    /// escaping; the parameter was parsed with a different dialect.
    #[error("escape positions are recorded but escapes are disabled")]
    EscapesDisabled,
    /// A recorded comment points at a line that the component text never
    /// reaches. The parameter's bookkeeping does not match its contents.
    #[error("comment recorded at line {line} has no matching line in the components")]
    UnconsumedComment {
        /// The line index of the orphaned comment.
        line: usize,
    },
    /// A recorded escape position that the component text never reaches.
    /// The parameter's bookkeeping does not match its contents.
    #[error("escape recorded at offset {position} has no matching position in the components")]
    UnconsumedEscape {
        /// The character offset of the orphaned escape.
        position: usize,
    },
    /// The output sink refused the write.
    #[error("failed to write to the sink")]
    Fmt(#[from] fmt::Error),
}

/// Options for [`MsdParameter::serialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SerializeOptions {
    /// Whether to backslash-escape `\`, `#` and the special substrings `//`,
    /// `:`, `;` inside components. When `false`, a component containing a
    /// special substring fails with
    /// [`SerializeError::UnescapableComponent`]. Defaults to `true`.
    pub escapes: bool,
    /// Exact mode: replay preamble, comments, escape positions and suffix to
    /// reproduce the originally parsed text instead of a normalized
    /// `#c0:c1;`. Defaults to `false`.
    pub exact: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            escapes: true,
            exact: false,
        }
    }
}

/// An MSD parameter, comprised of a key and some values (usually one).
///
/// Displaying an `MsdParameter` converts it back into normalized MSD,
/// escaping any backslashes or special substrings; [`Self::serialize`] also
/// offers the escapes-disabled dialect and exact reproduction of the parsed
/// text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MsdParameter {
    /// The raw components; special substrings are unescaped. Never empty.
    pub(crate) components: Vec<String>,
    /// Text before the first parameter of the document. Always `Some` for
    /// the first parameter (possibly empty), always `None` otherwise.
    pub(crate) preamble: Option<String>,
    /// `(line, comment)` pairs, line 0 being the line of the opening `#`.
    /// At most one comment per line, in increasing line order.
    pub(crate) comments: Vec<(usize, String)>,
    /// Document character offsets (opening `#` = 0) of each `\` consumed as
    /// an escape. `None` when the parameter was parsed with escapes
    /// disabled.
    pub(crate) escape_positions: Option<Vec<usize>>,
    /// Text from the end of this parameter's content (including its
    /// terminator, if any) up to the next parameter's `#` or end of
    /// document.
    pub(crate) suffix: String,
}

impl MsdParameter {
    /// Creates a parameter from a key and its values, without any document
    /// metadata. Intended for programmatic serialization; exact mode on such
    /// a parameter writes no terminator because its suffix is empty.
    pub fn new<K, V, I>(key: K, values: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let mut components = vec![key.into()];
        components.extend(values.into_iter().map(Into::into));
        Self {
            components,
            preamble: None,
            comments: Vec::new(),
            escape_positions: None,
            suffix: String::new(),
        }
    }

    /// The first component, the part immediately after the `#` sign.
    #[must_use]
    pub fn key(&self) -> &str {
        self.components.first().map(String::as_str).unwrap_or_default()
    }

    /// The second component, separated from the key by a `:`.
    ///
    /// Returns `None` if the parameter ends after the key with no `:`. This
    /// rarely happens in practice and is typically treated the same as a
    /// blank value.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.components.get(1).map(String::as_str)
    }

    /// All components in order. Never empty.
    #[must_use]
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Text (including comments) preceding the first parameter of the
    /// document. `Some` only on the first parameter.
    #[must_use]
    pub fn preamble(&self) -> Option<&str> {
        self.preamble.as_deref()
    }

    /// Comments recorded inside this parameter as `(line, text)` pairs.
    /// Line 0 is the line of the opening `#`; the text includes the leading
    /// `//` but not the line terminator.
    #[must_use]
    pub fn comments(&self) -> &[(usize, String)] {
        &self.comments
    }

    /// Character offsets (relative to the opening `#` at offset 0) of each
    /// backslash consumed as an escape, or `None` when escapes were disabled
    /// for parsing.
    #[must_use]
    pub fn escape_positions(&self) -> Option<&[usize]> {
        self.escape_positions.as_deref()
    }

    /// Text between the end of this parameter's content (including its
    /// terminator, if any) and the next parameter or end of document.
    #[must_use]
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Serializes a single component (key or value).
    ///
    /// With `escapes`, backslashes, `#` and the special substrings `//`,
    /// `:`, `;` are backslash-escaped. Without, the component is returned
    /// unchanged unless it contains a special substring, in which case
    /// serialization fails.
    ///
    /// # Errors
    ///
    /// [`SerializeError::UnescapableComponent`] when `escapes` is `false`
    /// and the component contains `//`, `:` or `;`.
    pub fn serialize_component(component: &str, escapes: bool) -> Result<Cow<'_, str>, SerializeError> {
        if escapes {
            Ok(escape_component(component))
        } else if MUST_ESCAPE.iter().any(|special| component.contains(special)) {
            Err(SerializeError::UnescapableComponent {
                component: component.to_owned(),
            })
        } else {
            Ok(Cow::Borrowed(component))
        }
    }

    /// Serializes the parameter to a character sink.
    ///
    /// Normalized mode writes `#c0:c1:...:cn;`; exact mode replays the
    /// recorded preamble, comments, escape positions and suffix to reproduce
    /// the originally parsed text. See [`SerializeOptions`].
    ///
    /// # Errors
    ///
    /// Any [`SerializeError`]; sink failures are propagated as
    /// [`SerializeError::Fmt`].
    pub fn serialize<W: fmt::Write>(
        &self,
        sink: &mut W,
        options: SerializeOptions,
    ) -> Result<(), SerializeError> {
        if options.exact {
            self.serialize_exact(sink, options.escapes)
        } else {
            self.serialize_normalized(sink, options.escapes)
        }
    }

    fn serialize_normalized<W: fmt::Write>(
        &self,
        sink: &mut W,
        escapes: bool,
    ) -> Result<(), SerializeError> {
        sink.write_char('#')?;
        for (index, component) in self.components.iter().enumerate() {
            if index > 0 {
                sink.write_char(':')?;
            }
            sink.write_str(&Self::serialize_component(component, escapes)?)?;
        }
        sink.write_char(';')?;
        Ok(())
    }

    /// Replays the parameter exactly as parsed: preamble, then the
    /// components with comments re-interleaved before the terminator of
    /// their recorded line and backslashes re-inserted at their recorded
    /// character offsets, then the suffix verbatim in place of a `;`.
    ///
    /// Offsets here mirror the parser's bookkeeping: document character
    /// offsets with the opening `#` at 0, counting separators, backslashes,
    /// newlines and comment text alike.
    fn serialize_exact<W: fmt::Write>(
        &self,
        sink: &mut W,
        escapes: bool,
    ) -> Result<(), SerializeError> {
        let escape_positions = self.escape_positions.as_deref().unwrap_or_default();
        if !escapes && !escape_positions.is_empty() {
            return Err(SerializeError::EscapesDisabled);
        }
        if let Some(preamble) = &self.preamble {
            sink.write_str(preamble)?;
        }
        sink.write_char('#')?;
        let mut offset = 1_usize;
        let mut line = 0_usize;
        let mut comments = self.comments.iter().peekable();
        let mut escapes_left = escape_positions.iter().copied().peekable();
        for (index, component) in self.components.iter().enumerate() {
            if index > 0 {
                sink.write_char(':')?;
                offset += 1;
            }
            let mut chars = component.chars().peekable();
            while let Some(ch) = chars.next() {
                // A comment sits at the end of its line, before the `\n`
                // (or the `\r` of a `\r\n` pair).
                let ends_line = ch == '\n' || (ch == '\r' && chars.peek() == Some(&'\n'));
                if ends_line
                    && let Some(comment) = comments.peek()
                    && comment.0 == line
                {
                    sink.write_str(&comment.1)?;
                    offset += comment.1.chars().count();
                    comments.next();
                }
                if escapes_left.peek() == Some(&offset) {
                    sink.write_char('\\')?;
                    offset += 1;
                    escapes_left.next();
                }
                sink.write_char(ch)?;
                offset += 1;
                if ch == '\n' {
                    line += 1;
                }
            }
        }
        // A comment on the final line of content has no terminator to
        // precede, e.g. a document ending in a comment at EOF.
        if let Some(comment) = comments.peek()
            && comment.0 == line
        {
            sink.write_str(&comment.1)?;
            comments.next();
        }
        if let Some(comment) = comments.next() {
            return Err(SerializeError::UnconsumedComment { line: comment.0 });
        }
        if let Some(position) = escapes_left.next() {
            return Err(SerializeError::UnconsumedEscape { position });
        }
        sink.write_str(&self.suffix)?;
        Ok(())
    }
}

impl fmt::Display for MsdParameter {
    /// Writes the normalized, escaped form `#c0:c1:...:cn;`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let components = self
            .components
            .iter()
            .map(|component| escape_component(component))
            .format(":");
        write!(f, "#{components};")
    }
}

/// Backslash-escapes every special substring of a component. Backslashes
/// must be escaped first to avoid double-escaping.
fn escape_component(component: &str) -> Cow<'_, str> {
    if !SHOULD_ESCAPE
        .iter()
        .chain(&MUST_ESCAPE)
        .any(|special| component.contains(special))
    {
        return Cow::Borrowed(component);
    }
    let mut escaped = component.to_owned();
    for special in SHOULD_ESCAPE.iter().chain(&MUST_ESCAPE) {
        escaped = escaped.replace(special, &format!("\\{special}"));
    }
    Cow::Owned(escaped)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{MsdParameter, SerializeError, SerializeOptions};

    #[test]
    fn escape_order_avoids_double_escaping() {
        let escaped = MsdParameter::serialize_component("A\\B//C:D;E#F", true)
            .expect("escaping cannot fail");
        assert_eq!(escaped, "A\\\\B\\//C\\:D\\;E\\#F");
    }

    #[test]
    fn plain_component_borrows() {
        let escaped = MsdParameter::serialize_component("plain / text", true)
            .expect("escaping cannot fail");
        assert!(matches!(escaped, std::borrow::Cow::Borrowed(_)));
    }

    #[test]
    fn unescapable_component() {
        let err = MsdParameter::serialize_component("AB//CD", false);
        assert_eq!(
            err,
            Err(SerializeError::UnescapableComponent {
                component: "AB//CD".into()
            })
        );
        // `#` and `\` alone stay legal without escapes.
        let ok = MsdParameter::serialize_component("A#B\\C", false).expect("no special substring");
        assert_eq!(ok, "A#B\\C");
    }

    #[test]
    fn display_normalizes() {
        let parameter = MsdParameter::new("TITLE", ["Spring:time"]);
        assert_eq!(parameter.to_string(), "#TITLE:Spring\\:time;");
    }

    #[test]
    fn serialize_without_escapes_fails_on_special() {
        let parameter = MsdParameter::new("A", ["B;C"]);
        let mut out = String::new();
        let result = parameter.serialize(
            &mut out,
            SerializeOptions {
                escapes: false,
                ..Default::default()
            },
        );
        assert_eq!(
            result,
            Err(SerializeError::UnescapableComponent {
                component: "B;C".into()
            })
        );
    }

    #[test]
    fn exact_rejects_orphaned_comment() {
        let parameter = MsdParameter {
            components: vec!["A".into()],
            preamble: None,
            comments: vec![(3, "// lost".into())],
            escape_positions: None,
            suffix: ";".into(),
        };
        let result = parameter.serialize(
            &mut String::new(),
            SerializeOptions {
                exact: true,
                ..Default::default()
            },
        );
        assert_eq!(result, Err(SerializeError::UnconsumedComment { line: 3 }));
    }

    #[test]
    fn exact_rejects_orphaned_escape() {
        let parameter = MsdParameter {
            components: vec!["A".into()],
            preamble: None,
            comments: Vec::new(),
            escape_positions: Some(vec![40]),
            suffix: ";".into(),
        };
        let result = parameter.serialize(
            &mut String::new(),
            SerializeOptions {
                exact: true,
                ..Default::default()
            },
        );
        assert_eq!(result, Err(SerializeError::UnconsumedEscape { position: 40 }));
    }

    #[test]
    fn key_and_value() {
        let parameter = MsdParameter::new("BPMS", ["0=181"]);
        assert_eq!(parameter.key(), "BPMS");
        assert_eq!(parameter.value(), Some("0=181"));
        let bare = MsdParameter::new("NOVALUE", Vec::<String>::new());
        assert_eq!(bare.value(), None);
    }
}
