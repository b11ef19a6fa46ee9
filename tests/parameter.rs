//! Integration tests for the parameter model and normalized serialization.

use pretty_assertions::assert_eq;

use msd_rs::prelude::*;

fn single(source: &str) -> MsdParameter {
    let mut parse = parse_msd(source, ParseOptions::default());
    let parameter = parse.next().expect("one parameter").expect("no error");
    assert!(parse.next().is_none(), "expected exactly one parameter");
    parameter
}

#[test]
fn key_value_accessors() {
    let parameter = single("#TITLE:Springtime;");
    assert_eq!(parameter.key(), "TITLE");
    assert_eq!(parameter.value(), Some("Springtime"));
    assert_eq!(parameter.components(), ["TITLE", "Springtime"]);
}

#[test]
fn display_re_escapes() {
    // Escapes are consumed during parsing and re-applied on display.
    let parameter = single("#A\\:B:C\\;D;");
    assert_eq!(parameter.components(), ["A:B", "C;D"]);
    assert_eq!(parameter.to_string(), "#A\\:B:C\\;D;");
}

#[test]
fn display_normalizes_sloppy_input() {
    // A recovered terminator and stray suffix text are dropped by the
    // normalized form.
    let parameter = {
        let mut parse = parse_msd("#A:B\n#C;", ParseOptions::default());
        parse.next().expect("first parameter").expect("no error")
    };
    assert_eq!(parameter.to_string(), "#A:B;");
}

#[test]
fn serialize_matches_display() {
    let parameter = MsdParameter::new("NOTES", ["dance-single", "raw // data"]);
    let mut out = String::new();
    parameter
        .serialize(&mut out, SerializeOptions::default())
        .expect("serialization must succeed");
    assert_eq!(out, parameter.to_string());
    assert_eq!(out, "#NOTES:dance-single:raw \\// data;");
}

#[test]
fn serialize_without_escapes() {
    let parameter = MsdParameter::new("BPMS", ["0=181"]);
    let mut out = String::new();
    parameter
        .serialize(
            &mut out,
            SerializeOptions {
                escapes: false,
                ..Default::default()
            },
        )
        .expect("no special substrings");
    assert_eq!(out, "#BPMS:0=181;");

    let unescapable = MsdParameter::new("A", ["B:C"]);
    let err = unescapable
        .serialize(&mut String::new(), SerializeOptions { escapes: false, ..Default::default() })
        .expect_err("`:` cannot appear unescaped");
    assert_eq!(
        err,
        SerializeError::UnescapableComponent { component: "B:C".into() }
    );
}

#[test]
fn constructed_parameter_has_no_metadata() {
    let parameter = MsdParameter::new("A", ["B"]);
    assert_eq!(parameter.preamble(), None);
    assert!(parameter.comments().is_empty());
    assert_eq!(parameter.escape_positions(), None);
    assert_eq!(parameter.suffix(), "");

    // Exact mode on a constructed parameter writes no terminator, because
    // the terminator lives in the (empty) suffix.
    let mut out = String::new();
    parameter
        .serialize(&mut out, SerializeOptions { exact: true, ..Default::default() })
        .expect("serialization must succeed");
    assert_eq!(out, "#A:B");
}

#[test]
fn normalized_form_reparses_to_the_same_components() {
    for parameter in [
        MsdParameter::new("A", ["B:C", "D;E"]),
        MsdParameter::new("", ["\\", "//", "#"]),
        MsdParameter::new("K", Vec::<String>::new()),
        MsdParameter::new("SONG", ["line\r\nbreaks\nkept"]),
    ] {
        let reparsed = single(&parameter.to_string());
        assert_eq!(reparsed.components(), parameter.components());
    }
}
