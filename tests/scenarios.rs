//! End-to-end regeneration scenarios
//!
//! Each test drives a complete parse → execute → render cycle on a small document.

use regenerate::component::{Component, SlotKind};
use regenerate::document::{ParseErrorKind, StateError};
use regenerate::page_state::PageState;
use regenerate::script::ScriptResult;
use regenerate::{Document, PageShape, RenderMode, ShapeRegistry, BUILT_IN_SHAPES};
use rstest::rstest;

fn parse(source: &str) -> Document<'static> {
    Document::parse_str(source, "/site/index.html", &BUILT_IN_SHAPES).expect("valid document")
}

#[test]
fn test_empty_slot_renders_self_closing() {
    let doc = parse("<!-- [title] -->\n");
    assert_eq!(doc.state().get("title"), Some(""));
    assert_eq!(doc.render(RenderMode::Source), "<!-- [title] -->\n");
}

#[test]
fn test_rendered_slot_round_trips() {
    let source = "<!-- [title -->\nHello\n<!-- title] -->\n";
    let doc = parse(source);

    assert_eq!(doc.components().len(), 1);
    match &doc.components()[0] {
        Component::DataSlot(slot) => {
            assert_eq!(slot.name, "title");
            assert_eq!(slot.kind, SlotKind::Rendered);
            assert_eq!(slot.body.text(), "Hello");
        }
        other => panic!("expected a data slot, got {other:?}"),
    }
    assert_eq!(doc.render(RenderMode::Source), source);
}

#[test]
fn test_script_sets_slot_before_rendering() {
    let mut doc = parse("<!-- [script\nset title\nscript] -->\n<!-- [title] -->\n");
    let mut executor = |source: &str, _line: usize, state: &mut PageState| -> ScriptResult {
        if source == "set title" {
            state.set("title", "New")?;
        }
        Ok(())
    };
    doc.execute_scripts(&mut executor).unwrap();

    let rendered = doc.render(RenderMode::Source);
    assert!(rendered.ends_with("<!-- [title -->\nNew\n<!-- title] -->\n"));
}

#[test]
fn test_unterminated_script_at_end_of_file() {
    let err = Document::parse_str(
        "<p>intro</p>\n<!-- [script\nstill running\n",
        "/site/index.html",
        &BUILT_IN_SHAPES,
    )
    .unwrap_err();
    assert!(matches!(
        err.kind,
        ParseErrorKind::State(StateError::Unterminated { .. })
    ));
    assert!(err.to_string().contains("unterminated component"));
}

#[test]
fn test_scripts_see_each_others_writes_in_order() {
    let mut doc = parse(
        "<!-- [script\nfirst\nscript] -->\n<!-- [script\nsecond\nscript] -->\n<!-- [log] -->\n",
    );
    let mut executor = |source: &str, line: usize, state: &mut PageState| -> ScriptResult {
        let previous = state.get("log").unwrap_or_default().to_string();
        state.set("log", format!("{previous}{source}@{line};"))?;
        Ok(())
    };
    doc.execute_scripts(&mut executor).unwrap();
    assert_eq!(doc.state().get("log"), Some("first@2;second@5;"));
}

#[test]
fn test_script_failure_reports_line() {
    let mut doc = parse("text\n<!-- [script\nfail\nscript] -->\n");
    let mut executor = |_: &str, _: usize, _: &mut PageState| -> ScriptResult { Err("boom".into()) };
    let err = doc.execute_scripts(&mut executor).unwrap_err();
    assert_eq!(err.line_number, 3);
    assert!(err.to_string().contains("boom"));
}

#[test]
fn test_shape_defaults_render_through_slots() {
    let shapes = ShapeRegistry::with_shapes([PageShape::new("Article").with_default("section", "news")]);
    let doc = Document::parse_str(
        "<!-- [class Article] -->\n<!-- [heading] -->\n",
        "/site/index.html",
        &shapes,
    )
    .unwrap();
    assert_eq!(doc.state().get("section"), Some("news"));
    assert_eq!(doc.render(RenderMode::Source), "<!-- [class Article] -->\n<!-- [heading] -->\n");
}

#[test]
fn test_built_in_slots_are_readable_by_scripts_only() {
    let mut doc = parse("<!-- [script\nname\nscript] -->\n<!-- [file] -->\n");
    let mut executor = |_: &str, _: usize, state: &mut PageState| -> ScriptResult {
        let name = state.get("base_file_name").unwrap_or_default().to_string();
        state.set("file", name)?;
        Ok(())
    };
    doc.execute_scripts(&mut executor).unwrap();
    assert!(doc
        .render(RenderMode::Source)
        .ends_with("<!-- [file -->\nindex.html\n<!-- file] -->\n"));
}

#[rstest]
#[case::nested_open("<!-- [a -->\n<!-- [b -->\n<!-- b] -->\n<!-- a] -->\n")]
#[case::stray_close("<!-- a] -->\n")]
#[case::mismatched_names("<!-- [a\nbody\nb] -->\n")]
#[case::script_closed_as_slot("<!-- [script\nbody\ntitle] -->\n")]
#[case::unterminated_slot("<!-- [a -->\nbody\n")]
fn test_lifecycle_violations_are_state_errors(#[case] source: &str) {
    let err = Document::parse_str(source, "/site/index.html", &BUILT_IN_SHAPES).unwrap_err();
    assert!(
        matches!(err.kind, ParseErrorKind::State(_)),
        "expected a state error, got {err}"
    );
}

#[rstest]
#[case::empty_script("<!-- [script] -->\n")]
#[case::argument_on_slot("<!-- [title x] -->\n")]
#[case::class_body("<!-- [class Page -->\n<!-- class] -->\n")]
#[case::half_closed("<!-- [title]\n")]
#[case::built_in_slot("<!-- [base_file_name] -->\n")]
#[case::built_in_rendered_slot("<!-- [source_path -->\n/elsewhere\n<!-- source_path] -->\n")]
fn test_malformed_directives_are_grammar_errors(#[case] source: &str) {
    let err = Document::parse_str(source, "/site/index.html", &BUILT_IN_SHAPES).unwrap_err();
    assert!(
        matches!(err.kind, ParseErrorKind::Grammar(_)),
        "expected a grammar error, got {err}"
    );
    assert_eq!(err.line_number, 1);
}
