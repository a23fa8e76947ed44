//! End-to-end merge scenarios over slide-like XML text
//!
//! These exercise extraction, catalog building and rendering together the
//! way the presentation store drives them.

use chrono::{TimeZone, Utc};
use deck_merge::{
    build_field_catalog, extract, heal_split_tokens, FieldCatalog, FieldSource, MergeEngine,
    MergeError, RenderOptions,
};
use proptest::prelude::*;
use serde_json::json;

const SLIDE: &str = r#"<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree>
<p:sp><p:txBody><a:p><a:r><a:t>{{project_name}} / {{customer}}</a:t></a:r></a:p></p:txBody></p:sp>
<p:sp><p:txBody><a:p><a:r><a:t>{{#workstations}}</a:t></a:r></a:p><a:p><a:r><a:t>{{index}}: {{name}} ({{module_count}})</a:t></a:r></a:p><a:p><a:r><a:t>{{/workstations}}</a:t></a:r></a:p></p:txBody></p:sp>
</p:spTree></p:cSld></p:sld>"#;

fn engine(strict: bool) -> MergeEngine {
    MergeEngine::new(
        RenderOptions::default()
            .with_strict(strict)
            .with_now(Utc.with_ymd_and_hms(2024, 12, 20, 10, 0, 0).unwrap()),
    )
}

#[test]
fn test_extract_then_describe() {
    let tokens = extract(SLIDE);
    let fields = build_field_catalog(&tokens, &FieldCatalog::builtin());
    let project = fields.iter().find(|f| f.name == "project_name").unwrap();
    assert_eq!(project.source, FieldSource::Both);
    assert!(tokens.loops.contains("workstations"));
    assert!(!tokens.scalars.contains("workstations"));
}

#[test]
fn test_render_paragraph_loop() {
    let engine = engine(false);
    let root = engine.prepare(&json!({
        "project_name": "Bottling QA",
        "customer": "Müller & Söhne",
        "workstations": [
            {"name": "WS-01", "modules": [{"name": "M1"}, {"name": "M2"}]},
            {"name": "WS-02", "modules": []}
        ]
    }));
    let out = engine.render_text(SLIDE, &root).unwrap();

    assert!(out.contains("Bottling QA / Müller &amp; Söhne"));
    assert!(out.contains("1: WS-01 (2)"));
    assert!(out.contains("2: WS-02 (0)"));
    assert!(!out.contains("{{"));
    // Loop body spans paragraphs; repeating it must keep the paragraph structure balanced
    assert_eq!(out.matches("<a:p>").count(), out.matches("</a:p>").count());
    assert!(quick_check_balanced(&out));
}

#[test]
fn test_strict_mode_reports_tag() {
    let engine = engine(true);
    let root = engine.prepare(&json!({"project_name": "x", "workstations": []}));
    let err = engine.render_text(SLIDE, &root).unwrap_err();
    assert!(matches!(err, MergeError::UnknownTag { ref name } if name == "customer"));
    assert_eq!(err.issues()[0].id, "unknown_tag");
}

#[test]
fn test_split_run_token_renders_after_healing() {
    let xml = "<a:r><a:t>{{proj</a:t></a:r><a:r><a:t>ect_name}}</a:t></a:r>";
    let healed = heal_split_tokens(xml);
    let engine = engine(false);
    let root = engine.prepare(&json!({"project_name": "Line 7"}));
    let out = engine.render_text(&healed, &root).unwrap();
    assert_eq!(out, "<a:r><a:t>Line 7</a:t></a:r><a:r><a:t></a:t></a:r>");
}

/// Minimal element balance check: every `<x>` has a `</x>` in order
fn quick_check_balanced(xml: &str) -> bool {
    let mut stack: Vec<String> = Vec::new();
    let mut rest = xml;
    while let Some(start) = rest.find('<') {
        let Some(end) = rest[start..].find('>') else { return false };
        let tag = &rest[start + 1..start + end];
        rest = &rest[start + end + 1..];
        if tag.ends_with('/') || tag.starts_with('?') {
            continue;
        }
        if let Some(name) = tag.strip_prefix('/') {
            if stack.pop().as_deref() != Some(name) {
                return false;
            }
        } else {
            let name = tag.split_whitespace().next().unwrap_or_default();
            stack.push(name.to_string());
        }
    }
    stack.is_empty()
}

fn nested_template(depth: usize, names: &[String]) -> String {
    let mut open = String::new();
    let mut close = String::new();
    for name in names.iter().take(depth) {
        open.push_str(&format!("{{{{#{}}}}}<x>", name));
        close.insert_str(0, &format!("</x>{{{{/{}}}}}", name));
    }
    format!("{}{{{{v}}}}{}", open, close)
}

proptest! {
    #[test]
    fn prop_balanced_templates_render(names in proptest::collection::vec("[a-z]{1,6}", 1..5)) {
        let template = nested_template(names.len(), &names);
        let engine = engine(false);
        let root = engine.prepare(&json!({}));
        prop_assert!(engine.render_text(&template, &root).is_ok());
    }

    #[test]
    fn prop_dropping_a_close_tag_fails(names in proptest::collection::vec("[a-z]{1,6}", 1..5)) {
        let template = nested_template(names.len(), &names);
        let last_close = format!("{{{{/{}}}}}", names[0]);
        let broken = template.replacen(&last_close, "", 1);
        let engine = engine(false);
        let root = engine.prepare(&json!({}));
        let is_syntax_error = matches!(engine.render_text(&broken, &root), Err(MergeError::TemplateSyntax(_)));
        prop_assert!(is_syntax_error);
    }
}
