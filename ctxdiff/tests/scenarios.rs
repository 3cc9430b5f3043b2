//! End-to-end scenarios: diff, wire round trips, context resolution and
//! patch application over JsonML and XML documents.

use ctxdiff::{
    apply, decode_delta, diff, encode_delta, parse_document, serialize_document, ApplyMode,
    ApplyReport, Content, Error, Family, OpKind, PatchFormat, ResolverConfig, Subtree, Tree,
    DEFAULT_RADIUS,
};
use serde_json::json;

fn jsonml(text: &str) -> Tree {
    parse_document(Family::Json, text).expect("valid JsonML")
}

fn jsonml_value(tree: &Tree) -> serde_json::Value {
    let text = serialize_document(Family::Json, tree).unwrap();
    serde_json::from_str(&text).unwrap()
}

fn apply_strict(tree: &mut Tree, delta: &[ctxdiff::DetachedOperation]) -> ApplyReport {
    apply(tree, delta, ApplyMode::Strict, &ResolverConfig::default()).unwrap()
}

#[test]
fn empty_diff_yields_no_operations() {
    let a = jsonml(r#"["article"]"#);
    let b = jsonml(r#"["article"]"#);
    let delta = diff(&a, &b, DEFAULT_RADIUS).unwrap();
    assert!(delta.is_empty());

    // Applying the empty delta leaves any tree unchanged.
    let mut other = jsonml(r#"["ul", ["li", "a"]]"#);
    let before = jsonml_value(&other);
    let report = apply_strict(&mut other, &delta);
    assert_eq!(report.applied, 0);
    assert_eq!(jsonml_value(&other), before);
}

#[test]
fn text_change_is_a_forest_update_with_empty_context() {
    let a = jsonml(r#"["p", "hello"]"#);
    let b = jsonml(r#"["p", "world"]"#);
    let delta = diff(&a, &b, DEFAULT_RADIUS).unwrap();

    assert_eq!(delta.len(), 1);
    let op = &delta[0];
    assert_eq!(op.kind, OpKind::UpdateForest);
    assert_eq!(op.path, vec![0]);
    assert_eq!(op.remove, vec![Subtree::new(Content::text("hello"))]);
    assert_eq!(op.insert, vec![Subtree::new(Content::text("world"))]);
    assert_eq!(op.head, vec![0; DEFAULT_RADIUS]);
    assert_eq!(op.tail, vec![0; DEFAULT_RADIUS]);
}

#[test]
fn attribute_addition_is_a_node_update_at_the_root() {
    let a = jsonml(r#"["a"]"#);
    let b = jsonml(r#"["a", {"href": "x"}]"#);
    let delta = diff(&a, &b, DEFAULT_RADIUS).unwrap();

    assert_eq!(delta.len(), 1);
    let op = &delta[0];
    assert_eq!(op.kind, OpKind::UpdateNode);
    assert_eq!(op.path, Vec::<usize>::new());
    assert_eq!(op.remove.len(), 1);
    assert_eq!(op.remove[0].content, Content::element("a"));
    let inserted = op.insert[0].content.as_element().unwrap();
    assert_eq!(inserted.attrs().get("href").map(String::as_str), Some("x"));

    let mut target = jsonml(r#"["a"]"#);
    apply_strict(&mut target, &delta);
    assert_eq!(jsonml_value(&target), json!(["a", {"href": "x"}]));
}

#[test]
fn sibling_insertion_carries_neighbor_context() {
    let a = jsonml(r#"["ul", ["li", "a"], ["li", "c"]]"#);
    let b = jsonml(r#"["ul", ["li", "a"], ["li", "b"], ["li", "c"]]"#);
    let delta = diff(&a, &b, DEFAULT_RADIUS).unwrap();

    assert_eq!(delta.len(), 1);
    let op = &delta[0];
    assert_eq!(op.kind, OpKind::UpdateForest);
    assert_eq!(op.path, vec![1]);
    assert!(op.remove.is_empty());
    assert_eq!(op.insert.len(), 1);

    // Head covers the first item and its text; tail covers the second
    // item; the parent is an ancestor and contributes nothing.
    assert_eq!(op.head[0], 0);
    assert_eq!(op.head[1], 0);
    assert_ne!(op.head[2], 0);
    assert_ne!(op.head[3], 0);
    assert_ne!(op.tail[0], 0);
    assert_ne!(op.tail[1], 0);
    assert_eq!(&op.tail[2..], &[0, 0]);

    let mut target = jsonml(r#"["ul", ["li", "a"], ["li", "c"]]"#);
    apply_strict(&mut target, &delta);
    assert_eq!(
        jsonml_value(&target),
        json!(["ul", ["li", "a"], ["li", "b"], ["li", "c"]])
    );
}

#[test]
fn context_resolution_survives_target_divergence() {
    let a = jsonml(r#"["ul", ["li", "a"], ["li", "c"]]"#);
    let b = jsonml(r#"["ul", ["li", "a"], ["li", "b"], ["li", "c"]]"#);
    let delta = diff(&a, &b, DEFAULT_RADIUS).unwrap();

    // The target gained a trailing item the patch has never seen.
    let mut target = jsonml(r#"["ul", ["li", "a"], ["li", "c"], ["li", "d"]]"#);
    let report = apply_strict(&mut target, &delta);
    assert_eq!(report.applied, 1);
    assert_eq!(
        jsonml_value(&target),
        json!(["ul", ["li", "a"], ["li", "b"], ["li", "c"], ["li", "d"]])
    );
}

#[test]
fn resolution_fails_cleanly_on_unrelated_target() {
    let a = jsonml(r#"["ul", ["li", "a"], ["li", "c"]]"#);
    let b = jsonml(r#"["ul", ["li", "a"], ["li", "b"], ["li", "c"]]"#);
    let delta = diff(&a, &b, DEFAULT_RADIUS).unwrap();

    let mut target = jsonml(r#"["ol", ["x"]]"#);
    let before = jsonml_value(&target);
    let err = apply(
        &mut target,
        &delta,
        ApplyMode::Strict,
        &ResolverConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::ResolutionFailed(_)));
    // Strict mode leaves the tree untouched.
    assert_eq!(jsonml_value(&target), before);
}

#[test]
fn diff_is_idempotent_on_identical_documents() {
    let doc = r#"["section", {"id": "intro"}, ["h1", "Title"], ["p", "Body text."]]"#;
    let a = jsonml(doc);
    let b = jsonml(doc);
    assert!(diff(&a, &b, DEFAULT_RADIUS).unwrap().is_empty());
}

#[test]
fn round_trip_through_xml_wire_format() {
    let a = parse_document(
        Family::Xml,
        "<doc><head><title>One</title></head><body><p>x</p><p>y</p></body></doc>",
    )
    .unwrap();
    let b = parse_document(
        Family::Xml,
        "<doc><head><title>Two</title></head><body><p>x</p><p sub=\"1\">y</p><p>z</p></body></doc>",
    )
    .unwrap();

    let delta = diff(&a, &b, DEFAULT_RADIUS).unwrap();
    assert!(!delta.is_empty());

    // Serialize the patch, read it back, apply to a fresh copy of A.
    let wire = encode_delta(&delta, PatchFormat::Xml, Family::Xml).unwrap();
    let decoded = decode_delta(&wire, PatchFormat::Xml, Family::Xml).unwrap();
    assert_eq!(decoded, delta);

    let mut target = parse_document(
        Family::Xml,
        "<doc><head><title>One</title></head><body><p>x</p><p>y</p></body></doc>",
    )
    .unwrap();
    apply_strict(&mut target, &decoded);
    assert_eq!(
        serialize_document(Family::Xml, &target).unwrap(),
        serialize_document(Family::Xml, &b).unwrap()
    );
}

#[test]
fn round_trip_through_json_wire_format() {
    let a = jsonml(r#"["ul", ["li", "a"], ["li", "b"], ["li", "c"]]"#);
    let b = jsonml(r#"["ul", ["li", "a"], ["li", "c"], ["li", "d"]]"#);
    let delta = diff(&a, &b, DEFAULT_RADIUS).unwrap();

    let wire = encode_delta(&delta, PatchFormat::Json, Family::Json).unwrap();
    let decoded = decode_delta(&wire, PatchFormat::Json, Family::Json).unwrap();
    assert_eq!(decoded, delta);

    let mut target = jsonml(r#"["ul", ["li", "a"], ["li", "b"], ["li", "c"]]"#);
    apply_strict(&mut target, &decoded);
    assert_eq!(jsonml_value(&target), jsonml_value(&b));
}

#[test]
fn xml_document_with_json_patch_encoding() {
    let a = parse_document(Family::Xml, "<ul><li>a</li><li>c</li></ul>").unwrap();
    let b = parse_document(Family::Xml, "<ul><li>a</li><li>b</li><li>c</li></ul>").unwrap();
    let delta = diff(&a, &b, DEFAULT_RADIUS).unwrap();

    let wire = encode_delta(&delta, PatchFormat::Json, Family::Xml).unwrap();
    let decoded = decode_delta(&wire, PatchFormat::Json, Family::Xml).unwrap();

    let mut target = parse_document(Family::Xml, "<ul><li>a</li><li>c</li></ul>").unwrap();
    apply_strict(&mut target, &decoded);
    assert_eq!(
        serialize_document(Family::Xml, &target).unwrap(),
        serialize_document(Family::Xml, &b).unwrap()
    );
}

#[test]
fn best_effort_applies_what_it_can() {
    // Two edits in separate regions: an insertion inside the list and a
    // text replacement in the trailing paragraph.
    let a = jsonml(r#"["doc", ["ul", ["li", "a"], ["li", "c"]], ["p", "old"]]"#);
    let b = jsonml(r#"["doc", ["ul", ["li", "a"], ["li", "b"], ["li", "c"]], ["p", "new"]]"#);
    let delta = diff(&a, &b, DEFAULT_RADIUS).unwrap();
    assert_eq!(delta.len(), 2);

    // The target lost the paragraph, so the text update cannot anchor;
    // the list insertion still can.
    let mut target = jsonml(r#"["doc", ["ul", ["li", "a"], ["li", "c"]]]"#);
    let report = apply(
        &mut target,
        &delta,
        ApplyMode::BestEffort,
        &ResolverConfig::default(),
    )
    .unwrap();
    assert_eq!(report.applied, 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(
        jsonml_value(&target),
        json!(["doc", ["ul", ["li", "a"], ["li", "b"], ["li", "c"]]])
    );
}

#[test]
fn structural_round_trip_on_larger_document() {
    let a = jsonml(
        r#"["html",
            ["head", ["title", "Page"]],
            ["body",
              ["h1", "Header"],
              ["ul", ["li", "one"], ["li", "two"], ["li", "three"]],
              ["p", {"class": "fine"}, "closing words"]]]"#,
    );
    let b = jsonml(
        r#"["html",
            ["head", ["title", "Page!"]],
            ["body",
              ["h1", "Header"],
              ["ul", ["li", "one"], ["li", "2"], ["li", "three"], ["li", "four"]],
              ["hr"],
              ["p", {"class": "fine"}, "closing words"]]]"#,
    );

    let delta = diff(&a, &b, DEFAULT_RADIUS).unwrap();
    let mut target = jsonml(
        r#"["html",
            ["head", ["title", "Page"]],
            ["body",
              ["h1", "Header"],
              ["ul", ["li", "one"], ["li", "two"], ["li", "three"]],
              ["p", {"class": "fine"}, "closing words"]]]"#,
    );
    apply_strict(&mut target, &delta);
    assert_eq!(jsonml_value(&target), jsonml_value(&b));
}
