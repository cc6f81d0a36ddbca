//! End-to-end tests over the public model API

use std::sync::Arc;

use fieldmark_model::{
    AttrValidator, AttributeSpec, Attrs, Assoc, DomNode, EditorState, ModelError, Node, NodeSpec,
    Schema,
};
use serde_json::json;

fn schema_with_badge() -> Arc<Schema> {
    let schema = Schema::basic_builder()
        .node(
            "badge",
            NodeSpec::inline_leaf().with_attr(
                "tone",
                AttributeSpec::with_default("info")
                    .validated(AttrValidator::types("string").unwrap()),
            ),
        )
        .build()
        .unwrap();
    Arc::new(schema)
}

fn state(schema: Arc<Schema>) -> EditorState {
    EditorState::from_json(
        schema,
        &json!({
            "type": "doc",
            "content": [
                { "type": "paragraph", "content": [
                    { "type": "text", "text": "one " },
                    { "type": "badge" },
                    { "type": "text", "text": " two" }
                ]},
                { "type": "paragraph", "content": [
                    { "type": "badge", "attrs": { "tone": "warn" } }
                ]}
            ]
        }),
    )
    .unwrap()
}

#[test]
fn test_defaults_fill_on_parse() {
    let state = state(schema_with_badge());
    let badge = state.doc().node_at(5).unwrap();
    assert_eq!(badge.type_name(), "badge");
    assert_eq!(badge.attr("tone"), Some(&json!("info")));
}

#[test]
fn test_validator_rejects_wrong_type() {
    let schema = schema_with_badge();
    let err = EditorState::from_json(
        schema,
        &json!({
            "type": "doc",
            "content": [{ "type": "paragraph", "content": [
                { "type": "badge", "attrs": { "tone": 3 } }
            ]}]
        }),
    )
    .unwrap_err();
    assert!(matches!(err, ModelError::InvalidAttribute { .. }));
}

#[test]
fn test_batch_of_deletes_through_mapping() {
    let state = state(schema_with_badge());

    // collect both badges against the base document
    let mut targets = Vec::new();
    state.doc().descendants(&mut |node: &Node, pos, _, _| {
        if node.type_name() == "badge" {
            targets.push((pos, node.node_size()));
        }
        true
    });
    assert_eq!(targets, vec![(5, 1), (12, 1)]);

    let mut tr = state.tr();
    for (pos, size) in targets {
        let from = tr.mapping().map(pos);
        let to = tr.mapping().map(pos + size);
        tr.delete(from, to).unwrap();
    }

    let next = state.apply(&tr).unwrap();
    let mut remaining = 0;
    next.doc().descendants(&mut |node: &Node, _, _, _| {
        if node.type_name() == "badge" {
            remaining += 1;
        }
        true
    });
    assert_eq!(remaining, 0);
    assert_eq!(next.doc().child(0).unwrap().text_content(), "one  two");
    assert_eq!(next.version, 1);
}

#[test]
fn test_set_node_markup_keeps_positions() {
    let state = state(schema_with_badge());
    let mut tr = state.tr();
    let mut attrs = Attrs::new();
    attrs.insert("tone".to_string(), json!("error"));
    tr.set_node_markup(5, attrs).unwrap();
    assert_eq!(tr.mapping().map_with(12, Assoc::Before), 12);
    assert_eq!(tr.doc().node_at(5).unwrap().attr("tone"), Some(&json!("error")));
}

#[test]
fn test_json_round_trip_through_state() {
    let state = state(schema_with_badge());
    let copy = EditorState::from_json(state.schema().clone(), &state.to_json()).unwrap();
    assert_eq!(copy.doc(), state.doc());
}

#[test]
fn test_dom_description_renders() {
    let node = DomNode::element("p")
        .with_child(DomNode::text("one "))
        .with_child(DomNode::element("span").with_attr("data-tone", "info"));
    assert_eq!(node.to_html(), "<p>one <span data-tone=\"info\"></span></p>");
    assert_eq!(node.text_content(), "one ");
}
