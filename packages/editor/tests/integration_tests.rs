//! Integration tests for the editor crate

use pretty_assertions::assert_eq;
use quire_dom::{parse, Serializer};
use quire_editor::{
    CommitOptions, Document, Edit, EditSession, EditorEvent, EventBus, NodeId, WizardRequest,
};

const SCENARIO: &str = r#"<Parent><Element><ChildElement a="1"/></Element></Parent>"#;

fn canonical(doc: &Document) -> String {
    Serializer::new().sort_attributes(true).serialize(doc)
}

fn find(session: &EditSession, name: &str) -> NodeId {
    session
        .document()
        .unwrap()
        .elements_by_name(name)
        .next()
        .unwrap_or_else(|| panic!("Expected <{}>", name))
}

#[test]
fn test_move_scenario_undo_restores_child() {
    let mut session = EditSession::new();
    session.open_source("scenario.xml", SCENARIO).unwrap();
    let element = find(&session, "Element");
    let child = find(&session, "ChildElement");

    let moved = Edit::compound([Edit::remove(child), Edit::insert(element, child, None)]);
    session.commit(moved, CommitOptions::titled("move")).unwrap();
    assert_eq!(session.history().undo_title(), Some("move"));

    session.undo(1).unwrap();

    let doc = session.document().unwrap();
    assert_eq!(doc.children(element), &[child]);
    assert_eq!(doc.attribute(child, "a"), Some("1"));
    assert_eq!(canonical(doc), SCENARIO);
}

#[test]
fn test_truncation_discards_redo_branch() {
    let mut session = EditSession::new();
    session.open_source("doc.xml", "<a><b/></a>").unwrap();
    let b = find(&session, "b");

    session.commit(Edit::set_attribute(b, "v", Some("A")), CommitOptions::titled("A")).unwrap();
    session.commit(Edit::set_attribute(b, "v", Some("B")), CommitOptions::titled("B")).unwrap();
    session.undo(1).unwrap();
    session.commit(Edit::set_attribute(b, "v", Some("C")), CommitOptions::titled("C")).unwrap();

    let titles: Vec<_> = session
        .history()
        .entries()
        .iter()
        .map(|e| e.title.as_deref().unwrap())
        .collect();
    assert_eq!(titles, vec!["A", "C"]);

    session.undo(2).unwrap();
    assert_eq!(session.redo(5).unwrap(), 2);
    assert_eq!(session.document().unwrap().attribute(b, "v"), Some("C"));
}

#[test]
fn test_squash_single_undo_reverts_both() {
    let mut session = EditSession::new();
    session.open_source("doc.xml", SCENARIO).unwrap();
    let before = canonical(session.document().unwrap());
    let parent = find(&session, "Parent");
    let child = find(&session, "ChildElement");

    session.commit(Edit::set_attribute(child, "a", Some("2")), CommitOptions::default()).unwrap();
    session.commit(Edit::insert(parent, child, None), CommitOptions::squash()).unwrap();

    assert_eq!(session.history().len(), 1);
    session.undo(1).unwrap();
    assert_eq!(canonical(session.document().unwrap()), before);
}

#[test]
fn test_created_node_survives_undo_redo_cycles() {
    let mut session = EditSession::new();
    session.open_source("doc.xml", "<Substation name=\"AA1\"/>").unwrap();
    let substation = find(&session, "Substation");

    let mut factory = session.node_factory().unwrap();
    let level = factory.create_element("VoltageLevel");
    let text = factory.create_text("note");

    session
        .commit(
            Edit::compound([
                Edit::insert(substation, level, None),
                Edit::set_attribute(level, "name", Some("E1")),
                Edit::insert(level, text, None),
            ]),
            CommitOptions::titled("Add voltage level"),
        )
        .unwrap();
    session
        .commit(Edit::set_text_content(level, "renamed"), CommitOptions::default())
        .unwrap();

    let after = canonical(session.document().unwrap());
    for _ in 0..3 {
        session.undo(2).unwrap();
        assert_eq!(
            canonical(session.document().unwrap()),
            r#"<Substation name="AA1"/>"#
        );
        session.redo(2).unwrap();
        assert_eq!(canonical(session.document().unwrap()), after);
    }
}

#[test]
fn test_mixed_content_text_replacement_survives_redo() {
    let mut session = EditSession::new();
    session.open_source("doc.xml", "<a><b>x<c/>y</b></a>").unwrap();
    let b = find(&session, "b");
    let original = canonical(session.document().unwrap());

    session.commit(Edit::set_text_content(b, "flat"), CommitOptions::default()).unwrap();
    session.commit(Edit::set_text_content(b, "flatter"), CommitOptions::default()).unwrap();

    for _ in 0..2 {
        session.undo(2).unwrap();
        assert_eq!(canonical(session.document().unwrap()), original);
        session.redo(2).unwrap();
        assert_eq!(canonical(session.document().unwrap()), "<a><b>flatter</b></a>");
    }
}

#[test]
fn test_wizard_events_fifo_and_lifo() {
    let mut session = EditSession::new();
    let (bus, mut rx) = EventBus::<EditorEvent>::channel();
    let [x, y, z] = [NodeId(1), NodeId(2), NodeId(3)];

    bus.dispatch(EditorEvent::Wizard(WizardRequest::edit(x)));
    bus.dispatch(EditorEvent::Wizard(WizardRequest::edit(y)));
    bus.dispatch(EditorEvent::Wizard(WizardRequest::edit(z).nested()));
    session.drain(&mut rx);

    assert_eq!(session.active_wizard(), Some(&WizardRequest::edit(z).nested()));

    bus.dispatch(EditorEvent::CloseWizard(WizardRequest::edit(z).nested()));
    session.drain(&mut rx);
    assert_eq!(session.active_wizard(), Some(&WizardRequest::edit(x)));

    bus.dispatch(EditorEvent::CloseWizard(WizardRequest::edit(x)));
    session.drain(&mut rx);
    assert_eq!(session.active_wizard(), Some(&WizardRequest::edit(y)));
}

#[test]
fn test_invalid_edit_keeps_session_usable() {
    let mut session = EditSession::new();
    session.open_source("doc.xml", SCENARIO).unwrap();
    let child = find(&session, "ChildElement");
    let detached = session.node_factory().unwrap().create_element("Loose");

    assert!(session
        .commit(Edit::set_attribute(detached, "x", Some("1")), CommitOptions::default())
        .is_err());
    assert_eq!(session.edit_count(), 0);

    session.commit(Edit::remove(child), CommitOptions::default()).unwrap();
    assert_eq!(session.edit_count(), 1);
}

#[test]
fn test_edit_script_round_trip_through_json() {
    let script = r#"[
        {"SetAttributes": {"element": 3, "attributes": {"a": "9", "b": null}}},
        {"Remove": {"node": 3}},
        {"Insert": {"parent": 1, "node": 3}}
    ]"#;
    let edits: Vec<Edit> = serde_json::from_str(script).unwrap();
    let mut doc = parse(SCENARIO).unwrap();

    let inverses: Vec<Edit> = edits.iter().map(|e| e.apply(&mut doc).unwrap()).collect();
    assert_eq!(
        canonical(&doc),
        r#"<Parent><Element/><ChildElement a="9"/></Parent>"#
    );

    for inverse in inverses.iter().rev() {
        inverse.apply(&mut doc).unwrap();
    }
    assert_eq!(canonical(&doc), SCENARIO);
}

#[test]
fn test_undo_child_rescued_from_removed_wrapper() {
    let mut session = EditSession::new();
    session.open_source("scenario.xml", SCENARIO).unwrap();
    let parent = find(&session, "Parent");
    let element = find(&session, "Element");
    let child = find(&session, "ChildElement");

    session.commit(Edit::remove(element), CommitOptions::titled("unwrap")).unwrap();
    session
        .commit(Edit::insert(parent, child, None), CommitOptions::titled("rescue"))
        .unwrap();
    assert_eq!(
        canonical(session.document().unwrap()),
        r#"<Parent><ChildElement a="1"/></Parent>"#
    );

    assert_eq!(session.undo(2).unwrap(), 2);
    assert_eq!(session.edit_count(), 0);
    assert_eq!(canonical(session.document().unwrap()), SCENARIO);

    assert_eq!(session.redo(2).unwrap(), 2);
    assert_eq!(
        canonical(session.document().unwrap()),
        r#"<Parent><ChildElement a="1"/></Parent>"#
    );
}

#[test]
fn test_undo_compound_unwrap() {
    let mut session = EditSession::new();
    session.open_source("scenario.xml", SCENARIO).unwrap();
    let parent = find(&session, "Parent");
    let element = find(&session, "Element");
    let child = find(&session, "ChildElement");

    let unwrap = Edit::compound([Edit::remove(element), Edit::insert(parent, child, None)]);
    session.commit(unwrap, CommitOptions::titled("unwrap")).unwrap();

    assert_eq!(session.undo(1).unwrap(), 1);
    let doc = session.document().unwrap();
    assert_eq!(canonical(doc), SCENARIO);
    assert_eq!(doc.children(element), &[child]);
}

#[test]
fn test_failed_compound_after_unwrap_leaves_document_untouched() {
    let mut session = EditSession::new();
    session.open_source("scenario.xml", SCENARIO).unwrap();
    let parent = find(&session, "Parent");
    let element = find(&session, "Element");
    let child = find(&session, "ChildElement");

    let edit = Edit::compound([
        Edit::remove(element),
        Edit::insert(parent, child, None),
        Edit::remove(NodeId(99)),
    ]);
    assert!(session.commit(edit, CommitOptions::default()).is_err());

    assert_eq!(session.edit_count(), 0);
    assert_eq!(canonical(session.document().unwrap()), SCENARIO);
}

