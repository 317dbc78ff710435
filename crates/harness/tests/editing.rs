use statute_core::{
    operations::OperationPayload, template::BatchSpec, CoreError, NodeField, NodeType,
};
use statute_engine::{EditorConfig, EngineError};
use statute_harness::{init_tracing, TestEditor};

// ============================================================================
// Undo restores the exact prior tree
// ============================================================================

#[test]
fn every_mutation_undoes_to_the_prior_tree() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let mut ed = TestEditor::new()?;
    let general = ed.id("General")?;
    let offences = ed.id("Offences")?;
    let preliminary = ed.id("Preliminary")?;
    let interpretation = ed.id("Interpretation")?;

    let steps: Vec<Box<dyn Fn(&mut TestEditor) -> Result<(), EngineError>>> = vec![
        Box::new(move |ed| ed.session.add_child(offences, NodeType::Chapter).map(drop)),
        Box::new(move |ed| ed.session.add_sibling(general).map(drop)),
        Box::new(move |ed| ed.session.duplicate(preliminary).map(drop)),
        Box::new(move |ed| ed.session.delete(interpretation).map(drop)),
        Box::new(move |ed| ed.session.move_down(general).map(drop)),
        Box::new(move |ed| ed.session.move_up(offences).map(drop)),
        Box::new(move |ed| ed.session.move_to_parent(preliminary, offences)),
        Box::new(move |ed| ed.session.rename(general, "Preliminary matters").map(drop)),
        Box::new(move |ed| {
            ed.session
                .edit(interpretation, vec![(NodeField::Number, Some("1A".into()))])
                .map(drop)
        }),
        Box::new(move |ed| ed.session.add_template(offences, "multi_set_chapter").map(drop)),
        Box::new(move |ed| {
            let specs = BatchSpec::series(NodeType::Chapter, "Division", 2, None);
            ed.session.add_batch(offences, &specs).map(drop)
        }),
    ];

    for (i, step) in steps.iter().enumerate() {
        let tree_before = ed.session.tree().clone();
        let ledger_before = ed.session.ledger().clone();
        step(&mut ed)?;
        assert_ne!(ed.session.tree(), &tree_before, "step {i} changed nothing");
        ed.session.undo()?;
        assert_eq!(ed.session.tree(), &tree_before, "step {i} did not undo cleanly");
        assert_eq!(ed.session.ledger(), &ledger_before, "step {i} left ledger entries");
    }
    assert!(ed.session.undo_log().is_empty());
    Ok(())
}

#[test]
fn undo_unwinds_in_reverse_order() -> Result<(), Box<dyn std::error::Error>> {
    let mut ed = TestEditor::new()?;
    let original = ed.session.tree().clone();
    let offences = ed.id("Offences")?;

    let chapter = ed.session.add_child(offences, NodeType::Chapter)?;
    let set = ed.session.add_child(chapter, NodeType::Set)?;
    ed.session.rename(set, "Speeding")?;
    ed.session.duplicate(set)?;

    assert_eq!(ed.session.undo()?, Some("duplicate"));
    assert_eq!(ed.session.undo()?, Some("edit"));
    assert_eq!(ed.session.undo()?, Some("add_child"));
    assert_eq!(ed.session.undo()?, Some("add_child"));
    assert_eq!(ed.session.undo()?, None);
    assert_eq!(ed.session.tree(), &original);
    Ok(())
}

#[test]
fn undo_log_is_bounded() -> Result<(), Box<dyn std::error::Error>> {
    let mut ed = TestEditor::with_config(EditorConfig {
        undo_capacity: 3,
        ..EditorConfig::default()
    })?;
    let offences = ed.id("Offences")?;
    for _ in 0..5 {
        ed.session.add_child(offences, NodeType::Chapter)?;
    }
    assert_eq!(ed.session.undo_log().len(), 3);
    for _ in 0..3 {
        ed.session.undo()?;
    }
    assert_eq!(ed.child_names(offences).len(), 2);
    Ok(())
}

// ============================================================================
// Delete and the ledger
// ============================================================================

#[test]
fn deleting_a_persisted_subtree_ledgers_every_saved_node() -> Result<(), Box<dyn std::error::Error>> {
    let mut ed = TestEditor::new()?;
    let interpretation = ed.id("Interpretation")?;
    // one new child that was never saved
    ed.session.add_child(interpretation, NodeType::Subsection)?;

    let stats = ed.session.delete(interpretation)?;
    assert_eq!(stats.descendants, 3);
    assert_eq!(stats.with_content, 1);
    // the section and its two saved subsections; the new one is not ledgered
    assert_eq!(ed.session.ledger().len(), 3);
    assert!(ed.session.ledger().contains(interpretation));
    assert!(ed.session.ledger().items().iter().all(|i| i.id.is_persisted()));

    ed.session.undo()?;
    assert!(ed.session.ledger().is_empty());
    Ok(())
}

#[test]
fn deleting_the_root_is_refused() -> Result<(), Box<dyn std::error::Error>> {
    let mut ed = TestEditor::new()?;
    let root = ed.statute_id();
    let err = ed.session.delete(root).unwrap_err();
    assert!(matches!(err, EngineError::Core(CoreError::RootImmutable(_))));
    assert!(ed.session.undo_log().is_empty());
    Ok(())
}

// ============================================================================
// Structural rules
// ============================================================================

#[test]
fn cross_family_children_are_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let mut ed = TestEditor::new()?;
    let forms = ed.id("Forms")?;
    let general = ed.id("General")?;
    let before = ed.session.tree().clone();

    assert!(matches!(
        ed.session.add_child(forms, NodeType::Chapter),
        Err(EngineError::Core(CoreError::InvalidChildType { .. }))
    ));
    assert!(matches!(
        ed.session.add_child(general, NodeType::SchChapter),
        Err(EngineError::Core(CoreError::InvalidChildType { .. }))
    ));
    let leaf = ed.id("Meaning of road")?;
    assert!(matches!(
        ed.session.add_child(leaf, NodeType::Subsection),
        Err(EngineError::Core(CoreError::LeafNode(NodeType::Subsection)))
    ));
    assert_eq!(
        ed.session.validate_add(leaf, NodeType::Subsection),
        vec!["Subsection cannot have child components.".to_string()]
    );
    assert_eq!(ed.session.tree(), &before);
    assert!(ed.session.undo_log().is_empty());
    Ok(())
}

#[test]
fn dropping_onto_a_descendant_is_a_no_op() -> Result<(), Box<dyn std::error::Error>> {
    let mut ed = TestEditor::new()?;
    let preliminary = ed.id("Preliminary")?;
    let definitions = ed.id("Definitions")?;
    let before = ed.session.tree().clone();

    assert!(ed.session.can_drop(preliminary, definitions).is_err());
    assert!(ed.session.move_to_parent(preliminary, definitions).is_err());
    assert_eq!(ed.session.tree(), &before);
    assert!(ed.session.undo_log().is_empty());
    Ok(())
}

#[test]
fn reparent_appends_and_marks() -> Result<(), Box<dyn std::error::Error>> {
    let mut ed = TestEditor::new()?;
    let preliminary = ed.id("Preliminary")?;
    let offences = ed.id("Offences")?;
    let extra = ed.session.add_child(offences, NodeType::Chapter)?;

    ed.session.move_to_parent(preliminary, offences)?;
    let children = &ed.session.node(offences).ok_or("offences")?.children;
    assert_eq!(children[0].id, extra);
    assert_eq!(children[1].id, preliminary);
    assert!(children[1].order_changed);

    let Some(record) = ed.session.undo_log().peek() else {
        return Err("no record".into());
    };
    assert!(matches!(
        record.payload,
        OperationPayload::MoveToParent { new_index: 1, old_index: 0, .. }
    ));
    Ok(())
}

#[test]
fn boundary_moves_record_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let mut ed = TestEditor::new()?;
    let general = ed.id("General")?;
    let forms = ed.id("Forms")?;
    assert!(!ed.session.move_up(general)?);
    assert!(!ed.session.move_down(forms)?);
    assert!(ed.session.undo_log().is_empty());
    assert!(!ed.session.is_dirty());
    Ok(())
}

// ============================================================================
// Naming and numbering
// ============================================================================

#[test]
fn new_nodes_get_next_number_and_default_name() -> Result<(), Box<dyn std::error::Error>> {
    let mut ed = TestEditor::new()?;
    let definitions = ed.id("Definitions")?;
    let section = ed.session.add_child(definitions, NodeType::Section)?;
    let node = ed.session.node(section).ok_or("section")?;
    assert_eq!(node.number.as_deref(), Some("3"));
    // two sections already exist
    assert_eq!(node.name, "Pseudo 3");
    assert_eq!(node.display_name(), "3. Pseudo 3");

    let offences = ed.id("Offences")?;
    let chapter = ed.session.add_child(offences, NodeType::Chapter)?;
    assert_eq!(ed.session.node(chapter).ok_or("chapter")?.name, "Pseudo");
    assert_eq!(ed.session.node(chapter).ok_or("chapter")?.number.as_deref(), Some("1"));
    Ok(())
}

#[test]
fn duplicates_get_copy_names_and_fresh_ids() -> Result<(), Box<dyn std::error::Error>> {
    let mut ed = TestEditor::new()?;
    let interpretation = ed.id("Interpretation")?;
    let first = ed.session.duplicate(interpretation)?;
    let second = ed.session.duplicate(interpretation)?;

    let set = ed.id("Definitions")?;
    assert_eq!(
        ed.child_names(set),
        vec![
            "Interpretation",
            "Interpretation (Copy 2)",
            "Interpretation (Copy)",
            "Application",
        ]
    );
    let copy = ed.session.node(first).ok_or("copy")?;
    assert_eq!(copy.children.len(), 2);
    let mut ids = Vec::new();
    copy.walk(&mut |n| ids.push(n.id));
    assert!(ids.iter().all(|id| id.is_temporary()));
    assert_ne!(first, second);
    // content travels with the copy
    assert_eq!(
        copy.children[0].content.as_deref(),
        Some("In this Act, road includes any highway.")
    );
    Ok(())
}

#[test]
fn renumber_follows_position() -> Result<(), Box<dyn std::error::Error>> {
    let mut ed = TestEditor::new()?;
    let set = ed.id("Definitions")?;
    let application = ed.id("Application")?;
    ed.session.move_up(application)?;
    assert_eq!(ed.session.renumber_children(set)?, 2);
    let numbers: Vec<_> = ed
        .session
        .node(set)
        .ok_or("set")?
        .children
        .iter()
        .map(|c| c.number.clone().unwrap_or_default())
        .collect();
    assert_eq!(numbers, vec!["1", "2"]);
    assert_eq!(ed.session.node(application).ok_or("app")?.number.as_deref(), Some("1"));
    Ok(())
}

// ============================================================================
// Selection and statistics
// ============================================================================

#[test]
fn selection_survives_undo_of_its_node() -> Result<(), Box<dyn std::error::Error>> {
    let mut ed = TestEditor::new()?;
    let offences = ed.id("Offences")?;
    let chapter = ed.session.add_child(offences, NodeType::Chapter)?;
    assert_eq!(ed.session.selected().map(|n| n.id), Some(chapter));
    ed.session.undo()?;
    assert!(ed.session.selected().is_none());
    Ok(())
}

#[test]
fn stats_count_new_and_content_nodes() -> Result<(), Box<dyn std::error::Error>> {
    let mut ed = TestEditor::new()?;
    let stats = ed.session.tree_stats();
    assert_eq!(stats.total_nodes, 10);
    assert_eq!(stats.max_depth, 5);
    assert_eq!(stats.unsaved_nodes, 0);
    assert_eq!(stats.nodes_with_content, 1);

    let offences = ed.id("Offences")?;
    ed.session.add_template(offences, "multi_set_chapter")?;
    assert!(ed.session.tree_stats().unsaved_nodes > 0);

    let general = ed.id("General")?;
    let node = ed.session.node_stats(general)?;
    assert_eq!(node.direct_children, 1);
    assert_eq!(node.total_descendants, 6);
    assert_eq!(node.descendants_with_content, 1);
    assert!(node.is_saved);
    Ok(())
}
