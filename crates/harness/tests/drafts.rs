use statute_core::{Clock, NodeType};
use statute_engine::draft::{check_draft, restore_draft};
use statute_engine::{Autosaver, DiscardReason, DraftStatus, EditorConfig};
use statute_harness::TestEditor;
use statute_storage::DraftStore;

#[test]
fn unsaved_work_survives_a_reopen() -> Result<(), Box<dyn std::error::Error>> {
    let mut ed = TestEditor::new()?;
    let mut autosaver = Autosaver::new(&ed.config);
    let offences = ed.id("Offences")?;
    let general = ed.id("General")?;
    let chapter = ed.session.add_child(offences, NodeType::Chapter)?;
    ed.session.rename(chapter, "Speeding")?;
    ed.session.delete(general)?;

    let now = ed.clock.now_ms()?;
    assert!(autosaver.tick(ed.endpoint.storage_mut(), &ed.session, now)?);
    let edited = ed.session.tree().clone();
    let ledger = ed.session.ledger().clone();

    // editor closed without saving; the store still has the old tree
    let mut reopened = ed.reopen()?;
    assert_ne!(reopened.tree(), &edited);

    ed.clock.advance(60_000);
    let status = check_draft(
        ed.endpoint.storage_mut(),
        reopened.statute_id(),
        ed.clock.now_ms()?,
        ed.config.draft_max_age_ms(),
    )?;
    let snapshot = match status {
        DraftStatus::Available(snapshot) => snapshot,
        other => return Err(format!("expected a draft, got {other:?}").into()),
    };
    restore_draft(&mut reopened, snapshot)?;
    assert_eq!(reopened.tree(), &edited);
    assert_eq!(reopened.ledger(), &ledger);
    assert!(reopened.is_dirty());

    // ids handed out after a restore never collide with the draft's
    let next = reopened.add_child(offences, NodeType::Chapter)?;
    assert!(next < chapter);

    ed.session = reopened;
    ed.save()?;
    let statute_id = ed.statute_id();
    autosaver.saved(ed.endpoint.storage_mut(), statute_id)?;
    assert!(ed.storage().get_draft(ed.statute_id())?.is_none());

    let stored = ed.stored_tree()?;
    let names: Vec<_> = stored.children.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Offences", "Forms"]);
    assert_eq!(stored.children[0].children[0].name, "Speeding");
    Ok(())
}

#[test]
fn day_old_draft_is_discarded_unprompted() -> Result<(), Box<dyn std::error::Error>> {
    let mut ed = TestEditor::with_config(EditorConfig {
        draft_max_age_secs: 3_600,
        ..EditorConfig::default()
    })?;
    let mut autosaver = Autosaver::new(&ed.config);
    let offences = ed.id("Offences")?;
    ed.session.add_child(offences, NodeType::Chapter)?;
    autosaver.tick(ed.endpoint.storage_mut(), &ed.session, ed.clock.now_ms()?)?;

    ed.clock.advance(3_600 * 1_000);
    let statute_id = ed.statute_id();
    let status = check_draft(
        ed.endpoint.storage_mut(),
        statute_id,
        ed.clock.now_ms()?,
        ed.config.draft_max_age_ms(),
    )?;
    assert_eq!(status, DraftStatus::Discarded(DiscardReason::Stale));
    assert!(ed.storage().get_draft(ed.statute_id())?.is_none());
    Ok(())
}

#[test]
fn clean_session_writes_no_draft() -> Result<(), Box<dyn std::error::Error>> {
    let mut ed = TestEditor::new()?;
    let mut autosaver = Autosaver::new(&ed.config);
    assert!(!autosaver.tick(ed.endpoint.storage_mut(), &ed.session, ed.clock.now_ms()?)?);
    assert!(ed.storage().get_draft(ed.statute_id())?.is_none());
    Ok(())
}
