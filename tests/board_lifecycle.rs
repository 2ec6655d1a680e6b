use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use serde_json::Value;
use startnotes::{
    parse_tags, Config, DirectoryStore, EmptyTrash, KeyValueStore, ManualClock, MemoryStore,
    NewNote, NoteBoard, NotePatch, NotesError, Outcome, Result, ViewSelector,
};
use tempfile::TempDir;

fn yes(_: &str) -> bool {
    true
}

fn no(_: &str) -> bool {
    false
}

fn draft(title: &str, text: &str) -> NewNote {
    NewNote {
        title: title.into(),
        text: text.into(),
        ..NewNote::default()
    }
}

fn open(backend: Arc<dyn KeyValueStore>, clock: &Arc<ManualClock>) -> NoteBoard {
    NoteBoard::open(backend, &Config::default(), clock.clone()).unwrap()
}

fn stored_notes(backend: &dyn KeyValueStore) -> Vec<Value> {
    let raw = backend.get("startNotesData").unwrap().unwrap();
    serde_json::from_str(&raw).unwrap()
}

/// Counts writes to the wrapped store
struct CountingStore {
    inner: MemoryStore,
    writes: AtomicUsize,
}

impl KeyValueStore for CountingStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.inner.remove(key)
    }
}

#[test]
fn tag_input_round_trips_through_join() {
    let tags = parse_tags(" Work, ideas ,,2024 ");
    assert_eq!(tags, vec!["work", "ideas", "2024"]);
    assert_eq!(parse_tags(&tags.join(",")), tags);
}

#[test]
fn unchanged_edit_neither_bumps_time_nor_writes() {
    let store = Arc::new(CountingStore {
        inner: MemoryStore::new(),
        writes: AtomicUsize::new(0),
    });
    let clock = Arc::new(ManualClock::new(10_000));
    let mut board = open(store.clone(), &clock);

    let id = board.add_note(draft("X", "hello")).unwrap();
    let writes = store.writes.load(Ordering::SeqCst);
    clock.advance(5_000);

    let token = board.begin_edit(id).unwrap();
    let patch = NotePatch::new().title("X").text("hello").tags(vec![]);
    assert!(!board.save_edit(token, &patch).unwrap());

    assert_eq!(board.note(id).unwrap().last_modified, 10_000);
    assert_eq!(store.writes.load(Ordering::SeqCst), writes);
}

#[test]
fn blanking_edit_is_rejected() {
    let backend = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(1_000));
    let mut board = open(backend.clone(), &clock);
    let id = board.add_note(draft("X", "hello")).unwrap();

    let token = board.begin_edit(id).unwrap();
    let result = board.save_edit(token, &NotePatch::new().title("").text(""));
    assert!(matches!(result, Err(NotesError::ValidationRejected { .. })));

    let note = board.note(id).unwrap();
    assert_eq!((note.title.as_str(), note.text.as_str()), ("X", "hello"));
    let stored = stored_notes(backend.as_ref());
    assert_eq!(stored[0]["title"], "X");
    assert_eq!(stored[0]["text"], "hello");
}

#[test]
fn archive_and_trash_clear_pins_and_never_overlap() {
    let clock = Arc::new(ManualClock::new(1_000));
    let mut board = open(Arc::new(MemoryStore::new()), &clock);

    let a = board.add_note(draft("a", "")).unwrap();
    let b = board.add_note(draft("b", "")).unwrap();
    board.toggle_pin(a).unwrap();
    board.toggle_pin(b).unwrap();

    board.archive(a).unwrap();
    assert!(board.note(a).unwrap().status.is_archived());
    assert!(!board.note(a).unwrap().status.is_pinned());

    assert_eq!(board.trash(b, &yes).unwrap(), Outcome::Applied);
    assert!(!board.note(b).unwrap().status.is_pinned());

    assert_eq!(board.trash(a, &yes).unwrap(), Outcome::Applied);
    for note in board.notes() {
        assert!(!(note.status.is_archived() && note.status.is_trashed()));
    }
}

#[test]
fn trash_then_restore_returns_to_active() {
    let backend = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(1_000));
    let mut board = open(backend.clone(), &clock);

    let plain = board.add_note(draft("plain", "")).unwrap();
    let archived = board.add_note(draft("archived", "")).unwrap();
    board.archive(archived).unwrap();

    for id in [plain, archived] {
        clock.advance(1_000);
        board.trash(id, &yes).unwrap();
        assert_eq!(board.note(id).unwrap().status.deleted_at(), Some(clock_now(&clock)));
        board.restore(id).unwrap();
        assert!(board.note(id).unwrap().status.is_active());
    }

    for record in stored_notes(backend.as_ref()) {
        assert_eq!(record["deleted"], false);
        assert_eq!(record["archived"], false);
        assert!(record["deletedTimestamp"].is_null());
    }
}

fn clock_now(clock: &ManualClock) -> i64 {
    use startnotes::Clock;
    clock.now_millis()
}

#[test]
fn views_partition_the_collection() {
    let clock = Arc::new(ManualClock::new(1_000));
    let mut board = open(Arc::new(MemoryStore::new()), &clock);

    let ids: Vec<_> = (0..6)
        .map(|i| board.add_note(draft(&format!("n{}", i), "")).unwrap())
        .collect();
    board.archive(ids[0]).unwrap();
    board.archive(ids[1]).unwrap();
    board.trash(ids[1], &yes).unwrap();
    board.trash(ids[2], &yes).unwrap();
    board.toggle_pin(ids[3]).unwrap();

    let mut seen = Vec::new();
    for view in [ViewSelector::ALL, ViewSelector::Archive, ViewSelector::Trash] {
        board.set_view(view);
        seen.extend(board.visible_notes().iter().map(|n| n.id));
    }
    seen.sort_unstable();
    let mut all = ids.clone();
    all.sort_unstable();
    assert_eq!(seen, all);
}

#[test]
fn pinned_notes_lead_the_active_view_in_order() {
    let clock = Arc::new(ManualClock::new(1_000));
    let mut board = open(Arc::new(MemoryStore::new()), &clock);

    // Inserted at the head, so canonical order ends up A, B, C
    let c = board.add_note(draft("C", "")).unwrap();
    let b = board.add_note(draft("B", "")).unwrap();
    let a = board.add_note(draft("A", "")).unwrap();
    board.toggle_pin(a).unwrap();
    board.toggle_pin(c).unwrap();

    let shown: Vec<_> = board.visible_notes().iter().map(|n| n.id).collect();
    assert_eq!(shown, vec![a, c, b]);
}

#[test]
fn tag_search_matches_whole_tags_only() {
    let clock = Arc::new(ManualClock::new(1_000));
    let mut board = open(Arc::new(MemoryStore::new()), &clock);

    let work = board
        .add_note(NewNote {
            tags: vec!["Work".into()],
            ..draft("report", "")
        })
        .unwrap();
    board
        .add_note(NewNote {
            tags: vec!["homework".into()],
            ..draft("maths", "")
        })
        .unwrap();

    board.set_search("#work");
    let shown: Vec<_> = board.visible_notes().iter().map(|n| n.id).collect();
    assert_eq!(shown, vec![work]);

    board.set_search("work");
    assert_eq!(board.visible_notes().len(), 2);
}

#[test]
fn reorder_keeps_archived_notes_behind() {
    let backend = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(1_000));
    let mut board = open(backend.clone(), &clock);

    let n4 = board.add_note(draft("N4", "")).unwrap();
    let n3 = board.add_note(draft("N3", "")).unwrap();
    let n2 = board.add_note(draft("N2", "")).unwrap();
    let n1 = board.add_note(draft("N1", "")).unwrap();
    board.archive(n4).unwrap();

    board.reorder(&[n3, n1, n2]).unwrap();

    let order: Vec<_> = board.notes().iter().map(|n| n.id).collect();
    assert_eq!(order, vec![n3, n1, n2, n4]);
    let stored: Vec<_> = stored_notes(backend.as_ref())
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect();
    assert_eq!(stored, order);
}

#[test]
fn quota_failure_keeps_the_change_in_memory_only() {
    let backend = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(1_000));
    let mut board = open(backend.clone(), &clock);
    let id = board.add_note(draft("X", "hello")).unwrap();

    backend.set_quota(Some(16)).unwrap();
    assert!(matches!(
        board.toggle_pin(id),
        Err(NotesError::StorageQuotaExceeded { .. })
    ));

    assert!(board.note(id).unwrap().status.is_pinned());
    assert_eq!(stored_notes(backend.as_ref())[0]["pinned"], false);
}

#[test]
fn duplicate_notebook_names_are_rejected_ignoring_case() {
    let clock = Arc::new(ManualClock::new(1_000));
    let mut board = open(Arc::new(MemoryStore::new()), &clock);

    board.add_notebook("work").unwrap();
    assert!(matches!(
        board.add_notebook("Work"),
        Err(NotesError::DuplicateNotebookName { .. })
    ));
    assert_eq!(board.notebooks().len(), 1);
}

#[test]
fn permanent_delete_only_from_the_trash() {
    let clock = Arc::new(ManualClock::new(1_000));
    let mut board = open(Arc::new(MemoryStore::new()), &clock);
    let id = board.add_note(draft("gone", "")).unwrap();

    assert!(matches!(
        board.delete_permanently(id, &yes),
        Err(NotesError::InvalidTransition { .. })
    ));

    board.trash(id, &yes).unwrap();
    assert_eq!(board.delete_permanently(id, &no).unwrap(), Outcome::Declined);
    assert_eq!(board.delete_permanently(id, &yes).unwrap(), Outcome::Applied);
    assert!(board.note(id).is_none());
    assert_eq!(board.empty_trash(&yes).unwrap(), EmptyTrash::AlreadyEmpty);
}

#[test]
fn collections_survive_reopening_a_directory() {
    let tmp = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(1_000));

    let (note_id, notebook_id) = {
        let backend = Arc::new(DirectoryStore::new(tmp.path(), None).unwrap());
        let mut board = open(backend, &clock);
        let notebook = board.add_notebook("Journal").unwrap();
        let id = board
            .add_note(NewNote {
                notebook: Some("journal".into()),
                ..draft("day one", "it rained")
            })
            .unwrap();
        board.save_template("Daily", "Today", "", vec!["log".into()]).unwrap();
        (id, notebook.id)
    };

    let backend = Arc::new(DirectoryStore::new(tmp.path(), None).unwrap());
    let mut board = open(backend, &clock);
    assert!(board.take_warnings().is_empty());
    assert_eq!(board.note(note_id).unwrap().notebook_id, Some(notebook_id));
    assert_eq!(board.notebooks()[0].name, "Journal");
    assert_eq!(board.templates()[0].tags, vec!["log"]);
}

#[test]
fn corrupt_notes_load_empty_with_a_warning() {
    let backend = Arc::new(MemoryStore::new());
    backend.set("startNotesData", "{ not json").unwrap();
    let clock = Arc::new(ManualClock::new(1_000));

    let mut board = open(backend, &clock);
    assert!(board.notes().is_empty());
    let warnings = board.take_warnings();
    assert_eq!(warnings.len(), 1);
    assert!(matches!(
        warnings[0],
        NotesError::CorruptPersistedData { .. }
    ));
}

#[test]
fn export_then_import_replaces_everything() {
    let clock = Arc::new(ManualClock::new(1_000));
    let mut source = open(Arc::new(MemoryStore::new()), &clock);
    source.add_notebook("Work").unwrap();
    let id = source.add_note(draft("keep me", "")).unwrap();
    let json = source.export_json().unwrap();

    let mut target = open(Arc::new(MemoryStore::new()), &clock);
    target.add_note(draft("replaced", "")).unwrap();

    assert_eq!(target.import_json(&json, &no).unwrap(), Outcome::Declined);
    assert_eq!(target.notes()[0].title, "replaced");

    assert_eq!(target.import_json(&json, &yes).unwrap(), Outcome::Applied);
    assert_eq!(target.notes().len(), 1);
    assert_eq!(target.notes()[0].id, id);
    assert_eq!(target.notebooks()[0].name, "Work");
}

#[test]
fn legacy_array_import_keeps_notebooks() {
    let clock = Arc::new(ManualClock::new(1_000));
    let mut board = open(Arc::new(MemoryStore::new()), &clock);
    board.add_notebook("Home").unwrap();

    let legacy = r#"[{"id": 5, "title": "old", "archived": true}]"#;
    board.import_json(legacy, &yes).unwrap();

    assert!(board.note(5).unwrap().status.is_archived());
    assert_eq!(board.notebooks().len(), 1);

    assert!(matches!(
        board.import_json(r#""nope""#, &yes),
        Err(NotesError::ImportFormatInvalid { .. })
    ));
    assert!(board.note(5).is_some());
}

#[test]
fn import_with_colliding_notebooks_changes_nothing() {
    let clock = Arc::new(ManualClock::new(1_000));
    let mut board = open(Arc::new(MemoryStore::new()), &clock);
    board.add_notebook("Home").unwrap();

    let doc = r#"{"notes": [], "notebooks": [
        {"id": 1, "name": "Work"}, {"id": 2, "name": "work"}, {"id": 2, "name": "Home"}]}"#;
    assert!(matches!(
        board.import_json(doc, &yes),
        Err(NotesError::ImportFormatInvalid { .. })
    ));
    assert_eq!(board.notebooks().len(), 1);
    assert_eq!(board.notebooks()[0].name, "Home");
}
