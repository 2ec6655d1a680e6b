use std::{sync::Arc, time::Duration};

use serde_json::Value;
use startnotes::{
    schedule_autosave, AutoSaveScheduler, Config, KeyValueStore, ManualClock, MemoryStore,
    NewNote, NoteBoard, NotePatch, SharedBoard, AUTOSAVE_DELAY,
};
use tokio::time;

async fn board_with_note(backend: Arc<MemoryStore>) -> (SharedBoard, AutoSaveScheduler, i64) {
    let config = Config::default();
    let mut board = NoteBoard::open(backend, &config, Arc::new(ManualClock::new(50_000))).unwrap();
    let id = board
        .add_note(NewNote {
            title: "draft".into(),
            text: "first".into(),
            ..NewNote::default()
        })
        .unwrap();
    let scheduler = AutoSaveScheduler::new(config.autosave_delay(), board.session_gate());
    (board.into_shared(), scheduler, id)
}

fn stored_text(backend: &MemoryStore) -> String {
    let raw = backend.get("startNotesData").unwrap().unwrap();
    let notes: Vec<Value> = serde_json::from_str(&raw).unwrap();
    notes[0]["text"].as_str().unwrap().to_string()
}

#[tokio::test(start_paused = true)]
async fn typing_burst_saves_latest_draft_once() {
    let backend = Arc::new(MemoryStore::new());
    let (board, scheduler, id) = board_with_note(backend.clone()).await;
    let token = board.lock().await.begin_edit(id).unwrap();

    for text in ["s", "se", "sec", "second"] {
        schedule_autosave(&board, &scheduler, token, NotePatch::new().text(text)).unwrap();
        time::sleep(Duration::from_millis(300)).await;
    }
    assert_eq!(stored_text(&backend), "first");

    time::sleep(AUTOSAVE_DELAY).await;
    assert_eq!(stored_text(&backend), "second");

    // The session stays open after an auto-save
    assert_eq!(board.lock().await.editing(), Some(token));
}

#[tokio::test(start_paused = true)]
async fn pending_autosave_is_dropped_after_cancel() {
    let backend = Arc::new(MemoryStore::new());
    let (board, scheduler, id) = board_with_note(backend.clone()).await;
    let token = board.lock().await.begin_edit(id).unwrap();

    schedule_autosave(&board, &scheduler, token, NotePatch::new().text("late")).unwrap();
    board.lock().await.cancel_edit(token).unwrap();

    time::sleep(AUTOSAVE_DELAY * 2).await;
    assert_eq!(stored_text(&backend), "first");
    assert_eq!(board.lock().await.note(id).unwrap().text, "first");
}

#[tokio::test(start_paused = true)]
async fn blank_draft_is_not_autosaved() {
    let backend = Arc::new(MemoryStore::new());
    let (board, scheduler, id) = board_with_note(backend.clone()).await;
    let token = board.lock().await.begin_edit(id).unwrap();

    let blank = NotePatch::new().title("").text("   ");
    schedule_autosave(&board, &scheduler, token, blank).unwrap();
    time::sleep(AUTOSAVE_DELAY * 2).await;

    let board = board.lock().await;
    assert_eq!(board.note(id).unwrap().title, "draft");
    assert_eq!(stored_text(&backend), "first");
}

#[tokio::test(start_paused = true)]
async fn manual_save_wins_over_pending_autosave() {
    let backend = Arc::new(MemoryStore::new());
    let (board, scheduler, id) = board_with_note(backend.clone()).await;
    let token = board.lock().await.begin_edit(id).unwrap();

    schedule_autosave(&board, &scheduler, token, NotePatch::new().text("typed")).unwrap();
    time::sleep(Duration::from_millis(500)).await;
    assert!(board
        .lock()
        .await
        .save_edit(token, &NotePatch::new().text("manual"))
        .unwrap());

    time::sleep(AUTOSAVE_DELAY * 2).await;
    assert_eq!(stored_text(&backend), "manual");
    assert_eq!(board.lock().await.editing(), None);
}
