use chat_history_search::db::Database;
use chat_history_search::error::ChatHistoryError;
use chat_history_search::models::{DayRange, NewMessage};
use chrono::{TimeZone, Utc};
use tempfile::tempdir;

fn new_message(chat: &str, body: &str, hour: u32) -> NewMessage {
    NewMessage {
        chat_name: chat.to_string(),
        sender: "Ana".to_string(),
        from_me: false,
        timestamp: Utc.with_ymd_and_hms(2024, 2, 2, hour, 0, 0).unwrap(),
        body: body.to_string(),
        media_reference: None,
        source_file: None,
    }
}

#[test]
fn test_database_creation_and_reopen() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("nested").join("store.db");

    let mut db = Database::create(&db_path).expect("Failed to create database");
    assert_eq!(db.message_count().unwrap(), 0);
    db.insert_messages(&[new_message("Ana", "hello", 9)]).unwrap();
    db.close().unwrap();

    let reopened = Database::open(&db_path).expect("Failed to reopen database");
    assert_eq!(reopened.path(), db_path.as_path());
    assert_eq!(reopened.message_count().unwrap(), 1);
}

#[test]
fn test_open_missing_store() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let missing = temp_dir.path().join("missing.db");

    assert!(matches!(Database::open(&missing), Err(ChatHistoryError::StoreNotFound(_))));
    assert!(matches!(Database::open(temp_dir.path()), Err(ChatHistoryError::StoreNotFound(_))));
}

#[test]
fn test_identical_messages_are_ignored() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let mut db = Database::create(&temp_dir.path().join("store.db")).unwrap();

    let first = db
        .insert_messages(&[new_message("Ana", "hello", 9), new_message("Ana", "hello", 9), new_message("Ana", "hello again", 9)])
        .unwrap();
    assert_eq!(first.inserted, 2);
    assert_eq!(first.duplicates, 1);

    // Same body in another chat is a different message
    let second = db.insert_messages(&[new_message("Bo", "hello", 9)]).unwrap();
    assert_eq!(second.inserted, 1);
    assert_eq!(db.message_count().unwrap(), 3);
}

#[test]
fn test_messages_between_is_half_open() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let mut db = Database::create(&temp_dir.path().join("store.db")).unwrap();
    db.insert_messages(&[
        new_message("Ana", "eight", 8),
        new_message("Ana", "nine", 9),
        new_message("Ana", "ten", 10),
    ])
    .unwrap();

    let range = DayRange {
        start: Utc.with_ymd_and_hms(2024, 2, 2, 9, 0, 0).unwrap(),
        end: Utc.with_ymd_and_hms(2024, 2, 2, 10, 0, 0).unwrap(),
    };
    let messages = db.messages_between(&range).unwrap();

    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].body, "nine");
    assert_eq!(messages[0].timestamp, range.start);
}

#[test]
fn test_timestamps_survive_round_trip() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let mut db = Database::create(&temp_dir.path().join("store.db")).unwrap();
    let precise = Utc.timestamp_millis_opt(1_706_886_245_123).unwrap();
    let mut message = new_message("Ana", "precise", 0);
    message.timestamp = precise;
    message.media_reference = Some("image".to_string());
    db.insert_messages(&[message]).unwrap();

    assert_eq!(db.timestamps().unwrap(), vec![precise]);

    let range = DayRange {
        start: precise,
        end: precise + chrono::Duration::milliseconds(1),
    };
    let stored = &db.messages_between(&range).unwrap()[0];
    assert!(stored.has_media());
    assert_eq!(stored.timestamp, precise);
}

#[test]
fn test_open_leaves_foreign_database_alone() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("photos.db");
    let conn = rusqlite::Connection::open(&db_path).unwrap();
    conn.execute_batch("CREATE TABLE albums (id INTEGER PRIMARY KEY, title TEXT);").unwrap();
    conn.close().unwrap();

    assert!(matches!(Database::open(&db_path), Err(ChatHistoryError::InvalidStore(_))));

    let conn = rusqlite::Connection::open(&db_path).unwrap();
    let tables: i64 = conn
        .query_row("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'", [], |row| row.get(0))
        .unwrap();
    let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0)).unwrap();
    assert_eq!(tables, 1);
    assert_eq!(version, 0);
}

#[test]
fn test_open_rejects_non_sqlite_file() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("notes.db");
    std::fs::write(&db_path, "these are plain text notes, not a database file\n".repeat(40)).unwrap();

    assert!(matches!(Database::open(&db_path), Err(ChatHistoryError::InvalidStore(_))));
}
