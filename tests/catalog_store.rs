use rusqlite::{params, Connection};
use serde_json::json;
use webinar_lib::catalog::{load_video_session, InMemoryCatalog, VideoCatalog};
use webinar_lib::db::{Database, VideoInput};
use webinar_lib::playback::{PlaybackEvent, SessionController};
use webinar_lib::settings::PlaybackSettings;

fn input(title: &str) -> VideoInput {
    VideoInput {
        link: format!("https://cdn.example.com/{title}.mp4"),
        title: title.to_string(),
        scheduled_time: Some("19:00".into()),
        duration_seconds: 45,
        texts: vec!["Intro".into()],
        popups: vec![json!({ "time": 5, "type": "poll", "options": ["Yes", "No"] })],
        ..VideoInput::default()
    }
}

async fn exercise_crud<C: VideoCatalog>(catalog: &C) {
    let first = catalog.create_video(input("first")).await.unwrap();
    let second = catalog.create_video(input("second")).await.unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(catalog.list_videos().await.unwrap().len(), 2);

    let mut changed = input("renamed");
    changed.duration_seconds = 90;
    let updated = catalog.update_video(first.id, changed).await.unwrap();
    assert_eq!(updated.id, first.id);
    assert_eq!(updated.title, "renamed");
    assert_eq!(updated.duration_seconds, 90);
    assert_eq!(updated.created_at, first.created_at);

    let deleted = catalog.delete_video(second.id).await.unwrap();
    assert_eq!(deleted.title, "second");
    assert!(catalog.get_video(second.id).await.unwrap().is_none());

    assert!(catalog.update_video(second.id, input("ghost")).await.is_err());
    assert!(catalog.delete_video(second.id).await.is_err());

    let mut invalid = input("bad");
    invalid.link = "  ".into();
    assert!(catalog.create_video(invalid).await.is_err());
    assert_eq!(catalog.list_videos().await.unwrap().len(), 1);

    let session = load_video_session(catalog, first.id).await.unwrap();
    assert_eq!(session.id, first.id.to_string());
    assert_eq!(session.duration_seconds, 90);
    assert_eq!(session.popups.len(), 1);
    assert!(load_video_session(catalog, 999).await.is_err());
}

#[tokio::test]
async fn in_memory_catalog_crud() {
    exercise_crud(&InMemoryCatalog::new()).await;
}

#[tokio::test]
async fn sqlite_catalog_crud() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(dir.path().join("catalog.sqlite3")).unwrap();
    exercise_crud(&db).await;
}

#[tokio::test]
async fn sqlite_catalog_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.sqlite3");

    let id = {
        let db = Database::new(path.clone()).unwrap();
        db.create_video(input("kept")).await.unwrap().id
    };

    let db = Database::new(path).unwrap();
    let video = db.get_video(id).await.unwrap().unwrap();
    assert_eq!(video.title, "kept");
    assert_eq!(video.texts, vec!["Intro"]);
    assert_eq!(video.popups[0]["options"], json!(["Yes", "No"]));
}

#[tokio::test]
async fn legacy_columns_are_read_tolerantly() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.sqlite3");
    let db = Database::new(path.clone()).unwrap();

    {
        let conn = Connection::open(&path).unwrap();
        let now = chrono::Utc::now().to_rfc3339();
        let rows = [
            ("escaped", "[\"a\"]", r#"[{\"time\": 3, \"type\": \"offer\", \"content\": \"x.png\"}]"#),
            ("plain-text", "Only line", "[]"),
            ("garbage", "", "{not json"),
        ];
        for (title, texts, popups) in rows {
            conn.execute(
                "INSERT INTO videos (link, title, duration_seconds, texts, popups, created_at, updated_at)
                 VALUES ('v.mp4', ?1, 30, ?2, ?3, ?4, ?4)",
                params![title, texts, popups, now],
            )
            .unwrap();
        }
    }

    let videos = db.list_videos().await.unwrap();
    assert_eq!(videos.len(), 3);

    assert_eq!(videos[0].texts, vec!["a"]);
    assert_eq!(videos[0].popups.len(), 1);
    assert_eq!(videos[0].popups[0]["content"], "x.png");

    assert_eq!(videos[1].texts, vec!["Only line"]);
    assert!(videos[1].popups.is_empty());

    assert!(videos[2].texts.is_empty());
    assert!(videos[2].popups.is_empty());
}

#[tokio::test(start_paused = true)]
async fn catalog_record_plays_through_controller() {
    let catalog = InMemoryCatalog::new();
    let video = catalog.create_video(input("live")).await.unwrap();

    let controller = SessionController::new(PlaybackSettings::default());
    let mut events = controller.subscribe();
    controller
        .start_session(load_video_session(&catalog, video.id).await.unwrap())
        .await
        .unwrap();

    let mut seen_activation = false;
    loop {
        match events.recv().await.unwrap() {
            PlaybackEvent::PopupActivated { .. } => seen_activation = true,
            PlaybackEvent::SessionEnded => break,
            _ => {}
        }
    }
    assert!(seen_activation);
    assert_eq!(controller.current_elapsed_seconds().await, 45);
}
