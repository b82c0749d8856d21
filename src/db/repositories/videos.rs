use anyhow::{bail, Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_json_list, parse_texts, to_i64, to_u64},
    models::{video::validation::validate_input, Video, VideoInput},
};

const VIDEO_COLUMNS: &str = "id, link, title, subtitle, image, scheduled_time, duration_seconds,
     action_guide, texts, popups, created_at, updated_at";

fn row_to_video(row: &Row) -> Result<Video> {
    let duration: i64 = row.get("duration_seconds")?;
    let texts: String = row.get("texts")?;
    let popups: String = row.get("popups")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Video {
        id: row.get("id")?,
        link: row.get("link")?,
        title: row.get("title")?,
        subtitle: row.get("subtitle")?,
        image: row.get("image")?,
        scheduled_time: row.get("scheduled_time")?,
        duration_seconds: to_u64(duration, "duration_seconds")?,
        action_guide: row.get("action_guide")?,
        texts: parse_texts(&texts),
        popups: parse_json_list(&popups),
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

fn fetch_video(conn: &Connection, id: i64) -> Result<Option<Video>> {
    let mut stmt = conn.prepare(&format!("SELECT {VIDEO_COLUMNS} FROM videos WHERE id = ?1"))?;
    let mut rows = stmt.query(params![id])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_video(row)?)),
        None => Ok(None),
    }
}

impl Database {
    pub async fn list_videos(&self) -> Result<Vec<Video>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {VIDEO_COLUMNS} FROM videos ORDER BY id ASC"
            ))?;
            let mut rows = stmt.query([])?;
            let mut videos = Vec::new();
            while let Some(row) = rows.next()? {
                videos.push(row_to_video(row)?);
            }
            Ok(videos)
        })
        .await
    }

    pub async fn get_video(&self, id: i64) -> Result<Option<Video>> {
        self.execute(move |conn| fetch_video(conn, id)).await
    }

    pub async fn insert_video(&self, input: VideoInput) -> Result<Video> {
        validate_input(&input)?;
        self.execute(move |conn| {
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO videos (link, title, subtitle, image, scheduled_time, duration_seconds,
                                     action_guide, texts, popups, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
                params![
                    input.link,
                    input.title,
                    input.subtitle,
                    input.image,
                    input.scheduled_time,
                    to_i64(input.duration_seconds)?,
                    input.action_guide,
                    serde_json::to_string(&input.texts)?,
                    serde_json::to_string(&input.popups)?,
                    now,
                ],
            )
            .context("failed to insert video")?;

            let id = conn.last_insert_rowid();
            fetch_video(conn, id)?.context("inserted video disappeared")
        })
        .await
    }

    pub async fn update_video(&self, id: i64, input: VideoInput) -> Result<Video> {
        validate_input(&input)?;
        self.execute(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE videos
                     SET link = ?1,
                         title = ?2,
                         subtitle = ?3,
                         image = ?4,
                         scheduled_time = ?5,
                         duration_seconds = ?6,
                         action_guide = ?7,
                         texts = ?8,
                         popups = ?9,
                         updated_at = ?10
                     WHERE id = ?11",
                    params![
                        input.link,
                        input.title,
                        input.subtitle,
                        input.image,
                        input.scheduled_time,
                        to_i64(input.duration_seconds)?,
                        input.action_guide,
                        serde_json::to_string(&input.texts)?,
                        serde_json::to_string(&input.popups)?,
                        Utc::now().to_rfc3339(),
                        id,
                    ],
                )
                .context("failed to update video")?;
            if changed == 0 {
                bail!("Video {id} not found");
            }

            fetch_video(conn, id)?.with_context(|| format!("Video {id} not found"))
        })
        .await
    }

    /// Removes the video and returns the row as it was before deletion.
    pub async fn delete_video(&self, id: i64) -> Result<Video> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let existing = fetch_video(&tx, id)?;
            let Some(video) = existing else {
                bail!("Video {id} not found");
            };
            tx.execute("DELETE FROM videos WHERE id = ?1", params![id])
                .context("failed to delete video")?;
            tx.commit()?;
            Ok(video)
        })
        .await
    }
}
