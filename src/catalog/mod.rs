//! Where replayable videos come from.
//!
//! Playback never reads the catalog while running: a record is fetched once
//! through [`load_video_session`] and handed to the controller as a
//! [`VideoSession`].

pub mod commands;
mod memory;

use anyhow::{Context, Result};

use crate::db::{Database, Video, VideoInput};
use crate::models::VideoSession;

pub use memory::InMemoryCatalog;

#[allow(async_fn_in_trait)]
pub trait VideoCatalog {
    async fn list_videos(&self) -> Result<Vec<Video>>;
    async fn get_video(&self, id: i64) -> Result<Option<Video>>;
    async fn create_video(&self, input: VideoInput) -> Result<Video>;
    async fn update_video(&self, id: i64, input: VideoInput) -> Result<Video>;
    async fn delete_video(&self, id: i64) -> Result<Video>;
}

impl VideoCatalog for Database {
    async fn list_videos(&self) -> Result<Vec<Video>> {
        Database::list_videos(self).await
    }

    async fn get_video(&self, id: i64) -> Result<Option<Video>> {
        Database::get_video(self, id).await
    }

    async fn create_video(&self, input: VideoInput) -> Result<Video> {
        self.insert_video(input).await
    }

    async fn update_video(&self, id: i64, input: VideoInput) -> Result<Video> {
        Database::update_video(self, id, input).await
    }

    async fn delete_video(&self, id: i64) -> Result<Video> {
        Database::delete_video(self, id).await
    }
}

pub async fn load_video_session<C: VideoCatalog>(catalog: &C, id: i64) -> Result<VideoSession> {
    let video = catalog
        .get_video(id)
        .await?
        .with_context(|| format!("Video {id} not found"))?;
    Ok(video.to_session())
}
