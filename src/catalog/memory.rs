use std::{
    collections::BTreeMap,
    sync::{PoisonError, RwLock},
};

use anyhow::{bail, Result};
use chrono::Utc;

use crate::db::{models::video::validation::validate_input, Video, VideoInput};

use super::VideoCatalog;

/// Catalog kept entirely in memory. Ids start at 1 and are never reused.
#[derive(Default)]
pub struct InMemoryCatalog {
    state: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    videos: BTreeMap<i64, Video>,
    last_id: i64,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

fn record_from(id: i64, input: VideoInput, created_at: chrono::DateTime<Utc>) -> Video {
    Video {
        id,
        link: input.link,
        title: input.title,
        subtitle: input.subtitle,
        image: input.image,
        scheduled_time: input.scheduled_time,
        duration_seconds: input.duration_seconds,
        action_guide: input.action_guide,
        texts: input.texts,
        popups: input.popups,
        created_at,
        updated_at: Utc::now(),
    }
}

impl VideoCatalog for InMemoryCatalog {
    async fn list_videos(&self) -> Result<Vec<Video>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Ok(state.videos.values().cloned().collect())
    }

    async fn get_video(&self, id: i64) -> Result<Option<Video>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Ok(state.videos.get(&id).cloned())
    }

    async fn create_video(&self, input: VideoInput) -> Result<Video> {
        validate_input(&input)?;
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.last_id += 1;
        let id = state.last_id;
        let video = record_from(id, input, Utc::now());
        state.videos.insert(id, video.clone());
        Ok(video)
    }

    async fn update_video(&self, id: i64, input: VideoInput) -> Result<Video> {
        validate_input(&input)?;
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let Some(existing) = state.videos.get_mut(&id) else {
            bail!("Video {id} not found");
        };
        *existing = record_from(id, input, existing.created_at);
        Ok(existing.clone())
    }

    async fn delete_video(&self, id: i64) -> Result<Video> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        match state.videos.remove(&id) {
            Some(video) => Ok(video),
            None => bail!("Video {id} not found"),
        }
    }
}
