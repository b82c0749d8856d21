//! Catalog commands behind the `list`, `show`, `import`, `update` and
//! `delete` subcommands.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use log::info;
use serde_json::Value;

use crate::db::{Video, VideoInput};

use super::VideoCatalog;

pub async fn list_videos<C: VideoCatalog>(catalog: &C) -> Result<Vec<Video>> {
    catalog.list_videos().await
}

pub async fn show_video<C: VideoCatalog>(catalog: &C, id: i64) -> Result<Video> {
    catalog
        .get_video(id)
        .await?
        .with_context(|| format!("Video {id} not found"))
}

/// Imports one video object, or an array of them, from a JSON file.
pub async fn import_videos<C: VideoCatalog>(catalog: &C, path: &Path) -> Result<Vec<Video>> {
    let inputs = match read_json(path)? {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                serde_json::from_value::<VideoInput>(item)
                    .with_context(|| format!("entry {index} in {} is not a video", path.display()))
            })
            .collect::<Result<Vec<_>>>()?,
        other => vec![serde_json::from_value::<VideoInput>(other)
            .with_context(|| format!("{} is not a video", path.display()))?],
    };

    let mut created = Vec::with_capacity(inputs.len());
    for input in inputs {
        let video = catalog.create_video(input).await?;
        info!("Imported video {} ({})", video.id, video.title);
        created.push(video);
    }
    Ok(created)
}

pub async fn update_video<C: VideoCatalog>(catalog: &C, id: i64, path: &Path) -> Result<Video> {
    let input: VideoInput = serde_json::from_value(read_json(path)?)
        .with_context(|| format!("{} is not a video", path.display()))?;
    let video = catalog.update_video(id, input).await?;
    info!("Updated video {id}");
    Ok(video)
}

pub async fn delete_video<C: VideoCatalog>(catalog: &C, id: i64) -> Result<Video> {
    let video = catalog.delete_video(id).await?;
    info!("Deleted video {id} ({})", video.title);
    Ok(video)
}

fn read_json(path: &Path) -> Result<Value> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Invalid JSON in {}", path.display()))
}
