pub mod catalog;
pub mod countdown;
pub mod db;
pub mod models;
pub mod playback;
pub mod settings;
pub mod utils;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use catalog::commands::{delete_video, import_videos, list_videos, show_video, update_video};
use db::Database;
use playback::{
    commands::{countdown, play},
    SessionController,
};
use settings::{PlaybackSettings, SettingsStore};

pub struct AppState {
    pub db: Database,
    pub controller: SessionController,
    pub settings: SettingsStore,
}

impl AppState {
    /// Opens the catalog and settings under `data_dir`, creating it if needed.
    pub fn open(data_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let db = Database::new(data_dir.join("webinar.sqlite3"))?;
        let settings = SettingsStore::new(data_dir.join("settings.json"))?;
        let controller = SessionController::new(settings.playback().with_env_overrides());

        Ok(Self {
            db,
            controller,
            settings,
        })
    }
}

#[derive(Parser)]
#[command(author, version, about = "Replays recorded webinars as if they were live", long_about = None)]
pub struct Cli {
    /// Directory holding the catalog database and settings.json
    #[arg(long, env = "WEBINAR_DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List every video in the catalog
    List,
    /// Show one video
    Show { id: i64 },
    /// Import a video (or an array of videos) from a JSON file
    Import { file: PathBuf },
    /// Replace a video with the contents of a JSON file
    Update { id: i64, file: PathBuf },
    /// Delete a video
    Delete { id: i64 },
    /// Play a video now, printing events as JSON lines
    Play { id: i64 },
    /// Wait for the video's scheduled time, then play it
    Countdown { id: i64 },
    /// Show playback settings, applying any values given
    Settings {
        #[arg(long)]
        tick_interval_ms: Option<u64>,
        #[arg(long)]
        heartbeat_every_ticks: Option<u32>,
        #[arg(long)]
        offer_default_ticks: Option<u64>,
    },
}

pub fn run() -> Result<()> {
    // RUST_LOG, when set, overrides the Info default.
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(execute(cli))
}

async fn execute(cli: Cli) -> Result<()> {
    let state = AppState::open(cli.data_dir)?;

    match cli.command {
        Command::List => print_json(&list_videos(&state.db).await?),
        Command::Show { id } => print_json(&show_video(&state.db, id).await?),
        Command::Import { file } => print_json(&import_videos(&state.db, &file).await?),
        Command::Update { id, file } => print_json(&update_video(&state.db, id, &file).await?),
        Command::Delete { id } => print_json(&delete_video(&state.db, id).await?),
        Command::Play { id } => {
            let snapshot = play(&state, id).await?;
            log::info!(
                "Session {} finished at {} ({:?})",
                snapshot.session_id,
                snapshot.elapsed_label,
                snapshot.status
            );
            Ok(())
        }
        Command::Countdown { id } => {
            let snapshot = countdown(&state, id).await?;
            log::info!(
                "Session {} finished at {} ({:?})",
                snapshot.session_id,
                snapshot.elapsed_label,
                snapshot.status
            );
            Ok(())
        }
        Command::Settings {
            tick_interval_ms,
            heartbeat_every_ticks,
            offer_default_ticks,
        } => {
            let current = state.settings.playback();
            let updated = PlaybackSettings {
                tick_interval_ms: tick_interval_ms.unwrap_or(current.tick_interval_ms),
                heartbeat_every_ticks: heartbeat_every_ticks
                    .unwrap_or(current.heartbeat_every_ticks),
                offer_default_ticks: offer_default_ticks.unwrap_or(current.offer_default_ticks),
                ..current.clone()
            };
            if updated != current {
                state.settings.update_playback(updated)?;
            }
            print_json(&state.settings.playback())
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
