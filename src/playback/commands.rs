//! `play` and `countdown`: drive one session from the terminal.
//!
//! Events go to stdout as one JSON object per line. Stdin accepts `vote <n>`
//! and `end`; ctrl-c ends the session too.

use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::Local;
use log::{info, warn};
use serde::Serialize;
use serde_json::json;
use tokio::{
    io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    sync::broadcast::error::RecvError,
    time::{self, Instant},
};

use crate::catalog::{commands::show_video, load_video_session};
use crate::countdown::seconds_until_start;
use crate::models::VideoSession;
use crate::utils::format_clock;
use crate::AppState;

use super::controller::SessionController;
use super::session::{PlaybackEvent, SessionSnapshot};

#[derive(Debug, PartialEq, Eq)]
enum ViewerCommand {
    Vote(usize),
    End,
}

fn parse_command(line: &str) -> Option<ViewerCommand> {
    let mut parts = line.split_whitespace();
    match (parts.next()?, parts.next(), parts.next()) {
        ("vote", Some(index), None) => index.parse().ok().map(ViewerCommand::Vote),
        ("end", None, None) => Some(ViewerCommand::End),
        _ => None,
    }
}

pub async fn play(state: &AppState, id: i64) -> Result<SessionSnapshot> {
    let video = load_video_session(&state.db, id).await?;
    drive_session(
        &state.controller,
        video,
        BufReader::new(io::stdin()),
        io::stdout(),
    )
    .await
}

/// Waits for the video's scheduled time of day, then plays it.
pub async fn countdown(state: &AppState, id: i64) -> Result<SessionSnapshot> {
    let video = show_video(&state.db, id).await?;
    match &video.scheduled_time {
        Some(time) => match seconds_until_start(time, Local::now().naive_local())? {
            Some(seconds) => {
                info!("Video {id} starts at {time}, {} from now", format_clock(seconds));
                count_down(seconds, &mut io::stdout()).await?;
            }
            None => info!("Video {id} was scheduled for {time}; starting now"),
        },
        None => warn!("Video {id} has no scheduled time; starting now"),
    }

    drive_session(
        &state.controller,
        video.to_session(),
        BufReader::new(io::stdin()),
        io::stdout(),
    )
    .await
}

/// Prints one countdown line per second, ending at zero.
pub async fn count_down<W>(seconds: u64, output: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let start = Instant::now();
    let mut interval = time::interval_at(start, Duration::from_secs(1));
    for remaining in (0..=seconds).rev() {
        interval.tick().await;
        write_json_line(
            output,
            &json!({
                "type": "countdown",
                "remainingSeconds": remaining,
                "label": format_clock(remaining),
            }),
        )
        .await?;
    }
    Ok(())
}

/// Runs `video` to completion (or until `end`/ctrl-c) and returns the final
/// snapshot. Every event published for this session is written to `output`.
pub async fn drive_session<R, W>(
    controller: &SessionController,
    video: VideoSession,
    input: R,
    mut output: W,
) -> Result<SessionSnapshot>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut events = controller.subscribe();
    controller.start_session(video).await?;

    let mut lines = input.lines();
    let mut input_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            // Pending events are written before the next command is read.
            biased;
            event = events.recv() => match event {
                Ok(event) => {
                    write_json_line(&mut output, &event).await?;
                    if event == PlaybackEvent::SessionEnded {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Output fell behind; {skipped} event(s) skipped");
                }
                Err(RecvError::Closed) => break,
            },
            line = lines.next_line(), if input_open => match line? {
                Some(line) => match parse_command(&line) {
                    Some(ViewerCommand::Vote(option_index)) => {
                        let outcome = controller.cast_vote(option_index).await;
                        write_json_line(
                            &mut output,
                            &json!({ "type": "voteResult", "result": outcome }),
                        )
                        .await?;
                    }
                    Some(ViewerCommand::End) => break,
                    None if line.trim().is_empty() => {}
                    None => warn!("Unknown command '{}'; expected `vote <n>` or `end`", line.trim()),
                },
                None => input_open = false,
            },
            _ = &mut ctrl_c => {
                info!("Interrupted; ending session");
                break;
            }
        }
    }

    let snapshot = controller
        .end_session()
        .await
        .ok_or_else(|| anyhow!("playback session disappeared before it ended"))?;

    // end_session may have released a popup.
    while let Ok(event) = events.try_recv() {
        write_json_line(&mut output, &event).await?;
    }

    Ok(snapshot)
}

async fn write_json_line<W, T>(output: &mut W, value: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize + ?Sized,
{
    let mut line = serde_json::to_vec(value)?;
    line.push(b'\n');
    output.write_all(&line).await?;
    output.flush().await?;
    Ok(())
}
