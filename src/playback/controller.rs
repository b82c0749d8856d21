use std::sync::Arc;

use log::{error, info, warn};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::models::VideoSession;
use crate::settings::PlaybackSettings;

use super::error::{PlaybackError, Result};
use super::session::{ActivePopupView, PlaybackEvent, PlaybackSession, SessionSnapshot};
use super::state::{VoteOutcome, VoteRejection};

/// Owns one playback session at a time and paces it with a wall-clock ticker.
///
/// Every state change for a tick happens under `session`'s lock, and votes take
/// the same lock, so a vote can never straddle a phase timeout.
#[derive(Clone)]
pub struct SessionController {
    session: Arc<Mutex<Option<PlaybackSession>>>,
    events: broadcast::Sender<PlaybackEvent>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    cancel_token: Arc<Mutex<Option<CancellationToken>>>,
    /// Serialises start/end so one call cannot reap the other's ticker.
    lifecycle: Arc<Mutex<()>>,
    settings: PlaybackSettings,
}

impl SessionController {
    pub fn new(settings: PlaybackSettings) -> Self {
        let (events, _) = broadcast::channel(settings.event_buffer_size.max(1));
        Self {
            session: Arc::new(Mutex::new(None)),
            events,
            ticker: Arc::new(Mutex::new(None)),
            cancel_token: Arc::new(Mutex::new(None)),
            lifecycle: Arc::new(Mutex::new(())),
            settings,
        }
    }

    /// Receives every event published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.events.subscribe()
    }

    pub async fn start_session(&self, video: VideoSession) -> Result<SessionSnapshot> {
        let _lifecycle = self.lifecycle.lock().await;
        if self.is_running().await {
            return Err(PlaybackError::SessionAlreadyActive);
        }
        // The previous run's ticker has exited or is exiting; reap it before the
        // session lock is taken so it can never wait on us.
        self.cancel_ticker().await;

        let snapshot = {
            let mut guard = self.session.lock().await;
            if guard.as_ref().is_some_and(PlaybackSession::is_running) {
                return Err(PlaybackError::SessionAlreadyActive);
            }

            let (session, events) = PlaybackSession::begin(&video, self.settings.phase_timings())?;
            info!(
                "Starting playback session {} for video {} ({}s)",
                session.session_id(),
                video.id,
                video.duration_seconds
            );
            publish(&self.events, events);
            let snapshot = session.snapshot();
            *guard = Some(session);
            snapshot
        };

        if snapshot.dropped_popups > 0 {
            warn!(
                "Video {} started with {} invalid popup(s) dropped",
                snapshot.video_id, snapshot.dropped_popups
            );
        }

        self.spawn_ticker().await;
        Ok(snapshot)
    }

    /// Stops the session and its ticker. Safe to call any number of times; no
    /// event is published once this returns.
    pub async fn end_session(&self) -> Option<SessionSnapshot> {
        let _lifecycle = self.lifecycle.lock().await;
        let snapshot = {
            let mut guard = self.session.lock().await;
            guard.as_mut().map(|session| {
                let had_popup = session.active_popup().is_some();
                if session.stop() {
                    info!(
                        "Playback session {} ended at {}s",
                        session.session_id(),
                        session.elapsed_seconds()
                    );
                    if had_popup {
                        publish(&self.events, vec![PlaybackEvent::PopupDeactivated]);
                    }
                }
                session.snapshot()
            })
        };

        self.cancel_ticker().await;
        snapshot
    }

    pub async fn cast_vote(&self, option_index: usize) -> VoteOutcome {
        let mut guard = self.session.lock().await;
        match guard.as_mut() {
            Some(session) => {
                let (outcome, events) = session.cast_vote(option_index);
                publish(&self.events, events);
                outcome
            }
            None => VoteOutcome::rejected(VoteRejection::NoActivePoll),
        }
    }

    pub async fn is_running(&self) -> bool {
        self.session
            .lock()
            .await
            .as_ref()
            .is_some_and(PlaybackSession::is_running)
    }

    pub async fn current_elapsed_seconds(&self) -> u64 {
        self.session
            .lock()
            .await
            .as_ref()
            .map_or(0, PlaybackSession::elapsed_seconds)
    }

    pub async fn current_active_popup(&self) -> Option<ActivePopupView> {
        self.session
            .lock()
            .await
            .as_ref()
            .and_then(PlaybackSession::active_popup)
    }

    pub async fn snapshot(&self) -> Option<SessionSnapshot> {
        self.session.lock().await.as_ref().map(PlaybackSession::snapshot)
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let cancel_token = CancellationToken::new();
        *self.cancel_token.lock().await = Some(cancel_token.clone());

        let session = self.session.clone();
        let events = self.events.clone();
        let tick_interval = self.settings.tick_interval();
        let heartbeat_every = self.settings.heartbeat_every_ticks.max(1);

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + tick_interval, tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut ticks: u32 = 0;

            loop {
                tokio::select! {
                    biased;
                    _ = cancel_token.cancelled() => break,
                    _ = interval.tick() => {}
                }

                let mut guard = session.lock().await;
                let Some(current) = guard.as_mut() else {
                    break;
                };
                // end_session may have won the lock race against this tick.
                if cancel_token.is_cancelled() || !current.is_running() {
                    break;
                }

                match current.advance() {
                    Ok(batch) => {
                        let ended = batch.contains(&PlaybackEvent::SessionEnded);
                        publish(&events, batch);

                        ticks = ticks.wrapping_add(1);
                        if ticks % heartbeat_every == 0 {
                            let snapshot = current.snapshot();
                            info!(
                                "Session {} heartbeat: {} / {}s, popup: {:?}",
                                snapshot.session_id,
                                snapshot.elapsed_label,
                                snapshot.duration_seconds,
                                snapshot.active_popup.as_ref().map(|p| p.phase)
                            );
                        }

                        if ended {
                            info!("Playback session {} reached its end", current.session_id());
                            break;
                        }
                    }
                    Err(err) => {
                        error!("Stopping session {}: {err}", current.session_id());
                        current.stop();
                        break;
                    }
                }
            }
        });

        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(token) = self.cancel_token.lock().await.take() {
            token.cancel();
        }

        if let Some(handle) = self.ticker.lock().await.take() {
            if let Err(err) = handle.await {
                if !err.is_cancelled() {
                    error!("Playback ticker task failed: {err}");
                }
            }
        }
    }
}

fn publish(sender: &broadcast::Sender<PlaybackEvent>, events: Vec<PlaybackEvent>) {
    for event in events {
        // No subscribers is fine; the state is still queryable.
        let _ = sender.send(event);
    }
}
