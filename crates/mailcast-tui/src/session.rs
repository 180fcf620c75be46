//! Which entry, if any, currently owns the shared player.
//!
//! There is exactly one player for the whole program. Every entry that wants
//! to stream claims it by assigning a new source, which interrupts whatever the
//! previous claimant was playing. A list re-render detaches the player and
//! replaces the session wholesale, so no state from the old result set survives.

use mailcast_proto::MailApi;
use tracing::{debug, info, warn};

/// The single audio sink shared by all entries.
pub trait MediaPlayer {
    /// Replace the current source with `url` and start playing it.
    async fn load(&mut self, url: &str) -> anyhow::Result<()>;
    /// No-op when there is no source.
    async fn set_paused(&mut self, paused: bool) -> anyhow::Result<()>;
    /// Pause and clear the source. Local state is cleared even on error.
    async fn unload(&mut self) -> anyhow::Result<()>;
    fn source(&self) -> Option<&str>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
    Paused,
}

/// Value object describing the current claim on the player.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackSession {
    pub active_message_id: Option<String>,
    pub state: PlaybackState,
}

impl PlaybackSession {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn playing(message_id: &str) -> Self {
        Self {
            active_message_id: Some(message_id.to_string()),
            state: PlaybackState::Playing,
        }
    }

    pub fn is_active(&self, message_id: &str) -> bool {
        self.state != PlaybackState::Idle && self.active_message_id.as_deref() == Some(message_id)
    }
}

pub struct PlaybackController<P> {
    player: P,
    session: PlaybackSession,
}

impl<P: MediaPlayer> PlaybackController<P> {
    pub fn new(player: P) -> Self {
        Self {
            player,
            session: PlaybackSession::idle(),
        }
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }

    /// Claim the player for `message_id` and start its progressive stream.
    ///
    /// The URL is fixed per message, so repeating the claim restarts the
    /// stream from the beginning.
    pub async fn stream(&mut self, api: &MailApi, message_id: &str) -> anyhow::Result<()> {
        let url = api.stream_url(message_id);
        info!("[playback] {} claims player: {}", message_id, url);
        // A failed load must not leave the previous claimant marked active.
        self.session = PlaybackSession::idle();
        self.player.load(&url).await?;
        self.session = PlaybackSession::playing(message_id);
        Ok(())
    }

    /// Detach the player and forget the current claim.
    pub async fn teardown(&mut self) {
        if let Err(e) = self.player.unload().await {
            warn!("[playback] detaching player failed: {:#}", e);
        }
        if let Some(id) = self.session.active_message_id.take() {
            debug!("[playback] released {}", id);
        }
        self.session = PlaybackSession::idle();
    }

    pub async fn toggle_pause(&mut self) -> anyhow::Result<()> {
        match self.session.state {
            PlaybackState::Idle => Ok(()),
            PlaybackState::Playing => {
                self.player.set_paused(true).await?;
                self.session.state = PlaybackState::Paused;
                Ok(())
            }
            PlaybackState::Paused => {
                self.player.set_paused(false).await?;
                self.session.state = PlaybackState::Playing;
                Ok(())
            }
        }
    }

    /// The player reported its pause flag. Only the state of a live claim
    /// follows it; an idle session stays idle.
    pub fn paused_changed(&mut self, paused: bool) {
        if self.session.state == PlaybackState::Idle || self.player.source().is_none() {
            return;
        }
        let state = if paused {
            PlaybackState::Paused
        } else {
            PlaybackState::Playing
        };
        if state != self.session.state {
            debug!("[playback] player reports {:?}", state);
            self.session.state = state;
        }
    }

    /// The stream ended on its own (eof or error).
    pub fn finished(&mut self) {
        if self.session.state != PlaybackState::Idle {
            debug!("[playback] stream for {:?} ended", self.session.active_message_id);
        }
        self.session = PlaybackSession::idle();
    }
}
