//! Playback session controller.
//!
//! Owns the one audio sink, sequences load/play/pause/advance against the
//! remote track source and emits presence signals. Two playing flags are
//! kept deliberately: `live_intent` is updated synchronously on every user
//! intent change, `rendered_playing` only when an operation settles. The
//! intent flag gates everything asynchronous, so a finished auto-advance or
//! a slow play can never resurrect playback the user has since paused.

use std::sync::{
    Arc, Weak,
    atomic::{AtomicBool, AtomicU32, Ordering},
};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::common::SinkError;
use crate::playback::sink::{AudioSink, SinkFactory};
use crate::playback::source::TrackSource;
use crate::presence::{PresenceSender, PresenceSignal};
use crate::prompt;

#[derive(Clone)]
pub struct PlaybackSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    source: Arc<dyn TrackSource>,
    presence: Arc<dyn PresenceSender>,
    sink_factory: SinkFactory,
    sink: Mutex<Option<Arc<dyn AudioSink>>>,
    end_watch: Mutex<Option<JoinHandle<()>>>,
    /// True current intent, always up to date.
    live_intent: AtomicBool,
    /// What the surface shows; lags until async operations settle.
    rendered_playing: AtomicBool,
    /// Whether the sink has a source attached.
    loaded: AtomicBool,
    current_track: AtomicU32,
    /// Logical volume as f32 bits; survives sink recreation.
    volume: AtomicU32,
}

impl PlaybackSession {
    pub fn new(
        source: Arc<dyn TrackSource>,
        presence: Arc<dyn PresenceSender>,
        sink_factory: SinkFactory,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                source,
                presence,
                sink_factory,
                sink: Mutex::new(None),
                end_watch: Mutex::new(None),
                live_intent: AtomicBool::new(false),
                rendered_playing: AtomicBool::new(false),
                loaded: AtomicBool::new(false),
                current_track: AtomicU32::new(0),
                volume: AtomicU32::new(1.0f32.to_bits()),
            }),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.inner.rendered_playing.load(Ordering::Acquire)
    }

    pub fn current_track(&self) -> u32 {
        self.inner.current_track.load(Ordering::Acquire)
    }

    pub fn volume(&self) -> f32 {
        f32::from_bits(self.inner.volume.load(Ordering::Acquire))
    }

    /// Flip between playing and paused. Play-side failures are logged and
    /// leave the session paused; a fresh toggle retries.
    pub async fn toggle_playback(&self) {
        let sink = self.ensure_sink();
        let inner = &self.inner;

        if inner.live_intent.load(Ordering::Acquire) {
            inner.live_intent.store(false, Ordering::Release);
            sink.pause();
            inner.presence.send(PresenceSignal::Paused);
            inner.rendered_playing.store(false, Ordering::Release);
            return;
        }

        inner.live_intent.store(true, Ordering::Release);
        let result = if inner.loaded.load(Ordering::Acquire) {
            sink.play().await
        } else {
            let track = inner.current_track.load(Ordering::Acquire);
            self.load_and_play(&sink, track).await
        };

        match result {
            Ok(()) => {
                if inner.live_intent.load(Ordering::Acquire) {
                    inner.presence.send(PresenceSignal::Listening);
                    inner.rendered_playing.store(true, Ordering::Release);
                } else {
                    // Paused again while the play was settling; the later
                    // intent wins.
                    sink.pause();
                }
            }
            Err(e) => {
                warn!("playback start failed: {e}");
                inner.live_intent.store(false, Ordering::Release);
                inner.rendered_playing.store(false, Ordering::Release);
            }
        }
    }

    /// Ask the backend for the next track. Called on natural end of track
    /// and on an explicit skip. A failed request changes nothing.
    pub async fn advance_track(&self) {
        let inner = &self.inner;
        match inner.source.next_track().await {
            Ok(next) => {
                inner.current_track.store(next, Ordering::Release);
                if inner.live_intent.load(Ordering::Acquire) {
                    let sink = self.ensure_sink();
                    if let Err(e) = self.load_and_play(&sink, next).await {
                        warn!("failed to start track {next}: {e}");
                    }
                }
            }
            Err(e) => warn!("failed to advance track: {e}"),
        }
    }

    /// Update the logical volume and apply it to the live sink if one
    /// exists. A later-created sink inherits it.
    pub fn set_volume(&self, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        self.inner.volume.store(volume.to_bits(), Ordering::Release);
        if let Some(sink) = self.inner.sink.lock().as_ref() {
            sink.set_volume(volume);
        }
    }

    /// Quantize the raw control values and push the new generation prompt.
    /// Best effort; never blocks playback.
    pub async fn update_prompt(&self, mood: f64, instrument: f64) {
        let mood = prompt::mood_label(prompt::snap(mood));
        let instruments = prompt::instrument_label(prompt::snap(instrument));
        match self.inner.source.update_prompt(mood, instruments).await {
            Ok(()) => debug!("prompt updated: mood={mood} instruments={instruments}"),
            Err(e) => warn!("prompt update failed: {e}"),
        }
    }

    async fn load_and_play(&self, sink: &Arc<dyn AudioSink>, track: u32) -> Result<(), SinkError> {
        debug!("loading track {track}");
        sink.load(&self.inner.source.stream_url(track)).await?;
        // Volume goes in on the same step as the load, before the
        // asynchronous play.
        sink.set_volume(self.volume());
        self.inner.loaded.store(true, Ordering::Release);
        sink.play().await
    }

    /// Create the sink on first use and attach the end-of-track watcher.
    fn ensure_sink(&self) -> Arc<dyn AudioSink> {
        let mut guard = self.inner.sink.lock();
        if let Some(sink) = guard.as_ref() {
            return sink.clone();
        }

        let (sink, mut ended) = (self.inner.sink_factory)();
        sink.set_volume(self.volume());

        // Weak reference so the watcher does not keep the session alive.
        let weak: Weak<SessionInner> = Arc::downgrade(&self.inner);
        let watcher = tokio::spawn(async move {
            while ended.recv().await.is_some() {
                let Some(inner) = weak.upgrade() else { break };
                PlaybackSession { inner }.advance_track().await;
            }
        });
        *self.inner.end_watch.lock() = Some(watcher);

        *guard = Some(sink.clone());
        sink
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        if let Some(watcher) = self.end_watch.lock().take() {
            watcher.abort();
        }
    }
}
