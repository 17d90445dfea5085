//! Audio-output handle.
//!
//! The session owns exactly one sink, created lazily on the first toggle.
//! The real implementation keeps the rodio output on a dedicated thread and
//! drives it over a command channel; natural end-of-track is reported on a
//! separate event channel so the session can auto-advance.

use std::io::Cursor;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

use crate::common::SinkError;

#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Attach a new source. Replaces whatever was loaded before and leaves
    /// the sink paused at the start of the new source.
    async fn load(&self, url: &str) -> Result<(), SinkError>;

    /// Start or resume playback. May be rejected; the caller decides what a
    /// rejection means.
    async fn play(&self) -> Result<(), SinkError>;

    fn pause(&self);

    fn set_volume(&self, volume: f32);
}

/// Factory for the session's lazily created sink plus its end-of-track
/// event stream.
pub type SinkFactory =
    Box<dyn Fn() -> (Arc<dyn AudioSink>, mpsc::UnboundedReceiver<()>) + Send + Sync>;

enum SinkCommand {
    Load(Vec<u8>, oneshot::Sender<Result<(), SinkError>>),
    Play(oneshot::Sender<Result<(), SinkError>>),
    Pause,
    SetVolume(f32),
}

pub struct RodioSink {
    client: reqwest::Client,
    commands: flume::Sender<SinkCommand>,
    loaded: AtomicBool,
}

impl RodioSink {
    /// Spawn the audio thread and return the handle plus the end-of-track
    /// event receiver.
    pub fn spawn(client: reqwest::Client) -> (Arc<Self>, mpsc::UnboundedReceiver<()>) {
        let (commands, command_rx) = flume::unbounded::<SinkCommand>();
        let (ended_tx, ended_rx) = mpsc::unbounded_channel();

        std::thread::Builder::new()
            .name("lofai-audio".into())
            .spawn(move || audio_thread(command_rx, ended_tx))
            .expect("failed to spawn audio thread");

        (
            Arc::new(Self {
                client,
                commands,
                loaded: AtomicBool::new(false),
            }),
            ended_rx,
        )
    }

    pub fn factory(client: reqwest::Client) -> SinkFactory {
        Box::new(move || {
            let (sink, ended) = Self::spawn(client.clone());
            (sink as Arc<dyn AudioSink>, ended)
        })
    }

    async fn request(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<(), SinkError>>) -> SinkCommand,
    ) -> Result<(), SinkError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(build(reply_tx))
            .map_err(|_| SinkError::Closed)?;
        reply_rx.await.map_err(|_| SinkError::Closed)?
    }
}

#[async_trait]
impl AudioSink for RodioSink {
    async fn load(&self, url: &str) -> Result<(), SinkError> {
        let bytes = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        debug!("fetched {} stream bytes", bytes.len());

        self.request(|reply| SinkCommand::Load(bytes.to_vec(), reply))
            .await?;
        self.loaded.store(true, Ordering::Release);
        Ok(())
    }

    async fn play(&self) -> Result<(), SinkError> {
        if !self.loaded.load(Ordering::Acquire) {
            return Err(SinkError::NoSource);
        }
        self.request(SinkCommand::Play).await
    }

    fn pause(&self) {
        let _ = self.commands.send(SinkCommand::Pause);
    }

    fn set_volume(&self, volume: f32) {
        let _ = self.commands.send(SinkCommand::SetVolume(volume));
    }
}

/// Owns the rodio output for the life of the sink. The output stream is not
/// `Send`, so it never leaves this thread.
fn audio_thread(commands: flume::Receiver<SinkCommand>, ended: mpsc::UnboundedSender<()>) {
    let (_stream, handle) = match rodio::OutputStream::try_default() {
        Ok(out) => out,
        Err(e) => {
            error!("no audio output available: {e}");
            return;
        }
    };
    let sink = match rodio::Sink::try_new(&handle) {
        Ok(sink) => sink,
        Err(e) => {
            error!("failed to open audio sink: {e}");
            return;
        }
    };

    let mut playing = false;
    let mut has_source = false;
    loop {
        match commands.recv_timeout(Duration::from_millis(250)) {
            Ok(SinkCommand::Load(bytes, reply)) => {
                sink.stop();
                playing = false;
                let result = match rodio::Decoder::new(Cursor::new(bytes)) {
                    Ok(decoded) => {
                        sink.append(decoded);
                        sink.pause();
                        has_source = true;
                        Ok(())
                    }
                    Err(e) => {
                        has_source = false;
                        Err(SinkError::Decode(e.to_string()))
                    }
                };
                let _ = reply.send(result);
            }
            Ok(SinkCommand::Play(reply)) => {
                let result = if has_source {
                    sink.play();
                    playing = true;
                    Ok(())
                } else {
                    Err(SinkError::NoSource)
                };
                let _ = reply.send(result);
            }
            Ok(SinkCommand::Pause) => {
                sink.pause();
                playing = false;
            }
            Ok(SinkCommand::SetVolume(volume)) => sink.set_volume(volume),
            Err(flume::RecvTimeoutError::Timeout) => {}
            Err(flume::RecvTimeoutError::Disconnected) => break,
        }

        // Natural end of track: the queue drained while we thought we were
        // playing.
        if playing && sink.empty() {
            playing = false;
            has_source = false;
            debug!("track ended");
            if ended.send(()).is_err() {
                warn!("end-of-track listener gone");
            }
        }
    }
}
