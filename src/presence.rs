//! Advisory presence signaling to the music generator.
//!
//! One duplex connection, client-to-server only. Delivery is best effort:
//! signals sent while the connection is not open are dropped, never queued,
//! and playback correctness never depends on them.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceSignal {
    Listening,
    Paused,
}

impl PresenceSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Listening => "listening",
            Self::Paused => "paused",
        }
    }
}

/// Anything that can carry a presence signal. The playback session only
/// needs the fire-and-forget send.
pub trait PresenceSender: Send + Sync {
    fn send(&self, signal: PresenceSignal);
}

pub struct PresenceChannel {
    tx: mpsc::UnboundedSender<Message>,
    open: Arc<AtomicBool>,
    io_task: Mutex<Option<JoinHandle<()>>>,
}

impl PresenceChannel {
    /// Open the connection. The I/O task owns the socket for the lifetime of
    /// the channel; a failed connect just leaves the channel closed.
    pub fn connect(url: &str) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
        let open = Arc::new(AtomicBool::new(false));

        let url = url.to_string();
        let open_flag = open.clone();
        let io_task = tokio::spawn(async move {
            let (ws, _) = match connect_async(url.as_str()).await {
                Ok(ok) => ok,
                Err(e) => {
                    warn!("presence connection failed: {e}");
                    return;
                }
            };
            info!("presence channel open: {url}");
            open_flag.store(true, Ordering::Release);

            let (mut sink, mut stream) = ws.split();
            loop {
                tokio::select! {
                    outgoing = rx.recv() => match outgoing {
                        Some(msg) => {
                            if sink.send(msg).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    },
                    incoming = stream.next() => match incoming {
                        // Nothing is expected back; ignore anything that isn't a close.
                        Some(Ok(msg)) if !msg.is_close() => {}
                        _ => break,
                    },
                }
            }
            open_flag.store(false, Ordering::Release);
            info!("presence channel closed");
        });

        Self {
            tx,
            open,
            io_task: Mutex::new(Some(io_task)),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Stop the I/O task and drop the connection. Safe to call twice.
    pub fn close(&self) {
        if let Some(task) = self.io_task.lock().take() {
            task.abort();
        }
        self.open.store(false, Ordering::Release);
    }
}

impl PresenceSender for PresenceChannel {
    fn send(&self, signal: PresenceSignal) {
        if !self.is_open() {
            debug!("presence signal {:?} dropped, channel not open", signal);
            return;
        }
        let _ = self.tx.send(Message::Text(signal.as_str().into()));
    }
}

impl Drop for PresenceChannel {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread")]
    async fn delivers_signals_once_open() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            match ws.next().await {
                Some(Ok(Message::Text(text))) => text.to_string(),
                other => panic!("expected text frame, got {other:?}"),
            }
        });

        let channel = PresenceChannel::connect(&format!("ws://{addr}"));
        for _ in 0..100 {
            if channel.is_open() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(channel.is_open());

        channel.send(PresenceSignal::Listening);
        let received = server.await.unwrap();
        assert_eq!(received, "listening");
    }

    #[tokio::test]
    async fn send_before_open_is_dropped() {
        // Port 9 is discard; the connect fails and the channel stays closed.
        let channel = PresenceChannel::connect("ws://127.0.0.1:9");
        channel.send(PresenceSignal::Paused);
        assert!(!channel.is_open());
    }

    #[tokio::test]
    async fn close_twice_is_a_noop() {
        let channel = PresenceChannel::connect("ws://127.0.0.1:9");
        channel.close();
        channel.close();
        assert!(!channel.is_open());
    }
}
