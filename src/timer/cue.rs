//! End-of-phase audio cue.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use tracing::warn;

/// Fire-and-forget sound at a phase boundary. Failures are logged; the
/// phase transition never depends on the cue.
pub trait PhaseCue: Send + Sync {
    fn play(&self);
}

pub struct RodioCue {
    path: PathBuf,
}

impl RodioCue {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PhaseCue for RodioCue {
    fn play(&self) {
        let path = self.path.clone();
        // The output stream is not Send, so each cue gets a short-lived
        // thread that holds it until the sound finishes.
        let spawned = std::thread::Builder::new()
            .name("lofai-cue".into())
            .spawn(move || {
                if let Err(e) = play_file(&path) {
                    warn!("phase cue failed: {e}");
                }
            });
        if let Err(e) = spawned {
            warn!("failed to spawn cue thread: {e}");
        }
    }
}

fn play_file(path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let (_stream, handle) = rodio::OutputStream::try_default()?;
    let sink = rodio::Sink::try_new(&handle)?;
    let source = rodio::Decoder::new(BufReader::new(File::open(path)?))?;
    sink.append(source);
    sink.sleep_until_end();
    Ok(())
}
