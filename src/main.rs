use std::sync::Arc;

use lofai::common::http::HttpClient;
use lofai::config::Config;
use lofai::playback::{HttpTrackSource, PlaybackSession, RodioSink};
use lofai::presence::PresenceChannel;
use lofai::storage::{JsonFileStore, TimerSettings, load_timer_settings, save_timer_settings};
use lofai::timer::{IntervalTimerEngine, Phase, RodioCue};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    let default_level = config
        .logging
        .as_ref()
        .and_then(|l| l.level.clone())
        .unwrap_or_else(|| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let store = Arc::new(JsonFileStore::open(&config.storage.path));
    let settings = load_timer_settings(
        store.as_ref(),
        TimerSettings {
            work_minutes: config.timer.work_minutes,
            break_minutes: config.timer.break_minutes,
        },
    );
    let timer = IntervalTimerEngine::with_settings(
        Arc::new(RodioCue::new(&config.timer.cue_path)),
        settings,
    );

    let client = HttpClient::new()?;
    let presence = Arc::new(PresenceChannel::connect(&config.backend.ws_url));
    let source = Arc::new(HttpTrackSource::new(
        client.clone(),
        &config.backend.http_base,
    ));
    let session = PlaybackSession::new(source, presence.clone(), RodioSink::factory(client));

    info!("lofai ready, backend at {}", config.backend.http_base);
    println!(
        "commands: play | next | volume <0-100> | mood <0-100> | instrument <0-100> | \
         timer start|pause|reset | work <min> | break <min> | status | quit"
    );

    let mut mood = 50.0f64;
    let mut instrument = 50.0f64;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => line,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        };

        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some("play"), _) => session.toggle_playback().await,
            (Some("next"), _) => session.advance_track().await,
            (Some("volume"), Some(v)) => {
                if let Ok(v) = v.parse::<f64>() {
                    session.set_volume((v / 100.0) as f32);
                }
            }
            (Some("mood"), Some(v)) => {
                if let Ok(v) = v.parse::<f64>() {
                    mood = v;
                    session.update_prompt(mood, instrument).await;
                }
            }
            (Some("instrument"), Some(v)) => {
                if let Ok(v) = v.parse::<f64>() {
                    instrument = v;
                    session.update_prompt(mood, instrument).await;
                }
            }
            (Some("timer"), Some("start")) => timer.start(),
            (Some("timer"), Some("pause")) => timer.pause(),
            (Some("timer"), Some("reset")) => timer.reset(),
            (Some("work"), Some(v)) => {
                if let Ok(minutes) = v.parse::<u32>() {
                    timer.set_duration(Phase::Work, minutes);
                    save_timer_settings(store.as_ref(), timer.settings());
                }
            }
            (Some("break"), Some(v)) => {
                if let Ok(minutes) = v.parse::<u32>() {
                    timer.set_duration(Phase::Break, minutes);
                    save_timer_settings(store.as_ref(), timer.settings());
                }
            }
            (Some("status"), _) => {
                let remaining = timer.remaining_secs();
                println!(
                    "track {} | {} | timer {:?} {:02}:{:02} ({}) | progress {:.2}",
                    session.current_track(),
                    if session.is_playing() { "playing" } else { "paused" },
                    timer.phase(),
                    (remaining / 60.0) as u32,
                    (remaining % 60.0) as u32,
                    if timer.is_running() { "running" } else { "stopped" },
                    timer.progress(),
                );
            }
            (Some("quit"), _) => break,
            (Some(other), _) => println!("unknown command: {other}"),
            (None, _) => {}
        }
    }

    // Periodic loops and the duplex connection must not outlive us.
    timer.pause();
    presence.close();
    info!("bye");
    Ok(())
}
