use clap::Parser;
use focusflow::app::{self, FocusFlow};
use focusflow::blocking::bridge::WatchSink;
use focusflow::config::Config;
use focusflow::pomodoro::cues::{
    CuePlayer, DesktopNotifier, DisabledNotifier, Notifier, SilentCuePlayer, SystemCuePlayer,
};
use focusflow::pomodoro::pomodoro::format_clock;
use focusflow::storage::store::{Persistence, open_store};
use focusflow::ws::websocket_server::{ServerChannels, start_websocket_server};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::filter::LevelFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_max_level(if config.verbose {
            LevelFilter::DEBUG
        } else {
            LevelFilter::INFO
        })
        .init();

    let data_dir = config.data_dir();
    let store = open_store(&data_dir);

    let sink = WatchSink::new();
    let cues: Box<dyn CuePlayer> = if config.mute {
        Box::new(SilentCuePlayer)
    } else {
        Box::new(SystemCuePlayer)
    };
    let notifier: Box<dyn Notifier> = if config.no_notify {
        Box::new(DisabledNotifier)
    } else {
        Box::new(DesktopNotifier)
    };

    let app = FocusFlow::load(
        Persistence::new(store),
        Box::new(sink.clone()),
        cues,
        notifier,
    );

    let settings = app.engine().settings().clone();
    println!("🍅 FocusFlow - Pomodoro Timer & Site Blocker");
    println!("======================================================");
    println!(
        "Pomodoro settings: {}min work / {}min short break / {}min long break",
        settings.work, settings.short_break, settings.long_break
    );
    println!(
        "Today: {}/{} sessions, {} left on the clock",
        app.engine().sessions_completed_today(),
        settings.goal,
        format_clock(app.engine().time_left())
    );
    println!("Data directory: {}", data_dir.display());
    println!("Running WebSocket server on ws://{}\n", config.addr);

    let (requests, request_rx) = app::create_request_channel();
    let (state_tx, states) = watch::channel(app.snapshot());

    let channels = ServerChannels {
        requests,
        payloads: sink,
        states,
    };
    let addr = config.addr;
    tokio::spawn(async move {
        if let Err(e) = start_websocket_server(addr, channels).await {
            error!("WebSocket server error: {}", e);
        }
    });

    tokio::select! {
        _ = app::run(app, request_rx, state_tx) => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Shutting down");
        }
    }
    Ok(())
}
