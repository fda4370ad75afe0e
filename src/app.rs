//! Composition root: wires the timer engine to the site list, persistence and
//! the blocking bridge, and runs everything on one cooperative task.

use crate::blocking::bridge::{BlockingBridge, BlockingSyncPayload, EnforcementSink};
use crate::blocking::sites::{PresetSite, SiteList, normalize, presets_matching};
use crate::error::SiteError;
use crate::pomodoro::cues::{CuePlayer, Notifier};
use crate::pomodoro::engine::{EngineEvent, TimerEngine};
use crate::pomodoro::ledger::{SessionLedger, SessionRecord};
use crate::pomodoro::pomodoro::{SettingsPatch, TimerMode, TimerSettings, window_title};
use crate::storage::store::{BLOCKED_SITES_KEY, HISTORY_KEY, Persistence, SETTINGS_KEY};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

/// Requests a client can make, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Command {
    Start,
    Pause,
    Toggle,
    Reset,
    SetMode { mode: TimerMode },
    AddTime { minutes: i64 },
    UpdateSettings { settings: SettingsPatch },
    AddSite { site: String },
    RemoveSite { site: String },
    ToggleSite { site: String },
    SearchSites { query: String },
    CheckVisit { site: String },
    GetState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Reply {
    State {
        state: TimerSnapshot,
    },
    SyncBlockingState(BlockingSyncPayload),
    Sites {
        sites: Vec<String>,
        presets: Vec<PresetSite>,
    },
    Visit {
        site: String,
        needs_confirmation: bool,
    },
    Error {
        kind: String,
        message: String,
    },
}

impl Reply {
    pub fn error(kind: &str, message: impl Into<String>) -> Self {
        Reply::Error {
            kind: kind.to_string(),
            message: message.into(),
        }
    }
}

impl From<SiteError> for Reply {
    fn from(error: SiteError) -> Self {
        Reply::error(error.kind(), error.to_string())
    }
}

/// Everything the popup renders, recomputed from engine state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub mode: TimerMode,
    pub is_running: bool,
    pub time_left: i64,
    pub total_seconds: i64,
    pub progress: f64,
    pub is_blocking_active: bool,
    pub sessions_completed_today: usize,
    pub goal: u32,
    pub title: String,
    pub settings: TimerSettings,
    pub blocked_sites: Vec<String>,
}

pub struct FocusFlow {
    engine: TimerEngine,
    sites: SiteList,
    persistence: Persistence,
    bridge: BlockingBridge,
}

impl FocusFlow {
    /// Restores stored state, falling back to defaults for any record that is
    /// missing or unusable, and performs the initial sync.
    pub fn load(
        persistence: Persistence,
        sink: Box<dyn EnforcementSink>,
        cues: Box<dyn CuePlayer>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        let settings = persistence
            .load::<TimerSettings>(SETTINGS_KEY)
            .filter(|settings| match settings.validate() {
                Ok(()) => true,
                Err(e) => {
                    warn!("Ignoring stored settings: {}", e);
                    false
                }
            })
            .unwrap_or_default();
        let ledger = persistence
            .load::<Vec<SessionRecord>>(HISTORY_KEY)
            .map(SessionLedger::from_records)
            .unwrap_or_default();
        let sites = persistence
            .load::<Vec<String>>(BLOCKED_SITES_KEY)
            .map(SiteList::from_stored)
            .unwrap_or_default();
        info!(
            history = ledger.len(),
            blocked_sites = sites.len(),
            "Loaded state"
        );

        let mut app = Self {
            engine: TimerEngine::new(settings, ledger, cues, notifier),
            sites,
            persistence,
            bridge: BlockingBridge::new(sink),
        };
        app.settle();
        app
    }

    pub fn engine(&self) -> &TimerEngine {
        &self.engine
    }

    pub fn sites(&self) -> &SiteList {
        &self.sites
    }

    pub fn start(&mut self) {
        self.engine.start();
        self.settle();
    }

    pub fn pause(&mut self) {
        self.engine.pause();
        self.settle();
    }

    pub fn toggle(&mut self) {
        self.engine.toggle();
        self.settle();
    }

    pub fn reset(&mut self) {
        self.engine.reset();
        self.settle();
    }

    pub fn set_mode(&mut self, mode: TimerMode) {
        self.engine.set_mode(mode);
        self.settle();
    }

    pub fn add_time(&mut self, minutes: i64) {
        self.engine.add_time(minutes);
        self.settle();
    }

    pub fn update_settings(
        &mut self,
        patch: &SettingsPatch,
    ) -> Result<(), crate::error::SettingsError> {
        let result = self.engine.update_settings(patch);
        self.settle();
        result
    }

    pub fn add_site(&mut self, input: &str) -> Result<String, SiteError> {
        let site = self.sites.try_add(input)?;
        info!(site = %site, "Site blocked");
        self.sites_changed();
        Ok(site)
    }

    pub fn remove_site(&mut self, site: &str) -> bool {
        let removed = self.sites.remove(site);
        if removed {
            info!(site = %site, "Site unblocked");
            self.sites_changed();
        }
        removed
    }

    pub fn toggle_site(&mut self, input: &str) -> bool {
        let changed = self.sites.toggle(input);
        if changed {
            self.sites_changed();
        }
        changed
    }

    /// A blocked site needs confirmation before opening only while blocking
    /// is in force.
    pub fn needs_visit_confirmation(&self, site: &str) -> bool {
        self.engine.is_blocking_active() && self.sites.contains(&normalize(site))
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        let engine = &self.engine;
        TimerSnapshot {
            mode: engine.mode(),
            is_running: engine.is_running(),
            time_left: engine.time_left(),
            total_seconds: engine.total_seconds(),
            progress: engine.progress(),
            is_blocking_active: engine.is_blocking_active(),
            sessions_completed_today: engine.sessions_completed_today(),
            goal: engine.settings().goal,
            title: window_title(
                engine.time_left(),
                engine.mode(),
                engine.is_blocking_active(),
            ),
            settings: engine.settings().clone(),
            blocked_sites: self.sites.as_slice().to_vec(),
        }
    }

    pub fn handle(&mut self, command: Command) -> Reply {
        debug!(?command, "Handling command");
        match command {
            Command::Start => self.start(),
            Command::Pause => self.pause(),
            Command::Toggle => self.toggle(),
            Command::Reset => self.reset(),
            Command::SetMode { mode } => self.set_mode(mode),
            Command::AddTime { minutes } => self.add_time(minutes),
            Command::UpdateSettings { settings } => {
                if let Err(e) = self.update_settings(&settings) {
                    return Reply::error("invalidSettings", e.to_string());
                }
            }
            Command::AddSite { site } => {
                if let Err(e) = self.add_site(&site) {
                    return e.into();
                }
            }
            Command::RemoveSite { site } => {
                self.remove_site(&site);
            }
            Command::ToggleSite { site } => {
                self.toggle_site(&site);
            }
            Command::SearchSites { query } => {
                return Reply::Sites {
                    sites: self.sites.search(&query),
                    presets: presets_matching(&query),
                };
            }
            Command::CheckVisit { site } => {
                return Reply::Visit {
                    needs_confirmation: self.needs_visit_confirmation(&site),
                    site: normalize(&site),
                };
            }
            Command::GetState => {}
        }
        Reply::State {
            state: self.snapshot(),
        }
    }

    /// Waits for the engine's next tick. Pends forever while idle.
    pub async fn next_tick(&mut self) {
        self.engine.next_tick().await;
    }

    pub fn on_tick(&mut self) {
        self.engine.tick();
        self.settle();
    }

    fn sites_changed(&mut self) {
        self.persistence.save(BLOCKED_SITES_KEY, self.sites.as_slice());
        self.settle();
    }

    /// Lets persistence and the bridge react to whatever just changed.
    fn settle(&mut self) {
        for event in self.engine.take_events() {
            match event {
                EngineEvent::SettingsChanged(settings) => {
                    self.persistence.save(SETTINGS_KEY, &settings);
                }
                EngineEvent::SessionCompleted {
                    record: Some(_), ..
                } => {
                    self.persistence
                        .save(HISTORY_KEY, self.engine.ledger().records());
                }
                EngineEvent::SessionCompleted { record: None, .. } => {}
            }
        }
        self.bridge
            .observe(self.engine.is_blocking_active(), self.sites.as_slice());
    }
}

/// A command from a connection plus where to send the answer.
#[derive(Debug)]
pub struct Request {
    pub command: Command,
    pub reply: oneshot::Sender<Reply>,
}

pub type RequestSender = mpsc::UnboundedSender<Request>;
pub type RequestReceiver = mpsc::UnboundedReceiver<Request>;

pub fn create_request_channel() -> (RequestSender, RequestReceiver) {
    mpsc::unbounded_channel()
}

/// Owns `app` and serializes every mutation and tick onto this one task.
/// Returns once every request sender is gone.
pub async fn run(
    mut app: FocusFlow,
    mut requests: RequestReceiver,
    state_tx: watch::Sender<TimerSnapshot>,
) {
    state_tx.send_replace(app.snapshot());
    loop {
        tokio::select! {
            request = requests.recv() => {
                let Some(request) = request else {
                    break;
                };
                let reply = app.handle(request.command);
                if request.reply.send(reply).is_err() {
                    debug!("Requester went away before the reply");
                }
            }
            _ = app.next_tick() => app.on_tick(),
        }
        state_tx.send_replace(app.snapshot());
    }
    info!("Request channel closed, timer loop stopped");
}
