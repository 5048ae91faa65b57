//! The ticker core: single owner of the [`Session`].
//!
//! Everything that can change the session arrives as a [`CoreEvent`] on one
//! channel: HTTP commands, fetch results, gate phase signals and timer
//! firings. After each event the core publishes a fresh snapshot.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use ticker_proto::config::{Config, ConfigError};
use ticker_proto::protocol::Command;
use ticker_proto::state::StateManager;

use crate::breaking::{panel_error, BreakingNewsController, ManualNews, ManualRequestError};
use crate::fetch::Upstreams;
use crate::keys::KeyRotationPool;
use crate::orchestrator::{BackgroundDataOrchestrator, CategoryUpdate, NewsLoaded};
use crate::scheduler::{BarMutation, RotationTiming};
use crate::session::{MainMutation, Session};
use crate::sources::{HttpSource, TextSource};
use crate::timers::{TimerFired, TimerRegistry, TimerSlot};


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateId {
    Main,
    Bar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateSignal {
    Midpoint,
    Settled,
}

#[derive(Debug)]
pub enum CoreEvent {
    Command(Command),
    CategoryLoaded(CategoryUpdate),
    NewsLoaded(NewsLoaded),
    TopicResolved(Result<ManualNews, ManualRequestError>),
    Gate {
        gate: GateId,
        signal: GateSignal,
        token: u64,
    },
    Timer(TimerFired),
    Shutdown,
}

/// Upstream handles the core is built from.
pub struct Sources {
    pub ai: Arc<dyn TextSource>,
    pub http: Arc<dyn HttpSource>,
    pub keys: Arc<KeyRotationPool>,
}

pub struct TickerCore {
    config: Config,
    session: Session,
    timers: TimerRegistry,
    orchestrator: BackgroundDataOrchestrator,
    breaking: BreakingNewsController,
    state_manager: Arc<StateManager>,
    event_tx: mpsc::Sender<CoreEvent>,
}

impl TickerCore {
    pub fn new(config: Config, sources: Sources, event_tx: mpsc::Sender<CoreEvent>) -> Self {
        let upstreams = Upstreams {
            ai: sources.ai,
            http: sources.http,
            timeout: config.schedule.fetch_timeout(),
            web_search: config.ai.web_search,
        };

        let mut session = Session::new(RotationTiming::from(&config.schedule));
        if sources.keys.is_empty() {
            let err = ConfigError::NoCredentials {
                env_var: config.credentials.env_var.clone(),
            };
            error!("[core] {}", err);
            session.config_error = Some(err.to_string());
        } else {
            info!("[core] {} credentials in rotation", sources.keys.len());
        }

        Self {
            orchestrator: BackgroundDataOrchestrator::new(
                upstreams.clone(),
                &config,
                event_tx.clone(),
            ),
            breaking: BreakingNewsController::new(upstreams, event_tx.clone()),
            timers: TimerRegistry::new(event_tx.clone()),
            state_manager: Arc::new(StateManager::new()),
            config,
            session,
            event_tx,
        }
    }

    pub fn state_manager(&self) -> Arc<StateManager> {
        self.state_manager.clone()
    }

    pub async fn run(mut self, mut event_rx: mpsc::Receiver<CoreEvent>) -> anyhow::Result<()> {
        info!("Starting ticker core");
        self.start();
        self.publish().await;

        while let Some(event) = event_rx.recv().await {
            if matches!(event, CoreEvent::Shutdown) {
                info!("Shutdown requested");
                break;
            }
            self.handle_event(event);
            self.publish().await;
        }

        self.timers.cancel_all(&[
            TimerSlot::Refresh,
            TimerSlot::CityAdvance,
            TimerSlot::Dwell,
            TimerSlot::SubViewToggle,
        ]);
        info!("Ticker core stopped");
        Ok(())
    }

    fn start(&mut self) {
        if self.session.config_error.is_some() {
            warn!("[core] no credentials configured, background refresh disabled");
            return;
        }
        self.refresh_all();
        self.timers
            .arm_interval(TimerSlot::Refresh, self.config.schedule.refresh_interval());
    }

    async fn publish(&self) {
        let rev = self.state_manager.publish(self.session.snapshot()).await;
        debug!("[core] published rev {}", rev);
    }

    fn handle_event(&mut self, event: CoreEvent) {
        match event {
            CoreEvent::Command(cmd) => self.handle_command(cmd),
            CoreEvent::CategoryLoaded(update) => self.on_category_loaded(update),
            CoreEvent::NewsLoaded(loaded) => self.on_news_loaded(loaded),
            CoreEvent::TopicResolved(result) => self.on_topic_resolved(result),
            CoreEvent::Gate {
                gate,
                signal,
                token,
            } => self.on_gate(gate, signal, token),
            CoreEvent::Timer(fired) => self.on_timer(fired),
            CoreEvent::Shutdown => {}
        }
    }

    fn handle_command(&mut self, cmd: Command) {
        info!("Processing command: {:?}", cmd);
        match cmd {
            Command::ToggleBreaking => self.request_main(MainMutation::ToggleBreaking),
            Command::RequestTopic { topic, count } => {
                match BreakingNewsController::validate(&topic, count) {
                    Ok(request) => {
                        self.session.manual.open = false;
                        self.session.manual.loading = true;
                        self.session.manual.error = None;
                        self.breaking.request(request);
                    }
                    Err(e) => self.session.manual.error = Some(panel_error(&e)),
                }
            }
            Command::OpenManualPanel => {
                self.session.manual.open = true;
                self.session.manual.error = None;
            }
            Command::CloseManualPanel => self.session.manual.open = false,
            Command::Refresh => {
                if self.session.config_error.is_some() {
                    warn!("[core] refresh ignored, no credentials configured");
                } else {
                    self.refresh_all();
                }
            }
        }
    }

    /// One background cycle plus the ordinary news refresh.
    fn refresh_all(&mut self) {
        self.orchestrator.run_cycle();
        self.refresh_news();
    }

    fn refresh_news(&mut self) {
        if self.session.config_error.is_some() {
            return;
        }
        if self.session.manual_topic_active() {
            debug!("[core] manual topic on air, skipping news refresh");
            return;
        }
        let generation = self.session.next_news_generation();
        self.orchestrator
            .refresh_news(generation, self.session.is_breaking_mode);
    }

    fn on_news_loaded(&mut self, loaded: NewsLoaded) {
        if loaded.generation != self.session.news_generation || self.session.manual_topic_active()
        {
            debug!("[core] discarding stale news gen={}", loaded.generation);
            return;
        }
        self.session
            .set_news(loaded.outcome.items, loaded.outcome.error);
        self.session.last_refresh = Some(chrono::Local::now());
    }

    fn on_category_loaded(&mut self, update: CategoryUpdate) {
        self.session.apply_category(update);
        let bar_idle = self.session.bar_gate.is_idle();
        let request = self.session.rotation.on_data_changed(
            &self.session.category_data,
            bar_idle,
            &mut self.timers,
        );
        if let Some(mutation) = request {
            self.request_bar(mutation);
        }
    }

    fn on_topic_resolved(&mut self, result: Result<ManualNews, ManualRequestError>) {
        self.session.manual.loading = false;
        match result {
            Ok(news) => {
                if self.session.main_gate.is_idle() {
                    self.request_main(MainMutation::ManualTopic(news));
                } else {
                    debug!("[core] main strip busy, holding manual topic");
                    self.session.held_manual = Some(news);
                }
            }
            Err(e) => self.session.manual.error = Some(panel_error(&e)),
        }
    }

    fn on_gate(&mut self, gate: GateId, signal: GateSignal, token: u64) {
        match (gate, signal) {
            (GateId::Main, GateSignal::Midpoint) => {
                if let Some(mutation) = self.session.main_gate.take_midpoint(token) {
                    let toggled = matches!(mutation, MainMutation::ToggleBreaking);
                    self.session.apply_main(mutation);
                    if toggled {
                        self.refresh_news();
                    }
                }
            }
            (GateId::Main, GateSignal::Settled) => {
                if self.session.main_gate.settle(token) {
                    if let Some(news) = self.session.held_manual.take() {
                        self.request_main(MainMutation::ManualTopic(news));
                    }
                }
            }
            (GateId::Bar, GateSignal::Midpoint) => {
                if let Some(mutation) = self.session.bar_gate.take_midpoint(token) {
                    self.session.rotation.apply_bar(
                        mutation,
                        &self.session.category_data,
                        &mut self.timers,
                    );
                }
            }
            (GateId::Bar, GateSignal::Settled) => {
                if self.session.bar_gate.settle(token) {
                    self.session.rotation.on_settled(&mut self.timers);
                }
            }
        }
    }

    fn on_timer(&mut self, fired: TimerFired) {
        if !self.timers.accept(fired) {
            return;
        }
        match fired.slot {
            TimerSlot::Refresh => {
                info!("[core] scheduled refresh");
                self.refresh_all();
            }
            TimerSlot::CityAdvance => {
                let len = self.session.category_data.weather_len();
                if self.session.rotation.on_city_tick(len) {
                    self.request_bar(BarMutation::Advance);
                }
            }
            TimerSlot::Dwell => self.request_bar(BarMutation::Advance),
            TimerSlot::SubViewToggle => self.session.rotation.on_sub_view_tick(),
        }
    }

    fn request_main(&mut self, mutation: MainMutation) {
        match self.session.main_gate.trigger(mutation) {
            Some(token) => self.spawn_flip(GateId::Main, token),
            None => debug!("[core] main strip flipping, request dropped"),
        }
    }

    /// Bar flips are never queued; a rejected advance waits for the next
    /// natural trigger.
    fn request_bar(&mut self, mutation: BarMutation) {
        match self.session.bar_gate.trigger(mutation) {
            Some(token) => {
                self.session.rotation.on_flip_started(&mut self.timers);
                self.spawn_flip(GateId::Bar, token);
            }
            None => debug!("[core] bar flipping, {:?} dropped", mutation),
        }
    }

    fn spawn_flip(&self, gate: GateId, token: u64) {
        spawn_flip(
            self.event_tx.clone(),
            gate,
            token,
            self.config.schedule.flip_half(),
        );
    }
}

/// Drive one flip: midpoint after `half`, settle after another `half`.
fn spawn_flip(tx: mpsc::Sender<CoreEvent>, gate: GateId, token: u64, half: Duration) {
    tokio::spawn(async move {
        for signal in [GateSignal::Midpoint, GateSignal::Settled] {
            tokio::time::sleep(half).await;
            let event = CoreEvent::Gate {
                gate,
                signal,
                token,
            };
            if tx.send(event).await.is_err() {
                break;
            }
        }
    });
}
