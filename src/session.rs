//! The session loop: one task that owns the match and the telemetry window,
//! runs inference in spawned tasks and reports every change as an update.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::{CommandError, ServiceError};
use crate::game::COLS;
use crate::inference::{BackendDescriptor, InferenceResponse, InferenceService, MetricsSummary};
use crate::orchestrator::{Dispatch, Match, MatchSnapshot, Ticket};
use crate::telemetry::{Ingestor, StreamEvent, StreamState, TelemetrySample};

/// Input from the presentation side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Zero-based column.
    Drop(usize),
    SelectBackend(String),
    RetryOpponent,
    Reset,
    RefreshBackends,
    Shutdown,
}

impl FromStr for SessionCommand {
    type Err = CommandError;

    /// Parse one line of player input. Columns are typed 1-based.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim();
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Err(CommandError::Unknown(String::new()));
        };

        match head.to_ascii_lowercase().as_str() {
            "r" | "reset" => Ok(SessionCommand::Reset),
            "retry" => Ok(SessionCommand::RetryOpponent),
            "backends" => Ok(SessionCommand::RefreshBackends),
            "q" | "quit" => Ok(SessionCommand::Shutdown),
            "b" | "backend" => words
                .next()
                .map(|key| SessionCommand::SelectBackend(key.to_string()))
                .ok_or(CommandError::MissingBackend),
            other if other.chars().all(|c| c.is_ascii_digit()) => match other.parse::<usize>() {
                Ok(n) if (1..=COLS).contains(&n) => Ok(SessionCommand::Drop(n - 1)),
                _ => Err(CommandError::Column(other.to_string())),
            },
            _ => Err(CommandError::Unknown(line.to_string())),
        }
    }
}

/// Output to the presentation side.
#[derive(Debug, Clone)]
pub enum SessionUpdate {
    Match(MatchSnapshot),
    Backends(Vec<BackendDescriptor>),
    Summary(MetricsSummary),
    /// Recent samples, oldest first.
    Telemetry(Vec<TelemetrySample>),
    Stream(StreamState),
}

/// Result of a spawned network call.
enum Reply {
    Opponent(Ticket, Result<InferenceResponse, ServiceError>),
    Hint(Ticket, Result<InferenceResponse, ServiceError>),
    Backends(Result<Vec<BackendDescriptor>, ServiceError>),
    Summary(Result<MetricsSummary, ServiceError>),
}

pub struct Session<S> {
    service: Arc<S>,
    game: Match,
    telemetry: Ingestor,
    summary_interval: Duration,
    hint_task: Option<(Ticket, AbortHandle)>,
}

impl<S: InferenceService> Session<S> {
    pub fn new(
        service: S,
        backend: impl Into<String>,
        buffer_capacity: usize,
        summary_interval: Duration,
    ) -> Self {
        Session {
            service: Arc::new(service),
            game: Match::new(backend),
            telemetry: Ingestor::new(buffer_capacity),
            summary_interval,
            hint_task: None,
        }
    }

    pub fn from_config(service: S, config: &AppConfig) -> Self {
        Self::new(
            service,
            config.service.default_backend.clone(),
            config.telemetry.buffer_capacity,
            config.session.summary_interval(),
        )
    }

    pub fn game(&self) -> &Match {
        &self.game
    }

    /// Run until `Shutdown`, the command channel closes, or nobody is
    /// listening for updates. Returns the final match state.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<SessionCommand>,
        mut stream_events: mpsc::Receiver<StreamEvent>,
        updates: mpsc::Sender<SessionUpdate>,
    ) -> MatchSnapshot {
        let mut tasks: JoinSet<Reply> = JoinSet::new();
        let mut summary_tick = tokio::time::interval(self.summary_interval);
        summary_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut stream_live = true;

        info!(backend = %self.game.backend(), "session started");
        self.spawn_backends(&mut tasks);
        self.publish_match(&updates).await;

        loop {
            self.sync_hint(&mut tasks);

            tokio::select! {
                command = commands.recv() => match command {
                    Some(SessionCommand::Shutdown) | None => break,
                    Some(command) => {
                        self.handle_command(command, &mut tasks);
                        self.publish_match(&updates).await;
                    }
                },
                Some(joined) = tasks.join_next() => match joined {
                    Ok(reply) => self.handle_reply(reply, &mut tasks, &updates).await,
                    Err(e) if e.is_cancelled() => {}
                    Err(e) => warn!(error = %e, "inference task failed"),
                },
                event = stream_events.recv(), if stream_live => match event {
                    Some(event) => self.handle_stream(event, &updates).await,
                    None => {
                        debug!("telemetry stream gone");
                        stream_live = false;
                    }
                },
                _ = summary_tick.tick() => self.spawn_summary(&mut tasks),
                _ = updates.closed() => break,
            }
        }

        tasks.abort_all();
        info!("session stopped");
        self.game.snapshot()
    }

    fn handle_command(&mut self, command: SessionCommand, tasks: &mut JoinSet<Reply>) {
        debug!(?command, "command");
        match command {
            SessionCommand::Drop(column) => {
                if let Some(dispatch) = self.game.human_move(column) {
                    self.spawn_infer(tasks, dispatch, Reply::Opponent);
                }
            }
            SessionCommand::SelectBackend(key) => {
                self.game.select_backend(&key);
            }
            SessionCommand::RetryOpponent => {
                if let Some(dispatch) = self.game.retry_opponent() {
                    self.spawn_infer(tasks, dispatch, Reply::Opponent);
                }
            }
            SessionCommand::Reset => self.game.reset(),
            SessionCommand::RefreshBackends => self.spawn_backends(tasks),
            SessionCommand::Shutdown => {}
        }
    }

    async fn handle_reply(
        &mut self,
        reply: Reply,
        tasks: &mut JoinSet<Reply>,
        updates: &mpsc::Sender<SessionUpdate>,
    ) {
        match reply {
            Reply::Opponent(ticket, result) => {
                if self.game.opponent_reply(ticket, result) {
                    self.publish_match(updates).await;
                    self.spawn_summary(tasks);
                }
            }
            Reply::Hint(ticket, result) => {
                if self.hint_task.as_ref().is_some_and(|(t, _)| *t == ticket) {
                    self.hint_task = None;
                }
                if self.game.hint_reply(ticket, result) {
                    self.publish_match(updates).await;
                }
            }
            Reply::Backends(Ok(backends)) => {
                debug!(count = backends.len(), "backends loaded");
                self.game.set_backends(backends.clone());
                publish(updates, SessionUpdate::Backends(backends)).await;
                self.publish_match(updates).await;
            }
            Reply::Backends(Err(e)) => warn!(error = %e, "failed to load backends"),
            Reply::Summary(Ok(summary)) => publish(updates, SessionUpdate::Summary(summary)).await,
            Reply::Summary(Err(e)) => warn!(error = %e, "failed to load metrics summary"),
        }
    }

    async fn handle_stream(&mut self, event: StreamEvent, updates: &mpsc::Sender<SessionUpdate>) {
        let update = match &event {
            StreamEvent::State(state) => Some(SessionUpdate::Stream(*state)),
            StreamEvent::Sample(_) => None,
        };
        if self.telemetry.apply(event) {
            publish(updates, SessionUpdate::Telemetry(self.telemetry.snapshot())).await;
        }
        if let Some(update) = update {
            publish(updates, update).await;
        }
    }

    /// Abort a hint that went stale and start one if it is due.
    fn sync_hint(&mut self, tasks: &mut JoinSet<Reply>) {
        if let Some((ticket, handle)) = self.hint_task.take() {
            if self.game.pending_hint() == Some(ticket) {
                self.hint_task = Some((ticket, handle));
            } else {
                debug!(ticket = ticket.value(), "aborting stale hint");
                handle.abort();
            }
        }
        if let Some(dispatch) = self.game.poll_hint() {
            let ticket = dispatch.ticket;
            let handle = self.spawn_infer(tasks, dispatch, Reply::Hint);
            self.hint_task = Some((ticket, handle));
        }
    }

    fn spawn_infer(
        &self,
        tasks: &mut JoinSet<Reply>,
        dispatch: Dispatch,
        reply: fn(Ticket, Result<InferenceResponse, ServiceError>) -> Reply,
    ) -> AbortHandle {
        let service = Arc::clone(&self.service);
        tasks.spawn(async move {
            let result = service.infer(dispatch.request).await;
            reply(dispatch.ticket, result)
        })
    }

    fn spawn_backends(&self, tasks: &mut JoinSet<Reply>) {
        let service = Arc::clone(&self.service);
        tasks.spawn(async move { Reply::Backends(service.backends().await) });
    }

    fn spawn_summary(&self, tasks: &mut JoinSet<Reply>) {
        let service = Arc::clone(&self.service);
        tasks.spawn(async move { Reply::Summary(service.metrics_summary().await) });
    }

    async fn publish_match(&self, updates: &mpsc::Sender<SessionUpdate>) {
        publish(updates, SessionUpdate::Match(self.game.snapshot())).await;
    }
}

async fn publish(updates: &mpsc::Sender<SessionUpdate>, update: SessionUpdate) {
    // A closed receiver ends the loop on its next turn
    let _ = updates.send(update).await;
}
