//! Turn sequencing for one human-versus-model match.
//!
//! `Match` never performs I/O. Operations that need the inference service hand
//! back a [`Dispatch`]; whoever runs the request feeds the result back with
//! the same [`Ticket`]. Replies whose ticket is no longer current are dropped,
//! which is how reset, backend switches and board changes cancel in-flight
//! work regardless of arrival order.

use tracing::{debug, info, warn};

use crate::error::ServiceError;
use crate::game::{Board, GameOutcome, Player};
use crate::inference::{BackendDescriptor, InferenceRequest, InferenceResponse};
use crate::policy::select_column;

/// The human always plays Red and opens.
pub const HUMAN: Player = Player::Red;
pub const OPPONENT: Player = Player::Yellow;

pub const STATUS_OPENING: &str = "You play first. Drop a disc to begin.";
pub const STATUS_HUMAN_WIN: &str = "You win! Reset to play again.";
pub const STATUS_DRAW: &str = "Stalemate! No more moves.";
pub const STATUS_THINKING: &str = "AI thinking…";
pub const STATUS_OPPONENT_WIN: &str = "AI wins this round.";
pub const STATUS_YOUR_MOVE: &str = "Your move.";
pub const STATUS_RESET: &str = "Fresh board. You play first.";
const STATUS_NO_REPLY_MOVE: &str = "Inference failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingHumanMove,
    OpponentThinking,
    /// The opponent request failed. It is still the opponent's turn; only a
    /// retry, a backend switch or a reset moves things on.
    OpponentStalled,
    Terminal,
}

/// Identifies one outstanding inference request. Strictly increasing for the
/// lifetime of a `Match`, across resets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// An inference request the caller must run and answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub ticket: Ticket,
    pub request: InferenceRequest,
}

/// Read-only view of everything the presentation layer shows.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchSnapshot {
    pub board: Board,
    pub phase: Phase,
    pub to_move: Player,
    pub legal_moves: Vec<usize>,
    pub outcome: GameOutcome,
    pub hint_column: Option<usize>,
    pub last_opponent_column: Option<usize>,
    pub status: String,
    pub backend: String,
    pub last_latency_ms: Option<f64>,
    pub last_backend: Option<String>,
    pub backends: Vec<BackendDescriptor>,
}

#[derive(Debug, Clone)]
pub struct Match {
    board: Board,
    phase: Phase,
    backend: String,
    backends: Vec<BackendDescriptor>,
    status: String,
    hint: Option<usize>,
    last_opponent_column: Option<usize>,
    last_latency_ms: Option<f64>,
    last_backend: Option<String>,
    next_ticket: u64,
    opponent_ticket: Option<Ticket>,
    hint_ticket: Option<Ticket>,
    /// A hint has not yet been requested for the current board and backend.
    hint_due: bool,
}

impl Match {
    pub fn new(backend: impl Into<String>) -> Self {
        Match {
            board: Board::new(),
            phase: Phase::AwaitingHumanMove,
            backend: backend.into(),
            backends: Vec::new(),
            status: STATUS_OPENING.to_string(),
            hint: None,
            last_opponent_column: None,
            last_latency_ms: None,
            last_backend: None,
            next_ticket: 0,
            opponent_ticket: None,
            hint_ticket: None,
            hint_due: true,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn hint(&self) -> Option<usize> {
        self.hint
    }

    /// Side whose disc goes in next.
    pub fn to_move(&self) -> Player {
        match self.phase {
            Phase::OpponentThinking | Phase::OpponentStalled => OPPONENT,
            Phase::AwaitingHumanMove | Phase::Terminal => HUMAN,
        }
    }

    /// Ticket of the hint request in flight, if any.
    pub fn pending_hint(&self) -> Option<Ticket> {
        self.hint_ticket
    }

    /// Ticket of the opponent request in flight, if any.
    pub fn pending_opponent(&self) -> Option<Ticket> {
        self.opponent_ticket
    }

    /// Drop a human disc. Returns the opponent request to run, or `None` if
    /// the input was ignored or ended the game.
    ///
    /// Input outside `AwaitingHumanMove` and illegal columns are dropped, not
    /// queued.
    pub fn human_move(&mut self, column: usize) -> Option<Dispatch> {
        if self.phase != Phase::AwaitingHumanMove {
            debug!(column, phase = ?self.phase, "ignoring move while not awaiting human");
            return None;
        }
        let next = match self.board.apply_move(column, HUMAN) {
            Ok(next) => next,
            Err(e) => {
                debug!(column, error = %e, "ignoring illegal move");
                return None;
            }
        };

        self.board = next;
        self.clear_hint();

        match self.board.evaluate_outcome() {
            GameOutcome::InProgress => {
                self.phase = Phase::OpponentThinking;
                self.status = STATUS_THINKING.to_string();
                Some(self.issue_opponent())
            }
            outcome => {
                self.finish(outcome);
                None
            }
        }
    }

    /// Apply the opponent's reply. Returns false if the reply was stale.
    pub fn opponent_reply(
        &mut self,
        ticket: Ticket,
        result: Result<InferenceResponse, ServiceError>,
    ) -> bool {
        if self.phase != Phase::OpponentThinking || self.opponent_ticket != Some(ticket) {
            debug!(ticket = ticket.value(), "discarding stale opponent reply");
            return false;
        }
        self.opponent_ticket = None;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, backend = %self.backend, "opponent move failed");
                self.stall(e.to_string());
                return true;
            }
        };

        let played = select_column(&response.policy, &self.board.legal_moves())
            .and_then(|column| Some((column, self.board.apply_move(column, OPPONENT).ok()?)));
        let Some((column, next)) = played else {
            warn!(backend = %response.backend, "opponent reply has no playable column");
            self.stall(STATUS_NO_REPLY_MOVE.to_string());
            return true;
        };

        debug!(
            column,
            backend = %response.backend,
            latency_ms = response.latency_ms,
            "opponent moved"
        );
        self.board = next;
        self.last_opponent_column = Some(column);
        self.last_latency_ms = Some(response.latency_ms);
        self.last_backend = Some(response.backend);

        match self.board.evaluate_outcome() {
            GameOutcome::InProgress => {
                self.phase = Phase::AwaitingHumanMove;
                self.status = STATUS_YOUR_MOVE.to_string();
                self.hint_due = true;
            }
            outcome => self.finish(outcome),
        }
        true
    }

    /// Re-issue the opponent request after a failure.
    pub fn retry_opponent(&mut self) -> Option<Dispatch> {
        if self.phase != Phase::OpponentStalled {
            debug!(phase = ?self.phase, "nothing to retry");
            return None;
        }
        self.phase = Phase::OpponentThinking;
        self.status = STATUS_THINKING.to_string();
        Some(self.issue_opponent())
    }

    /// The hint request to run, if one is due. At most one hint is requested
    /// per board and backend combination.
    pub fn poll_hint(&mut self) -> Option<Dispatch> {
        if self.phase != Phase::AwaitingHumanMove || !self.hint_due || self.hint_ticket.is_some()
        {
            return None;
        }
        self.hint_due = false;
        let ticket = self.next_ticket();
        self.hint_ticket = Some(ticket);
        Some(Dispatch {
            ticket,
            request: InferenceRequest::new(self.board, HUMAN, self.backend.clone()),
        })
    }

    /// Apply a hint reply. Returns false if the reply was stale.
    pub fn hint_reply(
        &mut self,
        ticket: Ticket,
        result: Result<InferenceResponse, ServiceError>,
    ) -> bool {
        if self.hint_ticket != Some(ticket) {
            debug!(ticket = ticket.value(), "discarding stale hint");
            return false;
        }
        self.hint_ticket = None;

        match result {
            Ok(response) => {
                self.hint = select_column(&response.policy, &self.board.legal_moves());
            }
            Err(e) => warn!(error = %e, "failed to fetch hint"),
        }
        true
    }

    /// Route future requests to `key`. Ignored while the opponent is thinking
    /// and for keys missing from a known backend list.
    pub fn select_backend(&mut self, key: &str) -> bool {
        if self.phase == Phase::OpponentThinking {
            debug!(key, "ignoring backend switch while opponent is thinking");
            return false;
        }
        if !self.backends.is_empty() && !self.backends.iter().any(|b| b.key == key) {
            warn!(key, "unknown backend");
            return false;
        }

        info!(key, "routing moves to backend");
        self.status = format!("Routing moves to {} backend.", key.to_uppercase());
        self.last_latency_ms = None;
        self.last_backend = Some(key.to_string());
        if self.backend != key {
            self.backend = key.to_string();
            self.clear_hint();
        }
        true
    }

    /// Replace the known backend list. A non-empty list that lacks the
    /// selected key moves selection to its first entry.
    pub fn set_backends(&mut self, backends: Vec<BackendDescriptor>) {
        if let Some(first) = backends.first() {
            if !backends.iter().any(|b| b.key == self.backend) {
                info!(from = %self.backend, to = %first.key, "selected backend unavailable");
                self.backend = first.key.clone();
                self.clear_hint();
            }
        }
        self.backends = backends;
    }

    /// Start over from an empty board. Any reply still in flight is stale.
    pub fn reset(&mut self) {
        self.board = Board::new();
        self.phase = Phase::AwaitingHumanMove;
        self.status = STATUS_RESET.to_string();
        self.opponent_ticket = None;
        self.last_opponent_column = None;
        self.last_latency_ms = None;
        self.clear_hint();
    }

    pub fn snapshot(&self) -> MatchSnapshot {
        MatchSnapshot {
            board: self.board,
            phase: self.phase,
            to_move: self.to_move(),
            legal_moves: self.board.legal_moves(),
            outcome: self.board.evaluate_outcome(),
            hint_column: self.hint,
            last_opponent_column: self.last_opponent_column,
            status: self.status.clone(),
            backend: self.backend.clone(),
            last_latency_ms: self.last_latency_ms,
            last_backend: self.last_backend.clone(),
            backends: self.backends.clone(),
        }
    }

    fn next_ticket(&mut self) -> Ticket {
        self.next_ticket += 1;
        Ticket(self.next_ticket)
    }

    fn issue_opponent(&mut self) -> Dispatch {
        let ticket = self.next_ticket();
        self.opponent_ticket = Some(ticket);
        Dispatch {
            ticket,
            request: InferenceRequest::new(self.board, OPPONENT, self.backend.clone()),
        }
    }

    fn stall(&mut self, status: String) {
        self.phase = Phase::OpponentStalled;
        self.status = status;
    }

    fn finish(&mut self, outcome: GameOutcome) {
        self.phase = Phase::Terminal;
        self.status = match outcome {
            GameOutcome::Winner(player) if player == HUMAN => STATUS_HUMAN_WIN,
            GameOutcome::Winner(_) => STATUS_OPPONENT_WIN,
            GameOutcome::Draw | GameOutcome::InProgress => STATUS_DRAW,
        }
        .to_string();
        info!(?outcome, "match over");
    }

    /// Forget the current hint and mark a new one due if it is the human's
    /// turn. A hint still in flight becomes stale.
    fn clear_hint(&mut self) {
        self.hint = None;
        self.hint_ticket = None;
        self.hint_due = self.phase == Phase::AwaitingHumanMove;
    }
}
