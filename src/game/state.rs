//! Game State and Flip Sequencing
//!
//! The synchronous half of the engine. `flip` applies the immediate effects
//! of a flip request; `resolve_pending` and `complete` are the continuations
//! the session layer runs once their delays elapse.

use serde::{Serialize, Deserialize};

use crate::core::hash::{StateHash, StateHasher, compute_state_hash};
use crate::game::board::Board;
use crate::game::error::GameError;
use crate::game::events::GameEvent;
use crate::game::symbol::Symbol;
use crate::game::tile::{Tile, TileState};

/// Most tiles that may be face up at once.
pub const MAX_FLIPPED: usize = 2;

/// Why a flip request was refused. A refused flip changes nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// The tile is already matched.
    AlreadyMatched,
    /// The tile is already face up.
    AlreadyFlipped,
    /// Two tiles are face up and waiting to be resolved.
    PairPending,
}

/// A second flip waiting for its resolution delay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingResolution {
    /// First-flipped tile, then second-flipped tile.
    pub pair: [usize; 2],
    /// State both tiles move to.
    pub resolved: TileState,
}

impl PendingResolution {
    /// Did the pair match?
    pub fn is_match(&self) -> bool {
        self.resolved == TileState::Matched
    }
}

/// Result of an accepted or refused flip.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlipOutcome {
    /// Nothing changed.
    Rejected(RejectReason),
    /// First tile of a pair is face up.
    FirstOfPair,
    /// Second tile is face up; the pair resolves later.
    SecondOfPair(PendingResolution),
}

impl FlipOutcome {
    /// Was the flip applied?
    pub fn is_accepted(&self) -> bool {
        !matches!(self, FlipOutcome::Rejected(_))
    }

    /// The resolution that must be scheduled, if any.
    pub fn pending(&self) -> Option<PendingResolution> {
        match self {
            FlipOutcome::SecondOfPair(pending) => Some(*pending),
            _ => None,
        }
    }
}

/// Outcome of applying a pending resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolution {
    /// The pair that settled.
    pub pair: [usize; 2],
    /// State both tiles ended in.
    pub state: TileState,
    /// Did this resolution finish the game?
    pub finished: bool,
}

/// Live state of one game.
#[derive(Clone, Debug)]
pub struct GameState {
    board: Board,
    try_count: u32,
    finished: bool,
    completion_signaled: bool,
    pending: Option<PendingResolution>,
    pending_events: Vec<GameEvent>,
}

impl GameState {
    /// Start a game on a freshly generated board.
    pub fn new(board: Board) -> Self {
        Self {
            board,
            try_count: 0,
            finished: false,
            completion_signaled: false,
            pending: None,
            pending_events: Vec::new(),
        }
    }

    /// The board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Second flips made so far.
    pub fn try_count(&self) -> u32 {
        self.try_count
    }

    /// True once every tile is matched.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// True once the game-complete signal has fired.
    pub fn completion_signaled(&self) -> bool {
        self.completion_signaled
    }

    /// The pair awaiting resolution, if any.
    pub fn pending(&self) -> Option<PendingResolution> {
        self.pending
    }

    /// Would `flip(index)` be accepted right now?
    pub fn is_selectable(&self, index: usize) -> bool {
        match self.board.get(index) {
            Ok(tile) => tile.state == TileState::Start && self.board.flipped_count() < MAX_FLIPPED,
            Err(_) => false,
        }
    }

    /// Apply the immediate effects of flipping the tile at `index`.
    ///
    /// On the second flip of a pair the returned outcome carries the
    /// resolution the caller must apply later via [`resolve_pending`].
    ///
    /// [`resolve_pending`]: GameState::resolve_pending
    pub fn flip(&mut self, index: usize) -> Result<FlipOutcome, GameError> {
        let tile = *self.board.get(index)?;

        match tile.state {
            TileState::Matched => return Ok(FlipOutcome::Rejected(RejectReason::AlreadyMatched)),
            TileState::Flipped => return Ok(FlipOutcome::Rejected(RejectReason::AlreadyFlipped)),
            TileState::Start => {}
        }

        let flipped = self.board.flipped_indices();
        if flipped.len() >= MAX_FLIPPED {
            return Ok(FlipOutcome::Rejected(RejectReason::PairPending));
        }

        // The other face-up tile must be read before this one turns over.
        let partner: Option<(usize, Tile)> = match flipped.as_slice() {
            [] => None,
            [first] => Some((*first, *self.board.get(*first)?)),
            _ => {
                return Err(GameError::InvalidState(format!(
                    "{} tiles face up",
                    flipped.len()
                )))
            }
        };

        self.board.transition(index, TileState::Flipped)?;
        self.push_event(GameEvent::tile_flipped(self.try_count, index, tile.content));

        let Some((first, first_tile)) = partner else {
            return Ok(FlipOutcome::FirstOfPair);
        };

        self.try_count += 1;

        let resolved = if first_tile.content == tile.content {
            TileState::Matched
        } else {
            TileState::Start
        };
        let pending = PendingResolution {
            pair: [first, index],
            resolved,
        };

        if pending.is_match() {
            self.push_event(GameEvent::match_detected(self.try_count, pending.pair, tile.content));
        }

        self.pending = Some(pending);
        Ok(FlipOutcome::SecondOfPair(pending))
    }

    /// Settle the pending pair: every face-up tile moves to the resolved
    /// state in one step, then completion is checked.
    pub fn resolve_pending(&mut self) -> Result<Resolution, GameError> {
        let pending = self
            .pending
            .ok_or_else(|| GameError::InvalidState("no pair awaiting resolution".to_string()))?;

        let flipped = self.board.flipped_indices();
        if flipped.len() != MAX_FLIPPED {
            return Err(GameError::InvalidState(format!(
                "resolution expected {} face-up tiles, found {}",
                MAX_FLIPPED,
                flipped.len()
            )));
        }

        // Validated above, so this loop cannot stop halfway.
        for index in flipped {
            self.board.transition(index, pending.resolved)?;
        }
        self.pending = None;

        if self.board.all_matched() {
            self.finished = true;
        }

        let resolution = Resolution {
            pair: pending.pair,
            state: pending.resolved,
            finished: self.finished,
        };
        self.push_event(GameEvent::pair_resolved(
            self.try_count,
            resolution.pair,
            resolution.state,
            resolution.finished,
        ));

        Ok(resolution)
    }

    /// Fire the game-complete signal. Returns false if it already fired.
    pub fn complete(&mut self) -> Result<bool, GameError> {
        if !self.finished {
            return Err(GameError::InvalidState(
                "completion signaled before every tile matched".to_string(),
            ));
        }
        if self.completion_signaled {
            return Ok(false);
        }

        self.completion_signaled = true;
        self.push_event(GameEvent::game_complete(self.try_count));
        Ok(true)
    }

    /// Symbol at `index`.
    pub fn symbol_at(&self, index: usize) -> Result<Symbol, GameError> {
        Ok(self.board.get(index)?.content)
    }

    /// Hash of layout, tile states and counters.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(StateHasher::for_game_state(), self.board.len(), |hasher| {
            for tile in self.board.tiles() {
                hasher.update_u16(tile.content.0);
                hasher.update_u8(tile.state as u8);
            }
            hasher.update_u32(self.try_count);
            hasher.update_bool(self.finished);
        })
    }

    /// Take pending events (consumes them).
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Push a game event.
    pub fn push_event(&mut self, event: GameEvent) {
        self.pending_events.push(event);
    }
}

// =============================================================================
// TESTS
// =============================================================================
