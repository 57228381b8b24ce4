//! Game Session Management
//!
//! A `GameSession` owns one game: it memoizes the board, serializes flip
//! requests, schedules the delayed continuations and publishes events.
//! Continuations hold a clone of the session handle, never global state.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, error, info};

use crate::config::SessionConfig;
use crate::core::hash::short_hex;
use crate::core::rng::DeterministicRng;
use crate::game::board::{self, Board};
use crate::game::error::GameError;
use crate::game::events::GameEvent;
use crate::game::state::{FlipOutcome, GameState, PendingResolution};
use crate::game::symbol::Catalog;
use crate::session::protocol::{SessionPhase, Snapshot};
use crate::session::scheduler::Scheduler;

/// Unique session identifier.
pub type SessionId = [u8; 16];

/// Session errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The game rejected the request.
    #[error(transparent)]
    Game(#[from] GameError),

    /// The session was closed.
    #[error("Session closed")]
    Closed,

    /// A scheduled continuation hit an invariant violation earlier; the
    /// session refuses further play.
    #[error("Session faulted: {0}")]
    Faulted(GameError),
}

struct SessionInner {
    phase: SessionPhase,
    game: Option<GameState>,
    rng: DeterministicRng,
    fault: Option<GameError>,
}

struct Shared {
    id: SessionId,
    config: SessionConfig,
    catalog: Catalog,
    scheduler: Arc<dyn Scheduler>,
    inner: Mutex<SessionInner>,
    event_tx: broadcast::Sender<GameEvent>,
}

/// Handle to a game session. Clones share the same game.
#[derive(Clone)]
pub struct GameSession {
    shared: Arc<Shared>,
}

impl GameSession {
    /// Create a session. The shuffle seed comes from the config, or is
    /// derived from `id` when the config leaves it unset.
    pub fn new(
        id: SessionId,
        config: SessionConfig,
        catalog: Catalog,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => DeterministicRng::new(seed),
            None => DeterministicRng::for_session(&id),
        };
        let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));

        Self {
            shared: Arc::new(Shared {
                id,
                config,
                catalog,
                scheduler,
                inner: Mutex::new(SessionInner {
                    phase: SessionPhase::AwaitingBoard,
                    game: None,
                    rng,
                    fault: None,
                }),
                event_tx,
            }),
        }
    }

    /// Create a session around a preset layout, e.g. to replay a recorded
    /// board. The session starts in `Playing` and never deals another.
    pub fn with_board(
        id: SessionId,
        config: SessionConfig,
        catalog: Catalog,
        scheduler: Arc<dyn Scheduler>,
        board: Board,
    ) -> Self {
        let session = Self::new(id, config, catalog, scheduler);
        {
            let mut inner = session.lock();
            inner.game = Some(GameState::new(board));
            inner.phase = SessionPhase::Playing;
        }
        session
    }

    /// Session identifier.
    pub fn id(&self) -> SessionId {
        self.shared.id
    }

    /// Session identifier as a UUID string.
    pub fn id_string(&self) -> String {
        uuid::Uuid::from_bytes(self.shared.id).to_string()
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    /// Symbol catalog this session draws from.
    pub fn catalog(&self) -> &Catalog {
        &self.shared.catalog
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        self.lock().phase
    }

    /// The error that faulted the session, if a continuation hit one.
    pub fn fault(&self) -> Option<GameError> {
        self.lock().fault.clone()
    }

    /// Subscribe to game events.
    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.shared.event_tx.subscribe()
    }

    /// Board of the configured size. See [`generate`](GameSession::generate).
    pub fn tiles(&self) -> Result<Board, SessionError> {
        self.generate(self.shared.config.tile_count)
    }

    /// Deal the board on first call; later calls return that same board.
    ///
    /// An odd `tile_count` is rejected even when a board already exists.
    pub fn generate(&self, tile_count: usize) -> Result<Board, SessionError> {
        board::check_tile_count(tile_count)?;

        let mut inner = self.lock();
        if inner.phase == SessionPhase::Closed {
            return Err(SessionError::Closed);
        }
        if let Some(game) = &inner.game {
            return Ok(game.board().clone());
        }

        let board = board::generate(tile_count, &self.shared.catalog, &mut inner.rng)?;
        info!(
            "Session {} dealt {} tiles (board {})",
            self.id_string(),
            board.len(),
            short_hex(&board.fingerprint())
        );

        inner.game = Some(GameState::new(board.clone()));
        inner.phase = SessionPhase::Playing;
        Ok(board)
    }

    /// Flip the tile at `index`.
    ///
    /// Rejections are reported in the outcome and change nothing. A second
    /// flip schedules the pair's resolution.
    pub fn flip(&self, index: usize) -> Result<FlipOutcome, SessionError> {
        let mut inner = self.lock();
        if let Some(fault) = &inner.fault {
            return Err(SessionError::Faulted(fault.clone()));
        }
        if inner.phase == SessionPhase::Closed {
            return Err(SessionError::Closed);
        }

        let game = inner
            .game
            .as_mut()
            .ok_or(GameError::OutOfRange { index, len: 0 })?;

        let outcome = game.flip(index)?;
        let events = game.take_events();

        match outcome {
            FlipOutcome::Rejected(reason) => {
                debug!("Session {}: flip {} rejected ({:?})", self.id_string(), index, reason);
            }
            FlipOutcome::FirstOfPair => {
                debug!("Session {}: flip {} opens a pair", self.id_string(), index);
            }
            FlipOutcome::SecondOfPair(pending) => {
                debug!(
                    "Session {}: flip {} closes pair {:?} (try {}, match: {})",
                    self.id_string(),
                    index,
                    pending.pair,
                    game.try_count(),
                    pending.is_match()
                );
                self.schedule_resolution(pending);
            }
        }

        // Published under the lock so subscribers see events in order.
        self.publish(events);
        Ok(outcome)
    }

    /// Would `flip(index)` be accepted right now?
    pub fn is_selectable(&self, index: usize) -> bool {
        let inner = self.lock();
        inner.fault.is_none()
            && inner.phase == SessionPhase::Playing
            && inner.game.as_ref().is_some_and(|g| g.is_selectable(index))
    }

    /// Current state.
    pub fn snapshot(&self) -> Snapshot {
        let inner = self.lock();
        match &inner.game {
            Some(game) => Snapshot::of_game(self.id_string(), inner.phase, game),
            None => Snapshot::empty(self.id_string(), inner.phase),
        }
    }

    /// Mark the session closed. Already-scheduled continuations still run.
    pub fn close(&self) {
        let mut inner = self.lock();
        if inner.phase != SessionPhase::Closed {
            inner.phase = SessionPhase::Closed;
            info!("Session {} closed", self.id_string());
        }
    }

    /// Wait for the game-complete signal.
    ///
    /// Returns the final try count, or `None` if the event stream ended.
    pub async fn wait_for_completion(&self) -> Option<u32> {
        let mut rx = self.subscribe();
        {
            let inner = self.lock();
            if let Some(game) = inner.game.as_ref().filter(|g| g.completion_signaled()) {
                return Some(game.try_count());
            }
        }

        loop {
            match rx.recv().await {
                Ok(event) if event.is_game_complete() => return Some(event.try_count),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    let inner = self.lock();
                    if let Some(game) = inner.game.as_ref().filter(|g| g.completion_signaled()) {
                        return Some(game.try_count());
                    }
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    fn schedule_resolution(&self, pending: PendingResolution) {
        let session = self.clone();
        self.shared.scheduler.schedule(
            self.shared.config.resolve_delay,
            Box::new(move || session.apply_resolution(pending)),
        );
    }

    fn schedule_completion(&self) {
        let session = self.clone();
        self.shared.scheduler.schedule(
            self.shared.config.finish_delay,
            Box::new(move || session.apply_completion()),
        );
    }

    fn apply_resolution(&self, expected: PendingResolution) {
        let mut inner = self.lock();
        let result = match inner.game.as_mut() {
            Some(game) if game.pending() == Some(expected) => game
                .resolve_pending()
                .map(|resolution| (resolution, game.take_events())),
            Some(_) => Err(GameError::InvalidState(format!(
                "scheduled resolution for pair {:?} does not match the board",
                expected.pair
            ))),
            None => Err(GameError::InvalidState(
                "resolution scheduled without a board".to_string(),
            )),
        };

        match result {
            Ok((resolution, events)) => {
                info!(
                    "Session {}: pair {:?} -> {}",
                    self.id_string(),
                    resolution.pair,
                    resolution.state
                );
                if resolution.finished {
                    if inner.phase == SessionPhase::Playing {
                        inner.phase = SessionPhase::Finished;
                    }
                    info!("Session {}: all pairs found", self.id_string());
                    self.schedule_completion();
                }
                self.publish(events);
            }
            Err(err) => Self::record_fault(&mut inner, &self.id_string(), err),
        }
    }

    fn apply_completion(&self) {
        let mut inner = self.lock();
        let result = match inner.game.as_mut() {
            Some(game) => game.complete().map(|fired| (fired, game.try_count(), game.take_events())),
            None => Err(GameError::InvalidState(
                "completion scheduled without a board".to_string(),
            )),
        };

        match result {
            Ok((true, try_count, events)) => {
                info!("Session {}: game complete in {} tries", self.id_string(), try_count);
                self.publish(events);
            }
            Ok((false, _, _)) => {}
            Err(err) => Self::record_fault(&mut inner, &self.id_string(), err),
        }
    }

    fn record_fault(inner: &mut SessionInner, id: &str, err: GameError) {
        error!("Session {}: {}", id, err);
        inner.fault.get_or_insert(err);
    }

    fn publish(&self, events: Vec<GameEvent>) {
        for event in events {
            // No subscribers is fine; the snapshot stays readable.
            let _ = self.shared.event_tx.send(event);
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        // Every transition is applied whole, so a poisoned guard is still consistent.
        self.shared.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// SESSION MANAGER
// =============================================================================

/// Manages all active sessions.
pub struct SessionManager {
    /// Scheduler shared by every session.
    scheduler: Arc<dyn Scheduler>,
    /// Catalog handed to new sessions.
    catalog: Catalog,
    /// Active sessions.
    sessions: RwLock<BTreeMap<SessionId, GameSession>>,
}

impl SessionManager {
    /// Create new session manager.
    pub fn new(scheduler: Arc<dyn Scheduler>, catalog: Catalog) -> Self {
        Self {
            scheduler,
            catalog,
            sessions: RwLock::new(BTreeMap::new()),
        }
    }

    /// Create a new session.
    pub async fn create_session(&self, config: SessionConfig) -> GameSession {
        let id = uuid::Uuid::new_v4().into_bytes();
        let session = GameSession::new(id, config, self.catalog.clone(), self.scheduler.clone());
        info!("Session {} created", session.id_string());

        let mut sessions = self.sessions.write().await;
        sessions.insert(id, session.clone());

        session
    }

    /// Get a session by ID.
    pub async fn get_session(&self, id: &SessionId) -> Option<GameSession> {
        let sessions = self.sessions.read().await;
        sessions.get(id).cloned()
    }

    /// Close and remove a session.
    pub async fn close_session(&self, id: &SessionId) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.remove(id) {
            Some(session) => {
                session.close();
                true
            }
            None => false,
        }
    }

    /// Get active session count.
    pub async fn session_count(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions.len()
    }

    /// Drop sessions closed through their handles.
    pub async fn cleanup(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.phase() != SessionPhase::Closed);
        before - sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use crate::game::events::GameEventData;
    use crate::game::state::{PendingResolution, RejectReason};
    use crate::game::tile::TileState;
    use crate::session::scheduler::ManualScheduler;

    const RESOLVE: Duration = Duration::from_millis(1000);
    const FINISH: Duration = Duration::from_millis(4000);

    fn create_test_session(seed: u64) -> (GameSession, Arc<ManualScheduler>) {
        let scheduler = Arc::new(ManualScheduler::new());
        let config = SessionConfig {
            tile_count: 4,
            seed: Some(seed),
            ..Default::default()
        };
        let session = GameSession::new([7; 16], config, Catalog::reference(), scheduler.clone());
        (session, scheduler)
    }

    /// Indices of the two tiles sharing each symbol, in symbol order.
    fn pairs_of(board: &Board) -> Vec<[usize; 2]> {
        let mut by_symbol: BTreeMap<_, Vec<usize>> = BTreeMap::new();
        for (i, symbol) in board.symbols().into_iter().enumerate() {
            by_symbol.entry(symbol).or_default().push(i);
        }
        by_symbol.into_values().map(|v| [v[0], v[1]]).collect()
    }

    #[test]
    fn test_generate_is_memoized() {
        let (session, _) = create_test_session(1);
        assert_eq!(session.phase(), SessionPhase::AwaitingBoard);

        let first = session.generate(4).unwrap();
        let second = session.generate(4).unwrap();
        let other_size = session.generate(8).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, other_size);
        assert_eq!(session.phase(), SessionPhase::Playing);
    }

    #[test]
    fn test_generate_odd_rejected_even_after_deal() {
        let (session, _) = create_test_session(1);
        session.generate(4).unwrap();

        let result = session.generate(5);
        assert!(matches!(
            result,
            Err(SessionError::Game(GameError::InvalidConfiguration(_)))
        ));
    }

    #[test]
    fn test_generate_too_large_for_catalog() {
        let (session, _) = create_test_session(1);
        let result = session.generate(40);
        assert!(matches!(
            result,
            Err(SessionError::Game(GameError::InvalidConfiguration(_)))
        ));
        assert_eq!(session.phase(), SessionPhase::AwaitingBoard);
    }

    #[test]
    fn test_flip_before_board_is_out_of_range() {
        let (session, _) = create_test_session(1);
        assert_eq!(
            session.flip(0),
            Err(SessionError::Game(GameError::OutOfRange { index: 0, len: 0 }))
        );
    }

    #[test]
    fn test_match_resolves_after_delay() {
        let (session, scheduler) = create_test_session(3);
        let board = session.tiles().unwrap();
        let [a, b] = pairs_of(&board)[0];
        let mut rx = session.subscribe();

        session.flip(a).unwrap();
        session.flip(b).unwrap();

        let snapshot = session.snapshot();
        assert_eq!(snapshot.try_count, 1);
        assert_eq!(snapshot.tiles[a].state, TileState::Flipped);
        assert_eq!(snapshot.tiles[b].state, TileState::Flipped);

        // match-detected fires before the delay elapses
        let mut saw_match = false;
        while let Ok(event) = rx.try_recv() {
            saw_match |= event.is_match_detected();
        }
        assert!(saw_match);

        scheduler.advance(RESOLVE - Duration::from_millis(1));
        assert_eq!(session.snapshot().tiles[a].state, TileState::Flipped);

        scheduler.advance(Duration::from_millis(1));
        let snapshot = session.snapshot();
        assert_eq!(snapshot.tiles[a].state, TileState::Matched);
        assert_eq!(snapshot.tiles[b].state, TileState::Matched);
        assert_eq!(snapshot.matched_pairs, 1);
    }

    #[test]
    fn test_mismatch_turns_back() {
        let (session, scheduler) = create_test_session(5);
        let board = session.tiles().unwrap();
        let pairs = pairs_of(&board);
        let (a, b) = (pairs[0][0], pairs[1][0]);

        session.flip(a).unwrap();
        session.flip(b).unwrap();
        scheduler.advance(RESOLVE);

        let snapshot = session.snapshot();
        assert!(snapshot.tiles.iter().all(|t| t.state == TileState::Start));
        assert_eq!(snapshot.try_count, 1);
    }

    #[test]
    fn test_third_flip_rejected_while_pending() {
        let (session, scheduler) = create_test_session(5);
        let board = session.tiles().unwrap();
        let pairs = pairs_of(&board);

        session.flip(pairs[0][0]).unwrap();
        session.flip(pairs[1][0]).unwrap();
        let before = session.snapshot();

        assert_eq!(
            session.flip(pairs[0][1]),
            Ok(FlipOutcome::Rejected(RejectReason::PairPending))
        );
        assert_eq!(session.snapshot(), before);
        assert!(!session.is_selectable(pairs[0][1]));

        scheduler.advance(RESOLVE);
        assert!(session.is_selectable(pairs[0][1]));
    }

    #[test]
    fn test_completion_signaled_after_finish_delay() {
        let (session, scheduler) = create_test_session(9);
        let board = session.tiles().unwrap();
        let mut rx = session.subscribe();

        for [a, b] in pairs_of(&board) {
            session.flip(a).unwrap();
            session.flip(b).unwrap();
            scheduler.advance(RESOLVE);
        }

        let snapshot = session.snapshot();
        assert!(snapshot.finished);
        assert_eq!(snapshot.phase, SessionPhase::Finished);
        assert_eq!(snapshot.try_count, 2);

        let mut complete = 0;
        while let Ok(event) = rx.try_recv() {
            if event.is_game_complete() {
                complete += 1;
            }
        }
        assert_eq!(complete, 0, "completion waits for the finish delay");

        scheduler.advance(FINISH);
        let events: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(
            events.iter().filter(|e| e.is_game_complete()).count(),
            1
        );
        assert_eq!(
            events.last().map(|e| e.data.clone()),
            Some(GameEventData::GameComplete { try_count: 2 })
        );
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn test_closed_session_refuses_flips() {
        let (session, _) = create_test_session(1);
        session.tiles().unwrap();
        session.close();

        assert_eq!(session.flip(0), Err(SessionError::Closed));
        assert!(matches!(session.generate(4), Err(SessionError::Closed)));
        assert_eq!(session.snapshot().phase, SessionPhase::Closed);
    }

    #[test]
    fn test_same_seed_same_board() {
        let (a, _) = create_test_session(11);
        let (b, _) = create_test_session(11);
        assert_eq!(a.tiles().unwrap(), b.tiles().unwrap());
    }

    #[test]
    fn test_mismatched_resolution_faults_session() {
        let (session, scheduler) = create_test_session(13);
        let board = session.tiles().unwrap();
        let pairs = pairs_of(&board);
        let [a, b] = pairs[0];

        session.flip(a).unwrap();
        session.flip(b).unwrap();
        assert!(session.fault().is_none());

        // A continuation for a pair that is not the one face up.
        session.apply_resolution(PendingResolution {
            pair: [pairs[1][0], pairs[1][1]],
            resolved: TileState::Matched,
        });

        assert!(matches!(session.fault(), Some(GameError::InvalidState(_))));
        assert!(matches!(
            session.flip(pairs[1][0]),
            Err(SessionError::Faulted(GameError::InvalidState(_)))
        ));
        assert!(!session.is_selectable(pairs[1][0]));

        // The genuine continuation still settles the board, but play stays refused.
        scheduler.advance(RESOLVE);
        assert_eq!(session.snapshot().matched_pairs, 1);
        assert!(!session.is_selectable(pairs[1][0]));
        assert!(matches!(session.flip(pairs[1][0]), Err(SessionError::Faulted(_))));
    }

    #[test]
    fn test_stale_resolution_faults_session() {
        let (session, _) = create_test_session(13);
        session.tiles().unwrap();

        session.apply_resolution(PendingResolution {
            pair: [0, 1],
            resolved: TileState::Start,
        });

        assert!(matches!(session.fault(), Some(GameError::InvalidState(_))));
        assert!(matches!(session.flip(0), Err(SessionError::Faulted(_))));
        assert!(!session.is_selectable(0));
        assert!(session.snapshot().tiles.iter().all(|t| t.state == TileState::Start));
    }

    #[test]
    fn test_completion_without_board_faults_session() {
        let (session, _) = create_test_session(13);
        session.apply_completion();
        assert!(matches!(session.fault(), Some(GameError::InvalidState(_))));
    }

    #[test]
    fn test_seed_derived_from_id_when_unset() {
        let scheduler: Arc<dyn Scheduler> = Arc::new(ManualScheduler::new());
        let config = SessionConfig::default();
        let a = GameSession::new([1; 16], config.clone(), Catalog::reference(), scheduler.clone());
        let b = GameSession::new([1; 16], config, Catalog::reference(), scheduler);
        assert_eq!(a.tiles().unwrap(), b.tiles().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_completion_with_tokio_scheduler() {
        use crate::session::scheduler::TokioScheduler;

        let scheduler: Arc<dyn Scheduler> = Arc::new(TokioScheduler::spawn());
        let config = SessionConfig {
            tile_count: 4,
            seed: Some(21),
            ..Default::default()
        };
        let session = GameSession::new([2; 16], config, Catalog::reference(), scheduler);
        let board = session.tiles().unwrap();

        let waiter = {
            let session = session.clone();
            tokio::spawn(async move { session.wait_for_completion().await })
        };
        tokio::task::yield_now().await;

        for [a, b] in pairs_of(&board) {
            session.flip(a).unwrap();
            session.flip(b).unwrap();
            tokio::time::sleep(RESOLVE + Duration::from_millis(10)).await;
        }
        assert!(session.snapshot().finished);

        let tries = waiter.await.unwrap();
        assert_eq!(tries, Some(2));
    }

    #[tokio::test]
    async fn test_session_manager() {
        let manager = SessionManager::new(Arc::new(ManualScheduler::new()), Catalog::reference());

        let session = manager.create_session(SessionConfig::default()).await;
        assert_eq!(manager.session_count().await, 1);
        assert!(manager.get_session(&session.id()).await.is_some());

        assert!(manager.close_session(&session.id()).await);
        assert_eq!(manager.session_count().await, 0);
        assert_eq!(session.phase(), SessionPhase::Closed);
        assert!(!manager.close_session(&session.id()).await);
    }

    #[tokio::test]
    async fn test_cleanup_removes_closed_sessions() {
        let manager = SessionManager::new(Arc::new(ManualScheduler::new()), Catalog::reference());

        let open = manager.create_session(SessionConfig::default()).await;
        let closed = manager.create_session(SessionConfig::default()).await;
        closed.close();

        assert_eq!(manager.cleanup().await, 1);
        assert_eq!(manager.session_count().await, 1);
        assert!(manager.get_session(&open.id()).await.is_some());
    }
}
