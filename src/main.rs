//! Memory Match demo
//!
//! Deals a board and lets a bot with perfect recall play it through the
//! real session runtime, then checks that the same seed deals the same
//! board again.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{bail, Context};
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use memory_match::{
    core::{hash::short_hex, rng::DeterministicRng},
    game::{board, events::GameEventData, Catalog, GameEvent, Symbol},
    session::{GameSession, SessionManager, TokioScheduler},
    SessionConfig, VERSION,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    info!("Memory Match v{}", VERSION);

    let config = SessionConfig::from_env().context("loading session configuration")?;
    info!(
        "Tiles: {}, resolve delay: {:?}, finish delay: {:?}",
        config.tile_count, config.resolve_delay, config.finish_delay
    );

    let catalog = Catalog::reference();
    let manager = SessionManager::new(Arc::new(TokioScheduler::spawn()), catalog.clone());

    demo_game(&manager, config, &catalog).await
}

/// Play one game with the memory bot.
async fn demo_game(
    manager: &SessionManager,
    config: SessionConfig,
    catalog: &Catalog,
) -> anyhow::Result<()> {
    info!("=== Starting Demo Game ===");

    let session = manager.create_session(config).await;
    let mut events = session.subscribe();
    let board = session.tiles()?;
    info!("Session: {}", session.id_string());
    info!("Board: {} tiles, fingerprint {}", board.len(), short_hex(&board.fingerprint()));

    let mut bot = MemoryBot::default();

    while !session.snapshot().finished {
        let first = bot.pick_first(&session);
        let Some(first) = first else {
            bail!("no selectable tile left on an unfinished board");
        };
        session.flip(first)?;
        bot.observe(&mut events, catalog);

        let second = bot.pick_second(&session, first);
        let Some(second) = second else {
            bail!("no partner tile available for {}", first);
        };
        session.flip(second)?;
        bot.observe(&mut events, catalog);

        wait_for_resolution(&mut events, &mut bot).await?;
    }

    let snapshot = session.snapshot();
    info!(
        "All {} pairs found in {} tries; waiting for completion signal",
        snapshot.total_pairs, snapshot.try_count
    );
    match session.wait_for_completion().await {
        Some(tries) => info!("Game complete in {} tries", tries),
        None => warn!("Event stream closed before completion"),
    }

    info!("Snapshot: {}", session.snapshot().to_json()?);

    // Same seed, same board
    info!("=== Verifying Determinism ===");
    if let Some(seed) = session.config().seed {
        let mut rng = DeterministicRng::new(seed);
        let replay = board::generate(board.len(), catalog, &mut rng)?;
        if replay.fingerprint() == board.fingerprint() {
            info!("DETERMINISM VERIFIED: boards match ({})", short_hex(&replay.fingerprint()));
        } else {
            bail!("DETERMINISM FAILURE: boards differ");
        }
    } else {
        info!("No MEMORY_SEED set; seed derived from session id");
    }

    manager.close_session(&session.id()).await;
    Ok(())
}

/// Drain events until the pending pair resolves.
async fn wait_for_resolution(
    events: &mut broadcast::Receiver<GameEvent>,
    bot: &mut MemoryBot,
) -> anyhow::Result<()> {
    loop {
        let event = events.recv().await.context("event stream ended")?;
        if let GameEventData::PairResolved { pair, state, finished } = event.data {
            info!("Try {}: tiles {:?} -> {}", event.try_count, pair, state);
            if finished {
                info!("Board cleared");
            }
            bot.forget_pair(pair);
            return Ok(());
        }
    }
}

/// Remembers every symbol it has seen face up.
#[derive(Default)]
struct MemoryBot {
    seen: BTreeMap<usize, Symbol>,
}

impl MemoryBot {
    /// Read the events published by the last flip.
    fn observe(&mut self, events: &mut broadcast::Receiver<GameEvent>, catalog: &Catalog) {
        while let Ok(event) = events.try_recv() {
            match event.data {
                GameEventData::TileFlipped { index, symbol } => {
                    info!(
                        "Flipped tile {} ({})",
                        index,
                        catalog.name(symbol).unwrap_or("?")
                    );
                    self.seen.insert(index, symbol);
                }
                GameEventData::MatchDetected { pair, .. } => {
                    info!("Match detected: {:?}", pair);
                }
                _ => {}
            }
        }
    }

    fn forget_pair(&mut self, pair: [usize; 2]) {
        // Matched tiles drop out; mismatched ones stay remembered.
        if self.seen.get(&pair[0]) == self.seen.get(&pair[1]) {
            self.seen.remove(&pair[0]);
            self.seen.remove(&pair[1]);
        }
    }

    /// A remembered pair if there is one, else an unseen tile.
    fn pick_first(&self, session: &GameSession) -> Option<usize> {
        self.known_pair(session)
            .map(|[a, _]| a)
            .or_else(|| self.unseen_tile(session, None))
    }

    fn pick_second(&self, session: &GameSession, first: usize) -> Option<usize> {
        let symbol = self.seen.get(&first);
        self.seen
            .iter()
            .find(|&(&i, s)| i != first && Some(s) == symbol && session.is_selectable(i))
            .map(|(&i, _)| i)
            .or_else(|| self.unseen_tile(session, Some(first)))
    }

    fn known_pair(&self, session: &GameSession) -> Option<[usize; 2]> {
        let mut by_symbol: BTreeMap<Symbol, usize> = BTreeMap::new();
        for (&index, &symbol) in &self.seen {
            if !session.is_selectable(index) {
                continue;
            }
            if let Some(&other) = by_symbol.get(&symbol) {
                return Some([other, index]);
            }
            by_symbol.insert(symbol, index);
        }
        None
    }

    fn unseen_tile(&self, session: &GameSession, exclude: Option<usize>) -> Option<usize> {
        let len = session.snapshot().tiles.len();
        (0..len)
            .filter(|&i| Some(i) != exclude && !self.seen.contains_key(&i))
            .find(|&i| session.is_selectable(i))
            // Fall back to any selectable tile; a remembered mismatch still counts as a try.
            .or_else(|| (0..len).find(|&i| Some(i) != exclude && session.is_selectable(i)))
    }
}
