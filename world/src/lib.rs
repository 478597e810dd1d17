#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Maripoga's Errand.

mod entities;
mod grid;

use std::time::Duration;

use errand_core::{
    CellCoord, Command, DeathCause, Direction, EntityId, EntityKind, Event, HopError, TileCoord,
    TileState, WELCOME_BANNER,
};

use crate::{
    entities::{EntityRegistry, Hop},
    grid::Grid,
};

const DEFAULT_GRID_COLUMNS: TileCoord = TileCoord::new(16);
const DEFAULT_GRID_ROWS: TileCoord = TileCoord::new(14);
const DEFAULT_COVERAGE_TARGET: f32 = 0.70;

const HOP_DURATION: Duration = Duration::from_millis(200);
const STARTING_LIVES: u32 = 3;
const EXTRA_LIFE_INTERVAL: i64 = 10_000;
const RECLAIM_PENALTY: i64 = 10;

/// Represents the authoritative world state.
#[derive(Debug)]
pub struct World {
    banner: &'static str,
    grid: Grid,
    entities: EntityRegistry,
    player: Player,
    coverage_target: f32,
    entities_held: bool,
}

impl World {
    /// Creates a new world with the reference 16x14 board and the player at its centre.
    #[must_use]
    pub fn new() -> Self {
        let mut world = Self {
            banner: WELCOME_BANNER,
            grid: Grid::new(DEFAULT_GRID_COLUMNS.get(), DEFAULT_GRID_ROWS.get()),
            entities: EntityRegistry::new(),
            player: Player::new(),
            coverage_target: DEFAULT_COVERAGE_TARGET,
            entities_held: false,
        };
        world.place_player_at_start();
        world
    }

    fn start_cell(&self) -> CellCoord {
        let (columns, rows) = self.grid.dimensions();
        CellCoord::new(columns / 2, rows / 2)
    }

    fn place_player_at_start(&mut self) {
        let start = self.start_cell();
        self.player.reset(start);
        let _ = self.grid.set(start, TileState::Owned);
    }

    fn award_score(&mut self, points: i64, out_events: &mut Vec<Event>) {
        let before = self.player.score;
        self.player.score = before.saturating_add(points);
        out_events.push(Event::ScoreAwarded {
            points,
            total: self.player.score,
        });

        let crossed = self.player.score.max(0) / EXTRA_LIFE_INTERVAL
            - before.max(0) / EXTRA_LIFE_INTERVAL;
        if crossed > 0 {
            let gained = u32::try_from(crossed).unwrap_or(u32::MAX);
            self.player.lives = self.player.lives.saturating_add(gained);
            out_events.push(Event::ExtraLifeAwarded {
                lives: self.player.lives,
            });
        }
    }

    fn kill_player(&mut self, cause: DeathCause, out_events: &mut Vec<Event>) {
        if !self.player.alive {
            return;
        }
        self.player.alive = false;
        self.player.hop = None;
        self.player.lives = self.player.lives.saturating_sub(1);
        out_events.push(Event::PlayerDied {
            cell: self.player.cell,
            cause,
            lives: self.player.lives,
        });
    }

    fn claim(
        &mut self,
        cell: CellCoord,
        state: TileState,
        out_events: &mut Vec<Event>,
    ) -> Option<TileState> {
        let previous = self.grid.set(cell, state)?;
        if previous != state {
            out_events.push(Event::TileClaimed {
                cell,
                previous,
                state,
            });
        }
        Some(previous)
    }

    fn hop_player(&mut self, direction: Direction, out_events: &mut Vec<Event>) {
        let rejection = if !self.player.alive {
            Some(HopError::Dead)
        } else if self.player.hop.is_some() {
            Some(HopError::InTransit)
        } else {
            match self.grid.view().neighbor(self.player.cell, direction) {
                None => Some(HopError::OutOfBounds),
                Some(destination) => {
                    if self.grid.get(destination).is_some_and(TileState::blocks_hop) {
                        Some(HopError::Impassable)
                    } else {
                        let from = self.player.cell;
                        self.player.hop = Some(Hop {
                            from,
                            remaining: HOP_DURATION,
                        });
                        self.player.cell = destination;
                        out_events.push(Event::PlayerHopped {
                            from,
                            to: destination,
                        });
                        None
                    }
                }
            }
        };

        if let Some(reason) = rejection {
            out_events.push(Event::PlayerHopRejected { direction, reason });
        }
    }

    fn hop_entity(&mut self, entity: EntityId, to: CellCoord, out_events: &mut Vec<Event>) {
        let Some(destination) = self.grid.get(to) else {
            return;
        };
        let Some(state) = self.entities.get_mut(entity) else {
            return;
        };
        if !state.alive || state.hop.is_some() {
            return;
        }
        if state.kind != EntityKind::Snail && destination.blocks_hop() {
            return;
        }

        let from = state.cell;
        state.hop = Some(Hop {
            from,
            remaining: HOP_DURATION,
        });
        state.cell = to;
        out_events.push(Event::EntityHopped { entity, from, to });
    }

    fn advance_player_hop(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        if !self.player.alive {
            return;
        }
        let Some(hop) = self.player.hop.as_mut() else {
            return;
        };
        hop.remaining = hop.remaining.saturating_sub(dt);
        if !hop.remaining.is_zero() {
            return;
        }
        self.player.hop = None;

        let cell = self.player.cell;
        let lethal = self.grid.get(cell).is_some_and(TileState::is_lethal);
        if lethal || self.grid.is_fatal(cell) {
            self.kill_player(DeathCause::FatalTile, out_events);
            return;
        }

        let _ = self.claim(cell, TileState::Owned, out_events);
        out_events.push(Event::PlayerLanded { cell });
    }

    fn advance_entity_hops(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let mut landings = Vec::new();
        for entity in self.entities.iter_mut().filter(|entity| entity.alive) {
            let Some(hop) = entity.hop.as_mut() else {
                continue;
            };
            hop.remaining = hop.remaining.saturating_sub(dt);
            if hop.remaining.is_zero() {
                entity.hop = None;
                landings.push((entity.id, entity.kind, entity.cell));
            }
        }

        for (entity, kind, cell) in landings {
            out_events.push(Event::EntityLanded { entity, cell });
            let claim = kind.claim_tile();
            let previous = self.claim(cell, claim, out_events);
            if previous == Some(TileState::Owned) && claim != TileState::Owned {
                self.award_score(-RECLAIM_PENALTY, out_events);
            }
        }
    }

    fn resolve_collisions(&mut self, out_events: &mut Vec<Event>) {
        if !self.player.alive || self.player.hop.is_some() || self.player.is_invincible() {
            return;
        }
        let cell = self.player.cell;
        let collided = self.entities.iter().any(|entity| {
            entity.alive && entity.kind.capabilities().harmful && entity.cell == cell
        });
        if collided {
            self.kill_player(DeathCause::Collision, out_events);
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureGrid { columns, rows } => {
            world.grid = Grid::new(columns.get(), rows.get());
            world.entities = EntityRegistry::new();
            world.entities_held = false;
            world.place_player_at_start();
            out_events.push(Event::GridConfigured { columns, rows });
        }
        Command::ConfigureCoverageTarget { target } => {
            world.coverage_target = target.clamp(0.0, 1.0);
        }
        Command::Tick { dt } => {
            out_events.push(Event::TimeAdvanced { dt });

            world.grid.tick_fatal(dt);
            world.player.invincible = world.player.invincible.saturating_sub(dt);
            world.advance_player_hop(dt, out_events);
            if !world.entities_held {
                world.advance_entity_hops(dt, out_events);
            }
            world.resolve_collisions(out_events);
        }
        Command::HopPlayer { direction } => world.hop_player(direction, out_events),
        Command::ResetPlayer => {
            let start = world.start_cell();
            world.player.reset(start);
            out_events.push(Event::PlayerReset { cell: start });
        }
        Command::GrantInvincibility { duration } => {
            world.player.invincible = world.player.invincible.max(duration);
        }
        Command::SpawnEntity { kind, cell } => {
            if world.grid.get(cell).is_none() {
                return;
            }
            let entity = world.entities.spawn(kind, cell);
            out_events.push(Event::EntitySpawned { entity, kind, cell });
            let _ = world.claim(cell, kind.claim_tile(), out_events);
        }
        Command::HopEntity { entity, to } => {
            if !world.entities_held {
                world.hop_entity(entity, to, out_events);
            }
        }
        Command::HoldEntities { held } => world.entities_held = held,
        Command::ClaimTile { cell, state } => {
            let _ = world.claim(cell, state, out_events);
        }
        Command::ConvertTiles { from, to } => {
            let count = world.grid.convert_all(from, to);
            out_events.push(Event::TilesConverted { from, to, count });
        }
        Command::MarkFatal { cell, duration } => {
            if world.grid.set_fatal(cell, duration) {
                out_events.push(Event::TileMarkedFatal { cell, duration });
            }
        }
        Command::CaptureEntity { entity } => {
            if let Some(captured) = world.entities.capture(entity) {
                let (kind, cell) = (captured.kind, captured.cell);
                out_events.push(Event::EntityCaptured { entity, kind, cell });
                out_events.push(Event::RespawnScheduled { kind });
            }
        }
        Command::RemoveCapturedEntities => {
            let count = world.entities.remove_dead();
            out_events.push(Event::CapturedEntitiesRemoved { count });
        }
        Command::AwardScore { points } => world.award_score(points, out_events),
        Command::KillPlayer { cause } => world.kill_player(cause, out_events),
        Command::EmitCue { cue } => out_events.push(Event::CuePlayed { cue }),
    }
}

/// Drains the respawn requests queued by captures for the external scheduler.
pub fn take_pending_respawns(world: &mut World) -> Vec<EntityKind> {
    world.entities.take_pending_respawns()
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use super::World;
    use errand_core::{
        CellCoord, EntityKind, EntitySnapshot, EntityView, GridView, PlayerSnapshot, TileState,
    };

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Exposes a read-only view of the tile grid.
    #[must_use]
    pub fn grid_view(world: &World) -> GridView<'_> {
        world.grid.view()
    }

    /// Reports whether the tile's fatal countdown is still running.
    #[must_use]
    pub fn is_fatal(world: &World, cell: CellCoord) -> bool {
        world.grid.is_fatal(cell)
    }

    /// Captures a read-only view of the entities in the registry.
    #[must_use]
    pub fn entity_view(world: &World) -> EntityView {
        let snapshots: Vec<EntitySnapshot> =
            world.entities.iter().map(|entity| entity.snapshot()).collect();
        EntityView::from_snapshots(snapshots)
    }

    /// Captures a read-only snapshot of the player.
    #[must_use]
    pub fn player(world: &World) -> PlayerSnapshot {
        world.player.snapshot()
    }

    /// Fraction of claimable tiles currently owned by the player.
    #[must_use]
    pub fn coverage(world: &World) -> f32 {
        world.grid.view().fill_ratio(TileState::Owned)
    }

    /// Coverage ratio the current wave requires.
    #[must_use]
    pub fn coverage_target(world: &World) -> f32 {
        world.coverage_target
    }

    /// Reports whether the wave's coverage target has been reached.
    #[must_use]
    pub fn win_condition_met(world: &World) -> bool {
        coverage(world) >= world.coverage_target
    }

    /// Respawn requests queued by captures that the scheduler has not drained yet.
    #[must_use]
    pub fn pending_respawns(world: &World) -> &[EntityKind] {
        world.entities.pending_respawns()
    }
}

#[derive(Clone, Debug)]
struct Player {
    cell: CellCoord,
    hop: Option<Hop>,
    alive: bool,
    lives: u32,
    score: i64,
    invincible: Duration,
}

impl Player {
    fn new() -> Self {
        Self {
            cell: CellCoord::new(0, 0),
            hop: None,
            alive: true,
            lives: STARTING_LIVES,
            score: 0,
            invincible: Duration::ZERO,
        }
    }

    fn reset(&mut self, cell: CellCoord) {
        self.cell = cell;
        self.hop = None;
        self.alive = true;
    }

    fn is_invincible(&self) -> bool {
        !self.invincible.is_zero()
    }

    fn snapshot(&self) -> errand_core::PlayerSnapshot {
        errand_core::PlayerSnapshot {
            cell: self.cell,
            hop_from: self.hop.map(|hop| hop.from),
            alive: self.alive,
            lives: self.lives,
            score: self.score,
            invincible: self.is_invincible(),
        }
    }
}
