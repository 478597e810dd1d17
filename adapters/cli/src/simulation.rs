//! Headless per-frame loop wiring the world to the encirclement engine.

use std::{collections::VecDeque, fmt, time::Duration};

use errand_core::{
    CellCoord, Command, Cue, Direction, EntityId, EntityKind, Event, PlayerSnapshot,
};
use errand_system_encirclement::Encirclement;
use errand_world::{self as world, query, World};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::scenario::{Scenario, Step};

const WAIT_STEP: Duration = Duration::from_millis(200);
const WANDER_CHANCE: f64 = 0.125;

/// Outcome of a scenario run.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Summary {
    pub(crate) frames: u64,
    pub(crate) score: i64,
    pub(crate) lives: u32,
    pub(crate) coverage: f32,
    pub(crate) coverage_target: f32,
    pub(crate) pipelines: u32,
    pub(crate) captures: u32,
    pub(crate) perfect: bool,
    pub(crate) died: bool,
    pub(crate) rejected_hops: u32,
    pub(crate) respawns_requested: u32,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "frames:     {}", self.frames)?;
        writeln!(f, "score:      {}", self.score)?;
        writeln!(f, "lives:      {}", self.lives)?;
        writeln!(
            f,
            "coverage:   {:.1}% (target {:.1}%)",
            self.coverage * 100.0,
            self.coverage_target * 100.0
        )?;
        writeln!(f, "fills:      {}", self.pipelines)?;
        writeln!(f, "captures:   {}", self.captures)?;
        writeln!(f, "respawns:   {}", self.respawns_requested)?;
        writeln!(f, "rejected:   {}", self.rejected_hops)?;
        writeln!(f, "perfect:    {}", if self.perfect { "yes" } else { "no" })?;
        write!(f, "player:     {}", if self.died { "died" } else { "alive" })
    }
}

/// Owns the world, the engine and the scripted inputs for a single run.
#[derive(Debug)]
pub(crate) struct Session {
    world: World,
    engine: Encirclement,
    rng: ChaCha8Rng,
    script: VecDeque<Step>,
    wanderers: Vec<EntityId>,
    frame: Duration,
    waiting: Duration,
    pending: Vec<Event>,
    commands: Vec<Command>,
    summary: Summary,
}

impl Session {
    /// Builds the scenario board on a fresh world.
    pub(crate) fn new(scenario: &Scenario, frame: Duration) -> Self {
        let mut world = World::new();
        let mut pending = Vec::new();
        for command in scenario.setup_commands() {
            world::apply(&mut world, command, &mut pending);
        }

        let wanderers = pending
            .iter()
            .filter_map(|event| match event {
                Event::EntitySpawned { entity, .. } => Some(*entity),
                _ => None,
            })
            .zip(&scenario.entities)
            .filter(|(_, placement)| placement.wander)
            .map(|(entity, _)| entity)
            .collect();

        tracing::info!(
            columns = scenario.columns,
            rows = scenario.rows,
            entities = scenario.entities.len(),
            moves = scenario.script.len(),
            "scenario loaded"
        );

        Self {
            world,
            engine: Encirclement::new(scenario.config),
            rng: ChaCha8Rng::seed_from_u64(scenario.seed),
            script: scenario.script.iter().copied().collect(),
            wanderers,
            frame,
            waiting: Duration::ZERO,
            pending,
            commands: Vec::new(),
            summary: Summary::default(),
        }
    }

    /// Runs frames until the script is spent and the engine idles, the player dies,
    /// or `max_frames` elapse.
    pub(crate) fn run(&mut self, max_frames: u64) -> Summary {
        while self.summary.frames < max_frames && !self.finished() {
            self.step();
        }
        let remaining = std::mem::take(&mut self.pending);
        self.record(&remaining);

        let player = query::player(&self.world);
        self.summary.score = player.score;
        self.summary.lives = player.lives;
        self.summary.coverage = query::coverage(&self.world);
        self.summary.coverage_target = query::coverage_target(&self.world);
        tracing::info!(frames = self.summary.frames, score = player.score, "run finished");
        self.summary.clone()
    }

    /// Advances the simulation by one frame.
    pub(crate) fn step(&mut self) {
        if !self.engine.movement_frozen() {
            let player = query::player(&self.world);
            self.drive_player(&player);
            self.drive_wanderers();
        }
        self.apply(Command::Tick { dt: self.frame });

        let events = std::mem::take(&mut self.pending);
        self.record(&events);

        self.engine.handle(
            &events,
            query::grid_view(&self.world),
            &query::entity_view(&self.world),
            &query::player(&self.world),
            query::win_condition_met(&self.world),
            &mut self.commands,
        );
        for command in std::mem::take(&mut self.commands) {
            self.apply(command);
        }

        for kind in world::take_pending_respawns(&mut self.world) {
            tracing::debug!(?kind, "respawn requested");
            self.summary.respawns_requested += 1;
        }
        self.summary.frames += 1;
    }

    fn finished(&self) -> bool {
        let player = query::player(&self.world);
        if !player.alive {
            return true;
        }
        self.script.is_empty()
            && self.waiting.is_zero()
            && player.hop_from.is_none()
            && !self.engine.is_animating()
    }

    fn apply(&mut self, command: Command) {
        world::apply(&mut self.world, command, &mut self.pending);
    }

    fn drive_player(&mut self, player: &PlayerSnapshot) {
        if !player.alive || player.hop_from.is_some() {
            return;
        }
        if !self.waiting.is_zero() {
            self.waiting = self.waiting.saturating_sub(self.frame);
            return;
        }
        match self.script.pop_front() {
            Some(Step::Hop(direction)) => self.apply(Command::HopPlayer { direction }),
            Some(Step::Wait) => self.waiting = WAIT_STEP,
            None => {}
        }
    }

    fn drive_wanderers(&mut self) {
        let entities = query::entity_view(&self.world);
        let (columns, rows) = query::grid_view(&self.world).dimensions();

        for snapshot in entities.alive() {
            if snapshot.in_transit() || !self.wanderers.contains(&snapshot.id) {
                continue;
            }
            if !self.rng.gen_bool(WANDER_CHANCE) {
                continue;
            }

            let destination = if snapshot.kind == EntityKind::Blue {
                Some(CellCoord::new(
                    self.rng.gen_range(0..columns),
                    self.rng.gen_range(0..rows),
                ))
            } else {
                let direction = Direction::ALL[self.rng.gen_range(0..Direction::ALL.len())];
                query::grid_view(&self.world).neighbor(snapshot.cell, direction)
            };
            if let Some(to) = destination {
                self.apply(Command::HopEntity {
                    entity: snapshot.id,
                    to,
                });
            }
        }
    }

    fn record(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::CuePlayed {
                    cue: Cue::FillSmall | Cue::FillMedium | Cue::FillLarge | Cue::FillHuge,
                } => self.summary.pipelines += 1,
                Event::CuePlayed { cue: Cue::Perfect } => self.summary.perfect = true,
                Event::EntityCaptured { entity, kind, .. } => {
                    tracing::info!(entity = entity.get(), ?kind, "entity captured");
                    self.summary.captures += 1;
                }
                Event::PlayerDied { cell, cause, lives } => {
                    tracing::info!(?cell, ?cause, lives, "player died");
                    self.summary.died = true;
                }
                Event::PlayerHopRejected { direction, reason } => {
                    tracing::debug!(?direction, ?reason, "hop rejected");
                    self.summary.rejected_hops += 1;
                }
                Event::ExtraLifeAwarded { lives } => {
                    tracing::info!(lives, "extra life");
                }
                _ => {}
            }
        }
    }
}
