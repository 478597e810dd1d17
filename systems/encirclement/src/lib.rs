#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Territory encirclement engine.
//!
//! The system watches the tile grid for regions the player has sealed off,
//! then runs an exclusive capture pipeline that claims the region a few tiles
//! per frame, captures trapped entities one at a time and finally awards the
//! tiered fill bonus. All mutations leave the system as [`Command`] values;
//! the engine itself only reads [`GridView`] and [`EntityView`] snapshots.

mod feedback;
mod flood;
mod hostile;
mod pipeline;
mod scoring;

use std::{collections::HashSet, time::Duration};

use errand_core::{
    CellCoord, Command, Cue, DeathCause, Direction, EntityView, Event, GridView, PlayerSnapshot,
    TileState,
};

pub use feedback::{FlashTile, Popup, PopupKind};
pub use flood::{find_sealed_region, is_enclosed_by};
pub use pipeline::PipelineStage;
pub use scoring::{fill_cue, fill_score, kill_score, PERFECT_BONUS};

use crate::{
    feedback::Feedback,
    hostile::find_hostile_seal,
    pipeline::{Frame, Pipeline, Sinks, Trapped},
};

/// Tuning parameters for the encirclement engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    fill_batch: usize,
    flash_duration: Duration,
    kill_dwell: Duration,
    kill_wait_timeout: Duration,
    kill_popup: Duration,
    bonus_wait: Duration,
    bonus_display: Duration,
    perfect_display: Duration,
    combo_window: Duration,
    perfect_bonus: u32,
    hostile_min_tiles: u32,
}

impl Config {
    /// Creates a configuration holding the reference tuning.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            fill_batch: 3,
            flash_duration: Duration::from_millis(200),
            kill_dwell: Duration::from_millis(600),
            kill_wait_timeout: Duration::from_millis(200),
            kill_popup: Duration::from_millis(900),
            bonus_wait: Duration::from_millis(500),
            bonus_display: Duration::from_millis(1_000),
            perfect_display: Duration::from_millis(1_500),
            combo_window: Duration::from_secs(2),
            perfect_bonus: PERFECT_BONUS,
            hostile_min_tiles: 4,
        }
    }

    /// Number of queued tiles claimed per frame while filling. Clamped to at least one.
    #[must_use]
    pub const fn with_fill_batch(mut self, tiles: usize) -> Self {
        self.fill_batch = if tiles == 0 { 1 } else { tiles };
        self
    }

    /// Lifetime of the flash marker placed on each claimed tile.
    #[must_use]
    pub const fn with_flash_duration(mut self, duration: Duration) -> Self {
        self.flash_duration = duration;
        self
    }

    /// Time a capture lingers before its score is awarded.
    #[must_use]
    pub const fn with_kill_dwell(mut self, duration: Duration) -> Self {
        self.kill_dwell = duration;
        self
    }

    /// Longest wait for a kill popup to clear before the next capture.
    #[must_use]
    pub const fn with_kill_wait_timeout(mut self, duration: Duration) -> Self {
        self.kill_wait_timeout = duration;
        self
    }

    /// Lifetime of kill score popups.
    #[must_use]
    pub const fn with_kill_popup(mut self, duration: Duration) -> Self {
        self.kill_popup = duration;
        self
    }

    /// Pause between the last kill and the fill bonus.
    #[must_use]
    pub const fn with_bonus_wait(mut self, duration: Duration) -> Self {
        self.bonus_wait = duration;
        self
    }

    /// Display time of the fill bonus popup.
    #[must_use]
    pub const fn with_bonus_display(mut self, duration: Duration) -> Self {
        self.bonus_display = duration;
        self
    }

    /// Display time of the perfect-board banner.
    #[must_use]
    pub const fn with_perfect_display(mut self, duration: Duration) -> Self {
        self.perfect_display = duration;
        self
    }

    /// Largest gap between pipeline starts that still grows the combo.
    #[must_use]
    pub const fn with_combo_window(mut self, window: Duration) -> Self {
        self.combo_window = window;
        self
    }

    /// Flat award for covering the whole board.
    #[must_use]
    pub const fn with_perfect_bonus(mut self, points: u32) -> Self {
        self.perfect_bonus = points;
        self
    }

    /// Fewest tiles a hostile colour needs before it is checked for seals.
    #[must_use]
    pub const fn with_hostile_min_tiles(mut self, tiles: u32) -> Self {
        self.hostile_min_tiles = tiles;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Pure system that detects sealed regions and drives the capture pipeline.
#[derive(Debug)]
pub struct Encirclement {
    config: Config,
    clock: Duration,
    last_start: Option<Duration>,
    combo: u32,
    pipeline: Option<Pipeline>,
    feedback: Feedback,
    movement_frozen: bool,
    rescan: bool,
}

impl Encirclement {
    /// Creates an idle engine using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            clock: Duration::ZERO,
            last_start: None,
            combo: 1,
            pipeline: None,
            feedback: Feedback::default(),
            movement_frozen: false,
            rescan: false,
        }
    }

    /// Consumes world events and immutable views to emit capture commands.
    ///
    /// A player landing (or a pipeline that just finished) triggers a seal scan,
    /// an entity landing triggers a hostile encirclement scan, and the active
    /// pipeline then advances by the elapsed time.
    pub fn handle(
        &mut self,
        events: &[Event],
        grid: GridView<'_>,
        entities: &EntityView,
        player: &PlayerSnapshot,
        win_condition_met: bool,
        out: &mut Vec<Command>,
    ) {
        let mut dt = Duration::ZERO;
        let mut player_landed = false;
        let mut entity_landed = false;
        for event in events {
            match event {
                Event::TimeAdvanced { dt: step } => dt = dt.saturating_add(*step),
                Event::PlayerLanded { .. } => player_landed = true,
                Event::EntityLanded { .. } => entity_landed = true,
                _ => {}
            }
        }
        self.clock = self.clock.saturating_add(dt);

        let rescan = std::mem::take(&mut self.rescan);
        if player_landed || rescan {
            let _ = self.check_all(grid, entities, out);
        }
        if entity_landed {
            let _ = self.check_hostile(grid, player, out);
        }

        self.update(dt, grid, win_condition_met, out);
    }

    /// Starts a capture pipeline for the first sealed region, if idle and one exists.
    ///
    /// Returns `true` when a pipeline was started. While a pipeline runs this is a no-op.
    pub fn check_all(
        &mut self,
        grid: GridView<'_>,
        entities: &EntityView,
        out: &mut Vec<Command>,
    ) -> bool {
        if self.pipeline.is_some() {
            return false;
        }
        let Some(region) = find_sealed_region(grid, TileState::is_owned) else {
            return false;
        };

        self.combo = match self.last_start {
            Some(last) if self.clock.saturating_sub(last) <= self.config.combo_window => {
                self.combo.saturating_add(1)
            }
            _ => 1,
        };
        self.last_start = Some(self.clock);

        let trapped = trapped_entities(grid, entities, &region);
        tracing::debug!(
            tiles = region.len(),
            trapped = trapped.len(),
            combo = self.combo,
            "capture pipeline started"
        );

        out.push(Command::EmitCue {
            cue: fill_cue(region.len()),
        });
        out.push(Command::HoldEntities { held: true });
        self.movement_frozen = true;
        self.pipeline = Some(Pipeline::new(region, trapped, self.combo));
        true
    }

    /// Converts the first region sealed by a hostile colour and kills a player trapped inside.
    ///
    /// Returns `true` when a region was converted. While a pipeline runs this is a no-op.
    pub fn check_hostile(
        &mut self,
        grid: GridView<'_>,
        player: &PlayerSnapshot,
        out: &mut Vec<Command>,
    ) -> bool {
        if self.pipeline.is_some() {
            return false;
        }
        let Some(seal) = find_hostile_seal(grid, self.config.hostile_min_tiles) else {
            return false;
        };

        let player_trapped = seal.region.contains(&player.cell);
        tracing::info!(
            color = ?seal.color,
            tiles = seal.region.len(),
            player_trapped,
            "hostile encirclement"
        );

        out.extend(seal.region.iter().map(|&cell| Command::ClaimTile {
            cell,
            state: seal.color,
        }));
        out.push(Command::EmitCue {
            cue: Cue::HostileEncircle,
        });
        if player_trapped && player.alive && !player.invincible {
            out.push(Command::KillPlayer {
                cause: DeathCause::Encircled,
            });
        }
        true
    }

    /// Advances the active pipeline and ticks transient flash and popup timers.
    pub fn update(
        &mut self,
        dt: Duration,
        grid: GridView<'_>,
        win_condition_met: bool,
        out: &mut Vec<Command>,
    ) {
        if let Some(pipeline) = self.pipeline.as_mut() {
            pipeline.advance(
                Frame {
                    dt,
                    grid,
                    win_condition_met,
                },
                &mut Sinks {
                    config: &self.config,
                    feedback: &mut self.feedback,
                    movement_frozen: &mut self.movement_frozen,
                    out: &mut *out,
                },
            );

            if pipeline.stage() == PipelineStage::Done {
                out.push(Command::RemoveCapturedEntities);
                out.push(Command::HoldEntities { held: false });
                self.pipeline = None;
                self.movement_frozen = false;
                self.rescan = true;
                tracing::debug!("capture pipeline finished");
            }
        }

        self.feedback.tick(dt);
    }

    /// Reports whether a capture pipeline is running.
    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.pipeline.is_some()
    }

    /// Reports whether player and entity movement should currently be held.
    #[must_use]
    pub fn movement_frozen(&self) -> bool {
        self.movement_frozen
    }

    /// Stage of the running pipeline, if any.
    #[must_use]
    pub fn stage(&self) -> Option<PipelineStage> {
        self.pipeline.as_ref().map(Pipeline::stage)
    }

    /// Multiplier applied to the fill bonus of the most recent pipeline.
    #[must_use]
    pub fn combo_multiplier(&self) -> u32 {
        self.combo
    }

    /// Tiles currently flashing after being claimed.
    #[must_use]
    pub fn flash_tiles(&self) -> &[FlashTile] {
        self.feedback.flashes()
    }

    /// Score popups currently on display.
    #[must_use]
    pub fn popups(&self) -> &[Popup] {
        self.feedback.popups()
    }
}

impl Default for Encirclement {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

fn trapped_entities(
    grid: GridView<'_>,
    entities: &EntityView,
    region: &[CellCoord],
) -> Vec<Trapped> {
    let members: HashSet<CellCoord> = region.iter().copied().collect();
    let borders_region = |cell: CellCoord| {
        Direction::ALL
            .iter()
            .filter_map(|&direction| grid.neighbor(cell, direction))
            .any(|neighbor| members.contains(&neighbor))
    };
    let inside = |cell: CellCoord| {
        members.contains(&cell)
            || (grid.get(cell) == Some(TileState::Owned)
                && borders_region(cell)
                && is_enclosed_by(grid, cell, TileState::is_owned))
    };

    entities
        .alive()
        .filter(|snapshot| snapshot.kind.capabilities().capturable)
        .filter(|snapshot| std::iter::once(snapshot.cell).chain(snapshot.hop_from).any(&inside))
        .map(|snapshot| Trapped {
            entity: snapshot.id,
            kind: snapshot.kind,
            cell: snapshot.cell,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use errand_core::{EntityId, EntityKind, EntitySnapshot};

    fn ring_grid() -> Vec<TileState> {
        let n = TileState::Neutral;
        let o = TileState::Owned;
        vec![
            n, n, n, n, n, //
            n, o, o, o, n, //
            n, o, n, o, n, //
            n, o, o, o, n, //
            n, n, n, n, n,
        ]
    }

    fn snapshot(id: u32, kind: EntityKind, cell: CellCoord) -> EntitySnapshot {
        EntitySnapshot {
            id: EntityId::new(id),
            kind,
            cell,
            hop_from: None,
            alive: true,
        }
    }

    #[test]
    fn check_all_is_exclusive() {
        let tiles = ring_grid();
        let grid = GridView::new(&tiles, 5, 5);
        let mut engine = Encirclement::default();
        let mut out = Vec::new();

        assert!(engine.check_all(grid, &EntityView::default(), &mut out));
        assert!(!engine.check_all(grid, &EntityView::default(), &mut out));
        assert_eq!(
            out,
            vec![
                Command::EmitCue { cue: Cue::FillSmall },
                Command::HoldEntities { held: true },
            ]
        );
        assert_eq!(engine.stage(), Some(PipelineStage::Filling));
        assert!(engine.movement_frozen());
    }

    #[test]
    fn open_board_starts_nothing() {
        let tiles = vec![TileState::Neutral; 25];
        let grid = GridView::new(&tiles, 5, 5);
        let mut engine = Encirclement::default();
        let mut out = Vec::new();
        assert!(!engine.check_all(grid, &EntityView::default(), &mut out));
        assert!(out.is_empty());
        assert!(!engine.is_animating());
    }

    #[test]
    fn trapped_entities_respect_capabilities_and_departure_tiles() {
        let tiles = ring_grid();
        let grid = GridView::new(&tiles, 5, 5);
        let mut hopping_out = snapshot(2, EntityKind::Purple, CellCoord::new(0, 2));
        hopping_out.hop_from = Some(CellCoord::new(2, 2));
        let view = EntityView::from_snapshots(vec![
            snapshot(0, EntityKind::Red, CellCoord::new(2, 2)),
            snapshot(1, EntityKind::Snail, CellCoord::new(2, 2)),
            hopping_out,
            snapshot(3, EntityKind::Blue, CellCoord::new(1, 1)),
            snapshot(4, EntityKind::Zombie, CellCoord::new(4, 4)),
        ]);

        let trapped = trapped_entities(grid, &view, &[CellCoord::new(2, 2)]);
        let ids: Vec<u32> = trapped.iter().map(|trapped| trapped.entity.get()).collect();
        assert_eq!(ids, vec![0, 2]);
    }

    #[test]
    fn entity_on_owned_tile_inside_enclosure_is_trapped() {
        let n = TileState::Neutral;
        let o = TileState::Owned;
        let tiles = vec![
            n, n, n, n, n, n, //
            n, o, o, o, o, n, //
            n, o, n, o, o, n, //
            n, o, o, o, o, n, //
            n, n, n, n, n, n,
        ];
        let grid = GridView::new(&tiles, 6, 5);
        let view = EntityView::from_snapshots(vec![snapshot(
            7,
            EntityKind::Blue,
            CellCoord::new(3, 2),
        )]);

        let trapped = trapped_entities(grid, &view, &[CellCoord::new(2, 2)]);
        assert_eq!(trapped.len(), 1);
        assert_eq!(trapped[0].entity, EntityId::new(7));
    }

    #[test]
    fn entity_on_distant_owned_block_is_not_trapped() {
        let n = TileState::Neutral;
        let o = TileState::Owned;
        let tiles = vec![
            n, n, n, n, n, n, n, n, n, //
            n, o, o, o, n, o, o, o, n, //
            n, o, n, o, n, o, o, o, n, //
            n, o, o, o, n, o, o, o, n, //
            n, n, n, n, n, n, n, n, n,
        ];
        let grid = GridView::new(&tiles, 9, 5);
        let view = EntityView::from_snapshots(vec![
            snapshot(0, EntityKind::Red, CellCoord::new(6, 2)),
            snapshot(1, EntityKind::Purple, CellCoord::new(2, 1)),
        ]);

        let trapped = trapped_entities(grid, &view, &[CellCoord::new(2, 2)]);
        let ids: Vec<u32> = trapped.iter().map(|trapped| trapped.entity.get()).collect();
        assert!(ids.is_empty(), "captured {ids:?}");
    }

    #[test]
    fn hostile_seal_kills_exposed_player() {
        let r = TileState::Claimed(errand_core::ClaimColor::Red);
        let n = TileState::Neutral;
        let tiles = vec![
            n, n, n, n, n, //
            n, r, r, r, n, //
            n, r, n, r, n, //
            n, r, r, r, n, //
            n, n, n, n, n,
        ];
        let grid = GridView::new(&tiles, 5, 5);
        let player = PlayerSnapshot {
            cell: CellCoord::new(2, 2),
            hop_from: None,
            alive: true,
            lives: 3,
            score: 0,
            invincible: false,
        };
        let mut engine = Encirclement::default();
        let mut out = Vec::new();

        assert!(engine.check_hostile(grid, &player, &mut out));
        assert_eq!(
            out,
            vec![
                Command::ClaimTile {
                    cell: CellCoord::new(2, 2),
                    state: r,
                },
                Command::EmitCue {
                    cue: Cue::HostileEncircle,
                },
                Command::KillPlayer {
                    cause: DeathCause::Encircled,
                },
            ]
        );

        out.clear();
        let shielded = PlayerSnapshot {
            invincible: true,
            ..player
        };
        assert!(engine.check_hostile(grid, &shielded, &mut out));
        assert!(!out
            .iter()
            .any(|command| matches!(command, Command::KillPlayer { .. })));
    }

    #[test]
    fn config_overrides_apply() {
        let config = Config::new()
            .with_fill_batch(0)
            .with_combo_window(Duration::from_secs(5))
            .with_perfect_bonus(100);
        assert_eq!(config.fill_batch, 1);
        assert_eq!(config.combo_window, Duration::from_secs(5));
        assert_eq!(config.perfect_bonus, 100);
        assert_eq!(Config::default(), Config::new());
    }
}
